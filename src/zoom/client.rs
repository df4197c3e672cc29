use tracing::info;

use super::models::{Recording, User};
use super::pagination::{ListingResource, Paginator, PAGE_SIZE};
use super::retry::RetryPolicy;
use super::transport::Transport;
use crate::calendar::MonthSpan;
use crate::error::Result;

pub const DEFAULT_API_BASE_URL: &str = "https://api.zoom.us/v2";
pub const DEFAULT_OAUTH_URL: &str = "https://zoom.us/oauth/token";

/// Authenticated access to the users and recordings collections.
pub struct ZoomClient<'a> {
    transport: &'a dyn Transport,
    retry: RetryPolicy,
    base_url: String,
    access_token: String,
}

impl<'a> ZoomClient<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        retry: RetryPolicy,
        base_url: &str,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            retry,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn users_url(&self) -> String {
        format!("{}/users", self.base_url)
    }

    pub fn recordings_url(&self, user_id: &str) -> String {
        format!("{}/users/{}/recordings", self.base_url, user_id)
    }

    /// Page through every user of the account.
    pub fn users(&self) -> Paginator<'_, User> {
        Paginator::new(
            self.transport,
            &self.retry,
            self.users_url(),
            &self.access_token,
            vec![("page_size".to_string(), PAGE_SIZE.to_string())],
            "users",
            ListingResource::Users,
        )
    }

    /// Page through one user's recordings within a calendar month.
    pub fn recordings(&self, user_id: &str, year: i32, month: u32) -> Result<Paginator<'_, Recording>> {
        let (from, to) = MonthSpan::new(year, month)?.query_bounds();
        Ok(Paginator::new(
            self.transport,
            &self.retry,
            self.recordings_url(user_id),
            &self.access_token,
            vec![
                ("page_size".to_string(), PAGE_SIZE.to_string()),
                ("from".to_string(), from),
                ("to".to_string(), to),
            ],
            "meetings",
            ListingResource::Recordings {
                user_id: user_id.to_string(),
            },
        ))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users().collect_all().await?;
        info!("Fetched {} users", users.len());
        Ok(users)
    }

    pub async fn list_recordings(&self, user_id: &str, year: i32, month: u32) -> Result<Vec<Recording>> {
        let recordings = self.recordings(user_id, year, month)?.collect_all().await?;
        info!(
            "Fetched {} recordings for user {} ({:04}-{:02})",
            recordings.len(),
            user_id,
            year,
            month
        );
        Ok(recordings)
    }
}
