//! End-to-end sync run.
//!
//! token → users (cached) → recording index (cached) → downloads.
//! A cache file that exists is trusted wholesale; it is never merged with
//! fresh API data.

use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::cache::{BlobCache, RECORDINGS_CACHE_KEY, USERS_CACHE_KEY};
use crate::config::Settings;
use crate::download::{DownloadPipeline, DownloadReport};
use crate::error::Result;
use crate::zoom::{RecordingIndex, TokenProvider, Transport, User, ZoomClient};


#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Ignore existing caches, fetch everything and overwrite them.
    pub refresh: bool,
    pub show_progress: bool,
    /// Date stamped into downloaded filenames.
    pub run_date: NaiveDate,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            refresh: false,
            show_progress: false,
            run_date: Local::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub users_listed: usize,
    pub users_indexed: usize,
    pub recordings: usize,
    pub downloads: DownloadReport,
}

pub struct SyncRunner<'a> {
    settings: &'a Settings,
    transport: &'a dyn Transport,
    cache: BlobCache,
}

impl<'a> SyncRunner<'a> {
    pub fn new(settings: &'a Settings, transport: &'a dyn Transport) -> Self {
        Self {
            settings,
            transport,
            cache: BlobCache::new(&settings.cache_dir),
        }
    }

    pub fn cache(&self) -> &BlobCache {
        &self.cache
    }

    pub async fn authenticate(&self) -> Result<String> {
        TokenProvider::new(self.transport, &self.settings.http.oauth_url)
            .fetch(&self.settings.credentials)
            .await
    }

    fn client(&self, access_token: &str) -> ZoomClient<'a> {
        ZoomClient::new(
            self.transport,
            self.settings.http.retry.clone(),
            &self.settings.http.api_base_url,
            access_token,
        )
    }

    /// Cached user list, or a fresh listing that is then cached.
    pub async fn users(&self, access_token: &str, refresh: bool) -> Result<Vec<User>> {
        if !refresh {
            if let Some(users) = self.cache.load::<Vec<User>>(USERS_CACHE_KEY)? {
                info!("Using {} cached users", users.len());
                return Ok(users);
            }
        }

        let users = self.client(access_token).list_users().await?;
        self.cache.store(USERS_CACHE_KEY, &users)?;
        Ok(users)
    }

    /// Cached recording index, or one built from the API for the filtered users.
    pub async fn recording_index(
        &self,
        access_token: &str,
        users: &[User],
        refresh: bool,
    ) -> Result<RecordingIndex> {
        if !refresh {
            if let Some(index) = self.cache.load::<RecordingIndex>(RECORDINGS_CACHE_KEY)? {
                info!(
                    "Using cached recording index ({} users, {} recordings)",
                    index.user_count(),
                    index.recording_count()
                );
                return Ok(index);
            }
        }

        let index = self.build_index(access_token, users).await?;
        self.cache.store(RECORDINGS_CACHE_KEY, &index)?;
        Ok(index)
    }

    async fn build_index(&self, access_token: &str, users: &[User]) -> Result<RecordingIndex> {
        let range = self.settings.range()?;
        let client = self.client(access_token);
        let filter = &self.settings.user_filter;
        let mut index = RecordingIndex::new();

        if range.months().is_empty() {
            warn!(
                "Month range {}..{} is empty, no recordings will be listed",
                range.month_from, range.month_to
            );
        }

        for user in users.iter().filter(|user| filter.allows(user)) {
            index.extend(&user.id, Vec::new());
            for month in range.months() {
                let recordings = client
                    .list_recordings(&user.id, range.year, month)
                    .await?;
                index.extend(&user.id, recordings);
            }
        }

        info!(
            "Indexed {} recordings for {} users",
            index.recording_count(),
            index.user_count()
        );
        Ok(index)
    }

    pub async fn run(&self, options: &SyncOptions) -> Result<SyncSummary> {
        self.settings.range()?;
        if !self.settings.user_filter.is_unrestricted() {
            info!("Filtering users by {:?}", self.settings.user_filter.emails());
        }

        let access_token = self.authenticate().await?;
        let users = self.users(&access_token, options.refresh).await?;
        let index = self
            .recording_index(&access_token, &users, options.refresh)
            .await?;

        std::fs::create_dir_all(&self.settings.download_dir)?;
        let downloads = DownloadPipeline::new(
            self.transport,
            self.settings.http.retry.clone(),
            &self.settings.download_dir,
            options.run_date,
        )
        .with_progress(options.show_progress)
        .run(&index, &access_token)
        .await;

        Ok(SyncSummary {
            users_listed: users.len(),
            users_indexed: index.user_count(),
            recordings: index.recording_count(),
            downloads,
        })
    }
}
