//! Page-following enumeration over `next_page_token` cursors.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, error};

use super::retry::RetryPolicy;
use super::transport::Transport;
use crate::error::{Result, SyncError};

pub const PAGE_SIZE: u32 = 300;
const NEXT_PAGE_TOKEN: &str = "next_page_token";

/// What a paginated call enumerates, used to label listing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingResource {
    Users,
    Recordings { user_id: String },
}

impl fmt::Display for ListingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingResource::Users => write!(f, "users"),
            ListingResource::Recordings { user_id } => {
                write!(f, "recordings for user {user_id}")
            }
        }
    }
}

/// Lazily walks the pages of one listing.
///
/// Each call to [`Paginator::next_page`] issues one request; the sequence is
/// finite and cannot be restarted.
pub struct Paginator<'a, T> {
    transport: &'a dyn Transport,
    retry: &'a RetryPolicy,
    url: String,
    authorization: String,
    params: Vec<(String, String)>,
    field: &'static str,
    resource: ListingResource,
    pages_fetched: usize,
    finished: bool,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Paginator<'a, T> {
    pub fn new(
        transport: &'a dyn Transport,
        retry: &'a RetryPolicy,
        url: impl Into<String>,
        access_token: &str,
        params: Vec<(String, String)>,
        field: &'static str,
        resource: ListingResource,
    ) -> Self {
        Self {
            transport,
            retry,
            url: url.into(),
            authorization: format!("Bearer {access_token}"),
            params,
            field,
            resource,
            pages_fetched: 0,
            finished: false,
            _item: PhantomData,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the cursor is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if self.finished {
            return Ok(None);
        }

        let reply = self
            .retry
            .get(self.transport, &self.url, &self.authorization, &self.params)
            .await
            .map_err(|err| self.listing_error(None, err.to_string()))?;

        debug!("{} page {}: {}", self.resource, self.pages_fetched + 1, reply.status);

        if !reply.is_ok() {
            self.finished = true;
            error!(
                "Listing {} failed with status {}: {}",
                self.resource,
                reply.status,
                reply.text()
            );
            return Err(self.listing_error(
                Some(reply.status),
                format!("HTTP {}. Check your access token", reply.status),
            ));
        }

        let mut page: Value = serde_json::from_slice(&reply.body)
            .map_err(|err| self.listing_error(Some(reply.status), err.to_string()))?;

        let items = match page.get_mut(self.field).map(Value::take) {
            None | Some(Value::Null) => Vec::new(),
            Some(array) => serde_json::from_value::<Vec<T>>(array).map_err(|err| {
                self.listing_error(
                    Some(reply.status),
                    format!("unexpected `{}` payload: {err}", self.field),
                )
            })?,
        };

        self.pages_fetched += 1;

        match page
            .get(NEXT_PAGE_TOKEN)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
        {
            Some(token) => self.set_cursor(token.to_string()),
            None => self.finished = true,
        }

        Ok(Some(items))
    }

    /// Drain every remaining page into one vector, preserving page order.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }

    fn set_cursor(&mut self, token: String) {
        match self.params.iter_mut().find(|(key, _)| key == NEXT_PAGE_TOKEN) {
            Some((_, value)) => *value = token,
            None => self.params.push((NEXT_PAGE_TOKEN.to_string(), token)),
        }
    }

    fn listing_error(&self, status: Option<u16>, message: String) -> SyncError {
        SyncError::Listing {
            resource: self.resource.to_string(),
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zoom::transport::stub::StubTransport;
    use crate::zoom::transport::HttpReply;
    use serde_json::json;

    const URL: &str = "https://api.zoom.us/v2/users";

    fn params() -> Vec<(String, String)> {
        vec![("page_size".to_string(), PAGE_SIZE.to_string())]
    }

    #[tokio::test]
    async fn test_concatenates_pages_in_order() {
        let transport = StubTransport::new();
        transport
            .json(URL, json!({"users": [1, 2], "next_page_token": "p2"}))
            .json(URL, json!({"users": [3], "next_page_token": "p3"}))
            .json(URL, json!({"users": [4, 5]}));

        let retry = RetryPolicy::none();
        let items: Vec<u32> = Paginator::new(
            &transport,
            &retry,
            URL,
            "tok",
            params(),
            "users",
            ListingResource::Users,
        )
        .collect_all()
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].param("next_page_token"), None);
        assert_eq!(requests[1].param("next_page_token"), Some("p2"));
        assert_eq!(requests[2].param("next_page_token"), Some("p3"));
        for request in &requests {
            assert_eq!(request.param("page_size"), Some("300"));
            assert_eq!(request.authorization, "Bearer tok");
            // cursor replaced, not appended
            assert!(request.params.iter().filter(|(k, _)| k == "next_page_token").count() <= 1);
        }
    }

    #[tokio::test]
    async fn test_empty_token_stops_pagination() {
        let transport = StubTransport::new();
        transport
            .json(URL, json!({"users": ["a"], "next_page_token": ""}))
            .json(URL, json!({"users": ["never"]}));

        let retry = RetryPolicy::none();
        let items: Vec<String> = Paginator::new(
            &transport,
            &retry,
            URL,
            "tok",
            params(),
            "users",
            ListingResource::Users,
        )
        .collect_all()
        .await
        .unwrap();

        assert_eq!(items, vec!["a".to_string()]);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_field_is_empty_page() {
        let transport = StubTransport::new();
        transport.json(URL, json!({"total_records": 0}));

        let retry = RetryPolicy::none();
        let mut paginator: Paginator<'_, u32> = Paginator::new(
            &transport,
            &retry,
            URL,
            "tok",
            params(),
            "users",
            ListingResource::Users,
        );

        assert_eq!(paginator.next_page().await.unwrap(), Some(vec![]));
        assert_eq!(paginator.next_page().await.unwrap(), None);
        assert_eq!(paginator.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_non_200_is_listing_error() {
        let url = "https://api.zoom.us/v2/users/u1/recordings";
        let transport = StubTransport::new();
        transport
            .json(url, json!({"meetings": [1], "next_page_token": "p2"}))
            .reply(url, HttpReply::new(401, "{\"code\":124}"));

        let retry = RetryPolicy::none();
        let err = Paginator::<'_, u32>::new(
            &transport,
            &retry,
            url,
            "tok",
            params(),
            "meetings",
            ListingResource::Recordings {
                user_id: "u1".to_string(),
            },
        )
        .collect_all()
        .await
        .unwrap_err();

        match err {
            SyncError::Listing {
                resource, status, ..
            } => {
                assert_eq!(resource, "recordings for user u1");
                assert_eq!(status, Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
