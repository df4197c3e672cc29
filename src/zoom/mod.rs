//! Zoom REST API access: token exchange, paginated listings and HTTP plumbing.

pub mod auth;
pub mod client;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod transport;

pub use auth::{Credentials, TokenProvider};
pub use client::{ZoomClient, DEFAULT_API_BASE_URL, DEFAULT_OAUTH_URL};
pub use models::{Recording, RecordingFile, RecordingIndex, User, UserRecordings, AUDIO_ONLY};
pub use pagination::{ListingResource, Paginator, PAGE_SIZE};
pub use retry::RetryPolicy;
pub use transport::{HttpReply, ReqwestTransport, Transport, TransportError};
