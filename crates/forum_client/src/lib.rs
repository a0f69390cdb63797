//! Client-side session and notification state for the forum API.
//!
//! `SessionManager` owns the bearer token and the signed-in account and
//! persists both through a `SessionStorage`. `NotificationCenter` keeps a
//! cached copy of the caller's feed that is patched optimistically and
//! reconciled by polling.

pub mod api;
pub mod error;
pub mod feed;
pub mod models;
pub mod session;
pub mod storage;

pub use api::{ForumApi, HttpForumApi};
pub use error::{ClientError, ClientResult};
pub use feed::{FeedSnapshot, NotificationCenter, POLL_INTERVAL};
pub use models::{Account, AuthSession, FeedPage, LoginCredentials, NotificationItem, Registration};
pub use session::{normalize_role, AuthPolicy, SessionManager};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
