pub mod domain;
pub mod pagination;
pub mod ports;
pub mod text;

pub use domain::{
    Category, Identifier, Notification, NotificationKind, NotificationSettings, Post, Role, Topic,
    User, TOMBSTONE,
};
pub use pagination::{PageRequest, Paginated, Pagination};
pub use ports::{ForumStore, PortError, PortResult};
