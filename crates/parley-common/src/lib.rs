pub mod errors;
pub mod events;
pub mod id;
pub mod notifications;

pub use errors::{ConfigError, ParleyError, PersistError, SessionError};
pub use events::{Event, EventBus};
pub use id::{new_correlation_id, new_id, MessageId, SessionId};
pub use notifications::{Notification, NotificationLevel, NotificationQueue};

pub type Result<T> = std::result::Result<T, ParleyError>;
