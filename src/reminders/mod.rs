pub mod detection;
pub mod engine;
pub mod messages;
pub mod store;
pub mod types;

pub use engine::DefaultReminderEngine;
pub use store::NotificationStore;
pub use types::*;
