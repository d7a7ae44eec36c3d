pub mod api; // REST boundary to the clinic backend
pub mod calendar;
pub mod config;
pub mod models;
pub mod reminders; // Time-windowed notification derivation
pub mod service;
pub mod slots; // Double-booking check

use tracing_subscriber::EnvFilter;

pub use api::{ApiError, ClinicApiClient, ClinicBackend, ReminderChannel};
pub use calendar::{ClockSource, FixedClock, SystemClock, ValidationError};
pub use reminders::{DefaultReminderEngine, Notification, NotificationStore, ReminderEngine};
pub use service::{ReminderService, ServiceError};
pub use slots::is_slot_occupied;

/// Install the global fmt subscriber. `RUST_LOG` wins over the default
/// filter. Calling this twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
}
