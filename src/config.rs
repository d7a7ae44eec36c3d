use chrono::NaiveTime;

use crate::slots::OverlapPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Consultorio";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "CONSULTORIO_API_URL";
/// Environment variable overriding the HTTP timeout (seconds).
pub const API_TIMEOUT_ENV: &str = "CONSULTORIO_API_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_API_TIMEOUT_SECS: u64 = 15;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "consultorio=info"
}

/// Where the clinic REST backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    /// Read overrides from the environment, falling back to defaults.
    /// An unparseable timeout is ignored rather than treated as fatal.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let timeout_secs = std::env::var(API_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);
        Self::new(&base_url, timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_API_TIMEOUT_SECS)
    }
}

/// Thresholds used by the reminder derivation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    /// An appointment starting within this many minutes is imminent.
    pub imminent_window_minutes: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            imminent_window_minutes: 120,
        }
    }
}

/// Opening hours and slot grid for the booking form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub opening: NaiveTime,
    pub closing: NaiveTime,
    pub slot_step_minutes: u32,
    /// Duration assumed when an appointment carries none.
    pub default_duration_minutes: u32,
    pub overlap_policy: OverlapPolicy,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            opening: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            closing: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_step_minutes: 30,
            default_duration_minutes: 60,
            overlap_policy: OverlapPolicy::Interval,
        }
    }
}
