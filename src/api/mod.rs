//! Clinic REST backend boundary.
//!
//! `ClinicBackend` is the contract through which appointments and their
//! installment plans are loaded and through which user actions (status
//! changes, installment confirm/edit/delete, reminder dispatch) are sent.
//! `ClinicApiClient` implements it over HTTP.

pub mod client;
pub mod error;
pub mod types;

pub use client::ClinicApiClient;
pub use error::ApiError;
pub use types::{ClinicBackend, ReminderChannel};
