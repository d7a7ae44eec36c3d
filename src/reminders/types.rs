use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::{ClockSource, ValidationError};
use crate::models::{Appointment, PatientDirectory};

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// Urgency determines whether the notification panel opens by itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    /// Shown in the panel and counted in the badge.
    Standard,
    /// Also asks the caller to surface the panel.
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationCategory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    /// Manual "you have an appointment" reminder.
    AppointmentScheduled,
    /// Later today, outside the imminent window.
    AppointmentToday,
    /// Starting within the imminent window.
    AppointmentImminent,
    /// Start time has passed while still `Programada`.
    AppointmentMissed,
    /// At least one installment of the plan is overdue.
    PaymentOverdue,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentScheduled => "appointment_scheduled",
            Self::AppointmentToday => "appointment_today",
            Self::AppointmentImminent => "appointment_imminent",
            Self::AppointmentMissed => "appointment_missed",
            Self::PaymentOverdue => "payment_overdue",
        }
    }

    /// Which reminder about an appointment this one supersedes.
    pub fn group(&self) -> ReminderGroup {
        match self {
            Self::AppointmentScheduled
            | Self::AppointmentToday
            | Self::AppointmentImminent
            | Self::AppointmentMissed => ReminderGroup::Schedule,
            Self::PaymentOverdue => ReminderGroup::Payment,
        }
    }

    pub fn urgency(&self) -> Urgency {
        match self {
            Self::AppointmentToday | Self::AppointmentImminent => Urgency::High,
            Self::AppointmentScheduled | Self::AppointmentMissed | Self::PaymentOverdue => {
                Urgency::Standard
            }
        }
    }
}

/// An appointment holds at most one derived reminder per group, so a visit
/// moving from today to imminent to missed keeps a single entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReminderGroup {
    Schedule,
    Payment,
}

/// Whether a notification came from a scan or from an explicit request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationOrigin {
    /// Produced by a derivation pass; replaced or dropped by the next one.
    Derived,
    /// Requested for one appointment; only removed by the user.
    Manual,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// An ephemeral, session-local alert derived from appointment state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub category: NotificationCategory,
    pub origin: NotificationOrigin,
    /// Lookup key only; the notification does not own the appointment.
    pub appointment_id: String,
    pub title: String,
    pub message: String,
    pub detail: String,
    pub created_at: NaiveDateTime,
    pub read: bool,
}

impl Notification {
    pub fn urgency(&self) -> Urgency {
        self.category.urgency()
    }

    /// Key under which repeated derivations replace each other.
    pub fn dedup_key(&self) -> (&str, ReminderGroup) {
        (self.appointment_id.as_str(), self.category.group())
    }
}

/// Template inputs resolved from one appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderContext {
    pub appointment_id: String,
    pub patient_name: String,
    pub consultation_type: String,
    pub date: NaiveDate,
    pub time: String,
    pub minutes_remaining: Option<i64>,
    pub overdue: Option<OverdueSummary>,
}

/// What the scan found overdue on one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct OverdueSummary {
    pub first_installment: u32,
    pub first_amount: f64,
    pub first_due: NaiveDate,
    pub overdue_count: usize,
    pub overdue_total: f64,
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// One appointment (or installment) the scan could not evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("appointment {appointment_id} skipped: {reason}")]
pub struct PartialScanFailure {
    pub appointment_id: String,
    pub reason: String,
}

impl PartialScanFailure {
    pub fn new(appointment_id: &str, error: &ValidationError) -> Self {
        Self {
            appointment_id: appointment_id.to_string(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NotificationCounts {
    pub today: usize,
    pub imminent: usize,
    pub missed: usize,
    pub payment_overdue: usize,
}

impl NotificationCounts {
    pub fn total(&self) -> usize {
        self.today + self.imminent + self.missed + self.payment_overdue
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationResult {
    pub notifications: Vec<Notification>,
    /// True when a high-urgency notification was derived.
    pub auto_surface: bool,
    pub skipped: Vec<PartialScanFailure>,
    pub counts: NotificationCounts,
    pub processing_time_ms: u64,
}

// ---------------------------------------------------------------------------
// AppointmentSnapshot
// ---------------------------------------------------------------------------

/// Appointments as loaded from the backend plus the names to render them
/// with. Derivation works only on this snapshot and never performs I/O.
#[derive(Debug, Clone, Default)]
pub struct AppointmentSnapshot {
    pub appointments: Vec<Appointment>,
    pub patients: PatientDirectory,
}

impl AppointmentSnapshot {
    pub fn new(appointments: Vec<Appointment>, patients: PatientDirectory) -> Self {
        Self {
            appointments,
            patients,
        }
    }

    pub fn get(&self, appointment_id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }
}

// ---------------------------------------------------------------------------
// ReminderError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("No overdue installment for appointment {0}")]
    NothingOverdue(String),

    #[error("Notification not found: {0}")]
    NotificationNotFound(Uuid),

    #[error("Internal lock failed")]
    LockFailed,
}

// ---------------------------------------------------------------------------
// ReminderEngine trait
// ---------------------------------------------------------------------------

pub trait ReminderEngine {
    /// Derive every notification warranted by `snapshot` at `now`.
    fn derive_notifications(
        &self,
        snapshot: &AppointmentSnapshot,
        now: NaiveDateTime,
    ) -> DerivationResult;

    /// Same as [`derive_notifications`](Self::derive_notifications), reading
    /// the instant from a clock.
    fn derive_with_clock(
        &self,
        snapshot: &AppointmentSnapshot,
        clock: &dyn ClockSource,
    ) -> DerivationResult {
        self.derive_notifications(snapshot, clock.now())
    }

    /// Build one reminder on explicit request, bypassing the scan.
    fn create_manual_reminder(
        &self,
        appointment: &Appointment,
        patients: &PatientDirectory,
        category: NotificationCategory,
        now: NaiveDateTime,
    ) -> Result<Notification, ReminderError>;
}
