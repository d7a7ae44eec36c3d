use std::time::Instant;

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::config::ReminderConfig;
use crate::models::{Appointment, PatientDirectory};

use super::detection::{build_context, detect_overdue, detect_schedule};
use super::messages::MessageTemplates;
use super::types::{
    AppointmentSnapshot, DerivationResult, Notification, NotificationCategory,
    NotificationCounts, NotificationOrigin, PartialScanFailure, ReminderContext, ReminderEngine,
    ReminderError, Urgency,
};

/// Stateless reminder derivation over an appointment snapshot.
///
/// Re-run on every appointment reload. Live countdowns need the caller to
/// re-invoke it on its own interval; the engine schedules nothing.
pub struct DefaultReminderEngine {
    config: ReminderConfig,
}

impl DefaultReminderEngine {
    pub fn new(config: ReminderConfig) -> Self {
        Self { config }
    }

    fn imminent_window(&self) -> Duration {
        Duration::minutes(self.config.imminent_window_minutes)
    }

    fn build_notification(
        category: NotificationCategory,
        origin: NotificationOrigin,
        ctx: &ReminderContext,
        now: NaiveDateTime,
    ) -> Notification {
        let text = MessageTemplates::render(category, ctx);
        Notification {
            id: Uuid::new_v4(),
            category,
            origin,
            appointment_id: ctx.appointment_id.clone(),
            title: text.title,
            message: text.message,
            detail: text.detail,
            created_at: now,
            read: false,
        }
    }

    /// Evaluate one appointment. Returns notifications and item-level failures.
    fn scan_appointment(
        &self,
        appointment: &Appointment,
        patients: &PatientDirectory,
        now: NaiveDateTime,
    ) -> (Vec<Notification>, Vec<PartialScanFailure>) {
        let mut notifications = Vec::new();
        let mut skipped = Vec::new();

        let ctx = match build_context(appointment, patients, Some(now)) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    error = %e,
                    "Skipping appointment during reminder scan"
                );
                skipped.push(PartialScanFailure::new(&appointment.id, &e));
                return (notifications, skipped);
            }
        };

        match detect_schedule(appointment, patients, now, self.imminent_window()) {
            Ok(Some((category, schedule_ctx))) => {
                notifications.push(Self::build_notification(
                    category,
                    NotificationOrigin::Derived,
                    &schedule_ctx,
                    now,
                ));
            }
            Ok(None) => {}
            Err(e) => skipped.push(PartialScanFailure::new(&appointment.id, &e)),
        }

        let (overdue, errors) = detect_overdue(appointment, now.date());
        for e in &errors {
            tracing::warn!(
                appointment_id = %appointment.id,
                error = %e,
                "Skipping installment with unparseable due date"
            );
            skipped.push(PartialScanFailure::new(&appointment.id, e));
        }
        if let Some(summary) = overdue {
            let overdue_ctx = ReminderContext {
                minutes_remaining: None,
                overdue: Some(summary),
                ..ctx
            };
            notifications.push(Self::build_notification(
                NotificationCategory::PaymentOverdue,
                NotificationOrigin::Derived,
                &overdue_ctx,
                now,
            ));
        }

        (notifications, skipped)
    }
}

impl Default for DefaultReminderEngine {
    fn default() -> Self {
        Self::new(ReminderConfig::default())
    }
}

impl ReminderEngine for DefaultReminderEngine {
    fn derive_notifications(
        &self,
        snapshot: &AppointmentSnapshot,
        now: NaiveDateTime,
    ) -> DerivationResult {
        let start = Instant::now();
        let mut notifications = Vec::new();
        let mut skipped = Vec::new();

        for appointment in &snapshot.appointments {
            let (found, failures) = self.scan_appointment(appointment, &snapshot.patients, now);
            notifications.extend(found);
            skipped.extend(failures);
        }

        let mut counts = NotificationCounts::default();
        for n in &notifications {
            match n.category {
                NotificationCategory::AppointmentToday => counts.today += 1,
                NotificationCategory::AppointmentImminent => counts.imminent += 1,
                NotificationCategory::AppointmentMissed => counts.missed += 1,
                NotificationCategory::PaymentOverdue => counts.payment_overdue += 1,
                NotificationCategory::AppointmentScheduled => {}
            }
        }
        let auto_surface = notifications.iter().any(|n| n.urgency() == Urgency::High);
        let processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            appointments = snapshot.appointments.len(),
            derived = counts.total(),
            skipped = skipped.len(),
            auto_surface,
            processing_ms = processing_time_ms,
            "Reminder derivation complete"
        );

        DerivationResult {
            notifications,
            auto_surface,
            skipped,
            counts,
            processing_time_ms,
        }
    }

    fn create_manual_reminder(
        &self,
        appointment: &Appointment,
        patients: &PatientDirectory,
        category: NotificationCategory,
        now: NaiveDateTime,
    ) -> Result<Notification, ReminderError> {
        let countdown = match category {
            NotificationCategory::AppointmentToday
            | NotificationCategory::AppointmentImminent
            | NotificationCategory::AppointmentMissed => Some(now),
            NotificationCategory::AppointmentScheduled | NotificationCategory::PaymentOverdue => {
                None
            }
        };
        let mut ctx = build_context(appointment, patients, countdown)?;
        if category == NotificationCategory::PaymentOverdue {
            let (summary, _) = detect_overdue(appointment, now.date());
            match summary {
                Some(summary) => ctx.overdue = Some(summary),
                None => return Err(ReminderError::NothingOverdue(appointment.id.clone())),
            }
        }

        tracing::debug!(
            appointment_id = %appointment.id,
            category = category.as_str(),
            "Manual reminder created"
        );

        Ok(Self::build_notification(
            category,
            NotificationOrigin::Manual,
            &ctx,
            now,
        ))
    }
}
