use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::calendar::{format_time, ValidationError};
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, PatientDirectory};

use super::types::{NotificationCategory, OverdueSummary, ReminderContext};

/// Classify a same-day start time relative to `now`.
/// Returns `None` when the appointment is on another day.
pub fn classify_start(
    start: NaiveDateTime,
    now: NaiveDateTime,
    imminent_window: Duration,
) -> Option<NotificationCategory> {
    if start.date() != now.date() {
        return None;
    }
    let remaining = start - now;
    let category = if remaining <= Duration::zero() {
        NotificationCategory::AppointmentMissed
    } else if remaining <= imminent_window {
        NotificationCategory::AppointmentImminent
    } else {
        NotificationCategory::AppointmentToday
    };
    Some(category)
}

/// Template inputs for `appointment`. `now` fills the countdown when given.
pub fn build_context(
    appointment: &Appointment,
    patients: &PatientDirectory,
    now: Option<NaiveDateTime>,
) -> Result<ReminderContext, ValidationError> {
    let start = appointment.starts_at()?;
    Ok(ReminderContext {
        appointment_id: appointment.id.clone(),
        patient_name: patients.display_name(&appointment.patient),
        consultation_type: appointment.consultation_label().to_string(),
        date: start.date(),
        time: format_time(start.time()),
        minutes_remaining: now.map(|n| (start - n).num_minutes()),
        overdue: None,
    })
}

/// Same-day schedule reminder for a `Programada` appointment, if any.
pub fn detect_schedule(
    appointment: &Appointment,
    patients: &PatientDirectory,
    now: NaiveDateTime,
    imminent_window: Duration,
) -> Result<Option<(NotificationCategory, ReminderContext)>, ValidationError> {
    let start = appointment.starts_at()?;
    if appointment.status != AppointmentStatus::Scheduled {
        return Ok(None);
    }
    match classify_start(start, now, imminent_window) {
        Some(category) => {
            let ctx = build_context(appointment, patients, Some(now))?;
            Ok(Some((category, ctx)))
        }
        None => Ok(None),
    }
}

/// Overdue installments on the appointment's plan.
///
/// Installments with an unparseable due date are returned as errors while
/// the rest of the plan is still evaluated.
pub fn detect_overdue(
    appointment: &Appointment,
    today: NaiveDate,
) -> (Option<OverdueSummary>, Vec<ValidationError>) {
    let Some(plan) = &appointment.payment_plan else {
        return (None, Vec::new());
    };

    let mut summary: Option<OverdueSummary> = None;
    let mut errors = Vec::new();

    for installment in plan.ordered() {
        let overdue = match installment.is_overdue(today) {
            Ok(overdue) => overdue,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        if !overdue {
            continue;
        }
        match summary.as_mut() {
            Some(s) => {
                s.overdue_count += 1;
                s.overdue_total += installment.amount;
            }
            None => {
                // is_overdue already parsed the due date
                let first_due = installment.due_on().unwrap_or(today);
                summary = Some(OverdueSummary {
                    first_installment: installment.number,
                    first_amount: installment.amount,
                    first_due,
                    overdue_count: 1,
                    overdue_total: installment.amount,
                });
            }
        }
    }

    (summary, errors)
}
