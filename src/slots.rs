//! Slot availability for the booking form.
//!
//! A candidate (date, time) is checked against the loaded appointments
//! before submission. The appointment being edited is excluded so that
//! saving it unchanged never reports a conflict with itself.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{format_time, normalize_date, parse_time, ValidationError};
use crate::config::ScheduleConfig;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

/// How two bookings are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Same calendar date and same start time.
    ExactStart,
    /// Time ranges `[start, start + duration)` intersect.
    Interval,
}

/// A proposed booking, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCandidate {
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

impl SlotCandidate {
    pub fn parse(
        date: &str,
        time: &str,
        duration_minutes: u32,
    ) -> Result<Self, ValidationError> {
        let start = normalize_date(date)?.and_time(parse_time(time)?);
        Ok(Self {
            start,
            duration_minutes,
        })
    }

    fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// One cell of the day grid shown by the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub time: String,
    pub occupied: bool,
}

pub struct SlotChecker {
    config: ScheduleConfig,
}

impl SlotChecker {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// First appointment (other than `exclude_id`) that collides with the candidate.
    ///
    /// Cancelled visits never hold a slot. Stored appointments whose own
    /// date or time cannot be parsed are skipped and logged.
    pub fn find_conflict<'a>(
        &self,
        candidate: &SlotCandidate,
        appointments: &'a [Appointment],
        exclude_id: Option<&str>,
    ) -> Option<&'a Appointment> {
        appointments
            .iter()
            .filter(|a| Some(a.id.as_str()) != exclude_id)
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .find(|a| {
                let existing = match SlotCandidate::parse(
                    &a.date,
                    &a.time,
                    a.duration_or(self.config.default_duration_minutes),
                ) {
                    Ok(existing) => existing,
                    Err(e) => {
                        tracing::warn!(
                            appointment_id = %a.id,
                            error = %e,
                            "Skipping appointment with unparseable slot"
                        );
                        return false;
                    }
                };
                self.collides(candidate, &existing)
            })
    }

    pub fn is_occupied(
        &self,
        candidate: &SlotCandidate,
        appointments: &[Appointment],
        exclude_id: Option<&str>,
    ) -> bool {
        self.find_conflict(candidate, appointments, exclude_id)
            .is_some()
    }

    /// Booking grid for one day, from opening time up to closing time.
    pub fn day_slots(
        &self,
        date: NaiveDate,
        appointments: &[Appointment],
        exclude_id: Option<&str>,
    ) -> Vec<SlotAvailability> {
        let step = Duration::minutes(i64::from(self.config.slot_step_minutes.max(1)));
        let closing = date.and_time(self.config.closing);
        let mut cursor = date.and_time(self.config.opening);
        let mut slots = Vec::new();

        while cursor < closing {
            let candidate = SlotCandidate {
                start: cursor,
                duration_minutes: self.config.default_duration_minutes,
            };
            slots.push(SlotAvailability {
                time: format_time(cursor.time()),
                occupied: self.is_occupied(&candidate, appointments, exclude_id),
            });
            cursor += step;
        }

        slots
    }

    fn collides(&self, a: &SlotCandidate, b: &SlotCandidate) -> bool {
        match self.config.overlap_policy {
            OverlapPolicy::ExactStart => a.start == b.start,
            // Identical starts collide even when a duration is zero.
            OverlapPolicy::Interval => {
                a.start == b.start || (a.start < b.end() && b.start < a.end())
            }
        }
    }
}

impl Default for SlotChecker {
    fn default() -> Self {
        Self::new(ScheduleConfig::default())
    }
}

/// Whether `(candidate_date, candidate_time)` is already taken by an
/// appointment other than `exclude_id`, under the default schedule.
///
/// A malformed candidate is an error, never a silent "free".
pub fn is_slot_occupied(
    candidate_date: &str,
    candidate_time: &str,
    appointments: &[Appointment],
    exclude_id: Option<&str>,
) -> Result<bool, ValidationError> {
    let checker = SlotChecker::default();
    let candidate = SlotCandidate::parse(
        candidate_date,
        candidate_time,
        checker.config().default_duration_minutes,
    )?;
    Ok(checker.is_occupied(&candidate, appointments, exclude_id))
}

/// Like [`is_slot_occupied`] but returns the colliding appointment.
pub fn find_conflict<'a>(
    candidate_date: &str,
    candidate_time: &str,
    appointments: &'a [Appointment],
    exclude_id: Option<&str>,
) -> Result<Option<&'a Appointment>, ValidationError> {
    let checker = SlotChecker::default();
    let candidate = SlotCandidate::parse(
        candidate_date,
        candidate_time,
        checker.config().default_duration_minutes,
    )?;
    Ok(checker.find_conflict(&candidate, appointments, exclude_id))
}

/// Day grid under the given schedule.
pub fn day_slots(
    date: NaiveDate,
    appointments: &[Appointment],
    exclude_id: Option<&str>,
    config: &ScheduleConfig,
) -> Vec<SlotAvailability> {
    SlotChecker::new(*config).day_slots(date, appointments, exclude_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientRef;

    fn appt(id: &str, date: &str, time: &str, duration: Option<u32>) -> Appointment {
        Appointment {
            id: id.into(),
            patient: PatientRef::Id(format!("p-{id}")),
            date: date.into(),
            time: time.into(),
            duration_minutes: duration,
            consultation_type: Some("Control".into()),
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            payment_plan: None,
        }
    }

    fn exact_checker() -> SlotChecker {
        SlotChecker::new(ScheduleConfig {
            overlap_policy: OverlapPolicy::ExactStart,
            ..ScheduleConfig::default()
        })
    }

    #[test]
    fn editing_an_appointment_does_not_conflict_with_itself() {
        let booked = vec![appt("x", "2025-08-03T00:00:00.000Z", "10:00", None)];
        assert!(!is_slot_occupied("2025-08-03", "10:00", &booked, Some("x")).unwrap());
    }

    #[test]
    fn new_appointment_on_a_taken_slot_conflicts() {
        let booked = vec![appt("x", "2025-08-03T00:00:00.000Z", "10:00", None)];
        assert!(is_slot_occupied("2025-08-03", "10:00", &booked, None).unwrap());
        assert!(is_slot_occupied("2025-08-03", "10:00", &booked, Some("y")).unwrap());
    }

    #[test]
    fn other_days_are_free() {
        let booked = vec![appt("x", "2025-08-03", "10:00", None)];
        assert!(!is_slot_occupied("2025-08-04", "10:00", &booked, None).unwrap());
    }

    #[test]
    fn interval_policy_catches_partial_overlap() {
        let booked = vec![appt("a", "2025-08-03", "10:00", Some(90))];
        // 10:30 starts inside a 90-minute visit.
        assert!(is_slot_occupied("2025-08-03", "10:30", &booked, None).unwrap());
        // 11:30 starts exactly when it ends.
        assert!(!is_slot_occupied("2025-08-03", "11:30", &booked, None).unwrap());
        // A 60-minute booking at 09:30 runs into 10:00.
        assert!(is_slot_occupied("2025-08-03", "09:30", &booked, None).unwrap());
        assert!(!is_slot_occupied("2025-08-03", "09:00", &booked, None).unwrap());
    }

    #[test]
    fn zero_duration_booking_still_holds_its_start() {
        let booked = vec![appt("a", "2025-08-03", "10:00", Some(0))];
        assert!(is_slot_occupied("2025-08-03", "10:00", &booked, Some("b")).unwrap());
        assert!(is_slot_occupied("2025-08-03", "10:00", &booked, None).unwrap());
        assert!(!is_slot_occupied("2025-08-03", "10:00", &booked, Some("a")).unwrap());

        let checker = SlotChecker::default();
        let empty = SlotCandidate::parse("2025-08-03", "10:00", 0).unwrap();
        assert!(checker.is_occupied(&empty, &booked, None));
    }

    #[test]
    fn exact_policy_only_matches_identical_starts() {
        let checker = exact_checker();
        let booked = vec![appt("a", "2025-08-03", "10:00", Some(90))];
        let same = SlotCandidate::parse("2025-08-03", "10:00", 60).unwrap();
        let later = SlotCandidate::parse("2025-08-03", "10:30", 60).unwrap();
        assert!(checker.is_occupied(&same, &booked, None));
        assert!(!checker.is_occupied(&later, &booked, None));
    }

    #[test]
    fn cancelled_appointments_free_their_slot() {
        let mut cancelled = appt("a", "2025-08-03", "10:00", None);
        cancelled.status = AppointmentStatus::Cancelled;
        assert!(!is_slot_occupied("2025-08-03", "10:00", &[cancelled], None).unwrap());
    }

    #[test]
    fn malformed_candidate_is_a_validation_error() {
        let booked = vec![appt("a", "2025-08-03", "10:00", None)];
        assert!(matches!(
            is_slot_occupied("03-08-2025", "10:00", &booked, None),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(matches!(
            is_slot_occupied("2025-08-03", "10", &booked, None),
            Err(ValidationError::InvalidTime(_))
        ));
    }

    #[test]
    fn malformed_stored_appointment_is_skipped() {
        let booked = vec![
            appt("bad", "2025-08-03", "diez", None),
            appt("good", "2025-08-03", "12:00", None),
        ];
        assert!(!is_slot_occupied("2025-08-03", "10:00", &booked, None).unwrap());
        let conflict = find_conflict("2025-08-03", "12:00", &booked, None).unwrap();
        assert_eq!(conflict.map(|a| a.id.as_str()), Some("good"));
    }

    #[test]
    fn day_grid_marks_occupied_cells() {
        let config = ScheduleConfig {
            overlap_policy: OverlapPolicy::ExactStart,
            ..ScheduleConfig::default()
        };
        let booked = vec![appt("a", "2025-08-03", "10:00", None)];
        let date = NaiveDate::from_ymd_opt(2025, 8, 3).unwrap();
        let grid = day_slots(date, &booked, None, &config);

        // 08:00 through 19:30 in half-hour steps.
        assert_eq!(grid.len(), 24);
        assert_eq!(grid.first().unwrap().time, "08:00");
        assert_eq!(grid.last().unwrap().time, "19:30");

        let occupied: Vec<&str> = grid
            .iter()
            .filter(|s| s.occupied)
            .map(|s| s.time.as_str())
            .collect();
        assert_eq!(occupied, vec!["10:00"]);

        let editing = day_slots(date, &booked, Some("a"), &config);
        assert!(editing.iter().all(|s| !s.occupied));
    }
}
