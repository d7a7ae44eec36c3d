//! Reminder session: ties the backend, the derivation engine and the store.
//!
//! - `reload`: fetch appointments, derive, merge into the store
//! - `acknowledge`: mark a notification read, optionally PATCH the status
//! - `remind_manually`: build a reminder for one appointment on request
//! - `send_reminder`: hand a reminder to a dispatch endpoint
//!
//! A failed fetch leaves the store and the cached appointments untouched.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use uuid::Uuid;

use crate::api::types::DispatchRequest;
use crate::api::{ApiError, ClinicBackend, ReminderChannel};
use crate::calendar::ClockSource;
use crate::config::ReminderConfig;
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, PatientDirectory};
use crate::reminders::{
    AppointmentSnapshot, DefaultReminderEngine, Notification, NotificationCategory,
    NotificationStore, PartialScanFailure, ReminderEngine, ReminderError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Upstream fetch failed: {0}")]
    Upstream(#[from] ApiError),

    #[error(transparent)]
    Reminder(#[from] ReminderError),
}

/// What one reload produced.
#[derive(Debug, Clone)]
pub struct ReloadOutcome {
    pub appointments: usize,
    /// Notifications the store did not already hold under the same key.
    pub added: usize,
    pub derived: usize,
    pub auto_surface: bool,
    pub skipped: Vec<PartialScanFailure>,
}

pub struct ReminderService<B, C> {
    backend: B,
    clock: C,
    engine: DefaultReminderEngine,
    store: Arc<NotificationStore>,
    snapshot: RwLock<AppointmentSnapshot>,
    last_error: RwLock<Option<String>>,
}

impl<B: ClinicBackend, C: ClockSource> ReminderService<B, C> {
    pub fn new(backend: B, clock: C, config: ReminderConfig) -> Self {
        Self {
            backend,
            clock,
            engine: DefaultReminderEngine::new(config),
            store: Arc::new(NotificationStore::new()),
            snapshot: RwLock::new(AppointmentSnapshot::default()),
            last_error: RwLock::new(None),
        }
    }

    pub fn store(&self) -> Arc<NotificationStore> {
        Arc::clone(&self.store)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the names used when rendering notifications.
    pub fn set_patients(&self, patients: PatientDirectory) -> Result<(), ServiceError> {
        let mut snapshot = self.snapshot.write().map_err(|_| ReminderError::LockFailed)?;
        snapshot.patients = patients;
        Ok(())
    }

    /// Appointments from the last successful reload.
    pub fn appointments(&self) -> Result<Vec<Appointment>, ServiceError> {
        let snapshot = self.snapshot.read().map_err(|_| ReminderError::LockFailed)?;
        Ok(snapshot.appointments.clone())
    }

    /// Message of the last failed reload, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().ok().and_then(|e| e.clone())
    }

    fn set_last_error(&self, error: Option<String>) {
        if let Ok(mut last) = self.last_error.write() {
            *last = error;
        }
    }

    fn find_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<(Appointment, PatientDirectory), ServiceError> {
        let snapshot = self.snapshot.read().map_err(|_| ReminderError::LockFailed)?;
        let appointment = snapshot
            .get(appointment_id)
            .cloned()
            .ok_or_else(|| ReminderError::AppointmentNotFound(appointment_id.to_string()))?;
        Ok((appointment, snapshot.patients.clone()))
    }

    /// Fetch, derive and merge. On a fetch error nothing local changes.
    pub async fn reload(&self) -> Result<ReloadOutcome, ServiceError> {
        let appointments = match self.backend.fetch_appointments().await {
            Ok(appointments) => appointments,
            Err(e) => {
                tracing::warn!(error = %e, "Appointment reload failed, keeping previous notifications");
                self.set_last_error(Some(e.to_string()));
                return Err(e.into());
            }
        };

        let snapshot = {
            let mut current = self.snapshot.write().map_err(|_| ReminderError::LockFailed)?;
            current.appointments = appointments;
            current.clone()
        };

        let result = self.engine.derive_with_clock(&snapshot, &self.clock);
        let derived = result.notifications.len();
        let added = self.store.merge_derived(result.notifications)?;
        self.set_last_error(None);

        tracing::info!(
            appointments = snapshot.appointments.len(),
            derived,
            added,
            skipped = result.skipped.len(),
            "Reminders reloaded"
        );

        Ok(ReloadOutcome {
            appointments: snapshot.appointments.len(),
            added,
            derived,
            auto_surface: result.auto_surface,
            skipped: result.skipped,
        })
    }

    /// Mark a notification read; with `new_status`, also move its
    /// appointment to that status on the backend.
    pub async fn acknowledge(
        &self,
        notification_id: &Uuid,
        new_status: Option<AppointmentStatus>,
    ) -> Result<(), ServiceError> {
        let notification = self
            .store
            .get(notification_id)?
            .ok_or(ReminderError::NotificationNotFound(*notification_id))?;

        if let Some(status) = new_status {
            self.backend
                .update_status(&notification.appointment_id, status)
                .await?;
            let mut snapshot = self.snapshot.write().map_err(|_| ReminderError::LockFailed)?;
            if let Some(appt) = snapshot
                .appointments
                .iter_mut()
                .find(|a| a.id == notification.appointment_id)
            {
                appt.status = status;
            }
        }

        self.store.mark_read(notification_id)?;
        Ok(())
    }

    /// Build a reminder for one loaded appointment and put it on top.
    pub fn remind_manually(
        &self,
        appointment_id: &str,
        category: NotificationCategory,
    ) -> Result<Notification, ServiceError> {
        let (appointment, patients) = self.find_appointment(appointment_id)?;
        let notification = self.engine.create_manual_reminder(
            &appointment,
            &patients,
            category,
            self.clock.now(),
        )?;
        self.store.add(notification.clone())?;
        Ok(notification)
    }

    /// Send a reminder for one appointment through a delivery channel.
    /// A payment link carries the overdue template and is refused with
    /// `NothingOverdue` when the plan owes nothing; other channels carry the
    /// scheduled one.
    pub async fn send_reminder(
        &self,
        appointment_id: &str,
        channel: ReminderChannel,
    ) -> Result<(), ServiceError> {
        let (appointment, patients) = self.find_appointment(appointment_id)?;
        let category = match channel {
            ReminderChannel::MercadoPago => NotificationCategory::PaymentOverdue,
            ReminderChannel::Alert | ReminderChannel::Email => {
                NotificationCategory::AppointmentScheduled
            }
        };
        let notification = self.engine.create_manual_reminder(
            &appointment,
            &patients,
            category,
            self.clock.now(),
        )?;

        let request = DispatchRequest {
            appointment_id: appointment.id.clone(),
            patient_id: appointment.patient.id().to_string(),
            title: notification.title,
            message: notification.message,
        };
        self.backend.dispatch_reminder(channel, &request).await?;

        tracing::info!(
            appointment_id = %appointment.id,
            channel = channel.path(),
            "Reminder dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::api::types::{CreatePlanRequest, EditInstallmentRequest};
    use crate::calendar::FixedClock;
    use crate::models::enums::InstallmentState;
    use crate::models::{PatientRef, PaymentInstallment, PaymentPlan};

    /// Backend double: serves a fixed list, records calls, can be told to fail.
    #[derive(Default)]
    struct MockBackend {
        appointments: Mutex<Vec<Appointment>>,
        fail_fetch: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl MockBackend {
        fn with(appointments: Vec<Appointment>) -> Self {
            Self {
                appointments: Mutex::new(appointments),
                ..Self::default()
            }
        }

        fn set_failing(&self, failing: bool) {
            *self.fail_fetch.lock().unwrap() = failing;
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ClinicBackend for MockBackend {
        async fn fetch_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
            if *self.fail_fetch.lock().unwrap() {
                return Err(ApiError::Connection("http://mock".into()));
            }
            Ok(self.appointments.lock().unwrap().clone())
        }

        async fn update_status(
            &self,
            appointment_id: &str,
            status: AppointmentStatus,
        ) -> Result<(), ApiError> {
            self.record(format!("estado {appointment_id} {status}"));
            Ok(())
        }

        async fn create_payment_plan(
            &self,
            appointment_id: &str,
            _request: &CreatePlanRequest,
        ) -> Result<(), ApiError> {
            self.record(format!("plan {appointment_id}"));
            Ok(())
        }

        async fn confirm_installment(
            &self,
            appointment_id: &str,
            number: u32,
            _payment_method: &str,
        ) -> Result<(), ApiError> {
            self.record(format!("confirmar {appointment_id} {number}"));
            Ok(())
        }

        async fn edit_installment(
            &self,
            appointment_id: &str,
            number: u32,
            _request: &EditInstallmentRequest,
        ) -> Result<(), ApiError> {
            self.record(format!("editar {appointment_id} {number}"));
            Ok(())
        }

        async fn delete_installment(
            &self,
            appointment_id: &str,
            number: u32,
        ) -> Result<(), ApiError> {
            self.record(format!("borrar {appointment_id} {number}"));
            Ok(())
        }

        async fn dispatch_reminder(
            &self,
            channel: ReminderChannel,
            request: &DispatchRequest,
        ) -> Result<(), ApiError> {
            self.record(format!("{} {}", channel.path(), request.appointment_id));
            Ok(())
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 3)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap()
    }

    fn make_appointment(id: &str, time: &str) -> Appointment {
        Appointment {
            id: id.into(),
            patient: PatientRef::Id(format!("p-{id}")),
            date: "2025-08-03".into(),
            time: time.into(),
            duration_minutes: None,
            consultation_type: Some("Control".into()),
            status: AppointmentStatus::Scheduled,
            reason: None,
            notes: None,
            payment_plan: None,
        }
    }

    fn service(appointments: Vec<Appointment>) -> ReminderService<MockBackend, FixedClock> {
        ReminderService::new(
            MockBackend::with(appointments),
            FixedClock(now()),
            ReminderConfig::default(),
        )
    }

    #[tokio::test]
    async fn reload_populates_store() {
        let svc = service(vec![make_appointment("a", "14:00"), make_appointment("b", "18:00")]);

        let outcome = svc.reload().await.unwrap();

        assert_eq!(outcome.appointments, 2);
        assert_eq!(outcome.derived, 2);
        assert_eq!(outcome.added, 2);
        assert!(outcome.auto_surface);
        assert_eq!(svc.store().unread_count().unwrap(), 2);
        assert!(svc.last_error().is_none());
    }

    #[tokio::test]
    async fn repeated_reloads_do_not_accumulate_duplicates() {
        let svc = service(vec![make_appointment("a", "14:00")]);

        svc.reload().await.unwrap();
        let second = svc.reload().await.unwrap();

        assert_eq!(second.added, 0);
        assert_eq!(svc.store().list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_state() {
        let svc = service(vec![make_appointment("a", "14:00")]);
        svc.reload().await.unwrap();
        let before = svc.store().list().unwrap();

        svc.backend().set_failing(true);
        let err = svc.reload().await.unwrap_err();

        assert!(matches!(err, ServiceError::Upstream(ApiError::Connection(_))));
        assert_eq!(svc.store().list().unwrap(), before);
        assert_eq!(svc.appointments().unwrap().len(), 1);
        assert!(svc.last_error().unwrap().contains("mock"));

        svc.backend().set_failing(false);
        svc.reload().await.unwrap();
        assert!(svc.last_error().is_none());
    }

    #[tokio::test]
    async fn skipped_items_are_reported_not_thrown() {
        let svc = service(vec![make_appointment("bad", "mediodía"), make_appointment("ok", "14:00")]);

        let outcome = svc.reload().await.unwrap();

        assert_eq!(outcome.derived, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].appointment_id, "bad");
    }

    #[tokio::test]
    async fn acknowledge_marks_read_and_patches_status() {
        let svc = service(vec![make_appointment("a", "14:00")]);
        svc.reload().await.unwrap();
        let id = svc.store().list().unwrap()[0].id;

        svc.acknowledge(&id, Some(AppointmentStatus::InProgress))
            .await
            .unwrap();

        assert_eq!(svc.store().unread_count().unwrap(), 0);
        assert_eq!(svc.backend().calls(), vec!["estado a En curso".to_string()]);
        assert_eq!(svc.appointments().unwrap()[0].status, AppointmentStatus::InProgress);
    }

    #[tokio::test]
    async fn acknowledge_unknown_notification_fails() {
        let svc = service(vec![]);
        let err = svc.acknowledge(&Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Reminder(ReminderError::NotificationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn manual_reminder_is_prepended_without_dedup() {
        let svc = service(vec![make_appointment("a", "14:00")]);
        let mut names = PatientDirectory::new();
        names.insert("p-a", "Ana Gómez");
        svc.set_patients(names).unwrap();
        svc.reload().await.unwrap();

        let manual = svc
            .remind_manually("a", NotificationCategory::AppointmentImminent)
            .unwrap();

        let list = svc.store().list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, manual.id);
        assert!(manual.message.contains("Ana Gómez"));
    }

    #[tokio::test]
    async fn manual_reminder_for_unknown_appointment() {
        let svc = service(vec![]);
        assert!(matches!(
            svc.remind_manually("zz", NotificationCategory::AppointmentScheduled),
            Err(ServiceError::Reminder(ReminderError::AppointmentNotFound(_)))
        ));
    }

    fn owing(mut appointment: Appointment) -> Appointment {
        appointment.payment_plan = Some(PaymentPlan {
            plan_type: "mensual".into(),
            installments: vec![PaymentInstallment {
                number: 1,
                amount: 5000.0,
                state: InstallmentState::Pending,
                payment_method: "pendiente".into(),
                due_date: "2025-07-01".into(),
                paid_at: None,
                created_at: "2025-06-01T10:00:00.000Z".into(),
            }],
        });
        appointment
    }

    /// Clock the test can move between reloads.
    struct SteppedClock(Mutex<NaiveDateTime>);

    impl SteppedClock {
        fn set(&self, hour: u32) {
            *self.0.lock().unwrap() = now().date().and_hms_opt(hour, 0, 0).unwrap();
        }
    }

    impl ClockSource for SteppedClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn reloads_through_the_day_keep_one_schedule_reminder() {
        let svc = ReminderService::new(
            MockBackend::with(vec![make_appointment("a", "14:00")]),
            SteppedClock(Mutex::new(now())),
            ReminderConfig::default(),
        );
        let expected = [
            (9, NotificationCategory::AppointmentToday, "Faltan 5 h."),
            (13, NotificationCategory::AppointmentImminent, "Faltan 1 h."),
            (15, NotificationCategory::AppointmentMissed, "Hace 1 h."),
        ];

        for (hour, category, detail) in expected {
            svc.clock.set(hour);
            svc.reload().await.unwrap();

            let list = svc.store().list().unwrap();
            assert_eq!(list.len(), 1, "at {hour}:00");
            assert_eq!(list[0].category, category);
            assert_eq!(list[0].detail, detail);
        }
    }

    #[tokio::test]
    async fn reminders_that_no_longer_apply_are_dropped() {
        let svc = service(vec![owing(make_appointment("a", "14:00"))]);
        svc.reload().await.unwrap();
        let manual = svc
            .remind_manually("a", NotificationCategory::AppointmentScheduled)
            .unwrap();
        assert_eq!(svc.store().list().unwrap().len(), 3);

        // Attended and paid in the meantime.
        {
            let mut appointments = svc.backend().appointments.lock().unwrap();
            appointments[0].status = AppointmentStatus::Completed;
            appointments[0].payment_plan = None;
        }
        svc.reload().await.unwrap();

        let list = svc.store().list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, manual.id);
    }

    #[tokio::test]
    async fn payment_link_requires_an_overdue_installment() {
        let svc = service(vec![make_appointment("a", "14:00")]);
        svc.reload().await.unwrap();

        let err = svc
            .send_reminder("a", ReminderChannel::MercadoPago)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Reminder(ReminderError::NothingOverdue(_))
        ));
        assert!(svc.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn send_reminder_dispatches_to_channel() {
        let svc = service(vec![owing(make_appointment("a", "14:00"))]);
        svc.reload().await.unwrap();

        svc.send_reminder("a", ReminderChannel::Alert).await.unwrap();
        svc.send_reminder("a", ReminderChannel::MercadoPago).await.unwrap();

        assert_eq!(
            svc.backend().calls(),
            vec!["/alerta a".to_string(), "/mercadopago a".to_string()]
        );
    }
}
