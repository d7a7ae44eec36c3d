//! Request bodies and the backend trait for the clinic REST API.

use serde::{Deserialize, Serialize};

use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

use super::error::ApiError;

// ═══════════════════════════════════════════════════════════
// Request bodies (wire field names)
// ═══════════════════════════════════════════════════════════

/// `PATCH /citas/:id/estado`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
}

/// `POST /citas/:id/pagos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlanRequest {
    #[serde(rename = "tipoPlan")]
    pub plan_type: String,
    #[serde(rename = "montoPorSesion")]
    pub amount_per_session: f64,
}

/// `PATCH /citas/:id/pagos/:numeroPago/confirmar`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmInstallmentRequest {
    #[serde(rename = "metodoPago")]
    pub payment_method: String,
}

/// `PUT /citas/:id/pagos/:numeroPago`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditInstallmentRequest {
    #[serde(rename = "monto")]
    pub amount: f64,
    /// `YYYY-MM-DD`
    #[serde(rename = "fechaVencimiento")]
    pub due_date: String,
}

/// Body posted to a reminder dispatch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    #[serde(rename = "citaId")]
    pub appointment_id: String,
    #[serde(rename = "pacienteId")]
    pub patient_id: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "mensaje")]
    pub message: String,
}

/// Side channel that delivers a reminder to the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    /// WhatsApp alert.
    Alert,
    /// MercadoPago payment link.
    MercadoPago,
    Email,
}

impl ReminderChannel {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Alert => "/alerta",
            Self::MercadoPago => "/mercadopago",
            Self::Email => "/email",
        }
    }
}

// ═══════════════════════════════════════════════════════════
// ClinicBackend: the installment lifecycle boundary
// ═══════════════════════════════════════════════════════════

/// Everything the core asks of the backend. Installment generation and
/// reminder delivery happen on the other side of this trait.
#[allow(async_fn_in_trait)]
pub trait ClinicBackend {
    /// `GET /citas`
    async fn fetch_appointments(&self) -> Result<Vec<Appointment>, ApiError>;

    /// `PATCH /citas/:id/estado`
    async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<(), ApiError>;

    /// `POST /citas/:id/pagos`
    async fn create_payment_plan(
        &self,
        appointment_id: &str,
        request: &CreatePlanRequest,
    ) -> Result<(), ApiError>;

    /// `PATCH /citas/:id/pagos/:numeroPago/confirmar`
    async fn confirm_installment(
        &self,
        appointment_id: &str,
        number: u32,
        payment_method: &str,
    ) -> Result<(), ApiError>;

    /// `PUT /citas/:id/pagos/:numeroPago`
    async fn edit_installment(
        &self,
        appointment_id: &str,
        number: u32,
        request: &EditInstallmentRequest,
    ) -> Result<(), ApiError>;

    /// `DELETE /citas/:id/pagos/:numeroPago`
    async fn delete_installment(&self, appointment_id: &str, number: u32) -> Result<(), ApiError>;

    /// Fire-and-forget delivery through one of the dispatch endpoints.
    async fn dispatch_reminder(
        &self,
        channel: ReminderChannel,
        request: &DispatchRequest,
    ) -> Result<(), ApiError>;
}
