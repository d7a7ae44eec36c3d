use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{normalize_date, ValidationError};

use super::enums::InstallmentState;

/// Installment plan attached to an appointment (`pago`).
///
/// Installments are generated server-side; `plan_type` (`sesion`,
/// `quincenal`, `mensual`) is carried as an opaque label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    #[serde(rename = "tipoPlan")]
    pub plan_type: String,
    #[serde(rename = "pagos", default)]
    pub installments: Vec<PaymentInstallment>,
}

impl PaymentPlan {
    /// Installments by `numeroPago` ascending, whatever order they arrived in.
    pub fn ordered(&self) -> Vec<&PaymentInstallment> {
        let mut ordered: Vec<&PaymentInstallment> = self.installments.iter().collect();
        ordered.sort_by_key(|i| i.number);
        ordered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInstallment {
    #[serde(rename = "numeroPago")]
    pub number: u32,
    #[serde(rename = "monto")]
    pub amount: f64,
    #[serde(rename = "estado", default)]
    pub state: InstallmentState,
    #[serde(rename = "metodoPago", default)]
    pub payment_method: String,
    #[serde(rename = "fechaVencimiento")]
    pub due_date: String,
    #[serde(rename = "fechaPago", default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(rename = "fechaCreacion", default)]
    pub created_at: String,
}

impl PaymentInstallment {
    pub fn due_on(&self) -> Result<NaiveDate, ValidationError> {
        normalize_date(&self.due_date)
    }

    /// State as of `today`: a pending installment due strictly before today
    /// is overdue even while the persisted `estado` still says `pendiente`.
    /// Due dates are whole calendar days, so one due today is not yet overdue.
    pub fn effective_state(&self, today: NaiveDate) -> Result<InstallmentState, ValidationError> {
        match self.state {
            InstallmentState::Pending if self.due_on()? < today => Ok(InstallmentState::Overdue),
            state => Ok(state),
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> Result<bool, ValidationError> {
        Ok(self.effective_state(today)? == InstallmentState::Overdue)
    }
}
