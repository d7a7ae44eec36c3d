use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{normalize_date, parse_time, ValidationError};

use super::enums::AppointmentStatus;
use super::payment::PaymentPlan;

/// One scheduled visit as served by `GET /citas`.
///
/// `date` and `time` are kept as the raw strings the backend sent; they are
/// validated per item when used, so a single bad record cannot fail a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "pacienteId")]
    pub patient: PatientRef,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "duracion", default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(rename = "tipoConsulta", default, skip_serializing_if = "Option::is_none")]
    pub consultation_type: Option<String>,
    #[serde(rename = "estado", default)]
    pub status: AppointmentStatus,
    #[serde(rename = "motivo", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "pago", default, skip_serializing_if = "Option::is_none")]
    pub payment_plan: Option<PaymentPlan>,
}

impl Appointment {
    pub fn calendar_date(&self) -> Result<NaiveDate, ValidationError> {
        normalize_date(&self.date)
    }

    /// Start of the visit in local wall-clock time.
    pub fn starts_at(&self) -> Result<NaiveDateTime, ValidationError> {
        Ok(self.calendar_date()?.and_time(parse_time(&self.time)?))
    }

    pub fn duration_or(&self, default_minutes: u32) -> u32 {
        self.duration_minutes.unwrap_or(default_minutes)
    }

    pub fn consultation_label(&self) -> &str {
        self.consultation_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("consulta")
    }
}

/// `pacienteId` arrives either as a bare id or populated with the patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatientRef {
    Id(String),
    Populated {
        #[serde(rename = "_id")]
        id: String,
        #[serde(rename = "nombre", default)]
        first_name: Option<String>,
        #[serde(rename = "apellido", default)]
        last_name: Option<String>,
    },
}

impl PatientRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Populated { id, .. } => id,
        }
    }

    /// Full name when the reference was populated with one.
    pub fn embedded_name(&self) -> Option<String> {
        match self {
            Self::Id(_) => None,
            Self::Populated {
                first_name,
                last_name,
                ..
            } => {
                let parts: Vec<&str> = [first_name.as_deref(), last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
        }
    }
}

/// Label used when no name can be resolved for a patient.
pub const UNKNOWN_PATIENT: &str = "Paciente";

/// Patient id → display name, supplied by whoever loaded the patient list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientDirectory {
    names: HashMap<String, String>,
}

impl PatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, patient_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(patient_id.into(), name.into());
    }

    /// Resolve a display name: populated reference first, then the directory.
    pub fn display_name(&self, patient: &PatientRef) -> String {
        patient
            .embedded_name()
            .or_else(|| self.names.get(patient.id()).cloned())
            .unwrap_or_else(|| UNKNOWN_PATIENT.to_string())
    }
}

impl FromIterator<(String, String)> for PatientDirectory {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
