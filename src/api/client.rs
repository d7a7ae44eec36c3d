use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use crate::config::ApiConfig;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

use super::error::ApiError;
use super::types::{
    ClinicBackend, ConfirmInstallmentRequest, CreatePlanRequest, DispatchRequest,
    EditInstallmentRequest, ReminderChannel, StatusUpdate,
};

/// HTTP client for the clinic REST backend.
pub struct ClinicApiClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ClinicApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_connect() {
            ApiError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ApiError::Timeout(self.timeout_secs)
        } else {
            ApiError::HttpClient(e.to_string())
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Issue a request whose response body is not needed.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = self.send_error(e);
            tracing::warn!(method = %method, path, error = %err, "Backend request failed");
            err
        })?;

        Self::ensure_success(response).await.map_err(|err| {
            tracing::warn!(method = %method, path, error = %err, "Backend rejected request");
            err
        })?;
        Ok(())
    }
}

impl ClinicBackend for ClinicApiClient {
    async fn fetch_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        let response = self
            .client
            .get(self.url("/citas"))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let response = Self::ensure_success(response).await?;

        let appointments: Vec<Appointment> = response
            .json()
            .await
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))?;

        tracing::debug!(count = appointments.len(), "Fetched appointments");
        Ok(appointments)
    }

    async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<(), ApiError> {
        self.send(
            Method::PATCH,
            &format!("/citas/{appointment_id}/estado"),
            Some(&StatusUpdate { status }),
        )
        .await
    }

    async fn create_payment_plan(
        &self,
        appointment_id: &str,
        request: &CreatePlanRequest,
    ) -> Result<(), ApiError> {
        self.send(
            Method::POST,
            &format!("/citas/{appointment_id}/pagos"),
            Some(request),
        )
        .await
    }

    async fn confirm_installment(
        &self,
        appointment_id: &str,
        number: u32,
        payment_method: &str,
    ) -> Result<(), ApiError> {
        let body = ConfirmInstallmentRequest {
            payment_method: payment_method.to_string(),
        };
        self.send(
            Method::PATCH,
            &format!("/citas/{appointment_id}/pagos/{number}/confirmar"),
            Some(&body),
        )
        .await
    }

    async fn edit_installment(
        &self,
        appointment_id: &str,
        number: u32,
        request: &EditInstallmentRequest,
    ) -> Result<(), ApiError> {
        self.send(
            Method::PUT,
            &format!("/citas/{appointment_id}/pagos/{number}"),
            Some(request),
        )
        .await
    }

    async fn delete_installment(&self, appointment_id: &str, number: u32) -> Result<(), ApiError> {
        self.send::<()>(
            Method::DELETE,
            &format!("/citas/{appointment_id}/pagos/{number}"),
            None,
        )
        .await
    }

    async fn dispatch_reminder(
        &self,
        channel: ReminderChannel,
        request: &DispatchRequest,
    ) -> Result<(), ApiError> {
        self.send(Method::POST, channel.path(), Some(request)).await
    }
}
