// ABOUTME: HTTP implementation of the fleet and platform traits.
// ABOUTME: JSON over hyper's pooled client; no retries, callers decide.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::api::{DesiredState, FleetApi, PlatformApi};
use super::error::FleetError;
use crate::types::{AppName, LaunchSpec, Machine, MachineId};

/// Fleet client speaking the JSON machine API.
#[derive(Clone)]
pub struct HttpFleet {
    client: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
}

impl HttpFleet {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), FleetError> {
        let uri = format!("{}{}", self.base_url, path);

        let mut builder = Request::builder().method(method).uri(&uri);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| FleetError::Transport(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| FleetError::Transport(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(|e| FleetError::Transport(e.to_string()))?
            .to_bytes();

        Ok((parts.status, bytes))
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, FleetError> {
        let (status, bytes) = self.request(method, path, body).await?;
        if !status.is_success() {
            return Err(api_error(status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|e| FleetError::InvalidResponse(e.to_string()))
    }

    async fn expect_ok(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(), FleetError> {
        let (status, bytes) = self.request(method, path, body).await?;
        if !status.is_success() {
            return Err(api_error(status, &bytes));
        }
        Ok(())
    }
}

/// Translate a non-2xx fleet response into an error, pulling the message
/// out of the standard `{"error": "..."}` envelope when present.
fn api_error(status: StatusCode, body: &[u8]) -> FleetError {
    #[derive(Deserialize)]
    struct Envelope {
        error: String,
    }

    let message = serde_json::from_slice::<Envelope>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string());

    FleetError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl FleetApi for HttpFleet {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Machine, FleetError> {
        let body = serde_json::to_vec(spec).map_err(|e| FleetError::InvalidResponse(e.to_string()))?;
        self.json(Method::POST, "/v1/machines", Some(body)).await
    }

    async fn get(&self, id: &MachineId) -> Result<Machine, FleetError> {
        self.json(Method::GET, &format!("/v1/machines/{id}"), None)
            .await
    }

    async fn list_machines(&self, app: &AppName) -> Result<Vec<Machine>, FleetError> {
        self.json(Method::GET, &format!("/v1/apps/{app}/machines"), None)
            .await
    }

    async fn uncordon(&self, id: &MachineId, reason: &str) -> Result<(), FleetError> {
        let body = serde_json::json!({ "reason": reason }).to_string().into_bytes();
        self.expect_ok(
            Method::POST,
            &format!("/v1/machines/{id}/uncordon"),
            Some(body),
        )
        .await
    }

    async fn cordon(&self, id: &MachineId) -> Result<(), FleetError> {
        self.expect_ok(Method::POST, &format!("/v1/machines/{id}/cordon"), None)
            .await
    }

    async fn stop(&self, id: &MachineId, signal: &str) -> Result<(), FleetError> {
        let body = serde_json::json!({ "signal": signal }).to_string().into_bytes();
        self.expect_ok(Method::POST, &format!("/v1/machines/{id}/stop"), Some(body))
            .await
    }

    async fn destroy(&self, id: &MachineId, force: bool) -> Result<(), FleetError> {
        self.expect_ok(
            Method::DELETE,
            &format!("/v1/machines/{id}?force={force}"),
            None,
        )
        .await
    }

    async fn wait_for_state(
        &self,
        id: &MachineId,
        desired: DesiredState,
        timeout: Duration,
    ) -> Result<(), FleetError> {
        let path = format!(
            "/v1/machines/{id}/wait?state={}&timeout={}",
            desired,
            timeout.as_secs()
        );

        let (status, bytes) = self.request(Method::GET, &path, None).await?;
        match status {
            StatusCode::REQUEST_TIMEOUT => Err(FleetError::WaitTimeout {
                id: id.clone(),
                state: desired.to_string(),
            }),
            s if s.is_success() => Ok(()),
            s => Err(api_error(s, &bytes)),
        }
    }

    async fn release_lease(&self, id: &MachineId) -> Result<(), FleetError> {
        self.expect_ok(Method::DELETE, &format!("/v1/machines/{id}/lease"), None)
            .await
    }
}

#[async_trait]
impl PlatformApi for HttpFleet {
    async fn can_perform_bluegreen_deployment(&self, app: &AppName) -> Result<bool, FleetError> {
        #[derive(Deserialize)]
        struct Eligibility {
            allowed: bool,
        }

        let eligibility: Eligibility = self
            .json(
                Method::GET,
                &format!("/v1/apps/{app}/capabilities/bluegreen"),
                None,
            )
            .await?;

        Ok(eligibility.allowed)
    }
}
