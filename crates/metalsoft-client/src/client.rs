//! Metalsoft API client
//!
//! Talks JSON-RPC 2.0 to the developer endpoint
//! (`https://<host>/api/developer/developer`). Every call is a POST whose body
//! names the method and carries positional params.

use crate::credentials::Credentials;
use crate::error::MetalsoftError;
use crate::metalsoft_trait::MetalsoftClientTrait;
use crate::models::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Metalsoft developer API client
pub struct MetalsoftClient {
    client: Client,
    endpoint: String,
    user_email: String,
    api_key: String,
    logging: bool,
    next_request_id: AtomicU64,
}

impl std::fmt::Debug for MetalsoftClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalsoftClient")
            .field("endpoint", &self.endpoint)
            .field("user_email", &self.user_email)
            .finish_non_exhaustive()
    }
}

impl MetalsoftClient {
    /// Create a new client from validated credentials
    pub fn new(credentials: Credentials) -> Result<Self, MetalsoftError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: credentials.endpoint,
            user_email: credentials.user_email,
            api_key: credentials.api_key,
            logging: credentials.logging,
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Issues one JSON-RPC call and decodes its result.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, MetalsoftError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_request_id.fetch_add(1, Ordering::Relaxed),
        };
        if self.logging {
            debug!("Metalsoft request: {}", serde_json::to_string(&request)?);
        } else {
            debug!("Calling Metalsoft method {}", method);
        }

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if self.logging {
            debug!("Metalsoft response ({}): {}", status, body);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(MetalsoftError::Credentials(format!(
                "{} rejected the API key for {}: {}",
                self.endpoint, self.user_email, status
            )));
        }

        // JSON-RPC errors come back with a 200 as well as with 4xx/5xx, so the
        // body decides.
        let decoded: RpcResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                MetalsoftError::Serialization(e)
            } else {
                MetalsoftError::InvalidResponse(format!("{} calling {}: {}", status, method, body))
            }
        })?;

        match (decoded.result, decoded.error) {
            (_, Some(err)) => Err(MetalsoftError::Api {
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(MetalsoftError::InvalidResponse(format!(
                "{} returned neither result nor error",
                method
            ))),
        }
    }
}

#[async_trait::async_trait]
impl MetalsoftClientTrait for MetalsoftClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create_infrastructure(&self, request: &CreateInfrastructureRequest) -> Result<Infrastructure, MetalsoftError> {
        self.call("infrastructure_create", json!([self.user_email, request])).await
    }

    async fn get_infrastructure(&self, id: u64) -> Result<Infrastructure, MetalsoftError> {
        self.call("infrastructure_get", json!([id])).await
    }

    async fn list_networks(&self, infrastructure_id: u64) -> Result<Networks, MetalsoftError> {
        // An infrastructure without networks comes back as [] rather than {}
        let raw: Value = self.call("networks", json!([infrastructure_id])).await?;
        match raw {
            Value::Array(items) if items.is_empty() => Ok(Networks::new()),
            other => Ok(serde_json::from_value(other)?),
        }
    }

    async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<Subnet, MetalsoftError> {
        self.call("subnet_create", json!([request.network_id, request])).await
    }

    async fn get_subnet(&self, id: u64) -> Result<Subnet, MetalsoftError> {
        self.call("subnet_get", json!([id])).await
    }

    async fn create_variable(&self, request: &CreateVariableRequest) -> Result<Variable, MetalsoftError> {
        self.call("variable_create", json!([self.user_email, request])).await
    }

    async fn get_variable(&self, id: u64) -> Result<Variable, MetalsoftError> {
        self.call("variable_get", json!([id])).await
    }
}
