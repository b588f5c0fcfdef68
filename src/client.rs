//! # API Client Module
//!
//! Hand-written, fully-typed client for the authorization service, one
//! method per HTTP endpoint. Applications embed this instead of talking to
//! the wire format themselves; the tenant key is injected as the bearer
//! credential on every call and the response envelope is unwrapped into
//! typed results.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::models::{HealthResponse, MembershipInfo, PermissionInfo, RoleInfo, RoleName};

/// Client-side failure: transport, or a non-2xx envelope from the service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {code}: {message}")]
    Api { code: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Typed API object for the authorization service.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AuthClient {
    /// Build a client for `base_url` (no trailing slash) acting as the
    /// tenant identified by `api_key`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Issue a request and unwrap the response envelope's `data` member.
    async fn send(&self, method: Method, path: &str) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            let message = body["message"].as_str().unwrap_or("unknown error").to_string();
            return Err(ClientError::Api {
                code: status.as_u16(),
                message,
            });
        }
        Ok(body["data"].clone())
    }

    fn parse<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ClientError> {
        serde_json::from_value(value).map_err(|e| ClientError::Shape(e.to_string()))
    }

    fn as_bool(value: &Value, key: &str) -> Result<bool, ClientError> {
        value[key]
            .as_bool()
            .ok_or_else(|| ClientError::Shape(format!("missing boolean '{key}'")))
    }

    /// `GET /ping`
    pub async fn ping(&self) -> Result<String, ClientError> {
        let url = format!("{}/ping", self.base_url);
        let body: Value = self.http.get(&url).send().await?.json().await?;
        Ok(body["message"].as_str().unwrap_or_default().to_string())
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::Api {
                code: response.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }
        Ok(response.json().await?)
    }

    /// `POST /api/role/{role}`
    pub async fn create_role(&self, role: &str) -> Result<bool, ClientError> {
        let data = self.send(Method::POST, &format!("/api/role/{role}")).await?;
        Self::as_bool(&data, "result")
    }

    /// `DELETE /api/role/{role}`
    pub async fn delete_role(&self, role: &str) -> Result<bool, ClientError> {
        let data = self.send(Method::DELETE, &format!("/api/role/{role}")).await?;
        Self::as_bool(&data, "result")
    }

    /// `GET /api/roles`
    pub async fn get_roles(&self) -> Result<Vec<RoleInfo>, ClientError> {
        let data = self.send(Method::GET, "/api/roles").await?;
        Self::parse(data["result"].clone())
    }

    /// `POST /api/permission/{role}/{name}`
    pub async fn add_permission(&self, role: &str, name: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::POST, &format!("/api/permission/{role}/{name}"))
            .await?;
        Self::as_bool(&data, "result")
    }

    /// `GET /api/permission/{role}/{name}`
    pub async fn has_permission(&self, role: &str, name: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/permission/{role}/{name}"))
            .await?;
        Self::as_bool(&data, "result")
    }

    /// `DELETE /api/permission/{role}/{name}`
    pub async fn del_permission(&self, role: &str, name: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::DELETE, &format!("/api/permission/{role}/{name}"))
            .await?;
        Self::as_bool(&data, "result")
    }

    /// `POST /api/membership/{user}/{role}`
    pub async fn add_membership(&self, user: &str, role: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::POST, &format!("/api/membership/{user}/{role}"))
            .await?;
        Self::as_bool(&data, "result")
    }

    /// `GET /api/membership/{user}/{role}`
    pub async fn has_membership(&self, user: &str, role: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/membership/{user}/{role}"))
            .await?;
        Self::as_bool(&data, "result")
    }

    /// `DELETE /api/membership/{user}/{role}`
    pub async fn del_membership(&self, user: &str, role: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::DELETE, &format!("/api/membership/{user}/{role}"))
            .await?;
        Self::as_bool(&data, "result")
    }

    /// `GET /api/has_permission/{user}/{name}`
    pub async fn user_has_permission(&self, user: &str, name: &str) -> Result<bool, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/has_permission/{user}/{name}"))
            .await?;
        Self::as_bool(&data, "has_permission")
    }

    /// `GET /api/user_permissions/{user}`
    pub async fn get_user_permissions(
        &self,
        user: &str,
    ) -> Result<Vec<PermissionInfo>, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/user_permissions/{user}"))
            .await?;
        Self::parse(data["permissions"].clone())
    }

    /// `GET /api/role_permissions/{role}`
    pub async fn get_role_permissions(
        &self,
        role: &str,
    ) -> Result<Vec<PermissionInfo>, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/role_permissions/{role}"))
            .await?;
        Self::parse(data)
    }

    /// `GET /api/user_roles/{user}`
    pub async fn get_user_roles(&self, user: &str) -> Result<Vec<MembershipInfo>, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/user_roles/{user}"))
            .await?;
        Self::parse(data)
    }

    /// `GET /api/members/{role}`
    pub async fn get_role_members(&self, role: &str) -> Result<Vec<MembershipInfo>, ClientError> {
        let data = self.send(Method::GET, &format!("/api/members/{role}")).await?;
        Self::parse(data)
    }

    /// `GET /api/which_roles_can/{name}`
    pub async fn which_roles_can(&self, name: &str) -> Result<Vec<RoleName>, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/which_roles_can/{name}"))
            .await?;
        Self::parse(data)
    }

    /// `GET /api/which_users_can/{name}`
    pub async fn which_users_can(&self, name: &str) -> Result<Vec<MembershipInfo>, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/which_users_can/{name}"))
            .await?;
        Self::parse(data)
    }

    /// `GET /api/workflow/users/{workflow_name}`
    pub async fn workflow_users(
        &self,
        workflow_name: &str,
    ) -> Result<Vec<MembershipInfo>, ClientError> {
        let data = self
            .send(Method::GET, &format!("/api/workflow/users/{workflow_name}"))
            .await?;
        Self::parse(data["members"].clone())
    }

    /// `GET /api/workflow/user/{user}/can_run/{workflow_name}`
    pub async fn user_can_run_workflow(
        &self,
        user: &str,
        workflow_name: &str,
    ) -> Result<bool, ClientError> {
        let data = self
            .send(
                Method::GET,
                &format!("/api/workflow/user/{user}/can_run/{workflow_name}"),
            )
            .await?;
        Self::as_bool(&data, "has_permission")
    }
}
