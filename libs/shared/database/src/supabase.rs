use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// PostgreSQL SQLSTATE codes that PostgREST surfaces for constraint violations.
pub const EXCLUSION_VIOLATION: &str = "23P01";
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Constraint conflict ({code}): {message}")]
    Conflict { code: String, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SupabaseError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, SupabaseError::Conflict { .. })
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(&self.anon_key)
                .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| SupabaseError::InvalidHeader(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(Self::classify_error(status, error_text));
        }

        // DELETE and PATCH without a representation come back empty.
        let text = response.text().await?;
        let data = if text.trim().is_empty() {
            serde_json::from_value(Value::Null)?
        } else {
            serde_json::from_str(&text)?
        };
        Ok(data)
    }

    /// Request that asks PostgREST to return the affected rows.
    pub async fn request_returning<T>(&self, method: Method, path: &str,
                                      auth_token: Option<&str>, body: Option<Value>)
                                      -> Result<Vec<T>, SupabaseError>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(method, path, auth_token, body, Some(headers)).await
    }

    /// Call a database function through `/rest/v1/rpc/{function}`. The function
    /// runs inside a single transaction on the database side.
    pub async fn rpc<T>(&self, function: &str, auth_token: Option<&str>, args: Value)
                        -> Result<T, SupabaseError>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, auth_token, Some(args)).await
    }

    fn classify_error(status: StatusCode, error_text: String) -> SupabaseError {
        let parsed: Option<Value> = serde_json::from_str(&error_text).ok();
        let code = parsed
            .as_ref()
            .and_then(|body| body["code"].as_str())
            .unwrap_or_default()
            .to_string();
        let message = parsed
            .as_ref()
            .and_then(|body| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error_text.clone());

        if status == StatusCode::CONFLICT || code == EXCLUSION_VIOLATION || code == UNIQUE_VIOLATION {
            return SupabaseError::Conflict { code, message };
        }

        match status.as_u16() {
            401 | 403 => SupabaseError::Auth(message),
            404 => SupabaseError::NotFound(message),
            _ => SupabaseError::Api { status: status.as_u16(), message },
        }
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
