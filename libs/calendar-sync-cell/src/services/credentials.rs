// libs/calendar-sync-cell/src/services/credentials.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CalendarCredentials, CalendarSyncError, TokenRefreshResponse};

/// Loads a professional's stored OAuth credentials and keeps the access token
/// fresh through the refresh-token grant.
pub struct CredentialService {
    supabase: Arc<SupabaseClient>,
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl CredentialService {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Result<Self, CalendarSyncError> {
        if !config.is_calendar_sync_configured() {
            return Err(CalendarSyncError::NotConfigured);
        }

        let http = Client::builder()
            .timeout(StdDuration::from_secs(config.calendar_sync_timeout_secs))
            .build()?;

        Ok(Self {
            supabase,
            http,
            token_url: config.google_oauth_token_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
        })
    }

    /// A usable access token, refreshed first when it expires within the skew.
    pub async fn access_token(&self, professional_id: Uuid, auth_token: &str) -> Result<String, CalendarSyncError> {
        let credentials = self.load(professional_id, auth_token).await?;

        if credentials.needs_refresh(Utc::now()) {
            debug!("Access token for professional {} is expiring, refreshing", professional_id);
            return self.refresh(&credentials, auth_token).await;
        }
        Ok(credentials.access_token)
    }

    /// Refresh regardless of the stored expiry. Used after the calendar
    /// rejects a token that looked valid.
    pub async fn force_refresh(&self, professional_id: Uuid, auth_token: &str) -> Result<String, CalendarSyncError> {
        let credentials = self.load(professional_id, auth_token).await?;
        self.refresh(&credentials, auth_token).await
    }

    async fn load(&self, professional_id: Uuid, auth_token: &str) -> Result<CalendarCredentials, CalendarSyncError> {
        let path = format!("/rest/v1/calendar_credentials?professional_id=eq.{}", professional_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Err(CalendarSyncError::CredentialsMissing(professional_id)),
        }
    }

    async fn refresh(&self, credentials: &CalendarCredentials, auth_token: &str) -> Result<String, CalendarSyncError> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CalendarSyncError::TokenRefresh("no refresh token stored".to_string()))?;

        let form = format!(
            "client_id={}&client_secret={}&refresh_token={}&grant_type=refresh_token",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret),
            urlencoding::encode(refresh_token),
        );

        let response = self.http
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!("Token refresh for professional {} failed: {} - {}", credentials.professional_id, status, text);
            return Err(CalendarSyncError::TokenRefresh(format!("HTTP {}: {}", status, text)));
        }

        let refreshed: TokenRefreshResponse = serde_json::from_str(&text)
            .map_err(|e| CalendarSyncError::TokenRefresh(format!("Failed to parse token response: {}", e)))?;
        let expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);

        let path = format!("/rest/v1/calendar_credentials?professional_id=eq.{}", credentials.professional_id);
        let update = json!({
            "access_token": refreshed.access_token,
            "expires_at": expires_at.to_rfc3339()
        });
        let _: Value = self.supabase.request(Method::PATCH, &path, Some(auth_token), Some(update)).await?;

        info!("Refreshed calendar access token for professional {}", credentials.professional_id);
        Ok(refreshed.access_token)
    }
}
