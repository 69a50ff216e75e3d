use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_calendar_base_url: String,
    pub google_oauth_token_url: String,
    pub google_calendar_id: String,
    pub calendar_timezone: String,
    pub calendar_sync_timeout_secs: u64,
    pub default_phone_country_code: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .unwrap_or_else(|_| {
                    warn!("GOOGLE_CLIENT_ID not set, calendar sync disabled");
                    String::new()
                }),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("GOOGLE_CLIENT_SECRET not set, calendar sync disabled");
                    String::new()
                }),
            google_calendar_base_url: env::var("GOOGLE_CALENDAR_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            google_oauth_token_url: env::var("GOOGLE_OAUTH_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|_| "primary".to_string()),
            calendar_timezone: env::var("CALENDAR_TIMEZONE")
                .unwrap_or_else(|_| {
                    warn!("CALENDAR_TIMEZONE not set, using default");
                    "Europe/Madrid".to_string()
                }),
            calendar_sync_timeout_secs: env::var("CALENDAR_SYNC_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(10),
            default_phone_country_code: env::var("DEFAULT_PHONE_COUNTRY_CODE")
                .unwrap_or_else(|_| "34".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_calendar_sync_configured(&self) -> bool {
        !self.google_client_id.is_empty()
            && !self.google_client_secret.is_empty()
            && !self.google_calendar_base_url.is_empty()
            && !self.google_oauth_token_url.is_empty()
    }
}
