// libs/appointment-cell/src/services/client.rs
use std::sync::{Arc, LazyLock};

use regex::Regex;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, Client, ClientContact, NormalizedPhone};

static FORMATTING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-().]").unwrap());
static DIALABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\+|00)?[0-9]+$").unwrap());

const MIN_NATIONAL_DIGITS: usize = 6;
const MAX_NATIONAL_DIGITS: usize = 15;
/// Bare numbers longer than this that start with the default country code
/// are taken to already carry it.
const MAX_BARE_NATIONAL_DIGITS: usize = 10;

/// Reduce a user-typed phone number to country code and national digits.
///
/// `+` and `00` prefixes mark an international number. Without one the number
/// is national and gets `default_country_code`. International numbers with a
/// foreign prefix keep all their digits in `national` under an empty country
/// code, so they still compare equal to themselves.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Result<NormalizedPhone, AppointmentError> {
    let cleaned = FORMATTING.replace_all(raw.trim(), "");
    if !DIALABLE.is_match(&cleaned) {
        return Err(AppointmentError::Validation(format!("Invalid phone number: {}", raw)));
    }

    let (international, digits) = if let Some(rest) = cleaned.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = cleaned.strip_prefix("00") {
        (true, rest)
    } else {
        (false, cleaned.as_ref())
    };

    let starts_with_default = !default_country_code.is_empty() && digits.starts_with(default_country_code);
    let (country_code, national) = if international {
        if starts_with_default {
            (default_country_code, &digits[default_country_code.len()..])
        } else {
            ("", digits)
        }
    } else if starts_with_default && digits.len() > MAX_BARE_NATIONAL_DIGITS {
        (default_country_code, &digits[default_country_code.len()..])
    } else {
        (default_country_code, digits)
    };

    if !(MIN_NATIONAL_DIGITS..=MAX_NATIONAL_DIGITS).contains(&national.len()) {
        return Err(AppointmentError::Validation(format!(
            "Phone number must have between {} and {} digits: {}",
            MIN_NATIONAL_DIGITS, MAX_NATIONAL_DIGITS, raw
        )));
    }

    Ok(NormalizedPhone {
        country_code: country_code.to_string(),
        national: national.to_string(),
    })
}

/// Client lookup and creation keyed by normalized phone number.
pub struct ClientDirectory {
    supabase: Arc<SupabaseClient>,
    default_country_code: String,
}

impl ClientDirectory {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            default_country_code: config.default_phone_country_code.clone(),
        }
    }

    pub fn normalize(&self, phone: &str) -> Result<NormalizedPhone, AppointmentError> {
        normalize_phone(phone, &self.default_country_code)
    }

    /// Exact match against every stored spelling of the number.
    pub async fn find_by_phone(&self, phone: &NormalizedPhone, auth_token: &str) -> Result<Option<Client>, AppointmentError> {
        let variants = phone
            .variants()
            .iter()
            .map(|v| urlencoding::encode(v).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/clients?phone=in.({})&order=created_at.asc&limit=1", variants);

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub async fn create_client(
        &self,
        name: &str,
        phone: &NormalizedPhone,
        email: Option<&str>,
        auth_token: &str,
    ) -> Result<Client, AppointmentError> {
        let client_data = json!({
            "name": name.trim(),
            "phone": phone.canonical(),
            "email": email.map(str::trim).filter(|e| !e.is_empty())
        });

        let created: Vec<Client> = self.supabase
            .request_returning(Method::POST, "/rest/v1/clients", Some(auth_token), Some(client_data))
            .await?;
        let client = created
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Storage("Client insert returned no rows".to_string()))?;

        info!("Created client {} for phone {}", client.id, client.phone);
        Ok(client)
    }

    /// Existing client for the phone number, or a new one under its
    /// canonical form.
    pub async fn find_or_create(&self, contact: &ClientContact, auth_token: &str) -> Result<Client, AppointmentError> {
        if contact.name.trim().is_empty() {
            return Err(AppointmentError::Validation("Client name is required".to_string()));
        }
        let phone = self.normalize(&contact.phone)?;

        if let Some(existing) = self.find_by_phone(&phone, auth_token).await? {
            debug!("Matched client {} by phone {}", existing.id, phone.canonical());
            return Ok(existing);
        }

        self.create_client(&contact.name, &phone, contact.email.as_deref(), auth_token).await
    }
}
