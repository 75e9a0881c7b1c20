use std::path::PathBuf;
use std::sync::Arc;

use leptos::logging::log;

use crate::error::CheckinError;
use crate::session::{Credentials, SessionSigner};
use crate::sheets::{GoogleSheets, MemorySheets, PlayerSheets, ServiceAccountKey};

pub const DEFAULT_SPREADSHEET_NAME: &str = "NCCSF QR Check-in";
pub const DEFAULT_PAGE_URL: &str = "http://player-qr-checkin-nccsf.streamlit.app";

/// Where the service-account key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAccountSource {
    File(PathBuf),
    Inline(String),
}

/// Settings read from the environment (and `.env`, loaded by the binaries).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub checkin_username: String,
    pub checkin_password: String,
    pub session_secret: Option<String>,
    pub spreadsheet_name: String,
    pub page_url: String,
    pub service_account: Option<ServiceAccountSource>,
    pub sheets_fixture: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CheckinError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, treating empty values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CheckinError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            get(name).ok_or_else(|| CheckinError::Config(format!("{name} must be set in .env")))
        };

        let service_account = match (
            get("GCP_SERVICE_ACCOUNT_FILE"),
            get("GCP_SERVICE_ACCOUNT_JSON"),
        ) {
            (Some(path), _) => Some(ServiceAccountSource::File(PathBuf::from(path))),
            (None, Some(json)) => Some(ServiceAccountSource::Inline(json)),
            (None, None) => None,
        };
        let sheets_fixture = get("PLAYER_SHEETS_FIXTURE").map(PathBuf::from);
        if service_account.is_none() && sheets_fixture.is_none() {
            return Err(CheckinError::Config(
                "GCP_SERVICE_ACCOUNT_FILE, GCP_SERVICE_ACCOUNT_JSON or PLAYER_SHEETS_FIXTURE must be set in .env"
                    .to_string(),
            ));
        }

        Ok(Self {
            checkin_username: required("CHECKIN_USERNAME")?,
            checkin_password: required("CHECKIN_PASSWORD")?,
            session_secret: get("SESSION_SECRET"),
            spreadsheet_name: get("SPREADSHEET_NAME")
                .unwrap_or_else(|| DEFAULT_SPREADSHEET_NAME.to_string()),
            page_url: get("PAGE_URL").unwrap_or_else(|| DEFAULT_PAGE_URL.to_string()),
            service_account,
            sheets_fixture,
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.checkin_username, &self.checkin_password)
    }

    /// Without an explicit `SESSION_SECRET`, cookies are signed with the check-in login itself,
    /// so changing the password also ends every open session.
    pub fn session_signer(&self) -> Result<SessionSigner, CheckinError> {
        let secret = match &self.session_secret {
            Some(secret) => secret.clone(),
            None => format!("{}:{}", self.checkin_username, self.checkin_password),
        };
        SessionSigner::new(secret.as_bytes())
    }

    /// Opens the roster store: the JSON fixture when one is configured, Google Sheets otherwise.
    pub fn open_sheets(&self) -> Result<Arc<dyn PlayerSheets>, CheckinError> {
        if let Some(path) = &self.sheets_fixture {
            log!("Serving rosters from fixture {}", path.display());
            return Ok(Arc::new(MemorySheets::from_fixture_file(path)?));
        }
        let key = match &self.service_account {
            Some(ServiceAccountSource::File(path)) => ServiceAccountKey::from_file(path)?,
            Some(ServiceAccountSource::Inline(json)) => ServiceAccountKey::from_json(json)?,
            None => {
                return Err(CheckinError::Config(
                    "no service account configured".to_string(),
                ))
            }
        };
        log!(
            "Serving rosters from Google Sheets \"{}\" as {}",
            self.spreadsheet_name,
            key.client_email
        );
        Ok(Arc::new(GoogleSheets::new(self.spreadsheet_name.clone(), key)?))
    }
}

/// Everything the server functions need, provided through Leptos context.
#[derive(Clone)]
pub struct AppContext {
    pub sheets: Arc<dyn PlayerSheets>,
    pub credentials: Credentials,
    pub signer: SessionSigner,
    pub spreadsheet_name: String,
    pub page_url: String,
}

impl AppContext {
    pub fn new(config: &AppConfig, sheets: Arc<dyn PlayerSheets>) -> Result<Self, CheckinError> {
        Ok(Self {
            sheets,
            credentials: config.credentials(),
            signer: config.session_signer()?,
            spreadsheet_name: config.spreadsheet_name.clone(),
            page_url: config.page_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CHECKIN_USERNAME", "gate"),
            ("CHECKIN_PASSWORD", "s3cret"),
            ("GCP_SERVICE_ACCOUNT_FILE", "/etc/checkin/key.json"),
        ]))
        .unwrap();
        assert_eq!(config.spreadsheet_name, DEFAULT_SPREADSHEET_NAME);
        assert_eq!(config.page_url, DEFAULT_PAGE_URL);
        assert_eq!(
            config.service_account,
            Some(ServiceAccountSource::File(PathBuf::from("/etc/checkin/key.json")))
        );
        assert!(config.sheets_fixture.is_none());
        assert!(config.credentials().verify("gate", "s3cret").is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CHECKIN_USERNAME", "gate"),
            ("CHECKIN_PASSWORD", "  "),
            ("PLAYER_SHEETS_FIXTURE", "rosters.json"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            CheckinError::Config("CHECKIN_PASSWORD must be set in .env".to_string())
        );
    }

    #[test]
    fn test_requires_a_store() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CHECKIN_USERNAME", "gate"),
            ("CHECKIN_PASSWORD", "s3cret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CheckinError::Config(_)));
    }

    #[test]
    fn test_session_secret_changes_signature() {
        let base = [
            ("CHECKIN_USERNAME", "gate"),
            ("CHECKIN_PASSWORD", "s3cret"),
            ("PLAYER_SHEETS_FIXTURE", "rosters.json"),
        ];
        let derived = AppConfig::from_lookup(lookup(&base)).unwrap();
        let mut with_secret = base.to_vec();
        with_secret.push(("SESSION_SECRET", "rotate-me"));
        let explicit = AppConfig::from_lookup(lookup(&with_secret)).unwrap();

        let session = crate::session::CheckinSession::granted(chrono::Utc::now());
        let cookie = derived.session_signer().unwrap().issue(&session);
        assert!(derived.session_signer().unwrap().open(&cookie).is_some());
        assert!(explicit.session_signer().unwrap().open(&cookie).is_none());
    }
}
