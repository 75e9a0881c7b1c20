use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use leptos::logging::log;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{column_letter, player_row_count, records_from_rows, wrist_band_column, PlayerSheets};
use crate::error::CheckinError;
use crate::model::PlayerRecord;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh the access token this long before Google says it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a Google service-account key file that the client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, CheckinError> {
        serde_json::from_str(json)
            .map_err(|e| CheckinError::Config(format!("invalid service account key: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, CheckinError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CheckinError::Config(format!(
                "cannot read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets store authorized with a service account. The spreadsheet is located by name
/// once and its id is kept for the life of the process, as is the access token until it nears
/// expiry. Every other call goes straight to the API with no retry.
pub struct GoogleSheets {
    spreadsheet_name: String,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
    spreadsheet_id: Mutex<Option<String>>,
}

impl GoogleSheets {
    pub fn new(spreadsheet_name: String, key: ServiceAccountKey) -> Result<Self, CheckinError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CheckinError::Config(format!("invalid service account private key: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CheckinError::Config(format!("cannot build http client: {e}")))?;
        Ok(Self {
            spreadsheet_name,
            key,
            encoding_key,
            http,
            token: Mutex::new(None),
            spreadsheet_id: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CheckinError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if now + TimeDelta::seconds(TOKEN_REFRESH_MARGIN_SECS) < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + TimeDelta::hours(1)).timestamp(),
        };
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| CheckinError::Remote(format!("cannot sign token request: {e}")))?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CheckinError::Remote(format!("token request failed: {e}")))?;
        let body: TokenResponse = read_json(resp).await?;

        let token = AccessToken {
            token: body.access_token,
            expires_at: now + TimeDelta::seconds(body.expires_in),
        };
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn auth_headers(&self) -> Result<HeaderMap, CheckinError> {
        let token = self.access_token().await?;
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| CheckinError::Remote(format!("invalid auth header: {e}")))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    async fn spreadsheet_id(&self) -> Result<String, CheckinError> {
        let mut cached = self.spreadsheet_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            self.spreadsheet_name.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let resp = self
            .http
            .get(DRIVE_FILES_API)
            .headers(self.auth_headers().await?)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await
            .map_err(|e| CheckinError::Remote(format!("spreadsheet lookup failed: {e}")))?;
        let list: DriveFileList = read_json(resp).await?;
        let id = list
            .files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| {
                CheckinError::Remote(format!("spreadsheet not found: {}", self.spreadsheet_name))
            })?;

        log!("Resolved spreadsheet \"{}\" to {}", self.spreadsheet_name, id);
        *cached = Some(id.clone());
        Ok(id)
    }

    async fn worksheet_values(&self, team: &str) -> Result<Vec<Vec<String>>, CheckinError> {
        let id = self.spreadsheet_id().await?;
        let url = format!(
            "{SHEETS_API}/{id}/values/{}",
            urlencoding::encode(&a1_sheet(team))
        );
        let resp = self
            .http
            .get(&url)
            .headers(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CheckinError::Remote(format!("worksheet read failed: {e}")))?;
        let range: ValueRange = read_json(resp).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

#[async_trait]
impl PlayerSheets for GoogleSheets {
    fn backend_tag(&self) -> &'static str {
        "google"
    }

    async fn list_teams(&self) -> Result<Vec<String>, CheckinError> {
        let id = self.spreadsheet_id().await?;
        let resp = self
            .http
            .get(format!("{SHEETS_API}/{id}"))
            .headers(self.auth_headers().await?)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await
            .map_err(|e| CheckinError::Remote(format!("worksheet listing failed: {e}")))?;
        let meta: SpreadsheetMeta = read_json(resp).await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }

    async fn fetch_players(&self, team: &str) -> Result<Vec<PlayerRecord>, CheckinError> {
        let rows = self.worksheet_values(team).await?;
        Ok(records_from_rows(&rows))
    }

    async fn update_wrist_band(
        &self,
        team: &str,
        player_index: usize,
        wrist_band: &str,
    ) -> Result<(), CheckinError> {
        let rows = self.worksheet_values(team).await?;
        let column = wrist_band_column(rows.first().map(Vec::as_slice).unwrap_or_default())?;
        if player_index >= player_row_count(&rows) {
            return Err(CheckinError::InvalidPlayerId);
        }

        let range = format!(
            "{}!{}{}",
            a1_sheet(team),
            column_letter(column),
            player_index + 2
        );
        let id = self.spreadsheet_id().await?;
        let url = format!("{SHEETS_API}/{id}/values/{}", urlencoding::encode(&range));
        let resp = self
            .http
            .put(&url)
            .headers(self.auth_headers().await?)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [[wrist_band]],
            }))
            .send()
            .await
            .map_err(|e| CheckinError::Remote(format!("worksheet update failed: {e}")))?;
        let _: Value = read_json(resp).await?;
        Ok(())
    }
}

/// Quotes a worksheet title for use in an A1 range.
fn a1_sheet(team: &str) -> String {
    format!("'{}'", team.replace('\'', "''"))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decodes a successful response, or turns Google's error body into a `Remote` error.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, CheckinError> {
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| CheckinError::Remote(format!("read body failed: {e}")))?;
    if !status.is_success() {
        return Err(CheckinError::Remote(format!(
            "status={} {}",
            status,
            google_error_message(&bytes)
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| CheckinError::Remote(format!("unexpected response: {e}")))
}

fn google_error_message(body: &[u8]) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.pointer("/error_description"))
                .and_then(Value::as_str)
        })
        .map(ToString::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
