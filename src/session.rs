use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CheckinError;

pub const SESSION_COOKIE: &str = "last_login_time";
pub const SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// The login/password pair operators use to unlock check-in mode.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<(), CheckinError> {
        if username == self.username && password == self.password {
            Ok(())
        } else {
            Err(CheckinError::InvalidCredentials)
        }
    }
}

/// A granted check-in session. Valid for exactly 24 hours after `granted_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckinSession {
    pub granted_at: DateTime<Utc>,
}

impl CheckinSession {
    pub fn granted(now: DateTime<Utc>) -> Self {
        Self { granted_at: now }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.granted_at + TimeDelta::seconds(SESSION_MAX_AGE_SECS)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Signs session cookie values so the grant timestamp cannot be forged or pushed forward by the
/// browser. Cookie format: `<rfc3339 timestamp>.<hex hmac-sha256>`.
#[derive(Clone)]
pub struct SessionSigner {
    mac: Hmac<Sha256>,
}

impl SessionSigner {
    pub fn new(secret: &[u8]) -> Result<Self, CheckinError> {
        let mac = Hmac::<Sha256>::new_from_slice(secret)
            .map_err(|e| CheckinError::Config(format!("invalid session secret: {e}")))?;
        Ok(Self { mac })
    }

    pub fn issue(&self, session: &CheckinSession) -> String {
        let timestamp = session
            .granted_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut mac = self.mac.clone();
        mac.update(timestamp.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("{timestamp}.{signature}")
    }

    /// Returns the session carried by a cookie value, or `None` if it is malformed or its
    /// signature does not match. Expiry is checked separately with `is_valid_at`.
    pub fn open(&self, value: &str) -> Option<CheckinSession> {
        let (timestamp, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(timestamp.as_bytes());
        mac.verify_slice(&signature).ok()?;
        let granted_at = DateTime::parse_from_rfc3339(timestamp)
            .ok()?
            .with_timezone(&Utc);
        Some(CheckinSession { granted_at })
    }
}

pub fn session_cookie(value: &str) -> String {
    format!(
        "{SESSION_COOKIE}={value}; Max-Age={SESSION_MAX_AGE_SECS}; Path=/; HttpOnly; SameSite=Strict"
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict")
}

/// Finds the session cookie in a raw `Cookie` header and opens it.
pub fn session_from_cookie_header(header: &str, signer: &SessionSigner) -> Option<CheckinSession> {
    let prefix = format!("{SESSION_COOKIE}=");
    header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .and_then(|value| signer.open(value))
}
