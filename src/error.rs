use thiserror::Error;

/// Every failure the check-in app can report. The `Display` text is what operators see inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckinError {
    #[error("Incorrect username or password.")]
    InvalidCredentials,
    #[error("Authentication Required for Check-in")]
    Unauthorized,
    #[error("No data available or invalid player ID.")]
    InvalidPlayerId,
    #[error("No players found for this team.")]
    EmptyTeam,
    #[error("Worksheet is missing the \"{0}\" column.")]
    MissingColumn(String),
    #[error("Unknown color pair: {0}")]
    UnknownColorPair(String),
    #[error("Spreadsheet error: {0}")]
    Remote(String),
    #[error("Image error: {0}")]
    Image(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
