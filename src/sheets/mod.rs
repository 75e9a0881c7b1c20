pub mod google;
pub mod memory;

use async_trait::async_trait;

use crate::error::CheckinError;
use crate::model::{PlayerRecord, WRIST_BAND_COLUMN};

pub use google::{GoogleSheets, ServiceAccountKey};
pub use memory::MemorySheets;

/// Access to the spreadsheet that backs the rosters. Each worksheet is one team; its first row
/// holds column names and every later row is one player.
#[async_trait]
pub trait PlayerSheets: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Worksheet titles, in spreadsheet order.
    async fn list_teams(&self) -> Result<Vec<String>, CheckinError>;

    async fn fetch_players(&self, team: &str) -> Result<Vec<PlayerRecord>, CheckinError>;

    /// Overwrites the wristband cell of the player at 0-based `player_index`, i.e. spreadsheet
    /// row `player_index + 2`.
    async fn update_wrist_band(
        &self,
        team: &str,
        player_index: usize,
        wrist_band: &str,
    ) -> Result<(), CheckinError>;
}

/// Number of player rows in a worksheet's raw cells: everything below the header up to the last
/// row with a non-blank cell.
pub fn player_row_count(rows: &[Vec<String>]) -> usize {
    let body = rows.get(1..).unwrap_or_default();
    let is_blank = |row: &Vec<String>| row.iter().all(|cell| cell.trim().is_empty());
    body.len() - body.iter().rev().take_while(|row| is_blank(row)).count()
}

/// Builds records from a worksheet's raw cells. The first row is the header row.
pub fn records_from_rows(rows: &[Vec<String>]) -> Vec<PlayerRecord> {
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };

    body[..player_row_count(rows)]
        .iter()
        .map(|row| {
            let fields = header
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(col, name)| (name.clone(), row.get(col).cloned().unwrap_or_default()))
                .collect();
            PlayerRecord::new(fields)
        })
        .collect()
}

/// Index of the wristband column in a header row.
pub fn wrist_band_column(header: &[String]) -> Result<usize, CheckinError> {
    header
        .iter()
        .position(|name| name == WRIST_BAND_COLUMN)
        .ok_or_else(|| CheckinError::MissingColumn(WRIST_BAND_COLUMN.to_string()))
}

/// Converts a 1-based `playerid` query value into a 0-based roster index.
pub fn parse_player_id(raw: &str) -> Result<usize, CheckinError> {
    match raw.trim().parse::<usize>() {
        Ok(id) if id > 0 => Ok(id - 1),
        _ => Err(CheckinError::InvalidPlayerId),
    }
}

pub fn select_player(
    records: &[PlayerRecord],
    player_index: usize,
) -> Result<&PlayerRecord, CheckinError> {
    if records.is_empty() {
        return Err(CheckinError::EmptyTeam);
    }
    records
        .get(player_index)
        .ok_or(CheckinError::InvalidPlayerId)
}

/// A1 column letters for a 0-based column index (0 -> A, 25 -> Z, 26 -> AA).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.into_iter().rev().map(char::from).collect()
}
