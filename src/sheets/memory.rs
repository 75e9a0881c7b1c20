use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{player_row_count, records_from_rows, wrist_band_column, PlayerSheets};
use crate::error::CheckinError;
use crate::model::PlayerRecord;

/// An in-process spreadsheet. Serves tests and the offline fixture mode.
pub struct MemorySheets {
    teams: Mutex<Vec<(String, Vec<Vec<String>>)>>,
}

#[derive(Debug, Deserialize)]
struct FixtureTeam {
    team: String,
    rows: Vec<Vec<String>>,
}

impl MemorySheets {
    pub fn new(teams: Vec<(String, Vec<Vec<String>>)>) -> Self {
        Self {
            teams: Mutex::new(teams),
        }
    }

    /// Parses a fixture of the form `[{"team": "...", "rows": [["Player Name", ...], ...]}]`.
    pub fn from_fixture_json(json: &str) -> Result<Self, CheckinError> {
        let fixture: Vec<FixtureTeam> = serde_json::from_str(json)
            .map_err(|e| CheckinError::Config(format!("invalid sheets fixture: {e}")))?;
        Ok(Self::new(
            fixture.into_iter().map(|t| (t.team, t.rows)).collect(),
        ))
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self, CheckinError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CheckinError::Config(format!("cannot read sheets fixture {}: {e}", path.display()))
        })?;
        Self::from_fixture_json(&json)
    }
}

fn worksheet_not_found(team: &str) -> CheckinError {
    CheckinError::Remote(format!("worksheet not found: {team}"))
}

#[async_trait]
impl PlayerSheets for MemorySheets {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list_teams(&self) -> Result<Vec<String>, CheckinError> {
        let teams = self.teams.lock().await;
        Ok(teams.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn fetch_players(&self, team: &str) -> Result<Vec<PlayerRecord>, CheckinError> {
        let teams = self.teams.lock().await;
        let (_, rows) = teams
            .iter()
            .find(|(name, _)| name == team)
            .ok_or_else(|| worksheet_not_found(team))?;
        Ok(records_from_rows(rows))
    }

    async fn update_wrist_band(
        &self,
        team: &str,
        player_index: usize,
        wrist_band: &str,
    ) -> Result<(), CheckinError> {
        let mut teams = self.teams.lock().await;
        let (_, rows) = teams
            .iter_mut()
            .find(|(name, _)| name == team)
            .ok_or_else(|| worksheet_not_found(team))?;

        let column = wrist_band_column(rows.first().map(Vec::as_slice).unwrap_or_default())?;
        if player_index >= player_row_count(rows) {
            return Err(CheckinError::InvalidPlayerId);
        }
        let row = rows
            .get_mut(player_index + 1)
            .ok_or(CheckinError::InvalidPlayerId)?;
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = wrist_band.to_string();
        Ok(())
    }
}
