use serde::{Deserialize, Serialize};

use crate::error::CheckinError;

pub const PLAYER_NAME_COLUMN: &str = "Player Name";
pub const PLAYER_ID_COLUMN: &str = "Player";
pub const WRIST_BAND_COLUMN: &str = "Wrist Band";
pub const PHOTO_URL_COLUMN: &str = "Photo URL";

/// One roster row, keyed by the worksheet's header cells and kept in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub fields: Vec<(String, String)>,
}

impl PlayerRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn player_name(&self) -> &str {
        self.get(PLAYER_NAME_COLUMN).unwrap_or_default()
    }

    pub fn wrist_band(&self) -> &str {
        self.get(WRIST_BAND_COLUMN).unwrap_or_default()
    }

    pub fn photo_url(&self) -> &str {
        self.get(PHOTO_URL_COLUMN).unwrap_or_default()
    }

    /// The 1-based id stored in the `Player` column. A worksheet without that column cannot
    /// produce check-in codes, so its absence is an error rather than a silent default.
    pub fn player_id(&self) -> Result<u32, CheckinError> {
        let raw = self
            .get(PLAYER_ID_COLUMN)
            .ok_or_else(|| CheckinError::MissingColumn(PLAYER_ID_COLUMN.to_string()))?;
        match raw.trim().parse::<u32>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(CheckinError::InvalidPlayerId),
        }
    }
}

/// Teams available in the spreadsheet, plus the spreadsheet's name for the page title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamList {
    pub spreadsheet: String,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub name: &'static str,
    pub foreground: &'static str,
    pub background: &'static str,
}

pub const DEFAULT_COLOR_PAIR: &str = "Black on White";

pub const COLOR_PAIRS: &[ColorPair] = &[
    ColorPair { name: "Black on White", foreground: "#000000", background: "#FFFFFF" },
    ColorPair { name: "Purple on Gold", foreground: "#800080", background: "#FFD700" },
    ColorPair { name: "Teal on Coral", foreground: "#008080", background: "#FF6B6B" },
    ColorPair { name: "Orange on Navy", foreground: "#FFA500", background: "#000080" },
    ColorPair { name: "Magenta on Lime", foreground: "#FF00FF", background: "#00FF00" },
    ColorPair { name: "Turquoise on Salmon", foreground: "#40E0D0", background: "#FA8072" },
    ColorPair { name: "Indigo on Peach", foreground: "#4B0082", background: "#FFDAB9" },
    ColorPair { name: "Crimson on Lavender", foreground: "#DC143C", background: "#E6E6FA" },
    ColorPair { name: "Olive on Slate", foreground: "#808000", background: "#708090" },
    ColorPair { name: "Amber on Midnight", foreground: "#FFBF00", background: "#191970" },
    ColorPair { name: "Plum on Khaki", foreground: "#DDA0DD", background: "#F0E68C" },
];

pub fn color_pair(name: &str) -> Result<&'static ColorPair, CheckinError> {
    COLOR_PAIRS
        .iter()
        .find(|pair| pair.name == name)
        .ok_or_else(|| CheckinError::UnknownColorPair(name.to_string()))
}

/// A generated check-in code, ready to show next to the player's photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinCode {
    pub checkin_url: String,
    pub image_data_uri: String,
    pub download_name: String,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> PlayerRecord {
        PlayerRecord::new(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_player_accessors() {
        let player = record(&[
            ("Wrist Band", "Blue"),
            ("Player Name", "Ada Lovelace"),
            ("Player", "3"),
            ("Photo URL", "https://example.com/ada.jpg"),
        ]);
        assert_eq!(player.player_name(), "Ada Lovelace");
        assert_eq!(player.wrist_band(), "Blue");
        assert_eq!(player.photo_url(), "https://example.com/ada.jpg");
        assert_eq!(player.player_id(), Ok(3));
        assert_eq!(player.get("Jersey"), None);
    }

    #[test]
    fn test_player_id_missing_column() {
        let player = record(&[("Player Name", "No Id")]);
        assert_eq!(
            player.player_id(),
            Err(CheckinError::MissingColumn("Player".to_string()))
        );
    }

    #[test]
    fn test_player_id_rejects_blank_and_zero() {
        assert_eq!(
            record(&[("Player", "")]).player_id(),
            Err(CheckinError::InvalidPlayerId)
        );
        assert_eq!(
            record(&[("Player", "0")]).player_id(),
            Err(CheckinError::InvalidPlayerId)
        );
        assert_eq!(record(&[("Player", " 12 ")]).player_id(), Ok(12));
    }

    #[test]
    fn test_color_pair_lookup() {
        let pair = color_pair(DEFAULT_COLOR_PAIR).expect("default pair exists");
        assert_eq!(pair.foreground, "#000000");
        assert_eq!(pair.background, "#FFFFFF");
        assert_eq!(COLOR_PAIRS.len(), 11);
        assert_eq!(
            color_pair("Pink on Pink"),
            Err(CheckinError::UnknownColorPair("Pink on Pink".to_string()))
        );
    }
}
