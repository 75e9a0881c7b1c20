use chrono::{DateTime, Utc};
use leptos::logging::{log, warn};

use crate::config::AppContext;
use crate::error::CheckinError;
use crate::model::{color_pair, CheckinCode, PlayerRecord, TeamList};
use crate::qr::{checkin_url, code_file_name, generate_qr_png, looks_like_url, png_data_uri};
use crate::session::{session_cookie, session_from_cookie_header, CheckinSession};
use crate::sheets::{parse_player_id, select_player};

/// Checks the operator login and returns the `Set-Cookie` value for a fresh session.
pub fn login(
    ctx: &AppContext,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<String, CheckinError> {
    if let Err(e) = ctx.credentials.verify(username, password) {
        warn!("Rejected check-in login for \"{username}\"");
        return Err(e);
    }

    let session = CheckinSession::granted(now);
    log!(
        "Check-in login for \"{username}\", valid until {}",
        session.expires_at()
    );
    Ok(session_cookie(&ctx.signer.issue(&session)))
}

/// True when the raw `Cookie` header carries a session that is still live at `now`.
pub fn has_session(ctx: &AppContext, cookie_header: Option<&str>, now: DateTime<Utc>) -> bool {
    cookie_header
        .and_then(|cookies| session_from_cookie_header(cookies, &ctx.signer))
        .is_some_and(|session| session.is_valid_at(now))
}

pub fn authorize(
    ctx: &AppContext,
    cookie_header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), CheckinError> {
    if has_session(ctx, cookie_header, now) {
        Ok(())
    } else {
        Err(CheckinError::Unauthorized)
    }
}

pub async fn team_list(ctx: &AppContext) -> Result<TeamList, CheckinError> {
    Ok(TeamList {
        spreadsheet: ctx.spreadsheet_name.clone(),
        teams: ctx.sheets.list_teams().await?,
    })
}

pub async fn roster(ctx: &AppContext, team: &str) -> Result<Vec<PlayerRecord>, CheckinError> {
    ctx.sheets.fetch_players(team).await
}

// Check-in mode reports an empty team like any other unknown id.
fn checkin_lookup(players: &[PlayerRecord], index: usize) -> Result<PlayerRecord, CheckinError> {
    select_player(players, index)
        .cloned()
        .map_err(|_| CheckinError::InvalidPlayerId)
}

/// The player a scanned code points at.
pub async fn checkin_player(
    ctx: &AppContext,
    team: &str,
    player_id: &str,
) -> Result<PlayerRecord, CheckinError> {
    let index = parse_player_id(player_id)?;
    let players = ctx.sheets.fetch_players(team).await?;
    checkin_lookup(&players, index)
}

/// Writes the new wristband text, then reads the roster again so the caller sees what the
/// spreadsheet now holds. Ids outside the visible roster are rejected before anything is written.
pub async fn save_wrist_band(
    ctx: &AppContext,
    team: &str,
    player_id: &str,
    wrist_band: &str,
) -> Result<PlayerRecord, CheckinError> {
    let index = parse_player_id(player_id)?;
    let players = ctx.sheets.fetch_players(team).await?;
    checkin_lookup(&players, index)?;

    ctx.sheets.update_wrist_band(team, index, wrist_band).await?;
    log!("Updated wrist band for {team} player {player_id}");

    let players = ctx.sheets.fetch_players(team).await?;
    checkin_lookup(&players, index)
}

pub async fn checkin_code(
    ctx: &AppContext,
    team: &str,
    player_index: usize,
    colors: &str,
) -> Result<CheckinCode, CheckinError> {
    let pair = color_pair(colors)?;
    let players = ctx.sheets.fetch_players(team).await?;
    let player = select_player(&players, player_index)?;
    let player_id = player.player_id()?;

    let url = checkin_url(&ctx.page_url, team, player_id);
    let png = generate_qr_png(&url, pair)?;
    log!("Generated check-in code for {team} player {player_id}");

    let photo = player.photo_url().trim();
    Ok(CheckinCode {
        checkin_url: url,
        image_data_uri: png_data_uri(&png),
        download_name: code_file_name(team, player_id),
        photo_url: looks_like_url(photo).then(|| photo.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credentials, SessionSigner, SESSION_COOKIE};
    use crate::sheets::MemorySheets;
    use chrono::TimeDelta;
    use std::sync::Arc;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn context() -> AppContext {
        let sheets = MemorySheets::new(vec![
            (
                "Falcons".to_string(),
                vec![
                    row(&["Wrist Band", "Player Name", "Player", "Photo URL"]),
                    row(&["", "Alex Moreno", "1", "https://example.com/alex.jpg"]),
                    row(&["Red", "Blake Shaw", "2", "not uploaded"]),
                    row(&["", "", "", ""]),
                ],
            ),
            (
                "Red Hawks".to_string(),
                vec![row(&["Wrist Band", "Player Name", "Player", "Photo URL"])],
            ),
            (
                "Owls".to_string(),
                vec![
                    row(&["Wrist Band", "Player Name", "Photo URL"]),
                    row(&["", "Dana Cole", ""]),
                ],
            ),
        ]);
        AppContext {
            sheets: Arc::new(sheets),
            credentials: Credentials::new("gate", "s3cret"),
            signer: SessionSigner::new(b"test-session-secret").unwrap(),
            spreadsheet_name: "NCCSF QR Check-in".to_string(),
            page_url: "https://checkin.example.org/app/".to_string(),
        }
    }

    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn test_login_issues_cookie_only_on_success() {
        let ctx = context();
        let now = Utc::now();

        assert_eq!(
            login(&ctx, "gate", "wrong", now),
            Err(CheckinError::InvalidCredentials)
        );
        assert_eq!(
            login(&ctx, "Gate", "s3cret", now),
            Err(CheckinError::InvalidCredentials)
        );

        let set_cookie = login(&ctx, "gate", "s3cret", now).unwrap();
        assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE}=")));
        let header = cookie_pair(&set_cookie);
        assert!(has_session(&ctx, Some(&header), now));
    }

    #[test]
    fn test_authorize_rejects_missing_forged_and_stale_sessions() {
        let ctx = context();
        let now = Utc::now();
        let header = cookie_pair(&login(&ctx, "gate", "s3cret", now).unwrap());

        assert_eq!(authorize(&ctx, None, now), Err(CheckinError::Unauthorized));
        assert_eq!(
            authorize(&ctx, Some("theme=dark"), now),
            Err(CheckinError::Unauthorized)
        );
        assert_eq!(
            authorize(&ctx, Some(&format!("{SESSION_COOKIE}=2026-10-18T09:30:00Z.00")), now),
            Err(CheckinError::Unauthorized)
        );
        assert_eq!(
            authorize(&ctx, Some(&header), now + TimeDelta::hours(24)),
            Err(CheckinError::Unauthorized)
        );
        assert_eq!(
            authorize(&ctx, Some(&format!("theme=dark; {header}")), now),
            Ok(())
        );
    }

    #[tokio::test]
    async fn test_team_list() {
        let list = team_list(&context()).await.unwrap();
        assert_eq!(list.spreadsheet, "NCCSF QR Check-in");
        assert_eq!(list.teams, vec!["Falcons", "Red Hawks", "Owls"]);
    }

    #[tokio::test]
    async fn test_checkin_player_ids() {
        let ctx = context();
        let player = checkin_player(&ctx, "Falcons", "2").await.unwrap();
        assert_eq!(player.player_name(), "Blake Shaw");

        for bad in ["0", "3", "x", ""] {
            assert_eq!(
                checkin_player(&ctx, "Falcons", bad).await,
                Err(CheckinError::InvalidPlayerId)
            );
        }
    }

    #[tokio::test]
    async fn test_checkin_empty_team_reads_as_invalid_id() {
        let err = checkin_player(&context(), "Red Hawks", "1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No data available or invalid player ID.");
    }

    #[tokio::test]
    async fn test_save_wrist_band_returns_fresh_record() {
        let ctx = context();
        let record = save_wrist_band(&ctx, "Falcons", "1", "Blue, size S")
            .await
            .unwrap();
        assert_eq!(record.player_name(), "Alex Moreno");
        assert_eq!(record.wrist_band(), "Blue, size S");
    }

    #[tokio::test]
    async fn test_save_wrist_band_past_roster_writes_nothing() {
        let ctx = context();
        assert_eq!(
            save_wrist_band(&ctx, "Falcons", "3", "Blue").await,
            Err(CheckinError::InvalidPlayerId)
        );
        assert_eq!(ctx.sheets.fetch_players("Falcons").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkin_code() {
        let code = checkin_code(&context(), "Falcons", 0, "Black on White")
            .await
            .unwrap();
        assert_eq!(
            code.checkin_url,
            "https://checkin.example.org/app/?checkin&teamname=Falcons&playerid=1"
        );
        assert!(code.image_data_uri.starts_with("data:image/png;base64,"));
        assert_eq!(code.download_name, "Falcons-player-1.png");
        assert_eq!(code.photo_url.as_deref(), Some("https://example.com/alex.jpg"));

        let second = checkin_code(&context(), "Falcons", 1, "Black on White")
            .await
            .unwrap();
        assert_eq!(second.photo_url, None);
    }

    #[tokio::test]
    async fn test_checkin_code_without_player_column() {
        let err = checkin_code(&context(), "Owls", 0, "Black on White")
            .await
            .unwrap_err();
        assert_eq!(err, CheckinError::MissingColumn("Player".to_string()));
    }

    #[tokio::test]
    async fn test_checkin_code_rejects_unknown_colors_and_empty_team() {
        let ctx = context();
        assert!(matches!(
            checkin_code(&ctx, "Falcons", 0, "Pink on Pink").await,
            Err(CheckinError::UnknownColorPair(_))
        ));
        assert_eq!(
            checkin_code(&ctx, "Red Hawks", 0, "Black on White").await,
            Err(CheckinError::EmptyTeam)
        );
    }
}
