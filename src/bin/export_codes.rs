//! Writes a check-in code PNG for every player of one team, for printing ahead of the event.

#[cfg(feature = "ssr")]
use clap::Parser;
#[cfg(feature = "ssr")]
use player_qr_checkin::model::DEFAULT_COLOR_PAIR;
#[cfg(feature = "ssr")]
use std::path::PathBuf;

/// Export check-in QR codes for one team
#[cfg(feature = "ssr")]
#[derive(Parser, Debug)]
#[command(
    name = "export_codes",
    version = env!("CARGO_PKG_VERSION"),
    about = "Write one check-in QR code PNG per player of a team",
    long_about = None
)]
struct Args {
    /// Worksheet (team) name
    team: String,

    /// Directory the PNG files are written to
    out_dir: PathBuf,

    /// Color pair, e.g. "Purple on Gold"
    #[arg(default_value = DEFAULT_COLOR_PAIR)]
    colors: String,
}

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use dotenvy::dotenv;
    use player_qr_checkin::config::AppConfig;
    use player_qr_checkin::model::color_pair;
    use player_qr_checkin::qr::{checkin_url, code_file_name, generate_qr_png};

    let args = Args::parse();
    let pair = match color_pair(&args.colors) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    dotenv().ok();
    let config = AppConfig::from_env().expect("Invalid configuration");
    let sheets = config.open_sheets().expect("Failed to open the roster spreadsheet.");
    let players = match sheets.fetch_players(&args.team).await {
        Ok(players) => players,
        Err(e) => {
            eprintln!("Failed to load the roster for {}: {e}", args.team);
            std::process::exit(1);
        }
    };
    if players.is_empty() {
        println!("No players found for {}.", args.team);
        return;
    }

    std::fs::create_dir_all(&args.out_dir).expect("Failed to create the output directory");

    let mut written = 0;
    for (index, player) in players.iter().enumerate() {
        let player_id = match player.player_id() {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Skipping row {}: {e}", index + 2);
                continue;
            }
        };
        let url = checkin_url(&config.page_url, &args.team, player_id);
        let png = generate_qr_png(&url, pair).expect("Failed to render check-in code");
        let path = args.out_dir.join(code_file_name(&args.team, player_id));
        std::fs::write(&path, png).expect("Failed to write check-in code");
        println!("{} -> {}", player.player_name(), path.display());
        written += 1;
    }
    println!("Wrote {written} check-in codes for {}.", args.team);
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}

#[cfg(all(test, feature = "ssr"))]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_args_default_colors() {
        let args = Args::try_parse_from(["export_codes", "Red Hawks", "out"]).unwrap();
        assert_eq!(args.team, "Red Hawks");
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert_eq!(args.colors, DEFAULT_COLOR_PAIR);
    }

    #[test]
    fn test_args_explicit_colors() {
        let args =
            Args::try_parse_from(["export_codes", "Falcons", "out", "Teal on Coral"]).unwrap();
        assert_eq!(args.colors, "Teal on Coral");
    }

    #[test]
    fn test_args_help_is_not_a_team() {
        let err = Args::try_parse_from(["export_codes", "--help", "out"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_args_reject_extra_and_missing() {
        let extra =
            Args::try_parse_from(["export_codes", "Falcons", "out", "Teal on Coral", "extra"]);
        assert_eq!(extra.unwrap_err().kind(), ErrorKind::UnknownArgument);

        let missing = Args::try_parse_from(["export_codes", "Falcons"]);
        assert_eq!(
            missing.unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
    }
}
