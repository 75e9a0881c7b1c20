use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, Rgb};
use qrcode::{EcLevel, QrCode};

use crate::error::CheckinError;
use crate::model::ColorPair;

/// Pixels per QR module.
const MODULE_SIZE: u32 = 10;

/// The URL a check-in code points at: `<base>?checkin&teamname=<team>&playerid=<id>`.
pub fn checkin_url(base_url: &str, team: &str, player_id: u32) -> String {
    format!(
        "{}?checkin&teamname={}&playerid={}",
        base_url,
        urlencoding::encode(team),
        player_id
    )
}

/// True when `candidate` parses as an absolute URL with both a scheme and a host.
pub fn looks_like_url(candidate: &str) -> bool {
    match reqwest::Url::parse(candidate.trim()) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

fn parse_hex_color(color: &str) -> Result<Rgb<u8>, CheckinError> {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(CheckinError::Image(format!("invalid color: {color}")));
    }
    let bytes = hex::decode(hex).map_err(|_| CheckinError::Image(format!("invalid color: {color}")))?;
    Ok(Rgb([bytes[0], bytes[1], bytes[2]]))
}

/// Encodes `url` as a QR code at error-correction level H and renders it to PNG bytes in the
/// given colors. The output only depends on the inputs.
pub fn generate_qr_png(url: &str, colors: &ColorPair) -> Result<Vec<u8>, CheckinError> {
    let dark = parse_hex_color(colors.foreground)?;
    let light = parse_hex_color(colors.background)?;

    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H)
        .map_err(|e| CheckinError::Image(e.to_string()))?;
    let canvas = code
        .render::<Rgb<u8>>()
        .dark_color(dark)
        .light_color(light)
        .quiet_zone(true)
        .module_dimensions(MODULE_SIZE, MODULE_SIZE)
        .build();

    let mut bytes = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| CheckinError::Image(e.to_string()))?;
    Ok(bytes)
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(png))
}

/// File name used when an operator downloads or exports a code.
pub fn code_file_name(team: &str, player_id: u32) -> String {
    let team: String = team
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{team}-player-{player_id}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{color_pair, DEFAULT_COLOR_PAIR};

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn test_checkin_url_encodes_team() {
        assert_eq!(
            checkin_url("http://checkin.example.org", "Red Hawks", 7),
            "http://checkin.example.org?checkin&teamname=Red%20Hawks&playerid=7"
        );
        assert_eq!(
            checkin_url("http://checkin.example.org/", "U12 & Under", 1),
            "http://checkin.example.org/?checkin&teamname=U12%20%26%20Under&playerid=1"
        );
        assert_eq!(
            checkin_url("https://host.example.org/app/", "Falcons", 3),
            "https://host.example.org/app/?checkin&teamname=Falcons&playerid=3"
        );
    }

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("https://example.com/photos/1.jpg"));
        assert!(looks_like_url("http://cdn.example.com"));
        assert!(!looks_like_url(""));
        assert!(!looks_like_url("no photo"));
        assert!(!looks_like_url("/photos/1.jpg"));
        assert!(!looks_like_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_generate_qr_png_is_deterministic() {
        let pair = color_pair(DEFAULT_COLOR_PAIR).unwrap();
        let url = checkin_url("http://checkin.example.org", "Falcons", 4);
        let first = generate_qr_png(&url, pair).unwrap();
        let second = generate_qr_png(&url, pair).unwrap();
        assert!(first.starts_with(PNG_SIGNATURE));
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_qr_png_depends_on_colors() {
        let url = checkin_url("http://checkin.example.org", "Falcons", 4);
        let plain = generate_qr_png(&url, color_pair("Black on White").unwrap()).unwrap();
        let gold = generate_qr_png(&url, color_pair("Purple on Gold").unwrap()).unwrap();
        assert_ne!(plain, gold);

        let decoded = image::load_from_memory(&gold).unwrap().to_rgb8();
        // The quiet zone is background colored.
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([0xFF, 0xD7, 0x00]));
        assert_eq!(decoded.width() % MODULE_SIZE, 0);
    }

    #[test]
    fn test_invalid_color_is_an_image_error() {
        let pair = ColorPair {
            name: "Broken",
            foreground: "#12",
            background: "#FFFFFF",
        };
        assert!(matches!(
            generate_qr_png("http://example.org", &pair),
            Err(CheckinError::Image(_))
        ));
    }

    #[test]
    fn test_png_data_uri_and_file_name() {
        assert_eq!(png_data_uri(b"abc"), "data:image/png;base64,YWJj");
        assert_eq!(code_file_name("Red Hawks", 12), "Red-Hawks-player-12.png");
    }
}
