// src/color.rs
//! Conversion between `#RRGGBB` strings and RGB triples.
//!
//! Everything here is pure and synchronous. A [`Color`] can only hold valid
//! 8-bit channels, so once a value exists it is safe to hand to the pipeline.

use crate::errors::StudioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An sRGB paint color. Travels on the wire as a `[r, g, b]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Named presets offered by the color selector.
pub const PRESETS: [(&str, Color); 7] = [
    ("Midnight Black", Color::new(0x00, 0x00, 0x00)),
    ("Arctic White", Color::new(0xFF, 0xFF, 0xFF)),
    ("Racing Red", Color::new(0xFF, 0x00, 0x00)),
    ("Ocean Blue", Color::new(0x00, 0x00, 0xFF)),
    ("Forest Green", Color::new(0x00, 0x80, 0x00)),
    ("Sunset Orange", Color::new(0xFF, 0xA5, 0x00)),
    ("Royal Purple", Color::new(0x80, 0x00, 0x80)),
];

pub const DEFAULT_PRESET: &str = "Ocean Blue";

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` or `RRGGBB`, case-insensitive.
    pub fn from_hex(hex: &str) -> Result<Self, StudioError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);

        // from_str_radix tolerates a leading '+', so check the digits first
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(StudioError::InvalidColorFormat(format!(
                "expected 6 hex digits, got {:?}",
                hex
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|e| StudioError::InvalidColorFormat(format!("{}: {}", hex, e)))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Builds a color from untrusted integer channels, each of which must
    /// lie in `[0, 255]`.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self, StudioError> {
        let check = |name: &str, value: i64| {
            u8::try_from(value).map_err(|_| {
                StudioError::InvalidColorChannel(format!(
                    "{} channel {} is outside 0..=255",
                    name, value
                ))
            })
        };

        Ok(Self {
            r: check("red", r)?,
            g: check("green", g)?,
            b: check("blue", b)?,
        })
    }

    /// Canonical uppercase `#RRGGBB` form.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
            .map(|(_, color)| *color)
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        // Ocean Blue
        Self::new(0x00, 0x00, 0xFF)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        color.channels()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Accepts a preset name or a hex string.
impl FromStr for Color {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Color::preset(s) {
            Some(color) => Ok(color),
            None => Color::from_hex(s.trim()),
        }
    }
}

pub fn hex_to_rgb(hex: &str) -> Result<Color, StudioError> {
    Color::from_hex(hex)
}

pub fn rgb_to_hex(channels: [i64; 3]) -> Result<String, StudioError> {
    let [r, g, b] = channels;
    Color::from_channels(r, g, b).map(Color::to_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn parses_with_and_without_prefix() {
        assert_eq!(hex_to_rgb("#FFA500").unwrap(), Color::new(255, 165, 0));
        assert_eq!(hex_to_rgb("ffa500").unwrap(), Color::new(255, 165, 0));
        assert_eq!(hex_to_rgb("#0a0B0c").unwrap(), Color::new(10, 11, 12));
    }

    #[test]
    fn hex_output_is_uppercase_and_padded() {
        assert_eq!(rgb_to_hex([10, 0, 255]).unwrap(), "#0A00FF");
        assert_eq!(Color::new(0, 0, 0).to_hex(), "#000000");
    }

    #[test]
    fn hex_round_trip_normalizes_case() {
        for hex in ["#abcdef", "123456", "#00fF7a", "FFFFFF"] {
            let normalized = format!("#{}", hex.trim_start_matches('#').to_uppercase());
            assert_eq!(hex_to_rgb(hex).unwrap().to_hex(), normalized);
        }
    }

    #[test]
    fn rgb_round_trip_is_exact() {
        for r in (0..=255u8).step_by(17) {
            for g in [0u8, 1, 127, 128, 254, 255] {
                let color = Color::new(r, g, 255 - r);
                assert_eq!(hex_to_rgb(&color.to_hex()).unwrap(), color);
            }
        }
    }

    #[test]
    fn rejects_malformed_hex() {
        for input in ["12345", "#ZZZZZZ", "red", "", "#1234567", "+12345", "#ééé"] {
            let err = hex_to_rgb(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidColorFormat, "input {:?}", input);
        }
    }

    #[test]
    fn rejects_out_of_range_channels() {
        assert_eq!(
            rgb_to_hex([256, 0, 0]).unwrap_err().kind(),
            ErrorKind::InvalidColorChannel
        );
        assert_eq!(
            rgb_to_hex([-1, 0, 0]).unwrap_err().kind(),
            ErrorKind::InvalidColorChannel
        );
    }

    #[test]
    fn parses_presets_by_name() {
        assert_eq!("racing red".parse::<Color>().unwrap(), Color::new(255, 0, 0));
        assert_eq!("#008000".parse::<Color>().unwrap(), Color::new(0, 128, 0));
        assert_eq!(Color::preset(DEFAULT_PRESET), Some(Color::default()));
        assert!("Taxi Yellow".parse::<Color>().is_err());
    }

    #[test]
    fn serializes_as_channel_array() {
        let json = serde_json::to_string(&Color::new(255, 0, 0)).unwrap();
        assert_eq!(json, "[255,0,0]");
        let back: Color = serde_json::from_str("[0, 0, 255]").unwrap();
        assert_eq!(back, Color::new(0, 0, 255));
        assert!(serde_json::from_str::<Color>("[256, 0, 0]").is_err());
    }
}
