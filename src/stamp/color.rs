//! RGB tint color and its `#RRGGBB` form

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StampError;

/// Color applied to the dark pixels of a stamp. Alpha always comes from the
/// stamp itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Color a freshly dropped stamp starts with
pub const DEFAULT_COLOR: Color = Color::BLACK;

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        DEFAULT_COLOR
    }
}

impl FromStr for Color {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StampError::InvalidColor(s.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| StampError::InvalidColor(s.to_string()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = StampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_hash() {
        assert_eq!("#ff0000".parse::<Color>().unwrap(), Color::RED);
        assert_eq!("0000FF".parse::<Color>().unwrap(), Color::BLUE);
        assert_eq!(" #1a2B3c ".parse::<Color>().unwrap(), Color::new(0x1a, 0x2b, 0x3c));
    }

    #[test]
    fn rejects_malformed_hex() {
        for bad in ["", "#", "#fff", "#12345g", "#1234567", "red", "#+12345"] {
            assert!(
                matches!(bad.parse::<Color>(), Err(StampError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_is_lowercase_hex() {
        assert_eq!(Color::new(171, 205, 239).to_string(), "#abcdef");
        assert_eq!(DEFAULT_COLOR.to_string(), "#000000");
    }

    #[test]
    fn serde_uses_hex_string() {
        let yaml = serde_yaml::to_string(&Color::RED).unwrap();
        assert!(yaml.contains("#ff0000"));
        assert_eq!(serde_yaml::from_str::<Color>(&yaml).unwrap(), Color::RED);
        let back: Color = serde_yaml::from_str("\"#00ff00\"").unwrap();
        assert_eq!(back, Color::new(0, 255, 0));
        assert!(serde_yaml::from_str::<Color>("\"nope\"").is_err());
    }
}
