//! Color parsing utilities

use crate::{
    error::{Result, SplicerError},
    types::BackgroundColor,
};

/// Utility for parsing and formatting colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string to a solid `BackgroundColor`
    ///
    /// Supports both #RRGGBB and #RGB formats, with or without the `#` prefix.
    ///
    /// # Examples
    /// ```rust
    /// use photo_splicer::{utils::ColorParser, BackgroundColor};
    ///
    /// assert_eq!(ColorParser::parse_hex("#ffffff").unwrap(), BackgroundColor::solid(255, 255, 255));
    /// assert_eq!(ColorParser::parse_hex("f00").unwrap(), BackgroundColor::solid(255, 0, 0));
    /// ```
    ///
    /// # Errors
    /// Returns `SplicerError::InvalidConfig` for malformed input
    pub fn parse_hex(hex: &str) -> Result<BackgroundColor> {
        let hex = hex.trim().trim_start_matches('#');

        if !hex.is_ascii() {
            return Err(SplicerError::invalid_config(format!(
                "Invalid color '{}': expected #RRGGBB or #RGB",
                hex
            )));
        }

        match hex.len() {
            6 => {
                let r = Self::component(hex, 0..2, "red")?;
                let g = Self::component(hex, 2..4, "green")?;
                let b = Self::component(hex, 4..6, "blue")?;
                Ok(BackgroundColor::solid(r, g, b))
            },
            3 => {
                // #RGB expands each digit: 0xf -> 0xff
                let r = Self::component(hex, 0..1, "red")? * 17;
                let g = Self::component(hex, 1..2, "green")? * 17;
                let b = Self::component(hex, 2..3, "blue")? * 17;
                Ok(BackgroundColor::solid(r, g, b))
            },
            _ => Err(SplicerError::invalid_config(format!(
                "Invalid color '{}': expected #RRGGBB or #RGB",
                hex
            ))),
        }
    }

    /// Format a solid color as `#rrggbb`
    #[must_use]
    pub fn to_hex(r: u8, g: u8, b: u8) -> String {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    fn component(hex: &str, range: std::ops::Range<usize>, name: &str) -> Result<u8> {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .ok_or_else(|| {
                SplicerError::invalid_config(format!("Invalid {} component in hex color", name))
            })
    }
}
