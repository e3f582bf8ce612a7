use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MapViewError;

/// Color representation.
///
/// In option maps colors are given either by name (`black`, `blue`, `green`, `red`,
/// `transparent`, `white`, case-insensitive) or as a HEX6/HEX8 string.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = MapViewError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_hex()
    }
}

impl FromStr for Color {
    type Err = MapViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(color) = Self::from_name(s) {
            return Ok(color);
        }

        Self::try_from_hex(s).ok_or_else(|| MapViewError::config(format!("unknown color '{s}'")))
    }
}

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Red color: `#FF0000FF`
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Green color: `#00FF00FF`
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    /// Blue color: `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Gray color: `#AAAAAAFF`
    pub const GRAY: Color = Color::rgba(170, 170, 170, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Looks up one of the named colors.
    pub fn from_name(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "blue" => Self::BLUE,
            "green" => Self::GREEN,
            "red" => Self::RED,
            "transparent" => Self::TRANSPARENT,
            "white" => Self::WHITE,
            "gray" | "grey" => Self::GRAY,
            _ => return None,
        };

        Some(color)
    }

    /// Converts the color into u8 array (RGBA).
    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses a color from the hex string. Hex string can be either HEX6 (`#RRGGBB`) or HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        if hex_string.len() != 7 && hex_string.len() != 9 || hex_string.chars().next()? != '#' {
            return None;
        }

        let r = u8::from_str_radix(hex_string.get(1..3)?, 16).ok()?;
        let g = u8::from_str_radix(hex_string.get(3..5)?, 16).ok()?;
        let b = u8::from_str_radix(hex_string.get(5..7)?, 16).ok()?;
        let a = if hex_string.len() == 9 {
            u8::from_str_radix(hex_string.get(7..9)?, 16).ok()?
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// Returns a new color instance, copied from the base one but with the given alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Returns true if the color is fully transparent (`a == 0`).
    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Red component of the color in RGBA space.
    pub fn r(&self) -> u8 {
        self.r
    }

    /// Green component of the color in RGBA space.
    pub fn g(&self) -> u8 {
        self.g
    }

    /// Blue component of the color in RGBA space.
    pub fn b(&self) -> u8 {
        self.b
    }

    /// Opacity component of the color.
    pub fn a(&self) -> u8 {
        self.a
    }

    /// Blends `fore` over `self` (source-over compositing).
    pub fn blend(&self, fore: Color) -> Color {
        if fore.a == 255 {
            return fore;
        }
        if fore.a == 0 {
            return *self;
        }

        let fa = fore.a as f32 / 255.0;
        let ba = self.a as f32 / 255.0;
        let out_a = fa + ba * (1.0 - fa);

        let channel = |f: u8, b: u8| -> u8 {
            let f = f as f32 / 255.0;
            let b = b as f32 / 255.0;
            (((f * fa + b * ba * (1.0 - fa)) / out_a) * 255.0).round() as u8
        };

        Color {
            r: channel(fore.r, self.r),
            g: channel(fore.g, self.g),
            b: channel(fore.b, self.b),
            a: (out_a * 255.0).round() as u8,
        }
    }
}
