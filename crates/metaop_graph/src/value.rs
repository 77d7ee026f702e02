// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property values carried by nodes and meta-operation schemas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Opaque black
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Opaque white
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Fully transparent black
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from a `0xRRGGBB` literal
    pub const fn hex(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or one of the
    /// names `black`, `white`, `transparent`.
    pub fn parse(text: &str) -> Result<Self, ColorParseError> {
        let text = text.trim();
        match text.to_ascii_lowercase().as_str() {
            "black" => return Ok(Self::BLACK),
            "white" => return Ok(Self::WHITE),
            "transparent" => return Ok(Self::TRANSPARENT),
            _ => {}
        }

        let error = || ColorParseError(text.to_string());
        let digits = text.strip_prefix('#').ok_or_else(error)?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(error());
        }

        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| error());
        let nibble = |i: usize| {
            u8::from_str_radix(&digits[i..i + 1], 16)
                .map(|n| n * 17)
                .map_err(|_| error())
        };

        match digits.len() {
            3 => Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            4 => Ok(Self::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(error()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Random seed for noise generators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(pub u32);

/// Path of an external file, resolved by the host's loader
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilePath(pub String);

/// The kind of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyKind {
    /// RGBA color
    Color,
    /// Floating point value
    Double,
    /// Integer value
    Integer,
    /// Random seed
    Seed,
    /// External file path
    FilePath,
    /// Free-form string
    String,
    /// Enumerated value, addressed by nick
    Enum,
}

impl PropertyKind {
    /// Name used in schemas and error messages
    pub fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Double => "double",
            Self::Integer => "integer",
            Self::Seed => "seed",
            Self::FilePath => "file-path",
            Self::String => "string",
            Self::Enum => "enum",
        }
    }

    /// Whether values of this kind are numeric and can be clamped
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Double | Self::Integer | Self::Seed)
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value stored in a node or meta-operation property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Color
    Color(Color),
    /// Double
    Double(f64),
    /// Integer
    Int(i64),
    /// Seed
    Seed(Seed),
    /// File path
    FilePath(String),
    /// String
    String(String),
    /// Enumerant nick
    Enum(String),
}

impl PropertyValue {
    /// Get the kind of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Color(_) => PropertyKind::Color,
            Self::Double(_) => PropertyKind::Double,
            Self::Int(_) => PropertyKind::Integer,
            Self::Seed(_) => PropertyKind::Seed,
            Self::FilePath(_) => PropertyKind::FilePath,
            Self::String(_) => PropertyKind::String,
            Self::Enum(_) => PropertyKind::Enum,
        }
    }

    /// Parse a textual value as the given kind.
    ///
    /// Enumerants may be written either as nick or as numeric code. Doubles
    /// must be finite.
    pub fn parse(kind: PropertyKind, text: &str) -> Result<Self, ValueError> {
        let unparsable = || ValueError::Unparsable {
            text: text.to_string(),
            kind,
        };
        match kind {
            PropertyKind::Color => Ok(Self::Color(Color::parse(text)?)),
            PropertyKind::Double => text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Double)
                .ok_or_else(unparsable),
            PropertyKind::Integer => text.parse().map(Self::Int).map_err(|_| unparsable()),
            PropertyKind::Seed => text
                .parse()
                .map(|s| Self::Seed(Seed(s)))
                .map_err(|_| unparsable()),
            PropertyKind::FilePath => Ok(Self::FilePath(text.to_string())),
            PropertyKind::String => Ok(Self::String(text.to_string())),
            PropertyKind::Enum => Ok(match text.parse::<i64>() {
                Ok(code) => Self::Int(code),
                Err(_) => Self::Enum(text.to_string()),
            }),
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Seed(s) => Some(f64::from(s.0)),
            _ => None,
        }
    }

    /// Textual view of string-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::FilePath(s) | Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(c) => write!(f, "{c}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Seed(s) => write!(f, "{}", s.0),
            Self::FilePath(s) | Self::String(s) | Self::Enum(s) => f.write_str(s),
        }
    }
}

impl From<Color> for PropertyValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Seed> for PropertyValue {
    fn from(value: Seed) -> Self {
        Self::Seed(value)
    }
}

impl From<FilePath> for PropertyValue {
    fn from(value: FilePath) -> Self {
        Self::FilePath(value.0)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Conversion between typed property fields and [`PropertyValue`]
pub trait PropertyType: Sized {
    /// Kind reported for fields of this type
    const KIND: PropertyKind;

    /// Convert from a dynamic value, performing the basic type check
    fn from_value(value: &PropertyValue) -> Result<Self, ValueError>;

    /// Convert into a dynamic value
    fn to_value(&self) -> PropertyValue;
}

fn mismatch(expected: PropertyKind, value: &PropertyValue) -> ValueError {
    ValueError::Mismatch {
        expected,
        found: value.kind(),
    }
}

impl PropertyType for Color {
    const KIND: PropertyKind = PropertyKind::Color;

    fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::Color(c) => Ok(*c),
            PropertyValue::String(s) => Ok(Color::parse(s)?),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn to_value(&self) -> PropertyValue {
        PropertyValue::Color(*self)
    }
}

impl PropertyType for f64 {
    const KIND: PropertyKind = PropertyKind::Double;

    fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::Double(v) => Ok(*v),
            PropertyValue::Int(v) => Ok(*v as f64),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn to_value(&self) -> PropertyValue {
        PropertyValue::Double(*self)
    }
}

impl PropertyType for i64 {
    const KIND: PropertyKind = PropertyKind::Integer;

    fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::Int(v) => Ok(*v),
            PropertyValue::Double(v) if v.is_finite() && v.fract() == 0.0 => Ok(*v as i64),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn to_value(&self) -> PropertyValue {
        PropertyValue::Int(*self)
    }
}

impl PropertyType for Seed {
    const KIND: PropertyKind = PropertyKind::Seed;

    fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::Seed(s) => Ok(*s),
            PropertyValue::Int(v) => u32::try_from(*v)
                .map(Seed)
                .map_err(|_| mismatch(Self::KIND, value)),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn to_value(&self) -> PropertyValue {
        PropertyValue::Seed(*self)
    }
}

impl PropertyType for FilePath {
    const KIND: PropertyKind = PropertyKind::FilePath;

    fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::FilePath(s) | PropertyValue::String(s) => Ok(FilePath(s.clone())),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn to_value(&self) -> PropertyValue {
        PropertyValue::FilePath(self.0.clone())
    }
}

impl PropertyType for String {
    const KIND: PropertyKind = PropertyKind::String;

    fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::String(s) => Ok(s.clone()),
            other => Err(mismatch(Self::KIND, other)),
        }
    }

    fn to_value(&self) -> PropertyValue {
        PropertyValue::String(self.clone())
    }
}

/// Error when a color string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color: `{0}`")]
pub struct ColorParseError(pub String);

/// Reason a value was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// The value has the wrong kind
    #[error("expected {expected}, found {found}")]
    Mismatch {
        /// Kind the property accepts
        expected: PropertyKind,
        /// Kind that was supplied
        found: PropertyKind,
    },

    /// The value is outside an enumerated domain
    #[error("`{value}` is not one of: {}", .domain.join(", "))]
    OutOfDomain {
        /// Offending value
        value: String,
        /// Accepted values
        domain: Vec<String>,
    },

    /// Malformed color
    #[error(transparent)]
    Color(#[from] ColorParseError),

    /// Text could not be parsed as the requested kind
    #[error("cannot parse `{text}` as {kind}")]
    Unparsable {
        /// Source text
        text: String,
        /// Requested kind
        kind: PropertyKind,
    },
}

/// Error when reading or writing a property
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// No property with this name
    #[error("`{owner}` has no property `{property}`")]
    UnknownProperty {
        /// Operation or meta-operation that was addressed
        owner: String,
        /// Requested property name
        property: String,
    },

    /// The value was rejected
    #[error("Invalid value for `{property}`: {reason}")]
    InvalidValue {
        /// Property being written
        property: String,
        /// Why it was rejected
        #[source]
        reason: ValueError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#ff7aff").unwrap(), Color::rgb(0xff, 0x7a, 0xff));
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("#00000000").unwrap(), Color::TRANSPARENT);
        assert_eq!(Color::parse("Black").unwrap(), Color::BLACK);
        assert!(Color::parse("ff7aff").is_err());
        assert!(Color::parse("#ff7af").is_err());
        assert!(Color::parse("#+f+f+f").is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::hex(0x74e3ff).to_string(), "#74e3ff");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_string(), "#01020304");
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_string(&Color::hex(0xff7aff)).unwrap();
        assert_eq!(json, "\"#ff7aff\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::hex(0xff7aff));
    }

    #[test]
    fn test_parse_by_kind() {
        assert_eq!(
            PropertyValue::parse(PropertyKind::Double, "2").unwrap(),
            PropertyValue::Double(2.0)
        );
        assert_eq!(
            PropertyValue::parse(PropertyKind::Enum, "41").unwrap(),
            PropertyValue::Int(41)
        );
        assert_eq!(
            PropertyValue::parse(PropertyKind::Enum, "divide").unwrap(),
            PropertyValue::Enum("divide".to_string())
        );
        assert!(PropertyValue::parse(PropertyKind::Integer, "1.5").is_err());
        assert!(PropertyValue::parse(PropertyKind::Seed, "-1").is_err());
        assert!(PropertyValue::parse(PropertyKind::Double, "NaN").is_err());
        assert!(PropertyValue::parse(PropertyKind::Double, "inf").is_err());
    }

    #[test]
    fn test_typed_conversions() {
        assert_eq!(f64::from_value(&PropertyValue::Int(3)).unwrap(), 3.0);
        assert_eq!(i64::from_value(&PropertyValue::Double(4.0)).unwrap(), 4);
        assert!(i64::from_value(&PropertyValue::Double(4.5)).is_err());
        assert_eq!(Seed::from_value(&PropertyValue::Int(7)).unwrap(), Seed(7));
        assert!(matches!(
            Color::from_value(&PropertyValue::Double(1.0)),
            Err(ValueError::Mismatch { expected: PropertyKind::Color, .. })
        ));
    }
}
