//! FILENAME: core/engine/src/style.rs
//! PURPOSE: Explicit per-cell style overrides for the design grid.
//! CONTEXT: Only properties the user explicitly set are stored, never resolved
//! theme values. The property set is a fixed allow-list so that snapshots stay
//! portable between sessions and themes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    #[error("unknown style property: {0}")]
    UnknownProperty(String),
}

/// Style properties a cell may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleProperty {
    FontWeight,
    FontStyle,
    TextDecoration,
    BackgroundColor,
    Color,
    FontSize,
    TextAlign,
}

impl StyleProperty {
    pub const ALL: [StyleProperty; 7] = [
        StyleProperty::FontWeight,
        StyleProperty::FontStyle,
        StyleProperty::TextDecoration,
        StyleProperty::BackgroundColor,
        StyleProperty::Color,
        StyleProperty::FontSize,
        StyleProperty::TextAlign,
    ];

    /// The camelCase CSS property name used in snapshots.
    pub fn css_name(&self) -> &'static str {
        match self {
            StyleProperty::FontWeight => "fontWeight",
            StyleProperty::FontStyle => "fontStyle",
            StyleProperty::TextDecoration => "textDecoration",
            StyleProperty::BackgroundColor => "backgroundColor",
            StyleProperty::Color => "color",
            StyleProperty::FontSize => "fontSize",
            StyleProperty::TextAlign => "textAlign",
        }
    }

    /// Whether `value` is the neutral value the designer renders anyway.
    pub fn is_default_value(&self, value: &str) -> bool {
        let v = value.trim().to_ascii_lowercase();
        if v.is_empty() {
            return true;
        }
        match self {
            StyleProperty::FontWeight => v == "normal" || v == "400",
            StyleProperty::FontStyle => v == "normal",
            StyleProperty::TextDecoration => v == "none" || v.starts_with("none "),
            StyleProperty::BackgroundColor => {
                v == "transparent" || Color::parse_css(&v).map(|c| c.a == 0).unwrap_or(false)
            }
            StyleProperty::Color => Color::parse_css(&v) == Some(Color::black()),
            StyleProperty::FontSize => v == "10px",
            StyleProperty::TextAlign => v == "left" || v == "start",
        }
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

impl FromStr for StyleProperty {
    type Err = StyleError;

    /// Accepts camelCase ("fontWeight") or kebab-case ("font-weight").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '-').collect::<String>().to_ascii_lowercase();
        StyleProperty::ALL
            .iter()
            .copied()
            .find(|p| p.css_name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| StyleError::UnknownProperty(s.to_string()))
    }
}

/// RGBA color, used to recognise default colors regardless of notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8, // Alpha channel (255 = opaque)
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub const fn black() -> Self {
        Color::new(0, 0, 0)
    }

    pub const fn transparent() -> Self {
        Color::with_alpha(0, 0, 0, 0)
    }

    /// Convert to CSS hex or rgba() string.
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {:.2})",
                self.r,
                self.g,
                self.b,
                self.a as f32 / 255.0
            )
        }
    }

    /// Parse from hex string (e.g., "#FF0000", "F00" or "FF000080").
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let mut parts = hex.chars().map(|c| channel(&format!("{c}{c}")));
                Some(Color::new(parts.next()??, parts.next()??, parts.next()??))
            }
            6 => Some(Color::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            8 => Some(Color::with_alpha(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Parse any of the notations a browser reports for inline colors:
    /// hex, `rgb(r, g, b)`, `rgba(r, g, b, a)` and `transparent`.
    pub fn parse_css(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v == "transparent" {
            return Some(Color::transparent());
        }
        if v.starts_with('#') {
            return Color::from_hex(&v);
        }
        let inner = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))?
            .strip_suffix(')')?;
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let rgb: Vec<u8> = parts
            .iter()
            .take(3)
            .map(|p| p.parse::<u8>().ok())
            .collect::<Option<Vec<u8>>>()?;
        if rgb.len() != 3 {
            return None;
        }
        let a = match parts.get(3) {
            Some(alpha) => {
                let alpha: f32 = alpha.parse().ok()?;
                (alpha.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        Some(Color::with_alpha(rgb[0], rgb[1], rgb[2], a))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

/// Explicitly set style properties of one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleOverrides {
    props: BTreeMap<StyleProperty, String>,
}

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, prop: StyleProperty) -> Option<&str> {
        self.props.get(&prop).map(String::as_str)
    }

    /// Sets a property; an empty value removes it, as clearing an inline
    /// style does in the browser.
    pub fn set(&mut self, prop: StyleProperty, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.props.remove(&prop);
        } else {
            self.props.insert(prop, value.trim().to_string());
        }
    }

    /// Sets a property by its CSS name.
    pub fn set_named(&mut self, name: &str, value: &str) -> Result<StyleProperty, StyleError> {
        let prop: StyleProperty = name.parse()?;
        self.set(prop, value);
        Ok(prop)
    }

    pub fn remove(&mut self, prop: StyleProperty) -> Option<String> {
        self.props.remove(&prop)
    }

    /// Toolbar toggle: switches between `on_value` and no override.
    /// Returns true when the property is now set.
    pub fn toggle(&mut self, prop: StyleProperty, on_value: &str) -> bool {
        if self.get(prop) == Some(on_value) {
            self.props.remove(&prop);
            false
        } else {
            self.props.insert(prop, on_value.to_string());
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StyleProperty, &str)> {
        self.props.iter().map(|(p, v)| (*p, v.as_str()))
    }

    /// True when at least one property differs from the rendered default.
    pub fn has_non_default(&self) -> bool {
        self.props.iter().any(|(p, v)| !p.is_default_value(v))
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }

    /// CSS-name keyed copy, the shape snapshots carry.
    pub fn to_css_map(&self) -> BTreeMap<String, String> {
        self.props
            .iter()
            .map(|(p, v)| (p.css_name().to_string(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names_parse_both_cases() {
        assert_eq!("fontWeight".parse::<StyleProperty>(), Ok(StyleProperty::FontWeight));
        assert_eq!("background-color".parse::<StyleProperty>(), Ok(StyleProperty::BackgroundColor));
        assert_eq!(
            "border".parse::<StyleProperty>(),
            Err(StyleError::UnknownProperty("border".to_string()))
        );
    }

    #[test]
    fn test_color_parse_css() {
        assert_eq!(Color::parse_css("#000"), Some(Color::black()));
        assert_eq!(Color::parse_css("rgb(0, 0, 0)"), Some(Color::black()));
        assert_eq!(Color::parse_css("rgba(0, 0, 0, 0)"), Some(Color::transparent()));
        assert_eq!(Color::parse_css("#e0e0e0"), Some(Color::new(224, 224, 224)));
        assert_eq!(Color::parse_css("red"), None);
        assert_eq!(Color::new(255, 0, 0).to_css(), "#ff0000");
    }

    #[test]
    fn test_hex_with_multibyte_chars_is_not_a_color() {
        assert_eq!(Color::from_hex("#aéaaa"), None);
        assert_eq!(Color::from_hex("ééé"), None);
        assert_eq!(Color::parse_css("#aéaaa"), None);
        assert!(!StyleProperty::BackgroundColor.is_default_value("#aéaaa"));

        let mut style = StyleOverrides::new();
        style.set(StyleProperty::BackgroundColor, "#aéaaa");
        assert!(style.has_non_default());
    }

    #[test]
    fn test_default_detection() {
        assert!(StyleProperty::FontWeight.is_default_value("normal"));
        assert!(!StyleProperty::FontWeight.is_default_value("bold"));
        assert!(StyleProperty::Color.is_default_value("rgb(0, 0, 0)"));
        assert!(!StyleProperty::Color.is_default_value("#ff0000"));
        assert!(StyleProperty::BackgroundColor.is_default_value("rgba(0, 0, 0, 0)"));
        assert!(!StyleProperty::BackgroundColor.is_default_value("#e0e0e0"));
        assert!(StyleProperty::FontSize.is_default_value("10px"));
        assert!(!StyleProperty::TextAlign.is_default_value("center"));
    }

    #[test]
    fn test_overrides_set_and_toggle() {
        let mut style = StyleOverrides::new();
        assert!(style.toggle(StyleProperty::FontWeight, "bold"));
        assert_eq!(style.get(StyleProperty::FontWeight), Some("bold"));
        assert!(style.has_non_default());
        assert!(!style.toggle(StyleProperty::FontWeight, "bold"));
        assert!(style.is_empty());

        style.set(StyleProperty::Color, "#000000");
        assert!(!style.has_non_default());
        style.set(StyleProperty::Color, "");
        assert!(style.is_empty());
    }

    #[test]
    fn test_serializes_as_css_map() {
        let mut style = StyleOverrides::new();
        style.set(StyleProperty::TextAlign, "center");
        style.set(StyleProperty::FontWeight, "bold");
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(json, r#"{"fontWeight":"bold","textAlign":"center"}"#);
    }
}
