//! FILENAME: model/src/theme.rs
//! PURPOSE: Format-independent styling: style attribute maps, selectors and
//! the cascading theme that resolves them.
//! CONTEXT: A Theme is an ordered list of (selector, style) rules. Resolving
//! a selector path folds every matching rule in declaration order, later
//! rules winning attribute by attribute, onto the empty default style.
//! Attribute names are open: anything a renderer does not understand is kept
//! as-is and reported by the renderer, never rejected here.

use crate::assignment::{Assignment, Coordinate};
use crate::cell::SummarizerId;
use crate::dimension::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// WELL-KNOWN ATTRIBUTES
// ============================================================================

/// Names of the attributes every built-in renderer knows about.
pub mod attr {
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
    pub const STRIKETHROUGH: &str = "strikethrough";
    /// Text color, `#rrggbb` or `#rrggbbaa`.
    pub const COLOR: &str = "color";
    /// Fill color, `#rrggbb` or `#rrggbbaa`.
    pub const BACKGROUND: &str = "background";
    /// `left`, `center`, `right` or `general`.
    pub const ALIGN: &str = "align";
    pub const FONT_FAMILY: &str = "font_family";
    /// Points.
    pub const FONT_SIZE: &str = "font_size";
    /// Separator rule above the element.
    pub const BORDER_TOP: &str = "border_top";
    /// Separator rule below the element.
    pub const BORDER_BOTTOM: &str = "border_bottom";
    /// Fixed number of decimal places for numbers.
    pub const DECIMALS: &str = "decimals";
    pub const THOUSANDS: &str = "thousands";
    pub const PERCENT: &str = "percent";

    /// Attributes that only change how a number is written, not how it looks.
    /// Every renderer honors them through `format_value`.
    pub const NUMBER_FORMAT: [&str; 3] = [DECIMALS, THOUSANDS, PERCENT];
}

// ============================================================================
// ATTRIBUTE VALUES
// ============================================================================

/// Text alignment options for cell content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    General, // Auto: numbers right, text left
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Some(TextAlign::General),
            "left" => Some(TextAlign::Left),
            "center" | "centre" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::General => "general",
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

/// RGB color representation.
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

    /// Convert to CSS string.
    pub fn to_css(&self) -> String {
        if self.a == 255 {
            self.to_hex()
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

    /// `RRGGBB` without the leading '#', alpha ignored.
    pub fn to_hex_digits(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse from hex string (e.g., "#FF0000" or "FF0000").
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Color::new(r, g, b))
        } else if hex.len() == 8 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
            Some(Color::with_alpha(r, g, b, a))
        } else {
            None
        }
    }
}

/// A single style attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl StyleValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StyleValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StyleValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StyleValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        StyleValue::Bool(value)
    }
}

impl From<i64> for StyleValue {
    fn from(value: i64) -> Self {
        StyleValue::Integer(value)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Text(value)
    }
}

// ============================================================================
// STYLE
// ============================================================================

/// An attribute map. Used both for rule bodies and for resolved styles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style {
    attributes: BTreeMap<String, StyleValue>,
}

impl Style {
    /// The built-in default: no attributes at all.
    pub fn new() -> Self {
        Style::default()
    }

    /// Sets any attribute, known or not.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_bold(self, bold: bool) -> Self {
        self.with(attr::BOLD, bold)
    }

    pub fn with_italic(self, italic: bool) -> Self {
        self.with(attr::ITALIC, italic)
    }

    pub fn with_underline(self, underline: bool) -> Self {
        self.with(attr::UNDERLINE, underline)
    }

    pub fn with_strikethrough(self, strikethrough: bool) -> Self {
        self.with(attr::STRIKETHROUGH, strikethrough)
    }

    pub fn with_text_color(self, color: Color) -> Self {
        self.with(attr::COLOR, color.to_hex())
    }

    pub fn with_background(self, color: Color) -> Self {
        self.with(attr::BACKGROUND, color.to_hex())
    }

    pub fn with_text_align(self, align: TextAlign) -> Self {
        self.with(attr::ALIGN, align.as_str())
    }

    pub fn with_font_family(self, family: impl Into<String>) -> Self {
        self.with(attr::FONT_FAMILY, family.into())
    }

    pub fn with_font_size(self, points: i64) -> Self {
        self.with(attr::FONT_SIZE, points)
    }

    pub fn with_border_top(self, border: bool) -> Self {
        self.with(attr::BORDER_TOP, border)
    }

    pub fn with_border_bottom(self, border: bool) -> Self {
        self.with(attr::BORDER_BOTTOM, border)
    }

    pub fn with_decimals(self, decimals: i64) -> Self {
        self.with(attr::DECIMALS, decimals)
    }

    pub fn with_thousands(self, thousands: bool) -> Self {
        self.with(attr::THOUSANDS, thousands)
    }

    pub fn with_percent(self, percent: bool) -> Self {
        self.with(attr::PERCENT, percent)
    }

    pub fn get(&self, name: &str) -> Option<&StyleValue> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: StyleValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<StyleValue> {
        self.attributes.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> + '_ {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overlays `other` onto `self`: attributes in `other` win.
    pub fn merge(&mut self, other: &Style) {
        for (name, value) in &other.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(StyleValue::as_bool).unwrap_or(false)
    }

    pub fn is_bold(&self) -> bool {
        self.flag(attr::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.flag(attr::ITALIC)
    }

    pub fn is_underline(&self) -> bool {
        self.flag(attr::UNDERLINE)
    }

    pub fn is_strikethrough(&self) -> bool {
        self.flag(attr::STRIKETHROUGH)
    }

    pub fn has_border_top(&self) -> bool {
        self.flag(attr::BORDER_TOP)
    }

    pub fn has_border_bottom(&self) -> bool {
        self.flag(attr::BORDER_BOTTOM)
    }

    pub fn color(&self) -> Option<Color> {
        self.get(attr::COLOR)
            .and_then(StyleValue::as_text)
            .and_then(Color::from_hex)
    }

    pub fn background(&self) -> Option<Color> {
        self.get(attr::BACKGROUND)
            .and_then(StyleValue::as_text)
            .and_then(Color::from_hex)
    }

    pub fn align(&self) -> Option<TextAlign> {
        self.get(attr::ALIGN)
            .and_then(StyleValue::as_text)
            .and_then(TextAlign::parse)
    }

    pub fn font_family(&self) -> Option<&str> {
        self.get(attr::FONT_FAMILY).and_then(StyleValue::as_text)
    }

    /// Point size, clamped to what spreadsheet and document formats accept.
    pub fn font_size(&self) -> Option<i64> {
        self.get(attr::FONT_SIZE)
            .and_then(StyleValue::as_integer)
            .map(|size| size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE))
    }

    pub fn decimals(&self) -> Option<u8> {
        self.get(attr::DECIMALS)
            .and_then(StyleValue::as_integer)
            .map(|d| d.clamp(0, 15) as u8)
    }

    pub fn thousands(&self) -> bool {
        self.flag(attr::THOUSANDS)
    }

    pub fn percent(&self) -> bool {
        self.flag(attr::PERCENT)
    }
}

pub const MIN_FONT_SIZE: i64 = 1;
pub const MAX_FONT_SIZE: i64 = 409;

// ============================================================================
// SELECTORS
// ============================================================================

/// The structural scope a rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Everything in the table.
    Table,
    Title,
    Subtitle,
    Note,
    /// Facet captions.
    Facet,
    /// Column and row header cells.
    Header,
    /// Data and margin cells.
    Body,
    /// Row header cells and every body cell of a row.
    Row,
    /// Column header cells and every body cell of a column.
    Column,
    /// Body cells.
    Cell,
    /// Synthesized margin cells and the headers of margin rows/columns.
    Margin,
}

/// Which elements a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub scope: Scope,
    /// Restrict to elements that carry a coordinate for this dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Restrict further to one level of `dimension`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer: Option<SummarizerId>,
}

impl Selector {
    pub fn scope(scope: Scope) -> Self {
        Selector {
            scope,
            dimension: None,
            label: None,
            summarizer: None,
        }
    }

    pub fn dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    pub fn label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn summarizer(mut self, summarizer: impl Into<SummarizerId>) -> Self {
        self.summarizer = Some(summarizer.into());
        self
    }

    pub fn matches(&self, path: &SelectorPath) -> bool {
        if !path.scopes.contains(&self.scope) {
            return false;
        }
        if let Some(dimension) = &self.dimension {
            match (path.coordinates.get(dimension), &self.label) {
                (None, _) => return false,
                (Some(Coordinate::Level(l)), Some(wanted)) if l != wanted => return false,
                (Some(Coordinate::All), Some(_)) => return false,
                _ => {}
            }
        }
        if let Some(summarizer) = &self.summarizer {
            if path.summarizer.as_ref() != Some(summarizer) {
                return false;
            }
        }
        true
    }
}

/// Describes one rendered element for style resolution: the scopes it belongs
/// to plus the coordinates and summarizer it stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorPath {
    pub scopes: Vec<Scope>,
    pub coordinates: Assignment,
    pub summarizer: Option<SummarizerId>,
}

impl SelectorPath {
    pub fn new(scopes: impl IntoIterator<Item = Scope>) -> Self {
        SelectorPath {
            scopes: scopes.into_iter().collect(),
            coordinates: Assignment::new(),
            summarizer: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Assignment) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Option<SummarizerId>) -> Self {
        self.summarizer = summarizer;
        self
    }
}

// ============================================================================
// THEME
// ============================================================================

/// One cascade rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRule {
    pub selector: Selector,
    pub style: Style,
}

/// An ordered list of style rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub rules: Vec<ThemeRule>,
}

impl Theme {
    pub fn new() -> Self {
        Theme::default()
    }

    /// Builder: appends a rule.
    pub fn rule(mut self, selector: Selector, style: Style) -> Self {
        self.push(selector, style);
        self
    }

    pub fn push(&mut self, selector: Selector, style: Style) {
        self.rules.push(ThemeRule { selector, style });
    }

    /// A theme whose rules are ours followed by `other`'s, so `other` wins.
    pub fn layered(&self, other: &Theme) -> Theme {
        let mut rules = self.rules.clone();
        rules.extend(other.rules.iter().cloned());
        Theme { rules }
    }

    /// Folds every matching rule in declaration order onto the default style.
    pub fn resolve(&self, path: &SelectorPath) -> Style {
        self.rules
            .iter()
            .filter(|rule| rule.selector.matches(path))
            .fold(Style::new(), |mut resolved, rule| {
                resolved.merge(&rule.style);
                resolved
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
