//! Colour extraction from loosely structured model output.
//!
//! Upstream models are asked for a bare JSON array, but routinely wrap it in
//! markdown fences, prepend prose, or skip JSON altogether. Extraction runs an
//! ordered chain of strategies and stops at the first one that yields colours.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::palette::color::{unique_colors, HexColor};

static HEX_COLOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})\b").expect("hex colour pattern is valid")
});

static CODE_FENCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("code fence pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole text decoded as JSON.
    Strict,
    /// JSON decoded after removing fences and surrounding prose.
    Unwrapped,
    /// Bare `#hex` codes scanned out of free text.
    PatternScan,
}

impl ParseStrategy {
    pub fn label(self) -> &'static str {
        match self {
            ParseStrategy::Strict => "strict",
            ParseStrategy::Unwrapped => "unwrapped",
            ParseStrategy::PatternScan => "pattern_scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedColors {
    pub colors: Vec<HexColor>,
    /// True when a structured JSON decode produced the colours.
    pub well_formed: bool,
    pub strategy: Option<ParseStrategy>,
}

type Strategy = fn(&str) -> Option<Vec<HexColor>>;

const STRATEGIES: [(ParseStrategy, Strategy); 3] = [
    (ParseStrategy::Strict, decode_strict),
    (ParseStrategy::Unwrapped, decode_unwrapped),
    (ParseStrategy::PatternScan, scan_hex_codes),
];

/// Never fails: text without any recognisable colour yields an empty list.
pub fn parse_color_list(raw: &str) -> ParsedColors {
    for (strategy, run) in STRATEGIES {
        if let Some(colors) = run(raw).filter(|colors| !colors.is_empty()) {
            return ParsedColors {
                colors,
                well_formed: strategy != ParseStrategy::PatternScan,
                strategy: Some(strategy),
            };
        }
    }

    ParsedColors {
        colors: Vec::new(),
        well_formed: false,
        strategy: None,
    }
}

fn decode_strict(raw: &str) -> Option<Vec<HexColor>> {
    let value = serde_json::from_str::<Value>(raw.trim()).ok()?;
    Some(colors_from_value(&value))
}

fn decode_unwrapped(raw: &str) -> Option<Vec<HexColor>> {
    let unfenced = CODE_FENCE_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str())
        .unwrap_or(raw);
    let candidate = json_span(unfenced)?;
    let value = serde_json::from_str::<Value>(candidate).ok()?;
    Some(colors_from_value(&value))
}

fn scan_hex_codes(raw: &str) -> Option<Vec<HexColor>> {
    let found = HEX_COLOR_PATTERN
        .find_iter(raw)
        .filter_map(|found| HexColor::parse(found.as_str()));
    Some(unique_colors(found))
}

/// The slice from the first opening bracket or brace to the last closing one.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c == '[' || c == '{')?;
    let end = text.rfind(|c: char| c == ']' || c == '}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn colors_from_value(value: &Value) -> Vec<HexColor> {
    let mut colors = Vec::new();
    collect_colors(value, &mut colors);
    unique_colors(colors)
}

fn collect_colors(value: &Value, colors: &mut Vec<HexColor>) {
    collect_colors_from(value, false, colors);
}

/// A code written without `#` counts only when it is six characters long and
/// either holds a digit or sits directly in an array, so object values like
/// `"facade"` or `"add"` stay words.
fn accepts_bare_code(text: &str, in_array: bool) -> bool {
    text.len() == 6 && (in_array || text.chars().any(|c| c.is_ascii_digit()))
}

fn collect_colors_from(value: &Value, in_array: bool, colors: &mut Vec<HexColor>) {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if !text.starts_with('#') && !accepts_bare_code(text, in_array) {
                return;
            }
            if let Some(color) = HexColor::parse(text) {
                colors.push(color);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_colors_from(item, true, colors);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_colors_from(item, false, colors);
            }
        }
        _ => {}
    }
}
