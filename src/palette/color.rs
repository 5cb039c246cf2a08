use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// A validated `#RRGGBB` or `#RGB` colour.
///
/// The spelling the upstream model produced is kept for output, while equality
/// and hashing go through the decoded channels so `#abc`, `#AABBCC` and
/// `#aabbcc` all compare equal.
#[derive(Debug, Clone)]
pub struct HexColor {
    raw: String,
    rgb: [u8; 3],
}

impl HexColor {
    /// Accepts an optional leading `#` and surrounding whitespace; anything
    /// that is not exactly three or six hex digits is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return None;
        }

        let rgb = match digits.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (index, channel) in rgb.iter_mut().enumerate() {
                    let nibble = u8::from_str_radix(&digits[index..index + 1], 16).ok()?;
                    *channel = nibble * 17;
                }
                rgb
            }
            6 => {
                let mut rgb = [0u8; 3];
                for (index, channel) in rgb.iter_mut().enumerate() {
                    let start = index * 2;
                    *channel = u8::from_str_radix(&digits[start..start + 2], 16).ok()?;
                }
                rgb
            }
            _ => return None,
        };

        Some(HexColor {
            raw: format!("#{digits}"),
            rgb,
        })
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        HexColor {
            raw: format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2]),
            rgb,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Uppercase six-digit form used for comparisons and logs.
    pub fn canonical(&self) -> String {
        Self::from_rgb(self.rgb).raw
    }

    /// Perceived brightness on a 0-255 scale (ITU-R BT.601 weights).
    pub fn brightness(&self) -> f64 {
        let [r, g, b] = self.rgb.map(u32::from);
        f64::from(r * 299 + g * 587 + b * 114) / 1000.0
    }

    /// Scales every channel toward black by `percent`, rounding to nearest.
    pub fn darken(&self, percent: u8) -> Self {
        let keep = 100 - u32::from(percent.min(100));
        Self::from_rgb(
            self.rgb
                .map(|channel| ((u32::from(channel) * keep + 50) / 100) as u8),
        )
    }

    /// Moves every channel toward white by `percent` of its remaining headroom.
    pub fn lighten(&self, percent: u8) -> Self {
        let percent = u32::from(percent.min(100));
        Self::from_rgb(self.rgb.map(|channel| {
            let headroom = 255 - u32::from(channel);
            (u32::from(channel) + (headroom * percent + 50) / 100) as u8
        }))
    }

    pub fn complement(&self) -> Self {
        Self::from_rgb(self.rgb.map(|channel| 255 - channel))
    }
}

impl PartialEq for HexColor {
    fn eq(&self, other: &Self) -> bool {
        self.rgb == other.rgb
    }
}

impl Eq for HexColor {}

impl Hash for HexColor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rgb.hash(state);
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Drops repeated colours, keeping the first spelling seen.
pub fn unique_colors<I>(colors: I) -> Vec<HexColor>
where
    I: IntoIterator<Item = HexColor>,
{
    let mut seen = HashSet::new();
    colors
        .into_iter()
        .filter(|color| seen.insert(color.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(value: &str) -> HexColor {
        HexColor::parse(value).expect("valid colour")
    }

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!(hex("#3498db").canonical(), "#3498DB");
        assert_eq!(hex("#abc").canonical(), "#AABBCC");
        assert_eq!(hex("  #FFF ").as_str(), "#FFF");
    }

    #[test]
    fn adds_missing_hash_prefix() {
        let color = hex("2ecc71");
        assert_eq!(color.as_str(), "#2ecc71");
    }

    #[test]
    fn rejects_malformed_values() {
        for value in ["", "#", "#12", "#1234", "#12345g", "#1234567", "blue", "# 123456"] {
            assert!(HexColor::parse(value).is_none(), "{value} should be rejected");
        }
    }

    #[test]
    fn equality_ignores_case_and_short_form() {
        assert_eq!(hex("#aabbcc"), hex("#AABBCC"));
        assert_eq!(hex("#abc"), hex("#AABBCC"));
        assert_ne!(hex("#aabbcc"), hex("#aabbcd"));
        assert_eq!(hex("#abc").canonical(), "#AABBCC");
    }

    #[test]
    fn keeps_original_spelling_when_serialized() {
        let value = serde_json::to_value(hex("#f2F2f2")).unwrap();
        assert_eq!(value, serde_json::json!("#f2F2f2"));
    }

    #[test]
    fn brightness_matches_perceived_weights() {
        assert_eq!(hex("#FFFFFF").brightness(), 255.0);
        assert_eq!(hex("#000000").brightness(), 0.0);
        assert!((hex("#8BC34A").brightness() - 164.462).abs() < 1e-9);
    }

    #[test]
    fn shifts_are_deterministic() {
        assert_eq!(hex("#CCCCCC").darken(20).as_str(), "#A3A3A3");
        assert_eq!(hex("#CCCCCC").darken(10).as_str(), "#B8B8B8");
        assert_eq!(hex("#000000").lighten(10).as_str(), "#1A1A1A");
        assert_eq!(hex("#FFFFFF").lighten(10).as_str(), "#FFFFFF");
        assert_eq!(hex("#CCCCCC").complement().as_str(), "#333333");
    }

    #[test]
    fn unique_colors_keeps_first_occurrence() {
        let colors = unique_colors(vec![hex("#abc"), hex("#112233"), hex("#AABBCC")]);
        let spelled: Vec<&str> = colors.iter().map(HexColor::as_str).collect();
        assert_eq!(spelled, vec!["#abc", "#112233"]);
    }
}
