//! Deterministic slot assignment for the merged palette.
//!
//! Image colours describe what the UI looks like today, description colours
//! what the project calls for. The organized palette leans on the image and
//! the analysis compares each slot against the description's suggestion.

use crate::palette::color::{unique_colors, HexColor};
use crate::palette::model::{
    ColorAnalysis, ColorAnalysisEntry, OrganizedPalette, PaletteSlot, UiComponents,
};

pub const DEFAULT_PRIMARY: [u8; 3] = [0xCC, 0xCC, 0xCC];
pub const DEFAULT_BACKGROUND: [u8; 3] = [0xFF, 0xFF, 0xFF];
pub const DEFAULT_TEXT: [u8; 3] = [0x21, 0x21, 0x21];
pub const DEFAULT_CARD_BACKGROUND: [u8; 3] = [0xFF, 0xFF, 0xFF];
pub const ALTERNATE_CARD_BACKGROUND: [u8; 3] = [0xF8, 0xF9, 0xFA];

pub const SECONDARY_DARKEN_PERCENT: u8 = 20;
pub const HOVER_SHIFT_PERCENT: u8 = 10;

const LIGHT_BRIGHTNESS: f64 = 200.0;
const DARK_BRIGHTNESS: f64 = 80.0;
const VERY_LIGHT_BRIGHTNESS: f64 = 240.0;
/// Below this a darker hover state would be indistinguishable from the button.
const HOVER_LIGHTEN_BELOW: f64 = 50.0;
const MAX_ADDITIONAL_COLORS: usize = 3;

pub const PERFECT_MATCH_NOTE: &str = "Perfect match! No change needed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    ThemeAlignment,
    Hierarchy,
    Emphasis,
    Readability,
    Contrast,
}

impl ChangeReason {
    pub fn for_slot(slot: PaletteSlot) -> Self {
        match slot {
            PaletteSlot::Primary => ChangeReason::ThemeAlignment,
            PaletteSlot::Secondary => ChangeReason::Hierarchy,
            PaletteSlot::Accent => ChangeReason::Emphasis,
            PaletteSlot::Background => ChangeReason::Readability,
            PaletteSlot::Text => ChangeReason::Contrast,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ChangeReason::ThemeAlignment => {
                "The suggested color better aligns with your project's theme and enhances user experience"
            }
            ChangeReason::Hierarchy => {
                "The suggested color provides better contrast and visual hierarchy"
            }
            ChangeReason::Emphasis => {
                "The suggested color creates better visual interest and highlights important elements"
            }
            ChangeReason::Readability => {
                "The suggested color improves readability and reduces eye strain"
            }
            ChangeReason::Contrast => {
                "The suggested color ensures better readability and accessibility"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub palette: OrganizedPalette,
    pub analysis: ColorAnalysis,
}

pub fn reconcile(image_based: &[HexColor], description_based: &[HexColor]) -> Reconciliation {
    let palette = organize_palette(image_based, description_based);
    let analysis = analyze_palette(&palette, description_based);
    Reconciliation { palette, analysis }
}

/// Fills every slot, falling back to named defaults when the lists run dry.
pub fn organize_palette(image_based: &[HexColor], description_based: &[HexColor]) -> OrganizedPalette {
    let primary = image_based
        .first()
        .or_else(|| description_based.first())
        .cloned()
        .unwrap_or_else(|| HexColor::from_rgb(DEFAULT_PRIMARY));

    let secondary = image_based
        .get(1)
        .or_else(|| description_based.get(1))
        .cloned()
        .unwrap_or_else(|| primary.darken(SECONDARY_DARKEN_PERCENT));

    let accent = description_based
        .iter()
        .find(|color| **color != primary && **color != secondary)
        .cloned()
        .unwrap_or_else(|| primary.complement());

    let mut used = vec![primary.clone(), secondary.clone(), accent.clone()];

    let background = first_unused(
        image_based.iter().chain(description_based),
        &used,
        |color| color.brightness() > LIGHT_BRIGHTNESS,
    )
    .unwrap_or_else(|| HexColor::from_rgb(DEFAULT_BACKGROUND));
    used.push(background.clone());

    let text = first_unused(
        description_based.iter().chain(image_based),
        &used,
        |color| color.brightness() < DARK_BRIGHTNESS,
    )
    .unwrap_or_else(|| HexColor::from_rgb(DEFAULT_TEXT));
    used.push(text.clone());

    let additional = unique_colors(image_based.iter().chain(description_based).cloned())
        .into_iter()
        .filter(|color| !used.contains(color))
        .take(MAX_ADDITIONAL_COLORS)
        .collect();

    let ui_components = UiComponents {
        button: primary.clone(),
        button_hover: hover_variant(&primary),
        header: primary.clone(),
        card_background: card_background(image_based, description_based, &background),
        border: secondary.clone(),
    };

    OrganizedPalette {
        primary,
        secondary,
        accent,
        background,
        text,
        additional,
        ui_components,
    }
}

/// Compares each organized slot with the description colour at the same
/// position; a slot without a counterpart is compared with itself.
pub fn analyze_palette(palette: &OrganizedPalette, description_based: &[HexColor]) -> ColorAnalysis {
    let entry = |slot: PaletteSlot| {
        let current = palette.slot(slot).clone();
        let suggested = description_based
            .get(slot.index())
            .cloned()
            .unwrap_or_else(|| current.clone());
        compare_slot(slot, current, suggested)
    };

    ColorAnalysis {
        primary: entry(PaletteSlot::Primary),
        secondary: entry(PaletteSlot::Secondary),
        accent: entry(PaletteSlot::Accent),
        background: entry(PaletteSlot::Background),
        text: entry(PaletteSlot::Text),
    }
}

pub fn compare_slot(slot: PaletteSlot, current: HexColor, suggested: HexColor) -> ColorAnalysisEntry {
    let is_perfect_match = current == suggested;
    let reason = if is_perfect_match {
        PERFECT_MATCH_NOTE
    } else {
        ChangeReason::for_slot(slot).message()
    };
    ColorAnalysisEntry {
        current_color: current,
        suggested_color: suggested,
        is_perfect_match,
        reason: reason.to_string(),
    }
}

/// Darkens by a fixed step, or lightens when the colour is already near black.
pub fn hover_variant(color: &HexColor) -> HexColor {
    if color.brightness() < HOVER_LIGHTEN_BELOW {
        color.lighten(HOVER_SHIFT_PERCENT)
    } else {
        color.darken(HOVER_SHIFT_PERCENT)
    }
}

fn card_background(
    image_based: &[HexColor],
    description_based: &[HexColor],
    background: &HexColor,
) -> HexColor {
    if let Some(color) = image_based
        .iter()
        .chain(description_based)
        .find(|color| color.brightness() >= VERY_LIGHT_BRIGHTNESS && *color != background)
    {
        return color.clone();
    }

    let default = HexColor::from_rgb(DEFAULT_CARD_BACKGROUND);
    if *background == default {
        HexColor::from_rgb(ALTERNATE_CARD_BACKGROUND)
    } else {
        default
    }
}

fn first_unused<'a, I, F>(candidates: I, used: &[HexColor], predicate: F) -> Option<HexColor>
where
    I: IntoIterator<Item = &'a HexColor>,
    F: Fn(&HexColor) -> bool,
{
    candidates
        .into_iter()
        .find(|color| !used.contains(color) && predicate(color))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(values: &[&str]) -> Vec<HexColor> {
        values
            .iter()
            .map(|value| HexColor::parse(value).expect("valid colour"))
            .collect()
    }

    fn hex(value: &str) -> HexColor {
        HexColor::parse(value).expect("valid colour")
    }

    #[test]
    fn image_colors_lead_and_description_supplies_accent() {
        let image = colors(&["#F2F2F2", "#E0E0E0"]);
        let description = colors(&["#4567B7", "#8BC34A"]);
        let result = reconcile(&image, &description);

        assert_eq!(result.palette.primary.as_str(), "#F2F2F2");
        assert_eq!(result.palette.secondary.as_str(), "#E0E0E0");
        assert_eq!(result.palette.accent.as_str(), "#4567B7");
        assert_eq!(result.palette.background, hex("#FFFFFF"));
        assert_eq!(result.palette.text, hex("#212121"));
        assert_eq!(result.palette.additional, colors(&["#8BC34A"]));
        assert!(!result.analysis.primary.is_perfect_match);
        assert_eq!(result.analysis.primary.suggested_color.as_str(), "#4567B7");
        assert_eq!(
            result.analysis.primary.reason,
            ChangeReason::ThemeAlignment.message()
        );
    }

    #[test]
    fn both_empty_yields_documented_defaults() {
        let result = reconcile(&[], &[]);
        let palette = &result.palette;

        assert_eq!(palette.primary.as_str(), "#CCCCCC");
        assert_eq!(palette.secondary.as_str(), "#A3A3A3");
        assert_eq!(palette.accent.as_str(), "#333333");
        assert_eq!(palette.background.as_str(), "#FFFFFF");
        assert_eq!(palette.text.as_str(), "#212121");
        assert!(palette.additional.is_empty());
        assert_eq!(palette.ui_components.button.as_str(), "#CCCCCC");
        assert_eq!(palette.ui_components.button_hover.as_str(), "#B8B8B8");
        assert_eq!(palette.ui_components.header.as_str(), "#CCCCCC");
        assert_eq!(palette.ui_components.card_background.as_str(), "#F8F9FA");
        assert_eq!(palette.ui_components.border.as_str(), "#A3A3A3");

        for slot in PaletteSlot::ALL {
            let entry = result.analysis.get(slot);
            assert!(entry.is_perfect_match);
            assert_eq!(entry.reason, PERFECT_MATCH_NOTE);
        }
    }

    #[test]
    fn every_slot_is_filled_for_any_list_shape() {
        let samples = [
            colors(&[]),
            colors(&["#123456"]),
            colors(&["#FAFAFA", "#0A0A0A"]),
            colors(&["#E53935", "#1E88E5", "#FFFFFF", "#111111", "#43A047", "#FDD835"]),
        ];
        for image in &samples {
            for description in &samples {
                let palette = organize_palette(image, description);
                for slot in PaletteSlot::ALL {
                    assert!(!palette.slot(slot).as_str().is_empty());
                }
                assert!(palette.additional.len() <= 3);
                assert_eq!(palette.ui_components.button, palette.primary);
                assert_eq!(palette.ui_components.header, palette.primary);
                assert_eq!(palette.ui_components.border, palette.secondary);
            }
        }
    }

    #[test]
    fn description_fills_in_when_image_is_empty() {
        let description = colors(&["#0D47A1", "#42A5F5", "#FFCA28", "#FAFAFA", "#212121"]);
        let result = reconcile(&[], &description);

        assert_eq!(result.palette.primary.as_str(), "#0D47A1");
        assert_eq!(result.palette.secondary.as_str(), "#42A5F5");
        assert_eq!(result.palette.accent.as_str(), "#FFCA28");
        assert_eq!(result.palette.background.as_str(), "#FAFAFA");
        assert_eq!(result.palette.text.as_str(), "#212121");
        for slot in PaletteSlot::ALL {
            assert!(result.analysis.get(slot).is_perfect_match, "{slot:?}");
        }
    }

    #[test]
    fn accent_skips_colors_already_used() {
        let image = colors(&["#4567B7"]);
        let description = colors(&["#4567b7", "#8BC34A", "#FF5722"]);
        let palette = organize_palette(&image, &description);

        assert_eq!(palette.primary.as_str(), "#4567B7");
        assert_eq!(palette.secondary.as_str(), "#8BC34A");
        assert_eq!(palette.accent.as_str(), "#FF5722");
    }

    #[test]
    fn background_prefers_image_and_text_prefers_description() {
        let image = colors(&["#1565C0", "#26A69A", "#F5F5F5", "#101010"]);
        let description = colors(&["#FF7043", "#FFFDE7", "#263238"]);
        let palette = organize_palette(&image, &description);

        assert_eq!(palette.background.as_str(), "#F5F5F5");
        assert_eq!(palette.text.as_str(), "#263238");
        assert_eq!(palette.ui_components.card_background.as_str(), "#FFFDE7");
        assert_eq!(palette.additional, colors(&["#101010", "#FFFDE7"]));
    }

    #[test]
    fn perfect_match_is_case_insensitive() {
        let entry = compare_slot(PaletteSlot::Secondary, hex("#8bc34a"), hex("#8BC34A"));
        assert!(entry.is_perfect_match);
        assert_eq!(entry.reason, PERFECT_MATCH_NOTE);

        let entry = compare_slot(PaletteSlot::Text, hex("#8bc34a"), hex("#8BC34B"));
        assert!(!entry.is_perfect_match);
        assert_eq!(entry.reason, ChangeReason::Contrast.message());
    }

    #[test]
    fn hover_lightens_near_black_buttons() {
        assert_eq!(hover_variant(&hex("#101010")).as_str(), "#282828");
        assert_eq!(hover_variant(&hex("#4567B7")).as_str(), "#3E5DA5");
    }
}
