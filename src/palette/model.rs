use serde::Serialize;

use crate::palette::color::HexColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteSlot {
    Primary,
    Secondary,
    Accent,
    Background,
    Text,
}

impl PaletteSlot {
    pub const ALL: [PaletteSlot; 5] = [
        PaletteSlot::Primary,
        PaletteSlot::Secondary,
        PaletteSlot::Accent,
        PaletteSlot::Background,
        PaletteSlot::Text,
    ];

    /// Position of the description-based colour this slot is compared with.
    pub fn index(self) -> usize {
        match self {
            PaletteSlot::Primary => 0,
            PaletteSlot::Secondary => 1,
            PaletteSlot::Accent => 2,
            PaletteSlot::Background => 3,
            PaletteSlot::Text => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaletteSlot::Primary => "Primary",
            PaletteSlot::Secondary => "Secondary",
            PaletteSlot::Accent => "Accent",
            PaletteSlot::Background => "Background",
            PaletteSlot::Text => "Text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiComponents {
    pub button: HexColor,
    pub button_hover: HexColor,
    pub header: HexColor,
    pub card_background: HexColor,
    pub border: HexColor,
}

impl UiComponents {
    /// Component keys in serialization order.
    pub fn entries(&self) -> [(&'static str, &HexColor); 5] {
        [
            ("button", &self.button),
            ("button_hover", &self.button_hover),
            ("header", &self.header),
            ("card_background", &self.card_background),
            ("border", &self.border),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizedPalette {
    pub primary: HexColor,
    pub secondary: HexColor,
    pub accent: HexColor,
    pub background: HexColor,
    pub text: HexColor,
    pub additional: Vec<HexColor>,
    pub ui_components: UiComponents,
}

impl OrganizedPalette {
    pub fn slot(&self, slot: PaletteSlot) -> &HexColor {
        match slot {
            PaletteSlot::Primary => &self.primary,
            PaletteSlot::Secondary => &self.secondary,
            PaletteSlot::Accent => &self.accent,
            PaletteSlot::Background => &self.background,
            PaletteSlot::Text => &self.text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorAnalysisEntry {
    pub current_color: HexColor,
    pub suggested_color: HexColor,
    pub is_perfect_match: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorAnalysis {
    pub primary: ColorAnalysisEntry,
    pub secondary: ColorAnalysisEntry,
    pub accent: ColorAnalysisEntry,
    pub background: ColorAnalysisEntry,
    pub text: ColorAnalysisEntry,
}

impl ColorAnalysis {
    pub fn get(&self, slot: PaletteSlot) -> &ColorAnalysisEntry {
        match slot {
            PaletteSlot::Primary => &self.primary,
            PaletteSlot::Secondary => &self.secondary,
            PaletteSlot::Accent => &self.accent,
            PaletteSlot::Background => &self.background,
            PaletteSlot::Text => &self.text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiRecommendation {
    pub component: String,
    pub color: HexColor,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionResult {
    pub image_based: Vec<HexColor>,
    pub description_based: Vec<HexColor>,
    pub organized_palette: OrganizedPalette,
    pub all_colors: Vec<HexColor>,
    pub color_analysis: ColorAnalysis,
    pub ui_recommendations: Vec<UiRecommendation>,
    pub additional_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResult {
    pub error: String,
    pub details: String,
    pub request_id: String,
}
