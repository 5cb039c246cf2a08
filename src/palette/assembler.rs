use chrono::Utc;
use uuid::Uuid;

use crate::error::{error_chain, SuggestError};
use crate::palette::color::{unique_colors, HexColor};
use crate::palette::model::{ErrorResult, SuggestionResult, UiRecommendation};
use crate::palette::reconciler::Reconciliation;

pub const ADDITIONAL_NOTES: [&str; 4] = [
    "All suggested colors have been checked for accessibility compliance",
    "The color palette maintains proper contrast ratios for better readability",
    "Colors are chosen to create a harmonious and professional appearance",
    "Consider testing these colors in different lighting conditions",
];

const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate color suggestions";

pub fn assemble(
    image_based: Vec<HexColor>,
    description_based: Vec<HexColor>,
    reconciliation: Reconciliation,
) -> SuggestionResult {
    let all_colors = unique_colors(image_based.iter().chain(&description_based).cloned());
    let Reconciliation { palette, analysis } = reconciliation;

    let ui_recommendations = palette
        .ui_components
        .entries()
        .into_iter()
        .map(|(key, color)| UiRecommendation {
            component: component_label(key),
            color: color.clone(),
        })
        .collect();

    SuggestionResult {
        image_based,
        description_based,
        organized_palette: palette,
        all_colors,
        color_analysis: analysis,
        ui_recommendations,
        additional_notes: ADDITIONAL_NOTES.iter().map(|note| note.to_string()).collect(),
    }
}

/// `button_hover` -> `Button hover`.
pub fn component_label(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Opaque per-request token used to correlate responses with log lines.
pub fn new_request_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("req_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Server-side failures only expose their cause chain outside production.
pub fn error_result(err: &SuggestError, request_id: &str, expose_details: bool) -> ErrorResult {
    if expose_details {
        return ErrorResult {
            error: err.to_string(),
            details: error_chain(err),
            request_id: request_id.to_string(),
        };
    }

    let error = if err.is_client_error() {
        err.to_string()
    } else {
        GENERIC_FAILURE_MESSAGE.to_string()
    };
    ErrorResult {
        error,
        details: format!("Reference request id {request_id} when reporting this issue"),
        request_id: request_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::reconciler::reconcile;
    use anyhow::anyhow;
    use serde_json::json;

    fn colors(values: &[&str]) -> Vec<HexColor> {
        values
            .iter()
            .map(|value| HexColor::parse(value).expect("valid colour"))
            .collect()
    }

    #[test]
    fn all_colors_is_ordered_union_without_duplicates() {
        let image = colors(&["#F2F2F2", "#4567B7", "#e0e0e0"]);
        let description = colors(&["#4567b7", "#8BC34A", "#E0E0E0", "#8bc34a"]);
        let reconciliation = reconcile(&image, &description);
        let result = assemble(image, description, reconciliation);

        let spelled: Vec<&str> = result.all_colors.iter().map(HexColor::as_str).collect();
        assert_eq!(spelled, vec!["#F2F2F2", "#4567B7", "#e0e0e0", "#8BC34A"]);
    }

    #[test]
    fn serializes_the_documented_shape() {
        let image = colors(&["#F2F2F2", "#E0E0E0"]);
        let description = colors(&["#4567B7", "#8BC34A"]);
        let reconciliation = reconcile(&image, &description);
        let value = serde_json::to_value(assemble(image, description, reconciliation)).unwrap();

        assert_eq!(value["image_based"], json!(["#F2F2F2", "#E0E0E0"]));
        assert_eq!(value["organized_palette"]["primary"], json!("#F2F2F2"));
        assert_eq!(value["organized_palette"]["accent"], json!("#4567B7"));
        assert_eq!(
            value["organized_palette"]["ui_components"]["border"],
            json!("#E0E0E0")
        );
        assert_eq!(
            value["color_analysis"]["primary"],
            json!({
                "current_color": "#F2F2F2",
                "suggested_color": "#4567B7",
                "is_perfect_match": false,
                "reason": "The suggested color better aligns with your project's theme and enhances user experience"
            })
        );
        assert_eq!(
            value["ui_recommendations"][1],
            json!({ "component": "Button hover", "color": "#DADADA" })
        );
        assert_eq!(value["additional_notes"].as_array().unwrap().len(), 4);
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec![
                "image_based",
                "description_based",
                "organized_palette",
                "all_colors",
                "color_analysis",
                "ui_recommendations",
                "additional_notes"
            ]
        );
    }

    #[test]
    fn labels_components_for_display() {
        assert_eq!(component_label("button_hover"), "Button hover");
        assert_eq!(component_label("card_background"), "Card background");
        assert_eq!(component_label("border"), "Border");
    }

    #[test]
    fn request_ids_are_distinct() {
        let first = new_request_id();
        let second = new_request_id();
        assert!(first.starts_with("req_"));
        assert_ne!(first, second);
    }

    #[test]
    fn production_errors_hide_upstream_details() {
        let err = SuggestError::UpstreamFailure {
            provider: "gemini",
            source: anyhow!("status 401: API key not valid"),
        };
        let hidden = error_result(&err, "req_1", false);
        assert_eq!(hidden.error, GENERIC_FAILURE_MESSAGE);
        assert!(!hidden.details.contains("API key"));
        assert_eq!(hidden.request_id, "req_1");

        let shown = error_result(&err, "req_1", true);
        assert!(shown.details.contains("API key not valid"));
    }
}
