use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::palette::{error_result, new_request_id, PaletteSlot, SuggestionResult};
use crate::pipeline::{suggest_palette, ImageUpload};
use crate::state::AppState;

const PRO_TIP: &str = "Pro tip: Use WebAIM Contrast Checker to verify accessibility compliance";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestArgs {
    pub image_path: PathBuf,
    pub description: String,
    pub json: bool,
}

pub fn suggest_usage() -> &'static str {
    "Usage: palette-advisor suggest --image <path> --description <text> [--json]"
}

/// Returns `None` when the binary should run the HTTP server instead.
pub fn parse_suggest_args(args: &[String]) -> anyhow::Result<Option<SuggestArgs>> {
    if args.get(1).map(|value| value.as_str()) != Some("suggest") {
        return Ok(None);
    }

    let mut image_path: Option<PathBuf> = None;
    let mut description: Option<String> = None;
    let mut json = false;

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--image" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --image"))?;
                image_path = Some(PathBuf::from(value));
            }
            "--description" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --description"))?;
                description = Some(value.clone());
            }
            "--json" => {
                json = true;
            }
            "--help" | "-h" => {
                return Err(anyhow!(suggest_usage()));
            }
            other => {
                return Err(anyhow!(
                    "Unknown suggest argument: {other}\n{}",
                    suggest_usage()
                ));
            }
        }
        index += 1;
    }

    let image_path = image_path.ok_or_else(|| anyhow!("--image is required"))?;
    let description = description.ok_or_else(|| anyhow!("--description is required"))?;

    Ok(Some(SuggestArgs {
        image_path,
        description,
        json,
    }))
}

pub async fn run_suggest(state: &AppState, args: SuggestArgs) -> anyhow::Result<()> {
    let request_id = new_request_id();
    let bytes = tokio::fs::read(&args.image_path)
        .await
        .with_context(|| format!("Failed to read image {}", args.image_path.display()))?;
    let upload = ImageUpload {
        bytes,
        declared_mime_type: None,
        file_name: args
            .image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    };

    info!("request_id={} running suggest from the command line", request_id);
    let outcome = suggest_palette(
        state.image_analyzer.as_ref(),
        state.color_suggester.as_ref(),
        upload,
        &args.description,
        &state.options,
        &request_id,
    )
    .await;

    match outcome {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_report(&result));
            }
            Ok(())
        }
        Err(err) => {
            if args.json {
                let body = error_result(&err, &request_id, true);
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(anyhow::Error::new(err).context(format!("request {request_id} failed")))
        }
    }
}

/// Human-readable console report of a suggestion.
pub fn render_report(result: &SuggestionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n===== COLOR ANALYSIS & SUGGESTIONS =====");

    let _ = writeln!(out, "\nCurrent Colors from Image:");
    for (index, color) in result.image_based.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index + 1, color);
    }

    let _ = writeln!(out, "\nSuggested Colors based on Description:");
    for (index, color) in result.description_based.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index + 1, color);
    }

    let _ = writeln!(out, "\nColor Analysis & Recommendations:");
    for slot in PaletteSlot::ALL {
        let entry = result.color_analysis.get(slot);
        if entry.is_perfect_match {
            let _ = writeln!(
                out,
                "\n  {} Color: {} (✓ {})",
                slot.label(),
                entry.current_color,
                entry.reason
            );
        } else {
            let _ = writeln!(
                out,
                "\n  {} Color: {} → {}",
                slot.label(),
                entry.current_color,
                entry.suggested_color
            );
            let _ = writeln!(out, "    Reason: {}", entry.reason);
        }
    }

    let _ = writeln!(out, "\nUI Component Color Recommendations:");
    for recommendation in &result.ui_recommendations {
        let _ = writeln!(
            out,
            "  - {}: {}",
            recommendation.component, recommendation.color
        );
    }

    let _ = writeln!(out, "\nAdditional Notes:");
    for (index, note) in result.additional_notes.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index + 1, note);
    }

    let _ = writeln!(out, "\n{PRO_TIP}");
    let _ = writeln!(out, "====================================");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use crate::llm::media::tests::png_bytes;
    use crate::palette::{assemble, reconcile, HexColor};
    use crate::pipeline::tests::{options, FakeReply, FakeText, FakeVision};

    fn args(values: &[&str]) -> Vec<String> {
        std::iter::once("palette-advisor")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    fn colors(values: &[&str]) -> Vec<HexColor> {
        values
            .iter()
            .map(|value| HexColor::parse(value).unwrap())
            .collect()
    }

    #[test]
    fn no_subcommand_means_server_mode() {
        assert_eq!(parse_suggest_args(&args(&[])).unwrap(), None);
    }

    #[test]
    fn parses_suggest_arguments() {
        let parsed = parse_suggest_args(&args(&[
            "suggest",
            "--image",
            "shot.png",
            "--description",
            "A yoga studio",
            "--json",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(parsed.image_path, PathBuf::from("shot.png"));
        assert_eq!(parsed.description, "A yoga studio");
        assert!(parsed.json);
    }

    #[test]
    fn rejects_incomplete_arguments() {
        let err = parse_suggest_args(&args(&["suggest", "--image", "shot.png"])).unwrap_err();
        assert_eq!(err.to_string(), "--description is required");
        assert!(parse_suggest_args(&args(&["suggest", "--image"])).is_err());
        assert!(parse_suggest_args(&args(&["suggest", "--verbose"])).is_err());
    }

    #[test]
    fn report_lists_changes_and_components() {
        let image = colors(&["#F2F2F2", "#E0E0E0"]);
        let description = colors(&["#4567B7", "#8BC34A"]);
        let reconciliation = reconcile(&image, &description);
        let report = render_report(&assemble(image, description, reconciliation));

        assert!(report.contains("  1. #F2F2F2\n  2. #E0E0E0"));
        assert!(report.contains("Primary Color: #F2F2F2 → #4567B7"));
        assert!(report.contains("  - Button hover: #DADADA"));
        assert!(report.contains("  4. Consider testing these colors in different lighting conditions"));
    }

    #[test]
    fn report_marks_perfect_matches() {
        let image = colors(&["#4567b7"]);
        let description = colors(&["#4567B7"]);
        let reconciliation = reconcile(&image, &description);
        let report = render_report(&assemble(image, description, reconciliation));

        assert!(report.contains("Primary Color: #4567b7 (✓ Perfect match! No change needed)"));
    }

    #[tokio::test]
    async fn runs_pipeline_against_a_file() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes(5, 5)).unwrap();

        let state = AppState::with_adapters(
            Arc::new(FakeVision {
                reply: FakeReply::Text("[\"#FAFAFA\"]"),
                missing: None,
            }),
            Arc::new(FakeText {
                reply: FakeReply::Text("[\"#1E88E5\"]"),
            }),
            options(),
        );
        let args = SuggestArgs {
            image_path: file.path().to_path_buf(),
            description: "A weather app".to_string(),
            json: true,
        };
        run_suggest(&state, args).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let state = AppState::with_adapters(
            Arc::new(FakeVision {
                reply: FakeReply::Text("[]"),
                missing: None,
            }),
            Arc::new(FakeText {
                reply: FakeReply::Text("[]"),
            }),
            options(),
        );
        let args = SuggestArgs {
            image_path: PathBuf::from("/nonexistent/screen.png"),
            description: "A weather app".to_string(),
            json: false,
        };
        let err = run_suggest(&state, args).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read image"));
    }
}
