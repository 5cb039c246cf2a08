use std::error::Error as StdError;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Uploaded image could not be read: {0}")]
    UnreadableImage(String),

    #[error("{0} not configured")]
    Configuration(String),

    #[error("{provider} request failed: {source}")]
    UpstreamFailure {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{provider} did not respond within {seconds}s")]
    UpstreamTimeout { provider: &'static str, seconds: u64 },

    #[error("Failed to stage uploaded image: {0}")]
    Io(#[from] std::io::Error),
}

impl SuggestError {
    pub fn kind(&self) -> &'static str {
        match self {
            SuggestError::InvalidInput(_) => "invalid_input",
            SuggestError::UnreadableImage(_) => "unreadable_image",
            SuggestError::Configuration(_) => "configuration",
            SuggestError::UpstreamFailure { .. } => "upstream_failure",
            SuggestError::UpstreamTimeout { .. } => "upstream_timeout",
            SuggestError::Io(_) => "io",
        }
    }

    /// Problems the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SuggestError::InvalidInput(_) | SuggestError::UnreadableImage(_)
        )
    }
}

/// Renders the error and every source beneath it, outermost first.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.iter().any(|part| part.ends_with(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join("\ncaused by: ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn chain_skips_sources_already_in_the_message() {
        let source = anyhow!("connection reset").context("Groq request failed to send");
        let err = SuggestError::UpstreamFailure {
            provider: "groq",
            source,
        };
        let rendered = error_chain(&err);
        assert_eq!(
            rendered,
            "groq request failed: Groq request failed to send\ncaused by: connection reset"
        );
    }

    #[test]
    fn client_errors_are_flagged() {
        assert!(SuggestError::InvalidInput("missing description".into()).is_client_error());
        assert!(!SuggestError::UpstreamTimeout {
            provider: "gemini",
            seconds: 45
        }
        .is_client_error());
    }
}
