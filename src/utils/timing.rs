use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "palette.timing";

/// Tracks one palette request from receipt to response.
///
/// A timer dropped before [`RequestTimer::log_completed`] runs belongs to a
/// request whose client went away, and is logged as `cancelled`.
#[derive(Debug)]
pub struct RequestTimer {
    request_id: String,
    route: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl RequestTimer {
    pub fn new(request_id: &str, route: &str) -> Self {
        RequestTimer {
            request_id: request_id.to_string(),
            route: route.to_string(),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "cancelled".to_string(),
            detail: None,
            completed: false,
        }
    }

    pub fn log_received(&self) {
        info!(
            target: TIMING_TARGET,
            "event=request_received request_id={} route={} received_at={}",
            self.request_id,
            self.route,
            self.started_at.to_rfc3339()
        );
    }

    pub fn mark_status(&mut self, status: &str, detail: Option<String>) {
        self.status = status.to_string();
        self.detail = detail;
    }

    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=request_completed request_id={} route={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.request_id,
            self.route,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.log_completed();
    }
}

pub fn start_request_timer(request_id: &str, route: &str) -> RequestTimer {
    let timer = RequestTimer::new(request_id, route);
    timer.log_received();
    timer
}

pub fn complete_request_timer(timer: &mut RequestTimer, status: &str, detail: Option<String>) {
    timer.mark_status(status, detail);
    timer.log_completed();
}

pub async fn log_llm_timing<T, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=llm_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=llm_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn llm_timing_passes_results_through() {
        let ok = log_llm_timing("groq", "test-model", "suggest_colors", None, || async {
            Ok::<_, anyhow::Error>("[\"#112233\"]".to_string())
        })
        .await;
        assert_eq!(ok.unwrap(), "[\"#112233\"]");

        let err = log_llm_timing::<String, _, _>("groq", "test-model", "suggest_colors", None, || async {
            Err(anyhow!("quota exceeded"))
        })
        .await;
        assert_eq!(err.unwrap_err().to_string(), "quota exceeded");
    }

    #[test]
    fn timer_completes_once() {
        let mut timer = start_request_timer("req_1", "/api/suggest-colors");
        complete_request_timer(&mut timer, "success", None);
        assert!(timer.completed);
        timer.mark_status("error", Some("late".to_string()));
        timer.log_completed();
        assert_eq!(timer.status, "error");
    }
}
