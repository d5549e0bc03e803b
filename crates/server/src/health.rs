use std::sync::Arc;

use athena_core::DemoSession;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    session: Arc<DemoSession>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub session: HealthCheck,
    pub checked_at: String,
}

pub fn router(session: Arc<DemoSession>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { session })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let controller = state.session.controller();
    let session = match controller.dataset().validate() {
        Ok(()) => HealthCheck {
            status: "ready",
            detail: format!(
                "session {} on scenario {}",
                controller.session_id(),
                controller.scenario()
            ),
        },
        Err(error) => HealthCheck { status: "degraded", detail: error.to_string() },
    };
    let ready = session.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "athena-server runtime initialized".to_string(),
        },
        session,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use athena_core::notifications::InMemoryNotificationSink;
    use athena_core::{DemoDataset, DemoSession, DemoTiming, ScenarioController};
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_the_running_session() {
        let controller = ScenarioController::new(
            Arc::new(DemoDataset::builtin()),
            DemoTiming::instant(),
            Arc::new(InMemoryNotificationSink::default()),
        );
        let session = Arc::new(DemoSession::new(Arc::new(controller)));

        let (status, Json(payload)) = health(State(HealthState { session })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert!(payload.session.detail.ends_with("on scenario digest"));
    }
}
