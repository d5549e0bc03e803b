//! Demo routes.
//!
//! HTML Endpoints:
//! - `GET  /`                     : welcome page
//! - `GET  /demo?scenario&gap&help`: demo page, hydrated from the query string
//!
//! JSON API Endpoints:
//! - `GET  /api/v1/demo`          : current state, canonical query and rendered thread
//! - `POST /api/v1/demo/actions`  : apply a block action `{action_id, value}`
//! - `POST /api/v1/demo/reset`    : back to the digest with nothing resolved

use std::sync::Arc;

use athena_core::{
    ApplicationError, DemoParams, DemoSession, InMemoryNotificationSink, InterfaceError,
    Notification, SelectionStage,
};
use athena_slack::views::welcome::welcome_page;
use athena_slack::{apply_action, render_session, ActionOutcome, BlockAction, RenderedDemo};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{info, warn};
use uuid::Uuid;

const WELCOME_TEMPLATE: &str = "demo/welcome.html";
const DEMO_TEMPLATE: &str = "demo/demo.html";

#[derive(Clone)]
pub struct AppState {
    session: Arc<DemoSession>,
    notifications: InMemoryNotificationSink,
    templates: Arc<Tera>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DemoQuery {
    pub scenario: Option<String>,
    pub gap: Option<String>,
    pub help: Option<String>,
}

impl DemoQuery {
    /// `None` when the request carries none of the demo parameters.
    fn params(&self) -> Option<DemoParams> {
        if self.scenario.is_none() && self.gap.is_none() && self.help.is_none() {
            return None;
        }
        Some(DemoParams::from_raw(
            self.scenario.as_deref(),
            self.gap.as_deref(),
            self.help.as_deref(),
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct DemoResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub demo: RenderedDemo,
    /// More content is scheduled to appear without user input.
    pub pending: bool,
    /// Toasts raised since the last response that delivered them.
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub outcome: ActionOutcome,
    #[serde(flatten)]
    pub demo: DemoResponse,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

type ApiRejection = (StatusCode, Json<ApiError>);

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Templates ship inside the binary; files under `templates/demo/` take precedence
/// when the server runs from the repository root.
fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/demo/**/*") {
        Ok(tera) => tera,
        Err(error) => {
            warn!(
                event_name = "system.templates.filesystem_unavailable",
                correlation_id = "bootstrap",
                error = %error,
                "failed to load demo templates from filesystem, using embedded templates"
            );
            Tera::default()
        }
    };

    if !tera.get_template_names().any(|name| name == WELCOME_TEMPLATE) {
        tera.add_raw_template(WELCOME_TEMPLATE, include_str!("../../../templates/demo/welcome.html"))
            .ok();
    }
    if !tera.get_template_names().any(|name| name == DEMO_TEMPLATE) {
        tera.add_raw_template(DEMO_TEMPLATE, include_str!("../../../templates/demo/demo.html")).ok();
    }

    Arc::new(tera)
}

pub fn router(session: Arc<DemoSession>, notifications: InMemoryNotificationSink) -> Router {
    router_with_templates(session, notifications, init_templates())
}

pub fn router_with_templates(
    session: Arc<DemoSession>,
    notifications: InMemoryNotificationSink,
    templates: Arc<Tera>,
) -> Router {
    Router::new()
        // HTML routes
        .route("/", get(welcome))
        .route("/demo", get(demo_page))
        // JSON API routes
        .route("/api/v1/demo", get(demo_state))
        .route("/api/v1/demo/actions", post(apply_block_action))
        .route("/api/v1/demo/reset", post(reset_demo))
        .with_state(AppState { session, notifications, templates })
}

// ---------------------------------------------------------------------------
// HTML Handlers
// ---------------------------------------------------------------------------

async fn welcome(
    State(state): State<AppState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let page = welcome_page(state.session.controller().dataset());

    let mut context = Context::new();
    context.insert("page", &page);
    render_html(&state.templates, WELCOME_TEMPLATE, &context, &correlation_id)
}

async fn demo_page(
    State(state): State<AppState>,
    Query(query): Query<DemoQuery>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let correlation_id = Uuid::new_v4().to_string();
    hydrate(&state, &query, &correlation_id);

    let response = demo_response(&state.session, state.notifications.drain());
    let mut context = Context::new();
    context.insert("demo", &response);
    context.insert("poll_ms", &state.session.controller().timing().reveal_step_ms.clamp(100, 1000));
    render_html(&state.templates, DEMO_TEMPLATE, &context, &correlation_id)
}

fn render_html(
    templates: &Tera,
    template: &str,
    context: &Context,
    correlation_id: &str,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    templates.render(template, context).map(Html).map_err(|error| {
        let interface =
            ApplicationError::Rendering(error.to_string()).into_interface(correlation_id);
        warn!(
            event_name = "demo.http.render_failed",
            correlation_id,
            template,
            error = %interface,
            "template rendering failed"
        );
        (
            status_for(&interface),
            Html(format!(
                "<h1>Error</h1><p>{}</p><p>Correlation ID: {correlation_id}</p>",
                interface.user_message()
            )),
        )
    })
}

// ---------------------------------------------------------------------------
// JSON Handlers
// ---------------------------------------------------------------------------

async fn demo_state(
    State(state): State<AppState>,
    Query(query): Query<DemoQuery>,
) -> Json<DemoResponse> {
    let correlation_id = Uuid::new_v4().to_string();
    hydrate(&state, &query, &correlation_id);
    Json(demo_response(&state.session, Vec::new()))
}

async fn apply_block_action(
    State(state): State<AppState>,
    payload: Result<Json<BlockAction>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiRejection> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(action) = payload.map_err(|rejection| {
        warn!(
            event_name = "demo.http.invalid_payload",
            correlation_id = %correlation_id,
            error = %rejection,
            "block action payload rejected"
        );
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "The request could not be processed. Check inputs and try again."
                    .to_owned(),
                detail: rejection.body_text(),
                correlation_id: correlation_id.clone(),
            }),
        )
    })?;

    let outcome = apply_action(&state.session, &action, &correlation_id)
        .map_err(|error| api_error(ApplicationError::from(error).into_interface(&correlation_id)))?;

    Ok(Json(ActionResponse {
        outcome,
        demo: demo_response(&state.session, state.notifications.drain()),
    }))
}

async fn reset_demo(State(state): State<AppState>) -> Json<DemoResponse> {
    let controller = state.session.controller();
    controller.reset();
    state.notifications.drain();
    info!(
        event_name = "demo.http.reset",
        correlation_id = %controller.session_id(),
        "demo reset over http"
    );
    Json(demo_response(&state.session, Vec::new()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hydrate(state: &AppState, query: &DemoQuery, correlation_id: &str) {
    if let Some(params) = query.params() {
        state.session.controller().apply_params(&params);
        info!(
            event_name = "demo.http.hydrated",
            correlation_id,
            query = %params.to_query_string(),
            "session hydrated from query string"
        );
    }
}

fn demo_response(session: &DemoSession, notifications: Vec<Notification>) -> DemoResponse {
    let demo = render_session(session);
    let selection_running = demo.progress.qna.as_ref().is_some_and(|qna| {
        qna.stage > SelectionStage::AwaitingSelection
            && qna.stage < SelectionStage::DocumentationUpdated
    });
    let pending = demo.progress.revealed < session.reveal_total()
        || selection_running
        || session.controller().has_pending_return();

    DemoResponse {
        session_id: session.controller().session_id().to_owned(),
        demo,
        pending,
        notifications,
    }
}

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: InterfaceError) -> ApiRejection {
    warn!(
        event_name = "demo.http.request_failed",
        correlation_id = %error.correlation_id(),
        error = %error,
        "demo request failed"
    );
    (
        status_for(&error),
        Json(ApiError {
            error: error.user_message().to_owned(),
            detail: error.to_string(),
            correlation_id: error.correlation_id().to_owned(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use athena_core::notifications::{InMemoryNotificationSink, NotificationSink};
    use athena_core::{DemoDataset, DemoSession, DemoTiming, ScenarioController};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, DemoQuery};

    fn app(timing: DemoTiming) -> (Router, Arc<DemoSession>) {
        let (app, session, _) = app_with_sink(timing);
        (app, session)
    }

    fn app_with_sink(
        timing: DemoTiming,
    ) -> (Router, Arc<DemoSession>, InMemoryNotificationSink) {
        let notifications = InMemoryNotificationSink::default();
        let sink: Arc<dyn NotificationSink> = Arc::new(notifications.clone());
        let controller = ScenarioController::new(Arc::new(DemoDataset::builtin()), timing, sink);
        let session = Arc::new(DemoSession::new(Arc::new(controller)));
        (router(Arc::clone(&session), notifications.clone()), session, notifications)
    }

    fn action(action_id: &str, value: &str) -> Request<Body> {
        post_json("/api/v1/demo/actions", &json!({ "action_id": action_id, "value": value }))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, String::from_utf8(body.to_vec()).expect("utf-8 body"))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn parse_body(body: &str) -> Value {
        serde_json::from_str(body).expect("json body")
    }

    #[test]
    fn empty_query_does_not_hydrate() {
        assert!(DemoQuery::default().params().is_none());
        let query = DemoQuery { help: Some("true".to_owned()), ..DemoQuery::default() };
        assert!(query.params().is_some_and(|params| params.help));
    }

    #[tokio::test(start_paused = true)]
    async fn welcome_page_links_into_the_digest() {
        let (app, _) = app(DemoTiming::default());

        let (status, body) = send(&app, get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Athena Slackbot Demo"));
        assert!(body.contains("/demo?scenario=digest"));
    }

    #[tokio::test(start_paused = true)]
    async fn deep_link_hydrates_the_session() {
        let (app, session) = app(DemoTiming::instant());

        let (status, body) =
            send(&app, get("/demo?scenario=auto-pr&gap=retry-logic-stripe&help=true")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Current Scenario"));

        let state = session.controller().snapshot();
        assert_eq!(state.scenario.as_str(), "auto-pr");
        assert_eq!(state.selected_gap.as_ref().map(|gap| gap.as_str()), Some("retry-logic-stripe"));
        assert!(state.help);

        tokio::time::sleep(Duration::from_millis(5)).await;
        let (_, api) = send(&app, get("/api/v1/demo")).await;
        let api = parse_body(&api);
        assert_eq!(api["query"], "scenario=auto-pr&gap=retry-logic-stripe&help=true");
        assert_eq!(api["thread"]["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(api["pending"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn demo_page_renders_without_pending_toasts() {
        let (app, _) = app(DemoTiming::instant());

        let (status, body) = send(&app, get("/demo")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("class=\"toast"));

        let (_, api) = send(&app, get("/api/v1/demo")).await;
        assert_eq!(parse_body(&api)["notifications"], json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_page_shows_a_toast_once() {
        let (app, session, _) = app_with_sink(DemoTiming::default());
        session.controller().view_thread("retry-logic-stripe");
        session.controller().approve("retry-logic-stripe");

        let (status, body) = send(&app, get("/demo")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("class=\"toast success\""));

        let (_, body) = send(&app, get("/demo")).await;
        assert!(!body.contains("class=\"toast"));
    }

    #[tokio::test(start_paused = true)]
    async fn each_action_response_carries_only_its_own_toasts() {
        let (app, _, sink) = app_with_sink(DemoTiming::default());
        send(&app, get("/api/v1/demo?scenario=auto-pr&gap=retry-logic-stripe")).await;

        let (_, first) = send(&app, action("athena.auto_pr.reject.v1", "retry-logic-stripe")).await;
        let first = parse_body(&first);
        assert_eq!(first["notifications"].as_array().map(Vec::len), Some(1));
        assert_eq!(first["notifications"][0]["title"], "PR rejected");
        assert!(sink.notifications().is_empty());

        let (_, second) =
            send(&app, action("athena.auto_pr.approve.v1", "retry-logic-stripe")).await;
        let second = parse_body(&second);
        assert_eq!(second["notifications"].as_array().map(Vec::len), Some(1));
        assert_eq!(second["notifications"][0]["title"], "PR approved");
        assert!(sink.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn approving_a_gap_outside_the_dataset_is_ignored() {
        let (app, session) = app(DemoTiming::default());

        let (status, body) = send(&app, action("athena.auto_pr.approve.v1", "ghost-gap")).await;

        assert_eq!(status, StatusCode::OK);
        let body = parse_body(&body);
        assert_eq!(body["outcome"], "ignored");
        assert_eq!(body["state"]["resolved"], json!([]));
        assert_eq!(body["overall_score"], 74);
        assert_eq!(body["notifications"], json!([]));
        assert!(session.controller().snapshot().resolved.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_scenario_degrades_to_digest() {
        let (app, session) = app(DemoTiming::default());

        let (status, _) = send(&app, get("/api/v1/demo?scenario=settings")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(session.controller().scenario().as_str(), "digest");
    }

    #[tokio::test(start_paused = true)]
    async fn approving_returns_to_digest_with_raised_score() {
        let (app, _) = app(DemoTiming::default());
        send(&app, get("/api/v1/demo?scenario=auto-pr&gap=retry-logic-stripe")).await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/demo/actions",
                &json!({ "action_id": "athena.auto_pr.approve.v1", "value": "retry-logic-stripe" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = parse_body(&body);
        assert_eq!(body["outcome"], "applied");
        assert_eq!(body["state"]["resolved"][0], "retry-logic-stripe");
        assert_eq!(body["notifications"][0]["title"], "PR approved");
        assert_eq!(body["pending"], true);

        tokio::time::sleep(Duration::from_millis(1_600)).await;

        let (_, body) = send(&app, get("/api/v1/demo")).await;
        let body = parse_body(&body);
        assert_eq!(body["state"]["scenario"], "digest");
        assert_eq!(body["overall_score"], 77);
        assert_eq!(body["query"], "scenario=digest");
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_actions_are_bad_requests_with_correlation_id() {
        let (app, _) = app(DemoTiming::default());

        let (status, body) = send(
            &app,
            post_json("/api/v1/demo/actions", &json!({ "action_id": "athena.unknown.v1" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = parse_body(&body);
        assert!(body["detail"].as_str().is_some_and(|detail| detail.contains("athena.unknown.v1")));
        assert!(body["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payloads_are_rejected() {
        let (app, _) = app(DemoTiming::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/demo/actions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(parse_body(&body)["correlation_id"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_resolved_and_help() {
        let (app, session) = app(DemoTiming::default());
        send(&app, get("/api/v1/demo?scenario=qna&gap=feature-flag-invoice&help=true")).await;
        session.controller().complete_qa("feature-flag-invoice");

        let reset = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/demo/reset")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&app, reset).await;

        assert_eq!(status, StatusCode::OK);
        let body = parse_body(&body);
        assert_eq!(body["state"]["scenario"], "digest");
        assert_eq!(body["state"]["resolved"].as_array().map(Vec::len), Some(0));
        assert_eq!(body["state"]["help"], false);
        assert!(!session.controller().has_pending_return());
    }
}
