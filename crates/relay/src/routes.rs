use std::convert::Infallible;
use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::json;
use uuid::Uuid;
use warp::Filter;
use warp::http::header::{self, HeaderValue};
use warp::http::{Method, StatusCode};
use warp::hyper::body::Bytes;
use warp::reply::{Reply, Response};

use exam_core::Clock;

use crate::commands::{Update, handle_update};
use crate::config::RelayConfig;
use crate::error::NotifyError;
use crate::format::submission_message;
use crate::recent::{RecentSubmissions, StoredSubmission};
use crate::submission::RelaySubmission;
use crate::telegram::{BotApi, TelegramClient};

const ALLOW_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, \
     Content-Length, Content-MD5, Content-Type, Date, X-Api-Version, Authorization";
const SECRET_HEADER: &str = "x-telegram-webhook-secret";
/// Largest request body read by the submit and webhook routes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Shared state behind every route.
#[derive(Clone)]
pub struct RelayState {
    bot: Arc<dyn BotApi>,
    chat_id: Option<String>,
    webhook_secret: Option<String>,
    teacher_password: Option<String>,
    recent: Arc<RecentSubmissions>,
    clock: Clock,
}

impl RelayState {
    #[must_use]
    pub fn new(config: &RelayConfig, bot: Arc<dyn BotApi>, clock: Clock) -> Self {
        Self {
            bot,
            chat_id: config.telegram.chat_id.clone(),
            webhook_secret: config.webhook_secret.clone(),
            teacher_password: config.teacher_password.clone(),
            recent: Arc::new(RecentSubmissions::new(config.recent_limit)),
            clock,
        }
    }

    /// State backed by the real bot API and the system clock.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        let client = TelegramClient::new(&config.telegram);
        if !client.is_configured() || config.telegram.chat_id.is_none() {
            tracing::warn!("bot credentials not configured; submissions will not be forwarded");
        }
        Self::new(config, Arc::new(client), Clock::system())
    }

    #[must_use]
    pub fn recent(&self) -> Arc<RecentSubmissions> {
        Arc::clone(&self.recent)
    }

    async fn notify_teacher(&self, html: &str) -> Result<i64, NotifyError> {
        let chat_id = self
            .chat_id
            .as_deref()
            .ok_or(NotifyError::NotConfigured("TELEGRAM_CHAT_ID"))?;
        self.bot.send_message(chat_id, html).await
    }
}

/// All relay routes.
pub fn routes(
    state: RelayState,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    submit_route(state.clone())
        .or(submissions_route(state.clone()))
        .or(telegram_route(state))
        .or(health_route())
}

pub fn submit_route(
    state: RelayState,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    warp::path!("api" / "submit")
        .and(warp::method())
        .and(content_length())
        .and(limited_body())
        .and(with_state(state))
        .and_then(handle_submit)
}

pub fn submissions_route(
    state: RelayState,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    warp::path!("api" / "submissions")
        .and(warp::method())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_state(state))
        .and_then(handle_submissions)
}

pub fn telegram_route(
    state: RelayState,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    warp::path!("api" / "telegram")
        .and(warp::method())
        .and(warp::header::optional::<String>(SECRET_HEADER))
        .and(content_length())
        .and(limited_body())
        .and(with_state(state))
        .and_then(handle_telegram)
}

pub fn health_route() -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("health").and(warp::get()).map(|| {
        warp::reply::json(&json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    })
}

fn content_length() -> impl Filter<Extract = (Option<u64>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
}

/// The body when its declared length is within `MAX_BODY_BYTES`, otherwise
/// empty and unread. Handlers check the declared length themselves.
fn limited_body() -> impl Filter<Extract = (Bytes,), Error = Infallible> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .or(warp::any().map(Bytes::new))
        .unify()
}

fn is_oversized(content_length: Option<u64>) -> bool {
    content_length.is_some_and(|length| length > MAX_BODY_BYTES)
}

fn with_state(
    state: RelayState,
) -> impl Filter<Extract = (RelayState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

async fn handle_submit(
    method: Method,
    content_length: Option<u64>,
    body: Bytes,
    state: RelayState,
) -> Result<Response, Infallible> {
    if method == Method::OPTIONS {
        return Ok(cors(StatusCode::OK.into_response()));
    }
    if method != Method::POST {
        return Ok(cors(method_not_allowed()));
    }
    if is_oversized(content_length) {
        tracing::warn!(content_length, "submission body too large");
        return Ok(cors(json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            &json!({ "error": "Request body too large", "limit": MAX_BODY_BYTES }),
        )));
    }

    let submission: RelaySubmission = match serde_json::from_slice(&body) {
        Ok(submission) => submission,
        Err(err) => {
            tracing::warn!(error = %err, "unreadable submission body");
            return Ok(cors(json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": "Invalid JSON body", "details": err.to_string() }),
            )));
        }
    };
    let missing = submission.missing_fields();
    if !missing.is_empty() {
        return Ok(cors(json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "Missing required fields", "missing": missing }),
        )));
    }

    let submission_id = format!("sub_{}", Uuid::new_v4().simple());
    let received_at = state.clock.now();
    let message = submission_message(&submission, &submission_id, received_at);
    let telegram_sent = match state.notify_teacher(&message).await {
        Ok(message_id) => {
            tracing::debug!(submission_id = %submission_id, message_id, "teacher notified");
            true
        }
        Err(err @ NotifyError::NotConfigured(_)) => {
            tracing::warn!(submission_id = %submission_id, error = %err, "skipping bot notification");
            false
        }
        Err(err) => {
            tracing::error!(submission_id = %submission_id, error = %err, "bot notification failed");
            false
        }
    };

    let entry = StoredSubmission::new(submission_id.clone(), &submission, received_at, telegram_sent);
    if let Err(err) = state.recent.record(entry) {
        tracing::error!(submission_id = %submission_id, error = %err, "failed to record submission");
        return Ok(cors(json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({ "error": "Internal server error", "details": err.to_string() }),
        )));
    }

    tracing::info!(
        submission_id = %submission_id,
        student = submission.student_name(),
        test_id = submission.test_id(),
        answers = submission.answers.len(),
        telegram_sent,
        "submission relayed"
    );
    Ok(cors(json_response(
        StatusCode::OK,
        &json!({
            "success": true,
            "message": "Answers submitted successfully",
            "telegramSent": telegram_sent,
            "submissionId": submission_id,
            "timestamp": received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )))
}

async fn handle_submissions(
    method: Method,
    authorization: Option<String>,
    state: RelayState,
) -> Result<Response, Infallible> {
    if method == Method::OPTIONS {
        return Ok(cors(StatusCode::OK.into_response()));
    }
    let authorized = match (&state.teacher_password, authorization.as_deref()) {
        (Some(password), Some(header)) => header
            .strip_prefix("Bearer ")
            .is_some_and(|token| token == password),
        _ => false,
    };
    if !authorized {
        return Ok(cors(unauthorized()));
    }
    if method != Method::GET {
        return Ok(cors(method_not_allowed()));
    }

    match state.recent.all() {
        Ok(submissions) => Ok(cors(json_response(
            StatusCode::OK,
            &json!({
                "success": true,
                "count": submissions.len(),
                "submissions": submissions,
            }),
        ))),
        Err(err) => {
            tracing::error!(error = %err, "failed to list submissions");
            Ok(cors(json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Internal server error" }),
            )))
        }
    }
}

async fn handle_telegram(
    method: Method,
    secret: Option<String>,
    content_length: Option<u64>,
    body: Bytes,
    state: RelayState,
) -> Result<Response, Infallible> {
    if method == Method::OPTIONS {
        return Ok(cors(StatusCode::OK.into_response()));
    }
    if let Some(expected) = state.webhook_secret.as_deref() {
        if secret.as_deref() != Some(expected) {
            tracing::warn!("webhook called with a wrong secret");
            return Ok(cors(unauthorized()));
        }
    }
    if method != Method::POST {
        return Ok(cors(method_not_allowed()));
    }
    if is_oversized(content_length) {
        tracing::warn!(content_length, "webhook update too large; ignored");
        return Ok(cors(json_response(StatusCode::OK, &json!({ "ok": true }))));
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            if let Err(err) = handle_update(&update, state.bot.as_ref(), &state.recent).await {
                tracing::error!(error = %err, "webhook update handling failed");
            }
        }
        Err(err) => tracing::warn!(error = %err, "unreadable webhook update"),
    }
    Ok(cors(json_response(StatusCode::OK, &json!({ "ok": true }))))
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn method_not_allowed() -> Response {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "error": "Method not allowed" }),
    )
}

fn unauthorized() -> Response {
    json_response(StatusCode::UNAUTHORIZED, &json!({ "error": "Unauthorized" }))
}

fn cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}
