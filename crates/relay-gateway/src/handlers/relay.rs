//! Thin handlers: parse enough of the body to build a `RelayRequest`, hand
//! it to `RelayEngine::relay`, stream the result back (§6).

use axum::body::{Body, Bytes};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use serde_json::Value;

use relay_adaptor::RelayMode;
use relay_engine::RelayRequest;

use crate::auth::AuthenticatedToken;
use crate::error::ApiError;
use crate::state::AppState;

/// Flat per-token estimate used to reserve quota ahead of dispatch. Real
/// deployments derive this from the request's declared `max_tokens` and the
/// model's pricing ratios (§4.6 step 3); this gateway keeps the estimator
/// simple and lets settlement true it up against the adaptor's reported
/// usage once the stream ends.
const DEFAULT_ESTIMATE: i64 = 500;

async fn relay_and_stream(
    state: AppState,
    auth: AuthenticatedToken,
    mode: RelayMode,
    model: String,
    estimate: i64,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = relay_core::RequestId::new();

    let request = RelayRequest::new(
        auth.group,
        model,
        auth.token_id,
        auth.user_id,
        mode,
        estimate,
        body,
    );

    let upstream = state.engine.relay(request).await?;
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::OK);
    let mut response = Response::new(Body::from_stream(upstream.body));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert("x-request-id", value);
    }
    Ok(response)
}

fn extract_model(body: &Bytes) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::new(400, "invalid_request_error", format!("malformed JSON body: {err}")))?;
    value
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(400, "invalid_request_error", "request body is missing \"model\""))
}

pub async fn chat_completions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let model = extract_model(&body)?;
    relay_and_stream(state, auth, RelayMode::Chat, model, DEFAULT_ESTIMATE, body).await
}

pub async fn responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let model = extract_model(&body)?;
    relay_and_stream(state, auth, RelayMode::ResponseApi, model, DEFAULT_ESTIMATE, body).await
}

/// Stateful response retrieval/cancellation requires a store of
/// provider-side response ids this gateway does not keep (no upstream
/// adaptor in this workspace persists one); these three routes exist so the
/// client-facing surface matches §6 exactly, and report the limitation
/// rather than 404ing on an unrecognized path.
pub async fn get_response(Path(response_id): Path<String>) -> ApiError {
    response_lookup_unsupported(response_id)
}

pub async fn delete_response(Path(response_id): Path<String>) -> ApiError {
    response_lookup_unsupported(response_id)
}

pub async fn cancel_response(Path(response_id): Path<String>) -> ApiError {
    response_lookup_unsupported(response_id)
}

fn response_lookup_unsupported(response_id: String) -> ApiError {
    ApiError::new(
        501,
        "not_implemented",
        format!("no adaptor in this deployment persists response id {response_id} for retrieval"),
    )
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let model = extract_model(&body)?;
    relay_and_stream(state, auth, RelayMode::ClaudeMessages, model, DEFAULT_ESTIMATE, body).await
}

pub async fn image_generations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let model = extract_model(&body)?;
    relay_and_stream(state, auth, RelayMode::Image, model, DEFAULT_ESTIMATE, body).await
}

pub async fn image_edits(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let model = extract_model(&body)?;
    relay_and_stream(state, auth, RelayMode::Image, model, DEFAULT_ESTIMATE, body).await
}

pub async fn audio_speech(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let model = extract_model(&body)?;
    relay_and_stream(state, auth, RelayMode::Audio, model, DEFAULT_ESTIMATE, body).await
}

/// Transcription/translation requests are multipart (audio file + form
/// fields); this gateway accepts the raw multipart body unparsed and
/// relies on the caller naming the model in the query string, deferring
/// multipart decomposition to the resolved adaptor's `convert_request`.
#[derive(Deserialize)]
pub struct AudioModelQuery {
    model: String,
}

pub async fn audio_transcription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    Query(query): Query<AudioModelQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    relay_and_stream(state, auth, RelayMode::Audio, query.model, DEFAULT_ESTIMATE, body).await
}

pub async fn audio_translation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedToken>,
    Query(query): Query<AudioModelQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    relay_and_stream(state, auth, RelayMode::Audio, query.model, DEFAULT_ESTIMATE, body).await
}
