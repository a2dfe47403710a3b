//! Gateway entrypoint: loads configuration, wires the relay collaborators,
//! and serves the HTTP surface from distilled spec §6.

mod auth;
mod config;
mod error;
mod handlers;
mod log;
mod probe;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use relay_adaptor::AdaptorRegistry;
use relay_healthcheck::HealthProber;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{bootstrap, Cli};
use crate::probe::{spawn_health_loop, RegistryProbe};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let bootstrapped = bootstrap(&cli).expect("failed to load gateway configuration");

    let registry = Arc::new(AdaptorRegistry::new());
    let prober = Arc::new(HealthProber::new(
        Arc::clone(&bootstrapped.index),
        Arc::new(RegistryProbe::new(Arc::clone(&registry))),
        &bootstrapped.config,
    ));
    spawn_health_loop(
        Arc::clone(&prober),
        Duration::from_millis(bootstrapped.config.request_interval_ms),
    );

    let state = AppState::new(bootstrapped.index, bootstrapped.ledger, registry, bootstrapped.config);

    let listener = tokio::net::TcpListener::bind(bootstrapped.bind)
        .await
        .expect("failed to bind listener");

    tracing::info!(addr = %bootstrapped.bind, "relay-gateway listening");

    axum::serve(listener, app(state).into_make_service())
        .await
        .expect("server error");
}

fn app(state: AppState) -> Router {
    let relay_routes = Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/responses", post(handlers::responses))
        .route(
            "/v1/responses/:response_id",
            get(handlers::get_response).delete(handlers::delete_response),
        )
        .route("/v1/responses/:response_id/cancel", post(handlers::cancel_response))
        .route("/v1/messages", post(handlers::messages))
        .route("/v1/images/generations", post(handlers::image_generations))
        .route("/v1/images/edits", post(handlers::image_edits))
        .route("/v1/audio/speech", post(handlers::audio_speech))
        .route("/v1/audio/transcriptions", post(handlers::audio_transcription))
        .route("/v1/audio/translations", post(handlers::audio_translation))
        .route("/v1/realtime", get(handlers::realtime_upgrade))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/token/consume", post(handlers::consume_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    Router::new()
        .merge(relay_routes)
        .route("/api/cost/request/:request_id", get(handlers::request_cost))
        .route("/health/live", get(handlers::health_live))
        .route("/health/ready", get(handlers::health_ready))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use relay_core::GatewayConfig;
    use relay_ledger::{QuotaLedger, Token, User};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let index = Arc::new(relay_ability::AbilityIndex::new());
        let ledger = Arc::new(QuotaLedger::new());
        ledger.upsert_user(User::new(1, "default", 1000));
        ledger.upsert_token(Token::new(1, 1, 1000));
        let registry = Arc::new(AdaptorRegistry::new());
        AppState::new(index, ledger, registry, GatewayConfig::default())
    }

    #[tokio::test]
    async fn liveness_probe_returns_ok() {
        let response = app(test_state())
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_completions_without_auth_is_rejected() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn models_lists_only_the_callers_group() {
        let index = Arc::new(relay_ability::AbilityIndex::new());
        index.load(
            vec![relay_ability::Channel::new(1, "openai", "c1")],
            vec![relay_ability::Ability::new("default", "gpt-4o-mini", 1)],
        );
        let ledger = Arc::new(QuotaLedger::new());
        ledger.upsert_user(User::new(1, "default", 1000));
        ledger.upsert_token(Token::new(1, 1, 1000));
        let registry = Arc::new(AdaptorRegistry::new());
        let state = AppState::new(index, ledger, registry, GatewayConfig::default());

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/models")
                    .header("authorization", "Bearer 1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_completions_with_no_channel_configured_fails_gracefully() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/completions")
                    .header("authorization", "Bearer 1")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"model":"gpt-4o-mini"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
