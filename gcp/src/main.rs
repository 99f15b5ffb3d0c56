//! edge-sts: webhook authentication and OIDC token issuance - GCP adapter
//!
//! Lightweight HTTP server using hyper, deployable as a GCP Cloud Function or Cloud Run service.
//! Each connection is served on its own tokio task.

use anyhow::Context;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use edge_sts_core::config::Config;
use edge_sts_core::error::{ApiError, ErrorResponse};
use edge_sts_core::github::webhook::{self, SignaturePolicy, WebhookRequest};
use edge_sts_core::oidc::{self, PemTokenSigner};
use edge_sts_core::platform::{Clock, TokenSigner};
use edge_sts_core::sts;

mod platform;

use platform::{GcpEnv, SystemClock};

/// Mint requests are small JSON documents
const MAX_MINT_BODY_BYTES: usize = 1024 * 1024;

/// GitHub caps webhook payloads at 25 MB
const MAX_WEBHOOK_BODY_BYTES: usize = 25 * 1024 * 1024;

const METADATA_CACHE_CONTROL: &str = "public, max-age=300";

/// Shared application state
struct AppState {
    config: Config,
    signer: Box<dyn TokenSigner>,
    clock: Box<dyn Clock>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let port: u16 = match std::env::var("PORT") {
        Ok(port) => port.parse().context("PORT must be a number")?,
        Err(_) => 8080,
    };

    let project_id = GcpEnv::detect_project_id().unwrap_or_else(|_| "unknown".into());
    let env = GcpEnv::new(project_id);
    let config = Config::from_env(&env).context("failed to load configuration")?;

    if config.webhook_secret.is_none() {
        tracing::warn!("GITHUB_WEBHOOK_SECRET not set; webhook signatures will not be verified (open mode)");
    }
    if config.mint_api_key.is_none() {
        tracing::warn!("MINT_API_KEY not set; /mint will refuse every request");
    }

    let signer = PemTokenSigner::new(config.signing_key_pem.clone(), config.key_id.clone());
    let state = Arc::new(AppState {
        config,
        signer: Box::new(signer),
        clock: Box::new(SystemClock),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;

    tracing::info!(
        port,
        project = env.project_id(),
        issuer = %state.config.issuer_url,
        "edge-sts listening"
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };
                let state = state.clone();

                tokio::spawn(async move {
                    let io = hyper_util::rt::TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        async move { handle_request(req, &state).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        tracing::debug!(error = %e, %peer, "connection error");
                    }
                });
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received; no longer accepting connections");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

type HyperResponse = Response<Full<Bytes>>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn handle_request<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<HyperResponse, std::convert::Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let result = route_request(req, state).await;
    Ok(result)
}

async fn route_request<B>(req: Request<B>, state: &AppState) -> HyperResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::debug!(%method, %path, "request");

    match (method, path.as_str()) {
        (Method::GET, "/") | (Method::GET, "/healthz") => handle_health(),
        (Method::GET, "/.well-known/openid-configuration") => handle_discovery(state),
        (Method::GET, "/.well-known/jwks.json") => handle_jwks(state),
        (Method::POST, "/mint") => handle_mint(req, state).await,
        (Method::POST, "/webhook") => handle_webhook(req, state).await,
        _ => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({"error": "not found", "code": "not_found"}),
        ),
    }
}

fn handle_health() -> HyperResponse {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "status": "ok",
            "name": "edge-sts",
            "platform": "gcp"
        }),
    )
}

fn handle_discovery(state: &AppState) -> HyperResponse {
    let document = oidc::discovery_document(&state.config.issuer_url);
    with_cache_control(json_response(StatusCode::OK, &document))
}

fn handle_jwks(state: &AppState) -> HyperResponse {
    match oidc::jwks_document(state.signer.as_ref()) {
        Ok(jwks) => with_cache_control(json_response(StatusCode::OK, &jwks)),
        Err(e) => error_response(&e),
    }
}

async fn handle_mint<B>(req: Request<B>, state: &AppState) -> HyperResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let authorization = header_string(req.headers(), AUTHORIZATION.as_str());

    let body = match read_body(req.into_body(), MAX_MINT_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let request = sts::mint::MintRequest {
        authorization,
        body: body.to_vec(),
    };

    match sts::mint::handle(
        request,
        &state.config,
        state.signer.as_ref(),
        state.clock.as_ref(),
    )
    .await
    {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => error_response(&e),
    }
}

async fn handle_webhook<B>(req: Request<B>, state: &AppState) -> HyperResponse
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let signature = header_string(req.headers(), webhook::SIGNATURE_HEADER);
    let event_type = header_string(req.headers(), webhook::EVENT_HEADER);
    let delivery_id = header_string(req.headers(), webhook::DELIVERY_HEADER);

    let body = match read_body(req.into_body(), MAX_WEBHOOK_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let request = WebhookRequest {
        body: body.to_vec(),
        signature,
        event_type,
        delivery_id,
    };
    let policy = SignaturePolicy::from_secret(state.config.webhook_secret.as_deref());

    match webhook::handle(&request, policy) {
        Ok(ack) => json_response(StatusCode::ACCEPTED, &ack),
        Err(e) => error_response(&e),
    }
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ApiError::payload_too_large(format!(
            "request body exceeds {} bytes",
            limit
        ))),
        Err(_) => Err(ApiError::invalid_request("request body could not be read")),
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn error_response(err: &ApiError) -> HyperResponse {
    if err.is_server_error() {
        tracing::error!(error = %err, code = err.error_key(), "request failed");
    } else {
        tracing::debug!(error = %err, code = err.error_key(), "request rejected");
    }

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse::from(err);
    json_response(status, &body)
}

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> HyperResponse {
    let json = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn with_cache_control(mut response: HyperResponse) -> HyperResponse {
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(METADATA_CACHE_CONTROL));
    response
}
