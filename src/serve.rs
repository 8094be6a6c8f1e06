//! HTTP front end exposing the cache as an origin-serving fallback.
//!
//! This is the hosting environment for interception: every incoming request
//! becomes one `intercept` call, and the stored or forwarded response is
//! replayed to the client. A `/healthz` probe reports lifecycle state and
//! serving counters.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::{CacheState, OfflineAssetCache};
use crate::entry::{RequestKey, StoredResponse};

/// The cache instance shared across request handlers.
pub type SharedCache = Arc<OfflineAssetCache>;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    bucket: String,
    state: String,
    hits: u64,
    misses: u64,
    network_errors: u64,
}

/// Headers that describe the original connection, not the payload; never
/// replayed to the client.
const HOP_HEADERS: [&str; 4] = ["connection", "transfer-encoding", "keep-alive", "upgrade"];

fn is_hop_header(name: &str) -> bool {
    HOP_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Joins an incoming request path (with query) onto the configured origin.
fn join_origin(origin: &str, uri: &Uri) -> Option<String> {
    let base = reqwest::Url::parse(origin).ok()?;
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    base.join(path_and_query).ok().map(String::from)
}

/// Translates a stored response back into an HTTP response, verbatim except
/// for hop-by-hop headers.
fn replay(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
    let mut builder = Response::builder().status(status);
    for (name, value) in &stored.headers {
        if is_hop_header(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(Body::from(stored.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn healthz(State(cache): State<SharedCache>) -> impl IntoResponse {
    let snap = cache.serve_stats();
    let state = match cache.state() {
        CacheState::Uninstalled => "uninstalled",
        CacheState::Populating => "populating",
        CacheState::Active => "active",
        CacheState::InstallFailed => "install-failed",
    };
    axum::Json(HealthResponse {
        status: "ok".to_string(),
        bucket: cache.config().bucket.clone(),
        state: state.to_string(),
        hits: snap.hits,
        misses: snap.misses,
        network_errors: snap.network_errors,
    })
}

async fn serve_asset(State(cache): State<SharedCache>, method: Method, uri: Uri) -> Response {
    let Some(target) = join_origin(&cache.config().origin, &uri) else {
        return (StatusCode::BAD_REQUEST, "unresolvable request URL").into_response();
    };

    let key = RequestKey::new(method.as_str(), target);
    match cache.intercept(&key).await {
        Ok(stored) => replay(stored),
        Err(e) => {
            log::warn!("fallback fetch failed for {}: {e}", key.url);
            (StatusCode::BAD_GATEWAY, format!("upstream fetch failed: {e}")).into_response()
        }
    }
}

/// Builds the router: a health probe plus the catch-all asset handler.
pub fn router(cache: SharedCache) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(serve_asset)
        .layer(cors)
        .with_state(cache)
}

/// Binds and serves until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address is invalid or the listener cannot bind.
pub async fn run(cache: SharedCache, host: &str, port: u16) -> std::io::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad bind address: {e}"))
    })?;

    let app = router(cache);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("serving cache-first on http://{addr}");
    axum::serve(listener, app).await
}
