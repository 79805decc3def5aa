use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN,
        },
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use fastcompile::{
    Dispatcher, Error, Job, OriginPolicy, ResponseEnvelope, ServiceConfig, VersionCache,
};
use serde::Serialize;
use std::{future::Future, net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Startup error: {0}")]
    Startup(#[from] fastcompile::Error),
    #[error("Server error: {0}")]
    ServerError(String),
}

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
    versions: Arc<VersionCache>,
    origins: Arc<OriginPolicy>,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        versions: Arc<VersionCache>,
        origins: OriginPolicy,
    ) -> Self {
        Self {
            dispatcher,
            versions,
            origins: Arc::new(origins),
        }
    }

    fn service_version(&self) -> &str {
        self.dispatcher.service_version()
    }
}

/// Start every backend named by `config` and build the router in front of them.
///
/// The dispatcher is returned as well so the caller can stop the backends
/// once the server has shut down.
pub async fn create_app(config: &ServiceConfig) -> Result<(Router, Arc<Dispatcher>), ServerError> {
    let registry = Arc::new(config.registry()?);
    let origins = OriginPolicy::new(config.allowed_origins.iter().cloned())?;

    let dispatcher = Arc::new(Dispatcher::start(&registry, config).await);
    let versions = Arc::new(VersionCache::new(registry).with_backends_dir(&config.backends_dir));

    let app = router(AppState::new(dispatcher.clone(), versions, origins));
    Ok((app, dispatcher))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check).fallback(not_found))
        .route(
            "/compile",
            post(compile).options(preflight).fallback(not_found),
        )
        .route(
            "/compiler_versions",
            get(compiler_versions).fallback(not_found),
        )
        .fallback(not_found)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server<F>(app: Router, addr: SocketAddr, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    info!("Starting compile server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn compile(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());

    if let Err(e) = state.origins.check(origin) {
        warn!("Rejected compile request: {}", e);
        return json_response(
            StatusCode::FORBIDDEN,
            None,
            &ResponseEnvelope::failure(&e, state.service_version()),
        );
    }

    let job: Job = match serde_json::from_slice(&body) {
        Ok(job) => job,
        Err(e) => {
            let error = Error::MalformedRequest(e.to_string());
            return json_response(
                StatusCode::BAD_REQUEST,
                origin,
                &ResponseEnvelope::failure(&error, state.service_version()),
            );
        }
    };

    let span = info_span!("compile", request_id = %Uuid::new_v4(), lang = %job.language);
    let envelope = state.dispatcher.handle(&job).instrument(span).await;

    let status = if envelope.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    json_response(status, origin, &envelope)
}

async fn preflight(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    if let Err(e) = state.origins.check(origin) {
        return json_response(
            StatusCode::FORBIDDEN,
            None,
            &ResponseEnvelope::failure(&e, state.service_version()),
        );
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin_value(origin));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn compiler_versions(State(state): State<AppState>) -> Response {
    let mut body: serde_json::Map<String, serde_json::Value> = state
        .versions
        .get()
        .await
        .iter()
        .map(|(language, version)| (language.clone(), version.clone().into()))
        .collect();
    body.insert(
        "serviceVersion".to_string(),
        state.service_version().to_string().into(),
    );
    json_response(StatusCode::OK, Some("*"), &body)
}

async fn not_found(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let error = Error::RouteNotFound(format!("{} {}", method, uri.path()));
    json_response(
        StatusCode::NOT_FOUND,
        None,
        &ResponseEnvelope::failure(&error, state.service_version()),
    )
}

/// Serialize `body` with an exact `Content-Length` and the CORS decision.
/// `allow_origin` of `None` means the origin was not accepted.
fn json_response<T: Serialize>(status: StatusCode, allow_origin: Option<&str>, body: &T) -> Response {
    let body = serde_json::to_vec(body).unwrap_or_else(|e| {
        warn!("Failed to serialize response body: {}", e);
        Vec::new()
    });
    let length = body.len();

    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin_value(allow_origin));
    response
}

fn allow_origin_value(origin: Option<&str>) -> HeaderValue {
    origin
        .and_then(|origin| HeaderValue::from_str(origin).ok())
        .unwrap_or_else(|| HeaderValue::from_static("null"))
}
