use axum::{
    Router,
    extract::{ConnectInfo, DefaultBodyLimit, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use engine::ReceiptPipeline;

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use crate::receipt;

pub const DEFAULT_MAX_FILE_SIZE: usize = 5_242_880;
/// Room for multipart boundaries and the text fields around the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Who may call the API.
///
/// Requests must carry HTTP Basic credentials matching `api_key` and
/// `api_secret`, unless auth is disabled or the peer address is trusted.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub api_key: String,
    pub api_secret: String,
    pub disable_auth: bool,
    pub trusted_ips: Vec<IpAddr>,
}

impl AuthConfig {
    fn is_trusted(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.trusted_ips
            .iter()
            .any(|trusted| trusted.to_canonical() == ip)
    }

    fn accepts(&self, credentials: &Authorization<Basic>) -> bool {
        !self.api_key.is_empty()
            && credentials.username() == self.api_key
            && credentials.password() == self.api_secret
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub auth: AuthConfig,
    pub max_file_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<ReceiptPipeline>,
    pub auth: Arc<AuthConfig>,
    pub max_file_size: usize,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if state.auth.disable_auth {
        return Ok(next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    if peer.is_some_and(|ip| state.auth.is_trusted(ip)) {
        return Ok(next.run(request).await);
    }

    match auth_header {
        Some(TypedHeader(credentials)) if state.auth.accepts(&credentials) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::debug!(?peer, "rejected unauthenticated request");
            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"receipts\"")],
            )
                .into_response())
        }
    }
}

pub fn router(pipeline: Arc<ReceiptPipeline>, config: ServerConfig) -> Router {
    let state = ServerState {
        pipeline,
        auth: Arc::new(config.auth),
        max_file_size: config.max_file_size,
    };

    Router::new()
        .route("/api/receipt", post(receipt::process))
        .route("/api/receipt/upload", post(receipt::upload))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .layer(DefaultBodyLimit::max(
            config.max_file_size.saturating_add(MULTIPART_OVERHEAD),
        ))
        .with_state(state)
}

pub async fn run_with_listener(
    pipeline: ReceiptPipeline,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);
    if config.auth.disable_auth {
        tracing::warn!("authentication is disabled");
    }

    let app = router(Arc::new(pipeline), config);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

pub fn spawn_with_listener(
    pipeline: ReceiptPipeline,
    config: ServerConfig,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(pipeline, config, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
