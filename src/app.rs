use std::sync::Arc;

use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{authorize_request, Gatekeeper, PolicyTable, RouteMatcher};
use crate::config::GatewayConfig;
use crate::errors::AppError;
use crate::identity::{IdentityProvider, JwtIdentityProvider, RemoteIdentityProvider};
use crate::jwt::SessionTokenConfig;
use crate::profiles::{ProfileStore, SqliteProfileStore};
use crate::routes::{auth, health, pages, proxy};
use crate::upstream::{BackendClient, FrontendClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub gatekeeper: Gatekeeper,
    pub backend: BackendClient,
    pub frontend: Option<FrontendClient>,
}

impl AppState {
    /// Wires the gateway around explicit collaborators.
    pub fn new(
        config: GatewayConfig,
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Result<Self, AppError> {
        let policy = match &config.policy_file {
            Some(path) => PolicyTable::from_file(path)?,
            None => PolicyTable::builtin(),
        };
        let matcher = RouteMatcher::new(config.protected_prefixes.iter().cloned())?;

        let gatekeeper = Gatekeeper::new(identity, profiles, Arc::new(policy), Arc::new(matcher))
            .with_timeout(config.collaborator_timeout);

        let backend = BackendClient::new(config.backend_base_url.clone(), config.proxy_timeout)?;
        let frontend = config
            .frontend_url
            .as_ref()
            .map(|url| FrontendClient::new(url.clone(), config.proxy_timeout))
            .transpose()?;

        Ok(Self {
            config: Arc::new(config),
            gatekeeper,
            backend,
            frontend,
        })
    }

    /// Production wiring: SQLite profile store plus the configured identity
    /// provider (remote service when `IDENTITY_URL` is set, local JWT otherwise).
    pub fn from_config(config: GatewayConfig, pool: SqlitePool) -> Result<Self, AppError> {
        let identity: Arc<dyn IdentityProvider> = match (&config.identity_url, &config.session_secret) {
            (Some(url), _) => Arc::new(RemoteIdentityProvider::new(
                url.clone(),
                config.identity_api_key.clone(),
                config.session_cookie.clone(),
                config.collaborator_timeout,
            )?),
            (None, Some(secret)) => Arc::new(JwtIdentityProvider::new(
                config.session_cookie.clone(),
                SessionTokenConfig::new(secret.clone()),
            )),
            (None, None) => {
                return Err(AppError::configuration(
                    "either SESSION_JWT_SECRET or IDENTITY_URL must be set",
                ))
            }
        };

        let profiles: Arc<dyn ProfileStore> = Arc::new(SqliteProfileStore::new(pool));
        Self::new(config, identity, profiles)
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let page_routes = Router::new()
        .route("/dashboard", any(pages::relay))
        .route("/dashboard/*rest", any(pages::relay))
        .route("/onboarding", any(pages::relay))
        .route("/onboarding/*rest", any(pages::relay));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/auth/token", get(auth::token))
        .merge(proxy::router())
        .merge(page_routes)
        .layer(from_fn_with_state(state.clone(), authorize_request))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
