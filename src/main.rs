use portal_gate::config::{app_port, GatewayConfig};
use portal_gate::{create_app, db, docs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = GatewayConfig::from_env()?;
    let pool = db::init().await?;

    tracing::info!(
        backend = %config.backend_base_url,
        frontend = config.frontend_url.as_deref().unwrap_or("<none>"),
        protected = ?config.protected_prefixes,
        identity = if config.identity_url.is_some() { "remote" } else { "jwt" },
        "gateway configured"
    );

    let state = AppState::from_config(config, pool)?;
    let port = app_port();

    let openapi = docs::build_openapi(port)?;
    let app = create_app(state).merge(docs::swagger_routes(openapi)?);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
