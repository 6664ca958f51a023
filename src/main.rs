use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use quick_pay::api::{self, AppState};
use quick_pay::config::{AppConfig, ResolvedConfig, DEFAULT_CONFIG_FILE};
use quick_pay::orders::{demo_roster, load_roster, SeedEntry};
use quick_pay::store::{self, DiskSlipStore, LocalStore, Persistence};

#[tokio::main]
async fn main() -> Result<()> {
    // init tracing from env QUICKPAY_LOG or RUST_LOG
    let filter = std::env::var("QUICKPAY_LOG")
        .unwrap_or_else(|_| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_path =
        std::env::var("QUICKPAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let cfg = AppConfig::load_from(&config_path)?.resolved()?;
    let admin_token_mask = match &cfg.admin_token {
        Some(t) => format!("set (len={})", t.len()),
        None => "unset".to_string(),
    };
    info!(
        config = %config_path,
        storage = %cfg.storage,
        data_dir = %cfg.data_dir.display(),
        admin_token = %admin_token_mask,
        "quick-pay starting up"
    );
    if cfg.admin_token.is_none() {
        warn!("QUICKPAY_ADMIN_TOKEN not set; admin endpoints are open");
    }

    let state = Arc::new(build_state(&cfg)?);
    let app = api::router(state, cfg.slips_dir(), cfg.max_upload_bytes).layer(cors_layer(&cfg));

    let addr: SocketAddr = format!("{}:{}", cfg.bind, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.bind, cfg.port))?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(listen = %addr, err = ?e, "failed to bind to address");
            return Err(e.into());
        }
    };
    info!(listen = %addr, public_base = %cfg.public_base, "quick-pay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

fn build_state(cfg: &ResolvedConfig) -> Result<AppState> {
    std::fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("creating {}", cfg.data_dir.display()))?;
    let backend = store::open_backend(cfg.storage, &cfg.data_dir)
        .with_context(|| format!("opening {} storage", cfg.storage))?;
    let persistence = Persistence::new(backend, LocalStore::new(&cfg.data_dir));
    let slips = DiskSlipStore::new(cfg.slips_dir(), &cfg.public_base);

    let roster: Vec<SeedEntry> = match &cfg.seed_roster {
        Some(path) => load_roster(path)?,
        None => demo_roster(),
    };
    if let Some(r) = &cfg.recipient {
        if let Err(e) = r.validate() {
            warn!(error = %e, "configured recipient cannot be encoded");
        }
    }

    Ok(AppState::load(
        persistence,
        Box::new(slips),
        roster,
        cfg.pricing,
        cfg.recipient.clone(),
    )
    .with_admin_token(cfg.admin_token.clone())
    .with_qr_scale(cfg.qr_pixels_per_module))
}

/// Any origin when none are configured, otherwise the listed ones.
fn cors_layer(cfg: &ResolvedConfig) -> CorsLayer {
    if cfg.cors_origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    // invalid entries are skipped
    let list: Vec<HeaderValue> = cfg
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    if list.is_empty() {
        CorsLayer::new().allow_methods(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(list))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
