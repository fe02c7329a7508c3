//! assetgate REST API Server
//!
//! Run with: cargo run --features server --bin assetgate-server

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetgate::config::Args;
use assetgate::gate::Gate;
use assetgate::password::hash_password;
use assetgate::server::{router, AppState};
use assetgate::{CredentialStore, IdentityStatus, LmdbStore, NewIdentity, PermissionSet, StoreError, TokenCodec};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("assetgate={},tower_http=info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    let store = match LmdbStore::open(&args.db_path) {
        Ok(s) => s,
        Err(e) => {
            error!(path = %args.db_path, "failed to open credential store: {}", e);
            std::process::exit(1);
        }
    };
    info!(path = %args.db_path, "credential store ready");

    if let (Some(identifier), Some(password)) = (&args.admin_identifier, &args.admin_password) {
        if store.is_bootstrapped().unwrap_or(false) {
            info!("administrator already bootstrapped");
        } else {
            let secret_hash = match hash_password(password) {
                Ok(h) => h,
                Err(e) => {
                    error!("failed to hash administrator password: {}", e);
                    std::process::exit(1);
                }
            };
            let admin = NewIdentity {
                name: "Administrator".into(),
                email: args.admin_email.clone(),
                mobile_no: identifier.clone(),
                secret_hash,
                status: IdentityStatus::Active,
                permissions: PermissionSet::wildcard(),
            };
            match store.bootstrap(admin) {
                Ok(identity) => info!(identity_id = identity.id, "bootstrapped initial administrator"),
                Err(StoreError::AlreadyBootstrapped) => info!("administrator already bootstrapped"),
                Err(e) => {
                    error!("bootstrap failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    let codec = match TokenCodec::from_secret(args.jwt_secret.as_deref(), args.token_ttl_secs) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if !codec.is_enabled() {
        error!("JWT_SECRET is not set: login is disabled and every protected route will answer 401");
    }

    let store: Arc<dyn CredentialStore> = Arc::new(store);
    let gate = Gate::new(codec, store.clone(), args.permission_source);
    let app = router(AppState::new(store, gate));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, "failed to bind: {}", e);
            std::process::exit(1);
        }
    };
    info!("assetgate-server v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("server error: {}", e);
    }
}
