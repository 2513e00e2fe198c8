//! # newsboard binary
//!
//! Assembles the adapters behind the domain ports and serves the router.

use std::sync::Arc;

use api_adapters::{AppState, Limits};
use auth_adapters::{Argon2Hasher, JwtSessions, RecaptchaVerifier};
use configs::{LogSettings, Settings};
use domains::{AccountRepo, BotVerifier, NewsRepo};
use services::{AccountService, GroupBootstrap, NewsService};
use storage_adapters::SqliteStore;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Settings {
        server,
        database,
        captcha,
        auth,
        accounts,
        news,
        log,
        env_file,
    } = Settings::load()?;
    init_tracing(&log);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }

    // 1. Entity Store
    let store = Arc::new(SqliteStore::connect(&database.url, database.max_connections).await?);
    let news_repo: Arc<dyn NewsRepo> = store.clone();
    let account_repo: Arc<dyn AccountRepo> = store;

    // 2. Bot verification and credentials
    let captcha_timeout = captcha.timeout();
    let verifier: Arc<dyn BotVerifier> = Arc::new(RecaptchaVerifier::new(
        captcha.secret_key,
        captcha.verify_url,
        captcha_timeout,
    )?);
    let sessions = Arc::new(JwtSessions::new(&auth.jwt_secret, auth.token_ttl()));

    // 3. Services
    let bootstrap = GroupBootstrap::new(
        account_repo.clone(),
        accounts.default_group_name,
        accounts.default_group_permissions,
    );
    let state = AppState {
        news: Arc::new(NewsService::new(news_repo, verifier.clone())),
        accounts: Arc::new(AccountService::new(
            account_repo,
            Arc::new(Argon2Hasher::new()),
            verifier,
            sessions,
            bootstrap,
        )),
        limits: Limits {
            home: news.home_limit,
            list: news.list_limit,
        },
    };

    let app = api_adapters::router(state);
    let address = server.addr();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("newsboard listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("newsboard shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(err) => {
                tracing::error!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
