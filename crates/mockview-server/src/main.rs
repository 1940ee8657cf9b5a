//! mockview server binary.
//!
//! Usage: `mockview-server [CONFIG]`. Without an argument the path comes
//! from `MOCKVIEW_CONFIG_PATH`, then `./config.toml`; a missing file means
//! built-in defaults.

use mockview_server::config::{self, LoggingConfig};
use mockview_server::{app, AppState};
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Where the configuration path came from, for the startup log line.
#[derive(Debug, Clone, Copy)]
enum PathOrigin {
    Argument,
    Environment,
    Fallback,
}

fn config_path() -> (String, PathOrigin) {
    let non_blank = |value: &String| !value.trim().is_empty();
    if let Some(path) = std::env::args().nth(1).filter(non_blank) {
        (path, PathOrigin::Argument)
    } else if let Some(path) = std::env::var("MOCKVIEW_CONFIG_PATH").ok().filter(non_blank) {
        (path, PathOrigin::Environment)
    } else {
        (DEFAULT_CONFIG_PATH.to_string(), PathOrigin::Fallback)
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?} ({e}), falling back to info", logging.level);
        EnvFilter::new("info")
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let (path, origin) = config_path();
    let config = match config::load_config(Some(path.as_str())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mockview-server: cannot load {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.logging);
    tracing::info!(path = %path, origin = ?origin, "configuration loaded");

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "could not bind listen address");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "mockview server listening");

    if let Err(e) = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server terminated with an error");
        return ExitCode::FAILURE;
    }

    tracing::info!("mockview server stopped");
    ExitCode::SUCCESS
}

/// Resolves on Ctrl+C, or on SIGTERM where signals exist.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal, "shutting down");
}
