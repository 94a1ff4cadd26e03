use std::{net::SocketAddr, process, sync::Arc};

use spaceproxy::{
    application::{ProxyService, RetryPolicy, error::AppError},
    cache::{CacheConfig, ResponseStore},
    config,
    domain::Endpoints,
    infra::{
        error::InfraError,
        http::{self, HttpState, RateLimiter, cors::cors_layer},
        telemetry,
        upstream::ReqwestUpstream,
    },
};
use tokio::{signal, task::JoinHandle};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    if settings.upstream.api_key.is_empty() {
        warn!(
            target = "spaceproxy::startup",
            "no NASA API key configured; api.nasa.gov calls will be rejected upstream"
        );
    }

    let state = build_state(&settings)?;
    let sweeper = spawn_rate_limit_sweeper(state.rate_limiter.clone());

    let result = serve_http(&settings, state).await;

    sweeper.abort();
    let _ = sweeper.await;

    result
}

fn build_state(settings: &config::Settings) -> Result<HttpState, AppError> {
    let upstream_settings = &settings.upstream;
    let user_agent = upstream_settings
        .user_agent
        .as_deref()
        .unwrap_or(ReqwestUpstream::default_user_agent());
    let upstream = ReqwestUpstream::new(upstream_settings.timeout, user_agent)?;

    let cache = Arc::new(ResponseStore::new(&CacheConfig::from(&settings.cache)));
    let retry = RetryPolicy::new(upstream_settings.max_retries, upstream_settings.backoff_step);
    let proxy = ProxyService::new(Arc::new(upstream), cache, retry);

    let endpoints = Endpoints {
        api_base: upstream_settings.api_base.clone(),
        images_base: upstream_settings.images_base.clone(),
        epic_archive_base: upstream_settings.epic_archive_base.clone(),
        api_key: upstream_settings.api_key.clone(),
    };

    let rate_limiter = RateLimiter::new(
        settings.rate_limit.window,
        settings.rate_limit.max_requests.get(),
    );

    Ok(HttpState {
        proxy,
        endpoints: Arc::new(endpoints),
        rate_limiter: Arc::new(rate_limiter),
    })
}

/// Periodically forget clients whose window has elapsed.
fn spawn_rate_limit_sweeper(limiter: Arc<RateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let dropped = limiter.prune();
            if dropped > 0 {
                debug!(
                    target = "spaceproxy::http::rate_limit",
                    dropped,
                    tracked = limiter.tracked_clients(),
                    "pruned expired rate-limit windows"
                );
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state, cors_layer(&settings.cors));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "spaceproxy::startup",
        addr = %settings.server.addr,
        "API server started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "spaceproxy::startup", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(target = "spaceproxy::startup", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(target = "spaceproxy::startup", error = %err, "failed to listen for SIGTERM");
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

    info!(target = "spaceproxy::startup", "shutdown signal received");
}
