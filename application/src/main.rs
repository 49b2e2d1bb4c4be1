use std::{future::IntoFuture as _, io, sync::OnceLock};

use fairway::{router, Args, Config};
use futures::{future, TryFutureExt as _};
use service::{
    infra::{notification, payment, postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::writer::BoxMakeWriter,
    layer::{Layer as _, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt as _,
};

/// Levels written to `stderr` instead of `stdout`.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

/// Configured maximum [`log::Level`], [`log::Level::INFO`] until the
/// [`Config`] is loaded.
static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    init_logging();

    _ = run().await;
}

/// Installs a global [`tracing`] subscriber splitting events between
/// `stdout` and `stderr` by their level.
fn init_logging() {
    tracing_subscriber::registry()
        .with(output(false))
        .with(output(true))
        .init();
}

/// Creates a formatting [`Layer`] writing either to `stderr` or `stdout`,
/// depending on the provided flag.
///
/// [`Layer`]: tracing_subscriber::Layer
fn output<S>(to_stderr: bool) -> impl tracing_subscriber::Layer<S>
where
    S: log::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = if to_stderr {
        BoxMakeWriter::new(io::stderr)
    } else {
        BoxMakeWriter::new(io::stdout)
    };
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            let max = LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO);
            meta.is_span()
                || STDERR_LEVELS.contains(meta.level()) == to_stderr
                    && max >= *meta.level()
        }))
}

/// Runs the server until it or any of its background tasks fails.
///
/// Failures are logged before returning.
async fn run() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        service,
        server,
        payment,
        log,
    } = Config::new(&config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let db = Postgres::new(&postgres.into()).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;
    let applied = db
        .migrate(&migrations::runner())
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?
        .applied_migrations()
        .len();
    log::info!("applied {applied} database migrations");

    let service_config = service.try_into().map_err(|e| {
        log::error!("invalid `Service` configuration: {e}");
    })?;
    let (service, background) = Service::new(
        service_config,
        db,
        payment::Sandbox::new(payment.into()),
        notification::Log,
    );

    let app = router(service, &server.cors).map_err(|e| {
        log::error!("failed to build HTTP router: {e}");
    })?;

    let addr = (server.host.as_str(), server.port);
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        log::error!("failed to listen on `{}:{}`: {e}", addr.0, addr.1);
    })?;
    log::info!("listening on `{}:{}`", addr.0, addr.1);

    future::try_join(
        axum::serve(listener, app)
            .into_future()
            .map_err(|e| log::error!("HTTP server failed: {e}")),
        background.into_future().map_err(|e| log::error!("{e}")),
    )
    .await
    .map(drop)
}
