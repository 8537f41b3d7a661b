use std::{process, sync::Arc};

use axum::http::header::AUTHORIZATION;
use blogfront::{
    application::{
        blog::BlogService,
        error::AppError,
        repos::ContentStore,
        revalidate::{RevalidationMode, RevalidationService},
    },
    cache::{CacheConfig, CachedContentStore},
    config::{self, ContentSettings, RevalidateArgs},
    infra::{
        error::InfraError,
        fixture::FixtureStore,
        http::{self, HttpState},
        sanity::SanityStore,
        telemetry,
    },
};
use serde_json::{Value, json};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const REVALIDATE_PATH: &str = "/api/revalidate";

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Revalidate(args) => run_revalidate(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backend: Arc<dyn ContentStore> = match &settings.content {
        ContentSettings::Sanity(sanity) => {
            info!(
                target = "main",
                project_id = %sanity.project_id,
                dataset = %sanity.dataset,
                use_cdn = sanity.use_cdn,
                "Using hosted content store"
            );
            Arc::new(SanityStore::new(sanity)?)
        }
        ContentSettings::Fixture { path } => Arc::new(FixtureStore::load(path).await?),
    };

    let cache = Arc::new(CachedContentStore::new(
        backend,
        &CacheConfig::from(&settings.cache),
    ));

    let blog = BlogService::new(
        cache.clone(),
        settings.site.category_ordering.clone(),
        settings.site.timezone,
    );

    let mode = if settings.revalidate.enabled {
        if settings.revalidate.secret.is_none() {
            warn!(
                target = "main",
                "Revalidation is enabled without a secret; webhook calls will be rejected"
            );
        }
        RevalidationMode::Active {
            secret: settings.revalidate.secret.clone(),
        }
    } else {
        RevalidationMode::Disabled
    };
    let revalidation = RevalidationService::new(mode, cache);

    let state = HttpState {
        blog: Arc::new(blog),
        revalidation: Arc::new(revalidation),
    };

    serve_http(&settings, state).await
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "main", addr = %settings.server.addr, "Listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "main", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "main", error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_revalidate(settings: config::Settings, args: RevalidateArgs) -> Result<(), AppError> {
    let secret = settings.revalidate.secret.ok_or_else(|| {
        AppError::validation(
            "a revalidation secret is required (use --revalidate-secret or SANITY_REVALIDATE_SECRET)",
        )
    })?;

    let url = args
        .url
        .join(REVALIDATE_PATH)
        .map_err(|err| AppError::validation(format!("invalid service URL: {err}")))?;
    let payload = match args.slug.as_deref() {
        Some(slug) => json!({ "slug": slug }),
        None => json!({}),
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("blogfront/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| AppError::unexpected(format!("failed to build client: {err}")))?;
    let response = client
        .post(url.clone())
        .header(AUTHORIZATION, format!("Bearer {secret}"))
        .json(&payload)
        .send()
        .await
        .map_err(|err| AppError::unexpected(format!("revalidation request failed: {err}")))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| AppError::unexpected(format!("unreadable revalidation response: {err}")))?;

    if !status.is_success() {
        return Err(AppError::unexpected(format!(
            "revalidation rejected with status {status}: {body}"
        )));
    }

    info!(target = "main", url = %url, response = %body, "Revalidation accepted");
    println!("{body}");
    Ok(())
}
