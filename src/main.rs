use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::anyhow;
use sqlx::postgres::PgPoolOptions;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use audita::broadcast::{EventPublisher, WebhookPublisher};
use audita::config::AppConfig;
use audita::llm::{CompletionClient, OpenAiCompletionClient};
use audita::middleware::auth::Authentication;
use audita::scheduler::run_analysis_tick;
use audita::{routes, AppState};

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::new()?;
    let app_config = Arc::new(config.clone());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let llm: Arc<dyn CompletionClient> =
        Arc::new(OpenAiCompletionClient::new(&config));
    let publisher: Arc<dyn EventPublisher> = Arc::new(WebhookPublisher::new(
        config.push_endpoint.clone(),
        config.push_secret.clone(),
    ));
    let app_state = Arc::new(AppState::new(pool, llm, publisher));

    if config.analysis_interval_secs > 0 {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("scheduler init failed: {}", e))?;
        let state = app_state.clone();
        let job = Job::new_repeated_async(
            Duration::from_secs(config.analysis_interval_secs),
            move |_uuid, _lock| {
                let state = state.clone();
                Box::pin(async move {
                    if let Err(e) = run_analysis_tick(&state.selector, &state.analysis).await {
                        error!("analysis tick failed: {:?}", e);
                    }
                })
            },
        )
        .map_err(|e| anyhow!("failed to build analysis job: {}", e))?;
        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("failed to schedule analysis job: {}", e))?;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("failed to start scheduler: {}", e))?;
        info!(
            "pending-analysis tick scheduled every {}s",
            config.analysis_interval_secs
        );
    }

    info!("starting server on 0.0.0.0:8080");
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(Cors::permissive())
            .service(
                web::scope("/v1")
                    .wrap(Authentication {
                        app_config: app_config.clone(),
                    })
                    .service(routes::chat::create_chat)
                    .service(routes::chat::get_messages)
                    .service(routes::chat::send_message)
                    .service(routes::chat::finish_chat)
                    .service(routes::analysis::analyze_chat)
                    .service(routes::analysis::analyze_next)
                    .service(routes::audit::synthesize_report)
                    .service(routes::audit::get_report),
            )
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await?;

    Ok(())
}
