use anyhow::Result;
use hostmetrics::*;
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let app_config = config::AppConfig::load()?;

    let repo = Arc::new(
        metrics_repo::MetricsRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;

    let worker_config = app_config.rollup_worker_config();
    if let Err(e) = rollup_worker::run_one_tick(&repo, &worker_config, chrono::Utc::now()).await {
        tracing::warn!(error = %e, "startup rollup pass failed");
    }
    let worker_handle = rollup_worker::spawn(repo.clone(), worker_config);

    let repo_reader = reader::RepoReader::new(repo.clone(), app_config.reader_config());
    let reader: Arc<dyn reader::MetricsReader> = if app_config.cache.enabled {
        let backend = Arc::new(cache::MemoryCache::new(app_config.cache.max_entries));
        Arc::new(cache::CachedReader::new(
            repo_reader,
            backend,
            Duration::from_secs(app_config.cache.ttl_secs),
        ))
    } else {
        Arc::new(repo_reader)
    };
    let writer = Arc::new(ingest::IngestWriter::new(repo.clone()));

    let app = routes::app(reader, writer);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            worker_handle.abort();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
