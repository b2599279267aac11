use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use swipebot::config::{LoggingSettings, Settings};
use swipebot::core::{log_results, shutdown, DispatchPool, Poller, RuleDecider};
use swipebot::routes;
use swipebot::services::{install_prometheus, ApiClient, MetricsSink, PrometheusMetrics, SwipeApi};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = match &settings {
        Ok(settings) => settings.logging.clone(),
        Err(_) => LoggingSettings::default(),
    };
    swipebot::logging::init(&logging);

    info!("Starting swipebot...");

    let settings = settings.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Metrics recorder + scrape endpoint
    let prometheus = install_prometheus().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let metrics_host = settings.metrics.host.clone();
    let metrics_port = settings.metrics.port;
    let metrics_server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(prometheus.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::metrics::configure)
    })
    .workers(1)
    .bind((metrics_host.as_str(), metrics_port))
    .map_err(|e| {
        error!("Failed to bind metrics endpoint {}:{}: {}", metrics_host, metrics_port, e);
        e
    })?
    .run();
    let metrics_handle = metrics_server.handle();
    actix_web::rt::spawn(metrics_server);

    info!("Metrics available on {}:{}/metrics", metrics_host, metrics_port);

    // Transport client
    let client = ApiClient::from_settings(&settings.api).map_err(|e| {
        error!("Failed to create API client: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    info!(
        "API client initialized (base: {}, auth: {})",
        client.base_url(),
        settings.api.bearer_token().is_some()
    );
    let api: Arc<dyn SwipeApi> = Arc::new(client);
    let metrics: Arc<dyn MetricsSink> = Arc::new(PrometheusMetrics);

    // Ctrl-C fires the process-wide shutdown signal
    let (trigger, signal) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        trigger.cancel();
    });

    let mut pool = DispatchPool::new(
        Arc::clone(&api),
        Arc::new(RuleDecider::default()),
        Arc::clone(&metrics),
        settings.pool.clone(),
    );
    let results = pool.results();
    pool.start(signal.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let logger = results.map(|results| tokio::spawn(log_results(results)));

    let poller = Poller::new(api, metrics, &settings.polling);
    info!(
        "Polling every {:?} in batches of {}",
        settings.polling.interval(),
        poller.batch_size()
    );
    poller.run(&pool, signal).await;

    if let Err(e) = pool.stop().await {
        error!("Failed to stop dispatch pool: {}", e);
    }
    if let Some(logger) = logger {
        match logger.await {
            Ok(count) => info!("Processed {} outcomes", count),
            Err(e) => error!("Result logger failed: {}", e),
        }
    }

    metrics_handle.stop(true).await;
    info!("Swipebot stopped");
    Ok(())
}
