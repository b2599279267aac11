use actix_web::{web, HttpResponse, Responder};
use metrics_exporter_prometheus::PrometheusHandle;

/// Configure the bot's scrape and liveness routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/metrics", web::get().to(metrics))
        .route("/healthz", web::get().to(healthz));
}

/// Prometheus text exposition
async fn metrics(handle: web::Data<PrometheusHandle>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render())
}

async fn healthz() -> impl Responder {
    HttpResponse::Ok().finish()
}
