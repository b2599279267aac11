use actix_web::{middleware, web, App, HttpServer};
use swipebot::config::Settings;
use swipebot::routes::{self, MockState};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => {
            swipebot::logging::init(&settings.logging);
            settings
        }
        Err(e) => {
            let settings = Settings::default();
            swipebot::logging::init(&settings.logging);
            error!("Failed to load configuration, using defaults: {}", e);
            settings
        }
    };

    let state = MockState {
        match_rate: settings.mock.match_rate,
    };
    let host = settings.mock.host.clone();
    let port = settings.mock.port;

    info!(
        "Mock server listening on {}:{} (endpoints: /candidates, /swipe, /healthz)",
        host, port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::mock::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
