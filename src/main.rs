use actix::Actor;
use actix_web::{web, App, HttpServer};
use chess_rooms::config::ServerConfig;
use chess_rooms::models::app_state::AppState;
use chess_rooms::registry::RoomRegistry;
use chess_rooms::routes;
use log::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    info!("starting chess rooms server at http://{}", config.bind_addr);

    let registry = RoomRegistry::new().start();
    let app_state = web::Data::new(AppState { registry });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure_routes)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
