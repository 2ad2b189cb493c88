use actix_web::{web, HttpResponse, Responder};

/// Liveness probe.
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("chess rooms server")
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/").route(web::get().to(index)));
}
