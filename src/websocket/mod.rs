use crate::models::app_state::AppState;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

pub mod session;

pub use session::ClientSession;

/// WebSocket entry point; starts one `ClientSession` actor per connection.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    ws::start(ClientSession::new(app_state.registry.clone()), &req, stream)
}
