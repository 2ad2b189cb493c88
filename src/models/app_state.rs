use crate::registry::RoomRegistry;
use actix::Addr;

/// Application state shared between connections.
pub struct AppState {
    pub registry: Addr<RoomRegistry>,
}
