//! Coordinator for live two-player chess sessions over WebSockets: rooms
//! with join codes, first-come seat assignment, drift-free chess clocks,
//! a serialized move pipeline, and draw/rematch negotiation.

pub mod config;
pub mod game;
pub mod models;
pub mod registry;
pub mod routes;
pub mod websocket;
