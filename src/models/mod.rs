pub mod app_state;
pub mod clock;
pub mod errors;
pub mod messages;
pub mod room;
pub mod types;

// Re-export important types
pub use clock::*;
pub use errors::*;
pub use messages::*;
pub use room::*;
pub use types::*;
