use crate::models::types::Side;
use thiserror::Error;

/// Everything a client request can be refused for. Each variant maps to a
/// stable machine-readable reason code plus a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("no room exists with code {code}")]
    RoomNotFound { code: String },

    #[error("only seated players may do that")]
    NotAPlayer,

    #[error("it is {expected}'s turn to move")]
    NotYourTurn { expected: Side },

    #[error("the move {mv} is not legal in this position")]
    IllegalMove { mv: String },

    #[error("an offer of that kind is already pending")]
    DuplicateOffer,

    #[error("there is no pending offer to respond to")]
    NoSuchOffer,

    #[error("the game is already over")]
    GameAlreadyOver,

    #[error("the game is still in progress")]
    GameStillActive,

    #[error("malformed request: {detail}")]
    BadRequest { detail: String },
}

impl ProtocolError {
    /// Stable reason code carried on the wire next to the display message.
    pub fn reason(&self) -> &'static str {
        match self {
            ProtocolError::RoomNotFound { .. } => "room_not_found",
            ProtocolError::NotAPlayer => "not_a_player",
            ProtocolError::NotYourTurn { .. } => "not_your_turn",
            ProtocolError::IllegalMove { .. } => "illegal_move",
            ProtocolError::DuplicateOffer => "duplicate_offer",
            ProtocolError::NoSuchOffer => "no_such_offer",
            ProtocolError::GameAlreadyOver => "game_already_over",
            ProtocolError::GameStillActive => "game_still_active",
            ProtocolError::BadRequest { .. } => "bad_request",
        }
    }
}
