use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two player colors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "white"),
            Side::Black => write!(f, "black"),
        }
    }
}

impl From<chess::Color> for Side {
    fn from(color: chess::Color) -> Side {
        match color {
            chess::Color::White => Side::White,
            chess::Color::Black => Side::Black,
        }
    }
}

impl From<Side> for chess::Color {
    fn from(side: Side) -> chess::Color {
        match side {
            Side::White => chess::Color::White,
            Side::Black => chess::Color::Black,
        }
    }
}

/// Role a connection holds inside a room.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    White,
    Black,
    Spectator,
}

impl Seat {
    pub fn side(self) -> Option<Side> {
        match self {
            Seat::White => Some(Side::White),
            Seat::Black => Some(Side::Black),
            Seat::Spectator => None,
        }
    }
}

/// Why a game ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Repetition,
    FiftyMoveRule,
    InsufficientMaterial,
    Timeout,
    Resignation,
    Agreement,
}

/// Terminal result of a game. `winner` is `None` for draws.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub reason: EndReason,
    pub winner: Option<Side>,
}

impl GameOutcome {
    pub fn win(reason: EndReason, winner: Side) -> GameOutcome {
        GameOutcome {
            reason,
            winner: Some(winner),
        }
    }

    pub fn draw(reason: EndReason) -> GameOutcome {
        GameOutcome {
            reason,
            winner: None,
        }
    }
}

/// Named time control preset selected at room creation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeControlKind {
    Bullet,
    Blitz,
    Rapid,
    Unlimited,
}

/// Budget and increment for one room, fixed for the room's lifetime.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeControl {
    pub kind: TimeControlKind,
    pub initial_ms: u64,
    pub increment_ms: u64,
}

impl TimeControl {
    pub const BULLET: TimeControl = TimeControl {
        kind: TimeControlKind::Bullet,
        initial_ms: 60_000,
        increment_ms: 0,
    };

    pub const BLITZ: TimeControl = TimeControl {
        kind: TimeControlKind::Blitz,
        initial_ms: 180_000,
        increment_ms: 2_000,
    };

    pub const RAPID: TimeControl = TimeControl {
        kind: TimeControlKind::Rapid,
        initial_ms: 600_000,
        increment_ms: 0,
    };

    pub const UNLIMITED: TimeControl = TimeControl {
        kind: TimeControlKind::Unlimited,
        initial_ms: 0,
        increment_ms: 0,
    };

    pub fn preset(kind: TimeControlKind) -> TimeControl {
        match kind {
            TimeControlKind::Bullet => TimeControl::BULLET,
            TimeControlKind::Blitz => TimeControl::BLITZ,
            TimeControlKind::Rapid => TimeControl::RAPID,
            TimeControlKind::Unlimited => TimeControl::UNLIMITED,
        }
    }

    /// Unlimited rooms carry no clock at all.
    pub fn has_clock(&self) -> bool {
        self.kind != TimeControlKind::Unlimited
    }
}
