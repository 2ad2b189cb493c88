use crate::game::rules::MoveFacts;
use chess::Piece;

/// One-line prose account of a move, broadcast alongside the raw notation
/// so clients can show it without re-deriving anything.
pub fn describe_move(facts: &MoveFacts) -> String {
    let mut text = format!("{} plays {}", facts.mover, facts.uci);
    if let Some(victim) = facts.captured {
        text.push_str(&format!(", capturing a {}", piece_name(victim)));
    }
    if let Some(promoted) = facts.promotion {
        text.push_str(&format!(", promoting to a {}", piece_name(promoted)));
    }
    if facts.gives_check {
        text.push_str(", giving check");
    }
    text
}

pub fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    }
}
