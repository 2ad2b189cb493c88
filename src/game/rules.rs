use crate::models::errors::ProtocolError;
use crate::models::types::{EndReason, GameOutcome, Side};
use chess::{Board, BoardStatus, ChessMove, Color, Game, MoveGen, Piece, Square};
use std::collections::HashMap;
use std::str::FromStr;

/// Board state for one game plus the bookkeeping the move generator does not
/// carry itself: the halfmove clock and how often each position has occurred.
pub struct Position {
    game: Game,
    halfmove_clock: u32,
    repetitions: HashMap<u64, u8>,
}

/// What a just-applied move did, recorded before and after application.
#[derive(Debug, Clone)]
pub struct MoveFacts {
    pub mover: Side,
    pub uci: String,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    pub gives_check: bool,
}

impl MoveFacts {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

impl Position {
    pub fn initial() -> Position {
        let game = Game::new();
        let mut repetitions = HashMap::new();
        repetitions.insert(game.current_position().get_hash(), 1);
        Position {
            game,
            halfmove_clock: 0,
            repetitions,
        }
    }

    /// Start from an arbitrary position. The halfmove clock restarts at
    /// zero because the board does not retain the FEN's counter.
    pub fn from_fen(fen: &str) -> Result<Position, chess::Error> {
        let board = Board::from_str(fen)?;
        let mut repetitions = HashMap::new();
        repetitions.insert(board.get_hash(), 1);
        Ok(Position {
            game: Game::new_with_board(board),
            halfmove_clock: 0,
            repetitions,
        })
    }

    pub fn side_to_move(&self) -> Side {
        self.game.side_to_move().into()
    }

    pub fn fen(&self) -> String {
        self.game.current_position().to_string()
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Validate and apply one move given in coordinate notation such as
    /// "e2e4" or "e7e8q". Promotions must name the piece explicitly. On
    /// success the position advances and the move's facts are returned; on
    /// failure the position is untouched.
    pub fn apply(&mut self, mv: &str) -> Result<MoveFacts, ProtocolError> {
        let uci = mv.trim().to_ascii_lowercase();
        let candidate = ChessMove::from_str(&uci).map_err(|_| illegal(&uci))?;

        let board = self.game.current_position();
        if !MoveGen::new_legal(&board).any(|legal| legal == candidate) {
            return Err(illegal(&uci));
        }

        let mover = self.side_to_move();
        let piece = match board.piece_on(candidate.get_source()) {
            Some(piece) => piece,
            None => return Err(illegal(&uci)),
        };
        // A pawn leaving its file always captures; en passant leaves the
        // destination square empty but still takes a pawn.
        let mut captured = board.piece_on(candidate.get_dest());
        if captured.is_none()
            && piece == Piece::Pawn
            && candidate.get_source().get_file() != candidate.get_dest().get_file()
        {
            captured = Some(Piece::Pawn);
        }

        if !self.game.make_move(candidate) {
            return Err(illegal(&uci));
        }

        if piece == Piece::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
            // An irreversible move means no earlier position can recur.
            self.repetitions.clear();
        } else {
            self.halfmove_clock += 1;
        }
        let after = self.game.current_position();
        *self.repetitions.entry(after.get_hash()).or_insert(0) += 1;

        Ok(MoveFacts {
            mover,
            uci,
            piece,
            captured,
            promotion: candidate.get_promotion(),
            gives_check: after.checkers().popcnt() > 0,
        })
    }

    /// Whether the position itself has ended the game, and how. Timeout,
    /// resignation and agreement are decided above this layer.
    pub fn terminal(&self) -> Option<GameOutcome> {
        let board = self.game.current_position();
        match board.status() {
            BoardStatus::Checkmate => Some(GameOutcome::win(
                EndReason::Checkmate,
                self.side_to_move().opponent(),
            )),
            BoardStatus::Stalemate => Some(GameOutcome::draw(EndReason::Stalemate)),
            BoardStatus::Ongoing => {
                let occurrences = self
                    .repetitions
                    .get(&board.get_hash())
                    .copied()
                    .unwrap_or(0);
                if occurrences >= 3 {
                    Some(GameOutcome::draw(EndReason::Repetition))
                } else if self.halfmove_clock >= 100 {
                    Some(GameOutcome::draw(EndReason::FiftyMoveRule))
                } else if insufficient_material(&board) {
                    Some(GameOutcome::draw(EndReason::InsufficientMaterial))
                } else {
                    None
                }
            }
        }
    }

    #[cfg(test)]
    fn force_halfmove_clock(&mut self, clock: u32) {
        self.halfmove_clock = clock;
    }
}

/// Neither side can possibly deliver mate: bare kings, a lone minor piece,
/// or one bishop each with both bishops on the same square shade.
fn insufficient_material(board: &Board) -> bool {
    let heavy =
        *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }
    let knights = *board.pieces(Piece::Knight);
    let bishops = *board.pieces(Piece::Bishop);
    match (knights.popcnt(), bishops.popcnt()) {
        (0, 0) | (1, 0) | (0, 1) => true,
        (0, 2) => {
            let white = (bishops & *board.color_combined(Color::White)).popcnt();
            let black = (bishops & *board.color_combined(Color::Black)).popcnt();
            if white != 1 || black != 1 {
                return false;
            }
            let mut shades = bishops.map(square_shade);
            match shades.next() {
                Some(first) => shades.all(|shade| shade == first),
                None => false,
            }
        }
        _ => false,
    }
}

fn square_shade(square: Square) -> usize {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2
}

fn illegal(mv: &str) -> ProtocolError {
    ProtocolError::IllegalMove { mv: mv.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(position: &mut Position, moves: &[&str]) {
        for mv in moves {
            position.apply(mv).unwrap();
        }
    }

    #[test]
    fn opening_move_applies_and_reports_facts() {
        let mut position = Position::initial();
        let facts = position.apply("e2e4").unwrap();
        assert_eq!(facts.mover, Side::White);
        assert_eq!(facts.piece, Piece::Pawn);
        assert!(!facts.is_capture());
        assert!(!facts.gives_check);
        assert_eq!(position.side_to_move(), Side::Black);
        assert!(position.fen().contains(" b "));
    }

    #[test]
    fn rejects_garbage_and_illegal_moves_without_side_effects() {
        let mut position = Position::initial();
        assert!(matches!(
            position.apply("banana"),
            Err(ProtocolError::IllegalMove { .. })
        ));
        assert!(matches!(
            position.apply("e2e5"),
            Err(ProtocolError::IllegalMove { .. })
        ));
        // Moving for the wrong side is just another illegal move here.
        assert!(matches!(
            position.apply("e7e5"),
            Err(ProtocolError::IllegalMove { .. })
        ));
        assert_eq!(position.side_to_move(), Side::White);
        assert_eq!(position.halfmove_clock(), 0);
    }

    #[test]
    fn input_is_case_and_whitespace_tolerant() {
        let mut position = Position::initial();
        let facts = position.apply(" E2E4 ").unwrap();
        assert_eq!(facts.uci, "e2e4");
    }

    #[test]
    fn captures_are_detected() {
        let mut position = Position::initial();
        play(&mut position, &["e2e4", "d7d5"]);
        let facts = position.apply("e4d5").unwrap();
        assert_eq!(facts.captured, Some(Piece::Pawn));
    }

    #[test]
    fn en_passant_counts_as_capture() {
        let mut position = Position::initial();
        play(&mut position, &["e2e4", "a7a6", "e4e5", "d7d5"]);
        let facts = position.apply("e5d6").unwrap();
        assert_eq!(facts.captured, Some(Piece::Pawn));
    }

    #[test]
    fn promotion_requires_explicit_piece() {
        let mut position = Position::from_fen("8/P7/8/8/8/8/7k/K7 w - - 0 1").unwrap();
        assert!(position.apply("a7a8").is_err());
        let facts = position.apply("a7a8q").unwrap();
        assert_eq!(facts.promotion, Some(Piece::Queen));
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let mut position = Position::initial();
        play(&mut position, &["f2f3", "e7e5", "g2g4"]);
        let facts = position.apply("d8h4").unwrap();
        assert!(facts.gives_check);
        let outcome = position.terminal().unwrap();
        assert_eq!(outcome.reason, EndReason::Checkmate);
        assert_eq!(outcome.winner, Some(Side::Black));
    }

    #[test]
    fn stalemate_is_a_draw() {
        let position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let outcome = position.terminal().unwrap();
        assert_eq!(outcome.reason, EndReason::Stalemate);
        assert_eq!(outcome.winner, None);
    }

    #[test]
    fn threefold_repetition_ends_the_game() {
        let mut position = Position::initial();
        play(&mut position, &["g1f3", "g8f6", "f3g1", "f6g8"]);
        assert!(position.terminal().is_none());
        play(&mut position, &["g1f3", "g8f6", "f3g1"]);
        position.apply("f6g8").unwrap();
        let outcome = position.terminal().unwrap();
        assert_eq!(outcome.reason, EndReason::Repetition);
    }

    #[test]
    fn pawn_moves_and_captures_reset_the_halfmove_clock() {
        let mut position = Position::initial();
        play(&mut position, &["g1f3", "g8f6"]);
        assert_eq!(position.halfmove_clock(), 2);
        position.apply("e2e4").unwrap();
        assert_eq!(position.halfmove_clock(), 0);
    }

    #[test]
    fn hundred_quiet_halfmoves_end_the_game() {
        let mut position = Position::from_fen("8/8/8/3k4/8/3K4/8/R7 w - - 0 1").unwrap();
        position.force_halfmove_clock(99);
        position.apply("a1a2").unwrap();
        let outcome = position.terminal().unwrap();
        assert_eq!(outcome.reason, EndReason::FiftyMoveRule);
    }

    #[test]
    fn bare_kings_and_lone_minors_are_dead_draws() {
        for fen in [
            "8/8/4k3/8/8/3K4/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KB3/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KN3/8/8 w - - 0 1",
        ] {
            let position = Position::from_fen(fen).unwrap();
            let outcome = position.terminal().unwrap();
            assert_eq!(outcome.reason, EndReason::InsufficientMaterial, "{fen}");
        }
    }

    #[test]
    fn same_shade_opposing_bishops_are_a_dead_draw() {
        let position = Position::from_fen("8/8/3bk3/8/8/3KB3/8/8 w - - 0 1").unwrap();
        let outcome = position.terminal().unwrap();
        assert_eq!(outcome.reason, EndReason::InsufficientMaterial);
    }

    #[test]
    fn live_material_is_not_a_dead_draw() {
        for fen in [
            // Opposite-shade bishops.
            "8/8/3bk3/8/8/3K4/4B3/8 w - - 0 1",
            // Knight each.
            "8/8/3nk3/8/8/3KN3/8/8 w - - 0 1",
            // Both bishops on one side.
            "8/8/4k3/8/8/2BKB3/8/8 w - - 0 1",
            // A rook on the board.
            "8/8/4k3/8/8/3K4/8/R7 w - - 0 1",
            // A pawn on the board.
            "8/8/4k3/8/8/3K4/4P3/8 w - - 0 1",
        ] {
            let position = Position::from_fen(fen).unwrap();
            assert!(position.terminal().is_none(), "{fen}");
        }
    }
}
