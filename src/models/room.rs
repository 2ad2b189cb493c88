use crate::game::explain;
use crate::game::rules::{MoveFacts, Position};
use crate::models::clock::{ClockSnapshot, ClockState};
use crate::models::errors::ProtocolError;
use crate::models::types::{EndReason, GameOutcome, Seat, Side, TimeControl};
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

/// Seat occupancy for one room: exactly one connection per player seat,
/// any number of spectators.
#[derive(Debug, Default)]
pub struct Seats {
    white: Option<Uuid>,
    black: Option<Uuid>,
    spectators: HashSet<Uuid>,
}

/// Occupancy summary broadcast on every seat change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatOccupancy {
    pub white: bool,
    pub black: bool,
    pub spectators: usize,
}

impl Seats {
    /// First come first served: white, then black, then spectator. A
    /// connection that already holds a seat keeps it.
    pub fn assign(&mut self, conn: Uuid) -> Seat {
        if let Some(seat) = self.seat_of(conn) {
            return seat;
        }
        if self.white.is_none() {
            self.white = Some(conn);
            Seat::White
        } else if self.black.is_none() {
            self.black = Some(conn);
            Seat::Black
        } else {
            self.spectators.insert(conn);
            Seat::Spectator
        }
    }

    /// Vacate whatever seat the connection held. A vacated player seat is
    /// open to the next joiner.
    pub fn release(&mut self, conn: Uuid) -> Option<Seat> {
        if self.white == Some(conn) {
            self.white = None;
            Some(Seat::White)
        } else if self.black == Some(conn) {
            self.black = None;
            Some(Seat::Black)
        } else if self.spectators.remove(&conn) {
            Some(Seat::Spectator)
        } else {
            None
        }
    }

    pub fn seat_of(&self, conn: Uuid) -> Option<Seat> {
        if self.white == Some(conn) {
            Some(Seat::White)
        } else if self.black == Some(conn) {
            Some(Seat::Black)
        } else if self.spectators.contains(&conn) {
            Some(Seat::Spectator)
        } else {
            None
        }
    }

    pub fn side_of(&self, conn: Uuid) -> Option<Side> {
        self.seat_of(conn).and_then(Seat::side)
    }

    pub fn occupant(&self, side: Side) -> Option<Uuid> {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn swap_players(&mut self) {
        std::mem::swap(&mut self.white, &mut self.black);
    }

    pub fn is_empty(&self) -> bool {
        self.white.is_none() && self.black.is_none() && self.spectators.is_empty()
    }

    pub fn occupancy(&self) -> SeatOccupancy {
        SeatOccupancy {
            white: self.white.is_some(),
            black: self.black.is_some(),
            spectators: self.spectators.len(),
        }
    }
}

/// At most one outstanding offer of a kind. Owned by the side that placed
/// it; only the opponent may respond.
#[derive(Debug, Default)]
pub struct OfferSlot(Option<Side>);

impl OfferSlot {
    pub fn place(&mut self, side: Side) -> Result<(), ProtocolError> {
        if self.0.is_some() {
            return Err(ProtocolError::DuplicateOffer);
        }
        self.0 = Some(side);
        Ok(())
    }

    /// Accept or decline on behalf of `responder`. Returns the offering
    /// side and clears the slot. Responding to your own offer, or to no
    /// offer, fails.
    pub fn respond(&mut self, responder: Side) -> Result<Side, ProtocolError> {
        match self.0 {
            Some(offerer) if offerer == responder.opponent() => {
                self.0 = None;
                Ok(offerer)
            }
            _ => Err(ProtocolError::NoSuchOffer),
        }
    }

    /// Silently drop the offer if `side` owns it, as on disconnect.
    pub fn withdraw_for(&mut self, side: Side) {
        if self.0 == Some(side) {
            self.0 = None;
        }
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn pending(&self) -> Option<Side> {
        self.0
    }
}

/// An accepted move and everything the room should tell its audience
/// about it.
#[derive(Debug)]
pub struct AppliedMove {
    pub facts: MoveFacts,
    pub explanation: String,
    pub fen: String,
    /// `None` in unlimited rooms.
    pub clock: Option<ClockSnapshot>,
    pub game_over: Option<GameOutcome>,
}

/// A flag fall resolved by the room, whether noticed by a tick or by an
/// incoming move.
#[derive(Debug, Clone, Copy)]
pub struct Forfeit {
    pub flagged: Side,
    pub outcome: GameOutcome,
    pub clock: ClockSnapshot,
}

#[derive(Debug)]
pub enum MoveOutcome {
    Applied(AppliedMove),
    TimeForfeit(Forfeit),
}

#[derive(Debug)]
pub enum TickOutcome {
    Idle,
    Running(ClockSnapshot),
    TimeForfeit(Forfeit),
}

/// All state for one room. Methods are synchronous and take `now`
/// explicitly; the owning actor serializes access and supplies wall time.
pub struct Room {
    code: String,
    time_control: TimeControl,
    seats: Seats,
    clock: ClockState,
    pending_draw: OfferSlot,
    pending_rematch: OfferSlot,
    position: Position,
    game_over: Option<GameOutcome>,
    moves_played: u32,
}

impl Room {
    pub fn new(code: String, time_control: TimeControl, now: Instant) -> Room {
        Room {
            code,
            time_control,
            seats: Seats::default(),
            clock: ClockState::new(time_control.initial_ms, now),
            pending_draw: OfferSlot::default(),
            pending_rematch: OfferSlot::default(),
            position: Position::initial(),
            game_over: None,
            moves_played: 0,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn time_control(&self) -> TimeControl {
        self.time_control
    }

    pub fn fen(&self) -> String {
        self.position.fen()
    }

    pub fn game_over(&self) -> Option<GameOutcome> {
        self.game_over
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn occupancy(&self) -> SeatOccupancy {
        self.seats.occupancy()
    }

    pub fn seat_of(&self, conn: Uuid) -> Option<Seat> {
        self.seats.seat_of(conn)
    }

    pub fn occupant(&self, side: Side) -> Option<Uuid> {
        self.seats.occupant(side)
    }

    /// `None` in unlimited rooms, which carry no clock at all.
    pub fn clock_snapshot(&self, now: Instant) -> Option<ClockSnapshot> {
        if self.time_control.has_clock() {
            Some(self.clock.snapshot(now))
        } else {
            None
        }
    }

    pub fn clock_running(&self) -> bool {
        self.time_control.has_clock() && self.clock.is_running()
    }

    pub fn join(&mut self, conn: Uuid) -> Seat {
        self.seats.assign(conn)
    }

    /// Remove the connection; offers owned by a departing player are
    /// silently dropped. The game itself continues.
    pub fn leave(&mut self, conn: Uuid) -> Option<Seat> {
        let seat = self.seats.release(conn)?;
        if let Some(side) = seat.side() {
            self.pending_draw.withdraw_for(side);
            self.pending_rematch.withdraw_for(side);
        }
        Some(seat)
    }

    /// The serialized move pipeline: terminal gate, identity, turn,
    /// liveness, then legality. A flag fall discovered here resolves as a
    /// time forfeit and the move is never applied.
    pub fn make_move(
        &mut self,
        conn: Uuid,
        mv: &str,
        now: Instant,
    ) -> Result<MoveOutcome, ProtocolError> {
        self.require_live()?;
        let side = self.player_side(conn)?;
        let expected = self.position.side_to_move();
        if side != expected {
            return Err(ProtocolError::NotYourTurn { expected });
        }
        if self.time_control.has_clock() {
            if let Some(flagged) = self.clock.flagged(now) {
                return Ok(MoveOutcome::TimeForfeit(self.forfeit(flagged, now)));
            }
        }

        let facts = self.position.apply(mv)?;
        self.moves_played += 1;
        if self.time_control.has_clock() {
            if self.moves_played == 1 {
                self.clock.on_first_move(facts.mover, now);
            } else {
                self.clock
                    .on_subsequent_move(facts.mover, now, self.time_control.increment_ms);
            }
        }
        let game_over = self.position.terminal();
        if let Some(outcome) = game_over {
            self.end_game(outcome, now);
        }
        Ok(MoveOutcome::Applied(AppliedMove {
            explanation: explain::describe_move(&facts),
            fen: self.position.fen(),
            clock: self.clock_snapshot(now),
            game_over,
            facts,
        }))
    }

    /// Periodic clock inspection. Advisory broadcasts while running; the
    /// authoritative forfeit when the active side's budget is exhausted.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.time_control.has_clock() || self.game_over.is_some() || !self.clock.is_running() {
            return TickOutcome::Idle;
        }
        if let Some(flagged) = self.clock.flagged(now) {
            return TickOutcome::TimeForfeit(self.forfeit(flagged, now));
        }
        TickOutcome::Running(self.clock.snapshot(now))
    }

    pub fn offer_draw(&mut self, conn: Uuid) -> Result<Side, ProtocolError> {
        self.require_live()?;
        let side = self.player_side(conn)?;
        self.pending_draw.place(side)?;
        Ok(side)
    }

    pub fn accept_draw(&mut self, conn: Uuid, now: Instant) -> Result<GameOutcome, ProtocolError> {
        self.require_live()?;
        let side = self.player_side(conn)?;
        self.pending_draw.respond(side)?;
        let outcome = GameOutcome::draw(EndReason::Agreement);
        self.end_game(outcome, now);
        Ok(outcome)
    }

    pub fn decline_draw(&mut self, conn: Uuid) -> Result<Side, ProtocolError> {
        self.require_live()?;
        let side = self.player_side(conn)?;
        self.pending_draw.respond(side)?;
        Ok(side)
    }

    pub fn resign(&mut self, conn: Uuid, now: Instant) -> Result<GameOutcome, ProtocolError> {
        self.require_live()?;
        let side = self.player_side(conn)?;
        let outcome = GameOutcome::win(EndReason::Resignation, side.opponent());
        self.end_game(outcome, now);
        Ok(outcome)
    }

    pub fn request_rematch(&mut self, conn: Uuid) -> Result<Side, ProtocolError> {
        self.require_over()?;
        let side = self.player_side(conn)?;
        self.pending_rematch.place(side)?;
        Ok(side)
    }

    /// Accepting a rematch swaps the player seats and starts a fresh game
    /// under the room's fixed time control.
    pub fn accept_rematch(&mut self, conn: Uuid, now: Instant) -> Result<(), ProtocolError> {
        self.require_over()?;
        let side = self.player_side(conn)?;
        self.pending_rematch.respond(side)?;
        self.seats.swap_players();
        self.fresh_game(now);
        Ok(())
    }

    pub fn decline_rematch(&mut self, conn: Uuid) -> Result<Side, ProtocolError> {
        self.require_over()?;
        let side = self.player_side(conn)?;
        self.pending_rematch.respond(side)?;
        Ok(side)
    }

    /// Players may restart the room's game at any point. Seats keep their
    /// occupants.
    pub fn reset(&mut self, conn: Uuid, now: Instant) -> Result<Side, ProtocolError> {
        let side = self.player_side(conn)?;
        self.fresh_game(now);
        Ok(side)
    }

    pub fn pending_draw(&self) -> Option<Side> {
        self.pending_draw.pending()
    }

    pub fn pending_rematch(&self) -> Option<Side> {
        self.pending_rematch.pending()
    }

    fn player_side(&self, conn: Uuid) -> Result<Side, ProtocolError> {
        self.seats.side_of(conn).ok_or(ProtocolError::NotAPlayer)
    }

    fn require_live(&self) -> Result<(), ProtocolError> {
        if self.game_over.is_some() {
            Err(ProtocolError::GameAlreadyOver)
        } else {
            Ok(())
        }
    }

    fn require_over(&self) -> Result<(), ProtocolError> {
        if self.game_over.is_none() {
            Err(ProtocolError::GameStillActive)
        } else {
            Ok(())
        }
    }

    fn forfeit(&mut self, flagged: Side, now: Instant) -> Forfeit {
        let outcome = GameOutcome::win(EndReason::Timeout, flagged.opponent());
        self.end_game(outcome, now);
        Forfeit {
            flagged,
            outcome,
            clock: self.clock.snapshot(now),
        }
    }

    fn end_game(&mut self, outcome: GameOutcome, now: Instant) {
        self.game_over = Some(outcome);
        self.clock.stop(now);
        self.pending_draw.clear();
    }

    fn fresh_game(&mut self, now: Instant) {
        self.position = Position::initial();
        self.clock = ClockState::new(self.time_control.initial_ms, now);
        self.pending_draw.clear();
        self.pending_rematch.clear();
        self.game_over = None;
        self.moves_played = 0;
    }
}
