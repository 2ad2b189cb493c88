use crate::models::types::Side;
use serde::Serialize;
use std::time::Instant;

/// Clock for one game. Remaining time is always derived on demand from the
/// stored budgets and the reference instant; ticks never accumulate into it,
/// so reading the clock at any frequency introduces no drift.
#[derive(Debug, Clone)]
pub struct ClockState {
    remaining_white_ms: u64,
    remaining_black_ms: u64,
    /// Side whose clock is running. `None` before the first move and after
    /// the game ends.
    active: Option<Side>,
    /// Instant the stored budgets were last settled.
    reference: Instant,
    started: bool,
}

/// Point-in-time view of both clocks, as sent to clients.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub white_ms: u64,
    pub black_ms: u64,
    pub active: Option<Side>,
}

impl ClockState {
    pub fn new(initial_ms: u64, now: Instant) -> ClockState {
        ClockState {
            remaining_white_ms: initial_ms,
            remaining_black_ms: initial_ms,
            active: None,
            reference: now,
            started: false,
        }
    }

    pub fn active(&self) -> Option<Side> {
        self.active
    }

    pub fn is_running(&self) -> bool {
        self.started && self.active.is_some()
    }

    /// Derived remaining time for both sides at `now`. Only the active
    /// side's budget shrinks with elapsed wall time.
    pub fn current_remaining(&self, now: Instant) -> (u64, u64) {
        let active = match self.active {
            Some(active) if self.started => active,
            _ => return (self.remaining_white_ms, self.remaining_black_ms),
        };
        let elapsed_ms = now.saturating_duration_since(self.reference).as_millis() as u64;
        match active {
            Side::White => (
                self.remaining_white_ms.saturating_sub(elapsed_ms),
                self.remaining_black_ms,
            ),
            Side::Black => (
                self.remaining_white_ms,
                self.remaining_black_ms.saturating_sub(elapsed_ms),
            ),
        }
    }

    pub fn snapshot(&self, now: Instant) -> ClockSnapshot {
        let (white_ms, black_ms) = self.current_remaining(now);
        ClockSnapshot {
            white_ms,
            black_ms,
            active: self.active,
        }
    }

    /// The first move of a game costs its mover nothing. It starts the
    /// opponent's clock; the mover's budget is left untouched.
    pub fn on_first_move(&mut self, mover: Side, now: Instant) {
        self.started = true;
        self.active = Some(mover.opponent());
        self.reference = now;
    }

    /// Settle the mover's budget (charge thinking time, credit the
    /// increment) and hand the running clock to the opponent.
    pub fn on_subsequent_move(&mut self, mover: Side, now: Instant, increment_ms: u64) {
        let elapsed_ms = now.saturating_duration_since(self.reference).as_millis() as u64;
        let budget = match mover {
            Side::White => &mut self.remaining_white_ms,
            Side::Black => &mut self.remaining_black_ms,
        };
        *budget = budget.saturating_sub(elapsed_ms) + increment_ms;
        self.active = Some(mover.opponent());
        self.reference = now;
    }

    /// Freeze both budgets at their derived values and stop the clock.
    pub fn stop(&mut self, now: Instant) {
        let (white_ms, black_ms) = self.current_remaining(now);
        self.remaining_white_ms = white_ms;
        self.remaining_black_ms = black_ms;
        self.active = None;
        self.reference = now;
    }

    /// Which side, if any, has run out of time as of `now`.
    pub fn flagged(&self, now: Instant) -> Option<Side> {
        let active = self.active?;
        if !self.started {
            return None;
        }
        let (white_ms, black_ms) = self.current_remaining(now);
        let remaining = match active {
            Side::White => white_ms,
            Side::Black => black_ms,
        };
        if remaining == 0 {
            Some(active)
        } else {
            None
        }
    }
}
