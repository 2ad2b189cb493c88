use crate::models::clock::ClockSnapshot;
use crate::models::messages::{send_event, Outbound, ServerEvent};
use crate::models::room::{Forfeit, MoveOutcome, Room, TickOutcome};
use crate::models::types::{EndReason, Seat, Side, TimeControl};
use crate::registry::{Reinstate, RoomClosed, RoomRegistry};
use actix::prelude::*;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How often a running clock is re-derived and broadcast. Advisory only;
/// forfeit correctness never depends on this granularity.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Everything a room needs to reach one connection.
#[derive(Clone)]
pub struct ConnHandle {
    pub id: Uuid,
    pub out: Recipient<Outbound>,
    pub control: Recipient<RoomJoined>,
}

/// Confirmation handed to a session once it holds a seat; carries the
/// room address for routing later requests.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct RoomJoined {
    pub code: String,
    pub seat: Seat,
    pub room: Addr<RoomSession>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Join {
    pub conn: ConnHandle,
    pub newly_created: bool,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Leave {
    pub conn_id: Uuid,
}

/// Any in-room request from a seated (or spectating) connection.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RoomCommand {
    pub conn_id: Uuid,
    pub action: RoomAction,
}

#[derive(Debug, Clone)]
pub enum RoomAction {
    MakeMove(String),
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
    Resign,
    RequestRematch,
    AcceptRematch,
    DeclineRematch,
    ResetGame,
}

/// Shutdown confirmation from the registry; ignored (and the listing
/// restored) if a join arrived in the meantime.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

#[derive(Message)]
#[rtype(result = "()")]
struct ClockTick;

/// One actor per room: its mailbox serializes every join, leave, move,
/// offer and clock tick, so no transition ever interleaves with another.
pub struct RoomSession {
    room: Room,
    registry: Addr<RoomRegistry>,
    participants: HashMap<Uuid, Recipient<Outbound>>,
    tick: Option<SpawnHandle>,
}

impl RoomSession {
    pub fn new(
        code: String,
        time_control: TimeControl,
        registry: Addr<RoomRegistry>,
    ) -> RoomSession {
        RoomSession {
            room: Room::new(code, time_control, Instant::now()),
            registry,
            participants: HashMap::new(),
            tick: None,
        }
    }

    fn send_to(&self, conn_id: Uuid, event: &ServerEvent) {
        if let Some(out) = self.participants.get(&conn_id) {
            send_event(out, event);
        }
    }

    /// Serialize once, clone the text per recipient.
    fn broadcast(&self, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(text) => {
                for out in self.participants.values() {
                    out.do_send(Outbound(text.clone()));
                }
            }
            Err(err) => warn!("room {}: failed to serialize event: {}", self.room.code(), err),
        }
    }

    fn broadcast_except(&self, skip: Uuid, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(text) => {
                for (id, out) in &self.participants {
                    if *id != skip {
                        out.do_send(Outbound(text.clone()));
                    }
                }
            }
            Err(err) => warn!("room {}: failed to serialize event: {}", self.room.code(), err),
        }
    }

    fn broadcast_clock(&self, snapshot: ClockSnapshot) {
        self.broadcast(&ServerEvent::clock_update(snapshot));
    }

    fn occupancy_event(&self) -> ServerEvent {
        let occupancy = self.room.occupancy();
        ServerEvent::SeatChanged {
            white_occupied: occupancy.white,
            black_occupied: occupancy.black,
            spectators: occupancy.spectators,
        }
    }

    fn broadcast_occupancy_except(&self, skip: Uuid) {
        self.broadcast_except(skip, &self.occupancy_event());
    }

    fn ensure_tick(&mut self, ctx: &mut Context<Self>) {
        if self.tick.is_none() && self.room.clock_running() {
            self.tick = Some(ctx.run_interval(TICK_INTERVAL, |_, ctx| ctx.notify(ClockTick)));
        }
    }

    /// Idempotent; the game-over and teardown paths may both ask.
    fn stop_tick(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.tick.take() {
            ctx.cancel_future(handle);
        }
    }

    fn announce_game_over(&self, reason: EndReason, winner: Option<Side>) {
        self.broadcast(&ServerEvent::GameOver { reason, winner });
        info!("room {}: game over ({:?})", self.room.code(), reason);
    }

    fn announce_forfeit(&mut self, forfeit: Forfeit, ctx: &mut Context<Self>) {
        self.stop_tick(ctx);
        self.broadcast_clock(forfeit.clock);
        self.announce_game_over(forfeit.outcome.reason, forfeit.outcome.winner);
    }

    /// Fresh position, fresh clock: broadcast the restarted game state.
    fn announce_fresh_game(&mut self, now: Instant, ctx: &mut Context<Self>) {
        self.stop_tick(ctx);
        self.broadcast(&ServerEvent::PositionUpdate {
            fen: self.room.fen(),
        });
        if let Some(snapshot) = self.room.clock_snapshot(now) {
            self.broadcast_clock(snapshot);
        }
    }

    /// Tell each player which side they now hold, after a rematch swap.
    fn reseat_players(&self) {
        for (side, seat) in [(Side::White, Seat::White), (Side::Black, Seat::Black)] {
            if let Some(conn_id) = self.room.occupant(side) {
                self.send_to(conn_id, &ServerEvent::SeatAssigned { seat });
            }
        }
    }

    fn depart(&mut self, conn_id: Uuid, ctx: &mut Context<Self>) {
        if self.room.leave(conn_id).is_none() {
            return;
        }
        self.participants.remove(&conn_id);
        info!(
            "room {}: connection {} left",
            self.room.code(),
            conn_id
        );
        if self.room.is_empty() {
            self.stop_tick(ctx);
            self.registry.do_send(RoomClosed {
                code: self.room.code().to_string(),
                room: ctx.address(),
            });
        } else {
            self.broadcast_occupancy_except(conn_id);
        }
    }
}

impl Actor for RoomSession {
    type Context = Context<Self>;

    fn stopped(&mut self, _: &mut Context<Self>) {
        info!("room {} destroyed", self.room.code());
    }
}

impl Handler<Join> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: Join, ctx: &mut Context<Self>) {
        let Join { conn, newly_created } = msg;
        let seat = self.room.join(conn.id);
        self.participants.insert(conn.id, conn.out.clone());
        info!(
            "room {}: connection {} seated as {:?}",
            self.room.code(),
            conn.id,
            seat
        );

        if newly_created {
            send_event(
                &conn.out,
                &ServerEvent::RoomCreated {
                    code: self.room.code().to_string(),
                    time_control: self.room.time_control(),
                },
            );
        }
        conn.control.do_send(RoomJoined {
            code: self.room.code().to_string(),
            seat,
            room: ctx.address(),
        });
        send_event(&conn.out, &ServerEvent::SeatAssigned { seat });

        // Snapshot for the joiner so a live game renders immediately.
        let now = Instant::now();
        send_event(
            &conn.out,
            &ServerEvent::PositionUpdate {
                fen: self.room.fen(),
            },
        );
        if let Some(snapshot) = self.room.clock_snapshot(now) {
            send_event(&conn.out, &ServerEvent::clock_update(snapshot));
        }
        if let Some(outcome) = self.room.game_over() {
            send_event(
                &conn.out,
                &ServerEvent::GameOver {
                    reason: outcome.reason,
                    winner: outcome.winner,
                },
            );
        }

        self.broadcast_occupancy_except(conn.id);
        // A join can revive a room whose tick was cancelled on emptying.
        self.ensure_tick(ctx);
    }
}

impl Handler<Leave> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: Leave, ctx: &mut Context<Self>) {
        self.depart(msg.conn_id, ctx);
    }
}

impl Handler<RoomCommand> for RoomSession {
    type Result = ();

    fn handle(&mut self, msg: RoomCommand, ctx: &mut Context<Self>) {
        let now = Instant::now();
        let conn_id = msg.conn_id;
        match msg.action {
            RoomAction::MakeMove(mv) => match self.room.make_move(conn_id, &mv, now) {
                Ok(MoveOutcome::Applied(applied)) => {
                    self.broadcast(&ServerEvent::PositionUpdate { fen: applied.fen });
                    self.broadcast(&ServerEvent::MoveResult {
                        by: applied.facts.mover,
                        mv: applied.facts.uci,
                        explanation: applied.explanation,
                    });
                    if let Some(snapshot) = applied.clock {
                        self.broadcast_clock(snapshot);
                    }
                    if let Some(outcome) = applied.game_over {
                        self.stop_tick(ctx);
                        self.announce_game_over(outcome.reason, outcome.winner);
                    } else {
                        self.ensure_tick(ctx);
                    }
                }
                Ok(MoveOutcome::TimeForfeit(forfeit)) => self.announce_forfeit(forfeit, ctx),
                Err(err) => {
                    debug!(
                        "room {}: move by {} rejected: {}",
                        self.room.code(),
                        conn_id,
                        err
                    );
                    self.send_to(conn_id, &ServerEvent::move_rejected(&err));
                }
            },
            RoomAction::OfferDraw => match self.room.offer_draw(conn_id) {
                Ok(by) => self.broadcast(&ServerEvent::DrawOffered { by }),
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::AcceptDraw => match self.room.accept_draw(conn_id, now) {
                Ok(outcome) => {
                    self.stop_tick(ctx);
                    self.announce_game_over(outcome.reason, outcome.winner);
                }
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::DeclineDraw => match self.room.decline_draw(conn_id) {
                Ok(by) => self.broadcast(&ServerEvent::DrawDeclined { by }),
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::Resign => match self.room.resign(conn_id, now) {
                Ok(outcome) => {
                    self.stop_tick(ctx);
                    self.announce_game_over(outcome.reason, outcome.winner);
                }
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::RequestRematch => match self.room.request_rematch(conn_id) {
                Ok(by) => self.broadcast(&ServerEvent::RematchOffered { by }),
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::AcceptRematch => match self.room.accept_rematch(conn_id, now) {
                Ok(()) => {
                    self.broadcast(&ServerEvent::RematchAccepted);
                    self.announce_fresh_game(now, ctx);
                    self.reseat_players();
                    self.broadcast(&self.occupancy_event());
                    info!("room {}: rematch on, seats swapped", self.room.code());
                }
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::DeclineRematch => match self.room.decline_rematch(conn_id) {
                Ok(by) => self.broadcast(&ServerEvent::RematchDeclined { by }),
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
            RoomAction::ResetGame => match self.room.reset(conn_id, now) {
                Ok(by) => {
                    self.broadcast(&ServerEvent::GameReset { by });
                    self.announce_fresh_game(now, ctx);
                    info!("room {}: game reset by {}", self.room.code(), by);
                }
                Err(err) => self.send_to(conn_id, &ServerEvent::rejection(&err)),
            },
        }
    }
}

impl Handler<ClockTick> for RoomSession {
    type Result = ();

    fn handle(&mut self, _: ClockTick, ctx: &mut Context<Self>) {
        match self.room.tick(Instant::now()) {
            TickOutcome::Idle => self.stop_tick(ctx),
            TickOutcome::Running(snapshot) => self.broadcast_clock(snapshot),
            TickOutcome::TimeForfeit(forfeit) => self.announce_forfeit(forfeit, ctx),
        }
    }
}

impl Handler<Shutdown> for RoomSession {
    type Result = ();

    fn handle(&mut self, _: Shutdown, ctx: &mut Context<Self>) {
        if self.room.is_empty() {
            self.stop_tick(ctx);
            ctx.stop();
        } else {
            self.registry.do_send(Reinstate {
                code: self.room.code().to_string(),
                room: ctx.address(),
            });
        }
    }
}
