use crate::models::errors::ProtocolError;
use crate::models::messages::{ClientRequest, Outbound, ServerEvent};
use crate::models::types::TimeControl;
use crate::registry::room_session::{
    ConnHandle, Leave, RoomAction, RoomCommand, RoomJoined, RoomSession,
};
use crate::registry::{normalize_code, JoinExisting, OpenRoom, RoomRegistry};
use actix::prelude::*;
use actix_web_actors::ws;
use log::{debug, info, warn};
use uuid::Uuid;

/// One WebSocket connection. Owns no game state; it parses requests,
/// routes them to the registry or the joined room, and writes whatever
/// the room sends back.
pub struct ClientSession {
    id: Uuid,
    registry: Addr<RoomRegistry>,
    room: Option<JoinedRoom>,
}

struct JoinedRoom {
    code: String,
    addr: Addr<RoomSession>,
}

impl ClientSession {
    pub fn new(registry: Addr<RoomRegistry>) -> ClientSession {
        ClientSession {
            id: Uuid::new_v4(),
            registry,
            room: None,
        }
    }

    fn conn_handle(&self, ctx: &mut ws::WebsocketContext<Self>) -> ConnHandle {
        ConnHandle {
            id: self.id,
            out: ctx.address().recipient(),
            control: ctx.address().recipient(),
        }
    }

    fn reply(&self, ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(text) => ctx.text(text),
            Err(err) => warn!("connection {}: failed to serialize event: {}", self.id, err),
        }
    }

    fn reject(&self, ctx: &mut ws::WebsocketContext<Self>, err: &ProtocolError) {
        self.reply(ctx, &ServerEvent::rejection(err));
    }

    fn leave_current(&mut self) {
        if let Some(joined) = self.room.take() {
            joined.addr.do_send(Leave { conn_id: self.id });
        }
    }

    /// In-room requests must name the room this connection actually sits
    /// in; anything else reads as a room the requester cannot see.
    fn forward(
        &mut self,
        room_code: &str,
        action: RoomAction,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        let code = normalize_code(room_code);
        match &self.room {
            Some(joined) if joined.code == code => joined.addr.do_send(RoomCommand {
                conn_id: self.id,
                action,
            }),
            _ => self.reject(ctx, &ProtocolError::RoomNotFound { code }),
        }
    }

    fn dispatch(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let request = match serde_json::from_str::<ClientRequest>(text) {
            Ok(request) => request,
            Err(err) => {
                debug!("connection {}: unparseable request: {}", self.id, err);
                self.reject(
                    ctx,
                    &ProtocolError::BadRequest {
                        detail: err.to_string(),
                    },
                );
                return;
            }
        };
        match request {
            // The current seat is held until the new room confirms the
            // join; a failed lookup must not cost the requester anything.
            ClientRequest::CreateRoom { time_control } => {
                self.registry.do_send(OpenRoom {
                    time_control: TimeControl::preset(time_control),
                    conn: self.conn_handle(ctx),
                });
            }
            ClientRequest::JoinRoom { code } => {
                self.registry.do_send(JoinExisting {
                    code,
                    conn: self.conn_handle(ctx),
                });
            }
            ClientRequest::MakeMove { room_code, mv } => {
                self.forward(&room_code, RoomAction::MakeMove(mv), ctx)
            }
            ClientRequest::OfferDraw { room_code } => {
                self.forward(&room_code, RoomAction::OfferDraw, ctx)
            }
            ClientRequest::AcceptDraw { room_code } => {
                self.forward(&room_code, RoomAction::AcceptDraw, ctx)
            }
            ClientRequest::DeclineDraw { room_code } => {
                self.forward(&room_code, RoomAction::DeclineDraw, ctx)
            }
            ClientRequest::Resign { room_code } => {
                self.forward(&room_code, RoomAction::Resign, ctx)
            }
            ClientRequest::RequestRematch { room_code } => {
                self.forward(&room_code, RoomAction::RequestRematch, ctx)
            }
            ClientRequest::AcceptRematch { room_code } => {
                self.forward(&room_code, RoomAction::AcceptRematch, ctx)
            }
            ClientRequest::DeclineRematch { room_code } => {
                self.forward(&room_code, RoomAction::DeclineRematch, ctx)
            }
            ClientRequest::ResetGame { room_code } => {
                self.forward(&room_code, RoomAction::ResetGame, ctx)
            }
        }
    }
}

impl Actor for ClientSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("connection {} established", self.id);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.leave_current();
        info!("connection {} closed", self.id);
        Running::Stop
    }
}

/// Events pushed by a room (or the registry) travel to the socket as-is.
impl Handler<Outbound> for ClientSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<RoomJoined> for ClientSession {
    type Result = ();

    fn handle(&mut self, msg: RoomJoined, _: &mut Self::Context) {
        info!(
            "connection {} joined room {} as {:?}",
            self.id, msg.code, msg.seat
        );
        // Moving rooms vacates the old seat only now, on confirmation.
        if let Some(previous) = self.room.take() {
            if previous.addr != msg.room {
                previous.addr.do_send(Leave { conn_id: self.id });
            }
        }
        self.room = Some(JoinedRoom {
            code: msg.code,
            addr: msg.room,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ClientSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.dispatch(&text, ctx);
            }
            Ok(ws::Message::Ping(payload)) => {
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Binary(_)) => {
                self.reject(
                    ctx,
                    &ProtocolError::BadRequest {
                        detail: "binary frames are not supported".to_string(),
                    },
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(err) => {
                warn!("connection {}: websocket error: {}", self.id, err);
                ctx.stop();
            }
        }
    }
}
