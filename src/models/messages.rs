use crate::models::clock::ClockSnapshot;
use crate::models::errors::ProtocolError;
use crate::models::types::{EndReason, Seat, Side, TimeControl, TimeControlKind};
use actix::{Message, Recipient};
use log::warn;
use serde::{Deserialize, Serialize};

/// Message sent from client to server. Requests are a closed set; anything
/// that does not parse into one of these is answered with `bad_request`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    CreateRoom {
        time_control: TimeControlKind,
    },
    JoinRoom {
        code: String,
    },
    MakeMove {
        room_code: String,
        #[serde(rename = "move")]
        mv: String,
    },
    OfferDraw {
        room_code: String,
    },
    AcceptDraw {
        room_code: String,
    },
    DeclineDraw {
        room_code: String,
    },
    Resign {
        room_code: String,
    },
    RequestRematch {
        room_code: String,
    },
    AcceptRematch {
        room_code: String,
    },
    DeclineRematch {
        room_code: String,
    },
    ResetGame {
        room_code: String,
    },
}

/// Message sent from server to client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomCreated {
        code: String,
        time_control: TimeControl,
    },
    SeatAssigned {
        seat: Seat,
    },
    Error {
        reason: String,
        message: String,
    },
    MoveRejected {
        reason: String,
        explanation: String,
    },
    PositionUpdate {
        fen: String,
    },
    MoveResult {
        by: Side,
        #[serde(rename = "move")]
        mv: String,
        explanation: String,
    },
    ClockUpdate {
        white_ms: u64,
        black_ms: u64,
        active: Option<Side>,
    },
    GameOver {
        reason: EndReason,
        winner: Option<Side>,
    },
    DrawOffered {
        by: Side,
    },
    DrawDeclined {
        by: Side,
    },
    RematchOffered {
        by: Side,
    },
    RematchAccepted,
    RematchDeclined {
        by: Side,
    },
    GameReset {
        by: Side,
    },
    SeatChanged {
        white_occupied: bool,
        black_occupied: bool,
        spectators: usize,
    },
}

impl ServerEvent {
    /// General rejection, delivered to the offending requester only.
    pub fn rejection(err: &ProtocolError) -> ServerEvent {
        ServerEvent::Error {
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }

    /// Rejection specific to the move pipeline.
    pub fn move_rejected(err: &ProtocolError) -> ServerEvent {
        ServerEvent::MoveRejected {
            reason: err.reason().to_string(),
            explanation: err.to_string(),
        }
    }

    pub fn clock_update(snapshot: ClockSnapshot) -> ServerEvent {
        ServerEvent::ClockUpdate {
            white_ms: snapshot.white_ms,
            black_ms: snapshot.black_ms,
            active: snapshot.active,
        }
    }
}

/// One serialized event, pushed to a single connection's WebSocket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

/// Serialize and deliver one event to one connection.
pub fn send_event(out: &Recipient<Outbound>, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(text) => out.do_send(Outbound(text)),
        Err(err) => warn!("failed to serialize event: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_parse_from_tagged_json() {
        let parsed: ClientRequest =
            serde_json::from_str(r#"{"type":"create_room","time_control":"blitz"}"#).unwrap();
        assert_eq!(
            parsed,
            ClientRequest::CreateRoom {
                time_control: TimeControlKind::Blitz
            }
        );

        let parsed: ClientRequest =
            serde_json::from_str(r#"{"type":"make_move","room_code":"AB12CD","move":"e2e4"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            ClientRequest::MakeMove {
                room_code: "AB12CD".to_string(),
                mv: "e2e4".to_string(),
            }
        );
    }

    #[test]
    fn unknown_request_types_fail_to_parse() {
        assert!(serde_json::from_str::<ClientRequest>(r#"{"type":"shout"}"#).is_err());
        assert!(serde_json::from_str::<ClientRequest>(r#"{"move":"e2e4"}"#).is_err());
    }

    #[test]
    fn events_serialize_with_type_tags() {
        let json = serde_json::to_string(&ServerEvent::MoveResult {
            by: Side::White,
            mv: "e2e4".to_string(),
            explanation: "white plays e2e4".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"move_result""#));
        assert!(json.contains(r#""move":"e2e4""#));

        let json = serde_json::to_string(&ServerEvent::RematchAccepted).unwrap();
        assert_eq!(json, r#"{"type":"rematch_accepted"}"#);
    }

    #[test]
    fn rejection_events_carry_reason_codes() {
        let event = ServerEvent::rejection(&ProtocolError::RoomNotFound {
            code: "ZZZZZZ".to_string(),
        });
        match event {
            ServerEvent::Error { reason, message } => {
                assert_eq!(reason, "room_not_found");
                assert!(message.contains("ZZZZZZ"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
