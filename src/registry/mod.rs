use crate::models::errors::ProtocolError;
use crate::models::messages::{send_event, ServerEvent};
use crate::models::types::TimeControl;
use crate::registry::room_session::{ConnHandle, Join, RoomSession, Shutdown};
use actix::prelude::*;
use log::{info, warn};
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

pub mod room_session;

pub const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Owner of the `code -> room` map. Creation, lookup and removal are
/// serialized here; everything else happens inside the room actors.
pub struct RoomRegistry {
    rooms: HashMap<String, Addr<RoomSession>>,
}

/// Open a fresh room and seat the requester in it.
#[derive(Message)]
#[rtype(result = "()")]
pub struct OpenRoom {
    pub time_control: TimeControl,
    pub conn: ConnHandle,
}

/// Look up a room by code and forward the requester into it.
#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinExisting {
    pub code: String,
    pub conn: ConnHandle,
}

/// A room reports itself empty. The registry drops the mapping and
/// confirms the shutdown; the room only stops once that confirmation
/// arrives, so a join can never be forwarded into a dead room.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RoomClosed {
    pub code: String,
    pub room: Addr<RoomSession>,
}

/// A join slipped into a room between its closed report and the shutdown
/// confirmation; the room asks to be listed again.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Reinstate {
    pub code: String,
    pub room: Addr<RoomSession>,
}

impl RoomRegistry {
    pub fn new() -> RoomRegistry {
        RoomRegistry {
            rooms: HashMap::new(),
        }
    }

    fn fresh_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = random_code(&mut rng);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Actor for RoomRegistry {
    type Context = Context<Self>;
}

impl Handler<OpenRoom> for RoomRegistry {
    type Result = ();

    fn handle(&mut self, msg: OpenRoom, ctx: &mut Context<Self>) {
        let code = self.fresh_code();
        let room = RoomSession::new(code.clone(), msg.time_control, ctx.address()).start();
        self.rooms.insert(code.clone(), room.clone());
        info!("opened room {} ({:?})", code, msg.time_control.kind);
        room.do_send(Join {
            conn: msg.conn,
            newly_created: true,
        });
    }
}

impl Handler<JoinExisting> for RoomRegistry {
    type Result = ();

    fn handle(&mut self, msg: JoinExisting, _: &mut Context<Self>) {
        let code = normalize_code(&msg.code);
        match self.rooms.get(&code) {
            Some(room) => room.do_send(Join {
                conn: msg.conn,
                newly_created: false,
            }),
            None => {
                let err = ProtocolError::RoomNotFound { code };
                send_event(&msg.conn.out, &ServerEvent::rejection(&err));
            }
        }
    }
}

impl Handler<RoomClosed> for RoomRegistry {
    type Result = ();

    fn handle(&mut self, msg: RoomClosed, _: &mut Context<Self>) {
        if self.rooms.get(&msg.code) == Some(&msg.room) {
            self.rooms.remove(&msg.code);
            info!("room {} closed", msg.code);
        }
        msg.room.do_send(Shutdown);
    }
}

impl Handler<Reinstate> for RoomRegistry {
    type Result = ();

    fn handle(&mut self, msg: Reinstate, _: &mut Context<Self>) {
        match self.rooms.entry(msg.code) {
            Entry::Vacant(slot) => {
                info!("room {} relisted after a join raced its shutdown", slot.key());
                slot.insert(msg.room);
            }
            Entry::Occupied(slot) => {
                if slot.get() != &msg.room {
                    warn!("room code {} was reissued; the older room stays unlisted", slot.key());
                }
            }
        }
    }
}

/// Six characters from the 36-symbol alphabet `A-Z0-9`.
pub fn random_code<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes compare case-insensitively and ignore surrounding whitespace.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn codes_are_six_symbols_from_the_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = random_code(&mut rng);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)), "{code}");
        }
    }

    #[test]
    fn lookup_codes_are_normalized() {
        assert_eq!(normalize_code("  ab12cd "), "AB12CD");
        assert_eq!(normalize_code("AB12CD"), "AB12CD");
    }
}
