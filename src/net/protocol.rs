//! Binary wire protocol.
//!
//! Five packet kinds, each led by a one-byte type discriminator, laid out
//! fixed-width little-endian. The format is not self-describing: both peers
//! agree on the struct layout per type out-of-band. Every decode path
//! validates before any indexed access, so adversarial datagrams cost a
//! bounded rejection branch, never a crash.
//!
//! Layouts (all integers little-endian):
//!
//! ```text
//! JOIN(0):     type u8 | version u8 | name [u8; 16] NUL-padded
//! ACK(1):      type u8 | slot u8 | room [u8; 16] | tick u64
//! INPUT(2):    type u8 | slot u8 | keys u8 | seq u32
//! SNAPSHOT(3): type u8 | tick u64 | count u16 | count * record
//!   record:    id u32 | x f32 | y f32 | sprite u16 | frame u8 | health i16 | kind u8
//! LEAVE(4):    type u8 | slot u8
//! ```

use uuid::Uuid;

use crate::game::input::InputKeys;
use crate::util::vec2::Vec2;

/// Carried in JOIN; mismatched clients are rejected at decode.
pub const PROTOCOL_VERSION: u8 = 1;

/// Hard slot bound baked into the wire format (slot fields are validated
/// against this before any lookup). Room capacity never exceeds it.
pub const MAX_SLOTS: usize = 4;

/// Fixed width of the NUL-padded display name in JOIN.
pub const NAME_LEN: usize = 16;

/// Upper bound on entities per snapshot; a count beyond this is rejected.
pub const MAX_SNAPSHOT_ENTITIES: usize = 512;

const TYPE_JOIN: u8 = 0;
const TYPE_ACK: u8 = 1;
const TYPE_INPUT: u8 = 2;
const TYPE_SNAPSHOT: u8 = 3;
const TYPE_LEAVE: u8 = 4;

const RECORD_LEN: usize = 18;

/// One visible entity in a snapshot. `health` is -1 for entities without a
/// health facet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRecord {
    pub id: u32,
    pub pos: Vec2,
    pub sprite: u16,
    pub frame: u8,
    pub health: i16,
    pub kind: u8,
}

/// Tick-tagged projection of the visible simulation state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub tick: u64,
    pub entities: Vec<EntityRecord>,
}

/// A decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Join { name: String },
    Ack { slot: u8, room: Uuid, tick: u64 },
    Input { slot: u8, keys: InputKeys, seq: u32 },
    Snapshot(Snapshot),
    Leave { slot: u8 },
}

/// Decode rejection reasons. All are drop-the-packet, never
/// drop-the-connection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("unknown packet type {0}")]
    UnknownType(u8),
    #[error("packet truncated")]
    Truncated,
    #[error("slot {0} out of range")]
    SlotOutOfRange(u8),
    #[error("reserved input bits set: {0:#04x}")]
    ReservedBits(u8),
    #[error("protocol version {0} not supported")]
    Version(u8),
    #[error("entity count {0} exceeds limit")]
    EntityCount(u16),
}

/// Encodes a packet to its wire form. Byte-identical across platforms:
/// explicit widths, little-endian throughout.
pub fn encode(packet: &Packet) -> Vec<u8> {
    match packet {
        Packet::Join { name } => {
            let mut buf = Vec::with_capacity(2 + NAME_LEN);
            buf.push(TYPE_JOIN);
            buf.push(PROTOCOL_VERSION);
            let mut padded = [0u8; NAME_LEN];
            let bytes = truncate_to_boundary(name, NAME_LEN);
            padded[..bytes.len()].copy_from_slice(bytes);
            buf.extend_from_slice(&padded);
            buf
        }
        Packet::Ack { slot, room, tick } => {
            let mut buf = Vec::with_capacity(26);
            buf.push(TYPE_ACK);
            buf.push(*slot);
            buf.extend_from_slice(room.as_bytes());
            buf.extend_from_slice(&tick.to_le_bytes());
            buf
        }
        Packet::Input { slot, keys, seq } => {
            let mut buf = Vec::with_capacity(7);
            buf.push(TYPE_INPUT);
            buf.push(*slot);
            buf.push(keys.bits());
            buf.extend_from_slice(&seq.to_le_bytes());
            buf
        }
        Packet::Snapshot(snapshot) => {
            let count = snapshot.entities.len().min(MAX_SNAPSHOT_ENTITIES);
            let mut buf = Vec::with_capacity(11 + count * RECORD_LEN);
            buf.push(TYPE_SNAPSHOT);
            buf.extend_from_slice(&snapshot.tick.to_le_bytes());
            buf.extend_from_slice(&(count as u16).to_le_bytes());
            for record in &snapshot.entities[..count] {
                buf.extend_from_slice(&record.id.to_le_bytes());
                buf.extend_from_slice(&record.pos.x.to_le_bytes());
                buf.extend_from_slice(&record.pos.y.to_le_bytes());
                buf.extend_from_slice(&record.sprite.to_le_bytes());
                buf.push(record.frame);
                buf.extend_from_slice(&record.health.to_le_bytes());
                buf.push(record.kind);
            }
            buf
        }
        Packet::Leave { slot } => vec![TYPE_LEAVE, *slot],
    }
}

/// Decodes a datagram, rejecting anything malformed without touching
/// unvalidated indices.
pub fn decode(buf: &[u8]) -> Result<Packet, WireError> {
    let mut cursor = Cursor::new(buf);
    match cursor.u8()? {
        TYPE_JOIN => {
            let version = cursor.u8()?;
            if version != PROTOCOL_VERSION {
                return Err(WireError::Version(version));
            }
            let raw = cursor.bytes::<NAME_LEN>()?;
            let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
            let name = String::from_utf8_lossy(&raw[..end]).into_owned();
            Ok(Packet::Join { name })
        }
        TYPE_ACK => {
            let slot = cursor.slot()?;
            let room = Uuid::from_bytes(cursor.bytes::<16>()?);
            let tick = cursor.u64()?;
            Ok(Packet::Ack { slot, room, tick })
        }
        TYPE_INPUT => {
            let slot = cursor.slot()?;
            let bits = cursor.u8()?;
            let keys = InputKeys::from_bits(bits).ok_or(WireError::ReservedBits(bits))?;
            let seq = cursor.u32()?;
            Ok(Packet::Input { slot, keys, seq })
        }
        TYPE_SNAPSHOT => {
            let tick = cursor.u64()?;
            let count = cursor.u16()?;
            if count as usize > MAX_SNAPSHOT_ENTITIES {
                return Err(WireError::EntityCount(count));
            }
            let mut entities = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entities.push(EntityRecord {
                    id: cursor.u32()?,
                    pos: Vec2::new(cursor.f32()?, cursor.f32()?),
                    sprite: cursor.u16()?,
                    frame: cursor.u8()?,
                    health: cursor.i16()?,
                    kind: cursor.u8()?,
                });
            }
            Ok(Packet::Snapshot(Snapshot { tick, entities }))
        }
        TYPE_LEAVE => {
            let slot = cursor.slot()?;
            Ok(Packet::Leave { slot })
        }
        other => Err(WireError::UnknownType(other)),
    }
}

/// Longest prefix of `s` that fits `max` bytes without splitting a char.
fn truncate_to_boundary(s: &str, max: usize) -> &[u8] {
    let mut end = s.len().min(max);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].as_bytes()
}

struct Cursor<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, at: 0 }
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let slice = self
            .buf
            .get(self.at..self.at + N)
            .ok_or(WireError::Truncated)?;
        self.at += N;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.bytes::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.bytes()?))
    }

    fn i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_le_bytes(self.bytes()?))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.bytes()?))
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.bytes()?))
    }

    fn f32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_le_bytes(self.bytes()?))
    }

    /// Reads and range-checks a slot byte before anything indexes with it.
    fn slot(&mut self) -> Result<u8, WireError> {
        let slot = self.u8()?;
        if slot as usize >= MAX_SLOTS {
            return Err(WireError::SlotOutOfRange(slot));
        }
        Ok(slot)
    }
}
