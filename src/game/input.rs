//! Per-slot player input: key bitmask queues with sticky semantics.
//!
//! Each slot keeps a bounded FIFO of received frames; the tick loop drains
//! at most one frame per slot per tick. The drained bitmask stays in force
//! until a later frame overrides it — absent input never resets keys to
//! neutral.

use std::collections::VecDeque;

use crate::net::protocol::MAX_SLOTS;
use crate::util::vec2::Vec2;

bitflags::bitflags! {
    /// Key bitmask carried by INPUT packets. Bits 6-7 are reserved and must
    /// be zero on the wire.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InputKeys: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const FIRE = 1 << 4;
        const FORCE_TOGGLE = 1 << 5;
    }
}

/// One decoded INPUT frame routed to a room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputFrame {
    pub slot: u8,
    pub keys: InputKeys,
    pub seq: u32,
}

/// Frames a slot may buffer between ticks; overflow drops the oldest.
const MAX_QUEUED: usize = 8;

/// Input state for a single slot.
#[derive(Debug, Default)]
pub struct SlotInput {
    queue: VecDeque<InputFrame>,
    current: InputKeys,
    prev: InputKeys,
    last_seq: Option<u32>,
    force_edge: bool,
}

impl SlotInput {
    /// Queues a frame. Stale sequence numbers are dropped — the sequence
    /// exists only for staleness detection, not delivery ordering.
    pub fn push(&mut self, frame: InputFrame) -> bool {
        if let Some(last) = self.last_seq {
            if frame.seq <= last {
                return false;
            }
        }
        self.last_seq = Some(frame.seq);
        if self.queue.len() == MAX_QUEUED {
            self.queue.pop_front();
        }
        self.queue.push_back(frame);
        true
    }

    /// Drains at most one queued frame and recomputes edge state.
    pub fn begin_tick(&mut self) {
        self.prev = self.current;
        if let Some(frame) = self.queue.pop_front() {
            self.current = frame.keys;
        }
        self.force_edge = self.current.contains(InputKeys::FORCE_TOGGLE)
            && !self.prev.contains(InputKeys::FORCE_TOGGLE);
    }

    pub fn keys(&self) -> InputKeys {
        self.current
    }

    /// True on the tick the FORCE bit went from clear to set.
    pub fn force_edge(&self) -> bool {
        self.force_edge
    }

    /// Movement direction from the held keys. Screen-space: UP decreases y.
    pub fn direction(&self) -> Vec2 {
        let k = self.current;
        let x = (k.contains(InputKeys::RIGHT) as i8 - k.contains(InputKeys::LEFT) as i8) as f32;
        let y = (k.contains(InputKeys::DOWN) as i8 - k.contains(InputKeys::UP) as i8) as f32;
        Vec2::new(x, y)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// All slots of one room.
#[derive(Debug, Default)]
pub struct InputTable {
    slots: [SlotInput; MAX_SLOTS],
}

impl InputTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a frame for its slot; out-of-range slots are ignored.
    pub fn push(&mut self, frame: InputFrame) -> bool {
        match self.slots.get_mut(frame.slot as usize) {
            Some(slot) => slot.push(frame),
            None => false,
        }
    }

    pub fn begin_tick(&mut self) {
        for slot in &mut self.slots {
            slot.begin_tick();
        }
    }

    pub fn slot(&self, slot: u8) -> &SlotInput {
        &self.slots[slot as usize % MAX_SLOTS]
    }

    pub fn reset_slot(&mut self, slot: u8) {
        if let Some(s) = self.slots.get_mut(slot as usize) {
            s.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(slot: u8, keys: InputKeys, seq: u32) -> InputFrame {
        InputFrame { slot, keys, seq }
    }

    #[test]
    fn test_one_frame_per_tick() {
        let mut slot = SlotInput::default();
        slot.push(frame(0, InputKeys::UP, 1));
        slot.push(frame(0, InputKeys::DOWN, 2));

        slot.begin_tick();
        assert_eq!(slot.keys(), InputKeys::UP);
        slot.begin_tick();
        assert_eq!(slot.keys(), InputKeys::DOWN);
    }

    #[test]
    fn test_keys_sticky_without_new_frames() {
        let mut slot = SlotInput::default();
        slot.push(frame(0, InputKeys::UP | InputKeys::FIRE, 1));

        slot.begin_tick();
        for _ in 0..5 {
            slot.begin_tick();
        }
        assert_eq!(slot.keys(), InputKeys::UP | InputKeys::FIRE);
    }

    #[test]
    fn test_stale_sequence_dropped() {
        let mut slot = SlotInput::default();
        assert!(slot.push(frame(0, InputKeys::UP, 5)));
        assert!(!slot.push(frame(0, InputKeys::DOWN, 5)));
        assert!(!slot.push(frame(0, InputKeys::DOWN, 3)));
        assert!(slot.push(frame(0, InputKeys::DOWN, 6)));
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut slot = SlotInput::default();
        for seq in 0..12u32 {
            slot.push(frame(0, InputKeys::from_bits_truncate((seq % 4) as u8), seq + 1));
        }
        assert_eq!(slot.queued(), MAX_QUEUED);

        // Oldest surviving frame is seq 5 (seq 1-4 were dropped).
        slot.begin_tick();
        assert_eq!(slot.keys(), InputKeys::from_bits_truncate(4 % 4));
    }

    #[test]
    fn test_direction_mapping() {
        let mut slot = SlotInput::default();
        slot.push(frame(0, InputKeys::UP | InputKeys::RIGHT, 1));
        slot.begin_tick();
        assert_eq!(slot.direction(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_opposed_keys_cancel() {
        let mut slot = SlotInput::default();
        slot.push(frame(0, InputKeys::LEFT | InputKeys::RIGHT, 1));
        slot.begin_tick();
        assert_eq!(slot.direction(), Vec2::ZERO);
    }

    #[test]
    fn test_force_edge_fires_once() {
        let mut slot = SlotInput::default();
        slot.push(frame(0, InputKeys::FORCE_TOGGLE, 1));

        slot.begin_tick();
        assert!(slot.force_edge());

        // Held across following ticks: no new edge.
        slot.begin_tick();
        assert!(!slot.force_edge());

        slot.push(frame(0, InputKeys::empty(), 2));
        slot.begin_tick();
        assert!(!slot.force_edge());

        slot.push(frame(0, InputKeys::FORCE_TOGGLE, 3));
        slot.begin_tick();
        assert!(slot.force_edge());
    }

    #[test]
    fn test_table_rejects_out_of_range_slot() {
        let mut table = InputTable::new();
        assert!(!table.push(frame(7, InputKeys::UP, 1)));
        assert!(table.push(frame(3, InputKeys::UP, 1)));
    }

    #[test]
    fn test_table_reset_slot() {
        let mut table = InputTable::new();
        table.push(frame(1, InputKeys::FIRE, 9));
        table.begin_tick();
        assert_eq!(table.slot(1).keys(), InputKeys::FIRE);

        table.reset_slot(1);
        assert_eq!(table.slot(1).keys(), InputKeys::empty());
        // Sequence tracking restarts for the next occupant.
        assert!(table.push(frame(1, InputKeys::UP, 1)));
    }
}
