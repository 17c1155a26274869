//! Lane arena for the batched engine.
//!
//! The arena is a fixed row of `capacity` slots. A slot is either free or
//! carries one message from the current call together with how far that
//! message has been consumed. Slots never move: the lane index is also the
//! index of the device state and of the staging slot the lane reads from.

use lanes_hash::{LaneMask, pad_block};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lane {
    Free,
    Busy {
        /// Position of the message in the caller's input.
        message: usize,
        /// Bytes already gathered.
        cursor: usize,
    },
}

/// What one pass over the arena produced.
#[derive(Debug)]
pub(crate) struct Gathered {
    /// Lanes whose slot was written this pass.
    pub(crate) active: LaneMask,
    /// Lanes that must start from the zero state.
    pub(crate) reset: LaneMask,
    /// `(lane, message)` pairs that absorbed their final block.
    pub(crate) retired: Vec<(usize, usize)>,
}

#[derive(Debug)]
pub(crate) struct LaneArena {
    lanes: Box<[Lane]>,
    busy: LaneMask,
    fresh: LaneMask,
}

impl LaneArena {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lanes: vec![Lane::Free; capacity].into_boxed_slice(),
            busy: LaneMask::new(capacity),
            fresh: LaneMask::new(capacity),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.lanes.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.busy.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn lane(&self, lane: usize) -> Lane {
        self.lanes[lane]
    }

    /// Hand free lanes, lowest index first, to the next messages of
    /// `backlog`. Busy lanes keep their message.
    pub(crate) fn refill(&mut self, backlog: &mut impl Iterator<Item = usize>) {
        for (lane, slot) in self.lanes.iter_mut().enumerate() {
            if *slot != Lane::Free {
                continue;
            }
            let Some(message) = backlog.next() else {
                return;
            };
            *slot = Lane::Busy { message, cursor: 0 };
            self.busy.set(lane);
            self.fresh.set(lane);
        }
    }

    /// Write the next block of every busy lane into its `rate`-byte slot of
    /// `slots`. A lane with less than a full block left writes its padded
    /// final block and is freed.
    pub(crate) fn gather<M: AsRef<[u8]>>(
        &mut self, messages: &[M], rate: usize, slots: &mut [u8],
    ) -> Gathered {
        let active = self.busy.clone();
        let reset = self.fresh.clone();
        self.fresh.clear_all();
        let mut retired = Vec::new();

        for lane in active.iter() {
            let Lane::Busy { message, cursor } = &mut self.lanes[lane] else {
                continue;
            };
            let slot = &mut slots[lane * rate..(lane + 1) * rate];
            let rest = &messages[*message].as_ref()[*cursor..];
            if rest.len() >= rate {
                slot.copy_from_slice(&rest[..rate]);
                *cursor += rate;
            } else {
                slot.copy_from_slice(&pad_block(rest, rate)[..rate]);
                retired.push((lane, *message));
                self.lanes[lane] = Lane::Free;
                self.busy.clear(lane);
            }
        }

        Gathered {
            active,
            reset,
            retired,
        }
    }

    /// Drop every assignment.
    pub(crate) fn clear(&mut self) {
        self.lanes.fill(Lane::Free);
        self.busy.clear_all();
        self.fresh.clear_all();
    }
}
