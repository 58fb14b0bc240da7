// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::bus::{AxisBus, Beat};
use crate::signal::{Edge, Signal};
use crate::sim::Clocked;
use crate::{BusConfig, Error, FifoConfig};
use log::{debug, trace};
use std::collections::VecDeque;

/// Behavioural model of a streaming FIFO.
///
/// AxisFifo consists of:
///   - a memory of `depth / bytes_per_beat` beats, filled from the input
///     bus;
///   - an output register presenting the oldest beat on the output bus. A
///     beat moves from memory to the register on the edge after the
///     register empties, so a beat takes at least two edges to pass through;
///   - in frame mode, a staging area holding the beats of the frame being
///     written. The frame is published to memory after its last beat, or
///     dropped if it is flagged bad (`drop_bad_frame`) or if it overflows
///     (`drop_when_full`).
///
/// The model follows its own reset line, independently of the endpoints.
pub struct AxisFifo {
    name: String,
    input: AxisBus,
    output: AxisBus,
    reset: Signal<bool>,
    config: FifoConfig,
    capacity: usize,
    memory: VecDeque<Beat>,
    /// frame mode: beats of the frame being written.
    staged: Vec<Beat>,
    /// frame mode: the rest of the current input frame is discarded.
    dropping: bool,
    output_reg: Option<Beat>,
    dropped_frames: usize,
}

impl AxisFifo {
    pub fn new(
        name: &str,
        input: AxisBus,
        output: AxisBus,
        reset: Signal<bool>,
        config: FifoConfig,
        bus: &BusConfig,
    ) -> Result<Self, Error> {
        config.validate(bus)?;
        let capacity = config.capacity(bus);
        Ok(Self {
            name: name.to_string(),
            input,
            output,
            reset,
            config,
            capacity,
            memory: VecDeque::with_capacity(capacity),
            staged: vec![],
            dropping: false,
            output_reg: None,
            dropped_frames: 0,
        })
    }

    /// Capacity of the memory in beats, not counting the output register.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Beats held, including staged and presented ones.
    pub fn occupancy(&self) -> usize {
        self.memory.len() + self.staged.len() + self.output_reg.iter().count()
    }

    /// Frames dropped by either drop policy since the last reset.
    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    fn full(&self) -> bool {
        self.memory.len() + self.staged.len() >= self.capacity
    }

    fn ready(&self) -> bool {
        !self.full() || (self.config.frame_fifo && self.config.drop_when_full)
    }

    fn is_bad_frame(&self, user: u64) -> bool {
        user & self.config.user_bad_frame_mask
            == self.config.user_bad_frame_value & self.config.user_bad_frame_mask
    }

    fn reset(&mut self) {
        if self.occupancy() > 0 {
            debug!("{}: reset drops {} beat(s)", self.name, self.occupancy());
        }
        self.memory.clear();
        self.staged.clear();
        self.dropping = false;
        self.output_reg = None;
        self.dropped_frames = 0;
    }

    fn drop_frame(&mut self, last: bool, reason: &str) {
        if !self.dropping {
            self.dropped_frames += 1;
            debug!(
                "{}: dropping frame after {} beat(s): {}",
                self.name,
                self.staged.len(),
                reason
            );
        }
        self.staged.clear();
        self.dropping = !last;
    }

    fn write(&mut self, beat: Beat) {
        if !self.config.frame_fifo {
            self.memory.push_back(beat);
            return;
        }
        if self.dropping {
            self.dropping = !beat.last;
            return;
        }
        if self.full() {
            // only reachable with drop_when_full, ready is low otherwise
            self.drop_frame(beat.last, "full");
            return;
        }
        let last = beat.last;
        let user = beat.user;
        self.staged.push(beat);
        if last {
            if self.config.drop_bad_frame && self.is_bad_frame(user) {
                self.drop_frame(true, "bad frame");
            } else {
                self.memory.extend(self.staged.drain(..));
            }
        }
    }
}

impl Clocked for AxisFifo {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_edge(&mut self, edge: &mut Edge) -> Result<(), Error> {
        if edge.get(self.reset) {
            self.reset();
            edge.next(self.input.tready, false)?;
            return self.output.drive_idle(edge);
        }

        if self.output.sample(edge.signals()).transfer() {
            self.output_reg = None;
        }
        if self.output_reg.is_none() {
            self.output_reg = self.memory.pop_front();
        }

        let input = self.input.sample(edge.signals());
        if input.transfer() {
            trace!("{}: write {:02x?}", self.name, input.beat.data);
            self.write(input.beat);
        }

        edge.next(self.input.tready, self.ready())?;
        match &self.output_reg {
            Some(beat) => self.output.drive_beat(edge, beat),
            None => self.output.drive_idle(edge),
        }
    }
}
