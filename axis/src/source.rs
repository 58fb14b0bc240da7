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
use crate::{BusConfig, Error, Frame};
use log::{debug, trace};
use std::collections::VecDeque;

/// The frame currently on the bus and how far it got.
struct ActiveFrame {
    beats: Vec<Beat>,
    cursor: usize,
}

/// Drives frames onto a bus, one beat per transfer.
///
/// Frames are split into beats when they are enqueued. On every edge the
/// source first accounts for the transfer that completed at this edge, then
/// presents the beat at the cursor, unless paused or out of frames.
pub struct AxisSource {
    name: String,
    bus: AxisBus,
    config: BusConfig,
    reset: Signal<bool>,
    pause: Signal<bool>,
    pending_frames: VecDeque<Vec<Beat>>,
    active: Option<ActiveFrame>,
    frames_sent: usize,
}

impl AxisSource {
    pub fn new(
        name: &str,
        bus: AxisBus,
        config: BusConfig,
        reset: Signal<bool>,
        pause: Signal<bool>,
    ) -> Self {
        Self {
            name: name.to_string(),
            bus,
            config,
            reset,
            pause,
            pending_frames: VecDeque::new(),
            active: None,
            frames_sent: 0,
        }
    }

    /// Queues `frame` behind every frame sent before it.
    pub fn enqueue(&mut self, frame: &Frame) -> Result<(), Error> {
        let beats = frame.beats(&self.config)?;
        debug!(
            "{}: queued {}-byte frame in {} beats",
            self.name,
            frame.len(),
            beats.len()
        );
        self.pending_frames.push_back(beats);
        Ok(())
    }

    /// Nothing queued and nothing on the bus.
    pub fn idle(&self) -> bool {
        self.active.is_none() && self.pending_frames.is_empty()
    }

    /// Frames queued or in flight.
    pub fn backlog(&self) -> usize {
        self.pending_frames.len() + self.active.iter().count()
    }

    /// Frames whose last beat was transferred since the last reset.
    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }

    fn reset(&mut self) {
        if !self.idle() {
            debug!("{}: reset drops {} frame(s)", self.name, self.backlog());
        }
        self.pending_frames.clear();
        self.active = None;
        self.frames_sent = 0;
    }
}

impl Clocked for AxisSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_edge(&mut self, edge: &mut Edge) -> Result<(), Error> {
        if edge.get(self.reset) {
            self.reset();
            return self.bus.drive_idle(edge);
        }

        if self.bus.sample(edge.signals()).transfer() {
            if let Some(active) = self.active.as_mut() {
                trace!("{}: beat {} transferred", self.name, active.cursor);
                active.cursor += 1;
                if active.cursor == active.beats.len() {
                    self.active = None;
                    self.frames_sent += 1;
                    debug!("{}: frame {} sent", self.name, self.frames_sent);
                }
            }
        }

        if self.active.is_none() {
            self.active = self
                .pending_frames
                .pop_front()
                .map(|beats| ActiveFrame { beats, cursor: 0 });
        }

        match &self.active {
            Some(active) if !edge.get(self.pause) => {
                self.bus.drive_beat(edge, &active.beats[active.cursor])
            }
            _ => self.bus.drive_idle(edge),
        }
    }
}
