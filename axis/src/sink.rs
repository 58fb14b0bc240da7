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
use crate::sim::{Clocked, Simulator};
use crate::{Cycle, Error, Frame};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A frame whose last beat has not arrived yet.
#[derive(Debug)]
struct PartialFrame {
    payload: Vec<u8>,
    id: u64,
    dest: u64,
    user: Vec<u64>,
}

impl PartialFrame {
    fn start(beat: &Beat) -> Self {
        Self {
            payload: vec![],
            id: beat.id,
            dest: beat.dest,
            user: vec![],
        }
    }

    fn finish(self) -> Frame {
        Frame::new(self.payload)
            .with_id(self.id)
            .with_dest(self.dest)
            .with_user(self.user)
    }
}

/// Samples a bus and reassembles the frames it carries.
pub struct AxisSink {
    name: String,
    bus: AxisBus,
    /// name of the sampled bus, for protocol errors.
    bus_name: String,
    reset: Signal<bool>,
    pause: Signal<bool>,
    partial: Option<PartialFrame>,
    received: VecDeque<Frame>,
    frames_received: usize,
}

impl AxisSink {
    pub fn new(
        name: &str,
        bus: AxisBus,
        bus_name: &str,
        reset: Signal<bool>,
        pause: Signal<bool>,
    ) -> Self {
        Self {
            name: name.to_string(),
            bus,
            bus_name: bus_name.to_string(),
            reset,
            pause,
            partial: None,
            received: VecDeque::new(),
            frames_received: 0,
        }
    }

    /// Pops the oldest completed frame.
    pub fn recv(&mut self) -> Result<Frame, Error> {
        self.received.pop_front().ok_or(Error::EmptyQueue)
    }

    pub fn has_frame(&self) -> bool {
        !self.received.is_empty()
    }

    /// Neither completed frames nor a partially received one.
    pub fn empty(&self) -> bool {
        self.received.is_empty() && self.partial.is_none()
    }

    /// Completed frames not retrieved yet.
    pub fn queued(&self) -> usize {
        self.received.len()
    }

    /// Frames completed since the last reset, retrieved or not.
    pub fn frames_received(&self) -> usize {
        self.frames_received
    }

    /// Runs `sim` until `sink` holds a completed frame; does not consume it.
    ///
    /// The sink is registered with `sim`, so it is shared rather than
    /// borrowed for the whole wait.
    pub fn wait(sink: &Rc<RefCell<Self>>, sim: &mut Simulator, limit: Cycle) -> Result<Cycle, Error> {
        sim.run_until(|_| sink.borrow().has_frame(), limit)
    }

    fn reset(&mut self) {
        if !self.empty() {
            debug!(
                "{}: reset drops {} frame(s) and {:?}",
                self.name,
                self.received.len(),
                self.partial
            );
        }
        self.partial = None;
        self.received.clear();
        self.frames_received = 0;
    }

    fn accept(&mut self, beat: &Beat) -> Result<(), Error> {
        let kept = beat.kept_bytes().collect::<Vec<_>>();
        if kept.is_empty() && !beat.last {
            return Err(Error::EmptyKeep(self.bus_name.clone()));
        }
        let partial = self
            .partial
            .get_or_insert_with(|| PartialFrame::start(beat));
        if partial.id != beat.id {
            return Err(Error::IdChanged {
                bus: self.bus_name.clone(),
                expected: partial.id,
                found: beat.id,
            });
        }
        if partial.dest != beat.dest {
            return Err(Error::DestChanged {
                bus: self.bus_name.clone(),
                expected: partial.dest,
                found: beat.dest,
            });
        }
        trace!("{}: beat {:02x?}", self.name, kept);
        partial.payload.extend(kept);
        partial.user.push(beat.user);
        if beat.last {
            if let Some(partial) = self.partial.take() {
                let frame = partial.finish();
                debug!("{}: received {:?}", self.name, frame);
                self.received.push_back(frame);
                self.frames_received += 1;
            }
        }
        Ok(())
    }
}

impl Clocked for AxisSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_edge(&mut self, edge: &mut Edge) -> Result<(), Error> {
        if edge.get(self.reset) {
            self.reset();
            return edge.next(self.bus.tready, false);
        }
        let state = self.bus.sample(edge.signals());
        if state.transfer() {
            self.accept(&state.beat)?;
        }
        edge.next(self.bus.tready, !edge.get(self.pause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalBank;
    use crate::BusConfig;

    struct Fixture {
        signals: SignalBank,
        bus: AxisBus,
        reset: Signal<bool>,
        pause: Signal<bool>,
        sink: AxisSink,
    }

    fn fixture(config: &BusConfig) -> Fixture {
        let mut signals = SignalBank::new();
        let reset = signals.bit("tb", "tb_reset");
        let pause = signals.bit("tb", "sink_pause");
        let bus = AxisBus::new(&mut signals, "m_axis", config).unwrap();
        let sink = AxisSink::new("sink", bus, "m_axis", reset, pause);
        Fixture {
            signals,
            bus,
            reset,
            pause,
            sink,
        }
    }

    impl Fixture {
        /// Presents `beat` as already committed, then runs one edge.
        fn offer(&mut self, beat: &Beat) -> Result<(), Error> {
            self.bus
                .drive_beat(&mut Edge::new(&mut self.signals, 1), beat)?;
            self.signals.commit();
            self.edge()
        }

        fn edge(&mut self) -> Result<(), Error> {
            let result = self.sink.on_edge(&mut Edge::new(&mut self.signals, 0));
            self.signals.commit();
            result
        }
    }

    fn beats(frame: &Frame, config: &BusConfig) -> Vec<Beat> {
        frame.beats(config).unwrap()
    }

    #[test]
    fn reassembles_a_frame() {
        let config = BusConfig::with_bytes(2);
        let mut f = fixture(&config);
        f.edge().unwrap();
        assert!(f.bus.sample(&f.signals).ready);
        let frame = Frame::new(vec![1, 2, 3]).with_id(7).with_dest(2);
        for beat in beats(&frame, &config) {
            assert!(!f.sink.has_frame());
            f.offer(&beat).unwrap();
        }
        assert_eq!(f.sink.recv(), Ok(frame));
        assert_eq!(f.sink.recv(), Err(Error::EmptyQueue));
        assert!(f.sink.empty());
    }

    #[test]
    fn pause_deasserts_ready_and_nothing_is_taken() {
        let config = BusConfig::default();
        let mut f = fixture(&config);
        f.signals.force(f.pause, true);
        f.edge().unwrap();
        assert!(!f.bus.sample(&f.signals).ready);
        f.offer(&beats(&Frame::new(vec![9]), &config)[0]).unwrap();
        assert!(f.sink.empty());
        f.signals.force(f.pause, false);
        f.edge().unwrap();
        // the beat is still presented, and now accepted
        f.edge().unwrap();
        assert_eq!(f.sink.recv(), Ok(Frame::new(vec![9])));
    }

    #[test]
    fn id_must_not_change_mid_frame() {
        let config = BusConfig::default();
        let mut f = fixture(&config);
        f.edge().unwrap();
        let mut frame_beats = beats(&Frame::new(vec![1, 2]).with_id(1), &config);
        frame_beats[1].id = 2;
        f.offer(&frame_beats[0]).unwrap();
        assert!(!f.sink.empty());
        assert_eq!(
            f.offer(&frame_beats[1]),
            Err(Error::IdChanged {
                bus: "m_axis".to_string(),
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn dest_must_not_change_mid_frame() {
        let config = BusConfig::default();
        let mut f = fixture(&config);
        f.edge().unwrap();
        let mut frame_beats = beats(&Frame::new(vec![1, 2]).with_dest(3), &config);
        frame_beats[1].dest = 4;
        f.offer(&frame_beats[0]).unwrap();
        assert!(matches!(
            f.offer(&frame_beats[1]),
            Err(Error::DestChanged { expected: 3, found: 4, .. })
        ));
    }

    #[test]
    fn non_final_beat_needs_a_kept_byte() {
        let config = BusConfig::with_bytes(2);
        let mut f = fixture(&config);
        f.edge().unwrap();
        let mut beat = beats(&Frame::new(vec![1, 2, 3]), &config).remove(0);
        beat.keep.fill(false);
        assert_eq!(f.offer(&beat), Err(Error::EmptyKeep("m_axis".to_string())));
    }

    #[test]
    fn last_beat_user_is_recorded() {
        let config = BusConfig::default();
        let mut f = fixture(&config);
        f.edge().unwrap();
        let frame = Frame::new(vec![1, 2]).with_last_cycle_user(1);
        for beat in beats(&frame, &config) {
            f.offer(&beat).unwrap();
        }
        let received = f.sink.recv().unwrap();
        assert_eq!(received.last_cycle_user(), 1);
        assert_eq!(received.user(), Some(&[0, 1][..]));
        assert_eq!(received, frame);
    }

    #[test]
    fn reset_discards_partial_and_completed_frames() {
        let config = BusConfig::default();
        let mut f = fixture(&config);
        f.edge().unwrap();
        f.offer(&beats(&Frame::new(vec![1]), &config)[0]).unwrap();
        f.offer(&beats(&Frame::new(vec![2, 3]), &config)[0]).unwrap();
        assert_eq!(f.sink.queued(), 1);
        f.signals.force(f.reset, true);
        f.edge().unwrap();
        assert!(f.sink.empty());
        assert!(!f.bus.sample(&f.signals).ready);
        assert_eq!(f.sink.frames_received(), 0);
    }
}
