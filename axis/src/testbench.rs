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

//! The orchestrating process of a FIFO test run.
//!
//! A [`Testbench`] wires a source, the FIFO model and a sink together on
//! two buses and owns the simulator. Everything a scenario does is a call
//! on the testbench, and every call that lets time pass is a suspension
//! point of the orchestrator: edges, delays and waits for the sink.
//!
//! Control lines (resets, pauses, the test number) are forced between
//! edges and seen by the processes on the next edge.

use crate::bus::AxisBus;
use crate::hw::AxisFifo;
use crate::pause::{PauseGenerator, PausePattern};
use crate::signal::{Signal, SignalBank};
use crate::sim::Simulator;
use crate::sink::AxisSink;
use crate::source::AxisSource;
use crate::vcd::VcdWriter;
use crate::{Config, Cycle, Error, Frame};
use log::{debug, info};
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Settling time around resets and between scenarios.
pub const SETTLE_TIME: u64 = 100;

/// Testbench-level signals, all driven by the orchestrator.
#[derive(Clone, Copy, Debug)]
pub struct Control {
    /// reset of the device under test.
    pub dut_reset: Signal<bool>,
    /// reset of the source and sink.
    pub tb_reset: Signal<bool>,
    pub source_pause: Signal<bool>,
    pub sink_pause: Signal<bool>,
    /// number of the running scenario, for waveforms.
    pub current_test: Signal<u64>,
}

impl Control {
    fn new(signals: &mut SignalBank) -> Self {
        Self {
            dut_reset: signals.bit("tb", "dut_reset"),
            tb_reset: signals.bit("tb", "tb_reset"),
            source_pause: signals.bit("tb", "source_pause"),
            sink_pause: signals.bit("tb", "sink_pause"),
            current_test: signals.word("tb", "current_test", 8),
        }
    }
}

pub struct Testbench {
    config: Config,
    sim: Simulator,
    control: Control,
    s_axis: AxisBus,
    m_axis: AxisBus,
    source: Rc<RefCell<AxisSource>>,
    sink: Rc<RefCell<AxisSink>>,
    fifo: Rc<RefCell<AxisFifo>>,
    source_pauser: Rc<RefCell<PauseGenerator>>,
    sink_pauser: Rc<RefCell<PauseGenerator>>,
}

impl Testbench {
    /// Builds source -> FIFO -> sink for `config`. If the configuration
    /// names a VCD file, every signal is traced to it.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let mut sim = Simulator::new(config.sim.clock_period)?;
        let control = Control::new(sim.signals_mut());
        let s_axis = AxisBus::new(sim.signals_mut(), "s_axis", &config.bus)?;
        let m_axis = AxisBus::new(sim.signals_mut(), "m_axis", &config.bus)?;

        let source = Rc::new(RefCell::new(AxisSource::new(
            "source",
            s_axis,
            config.bus.clone(),
            control.tb_reset,
            control.source_pause,
        )));
        let fifo = Rc::new(RefCell::new(AxisFifo::new(
            "fifo",
            s_axis,
            m_axis,
            control.dut_reset,
            config.fifo.clone(),
            &config.bus,
        )?));
        let sink = Rc::new(RefCell::new(AxisSink::new(
            "sink",
            m_axis,
            "m_axis",
            control.tb_reset,
            control.sink_pause,
        )));
        let source_pauser = Rc::new(RefCell::new(PauseGenerator::new(
            "source_pause_gen",
            control.source_pause,
        )));
        let sink_pauser = Rc::new(RefCell::new(PauseGenerator::new(
            "sink_pause_gen",
            control.sink_pause,
        )));
        sim.add_process(Rc::clone(&source));
        sim.add_process(Rc::clone(&fifo));
        sim.add_process(Rc::clone(&sink));
        sim.add_process(Rc::clone(&source_pauser));
        sim.add_process(Rc::clone(&sink_pauser));

        if let Some(path) = &config.sim.vcd {
            let writer = VcdWriter::new(path).map_err(|e| {
                Error::InvalidConfig(format!("can't create {}: {}", path.display(), e))
            })?;
            sim.trace_vcd(writer);
        }

        Ok(Self {
            config,
            sim,
            control,
            s_axis,
            m_axis,
            source,
            sink,
            fifo,
            source_pauser,
            sink_pauser,
        })
    }

    /// Traces every signal to `writer` from now on.
    pub fn trace_vcd(&mut self, writer: VcdWriter) {
        self.sim.trace_vcd(writer);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn signals(&self) -> &SignalBank {
        self.sim.signals()
    }

    pub fn control(&self) -> Control {
        self.control
    }

    pub fn s_axis(&self) -> &AxisBus {
        &self.s_axis
    }

    pub fn m_axis(&self) -> &AxisBus {
        &self.m_axis
    }

    pub fn source(&self) -> Ref<'_, AxisSource> {
        self.source.borrow()
    }

    pub fn sink(&self) -> Ref<'_, AxisSink> {
        self.sink.borrow()
    }

    pub fn fifo(&self) -> Ref<'_, AxisFifo> {
        self.fifo.borrow()
    }

    pub fn time(&self) -> u64 {
        self.sim.time()
    }

    pub fn cycles(&self) -> Cycle {
        self.sim.cycles()
    }

    /// Brings the bench out of power-up: settle, pulse both resets, settle
    /// again.
    pub fn start(&mut self) -> Result<(), Error> {
        self.delay(SETTLE_TIME)?;
        self.posedge()?;
        self.reset()?;
        self.posedge()?;
        self.delay(SETTLE_TIME)?;
        self.posedges(2)
    }

    /// Starts scenario `number` on the next edge.
    pub fn begin_test(&mut self, number: u64, name: &str) -> Result<(), Error> {
        self.posedge()?;
        info!("test {}: {}", number, name);
        self.sim
            .signals_mut()
            .force(self.control.current_test, number);
        Ok(())
    }

    pub fn posedge(&mut self) -> Result<(), Error> {
        self.sim.advance_edge()
    }

    pub fn posedges(&mut self, count: usize) -> Result<(), Error> {
        self.sim.posedges(count)
    }

    pub fn delay(&mut self, units: u64) -> Result<(), Error> {
        self.sim.delay(units)
    }

    pub fn send(&mut self, frame: &Frame) -> Result<(), Error> {
        self.source.borrow_mut().enqueue(frame)
    }

    /// Runs until the sink holds a frame, for at most the configured number
    /// of edges.
    pub fn wait(&mut self) -> Result<(), Error> {
        let cycles = AxisSink::wait(&self.sink, &mut self.sim, self.config.sim.max_wait_cycles)?;
        debug!("waited {} cycles for a frame", cycles);
        Ok(())
    }

    pub fn recv(&mut self) -> Result<Frame, Error> {
        self.sink.borrow_mut().recv()
    }

    /// Waits for the next frame and checks it against `frame`, as `frame`
    /// looks after crossing the configured bus. Returns the received frame.
    pub fn expect(&mut self, frame: &Frame) -> Result<Frame, Error> {
        self.wait()?;
        let received = self.recv()?;
        let expected = self.config.bus.conform(frame);
        if received != expected {
            return Err(Error::FrameMismatch { expected, received });
        }
        Ok(received)
    }

    /// Whether the sink holds neither complete nor partial frames.
    pub fn empty(&self) -> bool {
        self.sink.borrow().empty()
    }

    pub fn expect_empty(&self) -> Result<(), Error> {
        if self.empty() {
            Ok(())
        } else {
            Err(Error::Expectation(format!(
                "sink holds {} frame(s) or a partial frame",
                self.sink.borrow().queued()
            )))
        }
    }

    /// Whether a beat is presented on either bus.
    pub fn in_flight(&self) -> bool {
        let signals = self.sim.signals();
        signals.get(self.s_axis.tvalid) || signals.get(self.m_axis.tvalid)
    }

    fn force(&mut self, signal: Signal<bool>, value: bool) {
        debug!("{} <= {}", self.sim.signals().name(signal), value);
        self.sim.signals_mut().force(signal, value);
    }

    pub fn set_dut_reset(&mut self, value: bool) {
        self.force(self.control.dut_reset, value);
    }

    pub fn set_tb_reset(&mut self, value: bool) {
        self.force(self.control.tb_reset, value);
    }

    /// Holds both resets for one edge.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.set_dut_reset(true);
        self.set_tb_reset(true);
        self.posedge()?;
        self.set_dut_reset(false);
        self.set_tb_reset(false);
        Ok(())
    }

    pub fn set_source_pause(&mut self, value: bool) {
        self.force(self.control.source_pause, value);
    }

    pub fn set_sink_pause(&mut self, value: bool) {
        self.force(self.control.sink_pause, value);
    }

    /// Hands the source pause line to a generator; `PausePattern::Off`
    /// releases it on the next edge and hands it back.
    pub fn set_source_pause_pattern(&mut self, pattern: PausePattern) -> Result<(), Error> {
        self.source_pauser.borrow_mut().set_pattern(pattern)
    }

    pub fn set_sink_pause_pattern(&mut self, pattern: PausePattern) -> Result<(), Error> {
        self.sink_pauser.borrow_mut().set_pattern(pattern)
    }

    /// Toggles the source pause (two edges, release, one edge, pause, one
    /// edge) while a beat is in flight, then releases it.
    pub fn jitter_source(&mut self) -> Result<(), Error> {
        let start = self.cycles();
        while self.in_flight() {
            self.check_bound(start)?;
            self.posedges(2)?;
            self.set_source_pause(false);
            self.posedge()?;
            self.set_source_pause(true);
            self.posedge()?;
        }
        self.set_source_pause(false);
        Ok(())
    }

    /// Toggles the sink pause (pause, three edges, release, one edge) while
    /// a beat is in flight.
    pub fn jitter_sink(&mut self) -> Result<(), Error> {
        let start = self.cycles();
        while self.in_flight() {
            self.check_bound(start)?;
            self.set_sink_pause(true);
            self.posedges(3)?;
            self.set_sink_pause(false);
            self.posedge()?;
        }
        Ok(())
    }

    fn check_bound(&self, start: Cycle) -> Result<(), Error> {
        let limit = self.config.sim.max_wait_cycles;
        if self.cycles() - start >= limit {
            return Err(Error::Timeout(limit));
        }
        Ok(())
    }
}
