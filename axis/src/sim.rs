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

use crate::signal::{Edge, SignalBank};
use crate::vcd::VcdWriter;
use crate::{Cycle, Error};
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;

mod clock;
pub use clock::Clock;

/// A process that runs on every rising edge.
///
/// During `on_edge` a process reads committed signal values and stages its
/// outputs through `edge`; nothing it stages is visible to any process
/// (itself included) before the edge commits.
pub trait Clocked {
    fn name(&self) -> &str;

    fn on_edge(&mut self, edge: &mut Edge) -> Result<(), Error>;
}

/// Single-threaded, cooperative cycle simulator.
///
/// The caller is the orchestrating process: it owns time and hands it to
/// the clocked processes one edge at a time. Each edge runs in two phases,
/// all processes drive and then all staged outputs commit, so the result
/// does not depend on the order processes were added in.
pub struct Simulator {
    clock: Clock,
    signals: SignalBank,
    processes: Vec<Rc<RefCell<dyn Clocked>>>,
    vcd: Option<VcdWriter>,
}

impl Simulator {
    pub fn new(clock_period: u64) -> Result<Self, Error> {
        Ok(Self {
            clock: Clock::new(clock_period)?,
            signals: SignalBank::new(),
            processes: vec![],
            vcd: None,
        })
    }

    pub fn signals(&self) -> &SignalBank {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut SignalBank {
        &mut self.signals
    }

    pub fn time(&self) -> u64 {
        self.clock.time()
    }

    pub fn cycles(&self) -> Cycle {
        self.clock.cycles()
    }

    /// Registers `process`; the caller may keep its own handle to it.
    pub fn add_process<P: Clocked + 'static>(&mut self, process: Rc<RefCell<P>>) {
        log::debug!("adding process {}", process.borrow().name());
        self.processes.push(process);
    }

    /// Dumps every signal declared so far to `writer`, starting now.
    pub fn trace_vcd(&mut self, mut writer: VcdWriter) {
        writer.write_header(&self.signals);
        self.vcd = Some(writer);
    }

    /// Runs one rising edge: drive phase for every process, then commit.
    pub fn advance_edge(&mut self) -> Result<(), Error> {
        let time = self.clock.rise();
        trace!("edge {} at t={}", self.clock.cycles(), time);
        for (driver, process) in self.processes.iter().enumerate() {
            let result = process
                .borrow_mut()
                .on_edge(&mut Edge::new(&mut self.signals, driver));
            if let Err(err) = result {
                log::debug!(
                    "process {} failed at t={}: {}",
                    process.borrow().name(),
                    time,
                    err
                );
                self.signals.discard_staged();
                return Err(err);
            }
        }
        self.signals.commit();
        if let Some(vcd) = self.vcd.as_mut() {
            vcd.record_edge(time, self.clock.half_period(), &self.signals);
        }
        Ok(())
    }

    pub fn posedges(&mut self, count: usize) -> Result<(), Error> {
        (0..count).try_for_each(|_| self.advance_edge())
    }

    /// Lets `units` of time pass. The clock keeps running: every edge that
    /// falls strictly inside the delay happens.
    pub fn delay(&mut self, units: u64) -> Result<(), Error> {
        let target = self.clock.time() + units;
        while self.clock.next_edge() < target {
            self.advance_edge()?;
        }
        self.clock.advance_to(target);
        Ok(())
    }

    /// Runs edges until `done` holds, checking before every edge. Returns
    /// the number of edges it took.
    pub fn run_until<F>(&mut self, mut done: F, limit: Cycle) -> Result<Cycle, Error>
    where
        F: FnMut(&Simulator) -> bool,
    {
        let mut cycles = 0;
        while !done(self) {
            if cycles == limit {
                return Err(Error::Timeout(limit));
            }
            self.advance_edge()?;
            cycles += 1;
        }
        Ok(cycles)
    }
}
