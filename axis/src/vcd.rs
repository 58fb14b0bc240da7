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

use crate::signal::{Entry, SignalBank, Value};
use bitvec::prelude::*;
use chrono;
use itertools::Itertools;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use vcd;

pub const DEFAULT_TOP_MODULE: &str = "testbench";
const DEFAULT_VCD_HEADER: &str = "axis VCD";
const CLOCK_NAME: &str = "clk";

/// Writes the signals of a simulation as a value change dump.
///
/// The first I/O error is logged and latches the writer into an error
/// state; after that every call is a no-op, so a broken trace never stops
/// a simulation.
pub struct VcdWriter {
    writer: vcd::Writer<Box<dyn Write>>,
    is_error_state: bool,
    clock: Option<vcd::IdCode>,
    /// id code of every traced signal, by signal index.
    id_map: HashMap<usize, vcd::IdCode>,
    last_value_map: HashMap<vcd::IdCode, Value>,
}

// TODO(pouyad) Add options to filter which signals will be traced.
impl VcdWriter {
    pub fn new(dst: &Path) -> io::Result<Self> {
        let dst_file = fs::File::create(dst)?;
        log::debug!("VCD file: {}", dst.display());
        Ok(Self::from_writer(Box::new(io::BufWriter::new(dst_file))))
    }

    pub fn from_writer(writer: Box<dyn Write>) -> Self {
        Self {
            writer: vcd::Writer::new(writer),
            is_error_state: false,
            clock: None,
            id_map: HashMap::new(),
            last_value_map: HashMap::new(),
        }
    }

    fn vcd_error_handler(&mut self, err: io::Error) {
        if !self.is_error_state {
            self.is_error_state = true;
            log::error!("VCD writing failed with error {:?}", err)
        }
    }

    /// Declares the clock and every signal of `signals`, one module per
    /// signal scope, and dumps their current values at time 0.
    pub fn write_header(&mut self, signals: &SignalBank) {
        if self.is_error_state {
            return;
        }
        self._write_header(signals)
            .unwrap_or_else(|err| self.vcd_error_handler(err));
    }

    fn _write_header(&mut self, signals: &SignalBank) -> io::Result<()> {
        self.writer.comment(DEFAULT_VCD_HEADER)?;
        self.writer.date(chrono::Utc::now().to_string().as_str())?;
        self.writer.timescale(1, vcd::TimescaleUnit::NS)?;
        self.writer.add_module(DEFAULT_TOP_MODULE)?;
        self.clock = Some(
            self.writer
                .add_var(vcd::VarType::Wire, 1, CLOCK_NAME, None)?,
        );
        let scopes = signals
            .entries()
            .iter()
            .enumerate()
            .sorted_by_key(|(_, entry)| entry.scope.clone())
            .group_by(|(_, entry)| entry.scope.clone());
        for (scope, group) in &scopes {
            self.writer.add_module(&scope)?;
            for (index, entry) in group {
                let id_code = self.writer.add_var(
                    vcd::VarType::Wire,
                    entry.width as u32,
                    &entry.name,
                    None,
                )?;
                self.id_map.insert(index, id_code);
            }
            self.writer.upscope()?;
        }
        self.writer.upscope()?;
        self.writer.enddefinitions()?;

        self.writer.timestamp(0)?;
        self.writer.begin(vcd::SimulationCommand::Dumpvars)?;
        if let Some(clock) = self.clock {
            self.writer.change_scalar(clock, vcd::Value::V0)?;
        }
        for (index, entry) in signals.entries().iter().enumerate() {
            self._record_change(index, entry)?;
        }
        self.writer.end()
    }

    /// Records a rising edge at `time` with the values committed by it, and
    /// the falling edge half a period later.
    pub fn record_edge(&mut self, time: u64, half_period: u64, signals: &SignalBank) {
        if self.is_error_state {
            return;
        }
        self._record_edge(time, half_period, signals)
            .unwrap_or_else(|err| self.vcd_error_handler(err));
    }

    fn _record_edge(&mut self, time: u64, half_period: u64, signals: &SignalBank) -> io::Result<()> {
        self.writer.timestamp(time)?;
        if let Some(clock) = self.clock {
            self.writer.change_scalar(clock, vcd::Value::V1)?;
        }
        for (index, entry) in signals.entries().iter().enumerate() {
            self._record_change(index, entry)?;
        }
        self.writer.timestamp(time + half_period)?;
        if let Some(clock) = self.clock {
            self.writer.change_scalar(clock, vcd::Value::V0)?;
        }
        Ok(())
    }

    fn _record_change(&mut self, index: usize, entry: &Entry) -> io::Result<()> {
        let id_code = match self.id_map.get(&index) {
            Some(id_code) => *id_code,
            None => {
                log::warn!(
                    "No such signal {}.{} was declared for VCD dumps.",
                    entry.scope,
                    entry.name
                );
                return Ok(());
            }
        };
        if let Some(last_value) = self.last_value_map.get(&id_code) {
            if *last_value == entry.value {
                return Ok(());
            }
        }
        // vectors are written most significant bit first.
        let bits: Vec<vcd::Value> = match &entry.value {
            Value::Bit(bit) => {
                self.writer.change_scalar(id_code, *bit)?;
                self.last_value_map.insert(id_code, entry.value.clone());
                return Ok(());
            }
            Value::Word(word) => word.view_bits::<Lsb0>()[..entry.width]
                .iter()
                .by_vals()
                .rev()
                .map(vcd::Value::from)
                .collect(),
            Value::Bytes(bytes) => bytes
                .view_bits::<Lsb0>()
                .iter()
                .by_vals()
                .rev()
                .map(vcd::Value::from)
                .collect(),
            Value::Mask(mask) => mask.iter().by_vals().rev().map(vcd::Value::from).collect(),
        };
        self.writer.change_vector(id_code, bits.as_slice())?;
        self.last_value_map.insert(id_code, entry.value.clone());
        Ok(())
    }
}
