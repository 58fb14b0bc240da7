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

use crate::signal::{Edge, Mask, Signal, SignalBank};
use crate::{BusConfig, Error};
use bitvec::prelude::*;

/// One transfer's worth of forward-channel values.
#[derive(Clone, Debug, PartialEq)]
pub struct Beat {
    pub data: Vec<u8>,
    pub keep: Mask,
    pub last: bool,
    pub id: u64,
    pub dest: u64,
    pub user: u64,
}

impl Beat {
    /// The bytes of `data` marked by `keep`.
    pub fn kept_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.data
            .iter()
            .zip(self.keep.iter().by_vals())
            .filter(|(_, keep)| *keep)
            .map(|(byte, _)| *byte)
    }
}

/// Handles to the signals of one streaming bus.
///
/// Fields the configuration disables are `None` and are never declared, so
/// endpoints decide what to drive once, when they are built.
#[derive(Clone, Copy, Debug)]
pub struct AxisBus {
    pub tdata: Signal<Vec<u8>>,
    pub tkeep: Option<Signal<Mask>>,
    pub tvalid: Signal<bool>,
    pub tready: Signal<bool>,
    pub tlast: Signal<bool>,
    pub tid: Option<Signal<u64>>,
    pub tdest: Option<Signal<u64>>,
    pub tuser: Option<Signal<u64>>,
    lanes: usize,
}

impl AxisBus {
    /// Declares the signals of a bus named `scope`.
    pub fn new(signals: &mut SignalBank, scope: &str, config: &BusConfig) -> Result<Self, Error> {
        config.validate()?;
        let lanes = config.bytes_per_beat();
        Ok(Self {
            tdata: signals.bytes(scope, "tdata", lanes),
            tkeep: config
                .keep_enable
                .then(|| signals.mask(scope, "tkeep", lanes)),
            tvalid: signals.bit(scope, "tvalid"),
            tready: signals.bit(scope, "tready"),
            tlast: signals.bit(scope, "tlast"),
            tid: config
                .id_enable
                .then(|| signals.word(scope, "tid", config.id_width)),
            tdest: config
                .dest_enable
                .then(|| signals.word(scope, "tdest", config.dest_width)),
            tuser: config
                .user_enable
                .then(|| signals.word(scope, "tuser", config.user_width)),
            lanes,
        })
    }

    /// Committed state of every signal of the bus.
    pub fn sample(&self, signals: &SignalBank) -> BusState {
        let word = |signal: Option<Signal<u64>>| signal.map_or(0, |s| signals.get(s));
        BusState {
            beat: Beat {
                data: signals.get(self.tdata),
                keep: self
                    .tkeep
                    .map_or_else(|| BitVec::repeat(true, self.lanes), |s| signals.get(s)),
                last: signals.get(self.tlast),
                id: word(self.tid),
                dest: word(self.tdest),
                user: word(self.tuser),
            },
            valid: signals.get(self.tvalid),
            ready: signals.get(self.tready),
        }
    }

    /// Stages `beat` on the forward channel with `tvalid` asserted.
    pub fn drive_beat(&self, edge: &mut Edge, beat: &Beat) -> Result<(), Error> {
        edge.next(self.tdata, beat.data.clone())?;
        if let Some(tkeep) = self.tkeep {
            edge.next(tkeep, beat.keep.clone())?;
        }
        edge.next(self.tlast, beat.last)?;
        for (signal, value) in [
            (self.tid, beat.id),
            (self.tdest, beat.dest),
            (self.tuser, beat.user),
        ] {
            if let Some(signal) = signal {
                edge.next(signal, value)?;
            }
        }
        edge.next(self.tvalid, true)
    }

    /// Stages an idle forward channel. Data lines keep their last value.
    pub fn drive_idle(&self, edge: &mut Edge) -> Result<(), Error> {
        edge.next(self.tvalid, false)?;
        edge.next(self.tlast, false)
    }
}

/// Snapshot of a bus at one edge.
#[derive(Clone, Debug, PartialEq)]
pub struct BusState {
    pub beat: Beat,
    pub valid: bool,
    pub ready: bool,
}

impl BusState {
    /// A beat moves iff both sides agree at the edge.
    pub fn transfer(&self) -> bool {
        self.valid && self.ready
    }
}
