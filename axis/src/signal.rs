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

//! Signals shared between clocked processes.
//!
//! Every signal has a committed value, which is what anybody reads, and at
//! most one staged value, which a process writes during the drive phase of
//! an edge. Staged values become visible all at once when the scheduler
//! commits the edge, so no process ever observes another process's output
//! from the same edge.

use crate::Error;
use bitvec::prelude::*;
use std::fmt;
use std::marker::PhantomData;

/// Per-byte validity mask of a beat.
pub type Mask = BitVec<u8, Lsb0>;

/// Index of a process in the scheduler, used to enforce single drivers.
pub type DriverId = usize;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bit(bool),
    Word(u64),
    Bytes(Vec<u8>),
    Mask(Mask),
}

/// Types that can be carried by a signal.
pub trait SignalType: Clone {
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Self;
}

impl SignalType for bool {
    fn into_value(self) -> Value {
        Value::Bit(self)
    }
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Bit(bit) => *bit,
            _ => unreachable!("signal handle type does not match its value"),
        }
    }
}

impl SignalType for u64 {
    fn into_value(self) -> Value {
        Value::Word(self)
    }
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Word(word) => *word,
            _ => unreachable!("signal handle type does not match its value"),
        }
    }
}

impl SignalType for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Bytes(self)
    }
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Bytes(bytes) => bytes.clone(),
            _ => unreachable!("signal handle type does not match its value"),
        }
    }
}

impl SignalType for Mask {
    fn into_value(self) -> Value {
        Value::Mask(self)
    }
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Mask(mask) => mask.clone(),
            _ => unreachable!("signal handle type does not match its value"),
        }
    }
}

/// Typed handle to a signal in a [`SignalBank`].
///
/// Handles are only created by the bank, so the type parameter always
/// matches the stored value.
pub struct Signal<T> {
    index: usize,
    _marker: PhantomData<T>,
}

// derive would require T: Copy.
impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Signal<T> {}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({})", self.index)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub scope: String,
    pub name: String,
    /// width in bits.
    pub width: usize,
    pub value: Value,
    staged: Option<Value>,
    driver: Option<DriverId>,
}

impl Entry {
    /// Truncates words to the declared width, the way a wire would.
    fn fit(&self, value: Value) -> Value {
        match value {
            Value::Word(word) if self.width < 64 => Value::Word(word & ((1u64 << self.width) - 1)),
            value => value,
        }
    }
}

/// All signals of a simulation.
#[derive(Clone, Debug, Default)]
pub struct SignalBank {
    entries: Vec<Entry>,
}

impl SignalBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn declare<T: SignalType>(&mut self, scope: &str, name: &str, width: usize, init: T) -> Signal<T> {
        let index = self.entries.len();
        self.entries.push(Entry {
            scope: scope.to_string(),
            name: name.to_string(),
            width,
            value: init.into_value(),
            staged: None,
            driver: None,
        });
        Signal {
            index,
            _marker: PhantomData,
        }
    }

    pub fn bit(&mut self, scope: &str, name: &str) -> Signal<bool> {
        self.declare(scope, name, 1, false)
    }

    pub fn word(&mut self, scope: &str, name: &str, width: usize) -> Signal<u64> {
        self.declare(scope, name, width, 0u64)
    }

    pub fn bytes(&mut self, scope: &str, name: &str, lanes: usize) -> Signal<Vec<u8>> {
        self.declare(scope, name, lanes * 8, vec![0u8; lanes])
    }

    pub fn mask(&mut self, scope: &str, name: &str, width: usize) -> Signal<Mask> {
        self.declare(scope, name, width, BitVec::repeat(false, width))
    }

    /// Committed value of `signal`.
    pub fn get<T: SignalType>(&self, signal: Signal<T>) -> T {
        T::from_value(&self.entries[signal.index].value)
    }

    /// Publishes `value` right away, outside of any edge.
    ///
    /// This is how the orchestrator drives resets and pauses between
    /// edges; clocked processes stage their outputs instead.
    pub fn force<T: SignalType>(&mut self, signal: Signal<T>, value: T) {
        let entry = &mut self.entries[signal.index];
        entry.value = entry.fit(value.into_value());
    }

    pub(crate) fn stage<T: SignalType>(
        &mut self,
        signal: Signal<T>,
        value: T,
        driver: DriverId,
    ) -> Result<(), Error> {
        let entry = &mut self.entries[signal.index];
        match entry.driver {
            Some(owner) if owner != driver => {
                return Err(Error::MultipleDrivers(format!("{}.{}", entry.scope, entry.name)))
            }
            _ => entry.driver = Some(driver),
        }
        let value = entry.fit(value.into_value());
        if cfg!(feature = "trace-signal-staging") {
            log::trace!("stage {}.{} <= {:?}", entry.scope, entry.name, value);
        }
        entry.staged = Some(value);
        Ok(())
    }

    /// Publishes every staged value.
    pub(crate) fn commit(&mut self) {
        for entry in self.entries.iter_mut() {
            if let Some(value) = entry.staged.take() {
                entry.value = value;
            }
        }
    }

    /// Drops staged values of an edge that failed.
    pub(crate) fn discard_staged(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.staged = None;
        }
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Fully qualified name of `signal`, for messages.
    pub fn name<T>(&self, signal: Signal<T>) -> String {
        let entry = &self.entries[signal.index];
        format!("{}.{}", entry.scope, entry.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A process's view of the signals during the drive phase of one edge:
/// reads see committed values, writes are staged.
pub struct Edge<'a> {
    signals: &'a mut SignalBank,
    driver: DriverId,
}

impl<'a> Edge<'a> {
    pub(crate) fn new(signals: &'a mut SignalBank, driver: DriverId) -> Self {
        Self { signals, driver }
    }

    pub fn get<T: SignalType>(&self, signal: Signal<T>) -> T {
        self.signals.get(signal)
    }

    /// Committed state of every signal.
    pub fn signals(&self) -> &SignalBank {
        &*self.signals
    }

    /// Stages `value` to be published at the end of this edge.
    pub fn next<T: SignalType>(&mut self, signal: Signal<T>, value: T) -> Result<(), Error> {
        self.signals.stage(signal, value, self.driver)
    }
}
