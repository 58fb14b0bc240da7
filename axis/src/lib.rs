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

mod bus;
mod config;
mod error;
mod frame;
mod hw;
mod pause;
mod signal;
mod sim;
mod sink;
mod source;
mod testbench;
mod vcd;

// the FIFO test catalogue
pub mod scenarios;

// Public types
// type to use for cycles
pub type Cycle = usize;

pub use crate::bus::{AxisBus, Beat, BusState};
pub use crate::config::{BusConfig, Config, FifoConfig, SimConfig, CLOCK_PERIOD};
pub use crate::error::Error;
pub use crate::frame::Frame;
pub use crate::hw::AxisFifo;
pub use crate::pause::{PauseGenerator, PausePattern};
pub use crate::signal::{Edge, Mask, Signal, SignalBank, SignalType, Value};
pub use crate::sim::{Clock, Clocked, Simulator};
pub use crate::sink::AxisSink;
pub use crate::source::AxisSource;
pub use crate::testbench::{Control, Testbench, SETTLE_TIME};
pub use crate::vcd::VcdWriter;
