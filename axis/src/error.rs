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

use std::fmt;

use crate::{Cycle, Frame};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// `recv` was called with nothing in the retrieval queue.
    EmptyQueue,
    /// A bounded wait ran for the given number of edges without its
    /// condition becoming true.
    Timeout(Cycle),
    InvalidConfig(String),
    InvalidFrame(String),
    /// A second process tried to drive a signal that already has a driver.
    MultipleDrivers(String),
    /// `tid` changed between beats of one frame.
    IdChanged {
        bus: String,
        expected: u64,
        found: u64,
    },
    /// `tdest` changed between beats of one frame.
    DestChanged {
        bus: String,
        expected: u64,
        found: u64,
    },
    /// A non-final beat was transferred with an all-zero keep mask.
    EmptyKeep(String),
    FrameMismatch {
        expected: Frame,
        received: Frame,
    },
    Expectation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EmptyQueue => write!(f, "ERROR: receive from an empty queue"),
            Self::Timeout(cycles) => write!(f, "ERROR: timed out after {} cycles", cycles),
            Self::InvalidConfig(msg) => write!(f, "ERROR: invalid configuration: {}", msg),
            Self::InvalidFrame(msg) => write!(f, "ERROR: invalid frame: {}", msg),
            Self::MultipleDrivers(signal) => {
                write!(f, "ERROR: signal {} has more than one driver", signal)
            }
            Self::IdChanged {
                bus,
                expected,
                found,
            } => write!(
                f,
                "ERROR: {}: tid changed mid-frame ({:#x} -> {:#x})",
                bus, expected, found
            ),
            Self::DestChanged {
                bus,
                expected,
                found,
            } => write!(
                f,
                "ERROR: {}: tdest changed mid-frame ({:#x} -> {:#x})",
                bus, expected, found
            ),
            Self::EmptyKeep(bus) => {
                write!(f, "ERROR: {}: non-final beat without any kept byte", bus)
            }
            Self::FrameMismatch { expected, received } => write!(
                f,
                "ERROR: frame mismatch\n  expected: {:?}\n  received: {:?}",
                expected, received
            ),
            Self::Expectation(msg) => write!(f, "ERROR: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
