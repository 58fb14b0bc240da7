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

use crate::bus::Beat;
use crate::signal::Mask;
use crate::{BusConfig, Error};
use bitvec::prelude::*;
use itertools::Itertools;
use std::fmt;

/// A length-delimited, tagged sequence of bytes: the unit both endpoints
/// transfer.
///
/// Frames are immutable once built. Two frames are equal when their
/// payload, `id`, `dest` and last-beat user value match; user values of
/// earlier beats are carried along but not compared.
#[derive(Clone, Default)]
pub struct Frame {
    payload: Vec<u8>,
    id: u64,
    dest: u64,
    /// one user value per beat, if the sender cares about more than the
    /// last one.
    user: Option<Vec<u64>>,
    /// overrides the user value of the final beat.
    last_cycle_user: Option<u64>,
}

impl Frame {
    pub fn new<P: Into<Vec<u8>>>(payload: P) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn with_id(self, id: u64) -> Self {
        Self { id, ..self }
    }

    pub fn with_dest(self, dest: u64) -> Self {
        Self { dest, ..self }
    }

    pub fn with_user(self, user: Vec<u64>) -> Self {
        Self {
            user: Some(user),
            ..self
        }
    }

    pub fn with_last_cycle_user(self, user: u64) -> Self {
        Self {
            last_cycle_user: Some(user),
            ..self
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn dest(&self) -> u64 {
        self.dest
    }

    pub fn user(&self) -> Option<&[u64]> {
        self.user.as_deref()
    }

    /// The user value accompanying the final beat.
    pub fn last_cycle_user(&self) -> u64 {
        self.last_cycle_user
            .or_else(|| self.user.as_ref().and_then(|user| user.last().copied()))
            .unwrap_or(0)
    }

    /// Checks that this frame can be carried by a bus configured as
    /// `config`.
    pub fn validate(&self, config: &BusConfig) -> Result<(), Error> {
        config.validate()?;
        let beats = config.beat_count(self.payload.len());
        if let Some(user) = &self.user {
            if user.len() != beats {
                return Err(Error::InvalidFrame(format!(
                    "{} user values for a {}-beat frame",
                    user.len(),
                    beats
                )));
            }
        }
        if self.payload.is_empty() && !config.keep_enable {
            return Err(Error::InvalidFrame(
                "an empty frame needs a keep-enabled bus".to_string(),
            ));
        }
        Ok(())
    }

    /// Splits the payload into beats for a bus configured as `config`.
    ///
    /// Every beat but the last one is full; the last one keeps only the
    /// bytes that belong to the frame, the remaining lanes are zero.
    pub fn beats(&self, config: &BusConfig) -> Result<Vec<Beat>, Error> {
        self.validate(config)?;
        let lanes = config.bytes_per_beat();
        let count = config.beat_count(self.payload.len());
        let beats = (0..count)
            .map(|index| {
                let start = std::cmp::min(index * lanes, self.payload.len());
                let end = std::cmp::min(start + lanes, self.payload.len());
                let mut data = self.payload[start..end].to_vec();
                let mut keep: Mask = BitVec::repeat(true, data.len());
                data.resize(lanes, 0);
                keep.resize(lanes, false);
                let last = index + 1 == count;
                let user = if last {
                    self.last_cycle_user()
                } else {
                    self.user
                        .as_ref()
                        .map_or(0, |user| user[index])
                };
                Beat {
                    data,
                    keep,
                    last,
                    id: self.id,
                    dest: self.dest,
                    user,
                }
            })
            .collect();
        Ok(beats)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Frame) -> bool {
        self.payload == other.payload
            && self.id == other.id
            && self.dest == other.dest
            && self.last_cycle_user() == other.last_cycle_user()
    }
}
impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame(id={:#x}, dest={:#x}, last_cycle_user={}, len={}, payload={})",
            self.id,
            self.dest,
            self.last_cycle_user(),
            self.payload.len(),
            self.payload.iter().map(|b| format!("{:02x}", b)).join("")
        )
    }
}
