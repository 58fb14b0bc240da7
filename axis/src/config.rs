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

use crate::{Cycle, Error, Frame};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default clock period in time units; the clock toggles every half period.
pub const CLOCK_PERIOD: u64 = 8;

/// How many edges a bounded wait runs before giving up.
const MAX_WAIT_CYCLES: Cycle = 100_000;

/// Capabilities of one streaming bus.
///
/// Both sides of the DUT share the same bus configuration. Optional fields
/// that are disabled are not declared as signals at all, and read back as 0.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    /// datapath width in bits; a multiple of 8.
    pub data_width: usize,
    pub keep_enable: bool,
    pub id_enable: bool,
    pub id_width: usize,
    pub dest_enable: bool,
    pub dest_width: usize,
    pub user_enable: bool,
    pub user_width: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            data_width: 8,
            keep_enable: false,
            id_enable: true,
            id_width: 8,
            dest_enable: true,
            dest_width: 8,
            user_enable: true,
            user_width: 1,
        }
    }
}

fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl BusConfig {
    /// A bus `bytes` lanes wide, with keep enabled whenever there is more
    /// than one lane.
    pub fn with_bytes(bytes: usize) -> Self {
        Self {
            data_width: bytes * 8,
            keep_enable: bytes > 1,
            ..Default::default()
        }
    }

    pub fn bytes_per_beat(&self) -> usize {
        self.data_width / 8
    }

    /// Number of beats needed to carry `len` bytes. An empty frame still
    /// takes one beat (with nothing kept).
    pub(crate) fn beat_count(&self, len: usize) -> usize {
        std::cmp::max(1, num::integer::div_ceil(len, self.bytes_per_beat()))
    }

    pub fn id_mask(&self) -> u64 {
        if self.id_enable {
            width_mask(self.id_width)
        } else {
            0
        }
    }

    pub fn dest_mask(&self) -> u64 {
        if self.dest_enable {
            width_mask(self.dest_width)
        } else {
            0
        }
    }

    pub fn user_mask(&self) -> u64 {
        if self.user_enable {
            width_mask(self.user_width)
        } else {
            0
        }
    }

    /// What `frame` looks like after a trip over this bus: disabled fields
    /// read back as 0 and enabled ones are truncated to their width.
    pub fn conform(&self, frame: &Frame) -> Frame {
        let mut conformed = Frame::new(frame.payload().to_vec())
            .with_id(frame.id() & self.id_mask())
            .with_dest(frame.dest() & self.dest_mask());
        if let Some(user) = frame.user() {
            conformed = conformed.with_user(user.iter().map(|u| u & self.user_mask()).collect());
        }
        conformed.with_last_cycle_user(frame.last_cycle_user() & self.user_mask())
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.data_width == 0 || self.data_width % 8 != 0 {
            return Err(Error::InvalidConfig(format!(
                "data_width must be a non-zero multiple of 8, got {}",
                self.data_width
            )));
        }
        if self.bytes_per_beat() > 1 && !self.keep_enable {
            return Err(Error::InvalidConfig(format!(
                "a {}-bit datapath needs keep_enable to carry partial beats",
                self.data_width
            )));
        }
        for (enabled, width, name) in [
            (self.id_enable, self.id_width, "id_width"),
            (self.dest_enable, self.dest_width, "dest_width"),
            (self.user_enable, self.user_width, "user_width"),
        ] {
            if enabled && !(1..=64).contains(&width) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be in 1..=64, got {}",
                    name, width
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of the streaming FIFO model used as device-under-test.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FifoConfig {
    /// depth in bytes; the FIFO holds `depth / bytes_per_beat` beats.
    pub depth: usize,
    /// only publish a frame at the output once its last beat was written.
    pub frame_fifo: bool,
    pub user_bad_frame_value: u64,
    pub user_bad_frame_mask: u64,
    /// frame mode only: drop frames whose last-beat user matches the bad
    /// frame value under the mask.
    pub drop_bad_frame: bool,
    /// frame mode only: keep accepting when full, dropping the frame.
    pub drop_when_full: bool,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            depth: 4,
            frame_fifo: false,
            user_bad_frame_value: 1,
            user_bad_frame_mask: 1,
            drop_bad_frame: false,
            drop_when_full: false,
        }
    }
}

impl FifoConfig {
    /// Capacity in beats for the given bus.
    pub(crate) fn capacity(&self, bus: &BusConfig) -> usize {
        self.depth / bus.bytes_per_beat()
    }

    pub fn validate(&self, bus: &BusConfig) -> Result<(), Error> {
        bus.validate()?;
        if self.capacity(bus) == 0 {
            return Err(Error::InvalidConfig(format!(
                "FIFO depth {} is smaller than one {}-byte beat",
                self.depth,
                bus.bytes_per_beat()
            )));
        }
        if !self.frame_fifo && (self.drop_bad_frame || self.drop_when_full) {
            log::warn!("drop_bad_frame/drop_when_full have no effect without frame_fifo");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// clock period in time units; must be even.
    pub clock_period: u64,
    /// upper bound on edges spent in any single wait.
    pub max_wait_cycles: Cycle,
    /// dump a VCD trace of every signal to this file.
    pub vcd: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clock_period: CLOCK_PERIOD,
            max_wait_cycles: MAX_WAIT_CYCLES,
            vcd: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.clock_period < 2 || self.clock_period % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "clock_period must be even and at least 2, got {}",
                self.clock_period
            )));
        }
        if self.max_wait_cycles == 0 {
            return Err(Error::InvalidConfig("max_wait_cycles must be positive".into()));
        }
        Ok(())
    }
}

/// Complete testbench configuration.
///
/// constructed programmatically or read from a YAML file; missing sections
/// and fields take the defaults above.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub fifo: FifoConfig,
    pub sim: SimConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Self, Error> {
        let file_name = file_name.as_ref();
        let file = File::open(file_name).map_err(|e| {
            Error::InvalidConfig(format!("can't open {}: {}", file_name.display(), e))
        })?;
        let config: Self = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", file_name.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.bus.validate()?;
        self.fifo.validate(&self.bus)?;
        self.sim.validate()
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(config: &str) -> Result<Self, Error> {
        let config: Self =
            serde_yaml::from_str(config).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_yaml_config() {
        let conf_str = "---
bus:
  data_width: 64
  keep_enable: true
  id_width: 4
  user_width: 2
fifo:
  depth: 64
  frame_fifo: true
  drop_bad_frame: true
sim:
  max_wait_cycles: 500
";
        let config = Config::from_str(conf_str).expect("valid config");
        assert_eq!(config.bus.bytes_per_beat(), 8);
        assert_eq!(config.bus.id_width, 4);
        // untouched fields keep their defaults
        assert_eq!(config.bus.dest_width, 8);
        assert!(config.bus.dest_enable);
        assert_eq!(config.fifo.capacity(&config.bus), 8);
        assert!(config.fifo.frame_fifo);
        assert!(!config.fifo.drop_when_full);
        assert_eq!(config.fifo.user_bad_frame_mask, 1);
        assert_eq!(config.sim.clock_period, CLOCK_PERIOD);
        assert_eq!(config.sim.max_wait_cycles, 500);
        assert_eq!(config.sim.vcd, None);
    }

    #[test]
    fn write_yaml_config() {
        let config = Config {
            bus: BusConfig::with_bytes(4),
            ..Default::default()
        };
        let text = serde_yaml::to_string(&config).unwrap();
        let back = Config::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn defaults_match_reference_bench() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.bus.data_width, 8);
        assert!(!config.bus.keep_enable);
        assert_eq!(config.fifo.depth, 4);
        assert_eq!(config.fifo.capacity(&config.bus), 4);
    }

    #[test]
    fn rejects_bad_configs() {
        let wide_without_keep = BusConfig {
            data_width: 32,
            ..Default::default()
        };
        assert!(matches!(
            wide_without_keep.validate(),
            Err(Error::InvalidConfig(_))
        ));
        let odd_width = BusConfig {
            data_width: 12,
            ..Default::default()
        };
        assert!(odd_width.validate().is_err());
        let shallow = FifoConfig {
            depth: 2,
            ..Default::default()
        };
        assert!(shallow.validate(&BusConfig::with_bytes(4)).is_err());
        let odd_clock = SimConfig {
            clock_period: 5,
            ..Default::default()
        };
        assert!(odd_clock.validate().is_err());
        assert!(Config::from_str("bus: [1, 2]").is_err());
    }

    #[test]
    fn beat_count_and_masks() {
        let bus = BusConfig::with_bytes(8);
        assert_eq!(bus.beat_count(0), 1);
        assert_eq!(bus.beat_count(8), 1);
        assert_eq!(bus.beat_count(9), 2);
        assert_eq!(bus.beat_count(270), 34);
        assert_eq!(bus.id_mask(), 0xff);
        assert_eq!(bus.user_mask(), 1);
        let no_dest = BusConfig {
            dest_enable: false,
            ..Default::default()
        };
        assert_eq!(no_dest.dest_mask(), 0);
    }

    #[test]
    fn conform_truncates_and_clears() {
        let bus = BusConfig {
            dest_enable: false,
            id_width: 4,
            ..Default::default()
        };
        let frame = Frame::new(vec![1, 2, 3])
            .with_id(0x1f)
            .with_dest(7)
            .with_last_cycle_user(3);
        let conformed = bus.conform(&frame);
        assert_eq!(conformed.id(), 0xf);
        assert_eq!(conformed.dest(), 0);
        assert_eq!(conformed.last_cycle_user(), 1);
        assert_eq!(conformed.payload(), frame.payload());
    }
}
