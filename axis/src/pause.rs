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

use crate::signal::{Edge, Signal};
use crate::sim::Clocked;
use crate::Error;
use rand::Rng;
use rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

pub const DEFAULT_SEED: u64 = 0;

/// How a [`PauseGenerator`] drives its pause line.
#[derive(Clone, Debug, PartialEq)]
pub enum PausePattern {
    /// Release the line on the next edge, then leave it alone.
    Off,
    /// Cycle through the given values, one per edge.
    Scripted(Vec<bool>),
    /// Pause on each edge with the given probability.
    Random { probability: f64, seed: u64 },
}

impl PausePattern {
    /// Paused for `on` edges, then released for `off` edges.
    pub fn duty(on: usize, off: usize) -> Self {
        Self::Scripted(
            std::iter::repeat(true)
                .take(on)
                .chain(std::iter::repeat(false).take(off))
                .collect(),
        )
    }

    pub fn random(probability: f64) -> Self {
        Self::Random {
            probability,
            seed: DEFAULT_SEED,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Scripted(values) if values.is_empty() => Err(Error::InvalidConfig(
                "a scripted pause pattern needs at least one value".to_string(),
            )),
            Self::Random { probability, .. } if !(0.0..=1.0).contains(probability) => {
                Err(Error::InvalidConfig(format!(
                    "pause probability {} is not in [0, 1]",
                    probability
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Drives an endpoint's pause line from a [`PausePattern`] to inject
/// backpressure. Random patterns are seeded, so runs are reproducible.
pub struct PauseGenerator {
    name: String,
    pause: Signal<bool>,
    pattern: PausePattern,
    step: usize,
    /// drive the line low once, after an active pattern was turned off.
    release: bool,
    rng: Xoshiro256StarStar,
}

impl PauseGenerator {
    pub fn new(name: &str, pause: Signal<bool>) -> Self {
        Self {
            name: name.to_string(),
            pause,
            pattern: PausePattern::Off,
            step: 0,
            release: false,
            rng: Xoshiro256StarStar::seed_from_u64(DEFAULT_SEED),
        }
    }

    /// Restarts the generator with `pattern`.
    pub fn set_pattern(&mut self, pattern: PausePattern) -> Result<(), Error> {
        pattern.validate()?;
        log::debug!("{}: pause pattern {:?}", self.name, pattern);
        if let PausePattern::Random { seed, .. } = pattern {
            self.rng = Xoshiro256StarStar::seed_from_u64(seed);
        }
        self.release =
            pattern == PausePattern::Off && (self.release || self.pattern != PausePattern::Off);
        self.pattern = pattern;
        self.step = 0;
        Ok(())
    }

    pub fn pattern(&self) -> &PausePattern {
        &self.pattern
    }
}

impl Clocked for PauseGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_edge(&mut self, edge: &mut Edge) -> Result<(), Error> {
        let pause = match &self.pattern {
            PausePattern::Off if self.release => {
                self.release = false;
                return edge.next(self.pause, false);
            }
            PausePattern::Off => return Ok(()),
            PausePattern::Scripted(values) => values[self.step % values.len()],
            PausePattern::Random { probability, .. } => self.rng.gen_bool(*probability),
        };
        self.step += 1;
        edge.next(self.pause, pause)
    }
}
