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

use crate::{Cycle, Error};

/// Free-running logical clock.
///
/// The clock starts low and toggles every half period, so rising edges
/// happen at `period / 2 + k * period`. Time only moves forward, either to
/// the next rising edge or to an arbitrary point before it.
#[derive(Clone, Debug)]
pub struct Clock {
    period: u64,
    time: u64,
    next_edge: u64,
    cycles: Cycle,
}

impl Clock {
    pub fn new(period: u64) -> Result<Self, Error> {
        if period < 2 || period % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "clock period must be even, got {}",
                period
            )));
        }
        Ok(Self {
            period,
            time: 0,
            next_edge: period / 2,
            cycles: 0,
        })
    }

    pub fn half_period(&self) -> u64 {
        self.period / 2
    }

    /// Current time.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Time of the next rising edge, which has not happened yet.
    pub fn next_edge(&self) -> u64 {
        self.next_edge
    }

    /// Number of rising edges so far.
    pub fn cycles(&self) -> Cycle {
        self.cycles
    }

    /// Moves time to the next rising edge and returns it.
    pub(crate) fn rise(&mut self) -> u64 {
        self.time = self.next_edge;
        self.next_edge += self.period;
        self.cycles += 1;
        self.time
    }

    /// Moves time forward without crossing the next edge.
    pub(crate) fn advance_to(&mut self, time: u64) {
        assert!(
            time >= self.time && time <= self.next_edge,
            "can't move time from {} to {} across the edge at {}",
            self.time,
            time,
            self.next_edge
        );
        self.time = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_offset_by_half_a_period() {
        let mut clock = Clock::new(8).unwrap();
        assert_eq!(clock.next_edge(), 4);
        assert_eq!(clock.rise(), 4);
        assert_eq!(clock.rise(), 12);
        assert_eq!(clock.cycles(), 2);
        clock.advance_to(15);
        assert_eq!(clock.time(), 15);
        assert_eq!(clock.rise(), 20);
    }

    #[test]
    fn period_must_be_even() {
        assert!(matches!(Clock::new(7), Err(Error::InvalidConfig(_))));
        assert!(matches!(Clock::new(0), Err(Error::InvalidConfig(_))));
        assert_eq!(Clock::new(2).unwrap().next_edge(), 1);
    }

    #[test]
    #[should_panic]
    fn cannot_skip_an_edge() {
        let mut clock = Clock::new(8).unwrap();
        clock.advance_to(5);
    }
}
