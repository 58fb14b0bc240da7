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

//! The FIFO test scenarios.
//!
//! Each scenario is a script over a started [`Testbench`] and assumes it
//! was announced with [`Testbench::begin_test`]; [`run`] and [`run_all`]
//! take care of that. Scenarios run back to back on one testbench, each
//! one leaving the bench idle for the next.

use crate::testbench::{Testbench, SETTLE_TIME};
use crate::{Error, Frame};
use anyhow::{bail, Context};

pub type Scenario = fn(&mut Testbench) -> Result<(), Error>;

pub const CATALOGUE: [(u64, &str, Scenario); 12] = [
    (1, "test packet", test_packet),
    (2, "longer packet", longer_packet),
    (3, "test packet with pauses", packet_with_pauses),
    (4, "back-to-back packets", back_to_back),
    (5, "alternate pause source", alternate_pause_source),
    (6, "alternate pause sink", alternate_pause_sink),
    (7, "tuser assert", tuser_assert),
    (8, "initial sink pause", initial_sink_pause),
    (9, "initial sink pause, reset", initial_sink_pause_reset),
    (10, "backpressure test", backpressure),
    (11, "many small packets", many_small_packets),
    (12, "reset", reset_discards_buffered_frame),
];

/// Ethernet-like header shared by the longer test frames.
const HEADER: [u8; 14] = [
    0xda, 0xd1, 0xd2, 0xd3, 0xd4, 0xd5, 0x5a, 0x51, 0x52, 0x53, 0x54, 0x55, 0x80, 0x00,
];

/// 31-byte frame: the header, `first`, then 0x01..=0x10.
pub fn short_frame(first: u8, id: u64, dest: u64) -> Frame {
    let payload = HEADER
        .iter()
        .copied()
        .chain(std::iter::once(first))
        .chain(0x01..=0x10)
        .collect::<Vec<u8>>();
    Frame::new(payload).with_id(id).with_dest(dest)
}

/// 270-byte frame: the header, then every byte value.
pub fn long_frame(id: u64, dest: u64) -> Frame {
    let payload = HEADER
        .iter()
        .copied()
        .chain(0..=0xff)
        .collect::<Vec<u8>>();
    Frame::new(payload).with_id(id).with_dest(dest)
}

pub fn test_packet(tb: &mut Testbench) -> Result<(), Error> {
    let frame = short_frame(0x00, 1, 1);
    tb.send(&frame)?;
    tb.expect(&frame)?;
    tb.delay(SETTLE_TIME)
}

pub fn longer_packet(tb: &mut Testbench) -> Result<(), Error> {
    let frame = long_frame(2, 1);
    tb.send(&frame)?;
    tb.expect(&frame)?;
    Ok(())
}

pub fn packet_with_pauses(tb: &mut Testbench) -> Result<(), Error> {
    let frame = short_frame(0x00, 3, 1);
    tb.send(&frame)?;
    tb.posedge()?;

    tb.delay(64)?;
    tb.posedge()?;
    tb.set_source_pause(true);
    tb.delay(32)?;
    tb.posedge()?;
    tb.set_source_pause(false);

    tb.delay(64)?;
    tb.posedge()?;
    tb.set_sink_pause(true);
    tb.delay(32)?;
    tb.posedge()?;
    tb.set_sink_pause(false);

    tb.expect(&frame)?;
    tb.delay(SETTLE_TIME)
}

fn frame_pair(id: u64) -> [Frame; 2] {
    [short_frame(0x01, id, 1), short_frame(0x02, id, 2)]
}

pub fn back_to_back(tb: &mut Testbench) -> Result<(), Error> {
    let frames = frame_pair(4);
    for frame in &frames {
        tb.send(frame)?;
    }
    for frame in &frames {
        tb.expect(frame)?;
    }
    tb.delay(SETTLE_TIME)
}

pub fn alternate_pause_source(tb: &mut Testbench) -> Result<(), Error> {
    let frames = frame_pair(5);
    for frame in &frames {
        tb.send(frame)?;
    }
    tb.posedge()?;
    tb.jitter_source()?;
    for frame in &frames {
        tb.expect(frame)?;
    }
    tb.delay(SETTLE_TIME)
}

pub fn alternate_pause_sink(tb: &mut Testbench) -> Result<(), Error> {
    let frames = frame_pair(6);
    for frame in &frames {
        tb.send(frame)?;
    }
    tb.posedge()?;
    tb.jitter_sink()?;
    for frame in &frames {
        tb.expect(frame)?;
    }
    tb.delay(SETTLE_TIME)
}

pub fn tuser_assert(tb: &mut Testbench) -> Result<(), Error> {
    let frame = short_frame(0x00, 7, 1).with_last_cycle_user(1);
    tb.send(&frame)?;
    let received = tb.expect(&frame)?;
    if tb.config().bus.user_enable && received.last_cycle_user() == 0 {
        return Err(Error::Expectation(
            "last cycle user flag was lost".to_string(),
        ));
    }
    tb.delay(SETTLE_TIME)
}

pub fn initial_sink_pause(tb: &mut Testbench) -> Result<(), Error> {
    let frame = Frame::new(vec![0x01, 0x02, 0x03]).with_id(8).with_dest(1);
    tb.set_sink_pause(true);
    tb.send(&frame)?;
    tb.posedges(4)?;
    tb.set_sink_pause(false);
    tb.expect(&frame)?;
    tb.delay(SETTLE_TIME)
}

pub fn initial_sink_pause_reset(tb: &mut Testbench) -> Result<(), Error> {
    let frame = Frame::new(vec![0x01, 0x02, 0x03]).with_id(9).with_dest(1);
    tb.set_sink_pause(true);
    tb.send(&frame)?;
    tb.posedges(4)?;
    tb.reset()?;
    tb.set_sink_pause(false);
    tb.delay(SETTLE_TIME)?;
    tb.posedges(3)?;
    tb.expect_empty()?;
    tb.delay(SETTLE_TIME)
}

pub fn backpressure(tb: &mut Testbench) -> Result<(), Error> {
    let frame = long_frame(10, 1);
    tb.set_sink_pause(true);
    tb.send(&frame)?;
    tb.send(&frame)?;
    tb.delay(5000)?;
    tb.posedge()?;
    tb.set_sink_pause(false);
    tb.expect(&frame)?;
    tb.expect(&frame)?;
    tb.delay(SETTLE_TIME)
}

pub fn many_small_packets(tb: &mut Testbench) -> Result<(), Error> {
    let frame = Frame::new(vec![0xaa]).with_id(11).with_dest(1);
    for _ in 0..64 {
        tb.send(&frame)?;
    }
    for _ in 0..64 {
        tb.expect(&frame)?;
    }
    tb.delay(SETTLE_TIME)
}

/// Leaves a frame stuck in the FIFO behind a paused sink, queues a second
/// one behind a paused source, resets only the FIFO while releasing the
/// source, then releases the sink: only the second frame may come out.
pub fn reset_discards_buffered_frame(tb: &mut Testbench) -> Result<(), Error> {
    tb.set_sink_pause(true);
    let stuck = Frame::new(vec![0x80, 0x00]).with_id(1).with_dest(1);
    tb.send(&stuck)?;
    tb.delay(SETTLE_TIME)?;

    let frame = Frame::new(vec![0xaa, 0xbb]).with_id(2).with_dest(2);
    tb.set_source_pause(true);
    tb.send(&frame)?;

    tb.posedge()?;
    tb.set_dut_reset(true);
    tb.set_source_pause(false);
    tb.posedge()?;
    tb.set_dut_reset(false);

    tb.set_sink_pause(false);
    tb.expect(&frame)?;
    tb.delay(SETTLE_TIME)
}

/// Runs scenario `number` on a started testbench.
pub fn run(tb: &mut Testbench, number: u64) -> anyhow::Result<()> {
    match CATALOGUE.iter().find(|(n, _, _)| *n == number) {
        Some((number, name, scenario)) => {
            tb.begin_test(*number, name)?;
            scenario(tb).with_context(|| format!("test {}: {}", number, name))
        }
        None => bail!("no test {}; tests are numbered 1 to {}", number, CATALOGUE.len()),
    }
}

/// Runs the whole catalogue in order on a started testbench.
pub fn run_all(tb: &mut Testbench) -> anyhow::Result<()> {
    for (number, _, _) in CATALOGUE.iter() {
        run(tb, *number)?;
    }
    log::info!("all {} tests passed at t={}", CATALOGUE.len(), tb.time());
    Ok(())
}
