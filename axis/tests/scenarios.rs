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

use axis::scenarios::{self, CATALOGUE};
use axis::{Config, Error, Frame, PausePattern, Testbench};

fn started(config: Config) -> anyhow::Result<Testbench> {
    let _logger = env_logger::builder().is_test(true).try_init();
    let mut tb = Testbench::new(config)?;
    tb.start()?;
    Ok(tb)
}

#[test]
fn full_catalogue_in_one_run() -> anyhow::Result<()> {
    let mut tb = started(Config::default())?;
    scenarios::run_all(&mut tb)?;
    assert!(tb.empty());
    assert!(tb.source().idle());
    assert!(!tb.in_flight());
    Ok(())
}

#[test]
fn every_test_passes_on_a_fresh_bench() -> anyhow::Result<()> {
    for (number, _, _) in CATALOGUE.iter() {
        let mut tb = started(Config::default())?;
        scenarios::run(&mut tb, *number)?;
        assert!(tb.empty(), "test {} left frames behind", number);
    }
    Ok(())
}

#[test]
fn unknown_test_is_an_error() -> anyhow::Result<()> {
    let mut tb = started(Config::default())?;
    assert!(scenarios::run(&mut tb, 13).is_err());
    Ok(())
}

#[test]
fn reset_test_delivers_only_the_second_frame() -> anyhow::Result<()> {
    let mut tb = started(Config::default())?;
    scenarios::run(&mut tb, 12)?;
    assert_eq!(tb.sink().frames_received(), 1);
    assert_eq!(tb.recv(), Err(Error::EmptyQueue));
    Ok(())
}

#[test]
fn pauses_change_timing_only() -> anyhow::Result<()> {
    let frames = (0..6u8)
        .map(|n| scenarios::short_frame(n, n as u64, 1))
        .collect::<Vec<_>>();
    let mut elapsed = vec![];
    for pattern in [
        PausePattern::Off,
        PausePattern::duty(1, 2),
        PausePattern::random(0.5),
    ] {
        let mut tb = started(Config::default())?;
        tb.set_source_pause_pattern(pattern.clone())?;
        tb.set_sink_pause_pattern(pattern)?;
        let start = tb.cycles();
        for frame in &frames {
            tb.send(frame)?;
        }
        for frame in &frames {
            assert_eq!(&tb.expect(frame)?, frame);
        }
        elapsed.push(tb.cycles() - start);
    }
    assert!(elapsed[0] < elapsed[1]);
    assert!(elapsed[0] < elapsed[2]);
    Ok(())
}

#[test]
fn stalled_sink_times_out() -> anyhow::Result<()> {
    let mut config = Config::default();
    config.sim.max_wait_cycles = 200;
    let mut tb = started(config)?;
    tb.set_sink_pause(true);
    let frame = Frame::new(vec![1, 2, 3]);
    tb.send(&frame)?;
    assert_eq!(tb.expect(&frame), Err(Error::Timeout(200)));
    tb.set_sink_pause(false);
    tb.expect(&frame)?;
    Ok(())
}

#[test]
fn back_to_back_frames_stay_distinct() -> anyhow::Result<()> {
    let mut tb = started(Config::default())?;
    let frames = [
        Frame::new(vec![1]).with_dest(1),
        Frame::new(vec![2, 3]).with_dest(2),
        Frame::new(vec![4]).with_dest(3),
    ];
    for frame in &frames {
        tb.send(frame)?;
    }
    tb.posedge()?;
    // valid never drops while the three frames go out
    let mut beats = 0;
    while beats < 4 {
        let state = tb.s_axis().sample(tb.signals());
        assert!(state.valid);
        if state.transfer() {
            beats += 1;
        }
        tb.posedge()?;
    }
    for frame in &frames {
        tb.expect(frame)?;
    }
    Ok(())
}
