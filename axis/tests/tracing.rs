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

use axis::scenarios;
use axis::{Config, Testbench, VcdWriter};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// A writer the test can read back.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fails every write.
struct Broken;

impl Write for Broken {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn waveform_of_a_test() -> anyhow::Result<()> {
    let _logger = env_logger::builder().is_test(true).try_init();
    let buffer = SharedBuffer::default();
    let mut tb = Testbench::new(Config::default())?;
    tb.trace_vcd(VcdWriter::from_writer(Box::new(buffer.clone())));
    tb.start()?;
    scenarios::run(&mut tb, 1)?;

    let text = String::from_utf8(buffer.0.borrow().clone())?;
    for scope in ["testbench", "tb", "s_axis", "m_axis"] {
        assert!(text.contains(&format!("$scope module {} $end", scope)));
    }
    for name in ["clk", "current_test", "dut_reset", "tdata", "tready", "tuser"] {
        assert!(text.contains(name), "{} is not traced", name);
    }
    // the first and the power-up reset edge
    assert!(text.contains("#4\n"));
    assert!(text.contains("#108\n"));
    // current_test = 1
    assert!(text.contains("b00000001 "));
    Ok(())
}

#[test]
fn broken_writer_does_not_stop_the_run() -> anyhow::Result<()> {
    let _logger = env_logger::builder().is_test(true).try_init();
    let mut tb = Testbench::new(Config::default())?;
    tb.trace_vcd(VcdWriter::from_writer(Box::new(Broken)));
    tb.start()?;
    scenarios::run(&mut tb, 1)?;
    Ok(())
}

#[test]
fn waveform_to_a_file() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("axis_fifo_{}.vcd", std::process::id()));
    let mut config = Config::default();
    config.sim.vcd = Some(path.clone());
    {
        let mut tb = Testbench::new(config)?;
        tb.start()?;
        scenarios::run(&mut tb, 8)?;
    }
    let text = std::fs::read_to_string(&path)?;
    std::fs::remove_file(&path)?;
    assert!(text.contains("$enddefinitions $end"));
    assert!(text.contains("sink_pause"));
    Ok(())
}
