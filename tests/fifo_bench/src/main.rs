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

//! Runs the FIFO test catalogue from the command line.

use anyhow::Context;
use axis::{scenarios, Config, Testbench};
use env_logger::Target;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "fifo-bench", about = "Streaming FIFO testbench")]
struct Arguments {
    /// YAML configuration; defaults to an 8-bit bus and a 4-byte FIFO
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// dump a VCD trace of every signal to this file
    #[structopt(long, parse(from_os_str))]
    vcd: Option<PathBuf>,
    /// run only this test, after the power-up sequence
    #[structopt(short, long)]
    test: Option<u64>,
    /// list the tests and exit
    #[structopt(short, long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::from_args();

    let _logger = env_logger::builder()
        .filter(Some("fifo_bench"), log::LevelFilter::Info)
        .filter(Some("axis"), log::LevelFilter::Info)
        .parse_default_env()
        .target(Target::Stderr)
        .init();

    if args.list {
        for (number, name, _) in scenarios::CATALOGUE.iter() {
            println!("{:>2}  {}", number, name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if args.vcd.is_some() {
        config.sim.vcd = args.vcd;
    }
    log::info!("configuration: {:?}", config);

    let mut tb = Testbench::new(config)?;
    tb.start()?;
    match args.test {
        Some(number) => scenarios::run(&mut tb, number)?,
        None => scenarios::run_all(&mut tb)?,
    }
    log::info!(
        "done after {} cycles, t={}",
        tb.cycles(),
        tb.time()
    );
    Ok(())
}
