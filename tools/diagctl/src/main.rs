// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Drive a diagnostic channel from the command line for demos and smoke tests.
// Author: Lukas Bower

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use clap::{Parser, Subcommand};
use diagchan::{ChannelConfig, DebugChannel, StackTrace};
use log::{error, info};
use synthfs::{FsError, OpenFlags, SyntheticFs};

#[derive(Parser)]
#[command(about = "Diagnostic channel demo and control tool")]
struct Cli {
    /// JSON channel configuration; DIAGCHAN_* variables override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read size used when draining files.
    #[arg(long, default_value_t = 64)]
    chunk: usize,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run concurrent producers and print what a reader sees
    Demo {
        #[arg(long, default_value_t = 4)]
        producers: usize,
        #[arg(long, default_value_t = 8)]
        messages: usize,
    },
    /// Write one command to the control file and print its answer
    Ctl {
        /// Command text, e.g. `status` or `mark hello`.
        command: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ChannelConfig, String> {
    let config = match path {
        Some(path) => ChannelConfig::from_file(path),
        None => Ok(ChannelConfig::default()),
    };
    config
        .and_then(ChannelConfig::apply_env)
        .map_err(|err| err.to_string())
}

fn path_of(config: &ChannelConfig, name: &str) -> String {
    format!("{}/{}", config.dir_name, name)
}

fn drain(fs: &SyntheticFs, path: &str, chunk: usize) -> Result<Vec<u8>, FsError> {
    fs.open(path, OpenFlags::READ)?.read_to_end(chunk)
}

fn demo(
    fs: &Arc<SyntheticFs>,
    channel: &DebugChannel,
    config: &ChannelConfig,
    chunk: usize,
    producers: usize,
    messages: usize,
) -> Result<(), String> {
    let workers: Vec<_> = (0..producers)
        .map(|id| {
            let buffer = channel.buffer().clone();
            thread::spawn(move || {
                for seq in 0..messages {
                    buffer.append_string(&format!("producer {id} seq={seq:04}\n"));
                }
            })
        })
        .collect();
    for worker in workers {
        worker
            .join()
            .map_err(|_| "producer thread panicked".to_owned())?;
    }
    let trace = StackTrace::capture_above(
        &|slots: &mut [u64]| {
            let frames = [0xffff_8000_0010_0000, 0xffff_8000_0010_0040, 0xffff_8000_0010_0080];
            let n = frames.len().min(slots.len());
            slots[..n].copy_from_slice(&frames[..n]);
            n
        },
        0xffff_8000_0010_0040,
        diagchan::stack::MAX_FRAMES,
    );
    channel.buffer().print_stack(&trace);
    channel.buffer().append_u64(0xd1a6, "magic=%#llx\n");
    channel.buffer().append_string("bytes: ");
    channel.buffer().append_hex_bytes(b"diag");
    channel.buffer().append_string("\n");

    let output = drain(fs, &path_of(config, &config.output_name), chunk)
        .map_err(|err| format!("reading output: {err}"))?;
    print!("{}", String::from_utf8_lossy(&output));
    if let Some(stats) = &config.stats_name {
        let text = drain(fs, &path_of(config, stats), chunk)
            .map_err(|err| format!("reading stats: {err}"))?;
        print!("{}", String::from_utf8_lossy(trim_nul(&text)));
    }
    Ok(())
}

fn ctl(
    fs: &SyntheticFs,
    config: &ChannelConfig,
    chunk: usize,
    command: &[String],
) -> Result<(), String> {
    let Some(name) = &config.control_name else {
        return Err("control file is disabled in this configuration".to_owned());
    };
    let path = path_of(config, name);
    let mut file = fs
        .open(&path, OpenFlags::READ_WRITE)
        .map_err(|err| format!("opening {path}: {err}"))?;
    let line = format!("{}\n", command.join(" "));
    let written = file.write(line.as_bytes());
    let answer = file
        .read_to_end(chunk)
        .map_err(|err| format!("reading {path}: {err}"))?;
    println!("{}", String::from_utf8_lossy(trim_nul(&answer)));
    written
        .map(|_| ())
        .map_err(|err| format!("command rejected: {err} (errno {})", err.errno()))
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(&[0]).unwrap_or(bytes)
}

fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_ref())?;
    let fs = Arc::new(SyntheticFs::new());
    let mut channel = DebugChannel::init(fs.clone(), &config).map_err(|err| err.to_string())?;
    info!("channel '{}' initialised", config.dir_name);
    let result = match &cli.cmd {
        Command::Demo {
            producers,
            messages,
        } => demo(&fs, &channel, &config, cli.chunk, *producers, *messages),
        Command::Ctl { command } => ctl(&fs, &config, cli.chunk, command),
    };
    channel.fini();
    result
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("diagctl: {err}");
            ExitCode::FAILURE
        }
    }
}
