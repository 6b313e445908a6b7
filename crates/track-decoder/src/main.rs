//! trackdec: feed a spooled track stream through the decoder.
//!
//! ## Pipeline
//! 1. A reader thread slices the input file into fragments and hands them
//!    over a bounded channel, standing in for the container demultiplexer.
//! 2. The main thread appends fragments to a [`Track`], extracts PCM as it
//!    becomes ready, and reports totals (or streams the PCM to stdout).
//!
//! Logs go to stderr so `--pcm-stdout` output stays clean for piping.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::thread;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::{Receiver, bounded};
use tracing_subscriber::EnvFilter;

use track_decoder::{Track, cli};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trackdec=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match &args.cmd {
        cli::Command::Info { path, json } => run_info(path, *json, args.fragment_bytes),
        cli::Command::Decode { path, pcm_stdout } => {
            run_decode(path, *pcm_stdout, args.fragment_bytes)
        }
    }
}

/// Spawn the reader thread feeding file fragments over a bounded channel.
///
/// The channel closes when the file is exhausted or the receiver goes away.
fn spawn_fragment_reader(path: &Path, fragment_bytes: usize) -> Result<Receiver<Vec<u8>>> {
    let mut file = File::open(path).with_context(|| format!("open {:?}", path))?;
    let fragment_bytes = fragment_bytes.max(1);
    let (tx, rx) = bounded::<Vec<u8>>(16);

    thread::spawn(move || {
        loop {
            let mut buf = vec![0u8; fragment_bytes];
            match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    buf.truncate(n);
                    if tx.send(buf).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("read error: {e}");
                    break;
                }
            }
        }
    });

    Ok(rx)
}

fn run_info(path: &Path, json: bool, fragment_bytes: usize) -> Result<()> {
    let rx = spawn_fragment_reader(path, fragment_bytes)?;
    let mut track = Track::new();

    while let Ok(fragment) = rx.recv() {
        track
            .append_fragment(&fragment)
            .context("corrupted track stream")?;
        if track.format().is_some() {
            break;
        }
    }

    let Some(format) = track.format() else {
        bail!("stream ended before the track directory resolved");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(format)?);
    } else {
        println!("bit depth:   {}", format.bit_depth);
        println!("sample rate: {} Hz", format.sample_rate);
        println!("channels:    {}", format.channels);
    }
    Ok(())
}

fn run_decode(path: &Path, pcm_stdout: bool, fragment_bytes: usize) -> Result<()> {
    let rx = spawn_fragment_reader(path, fragment_bytes)?;
    let mut track = Track::new();
    let mut stdout = std::io::stdout().lock();

    let mut bytes_in = 0u64;
    let mut pcm_bytes = 0u64;

    while let Ok(fragment) = rx.recv() {
        bytes_in += fragment.len() as u64;
        track
            .append_fragment(&fragment)
            .context("corrupted track stream")?;

        let pcm = track.extract_pcm();
        if !pcm.is_empty() {
            pcm_bytes += pcm.len() as u64;
            if pcm_stdout {
                stdout.write_all(&pcm).context("write PCM to stdout")?;
            }
        }
    }

    let Some(format) = track.format().copied() else {
        bail!("stream ended before the track directory resolved");
    };

    tracing::info!(
        bytes_in,
        pcm_bytes,
        samples = pcm_bytes / 2,
        rate_hz = format.sample_rate,
        channels = format.channels,
        bit_depth = format.bit_depth,
        terminated = track.is_terminated(),
        "decode finished"
    );
    Ok(())
}
