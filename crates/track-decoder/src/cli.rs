use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trackdec", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Fragment size in bytes used when feeding the stream to the decoder
    #[arg(long, default_value_t = 4096)]
    pub fragment_bytes: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse the track directory and print the declared format
    Info {
        /// Path to a spooled track stream
        path: PathBuf,

        /// Print the format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode the whole track and report totals
    Decode {
        /// Path to a spooled track stream
        path: PathBuf,

        /// Write decoded PCM (interleaved 16-bit big-endian) to stdout
        #[arg(long)]
        pcm_stdout: bool,
    },
}
