use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept one connection and print the strings it sends.
    Listen(ListenArgs),
    /// Send one string and wait for the server's completion report.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, encoding: EncodingArg, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, encoding, format),
        Command::Send(args) => send::run(args, encoding),
        Command::Version(args) => version::run(args),
    }
}

/// Wire encodings selectable from the command line.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum EncodingArg {
    Bincode,
    Json,
    Msgpack,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (e.g. 127.0.0.1:7070).
    pub addr: String,
    /// Frame type to print.
    #[arg(long, default_value_t = framemux_frame::USER_FRAME_TYPE_START)]
    pub frame_type: u8,
    /// Report success to the client after receiving N values.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to.
    pub addr: String,
    /// String value to send.
    #[arg(long)]
    pub data: String,
    /// Frame type to send on.
    #[arg(long, default_value_t = framemux_frame::USER_FRAME_TYPE_START)]
    pub frame_type: u8,
    /// Maximum time to wait for the completion report (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
