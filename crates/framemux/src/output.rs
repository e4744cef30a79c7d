use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use framemux_frame::frame_type::frame_type_name;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ValueOutput<'a> {
    frame_type: u8,
    frame_type_name: &'a str,
    value: &'a str,
    peer: &'a str,
    timestamp: String,
}

pub fn print_value(frame_type: u8, value: &str, peer: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ValueOutput {
                frame_type,
                frame_type_name: frame_type_name(frame_type),
                value,
                peer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty => {
            println!(
                "frame_type={} ({}) peer={} value={}",
                frame_type,
                frame_type_name(frame_type),
                peer,
                value
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = writeln!(out, "{value}");
            let _ = out.flush();
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
