//! LNWP Capture Dump
//!
//! Replays a captured control-channel stream through the door event loop and
//! prints the decoded events. Useful for checking what a host actually sends.

use std::io::{self, Read};
use std::process::ExitCode;
use std::time::Duration;

use doorkit::{ByteSource, ControlChannel, Door, DoorConfig, DoorEvent, DoorResult, ReadOutcome};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Serves a captured stream in fixed-size reads, then reports end-of-stream
struct Replay {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    sent: usize,
}

impl ByteSource for Replay {
    fn read_timeout(
        &mut self,
        buf: &mut [u8],
        _timeout: Option<Duration>,
    ) -> DoorResult<ReadOutcome> {
        if self.pos >= self.data.len() {
            return Ok(ReadOutcome::Closed);
        }
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(ReadOutcome::Data(n))
    }
}

impl ControlChannel for Replay {
    fn send(&mut self, _data: &[u8]) -> DoorResult<()> {
        self.sent += 1;
        Ok(())
    }
}

#[derive(Serialize)]
struct Report {
    events: Vec<DoorEvent>,
    passthrough_bytes: usize,
    requests_sent: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut input_file: Option<String> = None;
    let mut chunk = 4096usize;
    let mut output_format = OutputFormat::Text;
    let mut auto_drain = false;
    let mut show_help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-f" | "--file" => {
                i += 1;
                if i < args.len() {
                    input_file = Some(args[i].clone());
                }
            },
            "-c" | "--chunk" => {
                i += 1;
                if i < args.len() {
                    chunk = args[i].parse().unwrap_or(4096).max(1);
                }
            },
            "-a" | "--auto-drain" => auto_drain = true,
            "-j" | "--json" => output_format = OutputFormat::Json,
            "-t" | "--text" => output_format = OutputFormat::Text,
            "-h" | "--help" => show_help = true,
            _ => {
                if input_file.is_none() && !args[i].starts_with('-') {
                    input_file = Some(args[i].clone());
                }
            },
        }
        i += 1;
    }

    if show_help {
        print_help();
        return ExitCode::SUCCESS;
    }

    let data = match &input_file {
        Some(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path, e);
                return ExitCode::FAILURE;
            },
        },
        None => {
            let mut data = Vec::new();
            if let Err(e) = io::stdin().read_to_end(&mut data) {
                eprintln!("Error reading stdin: {}", e);
                return ExitCode::FAILURE;
            }
            data
        },
    };

    let config = DoorConfig::from_env();
    let replay = Replay {
        data,
        pos: 0,
        chunk,
        sent: 0,
    };
    let mut door = Door::with_channel(Some(replay), "LNWP-DUMP", &config);
    if auto_drain {
        door.set_inbox_auto_drain(true, &config.default_box);
    }

    let mut report = Report {
        events: Vec::new(),
        passthrough_bytes: 0,
        requests_sent: 0,
    };
    while !door.is_eof() {
        match door.poll_events(None, chunk) {
            Ok(polled) => {
                report.events.extend(polled.events);
                report.passthrough_bytes += polled.passthrough.len();
            },
            Err(e) => {
                eprintln!("Error decoding stream: {}", e);
                return ExitCode::FAILURE;
            },
        }
    }
    report.requests_sent = door.channel().map(|r| r.sent).unwrap_or(0);

    match output_format {
        OutputFormat::Text => {
            for (n, event) in report.events.iter().enumerate() {
                println!("{:>4}  {}", n + 1, describe(event));
            }
            println!("---");
            println!("Events: {}", report.events.len());
            println!("Passthrough bytes: {}", report.passthrough_bytes);
            if auto_drain {
                println!("Drain requests: {}", report.requests_sent);
            }
        },
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                return ExitCode::FAILURE;
            },
        },
    }

    ExitCode::SUCCESS
}

fn describe(event: &DoorEvent) -> String {
    let fields = |f: &doorkit::Fields| {
        f.iter()
            .map(|(k, v)| format!("{}={:?}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    };
    match event {
        DoorEvent::Raw { kind, fields: f } => format!("RAW [{}] {}", kind, fields(f)),
        DoorEvent::NewMessage { mailbox, count } => format!(
            "NEW_MSG box={} count={}",
            mailbox.as_deref().unwrap_or("-"),
            count.map_or_else(|| "-".to_string(), |c| c.to_string())
        ),
        DoorEvent::Message { fields: f } => format!("MSG {}", fields(f)),
        DoorEvent::NodeInfo { fields: f } => format!("NODE_INFO {}", fields(f)),
        DoorEvent::NodesInfo { nodes, .. } => {
            let ids: Vec<String> = nodes.keys().map(|id| id.to_string()).collect();
            format!("NODES_INFO nodes={}", ids.join(","))
        },
    }
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn print_help() {
    println!("LNWP Capture Dump");
    println!();
    println!("Usage: lnwp-dump [OPTIONS] [INPUT_FILE]");
    println!();
    println!("Options:");
    println!("  -f, --file <PATH>   Read the capture from a file");
    println!("  -c, --chunk <N>     Feed the decoder N bytes per read (default: 4096)");
    println!("  -a, --auto-drain    Enable inbox auto-drain and count the requests it sends");
    println!("  -j, --json          Output events as JSON");
    println!("  -t, --text          Output events as text (default)");
    println!("  -h, --help          Show this help message");
    println!();
    println!("If no input file is specified, reads from stdin.");
    println!();
    println!("Examples:");
    println!("  lnwp-dump capture.bin");
    println!("  lnwp-dump --chunk 1 --json < capture.bin");
}
