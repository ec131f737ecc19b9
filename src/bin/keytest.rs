//! Key Test
//!
//! Puts the terminal in raw mode and prints each decoded keystroke. Handy for
//! checking what a terminal or BBS client sends for special keys.

use std::io::{self, Write};
use std::process::ExitCode;

use doorkit::{DoorConfig, InputEvent, RawInput, ReadFlags, StreamRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STDIN_FD: i32 = 0;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = DoorConfig::from_env();
    let mut flags = ReadFlags::NORMAL;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-x" | "--extended" => config.extended_keys = true,
            "-r" | "--raw" => flags = ReadFlags::RAW,
            "-c" | "--raw-ctrl" => flags = ReadFlags::RAW_CTRL,
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            },
            other => {
                eprintln!("Unknown option: {}", other);
                return ExitCode::FAILURE;
            },
        }
    }

    match run(&config, flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn run(config: &DoorConfig, flags: ReadFlags) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = StreamRegistry::new();
    let mut input = RawInput::open(&mut registry, STDIN_FD, config);
    let _raw = input.raw_mode();

    let mut out = io::stdout();
    write!(out, "Press keys to see how they decode, 'q' quits.\r\n")?;
    out.flush()?;

    loop {
        let Some(event) = input.next_event(None, flags)? else {
            if input.eof_seen() {
                write!(out, "<eof>\r\n")?;
                break;
            }
            continue;
        };

        match event {
            InputEvent::Character(b) => {
                let shown = if (0x20..0x7f).contains(&b) {
                    format!("'{}'", char::from(b))
                } else {
                    "ctrl".to_string()
                };
                write!(out, "char 0x{:02x} {}\r\n", b, shown)?;
            },
            InputEvent::Extended(code) => match event.key_code() {
                Some(key) => write!(out, "key  0x{:02x} {:?}\r\n", code, key)?,
                None => write!(out, "key  0x{:02x} (unknown scan code)\r\n", code)?,
            },
        }
        out.flush()?;

        if event == InputEvent::Character(b'q') {
            break;
        }
    }

    Ok(())
}

fn print_help() {
    println!("Key Test");
    println!();
    println!("Usage: keytest [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -x, --extended   Recognize function and paging keys");
    println!("  -r, --raw        Show bytes without decoding");
    println!("  -c, --raw-ctrl   Deliver DEL and ^E-style keys as characters");
    println!("  -h, --help       Show this help message");
}
