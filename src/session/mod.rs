//! Session bootstrap
//!
//! A door is started by the host with its node number, dropfile location and
//! the control descriptor supplied through environment variables, with
//! positional arguments as the fallback:
//!
//! ```text
//! door <node> <dropfile> [--lnwp <fd>] [--handle <fd>]
//! ```
//!
//! Environment values win over arguments. Dropfile parsing itself happens
//! elsewhere; this module only resolves where things are.

use std::os::unix::io::RawFd;

use serde::Serialize;

use crate::error::{DoorError, DoorResult};

pub const ENV_NODE: &str = "NOTORIOUS_DOOR_NODE";
pub const ENV_DROPFILE_PATH: &str = "NOTORIOUS_DOOR_DROPFILE_PATH";
pub const ENV_DROPFILE_TYPE: [&str; 3] = [
    "NOTORIOUS_DOOR_DROPFILE_TYPE",
    "NOTORIOUS_DROPFILE_TYPE",
    "DOOR_DROPFILE_TYPE",
];
pub const ENV_LNWP_FD: &str = "NOTORIOUS_DOOR_LNWP_FD";
pub const ENV_DOOR_KEY: &str = "NOTORIOUS_DOOR_KEY";

/// Door key reported when the host does not supply one
pub const UNKNOWN_DOOR_KEY: &str = "UNKNOWN";

/// Host comm type for a telnet socket in door32.sys
pub const COMM_TYPE_TELNET: i32 = 2;

/// Resolved startup arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionArgs {
    pub node: u32,
    pub dropfile_path: String,
    pub dropfile_type: Option<String>,
    /// Control descriptor, 0 when LNWP is disabled
    pub lnwp_fd: RawFd,
    /// Explicit `--handle` terminal descriptor
    pub handle_override: Option<RawFd>,
    pub door_key: String,
}

impl SessionArgs {
    /// Resolve from the process environment and arguments
    pub fn from_env() -> DoorResult<Self> {
        let argv: Vec<String> = std::env::args().collect();
        Self::resolve(|key| std::env::var(key).ok(), &argv)
    }

    /// Resolve from `lookup` (environment) and `argv` (including argv[0])
    pub fn resolve<F>(lookup: F, argv: &[String]) -> DoorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let positional = positional_args(argv);
        let node_raw = first_env(&lookup, &[ENV_NODE]).or_else(|| positional.first().cloned());
        let dropfile_path =
            first_env(&lookup, &[ENV_DROPFILE_PATH]).or_else(|| positional.get(1).cloned());
        let dropfile_type = first_env(&lookup, &ENV_DROPFILE_TYPE);

        let (Some(node_raw), Some(dropfile_path)) = (node_raw, dropfile_path) else {
            return Err(DoorError::MissingSessionArgs);
        };
        let node = node_raw
            .trim()
            .parse()
            .map_err(|_| DoorError::InvalidNode(node_raw.clone()))?;

        let lnwp_fd = match first_env(&lookup, &[ENV_LNWP_FD]) {
            Some(raw) => parse_fd(&raw).unwrap_or(0),
            None => flag_value(argv, "--lnwp")
                .and_then(parse_fd)
                .unwrap_or(0),
        };

        let door_key = lookup(ENV_DOOR_KEY).unwrap_or_else(|| UNKNOWN_DOOR_KEY.to_string());

        Ok(Self {
            node,
            dropfile_path,
            dropfile_type,
            lnwp_fd,
            handle_override: handle_arg(argv),
            door_key,
        })
    }
}

/// First non-blank value among `keys`
fn first_env<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|&k| lookup(k))
        .find(|v| !v.trim().is_empty())
}

/// Arguments after argv[0], minus `--lnwp <fd>` and `--handle <fd>` pairs
fn positional_args(argv: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut args = argv.iter().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--lnwp" || arg == "--handle" {
            args.next();
            continue;
        }
        out.push(arg.clone());
    }
    out
}

/// Value following the first occurrence of `flag`
fn flag_value<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
    argv.iter()
        .position(|a| a == flag)
        .and_then(|i| argv.get(i + 1))
        .map(String::as_str)
}

fn parse_fd(raw: &str) -> Option<RawFd> {
    raw.trim().parse().ok()
}

/// `--handle <fd>` override; unparsable values are ignored
pub fn handle_arg(argv: &[String]) -> Option<RawFd> {
    flag_value(&argv[argv.len().min(1)..], "--handle").and_then(parse_fd)
}

/// Terminal descriptor details from a door32.sys dropfile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Door32Handle {
    pub comm_type: Option<i32>,
    pub handle: Option<RawFd>,
}

/// Pick the descriptor the door talks to the user on; `None` means stdio
///
/// An explicit `--handle` of 0, 1 or 2 selects stdio, any other value is used
/// as is. Otherwise stdio wins when stdin is a terminal, and the inherited
/// door32 handle is used for telnet sessions.
pub fn select_terminal_fd(
    handle_override: Option<RawFd>,
    door32: Option<Door32Handle>,
    stdin_is_tty: bool,
) -> Option<RawFd> {
    if let Some(fd) = handle_override {
        return (fd > 2).then_some(fd);
    }
    if stdin_is_tty {
        return None;
    }
    let door32 = door32?;
    match (door32.comm_type, door32.handle) {
        (Some(COMM_TYPE_TELNET), Some(fd)) if fd > 2 => Some(fd),
        _ => None,
    }
}
