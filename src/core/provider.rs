//! Capture source selection and the frame provider boundary.
//!
//! The proprietary depth-camera SDK is an external collaborator; anything
//! that yields per-frame tracked-body lists satisfies [`FrameProvider`].
//! The replay binding (JSON-lines frame dumps) is fully functional
//! in-repo.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::bail;
use once_cell::sync::Lazy;
use regex::Regex;

use super::body::CapturedFrame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Directly attached camera.
    Wired,
    /// Recorded frame dump.
    Replay(PathBuf),
    /// Network camera stream.
    Stream { host: String, port: Option<u16> },
}

static STREAM_ADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){3})(?::(\d+))?$").unwrap());

impl InputSource {
    /// Resolve the CLI's input selection. Replay file and network address
    /// are mutually exclusive at the CLI layer; a malformed address falls
    /// back to the wired camera, matching the reference.
    pub fn from_args(input_file: Option<PathBuf>, ip_address: Option<&str>) -> InputSource {
        if let Some(path) = input_file {
            log::info!("Using replay file input: {}", path.display());
            return InputSource::Replay(path);
        }
        if let Some(addr) = ip_address {
            if let Some(caps) = STREAM_ADDR.captures(addr) {
                let host = caps[1].to_string();
                let port = caps.get(2).and_then(|p| p.as_str().parse().ok());
                log::info!("Using stream input: {}", addr);
                return InputSource::Stream { host, port };
            }
            log::warn!("Invalid stream address {:?}, using wired camera", addr);
        }
        InputSource::Wired
    }
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Resolution {
    HD2K,
    HD1200,
    #[default]
    HD1080,
    HD720,
    SVGA,
    VGA,
}

impl Resolution {
    /// Parse a resolution name, falling back to the default on anything
    /// unrecognized (logged, not fatal).
    pub fn from_name(name: Option<&str>) -> Resolution {
        match name {
            None => Resolution::default(),
            Some(s) => Resolution::from_str(s).unwrap_or_else(|_| {
                log::warn!("No valid resolution entered, using default");
                Resolution::default()
            }),
        }
    }
}

pub enum Grab {
    Frame(Box<CapturedFrame>),
    /// Nothing this poll; skip and re-poll without backoff.
    NotReady,
    Ended,
}

pub trait FrameProvider {
    fn grab(&mut self) -> Grab;
}

/// Replays a JSON-lines dump of captured frames.
pub struct ReplayProvider {
    lines: Lines<BufReader<File>>,
}

impl ReplayProvider {
    pub fn open(path: &Path) -> anyhow::Result<ReplayProvider> {
        let file = File::open(path)?;
        Ok(ReplayProvider {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl FrameProvider for ReplayProvider {
    fn grab(&mut self) -> Grab {
        loop {
            match self.lines.next() {
                None => return Grab::Ended,
                Some(Err(e)) => {
                    log::warn!("replay read error: {}", e);
                    return Grab::Ended;
                }
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => match serde_json::from_str::<CapturedFrame>(&line) {
                    Ok(frame) => return Grab::Frame(Box::new(frame)),
                    Err(e) => {
                        log::warn!("skipping malformed replay frame: {}", e);
                        return Grab::NotReady;
                    }
                },
            }
        }
    }
}

/// Open the selected source. Failure here is fatal to the process, per
/// the reference behavior for an unopenable camera.
pub fn connect(source: &InputSource, resolution: Resolution) -> anyhow::Result<Box<dyn FrameProvider>> {
    log::info!("Capture resolution: {}", resolution);
    match source {
        InputSource::Replay(path) => Ok(Box::new(ReplayProvider::open(path)?)),
        InputSource::Wired => {
            bail!("this build has no camera SDK binding; use a replay file input")
        }
        InputSource::Stream { host, port } => {
            bail!(
                "this build has no camera SDK binding for stream {}:{}; use a replay file input",
                host,
                port.unwrap_or(30000)
            )
        }
    }
}
