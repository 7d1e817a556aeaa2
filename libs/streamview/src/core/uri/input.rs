// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use super::{
    format_host, invalid, parse_digits, parse_endpoint, parse_host, parse_port, split_host_port,
};
use crate::core::Result;

const DEVICE_PREFIX: &str = "/dev/video";

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// V4L2 capture device, e.g. `/dev/video0`.
    Device { path: PathBuf },
    /// Camera-serial-interface sensor by index; backed by `/dev/video<index>`.
    CsiIndex { index: u32 },
    /// Container file decoded from disk.
    File { path: PathBuf },
    /// RTP over UDP. `host` set means bind to that address only.
    Udp { host: Option<IpAddr>, port: u16 },
    /// RTP receive on a local port, any sender.
    Rtp { port: u16 },
    /// RTP joined to a multicast group.
    Multicast { host: IpAddr, port: u16 },
    /// RTSP server URI, passed through untouched.
    Rtsp { uri: String },
}

impl InputSpec {
    /// Capture device node backing a local camera input.
    pub fn device_path(&self) -> Option<PathBuf> {
        match self {
            Self::Device { path } => Some(path.clone()),
            Self::CsiIndex { index } => Some(PathBuf::from(format!("{}{}", DEVICE_PREFIX, index))),
            _ => None,
        }
    }

    /// The stream is only linkable after the transport announces it.
    pub fn is_late_binding(&self) -> bool {
        matches!(self, Self::Rtsp { .. })
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device { path } | Self::File { path } => write!(f, "{}", path.display()),
            Self::CsiIndex { index } => write!(f, "csi://{}", index),
            Self::Udp {
                host: Some(host),
                port,
            } => write!(f, "udp://{}:{}", format_host(host), port),
            Self::Udp { host: None, port } => write!(f, "udp://:{}", port),
            Self::Rtp { port } => write!(f, "rtp://@:{}", port),
            Self::Multicast { host, port } => write!(f, "mc://{}:{}", format_host(host), port),
            Self::Rtsp { uri } => f.write_str(uri),
        }
    }
}

/// Resolve an input URI.
///
/// Rules are tried in a fixed order and the first matching prefix decides
/// the variant. Once a scheme is recognised its content must be well formed;
/// a malformed `udp://` never falls through to the file check.
pub fn parse_input(text: &str) -> Result<InputSpec> {
    let uri = text.trim();

    if uri.starts_with(DEVICE_PREFIX) {
        return Ok(InputSpec::Device {
            path: PathBuf::from(uri),
        });
    }

    if let Some(rest) = uri.strip_prefix("csi://") {
        let index = parse_digits::<u32>(rest)
            .ok_or_else(|| invalid(uri, "CSI index must be a non-negative integer"))?;
        return Ok(InputSpec::CsiIndex { index });
    }

    if let Some(rest) = uri.strip_prefix("udp://") {
        return match split_host_port(rest) {
            Some((host, port)) => {
                let port = parse_port(port, uri)?;
                let host = match host {
                    "" | "@" => None,
                    host => Some(parse_host(host, uri)?),
                };
                Ok(InputSpec::Udp { host, port })
            }
            None => Ok(InputSpec::Udp {
                host: None,
                port: parse_port(rest, uri)?,
            }),
        };
    }

    if let Some(rest) = uri.strip_prefix("rtp://") {
        // Receive-only. A host, when given, must still be an address.
        let port = match split_host_port(rest) {
            Some(("" | "@", port)) => port,
            Some((host, port)) => {
                parse_host(host, uri)?;
                port
            }
            None => rest,
        };
        return Ok(InputSpec::Rtp {
            port: parse_port(port, uri)?,
        });
    }

    if let Some(rest) = uri.strip_prefix("mc://") {
        let (host, port) = parse_endpoint(rest, uri)?;
        return Ok(InputSpec::Multicast { host, port });
    }

    if let Some(rest) = uri.strip_prefix("rtsp://") {
        if rest.is_empty() {
            return Err(invalid(uri, "RTSP URI has no server"));
        }
        return Ok(InputSpec::Rtsp {
            uri: uri.to_string(),
        });
    }

    if !uri.is_empty() && Path::new(uri).is_file() {
        return Ok(InputSpec::File {
            path: PathBuf::from(uri),
        });
    }

    Err(invalid(
        uri,
        "not a device, csi://, udp://, rtp://, mc://, rtsp:// URI or existing file",
    ))
}
