// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use super::{format_host, invalid, parse_endpoint};
use crate::core::Result;

/// Where frames go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// On-screen preview, no encoding.
    Local,
    Rtp { host: IpAddr, port: u16 },
    Multicast { host: IpAddr, port: u16 },
    /// Encoded and muxed into an MP4 container.
    Save { path: PathBuf },
    /// MJPEG over HTTP multipart.
    Http,
    /// Raw frames pulled in-process.
    AppSink,
}

impl OutputSpec {
    /// Destination needs an encoder stage.
    pub fn requires_encoding(&self) -> bool {
        matches!(self, Self::Rtp { .. } | Self::Multicast { .. } | Self::Save { .. })
    }

    /// Destination is an in-process consumer with its own fixed topology.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Http | Self::AppSink)
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Rtp { host, port } => write!(f, "rtp://{}:{}", format_host(host), port),
            Self::Multicast { host, port } => write!(f, "mc://{}:{}", format_host(host), port),
            Self::Save { path } => write!(f, "save://{}", path.display()),
            Self::Http => f.write_str("http"),
            Self::AppSink => f.write_str("appsink"),
        }
    }
}

/// Resolve an output URI.
pub fn parse_output(text: &str) -> Result<OutputSpec> {
    let uri = text.trim();
    match uri {
        "local" => return Ok(OutputSpec::Local),
        "http" => return Ok(OutputSpec::Http),
        "appsink" => return Ok(OutputSpec::AppSink),
        _ => {}
    }

    if let Some(rest) = uri.strip_prefix("rtp://") {
        let (host, port) = parse_endpoint(rest, uri)?;
        return Ok(OutputSpec::Rtp { host, port });
    }

    if let Some(rest) = uri.strip_prefix("mc://") {
        let (host, port) = parse_endpoint(rest, uri)?;
        return Ok(OutputSpec::Multicast { host, port });
    }

    if let Some(rest) = uri.strip_prefix("save://") {
        if rest.is_empty() {
            return Err(invalid(uri, "save:// needs a file path"));
        }
        return Ok(OutputSpec::Save {
            path: PathBuf::from(rest),
        });
    }

    Err(invalid(
        uri,
        "expected local, http, appsink, rtp://host:port, mc://host:port or save://path",
    ))
}
