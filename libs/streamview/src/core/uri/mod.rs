// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Source and destination addressing.
//!
//! Callers describe a session entirely through two URI strings. This module
//! turns them into [`InputSpec`] / [`OutputSpec`] values before any hardware
//! is touched.

mod input;
mod output;
mod resolution;

pub use input::{parse_input, InputSpec};
pub use output::{parse_output, OutputSpec};
pub use resolution::{parse_resolution, Resolution};

use std::net::IpAddr;

use crate::core::{Result, StreamError};

fn invalid(uri: &str, reason: &str) -> StreamError {
    StreamError::InvalidUri(format!("'{}': {}", uri, reason))
}

/// Port in 1..=65535. Anything else is rejected rather than defaulted.
pub(crate) fn parse_port(text: &str, uri: &str) -> Result<u16> {
    let port: u16 = parse_digits(text)
        .ok_or_else(|| invalid(uri, &format!("port '{}' is not a number in 1..=65535", text)))?;
    if port == 0 {
        return Err(invalid(uri, "port 0 is not allowed"));
    }
    Ok(port)
}

/// Unsigned decimal made of ASCII digits only; no sign, no padding.
pub(crate) fn parse_digits<T: std::str::FromStr>(text: &str) -> Option<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// IPv4 or IPv6 literal, IPv6 optionally in brackets.
pub(crate) fn parse_host(text: &str, uri: &str) -> Result<IpAddr> {
    let bare = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);
    bare.parse()
        .map_err(|_| invalid(uri, &format!("host '{}' is not an IP address", text)))
}

/// Split `host:port` at the last colon. `None` when there is no colon.
pub(crate) fn split_host_port(authority: &str) -> Option<(&str, &str)> {
    authority.rsplit_once(':')
}

/// `host:port` with a mandatory host.
pub(crate) fn parse_endpoint(authority: &str, uri: &str) -> Result<(IpAddr, u16)> {
    let (host, port) =
        split_host_port(authority).ok_or_else(|| invalid(uri, "expected host:port"))?;
    if host.is_empty() {
        return Err(invalid(uri, "host is required"));
    }
    Ok((parse_host(host, uri)?, parse_port(port, uri)?))
}

pub(crate) fn format_host(host: &IpAddr) -> String {
    match host {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{}]", v6),
    }
}
