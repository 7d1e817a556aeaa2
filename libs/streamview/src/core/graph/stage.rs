// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// One processing step: an engine element factory plus its properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    factory: String,
    name: Option<String>,
    properties: Vec<(String, String)>,
}

impl Stage {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            name: None,
            properties: Vec::new(),
        }
    }

    /// Caps constraint between two stages.
    pub fn caps(caps: impl Into<String>) -> Self {
        Self::new("capsfilter").property("caps", caps.into())
    }

    /// Instance name, used to look the element up after instantiation.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a property. Order is preserved in the rendered description.
    pub fn property(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.properties.push((key.into(), value.to_string()));
        self
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property_value(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render as a launch-syntax element, e.g. `udpsink host=10.0.0.2 port=5000`.
    pub fn to_launch_fragment(&self) -> String {
        let mut out = self.factory.clone();
        if let Some(name) = &self.name {
            out.push_str(" name=");
            out.push_str(&quote_value(name));
        }
        for (key, value) in &self.properties {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(&quote_value(value));
        }
        out
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_launch_fragment())
    }
}

fn needs_quoting(value: &str) -> bool {
    const SPECIAL: &[char] = &[',', ';', '!', '"', '\'', '(', ')', '=', '\\'];
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || SPECIAL.contains(&c))
}

fn quote_value(value: &str) -> String {
    if !needs_quoting(value) {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fragment() {
        let stage = Stage::new("udpsink").property("host", "10.0.0.2").property("port", 5000);
        assert_eq!(stage.to_launch_fragment(), "udpsink host=10.0.0.2 port=5000");
        assert_eq!(stage.property_value("port"), Some("5000"));
        assert_eq!(stage.property_value("ttl"), None);
    }

    #[test]
    fn test_named_fragment() {
        let stage = Stage::new("queue").named("rtsp-entry");
        assert_eq!(stage.to_launch_fragment(), "queue name=rtsp-entry");
        assert_eq!(stage.name(), Some("rtsp-entry"));
    }

    #[test]
    fn test_caps_are_quoted() {
        let stage = Stage::caps("video/x-raw(memory:NVMM),width=1280");
        assert_eq!(
            stage.to_launch_fragment(),
            "capsfilter caps=\"video/x-raw(memory:NVMM),width=1280\""
        );
    }

    #[test]
    fn test_paths_with_spaces_and_quotes() {
        let stage = Stage::new("filesink").property("location", "/tmp/my \"clip\".mp4");
        assert_eq!(
            stage.to_launch_fragment(),
            "filesink location=\"/tmp/my \\\"clip\\\".mp4\""
        );
    }
}
