// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crate::core::{
    parse_input, parse_output, BuildOutcome, CaptureFormat, ExternalMode, GraphBuilder,
    GraphDescription, InputSpec, OutputSpec, PlatformKind, Result, SessionConfig,
};

/// How the session's output is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// The graph ends in a display, file or network sink.
    Graph,
    /// Raw frames are pulled into the session's frame buffer.
    Capture(CaptureFormat),
    /// JPEG frames are served over HTTP.
    HttpRelay,
}

/// Fully resolved session: typed endpoints, platform and the graph to run.
///
/// Resolving touches no hardware, so a plan can be inspected (or printed)
/// without starting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub input: InputSpec,
    pub output: OutputSpec,
    pub platform: PlatformKind,
    pub mode: SessionMode,
    pub graph: GraphDescription,
}

impl SessionPlan {
    pub fn resolve(config: &SessionConfig) -> Result<Self> {
        let input = parse_input(&config.input_uri)?;
        let output = parse_output(&config.output_uri)?;
        let platform = config.resolve_platform();
        let builder = GraphBuilder::new(&config.encoding_config(), platform);

        let (mode, graph) = match builder.build(&input, &output)? {
            BuildOutcome::Graph(graph) => (SessionMode::Graph, graph),
            BuildOutcome::NeedsExternalSession(ExternalMode::AppSink) => (
                SessionMode::Capture(builder.capture_format()),
                builder.build_appsink(&input)?,
            ),
            BuildOutcome::NeedsExternalSession(ExternalMode::Http) => {
                (SessionMode::HttpRelay, builder.build_http_relay(&input)?)
            }
        };

        Ok(Self {
            input,
            output,
            platform,
            mode,
            graph,
        })
    }

    pub fn launch_string(&self) -> String {
        self.graph.to_launch_string()
    }

    pub fn is_late_binding(&self) -> bool {
        self.graph.pending_link().is_some()
    }
}
