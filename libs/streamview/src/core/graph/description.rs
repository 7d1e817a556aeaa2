// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use super::Stage;

/// Link deferred until a late-binding source announces its stream.
///
/// `source` and `target` name two adjacent stages. They are rendered without
/// a link between them; the engine connects them when the source's output
/// pad appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLink {
    pub source: String,
    pub target: String,
}

impl PendingLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Ordered source → transform → sink chain.
///
/// Pure value: building one touches nothing outside the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDescription {
    stages: Vec<Stage>,
    pending_link: Option<PendingLink>,
}

impl GraphDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stages(stages: impl IntoIterator<Item = Stage>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
            pending_link: None,
        }
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn extend(&mut self, stages: impl IntoIterator<Item = Stage>) {
        self.stages.extend(stages);
    }

    pub fn with_pending_link(mut self, link: Option<PendingLink>) -> Self {
        self.pending_link = link;
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn pending_link(&self) -> Option<&PendingLink> {
        self.pending_link.as_ref()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Factory names in chain order.
    pub fn factories(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::factory).collect()
    }

    /// Index of the first stage built from `factory`.
    pub fn position(&self, factory: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.factory() == factory)
    }

    pub fn contains(&self, factory: &str) -> bool {
        self.position(factory).is_some()
    }

    pub fn find_named(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == Some(name))
    }

    fn is_deferred(&self, upstream: &Stage, downstream: &Stage) -> bool {
        match &self.pending_link {
            Some(link) => {
                upstream.name() == Some(link.source.as_str())
                    && downstream.name() == Some(link.target.as_str())
            }
            None => false,
        }
    }

    /// Render in the engine's launch syntax.
    pub fn to_launch_string(&self) -> String {
        let mut out = String::new();
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                if self.is_deferred(&self.stages[i - 1], stage) {
                    out.push(' ');
                } else {
                    out.push_str(" ! ");
                }
            }
            out.push_str(&stage.to_launch_fragment());
        }
        out
    }
}

impl fmt::Display for GraphDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_launch_string())
    }
}
