//! Step configuration: the static, page-owned content of a tour.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StepConfigError;

/// Where the tooltip sits relative to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
    Center,
    Auto,
}

/// One anchored explanation unit of a tour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Selector for the element this step anchors to.
    pub target: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub placement: Placement,
}

impl Step {
    pub fn new(target: &str, title: &str, content: &str) -> Self {
        Self {
            target: target.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            placement: Placement::default(),
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// Upfront "start or skip?" prompt shown before any step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPrompt {
    pub title: String,
    pub content: String,
}

impl ConsentPrompt {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
        }
    }
}

/// Parse a JSON array of steps.
pub fn parse_steps(json: &str) -> Result<Vec<Step>, StepConfigError> {
    Ok(serde_json::from_str(json)?)
}

/// Read a JSON array of steps from disk.
pub async fn load_steps(path: &Path) -> Result<Vec<Step>, StepConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StepConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
    parse_steps(&raw)
}
