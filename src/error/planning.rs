// Planning rejection produced by the engine for an invalid configuration

use serde::Serialize;
use std::fmt;

/// A rejected plan: the engine refused the configuration and reported why.
///
/// The raw text may concatenate several independent violations. Checks run
/// substring containment against [`PlanningError::text`]; the order of the
/// blocks follows the engine's traversal and is not part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningError {
    module: String,
    text: String,
    exit_code: Option<i32>,
}

/// Severity prefix of a diagnostic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// One `Error: <summary>` block split out of the raw diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
}

impl PlanningError {
    pub fn new(module: impl Into<String>, text: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            module: module.into(),
            text: text.into(),
            exit_code,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Full diagnostic text as emitted by the engine.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    /// Split the text into individual diagnostic blocks.
    ///
    /// Box-drawing gutters (`╷`, `│`, `╵`) are stripped so colored and
    /// plain engine output parse the same way.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut blocks = Vec::new();
        let mut current: Option<(DiagnosticSeverity, String, Vec<String>)> = None;

        for raw in self.text.lines() {
            let line = strip_gutter(raw);
            let header = line
                .strip_prefix("Error: ")
                .map(|summary| (DiagnosticSeverity::Error, summary))
                .or_else(|| {
                    line.strip_prefix("Warning: ")
                        .map(|summary| (DiagnosticSeverity::Warning, summary))
                });

            match header {
                Some((severity, summary)) => {
                    if let Some(block) = current.take() {
                        blocks.push(finish_block(block));
                    }
                    current = Some((severity, summary.trim().to_string(), Vec::new()));
                }
                None => {
                    if let Some((_, _, detail)) = current.as_mut() {
                        detail.push(line.to_string());
                    }
                }
            }
        }

        if let Some(block) = current.take() {
            blocks.push(finish_block(block));
        }
        blocks
    }

    /// Number of error-severity blocks in the text.
    pub fn error_count(&self) -> usize {
        self.diagnostics()
            .iter()
            .filter(|diag| diag.severity == DiagnosticSeverity::Error)
            .count()
    }
}

fn strip_gutter(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['╷', '╵']);
    trimmed
        .strip_prefix("│ ")
        .or_else(|| trimmed.strip_prefix('│'))
        .unwrap_or(trimmed)
}

fn finish_block((severity, summary, detail): (DiagnosticSeverity, String, Vec<String>)) -> Diagnostic {
    Diagnostic {
        severity,
        summary,
        detail: detail.join("\n").trim().to_string(),
    }
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(
                f,
                "planning of '{}' was rejected (exit code {}):\n{}",
                self.module, code, self.text
            ),
            None => write!(f, "planning of '{}' was rejected:\n{}", self.module, self.text),
        }
    }
}

impl std::error::Error for PlanningError {}
