//! Collection of non-fatal problems encountered during a pipeline run.

use serde::Serialize;
use std::fmt;

/// Pipeline stage an issue was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Ocr,
    Preprocess,
    Paginate,
    Fill,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Ocr => "ocr",
            Stage::Preprocess => "preprocess",
            Stage::Paginate => "paginate",
            Stage::Fill => "fill",
        };
        f.write_str(name)
    }
}

/// A recovered failure local to one shape, image or table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub stage: Stage,
    /// 0-based source slide index, when the issue belongs to one slide.
    pub slide_index: Option<usize>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slide_index {
            Some(idx) => write!(f, "[{}] slide {}: {}", self.stage, idx + 1, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

/// Issues gathered across a pipeline run, in the order they were raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub issues: Vec<Issue>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue and log it at warn level.
    pub fn record(&mut self, stage: Stage, slide_index: Option<usize>, message: impl Into<String>) {
        let issue = Issue {
            stage,
            slide_index,
            message: message.into(),
        };
        log::warn!("{}", issue);
        self.issues.push(issue);
    }

    /// Append issues from another report, preserving their order.
    pub fn merge(&mut self, other: Report) {
        self.issues.extend(other.issues);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues raised in `stage`.
    pub fn count(&self, stage: Stage) -> usize {
        self.issues.iter().filter(|i| i.stage == stage).count()
    }

    /// Human-readable summary, one issue per line.
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "No issues.".to_string();
        }

        let mut out = format!("{} issue(s):", self.issues.len());
        for issue in &self.issues {
            out.push_str("\n  ");
            out.push_str(&issue.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut report = Report::new();
        assert_eq!(report.summary(), "No issues.");

        report.record(Stage::Ocr, Some(0), "timed out");
        report.record(Stage::Fill, None, "layout placeholder unreadable");

        assert_eq!(
            report.summary(),
            "2 issue(s):\n  [ocr] slide 1: timed out\n  [fill] layout placeholder unreadable"
        );
        assert_eq!(report.count(Stage::Ocr), 1);
        assert_eq!(report.count(Stage::Extract), 0);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = Report::new();
        first.record(Stage::Extract, Some(1), "a");
        let mut second = Report::new();
        second.record(Stage::Extract, Some(2), "b");

        first.merge(second);
        let messages: Vec<&str> = first.issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }
}
