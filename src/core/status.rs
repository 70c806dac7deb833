//! Status sets for projects and tasks.
//!
//! Each kind has exactly three states arranged in a line. The enums are the
//! only representation, so an out-of-set value cannot be constructed or
//! deserialized.

use serde::{Deserialize, Serialize};

/// An ordered, closed set of statuses forming one board's columns.
pub trait Lifecycle: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Every state, in board order (left to right).
    const ORDER: &'static [Self];

    /// Wire representation.
    fn as_str(&self) -> &'static str;

    /// Column heading.
    fn label(&self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        Self::ORDER.iter().copied().find(|s2| s2.as_str() == s)
    }

    fn position(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).unwrap_or(0)
    }

    /// The adjacent state to the left, `None` at the start of the line.
    fn prev(&self) -> Option<Self> {
        self.position()
            .checked_sub(1)
            .and_then(|i| Self::ORDER.get(i).copied())
    }

    /// The adjacent state to the right, `None` at the end of the line.
    fn next(&self) -> Option<Self> {
        Self::ORDER.get(self.position() + 1).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Idea,
    InProgress,
    Finished,
}

impl Lifecycle for ProjectStatus {
    const ORDER: &'static [Self] = &[Self::Idea, Self::InProgress, Self::Finished];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::InProgress => "in-progress",
            Self::Finished => "finished",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Idea => "Idea",
            Self::InProgress => "In Progress",
            Self::Finished => "Finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Done,
}

impl Lifecycle for TaskStatus {
    const ORDER: &'static [Self] = &[Self::NotStarted, Self::InProgress, Self::Done];

    fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
