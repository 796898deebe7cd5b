//! Task metadata.

use std::fmt;

/// What a stage model predicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    /// Continuous score (single output group).
    Regression,
    /// One of `labels`. Label `i` is class index `i`.
    Classification { labels: Vec<String> },
}

impl TaskKind {
    pub fn classification<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TaskKind::Classification {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    pub fn is_classification(&self) -> bool {
        matches!(self, TaskKind::Classification { .. })
    }

    #[inline]
    pub fn is_regression(&self) -> bool {
        matches!(self, TaskKind::Regression)
    }

    /// Class labels; empty for regression.
    pub fn labels(&self) -> &[String] {
        match self {
            TaskKind::Regression => &[],
            TaskKind::Classification { labels } => labels,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Regression => f.write_str("regression"),
            TaskKind::Classification { labels } => {
                write!(f, "classification [{}]", labels.join(", "))
            }
        }
    }
}
