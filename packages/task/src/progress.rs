//! Step reporting for [`crate::Task::analyse`].
//!
//! The CLI renders steps as progress bars; library callers and tests pass
//! [`NullProgress`].

/// The steps of one task analysis, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Acquire,
    ReadReference,
    Compare,
    Store,
    Export,
}

impl Step {
    pub const ALL: [Self; 5] = [
        Self::Acquire,
        Self::ReadReference,
        Self::Compare,
        Self::Store,
        Self::Export,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Acquire => "acquiring OSM ways",
            Self::ReadReference => "reading reference data",
            Self::Compare => "comparing",
            Self::Store => "storing layers",
            Self::Export => "exporting",
        }
    }
}

/// Receives step updates from a running task.
pub trait ProgressCallback: Send + Sync {
    /// A step started.
    fn begin(&self, step: Step);

    /// A step completed.
    fn end(&self, step: Step);

    /// The task completed; `summary` describes the results.
    fn done(&self, summary: &str);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn begin(&self, _step: Step) {}
    fn end(&self, _step: Step) {}
    fn done(&self, _summary: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_have_distinct_labels() {
        let mut labels: Vec<&str> = Step::ALL.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Step::ALL.len());
    }
}
