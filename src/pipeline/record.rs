//! Per-request bookkeeping of activated plugins.

/// Which plugins' pre-hooks ran for one request, in activation order.
///
/// Append-only during the forward phase; the reverse phase walks it
/// backwards so each activated plugin gets exactly one post-hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRecord {
    activated: Vec<usize>,
    short_circuited_by: Option<usize>,
    failed_at: Option<usize>,
    provider_invoked: bool,
}

impl ExecutionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            activated: Vec::with_capacity(n),
            ..Default::default()
        }
    }

    pub(crate) fn activate(&mut self, index: usize) {
        debug_assert!(
            !self.activated.contains(&index),
            "plugin #{index} activated twice"
        );
        self.activated.push(index);
    }

    pub(crate) fn mark_short_circuit(&mut self, index: usize) {
        self.short_circuited_by = Some(index);
    }

    pub(crate) fn mark_failed(&mut self, index: usize) {
        self.failed_at = Some(index);
    }

    pub(crate) fn mark_provider_invoked(&mut self) {
        self.provider_invoked = true;
    }

    /// Activated indices in activation order.
    pub fn activated(&self) -> &[usize] {
        &self.activated
    }

    /// Activated indices in teardown order.
    pub fn teardown_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.activated.iter().rev().copied()
    }

    pub fn is_activated(&self, index: usize) -> bool {
        self.activated.contains(&index)
    }

    pub fn short_circuited_by(&self) -> Option<usize> {
        self.short_circuited_by
    }

    /// Index of the pre-hook that failed or was cancelled mid-call.
    pub fn failed_at(&self) -> Option<usize> {
        self.failed_at
    }

    pub fn provider_invoked(&self) -> bool {
        self.provider_invoked
    }

    pub fn len(&self) -> usize {
        self.activated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activated.is_empty()
    }
}
