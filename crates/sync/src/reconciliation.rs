//! The periodic reconciliation report job.
//!
//! Compares aggregate state across the two systems and reports drift.
//! Currently a stub with fixed figures; it exists so the schedule, task
//! routing, and result plumbing are already in place.

use tracing::info;

use saltbridge_core::ReconciliationReport;

/// Produce the reconciliation report.
#[must_use]
pub fn run_reconciliation() -> ReconciliationReport {
    let report = ReconciliationReport {
        compared: 10_000,
        mismatches: 45,
        accuracy: 0.995,
    };
    info!(
        compared = report.compared,
        mismatches = report.mismatches,
        accuracy = report.accuracy,
        "reconciliation done"
    );
    report
}
