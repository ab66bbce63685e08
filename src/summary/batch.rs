//! Summary over several sequences executed one after another

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::failure::{ExitCode, ExitCodeAggregator};
use super::sequence::SequenceResult;

/// One named sequence within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedResult {
    pub name: String,
    pub result: SequenceResult,
}

/// Batch summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub created_at: DateTime<Utc>,

    /// Aggregated exit code (first failure wins)
    pub exit_code: i32,

    pub sequence_count: usize,
    pub sequences_succeeded: usize,
    pub sequences_failed: usize,

    /// Configured sequences never started because an earlier one failed
    pub sequences_skipped: usize,

    pub duration_ms: u64,
    pub human_summary: String,
    pub sequences: Vec<NamedResult>,
}

impl BatchSummary {
    pub fn from_results(results: Vec<NamedResult>, skipped: usize, duration_ms: u64) -> Self {
        let mut aggregator = ExitCodeAggregator::new();
        let mut succeeded = 0;
        let mut failed = 0;

        for named in &results {
            aggregator.add(named.result.exit_code());
            if named.result.success {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }

        let sequence_count = results.len() + skipped;
        let human_summary = if failed == 0 && skipped == 0 {
            format!("All {} sequences succeeded", sequence_count)
        } else {
            let mut parts = vec![format!("{}/{} sequences succeeded", succeeded, sequence_count)];
            if failed > 0 {
                parts.push(format!("{} failed", failed));
            }
            if skipped > 0 {
                parts.push(format!("{} skipped", skipped));
            }
            parts.join(", ")
        };

        Self {
            created_at: Utc::now(),
            exit_code: aggregator.exit_code().as_i32(),
            sequence_count,
            sequences_succeeded: succeeded,
            sequences_failed: failed,
            sequences_skipped: skipped,
            duration_ms,
            human_summary,
            sequences: results,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_i32(self.exit_code).unwrap_or(ExitCode::JobFailed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SequenceSteps;

    fn result(exit_code: ExitCode) -> SequenceResult {
        SequenceResult {
            run_id: "r".to_string(),
            started_at: Utc::now(),
            duration_ms: 1,
            success: exit_code.is_success(),
            message: String::new(),
            failed_step: None,
            failure_kind: None,
            exit_code: exit_code.as_i32(),
            steps: SequenceSteps::default(),
        }
    }

    #[test]
    fn test_all_succeeded() {
        let summary = BatchSummary::from_results(
            vec![
                NamedResult { name: "a".into(), result: result(ExitCode::Success) },
                NamedResult { name: "b".into(), result: result(ExitCode::Success) },
            ],
            0,
            10,
        );
        assert_eq!(summary.exit_code(), ExitCode::Success);
        assert_eq!(summary.human_summary, "All 2 sequences succeeded");
    }

    #[test]
    fn test_failure_and_skipped() {
        let summary = BatchSummary::from_results(
            vec![
                NamedResult { name: "a".into(), result: result(ExitCode::Success) },
                NamedResult { name: "b".into(), result: result(ExitCode::Upload) },
            ],
            1,
            10,
        );
        assert_eq!(summary.exit_code(), ExitCode::Upload);
        assert_eq!(summary.sequence_count, 3);
        assert_eq!(summary.human_summary, "1/3 sequences succeeded, 1 failed, 1 skipped");
    }
}
