use std::str::FromStr;
use serde::Deserialize;

/// What happens to the dependents of a task whose work failed.
///
/// - `Skip`: dependents (transitively) never run and are reported as
///   `BlockedBySourceFailure` (default behaviour).
/// - `Continue`: a failed task releases its dependents exactly like a
///   successful one.
/// - `Abort`: the first failure cancels the whole run; tasks that have not
///   started yet are reported as `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[serde(alias = "skip_dependents")]
    Skip,
    #[serde(alias = "continue_dependents")]
    Continue,
    #[serde(alias = "abort_run")]
    Abort,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Skip
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "skip_dependents" => Ok(FailurePolicy::Skip),
            "continue" | "continue_dependents" => Ok(FailurePolicy::Continue),
            "abort" | "abort_run" => Ok(FailurePolicy::Abort),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"skip\", \"continue\" or \"abort\")"
            )),
        }
    }
}

/// What happens to *running* tasks when a run is cancelled.
///
/// In both modes no new task is started after cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelBehaviour {
    /// Let running tasks finish and report their real outcome.
    Drain,
    /// Abort running tasks; they are reported as `Cancelled`.
    Abort,
}

impl Default for CancelBehaviour {
    fn default() -> Self {
        CancelBehaviour::Drain
    }
}

impl FromStr for CancelBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drain" => Ok(CancelBehaviour::Drain),
            "abort" => Ok(CancelBehaviour::Abort),
            other => Err(format!(
                "invalid cancel_behaviour: {other} (expected \"drain\" or \"abort\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_policy_parses_short_and_long_names() {
        assert_eq!("skip".parse::<FailurePolicy>(), Ok(FailurePolicy::Skip));
        assert_eq!(
            " Continue_Dependents ".parse::<FailurePolicy>(),
            Ok(FailurePolicy::Continue)
        );
        assert_eq!("abort_run".parse::<FailurePolicy>(), Ok(FailurePolicy::Abort));
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn cancel_behaviour_defaults_to_drain() {
        assert_eq!(CancelBehaviour::default(), CancelBehaviour::Drain);
        assert_eq!("ABORT".parse::<CancelBehaviour>(), Ok(CancelBehaviour::Abort));
    }
}
