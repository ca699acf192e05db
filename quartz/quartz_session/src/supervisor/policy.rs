//! Crash-loop policy.
//!
//! The policy decides, after each crash, whether a module is relaunched or
//! has its autorestart disabled for the rest of the session.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Decision taken after a crash was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashVerdict {
    /// Relaunch the module after the configured delay.
    Relaunch,

    /// The crash threshold was reached; disable autorestart.
    Disable,
}

/// Configuration for crash handling and process teardown.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// Number of crashes at which autorestart is disabled.
    pub max_crashes: u32,

    /// Time window the crashes must fall into. `None` counts crashes over
    /// the whole session, which is the default.
    pub crash_window: Option<Duration>,

    /// Minimum delay between a crash and the relaunch, bounding tight
    /// crash-relaunch loops.
    pub restart_delay: Duration,

    /// Grace period between a termination request and a forced kill.
    pub stop_grace: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_crashes: 5,
            crash_window: None,
            restart_delay: Duration::from_secs(1),
            stop_grace: Duration::from_secs(5),
        }
    }
}

impl RestartPolicy {
    /// Record a crash at `now` into `history` and decide what to do.
    ///
    /// With a bounded `crash_window`, entries older than the window are
    /// pruned first, so only a burst of `max_crashes` crashes within the
    /// window trips the verdict.
    pub fn assess(&self, history: &mut Vec<DateTime<Utc>>, now: DateTime<Utc>) -> CrashVerdict {
        if let Some(window) = self.crash_window {
            let window = chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::MAX);
            let cutoff = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
            history.retain(|stamp| *stamp > cutoff);
        }
        history.push(now);

        if history.len() as u32 >= self.max_crashes {
            CrashVerdict::Disable
        } else {
            CrashVerdict::Relaunch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn policy(max_crashes: u32, window: Option<Duration>) -> RestartPolicy {
        RestartPolicy {
            max_crashes,
            crash_window: window,
            ..RestartPolicy::default()
        }
    }

    #[test]
    fn test_default_policy_numbers() {
        let policy = RestartPolicy::default();
        assert_eq!(policy.max_crashes, 5);
        assert_eq!(policy.crash_window, None);
        assert_eq!(policy.restart_delay, Duration::from_secs(1));
        assert_eq!(policy.stop_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_disables_exactly_at_threshold() {
        let policy = policy(3, None);
        let mut history = Vec::new();
        let base = Utc::now();

        assert_eq!(policy.assess(&mut history, base), CrashVerdict::Relaunch);
        assert_eq!(
            policy.assess(&mut history, base + TimeDelta::seconds(1)),
            CrashVerdict::Relaunch
        );
        assert_eq!(
            policy.assess(&mut history, base + TimeDelta::seconds(2)),
            CrashVerdict::Disable
        );
    }

    #[test]
    fn test_threshold_of_one_disables_on_first_crash() {
        let policy = policy(1, None);
        let mut history = Vec::new();
        assert_eq!(policy.assess(&mut history, Utc::now()), CrashVerdict::Disable);
    }

    #[test]
    fn test_window_prunes_old_crashes() {
        let policy = policy(3, Some(Duration::from_secs(10)));
        let mut history = Vec::new();
        let base = Utc::now();

        assert_eq!(policy.assess(&mut history, base), CrashVerdict::Relaunch);
        assert_eq!(
            policy.assess(&mut history, base + TimeDelta::seconds(1)),
            CrashVerdict::Relaunch
        );
        // Third crash lands outside the window of the first two.
        assert_eq!(
            policy.assess(&mut history, base + TimeDelta::seconds(30)),
            CrashVerdict::Relaunch
        );
        assert_eq!(history.len(), 1, "old crashes should have been pruned");
    }

    #[test]
    fn test_unbounded_window_counts_everything() {
        let policy = policy(5, None);
        let mut history = Vec::new();
        let base = Utc::now();

        for offset in 0..4 {
            assert_eq!(
                policy.assess(&mut history, base + TimeDelta::days(offset)),
                CrashVerdict::Relaunch
            );
        }
        assert_eq!(
            policy.assess(&mut history, base + TimeDelta::days(100)),
            CrashVerdict::Disable
        );
    }
}
