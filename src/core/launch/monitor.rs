// ─── Installation monitor ───
// After launching a freshly patched game, BepInEx creates its working
// directories on first start. Their appearance is the only evidence we use
// that the framework loaded.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::cancel::CancelSignal;
use crate::core::error::ManagerResult;
use crate::core::layout::FrameworkLayout;
use crate::core::state::MonitorSettings;

/// Progress of one monitoring run. Terminal states are final; a new run
/// starts a new machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InstallationState {
    Launched,
    Polling { polls: u32 },
    Confirmed { polls: u32 },
    TimedOut { polls: u32 },
}

impl InstallationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstallationState::Confirmed { .. } | InstallationState::TimedOut { .. }
        )
    }

    /// Record one poll result. Terminal states ignore further input.
    pub fn advance(self, dirs_present: bool, max_polls: u32) -> Self {
        let polls = match self {
            InstallationState::Launched => 1,
            InstallationState::Polling { polls } => polls + 1,
            terminal => return terminal,
        };
        if dirs_present {
            InstallationState::Confirmed { polls }
        } else if polls >= max_polls {
            InstallationState::TimedOut { polls }
        } else {
            InstallationState::Polling { polls }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MonitorOutcome {
    Confirmed { polls: u32 },
    TimedOut { polls: u32 },
    Cancelled { polls: u32 },
}

pub struct InstallationMonitor {
    settings: MonitorSettings,
}

impl InstallationMonitor {
    pub fn new(settings: MonitorSettings) -> Self {
        Self { settings }
    }

    /// Launch once, then poll for the first-run directories once per interval.
    /// A launch error is returned as-is without polling.
    #[instrument(skip(self, launch, cancel))]
    pub async fn monitor<L>(
        &self,
        game_dir: &Path,
        launch: L,
        cancel: &CancelSignal,
    ) -> ManagerResult<MonitorOutcome>
    where
        L: FnOnce() -> ManagerResult<()>,
    {
        launch()?;

        let layout = FrameworkLayout::new(game_dir);
        let max_polls = self.settings.max_polls.max(1);
        let interval = self.settings.poll_interval();
        let mut state = InstallationState::Launched;

        loop {
            let polls_so_far = match state {
                InstallationState::Polling { polls } => polls,
                _ => 0,
            };
            if cancel.is_cancelled() {
                info!("Monitoring cancelled after {} polls", polls_so_far);
                return Ok(MonitorOutcome::Cancelled {
                    polls: polls_so_far,
                });
            }

            state = state.advance(layout.first_run_complete(), max_polls);
            match state {
                InstallationState::Confirmed { polls } => {
                    info!("BepInEx first run confirmed after {} polls", polls);
                    return Ok(MonitorOutcome::Confirmed { polls });
                }
                InstallationState::TimedOut { polls } => {
                    tokio::time::sleep(interval).await;
                    info!("BepInEx did not initialise after {} polls", polls);
                    return Ok(MonitorOutcome::TimedOut { polls });
                }
                _ => {
                    debug!("Poll {}: first-run directories not present yet", polls_so_far + 1);
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::cancel_pair;
    use crate::core::error::ManagerError;
    use crate::core::layout::FIRST_RUN_DIRS;
    use std::cell::Cell;
    use std::time::Duration;

    fn monitor() -> InstallationMonitor {
        InstallationMonitor::new(MonitorSettings::default())
    }

    #[test]
    fn state_machine_reaches_terminals() {
        let s = InstallationState::Launched.advance(false, 2);
        assert_eq!(s, InstallationState::Polling { polls: 1 });
        let s = s.advance(false, 2);
        assert_eq!(s, InstallationState::TimedOut { polls: 2 });
        assert!(s.is_terminal());
        assert_eq!(s.advance(true, 2), s);
    }

    #[tokio::test(start_paused = true)]
    async fn confirms_after_one_poll_when_dirs_exist() {
        let tmp = tempfile::tempdir().unwrap();
        for dir in FIRST_RUN_DIRS {
            std::fs::create_dir_all(tmp.path().join("BepInEx").join(dir)).unwrap();
        }

        let launches = Cell::new(0);
        let outcome = monitor()
            .monitor(
                tmp.path(),
                || {
                    launches.set(launches.get() + 1);
                    Ok(())
                },
                &CancelSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, MonitorOutcome::Confirmed { polls: 1 });
        assert_eq!(launches.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_exactly_max_polls() {
        let tmp = tempfile::tempdir().unwrap();
        // Three of four is not enough.
        for dir in &FIRST_RUN_DIRS[..3] {
            std::fs::create_dir_all(tmp.path().join("BepInEx").join(dir)).unwrap();
        }

        let start = tokio::time::Instant::now();
        let outcome = monitor()
            .monitor(tmp.path(), || Ok(()), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, MonitorOutcome::TimedOut { polls: 120 });
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_skips_polling() {
        let tmp = tempfile::tempdir().unwrap();
        let start = tokio::time::Instant::now();
        let err = monitor()
            .monitor(
                tmp.path(),
                || Err(ManagerError::LaunchFailure("no exe".into())),
                &CancelSignal::never(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::LaunchFailure(_)));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_before_the_next_tick() {
        let tmp = tempfile::tempdir().unwrap();
        let (handle, signal) = cancel_pair();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2_500)).await;
            handle.cancel();
            handle
        });

        let outcome = monitor()
            .monitor(tmp.path(), || Ok(()), &signal)
            .await
            .unwrap();
        let _handle = canceller.await.unwrap();

        assert_eq!(outcome, MonitorOutcome::Cancelled { polls: 3 });
    }
}
