//! Exit gating while a final delivery is in flight.

use std::time::Duration;

use sessionlog_types::config::ModeConfig;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Idle,
    Quitting { since: Instant, delivered: bool },
    Completed,
}

/// What the host should do with an exit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Allow,
    /// First request in local-only mode: write the snapshot, then exit.
    SaveAndAllow,
    /// First request with sending enabled: start the final delivery and veto.
    DeliverAndVeto,
    Veto,
}

impl ExitDecision {
    pub fn allows_exit(self) -> bool {
        matches!(self, ExitDecision::Allow | ExitDecision::SaveAndAllow)
    }
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    state: ShutdownState,
    ceiling: Duration,
}

impl ShutdownCoordinator {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            state: ShutdownState::Idle,
            ceiling,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    pub fn request_exit(&mut self, now: Instant, mode: ModeConfig) -> ExitDecision {
        match self.state {
            ShutdownState::Idle if mode.send_to_server => {
                info!("Exit requested; sending the session log before quitting");
                self.state = ShutdownState::Quitting {
                    since: now,
                    delivered: false,
                };
                ExitDecision::DeliverAndVeto
            }
            ShutdownState::Idle => {
                self.state = ShutdownState::Completed;
                if mode.save_local_json {
                    ExitDecision::SaveAndAllow
                } else {
                    ExitDecision::Allow
                }
            }
            ShutdownState::Quitting { since, delivered } => {
                let waited = now.saturating_duration_since(since);
                if delivered {
                    info!("Allowing exit; final delivery completed");
                } else if waited >= self.ceiling {
                    warn!(
                        "Allowing exit; final delivery timed out after {:.1}s",
                        waited.as_secs_f32()
                    );
                } else {
                    return ExitDecision::Veto;
                }
                self.state = ShutdownState::Completed;
                ExitDecision::Allow
            }
            ShutdownState::Completed => ExitDecision::Allow,
        }
    }

    /// Records that the final delivery finished, successfully or not.
    pub fn mark_delivered(&mut self) {
        if let ShutdownState::Quitting { delivered, .. } = &mut self.state {
            *delivered = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEND: ModeConfig = ModeConfig {
        save_local_json: true,
        send_to_server: true,
    };
    const SAVE_ONLY: ModeConfig = ModeConfig {
        save_local_json: true,
        send_to_server: false,
    };
    const OFF: ModeConfig = ModeConfig {
        save_local_json: false,
        send_to_server: false,
    };

    #[test]
    fn vetoes_until_ceiling_without_completion() {
        let start = Instant::now();
        let mut c = ShutdownCoordinator::new(Duration::from_secs(5));

        assert_eq!(c.request_exit(start, SEND), ExitDecision::DeliverAndVeto);
        assert_eq!(
            c.request_exit(start + Duration::from_millis(4_999), SEND),
            ExitDecision::Veto
        );
        assert_eq!(
            c.request_exit(start + Duration::from_secs(5), SEND),
            ExitDecision::Allow
        );
        assert_eq!(c.state(), ShutdownState::Completed);
        assert_eq!(
            c.request_exit(start + Duration::from_secs(6), SEND),
            ExitDecision::Allow
        );
    }

    #[test]
    fn completion_allows_exit_before_ceiling() {
        let start = Instant::now();
        let mut c = ShutdownCoordinator::new(Duration::from_secs(5));
        c.request_exit(start, SEND);
        c.mark_delivered();
        assert_eq!(
            c.request_exit(start + Duration::from_millis(10), SEND),
            ExitDecision::Allow
        );
    }

    #[test]
    fn local_only_saves_then_allows() {
        let mut c = ShutdownCoordinator::new(Duration::from_secs(5));
        let decision = c.request_exit(Instant::now(), SAVE_ONLY);
        assert_eq!(decision, ExitDecision::SaveAndAllow);
        assert!(decision.allows_exit());
        assert_eq!(c.request_exit(Instant::now(), SAVE_ONLY), ExitDecision::Allow);
    }

    #[test]
    fn disabled_mode_allows_immediately() {
        let mut c = ShutdownCoordinator::new(Duration::from_secs(5));
        assert_eq!(c.request_exit(Instant::now(), OFF), ExitDecision::Allow);
    }

    #[test]
    fn completion_outside_quitting_is_ignored() {
        let mut c = ShutdownCoordinator::new(Duration::from_secs(5));
        c.mark_delivered();
        assert_eq!(c.state(), ShutdownState::Idle);
    }
}
