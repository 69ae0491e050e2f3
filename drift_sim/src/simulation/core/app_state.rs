// drift_sim/src/simulation/core/app_state.rs

use serde::Serialize;
use std::fmt;

/// The lifecycle of one episode.
///
/// `Init → Running → {Terminated, Truncated}`; `reset` always leads to `Running` and
/// `close` back to `Init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodePhase {
    #[default]
    Init,
    Running,
    Terminated,
    Truncated,
}

impl EpisodePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodePhase::Init => "init",
            EpisodePhase::Running => "running",
            EpisodePhase::Terminated => "terminated",
            EpisodePhase::Truncated => "truncated",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, EpisodePhase::Terminated | EpisodePhase::Truncated)
    }
}

impl fmt::Display for EpisodePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
