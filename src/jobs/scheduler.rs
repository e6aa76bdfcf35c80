use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::AppState;

const SWEEP_SCHEDULE: &str = "0 */30 * * * *";
const COMPLETED_RETENTION_HOURS: i64 = 1;
const IDLE_RETENTION_HOURS: i64 = 24;

pub async fn start_scheduler(state: Arc<AppState>) {
    if let Err(e) = run_scheduler(state).await {
        tracing::error!("Session sweeper failed to start: {}", e);
    }
}

async fn run_scheduler(state: Arc<AppState>) -> Result<()> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(SWEEP_SCHEDULE, move |_id, _scheduler| {
        let state = state.clone();
        Box::pin(async move {
            let removed = sweep_stale_sessions(&state);
            if removed > 0 {
                tracing::info!("Swept {} stale survey sessions", removed);
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(())
}

/// Drops abandoned sessions. Completed sessions are kept for a short while
/// so the completion screen can still be reloaded; untouched drafts linger
/// for a day.
pub fn sweep_stale_sessions(state: &AppState) -> usize {
    let now = Utc::now();
    let before = state.sessions.len();
    state.sessions.retain(|_, session| {
        let idle = now - session.last_activity();
        if session.is_completed() {
            idle < Duration::hours(COMPLETED_RETENTION_HOURS)
        } else {
            idle < Duration::hours(IDLE_RETENTION_HOURS)
        }
    });
    before.saturating_sub(state.sessions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    use crate::api::sheetdb::SheetDbClient;
    use crate::wizard::session::WizardSession;

    fn test_state() -> AppState {
        AppState {
            sessions: DashMap::new(),
            sheetdb: SheetDbClient::new("http://127.0.0.1:9".to_string()),
        }
    }

    #[test]
    fn fresh_sessions_survive_the_sweep() {
        let state = test_state();
        state.sessions.insert("fresh".to_string(), WizardSession::new());
        assert_eq!(sweep_stale_sessions(&state), 0);
        assert!(state.sessions.contains_key("fresh"));
    }

    #[test]
    fn stale_drafts_are_dropped_after_a_day() {
        let state = test_state();
        let mut stale = WizardSession::new();
        stale.set_last_activity(Utc::now() - Duration::hours(25));
        let mut recent = WizardSession::new();
        recent.set_last_activity(Utc::now() - Duration::hours(23));
        state.sessions.insert("stale".to_string(), stale);
        state.sessions.insert("recent".to_string(), recent);
        assert_eq!(sweep_stale_sessions(&state), 1);
        assert!(!state.sessions.contains_key("stale"));
        assert!(state.sessions.contains_key("recent"));
    }
}
