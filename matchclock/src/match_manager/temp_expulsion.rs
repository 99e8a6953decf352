use super::Duration;
use log::*;
use matchclock_common::match_snapshot::{Period, PlayerId, TempExpulsionSnapshot};
use serde::{Deserialize, Serialize};

/// A white card countdown. Time is purged whenever a period is in progress, whether play is
/// live or stopped, and is paused between periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempExpulsion {
    pub id: u32,
    pub player_id: PlayerId,
    pub card_event_id: u32,
    pub total_duration: Duration,
    /// Time purged in periods that have already ended
    pub elapsed_at_pause: Duration,
    pub is_completed: bool,
    pub start_period: Period,
    pub start_minute: Duration,
    /// Period elapsed time from which the current period's purge is measured. `None` while
    /// paused between periods.
    pub period_start_effective: Option<Duration>,
}

impl TempExpulsion {
    pub fn time_purged(&self, elapsed: Duration) -> Duration {
        let in_period = self
            .period_start_effective
            .map_or(Duration::ZERO, |start| elapsed.saturating_sub(start));
        self.elapsed_at_pause + in_period
    }

    pub fn time_remaining(&self, elapsed: Duration) -> Duration {
        self.total_duration
            .saturating_sub(self.time_purged(elapsed))
    }

    pub fn is_active(&self) -> bool {
        !self.is_completed
    }

    fn is_due(&self, elapsed: Duration) -> bool {
        self.is_active() && self.time_remaining(elapsed).is_zero()
    }

    fn pause(&mut self, elapsed: Duration) {
        if let Some(start) = self.period_start_effective.take() {
            self.elapsed_at_pause += elapsed.saturating_sub(start);
        }
    }

    pub fn as_snapshot(&self, elapsed: Duration) -> TempExpulsionSnapshot {
        TempExpulsionSnapshot {
            id: self.id,
            player_id: self.player_id,
            secs_remaining: self
                .time_remaining(elapsed)
                .as_secs()
                .try_into()
                .unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TempExpulsionTracker {
    expulsions: Vec<TempExpulsion>,
    next_id: u32,
}

impl TempExpulsionTracker {
    pub(crate) fn from_expulsions(expulsions: Vec<TempExpulsion>) -> Self {
        let next_id = expulsions.iter().map(|e| e.id + 1).max().unwrap_or(0);
        Self {
            expulsions,
            next_id,
        }
    }

    pub(crate) fn as_slice(&self) -> &[TempExpulsion] {
        &self.expulsions
    }

    pub(crate) fn active(&self) -> impl Iterator<Item = &TempExpulsion> {
        self.expulsions.iter().filter(|e| e.is_active())
    }

    /// Starts a new countdown. When no period is in progress the countdown starts out paused.
    pub(crate) fn start(
        &mut self,
        player_id: PlayerId,
        card_event_id: u32,
        period: Period,
        elapsed: Duration,
        period_in_progress: bool,
        total_duration: Duration,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.expulsions.push(TempExpulsion {
            id,
            player_id,
            card_event_id,
            total_duration,
            elapsed_at_pause: Duration::ZERO,
            is_completed: false,
            start_period: period,
            start_minute: elapsed,
            period_start_effective: period_in_progress.then_some(elapsed),
        });
        id
    }

    /// Folds the purge of the period ending at `elapsed` into each active countdown
    pub(crate) fn pause_all(&mut self, elapsed: Duration) {
        self.expulsions
            .iter_mut()
            .filter(|e| e.is_active())
            .for_each(|e| e.pause(elapsed));
    }

    /// Restarts each active countdown from the beginning of a new period
    pub(crate) fn resume_all(&mut self) {
        self.expulsions
            .iter_mut()
            .filter(|e| e.is_active())
            .for_each(|e| e.period_start_effective = Some(Duration::ZERO));
    }

    /// Marks every countdown that has run out as completed, returning those expulsions
    pub(crate) fn complete_due(&mut self, elapsed: Duration) -> Vec<TempExpulsion> {
        let mut completed = vec![];
        for expulsion in self.expulsions.iter_mut() {
            if expulsion.is_due(elapsed) {
                expulsion.pause(elapsed);
                expulsion.is_completed = true;
                completed.push(expulsion.clone());
            }
        }
        completed
    }

    /// Ends every active countdown for `player_id` without letting it complete. Returns the
    /// number cancelled.
    pub(crate) fn cancel_for_player(&mut self, player_id: PlayerId, elapsed: Duration) -> usize {
        let mut cancelled = 0;
        for expulsion in self
            .expulsions
            .iter_mut()
            .filter(|e| e.is_active() && e.player_id == player_id)
        {
            expulsion.pause(elapsed);
            expulsion.is_completed = true;
            cancelled += 1;
        }
        cancelled
    }

    pub(crate) fn cancel(&mut self, id: u32, elapsed: Duration) -> Option<&TempExpulsion> {
        let expulsion = self
            .expulsions
            .iter_mut()
            .find(|e| e.id == id && e.is_active())?;
        debug!("Cancelling temporary expulsion {id} of {}", expulsion.player_id);
        expulsion.pause(elapsed);
        expulsion.is_completed = true;
        Some(expulsion)
    }

    pub(crate) fn clear(&mut self) {
        self.expulsions.clear();
        self.next_id = 0;
    }
}
