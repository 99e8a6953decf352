use super::Duration;
use matchclock_common::{
    bundles::OptTeamBundle,
    match_snapshot::{Period, StoppageKind},
    team::Team,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stoppage {
    pub id: u32,
    pub kind: StoppageKind,
    pub period: Period,
    pub start_time: Duration,
    pub end_time: Option<Duration>,
    pub beneficiary: Option<Team>,
}

impl Stoppage {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Length of a closed stoppage, zero while it is still open
    pub fn duration(&self) -> Duration {
        self.end_time
            .map_or(Duration::ZERO, |end| end.saturating_sub(self.start_time))
    }

    /// Length of the stoppage as seen at `elapsed`, counting an open stoppage up to that point
    pub fn duration_at(&self, elapsed: Duration) -> Duration {
        match self.end_time {
            Some(_) => self.duration(),
            None => elapsed.saturating_sub(self.start_time),
        }
    }
}

/// Sum of every stoppage in `period`, with any open stoppage counted up to `elapsed`
pub fn total_for_period(stoppages: &[Stoppage], period: Period, elapsed: Duration) -> Duration {
    stoppages
        .iter()
        .filter(|s| s.period == period)
        .map(|s| s.duration_at(elapsed))
        .sum()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoppageSummary {
    pub count: usize,
    pub total: Duration,
    pub by_kind: BTreeMap<StoppageKind, Duration>,
    pub by_beneficiary: OptTeamBundle<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StoppageLedger {
    stoppages: Vec<Stoppage>,
    next_id: u32,
}

impl StoppageLedger {
    /// Rebuilds a ledger from saved stoppages. If more than one is open, all but the last are
    /// closed where they started.
    pub(crate) fn from_stoppages(mut stoppages: Vec<Stoppage>) -> Self {
        let last_open = stoppages.iter().rposition(Stoppage::is_open);
        for (i, stoppage) in stoppages.iter_mut().enumerate() {
            if stoppage.is_open() && Some(i) != last_open {
                stoppage.end_time = Some(stoppage.start_time);
            }
        }
        let next_id = stoppages.iter().map(|s| s.id + 1).max().unwrap_or(0);
        Self { stoppages, next_id }
    }

    pub(crate) fn as_slice(&self) -> &[Stoppage] {
        &self.stoppages
    }

    pub(crate) fn open_stoppage(&self) -> Option<&Stoppage> {
        self.stoppages.iter().rev().find(|s| s.is_open())
    }

    pub(crate) fn open(
        &mut self,
        kind: StoppageKind,
        period: Period,
        at: Duration,
        beneficiary: Option<Team>,
    ) -> StoppageResult<u32> {
        if let Some(open) = self.open_stoppage() {
            return Err(StoppageError::AlreadyOpen(open.id));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.stoppages.push(Stoppage {
            id,
            kind,
            period,
            start_time: at,
            end_time: None,
            beneficiary,
        });
        Ok(id)
    }

    /// Closes the open stoppage at `at`, returning it
    pub(crate) fn close_open(&mut self, at: Duration) -> StoppageResult<&Stoppage> {
        let stoppage = self
            .stoppages
            .iter_mut()
            .rev()
            .find(|s| s.is_open())
            .ok_or(StoppageError::NoneOpen)?;
        stoppage.end_time = Some(at.max(stoppage.start_time));
        Ok(stoppage)
    }

    pub(crate) fn delete(&mut self, id: u32) -> StoppageResult<Stoppage> {
        let index = self
            .stoppages
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoppageError::InvalidId(id))?;
        if self.stoppages[index].is_open() {
            return Err(StoppageError::IsOpen(id));
        }
        Ok(self.stoppages.remove(index))
    }

    pub(crate) fn total_for_period(&self, period: Period, elapsed: Duration) -> Duration {
        total_for_period(&self.stoppages, period, elapsed)
    }

    /// Counting stoppages at their real length, plus a fixed forfeit for every substitution
    pub(crate) fn added_time(&self, period: Period, elapsed: Duration, forfeit: Duration) -> Duration {
        self.stoppages
            .iter()
            .filter(|s| s.period == period)
            .map(|s| {
                if s.kind == StoppageKind::Substitution {
                    forfeit
                } else if s.kind.counts_for_added_time() {
                    s.duration_at(elapsed)
                } else {
                    Duration::ZERO
                }
            })
            .sum()
    }

    pub(crate) fn summary(&self, period: Option<Period>, elapsed: Duration) -> StoppageSummary {
        self.stoppages
            .iter()
            .filter(|s| period.is_none_or(|p| s.period == p))
            .fold(StoppageSummary::default(), |mut summary, s| {
                let duration = s.duration_at(elapsed);
                summary.count += 1;
                summary.total += duration;
                *summary.by_kind.entry(s.kind).or_default() += duration;
                summary.by_beneficiary[s.beneficiary] += duration;
                summary
            })
    }

    pub(crate) fn clear(&mut self) {
        self.stoppages.clear();
        self.next_id = 0;
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum StoppageError {
    #[error("Stoppage {0} is still open")]
    AlreadyOpen(u32),
    #[error("There is no open stoppage")]
    NoneOpen,
    #[error("No stoppage exists with the id {0}")]
    InvalidId(u32),
    #[error("Stoppage {0} is open and can't be deleted")]
    IsOpen(u32),
}

pub type StoppageResult<T> = std::result::Result<T, StoppageError>;
