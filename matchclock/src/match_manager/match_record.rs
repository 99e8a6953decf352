use super::{
    Duration, Instant,
    roster::{CardEvent, RosterPlayer, SubstitutionEvent},
    stoppage::Stoppage,
    temp_expulsion::TempExpulsion,
};
use matchclock_common::match_snapshot::{MatchClockState, Period};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap};
use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, iso8601};

const CONFIG: iso8601::EncodedConfig = iso8601::Config::DEFAULT
    .set_year_is_six_digits(false)
    .encode();
const FORMAT: Iso8601<CONFIG> = Iso8601::<CONFIG>;
time::serde::format_description!(iso8601_short_year, OffsetDateTime, FORMAT);

/// Everything a match session owns, in a form that can be stored and later used to restore the
/// session or reconstruct playing time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub period: Period,
    pub clock_state: MatchClockState,
    /// Elapsed time in `period` when the record was taken
    pub elapsed_time: Duration,
    pub period_durations: BTreeMap<Period, Duration>,
    pub stoppages: Vec<Stoppage>,
    pub temp_expulsions: Vec<TempExpulsion>,
    pub roster: Vec<RosterPlayer>,
    pub substitutions: Vec<SubstitutionEvent>,
    pub cards: Vec<CardEvent>,
    #[serde(default, with = "iso8601_short_year::option")]
    pub kickoff: Option<OffsetDateTime>,
    #[serde(default, with = "iso8601_short_year::option")]
    pub final_whistle: Option<OffsetDateTime>,
}

impl MatchRecord {
    /// The periods that have been played, in order, with their lengths. A period still in
    /// progress is included at its current elapsed time.
    pub fn played_periods(&self) -> Vec<(Period, Duration)> {
        let mut periods: Vec<(Period, Duration)> = self
            .period_durations
            .iter()
            .map(|(period, duration)| (*period, *duration))
            .collect();
        if self.clock_state.is_live() && !self.period_durations.contains_key(&self.period) {
            periods.push((self.period, self.elapsed_time));
            periods.sort_by_key(|(period, _)| *period);
        }
        periods
    }

    pub fn as_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

pub(crate) fn calculate_timestamp(instant: Instant) -> OffsetDateTime {
    let now = Instant::now();
    let mut timestamp = OffsetDateTime::now_utc();

    match instant.cmp(&now) {
        Ordering::Equal => {}
        Ordering::Less => {
            let duration = now - instant;
            timestamp -= duration;
        }
        Ordering::Greater => {
            let duration = instant - now;
            timestamp += duration;
        }
    }
    timestamp
}

#[cfg(test)]
mod test {
    use super::*;
    use matchclock_common::match_snapshot::StoppageKind;

    fn empty_record(period: Period, clock_state: MatchClockState, elapsed: u64) -> MatchRecord {
        MatchRecord {
            period,
            clock_state,
            elapsed_time: Duration::from_secs(elapsed),
            period_durations: BTreeMap::new(),
            stoppages: vec![],
            temp_expulsions: vec![],
            roster: vec![],
            substitutions: vec![],
            cards: vec![],
            kickoff: None,
            final_whistle: None,
        }
    }

    #[test]
    fn test_played_periods() {
        let mut record = empty_record(Period::SecondHalf, MatchClockState::Running, 600);
        record
            .period_durations
            .insert(Period::FirstHalf, Duration::from_secs(2800));
        assert_eq!(
            record.played_periods(),
            vec![
                (Period::FirstHalf, Duration::from_secs(2800)),
                (Period::SecondHalf, Duration::from_secs(600))
            ]
        );

        record.clock_state = MatchClockState::PeriodEnded;
        assert_eq!(
            record.played_periods(),
            vec![(Period::FirstHalf, Duration::from_secs(2800))]
        );

        let idle = empty_record(Period::FirstHalf, MatchClockState::Idle, 0);
        assert!(idle.played_periods().is_empty());
    }

    #[test]
    fn test_json() {
        let mut record = empty_record(
            Period::FirstHalf,
            MatchClockState::Stopped {
                kind: StoppageKind::Corner,
                beneficiary: None,
            },
            1200,
        );
        record.stoppages.push(Stoppage {
            id: 0,
            kind: StoppageKind::Corner,
            period: Period::FirstHalf,
            start_time: Duration::from_secs(1190),
            end_time: None,
            beneficiary: None,
        });
        record.kickoff = Some(calculate_timestamp(Instant::now()));

        let json = record.as_json().unwrap();
        let parsed = MatchRecord::from_json(&json).unwrap();
        assert_eq!(parsed.stoppages, record.stoppages);
        assert_eq!(parsed.clock_state, record.clock_state);
        assert_eq!(parsed.kickoff.map(|t| t.unix_timestamp()), record.kickoff.map(|t| t.unix_timestamp()));
        assert_eq!(parsed.final_whistle, None);
    }
}
