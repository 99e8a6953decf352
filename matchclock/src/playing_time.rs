use crate::match_manager::{
    match_record::MatchRecord,
    roster::{RosterPlayer, SubstitutionEvent},
    stoppage::total_for_period,
};
use log::*;
use matchclock_common::match_snapshot::{Period, PlayerId, PlayerPosition};
use serde::Serialize;
use tokio::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerTime {
    pub player_id: PlayerId,
    pub shirt_number: u8,
    pub position: PlayerPosition,
    pub is_starter: bool,
    /// Time on the pitch, stoppages included
    pub total_time: Duration,
    /// `total_time` scaled by the share of the match that was live play
    pub effective_time: Duration,
}

/// Rebuilds each roster player's time on the pitch from the substitution log. The live status
/// of a player is only consulted when the log never mentions them.
pub fn reconstruct(record: &MatchRecord) -> Vec<PlayerTime> {
    let periods = record.played_periods();
    let ratio = effective_ratio(record, &periods);
    trace!("Reconstructing playing time over {} period(s), ratio {ratio:.4}", periods.len());

    let mut times: Vec<PlayerTime> = record
        .roster
        .iter()
        .map(|player| {
            let is_starter = started(player, &record.substitutions);
            let total_time = time_on_pitch(player.id, is_starter, &periods, &record.substitutions);
            PlayerTime {
                player_id: player.id,
                shirt_number: player.shirt_number,
                position: player.position,
                is_starter,
                total_time,
                effective_time: total_time.mul_f64(ratio),
            }
        })
        .collect();

    times.sort_by(|a, b| {
        b.total_time
            .cmp(&a.total_time)
            .then(a.shirt_number.cmp(&b.shirt_number))
    });
    times
}

/// Share of the played time that was not stopped. 1.0 if nothing has been played.
fn effective_ratio(record: &MatchRecord, periods: &[(Period, Duration)]) -> f64 {
    let (total, effective) = periods.iter().fold(
        (Duration::ZERO, Duration::ZERO),
        |(total, effective), (period, duration)| {
            let stopped = total_for_period(&record.stoppages, *period, *duration);
            (total + *duration, effective + duration.saturating_sub(stopped))
        },
    );
    if total.is_zero() {
        1.0
    } else {
        effective.as_secs_f64() / total.as_secs_f64()
    }
}

fn started(player: &RosterPlayer, subs: &[SubstitutionEvent]) -> bool {
    let first = subs
        .iter()
        .filter_map(|sub| {
            sub.direction_for(player.id)
                .map(|entering| (sub.period, sub.minute, entering))
        })
        .min_by_key(|(period, minute, _)| (*period, *minute));

    match first {
        Some((_, _, entering)) => !entering,
        None => player.status.implies_started(),
    }
}

fn time_on_pitch(
    player_id: PlayerId,
    started: bool,
    periods: &[(Period, Duration)],
    subs: &[SubstitutionEvent],
) -> Duration {
    let mut on_pitch = started;
    let mut total = Duration::ZERO;

    for (period, duration) in periods {
        let mut events: Vec<(Duration, bool)> = subs
            .iter()
            .filter(|sub| sub.period == *period)
            .filter_map(|sub| {
                sub.direction_for(player_id)
                    .map(|entering| (sub.minute.min(*duration), entering))
            })
            .collect();
        events.sort_by_key(|(minute, _)| *minute);

        let mut last = Duration::ZERO;
        for (minute, entering) in events {
            if on_pitch {
                total += minute - last;
            }
            on_pitch = entering;
            last = minute;
        }
        if on_pitch {
            total += *duration - last;
        }
    }
    total
}
