use log::*;
use matchclock_common::{
    config::Game as GameConfig,
    match_snapshot::{
        CardKind, MatchClockState, MatchSnapshot, Period, PlayerId, PlayerStatus, StoppageKind,
    },
    team::Team,
};
use std::collections::BTreeMap;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::{
    sync::watch,
    time::{Duration, Instant},
};

pub mod stoppage;
use stoppage::*;

pub mod temp_expulsion;
use temp_expulsion::*;

pub mod roster;
use roster::*;

pub mod match_record;
use match_record::*;

use crate::playing_time::{self, PlayerTime};

/// A single match session. Every mutation goes through the operations below, which take the
/// caller's monotonic `now` and must be applied in order.
#[derive(Debug)]
pub struct MatchManager {
    config: GameConfig,
    current_period: Period,
    clock_state: MatchClockState,
    period_clock: PeriodClock,
    period_durations: BTreeMap<Period, Duration>,
    stoppages: StoppageLedger,
    temp_expulsions: TempExpulsionTracker,
    roster: Roster,
    substitutions: Vec<SubstitutionEvent>,
    cards: Vec<CardEvent>,
    next_card_id: u32,
    kickoff: Option<OffsetDateTime>,
    final_whistle: Option<OffsetDateTime>,
    start_stop_tx: watch::Sender<bool>,
    start_stop_rx: watch::Receiver<bool>,
}

impl MatchManager {
    pub fn new(config: GameConfig) -> Self {
        let (start_stop_tx, start_stop_rx) = watch::channel(false);
        Self {
            config,
            current_period: Period::FirstHalf,
            clock_state: MatchClockState::Idle,
            period_clock: Default::default(),
            period_durations: BTreeMap::new(),
            stoppages: Default::default(),
            temp_expulsions: Default::default(),
            roster: Default::default(),
            substitutions: vec![],
            cards: vec![],
            next_card_id: 0,
            kickoff: None,
            final_whistle: None,
            start_stop_tx,
            start_stop_rx,
        }
    }

    /// Resumes a session from a saved record. The saved elapsed time becomes the starting offset
    /// of the period clock, so time already accounted for is not counted again.
    pub fn restore(config: GameConfig, record: MatchRecord, now: Instant) -> Self {
        let mut tm = Self::new(config);
        let live = record.clock_state.is_live();

        tm.current_period = record.period;
        tm.clock_state = record.clock_state;
        tm.period_clock = if live {
            PeriodClock::CountingUp {
                start_time: now,
                time_at_start: record.elapsed_time,
            }
        } else {
            PeriodClock::Stopped {
                clock_time: record.elapsed_time,
            }
        };
        tm.period_durations = record.period_durations;
        tm.stoppages = StoppageLedger::from_stoppages(record.stoppages);
        if matches!(tm.clock_state, MatchClockState::Stopped { .. }) {
            if tm.stoppages.open_stoppage().is_none() {
                warn!("Restored record was stopped without an open stoppage, resuming play");
                tm.clock_state = MatchClockState::Running;
            }
        } else if tm.stoppages.close_open(record.elapsed_time).is_ok() {
            warn!("Restored record had an open stoppage outside of a stoppage state, closed it");
        }
        tm.temp_expulsions = TempExpulsionTracker::from_expulsions(record.temp_expulsions);
        tm.roster = Roster::from_players(record.roster);
        tm.substitutions = record.substitutions;
        tm.next_card_id = record.cards.iter().map(|c| c.id + 1).max().unwrap_or(0);
        tm.cards = record.cards;
        tm.kickoff = record.kickoff;
        tm.final_whistle = record.final_whistle;

        info!("{} Restored match", tm.status_string(now));
        tm.send_clock_running(live);
        tm
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The config can only be modified before kickoff
    pub fn set_config(&mut self, config: GameConfig) -> Result<()> {
        if self.clock_state != MatchClockState::Idle {
            return Err(MatchManagerError::MatchInProgress);
        }
        self.config = config;
        Ok(())
    }

    pub fn current_period(&self) -> Period {
        self.current_period
    }

    pub fn clock_state(&self) -> MatchClockState {
        self.clock_state
    }

    pub fn clock_is_running(&self) -> bool {
        self.clock_state.is_live()
    }

    pub fn get_start_stop_rx(&self) -> watch::Receiver<bool> {
        self.start_stop_rx.clone()
    }

    fn send_clock_running(&self, running: bool) {
        self.start_stop_tx.send_replace(running);
    }

    fn log_ignored(&self, action: &str, now: Instant, result: Result<()>) {
        if let Err(e) = result {
            warn!("{} Ignoring {action}: {e}", self.status_string(now));
        }
    }

    // Clock state machine

    pub fn can_start_match(&self) -> Result<()> {
        match self.clock_state {
            MatchClockState::Idle => Ok(()),
            MatchClockState::PeriodEnded => {
                if self.config.allows_period_after(self.current_period) {
                    Ok(())
                } else {
                    Err(MatchManagerError::NoNextPeriod(self.current_period))
                }
            }
            state @ (MatchClockState::Running
            | MatchClockState::Stopped { .. }
            | MatchClockState::MatchEnded) => Err(MatchManagerError::WrongState(state)),
        }
    }

    /// Kicks off the first period from `Idle`, or the next period after a period has ended
    pub fn start_match(&mut self, now: Instant) {
        let result = self.can_start_match().map(|()| {
            if self.clock_state == MatchClockState::PeriodEnded {
                // `can_start_match()` has checked that there is a next period
                if let Some(next) = self.current_period.next_period() {
                    self.current_period = next;
                }
            } else {
                self.kickoff = Some(calculate_timestamp(now));
            }

            self.period_clock = PeriodClock::CountingUp {
                start_time: now,
                time_at_start: Duration::ZERO,
            };
            self.clock_state = MatchClockState::Running;
            self.temp_expulsions.resume_all();
            info!("{} Starting the period", self.status_string(now));
            self.send_clock_running(true);
        });
        self.log_ignored("start", now, result);
    }

    pub fn can_stop_play(&self) -> Result<()> {
        match self.clock_state {
            MatchClockState::Running => Ok(()),
            state => Err(MatchManagerError::WrongState(state)),
        }
    }

    pub fn stop_play(&mut self, kind: StoppageKind, beneficiary: Option<Team>, now: Instant) {
        let result = self.can_stop_play().and_then(|()| {
            let elapsed = self.elapsed_time(now);
            self.stoppages
                .open(kind, self.current_period, elapsed, beneficiary)?;
            self.clock_state = MatchClockState::Stopped { kind, beneficiary };
            info!("{} Play stopped", self.status_string(now));
            Ok(())
        });
        self.log_ignored("stop", now, result);
    }

    pub fn can_chain_stoppage(&self) -> Result<()> {
        match self.clock_state {
            MatchClockState::Stopped { .. } => Ok(()),
            state => Err(MatchManagerError::WrongState(state)),
        }
    }

    /// Closes the open stoppage and opens the next one at the same instant, without play
    /// resuming in between
    pub fn chain_stoppage(&mut self, kind: StoppageKind, beneficiary: Option<Team>, now: Instant) {
        let result = self.can_chain_stoppage().and_then(|()| {
            let elapsed = self.elapsed_time(now);
            let at = self.stoppages.close_open(elapsed)?.end_time.unwrap_or(elapsed);
            self.stoppages
                .open(kind, self.current_period, at, beneficiary)?;
            self.clock_state = MatchClockState::Stopped { kind, beneficiary };
            info!("{} Stoppage chained", self.status_string(now));
            Ok(())
        });
        self.log_ignored("chain", now, result);
    }

    pub fn can_resume_play(&self) -> Result<()> {
        self.can_chain_stoppage()
    }

    pub fn resume_play(&mut self, now: Instant) {
        let result = self.can_resume_play().and_then(|()| {
            self.close_stoppage(now)?;
            self.clock_state = MatchClockState::Running;
            info!("{} Play resumed", self.status_string(now));
            Ok(())
        });
        self.log_ignored("resume", now, result);
    }

    fn close_stoppage(&mut self, now: Instant) -> Result<()> {
        let elapsed = self.elapsed_time(now);
        let stoppage = self.stoppages.close_open(elapsed)?;
        debug!(
            "Closed {} stoppage {} after {:?}",
            stoppage.kind,
            stoppage.id,
            stoppage.duration()
        );
        Ok(())
    }

    pub fn can_end_period(&self) -> Result<()> {
        match self.clock_state {
            MatchClockState::Running | MatchClockState::Stopped { .. } => Ok(()),
            state => Err(MatchManagerError::WrongState(state)),
        }
    }

    /// Records the period's length and pauses the temporary expulsion countdowns. Calling this
    /// again before the next period starts has no effect.
    pub fn end_period(&mut self, now: Instant) {
        let result = self.try_end_period(now);
        self.log_ignored("end period", now, result);
    }

    fn try_end_period(&mut self, now: Instant) -> Result<()> {
        self.can_end_period().and_then(|()| {
            if let MatchClockState::Stopped { .. } = self.clock_state {
                match self.close_stoppage(now) {
                    Ok(()) | Err(MatchManagerError::StoppageError(StoppageError::NoneOpen)) => {}
                    Err(e) => return Err(e),
                }
                self.clock_state = MatchClockState::Running;
            }

            let elapsed = self.elapsed_time(now);
            self.complete_temp_expulsions(elapsed, now);
            self.temp_expulsions.pause_all(elapsed);
            self.period_durations
                .entry(self.current_period)
                .or_insert(elapsed);
            self.period_clock = PeriodClock::Stopped {
                clock_time: elapsed,
            };
            self.clock_state = MatchClockState::PeriodEnded;
            info!("{} Period ended", self.status_string(now));
            self.send_clock_running(false);
            Ok(())
        })
    }

    pub fn can_end_match(&self) -> Result<()> {
        match self.clock_state {
            MatchClockState::Running
            | MatchClockState::Stopped { .. }
            | MatchClockState::PeriodEnded => Ok(()),
            state => Err(MatchManagerError::WrongState(state)),
        }
    }

    pub fn end_match(&mut self, now: Instant) {
        let result = self.can_end_match().and_then(|()| {
            if self.clock_state.is_live() {
                self.try_end_period(now)?;
            }
            self.clock_state = MatchClockState::MatchEnded;
            self.final_whistle = Some(calculate_timestamp(now));
            info!("{} Match ended", self.status_string(now));
            Ok(())
        });
        self.log_ignored("end match", now, result);
    }

    pub fn reset_match(&mut self, now: Instant) {
        info!("{} Resetting match", self.status_string(now));
        self.current_period = Period::FirstHalf;
        self.clock_state = MatchClockState::Idle;
        self.period_clock = Default::default();
        self.period_durations.clear();
        self.stoppages.clear();
        self.temp_expulsions.clear();
        self.roster.clear();
        self.substitutions.clear();
        self.cards.clear();
        self.next_card_id = 0;
        self.kickoff = None;
        self.final_whistle = None;
        self.send_clock_running(false);
    }

    /// Refreshes time based state. Calling it more than once for the same `now` has no further
    /// effect.
    pub fn tick(&mut self, now: Instant) {
        if self.clock_state.is_live() {
            let elapsed = self.elapsed_time(now);
            trace!("Tick at {elapsed:?}");
            self.complete_temp_expulsions(elapsed, now);
        }
    }

    fn complete_temp_expulsions(&mut self, elapsed: Duration, now: Instant) {
        for expulsion in self.temp_expulsions.complete_due(elapsed) {
            let still_serving = self
                .temp_expulsions
                .active()
                .any(|e| e.player_id == expulsion.player_id);
            let reverted = !still_serving
                && self
                    .roster
                    .get(expulsion.player_id)
                    .is_some_and(|p| p.status == PlayerStatus::TemporarilyExpelled)
                && self
                    .roster
                    .set_status(expulsion.player_id, PlayerStatus::Starter)
                    .is_some();
            info!(
                "{} Temporary expulsion of {} served{}",
                self.status_string(now),
                expulsion.player_id,
                if reverted { ", player may return" } else { "" }
            );
        }
    }

    // Cards, substitutions and the roster

    /// Records a card at the current elapsed time and applies its effect to the roster. Returns
    /// the id of the card event.
    pub fn issue_card(&mut self, kind: CardKind, player_id: Option<PlayerId>, now: Instant) -> u32 {
        let elapsed = self.elapsed_time(now);
        let id = self.next_card_id;
        self.next_card_id += 1;
        self.cards.push(CardEvent {
            id,
            kind,
            player_id,
            period: self.current_period,
            minute: elapsed,
        });
        info!(
            "{} {kind} card{}",
            self.status_string(now),
            player_id.map_or(String::new(), |p| format!(" for {p}"))
        );

        let Some(player_id) = player_id else {
            return id;
        };
        let Some(status) = self.roster.get(player_id).map(|p| p.status) else {
            debug!("{player_id} is not on the roster, card has no effect on it");
            return id;
        };

        match kind {
            _ if kind.expels() => {
                let cancelled = self.temp_expulsions.cancel_for_player(player_id, elapsed);
                if cancelled > 0 {
                    info!("Cancelled {cancelled} temporary expulsion(s) of {player_id}");
                }
                self.roster.set_status(player_id, PlayerStatus::Expelled);
            }
            CardKind::White if self.clock_state == MatchClockState::MatchEnded => {
                warn!("The match has ended, not starting a temporary expulsion for {player_id}");
            }
            CardKind::White if status == PlayerStatus::Expelled => {
                warn!("{player_id} is already expelled, not starting a temporary expulsion");
            }
            CardKind::White if status == PlayerStatus::TemporarilyExpelled => {
                warn!("{player_id} is already temporarily expelled, not starting another one");
            }
            CardKind::White => {
                self.roster
                    .set_status(player_id, PlayerStatus::TemporarilyExpelled);
                self.temp_expulsions.start(
                    player_id,
                    id,
                    self.current_period,
                    elapsed,
                    self.clock_state.is_live(),
                    self.config.temp_expulsion_duration(),
                );
            }
            CardKind::Yellow | CardKind::SecondYellow | CardKind::Red => {}
        }
        id
    }

    pub fn can_record_substitution(&self) -> Result<()> {
        match self.clock_state {
            state @ (MatchClockState::Idle | MatchClockState::MatchEnded) => {
                Err(MatchManagerError::WrongState(state))
            }
            MatchClockState::Running
            | MatchClockState::Stopped { .. }
            | MatchClockState::PeriodEnded => Ok(()),
        }
    }

    pub fn record_substitution(
        &mut self,
        player_out: Option<PlayerId>,
        player_in: Option<PlayerId>,
        now: Instant,
    ) {
        let result = self.can_record_substitution().map(|()| {
            let minute = self.elapsed_time(now);
            for (id, status) in [
                (player_out, PlayerStatus::Substitute),
                (player_in, PlayerStatus::Starter),
            ] {
                if let Some(id) = id {
                    if self.roster.set_status(id, status).is_none() {
                        debug!("{id} is not on the roster, only logging the substitution");
                    }
                }
            }
            self.substitutions.push(SubstitutionEvent {
                player_out,
                player_in,
                period: self.current_period,
                minute,
            });
            info!(
                "{} Substitution: {} off, {} on",
                self.status_string(now),
                print_player(player_out),
                print_player(player_in)
            );
        });
        self.log_ignored("substitution", now, result);
    }

    pub fn add_player(&mut self, player: RosterPlayer) {
        info!("Adding {} (#{}) to the roster", player.id, player.shirt_number);
        self.roster.add(player);
    }

    pub fn remove_player(&mut self, id: PlayerId) {
        if self.roster.remove(id).is_none() {
            debug!("{id} is not on the roster, nothing to remove");
        }
    }

    pub fn roster(&self) -> &[RosterPlayer] {
        self.roster.as_slice()
    }

    pub fn player(&self, id: PlayerId) -> Option<&RosterPlayer> {
        self.roster.get(id)
    }

    pub fn substitutions(&self) -> &[SubstitutionEvent] {
        &self.substitutions
    }

    pub fn cards(&self) -> &[CardEvent] {
        &self.cards
    }

    // Stoppage ledger and temporary expulsions

    pub fn stoppages(&self) -> &[Stoppage] {
        self.stoppages.as_slice()
    }

    pub fn delete_stoppage(&mut self, id: u32) {
        match self.stoppages.delete(id) {
            Ok(stoppage) => info!("Deleted {} stoppage {id}", stoppage.kind),
            Err(e) => debug!("Not deleting stoppage: {e}"),
        }
    }

    pub fn temp_expulsions(&self) -> &[TempExpulsion] {
        self.temp_expulsions.as_slice()
    }

    pub fn active_temp_expulsions(&self) -> impl Iterator<Item = &TempExpulsion> {
        self.temp_expulsions.active()
    }

    pub fn temp_expulsion_remaining(&self, id: u32, now: Instant) -> Option<Duration> {
        let elapsed = self.elapsed_time(now);
        self.temp_expulsions
            .active()
            .find(|e| e.id == id)
            .map(|e| e.time_remaining(elapsed))
    }

    /// Ends a temporary expulsion early without returning the player to the pitch
    pub fn cancel_temp_expulsion(&mut self, id: u32, now: Instant) {
        let elapsed = self.elapsed_time(now);
        if self.temp_expulsions.cancel(id, elapsed).is_none() {
            debug!("{}", MatchManagerError::InvalidExpulsionId(id));
        }
    }

    pub fn period_durations(&self) -> &BTreeMap<Period, Duration> {
        &self.period_durations
    }

    // Derived time accounting

    pub fn elapsed_time(&self, now: Instant) -> Duration {
        self.period_clock.clock_time(now)
    }

    /// How long the open stoppage has lasted so far
    pub fn stoppage_elapsed(&self, now: Instant) -> Duration {
        let elapsed = self.elapsed_time(now);
        self.stoppages
            .open_stoppage()
            .map_or(Duration::ZERO, |s| s.duration_at(elapsed))
    }

    pub fn total_stoppage_time(&self, period: Period, now: Instant) -> Duration {
        self.stoppages
            .total_for_period(period, self.elapsed_time(now))
    }

    pub fn current_added_time(&self, now: Instant) -> Duration {
        self.stoppages.added_time(
            self.current_period,
            self.elapsed_time(now),
            self.config.substitution_forfeit(),
        )
    }

    /// Length of `period`, or its length so far if it is in progress. Zero for periods not
    /// yet played.
    pub fn period_duration(&self, period: Period, now: Instant) -> Duration {
        match self.period_durations.get(&period) {
            Some(duration) => *duration,
            None if period == self.current_period && self.clock_state.is_live() => {
                self.elapsed_time(now)
            }
            None => Duration::ZERO,
        }
    }

    pub fn effective_play_time(&self, period: Period, now: Instant) -> Duration {
        self.period_duration(period, now)
            .saturating_sub(self.total_stoppage_time(period, now))
    }

    /// Whole minutes, rounded up, played beyond the regulation length of the current period
    pub fn overtime_minutes(&self, now: Instant) -> u32 {
        let over = self
            .elapsed_time(now)
            .saturating_sub(self.config.regulation_duration(self.current_period));
        over.as_nanos()
            .div_ceil(Duration::from_secs(60).as_nanos())
            .try_into()
            .unwrap_or(u32::MAX)
    }

    pub fn stoppage_summary(&self, period: Option<Period>, now: Instant) -> StoppageSummary {
        self.stoppages.summary(period, self.elapsed_time(now))
    }

    // Outputs

    pub fn generate_snapshot(&self, now: Instant) -> MatchSnapshot {
        trace!("Generating snapshot");
        let elapsed = self.elapsed_time(now);
        let as_secs = |d: Duration| d.as_secs().try_into().unwrap_or(u32::MAX);

        MatchSnapshot {
            period: self.current_period,
            clock_state: self.clock_state,
            secs_in_period: as_secs(elapsed),
            stoppage_secs: as_secs(self.stoppage_elapsed(now)),
            added_time_secs: as_secs(self.current_added_time(now)),
            overtime_minutes: self.overtime_minutes(now),
            temp_expulsions: self
                .temp_expulsions
                .active()
                .map(|e| e.as_snapshot(elapsed))
                .collect(),
        }
    }

    pub fn record(&self, now: Instant) -> MatchRecord {
        MatchRecord {
            period: self.current_period,
            clock_state: self.clock_state,
            elapsed_time: self.elapsed_time(now),
            period_durations: self.period_durations.clone(),
            stoppages: self.stoppages.as_slice().to_vec(),
            temp_expulsions: self.temp_expulsions.as_slice().to_vec(),
            roster: self.roster.as_slice().to_vec(),
            substitutions: self.substitutions.clone(),
            cards: self.cards.clone(),
            kickoff: self.kickoff,
            final_whistle: self.final_whistle,
        }
    }

    /// Per player time on the pitch, reconstructed from the substitution log
    pub fn playing_time(&self, now: Instant) -> Vec<PlayerTime> {
        playing_time::reconstruct(&self.record(now))
    }

    fn status_string(&self, now: Instant) -> String {
        let time = self.elapsed_time(now).as_secs_f64();
        format!(
            "[{:02.0}:{:06.3} {}]",
            (time / 60.0).floor(),
            time % 60.0,
            self.current_period
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PeriodClock {
    Stopped {
        clock_time: Duration,
    },
    CountingUp {
        start_time: Instant,
        time_at_start: Duration,
    },
}

impl std::default::Default for PeriodClock {
    fn default() -> Self {
        PeriodClock::Stopped {
            clock_time: Duration::default(),
        }
    }
}

impl PeriodClock {
    /// A `now` from before the clock was started reads as the start time
    fn clock_time(&self, now: Instant) -> Duration {
        match self {
            PeriodClock::CountingUp {
                start_time,
                time_at_start,
            } => now.saturating_duration_since(*start_time) + *time_at_start,
            PeriodClock::Stopped { clock_time } => *clock_time,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum MatchManagerError {
    #[error("Not allowed while the match is {0}")]
    WrongState(MatchClockState),
    #[error("No further period can be played after the {0}")]
    NoNextPeriod(Period),
    #[error("The config can only be changed before kickoff")]
    MatchInProgress,
    #[error("No active temporary expulsion exists with the id {0}")]
    InvalidExpulsionId(u32),
    #[error("Stoppage error: {0}")]
    StoppageError(#[from] StoppageError),
}

pub type Result<T> = std::result::Result<T, MatchManagerError>;

fn print_player(player: Option<PlayerId>) -> String {
    player.map_or_else(|| "nobody".to_string(), |p| p.to_string())
}
