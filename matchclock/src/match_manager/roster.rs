use super::Duration;
use matchclock_common::match_snapshot::{CardKind, Period, PlayerId, PlayerPosition, PlayerStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: PlayerId,
    pub shirt_number: u8,
    /// Live status only, later events overwrite it
    pub status: PlayerStatus,
    #[serde(default)]
    pub position: PlayerPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionEvent {
    pub player_out: Option<PlayerId>,
    pub player_in: Option<PlayerId>,
    pub period: Period,
    /// Elapsed time within `period`
    pub minute: Duration,
}

impl SubstitutionEvent {
    /// `Some(true)` if `player` came on, `Some(false)` if they went off, `None` if the event
    /// doesn't concern them
    pub fn direction_for(&self, player: PlayerId) -> Option<bool> {
        match (self.player_out == Some(player), self.player_in == Some(player)) {
            (true, false) => Some(false),
            (false, true) => Some(true),
            (true, true) | (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEvent {
    pub id: u32,
    pub kind: CardKind,
    pub player_id: Option<PlayerId>,
    pub period: Period,
    pub minute: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Roster {
    players: Vec<RosterPlayer>,
}

impl Roster {
    pub(crate) fn from_players(players: Vec<RosterPlayer>) -> Self {
        let mut roster = Self::default();
        players.into_iter().for_each(|p| roster.add(p));
        roster
    }

    pub(crate) fn as_slice(&self) -> &[RosterPlayer] {
        &self.players
    }

    /// Adds a player, replacing any existing entry with the same id
    pub(crate) fn add(&mut self, player: RosterPlayer) {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    pub(crate) fn remove(&mut self, id: PlayerId) -> Option<RosterPlayer> {
        let index = self.players.iter().position(|p| p.id == id)?;
        Some(self.players.remove(index))
    }

    pub(crate) fn get(&self, id: PlayerId) -> Option<&RosterPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Returns the previous status, or `None` if the player isn't on the roster
    pub(crate) fn set_status(&mut self, id: PlayerId, status: PlayerStatus) -> Option<PlayerStatus> {
        let player = self.players.iter_mut().find(|p| p.id == id)?;
        Some(std::mem::replace(&mut player.status, status))
    }

    pub(crate) fn clear(&mut self) {
        self.players.clear();
    }
}
