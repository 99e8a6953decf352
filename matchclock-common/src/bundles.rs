use crate::team::Team;
use core::ops::{Index, IndexMut};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A value per team plus one for events attributed to neither side
#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptTeamBundle<T> {
    pub home: T,
    pub away: T,
    pub neither: T,
}

impl<T> OptTeamBundle<T> {
    pub fn iter(&self) -> impl Iterator<Item = (Option<Team>, &T)> {
        [
            (Some(Team::Home), &self.home),
            (Some(Team::Away), &self.away),
            (None, &self.neither),
        ]
        .into_iter()
    }
}

impl<T> Index<Option<Team>> for OptTeamBundle<T> {
    type Output = T;

    fn index(&self, team: Option<Team>) -> &Self::Output {
        match team {
            Some(Team::Home) => &self.home,
            Some(Team::Away) => &self.away,
            None => &self.neither,
        }
    }
}

impl<T> IndexMut<Option<Team>> for OptTeamBundle<T> {
    fn index_mut(&mut self, team: Option<Team>) -> &mut Self::Output {
        match team {
            Some(Team::Home) => &mut self.home,
            Some(Team::Away) => &mut self.away,
            None => &mut self.neither,
        }
    }
}

impl<T: Display> Display for OptTeamBundle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Home: {}, Away: {}, Neither: {}",
            self.home, self.away, self.neither
        )
    }
}
