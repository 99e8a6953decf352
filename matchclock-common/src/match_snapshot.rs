use crate::team::Team;
use derivative::Derivative;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize, Sequence,
)]
pub enum Period {
    FirstHalf,
    SecondHalf,
    ExtraFirst,
    ExtraSecond,
}

impl Period {
    pub fn next_period(self) -> Option<Period> {
        match self {
            Self::FirstHalf => Some(Self::SecondHalf),
            Self::SecondHalf => Some(Self::ExtraFirst),
            Self::ExtraFirst => Some(Self::ExtraSecond),
            Self::ExtraSecond => None,
        }
    }

    pub fn previous_period(self) -> Option<Period> {
        match self {
            Self::FirstHalf => None,
            Self::SecondHalf => Some(Self::FirstHalf),
            Self::ExtraFirst => Some(Self::SecondHalf),
            Self::ExtraSecond => Some(Self::ExtraFirst),
        }
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Period::FirstHalf => write!(f, "First Half"),
            Period::SecondHalf => write!(f, "Second Half"),
            Period::ExtraFirst => write!(f, "Extra Time First Half"),
            Period::ExtraSecond => write!(f, "Extra Time Second Half"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "player {}", self.0)
    }
}

#[derive(
    Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize, Sequence,
)]
pub enum StoppageKind {
    ThrowIn,
    GoalKick,
    Corner,
    FreeKick,
    Penalty,
    Substitution,
    Injury,
    VarCheck,
    GoalCelebration,
    /// Fouls and time-wasting
    AntiPlay,
    Other,
}

impl StoppageKind {
    /// Whether the actual length of a stoppage of this kind is added on at the end of the period
    pub fn counts_for_added_time(self) -> bool {
        match self {
            Self::Injury | Self::VarCheck | Self::AntiPlay => true,
            Self::ThrowIn
            | Self::GoalKick
            | Self::Corner
            | Self::FreeKick
            | Self::Penalty
            | Self::Substitution
            | Self::GoalCelebration
            | Self::Other => false,
        }
    }
}

impl core::fmt::Display for StoppageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::ThrowIn => write!(f, "Throw-in"),
            Self::GoalKick => write!(f, "Goal Kick"),
            Self::Corner => write!(f, "Corner"),
            Self::FreeKick => write!(f, "Free Kick"),
            Self::Penalty => write!(f, "Penalty"),
            Self::Substitution => write!(f, "Substitution"),
            Self::Injury => write!(f, "Injury"),
            Self::VarCheck => write!(f, "VAR Check"),
            Self::GoalCelebration => write!(f, "Goal Celebration"),
            Self::AntiPlay => write!(f, "Anti-play"),
            Self::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CardKind {
    Yellow,
    SecondYellow,
    Red,
    /// Temporary expulsion
    White,
}

impl CardKind {
    pub fn expels(self) -> bool {
        matches!(self, Self::SecondYellow | Self::Red)
    }
}

impl core::fmt::Display for CardKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Yellow => write!(f, "Yellow"),
            Self::SecondYellow => write!(f, "Second Yellow"),
            Self::Red => write!(f, "Red"),
            Self::White => write!(f, "White"),
        }
    }
}

#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum PlayerStatus {
    #[derivative(Default)]
    Starter,
    Substitute,
    Expelled,
    TemporarilyExpelled,
}

impl PlayerStatus {
    /// Whether a player with no recorded substitutions and this final status was on the pitch at
    /// kickoff
    pub fn implies_started(self) -> bool {
        match self {
            Self::Starter | Self::Expelled | Self::TemporarilyExpelled => true,
            Self::Substitute => false,
        }
    }
}

#[derive(Derivative, Serialize, Deserialize)]
#[derivative(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum PlayerPosition {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
    #[derivative(Default)]
    Unknown,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum MatchClockState {
    #[default]
    Idle,
    Running,
    Stopped {
        kind: StoppageKind,
        beneficiary: Option<Team>,
    },
    PeriodEnded,
    MatchEnded,
}

impl MatchClockState {
    /// Whether a period is in progress, with play either live or stopped
    pub fn is_live(&self) -> bool {
        match self {
            Self::Running | Self::Stopped { .. } => true,
            Self::Idle | Self::PeriodEnded | Self::MatchEnded => false,
        }
    }
}

impl core::fmt::Display for MatchClockState {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Stopped {
                kind,
                beneficiary: Some(team),
            } => write!(f, "Stopped ({kind}, {team})"),
            Self::Stopped {
                kind,
                beneficiary: None,
            } => write!(f, "Stopped ({kind})"),
            Self::PeriodEnded => write!(f, "Period Ended"),
            Self::MatchEnded => write!(f, "Match Ended"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TempExpulsionSnapshot {
    pub id: u32,
    pub player_id: PlayerId,
    pub secs_remaining: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub period: Period,
    pub clock_state: MatchClockState,
    pub secs_in_period: u32,
    pub stoppage_secs: u32,
    pub added_time_secs: u32,
    pub overtime_minutes: u32,
    pub temp_expulsions: Vec<TempExpulsionSnapshot>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_period_order() {
        let periods: Vec<Period> = enum_iterator::all::<Period>().collect();
        assert_eq!(
            periods,
            vec![
                Period::FirstHalf,
                Period::SecondHalf,
                Period::ExtraFirst,
                Period::ExtraSecond
            ]
        );
        for pair in periods.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next_period(), Some(pair[1]));
            assert_eq!(pair[1].previous_period(), Some(pair[0]));
        }
        assert_eq!(Period::FirstHalf.previous_period(), None);
        assert_eq!(Period::ExtraSecond.next_period(), None);
    }

    #[test]
    fn test_counts_for_added_time() {
        let counting: Vec<StoppageKind> = enum_iterator::all::<StoppageKind>()
            .filter(|k| k.counts_for_added_time())
            .collect();
        assert_eq!(
            counting,
            vec![
                StoppageKind::Injury,
                StoppageKind::VarCheck,
                StoppageKind::AntiPlay
            ]
        );
    }

    #[test]
    fn test_card_expels() {
        assert!(CardKind::Red.expels());
        assert!(CardKind::SecondYellow.expels());
        assert!(!CardKind::Yellow.expels());
        assert!(!CardKind::White.expels());
    }

    #[test]
    fn test_implies_started() {
        assert!(PlayerStatus::Starter.implies_started());
        assert!(PlayerStatus::Expelled.implies_started());
        assert!(PlayerStatus::TemporarilyExpelled.implies_started());
        assert!(!PlayerStatus::Substitute.implies_started());
    }

    #[test]
    fn test_clock_state_display() {
        assert_eq!(format!("{}", MatchClockState::Idle), "Idle");
        assert_eq!(
            format!(
                "{}",
                MatchClockState::Stopped {
                    kind: StoppageKind::Corner,
                    beneficiary: Some(Team::Away)
                }
            ),
            "Stopped (Corner, Away)"
        );
        assert_eq!(
            format!(
                "{}",
                MatchClockState::Stopped {
                    kind: StoppageKind::VarCheck,
                    beneficiary: None
                }
            ),
            "Stopped (VAR Check)"
        );
    }

    #[test]
    fn test_clock_state_serde() {
        let state = MatchClockState::Stopped {
            kind: StoppageKind::Injury,
            beneficiary: Some(Team::Home),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(
            serde_json::from_str::<MatchClockState>(&json).unwrap(),
            state
        );
    }
}
