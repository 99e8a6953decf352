use crate::match_manager::{MatchManager, roster::RosterPlayer};
use matchclock_common::{
    clock_display::mm_ss,
    match_snapshot::{CardKind, Period, PlayerId, PlayerPosition, PlayerStatus, StoppageKind},
    team::Team,
};
use std::{path::PathBuf, str::FromStr};
use thiserror::Error;
use tokio::time::Instant;

/// A single line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop {
        kind: StoppageKind,
        beneficiary: Option<Team>,
    },
    Chain {
        kind: StoppageKind,
        beneficiary: Option<Team>,
    },
    Resume,
    EndPeriod,
    EndMatch,
    Card {
        kind: CardKind,
        player: Option<PlayerId>,
    },
    Sub {
        player_out: Option<PlayerId>,
        player_in: Option<PlayerId>,
    },
    AddPlayer(RosterPlayer),
    RemovePlayer(PlayerId),
    DeleteStoppage(u32),
    CancelExpulsion(u32),
    Reset,
    Status,
    Snapshot,
    Stoppages(Option<Period>),
    Playtime,
    Save(Option<PathBuf>),
    Help,
    Quit,
}

pub const HELP: &str = "\
start                           kick off, or start the next period
stop <kind> [home|away]         stop play
chain <kind> [home|away]        replace the open stoppage with a new one
resume                          resume play
end-period | end-match
card <yellow|2y|red|white> [player]
sub <out|-> <in|->              record a substitution
player add <id> <shirt> [status] [position]
player remove <id>
delete-stoppage <id> | cancel-expulsion <id>
reset
status | snapshot | stoppages [1|2|e1|e2] | playtime
save [path]
quit

stoppage kinds: throw-in goal-kick corner free-kick penalty sub injury var goal anti-play other";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self> {
        let mut args = line.split_whitespace();
        let Some(name) = args.next() else {
            return Err(CommandError::Empty);
        };

        let command = match name.to_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop {
                kind: parse_kind(required(args.next(), "stoppage kind")?)?,
                beneficiary: args.next().map(parse_team).transpose()?.flatten(),
            },
            "chain" => Command::Chain {
                kind: parse_kind(required(args.next(), "stoppage kind")?)?,
                beneficiary: args.next().map(parse_team).transpose()?.flatten(),
            },
            "resume" => Command::Resume,
            "end-period" => Command::EndPeriod,
            "end-match" => Command::EndMatch,
            "card" => Command::Card {
                kind: parse_card(required(args.next(), "card kind")?)?,
                player: args.next().map(parse_player).transpose()?.flatten(),
            },
            "sub" => Command::Sub {
                player_out: parse_player(required(args.next(), "player going off")?)?,
                player_in: parse_player(required(args.next(), "player coming on")?)?,
            },
            "player" => match required(args.next(), "add or remove")? {
                "add" => Command::AddPlayer(RosterPlayer {
                    id: parse_player_id(required(args.next(), "player id")?)?,
                    shirt_number: parse_number(required(args.next(), "shirt number")?, "shirt number")?,
                    status: args.next().map(parse_status).transpose()?.unwrap_or_default(),
                    position: args.next().map(parse_position).transpose()?.unwrap_or_default(),
                }),
                "remove" => {
                    Command::RemovePlayer(parse_player_id(required(args.next(), "player id")?)?)
                }
                other => return Err(invalid("player action", other)),
            },
            "delete-stoppage" => Command::DeleteStoppage(parse_number(
                required(args.next(), "stoppage id")?,
                "stoppage id",
            )?),
            "cancel-expulsion" => Command::CancelExpulsion(parse_number(
                required(args.next(), "expulsion id")?,
                "expulsion id",
            )?),
            "reset" => Command::Reset,
            "status" => Command::Status,
            "snapshot" => Command::Snapshot,
            "stoppages" => Command::Stoppages(args.next().map(parse_period).transpose()?),
            "playtime" => Command::Playtime,
            "save" => Command::Save(args.next().map(PathBuf::from)),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };

        match args.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.to_string())),
            None => Ok(command),
        }
    }
}

impl Command {
    /// Applies the command to the session. Returns any text meant for the operator.
    pub fn apply(&self, tm: &mut MatchManager, now: Instant) -> Result<Option<String>> {
        let output = match self {
            Command::Start => {
                tm.start_match(now);
                None
            }
            Command::Stop { kind, beneficiary } => {
                tm.stop_play(*kind, *beneficiary, now);
                None
            }
            Command::Chain { kind, beneficiary } => {
                tm.chain_stoppage(*kind, *beneficiary, now);
                None
            }
            Command::Resume => {
                tm.resume_play(now);
                None
            }
            Command::EndPeriod => {
                tm.end_period(now);
                None
            }
            Command::EndMatch => {
                tm.end_match(now);
                None
            }
            Command::Card { kind, player } => {
                let id = tm.issue_card(*kind, *player, now);
                Some(format!("{kind} card logged with id {id}"))
            }
            Command::Sub {
                player_out,
                player_in,
            } => {
                tm.record_substitution(*player_out, *player_in, now);
                None
            }
            Command::AddPlayer(player) => {
                tm.add_player(player.clone());
                None
            }
            Command::RemovePlayer(id) => {
                tm.remove_player(*id);
                None
            }
            Command::DeleteStoppage(id) => {
                tm.delete_stoppage(*id);
                None
            }
            Command::CancelExpulsion(id) => {
                tm.cancel_temp_expulsion(*id, now);
                None
            }
            Command::Reset => {
                tm.reset_match(now);
                None
            }
            Command::Status => Some(status_line(tm, now)),
            Command::Snapshot => Some(serde_json::to_string(&tm.generate_snapshot(now))?),
            Command::Stoppages(period) => {
                Some(serde_json::to_string(&tm.stoppage_summary(*period, now))?)
            }
            Command::Playtime => Some(serde_json::to_string_pretty(&tm.playing_time(now))?),
            Command::Save(_) => Some(tm.record(now).as_json()?),
            Command::Help => Some(HELP.to_string()),
            Command::Quit => None,
        };
        Ok(output)
    }
}

fn status_line(tm: &MatchManager, now: Instant) -> String {
    let mut line = format!(
        "[{} {}] {}",
        mm_ss(tm.elapsed_time(now)),
        tm.current_period(),
        tm.clock_state()
    );

    let stoppage = tm.stoppage_elapsed(now);
    if !stoppage.is_zero() {
        line.push_str(&format!(", stopped for {}", mm_ss(stoppage)));
    }
    line.push_str(&format!(", +{} added", mm_ss(tm.current_added_time(now))));

    let overtime = tm.overtime_minutes(now);
    if overtime > 0 {
        line.push_str(&format!(", {overtime}' over"));
    }

    for expulsion in tm.active_temp_expulsions() {
        if let Some(remaining) = tm.temp_expulsion_remaining(expulsion.id, now) {
            line.push_str(&format!(
                "\n  expulsion {}: {} for {}",
                expulsion.id,
                mm_ss(remaining),
                expulsion.player_id
            ));
        }
    }
    line
}

fn required<'a>(arg: Option<&'a str>, what: &'static str) -> Result<&'a str> {
    arg.ok_or(CommandError::MissingArgument(what))
}

fn invalid(what: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument {
        what,
        value: value.to_string(),
    }
}

fn parse_kind(arg: &str) -> Result<StoppageKind> {
    Ok(match arg.to_lowercase().as_str() {
        "throw-in" | "throwin" => StoppageKind::ThrowIn,
        "goal-kick" | "goalkick" => StoppageKind::GoalKick,
        "corner" => StoppageKind::Corner,
        "free-kick" | "freekick" => StoppageKind::FreeKick,
        "penalty" => StoppageKind::Penalty,
        "sub" | "substitution" => StoppageKind::Substitution,
        "injury" => StoppageKind::Injury,
        "var" => StoppageKind::VarCheck,
        "goal" | "celebration" => StoppageKind::GoalCelebration,
        "anti-play" | "antiplay" | "time-wasting" | "foul" => StoppageKind::AntiPlay,
        "other" => StoppageKind::Other,
        _ => return Err(invalid("stoppage kind", arg)),
    })
}

/// `-` stands for no team
fn parse_team(arg: &str) -> Result<Option<Team>> {
    match arg.to_lowercase().as_str() {
        "home" | "h" => Ok(Some(Team::Home)),
        "away" | "a" => Ok(Some(Team::Away)),
        "-" => Ok(None),
        _ => Err(invalid("team", arg)),
    }
}

fn parse_card(arg: &str) -> Result<CardKind> {
    Ok(match arg.to_lowercase().as_str() {
        "yellow" | "y" => CardKind::Yellow,
        "second-yellow" | "2y" => CardKind::SecondYellow,
        "red" | "r" => CardKind::Red,
        "white" | "w" => CardKind::White,
        _ => return Err(invalid("card kind", arg)),
    })
}

fn parse_number<T: FromStr>(arg: &str, what: &'static str) -> Result<T> {
    arg.parse().map_err(|_| invalid(what, arg))
}

fn parse_player_id(arg: &str) -> Result<PlayerId> {
    parse_number(arg, "player id").map(PlayerId)
}

/// `-` stands for no player
fn parse_player(arg: &str) -> Result<Option<PlayerId>> {
    match arg {
        "-" => Ok(None),
        _ => parse_player_id(arg).map(Some),
    }
}

fn parse_status(arg: &str) -> Result<PlayerStatus> {
    Ok(match arg.to_lowercase().as_str() {
        "starter" => PlayerStatus::Starter,
        "sub" | "substitute" => PlayerStatus::Substitute,
        _ => return Err(invalid("player status", arg)),
    })
}

fn parse_position(arg: &str) -> Result<PlayerPosition> {
    Ok(match arg.to_lowercase().as_str() {
        "gk" | "goalkeeper" => PlayerPosition::Goalkeeper,
        "df" | "defender" => PlayerPosition::Defender,
        "mf" | "midfielder" => PlayerPosition::Midfielder,
        "fw" | "forward" => PlayerPosition::Forward,
        _ => return Err(invalid("position", arg)),
    })
}

fn parse_period(arg: &str) -> Result<Period> {
    Ok(match arg.to_lowercase().as_str() {
        "1" | "first" => Period::FirstHalf,
        "2" | "second" => Period::SecondHalf,
        "e1" => Period::ExtraFirst,
        "e2" => Period::ExtraSecond,
        _ => return Err(invalid("period", arg)),
    })
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
