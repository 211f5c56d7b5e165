//! Script command parsing.
//!
//! Event source lines are semicolon-delimited: the first token is the
//! command name, the rest are arguments. Malformed lines are dropped at
//! parse time with a warning; unknown commands are skipped so newer
//! content degrades gracefully on older engines.

use crate::common::{Coord, Nid, Value};
use crate::data::{Region, RegionKind};
use crate::error::{EngineError, ErrorSeverity};

/// Malformed script input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("malformed command line {line:?}: {reason}")]
    Malformed { line: String, reason: &'static str },
}

impl EngineError for ScriptError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        "malformed_command"
    }
}

/// The abstract command set executed by the interpreter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventCommand {
    Speak { speaker: Nid, text: String },
    AddPortrait { nid: Nid, position: String, no_block: bool },
    RemovePortrait { nid: Nid },
    Transition { mode: String },
    Wait { duration_ms: u32 },
    SetCurrentHp { unit: Nid, value: i32 },
    AddUnit { unit: Nid, tile: Coord, team: Nid },
    RemoveUnit { unit: Nid },
    MoveUnit { unit: Nid, tile: Coord },
    GiveItem { unit: Nid, item: Nid },
    GiveMoney { party: Nid, amount: i32 },
    ChangeTeam { unit: Nid, team: Nid },
    SetGameVar { key: String, value: Value },
    Music { nid: Nid },
    Sound { nid: Nid },
    EndSkip,
    WinGame,
    LoseGame,
    MapAnim { nid: Nid, tile: Coord },
    SetTile { tile: Coord, terrain: Nid },
    ChangeObjective { simple: String, win: String, loss: String },
    AddRegion(Region),
    RemoveRegion { nid: Nid },
}

impl EventCommand {
    /// Whether execution suspends on this command until an external
    /// signal resumes the event.
    pub fn suspends(&self) -> bool {
        matches!(
            self,
            EventCommand::Speak { .. }
                | EventCommand::Wait { .. }
                | EventCommand::Transition { .. }
        )
    }

    /// Parses one source line. `Ok(None)` means an unknown command that
    /// the caller should skip with a warning.
    pub fn parse(line: &str) -> Result<Option<Self>, ScriptError> {
        let mut parts = line.split(';').map(str::trim);
        let Some(name) = parts.next().filter(|n| !n.is_empty()) else {
            return Err(ScriptError::Malformed {
                line: line.to_owned(),
                reason: "empty command",
            });
        };
        let args: Vec<&str> = parts.collect();

        let malformed = |reason| ScriptError::Malformed {
            line: line.to_owned(),
            reason,
        };
        let arg = |i: usize| -> Result<&str, ScriptError> {
            args.get(i).copied().ok_or(ScriptError::Malformed {
                line: line.to_owned(),
                reason: "missing argument",
            })
        };

        let cmd = match name {
            "speak" => EventCommand::Speak {
                speaker: Nid::new(arg(0)?),
                text: arg(1)?.to_owned(),
            },
            "add_portrait" => EventCommand::AddPortrait {
                nid: Nid::new(arg(0)?),
                position: arg(1)?.to_owned(),
                no_block: args.get(2).copied() == Some("no_block"),
            },
            "remove_portrait" => EventCommand::RemovePortrait {
                nid: Nid::new(arg(0)?),
            },
            "transition" => EventCommand::Transition {
                mode: arg(0)?.to_owned(),
            },
            "wait" => EventCommand::Wait {
                duration_ms: arg(0)?
                    .parse()
                    .map_err(|_| malformed("wait duration must be an integer"))?,
            },
            "set_current_hp" => EventCommand::SetCurrentHp {
                unit: Nid::new(arg(0)?),
                value: arg(1)?
                    .parse()
                    .map_err(|_| malformed("hp value must be an integer"))?,
            },
            "add_unit" => EventCommand::AddUnit {
                unit: Nid::new(arg(0)?),
                tile: parse_tile(arg(1)?).ok_or_else(|| malformed("bad tile"))?,
                team: Nid::new(arg(2)?),
            },
            "remove_unit" => EventCommand::RemoveUnit {
                unit: Nid::new(arg(0)?),
            },
            "move_unit" => EventCommand::MoveUnit {
                unit: Nid::new(arg(0)?),
                tile: parse_tile(arg(1)?).ok_or_else(|| malformed("bad tile"))?,
            },
            "give_item" => EventCommand::GiveItem {
                unit: Nid::new(arg(0)?),
                item: Nid::new(arg(1)?),
            },
            "give_money" => EventCommand::GiveMoney {
                party: Nid::new(arg(0)?),
                amount: arg(1)?
                    .parse()
                    .map_err(|_| malformed("amount must be an integer"))?,
            },
            "change_team" => EventCommand::ChangeTeam {
                unit: Nid::new(arg(0)?),
                team: Nid::new(arg(1)?),
            },
            "set_game_var" => EventCommand::SetGameVar {
                key: arg(0)?.to_owned(),
                value: Value::parse(arg(1)?),
            },
            "music" => EventCommand::Music {
                nid: Nid::new(arg(0)?),
            },
            "sound" => EventCommand::Sound {
                nid: Nid::new(arg(0)?),
            },
            "end_skip" => EventCommand::EndSkip,
            "win_game" => EventCommand::WinGame,
            "lose_game" => EventCommand::LoseGame,
            "map_anim" => EventCommand::MapAnim {
                nid: Nid::new(arg(0)?),
                tile: parse_tile(arg(1)?).ok_or_else(|| malformed("bad tile"))?,
            },
            "set_tile" => EventCommand::SetTile {
                tile: parse_tile(arg(0)?).ok_or_else(|| malformed("bad tile"))?,
                terrain: Nid::new(arg(1)?),
            },
            "change_objective" => EventCommand::ChangeObjective {
                simple: arg(0)?.to_owned(),
                win: arg(1)?.to_owned(),
                loss: arg(2)?.to_owned(),
            },
            "add_region" => {
                let kind = RegionKind::parse(arg(1)?).ok_or_else(|| malformed("bad region type"))?;
                let size = args
                    .get(3)
                    .and_then(|s| parse_tile(s))
                    .map(|c| (c.x, c.y))
                    .unwrap_or((1, 1));
                EventCommand::AddRegion(Region {
                    nid: Nid::new(arg(0)?),
                    kind,
                    position: parse_tile(arg(2)?).ok_or_else(|| malformed("bad tile"))?,
                    size,
                    sub_nid: args.get(4).map(|s| (*s).to_owned()),
                    condition: args.get(5).map(|s| (*s).to_owned()),
                })
            }
            "remove_region" => EventCommand::RemoveRegion {
                nid: Nid::new(arg(0)?),
            },
            _ => return Ok(None),
        };
        Ok(Some(cmd))
    }
}

/// Parses an `x,y` tile argument.
fn parse_tile(s: &str) -> Option<Coord> {
    let (x, y) = s.split_once(',')?;
    Some(Coord::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Parses a prefab's source lines, dropping malformed lines with a
/// warning and skipping unknown commands.
pub fn parse_source(event: &Nid, source: &[String]) -> Vec<EventCommand> {
    let mut commands = Vec::with_capacity(source.len());
    for line in source {
        if line.trim().is_empty() {
            continue;
        }
        match EventCommand::parse(line) {
            Ok(Some(cmd)) => commands.push(cmd),
            Ok(None) => {
                tracing::warn!(event = %event, line = %line, "unknown event command, skipping");
            }
            Err(err) => {
                tracing::warn!(event = %event, %err, "dropping malformed event line");
            }
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_speak() {
        let cmd = EventCommand::parse("speak;Hero;Go!").unwrap().unwrap();
        assert_eq!(
            cmd,
            EventCommand::Speak {
                speaker: Nid::new("Hero"),
                text: "Go!".into()
            }
        );
        assert!(cmd.suspends());
    }

    #[test]
    fn parses_tiles() {
        let cmd = EventCommand::parse("move_unit;eirika;4,7").unwrap().unwrap();
        assert_eq!(
            cmd,
            EventCommand::MoveUnit {
                unit: Nid::new("eirika"),
                tile: Coord::new(4, 7)
            }
        );
    }

    #[test]
    fn unknown_commands_are_skipped() {
        assert_eq!(EventCommand::parse("quux;1;2").unwrap(), None);
    }

    #[test]
    fn malformed_lines_error() {
        assert!(EventCommand::parse("wait;soon").is_err());
        assert!(EventCommand::parse("speak;HeroOnly").is_err());
    }

    #[test]
    fn parse_source_drops_bad_lines() {
        let source = vec![
            "speak;Hero;Hi".to_owned(),
            "wait;nope".to_owned(),
            "bogus;x".to_owned(),
            "win_game".to_owned(),
        ];
        let cmds = parse_source(&Nid::new("e1"), &source);
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[1], EventCommand::WinGame);
    }

    #[test]
    fn add_region_defaults_size() {
        let cmd = EventCommand::parse("add_region;v1;village;3,4").unwrap().unwrap();
        match cmd {
            EventCommand::AddRegion(region) => {
                assert_eq!(region.kind, RegionKind::Village);
                assert_eq!(region.position, Coord::new(3, 4));
                assert_eq!(region.size, (1, 1));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
