//! Console command parsing.

use anyhow::{anyhow, bail, Result};
use edutools_core::{ActorId, Value};
use edutools_navigation::{OpenSceneRequest, OPEN_SCENE_EVENT};

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Connect an actor
    Join(ActorId),
    /// Disconnect an actor
    Leave(ActorId),
    /// Open a scene through the external channel
    Open(OpenSceneRequest),
    /// Press a button on the open action or message form
    Press(ActorId, usize),
    /// Submit modal values
    Submit(ActorId, Vec<Value>),
    /// Close the open form
    Close(ActorId),
    /// Toggle whether the actor has some other UI open
    Busy(ActorId),
    /// Put an item in the actor's inventory
    Give(ActorId, String),
    /// Print console state
    Status,
    /// List commands
    Help,
    /// Leave the console
    Quit,
}

/// Usage text.
pub const HELP: &str = "\
commands:
  join <actor>               connect an actor
  leave <actor>              disconnect an actor
  open <actor> <scene>       open a scene for an actor
  press <actor> <n>          press button n (message forms: 0 confirm, 1 cancel)
  submit <actor> <json>      submit modal values, e.g. [4, \"fun\"]
  close <actor>              close the open form
  busy <actor>               toggle another UI being open
  give <actor> <item>        add an item to the inventory
  status                     show actors, sessions and tasks
  quit                       flush settings and exit";

impl Command {
    /// Parse a console line.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match verb {
            "join" => Command::Join(actor(rest)?),
            "leave" => Command::Leave(actor(rest)?),
            "open" => Command::Open(OpenSceneRequest::from_event(OPEN_SCENE_EVENT, rest, None)?),
            "press" => {
                let (name, index) = two(rest, "press <actor> <n>")?;
                let index = index.parse().map_err(|_| anyhow!("not a button index: {index}"))?;
                Command::Press(ActorId::from(name), index)
            }
            "submit" => {
                let (name, json) = two(rest, "submit <actor> <json-array>")?;
                let values: Vec<Value> = serde_json::from_str(json)?;
                Command::Submit(ActorId::from(name), values)
            }
            "close" => Command::Close(actor(rest)?),
            "busy" => Command::Busy(actor(rest)?),
            "give" => {
                let (name, item) = two(rest, "give <actor> <item>")?;
                Command::Give(ActorId::from(name), item.to_string())
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command: {other} (try `help`)"),
        };
        Ok(command)
    }
}

fn actor(rest: &str) -> Result<ActorId> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [name] => Ok(ActorId::from(*name)),
        _ => bail!("expected a single actor name"),
    }
}

/// Split `<actor> <rest of line>`.
fn two<'a>(rest: &'a str, usage: &str) -> Result<(&'a str, &'a str)> {
    match rest.split_once(char::is_whitespace) {
        Some((name, tail)) if !tail.trim().is_empty() => Ok((name, tail.trim())),
        _ => bail!("usage: {usage}"),
    }
}
