use crate::config::UserConfig;
use crate::search::{SearchClient, SearchError};
use crate::session::LogBuffer;
use log::warn;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;

/// How long the poller waits before retrying after an empty minute or a
/// failed fetch.
const POLL_RETRY: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// What a dispatched line produced. `Exit` is the reserved session
/// termination signal; everything else is display text.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Exit,
    Output(String),
}

type Handler = fn(&mut Dispatcher, &[&str]) -> Result<Outcome, CommandError>;

struct Command {
    name: &'static str,
    doc: &'static str,
    handler: Handler,
}

/// Line-oriented command interpreter. Commands are registered in an
/// explicit table at construction; quit and help are built in, like IRC
/// without the slash prefix.
pub struct Dispatcher {
    commands: Vec<Command>,
    client: SearchClient,
    config: UserConfig,
    log: Arc<LogBuffer>,
    redraw: Sender<()>,
    connected: bool,
}

impl Dispatcher {
    pub fn new(
        config: UserConfig,
        client: SearchClient,
        log: Arc<LogBuffer>,
        redraw: Sender<()>,
    ) -> Self {
        let commands = vec![
            Command {
                name: "connect",
                doc: "connect: start replaying the configured channel into the log pane",
                handler: cmd_connect,
            },
            Command {
                name: "list",
                doc: "list: print the indexed channel names",
                handler: cmd_list,
            },
            Command {
                name: "whois",
                doc: "whois <username>: summarize a user's history",
                handler: cmd_whois,
            },
            Command {
                name: "seen",
                doc: "seen <username>: timestamp of a user's most recent line",
                handler: cmd_seen,
            },
            Command {
                name: "search",
                doc: "search <text> [channel]: full-text search, optionally in one channel",
                handler: cmd_search,
            },
            Command {
                name: "top",
                doc: "top [n]: the n most active usernames (default 10)",
                handler: cmd_top,
            },
            Command {
                name: "count",
                doc: "count: total number of indexed log lines",
                handler: cmd_count,
            },
        ];
        Self {
            commands,
            client,
            config,
            log,
            redraw,
            connected: false,
        }
    }

    /// Tokenize and run one input line. The first token, lowercased, names
    /// the command; the rest are passed through as positional strings.
    pub fn dispatch(&mut self, line: &str) -> Result<Outcome, CommandError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return Ok(Outcome::Output(String::new()));
        };
        let cmd = first.to_lowercase();
        let args = &tokens[1..];

        match cmd.as_str() {
            "quit" | "q" => Ok(Outcome::Exit),
            "help" | "?" => Ok(Outcome::Output(self.help(args.first().copied()))),
            _ => {
                let handler = self
                    .commands
                    .iter()
                    .find(|command| command.name == cmd)
                    .map(|command| command.handler)
                    .ok_or(CommandError::Unknown(cmd))?;
                handler(self, args)
            }
        }
    }

    /// Per-command one-liner when the target is known, otherwise the
    /// generic help text.
    fn help(&self, target: Option<&str>) -> String {
        match target.and_then(|name| self.commands.iter().find(|command| command.name == name)) {
            Some(command) if !command.doc.is_empty() => command.doc.to_string(),
            _ => self.general_help(),
        }
    }

    fn general_help(&self) -> String {
        let mut names: Vec<&str> = self.commands.iter().map(|command| command.name).collect();
        names.sort_unstable();
        format!(
            "Type [help|?] command_name to get more help.\n\
             Type [quit|q] to quit.\n\
             Available commands: {}",
            names.join(" ")
        )
    }
}

fn require<'a>(args: &[&'a str], name: &'static str) -> Result<&'a str, CommandError> {
    args.first()
        .copied()
        .ok_or(CommandError::MissingArgument(name))
}

fn cmd_connect(dispatcher: &mut Dispatcher, _args: &[&str]) -> Result<Outcome, CommandError> {
    let channel = dispatcher.config.poll_channel();
    if dispatcher.connected {
        return Ok(Outcome::Output(format!("already connected to #{channel}")));
    }

    let client = dispatcher.client.clone();
    let log = Arc::clone(&dispatcher.log);
    let redraw = dispatcher.redraw.clone();
    let day = dispatcher.config.poll_day();
    let poll_channel = channel.clone();
    // Fire and forget: the poller runs until process exit.
    std::thread::spawn(move || replay_logs(&client, &log, &redraw, &poll_channel, &day));

    dispatcher.connected = true;
    Ok(Outcome::Output(format!(
        "Connected to irc://irc.ubuntu.com/#{channel}"
    )))
}

/// Poll the index once a cycle for the archived minute matching the
/// current wall clock, pacing the lines out so a minute's worth of
/// conversation takes about a minute to appear.
fn replay_logs(
    client: &SearchClient,
    log: &LogBuffer,
    redraw: &Sender<()>,
    channel: &str,
    day: &str,
) {
    loop {
        let stamp = format!("{day}{}", chrono::Local::now().format("%H:%M"));
        match client.log_lines(&stamp, channel) {
            Ok(lines) if !lines.is_empty() => {
                let pause = Duration::from_secs((60 / lines.len() as u64).max(1));
                for line in lines {
                    log.append(line);
                    // The event loop does not watch the log on its own;
                    // every off-thread append requests a redraw.
                    if redraw.send(()).is_err() {
                        return;
                    }
                    std::thread::sleep(pause);
                }
            }
            Ok(_) => std::thread::sleep(POLL_RETRY),
            Err(err) => {
                warn!("replay fetch for {stamp} failed: {err}");
                log.append(format!("Error: {err}"));
                if redraw.send(()).is_err() {
                    return;
                }
                std::thread::sleep(POLL_RETRY);
            }
        }
    }
}

fn cmd_list(dispatcher: &mut Dispatcher, _args: &[&str]) -> Result<Outcome, CommandError> {
    let channels = dispatcher.client.channels()?;
    Ok(Outcome::Output(channels.join("\n")))
}

fn cmd_whois(dispatcher: &mut Dispatcher, args: &[&str]) -> Result<Outcome, CommandError> {
    let username = require(args, "username")?;
    let info = dispatcher.client.whois(username)?;
    Ok(Outcome::Output(info.describe(username)))
}

fn cmd_seen(dispatcher: &mut Dispatcher, args: &[&str]) -> Result<Outcome, CommandError> {
    let username = require(args, "username")?;
    let stamp = dispatcher.client.last_seen(username)?;
    Ok(Outcome::Output(stamp))
}

fn cmd_search(dispatcher: &mut Dispatcher, args: &[&str]) -> Result<Outcome, CommandError> {
    let text = require(args, "text")?;
    let channel = args.get(1).copied();
    let lines = dispatcher.client.search_lines(text, channel)?;
    if lines.is_empty() {
        return Err(SearchError::NoHits.into());
    }
    Ok(Outcome::Output(lines.join("\n")))
}

fn cmd_top(dispatcher: &mut Dispatcher, args: &[&str]) -> Result<Outcome, CommandError> {
    let limit = args
        .first()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(10);
    let users = dispatcher.client.top_users(limit)?;
    Ok(Outcome::Output(users.join("\n")))
}

fn cmd_count(dispatcher: &mut Dispatcher, _args: &[&str]) -> Result<Outcome, CommandError> {
    let total = dispatcher.client.total_records()?;
    Ok(Outcome::Output(format!("{total} log lines indexed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn dispatcher() -> Dispatcher {
        let config = UserConfig::default();
        let client = SearchClient::new(&config).unwrap();
        let log = Arc::new(LogBuffer::new(100));
        let (redraw, _rx) = mpsc::channel();
        Dispatcher::new(config, client, log, redraw)
    }

    #[test]
    fn unknown_command_is_a_typed_nonfatal_error() {
        let mut dispatcher = dispatcher();
        let err = dispatcher.dispatch("foo").unwrap_err();
        assert_eq!(format!("Error: {err}"), "Error: Unknown command: foo");
        // still interactive afterwards
        assert!(matches!(dispatcher.dispatch("quit"), Ok(Outcome::Exit)));
    }

    #[test]
    fn command_word_is_case_insensitive() {
        let mut dispatcher = dispatcher();
        assert!(matches!(dispatcher.dispatch("QUIT"), Ok(Outcome::Exit)));
        assert!(matches!(dispatcher.dispatch("Q"), Ok(Outcome::Exit)));
    }

    #[test]
    fn missing_argument_is_reported_not_fatal() {
        let mut dispatcher = dispatcher();
        let err = dispatcher.dispatch("whois").unwrap_err();
        assert_eq!(format!("Error: {err}"), "Error: missing argument: username");
        let err = dispatcher.dispatch("seen").unwrap_err();
        assert_eq!(format!("Error: {err}"), "Error: missing argument: username");
    }

    #[test]
    fn general_help_lists_commands_in_lexical_order() {
        let mut dispatcher = dispatcher();
        let Ok(Outcome::Output(help)) = dispatcher.dispatch("help") else {
            panic!("help should produce output");
        };
        assert!(help.contains("Type [help|?] command_name"));
        assert!(help.contains("Type [quit|q] to quit."));
        assert!(help.contains("Available commands: connect count list search seen top whois"));
    }

    #[test]
    fn help_with_known_target_returns_its_doc() {
        let mut dispatcher = dispatcher();
        let Ok(Outcome::Output(help)) = dispatcher.dispatch("help seen") else {
            panic!("help should produce output");
        };
        assert_eq!(
            help,
            "seen <username>: timestamp of a user's most recent line"
        );
    }

    #[test]
    fn help_with_unknown_target_falls_back_to_general_help() {
        let mut dispatcher = dispatcher();
        let Ok(Outcome::Output(help)) = dispatcher.dispatch("? bogus") else {
            panic!("help should produce output");
        };
        assert!(help.contains("Available commands:"));
    }

    #[test]
    fn blank_line_produces_no_output() {
        let mut dispatcher = dispatcher();
        assert_eq!(
            dispatcher.dispatch("   ").unwrap(),
            Outcome::Output(String::new())
        );
    }
}
