//! Command-line argument parsing for kbchat.
//!
//! Global flags may appear anywhere before the command's free text:
//!
//! ```text
//! kbchat [--api-url URL] [--on-busy queue|cancel|reject]
//!        [--on-failure rollback|retain] <command> [args...]
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::app::parse_diary_date;
use crate::session::{FailurePolicy, SubmitPolicy};

pub const USAGE: &str = "\
Usage: kbchat [OPTIONS] <COMMAND> [ARGS...]

Commands:
  sessions [--search TEXT] [--category ID]   List sessions
  new [TITLE...]                            Create a session
  rm <SESSION_ID>                           Delete a session
  history <SESSION_ID>                      Show a session's messages
  chat <SESSION_ID> <MESSAGE...>            Ask a question, streaming the answer
  send <SESSION_ID> <MESSAGE...>            Ask a question without streaming
  categories                                List categories
  diary list                                List diary entries
  diary save [--date YYYY-MM-DD] [--mood M] <TEXT...>
  diary rm <YYYY-MM-DD>                     Delete a diary entry
  docs list                                 List indexed documents
  docs upload <PATH>                        Add a document to the knowledge base
  docs rm <FILENAME>                        Remove a document

Options:
  --api-url URL        API root (default http://localhost:8000/api)
  --on-busy POLICY     queue | cancel | reject
  --on-failure POLICY  rollback | retain
  -h, --help           Show this help
  -V, --version        Show the version";

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    Sessions {
        keyword: Option<String>,
        category: Option<i64>,
    },
    NewSession {
        title: Option<String>,
    },
    DeleteSession {
        session_id: String,
    },
    History {
        session_id: String,
    },
    /// Stream an answer
    Chat {
        session_id: String,
        message: String,
    },
    /// Plain request/response answer
    Send {
        session_id: String,
        message: String,
    },
    Categories,
    DiaryList,
    DiarySave {
        date: Option<NaiveDate>,
        mood: Option<String>,
        content: String,
    },
    DiaryDelete {
        date: NaiveDate,
    },
    DocsList,
    DocsUpload {
        path: PathBuf,
    },
    DocsDelete {
        filename: String,
    },
}

/// Command plus the global overrides given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: CliCommand,
    pub api_url: Option<String>,
    pub submit_policy: Option<SubmitPolicy>,
    pub failure_policy: Option<FailurePolicy>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgsError {
    #[error("missing {0}")]
    MissingArgument(&'static str),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },

    #[error("{flag} needs a value")]
    MissingValue { flag: String },
}

/// Parse command-line arguments.
///
/// # Examples
///
/// ```
/// use kbchat::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["kbchat".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()).unwrap().command, CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> Result<CliArgs, ArgsError>
where
    I: Iterator<Item = String>,
{
    let mut api_url = None;
    let mut submit_policy = None;
    let mut failure_policy = None;
    let mut rest = Vec::new();

    // Skip the program name
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" if rest.is_empty() => {
                return Ok(CliArgs::bare(CliCommand::Version))
            }
            "--help" | "-h" if rest.is_empty() => return Ok(CliArgs::bare(CliCommand::Help)),
            "--api-url" => api_url = Some(value_of(&arg, args.next())?),
            "--on-busy" => {
                let value = value_of(&arg, args.next())?;
                submit_policy = Some(value.parse().map_err(|_| invalid(&arg, &value))?);
            }
            "--on-failure" => {
                let value = value_of(&arg, args.next())?;
                failure_policy = Some(value.parse().map_err(|_| invalid(&arg, &value))?);
            }
            _ => rest.push(arg),
        }
    }

    Ok(CliArgs {
        command: parse_command(rest)?,
        api_url,
        submit_policy,
        failure_policy,
    })
}

impl CliArgs {
    fn bare(command: CliCommand) -> Self {
        Self {
            command,
            api_url: None,
            submit_policy: None,
            failure_policy: None,
        }
    }
}

fn parse_command(args: Vec<String>) -> Result<CliCommand, ArgsError> {
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(CliCommand::Help);
    };

    match command.as_str() {
        "sessions" | "ls" => {
            let mut keyword = None;
            let mut category = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--search" | "-s" => keyword = Some(value_of(&arg, args.next())?),
                    "--category" | "-c" => {
                        let value = value_of(&arg, args.next())?;
                        category = Some(value.parse().map_err(|_| invalid(&arg, &value))?);
                    }
                    _ => return Err(invalid("sessions", &arg)),
                }
            }
            Ok(CliCommand::Sessions { keyword, category })
        }
        "new" => Ok(CliCommand::NewSession {
            title: join_text(args),
        }),
        "rm" => Ok(CliCommand::DeleteSession {
            session_id: required(args.next(), "session id")?,
        }),
        "history" => Ok(CliCommand::History {
            session_id: required(args.next(), "session id")?,
        }),
        "chat" | "send" => {
            let session_id = required(args.next(), "session id")?;
            let message = join_text(args).ok_or(ArgsError::MissingArgument("message"))?;
            Ok(if command == "chat" {
                CliCommand::Chat {
                    session_id,
                    message,
                }
            } else {
                CliCommand::Send {
                    session_id,
                    message,
                }
            })
        }
        "categories" => Ok(CliCommand::Categories),
        "diary" => parse_diary(args),
        "docs" => parse_docs(args),
        "help" => Ok(CliCommand::Help),
        other => Err(ArgsError::UnknownCommand(other.to_string())),
    }
}

fn parse_diary(mut args: impl Iterator<Item = String>) -> Result<CliCommand, ArgsError> {
    match args.next().as_deref() {
        None | Some("list") => Ok(CliCommand::DiaryList),
        Some("save") => {
            let mut date = None;
            let mut mood = None;
            let mut words = Vec::new();
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--date" => {
                        let value = value_of(&arg, args.next())?;
                        date = Some(parse_diary_date(&value).map_err(|_| invalid(&arg, &value))?);
                    }
                    "--mood" => mood = Some(value_of(&arg, args.next())?),
                    _ => words.push(arg),
                }
            }
            let content = join_text(words.into_iter()).ok_or(ArgsError::MissingArgument("text"))?;
            Ok(CliCommand::DiarySave {
                date,
                mood,
                content,
            })
        }
        Some("rm") => {
            let value = required(args.next(), "date")?;
            let date = parse_diary_date(&value).map_err(|_| invalid("date", &value))?;
            Ok(CliCommand::DiaryDelete { date })
        }
        Some(other) => Err(ArgsError::UnknownCommand(format!("diary {}", other))),
    }
}

fn parse_docs(mut args: impl Iterator<Item = String>) -> Result<CliCommand, ArgsError> {
    match args.next().as_deref() {
        None | Some("list") => Ok(CliCommand::DocsList),
        Some("upload") => Ok(CliCommand::DocsUpload {
            path: PathBuf::from(required(args.next(), "path")?),
        }),
        Some("rm") => Ok(CliCommand::DocsDelete {
            filename: required(args.next(), "filename")?,
        }),
        Some(other) => Err(ArgsError::UnknownCommand(format!("docs {}", other))),
    }
}

fn value_of(flag: &str, value: Option<String>) -> Result<String, ArgsError> {
    value.ok_or_else(|| ArgsError::MissingValue {
        flag: flag.to_string(),
    })
}

fn required(value: Option<String>, what: &'static str) -> Result<String, ArgsError> {
    value.ok_or(ArgsError::MissingArgument(what))
}

fn invalid(flag: &str, value: &str) -> ArgsError {
    ArgsError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}

/// Join the remaining words; `None` if nothing but whitespace is left.
fn join_text(words: impl Iterator<Item = String>) -> Option<String> {
    let text = words.collect::<Vec<_>>().join(" ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, ArgsError> {
        let mut all = vec!["kbchat".to_string()];
        all.extend(args.iter().map(|s| s.to_string()));
        parse_args(all.into_iter())
    }

    fn command(args: &[&str]) -> CliCommand {
        parse(args).unwrap().command
    }

    #[test]
    fn test_parse_version_flag() {
        assert_eq!(command(&["--version"]), CliCommand::Version);
        assert_eq!(command(&["-V"]), CliCommand::Version);
    }

    #[test]
    fn test_parse_no_args_shows_help() {
        assert_eq!(command(&[]), CliCommand::Help);
        assert_eq!(command(&["-h"]), CliCommand::Help);
    }

    #[test]
    fn test_parse_chat_joins_message() {
        assert_eq!(
            command(&["chat", "s-1", "what", "did", "I", "read?"]),
            CliCommand::Chat {
                session_id: "s-1".into(),
                message: "what did I read?".into()
            }
        );
    }

    #[test]
    fn test_parse_chat_requires_message() {
        assert_eq!(
            parse(&["chat", "s-1"]).unwrap_err(),
            ArgsError::MissingArgument("message")
        );
    }

    #[test]
    fn test_parse_global_flags() {
        let args = parse(&[
            "--api-url",
            "http://kb.lan/api",
            "--on-busy",
            "reject",
            "send",
            "s1",
            "hi",
            "--on-failure",
            "retain",
        ])
        .unwrap();
        assert_eq!(args.api_url.as_deref(), Some("http://kb.lan/api"));
        assert_eq!(args.submit_policy, Some(SubmitPolicy::Reject));
        assert_eq!(args.failure_policy, Some(FailurePolicy::Retain));
        assert!(matches!(args.command, CliCommand::Send { .. }));
    }

    #[test]
    fn test_parse_invalid_policy() {
        assert!(matches!(
            parse(&["--on-busy", "maybe", "sessions"]),
            Err(ArgsError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&["sessions", "--on-busy"]),
            Err(ArgsError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_parse_sessions_filters() {
        assert_eq!(
            command(&["sessions", "--search", "rust", "--category", "2"]),
            CliCommand::Sessions {
                keyword: Some("rust".into()),
                category: Some(2)
            }
        );
        assert!(parse(&["sessions", "--category", "two"]).is_err());
    }

    #[test]
    fn test_parse_new_session_title() {
        assert_eq!(command(&["new"]), CliCommand::NewSession { title: None });
        assert_eq!(
            command(&["new", "Reading", "notes"]),
            CliCommand::NewSession {
                title: Some("Reading notes".into())
            }
        );
    }

    #[test]
    fn test_parse_diary_save() {
        assert_eq!(
            command(&["diary", "save", "--date", "2025-05-01", "--mood", "平静", "quiet", "day"]),
            CliCommand::DiarySave {
                date: NaiveDate::from_ymd_opt(2025, 5, 1),
                mood: Some("平静".into()),
                content: "quiet day".into()
            }
        );
        assert!(parse(&["diary", "rm", "yesterday"]).is_err());
    }

    #[test]
    fn test_parse_docs() {
        assert_eq!(command(&["docs"]), CliCommand::DocsList);
        assert_eq!(
            command(&["docs", "upload", "/tmp/book.epub"]),
            CliCommand::DocsUpload {
                path: PathBuf::from("/tmp/book.epub")
            }
        );
        assert_eq!(
            parse(&["docs", "burn"]).unwrap_err(),
            ArgsError::UnknownCommand("docs burn".into())
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse(&["frobnicate"]).unwrap_err(),
            ArgsError::UnknownCommand("frobnicate".into())
        );
    }
}
