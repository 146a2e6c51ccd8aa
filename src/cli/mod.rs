//! CLI front end for kbchat.
//!
//! - Argument parsing ([`args`])
//! - Line-based output ([`output`])
//! - Command execution against an [`App`]
//!
//! # Usage
//!
//! ```ignore
//! use kbchat::cli::{parse_args, run_command};
//!
//! let args = parse_args(std::env::args())?;
//! let mut app = App::from_config(&config)?;
//! run_command(&mut app, args.command).await?;
//! ```

pub mod args;
pub mod output;
pub mod version;

pub use args::{parse_args, ArgsError, CliArgs, CliCommand, USAGE};
pub use version::{version_line, VERSION};

use std::io::Write;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::app::App;
use crate::conversation::{lock_conversation, ConversationChange};
use crate::models::MessageRole;
use crate::session::StreamOutcome;
use crate::traits::HttpClient;

/// Run one command to completion.
pub async fn run_command<C: HttpClient + 'static>(
    app: &mut App<C>,
    command: CliCommand,
) -> Result<()> {
    match command {
        CliCommand::Version => println!("{}", version_line()),
        CliCommand::Help => println!("{}", USAGE),
        CliCommand::Sessions { keyword, category } => {
            app.active_category = category;
            app.search_sessions(keyword.as_deref()).await?;
            output::print_header("SESSIONS");
            for session in &app.sessions {
                println!("{}", output::session_line(session, false));
            }
        }
        CliCommand::NewSession { title } => {
            let session = app.create_session(title.as_deref()).await?;
            println!("{}", output::session_line(&session, true));
        }
        CliCommand::DeleteSession { session_id } => {
            app.delete_session(&session_id).await?;
            println!("Deleted session {}", session_id);
        }
        CliCommand::History { session_id } => {
            app.select_session(&session_id).await?;
            let turns = lock_conversation(app.conversation()).snapshot();
            for turn in &turns {
                println!("{}", output::turn_block(turn));
                output::print_rule();
            }
        }
        CliCommand::Chat {
            session_id,
            message,
        } => chat(app, &session_id, &message).await?,
        CliCommand::Send {
            session_id,
            message,
        } => {
            app.current_session_id = Some(session_id);
            app.send_message(&message).await?;
            let turns = lock_conversation(app.conversation()).snapshot();
            if let Some(reply) = turns.iter().rev().find(|t| t.role == MessageRole::Assistant) {
                println!("{}", output::turn_block(reply));
            }
        }
        CliCommand::Categories => {
            app.fetch_categories().await?;
            output::print_header("CATEGORIES");
            for category in &app.categories {
                println!("{}", output::category_line(category));
            }
        }
        CliCommand::DiaryList => {
            app.fetch_diaries().await?;
            output::print_header("DIARY");
            for entry in &app.diaries {
                println!("{}", output::diary_line(entry));
            }
        }
        CliCommand::DiarySave {
            date,
            mood,
            content,
        } => {
            if let Some(date) = date {
                app.set_diary_date(date);
            }
            match app.save_diary(&content, mood.as_deref()).await? {
                Some(entry) => println!("Saved {}", output::diary_line(&entry)),
                None => println!("Nothing to save"),
            }
        }
        CliCommand::DiaryDelete { date } => {
            app.delete_diary(date).await?;
            println!("Deleted diary entry for {}", date);
        }
        CliCommand::DocsList => {
            app.fetch_documents().await?;
            output::print_header("DOCUMENTS");
            for document in &app.documents {
                println!("{}", output::document_line(document));
            }
        }
        CliCommand::DocsUpload { path } => {
            app.upload_document(&path).await?;
            println!("Uploaded {}", path.display());
        }
        CliCommand::DocsDelete { filename } => {
            app.delete_document(&filename).await?;
            println!("Deleted {}", filename);
        }
    }
    Ok(())
}

/// Stream one answer to stdout as it arrives.
///
/// Ctrl-C cancels the stream; the optimistic turns are then handled by the
/// configured failure policy.
async fn chat<C: HttpClient + 'static>(
    app: &mut App<C>,
    session_id: &str,
    message: &str,
) -> Result<()> {
    app.select_session(session_id).await?;
    let mut changes = lock_conversation(app.conversation()).subscribe();

    println!("[you] {}", message);
    print!("[assistant] ");
    std::io::stdout().flush().ok();

    let mut handle = app.send_message_stream(message).await?;
    let outcome = loop {
        tokio::select! {
            outcome = &mut handle => break outcome?,
            change = changes.recv() => print_change(change),
            _ = tokio::signal::ctrl_c() => {
                app.cancel_stream();
            }
        }
    };
    // Deltas published just before the task finished
    while let Ok(change) = changes.try_recv() {
        print_change(Ok(change));
    }
    println!();

    match outcome {
        StreamOutcome::Completed { assistant_id, .. } => {
            let conversation = lock_conversation(app.conversation());
            let sources = conversation
                .get(&assistant_id)
                .and_then(|t| t.sources.as_deref());
            if let Some(sources) = sources {
                for citation in sources {
                    println!("{}", output::citation_line(citation));
                }
            }
        }
        StreamOutcome::Failed { error, .. } => return Err(eyre!(error.user_message())),
        StreamOutcome::Cancelled { .. } => println!("(cancelled)"),
    }

    // Pick up a regenerated title
    app.process_notices().await?;
    if let Some(session) = app.current_session() {
        println!("{}", output::session_line(session, true));
    }
    Ok(())
}

fn print_change(change: std::result::Result<ConversationChange, RecvError>) {
    match change {
        Ok(ConversationChange::TokenAppended { delta, .. }) => {
            print!("{}", delta);
            std::io::stdout().flush().ok();
        }
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "Output fell behind the stream");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockHttpClient, MockResponse};
    use crate::api::KnowledgeBaseClient;
    use crate::config::ClientConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_run_sessions_command_applies_filters() {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_default_response(MockResponse::json(200, serde_json::json!([])));
        let api = KnowledgeBaseClient::new(Arc::clone(&mock), "http://kb.test/api");
        let mut app = App::new(api, &ClientConfig::default());

        run_command(
            &mut app,
            CliCommand::Sessions {
                keyword: Some("rust".into()),
                category: Some(1),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            mock.get_requests()[0].url,
            "http://kb.test/api/sessions?keyword=rust&category_id=1"
        );
    }
}
