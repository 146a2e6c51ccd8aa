//! Session list, categories and session selection.

use tracing::info;

use super::App;
use crate::conversation::lock_conversation;
use crate::error::{ErrorContext, KbResult, ResultExt};
use crate::models::{Category, Session, SessionQuery};
use crate::traits::HttpClient;

impl<C: HttpClient + 'static> App<C> {
    /// The session list filter built from the current keyword and category.
    pub fn session_query(&self) -> SessionQuery {
        SessionQuery {
            keyword: self.session_keyword.clone(),
            category_id: self.active_category,
        }
    }

    /// Re-list sessions with the current filters.
    pub async fn fetch_sessions(&mut self) -> KbResult<&[Session]> {
        self.sessions = self.api.list_sessions(&self.session_query()).await?;
        Ok(&self.sessions)
    }

    /// Set (or clear, with `None` or an empty string) the keyword filter and
    /// re-list.
    pub async fn search_sessions(&mut self, keyword: Option<&str>) -> KbResult<&[Session]> {
        self.session_keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        self.fetch_sessions().await
    }

    /// Create a session, put it at the top of the list and select it.
    ///
    /// The new session has no history, so the conversation is cleared
    /// without a fetch.
    pub async fn create_session(&mut self, title: Option<&str>) -> KbResult<Session> {
        let session = self.api.create_session(title).await?;
        info!(session_id = %session.id, "Created session");

        self.gate.cancel_all();
        lock_conversation(&self.conversation).clear();
        self.sessions.retain(|s| s.id != session.id);
        self.sessions.insert(0, session.clone());
        self.current_session_id = Some(session.id.clone());
        Ok(session)
    }

    /// Make `session_id` current and load its history.
    ///
    /// Streams for the previous conversation are cancelled, including
    /// queued ones, before the list is replaced.
    pub async fn select_session(&mut self, session_id: &str) -> KbResult<()> {
        self.gate.cancel_all();
        self.current_session_id = Some(session_id.to_string());
        lock_conversation(&self.conversation).clear();

        self.fetch_messages()
            .await
            .context(ErrorContext::new("select session").with_session_id(session_id))?;
        Ok(())
    }

    /// Delete a session; deleting the current one leaves nothing selected.
    pub async fn delete_session(&mut self, session_id: &str) -> KbResult<()> {
        self.api.delete_session(session_id).await?;
        self.sessions.retain(|s| s.id != session_id);

        if self.current_session_id.as_deref() == Some(session_id) {
            self.gate.cancel_all();
            self.current_session_id = None;
            lock_conversation(&self.conversation).clear();
        }
        Ok(())
    }

    pub async fn fetch_categories(&mut self) -> KbResult<&[Category]> {
        self.categories = self.api.list_categories().await?;
        Ok(&self.categories)
    }

    /// Filter the session list by category (`None` shows all) and re-list.
    pub async fn set_category_filter(&mut self, category_id: Option<i64>) -> KbResult<&[Session]> {
        self.active_category = category_id;
        self.fetch_sessions().await
    }
}
