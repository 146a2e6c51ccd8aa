//! Diary entries and knowledge-base documents.

use std::path::Path;

use bytes::Bytes;
use chrono::NaiveDate;
use tracing::info;

use super::App;
use crate::error::{ErrorContext, KbResult, ResultExt, ValidationError};
use crate::models::{DiaryEntry, DocumentInfo, SaveDiaryRequest};
use crate::traits::HttpClient;

/// Parse a `YYYY-MM-DD` date.
pub fn parse_diary_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        input: input.to_string(),
    })
}

impl<C: HttpClient + 'static> App<C> {
    // ------------------------------------------------------------------
    // Diary
    // ------------------------------------------------------------------

    pub async fn fetch_diaries(&mut self) -> KbResult<&[DiaryEntry]> {
        self.diaries = self.api.list_diaries().await?;
        Ok(&self.diaries)
    }

    /// Move the diary view to another date.
    pub fn set_diary_date(&mut self, date: NaiveDate) {
        self.current_diary_date = date;
    }

    /// The entry for the current diary date, if one was saved.
    pub fn current_diary(&self) -> Option<&DiaryEntry> {
        self.diaries
            .iter()
            .find(|d| d.date == self.current_diary_date)
    }

    /// Save the entry for the current diary date.
    ///
    /// Blank content is not saved and yields `Ok(None)`. An existing entry
    /// for the date is overwritten.
    pub async fn save_diary(
        &mut self,
        content: &str,
        mood: Option<&str>,
    ) -> KbResult<Option<DiaryEntry>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        let request = SaveDiaryRequest {
            date: self.current_diary_date,
            content: content.to_string(),
            mood: mood.map(str::trim).filter(|m| !m.is_empty()).map(str::to_string),
        };
        let entry = self.api.save_diary(&request).await?;
        info!(date = %entry.date, "Saved diary entry");

        match self.diaries.iter_mut().find(|d| d.date == entry.date) {
            Some(existing) => *existing = entry.clone(),
            None => self.diaries.insert(0, entry.clone()),
        }
        Ok(Some(entry))
    }

    pub async fn delete_diary(&mut self, date: NaiveDate) -> KbResult<()> {
        self.api.delete_diary(date).await?;
        self.diaries.retain(|d| d.date != date);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    pub async fn fetch_documents(&mut self) -> KbResult<&[DocumentInfo]> {
        self.documents = self.api.list_documents().await?;
        Ok(&self.documents)
    }

    /// Upload a local file into the knowledge base, then re-list documents.
    ///
    /// The file name and size are validated before the file is read.
    pub async fn upload_document(&mut self, path: &Path) -> KbResult<()> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = tokio::fs::metadata(path)
            .await
            .context(ErrorContext::new("read document"))?
            .len();
        DocumentInfo::validate_upload(&filename, size)?;

        let data = tokio::fs::read(path)
            .await
            .context(ErrorContext::new("read document"))?;
        self.api
            .upload_document(&filename, Bytes::from(data))
            .await?;
        info!(filename = %filename, size, "Uploaded document");

        self.fetch_documents().await?;
        Ok(())
    }

    pub async fn delete_document(&mut self, filename: &str) -> KbResult<()> {
        self.api.delete_document(filename).await?;
        self.documents.retain(|d| d.filename != filename);
        Ok(())
    }
}
