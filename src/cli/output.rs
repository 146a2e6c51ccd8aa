//! Simple line-based CLI output.

use crate::models::{
    Category, Citation, ConversationTurn, DiaryEntry, DocumentInfo, MessageRole, Session,
};

/// Line width for separators.
const LINE_WIDTH: usize = 60;

/// Longest diary preview shown in a listing, in characters.
const PREVIEW_CHARS: usize = 40;

/// Print a section header.
///
/// ```text
/// SESSIONS
/// ════════════════════════════════════════════════════════════
/// ```
pub fn print_header(title: &str) {
    println!("{}", title);
    println!("{}", "═".repeat(LINE_WIDTH));
}

/// Print a thin separator.
pub fn print_rule() {
    println!("{}", "─".repeat(LINE_WIDTH));
}

/// ```text
/// * 3f2a…  Reading notes            2025-05-01 09:12
/// ```
pub fn session_line(session: &Session, current: bool) -> String {
    let marker = if current {
        '>'
    } else if session.is_pinned {
        '*'
    } else {
        ' '
    };
    let title = if session.title.is_empty() {
        "(untitled)"
    } else {
        session.title.as_str()
    };
    format!(
        "{} {}  {:<28} {}",
        marker,
        session.id,
        title,
        session.updated_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn category_line(category: &Category) -> String {
    format!("{:>4}  {}  {}", category.id, category.color_code, category.name)
}

/// One turn of a conversation, prefixed by role.
pub fn turn_block(turn: &ConversationTurn) -> String {
    let role = match turn.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    let mut out = format!("[{}] {}", role, turn.content);
    if let Some(sources) = turn.sources.as_deref() {
        for citation in sources {
            out.push('\n');
            out.push_str(&citation_line(citation));
        }
    }
    out
}

/// ```text
///   ↳ 82%  reading-list.pdf
/// ```
pub fn citation_line(citation: &Citation) -> String {
    format!(
        "  ↳ {:>3}%  {}",
        citation.relevance_percent(),
        citation.filename
    )
}

pub fn diary_line(entry: &DiaryEntry) -> String {
    let mut preview: String = entry
        .content
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(PREVIEW_CHARS)
        .collect();
    if entry.content.chars().count() > preview.chars().count() {
        preview.push('…');
    }
    match entry.mood.as_deref() {
        Some(mood) => format!("{}  [{}] {}", entry.date, mood, preview),
        None => format!("{}  {}", entry.date, preview),
    }
}

pub fn document_line(document: &DocumentInfo) -> String {
    format!("{:>5} chunks  {}", document.chunk_count, document.filename)
}
