//! Plain-text rendering of the list, dialogs and notifications

use std::fmt::Write;

use super::{Modal, ViewSnapshot};
use crate::services::{
    mutations::MutationStatus,
    notifications::{Notification, NotificationLevel},
};

const TITLE_WIDTH: usize = 36;
const AUTHOR_WIDTH: usize = 24;

pub fn render_list(snapshot: &ViewSnapshot) -> String {
    let mut out = String::new();

    if snapshot.loading {
        out.push_str("Loading books...\n");
        return out;
    }

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! Could not refresh the list: {}", error);
    }

    if snapshot.library_size == 0 {
        out.push_str("No books found\nAdd a new book to get started\n");
        return out;
    }

    if !snapshot.query.is_empty() {
        let _ = writeln!(out, "Search: {}", snapshot.query);
    }
    let _ = writeln!(out, "Total Books: {}", snapshot.total);
    let _ = writeln!(
        out,
        "{:>5}  {:<tw$}  {:<aw$}  {}",
        "ID",
        "Title",
        "Author",
        "Created On",
        tw = TITLE_WIDTH,
        aw = AUTHOR_WIDTH
    );

    for book in &snapshot.visible {
        let id = book.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        let created = book
            .created_on
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>5}  {:<tw$}  {:<aw$}  {}",
            id,
            clip(&book.title, TITLE_WIDTH),
            clip(&book.author, AUTHOR_WIDTH),
            created,
            tw = TITLE_WIDTH,
            aw = AUTHOR_WIDTH
        );
    }

    let _ = write!(
        out,
        "Page {} of {} ({} per page)",
        if snapshot.page_count == 0 { 0 } else { snapshot.page + 1 },
        snapshot.page_count,
        snapshot.page_size
    );
    if let MutationStatus::Pending(kind) = snapshot.mutation {
        let _ = write!(out, "  [{:?} in progress]", kind);
    }
    out.push('\n');
    out
}

pub fn render_modal(modal: &Modal) -> Option<String> {
    match modal {
        Modal::Closed => None,
        Modal::Form(form) => {
            let mut out = String::new();
            let _ = writeln!(out, "== {} ==", form.heading());
            let _ = writeln!(out, "  Title:  {}", form.title);
            if let Some(error) = form.errors.get("title") {
                let _ = writeln!(out, "          ^ {}", error);
            }
            let _ = writeln!(out, "  Author: {}", form.author);
            if let Some(error) = form.errors.get("author") {
                let _ = writeln!(out, "          ^ {}", error);
            }
            let action = if form.editing.is_some() { "Update" } else { "Add" };
            let _ = writeln!(out, "  (title <text> / author <text> / save to {} / cancel)", action);
            Some(out)
        }
        Modal::ConfirmDelete(confirmation) => Some(format!(
            "== Delete Book ==\n  {}\n  (yes / no)\n",
            confirmation.prompt()
        )),
    }
}

pub fn render_notification(notification: &Notification) -> String {
    let marker = match notification.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
    };
    format!("[{}] {}", marker, notification.message)
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(3)).collect();
    clipped.push_str("...");
    clipped
}
