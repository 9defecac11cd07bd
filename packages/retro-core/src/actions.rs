/// Board operations as the board UI issues them.
///
/// Each helper reads the current board where it needs to, builds the changed
/// note or action item, and hands it to the store. Ids that match nothing are
/// ignored.
use crate::storage::BoardStore;
use crate::types::{format_date, sanitize_input, today, ActionItem, Column, Note, NoteColor};

/// Create a note from raw input. Returns `None` when the text is empty after
/// sanitizing.
pub async fn add_note<C: Column, S: BoardStore<C> + ?Sized>(
    store: &S,
    column: C,
    text: &str,
    author: &str,
    color: NoteColor,
) -> Option<Note<C>> {
    let note = Note::new(column, text, author, color);
    if note.text.is_empty() {
        return None;
    }
    store.upsert_note(column, note.clone()).await;
    Some(note)
}

pub async fn edit_note_text<C: Column, S: BoardStore<C> + ?Sized>(
    store: &S,
    note_id: &str,
    text: &str,
) {
    let board = store.snapshot().await;
    if let Some((column, note)) = board.find_note(note_id) {
        let mut note = note.clone();
        note.text = sanitize_input(text);
        store.upsert_note(column, note).await;
    }
}

/// Cast or withdraw `voter`'s vote. Anonymous voters are ignored.
pub async fn toggle_vote<C: Column, S: BoardStore<C> + ?Sized>(
    store: &S,
    note_id: &str,
    voter: &str,
) {
    if voter.is_empty() {
        return;
    }
    let board = store.snapshot().await;
    if let Some((column, note)) = board.find_note(note_id) {
        let mut note = note.clone();
        note.toggle_vote(voter);
        store.upsert_note(column, note).await;
    }
}

pub async fn add_action_item<C: Column, S: BoardStore<C> + ?Sized>(
    store: &S,
    text: &str,
    owner: &str,
) -> Option<ActionItem> {
    let item = ActionItem::new(text, owner);
    if item.text.is_empty() {
        return None;
    }
    store.upsert_action_item(item.clone()).await;
    Some(item)
}

pub async fn toggle_action_item<C: Column, S: BoardStore<C> + ?Sized>(store: &S, item_id: &str) {
    let board = store.snapshot().await;
    if let Some(item) = board.find_action_item(item_id) {
        let mut item = item.clone();
        item.toggle_completed();
        store.upsert_action_item(item).await;
    }
}

/// Set the sprint label and stamp today's date.
pub async fn update_sprint<C: Column, S: BoardStore<C> + ?Sized>(store: &S, label: &str) {
    store
        .set_sprint_info(&sanitize_input(label), &format_date(today()))
        .await;
}
