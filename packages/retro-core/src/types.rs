use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum length (in characters) of note text, authors, owners and action items.
pub const MAX_TEXT_LEN: usize = 280;

/// Sprint label used for a freshly initialized board.
pub const DEFAULT_SPRINT_LABEL: &str = "1";

const ID_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A fixed, closed set of board columns.
///
/// A board is generic over exactly one schema; documents written with another
/// schema do not parse. `ALL` defines the display (and export) order.
pub trait Column:
    Copy + Eq + Ord + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const ALL: &'static [Self];

    /// Identifier used as the JSON key of the column.
    fn id(self) -> &'static str;

    fn title(self) -> &'static str;

    fn subtitle(self) -> &'static str;

    fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.id() == id)
    }
}

/// The four-column "Liked / Learned / Lacked / Longed For" schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetroColumn {
    Liked,
    Learned,
    Lacked,
    LongedFor,
}

impl Column for RetroColumn {
    const ALL: &'static [Self] = &[Self::Liked, Self::Learned, Self::Lacked, Self::LongedFor];

    fn id(self) -> &'static str {
        match self {
            Self::Liked => "liked",
            Self::Learned => "learned",
            Self::Lacked => "lacked",
            Self::LongedFor => "longedFor",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Liked => "Liked",
            Self::Learned => "Learned",
            Self::Lacked => "Lacked",
            Self::LongedFor => "Longed For",
        }
    }

    fn subtitle(self) -> &'static str {
        match self {
            Self::Liked => "What went well",
            Self::Learned => "New discoveries",
            Self::Lacked => "What was missing",
            Self::LongedFor => "What we wished we had",
        }
    }
}

/// The three-column "Went Well / Didn't Go Well / Kudos" schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassicColumn {
    WentWell,
    DidntGoWell,
    Kudos,
}

impl Column for ClassicColumn {
    const ALL: &'static [Self] = &[Self::WentWell, Self::DidntGoWell, Self::Kudos];

    fn id(self) -> &'static str {
        match self {
            Self::WentWell => "wentWell",
            Self::DidntGoWell => "didntGoWell",
            Self::Kudos => "kudos",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::WentWell => "Went Well",
            Self::DidntGoWell => "Didn't Go Well",
            Self::Kudos => "Kudos",
        }
    }

    fn subtitle(self) -> &'static str {
        match self {
            Self::WentWell => "What went well",
            Self::DidntGoWell => "What could be improved",
            Self::Kudos => "Shout-outs to teammates",
        }
    }
}

/// Sticky-note color. Anything unrecognized reads as yellow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteColor {
    #[default]
    Yellow,
    Blue,
    Green,
    Pink,
}

impl NoteColor {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "blue" => Self::Blue,
            "green" => Self::Green,
            "pink" => Self::Pink,
            _ => Self::Yellow,
        }
    }
}

impl<'de> Deserialize<'de> for NoteColor {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        Ok(value.as_str().map(Self::parse_or_default).unwrap_or_default())
    }
}

/// Free-form placement of a note on a canvas layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "C: Column")]
pub struct Note<C: Column> {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub color: NoteColor,
    /// Voter identifiers. Uniqueness is maintained by `toggle_vote`.
    #[serde(default)]
    pub votes: Vec<String>,
    pub column_id: C,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NotePosition>,
}

impl<C: Column> Note<C> {
    /// Build a note from raw user input: sanitized text/author, fresh id and timestamp.
    pub fn new(column: C, text: &str, author: &str, color: NoteColor) -> Self {
        Self {
            id: generate_id(),
            text: sanitize_input(text),
            author: sanitize_input(author),
            timestamp: format_timestamp(Utc::now()),
            color,
            votes: Vec::new(),
            column_id: column,
            position: None,
        }
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.votes.iter().any(|v| v == voter)
    }

    /// Add `voter` if absent, remove it otherwise. Returns true if the vote is now cast.
    pub fn toggle_vote(&mut self, voter: &str) -> bool {
        if self.has_voted(voter) {
            self.votes.retain(|v| v != voter);
            false
        } else {
            self.votes.push(voter.to_string());
            true
        }
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub(crate) fn clamp(&mut self) {
        self.text = clamp_text(&self.text);
        self.author = clamp_text(&self.author);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub date_added: String,
    #[serde(default)]
    pub completed: bool,
}

impl ActionItem {
    pub fn new(text: &str, owner: &str) -> Self {
        Self {
            id: generate_id(),
            text: sanitize_input(text),
            owner: sanitize_input(owner),
            date_added: format_timestamp(Utc::now()),
            completed: false,
        }
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
    }

    pub(crate) fn clamp(&mut self) {
        self.text = clamp_text(&self.text);
        self.owner = clamp_text(&self.owner);
    }
}

/// The board document shared by every participant of a retrospective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    from = "BoardRecord<C>",
    bound(serialize = "C: Column", deserialize = "C: Column")
)]
pub struct Board<C: Column> {
    pub sprint_label: String,
    pub sprint_date: String,
    /// Always holds an entry for every column of `C`.
    pub columns: BTreeMap<C, Vec<Note<C>>>,
    pub action_items: Vec<ActionItem>,
    /// Informational only.
    pub active_user_count: u32,
}

/// Wire shape accepted on read: tolerates missing collections and the
/// legacy `sprint` / `date` / `activeUsers` field names.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", bound = "C: Column")]
struct BoardRecord<C: Column> {
    #[serde(alias = "sprint", default)]
    sprint_label: String,
    #[serde(alias = "date", default)]
    sprint_date: String,
    #[serde(default)]
    columns: BTreeMap<C, Option<Vec<Note<C>>>>,
    #[serde(default)]
    action_items: Option<Vec<ActionItem>>,
    #[serde(alias = "activeUsers", default = "default_user_count")]
    active_user_count: u32,
}

fn default_user_count() -> u32 {
    1
}

impl<C: Column> From<BoardRecord<C>> for Board<C> {
    fn from(record: BoardRecord<C>) -> Self {
        let mut columns = empty_columns();
        for (column, notes) in record.columns {
            columns.insert(column, notes.unwrap_or_default());
        }
        Self {
            sprint_label: record.sprint_label,
            sprint_date: record.sprint_date,
            columns,
            action_items: record.action_items.unwrap_or_default(),
            active_user_count: record.active_user_count,
        }
    }
}

fn empty_columns<C: Column>() -> BTreeMap<C, Vec<Note<C>>> {
    C::ALL.iter().map(|&c| (c, Vec::new())).collect()
}

impl<C: Column> Board<C> {
    /// The default board: empty columns and action items, a single user.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            sprint_label: DEFAULT_SPRINT_LABEL.to_string(),
            sprint_date: format_date(date),
            columns: empty_columns(),
            action_items: Vec::new(),
            active_user_count: 1,
        }
    }

    pub fn for_today() -> Self {
        Self::empty(today())
    }

    pub fn notes(&self, column: C) -> &[Note<C>] {
        self.columns.get(&column).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn note_count(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    /// Scan every column for `note_id`.
    pub fn find_note(&self, note_id: &str) -> Option<(C, &Note<C>)> {
        self.columns.iter().find_map(|(&column, notes)| {
            notes.iter().find(|n| n.id == note_id).map(|n| (column, n))
        })
    }

    /// Replace the note with the same id in `column` in place, or append it.
    pub fn upsert_note(&mut self, column: C, note: Note<C>) {
        let notes = self.columns.entry(column).or_default();
        match notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note,
            None => notes.push(note),
        }
    }

    /// Remove the first note with `note_id` from whichever column holds it.
    pub fn remove_note(&mut self, note_id: &str) -> bool {
        for notes in self.columns.values_mut() {
            if let Some(index) = notes.iter().position(|n| n.id == note_id) {
                notes.remove(index);
                return true;
            }
        }
        false
    }

    pub fn find_action_item(&self, item_id: &str) -> Option<&ActionItem> {
        self.action_items.iter().find(|i| i.id == item_id)
    }

    pub fn upsert_action_item(&mut self, item: ActionItem) {
        match self.action_items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item,
            None => self.action_items.push(item),
        }
    }

    pub fn remove_action_item(&mut self, item_id: &str) -> bool {
        let before = self.action_items.len();
        self.action_items.retain(|i| i.id != item_id);
        self.action_items.len() != before
    }

    pub fn set_sprint_info(&mut self, label: &str, date: &str) {
        self.sprint_label = label.to_string();
        self.sprint_date = date.to_string();
    }

    /// Empty every column and the action items. Sprint info and user count stay.
    pub fn clear(&mut self) {
        self.columns = empty_columns();
        self.action_items.clear();
    }
}

/// Strip angle brackets, trim, and cut to `MAX_TEXT_LEN` characters.
pub fn sanitize_input(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    stripped.trim().chars().take(MAX_TEXT_LEN).collect()
}

/// Idempotent subset of `sanitize_input` applied on every persisted write.
pub fn clamp_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .take(MAX_TEXT_LEN)
        .collect()
}

/// Random 9-character lowercase base-36 identifier.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_timestamp(at: chrono::DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, text: &str) -> Note<RetroColumn> {
        Note {
            id: id.to_string(),
            text: text.to_string(),
            author: "Alice".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            color: NoteColor::Green,
            votes: Vec::new(),
            column_id: RetroColumn::Liked,
            position: None,
        }
    }

    fn board() -> Board<RetroColumn> {
        Board::empty(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    #[test]
    fn test_empty_board_has_every_column() {
        let b = board();
        assert_eq!(b.columns.len(), 4);
        assert!(b.columns.values().all(Vec::is_empty));
        assert_eq!(b.sprint_date, "2024-03-01");
        assert_eq!(b.active_user_count, 1);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut b = board();
        b.upsert_note(RetroColumn::Liked, note("a", "first"));
        b.upsert_note(RetroColumn::Liked, note("b", "second"));
        b.upsert_note(RetroColumn::Liked, note("c", "third"));

        b.upsert_note(RetroColumn::Liked, note("b", "edited"));

        let liked = b.notes(RetroColumn::Liked);
        assert_eq!(liked.len(), 3);
        assert_eq!(liked[1], note("b", "edited"));
        assert_eq!(liked.iter().filter(|n| n.id == "b").count(), 1);
    }

    #[test]
    fn test_remove_note_is_idempotent() {
        let mut b = board();
        b.upsert_note(RetroColumn::Liked, note("a", "x"));
        let mut other = note("b", "y");
        other.column_id = RetroColumn::Lacked;
        b.upsert_note(RetroColumn::Lacked, other);

        assert!(b.remove_note("b"));
        assert!(!b.remove_note("b"));
        assert_eq!(b.note_count(), 1);
        assert!(b.notes(RetroColumn::Lacked).is_empty());
    }

    #[test]
    fn test_find_note_scans_all_columns() {
        let mut b = board();
        let mut n = note("z", "hidden");
        n.column_id = RetroColumn::LongedFor;
        b.upsert_note(RetroColumn::LongedFor, n);

        let (column, found) = b.find_note("z").unwrap();
        assert_eq!(column, RetroColumn::LongedFor);
        assert_eq!(found.text, "hidden");
        assert!(b.find_note("missing").is_none());
    }

    #[test]
    fn test_toggle_vote_is_its_own_inverse() {
        let mut n = note("a", "x");
        n.votes = vec!["Bob".to_string()];
        let original = n.votes.clone();

        assert!(n.toggle_vote("Alice"));
        assert_eq!(n.vote_count(), 2);
        assert!(!n.toggle_vote("Alice"));
        assert_eq!(n.votes, original);
    }

    #[test]
    fn test_clear_keeps_sprint_info() {
        let mut b = board();
        b.set_sprint_info("42", "2024-04-01");
        b.upsert_note(RetroColumn::Learned, note("a", "x"));
        b.upsert_action_item(ActionItem::new("Fix CI", "Bob"));
        b.active_user_count = 3;

        b.clear();

        assert_eq!(b.note_count(), 0);
        assert_eq!(b.columns.len(), 4);
        assert!(b.action_items.is_empty());
        assert_eq!(b.sprint_label, "42");
        assert_eq!(b.sprint_date, "2024-04-01");
        assert_eq!(b.active_user_count, 3);
    }

    #[test]
    fn test_action_item_upsert_and_remove() {
        let mut b = board();
        let mut item = ActionItem::new("Fix CI", "Bob");
        b.upsert_action_item(item.clone());
        item.toggle_completed();
        b.upsert_action_item(item.clone());

        assert_eq!(b.action_items.len(), 1);
        assert!(b.action_items[0].completed);
        assert!(b.remove_action_item(&item.id));
        assert!(!b.remove_action_item(&item.id));
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("  <b>hi</b>  "), "bhi/b");
        let long = "x".repeat(400);
        assert_eq!(sanitize_input(&long).chars().count(), MAX_TEXT_LEN);
    }

    #[test]
    fn test_clamp_text_is_idempotent() {
        let raw = format!("<{}>", "é ".repeat(200));
        let once = clamp_text(&raw);
        assert_eq!(once.chars().count(), MAX_TEXT_LEN);
        assert!(!once.contains('<'));
        assert_eq!(clamp_text(&once), once);
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id();
        assert_eq!(id.len(), 9);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_id(), id);
    }

    #[test]
    fn test_note_new_sanitizes() {
        let n = Note::new(RetroColumn::Lacked, " <script>ok ", "<Al>", NoteColor::Pink);
        assert_eq!(n.text, "scriptok");
        assert_eq!(n.author, "Al");
        assert_eq!(n.column_id, RetroColumn::Lacked);
        assert!(n.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_json_shape() {
        let mut b = board();
        b.upsert_note(RetroColumn::LongedFor, {
            let mut n = note("n1", "Good demo");
            n.column_id = RetroColumn::LongedFor;
            n
        });
        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["sprintLabel"], "1");
        assert_eq!(value["activeUserCount"], 1);
        assert_eq!(value["columns"]["longedFor"][0]["columnId"], "longedFor");
        assert_eq!(value["columns"]["longedFor"][0]["color"], "green");
        assert!(value["columns"]["liked"].as_array().unwrap().is_empty());

        let back: Board<RetroColumn> = serde_json::from_value(value).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_reads_legacy_field_names_and_missing_collections() {
        let json = r#"{
            "sprint": "23",
            "date": "2024-02-02",
            "columns": {
                "liked": [{"id": "a", "text": "t", "author": "x",
                           "timestamp": "2024-02-02T10:00:00Z",
                           "color": "purple", "columnId": "liked"}]
            },
            "activeUsers": 5
        }"#;
        let b: Board<RetroColumn> = serde_json::from_str(json).unwrap();
        assert_eq!(b.sprint_label, "23");
        assert_eq!(b.sprint_date, "2024-02-02");
        assert_eq!(b.active_user_count, 5);
        assert_eq!(b.columns.len(), 4);
        let liked = b.notes(RetroColumn::Liked);
        assert_eq!(liked[0].color, NoteColor::Yellow);
        assert!(liked[0].votes.is_empty());
        assert!(b.action_items.is_empty());
    }

    #[test]
    fn test_incomplete_records_are_kept() {
        let json = r#"{
            "sprintLabel": "4",
            "sprintDate": "2024-04-04",
            "columns": {
                "lacked": [{"id": "a", "text": "no author", "color": 3, "columnId": "lacked"}]
            },
            "actionItems": [{"id": "x", "text": "follow up", "completed": true}]
        }"#;
        let b: Board<RetroColumn> = serde_json::from_str(json).unwrap();

        let lacked = b.notes(RetroColumn::Lacked);
        assert_eq!(lacked.len(), 1);
        assert_eq!(lacked[0].author, "");
        assert_eq!(lacked[0].timestamp, "");
        assert_eq!(lacked[0].color, NoteColor::Yellow);
        let item = b.find_action_item("x").unwrap();
        assert_eq!(item.owner, "");
        assert_eq!(item.date_added, "");
        assert!(item.completed);
    }

    #[test]
    fn test_note_position_survives_and_is_omitted_when_unset() {
        let json = r#"{"id": "p", "text": "placed", "author": "x",
                       "timestamp": "2024-01-01T00:00:00Z", "color": "pink",
                       "columnId": "liked", "position": {"x": 1.5, "y": 2.0}}"#;
        let placed: Note<RetroColumn> = serde_json::from_str(json).unwrap();
        assert_eq!(placed.position, Some(NotePosition { x: 1.5, y: 2.0 }));
        let value = serde_json::to_value(&placed).unwrap();
        assert_eq!(value["position"]["x"], 1.5);

        let plain = serde_json::to_value(note("n", "t")).unwrap();
        assert!(plain.get("position").is_none());
    }

    #[test]
    fn test_other_schema_does_not_parse() {
        let json = r#"{"sprintLabel": "1", "sprintDate": "2024-01-01",
                       "columns": {"wentWell": []}, "actionItems": []}"#;
        assert!(serde_json::from_str::<Board<RetroColumn>>(json).is_err());
        let classic: Board<ClassicColumn> = serde_json::from_str(json).unwrap();
        assert_eq!(classic.columns.len(), 3);
    }

    #[test]
    fn test_column_ids() {
        assert_eq!(RetroColumn::from_id("longedFor"), Some(RetroColumn::LongedFor));
        assert_eq!(ClassicColumn::from_id("didntGoWell"), Some(ClassicColumn::DidntGoWell));
        assert_eq!(RetroColumn::from_id("kudos"), None);
        for c in RetroColumn::ALL {
            assert_eq!(serde_json::to_value(c).unwrap(), c.id());
        }
    }
}
