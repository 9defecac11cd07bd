/// Markdown report export.
///
/// The report lists every column of the board's schema in order, each note
/// with its author and vote count, followed by the action items when there
/// are any.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::storage::local::atomic_write;
use crate::types::{format_date, today, Board, Column};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Printed in the report heading when set.
    pub team_name: Option<String>,
    /// Date printed on the `Exported` line.
    pub exported_on: NaiveDate,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            team_name: None,
            exported_on: today(),
        }
    }
}

impl ExportOptions {
    pub fn for_team(team_name: Option<&str>) -> Self {
        Self {
            team_name: team_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            ..Self::default()
        }
    }
}

pub fn export_markdown<C: Column>(board: &Board<C>, options: &ExportOptions) -> String {
    let mut md = String::new();

    match &options.team_name {
        Some(team) => {
            let _ = writeln!(md, "# {} - Sprint Retrospective\n", team);
        }
        None => md.push_str("# Sprint Retrospective\n\n"),
    }
    let _ = writeln!(md, "**Sprint:** {}", board.sprint_label);
    let _ = writeln!(md, "**Date:** {}", board.sprint_date);
    let _ = writeln!(md, "**Exported:** {}\n", format_date(options.exported_on));

    for (i, column) in C::ALL.iter().enumerate() {
        if i > 0 {
            md.push('\n');
        }
        let _ = writeln!(md, "## {} ({})\n", column.title(), column.subtitle());
        for note in board.notes(*column) {
            let _ = writeln!(
                md,
                "- {} ({}) [{} votes]",
                note.text,
                note.author,
                note.vote_count()
            );
        }
    }

    if !board.action_items.is_empty() {
        md.push_str("\n## Action Items\n\n");
        for item in &board.action_items {
            let status = if item.completed { "✅" } else { "⬜" };
            let _ = writeln!(md, "- {} {} (Owner: {})", status, item.text, item.owner);
        }
    }

    md
}

/// `Retro_Sprint{label}_{date}.md`, with path-unsafe characters replaced.
pub fn report_file_name<C: Column>(board: &Board<C>) -> String {
    let name = format!("Retro_Sprint{}_{}.md", board.sprint_label, board.sprint_date);
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Export the board and write the report into `dir`. Returns the report path.
pub fn write_report<C: Column>(
    board: &Board<C>,
    dir: &Path,
    options: &ExportOptions,
) -> Result<PathBuf, std::io::Error> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(board));
    atomic_write(&path, &export_markdown(board, options))?;
    log::info!("[retro.export] Wrote report {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionItem, ClassicColumn, Note, NoteColor, RetroColumn};

    fn note<C: Column>(column: C, id: &str, text: &str, author: &str, votes: &[&str]) -> Note<C> {
        Note {
            id: id.to_string(),
            text: text.to_string(),
            author: author.to_string(),
            timestamp: "2024-01-15T10:00:00Z".to_string(),
            color: NoteColor::Yellow,
            votes: votes.iter().map(|v| v.to_string()).collect(),
            column_id: column,
            position: None,
        }
    }

    fn options() -> ExportOptions {
        ExportOptions {
            team_name: Some("Platform".to_string()),
            exported_on: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        }
    }

    fn sample_board() -> Board<RetroColumn> {
        let mut board = Board::empty(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        board.set_sprint_info("42", "2024-01-15");
        board.upsert_note(
            RetroColumn::Liked,
            note(RetroColumn::Liked, "n1", "Good demo", "Ann", &["Bob", "Cy"]),
        );
        board.upsert_note(
            RetroColumn::LongedFor,
            note(RetroColumn::LongedFor, "n2", "More tests", "Bob", &[]),
        );
        board.upsert_action_item(ActionItem {
            id: "a1".to_string(),
            text: "Fix CI".to_string(),
            owner: "Bob".to_string(),
            date_added: "2024-01-15T10:00:00Z".to_string(),
            completed: true,
        });
        board.upsert_action_item(ActionItem {
            id: "a2".to_string(),
            text: "Write docs".to_string(),
            owner: "Ann".to_string(),
            date_added: "2024-01-15T10:00:00Z".to_string(),
            completed: false,
        });
        board
    }

    #[test]
    fn test_full_report() {
        let md = export_markdown(&sample_board(), &options());
        let expected = "\
# Platform - Sprint Retrospective

**Sprint:** 42
**Date:** 2024-01-15
**Exported:** 2024-01-16

## Liked (What went well)

- Good demo (Ann) [2 votes]

## Learned (New discoveries)


## Lacked (What was missing)


## Longed For (What we wished we had)

- More tests (Bob) [0 votes]

## Action Items

- ✅ Fix CI (Owner: Bob)
- ⬜ Write docs (Owner: Ann)
";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_no_team_and_no_action_items() {
        let board: Board<ClassicColumn> =
            Board::empty(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let opts = ExportOptions {
            team_name: None,
            ..options()
        };
        let md = export_markdown(&board, &opts);

        assert!(md.starts_with("# Sprint Retrospective\n\n**Sprint:** 1\n"));
        assert!(md.contains("## Went Well (What went well)"));
        assert!(md.contains("## Didn't Go Well (What could be improved)"));
        assert!(md.contains("## Kudos (Shout-outs to teammates)"));
        assert!(!md.contains("Action Items"));
    }

    #[test]
    fn test_each_note_appears_once_under_its_heading() {
        let board = sample_board();
        let md = export_markdown(&board, &options());

        for column in RetroColumn::ALL {
            let heading = format!("## {} ({})", column.title(), column.subtitle());
            let start = md.find(&heading).unwrap();
            let section = &md[start..];
            let end = section[heading.len()..]
                .find("\n## ")
                .map(|i| i + heading.len())
                .unwrap_or(section.len());
            let section = &section[..end];

            for n in board.notes(*column) {
                let line = format!("- {} ({}) [{} votes]", n.text, n.author, n.vote_count());
                assert_eq!(md.matches(&line).count(), 1);
                assert!(section.contains(&line));
            }
        }
    }

    #[test]
    fn test_for_team_ignores_blank_names() {
        assert!(ExportOptions::for_team(Some("  ")).team_name.is_none());
        assert_eq!(
            ExportOptions::for_team(Some(" Core ")).team_name.as_deref(),
            Some("Core")
        );
        assert!(ExportOptions::for_team(None).team_name.is_none());
    }

    #[test]
    fn test_report_file_name() {
        let mut board = sample_board();
        assert_eq!(report_file_name(&board), "Retro_Sprint42_2024-01-15.md");

        board.set_sprint_info("12/b", "2024-01-15");
        assert_eq!(report_file_name(&board), "Retro_Sprint12_b_2024-01-15.md");
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let board = sample_board();

        let path = write_report(&board, &out, &options()).unwrap();

        assert_eq!(path, out.join("Retro_Sprint42_2024-01-15.md"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, export_markdown(&board, &options()));
    }
}
