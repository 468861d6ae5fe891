//! Ocean Notes CLI - short notes you can pin and search.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use flexi_logger::{Logger, LoggerHandle};
use log::debug;
use ocean_core::{CommitOutcome, Draft, Note, NoteStore, StorageProvider, NOTES_KEY};
use ocean_sqlite::SqliteProvider;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const STORE_DIR: &str = ".ocean-notes";
const SQLITE_FILE: &str = "notes.sqlite";
const PREVIEW_LEN: usize = 80;

type Store = NoteStore<Box<dyn StorageProvider>>;

#[derive(Parser)]
#[command(name = "ocean-notes", about = "Short notes you can pin and search", version)]
struct Cli {
    /// Storage directory (defaults to the nearest .ocean-notes directory)
    #[arg(long, global = true, env = "OCEAN_NOTES_DIR")]
    dir: Option<PathBuf>,
    /// Storage backend
    #[arg(
        long,
        global = true,
        value_enum,
        env = "OCEAN_NOTES_BACKEND",
        default_value = "files"
    )]
    backend: Backend,
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "OCEAN_NOTES_LOG", default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// One JSON document in the storage directory
    Files,
    /// SQLite database in the storage directory
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new notes directory here
    Init {
        /// Delete existing notes and reinitialize
        #[arg(long)]
        reinitialize: bool,
    },
    /// Add a new note
    Add {
        /// Note title
        #[arg(long, default_value = "")]
        title: String,
        /// Note content (reads from stdin if not provided and stdin is not a tty)
        #[arg(long)]
        content: Option<String>,
    },
    /// Edit a note's title or content
    Edit {
        /// Note ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New content (reads from stdin if neither --title nor --content is given)
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete one or more notes
    Rm {
        /// Note IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Pin or unpin a note
    Pin {
        /// Note ID
        id: String,
    },
    /// List notes, pinned first
    Ls {
        /// Number of notes to show (0 for all)
        #[arg(short = 'n', long, default_value = "100")]
        head: usize,
    },
    /// Find notes whose title or content contains a phrase (case-insensitive)
    Search {
        /// Text to look for
        query: String,
    },
    /// Show a note in full
    Show {
        /// Note ID
        id: String,
    },
}

/// Start stderr logging. A failure here is reported but never fatal.
fn init_logging(level: &str) -> Option<LoggerHandle> {
    match Logger::try_with_str(level).and_then(|logger| logger.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("warning: logging disabled: {}", e);
            None
        }
    }
}

/// Find the .ocean-notes directory by searching up from current directory
fn find_store_dir() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let store_path = current.join(STORE_DIR);
        if store_path.is_dir() {
            return Some(store_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Get the storage directory, or error if not initialized
fn get_store_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir);
    }
    match find_store_dir() {
        Some(dir) => Ok(dir),
        None => bail!(
            "No {} directory found. Run 'ocean-notes init' to create one.",
            STORE_DIR
        ),
    }
}

fn has_notes(dir: &Path) -> bool {
    dir.join(NOTES_KEY).exists() || dir.join(SQLITE_FILE).exists()
}

fn open_provider(dir: &Path, backend: Backend) -> Result<Box<dyn StorageProvider>> {
    let provider: Box<dyn StorageProvider> = match backend {
        Backend::Files => Box::new(
            ocean_files::open_provider(dir)
                .with_context(|| format!("Failed to open notes in {}", dir.display()))?,
        ),
        Backend::Sqlite => Box::new(
            SqliteProvider::open(dir.join(SQLITE_FILE))
                .with_context(|| format!("Failed to open database in {}", dir.display()))?,
        ),
    };
    Ok(provider)
}

fn open_store(dir: &Path, backend: Backend) -> Result<Store> {
    debug!("opening {:?} store in {}", backend, dir.display());
    Ok(NoteStore::load(open_provider(dir, backend)?))
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}

fn is_stdin_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_line(note: &Note) -> String {
    let summary = note.to_summary(PREVIEW_LEN);
    let pin = if summary.pinned { " [pinned]" } else { "" };
    format!(
        "{}: {}{} ({}) -- {}",
        summary.id,
        summary.title,
        pin,
        format_timestamp(summary.updated_at),
        summary.content_preview
    )
}

fn not_found(err: &mut dyn Write, id: &str) -> Result<i32> {
    writeln!(err, "Note {} not found", id)?;
    Ok(1)
}

/// Piped input for `add` and `edit`. `None` when stdin is a terminal.
fn piped_stdin() -> Result<Option<String>> {
    if is_stdin_tty() {
        Ok(None)
    } else {
        read_stdin().map(Some)
    }
}

/// Run one command, writing results to `out` and per-note failures to `err`.
/// Returns the process exit status.
fn run(
    cli: Cli,
    stdin: impl FnOnce() -> Result<Option<String>>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<i32> {
    if let Commands::Init { reinitialize } = cli.command {
        let dir = cli.dir.unwrap_or_else(|| PathBuf::from(STORE_DIR));

        if dir.exists() {
            if reinitialize {
                std::fs::remove_dir_all(&dir)
                    .with_context(|| format!("Failed to remove {}", dir.display()))?;
            } else if has_notes(&dir) {
                bail!("Notes are already initialized in {}. Use --reinitialize to delete and recreate.", dir.display());
            }
        }

        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        open_provider(&dir, cli.backend)?;

        if reinitialize {
            writeln!(out, "Reinitialized notes in {}", dir.display())?;
        } else {
            writeln!(out, "Initialized notes in {}", dir.display())?;
        }
        return Ok(0);
    }

    // All other commands need the store
    let dir = get_store_dir(cli.dir)?;
    let mut store = open_store(&dir, cli.backend)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Add { title, content } => {
            let content = match content {
                Some(c) => c,
                None => stdin()?.unwrap_or_default(),
            };
            match Draft::new().title(title).content(content).commit(&mut store) {
                CommitOutcome::Created(note) => writeln!(out, "Added note {}", note.id)?,
                CommitOutcome::Abandoned => writeln!(out, "Nothing to save")?,
                CommitOutcome::Updated { id, .. } => writeln!(out, "Edited note {}", id)?,
            }
        }

        Commands::Edit { id, title, content } => {
            // Piped content only stands in when no field was given on the command line.
            let content = if title.is_none() && content.is_none() {
                stdin()?.filter(|c| !c.trim().is_empty())
            } else {
                content
            };

            if title.is_none() && content.is_none() {
                writeln!(err, "Nothing to update")?;
                return Ok(1);
            }

            let Some(note) = store.get(&id) else {
                return not_found(err, &id);
            };
            let mut draft = Draft::for_note(note);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(content) = content {
                draft.content = content;
            }

            match draft.commit(&mut store) {
                CommitOutcome::Updated { id, found: true } => writeln!(out, "Edited note {}", id)?,
                CommitOutcome::Updated { id, found: false } => return not_found(err, &id),
                CommitOutcome::Abandoned => writeln!(out, "Nothing to save")?,
                CommitOutcome::Created(note) => writeln!(out, "Added note {}", note.id)?,
            }
        }

        Commands::Rm { ids } => {
            let mut missing = Vec::new();
            for id in &ids {
                if store.delete(id) {
                    writeln!(out, "Deleted note {}", id)?;
                } else {
                    missing.push(id);
                }
            }

            if !missing.is_empty() {
                for id in &missing {
                    writeln!(err, "Note {} not found", id)?;
                }
                return Ok(1);
            }
        }

        Commands::Pin { id } => {
            if !store.toggle_pin(&id) {
                return not_found(err, &id);
            }
            let pinned = store.get(&id).map(|n| n.pinned).unwrap_or(false);
            if pinned {
                writeln!(out, "Pinned note {}", id)?;
            } else {
                writeln!(out, "Unpinned note {}", id)?;
            }
        }

        Commands::Ls { head } => {
            let notes = store.list();
            let shown = if head == 0 { notes.len() } else { head.min(notes.len()) };

            if notes.is_empty() {
                writeln!(out, "No notes yet. Add one with 'ocean-notes add'.")?;
            }
            for note in &notes[..shown] {
                writeln!(out, "{}", format_line(note))?;
            }
            if shown < notes.len() {
                writeln!(out, "[Showing the latest {}/{} notes]", shown, notes.len())?;
            }
        }

        Commands::Search { query } => {
            for note in store.search(&query) {
                writeln!(out, "{}", format_line(note))?;
            }
        }

        Commands::Show { id } => {
            let Some(note) = store.get(&id) else {
                return not_found(err, &id);
            };
            writeln!(out, "# {}\n", note.display_title())?;
            writeln!(out, "{}", note.display_content())?;
            writeln!(out, "\n---\n")?;
            writeln!(out, "Last modified: {}", format_timestamp(note.updated_at))?;
            if note.pinned {
                writeln!(out, "Pinned")?;
            }
        }
    }

    Ok(0)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = init_logging(&cli.log_level);

    let status = run(
        cli,
        piped_stdin,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Output {
        status: i32,
        out: String,
        err: String,
    }

    fn run_with(dir: &Path, args: &[&str], stdin: Option<&str>) -> Result<Output> {
        let dir = dir.to_string_lossy().into_owned();
        let mut argv = vec!["ocean-notes", "--dir", dir.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;

        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = run(cli, || Ok(stdin.map(str::to_string)), &mut out, &mut err)?;
        Ok(Output {
            status,
            out: String::from_utf8(out)?,
            err: String::from_utf8(err)?,
        })
    }

    fn run_ok(dir: &Path, args: &[&str]) -> String {
        let output = run_with(dir, args, None).unwrap();
        assert_eq!(output.status, 0, "{:?} failed: {}", args, output.err);
        output.out
    }

    fn added_id(out: &str) -> String {
        out.trim()
            .strip_prefix("Added note ")
            .unwrap_or_else(|| panic!("unexpected output {:?}", out))
            .to_string()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_format_line_marks_pinned_and_untitled() {
        let note = Note {
            id: "abc".to_string(),
            title: String::new(),
            content: "line one\nline two".to_string(),
            updated_at: 0,
            pinned: true,
        };
        assert_eq!(
            format_line(&note),
            "abc: Untitled [pinned] (1970-01-01 00:00:00) -- line one line two"
        );
    }

    #[test]
    fn test_both_backends_reload_notes() {
        for backend in [Backend::Files, Backend::Sqlite] {
            let temp = TempDir::new().unwrap();
            assert!(!has_notes(temp.path()));

            let id = {
                let mut store = open_store(temp.path(), backend).unwrap();
                match Draft::new().title(" Persist ").commit(&mut store) {
                    CommitOutcome::Created(note) => note.id,
                    other => panic!("unexpected outcome {:?}", other),
                }
            };

            assert!(has_notes(temp.path()));
            let store = open_store(temp.path(), backend).unwrap();
            assert_eq!(store.len(), 1, "backend {:?}", backend);
            assert_eq!(store.get(&id).unwrap().title, "Persist");
        }
    }

    #[test]
    fn test_backends_do_not_share_data() {
        let temp = TempDir::new().unwrap();
        let mut files = open_store(temp.path(), Backend::Files).unwrap();
        files.create("Only in files", "");

        let sqlite = open_store(temp.path(), Backend::Sqlite).unwrap();
        assert!(sqlite.is_empty());
    }

    #[test]
    fn test_cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ocean-notes",
            "search",
            "oce",
            "--backend",
            "sqlite",
            "--dir",
            "/tmp/notes",
        ])
        .unwrap();
        assert_eq!(cli.backend, Backend::Sqlite);
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/notes")));
        assert!(matches!(cli.command, Commands::Search { ref query } if query == "oce"));
    }

    #[test]
    fn test_init_creates_missing_directory_for_each_backend() {
        for backend in ["files", "sqlite"] {
            let temp = TempDir::new().unwrap();
            let dir = temp.path().join("nested").join("notes");

            let out = run_ok(&dir, &["--backend", backend, "init"]);
            assert!(out.starts_with("Initialized notes in"), "{}", out);
            assert!(dir.is_dir());

            let id = added_id(&run_ok(&dir, &["--backend", backend, "add", "--title", "Kept"]));
            assert!(run_ok(&dir, &["--backend", backend, "ls"]).contains(&id));
        }
    }

    #[test]
    fn test_init_refuses_existing_notes_until_reinitialized() {
        for backend in ["files", "sqlite"] {
            let temp = TempDir::new().unwrap();
            let dir = temp.path().join("notes");
            run_ok(&dir, &["--backend", backend, "init"]);
            run_ok(&dir, &["--backend", backend, "add", "--title", "Old"]);

            let refused = run_with(&dir, &["--backend", backend, "init"], None);
            assert!(refused.is_err(), "backend {}", backend);

            let out = run_ok(&dir, &["--backend", backend, "init", "--reinitialize"]);
            assert!(out.starts_with("Reinitialized notes in"), "{}", out);
            assert!(dir.is_dir());
            assert!(run_ok(&dir, &["--backend", backend, "ls"]).starts_with("No notes yet"));
        }
    }

    #[test]
    fn test_blank_add_saves_nothing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();

        let output = run_with(dir, &["add", "--title", "  "], Some(" \n")).unwrap();
        assert_eq!(output.status, 0);
        assert_eq!(output.out, "Nothing to save\n");
        assert!(!has_notes(dir));
    }

    #[test]
    fn test_add_reads_piped_content() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();

        let output = run_with(dir, &["add", "--title", "Tide"], Some("high at noon\n")).unwrap();
        let id = added_id(&output.out);
        let shown = run_ok(dir, &["show", &id]);
        assert!(shown.starts_with("# Tide\n"), "{}", shown);
        assert!(shown.contains("high at noon"));
    }

    #[test]
    fn test_edit_title_keeps_content_despite_empty_stdin() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let id = added_id(&run_ok(dir, &["add", "--title", "Old", "--content", "Body"]));

        let output = run_with(dir, &["edit", &id, "--title", "New"], Some("")).unwrap();
        assert_eq!(output.status, 0);
        assert_eq!(output.out, format!("Edited note {}\n", id));

        let shown = run_ok(dir, &["show", &id]);
        assert!(shown.starts_with("# New\n"), "{}", shown);
        assert!(shown.contains("Body"));
    }

    #[test]
    fn test_edit_content_only_keeps_title() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let id = added_id(&run_ok(dir, &["add", "--title", "Title", "--content", "Old"]));

        run_ok(dir, &["edit", &id, "--content", "Fresh"]);
        let shown = run_ok(dir, &["show", &id]);
        assert!(shown.starts_with("# Title\n"), "{}", shown);
        assert!(shown.contains("Fresh"));
        assert!(!shown.contains("Old"));
    }

    #[test]
    fn test_edit_without_fields_uses_piped_content() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let id = added_id(&run_ok(dir, &["add", "--title", "T", "--content", "Old"]));

        let output = run_with(dir, &["edit", &id], Some("Piped")).unwrap();
        assert_eq!(output.status, 0);
        assert!(run_ok(dir, &["show", &id]).contains("Piped"));

        let output = run_with(dir, &["edit", &id], Some("  \n")).unwrap();
        assert_eq!(output.status, 1);
        assert_eq!(output.err, "Nothing to update\n");
        assert!(run_ok(dir, &["show", &id]).contains("Piped"));
    }

    #[test]
    fn test_edit_to_blank_abandons_without_writing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let id = added_id(&run_ok(dir, &["add", "--title", "Keep", "--content", "Me"]));

        let out = run_ok(dir, &["edit", &id, "--title", " ", "--content", ""]);
        assert_eq!(out, "Nothing to save\n");
        assert!(run_ok(dir, &["show", &id]).starts_with("# Keep\n"));
    }

    #[test]
    fn test_unknown_ids_report_on_stderr_and_fail() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let id = added_id(&run_ok(dir, &["add", "--title", "Real"]));

        for args in [
            vec!["pin", "missing"],
            vec!["show", "missing"],
            vec!["edit", "missing", "--title", "x"],
        ] {
            let output = run_with(dir, &args, None).unwrap();
            assert_eq!(output.status, 1, "{:?}", args);
            assert_eq!(output.out, "");
            assert_eq!(output.err, "Note missing not found\n");
        }

        let output = run_with(dir, &["rm", "missing", &id], None).unwrap();
        assert_eq!(output.status, 1);
        assert_eq!(output.out, format!("Deleted note {}\n", id));
        assert_eq!(output.err, "Note missing not found\n");
        assert!(run_ok(dir, &["ls"]).starts_with("No notes yet"));
    }

    #[test]
    fn test_pin_lists_first_and_search_filters() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        let first = added_id(&run_ok(dir, &["add", "--title", "Ocean", "--content", "waves"]));
        let second = added_id(&run_ok(dir, &["add", "--title", "Groceries"]));

        assert_eq!(run_ok(dir, &["pin", &first]), format!("Pinned note {}\n", first));
        let listed = run_ok(dir, &["ls"]);
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("{}: Ocean [pinned]", first)));
        assert!(lines[1].starts_with(&format!("{}: Groceries", second)));

        let head = run_ok(dir, &["ls", "-n", "1"]);
        assert!(head.ends_with("[Showing the latest 1/2 notes]\n"), "{}", head);

        let found = run_ok(dir, &["search", "WAVE"]);
        assert_eq!(found.lines().count(), 1);
        assert!(found.starts_with(&first));

        assert_eq!(run_ok(dir, &["pin", &first]), format!("Unpinned note {}\n", first));
    }
}
