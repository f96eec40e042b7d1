//! CLI module for the pocketnotes application
//!
//! This module turns parsed commands into calls on [`NoteListState`] and prints
//! the resulting notes.
use std::{
    fs::{read_to_string, OpenOptions},
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use log::{debug, info};
use shell_words::split;
use tempfile::Builder;

use crate::{
    content_preview, validate_title, write_json_atomically, Cli, Commands, Config,
    DatabaseLocation, Note, NoteError, NoteGateway, NoteListState, Result,
};

/// Loads the configuration, opens the gateway and runs the parsed command.
///
/// `config --init` tolerates a `--config` path that does not exist yet, since
/// that is the file it is about to write.
pub async fn run_cli(cli: Cli) -> Result<()> {
    let Cli {
        config: config_path,
        database,
        verbose,
        command,
    } = cli;

    let mut config = match &command {
        Commands::Config { init: true, .. } => Config::load_or_default(config_path.as_deref())?,
        _ => Config::load(config_path.as_deref())?,
    };
    if let Some(database) = database {
        config.database_path = database;
    }

    // The gateway lives for the whole process and is shared with the state holder.
    let gateway = Arc::new(NoteGateway::new(DatabaseLocation::File(
        config.database_path.clone(),
    )));
    info!("Using note database at {}", gateway.location());

    let mut app = App::new(gateway, config, config_path, verbose);
    app.run(command).await
}

/// CLI Application handler - processes CLI commands through the note list state
pub struct App {
    /// Loaded notes and the active filter
    state: NoteListState,

    /// Application configuration
    config: Config,

    /// Where `config --init` writes to
    config_path: Option<PathBuf>,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application over the given gateway
    pub fn new(
        gateway: Arc<NoteGateway>,
        config: Config,
        config_path: Option<PathBuf>,
        verbose: bool,
    ) -> Self {
        Self {
            state: NoteListState::new(gateway),
            config,
            config_path,
            verbose,
        }
    }

    pub fn state(&self) -> &NoteListState {
        &self.state
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                edit,
                file,
            } => self.create_note(title, content, file, edit).await?,

            Commands::View { id, json } => self.view_note(id, json).await?,

            Commands::List {
                filter,
                limit,
                json,
                brief,
            } => self.list_notes(filter, limit, json, brief).await?,

            Commands::Search { query, limit, json } => {
                self.handle_search(query, limit, json).await?
            }

            Commands::Edit {
                id,
                title,
                content,
                edit,
                file,
            } => self.handle_edit(id, title, content, file, edit).await?,

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::Export { output, filter } => self.handle_export(output, filter).await?,

            Commands::Config { show, init } => self.handle_config(show, init)?,
        }

        Ok(())
    }

    async fn create_note(
        &mut self,
        title: String,
        content: Option<String>,
        file: Option<PathBuf>,
        open_editor: bool,
    ) -> Result<()> {
        // Reject before an editor is opened for nothing
        validate_title(&title)?;

        let note_content = self
            .resolve_content(&title, content, file, open_editor, "")?
            .unwrap_or_default();

        let id = self.state.create(&title, &note_content).await?;
        println!("Note created with ID: {}", id);
        Ok(())
    }

    /// Picks the new content from exactly one of `--content`, `--file` or `--edit`.
    ///
    /// Returns `None` when none of them was given.
    fn resolve_content(
        &self,
        title: &str,
        content: Option<String>,
        file: Option<PathBuf>,
        open_editor: bool,
        existing: &str,
    ) -> Result<Option<String>> {
        let sources = [content.is_some(), file.is_some(), open_editor]
            .iter()
            .filter(|given| **given)
            .count();
        if sources > 1 {
            return Err(NoteError::ApplicationError {
                message: "Use only one of --content, --file and --edit".to_string(),
            });
        }

        match (content, file) {
            (Some(c), _) => Ok(Some(c)),
            (_, Some(file_path)) => self.read_content_from_file(&file_path).map(Some),
            (None, None) if open_editor => self.open_editor(title, existing).map(Some),
            (None, None) => Ok(None),
        }
    }

    fn read_content_from_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(NoteError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }

        read_to_string(path).map_err(NoteError::Io)
    }

    fn open_editor(&self, title: &str, existing: &str) -> Result<String> {
        // Create a temporary file with .md extension
        let temp_file = Builder::new().suffix(".md").tempfile()?;
        let temp_path = temp_file.path().to_path_buf();

        // Get editor from config or environment
        let editor_cmd = self.config.get_editor_command();

        self.write_editor_template(&temp_path, title, existing)?;

        info!("Opening editor to write note content. Save and exit when done...");
        self.launch_editor(&editor_cmd, &temp_path)?;

        let content = read_to_string(&temp_path)?;
        Ok(process_editor_content(&content, title))
    }

    fn write_editor_template(&self, path: &Path, title: &str, existing: &str) -> Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;

        writeln!(file, "# {}", title)?;
        writeln!(file, "<!-- Write your note content below. -->")?;
        writeln!(file, "<!-- Lines like this one are removed when you save. -->")?;
        writeln!(file, "<!-- Save and exit the editor when you're done. -->")?;
        if !existing.is_empty() {
            writeln!(file, "{}", existing)?;
        }

        Ok(())
    }

    fn launch_editor(&self, editor_cmd: &str, file_path: &Path) -> Result<()> {
        // Handle shell-like command parsing
        let args = split(editor_cmd).map_err(|e| NoteError::EditorError {
            message: format!("Failed to parse editor command: {}", e),
        })?;

        let (program, rest) = args.split_first().ok_or_else(|| NoteError::EditorError {
            message: "Empty editor command".to_string(),
        })?;

        debug!("Launching editor: {} {:?}", program, rest);
        let status = Command::new(program)
            .args(rest)
            .arg(file_path.as_os_str())
            .status()?;

        if !status.success() {
            return Err(NoteError::EditorError {
                message: "Editor exited with non-zero status".to_string(),
            });
        }

        Ok(())
    }

    async fn view_note(&mut self, id: i64, json: bool) -> Result<()> {
        self.state.reload().await?;

        let note = self
            .state
            .note(id)
            .ok_or(NoteError::NoteNotFound { id })?;

        if json {
            println!("{}", serde_json::to_string_pretty(note)?);
        } else {
            print_note(note, true, self.config.preview_length);
        }
        Ok(())
    }

    /// List notes, optionally narrowed by the in-memory filter
    async fn list_notes(
        &mut self,
        filter: Option<String>,
        limit: usize,
        json: bool,
        brief: bool,
    ) -> Result<()> {
        self.state.reload().await?;
        if let Some(query) = filter {
            self.state.filter(&query);
        }

        let notes = limited(self.state.visible_notes(), limit);
        self.display_notes(notes, json, brief)?;

        if !json && !notes.is_empty() {
            println!(
                "\nShowing {} of {} note{}",
                notes.len(),
                self.state.visible_notes().len(),
                if self.state.visible_notes().len() == 1 { "" } else { "s" }
            );
        }
        Ok(())
    }

    async fn handle_search(&self, query: String, limit: usize, json: bool) -> Result<()> {
        let results = self.state.gateway().search(&query).await?;

        let shown = limited(&results, limit);
        if shown.is_empty() {
            println!("No notes found matching query: \"{}\"", query);
            return Ok(());
        }

        self.display_notes(shown, json, false)?;

        if !json {
            if shown.len() < results.len() {
                println!(
                    "\nShowing {} of {} matching notes. Use --limit to show more.",
                    shown.len(),
                    results.len()
                );
            } else {
                println!("\nFound {} matching notes.", results.len());
            }
        }
        Ok(())
    }

    async fn handle_edit(
        &mut self,
        id: i64,
        title: Option<String>,
        content: Option<String>,
        file: Option<PathBuf>,
        open_editor: bool,
    ) -> Result<()> {
        self.state.reload().await?;

        let existing = self
            .state
            .note(id)
            .cloned()
            .ok_or(NoteError::NoteNotFound { id })?;

        let new_title = title.unwrap_or_else(|| existing.title.clone());
        validate_title(&new_title)?;

        let new_content = self
            .resolve_content(&new_title, content, file, open_editor, &existing.content)?
            .unwrap_or_else(|| existing.content.clone());

        self.state.edit(id, &new_title, &new_content).await?;
        println!("Note {} updated successfully", id);
        Ok(())
    }

    async fn handle_delete(&mut self, id: i64, force: bool) -> Result<()> {
        self.state.reload().await?;
        let note = self.state.note(id).cloned();

        if let (Some(note), false) = (&note, force) {
            println!("You are about to delete the following note:");
            print_note(note, false, self.config.preview_length);

            println!("\nThis action cannot be undone!");
            print!("Are you sure you want to delete this note? [y/N]: ");
            stdout().flush().map_err(NoteError::Io)?;

            let mut input = String::new();
            stdin().read_line(&mut input).map_err(NoteError::Io)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let removed = self.state.remove(id).await?;
        match (removed, note) {
            (0, _) => println!("No note with ID {} exists; nothing was deleted.", id),
            (_, Some(note)) => println!(
                "Note '{}' ({}) has been permanently deleted.",
                note.title, id
            ),
            (_, None) => println!("Note {} has been permanently deleted.", id),
        }
        Ok(())
    }

    async fn handle_export(&mut self, output: PathBuf, filter: Option<String>) -> Result<()> {
        self.state.reload().await?;
        if let Some(query) = filter {
            self.state.filter(&query);
        }

        let notes = self.state.visible_notes();
        write_json_atomically(&output, notes)?;

        println!("Exported {} notes to {}", notes.len(), output.display());
        Ok(())
    }

    fn handle_config(&self, show: bool, init: bool) -> Result<()> {
        if init {
            let path = self
                .config_path
                .clone()
                .or_else(Config::default_path)
                .ok_or_else(|| NoteError::ConfigError {
                    message: "No configuration directory is available on this platform"
                        .to_string(),
                })?;

            if path.exists() {
                return Err(NoteError::ApplicationError {
                    message: format!("Configuration file already exists: {}", path.display()),
                });
            }

            self.config.save(&path)?;
            println!("Configuration written to {}", path.display());
        }

        if show || !init {
            println!("{}", serde_json::to_string_pretty(&self.config)?);
        }
        Ok(())
    }

    /// Display notes in the requested format
    fn display_notes(&self, notes: &[Note], json: bool, brief: bool) -> Result<()> {
        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return Ok(());
        }

        if json {
            if brief {
                let simplified: Vec<serde_json::Value> = notes
                    .iter()
                    .map(|note| {
                        serde_json::json!({
                            "id": note.id,
                            "title": note.title,
                            "updated_at": note.updated_at.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&simplified)?);
            } else {
                println!("{}", serde_json::to_string_pretty(notes)?);
            }
            return Ok(());
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if brief {
                println!("{:>5}  {}", display_id(note), note.title);
                continue;
            }

            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }
            print_note(note, self.verbose, self.config.preview_length);
        }

        Ok(())
    }
}

fn limited(notes: &[Note], limit: usize) -> &[Note] {
    if limit > 0 && notes.len() > limit {
        &notes[..limit]
    } else {
        notes
    }
}

fn display_id(note: &Note) -> String {
    note.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_note(note: &Note, detailed: bool, preview_length: usize) {
    let updated_at = note.updated_at.format("%Y-%m-%d %H:%M");

    println!("ID: {} | Updated: {}", display_id(note), updated_at);
    println!("Title: {}", console::style(&note.title).bold());

    if detailed {
        println!(
            "Created: {}",
            console::style(note.created_at.format("%Y-%m-%d %H:%M:%S")).dim()
        );
        if !note.content.is_empty() {
            println!("\n{}", note.content);
        }
    } else {
        let preview = content_preview(&note.content, preview_length);
        if !preview.is_empty() {
            println!("\n{}", preview);
        }
    }
}

/// Strips the template heading and comment lines from editor output
fn process_editor_content(content: &str, title: &str) -> String {
    let heading = format!("# {}", title);

    content
        .lines()
        .enumerate()
        .filter(|(i, line)| !(*i == 0 && line.trim_end() == heading))
        .map(|(_, line)| line)
        .filter(|line| {
            !(line.trim_start().starts_with("<!--") && line.trim_end().ends_with("-->"))
        })
        .collect::<Vec<&str>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn app() -> App {
        App::new(
            Arc::new(NoteGateway::in_memory()),
            Config::default(),
            None,
            false,
        )
    }

    #[test]
    fn editor_template_lines_are_removed() {
        let raw = "# Groceries\n<!-- Write your note content below. -->\nMilk\n\nEggs\n";
        assert_eq!(process_editor_content(raw, "Groceries"), "Milk\n\nEggs");
    }

    #[test]
    fn heading_is_kept_when_title_changed() {
        let raw = "# Something else\nbody";
        assert_eq!(
            process_editor_content(raw, "Groceries"),
            "# Something else\nbody"
        );
    }

    #[test]
    fn limit_zero_means_everything() {
        let notes = vec![
            Note::new("a".to_string(), String::new()),
            Note::new("b".to_string(), String::new()),
        ];
        assert_eq!(limited(&notes, 0).len(), 2);
        assert_eq!(limited(&notes, 1).len(), 1);
        assert_eq!(limited(&notes, 5).len(), 2);
    }

    #[test]
    fn conflicting_content_sources_are_rejected() {
        let app = app();
        let result = app.resolve_content(
            "t",
            Some("inline".to_string()),
            Some(PathBuf::from("/tmp/whatever")),
            false,
            "",
        );
        assert!(matches!(result, Err(NoteError::ApplicationError { .. })));
    }

    #[test]
    fn content_can_come_from_a_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("body.txt");
        std::fs::write(&path, "from disk").unwrap();

        let resolved = app().resolve_content("t", None, Some(path), false, "").unwrap();
        assert_eq!(resolved.as_deref(), Some("from disk"));
    }

    #[tokio::test]
    async fn create_edit_and_delete_through_commands() {
        let mut app = app();

        app.run(Commands::Create {
            title: "Alpha".to_string(),
            content: Some("x".to_string()),
            edit: false,
            file: None,
        })
        .await
        .unwrap();
        let id = app.state().all_notes()[0].id.unwrap();

        app.run(Commands::Edit {
            id,
            title: None,
            content: Some("changed".to_string()),
            edit: false,
            file: None,
        })
        .await
        .unwrap();
        let edited = app.state().note(id).unwrap();
        assert_eq!(edited.title, "Alpha");
        assert_eq!(edited.content, "changed");

        app.run(Commands::Delete { id, force: true }).await.unwrap();
        assert!(app.state().all_notes().is_empty());
    }

    #[tokio::test]
    async fn create_with_blank_title_fails_before_storage() {
        let mut app = app();

        let result = app
            .run(Commands::Create {
                title: " ".to_string(),
                content: None,
                edit: false,
                file: None,
            })
            .await;

        assert!(matches!(result, Err(NoteError::EmptyTitle)));
        assert!(!app.state().gateway().is_initialized());
    }

    #[tokio::test]
    async fn export_writes_filtered_notes() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("export.json");
        let mut app = app();
        for (title, content) in [("Alpha", "x"), ("Beta", "y")] {
            app.run(Commands::Create {
                title: title.to_string(),
                content: Some(content.to_string()),
                edit: false,
                file: None,
            })
            .await
            .unwrap();
        }

        app.run(Commands::Export {
            output: output.clone(),
            filter: Some("BETA".to_string()),
        })
        .await
        .unwrap();

        let exported: Vec<Note> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].title, "Beta");
    }

    fn parse(args: &[&str]) -> Cli {
        use clap::Parser;
        Cli::try_parse_from(std::iter::once("pocketnotes").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn config_init_creates_a_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("fresh").join("config.json");
        let database = dir.path().join("notes.db");

        run_cli(parse(&[
            "-c",
            config_path.to_str().unwrap(),
            "--database",
            database.to_str().unwrap(),
            "config",
            "--init",
        ]))
        .await
        .unwrap();

        let written = Config::load(Some(&config_path)).unwrap();
        assert_eq!(written.database_path, database);
        assert!(!database.exists());
    }

    #[tokio::test]
    async fn other_commands_still_require_an_existing_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("missing.json");

        let result = run_cli(parse(&["-c", config_path.to_str().unwrap(), "list"])).await;

        assert!(matches!(result, Err(NoteError::FileNotFound { .. })));
        assert!(!config_path.exists());
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let app = App::new(
            Arc::new(NoteGateway::in_memory()),
            Config::default(),
            Some(path.clone()),
            false,
        );

        app.handle_config(false, true).unwrap();
        assert!(path.exists());
        assert!(matches!(
            app.handle_config(false, true),
            Err(NoteError::ApplicationError { .. })
        ));
    }
}
