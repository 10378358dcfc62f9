// Console front end - Command line, line commands and a stdout StatusObserver
//
// Used by the `cleandeck` binary. Commands are parsed on the UI thread and applied to the
// orchestrator; the observer prints every change the orchestrator reports.

use crate::models::{
    Cleaner, OperationError, OperationKind, OperationResult, OperationStatus, Settings,
    format_size_mb,
};
use crate::ui::StatusObserver;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "cleandeck",
    version,
    about = "Preview and run system cleaners against a cleaner backend"
)]
pub struct Cli {
    /// Directory holding cleandeck.yaml (created if missing)
    #[arg(default_value = ".")]
    pub config_dir: Utf8PathBuf,

    /// Backend base URL, overriding the settings file
    #[arg(long)]
    pub base_url: Option<String>,

    /// Log at debug level, overriding the settings file
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(base_url) = &self.base_url {
            settings.backend.base_url = base_url.clone();
        }
        if self.debug {
            settings.logging.debug = true;
        }
    }
}

/// One line typed at the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Select { cleaner_id: String, option_id: String },
    Unselect { cleaner_id: String, option_id: String },
    Selected,
    Clear,
    Run(OperationKind),
    Abort,
    Reload,
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse a console line.
    ///
    /// # Returns
    /// - `Ok(None)` for a blank line
    /// - `Err(message)` for an unknown command or wrong arguments
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("list" | "ls", []) => Command::List,
            ("select", [cleaner, option]) => Command::Select {
                cleaner_id: cleaner.to_string(),
                option_id: option.to_string(),
            },
            ("unselect", [cleaner, option]) => Command::Unselect {
                cleaner_id: cleaner.to_string(),
                option_id: option.to_string(),
            },
            ("select" | "unselect", _) => {
                return Err(format!("usage: {} <cleaner> <option>", verb));
            }
            ("selected", []) => Command::Selected,
            ("clear", []) => Command::Clear,
            ("preview", []) => Command::Run(OperationKind::Preview),
            ("clean", []) => Command::Run(OperationKind::Clean),
            ("abort", []) => Command::Abort,
            ("reload", []) => Command::Reload,
            ("status", []) => Command::Status,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (_, []) => return Err(format!("unknown command: {}", verb)),
            (_, _) => return Err(format!("{} takes no arguments", verb)),
        };
        Ok(Some(command))
    }
}

pub const HELP: &str = "\
Commands:
  list                        show the cleaner catalog
  select <cleaner> <option>   tick an option
  unselect <cleaner> <option> untick an option
  selected                    show the current selection
  clear                       untick everything
  preview                     dry-run the selection
  clean                       delete what the selection matches
  abort                       stop the running operation
  reload                      fetch the catalog again
  status                      show the current status
  help                        show this text
  quit                        exit";

/// Render the catalog as an indented listing
pub fn format_catalog(catalog: &[Cleaner], is_selected: impl Fn(&str, &str) -> bool) -> String {
    if catalog.is_empty() {
        return "No cleaners loaded".to_string();
    }

    let mut out = String::new();
    for cleaner in catalog {
        out.push_str(&format!("{} - {}\n", cleaner.id, cleaner.name));
        for option in &cleaner.options {
            let mark = if is_selected(&cleaner.id, &option.id) { 'x' } else { ' ' };
            out.push_str(&format!("  [{}] {} - {}", mark, option.id, option.label));
            if let Some(warning) = &option.warning {
                out.push_str(&format!(" (warning: {})", warning));
            }
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

/// Render a finished operation's per-item sizes
pub fn format_result(result: &OperationResult) -> String {
    let mut out = format!(
        "{} in {} files{}",
        result.display_size(),
        result.total_files,
        if result.partial { " (partial)" } else { "" }
    );
    for item in &result.items {
        out.push_str(&format!(
            "\n  {}/{}: {} in {} files",
            item.cleaner_id,
            item.option_id,
            format_size_mb(item.size),
            item.file_count
        ));
    }
    out
}

/// Observer printing to any writer (stdout in the binary)
pub struct ConsoleObserver<W: Write> {
    out: W,

    /// Action of the running or last finished operation
    kind: Option<OperationKind>,
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out, kind: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::warn!("Failed to write to console: {}", e);
        }
    }
}

impl<W: Write> StatusObserver for ConsoleObserver<W> {
    fn on_catalog_loaded(&mut self, cleaners: &[Cleaner]) {
        self.print(&format!("Loaded {} cleaners", cleaners.len()));
    }

    fn on_catalog_load_failed(&mut self, error: &OperationError) {
        self.print(&format!("Could not load cleaners: {} (try `reload`)", error));
    }

    fn on_status_changed(&mut self, status: &OperationStatus) {
        if let OperationStatus::Busy { kind, .. } = status {
            self.kind = Some(*kind);
        }
        let line = status.describe(self.kind);
        self.print(&line);

        if let OperationStatus::Completed(result) | OperationStatus::PartiallyCompleted(result) =
            status
        {
            let details = format_result(result);
            self.print(&details);
        }
    }

    fn on_selection_cleared(&mut self) {
        self.print("Selection cleared");
    }

    fn on_operation_rejected(&mut self, error: &OperationError) {
        self.print(&format!("Cannot do that: {}", error));
    }
}
