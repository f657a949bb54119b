use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::source::Record;

/// Records shown per page. Fixed for the lifetime of the program.
pub const PAGE_SIZE: usize = 20;

/// The field the dedicated filter control matches against.
pub const SELECTOR_FIELD: &str = "Faculty Name";

/// Header label shown while no selector value is active.
pub const DEFAULT_HEADER: &str = "[Faculty Name]";

/// Placeholder for a missing card field.
pub const MISSING_FIELD: &str = "N/A";

/// Placeholder for a missing faculty name.
pub const MISSING_NAME: &str = "TBA Faculty";

/// Attribution prefix written into the snapshot footer.
pub const ATTRIBUTION: &str = "Generated from FARHAN-DEV";

/// Snapshots are rendered at twice the base geometry.
pub const EXPORT_SCALE: u32 = 2;

pub const HELP_TEXT: &str = "\
 fdv - faculty directory viewer

 /        edit the free-text search
 f        edit the faculty filter
 Tab      (while filtering) complete the first suggestion
 c        clear both filters
 n, ]     next page
 p, [     previous page
 arrows   move the card selection
 y        copy the selected card
 d        download a snapshot of the current page
 ?        this help
 Esc      close popup / leave input
 q        quit
";

#[derive(Debug, Clone, Setters)]
pub struct Config {
    /// Path or URL the dataset is fetched from.
    pub source: String,
    /// Where exported snapshots are written.
    pub export_path: PathBuf,
    pub event_poll_time: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: "faculty.json".to_string(),
            export_path: PathBuf::from("faculty-directory.png"),
            event_poll_time: 100,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Status {
    LOADING,
    READY,
    EMPTY,
    QUITTING,
}

// Which part of the UI currently owns key events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    BROWSE,
    SEARCH,
    FACULTY,
    POPUP,
}

#[derive(Debug)]
pub enum Message {
    Quit,
    NextPage,
    PrevPage,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    EditSearch,
    EditFaculty,
    ClearFilters,
    CopyCard,
    Export,
    Help,
    Exit,
    RawKey(KeyEvent),
    DataLoaded(Vec<Record>),
    LoadFailed(String),
    ExportFinished(PathBuf),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no usable font found for snapshot rendering")]
    FontNotFound,
    #[error("snapshot rendering failed: {0}")]
    Snapshot(String),
}
