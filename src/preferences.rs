//! Client-side display preferences, kept in a small JSON file.

use crate::api::planner::{DayItem, DayView};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PREFERENCES_FILE: &str = ".daybook_prefs.json";

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed preferences file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown preference: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletedPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub completed_position: CompletedPosition,
    pub hide_completed: bool,
    pub highlight_next_task: bool,
    pub last_task_move_time: Option<NaiveDateTime>,
}

impl Preferences {
    /// Loads preferences, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes through a temporary file in the same directory, then renames.
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Sets one preference from its storage key and a string value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), PreferencesError> {
        let invalid = || PreferencesError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "completedPosition" => {
                self.completed_position = match value {
                    "top" => CompletedPosition::Top,
                    "bottom" => CompletedPosition::Bottom,
                    _ => return Err(invalid()),
                }
            }
            "hideCompleted" => self.hide_completed = value.parse().map_err(|_| invalid())?,
            "highlightNextTask" => {
                self.highlight_next_task = value.parse().map_err(|_| invalid())?
            }
            "lastTaskMoveTime" => {
                self.last_task_move_time = Some(value.parse().map_err(|_| invalid())?)
            }
            other => return Err(PreferencesError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn is_completed_task(item: &DayItem) -> bool {
    matches!(item, DayItem::Task(t) if t.completed)
}

impl Preferences {
    /// Arranges a fetched day for display.
    ///
    /// Completed tasks are dropped when hidden, otherwise moved as a block to
    /// the top or bottom of the list; everything else keeps its order. The
    /// next-task highlight is cleared unless enabled.
    pub fn arrange(&self, mut view: DayView) -> DayView {
        if self.hide_completed {
            view.items.retain(|item| !is_completed_task(item));
        } else {
            let position = self.completed_position;
            view.items.sort_by_key(|item| match (is_completed_task(item), position) {
                (true, CompletedPosition::Top) => 0,
                (false, _) => 1,
                (true, CompletedPosition::Bottom) => 2,
            });
        }
        if !self.highlight_next_task {
            view.next_task_id = None;
        }
        view
    }
}
