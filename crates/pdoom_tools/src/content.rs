//! Content loading from RON files.
//!
//! A data directory may hold any of:
//!
//! - `scenario.ron`: a `ScenarioConfig` (defaults when absent)
//! - `events.ron`: a list of `EventDefinition`s (no events when absent)
//! - `actions.ron`: a list of `ActionDefinition`s (standard set when absent)
//!
//! All validation happens at load time, so a loaded [`GameContent`] can
//! always start a session.

use std::path::{Path, PathBuf};

use pdoom_core::actions::ActionCatalog;
use pdoom_core::data::ScenarioConfig;
use pdoom_core::error::GameError;
use pdoom_core::events::EventCatalog;
use pdoom_core::turn::GameContent;
use thiserror::Error;

/// Scenario file name inside a data directory.
pub const SCENARIO_FILE: &str = "scenario.ron";
/// Event catalog file name inside a data directory.
pub const EVENTS_FILE: &str = "events.ron";
/// Action catalog file name inside a data directory.
pub const ACTIONS_FILE: &str = "actions.ron";

/// Errors that can occur while loading content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// File parsed badly or failed validation.
    #[error("Invalid content in '{path}': {source}")]
    Invalid {
        /// Path to the file.
        path: String,
        /// Parse or validation error reported by the kernel.
        #[source]
        source: GameError,
    },

    /// Data directory missing.
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(String),
}

/// Result type for content loading.
pub type ContentResult<T> = std::result::Result<T, ContentError>;

fn read(path: &Path) -> ContentResult<String> {
    std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parsed<T>(path: &Path, result: pdoom_core::error::Result<T>) -> ContentResult<T> {
    result.map_err(|source| ContentError::Invalid {
        path: path.display().to_string(),
        source,
    })
}

/// Load and validate a scenario file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_scenario(path: &Path) -> ContentResult<ScenarioConfig> {
    let scenario = parsed(path, ScenarioConfig::from_ron_str(&read(path)?))?;
    tracing::info!(
        path = %path.display(),
        name = %scenario.name,
        rivals = scenario.rivals.len(),
        "Loaded scenario"
    );
    Ok(scenario)
}

/// Load and validate an event catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_events(path: &Path) -> ContentResult<EventCatalog> {
    let catalog = parsed(path, EventCatalog::from_ron_str(&read(path)?))?;
    tracing::info!(path = %path.display(), events = catalog.len(), "Loaded events");
    Ok(catalog)
}

/// Load and validate an action catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_actions(path: &Path) -> ContentResult<ActionCatalog> {
    let catalog = parsed(path, ActionCatalog::from_ron_str(&read(path)?))?;
    tracing::info!(path = %path.display(), actions = catalog.len(), "Loaded actions");
    Ok(catalog)
}

/// Paths of the content files present in `dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFiles {
    /// Scenario file, if present.
    pub scenario: Option<PathBuf>,
    /// Event catalog, if present.
    pub events: Option<PathBuf>,
    /// Action catalog, if present.
    pub actions: Option<PathBuf>,
}

impl ContentFiles {
    /// Discover content files in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` does not exist.
    pub fn discover(dir: &Path) -> ContentResult<Self> {
        if !dir.is_dir() {
            return Err(ContentError::DirectoryNotFound(dir.display().to_string()));
        }
        let present = |name: &str| Some(dir.join(name)).filter(|p| p.is_file());
        Ok(Self {
            scenario: present(SCENARIO_FILE),
            events: present(EVENTS_FILE),
            actions: present(ACTIONS_FILE),
        })
    }

    /// Number of files found.
    #[must_use]
    pub fn count(&self) -> usize {
        [&self.scenario, &self.events, &self.actions]
            .iter()
            .filter(|p| p.is_some())
            .count()
    }
}

/// Load every content file in `dir`, defaulting the ones that are absent.
///
/// # Errors
///
/// Returns the first file that fails to load.
pub fn load_content(dir: &Path) -> ContentResult<GameContent> {
    let files = ContentFiles::discover(dir)?;
    let scenario = match &files.scenario {
        Some(path) => load_scenario(path)?,
        None => ScenarioConfig::default(),
    };
    let events = match &files.events {
        Some(path) => load_events(path)?,
        None => EventCatalog::default(),
    };
    let actions = match &files.actions {
        Some(path) => load_actions(path)?,
        None => ActionCatalog::standard(),
    };
    Ok(GameContent {
        scenario,
        events,
        actions,
    })
}
