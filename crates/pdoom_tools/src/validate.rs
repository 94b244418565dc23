//! Data validation utilities.

use std::path::Path;

use pdoom_core::data::Rarity;
use pdoom_core::events::EventEngine;

use crate::content::{load_content, ContentFiles, ContentResult};

/// Outcome of validating a data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Content files found.
    pub files: usize,
    /// Events loaded.
    pub events: usize,
    /// Actions loaded.
    pub actions: usize,
    /// Rivals in the scenario.
    pub rivals: usize,
    /// Problems that load but can never play out as written.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether validation found nothing to warn about.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate all RON data files in a directory.
///
/// Hard failures (unreadable files, parse errors, invalid definitions)
/// are errors. Scheduling problems that only show up once the scenario
/// calendar is applied are reported as warnings.
///
/// # Errors
///
/// Returns an error if any data file fails validation.
pub fn validate_data_directory(path: &Path) -> ContentResult<ValidationReport> {
    let files = ContentFiles::discover(path)?;
    let content = load_content(path)?;

    let engine = EventEngine::new(content.events.clone(), &content.scenario.calendar());
    let mut warnings = Vec::new();
    for def in content.events.iter().filter(|d| d.rarity == Rarity::Legendary) {
        match engine.scheduled_turn(&def.id) {
            None => warnings.push(format!(
                "legendary event '{}' is dated before the scenario start and will never fire",
                def.id
            )),
            Some(turn) if turn < def.min_turn => warnings.push(format!(
                "legendary event '{}' is scheduled for turn {turn}, before its min_turn {}",
                def.id, def.min_turn
            )),
            Some(_) => {}
        }
    }

    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    Ok(ValidationReport {
        files: files.count(),
        events: content.events.len(),
        actions: content.actions.len(),
        rivals: content.scenario.rivals.len(),
        warnings,
    })
}
