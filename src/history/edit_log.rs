/// Session history of committed view edits.
///
/// Only committed changes land here: phase commits, reference shifts,
/// baseline subtraction and moved peaks. Previews never do.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Edit {
    PhaseCommit { phase0: f64, phase1: f64 },
    ReferenceShift { delta: f64, total: f64 },
    BaselineApplied,
    PeakMoved { identity_index: usize, domain_x: f64, intensity: f64 },
    ContourReference { spectrum: usize, dx: f64, dy: f64 },
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::PhaseCommit { phase0, phase1 } => write!(
                f,
                "Phase committed (ph0={:.2}°, ph1={:.2}°)",
                phase0.to_degrees(),
                phase1.to_degrees()
            ),
            Edit::ReferenceShift { delta, total } => {
                write!(f, "Reference shifted by {:+.4} (now {:+.4})", delta, total)
            }
            Edit::BaselineApplied => write!(f, "Baseline subtracted"),
            Edit::PeakMoved {
                identity_index,
                domain_x,
                intensity,
            } => write!(
                f,
                "Peak #{} moved to {:.4} (intensity {:.4})",
                identity_index, domain_x, intensity
            ),
            Edit::ContourReference { spectrum, dx, dy } => write!(
                f,
                "Contour spectrum {} shifted by ({:+.4}, {:+.4})",
                spectrum, dx, dy
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditEntry {
    /// 1-based
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    pub edit: Edit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditLog {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    pub software_version: String,
    pub entries: Vec<EditEntry>,
}

impl Default for EditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EditLog {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, edit: Edit) {
        let sequence = self.entries.len() + 1;
        log::info!("[edit {:03}] {}", sequence, edit);
        self.entries.push(EditEntry {
            sequence,
            timestamp: Local::now(),
            edit,
        });
    }

    pub fn pop(&mut self) -> Option<EditEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&EditEntry> {
        self.entries.last()
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "nmr_view v{} session {}\nstarted {}\n\n",
            self.software_version,
            self.session_id,
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        );
        for e in &self.entries {
            out.push_str(&format!(
                "{:03}  {}  {}\n",
                e.sequence,
                e.timestamp.format("%H:%M:%S"),
                e.edit
            ));
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_text(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
