//! Non-fatal diagnostics collected over a compiler run.
use crate::{Error, Id};
use std::fmt::Display;

/// Conditions that do not stop compilation but are reported at the end of
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A bundle member names a type that is neither primitive nor a known
    /// bundle. The member is still emitted with its literal type name.
    UnknownType { bundle: Id, member: Id, ty: String },
    /// A combine defines more than one `tick` or `applytick` block. Only the
    /// first one is used.
    DuplicateLifecycle { combine: Id, phase: &'static str },
    /// A support header that is normally copied into the output is missing.
    MissingSupportFile { file: String },
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnknownType { bundle, member, ty } => write!(
                f,
                "Unknown type `{ty}` for member `{member}` in bundle `{bundle}`"
            ),
            Warning::DuplicateLifecycle { combine, phase } => write!(
                f,
                "Combine `{combine}` has multiple {phase}(), only the first one is used"
            ),
            Warning::MissingSupportFile { file } => {
                write!(f, "Support file `{file}` not found, not copied")
            }
        }
    }
}

/// Accumulates warnings and recoverable errors over a compiler run.
#[derive(Default, Debug)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    errors: Vec<Error>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Record an error that only invalidates part of the output.
    pub fn error(&mut self, error: Error) {
        log::error!("{error}");
        self.errors.push(error);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Numbered, one line per diagnostic.
    pub fn summary(&self) -> Vec<String> {
        let warns = self
            .warnings
            .iter()
            .enumerate()
            .map(|(idx, w)| format!("WARN {idx}: {w}"));
        let errs = self
            .errors
            .iter()
            .enumerate()
            .map(|(idx, e)| format!("ERROR {idx}: {e}"));
        warns.chain(errs).collect()
    }
}
