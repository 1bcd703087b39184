//! Interface for a VulSim backend.
use std::path::Path;
use vulsim_ir as ir;
use vulsim_utils::{Error, VulResult};

/// A generated source file, kept in memory until every unit of the run has
/// been generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputUnit {
    /// File name relative to the output directory.
    pub file_name: String,
    pub contents: String,
}

impl OutputUnit {
    pub fn write_to(&self, dir: &Path) -> VulResult<()> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents).map_err(|err| {
            Error::write_error(format!("{}: {err}", path.display()))
        })?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// A backend for VulSim.
pub trait Backend {
    /// The name of this backend.
    fn name(&self) -> &'static str;
    /// Validate this program for emitting using this backend. Returns an
    /// Err(..) if the program has unexpected constructs.
    fn validate(prog: &ir::Context) -> VulResult<()>;
    /// Transforms the program into the source files of the target language.
    fn emit(prog: &ir::Context) -> VulResult<Vec<OutputUnit>>;
    /// Convience function to validate and emit the program.
    fn run(&self, prog: &ir::Context) -> VulResult<Vec<OutputUnit>> {
        Self::validate(prog)?;
        Self::emit(prog)
    }
}
