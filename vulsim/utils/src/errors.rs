//! Errors generated by the compiler.
use crate::Id;
use itertools::Itertools;
use std::path::{Path, PathBuf};

/// Convience wrapper to represent success or meaningul compiler error.
pub type VulResult<T> = std::result::Result<T, Error>;

/// Errors generated by the compiler
pub struct Error {
    kind: Box<ErrorKind>,
    /// Descriptor or source file the error was found in
    file: Option<PathBuf>,
}

/// Standard error type for VulSim errors.
#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    /// The project directory or the output directory is not usable.
    #[error("Project structure error: {0}")]
    Structure(String),
    /// A descriptor does not start with the expected root tag.
    #[error("Wrong format: expected root tag `{expected}`, found `{found}`")]
    Schema { expected: String, found: String },
    /// A descriptor is missing required content or is otherwise malformed.
    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),
    /// The name has already been bound.
    #[error("Name `{0}` already bound by {1}")]
    AlreadyBound(Id, String),
    /// Using a reserved keyword as a name.
    #[error("Use of reserved keyword `{0}` as a name")]
    ReservedName(Id),
    /// Bundles that embed each other by value.
    #[error("Bundle check failed: loop dependency in {}", .0.iter().join(", "))]
    CyclicDependency(Vec<Id>),
    /// The body of an external function could not be located.
    #[error(
        "Body of function `{func}` not found in `{}` (combine `{combine}`, {owner})",
        .file.display()
    )]
    BodyNotFound {
        combine: Id,
        owner: String,
        func: Id,
        file: PathBuf,
    },
    /// The input file is invalid (does not exist, cannot be read).
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    /// Failed to write the output.
    #[error("Failed to write output: {0}")]
    WriteError(String),
    /// A miscellaneous error. Should be replaced with a more precise error.
    #[error("{0}")]
    Misc(String),
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            file: None,
        }
    }

    /// Attach the file the error originated from.
    pub fn with_file<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    pub fn structure<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::Structure(msg.to_string()))
    }

    pub fn schema<S: ToString, T: ToString>(expected: S, found: T) -> Self {
        Self::from_kind(ErrorKind::Schema {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }

    pub fn malformed_descriptor<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::MalformedDescriptor(msg.to_string()))
    }

    pub fn already_bound<S: ToString>(name: Id, bound_by: S) -> Self {
        Self::from_kind(ErrorKind::AlreadyBound(name, bound_by.to_string()))
    }

    pub fn reserved_name(name: Id) -> Self {
        Self::from_kind(ErrorKind::ReservedName(name))
    }

    pub fn cyclic_dependency(unresolved: Vec<Id>) -> Self {
        Self::from_kind(ErrorKind::CyclicDependency(unresolved))
    }

    pub fn body_not_found<S: ToString>(
        combine: Id,
        owner: S,
        func: Id,
        file: PathBuf,
    ) -> Self {
        Self::from_kind(ErrorKind::BodyNotFound {
            combine,
            owner: owner.to_string(),
            func,
            file,
        })
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::InvalidFile(msg.to_string()))
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::WriteError(msg.to_string()))
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::from_kind(ErrorKind::Misc(msg.to_string()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Recoverable errors only invalidate the combine they were found in; the
    /// rest of the run carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(*self.kind, ErrorKind::BodyNotFound { .. })
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " [{}]", file.display())?;
        }
        Ok(())
    }
}

// this is silly but needed to make the program print something sensible when returning
// a result from `main`
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {e}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::write_error(format!("Formatting Error: {e}"))
    }
}
