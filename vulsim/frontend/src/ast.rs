//! Abstract Syntax Tree for VulSim descriptors.
//!
//! The AST mirrors the descriptor tags one-to-one. Optional sub-elements are
//! `Option`s that record whether the element was present, never whether it
//! happened to be empty.
use std::path::PathBuf;
use vulsim_utils::Id;

/// A `bundle` descriptor file.
#[derive(Debug, Clone)]
pub struct BundleDef {
    pub name: Id,
    pub members: Vec<MemberDef>,
    /// Descriptor file this bundle was read from.
    pub source: PathBuf,
}

/// `member{name,type,value?}`
#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: Id,
    pub ty: String,
    pub value: Option<String>,
}

/// `pipein{name,type,comment?}` and `pipeout{name,type,comment?}`
#[derive(Debug, Clone)]
pub struct PortDef {
    pub name: Id,
    pub ty: String,
    pub comment: Option<String>,
}

/// `arg{type,name,comment?}` and `return{type,name,comment?}`
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub ty: String,
    pub name: Id,
    pub comment: Option<String>,
}

/// Reference to a function defined in a file of the project's `cpp/`
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBody {
    /// Path relative to the `cpp/` directory.
    pub file: PathBuf,
    pub func: Id,
}

/// `cppfunc{file?,name?,code*}`
#[derive(Debug, Clone, Default)]
pub struct CppFuncDef {
    pub external: Option<ExternalBody>,
    /// Inline fragments, trimmed, in document order.
    pub code: Vec<String>,
}

/// `request`, `service` and `function` entries. Requests have no body.
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: Id,
    pub comment: Option<String>,
    pub args: Vec<ArgDef>,
    pub rets: Vec<ArgDef>,
    pub body: Option<CppFuncDef>,
}

/// `storage`, `storagenext` and `storagetick` entries.
#[derive(Debug, Clone)]
pub struct StorageDef {
    pub name: Id,
    pub ty: String,
    pub value: Option<String>,
    pub comment: Option<String>,
}

/// `config{name,value}`
#[derive(Debug, Clone)]
pub struct ConfigDef {
    pub name: Id,
    pub value: String,
    pub comment: Option<String>,
}

/// A `combine` descriptor file. Every repeated tag is kept in document order
/// in its own list.
#[derive(Debug, Clone)]
pub struct CombineDef {
    pub name: Id,
    pub comment: Option<String>,
    pub source: PathBuf,
    pub pipein: Vec<PortDef>,
    pub pipeout: Vec<PortDef>,
    pub requests: Vec<FuncDef>,
    pub services: Vec<FuncDef>,
    pub functions: Vec<FuncDef>,
    pub storage: Vec<StorageDef>,
    pub storagenext: Vec<StorageDef>,
    pub storagetick: Vec<StorageDef>,
    pub configs: Vec<ConfigDef>,
    pub init: Vec<CppFuncDef>,
    pub tick: Vec<CppFuncDef>,
    pub applytick: Vec<CppFuncDef>,
    pub stallable: bool,
}

impl CombineDef {
    pub fn new<S: Into<Id>>(name: S, source: PathBuf) -> Self {
        Self {
            name: name.into(),
            comment: None,
            source,
            pipein: Vec::new(),
            pipeout: Vec::new(),
            requests: Vec::new(),
            services: Vec::new(),
            functions: Vec::new(),
            storage: Vec::new(),
            storagenext: Vec::new(),
            storagetick: Vec::new(),
            configs: Vec::new(),
            init: Vec::new(),
            tick: Vec::new(),
            applytick: Vec::new(),
            stallable: false,
        }
    }
}
