//! Internal representation of a VulSim project.
//!
//! The IR is built from the frontend AST by [ast_to_ir]: names are checked,
//! descriptor defaults are made explicit, external function bodies are
//! spliced in and the bundles are put in declaration order. Backends consume
//! the resulting [Context].
mod bundle_order;
mod context;
mod from_ast;
mod lifecycle;
mod reserved_names;
mod structure;
mod types;

pub use context::{BackendConf, Context};
pub use from_ast::ast_to_ir;
pub use lifecycle::{CommitAction, LifecyclePlan};
pub use reserved_names::LIFECYCLE_NAMES;
pub use structure::{
    Bundle, BundleMember, CallBinding, CodeBlock, Combine, ConfigConstant,
    Direction, FunctionKind, OwnedFunction, Param, Port, Signature,
    StorageField,
};
pub use types::{Primitive, Type};

pub use vulsim_utils::{GetName, Id};
