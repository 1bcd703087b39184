//! Frontend for VulSim descriptors.
//!
//! Reads the `bundle/` and `combine/` XML descriptors of a project into an
//! AST that mirrors the descriptor tags, and locates the bodies of
//! hand-written C++ functions referenced from `cppfunc` elements.
pub mod ast;
mod cppfunc;
mod parser;
mod workspace;
mod xml;

pub use cppfunc::extract_function_body;
pub use parser::DescriptorParser;
pub use workspace::Workspace;
pub use xml::XmlNode;
