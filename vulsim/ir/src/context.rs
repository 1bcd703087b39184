//! An IR context. This is the top-level object for an IR and contains all
//! information needed to emit a VulSim project.
use crate::{Bundle, Combine};
use linked_hash_map::LinkedHashMap;
use vulsim_utils::{Diagnostics, Id};

/// Configuration information for the backends.
#[derive(Debug, Clone)]
pub struct BackendConf {
    /// Spaces per indentation level in generated code.
    pub indent: usize,
    /// Extra `#include` targets added to every generated header.
    pub extra_includes: Vec<String>,
}

impl Default for BackendConf {
    fn default() -> Self {
        Self {
            indent: 4,
            extra_includes: Vec::new(),
        }
    }
}

/// The IR Context that represents a whole VulSim project with its bundle
/// dependencies resolved.
#[derive(Debug, Default)]
pub struct Context {
    /// Bundles, keyed by name, in the order their descriptors were read.
    pub bundles: LinkedHashMap<Id, Bundle>,
    /// Declaration order of the bundles.
    pub bundle_order: Vec<Id>,
    /// Combines that are ready to be emitted.
    pub combines: Vec<Combine>,
    /// Configuration flags for backends.
    pub bc: BackendConf,
    /// Warnings and recoverable errors collected so far.
    pub diagnostics: Diagnostics,
}

impl Context {
    /// Bundles in declaration order.
    pub fn ordered_bundles(&self) -> impl Iterator<Item = &Bundle> {
        self.bundle_order
            .iter()
            .filter_map(|name| self.bundles.get(name))
    }

    pub fn find_combine<S: Into<Id>>(&self, name: S) -> Option<&Combine> {
        let name = name.into();
        self.combines.iter().find(|c| c.name == name)
    }
}
