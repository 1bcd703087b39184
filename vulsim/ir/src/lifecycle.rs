//! Bookkeeping the generated lifecycle methods run on behalf of the user.
use crate::{Combine, StorageField};
use vulsim_utils::Id;

/// A statement scheduled in the commit phase before the user's applytick
/// logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAction {
    /// Commit the winning proposal of a next-buffered register.
    ApplyBuffered(Id),
    /// Restore a tick-reset register to its default.
    ResetTick { name: Id, default: String },
    /// Lower the stall flag raised during the tick phase.
    ClearStall,
}

/// Ordered bookkeeping of both lifecycle phases of a combine.
///
/// The tick phase currently has no bookkeeping: every state kind settles
/// during the commit phase so that reads in the next tick phase observe
/// committed values only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecyclePlan {
    pub commit: Vec<CommitAction>,
}

impl LifecyclePlan {
    pub fn for_combine(combine: &Combine) -> Self {
        let buffered = combine.storage.iter().filter_map(|s| match s {
            StorageField::NextBuffered { name, .. } => {
                Some(CommitAction::ApplyBuffered(*name))
            }
            _ => None,
        });
        let resets = combine.storage.iter().filter_map(|s| match s {
            StorageField::TickReset { name, default, .. } => {
                Some(CommitAction::ResetTick {
                    name: *name,
                    default: default.clone(),
                })
            }
            _ => None,
        });
        let stall = combine.stallable.then_some(CommitAction::ClearStall);

        Self {
            commit: buffered.chain(resets).chain(stall).collect(),
        }
    }
}
