use super::NodeId;

/// Which part of a node a [`MutationRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added to or removed from `target`.
    ChildList,
    /// The data of the text node `target` changed.
    CharacterData,
    /// An attribute of the element `target` changed.
    Attributes,
}

/// One elementary structural change, as delivered to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
        }
    }

    pub(crate) fn character_data(target: NodeId) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub(crate) fn attributes(target: NodeId) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// What a subscription wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
    /// Report changes anywhere below the observed root, not only on the root itself.
    pub subtree: bool,
}

impl ObserveOptions {
    pub fn wants(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes => self.attributes,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Subscription {
    pub root: NodeId,
    pub options: ObserveOptions,
    pub pending: Vec<MutationRecord>,
}
