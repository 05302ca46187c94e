//! Host document model.
//!
//! The engine never talks to a real page directly. Instead the embedding
//! environment mirrors the page into a [`Document`]: an arena of element and
//! text nodes addressed by [`NodeId`], plus the layout sizes the host reports
//! and a single structural-change subscription.
//!
//! Removed nodes are kept in the arena, detached. A [`NodeId`] held across a
//! removal therefore stays valid to query; [`Document::contains`] tells
//! whether it is still part of the live tree.

mod mutation;
mod serialize;

pub use mutation::{MutationKind, MutationRecord, ObserveOptions};

use mutation::Subscription;

/// Stable identity of a node within one [`Document`].
///
/// Ids index the arena directly and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The document node itself; parent of `<html>`.
    pub const DOCUMENT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Client bounding box size as reported by the host's layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both axes collapsed; the element renders nothing.
    pub fn is_zero(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    size: Option<Size>,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),
    #[error("Node {0:?} cannot have children")]
    NotAContainer(NodeId),
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("Inserting {child:?} into {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("Node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("Node {0:?} is not an element")]
    NotElement(NodeId),
    #[error("Node {0:?} has no parent")]
    Orphan(NodeId),
}

/// Arena-backed stand-in for a live page.
///
/// Nodes are never freed: a removed node stays in the arena, detached, so ids
/// held across a removal can still be queried. Memory therefore grows with
/// every node ever created; a host that churns through many nodes should
/// start a fresh `Document` when it reloads the page.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeEntry>,
    head: NodeId,
    body: NodeId,
    top_level: bool,
    subscription: Option<Subscription>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A top-level document with empty `<head>` and `<body>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![NodeEntry {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            head: NodeId::DOCUMENT,
            body: NodeId::DOCUMENT,
            top_level: true,
            subscription: None,
        };
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(NodeId::DOCUMENT, html, None);
        doc.link(html, head, None);
        doc.link(html, body, None);
        doc.head = head;
        doc.body = body;
        doc
    }

    /// A document loaded inside a frame rather than as the top-level page.
    pub fn new_frame() -> Self {
        Self {
            top_level: false,
            ..Self::new()
        }
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn is_top_level(&self) -> bool {
        self.top_level
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // Construction

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            size: None,
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // Structural changes

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            self.entry(reference)?;
            if self.nodes[reference.index()].parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);
        self.link(parent, child, reference);
        self.record(MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(())
    }

    /// Detach `node` (and its subtree) from its parent.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.entry(node)?;
        if self.nodes[node.index()].parent.is_none() {
            return Err(DomError::Orphan(node));
        }
        self.detach(node);
        Ok(())
    }

    /// Swap `old` for `new` in one step, producing a single record that
    /// carries both the addition and the removal.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        self.entry(old)?;
        let parent = self.nodes[old.index()]
            .parent
            .ok_or(DomError::Orphan(old))?;
        self.check_insert(parent, new)?;
        if old == new {
            return Ok(());
        }

        // Moving `new` out of its current place is a separate change.
        self.detach(new);
        let siblings = &mut self.nodes[parent.index()].children;
        let position = siblings
            .iter()
            .position(|&sibling| sibling == old)
            .ok_or(DomError::NotAChild { parent, child: old })?;
        siblings[position] = new;
        self.nodes[old.index()].parent = None;
        self.nodes[new.index()].parent = Some(parent);
        self.record(MutationRecord::child_list(parent, vec![new], vec![old]));
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.entry_mut(node)?.data {
            NodeData::Text(data) => {
                *data = text.to_string();
            }
            _ => return Err(DomError::NotText(node)),
        }
        self.record(MutationRecord::character_data(node));
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_data_mut(node)?;
        let name = name.to_ascii_lowercase();
        match element.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attributes.push((name, value.to_string())),
        }
        self.record(MutationRecord::attributes(node));
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.element_data_mut(node)?;
        let before = element.attributes.len();
        element
            .attributes
            .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        if element.attributes.len() != before {
            self.record(MutationRecord::attributes(node));
        }
        Ok(())
    }

    /// Record the client bounding box the host computed for `node`.
    pub fn set_size(&mut self, node: NodeId, size: Size) -> Result<(), DomError> {
        self.element_data_mut(node)?.size = Some(size);
        Ok(())
    }

    // Queries

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.index()).map(|entry| &entry.data)
    }

    pub fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        match self.data(node) {
            Some(NodeData::Element(_)) => Some(ElementRef { doc: self, id: node }),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.data(node), Some(NodeData::Element(_)))
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(self.data(node), Some(NodeData::Text(_)))
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Element(element) => Some(element.tag.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match self.data(node)? {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match self.data(node)? {
            NodeData::Element(element) => element
                .attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        match self.data(node) {
            Some(NodeData::Element(element)) => &element.attributes,
            _ => &[],
        }
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn size(&self, node: NodeId) -> Option<Size> {
        match self.data(node)? {
            NodeData::Element(element) => element.size,
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index())?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.index())
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|&sibling| sibling == node)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|&sibling| self.is_element(sibling))
    }

    /// Whether `node` is attached to this document's live tree.
    pub fn contains(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(NodeId::DOCUMENT, node)
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        if self.nodes.get(node.index()).is_none() {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest inclusive ancestor of `node` satisfying `predicate`.
    pub fn closest(
        &self,
        node: NodeId,
        predicate: impl Fn(&Document, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if predicate(self, id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Strict descendants of `root`, depth-first, pre-order.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(root).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Number of elements below `root`, not counting `root`.
    pub fn element_count_within(&self, root: NodeId) -> usize {
        self.descendants(root)
            .filter(|&node| self.is_element(node))
            .count()
    }

    /// Attached elements carrying `class`, in document order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(NodeId::DOCUMENT)
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    /// Concatenated data of every text node within `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.descendants(node)
            .filter_map(|id| self.text(id))
            .collect()
    }

    // Change subscription

    /// Start reporting changes under `root`. Replaces any previous subscription.
    pub fn observe(&mut self, root: NodeId, options: ObserveOptions) {
        self.subscription = Some(Subscription {
            root,
            options,
            pending: Vec::new(),
        });
    }

    /// Drop the subscription together with any undelivered records.
    pub fn disconnect(&mut self) {
        self.subscription = None;
    }

    pub fn is_observed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Hand over the records accumulated since the last delivery.
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.subscription
            .as_mut()
            .map(|subscription| std::mem::take(&mut subscription.pending))
            .unwrap_or_default()
    }

    pub fn has_pending_records(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|subscription| !subscription.pending.is_empty())
    }

    // Internals

    fn entry(&self, node: NodeId) -> Result<&NodeEntry, DomError> {
        self.nodes.get(node.index()).ok_or(DomError::UnknownNode(node))
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry, DomError> {
        self.nodes
            .get_mut(node.index())
            .ok_or(DomError::UnknownNode(node))
    }

    fn element_data_mut(&mut self, node: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.entry_mut(node)?.data {
            NodeData::Element(element) => Ok(element),
            _ => Err(DomError::NotElement(node)),
        }
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        match self.entry(parent)?.data {
            NodeData::Text(_) => return Err(DomError::NotAContainer(parent)),
            NodeData::Document | NodeData::Element(_) => {}
        }
        match self.entry(child)?.data {
            NodeData::Document => return Err(DomError::Cycle { parent, child }),
            NodeData::Element(_) | NodeData::Text(_) => {}
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Cycle { parent, child });
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let siblings = &mut self.nodes[parent.index()].children;
        let position = reference
            .and_then(|reference| siblings.iter().position(|&sibling| sibling == reference))
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.index()].parent else {
            return;
        };
        self.nodes[parent.index()]
            .children
            .retain(|&sibling| sibling != node);
        self.nodes[node.index()].parent = None;
        self.record(MutationRecord::child_list(parent, Vec::new(), vec![node]));
    }

    fn record(&mut self, record: MutationRecord) {
        let Some(subscription) = &self.subscription else {
            return;
        };
        if !subscription.options.wants(record.kind) {
            return;
        }
        let in_scope = if subscription.options.subtree {
            self.is_inclusive_ancestor(subscription.root, record.target)
        } else {
            subscription.root == record.target
        };
        if in_scope && let Some(subscription) = &mut self.subscription {
            subscription.pending.push(record);
        }
    }
}

/// Borrowed view of one element, handed to parser units.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn tag(&self) -> &'a str {
        self.doc.tag(self.id).unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.doc.attribute(self.id, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.doc.has_class(self.id, class)
    }

    pub fn text_content(&self) -> String {
        self.doc.text_content(self.id)
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(node).iter().rev().copied());
        Some(node)
    }
}
