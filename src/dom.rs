//! Minimal document tree with node-insertion subscriptions.
//!
//! Arena-allocated nodes addressed by [`NodeId`]. Structural changes go
//! through [`Document`], which reports child-list mutations to the watchers
//! whose root contains the mutation target. Watchers receive a
//! `&mut NodeTree`: they may rewrite attributes and inline style of the
//! nodes they are told about, but cannot restructure the tree from inside a
//! callback.
//!
//! Watchers are removed explicitly ([`Document::unobserve`]) or all at once
//! when the document is torn down on navigation ([`Document::teardown`]).

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("cannot insert {child:?} under {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("mutation observation is not supported by this document")]
    ObservationUnsupported,
    #[error("document has been torn down")]
    TornDown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Nodes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct ElementData {
    /// Lowercased.
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    /// Rendered size in CSS pixels, as last reported by layout.
    client_size: (u32, u32),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena of nodes. The root (`<html>`) is always node 0.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    fn with_root(tag: &str) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.create_element(tag);
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(id.0) {
            Some(Node {
                data: NodeData::Element(element),
                ..
            }) => Ok(element),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.nodes.get(id.0) {
            Some(Node {
                data: NodeData::Element(element),
                ..
            }) => Some(element),
            _ => None,
        }
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            client_size: (0, 0),
        }))
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0) {
            Some(Node {
                data: NodeData::Text(text),
                ..
            }) => Some(text),
            _ => None,
        }
    }

    /// Names are case-insensitive.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
        Ok(())
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.style.get(name).map(String::as_str)
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(id)?
            .style
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Serialized inline style, properties in name order.
    pub fn style_text(&self, id: NodeId) -> String {
        self.element(id)
            .map(|e| {
                e.style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v};"))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    pub fn client_size(&self, id: NodeId) -> Option<(u32, u32)> {
        self.element(id).map(|e| e.client_size)
    }

    /// Records the rendered size computed by the host's layout.
    pub fn set_client_size(&mut self, id: NodeId, width: u32, height: u32) -> Result<(), DomError> {
        self.element_mut(id)?.client_size = (width, height);
        Ok(())
    }

    /// True if `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// True if the node is attached to the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some() && self.contains(self.root(), id)
    }

    /// `id` followed by all of its descendants, in document order.
    pub fn inclusive_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.nodes.get(id.0).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Elements under `scope` (inclusive) whose tag is one of `tags`.
    pub fn elements_by_tags(&self, scope: NodeId, tags: &[&str]) -> Vec<NodeId> {
        self.inclusive_descendants(scope)
            .into_iter()
            .filter(|&id| self.tag_name(id).is_some_and(|tag| tags.contains(&tag)))
            .collect()
    }

    fn insert(&mut self, parent: NodeId, child: NodeId) -> Result<Option<NodeId>, DomError> {
        self.node(child)?;
        match self.node(parent)?.data {
            NodeData::Element(_) => {}
            NodeData::Text(_) => return Err(DomError::HierarchyRequest { parent, child }),
        }
        if child == self.root() || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let previous = self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(previous)
    }

    /// Unlinks `child` from its parent, returning the old parent.
    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(child.0)?.parent?;
        self.nodes[parent.0].children.retain(|&c| c != child);
        self.nodes[child.0].parent = None;
        Some(parent)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutation records and watchers
// ─────────────────────────────────────────────────────────────────────────────

/// A child-list change on `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

/// Handle returned by [`Document::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

pub type MutationCallback = Box<dyn FnMut(&mut NodeTree, &MutationRecord)>;

struct Watcher {
    id: WatchId,
    root: NodeId,
    callback: MutationCallback,
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// A loaded document: `<html>` root with `<head>` and `<body>`.
pub struct Document {
    tree: NodeTree,
    head: NodeId,
    body: NodeId,
    watchers: Vec<Watcher>,
    next_watch_id: u64,
    observation_supported: bool,
    torn_down: bool,
    /// Per-document state installed by content scripts, one value per type.
    extensions: HashMap<TypeId, Rc<dyn Any>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.tree.len())
            .field("watchers", &self.watchers.len())
            .field("observation_supported", &self.observation_supported)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut tree = NodeTree::with_root("html");
        let root = tree.root();
        let head = tree.create_element("head");
        let body = tree.create_element("body");
        // Fresh nodes under a fresh root: cannot fail.
        let _ = tree.insert(root, head);
        let _ = tree.insert(root, body);
        Self {
            tree,
            head,
            body,
            watchers: Vec::new(),
            next_watch_id: 1,
            observation_supported: true,
            torn_down: false,
            extensions: HashMap::new(),
        }
    }

    /// A document from a host without live mutation observation.
    pub fn without_mutation_observation() -> Self {
        Self {
            observation_supported: false,
            ..Self::new()
        }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Attribute/style/layout access. Structural changes go through
    /// [`Document::append_child`] and [`Document::remove_child`].
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn supports_mutation_observation(&self) -> bool {
        self.observation_supported
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create_element(tag)
    }

    /// Creates a detached element with the given attributes.
    pub fn create_element_with(&mut self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.tree.create_element(tag);
        for (name, value) in attributes {
            // `id` was just created as an element.
            let _ = self.tree.set_attribute(id, name, value);
        }
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.create_text(text)
    }

    /// Appends `child` (and its subtree) under `parent`, moving it if it
    /// already has a parent. Watchers see the insertion only when `parent`
    /// is connected to the document.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let previous = self.tree.insert(parent, child)?;
        if let Some(old_parent) = previous
            && self.tree.is_connected(old_parent)
        {
            self.notify(MutationRecord {
                target: old_parent,
                added_nodes: Vec::new(),
                removed_nodes: vec![child],
            });
        }
        if self.tree.is_connected(parent) {
            self.notify(MutationRecord {
                target: parent,
                added_nodes: vec![child],
                removed_nodes: Vec::new(),
            });
        }
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.tree.parent(child) != Some(parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        let connected = self.tree.is_connected(parent);
        self.tree.detach(child);
        if connected {
            self.notify(MutationRecord {
                target: parent,
                added_nodes: Vec::new(),
                removed_nodes: vec![child],
            });
        }
        Ok(())
    }

    /// Subscribes `callback` to child-list changes anywhere under `root`.
    pub fn observe(&mut self, root: NodeId, callback: MutationCallback) -> Result<WatchId, DomError> {
        if self.torn_down {
            return Err(DomError::TornDown);
        }
        if !self.observation_supported {
            return Err(DomError::ObservationUnsupported);
        }
        self.tree.node(root)?;

        let id = WatchId(self.next_watch_id);
        self.next_watch_id += 1;
        self.watchers.push(Watcher { id, root, callback });
        Ok(id)
    }

    /// Cancels a subscription. Returns `false` if it was already gone.
    pub fn unobserve(&mut self, id: WatchId) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|w| w.id != id);
        self.watchers.len() != before
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Navigation away: drops every watcher and all per-document state.
    /// No callback fires for this document afterwards.
    pub fn teardown(&mut self) {
        self.watchers.clear();
        self.extensions.clear();
        self.torn_down = true;
    }

    pub fn extension<T: Any>(&self) -> Option<Rc<T>> {
        self.extensions
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn insert_extension<T: Any>(&mut self, value: Rc<T>) {
        self.extensions.insert(TypeId::of::<T>(), value);
    }

    fn notify(&mut self, record: MutationRecord) {
        let Self { tree, watchers, .. } = self;
        for watcher in watchers.iter_mut() {
            if tree.contains(watcher.root, record.target) {
                (watcher.callback)(&mut *tree, &record);
            }
        }
    }
}
