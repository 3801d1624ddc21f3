//! Retained markup tree written by the painting surfaces.
//!
//! Nodes live in a petgraph `StableDiGraph` (parent → child) so that a
//! shape can keep the index of its node across repaints while siblings
//! come and go. Child order is tracked explicitly; it is the paint order.

use crate::gradient::GradientCache;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt::Write;

pub type NodeRef = NodeIndex;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: SmallVec<[(String, String); 6]>,
    /// Character data, written before any children.
    pub text: Option<String>,
    /// Pre-serialized markup written verbatim (embedded rich text).
    pub raw: Option<String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key.to_string(), value));
        }
    }

    pub fn remove_attr(&mut self, key: &str) {
        self.attrs.retain(|(k, _)| k != key);
    }
}

// ─── Document ────────────────────────────────────────────────────────────

pub struct Document {
    graph: StableDiGraph<Element, ()>,
    order: HashMap<NodeIndex, Vec<NodeIndex>>,
    root: NodeIndex,
    defs: Option<NodeIndex>,
    pub(crate) gradients: GradientCache,
    next_id: u32,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.graph.node_count())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::svg()
    }
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        let mut graph = StableDiGraph::new();
        let root = graph.add_node(Element::new(root_tag));
        Self {
            graph,
            order: HashMap::new(),
            root,
            defs: None,
            gradients: GradientCache::default(),
            next_id: 0,
        }
    }

    /// An `<svg>` root with the SVG namespace.
    pub fn svg() -> Self {
        let mut doc = Self::new("svg");
        let root = doc.root;
        doc.set_attr(root, "xmlns", "http://www.w3.org/2000/svg");
        doc.set_attr(root, "xmlns:xlink", "http://www.w3.org/1999/xlink");
        doc
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    /// The shared `<defs>` node, created as the first child on demand.
    pub fn defs(&mut self) -> NodeRef {
        if let Some(d) = self.defs
            && self.graph.contains_node(d)
        {
            return d;
        }
        let d = self.create("defs");
        let first = self.children(self.root).first().copied();
        self.insert_before(self.root, d, first);
        self.defs = Some(d);
        d
    }

    /// Fresh numeric id, unique within this document.
    pub fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Detached element.
    pub fn create(&mut self, tag: &str) -> NodeRef {
        self.graph.add_node(Element::new(tag))
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.graph.contains_node(node)
    }

    pub fn element(&self, node: NodeRef) -> Option<&Element> {
        self.graph.node_weight(node)
    }

    pub fn element_mut(&mut self, node: NodeRef) -> Option<&mut Element> {
        self.graph.node_weight_mut(node)
    }

    pub fn set_attr(&mut self, node: NodeRef, key: &str, value: impl ToString) {
        if let Some(e) = self.graph.node_weight_mut(node) {
            e.set_attr(key, value);
        }
    }

    pub fn attr(&self, node: NodeRef, key: &str) -> Option<&str> {
        self.graph.node_weight(node).and_then(|e| e.attr(key))
    }

    pub fn set_text(&mut self, node: NodeRef, text: impl ToString) {
        if let Some(e) = self.graph.node_weight_mut(node) {
            e.text = Some(text.to_string());
        }
    }

    pub fn set_raw(&mut self, node: NodeRef, raw: impl ToString) {
        if let Some(e) = self.graph.node_weight_mut(node) {
            e.raw = Some(raw.to_string());
        }
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .next()
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        self.order.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn next_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    }

    pub fn append(&mut self, parent: NodeRef, child: NodeRef) {
        self.insert_before(parent, child, None);
    }

    /// Attach `child` under `parent` before `before` (at the end if `None`
    /// or if `before` is not a child of `parent`). Moves the child if it is
    /// already attached somewhere.
    pub fn insert_before(&mut self, parent: NodeRef, child: NodeRef, before: Option<NodeRef>) {
        if !self.graph.contains_node(parent) || !self.graph.contains_node(child) {
            return;
        }
        self.detach(child);
        self.graph.add_edge(parent, child, ());
        let order = self.order.entry(parent).or_default();
        let at = before
            .and_then(|b| order.iter().position(|&c| c == b))
            .unwrap_or(order.len());
        order.insert(at, child);
    }

    /// Unlink from the parent, keeping the subtree alive.
    pub fn detach(&mut self, node: NodeRef) {
        if let Some(parent) = self.parent(node) {
            if let Some(e) = self.graph.find_edge(parent, node) {
                self.graph.remove_edge(e);
            }
            if let Some(order) = self.order.get_mut(&parent) {
                order.retain(|&c| c != node);
            }
        }
    }

    /// Remove a node and its subtree.
    pub fn remove(&mut self, node: NodeRef) {
        if !self.graph.contains_node(node) || node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            if let Some(kids) = self.order.remove(&n) {
                stack.extend(kids);
            }
            self.graph.remove_node(n);
        }
    }

    /// Remove every child of `node`.
    pub fn clear_children(&mut self, node: NodeRef) {
        for child in self.children(node).to_vec() {
            self.remove(child);
        }
    }

    /// Whether any element carries `id="<id>"`.
    pub fn has_id(&self, id: &str) -> bool {
        self.graph
            .node_weights()
            .any(|e| e.attr("id") == Some(id))
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeRef> {
        self.graph
            .node_indices()
            .find(|&n| self.graph[n].attr("id") == Some(id))
    }

    /// Deep copy of `node` as a detached subtree.
    pub fn clone_subtree(&mut self, node: NodeRef) -> Option<NodeRef> {
        let element = self.graph.node_weight(node)?.clone();
        let copy = self.graph.add_node(element);
        for child in self.children(node).to_vec() {
            if let Some(c) = self.clone_subtree(child) {
                self.append(copy, c);
            }
        }
        Some(copy)
    }

    /// Number of live elements, detached ones included.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Elements with `tag` reachable from the root, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(n) = stack.pop() {
            if self.graph[n].tag == tag {
                out.push(n);
            }
            stack.extend(self.children(n).iter().rev());
        }
        out
    }

    // ─── Serialization ──────────────────────────────────────────────────

    pub fn to_markup(&self) -> String {
        self.serialize(self.root)
    }

    pub fn serialize(&self, node: NodeRef) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: NodeRef, out: &mut String) {
        let Some(e) = self.graph.node_weight(node) else {
            return;
        };
        out.push('<');
        out.push_str(&e.tag);
        for (k, v) in &e.attrs {
            let _ = write!(out, " {k}=\"{}\"", escape_xml(v));
        }
        let kids = self.children(node);
        if kids.is_empty() && e.text.is_none() && e.raw.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(t) = &e.text {
            out.push_str(&escape_xml(t));
        }
        if let Some(raw) = &e.raw {
            out.push_str(raw);
        }
        for &k in kids {
            self.write_node(k, out);
        }
        let _ = write!(out, "</{}>", e.tag);
    }
}

pub fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            _ => s.push(ch),
        }
    }
    s
}
