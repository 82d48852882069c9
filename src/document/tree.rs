//! Mutable XML tree for the main document part
//!
//! The tree is an arena: every node lives in one `Vec` and is addressed by a
//! [`NodeId`] that stays valid for the lifetime of the tree, even after the
//! node has been detached or its siblings have been reordered. This is what
//! lets the merge and repair passes hold on to a table across structural
//! edits instead of re-resolving it by position.
//!
//! Parsing keeps the raw markup of every start tag, text node and
//! declaration, so a tree that is never touched serializes back to exactly
//! the input bytes. Changing an attribute re-renders only that one tag.

use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use std::fmt::Write as _;

use crate::error::{DocError, DocResult};

/// Stable handle to a node in an [`XmlTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    /// Start tag content between `<` and `>` (or `/>`) as it was parsed
    raw_start: Option<String>,
    self_closing: bool,
}

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element(Element),
    /// Escaped character data, exactly as it appears in the markup
    Text(String),
    /// Declarations, comments, processing instructions and CDATA, verbatim
    Markup(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<Node>,
}

impl XmlTree {
    const ROOT: NodeId = NodeId(0);

    fn empty() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse the main document part
    pub fn parse(xml: &str) -> DocResult<Self> {
        Self::parse_part(xml, crate::document::io::MAIN_DOCUMENT_PART)
    }

    /// Parse an XML part, naming it in any error message
    pub fn parse_part(xml: &str, part: &str) -> DocResult<Self> {
        let mut tree = Self::empty();
        tree.parse_children(xml).map_err(|message| DocError::Xml {
            part: part.to_string(),
            message,
        })?;
        Ok(tree)
    }

    fn parse_children(&mut self, xml: &str) -> Result<(), String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| format!("{e} (at byte {})", reader.buffer_position()))?;

            let data = match event {
                Event::Eof => break,
                Event::End(_) => {
                    if stack.pop().is_none() {
                        return Err(format!(
                            "unexpected closing tag at byte {}",
                            reader.buffer_position()
                        ));
                    }
                    continue;
                }
                Event::Start(ref e) => NodeData::Element(element_from_start(e, false)?),
                Event::Empty(ref e) => NodeData::Element(element_from_start(e, true)?),
                Event::Text(ref e) => NodeData::Text(lossy(e)),
                Event::CData(ref e) => NodeData::Markup(format!("<![CDATA[{}]]>", lossy(e))),
                Event::Comment(ref e) => NodeData::Markup(format!("<!--{}-->", lossy(e))),
                Event::Decl(ref e) => NodeData::Markup(format!("<?{}?>", lossy(e))),
                Event::PI(ref e) => NodeData::Markup(format!("<?{}?>", lossy(e))),
                Event::DocType(ref e) => NodeData::Markup(format!("<!DOCTYPE {}>", lossy(e))),
            };

            let opens_scope = matches!(event, Event::Start(_));
            let id = self.alloc(data);
            let owner = stack.last().copied().unwrap_or(Self::ROOT);
            self.append_child(owner, id);
            if opens_scope {
                stack.push(id);
            }
        }

        if !stack.is_empty() {
            return Err(format!("{} unclosed element(s) at end of input", stack.len()));
        }
        Ok(())
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Serialize the tree back to markup
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_node(Self::ROOT, &mut out);
        out
    }

    /// Serialize a single node and its subtree
    pub fn serialize_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        match &node.data {
            NodeData::Document => {
                for &child in &node.children {
                    self.write_node(child, out);
                }
            }
            NodeData::Text(raw) | NodeData::Markup(raw) => out.push_str(raw),
            NodeData::Element(el) => {
                out.push('<');
                match &el.raw_start {
                    Some(raw) => out.push_str(raw),
                    None => {
                        out.push_str(&el.name);
                        for (key, value) in &el.attrs {
                            let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
                        }
                    }
                }
                if node.children.is_empty() && el.self_closing {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &node.children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(&el.name);
                    out.push('>');
                }
            }
        }
    }

    // ─── Navigation ─────────────────────────────────────────────────────────

    /// The outermost element (`w:document` for a main part)
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(Self::ROOT).next()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el.name.as_str()),
            _ => None,
        }
    }

    pub fn is(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child elements, skipping text and markup nodes
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|&child| self.name(child).is_some())
    }

    /// First child element with the given name
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(id).find(|&child| self.is(child, name))
    }

    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.element_children(id)
            .filter(|&child| self.is(child, name))
            .collect()
    }

    /// All descendant elements with the given name, in document order
    pub fn descendants(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_descendants(id, name, &mut found);
        found
    }

    fn collect_descendants(&self, id: NodeId, name: &str, found: &mut Vec<NodeId>) {
        for &child in &self.nodes[id.0].children {
            if self.is(child, name) {
                found.push(child);
            }
            self.collect_descendants(child, name, found);
        }
    }

    /// Next sibling that is an element, skipping whitespace text between tags
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&s| self.name(s).is_some())
    }

    /// Whether the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == Self::ROOT {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Unescaped text of a text node
    pub fn text(&self, id: NodeId) -> Option<String> {
        match &self.nodes[id.0].data {
            NodeData::Text(raw) => Some(unescape_lossy(raw)),
            NodeData::Markup(raw) if raw.starts_with("<![CDATA[") => Some(
                raw.trim_start_matches("<![CDATA[")
                    .trim_end_matches("]]>")
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Concatenated unescaped text of all text nodes below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(text) = self.text(id) {
            out.push_str(&text);
        }
        for &child in &self.nodes[id.0].children {
            self.collect_text(child, out);
        }
    }

    // ─── Attributes ─────────────────────────────────────────────────────────

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => el
                .attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            match el.attrs.iter_mut().find(|(k, _)| k == key) {
                Some((_, existing)) if existing == value => return,
                Some((_, existing)) => *existing = value.to_string(),
                None => el.attrs.push((key.to_string(), value.to_string())),
            }
            el.raw_start = None;
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> bool {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            let before = el.attrs.len();
            el.attrs.retain(|(k, _)| k != key);
            if el.attrs.len() != before {
                el.raw_start = None;
                return true;
            }
        }
        false
    }

    // ─── Construction and mutation ──────────────────────────────────────────

    /// Create a detached, empty element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_with(name, &[])
    }

    /// Create a detached element carrying the given attributes
    pub fn create_element_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.alloc(NodeData::Element(Element {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            raw_start: None,
            self_closing: true,
        }))
    }

    /// Create a detached text node; `text` is escaped on the way in
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(escape(text).into_owned()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert `child` immediately before `reference`
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            self.detach(child);
            let pos = self.position(parent, reference);
            self.insert_child(parent, pos, child);
        }
    }

    /// Insert `child` immediately after `reference`
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        if let Some(parent) = self.parent(reference) {
            self.detach(child);
            let pos = self.position(parent, reference);
            self.insert_child(parent, pos + 1, child);
        }
    }

    fn position(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
            .unwrap_or(self.nodes[parent.0].children.len())
    }

    /// Remove a node from its parent; the node and its subtree stay valid
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Replace the content of an element with a single text node
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Find a child element by name, creating it at its schema position if absent
    ///
    /// `order` lists the element names allowed under `parent` in the order the
    /// schema requires; a new child is placed before the first existing
    /// sibling that must follow it.
    pub fn ensure_child(&mut self, parent: NodeId, name: &str, order: &[&str]) -> NodeId {
        if let Some(existing) = self.child(parent, name) {
            return existing;
        }
        let child = self.create_element(name);
        self.insert_ordered(parent, child, order);
        child
    }

    /// Replace any child element named like `child` with `child` itself
    pub fn replace_child(&mut self, parent: NodeId, child: NodeId, order: &[&str]) {
        let Some(name) = self.name(child).map(str::to_string) else {
            return;
        };
        for old in self.children_named(parent, &name) {
            self.detach(old);
        }
        self.insert_ordered(parent, child, order);
    }

    /// Insert `child` under `parent` respecting the element order in `order`
    pub fn insert_ordered(&mut self, parent: NodeId, child: NodeId, order: &[&str]) {
        let rank = |tree: &Self, id: NodeId| {
            tree.name(id)
                .and_then(|n| order.iter().position(|o| *o == n))
        };
        let Some(child_rank) = rank(self, child) else {
            self.append_child(parent, child);
            return;
        };
        let follower = self
            .element_children(parent)
            .find(|&sibling| rank(self, sibling).is_some_and(|r| r > child_rank));
        match follower {
            Some(sibling) => self.insert_before(sibling, child),
            None => self.append_child(parent, child),
        }
    }
}

fn element_from_start(start: &BytesStart, self_closing: bool) -> Result<Element, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("bad attribute on <{name}>: {e}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("bad attribute value on <{name}>: {e}"))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        raw_start: Some(lossy(start)),
        self_closing,
    })
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn unescape_lossy(raw: &str) -> String {
    unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
