pub mod xml;

/// Default namespace of every Akoma Ntoso element we emit.
pub const AKN_NAMESPACE: &str = "http://docs.oasis-open.org/legaldocml/ns/akn/3.0/CSD03";

/// Index of a node inside its [`Document`] arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Element(NodeId),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Content>,
    pub parent: Option<NodeId>,
}

/// Element tree stored as an arena. Children are owned by index; `parent` is the
/// only back-edge and lets a cursor move upward without holding references.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        Document {
            nodes: vec![Node {
                tag: root_tag.to_string(),
                attrs: Vec::new(),
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id].tag
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Append a child element under `parent` and return its id.
    pub fn append(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent].children.push(Content::Element(id));
        id
    }

    /// Append an element that holds a single run of text.
    pub fn append_text_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let id = self.append(parent, tag, attrs);
        self.push_text(id, text);
        id
    }

    pub fn push_text(&mut self, id: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        self.nodes[id].children.push(Content::Text(text.to_string()));
    }

    /// Replace all direct text children of `id` with a single run, keeping elements.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let node = &mut self.nodes[id];
        node.children.retain(|c| matches!(c, Content::Element(_)));
        node.children.insert(0, Content::Text(text.to_string()));
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        let attrs = &mut self.nodes[id].attrs;
        match attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id]
            .attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Direct text of `id`, ignoring text nested in child elements.
    pub fn text(&self, id: NodeId) -> String {
        self.nodes[id]
            .children
            .iter()
            .filter_map(|c| match c {
                Content::Text(t) => Some(t.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id].children.iter().filter_map(|c| match c {
            Content::Element(child) => Some(*child),
            Content::Text(_) => None,
        })
    }

    pub fn first_child(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.child_elements(id).find(|&c| self.tag(c) == tag)
    }

    /// Follow a chain of first-child tags, e.g. `["debate", "meta"]`.
    pub fn path(&self, from: NodeId, tags: &[&str]) -> Option<NodeId> {
        tags.iter()
            .try_fold(from, |id, tag| self.first_child(id, tag))
    }

    /// Every element with `tag`, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(self.root(), &mut |id| {
            if self.tag(id) == tag {
                found.push(id);
            }
        });
        found
    }

    fn walk(&self, id: NodeId, visit: &mut impl FnMut(NodeId)) {
        visit(id);
        for child in self.child_elements(id) {
            self.walk(child, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_links_parent_and_child() {
        let mut doc = Document::new("debate");
        let meta = doc.append(doc.root(), "meta", &[]);
        let preface = doc.append(doc.root(), "preface", &[]);
        assert_eq!(doc.parent(meta), Some(doc.root()));
        assert_eq!(doc.child_elements(doc.root()).collect::<Vec<_>>(), vec![meta, preface]);
        assert_eq!(doc.first_child(doc.root(), "preface"), Some(preface));
    }

    #[test]
    fn set_attr_overwrites_existing_value() {
        let mut doc = Document::new("FRBRthis");
        doc.set_attr(0, "value", "a");
        doc.set_attr(0, "value", "b");
        assert_eq!(doc.attr(0, "value"), Some("b"));
        assert_eq!(doc.node(0).attrs.len(), 1);
    }

    #[test]
    fn set_text_keeps_child_elements() {
        let mut doc = Document::new("p");
        doc.push_text(0, "Monday, ");
        let date = doc.append_text_element(0, "docDate", &[], "01 January 2014");
        doc.set_text(0, "Tuesday, ");
        assert_eq!(doc.text(0), "Tuesday, ");
        assert_eq!(doc.node(0).children[1], Content::Element(date));
    }

    #[test]
    fn path_and_find_all() {
        let mut doc = Document::new("akomaNtoso");
        let debate = doc.append(0, "debate", &[]);
        let body = doc.append(debate, "debateBody", &[]);
        let s1 = doc.append(body, "debateSection", &[]);
        let s2 = doc.append(s1, "debateSection", &[]);
        assert_eq!(doc.path(0, &["debate", "debateBody"]), Some(body));
        assert_eq!(doc.path(0, &["debate", "meta"]), None);
        assert_eq!(doc.find_all("debateSection"), vec![s1, s2]);
    }
}
