//! In-memory [`DocumentTree`] built from a nested element snapshot.
//!
//! Snapshots are plain JSON:
//!
//! ```json
//! { "class": "groupContainer", "children": [
//!     { "class": "courseLine", "children": [
//!         { "class": "prefixCourseNumber", "text": "MATH 1A" },
//!         { "text": "Calculus 5.00 units" } ] } ] }
//! ```

use crate::domain::ports::{DocumentTree, NodeId};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_tag() -> String {
    "div".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// Text that precedes the children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,
}

impl Default for ElementNode {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            class: None,
            attrs: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }
}

impl ElementNode {
    pub fn div() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ElementNode>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone)]
struct FlatNode {
    class: Option<String>,
    attrs: BTreeMap<String, String>,
    tag: String,
    text: Option<String>,
    children: Vec<NodeId>,
}

/// Arena-backed tree; node ids are preorder positions.
#[derive(Debug, Clone)]
pub struct ElementTree {
    nodes: Vec<FlatNode>,
}

impl ElementTree {
    pub fn new(root: ElementNode) -> Self {
        let mut nodes = Vec::new();
        Self::flatten(root, &mut nodes);
        Self { nodes }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let root: ElementNode = serde_json::from_str(content)?;
        Ok(Self::new(root))
    }

    pub fn from_json_slice(data: &[u8]) -> Result<Self> {
        let root: ElementNode = serde_json::from_slice(data)?;
        Ok(Self::new(root))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn flatten(node: ElementNode, nodes: &mut Vec<FlatNode>) -> NodeId {
        let id = NodeId(nodes.len());
        nodes.push(FlatNode {
            class: node.class,
            attrs: node.attrs,
            tag: node.tag,
            text: node.text,
            children: Vec::new(),
        });
        let children: Vec<NodeId> = node
            .children
            .into_iter()
            .map(|child| Self::flatten(child, nodes))
            .collect();
        nodes[id.0].children = children;
        id
    }

    fn collect_text(&self, node: NodeId, fragments: &mut Vec<String>) {
        let Some(data) = self.nodes.get(node.0) else {
            return;
        };
        if let Some(text) = &data.text {
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !normalized.is_empty() {
                fragments.push(normalized);
            }
        }
        for child in &data.children {
            self.collect_text(*child, fragments);
        }
    }
}

impl DocumentTree for ElementTree {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn text_of(&self, node: NodeId) -> String {
        let mut fragments = Vec::new();
        self.collect_text(node, &mut fragments);
        fragments.join(" ")
    }

    fn attr_of(&self, node: NodeId, name: &str) -> Option<String> {
        let data = self.nodes.get(node.0)?;
        match name {
            "class" => data
                .class
                .clone()
                .or_else(|| data.attrs.get("class").cloned()),
            "tag" => Some(data.tag.clone()),
            other => data.attrs.get(other).cloned(),
        }
    }
}
