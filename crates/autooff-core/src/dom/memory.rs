//! In-memory page backend.
//!
//! `MemoryPage` keeps a small element tree and reproduces the page behaviours
//! the automation depends on: checkbox and ARIA toggles flip on activation,
//! accordion buttons flip `aria-expanded` and the `hidden` attribute of the
//! region they control, and content can appear late (after a number of
//! queries) or only after another element is clicked. It backs `autooff
//! simulate` and the test suites.

use super::{ElementState, NodeKey, Page, Selector, Simple};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Declarative description of an element and its subtree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
    /// Activations are counted but have no effect
    #[serde(default)]
    pub inert: bool,
    /// Ids of detached nodes that get attached when this node is activated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reveals: Vec<String>,
    /// The subtree stays out of query results until this many queries ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appears_after_queries: Option<u32>,
    /// Not part of the document until revealed
    #[serde(default)]
    pub detached: bool,
}

impl NodeSpec {
    pub fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn inert(mut self) -> Self {
        self.inert = true;
        self
    }

    pub fn reveals(mut self, id: &str) -> Self {
        self.reveals.push(id.to_string());
        self
    }

    pub fn appears_after_queries(mut self, queries: u32) -> Self {
        self.appears_after_queries = Some(queries);
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    /// `<input type="checkbox" id=…>`
    pub fn checkbox(id: &str, checked: bool) -> Self {
        Self::element("input")
            .id(id)
            .attr("type", "checkbox")
            .checked(checked)
    }

    /// `<button role="switch" aria-checked=…>`
    pub fn switch(id: &str, on: bool) -> Self {
        Self::element("button")
            .id(id)
            .attr("role", "switch")
            .attr("aria-checked", if on { "true" } else { "false" })
    }

    /// A collapsible section in the shape the target page renders:
    /// `section#id > h3 > button[aria-controls]` plus the controlled region.
    pub fn accordion(
        id: &str,
        expanded: bool,
        content: impl IntoIterator<Item = NodeSpec>,
    ) -> Self {
        let region_id = format!("{}-region", id);
        let mut region = Self::element("div")
            .id(&region_id)
            .attr("role", "region")
            .children(content);
        if !expanded {
            region = region.attr("hidden", "");
        }

        Self::element("section")
            .id(id)
            .child(
                Self::element("h3").child(
                    Self::element("button")
                        .attr("aria-controls", &region_id)
                        .attr("aria-expanded", if expanded { "true" } else { "false" })
                        .text(id),
                ),
            )
            .child(region)
    }

    fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(Error::Fixture("element with empty tag".to_string()));
        }
        self.children.iter().try_for_each(NodeSpec::validate)
    }
}

/// Handle to a node of a `MemoryPage`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryNode(usize);

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    checked: bool,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    inert: bool,
    reveals: Vec<String>,
    appears_after_queries: Option<u32>,
    detached: bool,
    activations: u32,
}

#[derive(Debug)]
struct Document {
    nodes: Vec<Node>,
    queries: u32,
}

impl Document {
    fn from_spec(root: NodeSpec) -> Self {
        let mut doc = Document {
            nodes: vec![Node {
                tag: "#document".to_string(),
                attrs: BTreeMap::new(),
                checked: false,
                text: String::new(),
                parent: None,
                children: Vec::new(),
                inert: true,
                reveals: Vec::new(),
                appears_after_queries: None,
                detached: false,
                activations: 0,
            }],
            queries: 0,
        };
        doc.insert(0, root);
        doc
    }

    fn insert(&mut self, parent: usize, spec: NodeSpec) {
        let mut attrs = spec.attrs;
        if let Some(id) = spec.id {
            attrs.insert("id".to_string(), id);
        }
        let idx = self.nodes.len();
        self.nodes.push(Node {
            tag: spec.tag.to_ascii_lowercase(),
            attrs,
            checked: spec.checked,
            text: spec.text.unwrap_or_default(),
            parent: Some(parent),
            children: Vec::new(),
            inert: spec.inert,
            reveals: spec.reveals,
            appears_after_queries: spec.appears_after_queries,
            detached: spec.detached,
            activations: 0,
        });
        self.nodes[parent].children.push(idx);
        for child in spec.children {
            self.insert(idx, child);
        }
    }

    fn node(&self, idx: usize) -> Result<&Node> {
        self.nodes
            .get(idx)
            .ok_or_else(|| Error::Page(format!("unknown node {}", idx)))
    }

    fn visible_in_tree(&self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        !node.detached && node.appears_after_queries.is_none_or(|n| self.queries >= n)
    }

    /// Attached to the document: the node and all its ancestors are present
    fn is_present(&self, idx: usize) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            if !self.visible_in_tree(i) {
                return false;
            }
            current = self.nodes[i].parent;
        }
        true
    }

    fn attr(&self, idx: usize, name: &str) -> Option<String> {
        self.nodes[idx].attrs.get(name).cloned()
    }

    fn matches_simple(&self, idx: usize, simple: &Simple) -> bool {
        let lookup = |name: &str| self.attr(idx, name);
        simple.matches(&self.nodes[idx].tag, &lookup)
    }

    fn matches(&self, idx: usize, selector: &Selector) -> bool {
        if idx == 0 {
            return false;
        }
        selector.alternatives().iter().any(|compound| {
            if !self.matches_simple(idx, &compound.target) {
                return false;
            }
            match &compound.ancestor {
                None => true,
                Some(ancestor) => {
                    let mut current = self.nodes[idx].parent;
                    while let Some(i) = current {
                        if i != 0 && self.matches_simple(i, ancestor) {
                            return true;
                        }
                        current = self.nodes[i].parent;
                    }
                    false
                }
            }
        })
    }

    fn descendants(&self, scope: usize, out: &mut Vec<usize>) {
        for &child in &self.nodes[scope].children {
            if self.visible_in_tree(child) {
                out.push(child);
                self.descendants(child, out);
            }
        }
    }

    fn text_content(&self, idx: usize) -> String {
        let mut text = self.nodes[idx].text.clone();
        for &child in &self.nodes[idx].children {
            if self.visible_in_tree(child) {
                text.push_str(&self.text_content(child));
            }
        }
        text
    }

    fn find_ids(&self, id: &str) -> Vec<usize> {
        (1..self.nodes.len())
            .filter(|&i| self.nodes[i].attrs.get("id").map(String::as_str) == Some(id))
            .collect()
    }

    fn state(&self, idx: usize) -> ElementState {
        let node = &self.nodes[idx];
        let attr = |name: &str| node.attrs.get(name).cloned();
        ElementState {
            tag: node.tag.clone(),
            input_type: attr("type"),
            id: attr("id"),
            data_id: attr("data-id"),
            role: attr("role"),
            checked: node.checked,
            aria_checked: attr("aria-checked"),
            aria_pressed: attr("aria-pressed"),
            aria_expanded: attr("aria-expanded"),
            aria_controls: attr("aria-controls"),
            aria_label: attr("aria-label"),
            label_for: attr("for"),
            hidden: node.attrs.contains_key("hidden"),
            text: self.text_content(idx).trim().to_string(),
        }
    }

    fn activate(&mut self, idx: usize) {
        self.nodes[idx].activations += 1;
        if self.nodes[idx].inert || !self.is_present(idx) {
            return;
        }

        let is_checkbox = {
            let node = &self.nodes[idx];
            node.tag == "input" && node.attrs.get("type").map(String::as_str) == Some("checkbox")
        };
        if is_checkbox {
            self.nodes[idx].checked = !self.nodes[idx].checked;
        }

        for name in ["aria-checked", "aria-pressed"] {
            if let Some(value) = self.nodes[idx].attrs.get_mut(name) {
                *value = flip(value);
            }
        }

        if let Some(expanded) = self.nodes[idx].attrs.get("aria-expanded").cloned() {
            let now_expanded = expanded != "true";
            self.nodes[idx]
                .attrs
                .insert("aria-expanded".to_string(), now_expanded.to_string());
            if let Some(region_id) = self.attr(idx, "aria-controls") {
                for region in self.find_ids(&region_id) {
                    if now_expanded {
                        self.nodes[region].attrs.remove("hidden");
                    } else {
                        self.nodes[region]
                            .attrs
                            .insert("hidden".to_string(), String::new());
                    }
                }
            }
        }

        for id in self.nodes[idx].reveals.clone() {
            for target in self.find_ids(&id) {
                self.nodes[target].detached = false;
            }
        }
    }
}

fn flip(value: &str) -> String {
    if value == "true" { "false" } else { "true" }.to_string()
}

/// A page held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryPage {
    doc: Arc<Mutex<Document>>,
}

impl MemoryPage {
    pub fn new(root: NodeSpec) -> Self {
        Self {
            doc: Arc::new(Mutex::new(Document::from_spec(root))),
        }
    }

    /// Build a page from a JSON fixture: one root `NodeSpec` object.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let spec: NodeSpec = serde_json::from_str(content)?;
        spec.validate()?;
        Ok(Self::new(spec))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading page fixture from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The document node; queries scoped to it cover the whole page
    pub fn document(&self) -> MemoryNode {
        MemoryNode(0)
    }

    /// Number of activations dispatched to the element with this id
    pub async fn activations(&self, id: &str) -> u32 {
        let doc = self.doc.lock().await;
        doc.find_ids(id)
            .into_iter()
            .map(|i| doc.nodes[i].activations)
            .sum()
    }

    pub async fn total_activations(&self) -> u32 {
        let doc = self.doc.lock().await;
        doc.nodes.iter().map(|n| n.activations).sum()
    }

    /// On/off state of the element with this id, regardless of attachment
    pub async fn is_on(&self, id: &str) -> Option<bool> {
        let doc = self.doc.lock().await;
        let idx = doc.find_ids(id).into_iter().next()?;
        Some(super::is_checked(&doc.state(idx)))
    }

    pub async fn set_checked(&self, id: &str, checked: bool) {
        let mut doc = self.doc.lock().await;
        for idx in doc.find_ids(id) {
            doc.nodes[idx].checked = checked;
        }
    }

    pub async fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) {
        let mut doc = self.doc.lock().await;
        if let Some(n) = doc.nodes.get_mut(node.0) {
            n.attrs.insert(name.to_string(), value.to_string());
        }
    }
}

#[async_trait]
impl Page for MemoryPage {
    type Node = MemoryNode;

    fn node_key(&self, node: &MemoryNode) -> NodeKey {
        NodeKey(node.0 as i64)
    }

    async fn query_all(
        &self,
        scope: Option<&MemoryNode>,
        selector: &Selector,
    ) -> Result<Vec<MemoryNode>> {
        let mut doc = self.doc.lock().await;
        doc.queries += 1;

        let scope = scope.map(|n| n.0).unwrap_or(0);
        doc.node(scope)?;
        if !doc.is_present(scope) {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        doc.descendants(scope, &mut candidates);
        Ok(candidates
            .into_iter()
            .filter(|&i| doc.matches(i, selector))
            .map(MemoryNode)
            .collect())
    }

    async fn read(&self, node: &MemoryNode) -> Result<ElementState> {
        let doc = self.doc.lock().await;
        doc.node(node.0)?;
        Ok(doc.state(node.0))
    }

    async fn activate(&self, node: &MemoryNode) -> Result<()> {
        let mut doc = self.doc.lock().await;
        doc.node(node.0)?;
        doc.activate(node.0);
        Ok(())
    }

    async fn closest_text(&self, node: &MemoryNode, selector: &Selector) -> Result<Option<String>> {
        let doc = self.doc.lock().await;
        doc.node(node.0)?;
        let mut current = Some(node.0);
        while let Some(i) = current {
            if doc.matches(i, selector) {
                return Ok(Some(doc.text_content(i).trim().to_string()));
            }
            current = doc.nodes[i].parent;
        }
        Ok(None)
    }

    async fn parent_query_text(
        &self,
        node: &MemoryNode,
        selector: &Selector,
    ) -> Result<Option<String>> {
        let doc = self.doc.lock().await;
        let Some(parent) = doc.node(node.0)?.parent else {
            return Ok(None);
        };
        let mut candidates = Vec::new();
        doc.descendants(parent, &mut candidates);
        Ok(candidates
            .into_iter()
            .find(|&i| doc.matches(i, selector))
            .map(|i| doc.text_content(i).trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_in_document_order() {
        let page = MemoryPage::new(
            NodeSpec::element("div")
                .child(NodeSpec::checkbox("a", true))
                .child(NodeSpec::element("span").child(NodeSpec::switch("b", false)))
                .child(NodeSpec::checkbox("c", false)),
        );
        let found = page.query_all(None, &Selector::toggles()).await.unwrap();
        let mut ids = Vec::new();
        for node in &found {
            ids.push(page.read(node).await.unwrap().id.unwrap());
        }
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_activation_flips_state() {
        let page = MemoryPage::new(
            NodeSpec::element("div")
                .child(NodeSpec::checkbox("a", true))
                .child(NodeSpec::switch("b", true))
                .child(NodeSpec::checkbox("c", true).inert()),
        );
        for id in ["a", "b", "c"] {
            let node = page.by_id(id).await.unwrap().unwrap();
            page.activate(&node).await.unwrap();
        }
        assert_eq!(page.is_on("a").await, Some(false));
        assert_eq!(page.is_on("b").await, Some(false));
        assert_eq!(page.is_on("c").await, Some(true));
        assert_eq!(page.activations("c").await, 1);
    }

    #[tokio::test]
    async fn test_accordion_button_controls_region() {
        let page = MemoryPage::new(NodeSpec::accordion(
            "skills",
            false,
            [NodeSpec::checkbox("a", true)],
        ));
        let region = page.by_id("skills-region").await.unwrap().unwrap();
        assert!(page.read(&region).await.unwrap().hidden);

        let button = page
            .query_first(None, &Selector::accordion_button())
            .await
            .unwrap()
            .unwrap();
        page.activate(&button).await.unwrap();

        assert!(!page.read(&region).await.unwrap().hidden);
        assert!(page.read(&button).await.unwrap().is_expanded());
    }

    #[tokio::test]
    async fn test_late_and_revealed_content() {
        let page = MemoryPage::new(
            NodeSpec::element("div")
                .child(NodeSpec::checkbox("trigger", true).reveals("later"))
                .child(NodeSpec::checkbox("later", true).detached())
                .child(NodeSpec::checkbox("lazy", true).appears_after_queries(3)),
        );
        let count = |page: &MemoryPage| {
            let page = page.clone();
            async move { page.query_all(None, &Selector::toggles()).await.unwrap().len() }
        };

        assert_eq!(count(&page).await, 1);
        assert_eq!(count(&page).await, 1);
        assert_eq!(count(&page).await, 2);

        let trigger = page.by_id("trigger").await.unwrap().unwrap();
        page.activate(&trigger).await.unwrap();
        assert_eq!(count(&page).await, 3);
    }

    #[tokio::test]
    async fn test_fixture_parsing() {
        let page = MemoryPage::from_json_str(
            r#"{
                "tag": "section",
                "id": "skills",
                "children": [
                    {"tag": "input", "id": "a", "attrs": {"type": "checkbox"}, "checked": true}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.is_on("a").await, Some(true));
        assert!(page.by_id("skills").await.unwrap().is_some());
    }

    #[test]
    fn test_fixture_rejects_empty_tag() {
        let result = MemoryPage::from_json_str(r#"{"tag": "div", "children": [{"tag": ""}]}"#);
        assert!(matches!(result, Err(Error::Fixture(_))));
    }
}
