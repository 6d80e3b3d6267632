use super::{NodeKey, Page, Selector};
use crate::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// Label lookups for a single run.
///
/// A node key may point at entirely different content once the page
/// re-renders, so a cache is created per run and dropped with it.
#[derive(Debug, Default)]
pub struct LabelCache {
    labels: Mutex<HashMap<NodeKey, String>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: NodeKey) -> Option<String> {
        self.labels.lock().ok()?.get(&key).cloned()
    }

    fn insert(&self, key: NodeKey, label: String) {
        if let Ok(mut labels) = self.labels.lock() {
            labels.insert(key, label);
        }
    }
}

/// Best-effort human readable label for a toggle.
///
/// Tries, in order: `aria-label`, a `label[for=id]` under `root`, the closest
/// enclosing `label` (or one next to the element), then the text of the
/// closest card-like container.
pub async fn label_text<P>(
    page: &P,
    root: &P::Node,
    node: &P::Node,
    cache: Option<&LabelCache>,
) -> Result<String>
where
    P: Page + ?Sized,
{
    let key = page.node_key(node);
    if let Some(cached) = cache.and_then(|c| c.get(key)) {
        return Ok(cached);
    }

    let state = page.read(node).await?;
    let mut label = String::new();

    if let Some(aria) = state.aria_label.as_deref().filter(|l| !l.is_empty()) {
        label = aria.to_string();
    } else if let Some(id) = state.id.as_deref().filter(|id| !id.is_empty()) {
        if let Some(found) = page.query_first(Some(root), &Selector::label_for(id)).await? {
            label = page.read(&found).await?.text;
        }
    }

    if label.is_empty() {
        let near = match page.closest_text(node, &Selector::label()).await? {
            Some(text) => Some(text),
            None => page.parent_query_text(node, &Selector::label()).await?,
        };
        if let Some(text) = near {
            label = text;
        }
    }

    if label.is_empty() {
        label = page
            .closest_text(node, &Selector::card())
            .await?
            .unwrap_or_default();
    }

    if let Some(cache) = cache {
        if !label.is_empty() {
            cache.insert(key, label.clone());
        }
    }

    Ok(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryPage, NodeSpec};

    async fn label_of(page: &MemoryPage, id: &str) -> String {
        let root = page.document();
        let node = page.by_id(id).await.unwrap().unwrap();
        label_text(page, &root, &node, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_aria_label_wins() {
        let page = MemoryPage::new(
            NodeSpec::element("div")
                .child(NodeSpec::checkbox("a", true).attr("aria-label", "Rust"))
                .child(NodeSpec::element("label").attr("for", "a").text("ignored")),
        );
        assert_eq!(label_of(&page, "a").await, "Rust");
    }

    #[tokio::test]
    async fn test_label_for_id() {
        let page = MemoryPage::new(
            NodeSpec::element("div")
                .child(NodeSpec::checkbox("b", true))
                .child(NodeSpec::element("label").attr("for", "b").text("  Python ")),
        );
        assert_eq!(label_of(&page, "b").await, "Python");
    }

    #[tokio::test]
    async fn test_enclosing_label_then_card_text() {
        let page = MemoryPage::new(
            NodeSpec::element("ul")
                .child(
                    NodeSpec::element("label")
                        .text("Go")
                        .child(NodeSpec::checkbox("c", true)),
                )
                .child(
                    NodeSpec::element("li")
                        .text("Kotlin")
                        .child(NodeSpec::checkbox("d", true)),
                ),
        );
        assert_eq!(label_of(&page, "c").await, "Go");
        assert_eq!(label_of(&page, "d").await, "Kotlin");
    }

    #[tokio::test]
    async fn test_no_label_is_empty() {
        let page = MemoryPage::new(NodeSpec::element("ul").child(NodeSpec::checkbox("e", true)));
        assert_eq!(label_of(&page, "e").await, "");
    }

    #[tokio::test]
    async fn test_cache_is_used_within_a_run() {
        let page = MemoryPage::new(
            NodeSpec::element("div").child(NodeSpec::checkbox("f", true).attr("aria-label", "Old")),
        );
        let root = page.document();
        let node = page.by_id("f").await.unwrap().unwrap();
        let cache = LabelCache::new();

        assert_eq!(label_text(&page, &root, &node, Some(&cache)).await.unwrap(), "Old");
        page.set_attribute(&node, "aria-label", "New").await;
        assert_eq!(label_text(&page, &root, &node, Some(&cache)).await.unwrap(), "Old");

        // A fresh cache, as a new run would have, sees the new content
        let fresh = LabelCache::new();
        assert_eq!(label_text(&page, &root, &node, Some(&fresh)).await.unwrap(), "New");
    }
}
