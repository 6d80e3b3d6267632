use super::{ElementState, Selector};
use crate::Result;
use async_trait::async_trait;

/// Stable identity of a node for the lifetime of the page it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub i64);

/// Read and activation access to a live page.
///
/// Nodes are live handles into content owned by the page; any of them may be
/// re-rendered or removed between two calls, so callers re-query rather than
/// hold on to them across runs.
#[async_trait]
pub trait Page: Send + Sync {
    type Node: Clone + Send + Sync;

    fn node_key(&self, node: &Self::Node) -> NodeKey;

    /// All elements under `scope` (or the whole document) matching `selector`,
    /// in document order. The scope element itself is never included.
    async fn query_all(
        &self,
        scope: Option<&Self::Node>,
        selector: &Selector,
    ) -> Result<Vec<Self::Node>>;

    async fn query_first(
        &self,
        scope: Option<&Self::Node>,
        selector: &Selector,
    ) -> Result<Option<Self::Node>> {
        Ok(self.query_all(scope, selector).await?.into_iter().next())
    }

    async fn by_id(&self, id: &str) -> Result<Option<Self::Node>> {
        self.query_first(None, &Selector::id(id)).await
    }

    async fn read(&self, node: &Self::Node) -> Result<ElementState>;

    /// Simulated user activation (a click)
    async fn activate(&self, node: &Self::Node) -> Result<()>;

    /// Trimmed text of the nearest inclusive ancestor matching `selector`
    async fn closest_text(&self, node: &Self::Node, selector: &Selector) -> Result<Option<String>>;

    /// Trimmed text of the first element matching `selector` under the node's parent
    async fn parent_query_text(
        &self,
        node: &Self::Node,
        selector: &Selector,
    ) -> Result<Option<String>>;
}
