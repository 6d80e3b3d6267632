use super::toggle::ToggleElement;
use crate::Result;
use crate::dom::{NodeKey, Page, Selector, ToggleKind, is_checked};
use crate::settings::Policy;
use crate::timing::{Timing, pause};
use std::collections::HashSet;

/// Re-queries that must come back empty in a row before content counts as settled
const QUIET_REQUERIES: u32 = 2;

/// Finds the toggles of a section that are on and may be switched off
#[derive(Debug, Clone, Copy)]
pub struct Collector<'a> {
    pub policy: &'a Policy,
    pub timing: &'a Timing,
    pub max_requeries: u32,
}

impl Collector<'_> {
    /// Collect the section's toggles that are on and allowed by the policy.
    ///
    /// On the first pass, content that renders after the initial query is
    /// picked up by a bounded number of delayed re-queries.
    pub async fn collect<P>(
        &self,
        page: &P,
        section: &str,
        root: &P::Node,
        first_pass: bool,
    ) -> Result<Vec<ToggleElement<P::Node>>>
    where
        P: Page + ?Sized,
    {
        if !self.policy.section_allowed(section) {
            tracing::debug!("Section '{}' is excluded", section);
            return Ok(Vec::new());
        }

        let selector = Selector::toggles();
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        merge(page, page.query_all(Some(root), &selector).await?, &mut seen, &mut nodes);

        if first_pass && !nodes.is_empty() {
            self.requery(page, section, root, &selector, &mut seen, &mut nodes)
                .await?;
        }

        let mut collected = Vec::new();
        for node in nodes {
            let state = match page.read(&node).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("Skipping unreadable element in '{}': {}", section, e);
                    continue;
                }
            };
            let Some(kind) = ToggleKind::classify(&state) else {
                continue;
            };
            let identity = state.identity().map(str::to_string);
            if !is_checked(&state) {
                continue;
            }
            if !self.policy.allows(identity.as_deref(), section) {
                tracing::debug!("Preserving {:?} in '{}'", identity, section);
                continue;
            }
            collected.push(ToggleElement {
                node,
                kind,
                identity,
            });
        }

        tracing::debug!("Section '{}': {} toggles to switch off", section, collected.len());
        Ok(collected)
    }

    async fn requery<P>(
        &self,
        page: &P,
        section: &str,
        root: &P::Node,
        selector: &Selector,
        seen: &mut HashSet<NodeKey>,
        nodes: &mut Vec<P::Node>,
    ) -> Result<()>
    where
        P: Page + ?Sized,
    {
        let mut quiet = 0;
        for attempt in 1..=self.max_requeries {
            pause(self.timing.lazy_load).await;
            let added = merge(page, page.query_all(Some(root), selector).await?, seen, nodes);
            if added == 0 {
                quiet += 1;
                if quiet >= QUIET_REQUERIES {
                    tracing::debug!("Section '{}' settled after {} re-queries", section, attempt);
                    return Ok(());
                }
            } else {
                tracing::debug!("Section '{}': {} more toggles rendered", section, added);
                quiet = 0;
            }
        }

        if quiet == 0 {
            tracing::warn!(
                "Section '{}' was still rendering toggles after {} re-queries; continuing with {}",
                section,
                self.max_requeries,
                nodes.len()
            );
        }
        Ok(())
    }
}

fn merge<P>(
    page: &P,
    found: Vec<P::Node>,
    seen: &mut HashSet<NodeKey>,
    nodes: &mut Vec<P::Node>,
) -> usize
where
    P: Page + ?Sized,
{
    let before = nodes.len();
    for node in found {
        if seen.insert(page.node_key(&node)) {
            nodes.push(node);
        }
    }
    nodes.len() - before
}
