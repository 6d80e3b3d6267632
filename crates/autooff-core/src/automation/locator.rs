use crate::Result;
use crate::dom::{Page, Selector, Simple, ToggleKind};
use crate::settings::aliases_for;
use std::iter;

/// Resolve a logical section name to its root element.
///
/// Tries the exact id, then an id prefix (generated suffixes), then the same
/// two steps for every alias. A section missing from the page is `Ok(None)`.
pub async fn locate<P>(
    page: &P,
    logical_id: &str,
    alias_table: &[(&str, &[&str])],
) -> Result<Option<P::Node>>
where
    P: Page + ?Sized,
{
    let aliases = aliases_for(alias_table, logical_id).iter().copied();
    let candidates = iter::once(logical_id).chain(aliases);

    for candidate in candidates {
        if let Some(node) = page.by_id(candidate).await? {
            tracing::debug!("Section '{}' matched id '{}'", logical_id, candidate);
            return Ok(Some(node));
        }

        // Generated toggles such as `skill-rust` share the prefix; they are
        // never a section root.
        for node in page.query_all(None, &Selector::id_prefix(candidate)).await? {
            let state = page.read(&node).await?;
            if ToggleKind::classify(&state).is_none() {
                tracing::debug!(
                    "Section '{}' matched id prefix '{}' ({})",
                    logical_id,
                    candidate,
                    state.id.as_deref().unwrap_or_default()
                );
                return Ok(Some(node));
            }
        }
    }

    Ok(None)
}

/// An element that looks like a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredSection {
    pub id: String,
    pub has_accordion: bool,
    pub checkbox_count: usize,
}

/// List every element with an id that holds an accordion button or checkboxes.
///
/// Diagnostic only; each candidate costs a few page round trips.
pub async fn discover<P>(page: &P) -> Result<Vec<DiscoveredSection>>
where
    P: Page + ?Sized,
{
    let checkboxes = Selector::any_of([
        Simple::tag("input").with_attr_eq("type", "checkbox"),
        Simple::any().with_attr_eq("role", "checkbox"),
    ]);

    let mut found = Vec::new();
    for node in page.query_all(None, &Selector::with_id()).await? {
        let has_accordion = page
            .query_first(Some(&node), &Selector::accordion_button())
            .await?
            .is_some();
        let checkbox_count = page.query_all(Some(&node), &checkboxes).await?.len();

        if has_accordion || checkbox_count > 0 {
            let id = page.read(&node).await?.id.unwrap_or_default();
            found.push(DiscoveredSection {
                id,
                has_accordion,
                checkbox_count,
            });
        }
    }
    Ok(found)
}
