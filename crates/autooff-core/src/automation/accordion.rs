use super::wait::{self, WaitOutcome};
use crate::Result;
use crate::dom::{Page, Selector};
use crate::timing::{Timing, pause};
use std::time::{Duration, Instant};

/// How an accordion ended up open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenSignal {
    /// Expanded and visible before we touched it
    AlreadyOpen,
    RegionShown,
    ButtonExpanded,
    TimedOut,
    /// Clicked, but there is no region to watch
    NoRegion,
    /// Nothing to click; the section is scanned as is
    NoButton,
}

impl OpenSignal {
    pub fn clicked(self) -> bool {
        !matches!(self, OpenSignal::AlreadyOpen | OpenSignal::NoButton)
    }
}

/// A section ready for scanning
#[derive(Debug, Clone)]
pub struct OpenedSection<N> {
    /// Content region if one was found, otherwise the section root
    pub root: N,
    pub signal: OpenSignal,
    pub elapsed: Duration,
}

/// Expand a collapsible section and wait for its content.
///
/// Returns without clicking or waiting when the section is already expanded
/// and its region visible.
pub async fn open<P>(page: &P, section: &P::Node, timing: &Timing) -> Result<OpenedSection<P::Node>>
where
    P: Page + ?Sized,
{
    let started = Instant::now();
    let button = page
        .query_first(Some(section), &Selector::accordion_button())
        .await?;
    let region = find_region(page, section, button.as_ref()).await?;

    let root = || region.clone().unwrap_or_else(|| section.clone());
    let Some(button) = button else {
        return Ok(OpenedSection {
            root: root(),
            signal: OpenSignal::NoButton,
            elapsed: started.elapsed(),
        });
    };

    let expanded = page.read(&button).await?.is_expanded();
    let visible = match &region {
        Some(region) => !page.read(region).await?.hidden,
        None => true,
    };
    if expanded && visible {
        return Ok(OpenedSection {
            root: root(),
            signal: OpenSignal::AlreadyOpen,
            elapsed: started.elapsed(),
        });
    }

    page.activate(&button).await?;

    let signal = match &region {
        Some(region) => {
            let button = &button;
            let outcome = wait::until(timing.accordion, timing.poll, move || {
                open_signal(page, button, region)
            })
            .await;
            match outcome {
                WaitOutcome::Observed(signal) => signal,
                WaitOutcome::TimedOut => OpenSignal::TimedOut,
            }
        }
        None => {
            pause(timing.no_region).await;
            OpenSignal::NoRegion
        }
    };

    if signal == OpenSignal::TimedOut {
        tracing::debug!("Accordion did not report open within {:?}", timing.accordion);
    }
    pause(timing.content_settle).await;

    Ok(OpenedSection {
        root: root(),
        signal,
        elapsed: started.elapsed(),
    })
}

async fn find_region<P>(
    page: &P,
    section: &P::Node,
    button: Option<&P::Node>,
) -> Result<Option<P::Node>>
where
    P: Page + ?Sized,
{
    if let Some(button) = button {
        let controls = page.read(button).await?.aria_controls;
        if let Some(id) = controls.as_deref().filter(|id| !id.is_empty()) {
            if let Some(region) = page.by_id(id).await? {
                return Ok(Some(region));
            }
        }
    }
    page.query_first(Some(section), &Selector::region()).await
}

async fn open_signal<P>(page: &P, button: &P::Node, region: &P::Node) -> Option<OpenSignal>
where
    P: Page + ?Sized,
{
    match page.read(region).await {
        Ok(state) if !state.hidden => return Some(OpenSignal::RegionShown),
        Ok(_) => {}
        Err(e) => tracing::debug!("Region read failed while waiting: {}", e),
    }
    match page.read(button).await {
        Ok(state) if state.is_expanded() => Some(OpenSignal::ButtonExpanded),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Button read failed while waiting: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryPage, NodeSpec};

    async fn open_section(page: &MemoryPage, id: &str) -> OpenedSection<crate::dom::MemoryNode> {
        let section = page.by_id(id).await.unwrap().unwrap();
        open(page, &section, &Timing::instant()).await.unwrap()
    }

    #[tokio::test]
    async fn test_collapsed_section_is_opened() {
        let page =
            MemoryPage::new(NodeSpec::accordion("skills", false, [NodeSpec::checkbox("a", true)]));
        let opened = open_section(&page, "skills").await;

        assert_eq!(opened.signal, OpenSignal::RegionShown);
        assert_eq!(page.read(&opened.root).await.unwrap().id.as_deref(), Some("skills-region"));
        assert_eq!(page.total_activations().await, 1);
    }

    #[tokio::test]
    async fn test_open_section_is_not_clicked() {
        let page =
            MemoryPage::new(NodeSpec::accordion("skills", true, [NodeSpec::checkbox("a", true)]));
        let opened = open_section(&page, "skills").await;

        assert_eq!(opened.signal, OpenSignal::AlreadyOpen);
        assert!(!opened.signal.clicked());
        assert_eq!(page.total_activations().await, 0);
    }

    #[tokio::test]
    async fn test_expanded_button_with_hidden_region_is_clicked() {
        let page = MemoryPage::new(
            NodeSpec::element("section")
                .id("skills")
                .child(
                    NodeSpec::element("h3").child(
                        NodeSpec::element("button")
                            .attr("aria-controls", "skills-region")
                            .attr("aria-expanded", "true"),
                    ),
                )
                .child(NodeSpec::element("div").id("skills-region").attr("hidden", "")),
        );
        let opened = open_section(&page, "skills").await;
        assert!(opened.signal.clicked());
    }

    #[tokio::test]
    async fn test_unresponsive_button_times_out() {
        let page = MemoryPage::new(
            NodeSpec::element("section")
                .id("skills")
                .child(
                    NodeSpec::element("h3").child(
                        NodeSpec::element("button")
                            .attr("aria-controls", "skills-region")
                            .attr("aria-expanded", "false")
                            .inert(),
                    ),
                )
                .child(
                    NodeSpec::element("div")
                        .id("skills-region")
                        .attr("role", "region")
                        .attr("hidden", ""),
                ),
        );
        let section = page.by_id("skills").await.unwrap().unwrap();
        let timing = Timing {
            accordion: Duration::from_millis(10),
            ..Timing::instant()
        };
        let opened = open(&page, &section, &timing).await.unwrap();
        assert_eq!(opened.signal, OpenSignal::TimedOut);
        assert_eq!(page.read(&opened.root).await.unwrap().id.as_deref(), Some("skills-region"));
    }

    #[tokio::test]
    async fn test_section_without_button_returns_root() {
        let page = MemoryPage::new(
            NodeSpec::element("section")
                .id("tools")
                .child(NodeSpec::checkbox("a", true)),
        );
        let opened = open_section(&page, "tools").await;
        assert_eq!(opened.signal, OpenSignal::NoButton);
        assert_eq!(page.read(&opened.root).await.unwrap().id.as_deref(), Some("tools"));
    }

    #[tokio::test]
    async fn test_button_without_region() {
        let page = MemoryPage::new(
            NodeSpec::element("section").id("tools").child(
                NodeSpec::element("h3").child(
                    NodeSpec::element("button")
                        .attr("aria-controls", "missing")
                        .attr("aria-expanded", "false"),
                ),
            ),
        );
        let opened = open_section(&page, "tools").await;
        assert_eq!(opened.signal, OpenSignal::NoRegion);
        assert_eq!(page.read(&opened.root).await.unwrap().id.as_deref(), Some("tools"));
    }
}
