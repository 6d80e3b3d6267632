//! `Page` over a live Chrome tab.
//!
//! Queries go through `DOM.querySelectorAll`; reads and clicks run small
//! functions on the remote element with `Runtime.callFunctionOn`. Reads come
//! back as a JSON string so the whole snapshot is one round trip.

use crate::Result;
use async_trait::async_trait;
use autooff_core::dom::{ElementState, NodeKey, Page, Selector};
use chromiumoxide::Browser;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

const READ_STATE: &str = r#"function() {
    const attr = (name) => this.getAttribute(name);
    return JSON.stringify({
        tag: this.tagName.toLowerCase(),
        inputType: attr('type'),
        id: this.id || null,
        dataId: attr('data-id'),
        role: attr('role'),
        checked: this.checked === true,
        ariaChecked: attr('aria-checked'),
        ariaPressed: attr('aria-pressed'),
        ariaExpanded: attr('aria-expanded'),
        ariaControls: attr('aria-controls'),
        ariaLabel: attr('aria-label'),
        labelFor: attr('for'),
        hidden: this.hasAttribute('hidden'),
        text: (this.textContent || '').trim()
    });
}"#;

const CLICK: &str = "function() { this.click(); }";

/// The tab Auto-OFF drives. Keeps the browser connection alive while held.
pub struct CdpPage {
    _browser: Browser,
    page: chromiumoxide::Page,
    handler_task: JoinHandle<()>,
}

fn page_error(err: CdpError) -> autooff_core::Error {
    autooff_core::Error::Page(err.to_string())
}

impl CdpPage {
    pub(crate) fn new(
        browser: Browser,
        page: chromiumoxide::Page,
        handler_task: JoinHandle<()>,
    ) -> Self {
        Self {
            _browser: browser,
            page,
            handler_task,
        }
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        tracing::info!("Navigating to {}", url);
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    pub async fn url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn call(&self, node: &Element, function: String) -> autooff_core::Result<Option<Value>> {
        let returns = node.call_js_fn(function, false).await.map_err(page_error)?;
        Ok(returns.result.value)
    }

    async fn call_text(
        &self,
        node: &Element,
        function: String,
    ) -> autooff_core::Result<Option<String>> {
        Ok(self
            .call(node, function)
            .await?
            .and_then(|value| value.as_str().map(str::to_string)))
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// A JavaScript string literal for `css`
fn js_string(css: &str) -> autooff_core::Result<String> {
    Ok(serde_json::to_string(css)?)
}

#[async_trait]
impl Page for CdpPage {
    type Node = Arc<Element>;

    fn node_key(&self, node: &Arc<Element>) -> NodeKey {
        NodeKey(*node.backend_node_id.inner())
    }

    async fn query_all(
        &self,
        scope: Option<&Arc<Element>>,
        selector: &Selector,
    ) -> autooff_core::Result<Vec<Arc<Element>>> {
        let css = selector.to_css();
        let found = match scope {
            Some(element) => element.find_elements(css).await,
            None => self.page.find_elements(css).await,
        };
        match found {
            Ok(elements) => Ok(elements.into_iter().map(Arc::new).collect()),
            // querySelectorAll with no match is reported as an error by some
            // Chrome versions
            Err(CdpError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(page_error(e)),
        }
    }

    async fn read(&self, node: &Arc<Element>) -> autooff_core::Result<ElementState> {
        let json = self
            .call_text(node, READ_STATE.to_string())
            .await?
            .ok_or_else(|| autooff_core::Error::Page("element read returned nothing".to_string()))?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn activate(&self, node: &Arc<Element>) -> autooff_core::Result<()> {
        self.call(node, CLICK.to_string()).await?;
        Ok(())
    }

    async fn closest_text(
        &self,
        node: &Arc<Element>,
        selector: &Selector,
    ) -> autooff_core::Result<Option<String>> {
        let function = format!(
            "function() {{ const el = this.closest({}); \
             return el ? (el.textContent || '').trim() : null; }}",
            js_string(&selector.to_css())?
        );
        self.call_text(node, function).await
    }

    async fn parent_query_text(
        &self,
        node: &Arc<Element>,
        selector: &Selector,
    ) -> autooff_core::Result<Option<String>> {
        let function = format!(
            "function() {{ const p = this.parentElement; \
             const el = p ? p.querySelector({}) : null; \
             return el ? (el.textContent || '').trim() : null; }}",
            js_string(&selector.to_css())?
        );
        self.call_text(node, function).await
    }
}
