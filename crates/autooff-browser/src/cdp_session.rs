use crate::{CdpPage, Error, Result};
use chromiumoxide::browser::Browser;
use futures::StreamExt;
use std::time::Duration;

const CONNECT_ATTEMPTS: u32 = 5;

/// Connection settings for a Chrome instance with remote debugging enabled
pub struct CdpSession {
    debugging_port: u16,
}

impl CdpSession {
    pub fn new(debugging_port: u16) -> Self {
        Self { debugging_port }
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    /// Connect and pick the tab to automate: the first one whose URL contains
    /// `url_hint`, else the first tab, else a new blank one.
    pub async fn connect(&self, url_hint: Option<&str>) -> Result<CdpPage> {
        tracing::info!("Connecting to Chrome on port {}", self.debugging_port);

        // Chrome may still be starting up
        let endpoint = format!("http://localhost:{}", self.debugging_port);
        let (browser, mut handler) = {
            let mut retries = CONNECT_ATTEMPTS;
            loop {
                tracing::debug!("Attempting CDP connection to {}...", endpoint);
                match Browser::connect(&endpoint).await {
                    Ok(result) => {
                        tracing::info!("CDP connection established");
                        break result;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            return Err(Error::Cdp(format!(
                                "Failed to connect to Chrome after {} attempts: {}",
                                CONNECT_ATTEMPTS, e
                            )));
                        }
                        tracing::info!(
                            "CDP connection attempt failed, retrying... ({} left)",
                            retries
                        );
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
            }
        };

        // Every command needs the handler polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", e);
                }
            }
        });

        // Give a freshly launched Chrome time to open its first tab
        tokio::time::sleep(Duration::from_millis(500)).await;

        let pages = browser.pages().await?;
        let mut chosen = None;
        if let Some(hint) = url_hint {
            for page in &pages {
                if page.url().await?.is_some_and(|url| url.contains(hint)) {
                    chosen = Some(page.clone());
                    break;
                }
            }
        }
        let page = match chosen.or_else(|| pages.first().cloned()) {
            Some(page) => {
                tracing::debug!("Using existing tab");
                page
            }
            None => {
                tracing::info!("No open tabs, creating one");
                browser.new_page("about:blank").await?
            }
        };

        Ok(CdpPage::new(browser, page, handler_task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_keeps_port() {
        assert_eq!(CdpSession::new(9333).debugging_port(), 9333);
    }

    #[tokio::test]
    async fn test_connect_fails_without_chrome() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = CdpSession::new(port).connect(None).await;
        assert!(matches!(result, Err(Error::Cdp(_))));
    }
}
