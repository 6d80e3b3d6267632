use crate::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use url::Url;

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

/// Starts Chrome with remote debugging on a profile of our own
pub struct ChromeLauncher {
    chrome_path: PathBuf,
    profile_path: PathBuf,
    initial_url: Option<Url>,
    debugging_port: u16,
}

impl ChromeLauncher {
    pub fn new(chrome_path: PathBuf, profile_path: PathBuf, initial_url: Option<Url>) -> Self {
        Self {
            chrome_path,
            profile_path,
            initial_url,
            debugging_port: DEFAULT_DEBUGGING_PORT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    pub fn launch(&self) -> Result<Child> {
        let args = self.build_args();
        tracing::debug!("Launching {} {:?}", self.chrome_path.display(), args);

        Command::new(&self.chrome_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))
    }

    fn build_args(&self) -> Vec<String> {
        vec![
            format!("--remote-debugging-port={}", self.debugging_port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            format!("--user-data-dir={}", self.profile_path.display()),
            self.initial_url
                .as_ref()
                .map(Url::to_string)
                .unwrap_or_else(|| "about:blank".to_string()),
        ]
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    /// Wait until the DevTools endpoint accepts connections
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let address = format!("127.0.0.1:{}", self.debugging_port);
        let started = Instant::now();
        loop {
            match tokio::net::TcpStream::connect(&address).await {
                Ok(_) => {
                    tracing::debug!(
                        "DevTools listening on {} after {:?}",
                        address,
                        started.elapsed()
                    );
                    return Ok(());
                }
                Err(e) if started.elapsed() >= timeout => {
                    return Err(Error::Browser(format!(
                        "Chrome did not open its debugging port {} within {:?}: {}",
                        self.debugging_port, timeout, e
                    )));
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(200)).await,
            }
        }
    }
}

/// Parse a user-supplied address, adding `https://` when no scheme is given
pub fn normalize_url(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        Ok(Url::parse(input)?)
    } else {
        Ok(Url::parse(&format!("https://{}", input))?)
    }
}
