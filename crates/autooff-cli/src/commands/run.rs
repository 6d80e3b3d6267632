use crate::OutputFormat;
use crate::output::{SpinnerProgress, print_report};
use anyhow::Result;
use autooff_browser::{CdpSession, ChromeFinder, ChromeLauncher, ProfileManager, normalize_url};
use autooff_core::settings::Store;
use autooff_core::{CancelFlag, RunOptions, Session, Timing};
use console::{Key, Term};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const CHROME_READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Options of `autooff run`
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub chrome_path: Option<PathBuf>,
    /// Attach to this debugging port instead of launching Chrome
    pub port: Option<u16>,
    pub url: String,
    /// Named profile; `None` uses a temporary one
    pub profile: Option<String>,
    pub section_pause_ms: Option<u64>,
    pub wait_for_enter: bool,
}

impl RunArgs {
    fn options(&self) -> RunOptions {
        let mut timing = Timing::default();
        if let Some(ms) = self.section_pause_ms {
            timing = timing.with_section_pause(Duration::from_millis(ms));
        }
        RunOptions {
            timing,
            ..RunOptions::default()
        }
    }
}

pub fn execute(args: RunArgs, store: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let store = super::open_store(store)?;
    let runtime = super::runtime()?;

    let result = runtime.block_on(run(args, store, format));

    // The key listener blocks on stdin; don't wait for it
    runtime.shutdown_timeout(Duration::from_millis(100));

    result
}

async fn run(args: RunArgs, store: Arc<dyn Store>, format: OutputFormat) -> Result<()> {
    let target = normalize_url(&args.url)?;
    let url_hint = target.host_str().map(str::to_string);

    // A temporary profile is deleted when this goes out of scope
    let mut _profile = None;
    let port = match args.port {
        Some(port) => {
            println!("🔌 Attaching to Chrome on port {}", port);
            port
        }
        None => {
            println!("🔍 Locating Chrome...");
            let chrome_binary = ChromeFinder::new(args.chrome_path.clone()).find()?;
            println!("✅ Found Chrome at: {}", chrome_binary.display());

            let profile = match &args.profile {
                Some(name) => ProfileManager::named(name)?,
                None => ProfileManager::temporary()?,
            };
            println!("📁 Using profile: {}", profile.path().display());

            let launcher = ChromeLauncher::new(
                chrome_binary,
                profile.path().to_path_buf(),
                Some(target.clone()),
            );
            println!("🚀 Launching Chrome...");
            let chrome_process = launcher.launch()?;
            tracing::debug!("Chrome started with pid {}", chrome_process.id());
            launcher.wait_until_ready(CHROME_READY_TIMEOUT).await?;
            println!("✅ Chrome started, opened {}", target);

            _profile = Some(profile);
            launcher.debugging_port()
        }
    };

    if args.wait_for_enter {
        println!();
        println!("Sign in and open your resume in Teal, then press Enter to run Auto-OFF...");
        tokio::task::spawn_blocking(|| Term::stdout().read_line()).await??;
    }

    let page = CdpSession::new(port).connect(url_hint.as_deref()).await?;
    if let Ok(Some(url)) = page.url().await {
        tracing::info!("Running on {}", url);
    }

    let session = Session::new(page, store).with_options(args.options());
    let cancel = CancelFlag::new();
    let watchers = watch_for_cancel(&cancel);

    println!("Press Esc or q to stop");
    let spinner = SpinnerProgress::new();
    let report = session.run(&spinner, &cancel).await;
    for watcher in watchers {
        watcher.abort();
    }

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            spinner.finish("Auto-OFF failed");
            return Err(e.into());
        }
    };
    spinner.finish(&report.completion_message());
    print_report(&report, format)
}

/// Set `cancel` on Ctrl+C, and on Esc or `q` when stdout is a terminal
fn watch_for_cancel(cancel: &CancelFlag) -> Vec<JoinHandle<()>> {
    let mut watchers = Vec::new();

    let flag = cancel.clone();
    watchers.push(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, cancelling");
            flag.cancel();
        }
    }));

    let term = Term::stdout();
    if term.is_term() {
        let flag = cancel.clone();
        watchers.push(tokio::task::spawn_blocking(move || {
            while !flag.is_cancelled() {
                match term.read_key() {
                    Ok(Key::Escape) | Ok(Key::Char('q')) | Ok(Key::Char('Q')) => {
                        tracing::info!("Cancel key pressed");
                        flag.cancel();
                    }
                    Ok(_) => {}
                    // Raw mode turns Ctrl+C into an interrupted read
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => flag.cancel(),
                    Err(_) => break,
                }
            }
        }));
    }

    watchers
}
