use crate::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Executable names looked up on `PATH` when no install location matches
const PATH_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Locates a Chrome or Chromium binary
pub struct ChromeFinder {
    custom_path: Option<PathBuf>,
}

impl ChromeFinder {
    pub fn new(custom_path: Option<PathBuf>) -> Self {
        Self { custom_path }
    }

    /// An explicit path wins and is never second-guessed; otherwise the
    /// platform install locations are tried, then `PATH`.
    pub fn find(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.custom_path {
            return validate(path);
        }

        let mut checked = Vec::new();
        for path in Self::install_paths().into_iter().chain(path_candidates()) {
            match validate(&path) {
                Ok(found) => {
                    tracing::debug!("Using Chrome at {}", found.display());
                    return Ok(found);
                }
                Err(_) => checked.push(path.display().to_string()),
            }
        }

        Err(Error::Browser(format!(
            "Chrome not found. Checked: {}. \
             Use --chrome-path or AUTOOFF_CHROME_PATH to specify location.",
            checked.join(", ")
        )))
    }

    fn install_paths() -> Vec<PathBuf> {
        #[cfg(target_os = "macos")]
        return vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
            PathBuf::from("/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"),
        ];

        #[cfg(target_os = "linux")]
        return vec![
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/snap/bin/chromium"),
        ];

        #[cfg(target_os = "windows")]
        return vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        return vec![];
    }
}

fn path_candidates() -> Vec<PathBuf> {
    let Some(path) = env::var_os("PATH") else {
        return Vec::new();
    };
    env::split_paths(&path)
        .flat_map(|dir| PATH_NAMES.iter().map(move |name| dir.join(name)))
        .collect()
}

/// The path exists and, on unix, is executable
fn validate(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(Error::Browser(format!(
            "Chrome not found at: {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        if mode & 0o111 == 0 {
            return Err(Error::Browser(format!(
                "Chrome binary not executable: {}",
                path.display()
            )));
        }
    }

    Ok(path.to_path_buf())
}
