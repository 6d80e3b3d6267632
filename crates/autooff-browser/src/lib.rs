//! Chrome side of Auto-OFF: find and launch Chrome, connect over the DevTools
//! Protocol, and expose the connected tab as an `autooff_core::dom::Page`.

mod cdp_page;
mod cdp_session;
mod chrome_finder;
mod error;
mod launcher;
mod profile;

pub use cdp_page::CdpPage;
pub use cdp_session::CdpSession;
pub use chrome_finder::ChromeFinder;
pub use error::{Error, Result};
pub use launcher::{ChromeLauncher, DEFAULT_DEBUGGING_PORT, normalize_url};
pub use profile::ProfileManager;
