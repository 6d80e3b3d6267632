//! The Auto-OFF run: locate sections, open them, and switch their toggles off.

pub mod accordion;
pub mod collector;
pub mod locator;
mod orchestrator;
pub mod toggle;
pub mod wait;

pub use accordion::{OpenSignal, OpenedSection};
pub use collector::Collector;
pub use locator::{DiscoveredSection, discover, locate};
pub use orchestrator::{RunOptions, RunPhase, Session};
pub use toggle::{ToggleElement, ToggleResult, turn_off};
pub use wait::WaitOutcome;
