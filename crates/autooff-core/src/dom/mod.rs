//! Page access: selectors, element predicates, and the `Page` backends.

mod element;
mod label;
mod memory;
mod page;
mod selector;

pub use element::{ElementState, ToggleKind, is_checked};
pub use label::{LabelCache, label_text};
pub use memory::{MemoryNode, MemoryPage, NodeSpec};
pub use page::{NodeKey, Page};
pub use selector::{AttrFilter, Compound, Selector, Simple};
