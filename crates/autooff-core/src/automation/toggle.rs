use crate::Result;
use crate::dom::{Page, ToggleKind, is_checked};
use crate::report::{SwitchState, ToggleMethod, ToggleOutcome};
use crate::timing::{Timing, pause};

/// A toggle-like element found on the page
#[derive(Debug, Clone)]
pub struct ToggleElement<N> {
    pub node: N,
    pub kind: ToggleKind,
    /// `id`, or `data-id` when the element has no id
    pub identity: Option<String>,
}

/// What `turn_off` observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleResult {
    pub before: SwitchState,
    pub after: SwitchState,
    pub changed: bool,
    pub method: ToggleMethod,
    /// The element is off afterwards
    pub ok: bool,
}

impl ToggleResult {
    pub fn into_outcome(self, section: &str, label: String) -> ToggleOutcome {
        ToggleOutcome {
            section: section.to_string(),
            label,
            before: self.before,
            after: self.after,
            changed: self.changed,
            method: self.method,
            ok: self.ok,
        }
    }
}

/// Switch an element off.
///
/// An element that is already off is left alone: nothing is dispatched, so a
/// host page that double-handles activations cannot turn it back on.
pub async fn turn_off<P>(page: &P, node: &P::Node, timing: &Timing) -> Result<ToggleResult>
where
    P: Page + ?Sized,
{
    let before = SwitchState::from_checked(is_checked(&page.read(node).await?));
    if !before.is_on() {
        return Ok(ToggleResult {
            before,
            after: before,
            changed: false,
            method: ToggleMethod::Noop,
            ok: true,
        });
    }

    page.activate(node).await?;
    pause(timing.settle).await;

    let after = SwitchState::from_checked(is_checked(&page.read(node).await?));
    Ok(ToggleResult {
        before,
        after,
        changed: before != after,
        method: ToggleMethod::Click,
        ok: !after.is_on(),
    })
}
