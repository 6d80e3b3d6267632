use std::time::Duration;

/// Fixed delays used by the automation.
///
/// None of these are computed: the target page gives no completion signal for
/// most of its rendering, so every wait is a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait after each toggle before moving on
    pub click_wait: Duration,
    /// Wait between a click and the verification read
    pub settle: Duration,
    /// Upper bound on waiting for an accordion to report itself open
    pub accordion: Duration,
    /// Wait after an accordion opened so its content can render
    pub content_settle: Duration,
    /// Wait before each re-query for lazily rendered checkboxes
    pub lazy_load: Duration,
    /// Pause after a section so the host page can persist its changes
    pub section_pause: Duration,
    /// Initial delay before a run touches the page
    pub prepare: Duration,
    /// Gap between passes
    pub pass_gap: Duration,
    /// Wait used instead of the accordion race when a section has no region
    pub no_region: Duration,
    /// Poll interval for attribute races
    pub poll: Duration,
}

impl Timing {
    /// Fixed delays collapsed to zero, for simulations and tests. The
    /// accordion race keeps a short bound so a responsive page still wins it.
    pub fn instant() -> Self {
        Self {
            click_wait: Duration::ZERO,
            settle: Duration::ZERO,
            accordion: Duration::from_millis(100),
            content_settle: Duration::ZERO,
            lazy_load: Duration::ZERO,
            section_pause: Duration::ZERO,
            prepare: Duration::ZERO,
            pass_gap: Duration::ZERO,
            no_region: Duration::ZERO,
            poll: Duration::from_millis(1),
        }
    }

    pub fn with_section_pause(mut self, pause: Duration) -> Self {
        self.section_pause = pause;
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            click_wait: Duration::from_millis(10),
            settle: Duration::from_millis(150),
            accordion: Duration::from_millis(500),
            content_settle: Duration::from_millis(400),
            lazy_load: Duration::from_millis(500),
            section_pause: Duration::from_millis(1000),
            prepare: Duration::from_millis(500),
            pass_gap: Duration::from_millis(500),
            no_region: Duration::from_millis(100),
            poll: Duration::from_millis(25),
        }
    }
}

/// Sleep unless the duration is zero.
pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
