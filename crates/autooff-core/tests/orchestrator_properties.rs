use autooff_core::automation::{Collector, locate, turn_off};
use autooff_core::dom::{MemoryPage, NodeSpec, Page};
use autooff_core::progress::{ProgressLog, ProgressSink};
use autooff_core::settings::{MemoryStore, Policy, SECTION_ID_ALIASES, Settings, Store, keys};
use autooff_core::{CancelFlag, Error, RunOptions, Session, SwitchState, Timing};
use serde_json::{Map, json};
use std::sync::Arc;
use std::time::Duration;

fn instant(max_passes: usize) -> RunOptions {
    RunOptions {
        timing: Timing::instant(),
        max_passes,
        ..Default::default()
    }
}

fn skills_page(states: &[(&str, bool)]) -> MemoryPage {
    let boxes = states.iter().map(|(id, on)| NodeSpec::checkbox(id, *on));
    MemoryPage::new(NodeSpec::element("main").child(NodeSpec::accordion("skills", false, boxes)))
}

async fn store_with(settings: Settings) -> MemoryStore {
    let store = MemoryStore::new();
    let mut values = Map::new();
    values.insert(keys::SETTINGS.to_string(), serde_json::to_value(settings).unwrap());
    store.set(values).await.unwrap();
    store
}

/// Cancels as soon as a given progress text is shown
struct CancelOn {
    text: String,
    flag: CancelFlag,
}

impl ProgressSink for CancelOn {
    fn set_text(&self, text: &str) {
        if text == self.text {
            self.flag.cancel();
        }
    }
}

#[tokio::test]
async fn test_turn_off_on_off_element_dispatches_nothing() {
    let page = skills_page(&[("a", false)]);
    let node = page.by_id("a").await.unwrap().unwrap();

    let result = turn_off(&page, &node, &Timing::instant()).await.unwrap();

    assert!(!result.changed);
    assert!(result.ok);
    assert_eq!(page.activations("a").await, 0);
    assert_eq!(page.is_on("a").await, Some(false));
}

#[tokio::test]
async fn test_turn_off_on_element() {
    let page = skills_page(&[("a", true)]);
    let node = page.by_id("a").await.unwrap().unwrap();

    let result = turn_off(&page, &node, &Timing::instant()).await.unwrap();

    assert!(result.changed);
    assert!(result.ok);
    assert_eq!(result.after, SwitchState::Off);
    assert_eq!(page.is_on("a").await, Some(false));
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let page = skills_page(&[("a", true), ("b", true)]);
    let session = Session::new(page, Arc::new(MemoryStore::new())).with_options(instant(3));
    let cancel = CancelFlag::new();

    let first = session.run(&ProgressLog::new(), &cancel).await.unwrap();
    assert_eq!(first.changed_count(), 2);

    let second = session.run(&ProgressLog::new(), &cancel).await.unwrap();
    assert_eq!(second.changed_count(), 0);
    assert!(second.outcomes.is_empty());
}

#[tokio::test]
async fn test_preserved_identity_never_appears() {
    let store = store_with(Settings {
        preserve_selected: vec!["keep".to_string()],
        ..Default::default()
    })
    .await;
    let session = Session::new(skills_page(&[("keep", true), ("drop", true)]), Arc::new(store))
        .with_options(instant(3));

    let report = session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(session.page().is_on("keep").await, Some(true));
    assert_eq!(session.page().is_on("drop").await, Some(false));
    assert_eq!(session.page().activations("keep").await, 0);
}

#[tokio::test]
async fn test_excluded_section_yields_nothing() {
    let page = skills_page(&[("a", true), ("b", true)]);
    let root = page.by_id("skills").await.unwrap().unwrap();
    let policy = Policy::new([], ["skills".to_string()]);
    let timing = Timing::instant();
    let collector = Collector {
        policy: &policy,
        timing: &timing,
        max_requeries: 4,
    };
    assert!(collector.collect(&page, "skills", &root, true).await.unwrap().is_empty());

    let store = store_with(Settings {
        exclude_sections: vec!["skills".to_string()],
        ..Default::default()
    })
    .await;
    let session = Session::new(page, Arc::new(store)).with_options(instant(3));
    let report = session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(session.page().total_activations().await, 0);
}

#[tokio::test]
async fn test_alias_resolves_suffixed_id() {
    let page = MemoryPage::new(
        NodeSpec::element("main").child(NodeSpec::element("section").id("certification-93c1")),
    );
    let node = locate(&page, "certifications", SECTION_ID_ALIASES)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.read(&node).await.unwrap().id.as_deref(), Some("certification-93c1"));
}

#[tokio::test]
async fn test_cancel_between_sections_keeps_earlier_outcomes() {
    let page = MemoryPage::new(
        NodeSpec::element("main")
            .child(NodeSpec::accordion("skills", false, [NodeSpec::checkbox("s1", true)]))
            .child(NodeSpec::accordion("projects", false, [NodeSpec::checkbox("p1", true)])),
    );
    let session = Session::new(page, Arc::new(MemoryStore::new())).with_options(instant(3));
    let cancel = CancelFlag::new();
    let progress = CancelOn {
        text: "Processing skills...".to_string(),
        flag: cancel.clone(),
    };

    let report = session.run(&progress, &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].section, "skills");
    assert!(report.outcomes.iter().all(|o| o.section != "projects"));
    assert_eq!(session.page().is_on("p1").await, Some(true));
    assert_eq!(report.completion_message(), "Auto-OFF cancelled");
}

#[tokio::test]
async fn test_skills_end_to_end() {
    let session = Session::new(
        skills_page(&[("a", true), ("b", false), ("c", true)]),
        Arc::new(MemoryStore::new()),
    )
    .with_options(instant(1));

    let report = session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes.iter().all(|o| o.changed && o.after == SwitchState::Off));
    assert!(report.outcomes.iter().all(|o| o.section == "skills"));
    for id in ["a", "b", "c"] {
        assert_eq!(session.page().is_on(id).await, Some(false));
    }
    assert_eq!(session.page().activations("b").await, 0);
    assert_eq!(report.metrics.passes, 1);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let options = RunOptions {
        timing: Timing {
            prepare: Duration::from_millis(50),
            ..Timing::instant()
        },
        ..Default::default()
    };
    let session = Session::new(skills_page(&[("a", true)]), Arc::new(MemoryStore::new()))
        .with_options(options);
    let cancel = CancelFlag::new();
    let (progress_a, progress_b) = (ProgressLog::new(), ProgressLog::new());

    let (first, second) = tokio::join!(
        session.run(&progress_a, &cancel),
        session.run(&progress_b, &cancel)
    );

    assert_eq!(first.unwrap().changed_count(), 1);
    assert!(matches!(second, Err(Error::AlreadyRunning)));
    assert!(!session.is_running());

    // The guard is released once the first run ends
    assert!(session.run(&ProgressLog::new(), &cancel).await.is_ok());
}

#[tokio::test]
async fn test_pass_limit_with_cascading_content_is_degraded() {
    let page = MemoryPage::new(NodeSpec::element("main").child(NodeSpec::accordion(
        "skills",
        true,
        [
            NodeSpec::checkbox("first", true).reveals("second"),
            NodeSpec::checkbox("second", true).detached().reveals("third"),
            NodeSpec::checkbox("third", true).detached(),
        ],
    )));
    let session = Session::new(page, Arc::new(MemoryStore::new())).with_options(instant(2));

    let report = session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();

    assert_eq!(report.metrics.passes, 2);
    assert!(report.metrics.degraded);
    assert_eq!(report.changed_count(), 2);
    assert_eq!(session.page().is_on("third").await, Some(true));
}

#[tokio::test]
async fn test_quiet_second_pass_ends_the_run() {
    let page = MemoryPage::new(NodeSpec::element("main").child(NodeSpec::accordion(
        "skills",
        true,
        [
            NodeSpec::checkbox("first", true).reveals("second"),
            NodeSpec::checkbox("second", true).detached(),
        ],
    )));
    let session = Session::new(page, Arc::new(MemoryStore::new())).with_options(instant(3));

    let report = session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();

    assert_eq!(report.changed_count(), 2);
    assert_eq!(report.metrics.passes, 3);
    assert!(!report.metrics.degraded);
    assert_eq!(session.page().is_on("second").await, Some(false));
}

#[tokio::test]
async fn test_stored_counters_accumulate() {
    let store = MemoryStore::new();
    let session =
        Session::new(skills_page(&[("a", true)]), Arc::new(store.clone())).with_options(instant(3));
    session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();
    session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();

    let values = store.snapshot().await;
    assert_eq!(values[keys::USAGE_COUNT], json!(2));
    assert_eq!(values[keys::TOTAL_OPERATIONS], json!(2));
    assert_eq!(values[keys::CHECKBOXES_PROCESSED], json!(1));
}

#[tokio::test]
async fn test_run_with_unreadable_settings_keeps_license() {
    let store = MemoryStore::new();
    let mut values = Map::new();
    values.insert(keys::LICENSE_KEY.to_string(), json!("TEAL_PREMIUM_2025"));
    values.insert(keys::CURRENT_PLAN.to_string(), json!("pro"));
    values.insert(
        keys::SETTINGS.to_string(),
        json!({"preserve_selected": ["keep"], "theme": 5}),
    );
    store.set(values).await.unwrap();

    let page = skills_page(&[("keep", true), ("drop", true)]);
    let session = Session::new(page, Arc::new(store.clone())).with_options(instant(1));
    session.run(&ProgressLog::new(), &CancelFlag::new()).await.unwrap();

    let stored = store.snapshot().await;
    assert_eq!(stored[keys::LICENSE_KEY], json!("TEAL_PREMIUM_2025"));
    assert_eq!(stored[keys::CURRENT_PLAN], json!("pro"));
    assert_eq!(
        stored[keys::SETTINGS],
        json!({"preserve_selected": ["keep"], "theme": 5})
    );
    assert_eq!(stored[keys::USAGE_COUNT], json!(1));
}
