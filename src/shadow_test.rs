// Unit tests for shadow search specs, the poll loop, and payload shape

use std::cell::Cell;

use super::*;
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn spec_takes_defaults_from_wait_config() {
    let config = WaitConfig {
        wait_secs: 3,
        poll_interval_ms: 100,
    };
    let spec = ShadowSearchSpec::new(LocatorDescriptor::css("#inner"), &config).unwrap();
    assert_eq!(spec.max_wait(), Duration::from_secs(3));
    assert_eq!(spec.poll_interval(), Duration::from_millis(100));
}

#[test]
fn spec_overrides_apply() {
    let spec = ShadowSearchSpec::new(LocatorDescriptor::css("#inner"), &WaitConfig::default())
        .unwrap()
        .with_max_wait(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(50));
    assert_eq!(spec.max_wait(), Duration::from_millis(200));
    assert_eq!(spec.poll_interval(), Duration::from_millis(50));
}

#[test]
fn xpath_spec_fails_before_any_polling() {
    let err = ShadowSearchSpec::new(
        LocatorDescriptor::xpath("//input"),
        &WaitConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ProbeError::UnsupportedLocator { .. }));
}

#[tokio::test]
async fn polling_returns_empty_at_the_deadline() {
    init_tracing();
    let probes = Cell::new(0u32);
    let started = Instant::now();

    let found: Vec<u8> = poll_until_found(
        Duration::from_millis(200),
        Duration::from_millis(50),
        || {
            probes.set(probes.get() + 1);
            async { Ok(Vec::new()) }
        },
    )
    .await
    .unwrap();

    assert!(found.is_empty());
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_millis(200),
        "gave up before the budget: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(600),
        "kept polling past the budget: {elapsed:?}"
    );
    assert!(probes.get() >= 2, "budget must allow repeated probes");
}

#[tokio::test]
async fn polling_stops_at_the_first_match() {
    init_tracing();
    let probes = Cell::new(0u32);

    let found = poll_until_found(Duration::from_secs(5), Duration::from_millis(10), || {
        probes.set(probes.get() + 1);
        let hit = probes.get() == 3;
        async move { Ok(if hit { vec![1u8] } else { Vec::new() }) }
    })
    .await
    .unwrap();

    assert_eq!(found, vec![1u8]);
    assert_eq!(probes.get(), 3, "polling must stop on the first match");
}

#[tokio::test]
async fn zero_budget_still_probes_once() {
    let probes = Cell::new(0u32);

    let found: Vec<u8> = poll_until_found(Duration::ZERO, Duration::from_millis(10), || {
        probes.set(probes.get() + 1);
        async { Ok(Vec::new()) }
    })
    .await
    .unwrap();

    assert!(found.is_empty());
    assert_eq!(probes.get(), 1);
}

#[test]
fn search_script_pierces_shadow_roots() {
    assert!(SHADOW_SEARCH_SCRIPT.contains("shadowRoot"));
    assert!(SHADOW_SEARCH_SCRIPT.contains("querySelectorAll"));
    // One probe per invocation: the script must not sleep or spin.
    assert!(!SHADOW_SEARCH_SCRIPT.contains("while"));
    assert!(!SHADOW_SEARCH_SCRIPT.contains("setTimeout"));
}

#[test]
fn search_script_probes_scope_before_descending() {
    let probe_call = SHADOW_SEARCH_SCRIPT.find("probe(scope)").unwrap();
    let descend = SHADOW_SEARCH_SCRIPT.find("scope.shadowRoot").unwrap();
    assert!(
        probe_call < descend,
        "scope matches must be collected before shadow matches"
    );
}

#[test]
fn presence_script_short_circuits() {
    assert!(SHADOW_PRESENCE_SCRIPT.contains("return true"));
    assert!(SHADOW_PRESENCE_SCRIPT.contains("shadowRoot"));
    // Presence never needs the matching machinery.
    assert!(!SHADOW_PRESENCE_SCRIPT.contains("matches"));
}

#[test]
fn document_root_serializes_to_null() {
    let arg = SearchRoot::Document.script_arg().unwrap();
    assert!(arg.is_null());
}
