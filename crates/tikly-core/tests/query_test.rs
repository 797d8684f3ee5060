// Integration tests for query building and reads against the in-memory device.

#![allow(clippy::unwrap_used)]

mod support;

use pretty_assertions::assert_eq;
use serde_json::json;

use support::MockDevice;
use tikly_core::{CaseConvention, Filter};

const FILTER: &str = "/ip/firewall/filter";

fn seeded() -> std::sync::Arc<MockDevice> {
    let device = MockDevice::new();
    device.seed(
        FILTER,
        &[
            &[("chain", "forward"), ("action", "accept"), ("comment", "first rule"), ("disabled", "false")],
            &[("chain", "input"), ("action", "drop"), ("disabled", "true")],
            &[("chain", "forward"), ("action", "drop"), ("comment", "last"), ("disabled", "false")],
        ],
    );
    device
}

// ── Sentence shape ──────────────────────────────────────────────────

#[tokio::test]
async fn test_print_sentence_has_command_once() {
    let device = seeded();
    let session = device.session();

    session
        .menu("ip firewall filter")
        .filter("chain", "forward")
        .or_filter("chain", "input")
        .filter_not("action", "drop")
        .get()
        .await
        .unwrap();

    let log = device.log();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0],
        [
            "/ip/firewall/filter/print",
            "?chain=forward",
            "?chain=input",
            "?#|",
            "?action=drop",
            "?#!",
        ]
    );
}

#[tokio::test]
async fn test_to_sentence_rewrites_queries_outside_print() {
    let session = MockDevice::new().session();
    let query = session
        .menu("/interface")
        .filter("name", "ether1")
        .options(["once"]);

    assert_eq!(
        query.to_sentence("monitor-traffic"),
        ["/interface/monitor-traffic", "=once=", "=name=ether1"]
    );
    assert_eq!(
        query.to_sentence("print"),
        ["/interface/print", "=once=", "?name=ether1"]
    );
}

#[tokio::test]
async fn test_negated_combinators_emit_both_sentinels() {
    let session = MockDevice::new().session();
    let query = session
        .menu(FILTER)
        .filter("chain", "forward")
        .or_filter_not("action", "drop")
        .and_filter_not("disabled", true);

    assert_eq!(
        query.to_sentence("print"),
        [
            "/ip/firewall/filter/print",
            "?chain=forward",
            "?action=drop",
            "?#!",
            "?#|",
            "?disabled=yes",
            "?#!",
            "?#&",
        ]
    );
}

#[tokio::test]
async fn test_comparison_sugar() {
    let session = MockDevice::new().session();
    let query = session
        .menu("/interface")
        .filter_higher("rxByte", 1000)
        .filter_lower("mtu", 1500)
        .filter_exists("comment")
        .filter_empty("macAddress")
        .filter_raw(["?type=ether"]);

    assert_eq!(
        query.to_sentence("print"),
        [
            "/interface/print",
            "?>rx-byte=1000",
            "?<mtu=1500",
            "?>comment=",
            "?-mac-address",
            "?type=ether",
        ]
    );
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_filters_are_evaluated_by_device() {
    let device = seeded();
    let menu = device.session().menu(FILTER);

    let rows = menu
        .filter("chain", "forward")
        .and_filter("disabled", false)
        .get_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.get_str("chain") == Some("forward")));
    assert!(rows.iter().all(|r| r.get_bool("disabled") == Some(false)));

    let rows = menu
        .query()
        .filter_by(!Filter::eq("chain", "forward"))
        .get()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("action"), Some("drop"));
}

#[tokio::test]
async fn test_select_projects_fields() {
    let device = seeded();
    let row = device
        .session()
        .menu(FILTER)
        .select(["id", "comment"])
        .find()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(row.keys().collect::<Vec<_>>(), ["id", "comment"]);
    assert!(row.id().unwrap().starts_with('*'));
    assert_eq!(
        device.log()[0],
        ["/ip/firewall/filter/print", "=.proplist=.id,comment"]
    );
}

#[tokio::test]
async fn test_find_returns_none_without_match() {
    let device = seeded();
    let found = device
        .session()
        .menu(FILTER)
        .filter("comment", "missing")
        .first()
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_count_uses_count_only() {
    let device = seeded();
    let count = device
        .session()
        .menu(FILTER)
        .filter("chain", "forward")
        .count()
        .await
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(
        device.log()[0],
        ["/ip/firewall/filter/print", "=count-only=", "?chain=forward"]
    );
}

#[tokio::test]
async fn test_rows_follow_session_case() {
    let device = MockDevice::new();
    device.seed("/interface", &[&[("name", "ether1"), ("mac-address", "AA:BB:CC:DD:EE:FF"), ("rx-byte", "42")]]);

    let camel = device.session().menu("/interface").get().await.unwrap();
    assert_eq!(camel[0].get_str("macAddress"), Some("AA:BB:CC:DD:EE:FF"));
    assert_eq!(camel[0].get_u64("rxByte"), Some(42));

    let snake = device
        .session()
        .with_case(CaseConvention::Snake)
        .menu("/interface")
        .get()
        .await
        .unwrap();
    assert_eq!(snake[0].get_str("mac_address"), Some("AA:BB:CC:DD:EE:FF"));
    assert_eq!(snake[0].menu().as_str(), "/interface");
}

#[tokio::test]
async fn test_snake_case_input_is_translated() {
    let device = MockDevice::new();
    device.seed("/interface", &[&[("name", "ether1"), ("mac-address", "AA")], &[("name", "ether2"), ("mac-address", "BB")]]);

    let rows = device
        .session()
        .use_snake_case()
        .menu("/interface")
        .filter("mac_address", "BB")
        .get()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("name"), Some("ether2"));
}

#[tokio::test]
async fn test_chains_on_one_menu_share_no_state() {
    let device = seeded();
    let menu = device.session().menu(FILTER);

    let forward = menu.filter("chain", "forward");
    let everything = menu.query();
    assert_eq!(forward.get().await.unwrap().len(), 2);
    assert_eq!(everything.get().await.unwrap().len(), 3);
    assert_eq!(device.log()[1], ["/ip/firewall/filter/print"]);
}

#[tokio::test]
async fn test_non_object_filter_data_is_rejected() {
    let device = seeded();
    let err = device
        .session()
        .menu(FILTER)
        .filter_all(json!(["chain", "forward"]))
        .get()
        .await
        .unwrap_err();

    assert!(matches!(err, tikly_core::CoreError::InvalidData { .. }));
    assert!(device.log().is_empty());
}
