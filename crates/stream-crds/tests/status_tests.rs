use stream_crds::*;

// ---------------------------------------------------------------------------
// Condition constructors
// ---------------------------------------------------------------------------

#[test]
fn condition_ok_creates_true_condition_with_all_fields() {
    let cond = Condition::ok(
        condition_types::READY,
        "StreamActive",
        "stream is ACTIVE",
        "2025-06-01T12:00:00Z",
    );

    assert_eq!(cond.condition_type, "Ready");
    assert_eq!(cond.status, "True");
    assert!(cond.is_true());
    assert_eq!(cond.reason, "StreamActive");
    assert_eq!(cond.message, "stream is ACTIVE");
    assert_eq!(cond.last_transition_time, "2025-06-01T12:00:00Z");
}

#[test]
fn condition_fail_creates_false_condition() {
    let cond = Condition::fail(
        condition_types::SYNCED,
        "ValidationFailed",
        "KMS encryption type requires a KeyID",
        "2025-06-01T13:00:00Z",
    );

    assert_eq!(cond.condition_type, "Synced");
    assert_eq!(cond.status, "False");
    assert!(!cond.is_true());
    assert_eq!(cond.message, "KMS encryption type requires a KeyID");
}

// ---------------------------------------------------------------------------
// StreamResourceStatus::set_condition()
// ---------------------------------------------------------------------------

#[test]
fn set_condition_updates_existing_condition_of_same_type() {
    let mut status = StreamResourceStatus::default();
    status.set_condition(Condition::fail(
        condition_types::READY,
        "StreamCreating",
        "stream is CREATING",
        "2025-06-01T00:00:00Z",
    ));
    status.set_condition(Condition::ok(
        condition_types::READY,
        "StreamActive",
        "stream is ACTIVE",
        "2025-06-01T00:01:00Z",
    ));

    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].status, "True");
    assert_eq!(status.conditions[0].reason, "StreamActive");
}

#[test]
fn set_condition_tracks_multiple_types() {
    let mut status = StreamResourceStatus::default();
    status.set_condition(Condition::ok(condition_types::SYNCED, "InSync", "", "t0"));
    status.set_condition(Condition::ok(condition_types::READY, "StreamActive", "", "t0"));

    assert_eq!(status.conditions.len(), 2);
    assert!(status.condition(condition_types::SYNCED).is_some());
    assert!(status.condition(condition_types::READY).is_some());
}

// ---------------------------------------------------------------------------
// StreamResourceStatus::replace_conditions()
// ---------------------------------------------------------------------------

#[test]
fn replace_conditions_keeps_transition_time_when_status_unchanged() {
    let mut status = StreamResourceStatus::default();
    status.set_condition(Condition::fail(
        condition_types::READY,
        "StreamCreating",
        "stream is CREATING",
        "2025-06-01T00:00:00Z",
    ));

    status.replace_conditions(vec![Condition::fail(
        condition_types::READY,
        "StreamUpdating",
        "stream is UPDATING",
        "2025-06-01T00:05:00Z",
    )]);

    let ready = status.condition(condition_types::READY).unwrap();
    assert_eq!(ready.reason, "StreamUpdating");
    assert_eq!(ready.last_transition_time, "2025-06-01T00:00:00Z");
}

#[test]
fn replace_conditions_resets_transition_time_on_flip() {
    let mut status = StreamResourceStatus::default();
    status.set_condition(Condition::fail(condition_types::READY, "", "", "t0"));

    status.replace_conditions(vec![Condition::ok(condition_types::READY, "", "", "t1")]);

    assert_eq!(
        status.condition(condition_types::READY).unwrap().last_transition_time,
        "t1"
    );
}

#[test]
fn replace_conditions_drops_conditions_not_reported_again() {
    let mut status = StreamResourceStatus::default();
    status.set_condition(Condition::ok(condition_types::SYNCED, "", "", "t0"));
    status.set_condition(Condition::ok(condition_types::READY, "", "", "t0"));

    status.replace_conditions(vec![Condition::ok(condition_types::READY, "", "", "t1")]);

    assert_eq!(status.conditions.len(), 1);
    assert!(status.condition(condition_types::SYNCED).is_none());
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn status_serializes_camel_case_and_acronyms() {
    let status = StreamResourceStatus {
        stream_name: Some("orders".into()),
        stream_arn: Some("arn:aws:kinesis:us-west-2:0:stream/orders".into()),
        stream_status: Some("ACTIVE".into()),
        open_shard_count: 2,
        retention_period_hours: 72,
        key_id: Some("key-1".into()),
        unsettled_since: Some("2025-06-01T00:00:00Z".into()),
        ..Default::default()
    };
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["unsettledSince"], "2025-06-01T00:00:00Z");
    assert_eq!(json["streamStatus"], "ACTIVE");
    assert_eq!(json["openShardCount"], 2);
    assert_eq!(json["retentionPeriodHours"], 72);
    assert_eq!(json["streamARN"], "arn:aws:kinesis:us-west-2:0:stream/orders");
    assert_eq!(json["keyID"], "key-1");
    assert!(json.get("encryptionType").is_none());
}

#[test]
fn status_deserializes_from_empty_object() {
    let status: StreamResourceStatus = serde_json::from_str("{}").unwrap();
    assert!(status.stream_status.is_none());
    assert!(status.unsettled_since.is_none());
    assert!(status.conditions.is_empty());
    assert_eq!(status.observed_generation, 0);
}
