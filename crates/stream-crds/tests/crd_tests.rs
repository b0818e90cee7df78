use kube::CustomResourceExt;
use stream_crds::*;

#[test]
fn test_crd_metadata() {
    let crd = Stream::crd();
    assert_eq!(crd.metadata.name.as_deref(), Some("streams.streams.dev"));
    assert_eq!(crd.spec.group, "streams.dev");
    assert_eq!(crd.spec.names.kind, "Stream");
    assert_eq!(
        crd.spec.names.short_names.as_deref(),
        Some(&["strm".to_string()][..])
    );
    assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    assert!(crd.spec.versions[0].subresources.is_some());
}

#[test]
fn test_crd_serializes_to_yaml() {
    let yaml = serde_yaml::to_string(&Stream::crd()).unwrap();
    assert!(yaml.contains("kind: CustomResourceDefinition"));
    assert!(yaml.contains("retentionPeriodHours"));
    assert!(yaml.contains("keyID"));
}

#[test]
fn test_crd_encryption_type_schema_admits_empty_string() {
    let crd = Stream::crd();
    let schema = serde_json::to_value(&crd.spec.versions[0].schema).unwrap();
    let enc = &schema["openAPIV3Schema"]["properties"]["spec"]["properties"]["encryptionType"];
    let allowed = enc["enum"].as_array().unwrap();
    assert!(allowed.contains(&serde_json::json!("")));
    assert!(allowed.contains(&serde_json::json!("KMS")));
}

#[test]
fn test_spec_defaults_from_minimal_yaml() {
    let spec: StreamSpec = serde_yaml::from_str("name: orders\n").unwrap();
    assert_eq!(spec.name, "orders");
    assert_eq!(spec.shard_count, 1);
    assert_eq!(spec.retention_period_hours, None);
    assert_eq!(spec.encryption(), EncryptionType::None);
    assert_eq!(spec.key(), None);
    assert!(spec.tags.is_empty());
}

#[test]
fn test_spec_full_yaml() {
    let yaml = r#"
name: orders
shardCount: 2
retentionPeriodHours: 72
encryptionType: KMS
keyID: alias/aws/kinesis
streamMode: PROVISIONED
tags:
  team: data
  another: here
"#;
    let spec: StreamSpec = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(spec.shard_count, 2);
    assert_eq!(spec.retention_period_hours, Some(72));
    assert_eq!(spec.encryption(), EncryptionType::Kms);
    assert_eq!(spec.key(), Some("alias/aws/kinesis"));
    assert_eq!(spec.stream_mode, Some(StreamMode::Provisioned));
    assert_eq!(spec.tags.get("another").map(String::as_str), Some("here"));
}

#[test]
fn test_empty_encryption_type_reads_as_none() {
    let spec: StreamSpec =
        serde_json::from_str(r#"{"name":"orders","encryptionType":"","keyID":""}"#).unwrap();
    assert_eq!(spec.encryption_type, Some(EncryptionType::None));
    assert_eq!(spec.key(), None);
}

#[test]
fn test_spec_serializes_key_id_field_name() {
    let spec = StreamSpec {
        name: "orders".into(),
        encryption_type: Some(EncryptionType::Kms),
        key_id: Some("key-1".into()),
        ..Default::default()
    };
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["keyID"], "key-1");
    assert_eq!(json["encryptionType"], "KMS");
}

#[test]
fn test_stream_mode_wire_names() {
    assert_eq!(
        serde_json::to_value(StreamMode::OnDemand).unwrap(),
        serde_json::json!("ON_DEMAND")
    );
    assert_eq!(StreamMode::Provisioned.as_str(), "PROVISIONED");
}

#[test]
fn test_retention_bounds() {
    assert_eq!(MIN_RETENTION_HOURS, 24);
    assert_eq!(MAX_RETENTION_HOURS, 8760);
}
