use refseed_core::CatalogSnapshot;
use schemars::schema_for;

#[test]
fn json_schema_describes_snapshot_contract() {
    let generated = schema_for!(CatalogSnapshot);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    let required: Vec<&str> = json["required"]
        .as_array()
        .expect("required array")
        .iter()
        .filter_map(|value| value.as_str())
        .collect();
    assert!(required.contains(&"snapshot_version"));
    assert!(required.contains(&"tables"));

    let column = &json["definitions"]["Column"]["properties"];
    for field in ["name", "data_type", "is_unique", "has_ref", "is_sequence"] {
        assert!(column.get(field).is_some(), "missing column field {field}");
    }
    assert!(json["definitions"].get("ForeignKeyEdge").is_some());
}
