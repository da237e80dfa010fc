//! Resolver Tests
//!
//! Path normalization, version selection and payload validation against both
//! the embedded bundle and hand-built registries.

use std::sync::Arc;

use api_schemas::{
    normalize, MatchKind, SchemaDefinition, SchemaError, SchemaRegistry, SchemaResolver, Stage,
};
use rstest::rstest;
use serde_json::{json, Value};

fn embedded() -> SchemaResolver {
    SchemaResolver::embedded().expect("embedded bundle compiles")
}

fn resolver_for(defs: Vec<SchemaDefinition>) -> SchemaResolver {
    let registry = SchemaRegistry::builder().register_all(defs).unwrap().build();
    SchemaResolver::new(Arc::new(registry))
}

fn host(id: u64) -> Value {
    json!({
        "id": id,
        "type": "host",
        "url": format!("/api/v1/hosts/{}/", id),
        "related": {"inventory": "/api/v1/inventories/1/"},
        "summary_fields": {"inventory": {"id": 1, "name": "Demo Inventory"}},
        "created": "2018-03-01T12:00:00.000000Z",
        "modified": "2018-03-01T12:00:00.000000Z",
        "name": "localhost",
        "description": "",
        "inventory": 1,
        "enabled": true,
        "instance_id": "",
        "variables": "ansible_connection: local",
        "has_active_failures": false,
        "has_inventory_sources": false,
        "last_job": null,
        "last_job_host_summary": null
    })
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_every_registered_triple_resolves_to_its_schema() {
    let resolver = embedded();
    let registry = resolver.registry();

    for version in registry.versions() {
        let set = registry.version(&version).unwrap();
        for holder in set.holders() {
            for op in holder.operation_names() {
                let resolved = resolver
                    .resolve(Some(&version), holder.key().as_str(), &op)
                    .unwrap_or_else(|e| panic!("{}:{} {}: {}", version, holder.key(), op, e));
                assert_eq!(&resolved, holder.operation(&op).unwrap().schema());
            }
        }
    }
}

#[rstest]
#[case("/api/v1/me/")]
#[case("/api/v1/hosts/?page_size=200")]
#[case("https://tower.example.com/api/v1/jobs/42/")]
#[case("/api/v1/inventories/3/")]
#[case("authtoken")]
fn test_normalization_is_idempotent(#[case] path: &str) {
    let resolver = embedded();
    let once = normalize(path, "v1");
    let twice = normalize(&once, "v1");
    assert_eq!(once, twice);

    let a = resolver.locate(Some("v1"), &once).map(|(_, h, _)| h.key().to_string());
    let b = resolver.locate(Some("v1"), &twice).map(|(_, h, _)| h.key().to_string());
    assert_eq!(a.ok(), b.ok());
}

#[test]
fn test_prefixes_and_trailing_slash_stripped_to_bare_key() {
    let resolver = resolver_for(vec![
        SchemaDefinition::new("v1", "me").with_operation("get", json!({"type": "object"})),
    ]);
    let resolution = resolver.resolve_entry(Some("v1"), "/api/v1/me/", "get").unwrap();
    assert_eq!(resolution.component(), "me");
    assert!(matches!(resolution.matched_by, MatchKind::Normalized(_)));
}

#[test]
fn test_regex_key_matches_through_pattern_branch() {
    let resolver = embedded();
    let resolution = resolver.resolve_entry(Some("v1"), "/api/v1/jobs/42/", "get").unwrap();
    assert_eq!(resolution.component(), r"^/api/v1/jobs/\d+/$");
    assert_eq!(resolution.matched_by, MatchKind::Pattern);
}

#[test]
fn test_detail_pattern_after_normalization() {
    let resolver = embedded();
    let resolution = resolver.resolve_entry(None, "/api/v1/hosts/12/", "get").unwrap();
    assert_eq!(resolution.component(), r"/hosts/\d+");
    assert_eq!(resolution.matched_by, MatchKind::Pattern);

    let list = resolver.resolve_entry(None, "/api/v1/hosts/", "get").unwrap();
    assert_eq!(list.component(), "/hosts");
    assert_eq!(list.matched_by, MatchKind::Normalized(Stage::TrailingSlash));
}

#[test]
fn test_url_in_query_string_ignored() {
    let resolver = embedded();
    let path = "/api/v1/applications/?redirect_uris=https://example.com/cb";
    assert_eq!(normalize(path, "v1"), "/applications");

    let resolution = resolver.resolve_entry(None, path, "get").unwrap();
    assert_eq!(resolution.component(), "/applications");
    assert_eq!(resolution.version, "v1");
    assert_eq!(resolution.holder.version(), "v1");
}

#[test]
fn test_unknown_operation_lists_available() {
    let resolver = embedded();
    let err = resolver.resolve(None, "/api/v1/ping/", "post").unwrap_err();
    match err {
        SchemaError::UnknownOperation { operation, component, available } => {
            assert_eq!(operation, "post");
            assert_eq!(component, "/ping");
            assert_eq!(available, vec!["get", "method_not_allowed"]);
        }
        other => panic!("expected UnknownOperation, got {:?}", other),
    }
}

#[test]
fn test_unknown_component_reports_normalized_path() {
    let resolver = embedded();
    let err = resolver.resolve(None, "/api/v1/no_such_thing/?x=1", "get").unwrap_err();
    match err {
        SchemaError::UnknownComponent { component, version, known, .. } => {
            assert_eq!(component, "/no_such_thing");
            assert_eq!(version, "v1");
            assert!(known.contains(&"/me".to_string()));
        }
        other => panic!("expected UnknownComponent, got {:?}", other),
    }
}

// =============================================================================
// Version selection
// =============================================================================

#[test]
fn test_single_version_used_implicitly() {
    let resolver = embedded();
    assert_eq!(resolver.registry().versions(), vec!["v1"]);
    assert!(resolver.resolve(None, "/api/v1/me/", "get").is_ok());
}

#[test]
fn test_omitted_version_ambiguous_with_two_registered() {
    let resolver = resolver_for(vec![
        SchemaDefinition::new("v1", "/me").with_operation("get", json!({})),
        SchemaDefinition::new("v2", "/me").with_operation("get", json!({})),
    ]);
    let err = resolver.resolve(None, "/me", "get").unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousVersion { ref available } if available.len() == 2));

    let err = resolver.validate(&json!({}), "/me", "get", None).unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousVersion { .. }));
}

#[test]
fn test_unknown_version() {
    let resolver = embedded();
    let err = resolver.resolve(Some("v9"), "/me", "get").unwrap_err();
    assert!(matches!(err, SchemaError::UnknownVersion { ref version, .. } if version == "v9"));
}

#[test]
fn test_version_prefix_follows_selected_version() {
    let resolver = resolver_for(vec![
        SchemaDefinition::new("v1", "/me").with_operation("get", json!({"title": "one"})),
        SchemaDefinition::new("v2", "/me").with_operation("get", json!({"title": "two"})),
    ]);
    let schema = resolver.resolve(Some("v2"), "/api/v2/me/", "get").unwrap();
    assert_eq!(schema["title"], "two");

    // a v1 path does not lose its prefix when v2 is selected
    assert!(resolver.resolve(Some("v2"), "/api/v1/me/", "get").is_err());
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_empty_options_payload_names_missing_key() {
    let resolver = embedded();
    let err = resolver.validate(&json!({}), "authtoken", "options", None).unwrap_err();

    let failures = err.failures();
    assert!(!failures.is_empty());
    assert!(failures
        .iter()
        .any(|f| f.keyword == "required" && f.instance_path.is_empty()));
    assert!(err.to_string().contains("is a required property"));
    assert!(err.to_string().contains("component:authtoken"));
}

#[test]
fn test_valid_host_list() {
    let resolver = embedded();
    let payload = json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [host(1), host(2)]
    });
    resolver.validate(&payload, "/api/v1/hosts/", "get", None).unwrap();
}

#[test]
fn test_nested_failure_reports_instance_path() {
    let resolver = embedded();
    let mut broken = host(2);
    broken["enabled"] = json!("yes");
    let payload = json!({"count": 1, "next": null, "previous": null, "results": [broken]});

    let err = resolver.validate(&payload, "/api/v1/hosts/", "get", None).unwrap_err();
    let failure = &err.failures()[0];
    assert_eq!(failure.instance_path.to_string(), "/results/0/enabled");
    assert_eq!(failure.keyword, "type");
    assert!(failure.schema_path.ends_with("/enabled/type"));
}

#[test]
fn test_date_time_format_checked() {
    let resolver = embedded();
    let ok = json!({"token": "0123456789abcdef0123456789abcdef01234567", "expires": "2018-03-01T12:00:00Z"});
    resolver.validate(&ok, "/api/v1/authtoken/", "post", None).unwrap();

    let bad = json!({"token": "0123456789abcdef0123456789abcdef01234567", "expires": "next tuesday"});
    let err = resolver.validate(&bad, "/api/v1/authtoken/", "post", None).unwrap_err();
    let failure = &err.failures()[0];
    assert_eq!(failure.keyword, "format");
    assert_eq!(failure.instance_path, "/expires");
}

#[rstest]
#[case("/api/v1/me/")]
#[case("/api/v1/hosts/")]
#[case("/api/v1/inventories/")]
#[case("/api/v1/credentials/")]
#[case("/api/v1/applications/")]
#[case("/api/v1/tokens/")]
#[case("/api/v1/activity_stream/")]
#[case("/api/v1/authtoken/")]
fn test_unauthorized_body_accepted(#[case] endpoint: &str) {
    let resolver = embedded();
    let body = json!({"detail": "Authentication credentials were not provided."});
    resolver.validate(&body, endpoint, "unauthorized", None).unwrap();

    let wrong = json!({"detail": "Not found."});
    assert!(resolver.validate(&wrong, endpoint, "unauthorized", None).is_err());
}

#[test]
fn test_shared_definitions_visible_in_resolved_schema() {
    let resolver = embedded();
    let schema = resolver.resolve(None, "/api/v1/tokens/", "post").unwrap();
    assert_eq!(schema["$ref"], "#/definitions/token");
    assert!(schema["definitions"]["token"].is_object());

    let ping = resolver.resolve(None, "/api/v1/ping/", "get").unwrap();
    assert!(ping.get("definitions").is_none());
}

#[test]
fn test_resolver_shared_across_threads() {
    let resolver = embedded();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let resolver = resolver.clone();
            std::thread::spawn(move || {
                let path = format!("/api/v1/jobs/{}/", i + 1);
                resolver.resolve(None, &path, "get").is_ok()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
