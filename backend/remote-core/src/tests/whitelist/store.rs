// Unit tests for whitelist parsing, loading and snapshot replacement.

use crate::error::config::ConfigError;
use crate::tests::{FixedInterfaces, write_file};
use crate::whitelist::{
    LOOPBACK_ADDRESS, PlatformFamily, Whitelist, WhitelistSource, WhitelistStore,
    parse_whitelist, resolve_source_path,
};

use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

/// A source that never consults the host's interfaces.
fn isolated_source(path: &Path) -> WhitelistSource {
    WhitelistSource::new(path)
        .with_platform(PlatformFamily::Other)
        .with_interfaces(Arc::new(FixedInterfaces::default()))
}

/// **VALUE**: Verifies that every non-array top-level value is rejected.
///
/// **WHY THIS MATTERS**: A whitelist file holding an object or a single string is a
/// configuration mistake. Accepting it would either allow nobody or silently allow the
/// wrong set of hosts.
///
/// **BUG THIS CATCHES**: Would catch the shape check being loosened to accept objects or
/// scalars.
#[test]
fn given_non_array_sources_when_loading_then_returns_shape_error() {
    let dir = TempDir::new().expect("temp dir");

    for (contents, expected) in [
        (r#"{"ips": ["1.2.3.4"]}"#, "object"),
        (r#""1.2.3.4""#, "string"),
        ("42", "number"),
        ("null", "null"),
        ("true", "boolean"),
    ] {
        // GIVEN: A source whose value is not an array
        let path = write_file(dir.path(), "whitelist.json", contents);

        // WHEN: Loading
        let result = isolated_source(&path).load();

        // THEN: Shape error naming what was found
        match result {
            Err(ConfigError::WhitelistNotArray { found, .. }) => assert_eq!(found, expected),
            other => panic!("Expected WhitelistNotArray for {contents}, got {other:?}"),
        }
    }
}

/// **VALUE**: Verifies that malformed JSON is a parse error rather than an empty list.
#[test]
fn given_invalid_json_when_loading_then_returns_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", "[\"1.2.3.4\",");

    let result = isolated_source(&path).load();

    assert!(
        matches!(result, Err(ConfigError::ParseError { .. })),
        "Expected ParseError, got {result:?}"
    );
}

/// **VALUE**: Verifies that non-string array elements are rejected with their index.
#[test]
fn given_number_entry_when_parsing_then_returns_entry_error_with_index() {
    let result = parse_whitelist(Path::new("whitelist.json"), r#"["1.2.3.4", 5]"#);

    match result {
        Err(ConfigError::WhitelistEntry { index, found, .. }) => {
            assert_eq!(index, 1);
            assert_eq!(found, "number");
        }
        other => panic!("Expected WhitelistEntry, got {other:?}"),
    }
}

/// **VALUE**: Verifies that a missing file surfaces as a read error.
#[test]
fn given_missing_file_when_loading_then_returns_read_error() {
    let dir = TempDir::new().expect("temp dir");

    let result = isolated_source(&dir.path().join("absent.json")).load();

    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

/// **VALUE**: Verifies that the loaded list always includes loopback and every listed entry.
///
/// **WHY THIS MATTERS**: Nodes on the same host talk to each other over 127.0.0.1. If
/// loopback were not merged in, co-located servers would kick each other.
#[test]
fn given_valid_list_when_loading_then_contains_entries_and_loopback() {
    // GIVEN: A list with two addresses
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["10.0.0.1", "10.0.0.2"]"#);

    // WHEN: Loading on an unrecognized platform
    let whitelist = isolated_source(&path).load().expect("valid whitelist");

    // THEN: Listed entries first, then loopback, nothing else
    assert_eq!(
        whitelist.entries(),
        &["10.0.0.1", "10.0.0.2", LOOPBACK_ADDRESS]
    );
    assert!(whitelist.contains("10.0.0.1"));
    assert!(whitelist.contains("10.0.0.2"));
    assert!(whitelist.contains(LOOPBACK_ADDRESS));
}

/// **VALUE**: Verifies that an empty list still allows loopback.
#[test]
fn given_empty_list_when_loading_then_only_loopback_is_allowed() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", "[]");

    let whitelist = isolated_source(&path).load().expect("valid whitelist");

    assert_eq!(whitelist.entries(), &[LOOPBACK_ADDRESS]);
}

/// **VALUE**: Verifies that the designated interface's addresses are merged in.
///
/// **BUG THIS CATCHES**: Would catch the platform-to-interface mapping being bypassed, or
/// addresses of other interfaces leaking into the whitelist.
#[test]
fn given_linux_platform_when_loading_then_merges_eth0_addresses_only() {
    // GIVEN: eth0 and a docker bridge with addresses
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["10.0.0.1"]"#);
    let interfaces = FixedInterfaces::default()
        .with("eth0", &[Ipv4Addr::new(192, 168, 1, 20)])
        .with("docker0", &[Ipv4Addr::new(172, 17, 0, 1)]);

    // WHEN: Loading as Linux
    let whitelist = WhitelistSource::new(&path)
        .with_platform(PlatformFamily::Linux)
        .with_interfaces(Arc::new(interfaces))
        .load()
        .expect("valid whitelist");

    // THEN: eth0 is present, docker0 is not
    assert_eq!(
        whitelist.entries(),
        &["10.0.0.1", LOOPBACK_ADDRESS, "192.168.1.20"]
    );
    assert!(!whitelist.contains("172.17.0.1"));
}

/// **VALUE**: Verifies that repeated addresses collapse to one entry.
#[test]
fn given_duplicate_entries_when_loading_then_entries_are_unique() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        dir.path(),
        "whitelist.json",
        r#"["127.0.0.1", "10.0.0.1", "10.0.0.1"]"#,
    );

    let whitelist = isolated_source(&path).load().expect("valid whitelist");

    assert_eq!(whitelist.entries(), &[LOOPBACK_ADDRESS, "10.0.0.1"]);
}

/// **VALUE**: Verifies that loading an unchanged file twice gives the same membership.
#[test]
fn given_unchanged_file_when_loading_twice_then_results_are_equal() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["10.0.0.1", "10.0.0.7"]"#);
    let source = isolated_source(&path);

    let first = source.load().expect("first load");
    let second = source.load().expect("second load");

    assert_eq!(first, second);
}

/// **VALUE**: Verifies that reload re-reads the file and swaps the snapshot wholesale.
///
/// **WHY THIS MATTERS**: Hot reload is the point of watching the file. A cached read would
/// keep enforcing the old list forever; an in-place mutation would let a reader holding the
/// old snapshot see a half-updated list.
#[test]
fn given_changed_file_when_reloading_then_new_snapshot_replaces_old() {
    // GIVEN: A store opened on one address
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["10.0.0.1"]"#);
    let store = WhitelistStore::open(isolated_source(&path)).expect("open store");
    let before = store.snapshot();

    // WHEN: The file changes and the store reloads
    write_file(dir.path(), "whitelist.json", r#"["10.0.0.2"]"#);
    let reloaded = store.reload().expect("reload");

    // THEN: New readers see the new list; the old snapshot is untouched
    assert!(store.snapshot().contains("10.0.0.2"));
    assert!(!store.snapshot().contains("10.0.0.1"));
    assert!(Arc::ptr_eq(&reloaded, &store.snapshot()));
    assert!(before.contains("10.0.0.1"));
    assert!(!before.contains("10.0.0.2"));
}

/// **VALUE**: Verifies that a broken edit does not wipe out the active whitelist.
///
/// **BUG THIS CATCHES**: Would catch reload clearing or replacing the snapshot before the
/// new contents have been validated.
#[test]
fn given_invalid_edit_when_reloading_then_previous_snapshot_is_kept() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["10.0.0.1"]"#);
    let store = WhitelistStore::open(isolated_source(&path)).expect("open store");

    write_file(dir.path(), "whitelist.json", r#"{"not": "a list"}"#);
    let result = store.reload();

    assert!(result.is_err());
    assert!(store.snapshot().contains("10.0.0.1"));
}

/// **VALUE**: Verifies that clones of a store share one snapshot.
#[test]
fn given_cloned_store_when_original_reloads_then_clone_sees_new_list() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(dir.path(), "whitelist.json", r#"["10.0.0.1"]"#);
    let store = WhitelistStore::open(isolated_source(&path)).expect("open store");
    let reader = store.clone();

    write_file(dir.path(), "whitelist.json", r#"["10.0.0.3"]"#);
    store.reload().expect("reload");

    assert!(reader.snapshot().contains("10.0.0.3"));
}

/// **VALUE**: Verifies that an unresolvable whitelist path is a configuration error.
#[test]
fn given_missing_path_when_resolving_then_returns_path_resolution_error() {
    let dir = TempDir::new().expect("temp dir");

    let result = resolve_source_path(&dir.path().join("nope").join("whitelist.json"));

    assert!(matches!(result, Err(ConfigError::PathResolution { .. })));
}

/// **VALUE**: Verifies that whitelist construction ignores repeats and keeps order.
#[test]
fn given_entries_when_building_whitelist_then_order_of_first_appearance_is_kept() {
    let whitelist = Whitelist::new(["b", "a", "b", "c"]);

    assert_eq!(whitelist.entries(), &["b", "a", "c"]);
    assert_eq!(whitelist.len(), 3);
    assert!(!whitelist.is_empty());
}

/// **VALUE**: Verifies that load errors point at the code that asked for the load.
///
/// **WHY THIS MATTERS**: Loads happen at startup and on every reload. A location inside the
/// whitelist module is the same for every failure and tells operators nothing about which
/// path triggered it.
///
/// **BUG THIS CATCHES**: Would catch `#[track_caller]` being dropped from `load`, or the
/// location being captured inside a closure where caller tracking does not reach.
#[test]
fn given_failing_sources_when_loading_then_error_location_is_the_caller() {
    // GIVEN: A missing file and a file with a non-string entry
    let dir = TempDir::new().expect("temp dir");
    let bad_entry = write_file(dir.path(), "whitelist.json", r#"["1.2.3.4", 7]"#);

    // WHEN: Loading each from this test
    let read_error = isolated_source(&dir.path().join("absent.json"))
        .load()
        .expect_err("missing file");
    let entry_error = isolated_source(&bad_entry)
        .load()
        .expect_err("non-string entry");

    // THEN: Both locations name this test file
    for error in [read_error, entry_error] {
        let location = match error {
            ConfigError::ReadError { location, .. }
            | ConfigError::WhitelistEntry { location, .. } => location,
            other => panic!("Unexpected error {other:?}"),
        };
        assert!(
            location.file.contains("tests"),
            "Should point at the caller, got {location}"
        );
    }
}
