mod common;

use common::{version_body, FixtureServer};
use grind_cli::bootstrap;
use grind_cli::config::{Config, ConfigStore, Diagnostics, CONFIG_FILE_NAME};
use grind_cli::GrindError;
use std::fs;
use std::io::Cursor;

const USER_BODY: &str = r#"{"id":17,"name":"Ada Student","email":"ada@example.edu"}"#;

fn grinder(required: &'static str, recommended: &'static str, me_status: u16) -> FixtureServer {
    FixtureServer::start(move |request| match request.path() {
        "/v2/version" => (200, version_body(required, recommended)),
        "/v2/users/me" => (me_status, USER_BODY.to_string()),
        _ => (404, String::new()),
    })
}

fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
    ConfigStore::at(dir.path().join(CONFIG_FILE_NAME))
}

#[test]
fn test_load_runs_version_gate_and_merges_flags() {
    let server = grinder("0.0.1", "0.1.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let saved = Config::new(server.host(), "codegrinder=secret");
    store.save(&saved).unwrap();

    let loaded = store
        .load(Diagnostics {
            report: true,
            dump: false,
        })
        .unwrap();
    assert_eq!(loaded.host, saved.host);
    assert_eq!(loaded.cookie, saved.cookie);
    assert!(loaded.api_report);
    assert!(!loaded.api_dump);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path(), "/v2/version");
    assert_eq!(requests[0].header("cookie"), Some("codegrinder=secret"));
}

#[test]
fn test_load_with_server_version_fetches_descriptor_once() {
    let server = grinder("0.0.1", "0.1.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save(&Config::new(server.host(), "codegrinder=secret"))
        .unwrap();

    let (config, advertised) = store
        .load_with_server_version(Diagnostics::default())
        .unwrap();
    assert_eq!(config.cookie, "codegrinder=secret");
    assert_eq!(advertised.version, "2.5.0");
    assert_eq!(advertised.grind_version_required, "0.0.1");
    assert_eq!(advertised.grind_version_recommended, "0.1.0");
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn test_load_without_cookie_makes_no_request() {
    let server = grinder("0.0.1", "0.1.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save(&Config::new(server.host(), "")).unwrap();

    let err = store.load(Diagnostics::default()).unwrap_err();
    assert!(matches!(err, GrindError::NoSession { .. }));
    assert!(server.requests().is_empty());
}

#[test]
fn test_load_continues_when_upgrade_recommended() {
    let server = grinder("0.0.1", "99.0.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save(&Config::new(server.host(), "codegrinder=secret"))
        .unwrap();

    assert!(store.load(Diagnostics::default()).is_ok());
}

#[test]
fn test_load_fails_when_upgrade_required() {
    let server = grinder("99.0.0", "99.0.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save(&Config::new(server.host(), "codegrinder=secret"))
        .unwrap();

    let err = store.load(Diagnostics::default()).unwrap_err();
    match err {
        GrindError::UpgradeRequired { required, .. } => assert_eq!(required, "99.0.0"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_load_fails_on_unparseable_server_version() {
    let server = grinder("latest", "0.1.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save(&Config::new(server.host(), "codegrinder=secret"))
        .unwrap();

    let err = store.load(Diagnostics::default()).unwrap_err();
    assert!(matches!(err, GrindError::InvalidVersion { what: "required", .. }));
}

#[test]
fn test_load_without_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = store_in(&dir).load(Diagnostics::default()).unwrap_err();
    assert!(matches!(err, GrindError::ConfigMissing { .. }));
}

#[test]
fn test_bootstrap_saves_verified_cookie() {
    let server = grinder("0.0.1", "0.1.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut output = Vec::new();

    let user = bootstrap::run(
        &store,
        Some(server.host()),
        Diagnostics::default(),
        &mut Cursor::new("codegrinder=fresh\n"),
        &mut output,
    )
    .unwrap();
    assert_eq!(user.name, "Ada Student");

    let saved = store.read().unwrap();
    assert_eq!(saved, Config::new(server.host(), "codegrinder=fresh"));

    let paths: Vec<String> = server
        .requests()
        .iter()
        .map(|r| r.path().to_string())
        .collect();
    assert_eq!(paths, vec!["/v2/version", "/v2/users/me"]);
    assert_eq!(server.requests()[1].header("cookie"), Some("codegrinder=fresh"));
}

#[test]
fn test_bootstrap_rejected_cookie_leaves_config_untouched() {
    let server = grinder("0.0.1", "0.1.0", 401);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save(&Config::new("old.example.edu", "codegrinder=old"))
        .unwrap();
    let before = fs::read(store.path()).unwrap();

    let err = bootstrap::run(
        &store,
        Some(server.host()),
        Diagnostics::default(),
        &mut Cursor::new("codegrinder=rejected\n"),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, GrindError::UnexpectedStatus { .. }));
    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_bootstrap_upgrade_required_saves_nothing() {
    let server = grinder("99.0.0", "99.0.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let err = bootstrap::run(
        &store,
        Some(server.host()),
        Diagnostics::default(),
        &mut Cursor::new("codegrinder=fresh\n"),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, GrindError::UpgradeRequired { .. }));
    assert!(!store.path().exists());
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn test_bootstrap_uses_host_from_existing_config() {
    let server = grinder("0.0.1", "0.1.0", 200);
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save(&Config::new(server.host(), "codegrinder=expired"))
        .unwrap();

    bootstrap::run(
        &store,
        None,
        Diagnostics::default(),
        &mut Cursor::new("codegrinder=renewed\n"),
        &mut Vec::new(),
    )
    .unwrap();

    assert_eq!(store.read().unwrap().cookie, "codegrinder=renewed");
}
