/// Configuration loader tests
///
/// A JSON document plus live data sources boots a working registry.
/// Run with: cargo test --test config_loader_tests
use sqlbind::fixture::FixtureSource;
use sqlbind::loader;
use sqlbind::{BindError, ConnectionSource, ResultSet, SessionFactory};
use std::collections::HashMap;
use std::sync::Arc;

const DOCUMENT: &str = r#"{
    "default_environment": "dev",
    "environments": [
        {"id": "dev", "transaction_manager": "direct", "data_source": "main"},
        {"id": "container", "transaction_manager": "managed", "data_source": "main"}
    ],
    "statements": [
        {
            "key": "UserMapper.selectByName",
            "sql": "SELECT id, name FROM users WHERE name = ?",
            "params": [{"name": "name", "type": "text"}],
            "result": [
                {"name": "id", "type": "integer"},
                {"name": "name", "type": "text"}
            ],
            "cardinality": "one"
        },
        {
            "key": "UserMapper.deleteByName",
            "kind": "delete",
            "sql": "DELETE FROM users WHERE name = ?",
            "params": [{"name": "name", "type": "text"}]
        }
    ]
}"#;

fn sources(fixture: Arc<FixtureSource>) -> HashMap<String, Arc<dyn ConnectionSource>> {
    let mut sources: HashMap<String, Arc<dyn ConnectionSource>> = HashMap::new();
    sources.insert("main".into(), fixture);
    sources
}

#[test]
fn test_loaded_configuration_serves_sessions() {
    let fixture = Arc::new(
        FixtureSource::new()
            .with_result(
                "SELECT id, name FROM users WHERE name = ?",
                ResultSet::new(
                    vec!["id".into(), "name".into()],
                    vec![vec![7i64.into(), "chenqincheng".into()]],
                ),
            )
            .with_affected("DELETE FROM users WHERE name = ?", 1),
    );
    let config = loader::load(DOCUMENT, sources(Arc::clone(&fixture))).unwrap();
    let factory = SessionFactory::new(config);

    let mut session = factory.open_session().unwrap();
    let user = session
        .select_one("UserMapper.selectByName", &["chenqincheng".into()])
        .unwrap()
        .unwrap();
    assert_eq!(user.get_i64("id"), Some(7));

    let affected = session
        .update("UserMapper.deleteByName", &["chenqincheng".into()])
        .unwrap();
    assert_eq!(affected, 1);

    session.commit().unwrap();
    session.close().unwrap();
    assert_eq!(fixture.commits(), 1);
}

#[test]
fn test_loaded_managed_environment_never_commits() {
    let fixture = Arc::new(FixtureSource::new().with_result(
        "SELECT id, name FROM users WHERE name = ?",
        ResultSet::new(vec!["id".into(), "name".into()], vec![]),
    ));
    let config = loader::load(DOCUMENT, sources(Arc::clone(&fixture))).unwrap();
    let factory = SessionFactory::new(config);

    let mut session = factory.open_session_env("container").unwrap();
    let user = session
        .select_one("UserMapper.selectByName", &["nobody".into()])
        .unwrap();
    assert!(user.is_none());

    session.commit().unwrap();
    session.close().unwrap();
    assert_eq!(fixture.commits(), 0);
    assert_eq!(fixture.closes(), 0);
}

#[test]
fn test_duplicate_environment_id_rejected() {
    let json = r#"{
        "environments": [
            {"id": "dev", "transaction_manager": "direct", "data_source": "main"},
            {"id": "dev", "transaction_manager": "managed", "data_source": "main"}
        ]
    }"#;
    let result = loader::load(json, sources(Arc::new(FixtureSource::new())));
    assert!(matches!(result, Err(BindError::Configuration(_))));
}

#[test]
fn test_unknown_default_environment_rejected() {
    let json = r#"{
        "default_environment": "prod",
        "environments": [
            {"id": "dev", "transaction_manager": "direct", "data_source": "main"}
        ]
    }"#;
    let result = loader::load(json, sources(Arc::new(FixtureSource::new())));
    assert!(matches!(result, Err(BindError::Configuration(_))));
}

#[test]
fn test_duplicate_statement_key_rejected() {
    let json = r#"{
        "environments": [
            {"id": "dev", "transaction_manager": "direct", "data_source": "main"}
        ],
        "statements": [
            {"key": "M.a", "kind": "delete", "sql": "DELETE FROM t"},
            {"key": "M.a", "kind": "delete", "sql": "DELETE FROM t"}
        ]
    }"#;
    let result = loader::load(json, sources(Arc::new(FixtureSource::new())));
    assert!(matches!(result, Err(BindError::Configuration(_))));
}
