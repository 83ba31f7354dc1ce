/// Cardinality contract tests
///
/// ONE means zero-or-one with an error on more; MANY always yields the
/// whole sequence. The expected return shape of the call decides which
/// contract applies.
/// Run with: cargo test --test cardinality_tests
use sqlbind::fixture::FixtureSource;
use sqlbind::{
    BindError, Cardinality, Configuration, DataType, DirectTransactionFactory, Environment,
    MappedStatement, ResultSet, SessionFactory, Value,
};
use std::sync::Arc;

const SELECT_BY_NAME: &str = "SELECT name FROM users WHERE name = ?";
const SELECT_ALL: &str = "SELECT name FROM users";

fn configuration(source: Arc<FixtureSource>) -> Configuration {
    let mut config = Configuration::new();
    config
        .add_environment(
            Environment::builder("dev")
                .transaction_factory(DirectTransactionFactory::new())
                .data_source_arc(source)
                .build()
                .unwrap(),
        )
        .unwrap();
    config
        .add_statement(
            MappedStatement::builder("UserMapper.selectByName")
                .sql(SELECT_BY_NAME)
                .param("name", DataType::Text)
                .result_column("name", DataType::Text)
                .cardinality(Cardinality::One)
                .build()
                .unwrap(),
        )
        .unwrap();
    config
        .add_statement(
            MappedStatement::builder("UserMapper.selectAll")
                .sql(SELECT_ALL)
                .result_column("name", DataType::Text)
                .cardinality(Cardinality::Many)
                .build()
                .unwrap(),
        )
        .unwrap();
    config
}

fn rows(names: &[&str]) -> ResultSet {
    ResultSet::new(
        vec!["name".into()],
        names.iter().map(|n| vec![Value::from(*n)]).collect(),
    )
}

fn session_for(sql: &str, backing: ResultSet) -> sqlbind::Session {
    let source = Arc::new(FixtureSource::new().with_result(sql, backing));
    SessionFactory::new(configuration(source))
        .open_session()
        .unwrap()
}

#[test]
fn test_one_with_zero_rows_is_absent() {
    let mut session = session_for(SELECT_BY_NAME, rows(&[]));
    let user = session
        .select_one("UserMapper.selectByName", &["nobody".into()])
        .unwrap();
    assert!(user.is_none());
    session.close().unwrap();
}

#[test]
fn test_one_with_one_row_is_that_row() {
    let mut session = session_for(SELECT_BY_NAME, rows(&["chenqincheng"]));
    let user = session
        .select_one("UserMapper.selectByName", &["chenqincheng".into()])
        .unwrap()
        .unwrap();
    assert_eq!(user.get_str("name"), Some("chenqincheng"));
    session.close().unwrap();
}

#[test]
fn test_one_with_many_rows_carries_statement_and_count() {
    let mut session = session_for(SELECT_BY_NAME, rows(&["a", "b", "c"]));
    match session.select_one("UserMapper.selectByName", &["a".into()]) {
        Err(BindError::TooManyResults { statement, count }) => {
            assert_eq!(statement, "UserMapper.selectByName");
            assert_eq!(count, 3);
        }
        other => panic!("expected TooManyResults, got {other:?}"),
    }
    session.close().unwrap();
}

#[test]
fn test_many_yields_all_rows() {
    for k in [0usize, 1, 5] {
        let names: Vec<String> = (0..k).map(|i| format!("user{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let mut session = session_for(SELECT_ALL, rows(&name_refs));
        let users = session.select_list("UserMapper.selectAll", &[]).unwrap();
        assert_eq!(users.len(), k);
        session.close().unwrap();
    }
}

#[test]
fn test_sequence_expectation_overrides_declared_one() {
    // The statement declares ONE, but the caller asked for a sequence:
    // all rows come back, no contract violation.
    let mut session = session_for(SELECT_BY_NAME, rows(&["a", "b"]));
    let users = session
        .select_list("UserMapper.selectByName", &["a".into()])
        .unwrap();
    assert_eq!(users.len(), 2);
    session.close().unwrap();
}

#[test]
fn test_cardinality_error_is_not_a_mapping_error() {
    let mut session = session_for(SELECT_BY_NAME, rows(&["a", "b"]));
    let err = session
        .select_one("UserMapper.selectByName", &["a".into()])
        .unwrap_err();
    assert!(!matches!(err, BindError::Mapping(_)));
    assert!(matches!(err, BindError::TooManyResults { .. }));
    session.close().unwrap();
}
