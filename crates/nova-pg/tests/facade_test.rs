//! End-to-end use of the public `config` / `utils` / `toolbox` namespaces

use nova_pg::config::{self, ConfigErrorKind};
use nova_pg::mock::MockCursor;
use nova_pg::toolbox::{ColumnType, insert_rows};
use nova_pg::utils::{Value, fetch_in_chunks};
use nova_pg_test_utils::{TempConfig, reference_config};

#[test]
fn test_config_to_connection_string() {
    let file = TempConfig::json("db_config.json", &reference_config());

    let creds = config::load_db_config(file.path(), "dev").expect("load");
    assert_eq!(
        config::build_connection_string(&creds).expect("build"),
        "postgresql://u:p@localhost:5432/nq"
    );
    assert_eq!(
        config::connection_string_for_env(file.path(), "dev").expect("build"),
        "postgresql://u:p@localhost:5432/nq"
    );
}

#[test]
fn test_connection_string_for_missing_env() {
    let file = TempConfig::json("db_config.json", &reference_config());
    let error = config::connection_string_for_env(file.path(), "qa").expect_err("no qa section");
    assert_eq!(error.kind(), ConfigErrorKind::NotFound);
}

#[test]
fn test_password_never_reaches_debug_output() {
    let file = TempConfig::json("db_config.json", &reference_config());
    let creds = config::load_db_config(file.path(), "dev").expect("load");

    let rendered = format!("{creds:?}");
    assert!(!rendered.contains("\"p\""));
    assert!(!nova_pg::redact_connection_string("postgresql://u:p@localhost:5432/nq").contains(":p@"));
}

#[tokio::test]
async fn test_utils_and_toolbox_share_one_cursor() {
    let mut cursor = MockCursor::new();
    let rows: Vec<_> = (0..25).map(|i| vec![Value::from(i)]).collect();
    cursor.push_result(&["volume"], rows.clone());

    let result = fetch_in_chunks(&mut cursor, "SELECT volume FROM raw.ohlcv", "raw.ohlcv", 10)
        .await
        .expect("fetch");
    assert_eq!(result.rows, rows);
    assert_eq!(cursor.fetch_sizes_returned(), vec![10, 10, 5, 0]);

    insert_rows(&mut cursor, "raw", "copy", &["volume"], &result.rows, 10)
        .await
        .expect("insert");
    assert_eq!(cursor.copies().len(), 3);
    assert_eq!("int".parse::<ColumnType>().expect("known type").sql_type(), "BIGINT");
}
