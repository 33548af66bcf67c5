//! Schema, table and bulk-insert helpers

pub use nova_pg_data::toolbox::{
    ColumnType, DEFAULT_INSERT_CHUNK_SIZE, create_schema, create_table, execute_query, fetch_one,
    fetch_query, insert_rows, quote_ident, quote_literal, schema_exists, table_exists,
};
pub use nova_pg_data::encode_csv;
