//! PostgreSQL helpers: credentials from configuration files, cursors and
//! chunked retrieval
//!
//! ```no_run
//! # async fn demo() -> nova_pg::utils::DataResult<()> {
//! use nova_pg::{config, utils};
//!
//! nova_pg::initialize_environment();
//! nova_pg::init_tracing();
//!
//! let creds = config::load_db_config("config/db_config.json", "dev")?;
//! let url = config::build_connection_string(&creds)?;
//!
//! let mut cur = utils::get_cursor(&url).await?;
//! let result = utils::fetch_in_chunks(&mut cur, "SELECT * FROM raw.ohlcv", "raw.ohlcv", 2000).await?;
//! cur.commit().await?;
//! println!("{:?}: {} rows", result.columns, result.rows.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod toolbox;
pub mod utils;

pub use nova_pg_common::{init_tracing, initialize_environment, redact_connection_string};
pub use nova_pg_data::mock;
