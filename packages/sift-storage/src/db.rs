use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

/// Oldest server release with the text search functions the index relies on (Postgres 11).
pub const MIN_SERVER_VERSION_NUM: i32 = 110_000;

const SCHEMA_LOCK_ID: i64 = 5_141_820;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &sift_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		// Serializes concurrent bootstraps; released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;

		for statement in schema::statements(&sql) {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	pub async fn table_exists(&self, table: &str) -> Result<bool> {
		let exists: bool = sqlx::query_scalar(
			"\
SELECT EXISTS (
	SELECT 1
	FROM pg_catalog.pg_tables
	WHERE schemaname = current_schema() AND tablename = $1
)",
		)
		.bind(table)
		.fetch_one(&self.pool)
		.await?;

		Ok(exists)
	}

	pub async fn server_version_num(&self) -> Result<i32> {
		let version: i32 = sqlx::query_scalar("SELECT current_setting('server_version_num')::int")
			.fetch_one(&self.pool)
			.await?;

		Ok(version)
	}
}
