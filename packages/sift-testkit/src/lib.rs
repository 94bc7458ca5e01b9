//! Disposable Postgres databases for the integration tests gated on `SIFT_PG_DSN`.

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

pub const DSN_ENV: &str = "SIFT_PG_DSN";

const MAINTENANCE_DATABASE: &str = "postgres";

/// Base DSN for the gated tests, or `None` when they should be skipped.
pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A uniquely named database on the server behind the base DSN. Call [`TestDatabase::cleanup`]
/// at the end of a test; dropping it without cleanup removes the database on a helper thread.
pub struct TestDatabase {
	dsn: String,
	owner: Option<Owner>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|source| Error::InvalidDsn { source })?;
		let owner = Owner {
			name: format!("sift_test_{}", Uuid::new_v4().simple()),
			maintenance: base.clone().database(MAINTENANCE_DATABASE),
		};

		owner.create().await?;

		let dsn = base.database(&owner.name).to_url_lossy().to_string();

		Ok(Self { dsn, owner: Some(owner) })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub async fn cleanup(mut self) -> Result<()> {
		match self.owner.take() {
			Some(owner) => owner.drop_database().await,
			None => Ok(()),
		}
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		let Some(owner) = self.owner.take() else { return };

		// The test runtime may be gone or single-threaded, so run on a separate one.
		thread::scope(|scope| {
			scope.spawn(|| {
				let dropped = Builder::new_current_thread()
					.enable_all()
					.build()
					.map_err(|err| err.to_string())
					.and_then(|runtime| {
						runtime.block_on(owner.drop_database()).map_err(|err| err.to_string())
					});

				if let Err(err) = dropped {
					eprintln!("Leaked test database {}: {err}", owner.name);
				}
			});
		});
	}
}

struct Owner {
	name: String,
	maintenance: PgConnectOptions,
}
impl Owner {
	async fn create(&self) -> Result<()> {
		let mut conn = self.connect("created").await?;

		sqlx::query(&format!(r#"CREATE DATABASE "{}""#, self.name))
			.execute(&mut conn)
			.await
			.map_err(|source| self.error("created", source))?;

		conn.close().await.map_err(|source| self.error("created", source))
	}

	async fn drop_database(&self) -> Result<()> {
		let mut conn = self.connect("dropped").await?;

		// Pools opened by the test may still hold connections.
		sqlx::query(
			"SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
			 WHERE datname = $1 AND pid <> pg_backend_pid()",
		)
		.bind(&self.name)
		.fetch_all(&mut conn)
		.await
		.map_err(|source| self.error("dropped", source))?;
		sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{}""#, self.name))
			.execute(&mut conn)
			.await
			.map_err(|source| self.error("dropped", source))?;

		conn.close().await.map_err(|source| self.error("dropped", source))
	}

	async fn connect(&self, action: &'static str) -> Result<PgConnection> {
		PgConnection::connect_with(&self.maintenance)
			.await
			.map_err(|source| self.error(action, source))
	}

	fn error(&self, action: &'static str, source: sqlx::Error) -> Error {
		Error::Lifecycle { name: self.name.clone(), action, source }
	}
}
