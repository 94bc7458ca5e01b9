pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid {env} value: {source}.", env = crate::DSN_ENV)]
	InvalidDsn { source: sqlx::Error },

	#[error("Test database {name} could not be {action}: {source}.")]
	Lifecycle { name: String, action: &'static str, source: sqlx::Error },
}
