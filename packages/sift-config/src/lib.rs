mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, FileIndexing, Postgres, Search, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_results == 0 {
		return Err(Error::Validation {
			message: "search.max_results must be greater than zero.".to_string(),
		});
	}
	if cfg.file_indexing.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "file_indexing.timeout_ms must be greater than zero.".to_string(),
		});
	}

	let tika_url = cfg.file_indexing.tika_url.as_str();

	if !tika_url.is_empty() && !tika_url.starts_with("http://") && !tika_url.starts_with("https://")
	{
		return Err(Error::Validation {
			message: "file_indexing.tika_url must start with http:// or https://.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let tika_url = cfg.file_indexing.tika_url.trim().trim_end_matches('/');

	cfg.file_indexing.tika_url = tika_url.to_string();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
