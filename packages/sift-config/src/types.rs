use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub file_indexing: FileIndexing,
}
impl Config {
	/// File indexing needs both the switch and somewhere to send attachments for extraction.
	pub fn file_indexing_enabled(&self) -> bool {
		self.file_indexing.enabled && !self.file_indexing.tika_url.is_empty()
	}
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	/// Page size used when a caller asks for zero results.
	#[serde(default = "default_max_results")]
	pub max_results: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { max_results: default_max_results() }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct FileIndexing {
	#[serde(default)]
	pub enabled: bool,
	/// Base URL of the Apache Tika server, e.g. `http://localhost:9998`.
	#[serde(default)]
	pub tika_url: String,
	/// Attachments above this many kilobytes are indexed without their content. Zero rejects
	/// every attachment's content.
	#[serde(default = "default_max_index_file_kb")]
	pub max_index_file_kb: u64,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
}
impl FileIndexing {
	pub fn max_index_file_bytes(&self) -> u64 {
		self.max_index_file_kb.saturating_mul(1_024)
	}
}
impl Default for FileIndexing {
	fn default() -> Self {
		Self {
			enabled: false,
			tika_url: String::new(),
			max_index_file_kb: default_max_index_file_kb(),
			timeout_ms: default_timeout_ms(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_max_results() -> u32 {
	100
}

fn default_max_index_file_kb() -> u64 {
	10_000
}

fn default_timeout_ms() -> u64 {
	30_000
}
