pub mod admin;
pub mod delete;
pub mod ingest;
pub mod search;
pub mod time_serde;

mod error;

pub use admin::IndexReport;
pub use error::{Error, Result};
pub use ingest::{DocumentExport, DocumentOutcome, DocumentReport, FileOutcome, FileReport};
pub use search::{
	AccessInfo, Authorization, ResultAuthorizer, ResultRow, SearchFilters, SearchRequest,
	SearchResponse, SearchResult,
};
pub use sift_domain::{
	file_sync::AttachedFile,
	ranking::{ContextLevel, SearchContext, SearchOrder},
};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};

use sift_config::{Config, FileIndexing};
use sift_providers::tika;
use sift_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Name under which this engine registers with the host.
pub const ENGINE_NAME: &str = "pg_fulltext";

/// Identity of whoever issued a search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
	pub user_id: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
	Granted,
	Denied,
	/// The source item no longer exists.
	Deleted,
}

/// A host item that can be written to the index.
pub trait SearchDocument
where
	Self: Send + Sync,
{
	fn export(&self) -> DocumentExport;

	/// True when the host knows the item has never been indexed.
	fn is_new(&self) -> bool;

	fn files(&self) -> Vec<AttachedFile>;

	/// Raw bytes of one attachment. Only called when its text is about to be extracted.
	fn file_content<'a>(&'a self, file: &'a AttachedFile) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// A host search area: the owner of one kind of indexed item.
pub trait SearchArea
where
	Self: Send + Sync,
{
	fn area_id(&self) -> &str;

	fn check_access(&self, caller: Caller, itemid: i64) -> BoxFuture<'_, Result<AccessOutcome>>;

	fn indexable_documents(&self) -> BoxFuture<'_, Result<Vec<Box<dyn SearchDocument>>>>;
}

pub trait TextExtractor
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a FileIndexing,
		filename: &'a str,
		content: Vec<u8>,
	) -> BoxFuture<'a, Result<String>>;
}

/// Makes an engine the host's active search engine.
pub trait EngineSelector
where
	Self: Send + Sync,
{
	fn promote<'a>(&'a self, engine: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// What the host sees of a search engine.
pub trait SearchEngine
where
	Self: Send + Sync,
{
	/// `Err(Error::NotReady)` explains what is missing.
	fn is_server_ready(&self) -> BoxFuture<'_, Result<()>>;

	fn execute_query(
		&self,
		caller: Caller,
		req: SearchRequest,
	) -> BoxFuture<'_, Result<SearchResponse>>;

	fn add_document<'a>(
		&'a self,
		doc: &'a dyn SearchDocument,
		file_indexing: bool,
	) -> BoxFuture<'a, Result<DocumentReport>>;

	fn delete_by_id<'a>(&'a self, docid: &'a str) -> BoxFuture<'a, Result<u64>>;

	/// Deletes one area's documents, or everything when `areaid` is `None`.
	fn delete<'a>(&'a self, areaid: Option<&'a str>) -> BoxFuture<'a, Result<u64>>;

	fn file_indexing_enabled(&self) -> bool;

	fn supported_orders(&self, context: Option<&SearchContext>) -> Vec<SearchOrder>;

	fn supports_group_filtering(&self) -> bool {
		true
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub db: Db,
	pub areas: HashMap<String, Arc<dyn SearchArea>>,
	pub extractor: Arc<dyn TextExtractor>,
}
impl SiftService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_extractor(cfg, db, Arc::new(DefaultProviders))
	}

	pub fn with_extractor(cfg: Config, db: Db, extractor: Arc<dyn TextExtractor>) -> Self {
		Self { cfg, db, areas: HashMap::new(), extractor }
	}

	/// Registers an area, replacing any previous one with the same id.
	pub fn register_area(&mut self, area: Arc<dyn SearchArea>) -> Option<Arc<dyn SearchArea>> {
		self.areas.insert(area.area_id().to_string(), area)
	}

	pub fn file_indexing_enabled(&self) -> bool {
		self.cfg.file_indexing_enabled()
	}

	pub fn supported_orders(&self, context: Option<&SearchContext>) -> Vec<SearchOrder> {
		sift_domain::ranking::supported_orders(context)
	}
}

struct DefaultProviders;

impl TextExtractor for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a FileIndexing,
		filename: &'a str,
		content: Vec<u8>,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(tika::extract(cfg, filename, content).await?) })
	}
}

impl SearchEngine for SiftService {
	fn is_server_ready(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(SiftService::ensure_ready(self))
	}

	fn execute_query(
		&self,
		caller: Caller,
		req: SearchRequest,
	) -> BoxFuture<'_, Result<SearchResponse>> {
		Box::pin(SiftService::execute_query(self, caller, req))
	}

	fn add_document<'a>(
		&'a self,
		doc: &'a dyn SearchDocument,
		file_indexing: bool,
	) -> BoxFuture<'a, Result<DocumentReport>> {
		Box::pin(SiftService::add_document(self, doc, file_indexing))
	}

	fn delete_by_id<'a>(&'a self, docid: &'a str) -> BoxFuture<'a, Result<u64>> {
		Box::pin(SiftService::delete_by_id(self, docid))
	}

	fn delete<'a>(&'a self, areaid: Option<&'a str>) -> BoxFuture<'a, Result<u64>> {
		Box::pin(SiftService::delete(self, areaid))
	}

	fn file_indexing_enabled(&self) -> bool {
		SiftService::file_indexing_enabled(self)
	}

	fn supported_orders(&self, context: Option<&SearchContext>) -> Vec<SearchOrder> {
		SiftService::supported_orders(self, context)
	}
}
