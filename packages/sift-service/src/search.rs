mod access;
mod authorize;
mod query;
mod sql;

pub use authorize::{Authorization, ResultAuthorizer, ResultRow};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Caller, Error, Result, SiftService};
use access::AccessFilter;
use query::SearchQuery;
use sift_domain::ranking::{RankingCalculator, RankingError, SearchContext, SearchOrder};
use sift_storage::queries;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchFilters {
	/// Free text. Empty matches every visible document.
	#[serde(default)]
	pub q: String,
	#[serde(default)]
	pub course_ids: Vec<i64>,
	#[serde(default)]
	pub area_ids: Vec<String>,
	/// Case-insensitive title substring.
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default, with = "crate::time_serde::option")]
	pub time_start: Option<OffsetDateTime>,
	#[serde(default, with = "crate::time_serde::option")]
	pub time_end: Option<OffsetDateTime>,
	#[serde(default)]
	pub order: SearchOrder,
	/// Where the search was issued from. Required for [`SearchOrder::Location`].
	#[serde(default)]
	pub context: Option<SearchContext>,
}

/// The caller's visibility scope, resolved by the host.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccessInfo {
	/// Bypasses context and group filtering.
	#[serde(default)]
	pub everything: bool,
	/// Area id to the contexts the caller may see in it.
	#[serde(default)]
	pub user_contexts: BTreeMap<String, Vec<i64>>,
	#[serde(default)]
	pub separate_groups_contexts: Vec<i64>,
	#[serde(default)]
	pub user_groups: Vec<i64>,
	/// Context id to areas exempt from group restrictions in that context.
	#[serde(default)]
	pub visible_groups_contexts_areas: BTreeMap<i64, Vec<String>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub filters: SearchFilters,
	#[serde(default)]
	pub access: AccessInfo,
	/// Zero means the configured maximum.
	#[serde(default)]
	pub limit: u32,
	#[serde(default)]
	pub offset: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
	pub docid: String,
	pub itemid: i64,
	pub areaid: String,
	pub contextid: i64,
	pub courseid: i64,
	pub owneruserid: i64,
	pub userid: Option<i64>,
	pub groupid: Option<i64>,
	#[serde(rename = "type")]
	pub r#type: i32,
	#[serde(with = "crate::time_serde")]
	pub modified: OffsetDateTime,
	/// HTML with balanced highlight spans.
	pub title: String,
	/// HTML with balanced highlight spans.
	pub content: String,
	pub description1: Option<String>,
	pub description2: Option<String>,
	pub score: f64,
	pub file_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<SearchResult>,
	/// Matches counted before per-row authorization. An upper bound on what the caller may
	/// see, never less than `results.len()` for the same page.
	pub total_count: u64,
}

impl SiftService {
	pub async fn execute_query(
		&self,
		caller: Caller,
		req: SearchRequest,
	) -> Result<SearchResponse> {
		self.ensure_ready().await?;

		let filters = &req.filters;

		if let (Some(start), Some(end)) = (filters.time_start, filters.time_end)
			&& start > end
		{
			return Err(Error::InvalidRequest {
				message: "time_start must not be after time_end.".to_string(),
			});
		}

		let ranking =
			RankingCalculator::new(filters.order, filters.context.as_ref()).map_err(|err| {
				let message = match err {
					RankingError::LocationWithoutContext =>
						"Ordering by location requires a search context.",
					RankingError::LocationOutsideCourse =>
						"Ordering by location is only supported inside a course.",
				};

				Error::InvalidRequest { message: message.to_string() }
			})?;
		let Some(access) = AccessFilter::build(caller, &req.access, filters) else {
			tracing::debug!(user_id = caller.user_id, "Caller can see no contexts.");

			return Ok(SearchResponse::default());
		};
		let limit = if req.limit == 0 { self.cfg.search.max_results } else { req.limit };
		let query = SearchQuery::new(&filters.q, &access, ranking);
		let total: i64 =
			query.count().build().build_query_scalar().fetch_one(&self.db.pool).await?;

		if total == 0 {
			return Ok(SearchResponse::default());
		}

		let fetch = query.fetch(limit, req.offset);

		tracing::debug!(sql = %fetch.render(), total, "Fetching search page.");

		let rows: Vec<ResultRow> =
			fetch.build().build_query_as().fetch_all(&self.db.pool).await?;
		let authorization = ResultAuthorizer::new(&self.areas).authorize(caller, rows).await;

		for docid in &authorization.stale_docids {
			match queries::delete_document(&self.db, docid).await {
				Ok(_) => tracing::info!(docid = %docid, "Removed index rows of a deleted item."),
				Err(err) => tracing::warn!(
					error = %err,
					docid = %docid,
					"Failed to remove index rows of a deleted item."
				),
			}
		}

		Ok(SearchResponse {
			results: authorization.results,
			total_count: u64::try_from(total).unwrap_or_default(),
		})
	}
}
