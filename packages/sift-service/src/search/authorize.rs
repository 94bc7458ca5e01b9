//! Per-row authorization of fetched search rows.

use std::{collections::HashMap, sync::Arc};

use time::OffsetDateTime;

use crate::{AccessOutcome, Caller, SearchArea, search::SearchResult};
use sift_domain::{NO_OWNER_ID, highlight};

/// One row of the fetch statement, before authorization.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ResultRow {
	pub id: i64,
	pub docid: String,
	pub itemid: i64,
	pub contextid: i64,
	pub areaid: String,
	pub r#type: i32,
	pub courseid: i64,
	pub owneruserid: i64,
	pub modified: OffsetDateTime,
	pub userid: Option<i64>,
	pub groupid: Option<i64>,
	pub description1: Option<String>,
	pub description2: Option<String>,
	/// Headline text with raw highlight markers.
	pub title: String,
	/// Headline text with raw highlight markers.
	pub content: String,
	pub rank: f64,
	/// Comma-separated ids of the matching files.
	pub filematches: Option<String>,
}

#[derive(Debug, Default)]
pub struct Authorization {
	pub results: Vec<SearchResult>,
	/// Documents whose source item is gone and whose index rows should be removed.
	pub stale_docids: Vec<String>,
	pub denied: usize,
}

pub struct ResultAuthorizer<'a> {
	areas: &'a HashMap<String, Arc<dyn SearchArea>>,
}
impl<'a> ResultAuthorizer<'a> {
	pub fn new(areas: &'a HashMap<String, Arc<dyn SearchArea>>) -> Self {
		Self { areas }
	}

	/// Keeps the order of `rows`. A failing access check counts as a denial.
	pub async fn authorize(&self, caller: Caller, rows: Vec<ResultRow>) -> Authorization {
		let mut authorization = Authorization::default();

		for row in rows {
			// The index and live ownership can race, so re-check before asking the area.
			if row.owneruserid != NO_OWNER_ID && row.owneruserid != caller.user_id {
				authorization.denied += 1;

				continue;
			}

			let Some(area) = self.areas.get(&row.areaid) else {
				tracing::debug!(
					docid = %row.docid,
					areaid = %row.areaid,
					"Skipping row of an unknown area."
				);

				authorization.denied += 1;

				continue;
			};
			let outcome = match area.check_access(caller, row.itemid).await {
				Ok(outcome) => outcome,
				Err(err) => {
					tracing::warn!(
						error = %err,
						docid = %row.docid,
						areaid = %row.areaid,
						"Access check failed."
					);

					AccessOutcome::Denied
				},
			};

			match outcome {
				AccessOutcome::Granted => authorization.results.push(to_result(row)),
				AccessOutcome::Denied => authorization.denied += 1,
				AccessOutcome::Deleted => authorization.stale_docids.push(row.docid),
			}
		}

		authorization
	}
}

fn to_result(row: ResultRow) -> SearchResult {
	SearchResult {
		docid: row.docid,
		itemid: row.itemid,
		areaid: row.areaid,
		contextid: row.contextid,
		courseid: row.courseid,
		owneruserid: row.owneruserid,
		userid: row.userid,
		groupid: row.groupid,
		r#type: row.r#type,
		modified: row.modified,
		title: highlight::render(&row.title),
		content: highlight::render(&row.content),
		description1: row.description1,
		description2: row.description2,
		score: row.rank,
		file_ids: parse_file_matches(row.filematches.as_deref()),
	}
}

fn parse_file_matches(raw: Option<&str>) -> Vec<i64> {
	let mut ids: Vec<i64> = raw
		.unwrap_or_default()
		.split(',')
		.filter_map(|part| part.trim().parse().ok())
		.collect();

	ids.sort_unstable();
	ids.dedup();

	ids
}
