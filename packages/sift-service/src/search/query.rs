//! Count and fetch statements over the union of the document and document-with-file branches.

use sift_domain::{
	highlight,
	ranking::{CONTEXT_BOOST, COURSE_BOOST, RankingCalculator},
};

use crate::search::{
	access::AccessFilter,
	sql::{SqlFragment, SqlParam, bound},
};

const RESULT_COLUMNS: &str = "\
d.id, d.docid, d.itemid, d.contextid, d.areaid, d.type, d.courseid, d.owneruserid, d.modified, \
d.userid, d.groupid, d.description1, d.description2";

#[derive(Debug)]
pub(crate) struct SearchQuery<'a> {
	text: &'a str,
	access: &'a AccessFilter,
	ranking: RankingCalculator,
}
impl<'a> SearchQuery<'a> {
	pub(crate) fn new(text: &'a str, access: &'a AccessFilter, ranking: RankingCalculator) -> Self {
		Self { text: text.trim(), access, ranking }
	}

	/// `COUNT(DISTINCT id)` over both branches. Rows are counted before per-row authorization,
	/// so the value is an upper bound.
	pub(crate) fn count(&self) -> SqlFragment {
		let mut sql = SqlFragment::new(
			"SELECT COUNT(DISTINCT s.id) FROM (SELECT t.id FROM sift_documents t WHERE ",
		);

		sql.append(&self.document_predicate())
			.push_sql(
				" UNION ALL SELECT t.id FROM sift_documents t \
				 INNER JOIN sift_files f ON t.docid = f.docid WHERE ",
			)
			.append(&self.file_predicate())
			.push_sql(") AS s");

		sql
	}

	/// Ranked page of matching documents with highlighted title and content and the ids of
	/// the files that matched.
	pub(crate) fn fetch(&self, limit: u32, offset: u32) -> SqlFragment {
		let mut sql = SqlFragment::new(format!("SELECT {RESULT_COLUMNS}, "));

		sql.append(&self.headline("d.title"))
			.push_sql(" AS title, ")
			.append(&self.headline("d.content"))
			.push_sql(
				" AS content, r.rank, r.filematches FROM (SELECT g.id, g.filematches, \
				 (GREATEST(g.doc_score, g.file_score)",
			)
			.append(&self.boosts())
			.push_sql(
				")::double precision AS rank FROM (SELECT s.id, MAX(s.doc_score) AS doc_score, \
				 MAX(s.file_score) AS file_score, \
				 string_agg(DISTINCT s.fileid::text, ',') AS filematches FROM (",
			)
			.append(&self.document_branch())
			.push_sql(" UNION ALL ")
			.append(&self.file_branch())
			.push_sql(
				") AS s GROUP BY s.id) AS g INNER JOIN sift_documents d ON d.id = g.id \
				 ORDER BY rank DESC, g.id LIMIT ",
			)
			.push_param(SqlParam::BigInt(i64::from(limit)))
			.push_sql(" OFFSET ")
			.push_param(SqlParam::BigInt(i64::from(offset)))
			.push_sql(
				") AS r INNER JOIN sift_documents d ON d.id = r.id ORDER BY r.rank DESC, r.id",
			);

		sql
	}

	fn document_branch(&self) -> SqlFragment {
		let mut sql = SqlFragment::new("SELECT t.id, NULL::bigint AS fileid, ");

		sql.append(&self.score("t"))
			.push_sql(" AS doc_score, NULL::double precision AS file_score")
			.push_sql(" FROM sift_documents t WHERE ")
			.append(&self.document_predicate());

		sql
	}

	fn file_branch(&self) -> SqlFragment {
		let mut sql = SqlFragment::new("SELECT t.id, f.fileid, ");

		sql.append(&self.score("t"))
			.push_sql(" AS doc_score, ")
			.append(&self.score("f"))
			.push_sql(
				" AS file_score FROM sift_documents t \
				 INNER JOIN sift_files f ON t.docid = f.docid WHERE ",
			)
			.append(&self.file_predicate());

		sql
	}

	fn document_predicate(&self) -> SqlFragment {
		let mut clauses = self.access.document_clauses();

		if let Some(clause) = self.matches("t") {
			clauses.push(clause);
		}

		SqlFragment::join(&clauses, " AND ")
	}

	fn file_predicate(&self) -> SqlFragment {
		let mut clauses = self.access.file_clauses();

		if let Some(clause) = self.matches("f") {
			clauses.push(clause);
		}

		SqlFragment::join(&clauses, " AND ")
	}

	/// An empty query matches every visible row.
	fn matches(&self, alias: &str) -> Option<SqlFragment> {
		if self.text.is_empty() {
			return None;
		}

		Some(bound(
			&format!("{alias}.fulltextindex @@ plainto_tsquery("),
			SqlParam::Text(self.text.to_string()),
			")",
		))
	}

	fn score(&self, alias: &str) -> SqlFragment {
		if self.text.is_empty() {
			return SqlFragment::new("0::double precision");
		}

		bound(
			&format!("ts_rank({alias}.fulltextindex, plainto_tsquery("),
			SqlParam::Text(self.text.to_string()),
			"))::double precision",
		)
	}

	fn headline(&self, column: &str) -> SqlFragment {
		if self.text.is_empty() {
			return SqlFragment::new(column);
		}

		let mut sql = bound(
			&format!("ts_headline({column}, plainto_tsquery("),
			SqlParam::Text(self.text.to_string()),
			"), ",
		);

		sql.push_param(SqlParam::Text(highlight::headline_options())).push_sql(")");

		sql
	}

	fn boosts(&self) -> SqlFragment {
		let mut sql = SqlFragment::default();

		if let Some(courseid) = self.ranking.course_boost() {
			sql.append(&bound(
				" * CASE d.courseid WHEN ",
				SqlParam::BigInt(courseid),
				&format!(" THEN {} ELSE 1 END", boost_literal(COURSE_BOOST)),
			));
		}
		if let Some(contextid) = self.ranking.context_boost() {
			sql.append(&bound(
				" * CASE d.contextid WHEN ",
				SqlParam::BigInt(contextid),
				&format!(" THEN {} ELSE 1 END", boost_literal(CONTEXT_BOOST)),
			));
		}

		sql
	}
}

fn boost_literal(boost: f64) -> String {
	format!("{boost:.1}::double precision")
}
