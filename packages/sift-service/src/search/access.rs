//! Turns a caller's visibility scope and optional filters into WHERE clauses shared by every
//! branch of a search statement.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::{
	Caller,
	search::{
		AccessInfo, SearchFilters,
		sql::{SqlFragment, SqlParam, bound},
	},
};
use sift_domain::NO_OWNER_ID;

#[derive(Clone, Debug)]
pub(crate) struct AccessFilter {
	shared: Vec<SqlFragment>,
	time_start: Option<OffsetDateTime>,
	time_end: Option<OffsetDateTime>,
}
impl AccessFilter {
	/// Returns `None` when the caller can see no context at all, in which case nothing should
	/// be queried.
	pub(crate) fn build(
		caller: Caller,
		access: &AccessInfo,
		filters: &SearchFilters,
	) -> Option<Self> {
		let mut shared = vec![ownership_clause(caller)];

		if !access.everything {
			let contexts = allowed_contexts(access, &filters.area_ids);

			if contexts.is_empty() {
				return None;
			}

			shared.push(bound("t.contextid = ANY(", SqlParam::BigIntArray(contexts), ")"));

			if let Some(clause) = group_clause(access) {
				shared.push(clause);
			}
		}
		if !filters.course_ids.is_empty() {
			shared.push(bound(
				"t.courseid = ANY(",
				SqlParam::BigIntArray(filters.course_ids.clone()),
				")",
			));
		}
		if !filters.area_ids.is_empty() {
			shared.push(bound(
				"t.areaid = ANY(",
				SqlParam::TextArray(filters.area_ids.clone()),
				")",
			));
		}
		if let Some(title) =
			filters.title.as_deref().map(str::trim).filter(|title| !title.is_empty())
		{
			shared.push(bound(
				"t.title ILIKE ",
				SqlParam::Text(format!("%{}%", escape_like(title))),
				"",
			));
		}

		Some(Self { shared, time_start: filters.time_start, time_end: filters.time_end })
	}

	/// Clauses for the documents-only branch, with time bounds on the document.
	pub(crate) fn document_clauses(&self) -> Vec<SqlFragment> {
		self.with_time_bounds("t")
	}

	/// Clauses for the documents-joined-to-files branch, with time bounds on the file.
	pub(crate) fn file_clauses(&self) -> Vec<SqlFragment> {
		self.with_time_bounds("f")
	}

	fn with_time_bounds(&self, alias: &str) -> Vec<SqlFragment> {
		let mut clauses = self.shared.clone();

		if let Some(start) = self.time_start {
			clauses.push(bound(&format!("{alias}.modified >= "), SqlParam::Timestamp(start), ""));
		}
		if let Some(end) = self.time_end {
			clauses.push(bound(&format!("{alias}.modified <= "), SqlParam::Timestamp(end), ""));
		}

		clauses
	}
}

fn ownership_clause(caller: Caller) -> SqlFragment {
	let mut clause = bound("(t.owneruserid = ", SqlParam::BigInt(NO_OWNER_ID), "");

	clause.append(&bound(" OR t.owneruserid = ", SqlParam::BigInt(caller.user_id), ")"));

	clause
}

/// Union of the allowed contexts of every requested area, or of every area when none were
/// requested. Sorted so identical scopes render identical statements.
fn allowed_contexts(access: &AccessInfo, requested_areas: &[String]) -> Vec<i64> {
	let mut contexts = BTreeSet::new();

	for (areaid, area_contexts) in &access.user_contexts {
		if !requested_areas.is_empty() && !requested_areas.contains(areaid) {
			continue;
		}

		contexts.extend(area_contexts.iter().copied());
	}

	contexts.into_iter().collect()
}

/// A document in a separate-groups context is visible only to members of its group, unless
/// its area is exempted for that context.
fn group_clause(access: &AccessInfo) -> Option<SqlFragment> {
	if access.separate_groups_contexts.is_empty() {
		return None;
	}

	let mut terms = vec![SqlFragment::new("t.groupid IS NULL")];

	if !access.user_groups.is_empty() {
		terms.push(bound(
			"t.groupid = ANY(",
			SqlParam::BigIntArray(sorted_unique(&access.user_groups)),
			")",
		));
	}

	terms.push(bound(
		"NOT (t.contextid = ANY(",
		SqlParam::BigIntArray(sorted_unique(&access.separate_groups_contexts)),
		"))",
	));

	for (contextid, areaids) in &access.visible_groups_contexts_areas {
		if areaids.is_empty() {
			continue;
		}

		let mut exception = bound("(t.contextid = ", SqlParam::BigInt(*contextid), "");

		exception.append(&bound(
			" AND t.areaid = ANY(",
			SqlParam::TextArray(areaids.clone()),
			"))",
		));
		terms.push(exception);
	}

	let mut clause = SqlFragment::new("(");

	clause.append(&SqlFragment::join(&terms, " OR ")).push_sql(")");

	Some(clause)
}

fn sorted_unique(ids: &[i64]) -> Vec<i64> {
	ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Makes `%`, `_` and the escape character itself match literally.
fn escape_like(value: &str) -> String {
	let mut out = String::with_capacity(value.len());

	for ch in value.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;

	const CALLER: Caller = Caller { user_id: 42 };

	fn render(clauses: &[SqlFragment]) -> String {
		SqlFragment::join(clauses, " AND ").render()
	}

	fn access(contexts: &[(&str, &[i64])]) -> AccessInfo {
		AccessInfo {
			user_contexts: contexts
				.iter()
				.map(|(area, ids)| (area.to_string(), ids.to_vec()))
				.collect(),
			..AccessInfo::default()
		}
	}

	#[test]
	fn owner_clause_is_always_present() {
		let access = AccessInfo { everything: true, ..AccessInfo::default() };
		let filter = AccessFilter::build(CALLER, &access, &SearchFilters::default())
			.expect("unrestricted callers always get a filter");
		let clauses = filter.document_clauses();

		assert_eq!(render(&clauses), "(t.owneruserid = $1 OR t.owneruserid = $2)");
		assert_eq!(
			clauses[0].params().cloned().collect::<Vec<_>>(),
			vec![SqlParam::BigInt(NO_OWNER_ID), SqlParam::BigInt(42)]
		);
	}

	#[test]
	fn empty_context_union_short_circuits() {
		let filters =
			SearchFilters { area_ids: vec!["mod_page-activity".to_string()], ..Default::default() };
		let scope = access(&[("mod_forum-post", &[10, 11])]);

		assert!(AccessFilter::build(CALLER, &scope, &filters).is_none());
		assert!(AccessFilter::build(CALLER, &access(&[]), &SearchFilters::default()).is_none());
	}

	#[test]
	fn empty_union_wins_over_group_restrictions() {
		let scope = AccessInfo {
			separate_groups_contexts: vec![10],
			user_groups: vec![3],
			..AccessInfo::default()
		};

		assert!(AccessFilter::build(CALLER, &scope, &SearchFilters::default()).is_none());
	}

	#[test]
	fn contexts_are_unioned_across_requested_areas() {
		let scope = access(&[("a", &[3, 1]), ("b", &[2, 3]), ("c", &[9])]);
		let filters =
			SearchFilters { area_ids: vec!["a".to_string(), "b".to_string()], ..Default::default() };
		let filter = AccessFilter::build(CALLER, &scope, &filters).expect("non-empty scope");
		let clauses = filter.document_clauses();

		assert_eq!(clauses[1].render(), "t.contextid = ANY($1)");
		assert_eq!(
			clauses[1].params().cloned().collect::<Vec<_>>(),
			vec![SqlParam::BigIntArray(vec![1, 2, 3])]
		);
		assert_eq!(clauses[2].render(), "t.areaid = ANY($1)");
	}

	#[test]
	fn group_clause_with_member_groups_and_exceptions() {
		let scope = AccessInfo {
			user_groups: vec![7, 5, 7],
			separate_groups_contexts: vec![10],
			visible_groups_contexts_areas: BTreeMap::from([(
				10,
				vec!["mod_forum-activity".to_string()],
			)]),
			..access(&[("mod_forum-post", &[10])])
		};
		let filter =
			AccessFilter::build(CALLER, &scope, &SearchFilters::default()).expect("non-empty scope");
		let clauses = filter.document_clauses();
		let group = &clauses[2];

		assert_eq!(
			group.render(),
			"(t.groupid IS NULL OR t.groupid = ANY($1) OR NOT (t.contextid = ANY($2)) \
			 OR (t.contextid = $3 AND t.areaid = ANY($4)))"
		);
		assert_eq!(
			group.params().cloned().collect::<Vec<_>>(),
			vec![
				SqlParam::BigIntArray(vec![5, 7]),
				SqlParam::BigIntArray(vec![10]),
				SqlParam::BigInt(10),
				SqlParam::TextArray(vec!["mod_forum-activity".to_string()]),
			]
		);
	}

	#[test]
	fn group_clause_without_member_groups_degrades() {
		let scope = AccessInfo {
			separate_groups_contexts: vec![10],
			..access(&[("mod_forum-post", &[10, 11])])
		};
		let filter =
			AccessFilter::build(CALLER, &scope, &SearchFilters::default()).expect("non-empty scope");
		let clauses = filter.document_clauses();

		assert_eq!(clauses[2].render(), "(t.groupid IS NULL OR NOT (t.contextid = ANY($1)))");
	}

	#[test]
	fn everything_skips_context_and_group_clauses() {
		let scope = AccessInfo {
			everything: true,
			separate_groups_contexts: vec![10],
			..AccessInfo::default()
		};
		let filter =
			AccessFilter::build(CALLER, &scope, &SearchFilters::default()).expect("everything");

		assert_eq!(filter.document_clauses().len(), 1);
	}

	#[test]
	fn time_bounds_target_each_branch() {
		let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
		let end = OffsetDateTime::from_unix_timestamp(1_800_000_000).expect("timestamp");
		let filters = SearchFilters {
			title: Some("  50%_off ".to_string()),
			course_ids: vec![4],
			time_start: Some(start),
			time_end: Some(end),
			..Default::default()
		};
		let scope = AccessInfo { everything: true, ..AccessInfo::default() };
		let filter = AccessFilter::build(CALLER, &scope, &filters).expect("everything");
		let documents = render(&filter.document_clauses());
		let files = render(&filter.file_clauses());

		assert!(documents.ends_with(
			"t.courseid = ANY($3) AND t.title ILIKE $4 AND t.modified >= $5 AND t.modified <= $6"
		));
		assert!(files.ends_with("AND f.modified >= $5 AND f.modified <= $6"));
		assert!(filter.file_clauses()[2].params().any(|param| {
			*param == SqlParam::Text("%50\\%\\_off%".to_string())
		}));
	}
}
