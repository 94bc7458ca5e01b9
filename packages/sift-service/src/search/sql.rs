//! Clause and parameter pairs, assembled into one statement at the end.

use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SqlParam {
	BigInt(i64),
	Text(String),
	BigIntArray(Vec<i64>),
	TextArray(Vec<String>),
	Timestamp(OffsetDateTime),
}

#[derive(Clone, Debug, PartialEq)]
enum Part {
	Sql(String),
	Param(SqlParam),
}

/// A piece of SQL whose placeholders are stored inline with their values, so the two can
/// never drift apart when fragments are combined.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SqlFragment {
	parts: Vec<Part>,
}
impl SqlFragment {
	pub(crate) fn new(sql: impl Into<String>) -> Self {
		let mut fragment = Self::default();

		fragment.push_sql(sql);

		fragment
	}

	pub(crate) fn push_sql(&mut self, sql: impl Into<String>) -> &mut Self {
		let sql = sql.into();

		if !sql.is_empty() {
			self.parts.push(Part::Sql(sql));
		}

		self
	}

	pub(crate) fn push_param(&mut self, param: SqlParam) -> &mut Self {
		self.parts.push(Part::Param(param));

		self
	}

	pub(crate) fn append(&mut self, other: &SqlFragment) -> &mut Self {
		self.parts.extend(other.parts.iter().cloned());

		self
	}

	/// Joins fragments with `separator`. An empty input yields an empty fragment.
	pub(crate) fn join(fragments: &[SqlFragment], separator: &str) -> Self {
		let mut joined = Self::default();

		for (index, fragment) in fragments.iter().enumerate() {
			if index > 0 {
				joined.push_sql(separator);
			}

			joined.append(fragment);
		}

		joined
	}

	#[cfg(test)]
	pub(crate) fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}

	#[cfg(test)]
	pub(crate) fn params(&self) -> impl Iterator<Item = &SqlParam> {
		self.parts.iter().filter_map(|part| match part {
			Part::Param(param) => Some(param),
			Part::Sql(_) => None,
		})
	}

	/// Renders the statement text with `$n` placeholders numbered the way the query builder
	/// numbers binds.
	pub(crate) fn render(&self) -> String {
		let mut out = String::new();
		let mut index = 0;

		for part in &self.parts {
			match part {
				Part::Sql(sql) => out.push_str(sql),
				Part::Param(_) => {
					index += 1;

					out.push('$');
					out.push_str(&index.to_string());
				},
			}
		}

		out
	}

	pub(crate) fn build(&self) -> QueryBuilder<'static, Postgres> {
		let mut builder = QueryBuilder::new("");

		for part in &self.parts {
			match part {
				Part::Sql(sql) => {
					builder.push(sql);
				},
				Part::Param(SqlParam::BigInt(value)) => {
					builder.push_bind(*value);
				},
				Part::Param(SqlParam::Text(value)) => {
					builder.push_bind(value.clone());
				},
				Part::Param(SqlParam::BigIntArray(values)) => {
					builder.push_bind(values.clone());
				},
				Part::Param(SqlParam::TextArray(values)) => {
					builder.push_bind(values.clone());
				},
				Part::Param(SqlParam::Timestamp(value)) => {
					builder.push_bind(*value);
				},
			}
		}

		builder
	}
}

/// Shorthand for a fragment of the form `{before}$n{after}`.
pub(crate) fn bound(before: &str, param: SqlParam, after: &str) -> SqlFragment {
	let mut fragment = SqlFragment::new(before);

	fragment.push_param(param).push_sql(after);

	fragment
}
