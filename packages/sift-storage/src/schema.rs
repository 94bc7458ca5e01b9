pub const DOCUMENTS_TABLE: &str = "sift_documents";
pub const FILES_TABLE: &str = "sift_files";

pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

/// Statements of the rendered schema, in execution order.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_sift_documents.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_sift_documents.sql")),
				"tables/002_sift_files.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_sift_files.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_are_expanded() {
		let sql = render_schema();

		assert!(!sql.contains("\\ir "));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS sift_documents"));
		assert!(sql.contains("CREATE TABLE IF NOT EXISTS sift_files"));
	}

	#[test]
	fn every_statement_is_idempotent() {
		let sql = render_schema();

		for statement in statements(&sql) {
			assert!(
				statement.contains("IF NOT EXISTS"),
				"Statement must be safe to re-run: {statement}"
			);
		}
	}

	#[test]
	fn group_column_is_added_before_its_index() {
		let sql = render_schema();
		let column = sql.find("ADD COLUMN IF NOT EXISTS groupid").expect("groupid upgrade");
		let index = sql.find("sift_documents_groupid_idx").expect("groupid index");

		assert!(column < index);
	}
}
