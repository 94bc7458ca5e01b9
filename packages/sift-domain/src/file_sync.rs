use std::collections::HashSet;

use time::OffsetDateTime;

/// Metadata of one live attachment as exported by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachedFile {
	pub fileid: i64,
	pub filename: String,
	pub modified: OffsetDateTime,
	pub content_hash: String,
	/// Size in bytes.
	pub filesize: u64,
}

/// What the index currently holds for one attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedFileState {
	pub fileid: i64,
	pub title: String,
	pub modified: OffsetDateTime,
	pub content_hash: String,
}
impl IndexedFileState {
	/// Postgres keeps microseconds, so anything finer is noise from the host clock.
	pub fn matches(&self, file: &AttachedFile) -> bool {
		same_instant(self.modified, file.modified)
			&& self.title == file.filename
			&& self.content_hash == file.content_hash
	}
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FileSyncPlan<'a> {
	/// Indexed and identical to the live attachment.
	pub unchanged: Vec<i64>,
	/// Indexed but no longer attached.
	pub removed: Vec<i64>,
	/// New or changed attachments, in the order the host listed them.
	pub to_index: Vec<&'a AttachedFile>,
}
#[cfg(test)]
impl FileSyncPlan<'_> {
	fn is_noop(&self) -> bool {
		self.removed.is_empty() && self.to_index.is_empty()
	}
}

/// Diffs live attachments against indexed rows. `indexed` is `None` for documents known to be
/// new, which have nothing to diff against.
pub fn plan<'a>(
	live: &'a [AttachedFile],
	indexed: Option<&[IndexedFileState]>,
) -> FileSyncPlan<'a> {
	let mut seen = HashSet::with_capacity(live.len());
	let mut pending: Vec<&AttachedFile> =
		live.iter().filter(|file| seen.insert(file.fileid)).collect();
	let mut plan = FileSyncPlan::default();

	for row in indexed.unwrap_or_default() {
		match pending.iter().position(|file| file.fileid == row.fileid) {
			Some(index) =>
				if row.matches(pending[index]) {
					pending.remove(index);
					plan.unchanged.push(row.fileid);
				},
			None => plan.removed.push(row.fileid),
		}
	}

	plan.to_index = pending;

	plan
}

/// Drops sub-microsecond precision so that stored timestamps compare equal to the host's.
pub fn to_storage_precision(ts: OffsetDateTime) -> OffsetDateTime {
	let nanos = ts.nanosecond();

	ts.replace_nanosecond(nanos - nanos % 1_000).unwrap_or(ts)
}

fn same_instant(a: OffsetDateTime, b: OffsetDateTime) -> bool {
	to_storage_precision(a) == to_storage_precision(b)
}
