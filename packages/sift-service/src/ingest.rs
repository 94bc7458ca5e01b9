//! Document ingestion and attachment reconciliation.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Result, SearchDocument, SiftService};
use sift_domain::file_sync::{self, AttachedFile, IndexedFileState};
use sift_storage::{
	models::{DocumentRecord, FileRecord},
	queries,
};

/// Field set the host exports for one document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentExport {
	pub docid: String,
	pub itemid: i64,
	pub areaid: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
	pub contextid: i64,
	pub courseid: i64,
	/// [`sift_domain::NO_OWNER_ID`] makes the document visible to everyone.
	#[serde(default)]
	pub owneruserid: i64,
	#[serde(default)]
	pub userid: Option<i64>,
	/// `None` means no group restriction.
	#[serde(default)]
	pub groupid: Option<i64>,
	#[serde(rename = "type")]
	pub r#type: i32,
	#[serde(with = "crate::time_serde")]
	pub modified: OffsetDateTime,
	#[serde(default)]
	pub description1: Option<String>,
	#[serde(default)]
	pub description2: Option<String>,
}
impl DocumentExport {
	fn into_record(self) -> DocumentRecord {
		DocumentRecord {
			docid: self.docid,
			itemid: self.itemid,
			title: self.title,
			content: self.content,
			contextid: self.contextid,
			areaid: self.areaid,
			r#type: self.r#type,
			courseid: self.courseid,
			owneruserid: self.owneruserid,
			modified: file_sync::to_storage_precision(self.modified),
			userid: self.userid,
			groupid: self.groupid,
			description1: self.description1,
			description2: self.description2,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcome {
	Indexed,
	Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
	Indexed,
	Unchanged,
	Deleted,
	Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
	pub fileid: i64,
	pub outcome: FileOutcome,
	/// False when the file was indexed by name only.
	pub text_extracted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
	pub docid: String,
	pub outcome: DocumentOutcome,
	pub files: Vec<FileReport>,
}
impl DocumentReport {
	pub fn is_success(&self) -> bool {
		self.outcome == DocumentOutcome::Indexed
			&& self.files.iter().all(|file| file.outcome != FileOutcome::Failed)
	}

	pub fn count(&self, outcome: FileOutcome) -> usize {
		self.files.iter().filter(|file| file.outcome == outcome).count()
	}
}

impl SiftService {
	/// Writes one document and, when `file_indexing` is set and enabled, reconciles its
	/// attachments. Write failures are reported, not returned, so a batch can carry on.
	pub async fn add_document(
		&self,
		doc: &dyn SearchDocument,
		file_indexing: bool,
	) -> Result<DocumentReport> {
		self.ensure_ready().await?;

		Ok(self.index_document(doc, file_indexing).await)
	}

	pub(crate) async fn index_document(
		&self,
		doc: &dyn SearchDocument,
		file_indexing: bool,
	) -> DocumentReport {
		let record = doc.export().into_record();
		let docid = record.docid.clone();

		if let Err(err) = queries::upsert_document(&self.db, &record).await {
			tracing::warn!(error = %err, docid = %docid, "Failed to write document.");

			return DocumentReport { docid, outcome: DocumentOutcome::Failed, files: Vec::new() };
		}

		let files = if file_indexing && self.file_indexing_enabled() {
			self.sync_files(doc, &docid).await
		} else {
			Vec::new()
		};

		DocumentReport { docid, outcome: DocumentOutcome::Indexed, files }
	}

	async fn sync_files(&self, doc: &dyn SearchDocument, docid: &str) -> Vec<FileReport> {
		let live = doc.files();
		let indexed = if doc.is_new() { None } else { self.indexed_file_states(docid).await };
		let plan = file_sync::plan(&live, indexed.as_deref());
		let mut reports = Vec::with_capacity(live.len() + plan.removed.len());

		for fileid in plan.removed {
			let outcome = match queries::delete_indexed_file(&self.db, docid, fileid).await {
				Ok(_) => FileOutcome::Deleted,
				Err(err) => {
					tracing::warn!(error = %err, docid, fileid, "Failed to delete detached file.");

					FileOutcome::Failed
				},
			};

			reports.push(FileReport { fileid, outcome, text_extracted: false });
		}

		reports.extend(plan.unchanged.into_iter().map(|fileid| FileReport {
			fileid,
			outcome: FileOutcome::Unchanged,
			text_extracted: false,
		}));

		for file in plan.to_index {
			reports.push(self.index_file(doc, docid, file).await);
		}

		reports
	}

	/// `None` on a failed lookup: every attachment is then rewritten, which the upsert makes
	/// safe, and detached ones are left for the next pass.
	async fn indexed_file_states(&self, docid: &str) -> Option<Vec<IndexedFileState>> {
		match queries::list_indexed_files(&self.db, docid).await {
			Ok(rows) => Some(
				rows.into_iter()
					.map(|row| IndexedFileState {
						fileid: row.fileid,
						title: row.title,
						modified: row.modified,
						content_hash: row.filecontenthash,
					})
					.collect(),
			),
			Err(err) => {
				tracing::warn!(error = %err, docid, "Failed to list indexed files.");

				None
			},
		}
	}

	async fn index_file(
		&self,
		doc: &dyn SearchDocument,
		docid: &str,
		file: &AttachedFile,
	) -> FileReport {
		let text = self.file_text(doc, docid, file).await;
		let text_extracted = text.is_some();
		let record = FileRecord {
			docid: docid.to_string(),
			fileid: file.fileid,
			title: file.filename.clone(),
			modified: file_sync::to_storage_precision(file.modified),
			filecontenthash: file.content_hash.clone(),
			text: text.unwrap_or_default(),
		};
		let outcome = match queries::upsert_file(&self.db, &record).await {
			Ok(_) => FileOutcome::Indexed,
			Err(err) => {
				tracing::warn!(
					error = %err,
					docid,
					fileid = file.fileid,
					filename = %file.filename,
					"Failed to write file."
				);

				FileOutcome::Failed
			},
		};

		FileReport { fileid: file.fileid, outcome, text_extracted }
	}

	/// Extracted body text, or `None` when the file is indexed by name only.
	async fn file_text(
		&self,
		doc: &dyn SearchDocument,
		docid: &str,
		file: &AttachedFile,
	) -> Option<String> {
		let cfg = &self.cfg.file_indexing;
		let ceiling = cfg.max_index_file_bytes();

		if ceiling == 0 || file.filesize > ceiling {
			tracing::warn!(
				docid,
				fileid = file.fileid,
				filename = %file.filename,
				filesize = file.filesize,
				max_index_file_kb = cfg.max_index_file_kb,
				"Skipping content of oversize file."
			);

			return None;
		}

		let content = match doc.file_content(file).await {
			Ok(content) => content,
			Err(err) => {
				tracing::warn!(error = %err, docid, fileid = file.fileid, "Failed to read file.");

				return None;
			},
		};

		match self.extractor.extract(cfg, &file.filename, content).await {
			Ok(text) => Some(text),
			Err(err) => {
				tracing::warn!(
					error = %err,
					docid,
					fileid = file.fileid,
					filename = %file.filename,
					"Text extraction failed."
				);

				None
			},
		}
	}
}
