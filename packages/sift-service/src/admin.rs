use serde::{Deserialize, Serialize};

use crate::{
	DocumentOutcome, ENGINE_NAME, EngineSelector, Error, FileOutcome, Result, SiftService,
};
use sift_storage::{
	db::MIN_SERVER_VERSION_NUM,
	schema::{DOCUMENTS_TABLE, FILES_TABLE},
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IndexReport {
	pub areas: u64,
	/// Areas whose documents could not be listed.
	pub areas_failed: u64,
	pub documents_indexed: u64,
	pub documents_failed: u64,
	pub files_indexed: u64,
	pub files_failed: u64,
	pub promoted: bool,
}

impl SiftService {
	/// Fails with [`Error::NotReady`] when a table is missing or the server is too old.
	pub async fn ensure_ready(&self) -> Result<()> {
		for table in [DOCUMENTS_TABLE, FILES_TABLE] {
			if !self.db.table_exists(table).await? {
				return Err(Error::NotReady { message: format!("{table} table does not exist.") });
			}
		}

		let version = self.db.server_version_num().await?;

		if version < MIN_SERVER_VERSION_NUM {
			return Err(Error::NotReady {
				message: format!(
					"PostgreSQL 11 or newer is required, server_version_num is {version}."
				),
			});
		}

		Ok(())
	}

	/// Re-indexes every document of every registered area, then optionally makes this the
	/// host's active engine. Per-document failures are counted, not returned.
	pub async fn force_index(&self, selector: Option<&dyn EngineSelector>) -> Result<IndexReport> {
		self.ensure_ready().await?;

		let file_indexing = self.file_indexing_enabled();
		let mut report = IndexReport::default();
		let mut area_ids: Vec<&String> = self.areas.keys().collect();

		area_ids.sort();

		for areaid in area_ids {
			let Some(area) = self.areas.get(areaid) else { continue };

			report.areas += 1;

			let documents = match area.indexable_documents().await {
				Ok(documents) => documents,
				Err(err) => {
					tracing::warn!(
						error = %err,
						areaid = %areaid,
						"Failed to list area documents."
					);

					report.areas_failed += 1;

					continue;
				},
			};

			tracing::info!(areaid = %areaid, documents = documents.len(), "Indexing area.");

			for doc in documents {
				let doc_report = self.index_document(doc.as_ref(), file_indexing).await;

				if doc_report.outcome == DocumentOutcome::Indexed {
					report.documents_indexed += 1;
				} else {
					report.documents_failed += 1;
				}

				report.files_indexed += doc_report.count(FileOutcome::Indexed) as u64;
				report.files_failed += doc_report.count(FileOutcome::Failed) as u64;
			}
		}

		if let Some(selector) = selector {
			selector.promote(ENGINE_NAME).await?;

			report.promoted = true;

			tracing::info!(engine = ENGINE_NAME, "Promoted search engine.");
		}

		Ok(report)
	}
}
