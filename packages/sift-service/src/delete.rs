use crate::{Error, Result, SiftService};
use sift_storage::queries;

impl SiftService {
	/// Removes one document and its attachment rows. Returns the number of documents removed.
	pub async fn delete_by_id(&self, docid: &str) -> Result<u64> {
		let docid = docid.trim();

		if docid.is_empty() {
			return Err(Error::InvalidRequest { message: "docid is required.".to_string() });
		}

		let removed = queries::delete_document(&self.db, docid).await?;

		tracing::info!(docid, removed, "Deleted document from the index.");

		Ok(removed)
	}

	/// Removes every document of `areaid`, or the whole index when it is `None`.
	pub async fn delete(&self, areaid: Option<&str>) -> Result<u64> {
		let removed = match areaid.map(str::trim) {
			Some("") =>
				return Err(Error::InvalidRequest {
					message: "areaid must not be empty when provided.".to_string(),
				}),
			Some(areaid) => {
				let removed = queries::delete_area(&self.db, areaid).await?;

				tracing::info!(areaid, removed, "Deleted area from the index.");

				removed
			},
			None => {
				let removed = queries::delete_all(&self.db).await?;

				tracing::info!(removed, "Deleted every document from the index.");

				removed
			},
		};

		Ok(removed)
	}
}
