use sqlx::{Executor, Postgres, Transaction};

use crate::{
	Error, Result,
	db::Db,
	models::{DocumentRecord, FileRecord, IndexedDocument, IndexedFile},
};

const DOCUMENT_COLUMNS: &str = "\
id, docid, itemid, title, content, contextid, areaid, type, courseid, owneruserid, modified, \
userid, groupid, description1, description2";

/// Inserts or replaces a document and rebuilds its vector in the same transaction, so a reader
/// never sees new text paired with a stale vector. Returns the row id.
pub async fn upsert_document(db: &Db, doc: &DocumentRecord) -> Result<i64> {
	if doc.docid.trim().is_empty() {
		return Err(Error::InvalidArgument("docid must be non-empty.".to_string()));
	}

	let mut tx = db.pool.begin().await?;
	let id = upsert_document_tx(&mut tx, doc).await?;

	tx.commit().await?;

	Ok(id)
}

pub async fn upsert_document_tx(
	tx: &mut Transaction<'_, Postgres>,
	doc: &DocumentRecord,
) -> Result<i64> {
	let id: i64 = sqlx::query_scalar(
		"\
INSERT INTO sift_documents (
	docid,
	itemid,
	title,
	content,
	contextid,
	areaid,
	type,
	courseid,
	owneruserid,
	modified,
	userid,
	groupid,
	description1,
	description2
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
ON CONFLICT (docid) DO UPDATE
SET
	itemid = EXCLUDED.itemid,
	title = EXCLUDED.title,
	content = EXCLUDED.content,
	contextid = EXCLUDED.contextid,
	areaid = EXCLUDED.areaid,
	type = EXCLUDED.type,
	courseid = EXCLUDED.courseid,
	owneruserid = EXCLUDED.owneruserid,
	modified = EXCLUDED.modified,
	userid = EXCLUDED.userid,
	groupid = EXCLUDED.groupid,
	description1 = EXCLUDED.description1,
	description2 = EXCLUDED.description2
RETURNING id",
	)
	.bind(doc.docid.as_str())
	.bind(doc.itemid)
	.bind(doc.title.as_str())
	.bind(doc.content.as_str())
	.bind(doc.contextid)
	.bind(doc.areaid.as_str())
	.bind(doc.r#type)
	.bind(doc.courseid)
	.bind(doc.owneruserid)
	.bind(doc.modified)
	.bind(doc.userid)
	.bind(doc.groupid)
	.bind(doc.description1.as_deref())
	.bind(doc.description2.as_deref())
	.fetch_one(&mut **tx)
	.await?;

	sqlx::query(
		"\
UPDATE sift_documents
SET fulltextindex =
	setweight(to_tsvector(coalesce(title, '')), 'A')
	|| setweight(to_tsvector(coalesce(content, '')), 'B')
	|| setweight(to_tsvector(coalesce(description1, '')), 'C')
	|| setweight(to_tsvector(coalesce(description2, '')), 'C')
WHERE id = $1",
	)
	.bind(id)
	.execute(&mut **tx)
	.await?;

	Ok(id)
}

pub async fn find_document(db: &Db, docid: &str) -> Result<Option<IndexedDocument>> {
	let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM sift_documents WHERE docid = $1");
	let doc =
		sqlx::query_as::<_, IndexedDocument>(&sql).bind(docid).fetch_optional(&db.pool).await?;

	Ok(doc)
}

pub async fn get_document(db: &Db, docid: &str) -> Result<IndexedDocument> {
	find_document(db, docid)
		.await?
		.ok_or_else(|| Error::NotFound(format!("Document {docid} is not indexed.")))
}

pub async fn document_exists(db: &Db, docid: &str) -> Result<bool> {
	let exists: bool =
		sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM sift_documents WHERE docid = $1)")
			.bind(docid)
			.fetch_one(&db.pool)
			.await?;

	Ok(exists)
}

pub async fn list_indexed_files(db: &Db, docid: &str) -> Result<Vec<IndexedFile>> {
	let files = sqlx::query_as::<_, IndexedFile>(
		"\
SELECT id, docid, fileid, title, modified, filecontenthash
FROM sift_files
WHERE docid = $1
ORDER BY id",
	)
	.bind(docid)
	.fetch_all(&db.pool)
	.await?;

	Ok(files)
}

/// Writes one attachment row and its vector in a single statement. The filename is weighted
/// above the extracted text.
pub async fn upsert_file(db: &Db, file: &FileRecord) -> Result<i64> {
	let id: i64 = sqlx::query_scalar(
		"\
INSERT INTO sift_files (docid, fileid, title, modified, filecontenthash, fulltextindex)
VALUES (
	$1,
	$2,
	$3,
	$4,
	$5,
	setweight(to_tsvector($6), 'B') || setweight(to_tsvector($3), 'A')
)
ON CONFLICT (docid, fileid) DO UPDATE
SET
	title = EXCLUDED.title,
	modified = EXCLUDED.modified,
	filecontenthash = EXCLUDED.filecontenthash,
	fulltextindex = EXCLUDED.fulltextindex
RETURNING id",
	)
	.bind(file.docid.as_str())
	.bind(file.fileid)
	.bind(file.title.as_str())
	.bind(file.modified)
	.bind(file.filecontenthash.as_str())
	.bind(file.text.as_str())
	.fetch_one(&db.pool)
	.await?;

	Ok(id)
}

pub async fn delete_indexed_file(db: &Db, docid: &str, fileid: i64) -> Result<u64> {
	let result = sqlx::query("DELETE FROM sift_files WHERE docid = $1 AND fileid = $2")
		.bind(docid)
		.bind(fileid)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

/// Removes a document and every attachment row under it. Returns the number of documents
/// removed.
pub async fn delete_document(db: &Db, docid: &str) -> Result<u64> {
	let mut tx = db.pool.begin().await?;

	delete_files_exec(&mut *tx, docid).await?;

	let result = sqlx::query("DELETE FROM sift_documents WHERE docid = $1")
		.bind(docid)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(result.rows_affected())
}

/// Removes every document of one area, then any attachment rows left without a document.
pub async fn delete_area(db: &Db, areaid: &str) -> Result<u64> {
	let mut tx = db.pool.begin().await?;
	let result = sqlx::query("DELETE FROM sift_documents WHERE areaid = $1")
		.bind(areaid)
		.execute(&mut *tx)
		.await?;

	prune_orphan_files_exec(&mut *tx).await?;
	tx.commit().await?;

	Ok(result.rows_affected())
}

pub async fn delete_all(db: &Db) -> Result<u64> {
	let mut tx = db.pool.begin().await?;
	let result = sqlx::query("DELETE FROM sift_documents").execute(&mut *tx).await?;

	sqlx::query("DELETE FROM sift_files").execute(&mut *tx).await?;
	tx.commit().await?;

	Ok(result.rows_affected())
}

async fn delete_files_exec<'e, E>(executor: E, docid: &str) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result =
		sqlx::query("DELETE FROM sift_files WHERE docid = $1").bind(docid).execute(executor).await?;

	Ok(result.rows_affected())
}

async fn prune_orphan_files_exec<'e, E>(executor: E) -> Result<u64>
where
	E: Executor<'e, Database = Postgres>,
{
	let result = sqlx::query(
		"\
DELETE FROM sift_files f
WHERE NOT EXISTS (SELECT 1 FROM sift_documents d WHERE d.docid = f.docid)",
	)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}
