use time::OffsetDateTime;

/// A stored search document, without its text search vector.
#[derive(Debug, sqlx::FromRow)]
pub struct IndexedDocument {
	pub id: i64,
	pub docid: String,
	pub itemid: i64,
	pub title: String,
	pub content: String,
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
}

/// Values written for one document. Keyed on `docid`.
#[derive(Debug)]
pub struct DocumentRecord {
	pub docid: String,
	pub itemid: i64,
	pub title: String,
	pub content: String,
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
}

#[derive(Debug, sqlx::FromRow)]
pub struct IndexedFile {
	pub id: i64,
	pub docid: String,
	pub fileid: i64,
	pub title: String,
	pub modified: OffsetDateTime,
	pub filecontenthash: String,
}

/// Values written for one attachment. `text` only feeds the vector and is not stored.
#[derive(Debug)]
pub struct FileRecord {
	pub docid: String,
	pub fileid: i64,
	pub title: String,
	pub modified: OffsetDateTime,
	pub filecontenthash: String,
	pub text: String,
}
