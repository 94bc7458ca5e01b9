use time::OffsetDateTime;

use sift_config::Postgres;
use sift_storage::{
	db::{Db, MIN_SERVER_VERSION_NUM},
	models::{DocumentRecord, FileRecord},
	queries,
	schema::{DOCUMENTS_TABLE, FILES_TABLE},
};
use sift_testkit::TestDatabase;

fn document(docid: &str, areaid: &str, title: &str) -> DocumentRecord {
	DocumentRecord {
		docid: docid.to_string(),
		itemid: 1,
		title: title.to_string(),
		content: "Body text".to_string(),
		contextid: 10,
		areaid: areaid.to_string(),
		r#type: 1,
		courseid: 2,
		owneruserid: 0,
		modified: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
		userid: None,
		groupid: None,
		description1: None,
		description2: None,
	}
}

fn file(docid: &str, fileid: i64, text: &str) -> FileRecord {
	FileRecord {
		docid: docid.to_string(),
		fileid,
		title: format!("file-{fileid}.txt"),
		modified: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
		filecontenthash: format!("hash-{fileid}"),
		text: text.to_string(),
	}
}

async fn bootstrap(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn db_connects_and_bootstraps_twice() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping db_connects_and_bootstraps_twice; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	db.ensure_schema().await.expect("Schema bootstrap must be repeatable.");

	assert!(db.table_exists(DOCUMENTS_TABLE).await.expect("table lookup"));
	assert!(db.table_exists(FILES_TABLE).await.expect("table lookup"));
	assert!(!db.table_exists("sift_missing").await.expect("table lookup"));
	assert!(db.server_version_num().await.expect("server version") >= MIN_SERVER_VERSION_NUM);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn upsert_replaces_by_docid_and_refreshes_the_vector() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping upsert_replaces_by_docid_and_refreshes_the_vector; set SIFT_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;
	let first = queries::upsert_document(&db, &document("forum-post-1", "forum-post", "Kittens"))
		.await
		.expect("first upsert");
	let second = queries::upsert_document(&db, &document("forum-post-1", "forum-post", "Puppies"))
		.await
		.expect("second upsert");

	assert_eq!(first, second);

	let stored = queries::get_document(&db, "forum-post-1").await.expect("stored document");

	assert_eq!(stored.title, "Puppies");

	let matches_old: bool = sqlx::query_scalar(
		"SELECT fulltextindex @@ plainto_tsquery('kittens') FROM sift_documents WHERE docid = $1",
	)
	.bind("forum-post-1")
	.fetch_one(&db.pool)
	.await
	.expect("vector lookup");
	let matches_new: bool = sqlx::query_scalar(
		"SELECT fulltextindex @@ plainto_tsquery('puppies') FROM sift_documents WHERE docid = $1",
	)
	.bind("forum-post-1")
	.fetch_one(&db.pool)
	.await
	.expect("vector lookup");

	assert!(!matches_old);
	assert!(matches_new);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn file_deletes_are_scoped_to_their_document() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping file_deletes_are_scoped_to_their_document; set SIFT_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	queries::upsert_file(&db, &file("doc-a", 7, "alpha")).await.expect("file a");
	queries::upsert_file(&db, &file("doc-b", 7, "beta")).await.expect("file b");

	let removed = queries::delete_indexed_file(&db, "doc-a", 7).await.expect("delete file");

	assert_eq!(removed, 1);
	assert!(queries::list_indexed_files(&db, "doc-a").await.expect("list a").is_empty());
	assert_eq!(queries::list_indexed_files(&db, "doc-b").await.expect("list b").len(), 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn area_delete_prunes_orphan_files() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping area_delete_prunes_orphan_files; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrap(&test_db).await;

	queries::upsert_document(&db, &document("forum-1", "forum-post", "One")).await.expect("doc");
	queries::upsert_document(&db, &document("page-1", "page-content", "Two")).await.expect("doc");
	queries::upsert_file(&db, &file("forum-1", 1, "text")).await.expect("file");
	queries::upsert_file(&db, &file("page-1", 2, "text")).await.expect("file");

	let removed = queries::delete_area(&db, "forum-post").await.expect("delete area");

	assert_eq!(removed, 1);
	assert!(!queries::document_exists(&db, "forum-1").await.expect("lookup"));
	assert!(queries::document_exists(&db, "page-1").await.expect("lookup"));
	assert!(queries::list_indexed_files(&db, "forum-1").await.expect("list").is_empty());
	assert_eq!(queries::list_indexed_files(&db, "page-1").await.expect("list").len(), 1);

	queries::delete_all(&db).await.expect("delete all");

	assert!(queries::list_indexed_files(&db, "page-1").await.expect("list").is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
