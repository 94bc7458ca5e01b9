//! Client for an Apache Tika server's plain-text extraction endpoint.

use std::time::Duration;

use reqwest::{
	Client, StatusCode,
	header::{ACCEPT, CONTENT_DISPOSITION, HeaderValue},
};

use crate::{Error, Result};

/// Sends raw file bytes to `{tika_url}/tika` and returns the extracted text.
///
/// `filename` is forwarded as a type-detection hint. Any status other than 200 is an error.
pub async fn extract(
	cfg: &sift_config::FileIndexing,
	filename: &str,
	content: Vec<u8>,
) -> Result<String> {
	let client = client(cfg)?;
	let mut request = client
		.put(endpoint(cfg, "/tika")?)
		.header(ACCEPT, HeaderValue::from_static("text/plain; charset=UTF-8"))
		.body(content);

	if let Some(disposition) = content_disposition(filename) {
		request = request.header(CONTENT_DISPOSITION, HeaderValue::from_str(&disposition)?);
	}

	let res = request.send().await?;
	let status = res.status();

	if status != StatusCode::OK {
		return Err(Error::InvalidResponse {
			message: format!("Tika extraction returned HTTP {status}."),
		});
	}

	let text = res.text().await?;

	tracing::debug!(filename, chars = text.len(), "Extracted attachment text.");

	Ok(text)
}

/// Returns the server's version banner. Used as a reachability probe.
pub async fn version(cfg: &sift_config::FileIndexing) -> Result<String> {
	let res = client(cfg)?.get(endpoint(cfg, "/version")?).send().await?;
	let text = res.error_for_status()?.text().await?;

	Ok(text.trim().to_string())
}

fn client(cfg: &sift_config::FileIndexing) -> Result<Client> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

	Ok(client)
}

fn endpoint(cfg: &sift_config::FileIndexing, path: &str) -> Result<String> {
	let base = cfg.tika_url.trim().trim_end_matches('/');

	if base.is_empty() {
		return Err(Error::InvalidConfig {
			message: "file_indexing.tika_url is not configured.".to_string(),
		});
	}

	Ok(format!("{base}{path}"))
}

/// Header values must be visible ASCII, so names outside it are not forwarded.
fn content_disposition(filename: &str) -> Option<String> {
	let clean = filename.trim();

	if clean.is_empty() || !clean.chars().all(|ch| ch.is_ascii_graphic() || ch == ' ') {
		return None;
	}

	Some(format!("attachment; filename=\"{}\"", clean.replace('"', "")))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg(tika_url: &str) -> sift_config::FileIndexing {
		sift_config::FileIndexing {
			enabled: true,
			tika_url: tika_url.to_string(),
			..sift_config::FileIndexing::default()
		}
	}

	#[test]
	fn endpoint_joins_without_double_slashes() {
		let url = endpoint(&cfg("http://localhost:9998/"), "/tika").expect("configured url");

		assert_eq!(url, "http://localhost:9998/tika");
	}

	#[test]
	fn endpoint_requires_a_url() {
		let err = endpoint(&cfg("  "), "/tika").expect_err("missing url must fail");

		assert!(matches!(err, Error::InvalidConfig { .. }));
	}

	#[test]
	fn non_ascii_names_are_not_forwarded() {
		assert_eq!(
			content_disposition("report \"final\".pdf").as_deref(),
			Some("attachment; filename=\"report final.pdf\"")
		);
		assert_eq!(content_disposition("résumé.pdf"), None);
		assert_eq!(content_disposition(""), None);
	}
}
