//! Highlight markers emitted by `ts_headline` and their HTML rendering.
//!
//! The markers only use characters that HTML escaping leaves untouched, so escaping the whole
//! headline first neutralises any markup in the indexed text while keeping the markers intact.

use std::sync::LazyLock;

use regex::Regex;

pub const HIGHLIGHT_START: &str = "@@HI_S@@";
pub const HIGHLIGHT_END: &str = "@@HI_E@@";
pub const HIGHLIGHT_OPEN_TAG: &str = "<span class=\"highlight\">";
pub const HIGHLIGHT_CLOSE_TAG: &str = "</span>";

/// An end marker, up to three separator characters, and a start marker. Collapsing these turns
/// two highlighted words into one highlighted phrase.
static ADJACENT_MATCHES: LazyLock<Regex> = LazyLock::new(|| {
	let pattern = format!(
		"{}([ .,\\-]{{0,3}}){}",
		regex::escape(HIGHLIGHT_END),
		regex::escape(HIGHLIGHT_START)
	);

	Regex::new(&pattern).expect("Adjacent-match pattern is built from escaped constants.")
});

/// Options string passed to `ts_headline` so that it wraps matches in our markers.
pub fn headline_options() -> String {
	format!("StartSel={HIGHLIGHT_START}, StopSel={HIGHLIGHT_END}")
}

/// Renders headline text into HTML with balanced highlight spans.
pub fn render(text: &str) -> String {
	let escaped = escape_html(text);
	let merged = merge_adjacent(&escaped);
	let mut out = String::with_capacity(merged.len() + 32);
	let mut depth = 0_usize;
	let mut unmatched_closes = 0_usize;
	let mut rest = merged.as_str();

	while let Some((index, marker)) = next_marker(rest) {
		out.push_str(&rest[..index]);

		match marker {
			Marker::Start => {
				out.push_str(HIGHLIGHT_OPEN_TAG);

				depth += 1;
			},
			Marker::End => {
				out.push_str(HIGHLIGHT_CLOSE_TAG);

				if depth == 0 {
					unmatched_closes += 1;
				} else {
					depth -= 1;
				}
			},
		}

		rest = &rest[index + marker.len()..];
	}

	out.push_str(rest);

	// Truncated headlines can cut a match in half. Open the stray closes from the start and
	// close the dangling opens at the end.
	let mut balanced = HIGHLIGHT_OPEN_TAG.repeat(unmatched_closes);

	balanced.push_str(&out);
	balanced.push_str(&HIGHLIGHT_CLOSE_TAG.repeat(depth));

	balanced
}

pub fn escape_html(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#039;"),
			_ => out.push(ch),
		}
	}

	out
}

fn merge_adjacent(text: &str) -> String {
	ADJACENT_MATCHES.replace_all(text, "$1").into_owned()
}

#[derive(Clone, Copy)]
enum Marker {
	Start,
	End,
}
impl Marker {
	fn len(self) -> usize {
		match self {
			Self::Start => HIGHLIGHT_START.len(),
			Self::End => HIGHLIGHT_END.len(),
		}
	}
}

fn next_marker(text: &str) -> Option<(usize, Marker)> {
	let start = text.find(HIGHLIGHT_START).map(|index| (index, Marker::Start));
	let end = text.find(HIGHLIGHT_END).map(|index| (index, Marker::End));

	match (start, end) {
		(Some(start), Some(end)) => Some(if start.0 <= end.0 { start } else { end }),
		(start, end) => start.or(end),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn strip_markers(text: &str) -> String {
		text.replace(HIGHLIGHT_START, "").replace(HIGHLIGHT_END, "")
	}

	fn to_plain_text(html: &str) -> String {
		html.replace(HIGHLIGHT_OPEN_TAG, "")
			.replace(HIGHLIGHT_CLOSE_TAG, "")
			.replace("&lt;", "<")
			.replace("&gt;", ">")
			.replace("&quot;", "\"")
			.replace("&#039;", "'")
			.replace("&amp;", "&")
	}

	fn count(haystack: &str, needle: &str) -> usize {
		haystack.matches(needle).count()
	}

	fn marked(words: &[(&str, bool)]) -> String {
		words
			.iter()
			.map(|(word, hit)| {
				if *hit { format!("{HIGHLIGHT_START}{word}{HIGHLIGHT_END}") } else { word.to_string() }
			})
			.collect::<Vec<_>>()
			.join(" ")
	}

	#[test]
	fn escapes_markup_before_highlighting() {
		let raw = format!("<b>{HIGHLIGHT_START}fox{HIGHLIGHT_END}</b> & 'friends'");
		let html = render(&raw);

		assert_eq!(
			html,
			"&lt;b&gt;<span class=\"highlight\">fox</span>&lt;/b&gt; &amp; &#039;friends&#039;"
		);
	}

	#[test]
	fn merges_matches_separated_by_a_space() {
		let raw = marked(&[("the", false), ("QUICK", true), ("BROWN", true), ("fox", false)]);
		let html = render(&raw);

		assert_eq!(html, "the <span class=\"highlight\">QUICK BROWN</span> fox");
	}

	#[test]
	fn adjacent_match_pattern_compiles() {
		let re = LazyLock::force(&ADJACENT_MATCHES);

		assert!(re.is_match(&format!("{HIGHLIGHT_END} {HIGHLIGHT_START}")));
		assert!(!re.is_match(&format!("{HIGHLIGHT_END} and {HIGHLIGHT_START}")));
	}

	#[test]
	fn merges_across_short_punctuation_runs() {
		let raw = format!(
			"{HIGHLIGHT_START}alpha{HIGHLIGHT_END}, -{HIGHLIGHT_START}beta{HIGHLIGHT_END}"
		);

		assert_eq!(render(&raw), "<span class=\"highlight\">alpha, -beta</span>");
	}

	#[test]
	fn keeps_separate_spans_across_long_gaps() {
		let raw = format!(
			"{HIGHLIGHT_START}alpha{HIGHLIGHT_END} and {HIGHLIGHT_START}beta{HIGHLIGHT_END}"
		);
		let html = render(&raw);

		assert_eq!(count(&html, HIGHLIGHT_OPEN_TAG), 2);
		assert_eq!(count(&html, HIGHLIGHT_CLOSE_TAG), 2);
	}

	#[test]
	fn balanced_input_round_trips_to_plain_text() {
		let cases = [
			marked(&[("one", true), ("two", false), ("three", true)]),
			marked(&[("a<b", true), ("&", true), ("\"q\"", false)]),
			format!("{HIGHLIGHT_START}x{HIGHLIGHT_END}.{HIGHLIGHT_START}y{HIGHLIGHT_END}"),
			"no markers at all".to_string(),
		];

		for raw in cases {
			let html = render(&raw);

			assert_eq!(count(&html, HIGHLIGHT_OPEN_TAG), count(&html, HIGHLIGHT_CLOSE_TAG));
			assert_eq!(to_plain_text(&html), strip_markers(&raw), "raw: {raw}");
		}
	}

	#[test]
	fn truncated_input_is_balanced() {
		let cases = [
			format!("leading {HIGHLIGHT_START}cut"),
			format!("cut{HIGHLIGHT_END} trailing"),
			format!("{HIGHLIGHT_END}{HIGHLIGHT_END} x {HIGHLIGHT_START}"),
			format!("{HIGHLIGHT_START}{HIGHLIGHT_START}y"),
		];

		for raw in cases {
			let html = render(&raw);

			assert_eq!(
				count(&html, HIGHLIGHT_OPEN_TAG),
				count(&html, HIGHLIGHT_CLOSE_TAG),
				"raw: {raw}, html: {html}"
			);
		}
	}

	#[test]
	fn stray_close_is_opened_from_the_start() {
		let raw = format!("cut{HIGHLIGHT_END} tail");

		assert_eq!(render(&raw), "<span class=\"highlight\">cut</span> tail");
	}

	#[test]
	fn dangling_open_is_closed_at_the_end() {
		let raw = format!("head {HIGHLIGHT_START}cut");

		assert_eq!(render(&raw), "head <span class=\"highlight\">cut</span>");
	}

	#[test]
	fn headline_options_name_both_markers() {
		assert_eq!(headline_options(), "StartSel=@@HI_S@@, StopSel=@@HI_E@@");
	}
}
