use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"title="([^"]*)""#).unwrap_or_else(|e| panic!("invalid title pattern: {e}"))
});

static DESC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"desc="([^"]*)""#).unwrap_or_else(|e| panic!("invalid desc pattern: {e}"))
});

/// Caption text attached to a diagram fence.
///
/// Both fields come from the free-form meta string that follows the language
/// tag on the opening fence:
///
/// ````markdown
/// ```mermaid title="Flowchart" desc="shows control flow"
/// graph TD; A-->B
/// ```
/// ````
///
/// Only the first occurrence of each attribute is used. Anything that does
/// not look like `key="value"` is ignored rather than reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagramMeta {
	/// Heading rendered below the diagram.
	pub title: Option<String>,
	/// Paragraph rendered above the diagram.
	pub description: Option<String>,
}

impl DiagramMeta {
	/// Extract the caption attributes from a fence meta string.
	pub fn parse(meta: Option<&str>) -> Self {
		let Some(meta) = meta else {
			return Self::default();
		};

		Self {
			title: capture(&TITLE_PATTERN, meta),
			description: capture(&DESC_PATTERN, meta),
		}
	}

	/// The title, or an empty string when the fence has none.
	pub fn title_or_empty(&self) -> &str {
		self.title.as_deref().unwrap_or("")
	}

	/// The description, or an empty string when the fence has none.
	pub fn description_or_empty(&self) -> &str {
		self.description.as_deref().unwrap_or("")
	}
}

fn capture(pattern: &Regex, meta: &str) -> Option<String> {
	pattern
		.captures(meta)
		.and_then(|captures| captures.get(1))
		.map(|value| value.as_str().to_string())
}
