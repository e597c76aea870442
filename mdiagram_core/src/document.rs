use std::cmp::Reverse;
use std::path::Path;

use markdown::ParseOptions;
use markdown::mdast::Node;
use markdown::to_mdast;
use serde::Serialize;

use crate::DiagramMeta;
use crate::DiagramRenderer;
use crate::DiagramTransformer;
use crate::MdiagramError;
use crate::MdiagramResult;
use crate::collect_diagram_slots;

/// The markdown dialect a document is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum DocumentKind {
	/// GitHub flavored markdown (`.md`, `.markdown`).
	Markdown,
	/// MDX (`.mdx`).
	Mdx,
}

impl DocumentKind {
	/// The dialect implied by a file extension, or `None` for files that are
	/// not documents.
	pub fn from_path(path: &Path) -> Option<Self> {
		let extension = path.extension()?.to_str()?.to_ascii_lowercase();
		match extension.as_str() {
			"md" | "markdown" => Some(Self::Markdown),
			"mdx" => Some(Self::Mdx),
			_ => None,
		}
	}

	fn parse_options(self) -> ParseOptions {
		match self {
			Self::Markdown => ParseOptions::gfm(),
			Self::Mdx => ParseOptions::mdx(),
		}
	}
}

/// Parse a document into an mdast tree.
pub fn parse_document(source: &str, kind: DocumentKind) -> MdiagramResult<Node> {
	to_mdast(source, &kind.parse_options()).map_err(|e| MdiagramError::Markdown(e.to_string()))
}

/// A diagram block as reported by [`list_diagrams`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramBlock {
	/// 1-indexed line of the opening fence.
	pub line: usize,
	/// 1-indexed column of the opening fence.
	pub column: usize,
	pub lang: String,
	pub title: Option<String>,
	pub description: Option<String>,
	pub source: String,
}

/// List the diagram blocks of a document without rendering them.
pub fn list_diagrams(
	source: &str,
	kind: DocumentKind,
	languages: &[String],
) -> MdiagramResult<Vec<DiagramBlock>> {
	let tree = parse_document(source, kind)?;
	let blocks = collect_diagram_slots(&tree, languages)
		.into_iter()
		.map(|slot| {
			let (line, column) = slot
				.position
				.as_ref()
				.map_or((0, 0), |position| (position.start.line, position.start.column));
			let DiagramMeta { title, description } = slot.meta;
			DiagramBlock {
				line,
				column,
				lang: slot.lang,
				title,
				description,
				source: slot.code,
			}
		})
		.collect();

	Ok(blocks)
}

/// Result of rendering the diagrams of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
	/// The source text with every diagram block replaced by its markup.
	pub content: String,
	/// Number of diagram blocks that were replaced.
	pub diagrams: usize,
	/// Lines of the blocks replaced by an error marker.
	pub failed_lines: Vec<usize>,
}

impl RenderedDocument {
	pub fn has_failures(&self) -> bool {
		!self.failed_lines.is_empty()
	}
}

/// Render every diagram in `source` and rewrite the text around them.
///
/// The tree is only used to find and transform the blocks. Everything outside
/// a block's byte span is copied from `source` unchanged, so the rest of the
/// document keeps its exact formatting.
pub async fn render_document<R: DiagramRenderer>(
	source: &str,
	kind: DocumentKind,
	transformer: &DiagramTransformer<R>,
) -> MdiagramResult<RenderedDocument> {
	let tree = parse_document(source, kind)?;
	let (_, replacements) = transformer.transform_with_replacements(tree).await?;

	let mut spans: Vec<_> = replacements
		.iter()
		.filter_map(|replacement| {
			let position = replacement.position.as_ref()?;
			Some((position.start.offset, position.end.offset, &replacement.value))
		})
		.collect();
	// Replace from the end so the offsets of earlier spans stay valid.
	spans.sort_by_key(|(start, ..)| Reverse(*start));

	let mut content = source.to_string();
	for (start, end, value) in spans {
		if start > end || end > content.len() {
			return Err(MdiagramError::Markdown(format!(
				"diagram span {start}..{end} is outside the document"
			)));
		}
		let block = match kind {
			DocumentKind::Markdown => html_block(value, &continuation_prefix(source, start)),
			DocumentKind::Mdx => jsx_block(value, &transformer.template().styles().class)?,
		};
		content.replace_range(start..end, &block);
	}

	let failed_lines = replacements
		.iter()
		.filter(|replacement| replacement.failed)
		.map(|replacement| {
			replacement
				.position
				.as_ref()
				.map_or(0, |position| position.start.line)
		})
		.collect();

	tracing::info!(diagrams = replacements.len(), "rendered document");

	Ok(RenderedDocument {
		content,
		diagrams: replacements.len(),
		failed_lines,
	})
}

/// The text that keeps a continuation line inside the containers of the line
/// starting at `offset`. Blockquote markers are kept and list markers become
/// indentation.
fn continuation_prefix(source: &str, offset: usize) -> String {
	let before = source.get(..offset).unwrap_or_default();
	let line_start = before.rfind('\n').map_or(0, |index| index + 1);

	before[line_start..]
		.chars()
		.map(|c| if c == '>' || c.is_whitespace() { c } else { ' ' })
		.collect()
}

/// A blank line ends a raw html block in markdown, so they are dropped before
/// the markup is written back into the source. Every line after the first is
/// prefixed so the block stays inside its blockquote or list item.
fn html_block(value: &str, prefix: &str) -> String {
	value
		.lines()
		.filter(|line| !line.trim().is_empty())
		.collect::<Vec<_>>()
		.join(&format!("\n{prefix}"))
}

/// MDX parses raw markup as JSX, where braces start expressions and `class`
/// is not a valid prop. The markup is embedded as a string instead.
fn jsx_block(value: &str, class: &str) -> MdiagramResult<String> {
	let class = js_string(class)?;
	let markup = js_string(value)?;

	Ok(format!(
		"<div className={{{class}}} dangerouslySetInnerHTML={{{{__html: {markup}}}}} />"
	))
}

/// A JavaScript string literal with every brace escaped, so the surrounding
/// expression stays balanced whatever the markup contains.
fn js_string(value: &str) -> MdiagramResult<String> {
	let literal =
		serde_json::to_string(value).map_err(|e| MdiagramError::Markdown(e.to_string()))?;

	Ok(literal.replace('{', "\\u007b").replace('}', "\\u007d"))
}
