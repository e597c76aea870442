use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use markdown::mdast::Code;
use markdown::mdast::Html;
use markdown::mdast::Node;
use markdown::unist::Position;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::DiagramMeta;
use crate::DiagramRenderer;
use crate::DiagramTemplate;
use crate::MdiagramError;
use crate::MdiagramResult;
use crate::RenderRequest;
use crate::config::DEFAULT_LANGUAGES;

/// What a transform does when the renderer fails for one of the diagrams.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum FailurePolicy {
	/// The whole document fails with the first error in document order. No
	/// partially transformed tree is returned.
	#[default]
	Fail,
	/// The failed block is replaced by an error marker and every other block
	/// is replaced as usual.
	Marker,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
	/// Fence languages treated as diagram blocks.
	pub languages: Vec<String>,
	pub on_error: FailurePolicy,
	/// Sent as [`RenderRequest::config`] with every request.
	pub render_config: Map<String, Value>,
	/// Upper bound on renders in flight. `None` issues every request at once.
	pub max_concurrency: Option<usize>,
}

impl Default for TransformOptions {
	fn default() -> Self {
		Self {
			languages: DEFAULT_LANGUAGES.iter().map(ToString::to_string).collect(),
			on_error: FailurePolicy::default(),
			render_config: Map::new(),
			max_concurrency: None,
		}
	}
}

/// A diagram code block found in a document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramSlot {
	/// Child indices leading from the root to the block. Replacement is one
	/// node for one node, so the path stays valid for the whole transform.
	pub path: Vec<usize>,
	pub lang: String,
	pub code: String,
	pub meta: DiagramMeta,
	pub position: Option<Position>,
}

impl DiagramSlot {
	/// 1-indexed line of the opening fence, or 0 when the tree carries no
	/// positions.
	pub fn line(&self) -> usize {
		self.position.as_ref().map_or(0, |position| position.start.line)
	}
}

/// A code block that was swapped for markup.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
	pub path: Vec<usize>,
	/// Source span of the replaced code block.
	pub position: Option<Position>,
	/// The markup now stored in the tree.
	pub value: String,
	/// Whether `value` is an error marker rather than a rendered diagram.
	pub failed: bool,
}

/// Collect every diagram code block in `tree` in depth-first pre-order.
pub fn collect_diagram_slots(tree: &Node, languages: &[String]) -> Vec<DiagramSlot> {
	let mut slots = vec![];
	let mut path = vec![];
	collect_into(tree, languages, &mut path, &mut slots);

	slots
}

fn collect_into(
	node: &Node,
	languages: &[String],
	path: &mut Vec<usize>,
	slots: &mut Vec<DiagramSlot>,
) {
	if let Node::Code(code) = node {
		if let Some(lang) = diagram_language(code, languages) {
			slots.push(DiagramSlot {
				path: path.clone(),
				lang: lang.to_string(),
				code: code.value.clone(),
				meta: DiagramMeta::parse(code.meta.as_deref()),
				position: code.position.clone(),
			});
		}
		return;
	}

	if let Some(children) = node.children() {
		for (index, child) in children.iter().enumerate() {
			path.push(index);
			collect_into(child, languages, path, slots);
			path.pop();
		}
	}
}

fn diagram_language<'a>(code: &'a Code, languages: &[String]) -> Option<&'a str> {
	code.lang
		.as_deref()
		.filter(|lang| languages.iter().any(|candidate| candidate == lang))
}

/// Replaces diagram code blocks in markdown trees with rendered markup.
///
/// ```rust,no_run
/// use markdown::ParseOptions;
/// use markdown::to_mdast;
/// use mdiagram_core::DiagramTransformer;
/// use mdiagram_core::MdiagramError;
/// use mdiagram_core::MdiagramResult;
/// use mdiagram_core::RenderRequest;
///
/// # async fn run() -> MdiagramResult<()> {
/// let tree = to_mdast("```mermaid\ngraph TD; A-->B\n```", &ParseOptions::gfm())
/// 	.map_err(|e| MdiagramError::Markdown(e.to_string()))?;
/// let transformer = DiagramTransformer::new(|request: RenderRequest| async move {
/// 	Ok::<_, MdiagramError>(format!("<svg>{}</svg>", request.code))
/// });
/// let tree = transformer.transform(tree).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DiagramTransformer<R> {
	renderer: R,
	template: DiagramTemplate,
	options: TransformOptions,
}

impl<R: DiagramRenderer> DiagramTransformer<R> {
	pub fn new(renderer: R) -> Self {
		Self {
			renderer,
			template: DiagramTemplate::default(),
			options: TransformOptions::default(),
		}
	}

	#[must_use]
	pub fn with_template(mut self, template: DiagramTemplate) -> Self {
		self.template = template;
		self
	}

	#[must_use]
	pub fn with_options(mut self, options: TransformOptions) -> Self {
		self.options = options;
		self
	}

	pub fn options(&self) -> &TransformOptions {
		&self.options
	}

	pub fn renderer(&self) -> &R {
		&self.renderer
	}

	pub fn template(&self) -> &DiagramTemplate {
		&self.template
	}

	/// Render every diagram block in `tree` and splice the resulting markup
	/// into the tree in place of each block.
	pub async fn transform(&self, tree: Node) -> MdiagramResult<Node> {
		let (tree, _) = self.transform_with_replacements(tree).await?;
		Ok(tree)
	}

	/// Like [`DiagramTransformer::transform`], also reporting each
	/// replacement in document order.
	pub async fn transform_with_replacements(
		&self,
		mut tree: Node,
	) -> MdiagramResult<(Node, Vec<Replacement>)> {
		let slots = collect_diagram_slots(&tree, &self.options.languages);
		if slots.is_empty() {
			return Ok((tree, vec![]));
		}

		tracing::debug!(diagrams = slots.len(), "rendering diagram blocks");
		let results = self.render_slots(&slots).await;

		let mut replacements = Vec::with_capacity(slots.len());
		for (slot, result) in slots.into_iter().zip(results) {
			let (value, failed) = match result {
				Ok(markup) => (self.template.compose(&markup, &slot.meta)?, false),
				Err(error) => {
					match self.options.on_error {
						FailurePolicy::Fail => {
							return Err(MdiagramError::Render {
								line: slot.line(),
								reason: error.to_string(),
							});
						}
						FailurePolicy::Marker => {
							tracing::warn!(line = slot.line(), %error, "diagram failed to render");
							(self.template.compose_error(&error.to_string())?, true)
						}
					}
				}
			};

			replacements.push(Replacement {
				path: slot.path,
				position: slot.position,
				value,
				failed,
			});
		}

		for replacement in &replacements {
			splice_html(&mut tree, replacement)?;
		}

		Ok((tree, replacements))
	}

	/// Issue every render concurrently. The returned results are in slot
	/// order regardless of the order in which renders complete.
	async fn render_slots(&self, slots: &[DiagramSlot]) -> Vec<MdiagramResult<String>> {
		let renderer = &self.renderer;
		let renders = slots.iter().enumerate().map(|(index, slot)| {
			let request = RenderRequest {
				code: slot.code.clone(),
				config: self.options.render_config.clone(),
			};
			async move { (index, renderer.render(request).await) }
		});

		let mut finished: Vec<(usize, MdiagramResult<String>)> = match self.options.max_concurrency {
			Some(limit) => {
				stream::iter(renders)
					.buffer_unordered(limit.max(1))
					.collect()
					.await
			}
			None => join_all(renders).await,
		};

		finished.sort_by_key(|(index, _)| *index);
		finished.into_iter().map(|(_, result)| result).collect()
	}
}

/// Swap the code block at `replacement.path` for an html node: remove one
/// child and insert one at the same index.
pub(crate) fn splice_html(tree: &mut Node, replacement: &Replacement) -> MdiagramResult<()> {
	let html = Node::Html(Html {
		value: replacement.value.clone(),
		position: replacement.position.clone(),
	});

	let Some((&index, parent_path)) = replacement.path.split_last() else {
		*tree = html;
		return Ok(());
	};

	let invalid = || MdiagramError::InvalidTree(replacement.path.clone());
	let mut parent = tree;
	for &step in parent_path {
		parent = parent
			.children_mut()
			.and_then(|children| children.get_mut(step))
			.ok_or_else(invalid)?;
	}

	let children = parent.children_mut().ok_or_else(invalid)?;
	if index >= children.len() {
		return Err(invalid());
	}
	let _replaced: Vec<Node> = children.splice(index..=index, std::iter::once(html)).collect();

	Ok(())
}
