use std::path::Path;
use std::path::PathBuf;

use minijinja::Environment;
use minijinja::context;
use serde::Deserialize;

use crate::DiagramMeta;
use crate::MdiagramError;
use crate::MdiagramResult;

/// The template names end in `.html` so that minijinja escapes interpolated
/// captions. Rendered markup and configured styles are passed through `safe`.
const DIAGRAM_TEMPLATE_NAME: &str = "diagram.html";
const ERROR_TEMPLATE_NAME: &str = "diagram-error.html";

/// Wrapper used when no custom template is configured.
pub const DEFAULT_TEMPLATE: &str = r#"<div class="{{ class }}" style="{{ container_style|safe }}">
<p style="{{ description_style|safe }}">{{ description }}</p>
<hr style="{{ separator_style|safe }}"/>
{{ markup|safe }}
<h2 style="{{ title_style|safe }}">{{ title }}</h2>
</div>"#;

const ERROR_TEMPLATE: &str = r#"<pre class="{{ class }}-error">{{ reason }}</pre>"#;

pub const DEFAULT_CLASS: &str = "mermaid-diagram";

pub const DEFAULT_CONTAINER_STYLE: &str = "all: initial; width: 100%; display: flex; \
                                           flex-direction: column; justify-content: center; \
                                           align-items: center; background-color: #fff; \
                                           border-radius: 0.5rem; box-shadow: 10px 24px 50px \
                                           17px rgba(0, 0, 0, 0.1); border: 1px solid #c2c2c2;";

pub const DEFAULT_DESCRIPTION_STYLE: &str = "text-align: center; color: #222; font-size: 1rem; \
                                             margin: 1rem 0 1rem 0; font-family: 'Atkinson \
                                             Hyperlegible', sans-serif; padding: 0 1rem 0 1rem;";

pub const DEFAULT_SEPARATOR_STYLE: &str =
	"width: 80%; margin: 0.5rem 0 0.5rem 0; border: 1px solid #c2c2c2;";

pub const DEFAULT_TITLE_STYLE: &str = "text-align: center; color: #222; font-size: 1.5rem; \
                                       font-weight: 500; margin: 1rem 0 1rem 0; font-family: \
                                       'Atkinson Hyperlegible', sans-serif;";

/// The `[template]` section of `mdiagram.toml`.
///
/// ```toml
/// [template]
/// class = "mermaid-diagram"
/// separator_style = "width: 50%;"
/// # path = "templates/diagram.html"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TemplateConfig {
	/// CSS class on the wrapping container.
	pub class: String,
	/// Inline style of the wrapping container.
	pub container_style: String,
	/// Inline style of the description paragraph.
	pub description_style: String,
	/// Inline style of the separator between description and diagram.
	pub separator_style: String,
	/// Inline style of the title heading.
	pub title_style: String,
	/// A minijinja template replacing [`DEFAULT_TEMPLATE`], relative to the
	/// project root. It receives `markup`, `title`, `description`, `class`
	/// and every style.
	pub path: Option<PathBuf>,
}

impl Default for TemplateConfig {
	fn default() -> Self {
		Self {
			class: DEFAULT_CLASS.to_string(),
			container_style: DEFAULT_CONTAINER_STYLE.to_string(),
			description_style: DEFAULT_DESCRIPTION_STYLE.to_string(),
			separator_style: DEFAULT_SEPARATOR_STYLE.to_string(),
			title_style: DEFAULT_TITLE_STYLE.to_string(),
			path: None,
		}
	}
}

/// Composes rendered diagram markup with its caption into the final HTML.
///
/// Both templates are compiled once, when the template is created.
#[derive(Debug, Clone)]
pub struct DiagramTemplate {
	env: Environment<'static>,
	styles: TemplateConfig,
}

impl Default for DiagramTemplate {
	fn default() -> Self {
		Self::new(DEFAULT_TEMPLATE, TemplateConfig::default())
			.unwrap_or_else(|e| panic!("invalid default diagram template: {e}"))
	}
}

impl DiagramTemplate {
	/// Create a template from a minijinja source string. Syntax errors
	/// surface here, before any rendering.
	pub fn new(source: impl Into<String>, styles: TemplateConfig) -> MdiagramResult<Self> {
		let source: String = source.into();
		let mut env = Environment::new();
		env.add_template_owned(DIAGRAM_TEMPLATE_NAME, source)?;
		env.add_template(ERROR_TEMPLATE_NAME, ERROR_TEMPLATE)?;

		Ok(Self { env, styles })
	}

	/// Build the template described by a `[template]` section. A configured
	/// `path` is resolved against `root`.
	pub fn from_config(config: &TemplateConfig, root: &Path) -> MdiagramResult<Self> {
		let Some(path) = &config.path else {
			return Self::new(DEFAULT_TEMPLATE, config.clone());
		};

		let source = std::fs::read_to_string(root.join(path)).map_err(|e| {
			MdiagramError::Template(format!("failed to read `{}`: {e}", path.display()))
		})?;

		Self::new(source, config.clone())
	}

	pub fn styles(&self) -> &TemplateConfig {
		&self.styles
	}

	/// Wrap rendered diagram markup with the caption from `meta`. Missing
	/// captions render as empty strings.
	pub fn compose(&self, markup: &str, meta: &DiagramMeta) -> MdiagramResult<String> {
		let template = self.env.get_template(DIAGRAM_TEMPLATE_NAME)?;
		let rendered = template.render(context! {
			markup => markup,
			title => meta.title_or_empty(),
			description => meta.description_or_empty(),
			class => &self.styles.class,
			container_style => &self.styles.container_style,
			description_style => &self.styles.description_style,
			separator_style => &self.styles.separator_style,
			title_style => &self.styles.title_style,
		})?;

		Ok(rendered)
	}

	/// Markup shown in place of a diagram whose render failed.
	pub fn compose_error(&self, reason: &str) -> MdiagramResult<String> {
		let template = self.env.get_template(ERROR_TEMPLATE_NAME)?;
		let rendered = template.render(context! {
			reason => reason,
			class => &self.styles.class,
		})?;

		Ok(rendered)
	}
}
