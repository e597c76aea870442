use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MdiagramError {
	#[error(transparent)]
	#[diagnostic(code(mdiagram::io_error))]
	Io(#[from] std::io::Error),

	#[error("failure to load markdown: {0}")]
	#[diagnostic(code(mdiagram::markdown))]
	Markdown(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(mdiagram::config_parse),
		help("check that mdiagram.toml is valid TOML with [renderer] and/or [template] sections")
	)]
	ConfigParse(String),

	#[error("diagram at line {line} failed to render: {reason}")]
	#[diagnostic(
		code(mdiagram::render),
		help("set `on_error = \"marker\"` in mdiagram.toml to keep rendering the other diagrams")
	)]
	Render { line: usize, reason: String },

	#[error("diagram renderer timed out after {0} second(s)")]
	#[diagnostic(
		code(mdiagram::render_timeout),
		help("increase `timeout_secs` in the [renderer] section")
	)]
	RenderTimeout(u64),

	#[error("renderer command `{command}` failed: {reason}")]
	#[diagnostic(
		code(mdiagram::renderer_command),
		help("install the mermaid cli (`npm install -g @mermaid-js/mermaid-cli`) or configure `command` in [renderer]")
	)]
	RendererCommand { command: String, reason: String },

	#[error("kroki request failed: {0}")]
	#[diagnostic(code(mdiagram::http))]
	Http(String),

	#[error("diagram template failed: {0}")]
	#[diagnostic(code(mdiagram::template))]
	Template(String),

	#[error("document tree has no node at slot {0:?}")]
	#[diagnostic(code(mdiagram::invalid_tree))]
	InvalidTree(Vec<usize>),

	#[error("failed to process `{path}`")]
	#[diagnostic(code(mdiagram::document))]
	Document {
		path: String,
		#[source]
		source: Box<MdiagramError>,
	},
}

impl From<minijinja::Error> for MdiagramError {
	fn from(error: minijinja::Error) -> Self {
		Self::Template(error.to_string())
	}
}

pub type MdiagramResult<T> = Result<T, MdiagramError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
