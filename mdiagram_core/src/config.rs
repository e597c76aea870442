use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::AnyRenderer;
use crate::DiagramTemplate;
use crate::DiagramTransformer;
use crate::FailurePolicy;
use crate::MdiagramError;
use crate::MdiagramResult;
use crate::TemplateConfig;
use crate::TransformOptions;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"mdiagram.toml",
	".mdiagram.toml",
	".config/mdiagram.toml",
];

/// Fence languages rendered when `languages` is not configured.
pub const DEFAULT_LANGUAGES: [&str; 1] = ["mermaid"];

/// Default directory for rendered documents, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "rendered";

pub const DEFAULT_COMMAND: &str = "mmdc";

pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Default renderer timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration loaded from an `mdiagram.toml` file.
///
/// ```toml
/// languages = ["mermaid"]
/// on_error = "marker"
/// max_concurrency = 4
///
/// [renderer]
/// kind = "kroki"
/// url = "https://kroki.io"
/// timeout_secs = 10
///
/// [renderer.config]
/// theme = "forest"
///
/// [template]
/// class = "diagram"
///
/// [exclude]
/// patterns = ["drafts/"]
///
/// [output]
/// dir = "dist"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MdiagramConfig {
	/// Fence languages treated as diagram blocks.
	#[serde(default = "default_languages")]
	pub languages: Vec<String>,
	/// What happens to a document when one of its diagrams fails to render.
	#[serde(default)]
	pub on_error: FailurePolicy,
	/// Upper bound on renders in flight for a single document. Unlimited
	/// when absent.
	#[serde(default)]
	pub max_concurrency: Option<usize>,
	#[serde(default)]
	pub renderer: RendererConfig,
	#[serde(default)]
	pub template: TemplateConfig,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	#[serde(default)]
	pub output: OutputConfig,
	/// When true, `.gitignore` files are not used for filtering.
	#[serde(default)]
	pub disable_gitignore: bool,
}

impl Default for MdiagramConfig {
	fn default() -> Self {
		Self {
			languages: default_languages(),
			on_error: FailurePolicy::default(),
			max_concurrency: None,
			renderer: RendererConfig::default(),
			template: TemplateConfig::default(),
			exclude: ExcludeConfig::default(),
			output: OutputConfig::default(),
			disable_gitignore: false,
		}
	}
}

fn default_languages() -> Vec<String> {
	DEFAULT_LANGUAGES.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum RendererKind {
	/// Pipe each diagram through a local program.
	#[default]
	Command,
	/// POST each diagram to a Kroki server.
	Kroki,
}

/// The `[renderer]` section.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RendererConfig {
	pub kind: RendererKind,
	/// Program used by the `command` renderer.
	pub command: String,
	/// Arguments passed to `command`. The defaults make `mmdc` read stdin and
	/// write SVG to stdout.
	pub args: Vec<String>,
	/// Base URL used by the `kroki` renderer.
	pub url: String,
	/// Per-diagram timeout.
	pub timeout_secs: u64,
	/// Forwarded to the renderer with every request.
	pub config: Map<String, Value>,
}

impl Default for RendererConfig {
	fn default() -> Self {
		Self {
			kind: RendererKind::default(),
			command: DEFAULT_COMMAND.to_string(),
			args: ["--input", "-", "--output", "-", "--outputFormat", "svg"]
				.iter()
				.map(ToString::to_string)
				.collect(),
			url: DEFAULT_KROKI_URL.to_string(),
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			config: Map::new(),
		}
	}
}

/// Configuration for excluding files and directories from scanning.
///
/// Patterns follow gitignore syntax and are applied on top of any
/// `.gitignore` rules (unless `disable_gitignore` is set).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// The `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
	/// Rendered documents are written here, mirroring their path relative to
	/// the project root.
	#[serde(default = "default_output_dir")]
	pub dir: PathBuf,
}

impl Default for OutputConfig {
	fn default() -> Self {
		Self {
			dir: default_output_dir(),
		}
	}
}

fn default_output_dir() -> PathBuf {
	PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl MdiagramConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> MdiagramResult<Option<MdiagramConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	/// Like [`MdiagramConfig::load`], falling back to the defaults.
	pub fn load_or_default(root: &Path) -> MdiagramResult<MdiagramConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn parse(content: &str) -> MdiagramResult<MdiagramConfig> {
		toml::from_str(content).map_err(|e| MdiagramError::ConfigParse(e.to_string()))
	}

	pub fn transform_options(&self) -> TransformOptions {
		TransformOptions {
			languages: self.languages.clone(),
			on_error: self.on_error,
			render_config: self.renderer.config.clone(),
			max_concurrency: self.max_concurrency,
		}
	}

	/// Build the transformer described by this config, resolving a custom
	/// template path against `root`.
	pub fn build_transformer(&self, root: &Path) -> MdiagramResult<DiagramTransformer<AnyRenderer>> {
		let template = DiagramTemplate::from_config(&self.template, root)?;
		let renderer = AnyRenderer::from_config(&self.renderer);

		Ok(DiagramTransformer::new(renderer)
			.with_template(template)
			.with_options(self.transform_options()))
	}
}
