use std::future::Future;
use std::io::ErrorKind;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use ureq::Agent;

use crate::MdiagramError;
use crate::MdiagramResult;
use crate::config::RendererConfig;
use crate::config::RendererKind;

/// A single diagram handed to a [`DiagramRenderer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderRequest {
	/// The diagram source between the fences.
	pub code: String,
	/// Renderer configuration, forwarded untouched from `[renderer.config]`.
	pub config: Map<String, Value>,
}

impl RenderRequest {
	pub fn new(code: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			config: Map::new(),
		}
	}
}

/// Turns diagram source into markup.
///
/// The transform treats implementations as a black box. Every call must be
/// independent of every other: the transformer issues all requests for a
/// document at once and matches results back to blocks itself.
///
/// Any `Fn(RenderRequest) -> impl Future<Output = MdiagramResult<String>>`
/// closure is a renderer, which keeps tests and embedders free of
/// boilerplate.
pub trait DiagramRenderer: Send + Sync {
	fn render(
		&self,
		request: RenderRequest,
	) -> impl Future<Output = MdiagramResult<String>> + Send;
}

impl<F, Fut> DiagramRenderer for F
where
	F: Fn(RenderRequest) -> Fut + Send + Sync,
	Fut: Future<Output = MdiagramResult<String>> + Send,
{
	fn render(
		&self,
		request: RenderRequest,
	) -> impl Future<Output = MdiagramResult<String>> + Send {
		self(request)
	}
}

/// Renders diagrams by piping the source through an external program,
/// `mmdc` from `@mermaid-js/mermaid-cli` by default.
///
/// The program receives the diagram on stdin and must print the markup to
/// stdout. A non-empty request config is written to a temporary JSON file
/// and passed with `--configFile`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
	program: String,
	args: Vec<String>,
	timeout: Duration,
}

impl CommandRenderer {
	pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
		Self {
			program: program.into(),
			args,
			timeout,
		}
	}

	fn command_error(&self, reason: impl Into<String>) -> MdiagramError {
		MdiagramError::RendererCommand {
			command: self.program.clone(),
			reason: reason.into(),
		}
	}
}

impl DiagramRenderer for CommandRenderer {
	async fn render(&self, request: RenderRequest) -> MdiagramResult<String> {
		let RenderRequest { code, config } = request;
		// Held until the child exits so the path stays valid.
		let config_file = write_config_file(&config)?;

		let mut command = tokio::process::Command::new(&self.program);
		command
			.args(&self.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);
		if let Some(file) = &config_file {
			command.arg("--configFile").arg(file.path());
		}

		let mut child = command
			.spawn()
			.map_err(|e| self.command_error(e.to_string()))?;
		let stdin = child.stdin.take();

		let write_source = async move {
			if let Some(mut stdin) = stdin {
				stdin.write_all(code.as_bytes()).await?;
				stdin.shutdown().await?;
			}
			Ok::<(), std::io::Error>(())
		};

		let (written, output) = tokio::time::timeout(self.timeout, async {
			tokio::join!(write_source, child.wait_with_output())
		})
		.await
		.map_err(|_| MdiagramError::RenderTimeout(self.timeout.as_secs()))?;

		let output = output.map_err(|e| self.command_error(e.to_string()))?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			let reason = if stderr.is_empty() {
				format!(
					"command exited with status {}",
					output
						.status
						.code()
						.map_or_else(|| "unknown".to_string(), |code| code.to_string())
				)
			} else {
				stderr
			};

			return Err(self.command_error(reason));
		}

		// A program may exit successfully before reading all of stdin.
		match written {
			Err(e) if e.kind() != ErrorKind::BrokenPipe => {
				return Err(self.command_error(format!("failed to write diagram source: {e}")));
			}
			_ => {}
		}

		String::from_utf8(output.stdout)
			.map_err(|e| self.command_error(format!("output is not valid UTF-8: {e}")))
	}
}

fn write_config_file(config: &Map<String, Value>) -> MdiagramResult<Option<NamedTempFile>> {
	if config.is_empty() {
		return Ok(None);
	}

	let mut file = tempfile::Builder::new()
		.prefix("mdiagram-config-")
		.suffix(".json")
		.tempfile()?;
	let payload = serde_json::to_vec(config)
		.map_err(|e| MdiagramError::ConfigParse(format!("invalid renderer config: {e}")))?;
	file.write_all(&payload)?;
	file.flush()?;

	Ok(Some(file))
}

/// Renders diagrams through a [Kroki](https://kroki.io) server.
///
/// Requests are blocking HTTP calls, so each one runs on the tokio blocking
/// pool. String, number and boolean entries of the request config are sent as
/// `Kroki-Diagram-Options-*` headers.
#[derive(Clone)]
pub struct KrokiRenderer {
	agent: Agent,
	url: String,
}

impl std::fmt::Debug for KrokiRenderer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KrokiRenderer")
			.field("url", &self.url)
			.finish_non_exhaustive()
	}
}

impl KrokiRenderer {
	pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
		let agent = Agent::config_builder()
			.timeout_global(Some(timeout))
			.http_status_as_error(false)
			.build()
			.into();

		Self {
			agent,
			url: url.into(),
		}
	}

	pub fn endpoint(&self) -> String {
		format!("{}/mermaid/svg", self.url.trim_end_matches('/'))
	}
}

impl DiagramRenderer for KrokiRenderer {
	async fn render(&self, request: RenderRequest) -> MdiagramResult<String> {
		let agent = self.agent.clone();
		let endpoint = self.endpoint();

		tokio::task::spawn_blocking(move || send_kroki_request(&agent, &endpoint, &request))
			.await
			.map_err(|e| MdiagramError::Http(e.to_string()))?
	}
}

fn send_kroki_request(
	agent: &Agent,
	endpoint: &str,
	request: &RenderRequest,
) -> MdiagramResult<String> {
	let mut builder = agent.post(endpoint).header("Content-Type", "text/plain");
	for (name, value) in &request.config {
		if let Some(value) = option_header_value(value) {
			builder = builder.header(format!("Kroki-Diagram-Options-{name}"), value);
		}
	}

	let response = builder
		.send(request.code.as_bytes())
		.map_err(|e| MdiagramError::Http(e.to_string()))?;

	let status = response.status().as_u16();
	let mut body = response.into_body();

	if status >= 400 {
		let error_body = body
			.read_to_string()
			.unwrap_or_else(|_| String::from("(unable to read error body)"));
		return Err(MdiagramError::Http(format!("HTTP {status}: {error_body}")));
	}

	body.read_to_string()
		.map_err(|e| MdiagramError::Http(e.to_string()))
}

fn option_header_value(value: &Value) -> Option<String> {
	match value {
		Value::String(value) => Some(value.clone()),
		Value::Number(value) => Some(value.to_string()),
		Value::Bool(value) => Some(value.to_string()),
		Value::Null | Value::Array(_) | Value::Object(_) => None,
	}
}

/// The renderer selected by `[renderer] kind`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyRenderer {
	Command(CommandRenderer),
	Kroki(KrokiRenderer),
}

impl AnyRenderer {
	pub fn from_config(config: &RendererConfig) -> Self {
		let timeout = Duration::from_secs(config.timeout_secs);
		match config.kind {
			RendererKind::Command => {
				Self::Command(CommandRenderer::new(
					config.command.clone(),
					config.args.clone(),
					timeout,
				))
			}
			RendererKind::Kroki => Self::Kroki(KrokiRenderer::new(config.url.clone(), timeout)),
		}
	}
}

impl DiagramRenderer for AnyRenderer {
	async fn render(&self, request: RenderRequest) -> MdiagramResult<String> {
		match self {
			Self::Command(renderer) => renderer.render(request).await,
			Self::Kroki(renderer) => renderer.render(request).await,
		}
	}
}
