use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use markdown::mdast::Blockquote;
use markdown::mdast::Code;
use markdown::mdast::Node;
use markdown::mdast::Paragraph;
use markdown::mdast::Root;
use markdown::mdast::Text;
use markdown::unist::Position;

use crate::DiagramRenderer;
use crate::MdiagramError;
use crate::MdiagramResult;
use crate::RenderRequest;

pub fn root(children: Vec<Node>) -> Node {
	Node::Root(Root {
		children,
		position: Some(Position::new(1, 1, 0, 20, 1, 200)),
	})
}

pub fn paragraph(text: &str, line: usize) -> Node {
	Node::Paragraph(Paragraph {
		children: vec![Node::Text(Text {
			value: text.to_string(),
			position: Some(Position::new(line, 1, 0, line, 1 + text.len(), text.len())),
		})],
		position: Some(Position::new(line, 1, 0, line, 1 + text.len(), text.len())),
	})
}

pub fn blockquote(children: Vec<Node>, line: usize) -> Node {
	Node::Blockquote(Blockquote {
		children,
		position: Some(Position::new(line, 1, 0, line + 4, 1, 40)),
	})
}

pub fn code(lang: Option<&str>, meta: Option<&str>, value: &str, line: usize) -> Node {
	Node::Code(Code {
		value: value.to_string(),
		position: Some(Position::new(line, 1, line * 10, line + 2, 4, line * 10 + 30)),
		lang: lang.map(ToString::to_string),
		meta: meta.map(ToString::to_string),
	})
}

pub fn mermaid(meta: Option<&str>, value: &str, line: usize) -> Node {
	code(Some("mermaid"), meta, value, line)
}

/// Wraps the diagram source in an `<svg>` element.
pub async fn echo_renderer(request: RenderRequest) -> MdiagramResult<String> {
	Ok(format!("<svg>{}</svg>", request.code))
}

/// Returns markup with embedded CSS, including a lone closing brace.
pub async fn styled_renderer(request: RenderRequest) -> MdiagramResult<String> {
	Ok(format!(
		"<svg><style>#s{{fill:red}}</style><text>}}</text><desc>{}</desc></svg>",
		request.code
	))
}

/// Fails for every source that starts with `fail`.
pub async fn failing_renderer(request: RenderRequest) -> MdiagramResult<String> {
	if request.code.starts_with("fail") {
		return Err(MdiagramError::Http(format!(
			"HTTP 400: cannot render `{}`",
			request.code
		)));
	}

	echo_renderer(request).await
}

/// Records how renders overlap and in which order they finish. Sources that
/// start with `slow` take longer than the others.
#[derive(Debug, Default)]
pub struct TrackingRenderer {
	in_flight: AtomicUsize,
	peak: AtomicUsize,
	completed: Mutex<Vec<String>>,
}

impl TrackingRenderer {
	pub fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}

	pub fn completed(&self) -> Vec<String> {
		self.completed
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

impl DiagramRenderer for TrackingRenderer {
	async fn render(&self, request: RenderRequest) -> MdiagramResult<String> {
		let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);

		let delay = if request.code.starts_with("slow") {
			100
		} else {
			10
		};
		tokio::time::sleep(Duration::from_millis(delay)).await;

		self.in_flight.fetch_sub(1, Ordering::SeqCst);
		self.completed
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(request.code.clone());

		Ok(format!("<svg>{}</svg>", request.code))
	}
}

pub const SIMPLE_DOCUMENT: &str = r#"# Guide

Before the diagram.

```mermaid title="Simple" desc="two boxes"
graph TD; A-->B
```

```python
print("hello")
```

After the diagram.
"#;
