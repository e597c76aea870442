//! `mdiagram_core` is the core library for
//! [mdiagram](https://github.com/ifiokjr/mdiagram). It finds fenced diagram
//! blocks (```` ```mermaid ````) in markdown and MDX documents, renders each
//! one through a pluggable renderer, and splices the rendered markup back into
//! the document in place of the block.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Markdown / MDX file
//!   → Parser (markdown crate, produces an mdast tree)
//!   → Collector (depth-first walk, records each diagram block and its slot)
//!   → Renderer (every block rendered concurrently, results bound to slots)
//!   → Template (caption + rendered markup wrapped in a styled container)
//!   → Splice (each code node replaced by an html node at the same index)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `mdiagram.toml`.
//! - [`project`]: Directory walking and per-file rendering.
//!
//! ## Key Types
//!
//! - [`DiagramTransformer`]: Runs the transform over an mdast tree.
//! - [`DiagramRenderer`]: The renderer boundary. Implemented by closures,
//!   [`CommandRenderer`], [`KrokiRenderer`] and [`AnyRenderer`].
//! - [`DiagramTemplate`]: The markup wrapped around every rendered diagram.
//! - [`DiagramMeta`]: `title="…"` and `desc="…"` captions from the fence.
//! - [`MdiagramConfig`]: Configuration loaded from `mdiagram.toml`.
//!
//! ## Fence Syntax
//!
//! ````markdown
//! ```mermaid title="Login flow" desc="What happens after the form is submitted"
//! sequenceDiagram
//!     Browser->>Server: POST /login
//!     Server-->>Browser: 302 /dashboard
//! ```
//! ````
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdiagram_core::DocumentKind;
//! use mdiagram_core::MdiagramConfig;
//! use mdiagram_core::render_document;
//! use std::path::Path;
//!
//! # async fn run() -> mdiagram_core::MdiagramResult<()> {
//! let root = Path::new(".");
//! let config = MdiagramConfig::load_or_default(root)?;
//! let transformer = config.build_transformer(root)?;
//!
//! let source = std::fs::read_to_string("guide.md")?;
//! let rendered = render_document(&source, DocumentKind::Markdown, &transformer).await?;
//! println!("{}", rendered.content);
//! # Ok(())
//! # }
//! ```

pub use config::*;
pub use document::*;
pub use error::*;
pub use meta::*;
pub use renderer::*;
pub use template::*;
pub use transform::*;

pub mod config;
mod document;
#[allow(unused_assignments)]
mod error;
mod meta;
pub mod project;
mod renderer;
mod template;
mod transform;

#[cfg(test)]
mod __fixtures;
