use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::DiagramRenderer;
use crate::DiagramTransformer;
use crate::DocumentKind;
use crate::MdiagramConfig;
use crate::MdiagramError;
use crate::MdiagramResult;
use crate::RenderedDocument;
use crate::render_document;

/// A markdown or MDX file found under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
	/// Absolute (or root-joined) path of the file.
	pub path: PathBuf,
	/// Path relative to the project root.
	pub relative: PathBuf,
	pub kind: DocumentKind,
}

/// Collect every document under `root`, sorted by path.
///
/// `.gitignore` rules apply unless `disable_gitignore` is set, and the
/// `[exclude]` patterns always apply on top. The configured output directory
/// is never scanned so rendered copies are not rendered again.
pub fn scan_documents(root: &Path, config: &MdiagramConfig) -> MdiagramResult<Vec<DocumentEntry>> {
	let gitignore = if config.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let custom_exclude = build_exclude_matcher(root, &config.exclude.patterns)?;
	let output_dir = root.join(&config.output.dir);

	let mut walker = Walker {
		gitignore: &gitignore,
		custom_exclude: &custom_exclude,
		output_dir: &output_dir,
		visited_dirs: HashSet::new(),
		files: vec![],
	};
	walker.walk_dir(root)?;

	let mut files = walker.files;
	files.sort();

	let entries = files
		.into_iter()
		.filter_map(|path| {
			let kind = DocumentKind::from_path(&path)?;
			let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
			Some(DocumentEntry {
				path,
				relative,
				kind,
			})
		})
		.collect();

	Ok(entries)
}

/// Read and render a single document, attaching the path to any error.
pub async fn render_entry<R: DiagramRenderer>(
	entry: &DocumentEntry,
	transformer: &DiagramTransformer<R>,
) -> MdiagramResult<RenderedDocument> {
	let with_path = |error: MdiagramError| {
		MdiagramError::Document {
			path: entry.relative.display().to_string(),
			source: Box::new(error),
		}
	};

	let source = std::fs::read_to_string(&entry.path).map_err(|e| with_path(e.into()))?;
	render_document(&source, entry.kind, transformer)
		.await
		.map_err(with_path)
}

/// Write a rendered document below `output_dir`, mirroring its relative path.
/// Returns the written path.
pub fn write_rendered(
	output_dir: &Path,
	entry: &DocumentEntry,
	rendered: &RenderedDocument,
) -> MdiagramResult<PathBuf> {
	let target = output_dir.join(&entry.relative);
	if let Some(parent) = target.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(&target, &rendered.content)?;

	Ok(target)
}

/// Build a `Gitignore` matcher from exclude patterns specified in
/// `mdiagram.toml` `[exclude]`.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> MdiagramResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			MdiagramError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| MdiagramError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

/// Build a `Gitignore` matcher from the project's `.gitignore` file (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

fn is_ignored_directory_name(name: &str) -> bool {
	name.starts_with('.') || name == "node_modules" || name == "target"
}

struct Walker<'a> {
	gitignore: &'a Gitignore,
	custom_exclude: &'a Gitignore,
	output_dir: &'a Path,
	visited_dirs: HashSet<PathBuf>,
	files: Vec<PathBuf>,
}

impl Walker<'_> {
	fn walk_dir(&mut self, dir: &Path) -> MdiagramResult<()> {
		if !dir.is_dir() {
			return Ok(());
		}

		// Symlinked directories can loop back on themselves.
		let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
		if !self.visited_dirs.insert(canonical) {
			tracing::debug!(path = %dir.display(), "skipping already visited directory");
			return Ok(());
		}

		for entry in std::fs::read_dir(dir)? {
			let path = entry?.path();

			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				if is_ignored_directory_name(name) {
					continue;
				}
			}

			let is_dir = path.is_dir();
			if self.gitignore.matched(&path, is_dir).is_ignore()
				|| self.custom_exclude.matched(&path, is_dir).is_ignore()
			{
				continue;
			}

			if is_dir {
				if path == self.output_dir {
					continue;
				}
				self.walk_dir(&path)?;
			} else if DocumentKind::from_path(&path).is_some() {
				self.files.push(path);
			}
		}

		Ok(())
	}
}
