use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render fenced mermaid blocks in markdown and MDX files into static diagram markup.",
	long_about = "mdiagram finds fenced diagram blocks (```mermaid) in the markdown and MDX \
	              files of a project, renders every block through a diagram renderer, and \
	              writes copies of the documents with each block replaced by its rendered \
	              markup.\n\nQuick start:\n  mdiagram init    Create an mdiagram.toml\n  \
	              mdiagram list    Show every diagram block\n  mdiagram render  Write rendered \
	              documents\n  mdiagram check   Verify every diagram renders"
)]
pub struct MdiagramCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize mdiagram in a project by creating a sample `mdiagram.toml`.
	///
	/// If a config file already exists, this command is a no-op and exits
	/// successfully.
	Init,
	/// Render every diagram block and write the rendered documents.
	///
	/// Each markdown and MDX file is copied into the output directory
	/// (`rendered/` by default) with its diagram blocks replaced by the
	/// rendered markup. Files without diagrams are skipped.
	Render {
		/// Directory for the rendered documents. Overrides `[output] dir`.
		#[arg(long)]
		out_dir: Option<PathBuf>,

		/// Render every diagram but do not write any files.
		#[arg(long, default_value_t = false)]
		dry_run: bool,
	},
	/// Check that every diagram block renders.
	///
	/// Renders each block without writing anything and exits with a non-zero
	/// status code when any block fails. Ideal for CI pipelines.
	Check,
	/// List every diagram block in the project.
	List {
		/// Output format for the listing. Use `text` for human-readable output
		/// or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = ListFormat::Text)]
		format: ListFormat,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
