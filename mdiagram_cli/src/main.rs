use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use mdiagram_cli::Commands;
use mdiagram_cli::ListFormat;
use mdiagram_cli::MdiagramCli;
use mdiagram_core::FailurePolicy;
use mdiagram_core::MdiagramConfig;
use mdiagram_core::list_diagrams;
use mdiagram_core::project::DocumentEntry;
use mdiagram_core::project::render_entry;
use mdiagram_core::project::scan_documents;
use mdiagram_core::project::write_rendered;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "MDIAGRAM_LOG";

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = MdiagramCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Render { out_dir, dry_run }) => {
			run_render(&args, out_dir.as_deref(), *dry_run)
		}
		Some(Commands::Check) => run_check(&args),
		Some(Commands::List { format }) => run_list(&args, *format),
		None => {
			eprintln!("No subcommand specified. Run `mdiagram --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<mdiagram_core::MdiagramError>() {
			Ok(mdiagram_err) => {
				let report: miette::Report = (*mdiagram_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Logs go to stderr so stdout stays machine readable. `MDIAGRAM_LOG` takes
/// precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_directive = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.init();
}

fn resolve_root(args: &MdiagramCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &MdiagramCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);

	if let Some(existing) = MdiagramConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
		return Ok(());
	}

	let sample_config = "# mdiagram configuration\n\n# Fence languages rendered as \
	                     diagrams.\nlanguages = [\"mermaid\"]\n\n# `fail` stops at the first \
	                     diagram that fails to render.\n# `marker` replaces it with an error \
	                     marker and keeps going.\non_error = \"fail\"\n\n[renderer]\n# \
	                     `command` pipes each diagram through a program, `kroki` posts it to \
	                     a Kroki server.\nkind = \"command\"\ncommand = \"mmdc\"\nargs = \
	                     [\"--input\", \"-\", \"--output\", \"-\", \"--outputFormat\", \
	                     \"svg\"]\n# url = \"https://kroki.io\"\ntimeout_secs = 30\n\n# \
	                     [renderer.config]\n# theme = \"forest\"\n\n# [template]\n# class = \
	                     \"mermaid-diagram\"\n# path = \"templates/diagram.html\"\n\n# \
	                     [exclude]\n# patterns = [\"drafts/\"]\n\n[output]\ndir = \
	                     \"rendered\"\n";

	let config_path = root.join("mdiagram.toml");
	std::fs::write(&config_path, sample_config)?;
	println!("Created mdiagram.toml");

	println!();
	println!("Next steps:");
	println!("  1. Install the mermaid cli: npm install -g @mermaid-js/mermaid-cli");
	println!("  2. Add a diagram to any markdown file:");
	println!("     ```mermaid title=\"Flow\" desc=\"What happens next\"");
	println!("     graph TD; A-->B");
	println!("     ```");
	println!("  3. Run `mdiagram render` to write the rendered documents");

	Ok(())
}

fn run_render(
	args: &MdiagramCli,
	out_dir: Option<&Path>,
	dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut config = MdiagramConfig::load_or_default(&root)?;
	if let Some(out_dir) = out_dir {
		config.output.dir = out_dir.to_path_buf();
	}
	let output_dir = root.join(&config.output.dir);

	let entries = scan_documents(&root, &config)?;
	let transformer = config.build_transformer(&root)?;
	tracing::debug!(documents = entries.len(), "scanned project");

	let runtime = tokio::runtime::Runtime::new()?;
	let mut files = 0;
	let mut diagrams = 0;

	for entry in &entries {
		let rendered = runtime.block_on(render_entry(entry, &transformer))?;
		if rendered.diagrams == 0 {
			continue;
		}

		files += 1;
		diagrams += rendered.diagrams;
		for line in &rendered.failed_lines {
			eprintln!(
				"{} {}:{line} diagram failed to render",
				colored!("warning:", yellow),
				entry.relative.display()
			);
		}

		let target = output_dir.join(&entry.relative);
		if dry_run {
			println!(
				"Would write {} ({} diagram(s))",
				make_relative(&target, &root),
				rendered.diagrams
			);
		} else {
			let written = write_rendered(&output_dir, entry, &rendered)?;
			println!(
				"Rendered {} -> {}",
				entry.relative.display(),
				make_relative(&written, &root)
			);
		}
	}

	if files == 0 {
		println!("No diagram blocks found.");
	} else if dry_run {
		println!("Dry run: {diagrams} diagram(s) in {files} file(s) would be rendered.");
	} else {
		println!(
			"{} {diagrams} diagram(s) in {files} file(s).",
			colored!("Rendered", green)
		);
	}

	Ok(())
}

fn run_check(args: &MdiagramCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut config = MdiagramConfig::load_or_default(&root)?;
	// Every diagram is attempted so all failures are reported at once.
	config.on_error = FailurePolicy::Marker;

	let entries = scan_documents(&root, &config)?;
	let transformer = config.build_transformer(&root)?;
	let runtime = tokio::runtime::Runtime::new()?;

	let mut total = 0;
	let mut failures: Vec<(&DocumentEntry, usize)> = vec![];

	for entry in &entries {
		let rendered = runtime.block_on(render_entry(entry, &transformer))?;
		total += rendered.diagrams;
		failures.extend(rendered.failed_lines.iter().map(|line| (entry, *line)));
	}

	if failures.is_empty() {
		println!("Check passed: {total} diagram(s) rendered.");
		return Ok(());
	}

	for (entry, line) in &failures {
		eprintln!(
			"{} {}:{line} diagram failed to render",
			colored!("error:", red),
			entry.relative.display()
		);
	}
	println!(
		"Check failed: {} of {total} diagram(s) failed to render.",
		failures.len()
	);
	process::exit(1);
}

fn run_list(args: &MdiagramCli, format: ListFormat) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config = MdiagramConfig::load_or_default(&root)?;
	let entries = scan_documents(&root, &config)?;

	let mut listed = vec![];
	for entry in &entries {
		let source = std::fs::read_to_string(&entry.path)?;
		let blocks = list_diagrams(&source, entry.kind, &config.languages)?;
		if !blocks.is_empty() {
			listed.push((entry, blocks));
		}
	}

	if let ListFormat::Json = format {
		let mut values = vec![];
		for (entry, blocks) in &listed {
			for block in blocks {
				let mut value = serde_json::to_value(block)?;
				if let Some(object) = value.as_object_mut() {
					object.insert(
						"file".to_string(),
						entry.relative.display().to_string().into(),
					);
				}
				values.push(value);
			}
		}
		println!("{}", serde_json::to_string_pretty(&values)?);
		return Ok(());
	}

	if listed.is_empty() {
		println!("No diagram blocks found.");
		return Ok(());
	}

	let mut total = 0;
	for (entry, blocks) in &listed {
		println!("{}", colored!(entry.relative.display(), bold));
		for block in blocks {
			let caption = block.title.as_deref().unwrap_or("(untitled)");
			println!("  {}:{} {} {caption}", block.line, block.column, block.lang);
		}
		total += blocks.len();
	}

	println!();
	println!("{total} diagram(s) in {} file(s)", listed.len());

	Ok(())
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
