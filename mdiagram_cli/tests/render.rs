mod common;

use mdiagram_cli::Commands;
use mdiagram_cli::MdiagramCli;
use mdiagram_core::AnyEmptyResult;
use predicates::prelude::PredicateBooleanExt;

#[cfg(unix)]
#[test]
fn render_writes_rendered_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join("docs"))?;
	std::fs::write(tmp.path().join("docs/guide.md"), common::GUIDE)?;
	std::fs::write(tmp.path().join("plain.md"), "# Nothing to see\n")?;
	common::write_command_config(tmp.path(), "cat", "")?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Rendered docs/guide.md -> rendered/docs/guide.md",
		))
		.stdout(predicates::str::contains("2 diagram(s) in 1 file(s)."));

	let rendered = std::fs::read_to_string(tmp.path().join("rendered/docs/guide.md"))?;
	assert!(rendered.starts_with("# Guide\n\n<div class=\"mermaid-diagram\""));
	assert!(rendered.contains("graph TD; A-->B"));
	assert!(rendered.contains(">Login</h2>"));
	assert!(rendered.contains(">After submit</p>"));
	assert!(rendered.contains("```rust\nfn main() {}\n```"));
	assert!(!rendered.contains("```mermaid"));

	// Documents without diagrams are not copied.
	assert!(!tmp.path().join("rendered/plain.md").exists());
	// The source is left alone.
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("docs/guide.md"))?,
		common::GUIDE
	);

	Ok(())
}

#[cfg(unix)]
#[test]
fn render_does_not_rescan_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("guide.md"), common::GUIDE)?;
	common::write_command_config(tmp.path(), "cat", "")?;

	for _ in 0..2 {
		common::mdiagram_cmd()
			.arg("render")
			.arg("--path")
			.arg(tmp.path())
			.assert()
			.success()
			.stdout(predicates::str::contains("in 1 file(s)."));
	}

	assert!(!tmp.path().join("rendered/rendered").exists());

	Ok(())
}

#[cfg(unix)]
#[test]
fn render_out_dir_overrides_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("guide.md"), common::GUIDE)?;
	common::write_command_config(tmp.path(), "cat", "[output]\ndir = \"site\"\n")?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--out-dir")
		.arg("public")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("-> public/guide.md"));

	assert!(tmp.path().join("public/guide.md").exists());
	assert!(!tmp.path().join("site").exists());

	Ok(())
}

#[cfg(unix)]
#[test]
fn render_dry_run_writes_nothing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("guide.md"), common::GUIDE)?;
	common::write_command_config(tmp.path(), "cat", "")?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Would write rendered/guide.md (2 diagram(s))",
		))
		.stdout(predicates::str::contains("Dry run"));

	assert!(!tmp.path().join("rendered").exists());

	Ok(())
}

#[cfg(unix)]
#[test]
fn render_fails_on_first_broken_diagram() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("guide.md"), common::GUIDE)?;
	common::write_command_config(tmp.path(), "false", "")?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("guide.md"))
		.stderr(predicates::str::contains("mdiagram::document"));

	assert!(!tmp.path().join("rendered").exists());

	Ok(())
}

#[cfg(unix)]
#[test]
fn render_marker_policy_keeps_going() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("guide.md"), common::GUIDE)?;
	std::fs::write(
		tmp.path().join("mdiagram.toml"),
		"on_error = \"marker\"\n\n[renderer]\ncommand = \"false\"\nargs = []\n",
	)?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("guide.md:3 diagram failed to render"))
		.stderr(predicates::str::contains("guide.md:13 diagram failed to render"));

	let rendered = std::fs::read_to_string(tmp.path().join("rendered/guide.md"))?;
	assert!(rendered.contains("<pre class=\"mermaid-diagram-error\">"));
	assert!(rendered.contains("command exited with status 1"));

	Ok(())
}

#[test]
fn render_without_diagrams() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("readme.md"), "# Readme\n")?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No diagram blocks found."))
		.stdout(predicates::str::contains("Rendered").not());

	Ok(())
}

#[test]
fn invalid_config_is_reported() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("mdiagram.toml"), "on_error = \"ignore\"\n")?;

	common::mdiagram_cmd()
		.arg("render")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("mdiagram::config_parse"));

	Ok(())
}

#[test]
fn missing_subcommand_prints_usage_hint() {
	common::mdiagram_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("mdiagram --help"));
}

#[test]
fn render_flags_parse() {
	use clap::Parser;

	let cli = MdiagramCli::parse_from(["mdiagram", "render", "--dry-run", "--out-dir", "dist"]);
	match cli.command {
		Some(Commands::Render { out_dir, dry_run }) => {
			assert!(dry_run);
			assert_eq!(out_dir, Some("dist".into()));
		}
		_ => panic!("expected Render command"),
	}

	let cli = MdiagramCli::parse_from(["mdiagram", "render", "--path", "docs", "--verbose"]);
	assert!(cli.verbose);
	assert_eq!(cli.path, Some("docs".into()));
}
