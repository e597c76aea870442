#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;
use mdiagram_core::AnyEmptyResult;

pub fn mdiagram_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("mdiagram"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("MDIAGRAM_LOG");
	cmd
}

/// A document with two diagrams and one unrelated code block.
pub const GUIDE: &str = "# Guide\n\n```mermaid title=\"Login\" desc=\"After submit\"\ngraph TD; \
                         A-->B\n```\n\nSome text.\n\n```rust\nfn main() {}\n```\n\n```mermaid\nsequenceDiagram\n    \
                         A->>B: hi\n```\n";

/// Configure the command renderer to run `program` without arguments, which
/// lets the tests render without the mermaid cli installed.
pub fn write_command_config(root: &Path, program: &str, extra: &str) -> AnyEmptyResult {
	std::fs::write(
		root.join("mdiagram.toml"),
		format!("[renderer]\ncommand = \"{program}\"\nargs = []\n{extra}"),
	)?;

	Ok(())
}
