use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Inspect operator-builder markers in YAML manifests.",
	long_about = "markers finds `+operator-builder` markers in the comments of YAML manifests \
	              and shows what they produce.\n\nManifests are taken from the command line or, \
	              when none are given, from `resources` in markers.toml.\n\nQuick start:\n  \
	              markers inspect deploy.yaml    List the markers in a manifest\n  markers \
	              fields deploy.yaml     Print the api spec fields\n  markers transform \
	              deploy.yaml  Print the manifest with placeholders"
)]
pub struct MarkersCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory. Used to find markers.toml and to
	/// resolve its resource paths.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output, including debug logs on stderr.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// List every marker found in the manifests.
	///
	/// Prints the file, line, marker prefix and arguments of each marker.
	/// Scope-less markers such as `+hello` are reported as warnings.
	Inspect {
		/// Manifest files. Defaults to `resources` from markers.toml.
		files: Vec<PathBuf>,

		/// Output format. Use `text` for human-readable output or `json` for
		/// programmatic consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Print the api spec fields the markers produce.
	///
	/// Fields are unique by name and sorted. Whether field markers and
	/// collection field markers count depends on the `[collection]` table of
	/// markers.toml.
	Fields {
		/// Manifest files. Defaults to `resources` from markers.toml.
		files: Vec<PathBuf>,

		/// Output format. Use `text` for Go struct fields or `json` for the
		/// full field descriptors.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Print the manifests with marked values replaced by placeholders.
	///
	/// Field values become `!!var parent.Spec.<Field>` references and the
	/// marker comments are removed. Resource markers are validated against
	/// their field markers.
	Transform {
		/// Manifest files. Defaults to `resources` from markers.toml.
		files: Vec<PathBuf>,

		/// Show a diff between each manifest and its transformed version
		/// instead of the transformed manifest.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
