use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use markers_cli::Commands;
use markers_cli::MarkersCli;
use markers_cli::OutputFormat;
use markers_core::AnyResult;
use markers_core::Document;
use markers_core::Inspection;
use markers_core::InspectionResult;
use markers_core::Inspector;
use markers_core::MarkerError;
use markers_core::MarkerValue;
use markers_core::MarkersConfig;
use markers_core::ParseDiagnostic;
use markers_core::PlaceholderTransform;
use markers_core::Registry;
use markers_core::Transform;
use markers_core::collection_to_parent;
use markers_core::extract_spec_fields;
use markers_core::operator_builder_registry;
use markers_core::process_resource_markers;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing::debug;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

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
	let args = MarkersCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_logging(args.verbose, use_color);

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Inspect { files, format }) => run_inspect(&args, files, *format),
		Some(Commands::Fields { files, format }) => run_fields(&args, files, *format),
		Some(Commands::Transform { files, diff }) => run_transform(&args, files, *diff),
		None => {
			eprintln!("No subcommand specified. Run `markers --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		match e.downcast::<MarkerError>() {
			Ok(marker_err) => {
				let report: miette::Report = (*marker_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Logs go to stderr. The library's own warnings are printed by the commands
/// with their file, so only errors are logged for it unless `--verbose`.
fn init_logging(verbose: bool, use_color: bool) {
	let default = if verbose {
		"debug"
	} else {
		"warn,markers_core=error"
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &MarkersCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

struct Project {
	root: PathBuf,
	config: MarkersConfig,
	registry: Registry,
}

struct Manifest {
	path: PathBuf,
	source: String,
	document: Document,
	inspection: Inspection,
}

#[derive(Serialize)]
struct InspectEntry<'a> {
	file: String,
	#[serde(flatten)]
	result: &'a InspectionResult,
}

fn load_project(args: &MarkersCli) -> AnyResult<Project> {
	let root = resolve_root(args);
	let config = MarkersConfig::load(&root)?.unwrap_or_default();

	if args.verbose {
		match MarkersConfig::resolve_path(&root) {
			Some(path) => eprintln!("Using config: {}", path.display()),
			None => eprintln!("No markers.toml found in {}", root.display()),
		}
	}

	Ok(Project {
		root,
		config,
		registry: operator_builder_registry()?,
	})
}

impl Project {
	/// The manifests named on the command line, or the configured resources.
	fn manifests(&self, files: &[PathBuf]) -> AnyResult<Vec<PathBuf>> {
		let manifests = if files.is_empty() {
			self.config.resource_paths(&self.root)
		} else {
			files.to_vec()
		};

		if manifests.is_empty() {
			return Err("no manifest files given and markers.toml lists no resources".into());
		}

		Ok(manifests)
	}

	fn inspect(&self, path: &Path, transforms: &[&dyn Transform]) -> AnyResult<Manifest> {
		let source = std::fs::read_to_string(path)
			.map_err(|e| format!("failed to read {}: {e}", path.display()))?;
		let (document, inspection) = Inspector::new(&self.registry)
			.inspect_yaml(&source, transforms)
			.inspect_err(|_| {
				eprintln!("{} {}", colored!("error in", red), path.display());
			})?;

		debug!(path = %path.display(), markers = inspection.len(), "inspected manifest");
		print_warnings(&make_relative(path, &self.root), &inspection.warnings);

		Ok(Manifest {
			path: path.to_path_buf(),
			source,
			document,
			inspection,
		})
	}
}

fn run_inspect(args: &MarkersCli, files: &[PathBuf], format: OutputFormat) -> AnyResult<()> {
	let project = load_project(args)?;
	let mut manifests = vec![];

	for path in project.manifests(files)? {
		manifests.push(project.inspect(&path, &[])?);
	}

	match format {
		OutputFormat::Json => {
			let entries: Vec<InspectEntry<'_>> = manifests
				.iter()
				.flat_map(|manifest| {
					let file = make_relative(&manifest.path, &project.root);
					manifest.inspection.iter().map(move |result| {
						InspectEntry {
							file: file.clone(),
							result,
						}
					})
				})
				.collect();

			println!("{}", serde_json::to_string_pretty(&entries)?);
		}
		OutputFormat::Text => {
			let mut total = 0;

			for manifest in &manifests {
				let file = make_relative(&manifest.path, &project.root);

				for result in manifest.inspection.iter() {
					println!(
						"{file}:{} {} {}",
						result.line,
						colored!(result.prefix, bold),
						describe_marker(&result.marker)
					);
					total += 1;
				}
			}

			if total == 0 {
				println!("No markers found.");
			} else if args.verbose {
				println!("\n{total} marker(s) in {} file(s)", manifests.len());
			}
		}
	}

	Ok(())
}

fn run_fields(args: &MarkersCli, files: &[PathBuf], format: OutputFormat) -> AnyResult<()> {
	let project = load_project(args)?;
	let mut results = vec![];

	for path in project.manifests(files)? {
		results.extend(project.inspect(&path, &[])?.inspection.results);
	}

	let fields = extract_spec_fields(&results, project.config.collection);

	match format {
		OutputFormat::Json => {
			println!("{}", serde_json::to_string_pretty(&fields)?);
		}
		OutputFormat::Text => {
			if fields.is_empty() {
				println!("No fields found.");
			}

			for field in &fields {
				for line in &field.documentation_lines {
					println!("// {line}");
				}

				println!("{}", field.api_spec_content);

				if args.verbose {
					println!("//   default: {}", field.default_value);
					println!("//   sample:  {}", field.sample_value);
				}
			}
		}
	}

	Ok(())
}

fn run_transform(args: &MarkersCli, files: &[PathBuf], show_diff: bool) -> AnyResult<()> {
	let project = load_project(args)?;
	let placeholders = project.config.placeholders.clone();
	let resources = |_: &mut Document, results: &mut [InspectionResult]| {
		process_resource_markers(results, &placeholders)
	};
	let placeholder = PlaceholderTransform::new(project.config.placeholders.clone());
	let transforms: [&dyn Transform; 2] = [&resources, &placeholder];
	let collection = project.config.collection;

	let manifests = project.manifests(files)?;
	let multiple = manifests.len() > 1;

	for path in &manifests {
		let manifest = project.inspect(path, &transforms)?;
		let file = make_relative(path, &project.root);
		let mut yaml = manifest.document.to_yaml();

		if collection.enabled && collection.resources {
			yaml = collection_to_parent(&yaml);
		}

		if args.verbose {
			for result in manifest.inspection.iter() {
				if let MarkerValue::Resource(resource) = &result.marker {
					eprintln!("{file}:{} include guard:\n\t{}", result.line, resource.include_code);
				}
			}
		}

		if show_diff {
			println!("{}", colored!(format!("--- {file}"), bold));
			print_diff(&manifest.source, &yaml);
			continue;
		}

		if multiple {
			println!("# source: {file}");
		}

		print!("{yaml}");
	}

	Ok(())
}

/// One-line summary of a marker's arguments.
fn describe_marker(marker: &MarkerValue) -> String {
	match marker {
		MarkerValue::Field(_) | MarkerValue::CollectionField(_) => {
			let Some(field) = marker.as_field() else {
				return String::new();
			};
			let mut parts = vec![
				format!("name={}", field.name),
				format!("type={}", field.field_type),
			];

			if let Some(default) = &field.default {
				parts.push(format!("default={default}"));
			}

			if let Some(replace) = &field.replace {
				parts.push(format!("replace={replace:?}"));
			}

			parts.join(" ")
		}
		MarkerValue::Resource(resource) => {
			let mut parts = vec![];

			if let Some(field) = &resource.field {
				parts.push(format!("field={field}"));
			}

			if let Some(field) = &resource.collection_field {
				parts.push(format!("collectionField={field}"));
			}

			if let Some(value) = &resource.value {
				parts.push(format!("value={value}"));
			}

			if let Some(include) = resource.include {
				parts.push(format!("include={include}"));
			}

			parts.join(" ")
		}
	}
}

fn print_warnings(file: &str, warnings: &[ParseDiagnostic]) {
	for warning in warnings {
		eprintln!(
			"{} {file}: {}",
			colored!("warning:", yellow),
			warning.message()
		);
	}
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("{}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				print!("{}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				print!(" {change}");
			}
		}
	}
}

fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
