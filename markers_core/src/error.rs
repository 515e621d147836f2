use miette::Diagnostic;
use thiserror::Error;

use crate::Point;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum MarkerError {
	#[error(transparent)]
	#[diagnostic(code(markers::io_error))]
	Io(#[from] std::io::Error),

	#[error("{message}")]
	#[diagnostic(code(markers::syntax))]
	Syntax { message: String, position: Point },

	#[error("unknown argument `{name}` for marker `{marker}` at position: {position}")]
	#[diagnostic(
		code(markers::unknown_argument),
		help("check the spelling of the argument against the marker definition")
	)]
	UnknownArgument {
		name: String,
		marker: String,
		position: Point,
	},

	#[error("duplicate argument `{name}` for marker `{marker}` at position: {position}")]
	#[diagnostic(code(markers::duplicate_argument))]
	DuplicateArgument {
		name: String,
		marker: String,
		position: Point,
	},

	#[error("missing required argument `{name}` for marker `{marker}`")]
	#[diagnostic(
		code(markers::missing_argument),
		help("add `{name}=<value>` to the marker")
	)]
	MissingArgument { name: String, marker: String },

	#[error(
		"mismatched marker types: argument `{name}` expects {expected}, got {found} at position: \
		 {position}"
	)]
	#[diagnostic(code(markers::mismatched_marker_types))]
	MismatchedMarkerTypes {
		name: String,
		expected: String,
		found: String,
		position: Point,
	},

	#[error("unable to parse field, `{0}` into FieldType")]
	#[diagnostic(
		code(markers::invalid_field_type),
		help("supported types: string, int, bool, []string, []int, []bool")
	)]
	InvalidFieldType(String),

	#[error("invalid marker prefix: `{0}`")]
	#[diagnostic(
		code(markers::invalid_prefix),
		help("prefixes look like `+scope:scope`, using letters, digits, `-` and `_`")
	)]
	InvalidPrefix(String),

	#[error("marker prefix `{0}` is already defined")]
	#[diagnostic(code(markers::duplicate_prefix))]
	DuplicatePrefix(String),

	/// `line` and `column` are where the marker error is in the document.
	#[error("invalid marker on line {line} column {column}: {source}")]
	#[diagnostic(code(markers::invalid_marker))]
	InvalidMarker {
		line: usize,
		column: usize,
		#[source]
		source: Box<MarkerError>,
	},

	#[error("failed to parse yaml document at line {line}: {reason}")]
	#[diagnostic(code(markers::yaml))]
	Yaml { line: usize, reason: String },

	#[error("unable to convert `{pattern}` to regex: {reason}")]
	#[diagnostic(code(markers::invalid_replace))]
	InvalidReplace { pattern: String, reason: String },

	#[error("field marker `{name}` annotates a mapping or sequence on line {line}")]
	#[diagnostic(
		code(markers::non_scalar_field),
		help("field markers replace a single value, move the marker onto a scalar")
	)]
	NonScalarField { name: String, line: usize },

	#[error("field marker `{0}` cannot be used and is reserved for internal purposes")]
	#[diagnostic(code(markers::reserved_field))]
	ReservedFieldName(String),

	#[error("resource marker is invalid: {reason} for marker {marker}")]
	#[diagnostic(
		code(markers::invalid_resource_marker),
		help(
			"resource markers need `include`, a `field` or `collectionField` that names a field \
			 marker, and a `value`"
		)
	)]
	InvalidResourceMarker { reason: String, marker: String },

	#[error(
		"resource marker and field marker have mismatched types; expected: {expected}, got: \
		 {found} for marker {marker}"
	)]
	#[diagnostic(code(markers::resource_type_mismatch))]
	ResourceTypeMismatch {
		expected: String,
		found: String,
		marker: String,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(markers::config_parse),
		help("check that markers.toml is valid TOML with `resources`, [placeholders] and [collection]")
	)]
	ConfigParse(String),
}

impl MarkerError {
	/// The source position the error points at, when it has one.
	pub fn position(&self) -> Option<Point> {
		match self {
			Self::Syntax { position, .. }
			| Self::UnknownArgument { position, .. }
			| Self::DuplicateArgument { position, .. }
			| Self::MismatchedMarkerTypes { position, .. } => Some(*position),
			Self::InvalidMarker { line, column, .. } => Some(Point::new(*line, *column, 0)),
			_ => None,
		}
	}
}

pub type MarkerResult<T> = Result<T, MarkerError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
