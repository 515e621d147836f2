use std::fmt::Display;
use std::str::FromStr;

use derive_more::Deref;
use derive_more::DerefMut;
use regex::Regex;
use serde::Serialize;

use crate::ArgKind;
use crate::ArgSpec;
use crate::CollectionConfig;
use crate::InspectionResult;
use crate::Literal;
use crate::MarkerError;
use crate::MarkerResult;
use crate::Placeholders;
use crate::Point;
use crate::Registry;

pub const FIELD_MARKER_PREFIX: &str = "+operator-builder:field";
pub const COLLECTION_FIELD_MARKER_PREFIX: &str = "+operator-builder:collection:field";
pub const RESOURCE_MARKER_PREFIX: &str = "+operator-builder:resource";

/// Field names the generated code uses for itself.
pub const RESERVED_FIELD_NAMES: &[&str] = &["collection.name", "collection.namespace"];

/// A marker variant that can be bound to a prefix in a [`Registry`].
///
/// `ARGS` is the schema the parser checks arguments against. `set_arg` is only
/// ever called with a name from `ARGS` and a literal that already satisfies
/// its [`ArgKind`].
pub trait Marker: Default + Into<MarkerValue> {
	const ARGS: &'static [ArgSpec];

	fn set_arg(&mut self, name: &str, value: Literal) -> MarkerResult<()>;

	/// Cross-argument checks run once every argument has been assigned.
	fn validate(&mut self, _position: Point) -> MarkerResult<()> {
		Ok(())
	}
}

/// The type of an api spec field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
	#[default]
	#[serde(rename = "unknown")]
	Unknown,
	#[serde(rename = "string")]
	String,
	#[serde(rename = "int")]
	Int,
	#[serde(rename = "bool")]
	Bool,
	#[serde(rename = "[]string")]
	SliceString,
	#[serde(rename = "[]int")]
	SliceInt,
	#[serde(rename = "[]bool")]
	SliceBool,
	#[serde(rename = "struct")]
	Struct,
}

impl FieldType {
	/// The Go zero value of the type.
	pub fn zero_value(self) -> &'static str {
		match self {
			Self::String => "\"\"",
			Self::Int => "0",
			Self::Bool => "false",
			_ => "nil",
		}
	}

	/// Check a `default` literal against the type, stringifying scalars for
	/// string fields.
	fn coerce(self, literal: Literal, position: Point) -> MarkerResult<Literal> {
		let all = |items: &[Literal], kind: fn(&Literal) -> bool| items.iter().all(kind);
		let found = literal.kind().to_string();

		match (self, literal) {
			(Self::String, Literal::Slice(_)) | (Self::Unknown, _) => {}
			(Self::String, scalar) => return Ok(Literal::String(scalar.to_string())),
			(Self::Int, literal @ Literal::Int(_))
			| (Self::Bool, literal @ Literal::Bool(_))
			| (Self::Struct, literal) => return Ok(literal),
			(Self::SliceString, Literal::Slice(items))
				if all(&items, |item| !matches!(item, Literal::Slice(_))) =>
			{
				let items = items
					.into_iter()
					.map(|item| Literal::String(item.to_string()))
					.collect();
				return Ok(Literal::Slice(items));
			}
			(Self::SliceInt, Literal::Slice(items))
				if all(&items, |item| matches!(item, Literal::Int(_))) =>
			{
				return Ok(Literal::Slice(items));
			}
			(Self::SliceBool, Literal::Slice(items))
				if all(&items, |item| matches!(item, Literal::Bool(_))) =>
			{
				return Ok(Literal::Slice(items));
			}
			_ => {}
		}

		Err(MarkerError::MismatchedMarkerTypes {
			name: "default".into(),
			expected: self.to_string(),
			found,
			position,
		})
	}
}

impl FromStr for FieldType {
	type Err = MarkerError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"string" => Ok(Self::String),
			"int" => Ok(Self::Int),
			"bool" => Ok(Self::Bool),
			"[]string" => Ok(Self::SliceString),
			"[]int" => Ok(Self::SliceInt),
			"[]bool" => Ok(Self::SliceBool),
			"struct" => Ok(Self::Struct),
			_ => Err(MarkerError::InvalidFieldType(value.to_string())),
		}
	}
}

impl Display for FieldType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::Unknown => "unknown",
			Self::String => "string",
			Self::Int => "int",
			Self::Bool => "bool",
			Self::SliceString => "[]string",
			Self::SliceInt => "[]int",
			Self::SliceBool => "[]bool",
			Self::Struct => "struct",
		};

		write!(f, "{name}")
	}
}

/// Upper-case the first letter of every word, where words are separated by
/// anything that isn't a letter or digit. `field.marker` becomes
/// `Field.Marker`.
pub fn to_title(value: &str) -> String {
	let mut title = String::with_capacity(value.len());
	let mut word_start = true;

	for ch in value.chars() {
		if word_start {
			title.extend(ch.to_uppercase());
		} else {
			title.push(ch);
		}

		word_start = !ch.is_alphanumeric();
	}

	title
}

/// Whether a field marker name is reserved for internal use.
pub fn is_reserved(name: &str) -> bool {
	RESERVED_FIELD_NAMES
		.iter()
		.any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Marks a manifest value as a configurable api spec field.
///
/// ```yaml
/// # +operator-builder:field:name=webStoreReplicas,default=2,type=int
/// replicas: 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMarker {
	pub name: String,
	#[serde(rename = "type")]
	pub field_type: FieldType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub default: Option<Literal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub replace: Option<String>,
	/// The annotated scalar before any rewriting.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub original_value: Option<String>,
	#[serde(skip)]
	pub for_collection: bool,
}

const FIELD_ARGS: &[ArgSpec] = &[
	ArgSpec::required("name", ArgKind::String),
	ArgSpec::required("type", ArgKind::String),
	ArgSpec::optional("description", ArgKind::String),
	ArgSpec::optional("default", ArgKind::Any),
	ArgSpec::optional("replace", ArgKind::String),
];

impl FieldMarker {
	/// The Go expression referencing this field, e.g. `parent.Spec.Field.Marker`.
	pub fn source_code_variable(&self, spec_prefix: &str) -> String {
		format!("{spec_prefix}.{}", to_title(&self.name))
	}

	/// The placeholder spliced into a partially replaced value.
	pub fn source_code_field_variable(&self, spec_prefix: &str) -> String {
		format!("!!start {} !!end", self.source_code_variable(spec_prefix))
	}

	/// Describe the api spec field this marker produces.
	pub fn descriptor(&self) -> FieldDescriptor {
		let title = to_title(&self.name);
		let quote = |value: String| {
			if self.field_type == FieldType::String {
				format!("{value:?}")
			} else {
				value
			}
		};

		let (default_value, sample) = match (&self.default, &self.original_value) {
			(Some(default), _) => (default.to_go_literal(), quote(default.to_string())),
			(None, Some(original)) => (quote(original.clone()), quote(original.clone())),
			(None, None) => (self.field_type.zero_value().to_string(), String::new()),
		};

		let documentation_lines = self
			.description
			.as_deref()
			.map(|description| {
				description
					.trim_start_matches('\n')
					.split('\n')
					.map(ToString::to_string)
					.collect()
			})
			.unwrap_or_default();

		FieldDescriptor {
			api_spec_content: format!("{title} {} `json:\"{}\"`", self.go_type(), self.name),
			sample_value: format!("{}: {sample}", self.name),
			name: title,
			manifest_field_name: self.name.clone(),
			field_type: self.field_type,
			zero_value: self.field_type.zero_value().to_string(),
			default_value,
			documentation_lines,
		}
	}

	fn go_type(&self) -> String {
		match self.field_type {
			FieldType::Unknown | FieldType::Struct => to_title(&self.name),
			field_type => field_type.to_string(),
		}
	}

	fn check_name(&self) -> MarkerResult<()> {
		if is_reserved(&self.name) {
			return Err(MarkerError::ReservedFieldName(self.name.clone()));
		}

		Ok(())
	}
}

impl Marker for FieldMarker {
	const ARGS: &'static [ArgSpec] = FIELD_ARGS;

	fn set_arg(&mut self, name: &str, value: Literal) -> MarkerResult<()> {
		match name {
			"name" => self.name = value.to_string(),
			"type" => self.field_type = value.to_string().parse()?,
			"description" => self.description = Some(value.to_string()),
			"default" => self.default = Some(value),
			"replace" => self.replace = Some(value.to_string()),
			_ => return Err(unknown_argument(name, FIELD_MARKER_PREFIX)),
		}

		Ok(())
	}

	fn validate(&mut self, position: Point) -> MarkerResult<()> {
		self.check_name()?;

		if let Some(default) = self.default.take() {
			self.default = Some(self.field_type.coerce(default, position)?);
		}

		if let Some(pattern) = &self.replace {
			compile_replace(pattern)?;
		}

		Ok(())
	}
}

/// A field marker scoped to the parent collection of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct CollectionFieldMarker(pub FieldMarker);

impl Marker for CollectionFieldMarker {
	const ARGS: &'static [ArgSpec] = FIELD_ARGS;

	fn set_arg(&mut self, name: &str, value: Literal) -> MarkerResult<()> {
		self.0.set_arg(name, value).map_err(|error| {
			match error {
				MarkerError::UnknownArgument { name, .. } => {
					unknown_argument(&name, COLLECTION_FIELD_MARKER_PREFIX)
				}
				error => error,
			}
		})
	}

	fn validate(&mut self, position: Point) -> MarkerResult<()> {
		self.0.validate(position)
	}
}

/// Includes or excludes a whole manifest depending on the value of a field.
///
/// ```yaml
/// # +operator-builder:resource:field=provider,value="aws",include
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMarker {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub collection_field: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<Literal>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub include: Option<bool>,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub source_code_variable: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub source_code_value: String,
	#[serde(skip_serializing_if = "String::is_empty")]
	pub include_code: String,
}

const RESOURCE_ARGS: &[ArgSpec] = &[
	ArgSpec::optional("field", ArgKind::String),
	ArgSpec::optional("collectionField", ArgKind::String),
	ArgSpec::required("value", ArgKind::Any),
	ArgSpec::required("include", ArgKind::Bool),
];

impl Marker for ResourceMarker {
	const ARGS: &'static [ArgSpec] = RESOURCE_ARGS;

	fn set_arg(&mut self, name: &str, value: Literal) -> MarkerResult<()> {
		match name {
			"field" => self.field = Some(value.to_string()),
			"collectionField" => self.collection_field = Some(value.to_string()),
			"value" => self.value = Some(value),
			"include" => self.include = value.as_bool(),
			_ => return Err(unknown_argument(name, RESOURCE_MARKER_PREFIX)),
		}

		Ok(())
	}

	fn validate(&mut self, position: Point) -> MarkerResult<()> {
		if matches!(self.value, Some(Literal::Slice(_))) {
			return Err(MarkerError::MismatchedMarkerTypes {
				name: "value".into(),
				expected: "a string, int or bool".into(),
				found: "slice".into(),
				position,
			});
		}

		Ok(())
	}
}

impl ResourceMarker {
	/// Associate the marker with the field marker it references, check the
	/// value against that field's type and build the include guard.
	///
	/// `parent` and `collection` are the spec prefixes used for field markers
	/// and collection field markers.
	pub fn process(
		&mut self,
		markers: &[MarkerValue],
		parent: &str,
		collection: &str,
	) -> MarkerResult<()> {
		let Some(include) = self.include else {
			return Err(self.invalid("missing 'include' value"));
		};

		let associated = markers.iter().find_map(|marker| {
			match marker {
				MarkerValue::Field(field)
					if self.field.as_deref() == Some(field.name.as_str())
						|| (field.for_collection
							&& self.collection_field.as_deref() == Some(field.name.as_str())) =>
				{
					Some((field, parent))
				}
				MarkerValue::CollectionField(field)
					if self.collection_field.as_deref() == Some(field.name.as_str()) =>
				{
					Some((&field.0, collection))
				}
				_ => None,
			}
		});

		let Some((field, spec_prefix)) = associated else {
			return Err(self.invalid("unable to find associated field marker"));
		};

		if (self.field.is_none() && self.collection_field.is_none()) || self.value.is_none() {
			return Err(self.invalid("missing 'collectionField', 'field' or 'value'"));
		}

		let value = match &self.value {
			Some(literal @ (Literal::String(_) | Literal::Int(_) | Literal::Bool(_))) => literal,
			_ => return Err(self.invalid("'value' is of unknown type")),
		};

		let value_type = match value {
			Literal::Int(_) => FieldType::Int,
			Literal::Bool(_) => FieldType::Bool,
			_ => FieldType::String,
		};

		if field.field_type != value_type {
			return Err(MarkerError::ResourceTypeMismatch {
				expected: field.field_type.to_string(),
				found: value_type.to_string(),
				marker: self.describe(),
			});
		}

		self.source_code_variable = field.source_code_variable(spec_prefix);
		self.source_code_value = value.to_go_literal();
		let operator = if include { "!=" } else { "==" };
		self.include_code = format!(
			"if {} {operator} {} {{\n\t\treturn []client.Object{{}}, nil\n\t}}",
			self.source_code_variable, self.source_code_value
		);

		Ok(())
	}

	fn invalid(&self, reason: &str) -> MarkerError {
		MarkerError::InvalidResourceMarker {
			reason: reason.to_string(),
			marker: self.describe(),
		}
	}

	fn describe(&self) -> String {
		let reference = self
			.field
			.as_deref()
			.or(self.collection_field.as_deref())
			.unwrap_or_default();
		let value = self.value.as_ref().map(ToString::to_string).unwrap_or_default();

		format!("{RESOURCE_MARKER_PREFIX}:{reference}={value}")
	}
}

/// A parsed marker of any of the shipped variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MarkerValue {
	Field(FieldMarker),
	CollectionField(CollectionFieldMarker),
	Resource(ResourceMarker),
}

impl MarkerValue {
	pub fn set_arg(&mut self, name: &str, value: Literal) -> MarkerResult<()> {
		match self {
			Self::Field(marker) => marker.set_arg(name, value),
			Self::CollectionField(marker) => marker.set_arg(name, value),
			Self::Resource(marker) => marker.set_arg(name, value),
		}
	}

	pub fn validate(&mut self, position: Point) -> MarkerResult<()> {
		match self {
			Self::Field(marker) => marker.validate(position),
			Self::CollectionField(marker) => marker.validate(position),
			Self::Resource(marker) => marker.validate(position),
		}
	}

	/// The field marker behind a field or collection field marker.
	pub fn as_field(&self) -> Option<&FieldMarker> {
		match self {
			Self::Field(marker) => Some(marker),
			Self::CollectionField(marker) => Some(marker),
			Self::Resource(_) => None,
		}
	}

	pub fn as_field_mut(&mut self) -> Option<&mut FieldMarker> {
		match self {
			Self::Field(marker) => Some(marker),
			Self::CollectionField(marker) => Some(marker),
			Self::Resource(_) => None,
		}
	}

	pub fn as_resource_mut(&mut self) -> Option<&mut ResourceMarker> {
		match self {
			Self::Resource(marker) => Some(marker),
			_ => None,
		}
	}

	pub fn is_collection_field(&self) -> bool {
		matches!(self, Self::CollectionField(_))
	}

	pub fn field_descriptor(&self) -> Option<FieldDescriptor> {
		self.as_field().map(FieldMarker::descriptor)
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Field(_) => "field",
			Self::CollectionField(_) => "collectionField",
			Self::Resource(_) => "resource",
		}
	}
}

impl From<FieldMarker> for MarkerValue {
	fn from(value: FieldMarker) -> Self {
		Self::Field(value)
	}
}

impl From<CollectionFieldMarker> for MarkerValue {
	fn from(value: CollectionFieldMarker) -> Self {
		Self::CollectionField(value)
	}
}

impl From<ResourceMarker> for MarkerValue {
	fn from(value: ResourceMarker) -> Self {
		Self::Resource(value)
	}
}

/// The api spec field a field-like marker contributes to generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
	pub name: String,
	pub manifest_field_name: String,
	#[serde(rename = "type")]
	pub field_type: FieldType,
	pub zero_value: String,
	pub default_value: String,
	pub sample_value: String,
	pub documentation_lines: Vec<String>,
	pub api_spec_content: String,
}

/// Collect the api spec fields the inspected markers produce.
///
/// A collection's own field markers only count when the collection is also
/// one of its resources, and collection field markers only count for
/// collections. Fields are unique by name, a later marker replaces an
/// earlier one.
pub fn extract_spec_fields(
	results: &[InspectionResult],
	collection: CollectionConfig,
) -> Vec<FieldDescriptor> {
	let mut fields: Vec<FieldDescriptor> = vec![];

	for result in results {
		let include = match &result.marker {
			MarkerValue::Field(_) => !collection.enabled || collection.resources,
			MarkerValue::CollectionField(_) => collection.enabled,
			MarkerValue::Resource(_) => false,
		};

		let Some(descriptor) = result.marker.field_descriptor().filter(|_| include) else {
			continue;
		};

		match fields
			.iter_mut()
			.find(|field| field.manifest_field_name == descriptor.manifest_field_name)
		{
			Some(field) => *field = descriptor,
			None => fields.push(descriptor),
		}
	}

	fields.sort_by(|a, b| a.name.cmp(&b.name));
	fields
}

/// Run [`ResourceMarker::process`] for every resource marker against the field
/// markers found alongside it.
pub fn process_resource_markers(
	results: &mut [InspectionResult],
	placeholders: &Placeholders,
) -> MarkerResult<()> {
	let markers: Vec<MarkerValue> = results
		.iter()
		.filter(|result| result.marker.as_field().is_some())
		.map(|result| result.marker.clone())
		.collect();

	for result in results.iter_mut() {
		if let Some(resource) = result.marker.as_resource_mut() {
			resource.process(&markers, &placeholders.parent, &placeholders.collection)?;
		}
	}

	Ok(())
}

/// Build the registry with the three operator-builder marker definitions.
pub fn operator_builder_registry() -> MarkerResult<Registry> {
	let mut registry = Registry::new();
	registry.define::<FieldMarker>(FIELD_MARKER_PREFIX)?;
	registry.define::<CollectionFieldMarker>(COLLECTION_FIELD_MARKER_PREFIX)?;
	registry.define::<ResourceMarker>(RESOURCE_MARKER_PREFIX)?;

	Ok(registry)
}

pub(crate) fn compile_replace(pattern: &str) -> MarkerResult<Regex> {
	Regex::new(pattern).map_err(|error| {
		MarkerError::InvalidReplace {
			pattern: pattern.to_string(),
			reason: error.to_string(),
		}
	})
}

fn unknown_argument(name: &str, marker: &str) -> MarkerError {
	MarkerError::UnknownArgument {
		name: name.to_string(),
		marker: marker.to_string(),
		position: Point::default(),
	}
}
