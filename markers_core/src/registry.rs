use std::collections::HashMap;

use tracing::debug;

use crate::ArgSpec;
use crate::Marker;
use crate::MarkerError;
use crate::MarkerResult;
use crate::MarkerValue;

/// A prefix bound to the schema of one marker variant.
#[derive(Debug, Clone)]
pub struct Definition {
	prefix: String,
	args: &'static [ArgSpec],
	zero: fn() -> MarkerValue,
}

impl Definition {
	/// Bind `prefix` to the marker variant `M`.
	pub fn new<M: Marker>(prefix: impl Into<String>) -> MarkerResult<Self> {
		let prefix = prefix.into();
		validate_prefix(&prefix)?;

		Ok(Self {
			prefix,
			args: M::ARGS,
			zero: zero::<M>,
		})
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	pub fn args(&self) -> &'static [ArgSpec] {
		self.args
	}

	/// Look up an argument by name, ignoring case.
	pub fn arg(&self, name: &str) -> Option<&'static ArgSpec> {
		self.args.iter().find(|spec| spec.matches(name))
	}

	/// The zero value of the bound marker variant.
	pub fn instantiate(&self) -> MarkerValue {
		(self.zero)()
	}
}

fn zero<M: Marker>() -> MarkerValue {
	M::default().into()
}

/// The set of recognised marker prefixes. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	definitions: Vec<Definition>,
	index: HashMap<String, usize>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a definition. A prefix can only be registered once.
	pub fn add(&mut self, definition: Definition) -> MarkerResult<&Definition> {
		if self.index.contains_key(definition.prefix()) {
			return Err(MarkerError::DuplicatePrefix(definition.prefix));
		}

		debug!(prefix = definition.prefix(), "registered marker definition");
		let index = self.definitions.len();
		self.index.insert(definition.prefix.clone(), index);
		self.definitions.push(definition);

		Ok(&self.definitions[index])
	}

	/// Define and add the marker variant `M` under `prefix`, returning the new
	/// definition.
	pub fn define<M: Marker>(&mut self, prefix: impl Into<String>) -> MarkerResult<&Definition> {
		self.add(Definition::new::<M>(prefix)?)
	}

	/// Exact lookup of a full scope path such as `+operator-builder:field`.
	pub fn get(&self, path: &str) -> Option<&Definition> {
		self.index.get(path).map(|index| &self.definitions[*index])
	}

	/// Whether `path` is a registered prefix or a leading part of one.
	pub fn could_match(&self, path: &str) -> bool {
		self.definitions.iter().any(|definition| {
			definition
				.prefix
				.strip_prefix(path)
				.is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
		})
	}

	/// The registered prefixes in registration order.
	pub fn marker_strings(&self) -> Vec<&str> {
		self.definitions
			.iter()
			.map(|definition| definition.prefix.as_str())
			.collect()
	}

	pub fn definitions(&self) -> &[Definition] {
		&self.definitions
	}

	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

/// A prefix is `+` followed by identifier segments joined by `:`.
fn validate_prefix(prefix: &str) -> MarkerResult<()> {
	let invalid = || MarkerError::InvalidPrefix(prefix.to_string());
	let path = prefix.strip_prefix('+').ok_or_else(invalid)?;

	let valid_segment = |segment: &str| {
		let mut chars = segment.chars();
		chars
			.next()
			.is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_')
			&& chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
	};

	if path.split(':').all(valid_segment) {
		Ok(())
	} else {
		Err(invalid())
	}
}
