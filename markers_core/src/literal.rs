use std::fmt::Display;

use serde::Serialize;

/// A typed marker argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Literal {
	String(String),
	Int(i64),
	Bool(bool),
	Slice(Vec<Literal>),
}

impl Literal {
	pub fn kind(&self) -> LiteralKind {
		match self {
			Self::String(_) => LiteralKind::String,
			Self::Int(_) => LiteralKind::Int,
			Self::Bool(_) => LiteralKind::Bool,
			Self::Slice(_) => LiteralKind::Slice,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			_ => None,
		}
	}

	/// Render the value the way generated Go source spells it: strings are
	/// quoted, slices become typed slice literals.
	pub fn to_go_literal(&self) -> String {
		match self {
			Self::String(value) => format!("{value:?}"),
			Self::Int(value) => value.to_string(),
			Self::Bool(value) => value.to_string(),
			Self::Slice(items) => {
				let element = items.first().map_or("string", |item| {
					match item.kind() {
						LiteralKind::Int => "int",
						LiteralKind::Bool => "bool",
						_ => "string",
					}
				});
				let items: Vec<_> = items.iter().map(Self::to_go_literal).collect();

				format!("[]{element}{{{}}}", items.join(", "))
			}
		}
	}
}

impl Display for Literal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::String(value) => write!(f, "{value}"),
			Self::Int(value) => write!(f, "{value}"),
			Self::Bool(value) => write!(f, "{value}"),
			Self::Slice(items) => {
				let items: Vec<_> = items.iter().map(ToString::to_string).collect();
				write!(f, "{{{}}}", items.join(","))
			}
		}
	}
}

impl From<&str> for Literal {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<i64> for Literal {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<bool> for Literal {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
	String,
	Int,
	Bool,
	Slice,
}

impl Display for LiteralKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::String => "string",
			Self::Int => "int",
			Self::Bool => "bool",
			Self::Slice => "slice",
		};

		write!(f, "{name}")
	}
}

/// The value type an argument accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
	/// Any scalar, kept as its literal text.
	String,
	Int,
	Bool,
	SliceString,
	SliceInt,
	SliceBool,
	/// Whatever the literal naturally is.
	Any,
}

impl ArgKind {
	/// The element kind of a slice kind.
	pub fn element(self) -> Option<Self> {
		match self {
			Self::SliceString => Some(Self::String),
			Self::SliceInt => Some(Self::Int),
			Self::SliceBool => Some(Self::Bool),
			Self::Any => Some(Self::Any),
			Self::String | Self::Int | Self::Bool => None,
		}
	}
}

impl Display for ArgKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::String => "string",
			Self::Int => "int",
			Self::Bool => "bool",
			Self::SliceString => "[]string",
			Self::SliceInt => "[]int",
			Self::SliceBool => "[]bool",
			Self::Any => "any",
		};

		write!(f, "{name}")
	}
}

/// A single argument of a marker definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
	pub name: &'static str,
	pub kind: ArgKind,
	pub optional: bool,
}

impl ArgSpec {
	pub const fn required(name: &'static str, kind: ArgKind) -> Self {
		Self {
			name,
			kind,
			optional: false,
		}
	}

	pub const fn optional(name: &'static str, kind: ArgKind) -> Self {
		Self {
			name,
			kind,
			optional: true,
		}
	}

	/// Argument names match case-insensitively.
	pub fn matches(&self, name: &str) -> bool {
		self.name.eq_ignore_ascii_case(name)
	}
}
