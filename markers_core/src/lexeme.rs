use std::fmt::Display;

use derive_more::Deref;
use derive_more::DerefMut;

use crate::Point;

/// The closed set of lexeme kinds the marker lexer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeKind {
	/// `+`
	MarkerStart,
	/// A scope segment, e.g. `operator-builder` in `+operator-builder:field`.
	Scope,
	/// `:`
	Separator,
	/// An argument name, e.g. `name` in `name=earth`.
	Arg,
	/// A quoted or bare string value.
	StringLiteral,
	/// An all-digit value, e.g. `42`.
	IntegerLiteral,
	/// `true` or `false`, also produced implicitly for flag arguments.
	BoolLiteral,
	/// `{`
	SliceBegin,
	/// `,` between slice elements.
	SliceDelimiter,
	/// `}`
	SliceEnd,
	/// `#` or `//` directly in front of a marker.
	Comment,
	/// End of a marker, always carries `\n`.
	MarkerEnd,
	/// A recoverable problem, e.g. a marker without a scope.
	Warning,
	/// A syntax error. Always the last lexeme of a stream.
	Error,
	/// End of input. Always the last lexeme of a stream without errors.
	Eof,
}

impl LexemeKind {
	/// Whether this kind ends the lexeme stream.
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Eof | Self::Error)
	}

	/// Whether this kind carries an argument value.
	pub fn is_literal(self) -> bool {
		matches!(
			self,
			Self::StringLiteral | Self::IntegerLiteral | Self::BoolLiteral | Self::SliceBegin
		)
	}
}

impl Display for LexemeKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			Self::MarkerStart => "MarkerStart",
			Self::Scope => "Scope",
			Self::Separator => "Separator",
			Self::Arg => "Arg",
			Self::StringLiteral => "StringLiteral",
			Self::IntegerLiteral => "IntegerLiteral",
			Self::BoolLiteral => "BoolLiteral",
			Self::SliceBegin => "SliceBegin",
			Self::SliceDelimiter => "SliceDelimiter",
			Self::SliceEnd => "SliceEnd",
			Self::Comment => "Comment",
			Self::MarkerEnd => "MarkerEnd",
			Self::Warning => "Warning",
			Self::Error => "Error",
			Self::Eof => "EOF",
		};

		write!(f, "{name}")
	}
}

/// A single classified token of marker text together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
	pub kind: LexemeKind,
	pub value: String,
	pub position: Point,
}

impl Lexeme {
	pub fn new(kind: LexemeKind, value: impl Into<String>, position: Point) -> Self {
		Self {
			kind,
			value: value.into(),
			position,
		}
	}

	/// Compare kind and value only, ignoring the position.
	pub fn same_as(&self, kind: LexemeKind, value: &str) -> bool {
		self.kind == kind && self.value == value
	}
}

impl Display for Lexeme {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}({:?})", self.kind, self.value)
	}
}

/// A fully collected lexeme stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct Lexemes(Vec<Lexeme>);

impl Lexemes {
	/// The `(kind, value)` pairs of the stream, handy for comparisons that
	/// don't care about positions.
	pub fn pairs(&self) -> Vec<(LexemeKind, &str)> {
		self.0
			.iter()
			.map(|lexeme| (lexeme.kind, lexeme.value.as_str()))
			.collect()
	}

	pub fn into_inner(self) -> Vec<Lexeme> {
		self.0
	}
}

impl FromIterator<Lexeme> for Lexemes {
	fn from_iter<T: IntoIterator<Item = Lexeme>>(iter: T) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl IntoIterator for Lexemes {
	type IntoIter = std::vec::IntoIter<Lexeme>;
	type Item = Lexeme;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}
