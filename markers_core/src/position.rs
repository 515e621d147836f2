use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// A 1-indexed location in scanned text. `offset` is the byte offset and is
/// only used to slice the source; `line` and `column` count characters and are
/// what diagnostics report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	#[serde(skip)]
	pub offset: usize,
}

impl Default for Point {
	fn default() -> Self {
		Self::new(1, 1, 0)
	}
}

impl Point {
	pub const fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// Advance past a single character.
	pub fn advance(&mut self, ch: char) {
		self.offset += ch.len_utf8();

		if ch == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
	}

	/// Advance past every character of `text`.
	pub fn advance_str(&mut self, text: &str) {
		for ch in text.chars() {
			self.advance(ch);
		}
	}
}

impl Display for Point {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{{line:{} column:{}}}", self.line, self.column)
	}
}
