use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::ops::Range;

use logos::Logos;
use snailquote::unescape;
use tracing::trace;

use crate::Point;
use crate::lexeme::Lexeme;
use crate::lexeme::LexemeKind;
use crate::lexeme::Lexemes;

/// Raw tokens produced by logos. Quoted strings are scanned by hand from the
/// source since their rules depend on the surrounding comment.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
	#[token("+")]
	Plus,
	#[token(":")]
	Colon,
	#[token("=")]
	Equals,
	#[token(",")]
	Comma,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("#")]
	Hash,
	#[token("//")]
	DoubleSlash,
	#[regex(r"\r?\n")]
	Newline,
	#[regex(r"[ \t\r]+")]
	Whitespace,
	#[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*")]
	Ident,
	#[regex(r"[0-9]+")]
	Integer,
	#[regex(r#"["'`]"#)]
	Quote,
}

type RawResult = (Result<RawToken, ()>, Range<usize>);

/// What the next slice of a slice literal may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SliceExpect {
	/// Directly after `{`: an element or `}`.
	First,
	/// After `,`: an element.
	Element,
	/// After an element: `,` or `}`.
	Delimiter,
}

/// Context states of the marker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerContext {
	/// Outside of any marker.
	Text,
	/// Inside the `scope:scope:arg` header. `start` is the byte offset of the
	/// `+`.
	Header { start: usize, scoped: bool },
	/// After an argument name.
	AfterArg,
	/// After `=`.
	Value,
	/// After a complete value.
	AfterValue,
	/// Inside `{...}`.
	Slice(SliceExpect),
	/// An `EOF` or `Error` has been emitted.
	Done,
}

/// A lazy lexer for marker text.
///
/// Lexemes are produced on demand, so a consumer that stops pulling leaves the
/// rest of the text unscanned. The stream always ends with exactly one `EOF`
/// or one `Error` lexeme.
pub struct Lexer<'a> {
	source: &'a str,
	raw: logos::Lexer<'a, RawToken>,
	peeked: Option<RawResult>,
	/// Position of the next unconsumed character.
	position: Point,
	context: LexerContext,
	pending: VecDeque<Lexeme>,
	/// The comment delimiter seen on the current line, if any.
	comment: Option<&'static str>,
	/// Value of the most recently emitted lexeme, used in diagnostics.
	last_value: String,
}

impl<'a> Lexer<'a> {
	pub fn new(source: &'a str) -> Self {
		Self {
			source,
			raw: RawToken::lexer(source),
			peeked: None,
			position: Point::default(),
			context: LexerContext::Text,
			pending: VecDeque::new(),
			comment: None,
			last_value: String::new(),
		}
	}

	fn peek(&mut self) -> Option<&RawResult> {
		if self.peeked.is_none() {
			self.peeked = self.raw.next().map(|token| (token, self.raw.span()));
		}

		self.peeked.as_ref()
	}

	fn peek_kind(&mut self) -> Option<Result<RawToken, ()>> {
		self.peek().map(|(token, _)| *token)
	}

	fn peek_slice(&mut self) -> &'a str {
		let source = self.source;

		match self.peek() {
			Some((_, span)) => &source[span.clone()],
			None => "",
		}
	}

	/// Consume the next raw token and move the position past it.
	fn advance(&mut self) -> &'a str {
		let source = self.source;
		let span = match self.peeked.take() {
			Some((_, span)) => span,
			None => {
				match self.raw.next() {
					Some(_) => self.raw.span(),
					None => return "",
				}
			}
		};
		let slice = &source[span];
		self.position.advance_str(slice);

		slice
	}

	/// Consume `len` bytes directly after the last consumed token.
	fn skip_bytes(&mut self, len: usize) {
		debug_assert!(self.peeked.is_none(), "cannot skip bytes with a peeked token");
		let start = self.position.offset;
		self.raw.bump(len);
		self.position.advance_str(&self.source[start..start + len]);
	}

	fn emit(&mut self, kind: LexemeKind, value: impl Into<String>, position: Point) {
		let lexeme = Lexeme::new(kind, value, position);
		trace!(%lexeme, %position, "lexeme");
		self.last_value.clone_from(&lexeme.value);
		self.pending.push_back(lexeme);
	}

	/// Emit an `Error` lexeme and stop lexing.
	fn fail(&mut self, what: &str, detail: &str) {
		let position = self.position;
		let message = format!(
			"{what}: {detail} at position: {position}, following {:?}",
			self.last_value
		);
		self.emit(LexemeKind::Error, message, position);
		self.context = LexerContext::Done;
	}

	fn step(&mut self) {
		match self.context {
			LexerContext::Text => self.lex_text(),
			LexerContext::Header { start, scoped } => self.lex_header(start, scoped),
			LexerContext::AfterArg => self.lex_after_arg(),
			LexerContext::Value => self.lex_value(),
			LexerContext::AfterValue => self.lex_after_value(),
			LexerContext::Slice(expect) => self.lex_slice(expect),
			LexerContext::Done => {}
		}
	}

	/// Whether the next raw token is a `+` directly followed by the start of an
	/// identifier.
	fn at_marker_start(&mut self) -> bool {
		let end = match self.peek() {
			Some((Ok(RawToken::Plus), span)) => span.end,
			_ => return false,
		};

		self.source[end..]
			.chars()
			.next()
			.is_some_and(is_identifier_start)
	}

	fn lex_text(&mut self) {
		loop {
			let Some(kind) = self.peek_kind() else {
				let position = self.position;
				self.emit(LexemeKind::Eof, "", position);
				self.context = LexerContext::Done;
				return;
			};

			match kind {
				Ok(RawToken::Newline) => {
					self.advance();
					self.comment = None;
				}
				Ok(RawToken::Hash | RawToken::DoubleSlash) => {
					let position = self.position;
					let delimiter = if kind == Ok(RawToken::Hash) { "#" } else { "//" };
					self.advance();
					self.comment = Some(delimiter);

					while self.peek_kind() == Some(Ok(RawToken::Whitespace)) {
						self.advance();
					}

					if self.at_marker_start() {
						self.emit(LexemeKind::Comment, delimiter, position);
						self.start_marker();
						return;
					}
				}
				Ok(RawToken::Plus) if self.at_marker_start() => {
					self.start_marker();
					return;
				}
				_ => {
					self.advance();
				}
			}
		}
	}

	fn start_marker(&mut self) {
		let position = self.position;
		self.advance();
		self.emit(LexemeKind::MarkerStart, "+", position);
		self.context = LexerContext::Header {
			start: position.offset,
			scoped: false,
		};
	}

	fn lex_header(&mut self, start: usize, scoped: bool) {
		let position = self.position;

		if self.peek_kind() != Some(Ok(RawToken::Ident)) {
			self.fail("malformed marker", "expected identifier");
			return;
		}

		let ident = self.advance();

		if self.peek_kind() == Some(Ok(RawToken::Colon)) {
			self.emit(LexemeKind::Scope, ident, position);
			let separator = self.position;
			self.advance();
			self.emit(LexemeKind::Separator, ":", separator);
			self.context = LexerContext::Header {
				start,
				scoped: true,
			};
			return;
		}

		if !scoped {
			let following = &self.source[start..self.position.offset];
			let position = self.position;
			let message =
				format!("marker without scope found at position: {position}, following {following:?}");
			self.emit(LexemeKind::Warning, message, position);
			self.context = LexerContext::Text;
			return;
		}

		self.emit(LexemeKind::Arg, ident, position);
		self.context = LexerContext::AfterArg;
	}

	fn lex_after_arg(&mut self) {
		if self.peek_kind() == Some(Ok(RawToken::Equals)) {
			self.advance();
			self.context = LexerContext::Value;
			return;
		}

		// flag arguments carry an implicit `true`
		let position = self.position;
		self.emit(LexemeKind::BoolLiteral, "true", position);
		self.context = LexerContext::AfterValue;
	}

	fn lex_value(&mut self) {
		let position = self.position;

		match self.peek_kind() {
			Some(Ok(RawToken::Quote)) => {
				if self.lex_quoted() {
					self.context = LexerContext::AfterValue;
				}
			}
			Some(Ok(RawToken::BraceOpen)) => {
				self.advance();
				self.emit(LexemeKind::SliceBegin, "{", position);
				self.context = LexerContext::Slice(SliceExpect::First);
			}
			None | Some(Ok(RawToken::Comma | RawToken::Newline | RawToken::Whitespace)) => {
				self.fail("malformed marker", "missing value");
			}
			Some(_) => {
				self.lex_bare(false);
				self.context = LexerContext::AfterValue;
			}
		}
	}

	fn lex_after_value(&mut self) {
		let position = self.position;

		match self.peek_kind() {
			None => {
				self.emit(LexemeKind::MarkerEnd, "\n", position);
				self.context = LexerContext::Text;
			}
			Some(Ok(RawToken::Newline)) => {
				self.advance();
				self.comment = None;
				self.emit(LexemeKind::MarkerEnd, "\n", position);
				self.context = LexerContext::Text;
			}
			Some(Ok(RawToken::Whitespace)) => {
				self.advance();
				self.emit(LexemeKind::MarkerEnd, "\n", position);
				self.context = LexerContext::Text;
			}
			Some(Ok(RawToken::Comma)) => {
				self.advance();
				let position = self.position;

				if self.peek_kind() == Some(Ok(RawToken::Ident)) {
					let arg = self.advance();
					self.emit(LexemeKind::Arg, arg, position);
					self.context = LexerContext::AfterArg;
				} else {
					self.fail("malformed marker", "expected argument after ','");
				}
			}
			Some(_) => {
				let unexpected = format!("unexpected {:?}", self.peek_slice());
				self.fail("malformed marker", &unexpected);
			}
		}
	}

	fn lex_slice(&mut self, expect: SliceExpect) {
		loop {
			let position = self.position;
			let kind = self.peek_kind();

			match kind {
				Some(Ok(RawToken::Whitespace)) => {
					self.advance();
				}
				None => {
					self.fail("malformed slice", "unexpected end of input");
					return;
				}
				Some(Ok(RawToken::Newline)) => {
					self.fail("malformed slice", "unexpected end of line");
					return;
				}
				Some(Ok(RawToken::BraceClose)) if expect != SliceExpect::Element => {
					self.advance();
					self.emit(LexemeKind::SliceEnd, "}", position);
					self.context = LexerContext::AfterValue;
					return;
				}
				Some(Ok(RawToken::Comma)) if expect == SliceExpect::Delimiter => {
					self.advance();
					self.emit(LexemeKind::SliceDelimiter, ",", position);
					self.context = LexerContext::Slice(SliceExpect::Element);
					return;
				}
				Some(Ok(RawToken::Quote)) if expect != SliceExpect::Delimiter => {
					if self.lex_quoted() {
						self.context = LexerContext::Slice(SliceExpect::Delimiter);
					}
					return;
				}
				Some(Ok(RawToken::Comma | RawToken::BraceClose | RawToken::Equals)) => {
					let unexpected = format!("unexpected {:?}", self.peek_slice());
					self.fail("malformed slice", &unexpected);
					return;
				}
				Some(_) if expect != SliceExpect::Delimiter => {
					self.lex_bare(true);
					self.context = LexerContext::Slice(SliceExpect::Delimiter);
					return;
				}
				Some(_) => {
					let unexpected = format!("unexpected {:?}", self.peek_slice());
					self.fail("malformed slice", &unexpected);
					return;
				}
			}
		}
	}

	/// Read an unquoted value up to the next delimiter and classify it.
	fn lex_bare(&mut self, in_slice: bool) {
		let position = self.position;
		let mut text = String::new();

		while let Some(kind) = self.peek_kind() {
			let stop = match kind {
				Ok(RawToken::Comma | RawToken::Newline | RawToken::Whitespace) => true,
				Ok(RawToken::BraceClose | RawToken::Equals) => in_slice,
				_ => false,
			};

			if stop {
				break;
			}

			text.push_str(self.advance());
		}

		let kind = classify(&text);
		self.emit(kind, text, position);
	}

	/// Scan a quoted string starting at the peeked quote. Returns `false` when
	/// an error was emitted.
	fn lex_quoted(&mut self) -> bool {
		let position = self.position;
		let quote = self.advance();
		let rest = &self.source[self.position.offset..];

		let scanned = match quote {
			"`" => scan_backtick(rest, self.comment),
			"\"" => scan_double_quoted(rest),
			_ => scan_single_quoted(rest),
		};

		match scanned {
			Ok((value, consumed)) => {
				self.skip_bytes(consumed);
				self.emit(LexemeKind::StringLiteral, value, position);
				true
			}
			Err(detail) => {
				self.fail("malformed string literal", detail);
				false
			}
		}
	}
}

impl Iterator for Lexer<'_> {
	type Item = Lexeme;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(lexeme) = self.pending.pop_front() {
				return Some(lexeme);
			}

			if self.context == LexerContext::Done {
				return None;
			}

			self.step();
		}
	}
}

impl FusedIterator for Lexer<'_> {}

/// Lex the full text eagerly.
pub fn lex(source: &str) -> Lexemes {
	Lexer::new(source).collect()
}

fn is_identifier_start(ch: char) -> bool {
	ch.is_ascii_alphabetic() || ch == '_'
}

fn classify(text: &str) -> LexemeKind {
	if !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()) {
		LexemeKind::IntegerLiteral
	} else if text == "true" || text == "false" {
		LexemeKind::BoolLiteral
	} else {
		LexemeKind::StringLiteral
	}
}

/// Returns the value and the number of bytes consumed including the closing
/// quote.
fn scan_single_quoted(rest: &str) -> Result<(String, usize), &'static str> {
	match rest.find(['\'', '\n']) {
		Some(index) if rest[index..].starts_with('\'') => {
			Ok((rest[..index].to_string(), index + 1))
		}
		_ => Err("unterminated quote"),
	}
}

fn scan_double_quoted(rest: &str) -> Result<(String, usize), &'static str> {
	let mut escaped = false;

	for (index, ch) in rest.char_indices() {
		match ch {
			'\n' => break,
			'\\' if !escaped => escaped = true,
			'"' if !escaped => {
				let inner = &rest[..index];
				let value = if inner.contains('\\') {
					unescape(&format!("\"{inner}\"")).map_err(|_| "invalid escape sequence")?
				} else {
					inner.to_string()
				};

				return Ok((value, index + 1));
			}
			_ => escaped = false,
		}
	}

	Err("unterminated quote")
}

/// Backtick strings may span lines. Inside a comment the continuation lines
/// lose their leading whitespace, the comment delimiter and a single space.
fn scan_backtick(rest: &str, comment: Option<&str>) -> Result<(String, usize), &'static str> {
	let Some(index) = rest.find('`') else {
		return Err("unterminated backtick");
	};

	let raw = &rest[..index];
	let Some(delimiter) = comment else {
		return Ok((raw.to_string(), index + 1));
	};

	let mut lines = raw.split('\n');
	let mut value = lines.next().unwrap_or_default().to_string();

	for line in lines {
		let trimmed = line.trim_start();
		let line = match trimmed.strip_prefix(delimiter) {
			Some(content) => content.strip_prefix(' ').unwrap_or(content),
			None => line,
		};

		value.push('\n');
		value.push_str(line);
	}

	Ok((value, index + 1))
}
