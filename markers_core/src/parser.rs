use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::ArgKind;
use crate::ArgSpec;
use crate::Definition;
use crate::Lexeme;
use crate::LexemeKind;
use crate::Lexer;
use crate::Literal;
use crate::MarkerError;
use crate::MarkerResult;
use crate::MarkerValue;
use crate::Point;
use crate::Registry;

/// A diagnostic produced during parsing. These don't stop parsing but point
/// at text that looks like a marker and isn't one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[non_exhaustive]
pub enum ParseDiagnostic {
	/// `+name` without any `scope:`.
	MarkerWithoutScope {
		message: String,
		line: usize,
		column: usize,
	},
}

impl ParseDiagnostic {
	pub fn message(&self) -> &str {
		match self {
			Self::MarkerWithoutScope { message, .. } => message,
		}
	}
}

/// A marker matched against a registered definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMarker {
	pub prefix: String,
	pub value: MarkerValue,
	/// Position of the `+` in the parsed text.
	pub position: Point,
}

/// One step of the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
	Marker(ParsedMarker),
	/// A marker whose scope path isn't registered. Not an error.
	NoMatch { path: String, position: Point },
	Warning(ParseDiagnostic),
}

/// Resolves lexemes into typed marker values using a [`Registry`].
///
/// The parser pulls lexemes on demand, so markers with an unregistered path
/// are skipped without materialising anything. After the first error the
/// parser yields nothing more.
pub struct Parser<'r, I: Iterator<Item = Lexeme>> {
	registry: &'r Registry,
	lexemes: I,
	done: bool,
	/// Where the last lexeme pulled from the stream started.
	last_position: Point,
}

impl<'r, I: Iterator<Item = Lexeme>> Parser<'r, I> {
	pub fn new(lexemes: I, registry: &'r Registry) -> Self {
		Self {
			registry,
			lexemes,
			done: false,
			last_position: Point::default(),
		}
	}

	fn next_lexeme(&mut self) -> Option<Lexeme> {
		let lexeme = self.lexemes.next();

		if let Some(lexeme) = &lexeme {
			self.last_position = lexeme.position;
		}

		if lexeme.as_ref().is_none_or(|lexeme| lexeme.kind.is_terminal()) {
			self.done = true;
		}

		lexeme
	}

	fn parse_marker(&mut self, position: Point) -> MarkerResult<Parsed> {
		let mut scopes: Vec<String> = vec![];

		let first_arg = loop {
			let Some(lexeme) = self.next_lexeme() else {
				return Ok(self.no_match(&scopes, position));
			};

			match lexeme.kind {
				LexemeKind::Scope => scopes.push(lexeme.value),
				LexemeKind::Arg => break lexeme,
				LexemeKind::Warning => return Ok(Parsed::Warning(scope_warning(&lexeme))),
				LexemeKind::Error => {
					let path = marker_path(&scopes);

					if self.registry.could_match(&path) {
						return Err(syntax_error(lexeme));
					}

					return Ok(self.no_match(&scopes, position));
				}
				LexemeKind::Eof | LexemeKind::MarkerEnd => {
					return Ok(self.no_match(&scopes, position));
				}
				_ => {}
			}
		};

		let path = marker_path(&scopes);
		let Some(definition) = self.registry.get(&path) else {
			self.skip_marker();
			return Ok(self.no_match(&scopes, position));
		};

		debug!(%path, %position, "matched marker");
		let value = self.parse_arguments(definition, first_arg, position)?;

		Ok(Parsed::Marker(ParsedMarker {
			prefix: path,
			value,
			position,
		}))
	}

	fn parse_arguments(
		&mut self,
		definition: &Definition,
		first_arg: Lexeme,
		position: Point,
	) -> MarkerResult<MarkerValue> {
		let mut value = definition.instantiate();
		let mut seen: Vec<&'static str> = vec![];
		let mut arg = first_arg;

		loop {
			let Some(spec) = definition.arg(&arg.value) else {
				return Err(MarkerError::UnknownArgument {
					name: arg.value,
					marker: definition.prefix().to_string(),
					position: arg.position,
				});
			};

			if seen.contains(&spec.name) {
				return Err(MarkerError::DuplicateArgument {
					name: arg.value,
					marker: definition.prefix().to_string(),
					position: arg.position,
				});
			}

			let literal = self.parse_literal(spec)?;
			value.set_arg(spec.name, literal)?;
			seen.push(spec.name);

			let Some(lexeme) = self.next_lexeme() else {
				break;
			};

			match lexeme.kind {
				LexemeKind::Arg => arg = lexeme,
				LexemeKind::MarkerEnd | LexemeKind::Eof => break,
				LexemeKind::Error => return Err(syntax_error(lexeme)),
				_ => return Err(unexpected(&lexeme)),
			}
		}

		if let Some(missing) = definition
			.args()
			.iter()
			.find(|spec| !spec.optional && !seen.contains(&spec.name))
		{
			return Err(MarkerError::MissingArgument {
				name: missing.name.to_string(),
				marker: definition.prefix().to_string(),
			});
		}

		value.validate(position)?;

		Ok(value)
	}

	fn parse_literal(&mut self, spec: &ArgSpec) -> MarkerResult<Literal> {
		let Some(lexeme) = self.next_lexeme() else {
			return Err(MarkerError::Syntax {
				message: format!(
					"missing value for argument `{}` at position: {}",
					spec.name, self.last_position
				),
				position: self.last_position,
			});
		};

		match lexeme.kind {
			LexemeKind::StringLiteral | LexemeKind::IntegerLiteral | LexemeKind::BoolLiteral => {
				coerce_scalar(spec.name, spec.kind, &lexeme)
			}
			LexemeKind::SliceBegin => {
				let Some(element) = spec.kind.element() else {
					return Err(MarkerError::MismatchedMarkerTypes {
						name: spec.name.to_string(),
						expected: spec.kind.to_string(),
						found: "slice".into(),
						position: lexeme.position,
					});
				};

				let mut items = vec![];

				loop {
					let Some(item) = self.next_lexeme() else {
						return Err(unexpected(&lexeme));
					};

					match item.kind {
						LexemeKind::SliceEnd => break,
						LexemeKind::SliceDelimiter => {}
						LexemeKind::Error => return Err(syntax_error(item)),
						kind if kind.is_literal() && kind != LexemeKind::SliceBegin => {
							items.push(coerce_scalar(spec.name, element, &item)?);
						}
						_ => return Err(unexpected(&item)),
					}
				}

				Ok(Literal::Slice(items))
			}
			LexemeKind::Error => Err(syntax_error(lexeme)),
			_ => Err(unexpected(&lexeme)),
		}
	}

	/// Consume the rest of a marker that isn't ours.
	fn skip_marker(&mut self) {
		while let Some(lexeme) = self.next_lexeme() {
			if matches!(
				lexeme.kind,
				LexemeKind::MarkerEnd | LexemeKind::Eof | LexemeKind::Error
			) {
				break;
			}
		}
	}

	fn no_match(&self, scopes: &[String], position: Point) -> Parsed {
		let path = marker_path(scopes);
		debug!(%path, %position, "skipping unregistered marker");

		Parsed::NoMatch { path, position }
	}
}

impl<I: Iterator<Item = Lexeme>> Iterator for Parser<'_, I> {
	type Item = MarkerResult<Parsed>;

	fn next(&mut self) -> Option<Self::Item> {
		while !self.done {
			let lexeme = self.next_lexeme()?;

			match lexeme.kind {
				LexemeKind::MarkerStart => {
					let parsed = self.parse_marker(lexeme.position);

					if parsed.is_err() {
						self.done = true;
					}

					return Some(parsed);
				}
				LexemeKind::Warning => return Some(Ok(Parsed::Warning(scope_warning(&lexeme)))),
				LexemeKind::Error => return Some(Err(syntax_error(lexeme))),
				_ => {}
			}
		}

		None
	}
}

/// Parse every registered marker in `text`.
pub fn parse(text: &str, registry: &Registry) -> MarkerResult<Vec<ParsedMarker>> {
	parse_with_diagnostics(text, registry).map(|(markers, _)| markers)
}

/// Parse every registered marker in `text` together with the diagnostics for
/// marker-like text that was skipped.
pub fn parse_with_diagnostics(
	text: &str,
	registry: &Registry,
) -> MarkerResult<(Vec<ParsedMarker>, Vec<ParseDiagnostic>)> {
	let mut markers = vec![];
	let mut diagnostics = vec![];

	for parsed in Parser::new(Lexer::new(text), registry) {
		match parsed? {
			Parsed::Marker(marker) => markers.push(marker),
			Parsed::Warning(diagnostic) => {
				warn!("{}", diagnostic.message());
				diagnostics.push(diagnostic);
			}
			Parsed::NoMatch { .. } => {}
		}
	}

	Ok((markers, diagnostics))
}

fn marker_path(scopes: &[String]) -> String {
	format!("+{}", scopes.join(":"))
}

fn scope_warning(lexeme: &Lexeme) -> ParseDiagnostic {
	ParseDiagnostic::MarkerWithoutScope {
		message: lexeme.value.clone(),
		line: lexeme.position.line,
		column: lexeme.position.column,
	}
}

fn syntax_error(lexeme: Lexeme) -> MarkerError {
	MarkerError::Syntax {
		message: lexeme.value,
		position: lexeme.position,
	}
}

fn unexpected(lexeme: &Lexeme) -> MarkerError {
	MarkerError::Syntax {
		message: format!("unexpected {lexeme} at position: {}", lexeme.position),
		position: lexeme.position,
	}
}

/// Turn a scalar lexeme into the literal an argument of `kind` expects.
fn coerce_scalar(name: &str, kind: ArgKind, lexeme: &Lexeme) -> MarkerResult<Literal> {
	if kind == ArgKind::String {
		return Ok(Literal::String(lexeme.value.clone()));
	}

	let literal = match lexeme.kind {
		LexemeKind::IntegerLiteral => {
			let value = lexeme.value.parse::<i64>().map_err(|_| {
				MarkerError::Syntax {
					message: format!(
						"integer literal {:?} out of range at position: {}",
						lexeme.value, lexeme.position
					),
					position: lexeme.position,
				}
			})?;
			Literal::Int(value)
		}
		LexemeKind::BoolLiteral => Literal::Bool(lexeme.value == "true"),
		_ => Literal::String(lexeme.value.clone()),
	};

	match (kind, &literal) {
		(ArgKind::Any, _) | (ArgKind::Int, Literal::Int(_)) | (ArgKind::Bool, Literal::Bool(_)) => {
			Ok(literal)
		}
		_ => {
			Err(MarkerError::MismatchedMarkerTypes {
				name: name.to_string(),
				expected: kind.to_string(),
				found: literal.kind().to_string(),
				position: lexeme.position,
			})
		}
	}
}
