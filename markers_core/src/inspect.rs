use derive_more::Deref;
use derive_more::DerefMut;
use serde::Serialize;
use tracing::debug;
use tracing::trace;

use crate::Document;
use crate::MarkerError;
use crate::MarkerResult;
use crate::MarkerValue;
use crate::Node;
use crate::NodeId;
use crate::NodeKind;
use crate::ParseDiagnostic;
use crate::Point;
use crate::Registry;
use crate::parse_with_diagnostics;

/// A marker found in the comments of a document node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResult {
	pub prefix: String,
	pub marker: MarkerValue,
	/// `[key, value]` for a mapping pair, otherwise the single annotated node.
	pub nodes: Vec<NodeId>,
	/// The comment text the marker was parsed from.
	pub raw: String,
	/// Position of the marker within `raw`.
	pub position: Point,
	/// Document line of the annotated node.
	pub line: usize,
}

impl InspectionResult {
	/// The key of the pair, or the annotated node itself.
	pub fn key(&self) -> NodeId {
		self.nodes[0]
	}

	/// The value of the pair, or the annotated node itself.
	pub fn value(&self) -> NodeId {
		self.nodes[self.nodes.len() - 1]
	}
}

/// The results of inspecting a document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deref, DerefMut)]
pub struct Inspection {
	#[deref]
	#[deref_mut]
	pub results: Vec<InspectionResult>,
	/// Marker-like text that was skipped, such as scope-less markers.
	pub warnings: Vec<ParseDiagnostic>,
}

/// A batched rewrite of a document, run once after all markers are found.
pub trait Transform {
	fn transform(
		&self,
		document: &mut Document,
		results: &mut [InspectionResult],
	) -> MarkerResult<()>;
}

impl<F> Transform for F
where
	F: Fn(&mut Document, &mut [InspectionResult]) -> MarkerResult<()>,
{
	fn transform(
		&self,
		document: &mut Document,
		results: &mut [InspectionResult],
	) -> MarkerResult<()> {
		self(document, results)
	}
}

/// Walks a [`Document`] and parses the markers in its comments.
///
/// The inspector only reads the registry, so one registry can back any
/// number of inspections.
#[derive(Debug, Clone, Copy)]
pub struct Inspector<'r> {
	registry: &'r Registry,
}

impl<'r> Inspector<'r> {
	pub fn new(registry: &'r Registry) -> Self {
		Self { registry }
	}

	/// Find every registered marker in the comments of `document`.
	///
	/// The first malformed marker aborts the inspection.
	pub fn inspect(&self, document: &Document) -> MarkerResult<Inspection> {
		let mut inspection = Inspection::default();

		for root in document.roots() {
			self.inspect_nodes(document, &[root], &mut inspection)?;
		}

		debug!(
			results = inspection.results.len(),
			warnings = inspection.warnings.len(),
			"inspected document"
		);

		Ok(inspection)
	}

	/// Inspect `document`, then hand all results to `transform`.
	pub fn inspect_with(
		&self,
		document: &mut Document,
		transform: &dyn Transform,
	) -> MarkerResult<Inspection> {
		let mut inspection = self.inspect(document)?;
		transform.transform(document, &mut inspection.results)?;

		Ok(inspection)
	}

	/// Parse `text` and inspect it, applying each transform in order.
	pub fn inspect_yaml(
		&self,
		text: &str,
		transforms: &[&dyn Transform],
	) -> MarkerResult<(Document, Inspection)> {
		let mut document = Document::parse(text)?;
		let mut inspection = self.inspect(&document)?;

		for transform in transforms {
			transform.transform(&mut document, &mut inspection.results)?;
		}

		Ok((document, inspection))
	}

	fn inspect_nodes(
		&self,
		document: &Document,
		nodes: &[NodeId],
		inspection: &mut Inspection,
	) -> MarkerResult<()> {
		for &id in nodes {
			self.inspect_comments(document, &[id], inspection)?;
			let node = &document[id];

			if node.kind == NodeKind::Mapping {
				self.inspect_mapping(document, &node.content, inspection)?;
			} else {
				self.inspect_nodes(document, &node.content, inspection)?;
			}
		}

		Ok(())
	}

	/// Mapping content is visited pairwise since comments on a key describe
	/// the whole pair.
	fn inspect_mapping(
		&self,
		document: &Document,
		content: &[NodeId],
		inspection: &mut Inspection,
	) -> MarkerResult<()> {
		for pair in content.chunks_exact(2) {
			self.inspect_comments(document, pair, inspection)?;
			let value = &document[pair[1]];

			if value.kind == NodeKind::Mapping {
				self.inspect_mapping(document, &value.content, inspection)?;
			} else {
				self.inspect_nodes(document, &value.content, inspection)?;
			}
		}

		Ok(())
	}

	fn inspect_comments(
		&self,
		document: &Document,
		nodes: &[NodeId],
		inspection: &mut Inspection,
	) -> MarkerResult<()> {
		let value = &document[nodes[nodes.len() - 1]];

		for &id in nodes {
			let node = &document[id];
			let text = node.comment_text();

			if !self.has_marker_text(&text) {
				continue;
			}

			trace!(line = node.line, "inspecting marker candidate");
			let (markers, warnings) =
				parse_with_diagnostics(&text, self.registry).map_err(|error| {
					let point = error
						.position()
						.map_or(Point::new(node.line, node.column, 0), |position| {
							document_point(node, position)
						});

					MarkerError::InvalidMarker {
						line: point.line,
						column: point.column,
						source: Box::new(error),
					}
				})?;

			inspection
				.warnings
				.extend(warnings.into_iter().map(|warning| {
					match warning {
						ParseDiagnostic::MarkerWithoutScope {
							message,
							line,
							column,
						} => {
							let point = document_point(node, Point::new(line, column, 0));

							ParseDiagnostic::MarkerWithoutScope {
								message,
								line: point.line,
								column: point.column,
							}
						}
					}
				}));

			for mut marker in markers {
				if let (Some(field), true) = (marker.value.as_field_mut(), value.is_scalar()) {
					field.original_value = Some(value.value.clone());
				}

				inspection.results.push(InspectionResult {
					prefix: marker.prefix,
					marker: marker.value,
					nodes: nodes.to_vec(),
					raw: text.clone(),
					position: marker.position,
					line: node.line,
				});
			}
		}

		Ok(())
	}

	/// The cheap pre-filter: only comments containing a registered prefix are
	/// lexed at all.
	fn has_marker_text(&self, text: &str) -> bool {
		self.registry
			.marker_strings()
			.iter()
			.any(|prefix| text.contains(prefix))
	}
}

/// Map a position in [`Node::comment_text`] to the document.
fn document_point(node: &Node, position: Point) -> Point {
	match node.comment_position(position.line) {
		Some(start) => Point::new(start.line, start.column + position.column - 1, 0),
		None => Point::new(node.line, node.column, 0),
	}
}
