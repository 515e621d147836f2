use regex::NoExpand;
use tracing::debug;

use crate::Document;
use crate::InspectionResult;
use crate::MarkerError;
use crate::MarkerResult;
use crate::MarkerValue;
use crate::Placeholders;
use crate::Transform;
use crate::markers::compile_replace;

/// Replaces annotated values with references to the generated api spec.
///
/// ```yaml
/// # +operator-builder:field:name=webStoreReplicas,type=int,description="Replica count"
/// replicas: 2
/// ```
///
/// becomes
///
/// ```yaml
/// # Replica count, controlled by webStoreReplicas
/// replicas: !!var parent.Spec.WebStoreReplicas
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTransform {
	placeholders: Placeholders,
}

impl PlaceholderTransform {
	pub fn new(placeholders: Placeholders) -> Self {
		Self { placeholders }
	}
}

impl Transform for PlaceholderTransform {
	fn transform(
		&self,
		document: &mut Document,
		results: &mut [InspectionResult],
	) -> MarkerResult<()> {
		for result in results.iter_mut() {
			let key = result.key();
			let value = result.value();

			match result.marker.as_field() {
				Some(field) if !document[value].is_scalar() => {
					return Err(MarkerError::NonScalarField {
						name: field.name.clone(),
						line: document[value].line,
					});
				}
				_ => {}
			}

			document[key].head_comment.clear();
			document[key].foot_comment.clear();
			document[value].line_comment.clear();

			if key != value {
				document[key].line_comment.clear();
			}

			let spec_prefix = match &result.marker {
				MarkerValue::Field(_) => &self.placeholders.parent,
				MarkerValue::CollectionField(_) => &self.placeholders.collection,
				MarkerValue::Resource(_) => continue,
			};

			let Some(field) = result.marker.as_field_mut() else {
				continue;
			};

			if let Some(description) = field.description.as_mut() {
				*description = description.trim_start_matches('\n').to_string();
				document[key].head_comment = description_comment(description, &field.name);
			}

			let original = document[value].value.clone();
			field.original_value = Some(original.clone());
			let variable = field.source_code_variable(spec_prefix);
			let node = &mut document[value];

			if let Some(pattern) = &field.replace {
				let replacement = field.source_code_field_variable(spec_prefix);
				let replaced = compile_replace(pattern)?
					.replace_all(&original, NoExpand(&replacement))
					.into_owned();
				node.set_tag("!!str");
				node.set_value(replaced);
			} else {
				node.set_tag("!!var");
				node.set_value(variable);
			}

			debug!(field = %field.name, line = node.line, "replaced marked value");
		}

		Ok(())
	}
}

/// `# <description>, controlled by <name>`, one `#` per line.
fn description_comment(description: &str, name: &str) -> String {
	format!("{description}, controlled by {name}")
		.split('\n')
		.map(|line| format!("# {line}"))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Collection manifests that are themselves resources of the collection refer
/// to it as their parent.
pub fn collection_to_parent(text: &str) -> String {
	text.replace("!!var collection", "!!var parent")
}
