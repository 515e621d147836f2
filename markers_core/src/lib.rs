//! `markers_core` recognises `+scope:scope:arg=value` markers embedded in
//! YAML comments and turns them into typed values tied to the nodes they
//! annotate.
//!
//! ## Processing Pipeline
//!
//! ```text
//! YAML manifest
//!   -> Document (comment-preserving node arena)
//!   -> Inspector (collects node comments, pre-filters on registered prefixes)
//!   -> Lexer (lazy lexeme stream per candidate comment)
//!   -> Parser (resolves scope paths against the Registry, typed arguments)
//!   -> Transform (rewrites annotated values, e.g. PlaceholderTransform)
//! ```
//!
//! ## Key Types
//!
//! - [`Lexer`] and [`Lexeme`]: the marker tokenizer.
//! - [`Registry`] and [`Definition`]: the recognised prefixes and their
//!   argument schemas.
//! - [`MarkerValue`]: a parsed [`FieldMarker`], [`CollectionFieldMarker`] or
//!   [`ResourceMarker`].
//! - [`Document`] and [`NodeId`]: the YAML tree the inspector walks.
//! - [`Inspector`] and [`InspectionResult`]: markers found in a document.
//! - [`MarkersConfig`]: configuration loaded from `markers.toml`.
//!
//! ## Quick Start
//!
//! ```rust
//! use markers_core::Inspector;
//! use markers_core::PlaceholderTransform;
//! use markers_core::operator_builder_registry;
//!
//! let registry = operator_builder_registry().unwrap();
//! let inspector = Inspector::new(&registry);
//! let transform = PlaceholderTransform::default();
//! let yaml = "spec:\n  # +operator-builder:field:name=replicas,type=int\n  replicas: 2\n";
//!
//! let (document, inspection) = inspector.inspect_yaml(yaml, &[&transform]).unwrap();
//! assert_eq!(inspection.len(), 1);
//! assert_eq!(
//! 	document.to_yaml(),
//! 	"spec:\n  replicas: !!var parent.Spec.Replicas\n"
//! );
//! ```

pub use config::*;
pub use document::*;
pub use error::*;
pub use inspect::*;
pub use lexeme::*;
pub use lexer::*;
pub use literal::*;
pub use markers::*;
pub use parser::*;
pub use position::*;
pub use registry::*;
pub use transform::*;

pub mod config;
mod document;
#[allow(unused_assignments)]
mod error;
mod inspect;
mod lexeme;
mod lexer;
mod literal;
mod markers;
mod parser;
mod position;
mod registry;
mod transform;

#[cfg(test)]
mod __fixtures;
