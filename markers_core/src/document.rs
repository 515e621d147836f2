use std::ops::Index;
use std::ops::IndexMut;

use serde::Deserialize;
use serde::Serialize;
use tracing::trace;

use crate::MarkerError;
use crate::MarkerResult;
use crate::Point;

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
	Mapping,
	Sequence,
	Scalar,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalarStyle {
	#[default]
	Plain,
	SingleQuoted,
	DoubleQuoted,
	/// `|` block scalar.
	Literal,
	/// `>` block scalar.
	Folded,
	/// A flow collection, kept as opaque text.
	Flow,
}

/// A node of a YAML document together with the comments attached to it.
///
/// Mapping content alternates keys and values: `[key, value, key, value]`.
/// Comments are kept as their raw `#` lines joined with `\n`.
#[derive(Debug, Clone)]
pub struct Node {
	pub kind: NodeKind,
	pub style: ScalarStyle,
	pub tag: Option<String>,
	/// `&name` written before the node.
	pub anchor: Option<String>,
	/// The decoded scalar value. Empty for collections.
	pub value: String,
	pub content: Vec<NodeId>,
	pub head_comment: String,
	pub line_comment: String,
	pub foot_comment: String,
	pub line: usize,
	pub column: usize,
	/// Source text of a scalar that hasn't been changed since parsing.
	raw: Option<String>,
	/// Where each parsed comment line starts in the document.
	head_positions: Vec<Point>,
	line_position: Option<Point>,
	foot_positions: Vec<Point>,
}

impl Node {
	fn new(kind: NodeKind, line: usize, column: usize) -> Self {
		Self {
			kind,
			style: ScalarStyle::Plain,
			tag: None,
			anchor: None,
			value: String::new(),
			content: vec![],
			head_comment: String::new(),
			line_comment: String::new(),
			foot_comment: String::new(),
			line,
			column,
			raw: None,
			head_positions: vec![],
			line_position: None,
			foot_positions: vec![],
		}
	}

	pub fn is_scalar(&self) -> bool {
		self.kind == NodeKind::Scalar
	}

	/// The head, line and foot comments joined with newlines.
	pub fn comment_text(&self) -> String {
		format!(
			"{}\n{}\n{}",
			self.head_comment, self.line_comment, self.foot_comment
		)
	}

	/// Replace the scalar value. The node is re-quoted when serialised.
	pub fn set_value(&mut self, value: impl Into<String>) {
		self.value = value.into();
		self.style = ScalarStyle::Plain;
		self.raw = None;
	}

	pub fn set_tag(&mut self, tag: impl Into<String>) {
		self.tag = Some(tag.into());
	}

	/// Where line `number` (1-indexed) of [`Node::comment_text`] starts in the
	/// document. `None` for comments that weren't parsed from the source.
	pub fn comment_position(&self, number: usize) -> Option<Point> {
		let index = number.checked_sub(1)?;
		let head = self.head_comment.split('\n').count();

		if index < head {
			return self
				.head_positions
				.get(index)
				.copied()
				.filter(|_| self.head_positions.len() == head);
		}

		if index == head {
			return self.line_position.filter(|_| !self.line_comment.is_empty());
		}

		self.foot_positions.get(index - head - 1).copied()
	}

	fn indent(&self) -> usize {
		self.column.saturating_sub(1)
	}

	/// The anchor and, when `tags` is set, the tag.
	fn properties(&self, tags: bool) -> String {
		let tag = self.tag.as_deref().filter(|_| tags);

		[self.anchor.as_deref(), tag]
			.into_iter()
			.flatten()
			.collect::<Vec<_>>()
			.join(" ")
	}

	/// The scalar as it is written back, tag included when `tags` is set.
	fn scalar_text(&self, tags: bool) -> String {
		let value = match &self.raw {
			Some(raw) => raw.clone(),
			None => quote(&self.value),
		};
		let properties = self.properties(tags);

		match (properties.is_empty(), value.is_empty()) {
			(true, _) => value,
			(false, true) => properties,
			(false, false) => format!("{properties} {value}"),
		}
	}
}

#[derive(Debug, Clone, Default)]
struct Root {
	node: Option<NodeId>,
	explicit_start: bool,
	/// Comments that belong to no node, e.g. at the end of the document.
	comment: String,
}

/// A comment-preserving tree of one or more `---` separated YAML documents.
///
/// Covers the block YAML used by Kubernetes style manifests: block mappings
/// and sequences (including compact `- key: value` items), plain and quoted
/// scalars, block scalars and flow collections, which are kept as opaque
/// scalars.
#[derive(Debug, Clone, Default)]
pub struct Document {
	nodes: Vec<Node>,
	documents: Vec<Root>,
}

impl Document {
	pub fn parse(text: &str) -> MarkerResult<Self> {
		for document in serde_yaml_ng::Deserializer::from_str(text) {
			serde_yaml_ng::Value::deserialize(document).map_err(|error| {
				MarkerError::Yaml {
					line: error.location().map_or(0, |location| location.line()),
					reason: error.to_string(),
				}
			})?;
		}

		let mut chunks: Vec<(bool, Vec<Line<'_>>)> = vec![(false, vec![])];

		for (index, raw) in text.split('\n').enumerate() {
			let line = Line::new(index + 1, raw);

			match line.kind {
				LineKind::DocumentStart => {
					let rest = line.text[3..].trim();
					let mut lines = vec![];

					if rest.starts_with('#') {
						lines.push(Line {
							kind: LineKind::Comment,
							text: rest,
							..line
						});
					} else if !rest.is_empty() {
						return Err(MarkerError::Yaml {
							line: line.number,
							reason: "content after `---` is not supported".into(),
						});
					}

					chunks.push((true, lines));
				}
				LineKind::DocumentEnd => {}
				_ => {
					if let Some((_, lines)) = chunks.last_mut() {
						lines.push(line);
					}
				}
			}
		}

		// leading blank lines before the first `---`
		if chunks.len() > 1
			&& chunks[0]
				.1
				.iter()
				.all(|line| line.kind == LineKind::Blank)
		{
			chunks.remove(0);
		}

		let mut builder = Builder::default();
		let mut documents = vec![];

		for (explicit_start, lines) in chunks {
			let mut root = builder.build(lines)?;
			root.explicit_start = explicit_start;
			documents.push(root);
		}

		trace!(
			documents = documents.len(),
			nodes = builder.nodes.len(),
			"parsed yaml"
		);

		Ok(Self {
			nodes: builder.nodes,
			documents,
		})
	}

	/// The number of documents, including ones without content.
	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}

	/// The root node of the document at `index`.
	pub fn root(&self, index: usize) -> Option<NodeId> {
		self.documents.get(index).and_then(|root| root.node)
	}

	/// The root nodes of all documents that have content.
	pub fn roots(&self) -> Vec<NodeId> {
		self.documents.iter().filter_map(|root| root.node).collect()
	}

	pub fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
		&mut self.nodes[id.0]
	}

	/// Follow mapping keys from `node`, returning the value node at the end of
	/// the path.
	pub fn get_path(&self, node: NodeId, path: &[&str]) -> Option<NodeId> {
		path.iter().try_fold(node, |current, key| {
			self[current]
				.content
				.chunks(2)
				.find(|pair| self[pair[0]].value == *key)
				.and_then(|pair| pair.get(1).copied())
		})
	}

	/// Serialise every document back to YAML.
	pub fn to_yaml(&self) -> String {
		let mut emitter = Emitter::new(self, true);

		for (index, root) in self.documents.iter().enumerate() {
			if index > 0 || root.explicit_start {
				emitter.out.push_str("---\n");
			}

			emitter.root(root);
		}

		emitter.out
	}

	/// Decode the document at `index` into a plain YAML value. Tags are
	/// dropped.
	pub fn to_value(&self, index: usize) -> MarkerResult<serde_yaml_ng::Value> {
		let Some(root) = self.documents.get(index) else {
			return Ok(serde_yaml_ng::Value::Null);
		};

		let mut emitter = Emitter::new(self, false);
		emitter.root(root);

		serde_yaml_ng::from_str(&emitter.out).map_err(|error| {
			MarkerError::Yaml {
				line: error.location().map_or(0, |location| location.line()),
				reason: error.to_string(),
			}
		})
	}
}

impl Index<NodeId> for Document {
	type Output = Node;

	fn index(&self, id: NodeId) -> &Self::Output {
		self.node(id)
	}
}

impl IndexMut<NodeId> for Document {
	fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
		self.node_mut(id)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
	Blank,
	Comment,
	DocumentStart,
	DocumentEnd,
	Content,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
	number: usize,
	indent: usize,
	/// The line without indentation and trailing whitespace.
	text: &'a str,
	raw: &'a str,
	kind: LineKind,
}

impl<'a> Line<'a> {
	fn new(number: usize, raw: &'a str) -> Self {
		let raw = raw.strip_suffix('\r').unwrap_or(raw);
		let text = raw.trim_start_matches(' ');
		let indent = raw.len() - text.len();
		let text = text.trim_end();

		let kind = if text.is_empty() {
			LineKind::Blank
		} else if text.starts_with('#') {
			LineKind::Comment
		} else if indent == 0 && (text == "---" || text.starts_with("--- ")) {
			LineKind::DocumentStart
		} else if indent == 0 && text == "..." {
			LineKind::DocumentEnd
		} else {
			LineKind::Content
		};

		Self {
			number,
			indent,
			text,
			raw,
			kind,
		}
	}
}

#[derive(Default)]
struct Builder<'a> {
	nodes: Vec<Node>,
	lines: Vec<Line<'a>>,
	cursor: usize,
	/// Comment lines waiting for the node they belong to.
	pending: Vec<PendingComment<'a>>,
}

#[derive(Debug, Clone, Copy)]
struct PendingComment<'a> {
	indent: usize,
	line: usize,
	text: &'a str,
}

/// The parts of an inline value: `&anchor !tag text # comment`.
#[derive(Debug, Clone, Copy, Default)]
struct InlineValue<'a> {
	anchor: Option<&'a str>,
	tag: Option<&'a str>,
	text: &'a str,
	comment: &'a str,
}

impl<'a> Builder<'a> {
	fn build(&mut self, lines: Vec<Line<'a>>) -> MarkerResult<Root> {
		self.lines = lines;
		self.cursor = 0;
		self.pending.clear();

		let node = match self.next_content() {
			Some(index) => {
				let indent = self.lines[index].indent;
				let node = self.parse_node(indent)?;

				if let Some(index) = self.next_content() {
					return Err(yaml_error(self.lines[index].number, "unexpected content"));
				}

				Some(node)
			}
			None => None,
		};

		Ok(Root {
			node,
			explicit_start: false,
			comment: self.take_pending().0,
		})
	}

	fn push(&mut self, node: Node) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(node);
		id
	}

	/// Skip blank lines and collect comments. Returns the index of the next
	/// content line without consuming it.
	fn next_content(&mut self) -> Option<usize> {
		while let Some(line) = self.lines.get(self.cursor) {
			match line.kind {
				LineKind::Comment => {
					self.pending.push(PendingComment {
						indent: line.indent,
						line: line.number,
						text: line.text,
					});
				}
				LineKind::Content => return Some(self.cursor),
				_ => {}
			}

			self.cursor += 1;
		}

		None
	}

	fn take_pending(&mut self) -> (String, Vec<Point>) {
		let comment = join_comments(&self.pending);
		let positions = comment_positions(&self.pending);
		self.pending.clear();

		(comment, positions)
	}

	fn set_properties(&mut self, id: NodeId, value: &InlineValue<'_>) {
		let node = &mut self.nodes[id.0];

		if let Some(anchor) = value.anchor {
			node.anchor = Some(anchor.to_string());
		}

		if let Some(tag) = value.tag {
			node.tag = Some(tag.to_string());
		}
	}

	/// Pending comments indented at least `indent` become the foot comment of
	/// `node`, unless they line up with the content that follows.
	fn attach_foot(&mut self, node: NodeId, indent: usize) {
		let next_indent = self
			.lines
			.get(self.cursor)
			.filter(|line| line.kind == LineKind::Content)
			.map(|line| line.indent);
		let split = self
			.pending
			.iter()
			.position(|comment| {
				comment.indent < indent || next_indent.is_some_and(|next| comment.indent <= next)
			})
			.unwrap_or(self.pending.len());

		if split == 0 {
			return;
		}

		let foot: Vec<_> = self.pending.drain(..split).collect();
		let node = &mut self.nodes[node.0];

		if !node.foot_comment.is_empty() {
			node.foot_comment.push('\n');
		}

		node.foot_comment.push_str(&join_comments(&foot));
		node.foot_positions.extend(comment_positions(&foot));
	}

	/// Parse the node starting on the current content line.
	fn parse_node(&mut self, indent: usize) -> MarkerResult<NodeId> {
		let text = self.lines[self.cursor].text;

		if is_sequence_item(text) {
			self.parse_sequence(indent)
		} else if split_key(text).is_some() {
			self.parse_mapping(indent)
		} else {
			self.parse_scalar_line(indent)
		}
	}

	fn parse_mapping(&mut self, indent: usize) -> MarkerResult<NodeId> {
		let first = self.lines[self.cursor];
		let mapping = self.push(Node::new(NodeKind::Mapping, first.number, indent + 1));
		let mut last_key = None;

		while let Some(index) = self.next_content() {
			let line = self.lines[index];

			if line.indent < indent {
				break;
			}

			if line.indent > indent {
				return Err(yaml_error(line.number, "unexpected indentation"));
			}

			let Some((key_text, rest)) = split_key(line.text) else {
				if is_sequence_item(line.text) {
					break;
				}

				return Err(yaml_error(line.number, "expected a mapping key"));
			};

			self.cursor = index + 1;
			let mut key = Node::new(NodeKind::Scalar, line.number, indent + 1);
			key.value = decode_scalar(key_text, line.number)?;
			key.style = scalar_style(key_text);
			key.raw = Some(key_text.to_string());
			(key.head_comment, key.head_positions) = self.take_pending();
			let key_id = self.push(key);

			let value = split_value(rest);
			let value_id = if value.text.is_empty() {
				let key = &mut self.nodes[key_id.0];
				key.line_comment = value.comment.to_string();
				key.line_position = comment_point(&line, value.comment);

				let id =
					self.parse_nested(indent, true, line.number, line.indent + key_text.len() + 2)?;
				self.set_properties(id, &value);
				id
			} else {
				let column = line.indent + line.text.len() - rest.trim_start().len() + 1;
				self.parse_value(&value, indent, line.number, column)?
			};

			self.nodes[mapping.0].content.extend([key_id, value_id]);
			last_key = Some(key_id);
		}

		if let Some(key) = last_key {
			self.attach_foot(key, indent);
		}

		Ok(mapping)
	}

	fn parse_sequence(&mut self, indent: usize) -> MarkerResult<NodeId> {
		let first = self.lines[self.cursor];
		let sequence = self.push(Node::new(NodeKind::Sequence, first.number, indent + 1));
		let mut last_item = None;

		while let Some(index) = self.next_content() {
			let line = self.lines[index];

			if line.indent < indent || (line.indent == indent && !is_sequence_item(line.text)) {
				break;
			}

			if line.indent > indent {
				return Err(yaml_error(line.number, "unexpected indentation"));
			}

			let rest = &line.text[1..];
			let content = rest.trim_start();
			let content_indent = indent + 1 + rest.len() - content.len();
			let value = split_value(content);

			let item = if value.text.is_empty() {
				let (head, head_positions) = self.take_pending();
				self.cursor = index + 1;
				let item = self.parse_nested(indent, false, line.number, content_indent + 1)?;
				self.set_properties(item, &value);
				let node = &mut self.nodes[item.0];
				node.head_comment = head;
				node.head_positions = head_positions;
				node.line_comment = value.comment.to_string();
				node.line_position = comment_point(&line, value.comment);
				item
			} else {
				// reinterpret the rest of a compact item as its own line
				self.lines[index].indent = content_indent;
				self.lines[index].text = content;
				self.parse_node(content_indent)?
			};

			self.nodes[sequence.0].content.push(item);
			last_item = Some(item);
		}

		if let Some(item) = last_item {
			self.attach_foot(item, indent);
		}

		Ok(sequence)
	}

	/// Parse the block value of a key or item that has nothing after its `:` or
	/// `-`. Missing values are null scalars.
	fn parse_nested(
		&mut self,
		indent: usize,
		allow_sequence: bool,
		number: usize,
		column: usize,
	) -> MarkerResult<NodeId> {
		if let Some(index) = self.next_content() {
			let line = self.lines[index];

			if line.indent > indent
				|| (allow_sequence && line.indent == indent && is_sequence_item(line.text))
			{
				return self.parse_node(line.indent);
			}
		}

		let mut node = Node::new(NodeKind::Scalar, number, column);
		node.raw = Some(String::new());

		Ok(self.push(node))
	}

	/// A scalar that takes a whole line, e.g. a sequence item.
	fn parse_scalar_line(&mut self, indent: usize) -> MarkerResult<NodeId> {
		let line = self.lines[self.cursor];
		self.cursor += 1;
		let (head, head_positions) = self.take_pending();
		let value = split_value(line.text);
		let id = self.parse_value(
			&value,
			indent.saturating_sub(1),
			line.number,
			line.indent + 1,
		)?;
		let node = &mut self.nodes[id.0];
		node.head_comment = head;
		node.head_positions = head_positions;

		Ok(id)
	}

	/// Parse an inline scalar. The cursor is already past its first line;
	/// continuation lines must be indented deeper than `parent_indent`.
	fn parse_value(
		&mut self,
		value: &InlineValue<'a>,
		parent_indent: usize,
		number: usize,
		column: usize,
	) -> MarkerResult<NodeId> {
		let mut node = Node::new(NodeKind::Scalar, number, column);
		let first_line = self.lines[self.cursor - 1];
		let text = value.text;
		node.line_comment = value.comment.to_string();
		node.line_position = comment_point(&first_line, value.comment);
		node.anchor = value.anchor.map(ToString::to_string);
		node.tag = value.tag.map(ToString::to_string);
		node.style = scalar_style(text);

		match node.style {
			ScalarStyle::Literal | ScalarStyle::Folded => {
				let (value, raw) = self.block_scalar(text, parent_indent);
				node.value = value;
				node.raw = Some(raw);
			}
			ScalarStyle::Flow => {
				let raw = self.flow_scalar(text, number)?;
				node.value.clone_from(&raw);
				node.raw = Some(raw);
			}
			ScalarStyle::Plain => {
				let (value, raw) = self.plain_scalar(text, parent_indent);
				node.value = value;
				node.raw = Some(raw);
			}
			ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted => {
				let (raw, comment) = self.quoted_scalar(text, number)?;

				if let Some(comment) = comment {
					let last_line = self.lines[self.cursor - 1];
					node.line_position = comment_point(&last_line, comment);
					node.line_comment = comment.to_string();
				}

				node.value = decode_scalar(&raw, number)?;
				node.raw = Some(raw);
			}
		}

		Ok(self.push(node))
	}

	/// A quoted scalar, continued over the following lines until the closing
	/// quote. Returns the raw text and, when the scalar spans lines, the
	/// comment after the closing quote.
	fn quoted_scalar(
		&mut self,
		text: &str,
		number: usize,
	) -> MarkerResult<(String, Option<&'a str>)> {
		if quoted_end(text).is_some() {
			return Ok((text.to_string(), None));
		}

		let mut raw = text.to_string();

		while let Some(&line) = self.lines.get(self.cursor) {
			self.cursor += 1;
			let start = raw.len() + 1;
			raw.push('\n');
			raw.push_str(line.raw);

			let Some(end) = quoted_end(&raw) else {
				continue;
			};

			let trailing = line.raw[end - start..].trim();
			raw.truncate(end);
			let comment = if trailing.starts_with('#') {
				Some(trailing)
			} else if trailing.is_empty() {
				None
			} else {
				return Err(yaml_error(line.number, "unexpected text after quoted scalar"));
			};

			return Ok((raw, comment));
		}

		Err(yaml_error(number, "unterminated quoted scalar"))
	}

	fn plain_scalar(&mut self, text: &str, parent_indent: usize) -> (String, String) {
		let mut value = text.to_string();
		let mut raw = text.to_string();

		while let Some(line) = self.lines.get(self.cursor) {
			if line.kind != LineKind::Content || line.indent <= parent_indent {
				break;
			}

			value.push(' ');
			value.push_str(line.text);
			raw.push('\n');
			raw.push_str(line.raw);
			self.cursor += 1;
		}

		(value, raw)
	}

	fn flow_scalar(&mut self, text: &str, number: usize) -> MarkerResult<String> {
		let mut raw = text.to_string();
		let mut depth = flow_depth(text);

		while depth > 0 {
			let Some(line) = self.lines.get(self.cursor) else {
				return Err(yaml_error(number, "unterminated flow collection"));
			};

			raw.push('\n');
			raw.push_str(line.raw);
			depth += flow_depth(line.text);
			self.cursor += 1;
		}

		Ok(raw)
	}

	fn block_scalar(&mut self, header: &str, parent_indent: usize) -> (String, String) {
		let mut lines: Vec<Line<'a>> = vec![];

		while let Some(line) = self.lines.get(self.cursor) {
			if line.kind != LineKind::Blank && line.indent <= parent_indent {
				break;
			}

			lines.push(*line);
			self.cursor += 1;
		}

		// trailing blank lines are left for the next node
		while lines.last().is_some_and(|line| line.kind == LineKind::Blank) {
			lines.pop();
			self.cursor -= 1;
		}

		let block_indent = lines
			.iter()
			.find(|line| line.kind != LineKind::Blank)
			.map_or(0, |line| line.indent);
		let content: Vec<&str> = lines
			.iter()
			.map(|line| line.raw.get(block_indent..).unwrap_or_default())
			.collect();

		let mut value = if header.starts_with('|') {
			content.join("\n")
		} else {
			fold_lines(&content)
		};

		if !header.contains('-') && !content.is_empty() {
			value.push('\n');
		}

		let mut raw = header.to_string();

		for line in &lines {
			raw.push('\n');
			raw.push_str(line.raw);
		}

		(value, raw)
	}
}

/// Writes a [`Document`] back to text.
struct Emitter<'d> {
	document: &'d Document,
	tags: bool,
	out: String,
}

impl<'d> Emitter<'d> {
	fn new(document: &'d Document, tags: bool) -> Self {
		Self {
			document,
			tags,
			out: String::new(),
		}
	}

	fn root(&mut self, root: &Root) {
		let document = self.document;

		if let Some(node) = root.node {
			let indent = document[node].indent();

			match document[node].kind {
				NodeKind::Scalar => self.item_scalar(node, indent, ""),
				_ => self.collection(node),
			}
		}

		self.comment(&root.comment, 0);
	}

	fn comment(&mut self, text: &str, indent: usize) {
		if text.is_empty() {
			return;
		}

		for line in text.split('\n') {
			self.indent(indent);
			self.out.push_str(line);
			self.out.push('\n');
		}
	}

	fn indent(&mut self, indent: usize) {
		self.out.extend(std::iter::repeat_n(' ', indent));
	}

	fn line_comments(&mut self, comments: &[&str]) {
		for comment in comments.iter().filter(|comment| !comment.is_empty()) {
			self.out.push(' ');
			self.out.push_str(comment);
		}
	}

	fn collection(&mut self, id: NodeId) {
		let document = self.document;

		match document[id].kind {
			NodeKind::Mapping => self.mapping(id, false),
			NodeKind::Sequence => self.sequence(id),
			NodeKind::Scalar => {}
		}
	}

	/// With `inline_first` the first key continues a `- ` already written.
	fn mapping(&mut self, id: NodeId, inline_first: bool) {
		let document = self.document;
		let node = &document[id];
		let indent = node.indent();

		for (position, pair) in node.content.chunks(2).enumerate() {
			let [key, value] = pair else {
				continue;
			};
			let key = &document[*key];

			if !(inline_first && position == 0) {
				self.comment(&key.head_comment, indent);
				self.indent(indent);
			}

			self.out.push_str(&key.scalar_text(false));
			self.out.push(':');
			self.value(key, *value);
			self.comment(&key.foot_comment, indent);
		}
	}

	fn value(&mut self, key: &Node, id: NodeId) {
		let document = self.document;
		let node = &document[id];

		if node.is_scalar() {
			let text = node.scalar_text(self.tags);

			if !text.is_empty() {
				self.out.push(' ');
				self.out.push_str(&text);
			}

			self.line_comments(&[&key.line_comment, &node.line_comment]);
			self.out.push('\n');
			return;
		}

		self.properties(node);
		self.line_comments(&[&key.line_comment, &node.line_comment]);
		self.out.push('\n');
		self.comment(&node.head_comment, node.indent());
		self.collection(id);
	}

	fn properties(&mut self, node: &Node) {
		let properties = node.properties(self.tags);

		if !properties.is_empty() {
			self.out.push(' ');
			self.out.push_str(&properties);
		}
	}

	fn sequence(&mut self, id: NodeId) {
		let document = self.document;
		let node = &document[id];
		let indent = node.indent();

		for item_id in &node.content {
			let item = &document[*item_id];
			self.comment(&item.head_comment, indent);

			match item.kind {
				NodeKind::Scalar => self.item_scalar(*item_id, indent, "-"),
				NodeKind::Mapping
					if item.line_comment.is_empty() && item.anchor.is_none() && item.tag.is_none() =>
				{
					if let Some(first) = item.content.first() {
						self.comment(&document[*first].head_comment, indent);
					}

					self.indent(indent);
					self.out.push('-');
					self.indent(item.indent().saturating_sub(indent + 1).max(1));
					self.mapping(*item_id, true);
				}
				_ => {
					self.indent(indent);
					self.out.push('-');
					self.properties(item);
					self.line_comments(&[&item.line_comment]);
					self.out.push('\n');
					self.collection(*item_id);
				}
			}

			self.comment(&item.foot_comment, indent);
		}
	}

	/// A scalar on its own line, optionally behind a `-`.
	fn item_scalar(&mut self, id: NodeId, indent: usize, dash: &str) {
		let document = self.document;
		let node = &document[id];
		let text = node.scalar_text(self.tags);

		if dash.is_empty() {
			self.comment(&node.head_comment, indent);
		}

		self.indent(indent);
		self.out.push_str(dash);

		if !text.is_empty() {
			if !dash.is_empty() {
				self.out.push(' ');
			}

			self.out.push_str(&text);
		}

		self.line_comments(&[&node.line_comment]);
		self.out.push('\n');

		if dash.is_empty() {
			self.comment(&node.foot_comment, indent);
		}
	}
}

fn yaml_error(line: usize, reason: &str) -> MarkerError {
	MarkerError::Yaml {
		line,
		reason: reason.to_string(),
	}
}

fn join_comments(comments: &[PendingComment<'_>]) -> String {
	comments
		.iter()
		.map(|comment| comment.text)
		.collect::<Vec<_>>()
		.join("\n")
}

fn comment_positions(comments: &[PendingComment<'_>]) -> Vec<Point> {
	comments
		.iter()
		.map(|comment| Point::new(comment.line, comment.indent + 1, 0))
		.collect()
}

/// Where the trailing `comment` of `line` starts.
fn comment_point(line: &Line<'_>, comment: &str) -> Option<Point> {
	if comment.is_empty() {
		return None;
	}

	let offset = line.raw.rfind(comment)?;

	Some(Point::new(line.number, line.raw[..offset].chars().count() + 1, 0))
}

/// Split an inline value into its node properties, the value and a trailing
/// comment. A quoted scalar that isn't closed on this line keeps the rest of
/// the line as its text.
fn split_value(text: &str) -> InlineValue<'_> {
	let mut value = InlineValue::default();
	let mut rest = text.trim();

	while rest.starts_with(['&', '!']) {
		let end = rest.find([' ', '\t']).unwrap_or(rest.len());
		let (property, after) = rest.split_at(end);
		let slot = if property.starts_with('&') {
			&mut value.anchor
		} else {
			&mut value.tag
		};

		if slot.is_some() {
			break;
		}

		*slot = Some(property);
		rest = after.trim_start();
	}

	if rest.starts_with(['"', '\'']) && quoted_end(rest).is_none() {
		value.text = rest;
		return value;
	}

	(value.text, value.comment) = split_comment(rest);
	value
}

fn is_sequence_item(text: &str) -> bool {
	text == "-" || text.starts_with("- ") || text.starts_with("-\t")
}

fn scalar_style(text: &str) -> ScalarStyle {
	match text.as_bytes().first() {
		Some(b'|') => ScalarStyle::Literal,
		Some(b'>') => ScalarStyle::Folded,
		Some(b'[' | b'{') => ScalarStyle::Flow,
		Some(b'"') => ScalarStyle::DoubleQuoted,
		Some(b'\'') => ScalarStyle::SingleQuoted,
		_ => ScalarStyle::Plain,
	}
}

/// Decode a scalar, unquoting quoted styles. Quoted scalars that span lines
/// are folded.
fn decode_scalar(text: &str, line: usize) -> MarkerResult<String> {
	match scalar_style(text) {
		ScalarStyle::DoubleQuoted | ScalarStyle::SingleQuoted if text.contains('\n') => {
			serde_yaml_ng::from_str::<String>(text).map_err(|error| {
				MarkerError::Yaml {
					line,
					reason: error.to_string(),
				}
			})
		}
		ScalarStyle::DoubleQuoted => {
			serde_yaml_ng::from_str::<String>(text).map_err(|error| {
				MarkerError::Yaml {
					line,
					reason: error.to_string(),
				}
			})
		}
		ScalarStyle::SingleQuoted => {
			let inner = text
				.strip_prefix('\'')
				.and_then(|text| text.strip_suffix('\''))
				.ok_or_else(|| yaml_error(line, "unterminated single quoted scalar"))?;

			Ok(inner.replace("''", "'"))
		}
		_ => Ok(text.to_string()),
	}
}

/// Quote a changed scalar only as much as YAML needs.
fn quote(value: &str) -> String {
	if value.is_empty() {
		return "\"\"".into();
	}

	match serde_yaml_ng::to_string(value) {
		Ok(text) if !text.trim_end().contains('\n') => text.trim_end().to_string(),
		_ => serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}")),
	}
}

/// The byte offset just past the closing quote of a quoted scalar at the
/// start of `text`.
fn quoted_end(text: &str) -> Option<usize> {
	let bytes = text.as_bytes();

	match bytes.first()? {
		b'"' => {
			let mut escaped = false;

			for (index, byte) in bytes.iter().enumerate().skip(1) {
				match byte {
					b'\\' if !escaped => escaped = true,
					b'"' if !escaped => return Some(index + 1),
					_ => escaped = false,
				}
			}

			None
		}
		b'\'' => {
			let mut index = 1;

			while index < bytes.len() {
				if bytes[index] == b'\'' {
					if bytes.get(index + 1) == Some(&b'\'') {
						index += 2;
						continue;
					}

					return Some(index + 1);
				}

				index += 1;
			}

			None
		}
		_ => None,
	}
}

/// Split `key: rest` on the first `:` followed by whitespace or the end of
/// the line.
fn split_key(text: &str) -> Option<(&str, &str)> {
	if is_sequence_item(text)
		|| text.starts_with(['[', '{', '|', '>', '#', '!', '&', '*', '?', '%', '@', '`'])
	{
		return None;
	}

	let quoted = text.starts_with(['"', '\'']);
	let mut search = if quoted { quoted_end(text)? } else { 0 };

	while let Some(offset) = text[search..].find(':') {
		let colon = search + offset;
		let after = &text[colon + 1..];

		if after.is_empty() || after.starts_with([' ', '\t']) {
			let key = text[..colon].trim_end();

			if key.is_empty() || (!quoted && key.contains(" #")) {
				return None;
			}

			return Some((key, after));
		}

		search = colon + 1;
	}

	None
}

/// Split a value from its trailing `# comment`.
fn split_comment(text: &str) -> (&str, &str) {
	let text = text.trim();
	let body = if text.starts_with('!') {
		text.find([' ', '\t']).map_or(text.len(), |index| index + 1)
	} else {
		0
	};
	let body = body + text[body..].len() - text[body..].trim_start().len();
	let start = quoted_end(&text[body..]).map_or(body, |end| body + end);
	let bytes = text.as_bytes();

	for index in start..bytes.len() {
		if bytes[index] == b'#' && (index == 0 || matches!(bytes[index - 1], b' ' | b'\t')) {
			return (text[..index].trim_end(), text[index..].trim_end());
		}
	}

	(text, "")
}

/// Net bracket depth of a line of flow YAML, ignoring quoted text.
fn flow_depth(text: &str) -> i64 {
	let mut depth = 0;
	let mut quote = None;

	for ch in text.chars() {
		match (quote, ch) {
			(Some(open), ch) if ch == open => quote = None,
			(Some(_), _) => {}
			(None, '"' | '\'') => quote = Some(ch),
			(None, '[' | '{') => depth += 1,
			(None, ']' | '}') => depth -= 1,
			_ => {}
		}
	}

	depth
}

fn fold_lines(lines: &[&str]) -> String {
	let mut value = String::new();
	let mut previous_empty = true;

	for line in lines {
		if line.is_empty() {
			value.push('\n');
			previous_empty = true;
			continue;
		}

		if !previous_empty {
			value.push(' ');
		}

		value.push_str(line);
		previous_empty = false;
	}

	value
}
