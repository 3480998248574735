//! Deterministic block-style YAML writer.
//!
//! Generic serializers disagree on how sequences nested in mappings are
//! indented, so the layout is fixed here instead:
//!
//! ```yaml
//! spec:
//!   resources:
//!     - id: securityGroup
//!       template:
//!         spec:
//!           subnetIDs:
//!             - subnet-a
//! ```
//!
//! Keys are written in the order they are stored, nothing is re-sorted.

use crate::{Node, Scalar};

/// Indentation added for every nesting level, both for mapping values and for
/// sequences nested under a mapping key.
const PADDING: &str = "  ";

/// Renders a document, always terminated by a single newline.
pub fn to_yaml(node: &Node) -> String {
	let mut buf = String::new();
	emit_node(node, &mut buf, &mut String::new());
	buf.push('\n');
	buf
}

/// Decides if a string can be written as a plain scalar without changing its
/// meaning when read back.
///
/// Based on the yaml-rust emitter check, extended with the YAML 1.1 forms
/// that loaders still resolve to non-strings.
pub fn needs_quotes(string: &str) -> bool {
	string.is_empty()
		|| string.starts_with(' ')
		|| string.ends_with(' ')
		|| string.starts_with(|c| {
			matches!(
				c,
				'&' | '*' | '?' | '|' | '-' | '<' | '>' | '=' | '!' | '%' | '@' | ':' | '#'
			)
		})
		|| string.contains(|c| {
			matches!(c, '{' | '}' | '[' | ']' | ',' | '`' | '"' | '\'' | '\\' | '\0'..='\x1f' | '\x7f')
		})
		|| string.contains(": ")
		|| string.contains(" #")
		|| string.ends_with(':')
		|| [
			"yes", "Yes", "YES", "no", "No", "NO", "True", "TRUE", "true", "False", "FALSE", "false",
			"on", "On", "ON", "off", "Off", "OFF", "null", "Null", "NULL", "~", "y", "Y", "n", "N",
			"-.inf", "+.inf", ".inf", "-", "---", "...",
		]
		.contains(&string)
		|| looks_like_date(string)
		|| string.starts_with('.')
		|| string.starts_with("0x")
		|| string.starts_with("0o")
		|| looks_like_sexagesimal(string)
		|| looks_like_legacy_int(string)
		|| string.parse::<i64>().is_ok()
		|| string.parse::<f64>().is_ok()
}

fn looks_like_date(string: &str) -> bool {
	string.chars().all(|c| matches!(c, '0'..='9' | '-'))
		&& string.chars().filter(|c| *c == '-').count() == 2
}

/// Base 60 numbers such as `1:20` or `-190:20:30.15`, matched against the
/// whole string the way YAML 1.1 resolves `[-+]?[0-9][0-9_]*(:[0-5]?[0-9])+(\.[0-9_]*)?`.
fn looks_like_sexagesimal(string: &str) -> bool {
	let unsigned = string.strip_prefix(['+', '-']).unwrap_or(string);
	let (whole, fraction) = match unsigned.split_once('.') {
		Some((whole, fraction)) => (whole, Some(fraction)),
		None => (unsigned, None),
	};
	if fraction.is_some_and(|f| !f.chars().all(|c| c.is_ascii_digit() || c == '_')) {
		return false;
	}

	let mut parts = whole.split(':');
	let Some(head) = parts.next() else {
		return false;
	};
	if !head.starts_with(|c: char| c.is_ascii_digit())
		|| !head.chars().all(|c| c.is_ascii_digit() || c == '_')
	{
		return false;
	}
	let mut groups = 0;
	for part in parts {
		let valid = match part.as_bytes() {
			[d] => d.is_ascii_digit(),
			[tens, d] => matches!(tens, b'0'..=b'5') && d.is_ascii_digit(),
			_ => false,
		};
		if !valid {
			return false;
		}
		groups += 1;
	}
	groups > 0
}

/// `1_000` and `+12` are integers for YAML 1.1 loaders.
fn looks_like_legacy_int(string: &str) -> bool {
	let digits = string.strip_prefix(['+', '-']).unwrap_or(string);
	!digits.is_empty()
		&& digits.starts_with(|c: char| c.is_ascii_digit())
		&& digits.chars().all(|c| c.is_ascii_digit() || c == '_')
}

fn escape_double_quoted(value: &str, buf: &mut String) {
	buf.push('"');
	for c in value.chars() {
		match c {
			'"' => buf.push_str("\\\""),
			'\\' => buf.push_str("\\\\"),
			'\n' => buf.push_str("\\n"),
			'\r' => buf.push_str("\\r"),
			'\t' => buf.push_str("\\t"),
			c if c < ' ' || c == '\x7f' => {
				buf.push_str(&format!("\\u{:04x}", c as u32));
			}
			c => buf.push(c),
		}
	}
	buf.push('"');
}

fn emit_key(key: &str, buf: &mut String) {
	if needs_quotes(key) {
		escape_double_quoted(key, buf);
	} else {
		buf.push_str(key);
	}
}

fn emit_plain(value: &str, buf: &mut String) {
	if needs_quotes(value) {
		escape_double_quoted(value, buf);
	} else {
		buf.push_str(value);
	}
}

/// Writes a `|` block scalar whose content lines are indented by
/// `cur_padding` plus one level.
fn emit_block_literal(value: &str, buf: &mut String, cur_padding: &str) {
	let body = value.trim_end_matches('\n');
	let trailing = value.len() - body.len();

	buf.push('|');
	let first_content = body.split('\n').find(|line| !line.is_empty());
	if first_content.is_some_and(|line| line.starts_with(' ')) {
		buf.push_str(&PADDING.len().to_string());
	}
	match trailing {
		0 => buf.push('-'),
		1 if !body.is_empty() => {}
		_ => buf.push('+'),
	}

	if !body.is_empty() {
		for line in body.split('\n') {
			buf.push('\n');
			if !line.is_empty() {
				buf.push_str(cur_padding);
				buf.push_str(PADDING);
				buf.push_str(line);
			}
		}
	}
	// Keep chomping needs the extra line breaks spelled out as empty lines,
	// the final one is supplied by whatever follows the scalar.
	let extra = if body.is_empty() {
		trailing
	} else {
		trailing.saturating_sub(1)
	};
	for _ in 0..extra {
		buf.push('\n');
	}
}

fn is_nested_block(node: &Node) -> bool {
	match node {
		Node::Sequence(items) => !items.is_empty(),
		Node::Mapping(m) => !m.is_empty(),
		_ => false,
	}
}

fn emit_node(node: &Node, buf: &mut String, cur_padding: &mut String) {
	match node {
		Node::Null => buf.push_str("null"),
		Node::Bool(true) => buf.push_str("true"),
		Node::Bool(false) => buf.push_str("false"),
		Node::Number(n) => buf.push_str(&n.to_string()),
		Node::String(Scalar::Plain(s)) => emit_plain(s, buf),
		Node::String(Scalar::BlockLiteral(s)) => emit_block_literal(s, buf, cur_padding),
		Node::Sequence(items) => {
			if items.is_empty() {
				buf.push_str("[]");
				return;
			}
			for (i, item) in items.iter().enumerate() {
				if i != 0 {
					buf.push('\n');
					buf.push_str(cur_padding);
				}
				buf.push_str("- ");
				let prev_len = cur_padding.len();
				if is_nested_block(item) {
					cur_padding.push_str(PADDING);
				}
				emit_node(item, buf, cur_padding);
				cur_padding.truncate(prev_len);
			}
		}
		Node::Mapping(m) => {
			if m.is_empty() {
				buf.push_str("{}");
				return;
			}
			for (i, (key, value)) in m.iter().enumerate() {
				if i != 0 {
					buf.push('\n');
					buf.push_str(cur_padding);
				}
				emit_key(key, buf);
				buf.push(':');
				let prev_len = cur_padding.len();
				if is_nested_block(value) {
					buf.push('\n');
					buf.push_str(cur_padding);
					buf.push_str(PADDING);
					cur_padding.push_str(PADDING);
				} else {
					buf.push(' ');
				}
				emit_node(value, buf, cur_padding);
				cur_padding.truncate(prev_len);
			}
		}
	}
}
