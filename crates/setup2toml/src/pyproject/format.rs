//! Canonical `pyproject.toml` rendering.
//!
//! Tables are written in a fixed order, plain values before sub-tables,
//! arrays with several elements one element per line. Comments are not
//! preserved. Rendering the parsed output again yields the same bytes.

use std::fmt::Write;

use toml::{Table, Value};

/// Maximum line width before a single-element array is split.
const MAX_WIDTH: usize = 100;

const INDENT: &str = "    ";

const ROOT_ORDER: &[&str] = &["build-system", "project", "dependency-groups", "tool"];

const BUILD_SYSTEM_ORDER: &[&str] = &["requires", "build-backend", "backend-path"];

const PROJECT_ORDER: &[&str] = &[
    "name",
    "version",
    "description",
    "readme",
    "requires-python",
    "license",
    "license-files",
    "authors",
    "maintainers",
    "keywords",
    "classifiers",
    "urls",
    "scripts",
    "gui-scripts",
    "entry-points",
    "dependencies",
    "optional-dependencies",
    "dynamic",
];

/// Render `document` in canonical form.
pub fn format_document(document: &Table) -> String {
    let mut blocks = Vec::new();
    write_table(&mut blocks, &[], document, None);
    blocks.join("\n")
}

fn key_order(path: &[&str]) -> &'static [&'static str] {
    match path {
        [] => ROOT_ORDER,
        ["build-system"] => BUILD_SYSTEM_ORDER,
        ["project"] => PROJECT_ORDER,
        _ => &[],
    }
}

/// Entries of `table` in canonical order: known keys first, the rest in
/// input order.
fn ordered<'t>(table: &'t Table, order: &[&str]) -> Vec<(&'t str, &'t Value)> {
    let rank = |key: &str| {
        order
            .iter()
            .position(|known| *known == key)
            .unwrap_or(order.len())
    };
    let mut entries: Vec<_> = table
        .iter()
        .map(|(key, value)| (key.as_str(), value))
        .collect();
    entries.sort_by_key(|(key, _)| rank(key));
    entries
}

/// Tables that are always written inline, as `key = { ... }`.
fn is_inline_table(path: &[&str]) -> bool {
    matches!(path, ["project", "readme" | "license"])
        || matches!(path, ["tool", "setuptools", "dynamic", _, ..])
}

fn is_array_of_tables(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_table),
        _ => false,
    }
}

/// Whether the value at `path` is written as a header block rather than
/// as `key = value`.
fn is_block(path: &[&str], value: &Value) -> bool {
    match value {
        Value::Table(_) => !is_inline_table(path),
        Value::Array(_) => is_array_of_tables(value) && path.first() != Some(&"project"),
        _ => false,
    }
}

/// Append the blocks for `table`. `header` is the `[...]` or `[[...]]` line
/// to open the table with, if any.
fn write_table(blocks: &mut Vec<String>, path: &[&str], table: &Table, header: Option<String>) {
    let entries = ordered(table, key_order(path));
    let (children, plain): (Vec<_>, Vec<_>) = entries.into_iter().partition(|(key, value)| {
        let mut child = path.to_vec();
        child.push(*key);
        is_block(&child, value)
    });

    let is_array_element = header.as_deref().is_some_and(|h| h.starts_with("[["));
    if !plain.is_empty() || children.is_empty() || is_array_element {
        let mut block = String::new();
        if let Some(header) = header {
            block.push_str(&header);
            block.push('\n');
        }
        for (key, value) in &plain {
            let key = format_key(key);
            let _ = writeln!(block, "{key} = {}", format_value(value, key.len() + 3));
        }
        if !block.is_empty() {
            blocks.push(block);
        }
    }

    for (key, value) in children {
        let mut child = path.to_vec();
        child.push(key);
        let dotted = child
            .iter()
            .map(|segment| format_key(segment))
            .collect::<Vec<_>>()
            .join(".");
        match value {
            Value::Table(table) => {
                write_table(blocks, &child, table, Some(format!("[{dotted}]")));
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::Table(table) = item {
                        write_table(blocks, &child, table, Some(format!("[[{dotted}]]")));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Render a key, quoting it unless it is a valid bare key.
fn format_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if bare {
        key.to_owned()
    } else {
        format_string(key)
    }
}

/// Render a value after a key; `column` is where the value starts.
fn format_value(value: &Value, column: usize) -> String {
    match value {
        Value::Array(items) if !items.is_empty() => {
            let inline = format_inline(value);
            if items.len() == 1 && column + inline.len() <= MAX_WIDTH {
                return inline;
            }
            let mut out = String::from("[\n");
            for item in items {
                out.push_str(INDENT);
                out.push_str(&format_inline(item));
                out.push_str(",\n");
            }
            out.push(']');
            out
        }
        _ => format_inline(value),
    }
}

/// Render a value on a single line.
fn format_inline(value: &Value) -> String {
    match value {
        Value::String(text) => format_string(text),
        Value::Integer(number) => number.to_string(),
        Value::Float(number) => format_float(*number),
        Value::Boolean(flag) => flag.to_string(),
        Value::Datetime(datetime) => datetime.to_string(),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(format_inline).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Table(table) => {
            if table.is_empty() {
                return "{}".to_owned();
            }
            let entries: Vec<_> = table
                .iter()
                .map(|(key, value)| format!("{} = {}", format_key(key), format_inline(value)))
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
    }
}

fn format_float(number: f64) -> String {
    if number.is_nan() {
        "nan".to_owned()
    } else if number.is_infinite() {
        if number > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if number.fract() == 0.0 {
        format!("{number:.1}")
    } else {
        number.to_string()
    }
}

/// Render a basic string.
fn format_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
