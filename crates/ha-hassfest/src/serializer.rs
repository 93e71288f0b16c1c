//! Serializers for generated artifacts
//!
//! - [`PyLiteral`] renders Python literals in the layout black produces for
//!   collections that carry a trailing comma: one element per line, four
//!   space indent, double quoted strings.
//! - [`to_json_string`] renders JSON with two space indentation and every
//!   non-ASCII character escaped as `\uXXXX`.

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;

const INDENT: &str = "    ";

/// Header for generated Python modules
pub const GENERATED_HEADER: &str = r#""""Automatically generated by hassfest.

To update, run python3 -m script.hassfest
""""#;

/// A Python literal value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PyLiteral {
    Str(String),
    List(Vec<PyLiteral>),
    Dict(Vec<(PyLiteral, PyLiteral)>),
}

impl PyLiteral {
    pub fn str(value: impl Into<String>) -> Self {
        PyLiteral::Str(value.into())
    }

    /// List of strings
    pub fn str_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PyLiteral::List(values.into_iter().map(|v| PyLiteral::Str(v.into())).collect())
    }

    /// Render at the given nesting depth
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        self.write(&mut out, depth);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        match self {
            PyLiteral::Str(value) => out.push_str(&quote(value)),
            PyLiteral::List(items) => {
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push_str("[\n");
                for item in items {
                    push_indent(out, depth + 1);
                    item.write(out, depth + 1);
                    out.push_str(",\n");
                }
                push_indent(out, depth);
                out.push(']');
            }
            PyLiteral::Dict(entries) => {
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{\n");
                for (key, value) in entries {
                    push_indent(out, depth + 1);
                    key.write(out, depth + 1);
                    out.push_str(": ");
                    value.write(out, depth + 1);
                    out.push_str(",\n");
                }
                push_indent(out, depth);
                out.push('}');
            }
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Quote a string the way black normalizes it
///
/// Double quotes are preferred unless the value holds a double quote and no
/// single quote, in which case single quotes avoid escaping.
fn quote(value: &str) -> String {
    let delimiter = if value.contains('"') && !value.contains('\'') {
        '\''
    } else {
        '"'
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

/// Render a generated Python module assigning `value` to `name`
pub fn python_module(name: &str, value: &PyLiteral) -> String {
    format!("{GENERATED_HEADER}\n\n{name} = {}\n", value.render(0))
}

/// JSON pretty printer that escapes everything outside printable ASCII
struct AsciiFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl AsciiFormatter<'_> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiFormatter<'_> {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if (' '..='~').contains(&c) {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Serialize to indented, ASCII-only JSON without a trailing newline
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter::new());
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
