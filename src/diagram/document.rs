//! Document Input
//!
//! Turns JSON or XML text into a `serde_json::Value`. XML is read inside a
//! synthetic root element and normalized to the same JSON shape:
//! attributes become regular keys, repeated elements become arrays and
//! element text becomes a value (`#text` when the element also has keys).
//!
//! Neither parser recurses per nesting level, and `release` drops values
//! iteratively, so deep documents are bounded by memory only.

use crate::error::{DiagramError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Name of the frame that wraps all XML input
const SYNTHETIC_ROOT: &str = "json-diagram-document";

/// Key used for element text when the element also has attributes or children
pub const TEXT_KEY: &str = "#text";

/// Supported document types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Xml,
}

impl DocumentFormat {
    pub fn name(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "JSON",
            DocumentFormat::Xml => "XML",
        }
    }

    /// File extension used for import/export
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Xml => "xml",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(DocumentFormat::Json),
            "xml" => Some(DocumentFormat::Xml),
            _ => None,
        }
    }

    pub fn all() -> &'static [DocumentFormat] {
        &[DocumentFormat::Json, DocumentFormat::Xml]
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DocumentFormat::from_extension(s).ok_or_else(|| format!("unknown format: {}", s))
    }
}

/// Parse document text into a JSON value
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => parse_json(text),
        DocumentFormat::Xml => parse_xml(text),
    }
}

/// Drop a value without recursing into it, so document depth never reaches the call stack
pub fn release(value: Value) {
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(map) => pending.extend(map.into_iter().map(|(_, child)| child)),
            _ => {}
        }
    }
}

/// Nesting depth is unbounded: the recursion limit is off and serde_stacker
/// moves deep recursion onto heap-allocated stack segments
fn parse_json(text: &str) -> Result<Value> {
    let invalid = |e: serde_json::Error| DiagramError::Parse {
        format: DocumentFormat::Json,
        message: e.to_string(),
    };

    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(invalid)?;
    if let Err(e) = de.end() {
        release(value);
        return Err(invalid(e));
    }
    Ok(value)
}

fn to_json_pretty(value: &Value) -> Result<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::pretty(&mut out);
    value.serialize(serde_stacker::Serializer::new(&mut ser))?;
    String::from_utf8(out).map_err(|e| DiagramError::Conversion(e.to_string()))
}

/// Element being assembled while its content streams in
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    /// Child values grouped by element name, in first-seen order
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String, attributes: Map<String, Value>) -> Self {
        Self {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn push_text(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(fragment);
    }

    fn push_child(&mut self, name: String, value: Value) {
        if let Value::Array(items) = self.children.entry(name).or_insert_with(|| Value::Array(Vec::new())) {
            items.push(value);
        }
    }

    fn into_value(self) -> Value {
        let Frame {
            name,
            mut attributes,
            children,
            text,
        } = self;

        for (child_name, group) in children {
            let Value::Array(mut items) = group else {
                continue;
            };
            match attributes.get_mut(&child_name) {
                // An attribute and child elements share the name: keep all, attribute first
                Some(slot) => {
                    log::debug!("<{}>: attribute and element both named {:?}", name, child_name);
                    items.insert(0, std::mem::take(slot));
                    *slot = Value::Array(items);
                }
                None => {
                    // A name seen once stays a plain value; repeated names become arrays
                    let value = if items.len() == 1 {
                        items.pop().unwrap_or(Value::Null)
                    } else {
                        Value::Array(items)
                    };
                    attributes.insert(child_name, value);
                }
            }
        }

        if attributes.is_empty() {
            return Value::String(text);
        }
        if !text.is_empty() {
            attributes.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        Value::Object(attributes)
    }
}

/// Element and attribute names keep their namespace prefix
fn qualified_name(name: QName) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

fn read_attributes(start: &BytesStart) -> std::result::Result<Map<String, Value>, String> {
    let mut map = Map::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        map.insert(qualified_name(attr.key), coerce_attribute(&value));
    }
    Ok(map)
}

/// Streams the XML with an explicit element stack; the whole input sits
/// inside one synthetic root frame, so several top-level elements are fine
fn parse_xml(text: &str) -> Result<Value> {
    let invalid = |message: String| DiagramError::Parse {
        format: DocumentFormat::Xml,
        message,
    };

    let trimmed = text.trim();
    if !trimmed.starts_with('<') {
        return Err(invalid("content must start with '<'".to_string()));
    }

    let mut reader = Reader::from_str(trimmed);
    reader.config_mut().trim_text(true);
    let mut stack = vec![Frame::new(SYNTHETIC_ROOT.to_string(), Map::new())];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| invalid(format!("{} at byte {}", e, reader.buffer_position())))?;
        match event {
            Event::Start(start) => {
                let attributes = read_attributes(&start).map_err(&invalid)?;
                stack.push(Frame::new(qualified_name(start.name()), attributes));
            }
            Event::Empty(start) => {
                let attributes = read_attributes(&start).map_err(&invalid)?;
                let frame = Frame::new(qualified_name(start.name()), attributes);
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(frame.name.clone(), frame.into_value());
                }
            }
            Event::End(end) => {
                let name = qualified_name(end.name());
                let frame = match stack.pop() {
                    Some(frame) if !stack.is_empty() => frame,
                    _ => return Err(invalid(format!("unexpected closing tag </{}>", name))),
                };
                if frame.name != name {
                    return Err(invalid(format!("expected </{}>, found </{}>", frame.name, name)));
                }
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(name, frame.into_value());
                }
            }
            Event::Text(fragment) => {
                let fragment = fragment.unescape().map_err(|e| invalid(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.push_text(&fragment);
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                if let Some(frame) = stack.last_mut() {
                    frame.push_text(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if stack.len() > 1 {
        let names: Vec<String> = stack[1..].iter().map(|f| f.name.clone()).collect();
        for frame in stack {
            release(frame.into_value());
        }
        return Err(invalid(format!("unclosed element <{}>", names.join("> <"))));
    }
    match stack.pop() {
        Some(root) => Ok(root.into_value()),
        None => Err(invalid("empty document".to_string())),
    }
}

fn coerce_attribute(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if value.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        Value::String(value.to_string())
    }
}

/// Convert document text between formats
pub fn convert(text: &str, from: DocumentFormat, to: DocumentFormat) -> Result<String> {
    let value = parse_document(text, from)
        .map_err(|e| DiagramError::Conversion(format!("source is not valid: {}", e)))?;

    let converted = match to {
        DocumentFormat::Json => to_json_pretty(&value),
        DocumentFormat::Xml => to_xml(&value),
    };
    release(value);
    converted
}

/// Pending output step of `to_xml`
enum Emit<'a> {
    Element {
        name: &'a str,
        value: &'a Value,
        depth: usize,
    },
    Close {
        name: &'a str,
        text: Option<&'a Value>,
        depth: usize,
    },
}

/// Serialize a JSON value as XML; only objects have an XML shape at the top level
pub fn to_xml(value: &Value) -> Result<String> {
    let Value::Object(map) = value else {
        return Err(DiagramError::Conversion(
            "top-level value must be an object to become XML".to_string(),
        ));
    };

    let mut out = String::new();
    let mut stack: Vec<Emit> = map
        .iter()
        .rev()
        .map(|(name, child)| Emit::Element {
            name,
            value: child,
            depth: 0,
        })
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Emit::Close { name, text, depth } => {
                let indent = "  ".repeat(depth);
                if let Some(text) = text {
                    out.push_str(&format!("{}  {}\n", indent, escape_xml(&scalar_text(text))));
                }
                out.push_str(&format!("{}</{}>\n", indent, name));
            }
            Emit::Element { name, value, depth } => {
                if !is_xml_name(name) {
                    return Err(DiagramError::Conversion(format!(
                        "\"{}\" is not a valid XML element name",
                        name
                    )));
                }
                let indent = "  ".repeat(depth);

                match value {
                    Value::Array(items) => {
                        if items.iter().any(Value::is_array) {
                            return Err(DiagramError::Conversion(format!(
                                "nested arrays under \"{}\" cannot be expressed in XML",
                                name
                            )));
                        }
                        stack.extend(items.iter().rev().map(|item| Emit::Element {
                            name,
                            value: item,
                            depth,
                        }));
                    }
                    Value::Object(map) if map.is_empty() => {
                        out.push_str(&format!("{}<{}/>\n", indent, name));
                    }
                    Value::Object(map) => {
                        out.push_str(&format!("{}<{}>\n", indent, name));
                        stack.push(Emit::Close {
                            name,
                            text: map.get(TEXT_KEY),
                            depth,
                        });
                        stack.extend(
                            map.iter()
                                .filter(|(key, _)| key.as_str() != TEXT_KEY)
                                .rev()
                                .map(|(key, child)| Emit::Element {
                                    name: key,
                                    value: child,
                                    depth: depth + 1,
                                }),
                        );
                    }
                    Value::Null => out.push_str(&format!("{}<{}/>\n", indent, name)),
                    scalar => {
                        out.push_str(&format!(
                            "{}<{1}>{2}</{1}>\n",
                            indent,
                            name,
                            escape_xml(&scalar_text(scalar))
                        ));
                    }
                }
            }
        }
    }
    Ok(out)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
