//! XML to JSON conversion for embedded documents
//!
//! Converts an XML document into a `serde_json::Value` tree:
//! - attributes become `@_name` keys holding strings
//! - element text becomes the element's value, or a `#text` key when the
//!   element also has attributes or children
//! - repeated sibling elements are grouped into an array
//! - empty elements become `""`
//!
//! Declarations, comments, processing instructions and doctypes are skipped.
//! The five XML entities and character references are expanded; any other
//! entity (`&nbsp;`, `&middot;`) is kept as literal text.

use std::borrow::Cow;

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Key prefix for attribute values
pub const ATTRIBUTE_PREFIX: &str = "@_";

/// Key holding an element's text when it cannot be the element's whole value
pub const TEXT_KEY: &str = "#text";

/// Errors raised while reading an XML document
#[derive(Debug, Error)]
pub enum XmlError {
    /// The reader rejected the input
    #[error("Malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// An attribute could not be parsed
    #[error("Malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    /// Element or text content was not valid UTF-8
    #[error("Invalid UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The document ended while elements were still open
    #[error("Unclosed element <{0}>")]
    Unclosed(String),

    /// A closing tag did not match the open element
    #[error("Unexpected closing tag </{0}>")]
    UnexpectedEnd(String),
}

/// Configurable XML to JSON converter
#[derive(Debug, Clone, Copy)]
pub struct XmlParser {
    parse_numbers: bool,
}

impl Default for XmlParser {
    fn default() -> Self {
        Self {
            parse_numbers: true,
        }
    }
}

/// An element still being read
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: Map::new(),
            children: Map::new(),
            text: String::new(),
        }
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }
}

impl XmlParser {
    /// Keeps every text value as a string
    pub fn raw() -> Self {
        Self {
            parse_numbers: false,
        }
    }

    /// Parses `input` into a JSON object keyed by root element name
    pub fn parse(&self, input: &str) -> Result<Value, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack = vec![Frame::new(String::new())];
        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(self.open(&start)?),
                Event::Empty(start) => {
                    let frame = self.open(&start)?;
                    self.close(&mut stack, frame);
                }
                Event::End(end) => {
                    let name = std::str::from_utf8(end.name().as_ref())?.to_string();
                    if stack.len() < 2 {
                        return Err(XmlError::UnexpectedEnd(name));
                    }
                    let frame = stack.pop().ok_or_else(|| XmlError::UnexpectedEnd(name.clone()))?;
                    if frame.name != name {
                        return Err(XmlError::UnexpectedEnd(name));
                    }
                    self.close(&mut stack, frame);
                }
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)?;
                    push_text(&mut stack, &unescape_lenient(raw));
                }
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    push_text(&mut stack, std::str::from_utf8(&raw)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() > 1 {
            let open = stack.pop().map(|f| f.name).unwrap_or_default();
            return Err(XmlError::Unclosed(open));
        }
        let root = stack.pop().map(|f| self.finish(f)).unwrap_or(Value::Null);
        Ok(match root {
            Value::Object(map) => Value::Object(map),
            Value::String(s) if s.is_empty() => Value::Object(Map::new()),
            other => {
                let mut map = Map::new();
                map.insert(TEXT_KEY.to_string(), other);
                Value::Object(map)
            }
        })
    }

    fn open(&self, start: &BytesStart) -> Result<Frame, XmlError> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut frame = Frame::new(name);
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = unescape_lenient(std::str::from_utf8(&attr.value)?);
            frame.attributes.insert(
                format!("{}{}", ATTRIBUTE_PREFIX, key),
                Value::String(value.trim().to_string()),
            );
        }
        Ok(frame)
    }

    fn close(&self, stack: &mut [Frame], frame: Frame) {
        let name = frame.name.clone();
        let value = self.finish(frame);
        if let Some(parent) = stack.last_mut() {
            parent.add_child(name, value);
        }
    }

    fn finish(&self, frame: Frame) -> Value {
        let text = frame.text.trim();
        if frame.attributes.is_empty() && frame.children.is_empty() {
            return self.text_value(text);
        }

        let mut map = frame.attributes;
        map.extend(frame.children);
        if !text.is_empty() {
            map.insert(TEXT_KEY.to_string(), self.text_value(text));
        }
        Value::Object(map)
    }

    fn text_value(&self, text: &str) -> Value {
        if self.parse_numbers {
            if let Some(number) = canonical_number(text) {
                return Value::Number(number);
            }
        }
        Value::String(text.to_string())
    }
}

/// Parses `input` with number conversion enabled
pub fn parse_xml(input: &str) -> Result<Value, XmlError> {
    XmlParser::default().parse(input)
}

fn push_text(stack: &mut [Frame], text: &str) {
    if let Some(frame) = stack.last_mut() {
        frame.text.push_str(text);
    }
}

/// Expands known entities, leaving unrecognized ones as written
fn unescape_lenient(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = unescape_with(raw, resolve_predefined_entity) {
        return text;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail[1..].find([';', '&']).map(|i| i + 1) {
            Some(end) if tail.as_bytes()[end] == b';' => {
                let entity = &tail[..=end];
                match unescape_with(entity, resolve_predefined_entity) {
                    Ok(resolved) => out.push_str(&resolved),
                    Err(_) => out.push_str(entity),
                }
                rest = &tail[end + 1..];
            }
            Some(next) => {
                out.push_str(&tail[..next]);
                rest = &tail[next..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Converts `text` to a number only if the number prints back identically,
/// so codes like `007` or amounts like `1.50` stay strings.
fn canonical_number(text: &str) -> Option<Number> {
    if let Ok(int) = text.parse::<i64>() {
        return (int.to_string() == text).then_some(Number::from(int));
    }
    let float = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
    let number = Number::from_f64(float)?;
    (number.to_string() == text).then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_elements() {
        let value = parse_xml("<root><item>Value</item></root>").unwrap();
        assert_eq!(value, json!({"root": {"item": "Value"}}));
    }

    #[test]
    fn test_attributes_and_text() {
        let value = parse_xml("<root><with_attr id='1'>Text</with_attr></root>").unwrap();
        assert_eq!(
            value,
            json!({"root": {"with_attr": {"@_id": "1", "#text": "Text"}}})
        );
    }

    #[test]
    fn test_empty_and_self_closing_elements() {
        let value = parse_xml("<root><empty></empty><blank/></root>").unwrap();
        assert_eq!(value, json!({"root": {"empty": "", "blank": ""}}));
    }

    #[test]
    fn test_repeated_siblings_become_array() {
        let value = parse_xml("<r><list>a</list><list>b</list><list>c</list></r>").unwrap();
        assert_eq!(value, json!({"r": {"list": ["a", "b", "c"]}}));
    }

    #[test]
    fn test_declaration_is_skipped_and_whitespace_trimmed() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
            <result>
                <status> 000 </status>
                <name>삼성전자</name>
            </result>"#;
        let value = parse_xml(input).unwrap();
        assert_eq!(value, json!({"result": {"status": "000", "name": "삼성전자"}}));
    }

    #[test]
    fn test_canonical_numbers_are_converted() {
        let value = parse_xml("<n><a>42</a><b>-7</b><c>1.5</c><d>007</d><e>1.50</e><f>1e3</f></n>").unwrap();
        assert_eq!(
            value,
            json!({"n": {"a": 42, "b": -7, "c": 1.5, "d": "007", "e": "1.50", "f": "1e3"}})
        );
    }

    #[test]
    fn test_raw_parser_keeps_strings() {
        let value = XmlParser::raw().parse("<n><a>42</a></n>").unwrap();
        assert_eq!(value, json!({"n": {"a": "42"}}));
    }

    #[test]
    fn test_entities_and_cdata_become_text() {
        let value = parse_xml("<r><a>A &amp; B</a><b><![CDATA[<raw>]]></b></r>").unwrap();
        assert_eq!(value, json!({"r": {"a": "A & B", "b": "<raw>"}}));
    }

    #[test]
    fn test_unknown_entities_are_kept_literally() {
        let value = parse_xml("<r><p>A&nbsp;B &amp; C&middot;D</p><q t='x&nbsp;y'>&#65;</q></r>").unwrap();
        assert_eq!(
            value,
            json!({"r": {"p": "A&nbsp;B & C&middot;D", "q": {"@_t": "x&nbsp;y", "#text": "A"}}})
        );
    }

    #[test]
    fn test_stray_ampersands_survive() {
        assert_eq!(unescape_lenient("a & b &lt; c"), "a & b < c");
        assert_eq!(unescape_lenient("x &unterminated"), "x &unterminated");
        assert_eq!(unescape_lenient("&bogus &amp;"), "&bogus &");
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(parse_xml("<root><item>Value</root>").is_err());
        assert!(parse_xml("<root><item>Value</item>").is_err());
        assert!(parse_xml("</root>").is_err());
        assert!(parse_xml("<a b=>x</a>").is_err());
    }
}
