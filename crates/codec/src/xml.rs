//! XML encoding with a caller-supplied root element.
//!
//! Shape: `<root><key>text</key><tree><k>v</k></tree><item>..</item><item>..</item></root>`.
//! Decoding unwraps exactly one root level.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::MalformedDocument;
use crate::{CodecError, Format, Payload, Value};

pub fn encode(payload: &Payload, root: &str) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new(Vec::new());
    write_open(&mut writer, root)?;
    write_children(&mut writer, payload)?;
    write_close(&mut writer, root)?;
    Ok(writer.into_inner())
}

pub fn decode(bytes: &[u8]) -> Result<Payload, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::decoding(Format::Xml, e))?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Payload> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CodecError::decoding(Format::Xml, e))?;

        match event {
            Event::Start(start) => {
                ensure_single_root(&root, &stack)?;
                stack.push(Frame::new(element_name(&start)?));
            }
            Event::Empty(start) => {
                ensure_single_root(&root, &stack)?;
                let name = element_name(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push((name, Value::Text(String::new()))),
                    None => root = Some(Payload::new()),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| CodecError::decoding(Format::Xml, e))?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed("text outside of the root element")),
                }
            }
            Event::CData(data) => {
                let data = std::str::from_utf8(&data).map_err(|e| CodecError::decoding(Format::Xml, e))?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(data),
                    None => return Err(malformed("CDATA outside of the root element")),
                }
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(malformed("unbalanced end tag"));
                };
                match stack.last_mut() {
                    Some(parent) => {
                        let (name, value) = frame.into_value()?;
                        parent.children.push((name, value));
                    }
                    None => root = Some(frame.into_root()?),
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

// -------------------------
// Encoding helpers
// -------------------------

fn write_children(writer: &mut Writer<Vec<u8>>, payload: &Payload) -> Result<(), CodecError> {
    for (name, value) in payload.iter() {
        match value {
            Value::List(items) => {
                for item in items {
                    write_open(writer, name)?;
                    write_children(writer, item)?;
                    write_close(writer, name)?;
                }
            }
            Value::Tree(tree) => {
                write_open(writer, name)?;
                write_children(writer, tree)?;
                write_close(writer, name)?;
            }
            scalar => {
                write_open(writer, name)?;
                let text = scalar.scalar_text().unwrap_or_default();
                if !text.is_empty() {
                    writer
                        .write_event(Event::Text(BytesText::new(&text)))
                        .map_err(|e| CodecError::encoding(Format::Xml, e.to_string()))?;
                }
                write_close(writer, name)?;
            }
        }
    }
    Ok(())
}

fn write_open(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), CodecError> {
    if !is_valid_name(name) {
        return Err(CodecError::encoding(
            Format::Xml,
            format!("`{name}` is not a valid element name"),
        ));
    }
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| CodecError::encoding(Format::Xml, e.to_string()))
}

fn write_close(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), CodecError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| CodecError::encoding(Format::Xml, e.to_string()))
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

// -------------------------
// Decoding helpers
// -------------------------

/// An element whose end tag has not been seen yet.
struct Frame {
    name: String,
    text: String,
    children: Vec<(String, Value)>,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Leaf elements become text; elements with children become trees.
    fn into_value(self) -> Result<(String, Value), CodecError> {
        if self.children.is_empty() {
            return Ok((self.name, Value::Text(self.text)));
        }
        if !self.text.trim().is_empty() {
            return Err(malformed(format!("element `{}` mixes text and child elements", self.name)));
        }
        Ok((self.name, Value::Tree(group_siblings(self.children)?)))
    }

    fn into_root(self) -> Result<Payload, CodecError> {
        if self.children.is_empty() {
            if self.text.trim().is_empty() {
                return Ok(Payload::new());
            }
            return Err(malformed(format!("root element `{}` must contain child elements", self.name)));
        }
        match self.into_value()? {
            (_, Value::Tree(tree)) => Ok(tree),
            _ => Err(malformed("root element must contain child elements")),
        }
    }
}

/// Fold repeated same-named siblings into a list, keeping first-seen order.
fn group_siblings(children: Vec<(String, Value)>) -> Result<Payload, CodecError> {
    let mut payload = Payload::new();
    for (name, value) in children {
        let Some(existing) = payload.get_mut(&name) else {
            payload.insert(name, value);
            continue;
        };

        let Value::Tree(next) = value else {
            return Err(malformed(format!(
                "repeated element `{name}` must contain child elements"
            )));
        };
        match existing {
            Value::List(items) => items.push(next),
            Value::Tree(first) => {
                let first = core::mem::take(first);
                *existing = Value::List(vec![first, next]);
            }
            _ => {
                return Err(malformed(format!(
                    "repeated element `{name}` must contain child elements"
                )));
            }
        }
    }
    Ok(payload)
}

fn ensure_single_root(root: &Option<Payload>, stack: &[Frame]) -> Result<(), CodecError> {
    if root.is_some() && stack.is_empty() {
        return Err(malformed("document has more than one root element"));
    }
    Ok(())
}

fn element_name(start: &BytesStart<'_>) -> Result<String, CodecError> {
    let name = start.name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|e| CodecError::decoding(Format::Xml, e))
}

fn malformed(msg: impl Into<String>) -> CodecError {
    CodecError::decoding(Format::Xml, MalformedDocument(msg.into()))
}
