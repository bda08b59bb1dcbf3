//! A generic, attribute- and namespace-preserving XML element tree.
//!
//! The rewriter (component B) and the XML side of the transcoder
//! (component C) both need to read one element (one event, one envelope)
//! into memory, restructure it, and write it back out — without ever
//! holding the whole document. [`XmlElement`] is that one-element-at-a-time
//! unit; it is built and torn down per event, never cached across the
//! document.

use crate::error::EpcisResult;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// The qualified name as it appeared on the wire (e.g. `epcis:ObjectEvent`).
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|c| match c {
            XmlNode::Element(e) if e.local_name() == local_name => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter_map(move |c| match c {
            XmlNode::Element(e) if e.local_name() == local_name => Some(e),
            _ => None,
        })
    }

    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value.into();
        } else {
            self.attrs.push((name, value.into()));
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = Self::new(name);
        el.children.push(XmlNode::Text(text.into()));
        el
    }
}

/// Reads one element (the one whose start tag was just consumed as `start`)
/// and all its descendants from `reader`, returning the fully-built tree.
pub fn read_element(
    reader: &mut Reader<impl BufRead>,
    start: &BytesStart,
) -> EpcisResult<XmlElement> {
    let mut element = XmlElement::new(qname_to_string(start.name()));
    for attr in start.attributes().flatten() {
        let key = qname_to_string(attr.key);
        let value = attr.unescape_value()?.into_owned();
        element.attrs.push((key, value));
    }

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let child = read_element(reader, &e)?;
                element.children.push(XmlNode::Element(child));
            }
            Event::Empty(e) => {
                let mut child = XmlElement::new(qname_to_string(e.name()));
                for attr in e.attributes().flatten() {
                    let key = qname_to_string(attr.key);
                    let value = attr.unescape_value()?.into_owned();
                    child.attrs.push((key, value));
                }
                element.children.push(XmlNode::Element(child));
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if !text.trim().is_empty() {
                    element.children.push(XmlNode::Text(text));
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                element.children.push(XmlNode::Text(text));
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(crate::error::EpcisError::MalformedInput(
                    "unexpected end of document while reading element".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(element)
}

fn qname_to_string(q: QName) -> String {
    String::from_utf8_lossy(q.as_ref()).into_owned()
}

/// Writes `element` (and its descendants) to `writer`.
pub fn write_element(writer: &mut Writer<impl Write>, element: &XmlElement) -> EpcisResult<()> {
    if element.children.is_empty() {
        let mut start = BytesStart::new(element.name.clone());
        for (k, v) in &element.attrs {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    let mut start = BytesStart::new(element.name.clone());
    for (k, v) in &element.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    writer.write_event(Event::Start(start))?;

    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => {
                writer.write_event(Event::Text(quick_xml::events::BytesText::new(t)))?;
            }
        }
    }

    writer.write_event(Event::End(quick_xml::events::BytesEnd::new(
        element.name.clone(),
    )))?;
    Ok(())
}
