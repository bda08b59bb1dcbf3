//! Streaming XML schema rewriter: converts between EPCIS 1.2 and 2.0 XML shapes.
//!
//! Restructures one EPCIS XML document between the 2.0 flat field layout
//! and the 1.2 `baseExtension`/`extension` wrapper layout. Works one
//! `EventList` child at a time so the event list itself is never
//! buffered — only ever one event's subtree lives in memory at a time.

use crate::config::{TranscoderFlags, Version};
use crate::error::{EpcisError, EpcisResult};
use crate::model::EventKind;
use crate::schema::{event_table, WrapperPolicy};
use crate::xmlnode::{read_element, write_element, XmlElement, XmlNode};
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::{BufRead, Write};

/// Which direction the rewriter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteDirection {
    V2_0ToV1_2,
    V1_2ToV2_0,
}

/// Streams `input` (an `epcis:EPCISDocument` in the source version) to
/// `output`, rewritten into the target version.
pub fn rewrite_document(
    input: impl BufRead,
    output: &mut impl Write,
    direction: RewriteDirection,
    flags: &TranscoderFlags,
) -> EpcisResult<()> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(output);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) if local_name(&start) == "EPCISDocument" => {
                write_document_root(&mut reader, &mut writer, &start, direction, flags)?;
                break;
            }
            Event::Eof => {
                return Err(EpcisError::MalformedInput(
                    "no EPCISDocument root element found".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn local_name(start: &BytesStart) -> String {
    let qname = start.name();
    let full = String::from_utf8_lossy(qname.as_ref()).into_owned();
    match full.rsplit_once(':') {
        Some((_, l)) => l.to_string(),
        None => full,
    }
}

fn write_document_root(
    reader: &mut Reader<impl BufRead>,
    writer: &mut Writer<&mut impl Write>,
    start: &BytesStart,
    direction: RewriteDirection,
    flags: &TranscoderFlags,
) -> EpcisResult<()> {
    let target_version = match direction {
        RewriteDirection::V2_0ToV1_2 => Version::V1_2,
        RewriteDirection::V1_2ToV2_0 => Version::V2_0,
    };

    let mut root_start = start.clone().into_owned();
    set_attribute(&mut root_start, "schemaVersion", target_version.as_str());
    writer.write_event(Event::Start(root_start))?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(&e) == "EventList" => {
                write_event_list(reader, writer, &e, direction, flags)?;
            }
            Event::Start(e) if local_name(&e) == "EPCISBody" => {
                write_body(reader, writer, &e, direction, flags)?;
            }
            Event::Start(e) => {
                // EPCISHeader or other envelope siblings: copy verbatim.
                let el = read_element(reader, &e)?;
                write_element(writer, &el)?;
            }
            Event::End(e) if local_name_bytes(e.name().as_ref()) == "EPCISDocument" => {
                writer.write_event(Event::End(quick_xml::events::BytesEnd::new(
                    String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                )))?;
                break;
            }
            Event::Eof => {
                return Err(EpcisError::MalformedInput(
                    "document ended before EPCISDocument closed".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// `EPCISBody` wraps `EventList` (and, in principle, sibling envelope
/// elements); descend into it rather than copying its subtree verbatim so
/// the nested `EventList` actually reaches [`write_event_list`].
fn write_body(
    reader: &mut Reader<impl BufRead>,
    writer: &mut Writer<&mut impl Write>,
    start: &BytesStart,
    direction: RewriteDirection,
    flags: &TranscoderFlags,
) -> EpcisResult<()> {
    writer.write_event(Event::Start(start.clone().into_owned()))?;
    let end_name = local_name(start);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(&e) == "EventList" => {
                write_event_list(reader, writer, &e, direction, flags)?;
            }
            Event::Start(e) => {
                let el = read_element(reader, &e)?;
                write_element(writer, &el)?;
            }
            Event::End(e) if local_name_bytes(e.name().as_ref()) == end_name => {
                writer.write_event(Event::End(quick_xml::events::BytesEnd::new(
                    String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                )))?;
                break;
            }
            Event::Eof => {
                return Err(EpcisError::MalformedInput(
                    "document ended before EPCISBody closed".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

fn local_name_bytes(name: &[u8]) -> String {
    let full = String::from_utf8_lossy(name).into_owned();
    match full.rsplit_once(':') {
        Some((_, l)) => l.to_string(),
        None => full,
    }
}

fn set_attribute(start: &mut BytesStart, key: &str, value: &str) {
    let mut attrs: Vec<(String, String)> = start
        .attributes()
        .flatten()
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                a.unescape_value().unwrap_or_default().into_owned(),
            )
        })
        .collect();
    if let Some(entry) = attrs.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value.to_string();
    } else {
        attrs.push((key.to_string(), value.to_string()));
    }
    start.clear_attributes();
    for (k, v) in attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }
}

fn write_event_list(
    reader: &mut Reader<impl BufRead>,
    writer: &mut Writer<&mut impl Write>,
    start: &BytesStart,
    direction: RewriteDirection,
    flags: &TranscoderFlags,
) -> EpcisResult<()> {
    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    writer.write_event(Event::Start(start.clone().into_owned()))?;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let raw = read_element(reader, &e)?;
                if let Some(rewritten) = rewrite_one_event(raw, direction, flags)? {
                    write_element(writer, &rewritten)?;
                }
            }
            Event::Empty(_) => {
                // A self-closing top-level event element has no fields at all;
                // nothing to restructure, and an event with no fields can't
                // satisfy any event type's required fields, so it is dropped.
            }
            Event::End(e) if e.name().as_ref() == qname.as_bytes() => break,
            Event::Eof => {
                return Err(EpcisError::MalformedInput(
                    "document ended before EventList closed".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    writer.write_event(Event::End(quick_xml::events::BytesEnd::new(qname)))?;
    Ok(())
}

/// Rewrites one `EventList` child. Returns `None` when the event must be
/// dropped (an `AssociationEvent` with `include_association_event` off).
fn rewrite_one_event(
    raw: XmlElement,
    direction: RewriteDirection,
    flags: &TranscoderFlags,
) -> EpcisResult<Option<XmlElement>> {
    match direction {
        RewriteDirection::V2_0ToV1_2 => {
            let (kind, el) = classify_2_0(raw)?;
            Ok(rewrite_2_0_to_1_2(el, kind, flags))
        }
        RewriteDirection::V1_2ToV2_0 => {
            let (kind, el, _depth) = unwrap_and_classify_1_2(raw)?;
            Ok(Some(rewrite_1_2_to_2_0(el, kind)))
        }
    }
}

fn classify_2_0(el: XmlElement) -> EpcisResult<(EventKind, XmlElement)> {
    let kind = EventKind::from_str(el.local_name()).ok_or_else(|| {
        EpcisError::MalformedInput(format!("unknown event element: {}", el.name))
    })?;
    Ok((kind, el))
}

/// Peels `extension` wrapper(s) around `TransformationEvent`/`AssociationEvent`
/// in 1.2 input and classifies the inner event.
fn unwrap_and_classify_1_2(mut el: XmlElement) -> EpcisResult<(EventKind, XmlElement, u8)> {
    let mut depth = 0;
    while el.local_name() == "extension" {
        let inner = el
            .children
            .into_iter()
            .find_map(|c| match c {
                XmlNode::Element(e) => Some(e),
                _ => None,
            })
            .ok_or_else(|| EpcisError::MalformedInput("empty extension wrapper".into()))?;
        el = inner;
        depth += 1;
    }
    let kind = EventKind::from_str(el.local_name()).ok_or_else(|| {
        EpcisError::MalformedInput(format!("unknown event element: {}", el.name))
    })?;
    Ok((kind, el, depth))
}

fn rewrite_2_0_to_1_2(
    flat: XmlElement,
    kind: EventKind,
    flags: &TranscoderFlags,
) -> Option<XmlElement> {
    if kind == EventKind::AssociationEvent
        && flags.generate_gs1_compliant_document
        && !flags.include_association_event
    {
        return None;
    }

    let table = event_table(kind);
    let mut base_extension = XmlElement::new("baseExtension");
    let mut extension = XmlElement::new("extension");
    let mut extension_extension = XmlElement::new("extension");
    let mut flat_fields: Vec<XmlNode> = Vec::new();

    let mut remaining: Vec<XmlNode> = flat.children;

    for spec in table.fields {
        if let Some(flag) = spec.flag {
            if !flag_enabled(flag, flags) {
                // Drop the 2.0-only construct entirely for this 1.2 output.
                remaining.retain(|c| !matches_name(c, spec.name));
                continue;
            }
        }

        let found_pos = remaining.iter().position(|c| matches_name(c, spec.name));
        let node = match found_pos {
            Some(pos) => Some(remaining.remove(pos)),
            None if spec.required_empty_in_1_2 => {
                Some(XmlNode::Element(XmlElement::new(spec.name)))
            }
            None => None,
        };
        let Some(node) = node else { continue };

        match spec.wrapper {
            WrapperPolicy::Flat => flat_fields.push(node),
            WrapperPolicy::BaseExtension => base_extension.children.push(node),
            WrapperPolicy::Extension => extension.children.push(node),
            WrapperPolicy::ExtensionExtension => extension_extension.children.push(node),
        }
    }

    // Assemble the nested extension tier before placing `extension` by position.
    if !extension_extension.children.is_empty() {
        extension.children.push(XmlNode::Element(extension_extension));
    }

    // `order_1_2` names the wrapper elements (`baseExtension`, `extension`)
    // at their correct position relative to the flat fields, so drive
    // assembly from it rather than appending wrappers after the fact.
    let mut out = XmlElement::new(kind.as_str());
    for entry in table.order_1_2 {
        match *entry {
            "baseExtension" => {
                if !base_extension.children.is_empty() {
                    out.children.push(XmlNode::Element(base_extension.clone()));
                }
            }
            "extension" => {
                if !extension.children.is_empty() {
                    out.children.push(XmlNode::Element(extension.clone()));
                }
            }
            name => {
                if let Some(pos) = flat_fields.iter().position(|c| matches_name(c, name)) {
                    out.children.push(flat_fields.remove(pos));
                }
            }
        }
    }

    // Unknown (user-defined) fields are appended at the outermost level,
    // preserving their relative input order.
    for node in remaining {
        out.children.push(node);
    }

    let wrapped = match table.outer_wrap_depth_1_2 {
        0 => out,
        1 => wrap_once(out, "extension"),
        2 => wrap_once(wrap_once(out, "extension"), "extension"),
        _ => unreachable!("no event kind wraps more than two levels"),
    };

    Some(wrapped)
}

/// `generate_gs1_compliant_document` is the master switch: a
/// GS1-compliant 1.2 profile has no room for any 2.0-only construct, so
/// when it's on, each construct still needs its own `include_*` flag on
/// too. Turning the profile constraint off lets 2.0-only content through
/// into the 1.2 extensions regardless of the individual flags, since
/// there is no longer a compliance rule to enforce.
fn flag_enabled(flag: crate::schema::FeatureFlag, flags: &TranscoderFlags) -> bool {
    use crate::schema::FeatureFlag::*;
    if !flags.generate_gs1_compliant_document {
        return true;
    }
    match flag {
        IncludeAssociationEvent => flags.include_association_event,
        IncludePersistentDisposition => flags.include_persistent_disposition,
        IncludeSensorElementList => flags.include_sensor_element_list,
    }
}

fn matches_name(node: &XmlNode, name: &str) -> bool {
    matches!(node, XmlNode::Element(e) if e.local_name() == name)
}

fn wrap_once(inner: XmlElement, wrapper_name: &str) -> XmlElement {
    let mut wrapper = XmlElement::new(wrapper_name);
    wrapper.children.push(XmlNode::Element(inner));
    wrapper
}

fn rewrite_1_2_to_2_0(wrapped: XmlElement, kind: EventKind) -> XmlElement {
    let table = event_table(kind);
    let mut out = XmlElement::new(kind.as_str());
    out.attrs = wrapped.attrs.clone();

    let mut remaining: Vec<XmlNode> = Vec::new();

    for child in wrapped.children {
        match child {
            XmlNode::Element(base) if base.local_name() == "baseExtension" => {
                remaining.extend(base.children);
            }
            XmlNode::Element(ext) if ext.local_name() == "extension" => {
                for echild in ext.children {
                    match echild {
                        XmlNode::Element(ext2) if ext2.local_name() == "extension" => {
                            remaining.extend(ext2.children);
                        }
                        other => remaining.push(other),
                    }
                }
            }
            other => remaining.push(other),
        }
    }

    // Known fields land via the table so schema order is deterministic;
    // anything left over is an unknown, user-defined field.
    for spec in table.fields {
        if let Some(pos) = remaining.iter().position(|c| matches_name(c, spec.name)) {
            out.children.push(remaining.remove(pos));
        }
    }
    for node in remaining {
        out.children.push(node);
    }

    out
}
