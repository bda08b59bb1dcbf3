//! Event Transcoder, XML -> JSON-LD direction.
//!
//! Streams the `EventList` one event at a time: the outer document
//! envelope (`@context`, `schemaVersion`, `creationDate`) is read and
//! written up front, since it is bounded in size regardless of event
//! count; the `eventList` container itself is framed and populated via
//! component D's [`EventCollector`], one event at a time.

use super::field_map::{bag_to_json_value, xml_event_to_bag};
use super::mapper::EventMapper;
use std::sync::Arc;
use crate::collector::{EventCollector, FramedWriter, NoopValidator, Validator};
use crate::config::{TranscoderFlags, ValidationPolicy};
use crate::error::EpcisResult;
use crate::model::{EventBag, NamespaceMap};
use crate::schema::event_table;
use crate::xmlnode::read_element;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use std::io::{BufRead, Write};

const CONTEXT_URL: &str = "https://ref.gs1.org/standards/epcis/2.0.0/epcis-context.jsonld";

pub fn transcode_xml_to_json(
    mut input: impl BufRead,
    mut output: impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
) -> EpcisResult<()> {
    transcode_xml_to_json_validated(
        input,
        &mut output,
        flags,
        mapper,
        Arc::new(NoopValidator),
        ValidationPolicy::Abort,
    )
}

pub fn transcode_xml_to_json_validated(
    mut input: impl BufRead,
    output: &mut impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
) -> EpcisResult<()> {
    let mut reader = Reader::from_reader(&mut input);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut creation_date = String::new();
    let mut namespaces = NamespaceMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(&e) == "EPCISDocument" => {
                collect_namespaces(&e, &mut namespaces)?;
            }
            Event::Start(e) if local_name(&e) == "creationDate" => {
                let el = read_element(&mut reader, &e)?;
                creation_date = el.text();
            }
            Event::Start(e) if local_name(&e) == "EventList" => {
                write_envelope_header(output, &creation_date, &namespaces)?;

                let sink = JsonEventListWriter {
                    output: &mut *output,
                    needs_comma: false,
                };
                let mut collector = EventCollector::new(sink, validator, policy);

                loop {
                    buf.clear();
                    match reader.read_event_into(&mut buf)? {
                        Event::Start(child) => {
                            let el = read_element(&mut reader, &child)?;
                            let bag = project_event(&el, flags, mapper)?;
                            collector.submit(&bag)?;
                        }
                        Event::End(_) => break,
                        Event::Eof => {
                            return Err(crate::error::EpcisError::MalformedInput(
                                "unexpected end of document inside EventList".into(),
                            ))
                        }
                        _ => {}
                    }
                }
                collector.finish()?;
                write!(output, "}}")?;
                output.flush()?;
                return Ok(());
            }
            Event::Eof => {
                return Err(crate::error::EpcisError::MalformedInput(
                    "document had no EventList".into(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// This side always emits JSON 2.0 (EPCIS 1.2 has no JSON binding), so the
/// 1.2-only feature flags never apply here — they gate the schema
/// rewriter's 1.2 output only. Only the event's own
/// schema order is imposed.
fn project_event(
    el: &crate::xmlnode::XmlElement,
    _flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
) -> EpcisResult<EventBag> {
    let mut bag = xml_event_to_bag(el);
    if let Some(kind) = bag.kind {
        let table = event_table(kind);
        bag.reorder(table.order_2_0);
    }
    if let Some(mapper) = mapper {
        bag = mapper.map_event(bag)?;
    }
    Ok(bag)
}

fn write_envelope_header(
    output: &mut impl Write,
    creation_date: &str,
    namespaces: &NamespaceMap,
) -> EpcisResult<()> {
    write!(output, "{{")?;
    write!(output, r#""@context":"#)?;
    if namespaces.is_empty() {
        write!(output, "{}", serde_json::to_string(CONTEXT_URL)?)?;
    } else {
        let mut ctx = serde_json::Map::new();
        for (prefix, uri) in namespaces.iter() {
            if prefix != "epcis" && prefix != "xsi" {
                ctx.insert(prefix.to_string(), serde_json::Value::String(uri.to_string()));
            }
        }
        let array = serde_json::Value::Array(vec![
            serde_json::Value::String(CONTEXT_URL.to_string()),
            serde_json::Value::Object(ctx),
        ]);
        serde_json::to_writer(&mut *output, &array)?;
    }
    write!(
        output,
        r#","type":"EPCISDocument","schemaVersion":"2.0","creationDate":{},"epcisBody":"#,
        serde_json::to_string(creation_date)?
    )?;
    Ok(())
}

fn collect_namespaces(start: &BytesStart, namespaces: &mut NamespaceMap) -> EpcisResult<()> {
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            let value = attr.unescape_value()?.into_owned();
            namespaces.insert(prefix.to_string(), value);
        }
    }
    Ok(())
}

fn local_name(start: &BytesStart) -> String {
    let QName(bytes) = start.name();
    let raw = String::from_utf8_lossy(bytes);
    match raw.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => raw.into_owned(),
    }
}

/// Frames the JSON `{"eventList":[...]}` object around one event per
/// [`EventCollector::submit`] call.
struct JsonEventListWriter<'w, W: Write> {
    output: &'w mut W,
    needs_comma: bool,
}

impl<'w, W: Write> FramedWriter for JsonEventListWriter<'w, W> {
    fn write_prologue(&mut self) -> EpcisResult<()> {
        write!(self.output, r#"{{"eventList":["#)?;
        Ok(())
    }

    fn write_event(&mut self, bag: &EventBag) -> EpcisResult<()> {
        if self.needs_comma {
            write!(self.output, ",")?;
        }
        self.needs_comma = true;
        let value = bag_to_json_value(bag, &NamespaceMap::new());
        serde_json::to_writer(&mut *self.output, &value)?;
        Ok(())
    }

    fn write_epilogue(&mut self) -> EpcisResult<()> {
        write!(self.output, "]}}")?;
        Ok(())
    }
}
