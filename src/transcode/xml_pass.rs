//! `C.xml-pass`: XML -> XML value normalisation, same-version
//! same-media-type conversions). Parses each event into an [`EventBag`],
//! applies the schema order and feature-flag gating, and re-emits XML —
//! useful on its own (canonicalising an already-2.0 document) and as the
//! middle stage of the 1.2->1.2 round trip (`B(1.2->2.0) -> C.xml-pass ->
//! B(2.0->1.2)`).

use super::field_map::{bag_to_xml_event, xml_event_to_bag};
use super::mapper::EventMapper;
use crate::collector::{EventCollector, FramedWriter, NoopValidator, Validator};
use crate::config::{TranscoderFlags, ValidationPolicy};
use crate::error::{EpcisError, EpcisResult};
use crate::model::EventBag;
use crate::schema::event_table;
use crate::xmlnode::{read_element, write_element, XmlElement};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub fn transcode_xml_to_xml(
    mut input: impl BufRead,
    mut output: impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
) -> EpcisResult<()> {
    transcode_xml_to_xml_validated(
        input,
        &mut output,
        flags,
        mapper,
        Arc::new(NoopValidator),
        ValidationPolicy::Abort,
    )
}

pub fn transcode_xml_to_xml_validated(
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
    let mut root_name = "epcis:EPCISDocument".to_string();
    let mut root_attrs: Vec<(String, String)> = Vec::new();
    let mut creation_date = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if local_name(&e) == "EPCISDocument" => {
                root_name = qname_string(e.name());
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let value = attr.unescape_value()?.into_owned();
                    root_attrs.push((key, value));
                }
            }
            Event::Start(e) if local_name(&e) == "creationDate" => {
                creation_date = read_element(&mut reader, &e)?.text();
            }
            Event::Start(e) if local_name(&e) == "EventList" => {
                let mut writer = Writer::new(&mut *output);
                let mut start = BytesStart::new(root_name.clone());
                for (k, v) in &root_attrs {
                    start.push_attribute((k.as_str(), v.as_str()));
                }
                writer.write_event(Event::Start(start))?;
                write_element(&mut writer, &XmlElement::with_text("creationDate", creation_date.clone()))?;
                writer.write_event(Event::Start(BytesStart::new("EPCISBody")))?;

                let sink = XmlPassEventListWriter { output: &mut *output };
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
                            return Err(EpcisError::MalformedInput(
                                "unexpected end of document inside EventList".into(),
                            ))
                        }
                        _ => {}
                    }
                }
                collector.finish()?;

                let mut writer = Writer::new(&mut *output);
                writer.write_event(Event::End(BytesEnd::new("EPCISBody")))?;
                writer.write_event(Event::End(BytesEnd::new(root_name)))?;
                output.flush()?;
                return Ok(());
            }
            Event::Eof => {
                return Err(EpcisError::MalformedInput("document had no EventList".into()))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Every caller of this pass operates on 2.0 XML: standalone it
/// canonicalises an already-2.0 document, and as the 1.2 round-trip's
/// middle stage it runs between two schema-rewriter steps that have
/// already normalised to 2.0 and will re-wrap to 1.2 afterward. The
/// 1.2-only feature flags therefore only gate the rewriter's output,
/// not this pass.
fn project_event(
    el: &XmlElement,
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

struct XmlPassEventListWriter<'w, W: Write> {
    output: &'w mut W,
}

impl<'w, W: Write> FramedWriter for XmlPassEventListWriter<'w, W> {
    fn write_prologue(&mut self) -> EpcisResult<()> {
        let mut writer = Writer::new(&mut *self.output);
        writer.write_event(Event::Start(BytesStart::new("EventList")))?;
        Ok(())
    }

    fn write_event(&mut self, bag: &EventBag) -> EpcisResult<()> {
        let kind = bag
            .kind
            .ok_or_else(|| EpcisError::MalformedInput("event bag missing a kind".into()))?;
        let el = bag_to_xml_event(bag, kind);
        let mut writer = Writer::new(&mut *self.output);
        write_element(&mut writer, &el)
    }

    fn write_epilogue(&mut self) -> EpcisResult<()> {
        let mut writer = Writer::new(&mut *self.output);
        writer.write_event(Event::End(BytesEnd::new("EventList")))?;
        Ok(())
    }
}

fn qname_string(q: QName) -> String {
    String::from_utf8_lossy(q.as_ref()).into_owned()
}

fn local_name(start: &BytesStart) -> String {
    let raw = qname_string(start.name());
    match raw.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reorders_fields_into_schema_order() {
        let xml = br#"<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0">
            <EPCISBody>
                <EventList>
                    <ObjectEvent>
                        <action>ADD</action>
                        <eventTime>2024-01-01T00:00:00Z</eventTime>
                        <epcList><epc>urn:epc:1</epc></epcList>
                    </ObjectEvent>
                </EventList>
            </EPCISBody>
        </epcis:EPCISDocument>"#;
        let mut out = Vec::new();
        transcode_xml_to_xml(Cursor::new(xml.to_vec()), &mut out, &TranscoderFlags::default(), None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let event_time_pos = text.find("<eventTime>").unwrap();
        let action_pos = text.find("<action>").unwrap();
        assert!(event_time_pos < action_pos);
    }
}
