//! Event Transcoder, JSON-LD -> XML direction.
//!
//! Streams the `epcisBody.eventList` array one element at a time via
//! [`JsonCursor`]. This side assumes its input carries the envelope
//! fields (`schemaVersion`, `creationDate`) before `epcisBody`, which is
//! the order this crate's own XML->JSON direction always produces;
//! documented here rather than treated as a hidden bug, the mirror image
//! of the prefix-reconstitution contract in [`crate::detector`].

use super::field_map::{bag_to_xml_event, json_value_to_bag};
use super::json_cursor::JsonCursor;
use super::mapper::EventMapper;
use crate::collector::{EventCollector, FramedWriter, NoopValidator, Validator};
use crate::config::{TranscoderFlags, ValidationPolicy};
use crate::error::{EpcisError, EpcisResult};
use crate::model::EventBag;
use crate::schema::event_table;
use crate::xmlnode::write_element;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::writer::Writer;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub fn transcode_json_to_xml(
    input: impl BufRead,
    mut output: impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
) -> EpcisResult<()> {
    transcode_json_to_xml_validated(
        input,
        &mut output,
        flags,
        mapper,
        Arc::new(NoopValidator),
        ValidationPolicy::Abort,
    )
}

pub fn transcode_json_to_xml_validated(
    input: impl BufRead,
    output: &mut impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
) -> EpcisResult<()> {
    let mut cursor = JsonCursor::new(input);
    let mut schema_version: Option<String> = None;
    let mut creation_date: Option<String> = None;
    let mut wrote_root = false;

    cursor.expect(b'{')?;
    loop {
        if cursor.peek_is(b'}')? {
            cursor.consume()?;
            break;
        }
        let key = cursor.read_key()?;
        match key.as_str() {
            "schemaVersion" => schema_version = Some(cursor.read_value()?),
            "creationDate" => creation_date = Some(cursor.read_value()?),
            "epcisBody" => {
                let version = schema_version.clone().unwrap_or_else(|| "2.0".to_string());
                let created = creation_date.clone().unwrap_or_default();
                write_root_start(output, &version, &created)?;
                wrote_root = true;
                write_epcis_body(&mut cursor, output, flags, mapper, validator, policy)?;
                break;
            }
            _ => {
                let _: serde_json::Value = cursor.read_value()?;
                if cursor.peek_is(b',')? {
                    cursor.consume()?;
                }
            }
        }
    }

    if !wrote_root {
        return Err(EpcisError::MalformedInput(
            "JSON document had no epcisBody".into(),
        ));
    }

    let mut writer = Writer::new(&mut *output);
    writer.write_event(Event::End(BytesEnd::new("epcis:EPCISDocument")))?;
    output.flush()?;
    Ok(())
}

fn write_root_start(output: &mut impl Write, version: &str, creation_date: &str) -> EpcisResult<()> {
    let mut writer = Writer::new(&mut *output);
    let mut start = BytesStart::new("epcis:EPCISDocument");
    start.push_attribute(("xmlns:epcis", "urn:epcglobal:epcis:xsd:2"));
    start.push_attribute(("schemaVersion", version));
    writer.write_event(Event::Start(start))?;

    let creation_el = crate::xmlnode::XmlElement::with_text("creationDate", creation_date.to_string());
    write_element(&mut writer, &creation_el)?;
    Ok(())
}

fn write_epcis_body(
    cursor: &mut JsonCursor<impl BufRead>,
    output: &mut impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
) -> EpcisResult<()> {
    {
        let mut writer = Writer::new(&mut *output);
        writer.write_event(Event::Start(BytesStart::new("EPCISBody")))?;
    }
    cursor.expect(b'{')?;

    loop {
        if cursor.peek_is(b'}')? {
            cursor.consume()?;
            break;
        }
        let key = cursor.read_key()?;
        if key == "eventList" {
            write_event_list(cursor, output, flags, mapper, validator, policy)?;
        } else {
            let _: serde_json::Value = cursor.read_value()?;
        }
        if cursor.peek_is(b',')? {
            cursor.consume()?;
        }
    }

    let mut writer = Writer::new(&mut *output);
    writer.write_event(Event::End(BytesEnd::new("EPCISBody")))?;
    Ok(())
}

fn write_event_list(
    cursor: &mut JsonCursor<impl BufRead>,
    output: &mut impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
) -> EpcisResult<()> {
    let sink = XmlEventListWriter { output };
    let mut collector = EventCollector::new(sink, validator, policy);

    cursor.expect(b'[')?;
    loop {
        if cursor.peek_is(b']')? {
            cursor.consume()?;
            break;
        }
        let value: serde_json::Value = cursor.read_value()?;
        let bag = project_event(&value, flags, mapper)?;
        collector.submit(&bag)?;
        if cursor.peek_is(b',')? {
            cursor.consume()?;
        }
    }
    collector.finish()?;
    Ok(())
}

/// This side always produces 2.0 XML (a 1.2 target runs the schema
/// rewriter afterward); the 1.2-only feature flags only gate
/// the rewriter's output, so they are not consulted
/// here.
fn project_event(
    value: &serde_json::Value,
    _flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
) -> EpcisResult<EventBag> {
    let mut bag = json_value_to_bag(value);
    let kind = bag.kind.ok_or_else(|| {
        EpcisError::MalformedInput("event object missing a recognised \"type\"".into())
    })?;
    let table = event_table(kind);
    bag.reorder(table.order_2_0);
    if let Some(mapper) = mapper {
        bag = mapper.map_event(bag)?;
    }
    Ok(bag)
}

/// Frames the XML `<EventList>...</EventList>` element around one event
/// per [`EventCollector::submit`] call.
struct XmlEventListWriter<'w, W: Write> {
    output: &'w mut W,
}

impl<'w, W: Write> FramedWriter for XmlEventListWriter<'w, W> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscoderFlags;
    use std::io::{BufReader, Cursor};

    #[test]
    fn transcodes_one_object_event_to_xml() {
        let json = br#"{"@context":"x","type":"EPCISDocument","schemaVersion":"2.0","creationDate":"2024-01-01T00:00:00Z","epcisBody":{"eventList":[{"type":"ObjectEvent","eventTime":"2024-01-01T00:00:00Z","epcList":["urn:epc:1"],"action":"ADD"}]}}"#;
        let mut out = Vec::new();
        transcode_json_to_xml(
            BufReader::new(Cursor::new(json.to_vec())),
            &mut out,
            &TranscoderFlags::default(),
            None,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<epcis:EPCISDocument"));
        assert!(text.contains("<ObjectEvent>"));
        assert!(text.contains("<epc>urn:epc:1</epc>"));
    }

    #[test]
    fn missing_epcis_body_is_malformed_input() {
        let json = br#"{"schemaVersion":"2.0"}"#;
        let mut out = Vec::new();
        let result = transcode_json_to_xml(
            BufReader::new(Cursor::new(json.to_vec())),
            &mut out,
            &TranscoderFlags::default(),
            None,
        );
        assert!(matches!(result, Err(EpcisError::MalformedInput(_))));
    }

    #[test]
    fn empty_event_list_still_produces_a_well_formed_document() {
        let json = br#"{"schemaVersion":"2.0","creationDate":"2024-01-01T00:00:00Z","epcisBody":{"eventList":[]}}"#;
        let mut out = Vec::new();
        transcode_json_to_xml(
            BufReader::new(Cursor::new(json.to_vec())),
            &mut out,
            &TranscoderFlags::default(),
            None,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<EventList></EventList>") || text.contains("<EventList/>"));
    }
}
