//! `C.json-pass`: JSON-LD -> JSON-LD value normalisation,
//! same-version same-media-type conversions). Streams the `eventList`
//! array exactly as [`super::json_to_xml`] does, but re-emits JSON
//! instead of XML, applying the same schema order and feature-flag
//! gating along the way.

use super::field_map::{bag_to_json_value, json_value_to_bag};
use super::json_cursor::JsonCursor;
use super::mapper::EventMapper;
use crate::collector::{EventCollector, FramedWriter, NoopValidator, Validator};
use crate::config::{TranscoderFlags, ValidationPolicy};
use crate::error::{EpcisError, EpcisResult};
use crate::model::{EventBag, NamespaceMap};
use crate::schema::event_table;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub fn transcode_json_to_json(
    input: impl BufRead,
    mut output: impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
) -> EpcisResult<()> {
    transcode_json_to_json_validated(
        input,
        &mut output,
        flags,
        mapper,
        Arc::new(NoopValidator),
        ValidationPolicy::Abort,
    )
}

pub fn transcode_json_to_json_validated(
    input: impl BufRead,
    output: &mut impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
) -> EpcisResult<()> {
    let mut cursor = JsonCursor::new(input);
    let mut context: Option<serde_json::Value> = None;
    let mut schema_version: Option<String> = None;
    let mut creation_date: Option<String> = None;
    let mut wrote_header = false;

    cursor.expect(b'{')?;
    loop {
        if cursor.peek_is(b'}')? {
            cursor.consume()?;
            break;
        }
        let key = cursor.read_key()?;
        match key.as_str() {
            "@context" => context = Some(cursor.read_value()?),
            "schemaVersion" => schema_version = Some(cursor.read_value()?),
            "creationDate" => creation_date = Some(cursor.read_value()?),
            "epcisBody" => {
                write_header(output, &context, &schema_version, &creation_date)?;
                wrote_header = true;
                write!(output, r#""epcisBody":{{"#)?;
                write_body(&mut cursor, output, flags, mapper, validator, policy)?;
                write!(output, "}}")?;
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

    if !wrote_header {
        return Err(EpcisError::MalformedInput(
            "JSON document had no epcisBody".into(),
        ));
    }
    write!(output, "}}")?;
    output.flush()?;
    Ok(())
}

fn write_header(
    output: &mut impl Write,
    context: &Option<serde_json::Value>,
    schema_version: &Option<String>,
    creation_date: &Option<String>,
) -> EpcisResult<()> {
    write!(output, "{{")?;
    write!(output, r#""@context":"#)?;
    match context {
        Some(v) => serde_json::to_writer(&mut *output, v)?,
        None => write!(output, "null")?,
    }
    write!(
        output,
        r#","type":"EPCISDocument","schemaVersion":{},"creationDate":{},"#,
        serde_json::to_string(schema_version.as_deref().unwrap_or("2.0"))?,
        serde_json::to_string(creation_date.as_deref().unwrap_or(""))?,
    )?;
    Ok(())
}

fn write_body(
    cursor: &mut JsonCursor<impl BufRead>,
    output: &mut impl Write,
    flags: &TranscoderFlags,
    mapper: Option<&dyn EventMapper>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
) -> EpcisResult<()> {
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
    write!(output, r#""eventList":"#)?;
    let sink = JsonPassEventListWriter {
        output,
        needs_comma: false,
    };
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

/// JSON never targets 1.2, so the 1.2-only feature flags never
/// apply to this pass-through — they gate the schema rewriter's 1.2
/// output only.
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

struct JsonPassEventListWriter<'w, W: Write> {
    output: &'w mut W,
    needs_comma: bool,
}

impl<'w, W: Write> FramedWriter for JsonPassEventListWriter<'w, W> {
    fn write_prologue(&mut self) -> EpcisResult<()> {
        write!(self.output, "[")?;
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
        write!(self.output, "]")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn reorders_event_fields_and_preserves_context() {
        let json = br#"{"@context":"x","type":"EPCISDocument","schemaVersion":"2.0","creationDate":"2024-01-01T00:00:00Z","epcisBody":{"eventList":[{"type":"ObjectEvent","action":"ADD","eventTime":"2024-01-01T00:00:00Z","epcList":["urn:epc:1"]}]}}"#;
        let mut out = Vec::new();
        transcode_json_to_json(
            BufReader::new(Cursor::new(json.to_vec())),
            &mut out,
            &TranscoderFlags::default(),
            None,
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&String::from_utf8(out).unwrap()).unwrap();
        assert_eq!(parsed["@context"], "x");
        let event = &parsed["epcisBody"]["eventList"][0];
        let keys: Vec<&String> = event.as_object().unwrap().keys().collect();
        let event_time_pos = keys.iter().position(|k| *k == "eventTime").unwrap();
        let action_pos = keys.iter().position(|k| *k == "action").unwrap();
        assert!(event_time_pos < action_pos);
    }

    #[test]
    fn missing_epcis_body_is_malformed_input() {
        let json = br#"{"schemaVersion":"2.0"}"#;
        let mut out = Vec::new();
        let result = transcode_json_to_json(
            BufReader::new(Cursor::new(json.to_vec())),
            &mut out,
            &TranscoderFlags::default(),
            None,
        );
        assert!(matches!(result, Err(EpcisError::MalformedInput(_))));
    }
}
