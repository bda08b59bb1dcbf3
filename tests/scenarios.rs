//! End-to-end scenarios against the public `convert` entry point (S1-S6).
//! These exercise the whole stage graph the orchestrator assembles, not
//! an individual component.

use epcis_transcoder::{convert, ConversionRequest, EpcisError, MediaType, Version};
use std::io::{Cursor, Read};

fn read_all(mut r: impl Read) -> Vec<u8> {
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    out
}

/// S1: a 2.0 XML ObjectEvent with 2.0-only fields, converted to JSON 2.0,
/// surfaces those fields at the top level of the event (not nested).
#[test]
fn s1_object_event_2_0_to_json_2_0_surfaces_2_0_only_fields() {
    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2024-06-01T00:00:00Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2024-06-01T00:00:00Z</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <epcList><epc>urn:epc:id:sgtin:1.2.3</epc></epcList>
        <action>OBSERVE</action>
        <persistentDisposition><set>urn:epcglobal:cbv:disp:completeness_verified</set></persistentDisposition>
        <sensorElementList><sensorElement><sensorMetadata time="2024-06-01T00:00:00Z"/></sensorElement></sensorElementList>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;

    let request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);
    let out = read_all(convert(Cursor::new(xml.to_vec()), request).unwrap());
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let event = &value["epcisBody"]["eventList"][0];
    assert_eq!(event["type"], "ObjectEvent");
    assert!(event.get("persistentDisposition").is_some());
    assert!(event.get("sensorElementList").is_some());
}

/// S2: a 1.2 XML ObjectEvent with `baseExtension/errorDeclaration`,
/// converted to JSON 2.0, surfaces `errorDeclaration` as a sibling of
/// `eventTime` with no `baseExtension` wrapper in the output.
#[test]
fn s2_base_extension_error_declaration_is_unwrapped() {
    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:1" schemaVersion="1.2" creationDate="2024-06-01T00:00:00Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2024-06-01T00:00:00Z</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <baseExtension>
          <errorDeclaration>
            <declarationTime>2024-06-02T00:00:00Z</declarationTime>
            <reason>did_not_occur</reason>
          </errorDeclaration>
        </baseExtension>
        <epcList><epc>urn:epc:id:sgtin:1.2.3</epc></epcList>
        <action>OBSERVE</action>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;

    let request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);
    let out = read_all(convert(Cursor::new(xml.to_vec()), request).unwrap());
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let event = &value["epcisBody"]["eventList"][0];
    assert!(event.get("baseExtension").is_none());
    assert!(event.get("errorDeclaration").is_some());
}

/// S3: a document mixing several event kinds preserves input order and
/// tags each event with its correct `type`.
#[test]
fn s3_combination_of_different_events_preserves_order_and_type() {
    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2024-06-01T00:00:00Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2024-06-01T00:00:00Z</eventTime>
        <epcList><epc>urn:epc:1</epc></epcList>
        <action>ADD</action>
      </ObjectEvent>
      <AggregationEvent>
        <eventTime>2024-06-01T00:01:00Z</eventTime>
        <parentID>urn:epc:parent</parentID>
        <childEPCs><epc>urn:epc:2</epc></childEPCs>
        <action>ADD</action>
      </AggregationEvent>
      <TransactionEvent>
        <eventTime>2024-06-01T00:02:00Z</eventTime>
        <bizTransactionList><bizTransaction type="urn:epcglobal:cbv:btt:po">urn:order:1</bizTransaction></bizTransactionList>
        <action>ADD</action>
      </TransactionEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;

    let request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);
    let out = read_all(convert(Cursor::new(xml.to_vec()), request).unwrap());
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let events = value["epcisBody"]["eventList"].as_array().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["type"], "ObjectEvent");
    assert_eq!(events[1]["type"], "AggregationEvent");
    assert_eq!(events[2]["type"], "TransactionEvent");
}

/// S4: content that doesn't match the requested `fromMediaType` fails
/// during parsing (not before streaming starts), so the failure is
/// marshalled as a problem-response document on the output stream rather
/// than a synchronous error.
#[test]
fn s4_media_type_mismatch_yields_a_problem_response_on_the_stream() {
    let json = br#"{"@context":"x","type":"EPCISDocument","schemaVersion":"2.0","creationDate":"2024-06-01T00:00:00Z","epcisBody":{"eventList":[]}}"#;

    let mut request = ConversionRequest::new(MediaType::Xml, MediaType::Xml, Version::V2_0);
    request.from_version = Some(Version::V2_0); // skip detection: force the XML path over JSON bytes

    let out = read_all(convert(Cursor::new(json.to_vec()), request).unwrap());
    let text = String::from_utf8_lossy(&out);
    assert!(
        text.contains("EPCISException") || text.contains("ConversionException"),
        "expected a problem-response document, got: {text}"
    );
}

/// S5: an unsupported schema version is rejected synchronously, before
/// any stage runs.
#[test]
fn s5_unsupported_schema_version_is_synchronous() {
    let xml = br#"<epcis:EPCISDocument schemaVersion="9.9"></epcis:EPCISDocument>"#;
    let request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);
    let err = convert(Cursor::new(xml.to_vec()), request).unwrap_err();
    assert!(matches!(err, EpcisError::UnsupportedVersion(v) if v == "9.9"));
}

/// S6: an empty input stream fails version detection synchronously.
#[test]
fn s6_empty_stream_is_synchronous_schema_version_missing() {
    let request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);
    let err = convert(Cursor::new(Vec::<u8>::new()), request).unwrap_err();
    assert!(matches!(err, EpcisError::SchemaVersionMissing));
}

/// `(JSON_LD, V1_2)` is never a reachable target.
#[test]
fn json_1_2_target_is_unsupported() {
    let xml = br#"<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0"><EPCISBody><EventList/></EPCISBody></epcis:EPCISDocument>"#;
    let mut request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);
    request.to_version = Version::V1_2;
    let err = convert(Cursor::new(xml.to_vec()), request).unwrap_err();
    assert!(matches!(err, EpcisError::UnsupportedConversion(_)));
}
