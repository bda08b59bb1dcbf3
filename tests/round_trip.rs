//! Property-based round-trip and invariant tests (invariants 1-6). Each
//! test exercises a public component directly rather than the full
//! orchestrator, since the invariants are about a single conversion
//! direction's fixed point, not stage composition.

use epcis_transcoder::config::TranscoderFlags;
use epcis_transcoder::detector::{detect_version, PrefixedReader};
use epcis_transcoder::schema::rewriter::{rewrite_document, RewriteDirection};
use epcis_transcoder::transcode::Transcoder;
use proptest::prelude::*;
use std::io::{BufReader, Cursor, Read};

fn object_event_xml_2_0(epc: &str, action: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2024-01-01T00:00:00Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2024-01-01T00:00:00Z</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <epcList><epc>{epc}</epc></epcList>
        <action>{action}</action>
        <bizStep>urn:epcglobal:cbv:bizstep:shipping</bizStep>
        <myns:custom xmlns:myns="urn:example:custom"><note>keep me</note></myns:custom>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#
    )
    .into_bytes()
}

fn object_event_xml_1_2(epc: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:1" schemaVersion="1.2" creationDate="2024-01-01T00:00:00Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2024-01-01T00:00:00Z</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <epcList><epc>{epc}</epc></epcList>
        <action>OBSERVE</action>
        <bizStep>urn:epcglobal:cbv:bizstep:shipping</bizStep>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#
    )
    .into_bytes()
}

/// Invariant 1: the version detector's classification is self-consistent
/// with the actual bytes on the stream, and the prefix it buffered can
/// always be reconstituted losslessly via `PrefixedReader`.
proptest! {
    #[test]
    fn detect_version_reconstitutes_the_stream(
        epc in "[a-z0-9:.]{1,40}",
        version in prop::sample::select(vec!["1.2", "2.0"]),
    ) {
        let bytes = if version == "1.2" {
            object_event_xml_1_2(&epc)
        } else {
            object_event_xml_2_0(&epc, "ADD")
        };
        let mut cursor = Cursor::new(bytes.clone());
        let detected = detect_version(&mut cursor).unwrap();
        prop_assert_eq!(detected.version.as_str(), version);

        let mut reader = PrefixedReader::new(detected, cursor);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        prop_assert_eq!(out, bytes);
    }
}

/// Invariant 2: XML 2.0 -> JSON-LD 2.0 -> XML 2.0 preserves every known
/// field's value (structural round trip, not a byte-identical one: the
/// intermediate JSON-LD form drops the XML foreign-namespace prefix onto
/// a plain key, and XML attribute/whitespace layout is not significant).
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn xml_json_xml_round_trip_preserves_epc_and_action(
        epc in "[a-z0-9:.]{1,40}",
        action in prop::sample::select(vec!["ADD", "OBSERVE", "DELETE"]),
    ) {
        let xml = object_event_xml_2_0(&epc, action);
        let transcoder = Transcoder::default();

        let mut json = Vec::new();
        transcoder
            .xml_to_json(BufReader::new(Cursor::new(xml)), &mut json)
            .unwrap();

        let mut xml_back = Vec::new();
        transcoder
            .json_to_xml(BufReader::new(Cursor::new(json)), &mut xml_back)
            .unwrap();

        let text = String::from_utf8(xml_back).unwrap();
        prop_assert!(text.contains(&format!("<epc>{epc}</epc>")));
        prop_assert!(text.contains(&format!("<action>{action}</action>")));
    }
}

/// Invariant 3: JSON-LD 2.0 -> XML 2.0 -> JSON-LD 2.0 preserves the event
/// array's shape and each event's `type`.
#[test]
fn json_xml_json_round_trip_preserves_event_types() {
    let json = br#"{"@context":"x","type":"EPCISDocument","schemaVersion":"2.0","creationDate":"2024-01-01T00:00:00Z","epcisBody":{"eventList":[
        {"type":"ObjectEvent","eventTime":"2024-01-01T00:00:00Z","epcList":["urn:epc:1"],"action":"ADD"},
        {"type":"AggregationEvent","eventTime":"2024-01-01T00:01:00Z","parentID":"urn:epc:parent","childEPCs":["urn:epc:2"],"action":"ADD"}
    ]}}"#;
    let transcoder = Transcoder::default();

    let mut xml = Vec::new();
    transcoder
        .json_to_xml(BufReader::new(Cursor::new(json.to_vec())), &mut xml)
        .unwrap();

    let mut json_back = Vec::new();
    transcoder
        .xml_to_json(BufReader::new(Cursor::new(xml)), &mut json_back)
        .unwrap();

    let value: serde_json::Value = serde_json::from_slice(&json_back).unwrap();
    let events = value["epcisBody"]["eventList"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["type"], "ObjectEvent");
    assert_eq!(events[1]["type"], "AggregationEvent");
}

/// Invariant 4: rewriting 1.2 -> 2.0 -> 1.2 is an involution on the
/// fields common to both versions (schema version round-trips, and the
/// event's core fields survive the wrap/unwrap of `baseExtension`).
#[test]
fn schema_rewrite_1_2_to_2_0_to_1_2_is_an_involution() {
    let xml = object_event_xml_1_2("urn:epc:roundtrip");
    let flags = TranscoderFlags::default();

    let mut to_2_0 = Vec::new();
    rewrite_document(
        BufReader::new(Cursor::new(xml)),
        &mut to_2_0,
        RewriteDirection::V1_2ToV2_0,
        &flags,
    )
    .unwrap();
    let text_2_0 = String::from_utf8(to_2_0.clone()).unwrap();
    assert!(text_2_0.contains(r#"schemaVersion="2.0""#));
    assert!(text_2_0.contains("<epc>urn:epc:roundtrip</epc>"));

    let mut back_to_1_2 = Vec::new();
    rewrite_document(
        BufReader::new(Cursor::new(to_2_0)),
        &mut back_to_1_2,
        RewriteDirection::V2_0ToV1_2,
        &flags,
    )
    .unwrap();
    let text_1_2 = String::from_utf8(back_to_1_2).unwrap();
    assert!(text_1_2.contains(r#"schemaVersion="1.2""#));
    assert!(text_1_2.contains("<epc>urn:epc:roundtrip</epc>"));
}

/// Invariant 5: an element in a foreign namespace that isn't part of any
/// known schema table survives an XML -> JSON -> XML round trip.
#[test]
fn unknown_foreign_element_survives_xml_json_xml_round_trip() {
    let xml = object_event_xml_2_0("urn:epc:unknown-field-test", "ADD");
    let transcoder = Transcoder::default();

    let mut json = Vec::new();
    transcoder
        .xml_to_json(BufReader::new(Cursor::new(xml)), &mut json)
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    let event = &value["epcisBody"]["eventList"][0];
    assert!(event.get("myns:custom").is_some());

    let mut xml_back = Vec::new();
    transcoder
        .json_to_xml(BufReader::new(Cursor::new(json)), &mut xml_back)
        .unwrap();
    let text = String::from_utf8(xml_back).unwrap();
    assert!(text.contains("myns:custom"));
    assert!(text.contains("keep me"));
}

/// Invariant 6: each feature flag independently gates its field in 1.2
/// output only — flipping one flag off removes only that field from the
/// 1.2 rewriter's output, not its neighbours, and has no effect at all
/// on a 2.0 target.
proptest! {
    #[test]
    fn flags_independently_gate_their_fields(
        include_sensor in any::<bool>(),
        include_disposition in any::<bool>(),
    ) {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2024-01-01T00:00:00Z">
  <EPCISBody>
    <EventList>
      <ObjectEvent>
        <eventTime>2024-01-01T00:00:00Z</eventTime>
        <epcList><epc>urn:epc:1</epc></epcList>
        <action>ADD</action>
        <persistentDisposition><set>urn:epcglobal:cbv:disp:completeness_verified</set></persistentDisposition>
        <sensorElementList><sensorElement><sensorMetadata time="2024-01-01T00:00:00Z"/></sensorElement></sensorElementList>
      </ObjectEvent>
    </EventList>
  </EPCISBody>
</epcis:EPCISDocument>"#;

        let flags = TranscoderFlags {
            include_sensor_element_list: include_sensor,
            include_persistent_disposition: include_disposition,
            ..TranscoderFlags::default()
        };

        // A 2.0 target (the transcoder directly) is never gated by either flag.
        let transcoder = Transcoder::new(flags);
        let mut json = Vec::new();
        transcoder
            .xml_to_json(BufReader::new(Cursor::new(xml.to_vec())), &mut json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        let event = &value["epcisBody"]["eventList"][0];
        prop_assert!(event.get("sensorElementList").is_some());
        prop_assert!(event.get("persistentDisposition").is_some());
        prop_assert!(event.get("epcList").is_some());

        // A 1.2 target (the schema rewriter) is gated exactly by the flags.
        let mut xml_1_2 = Vec::new();
        rewrite_document(
            BufReader::new(Cursor::new(xml.to_vec())),
            &mut xml_1_2,
            RewriteDirection::V2_0ToV1_2,
            &flags,
        )
        .unwrap();
        let text_1_2 = String::from_utf8(xml_1_2).unwrap();

        prop_assert_eq!(text_1_2.contains("<sensorElementList>"), include_sensor);
        prop_assert_eq!(text_1_2.contains("<persistentDisposition>"), include_disposition);
        // Unrelated fields are never affected by either flag.
        prop_assert!(text_1_2.contains("<epcList>"));
        prop_assert!(event.get("action").is_some());
    }
}
