//! EPCIS transcoder performance benchmark across document scales.
//!
//! Generates synthetic EPCIS 2.0 XML documents of increasing event count
//! and times `convert()` into JSON-LD, to sanity-check the streaming
//! claim that peak memory is O(1) in event count, by
//! watching throughput stay roughly flat as event count grows, rather
//! than collapsing once documents stop fitting comfortably in cache.

use epcis_transcoder::{convert, ConversionRequest, EpcisResult, MediaType, Version};
use std::io::{BufReader, Cursor, Read};
use std::time::Instant;

fn synthetic_document(event_count: usize) -> Vec<u8> {
    let mut doc = String::new();
    doc.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epcis:EPCISDocument xmlns:epcis="urn:epcglobal:epcis:xsd:2" schemaVersion="2.0" creationDate="2024-01-01T00:00:00Z">
  <EPCISBody>
    <EventList>
"#,
    );
    for i in 0..event_count {
        doc.push_str(&format!(
            r#"      <ObjectEvent>
        <eventTime>2024-01-01T00:00:{:02}Z</eventTime>
        <eventTimeZoneOffset>+00:00</eventTimeZoneOffset>
        <epcList><epc>urn:epc:id:sgtin:0614141.107346.{i}</epc></epcList>
        <action>ADD</action>
        <bizStep>urn:epcglobal:cbv:bizstep:shipping</bizStep>
        <disposition>urn:epcglobal:cbv:disp:in_transit</disposition>
      </ObjectEvent>
"#,
            i % 60,
        ));
    }
    doc.push_str("    </EventList>\n  </EPCISBody>\n</epcis:EPCISDocument>\n");
    doc.into_bytes()
}

fn run_scale(label: &str, event_count: usize) -> EpcisResult<()> {
    let document = synthetic_document(event_count);
    let request = ConversionRequest::new(MediaType::Xml, MediaType::JsonLd, Version::V2_0);

    let start = Instant::now();
    let mut output = convert(BufReader::new(Cursor::new(document)), request)?;
    let mut bytes_out = Vec::new();
    output.read_to_end(&mut bytes_out)?;
    let elapsed = start.elapsed();

    let rate = event_count as f64 / elapsed.as_secs_f64().max(1e-9);
    println!(
        "{label:>12}: {event_count:>6} events -> {:>9} bytes out in {elapsed:?} ({rate:.0} events/sec)",
        bytes_out.len(),
    );
    Ok(())
}

fn main() -> EpcisResult<()> {
    env_logger::init();

    println!("EPCIS transcoder throughput across document scales");
    println!("{}", "-".repeat(60));

    for (label, event_count) in [
        ("small", 100),
        ("medium", 1_000),
        ("large", 10_000),
    ] {
        run_scale(label, event_count)?;
    }

    Ok(())
}
