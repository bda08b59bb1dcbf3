//! Minimal demo driving [`epcis_transcoder::convert`] end to end.
//!
//! Not the product CLI (file-based resource loading and argument parsing
//! are explicitly out of scope) — just enough to exercise the
//! library against a sample document from the command line:
//!
//! ```text
//! cargo run --example convert_cli -- path/to/document.xml json 2.0
//! ```

use epcis_transcoder::{convert, ConversionRequest, EpcisResult, MediaType, Version};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};

fn main() -> EpcisResult<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| {
        eprintln!("usage: convert_cli <document> <xml|json> <1.2|2.0>");
        std::process::exit(2);
    });
    let to_media = args.next().unwrap_or_else(|| "json".to_string());
    let to_version = args.next().unwrap_or_else(|| "2.0".to_string());

    let to_media_type = match to_media.as_str() {
        "xml" => MediaType::Xml,
        "json" => MediaType::JsonLd,
        other => {
            eprintln!("unknown media type: {other}");
            std::process::exit(2);
        }
    };
    let to_version = Version::parse(&to_version).unwrap_or_else(|| {
        eprintln!("unknown schema version: {to_version}");
        std::process::exit(2);
    });

    let file = File::open(&path)?;
    let request = ConversionRequest::new(MediaType::Xml, to_media_type, to_version);

    let mut output = convert(BufReader::new(file), request)?;
    io::copy(&mut output, &mut io::stdout())?;
    Ok(())
}
