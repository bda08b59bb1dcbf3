//! Problem-response envelope: how a mid-stream failure is
//! marshalled once the output prologue has already been written and a
//! bare error return is no longer possible.

use crate::config::MediaType;
use crate::error::EpcisResult;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use serde::Serialize;
use std::io::Write as IoWrite;

/// GS1-flavoured problem details, modelled after RFC 7807's shape since
/// that is the closest well-known precedent for this error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemResponseBody {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
}

impl ProblemResponseBody {
    pub fn new(r#type: impl Into<String>, title: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            title: title.into(),
            status,
            detail: detail.into(),
            instance: String::new(),
        }
    }

    /// Writes this problem as the target media type's native envelope.
    pub fn write_to(&self, media_type: MediaType, output: &mut impl IoWrite) -> EpcisResult<()> {
        match media_type {
            MediaType::Xml => self.write_xml(output),
            MediaType::JsonLd => self.write_json(output),
        }
    }

    fn write_json(&self, output: &mut impl IoWrite) -> EpcisResult<()> {
        serde_json::to_writer(output, self)?;
        Ok(())
    }

    fn write_xml(&self, output: &mut impl IoWrite) -> EpcisResult<()> {
        let mut writer = Writer::new(output);
        writer.write_event(Event::Start(BytesStart::new("epcisException:EPCISException")))?;

        for (tag, value) in [
            ("type", self.r#type.as_str()),
            ("title", self.title.as_str()),
            ("status", &self.status.to_string()),
            ("detail", self.detail.as_str()),
            ("instance", self.instance.as_str()),
        ] {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }

        writer.write_event(Event::End(BytesEnd::new("epcisException:EPCISException")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_json_problem_with_all_fields() {
        let problem = ProblemResponseBody::new(
            "ValidationException",
            "Event failed validation",
            422,
            "epcList must not be empty",
        );
        let mut out = Vec::new();
        problem.write_to(MediaType::JsonLd, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["status"], 422);
        assert_eq!(value["title"], "Event failed validation");
    }

    #[test]
    fn writes_xml_problem_as_a_single_exception_element() {
        let problem = ProblemResponseBody::new("ValidationException", "bad event", 422, "detail");
        let mut out = Vec::new();
        problem.write_to(MediaType::Xml, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<epcisException:EPCISException>"));
        assert!(text.contains("<status>422</status>"));
    }
}
