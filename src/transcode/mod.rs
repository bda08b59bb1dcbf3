//! Event Transcoder: streaming XML <-> JSON-LD conversion.
//!
//! Converts one event at a time between the XML and JSON-LD wire forms,
//! going through the wire-neutral [`crate::model::EventBag`] so both
//! directions share the same field-table-driven ordering and feature-flag
//! gating as the schema rewriter (component B). Per-event validation and
//! output framing is delegated to component D's [`crate::collector::EventCollector`].

mod field_map;
pub(crate) mod json_pass;
pub mod json_cursor;
pub(crate) mod json_to_xml;
pub mod mapper;
pub(crate) mod xml_pass;
pub(crate) mod xml_to_json;

use crate::collector::{NoopValidator, Validator};
use crate::config::{TranscoderFlags, ValidationPolicy};
use crate::error::EpcisResult;
use mapper::EventMapper;
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Configured event transcoder: feature flags, an optional mapping hook,
/// and an optional validator/policy pair, reused across every event in a
/// conversion.
pub struct Transcoder {
    flags: TranscoderFlags,
    mapper: Option<Box<dyn EventMapper>>,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
}

impl Transcoder {
    pub fn new(flags: TranscoderFlags) -> Self {
        Self {
            flags,
            mapper: None,
            validator: Arc::new(NoopValidator),
            policy: ValidationPolicy::default(),
        }
    }

    /// Installs a mapping hook run once per event.
    pub fn map_with(mut self, mapper: impl EventMapper + 'static) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    /// Installs the validator (and its failure policy) component D applies
    /// to each event before writing it. Without this, every
    /// event passes through [`NoopValidator`].
    pub fn validate_with(mut self, validator: impl Validator + 'static, policy: ValidationPolicy) -> Self {
        self.validator = Arc::new(validator);
        self.policy = policy;
        self
    }

    pub fn xml_to_json(&self, input: impl BufRead, mut output: impl Write) -> EpcisResult<()> {
        xml_to_json::transcode_xml_to_json_validated(
            input,
            &mut output,
            &self.flags,
            self.mapper_ref(),
            self.validator.clone(),
            self.policy,
        )
    }

    pub fn json_to_xml(&self, input: impl BufRead, mut output: impl Write) -> EpcisResult<()> {
        json_to_xml::transcode_json_to_xml_validated(
            input,
            &mut output,
            &self.flags,
            self.mapper_ref(),
            self.validator.clone(),
            self.policy,
        )
    }

    fn mapper_ref(&self) -> Option<&dyn EventMapper> {
        self.mapper.as_deref()
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(TranscoderFlags::default())
    }
}
