//! Conversion Orchestrator: resolves a request into a stage graph.
//!
//! Resolves a [`ConversionRequest`] to a stage graph per the table in
//! wires the stages together through [`crate::pipe`]'s bounded
//! in-process pipes (one worker thread per intermediate stage, the
//! caller's thread consuming the final stage), and exposes the crate's
//! two public entry points: [`convert`] and `detect_version` (re-exported
//! from [`crate::detector`]).
//!
//! A request whose `(from, to)` pair has no defined stage graph — in
//! practice, any request targeting `(JSON_LD, V1_2)`, since EPCIS 1.2 has
//! no JSON binding — is rejected synchronously, before any
//! stage is spawned. Once a stage is running, a failure is marshalled as
//! a [`ProblemResponseBody`] written into that stage's output pipe
//! instead of a thread panic, so the caller always reads either a valid
//! document or a parseable error document.

use crate::collector::{NoopValidator, Validator};
use crate::config::{ConversionRequest, MediaType, TranscoderFlags, ValidationPolicy, Version};
use crate::detector::{detect_version, PrefixedReader};
use crate::error::{EpcisError, EpcisResult};
use crate::pipe::{spawn_stage, PipeReader};
use crate::problem::ProblemResponseBody;
use crate::schema::rewriter::{rewrite_document, RewriteDirection};
use crate::transcode::mapper::EventMapper;
use crate::transcode::{json_pass, json_to_xml, xml_pass, xml_to_json};
use std::io::{self, BufReader, Read, Write};
use std::sync::Arc;

/// A single pipeline stage: reads the upstream byte stream, writes the
/// downstream one. Failures are caught and turned into a problem-response
/// document rather than propagated as an I/O error, following the "after
/// streaming has begun" rule.
type Stage = Box<dyn FnOnce(&mut dyn Read, &mut dyn Write) -> io::Result<()> + Send>;

/// Builds a [`Stage`] list and the fully-resolved `(from, to)` pair for a
/// request whose versions are already known.
pub struct Orchestrator {
    mapper: Option<Arc<dyn EventMapper>>,
    validator: Arc<dyn Validator>,
    /// Overrides `request.validation_policy` when set via [`Self::validate_with`];
    /// `None` means "defer to whatever policy the request carries".
    policy: Option<ValidationPolicy>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            mapper: None,
            validator: Arc::new(NoopValidator),
            policy: None,
        }
    }

    /// Installs the event-mapping hook, shared across every
    /// stage in the resolved graph that touches individual events.
    pub fn map_with(mut self, mapper: impl EventMapper + 'static) -> Self {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    /// Installs the validator and its failure policy, applied
    /// by every stage that writes events.
    pub fn validate_with(mut self, validator: impl Validator + 'static, policy: ValidationPolicy) -> Self {
        self.validator = Arc::new(validator);
        self.policy = Some(policy);
        self
    }

    /// Resolves `request` against `input` and returns a [`Read`] the
    /// caller drains for the converted document.
    ///
    /// `(from, to)` pairs with no defined stage graph — notably any
    /// `to=(JSON_LD, V1_2)` — are rejected here, synchronously, before any
    /// worker thread starts.
    pub fn convert<R: Read + Send + 'static>(
        &self,
        input: R,
        request: ConversionRequest,
    ) -> EpcisResult<PipeReader> {
        if !request.is_valid() {
            return Err(EpcisError::UnsupportedConversion(
                "(JSON_LD, V1_2) is not a valid input media/version pair".into(),
            ));
        }
        if request.to_media_type == MediaType::JsonLd && request.to_version == Version::V1_2 {
            return Err(EpcisError::UnsupportedConversion(
                "EPCIS 1.2 has no JSON-LD binding".into(),
            ));
        }

        let (from_media_type, from_version, boxed_input): (MediaType, Version, Box<dyn Read + Send>) =
            match request.from_version {
                Some(v) => (request.from_media_type, v, Box::new(input)),
                None => {
                    let mut input = input;
                    let detected = detect_version(&mut input)?;
                    let media_type = detected.media_type;
                    let version = detected.version;
                    let reader = PrefixedReader::new(detected, input);
                    (media_type, version, Box::new(reader))
                }
            };

        let stages = self.resolve_stages(
            from_media_type,
            from_version,
            request.to_media_type,
            request.to_version,
            &request.flags,
            self.policy_or(request.validation_policy),
        )?;

        let mut reader: Box<dyn Read + Send> = boxed_input;
        let mut final_reader = None;
        let mut stages = stages.into_iter().peekable();
        while let Some(stage) = stages.next() {
            let (next_reader, handle) = spawn_stage(reader, stage);
            // Detach: a streaming pipeline's producer threads run for the
            // lifetime of the consumer reading the final pipe;
            // their errors are already marshalled into the byte stream,
            // so there is nothing further to join on here.
            drop(handle);
            if stages.peek().is_none() {
                final_reader = Some(next_reader);
            } else {
                reader = Box::new(next_reader);
            }
        }

        Ok(final_reader.expect("resolve_stages always returns at least one stage"))
    }

    fn policy_or(&self, requested: ValidationPolicy) -> ValidationPolicy {
        self.policy.unwrap_or(requested)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_stages(
        &self,
        from_media_type: MediaType,
        from_version: Version,
        to_media_type: MediaType,
        to_version: Version,
        flags: &TranscoderFlags,
        policy: ValidationPolicy,
    ) -> EpcisResult<Vec<Stage>> {
        use MediaType::{JsonLd, Xml};
        use Version::{V1_2, V2_0};

        let flags = *flags;
        let mapper = self.mapper.clone();
        let validator = self.validator.clone();

        let stages: Vec<Stage> = match (from_media_type, from_version, to_media_type, to_version) {
            (Xml, V2_0, Xml, V2_0) => vec![self.xml_pass_stage(flags, mapper, validator, policy)],
            (Xml, V1_2, Xml, V1_2) => vec![
                self.rewrite_stage(RewriteDirection::V1_2ToV2_0, flags),
                self.xml_pass_stage(flags, mapper.clone(), validator.clone(), policy),
                self.rewrite_stage(RewriteDirection::V2_0ToV1_2, flags),
            ],
            (Xml, V1_2, Xml, V2_0) => vec![self.rewrite_stage(RewriteDirection::V1_2ToV2_0, flags)],
            (Xml, V2_0, Xml, V1_2) => vec![self.rewrite_stage(RewriteDirection::V2_0ToV1_2, flags)],
            (Xml, V2_0, JsonLd, V2_0) => vec![self.xml_to_json_stage(flags, mapper, validator, policy)],
            (Xml, V1_2, JsonLd, V2_0) => vec![
                self.rewrite_stage(RewriteDirection::V1_2ToV2_0, flags),
                self.xml_to_json_stage(flags, mapper.clone(), validator.clone(), policy),
            ],
            (JsonLd, V2_0, Xml, V2_0) => vec![self.json_to_xml_stage(flags, mapper, validator, policy)],
            (JsonLd, V2_0, Xml, V1_2) => vec![
                self.json_to_xml_stage(flags, mapper.clone(), validator.clone(), policy),
                self.rewrite_stage(RewriteDirection::V2_0ToV1_2, flags),
            ],
            (JsonLd, V2_0, JsonLd, V2_0) => vec![self.json_pass_stage(flags, mapper, validator, policy)],
            (JsonLd, V1_2, _, _) => {
                return Err(EpcisError::UnsupportedConversion(
                    "EPCIS 1.2 has no JSON-LD binding".into(),
                ))
            }
            (from_m, from_v, to_m, to_v) => {
                return Err(EpcisError::UnsupportedConversion(format!(
                    "no stage graph from ({from_m:?}, {}) to ({to_m:?}, {})",
                    from_v.as_str(),
                    to_v.as_str()
                )))
            }
        };

        Ok(stages)
    }

    fn xml_pass_stage(
        &self,
        flags: TranscoderFlags,
        mapper: Option<Arc<dyn EventMapper>>,
        validator: Arc<dyn Validator>,
        policy: ValidationPolicy,
    ) -> Stage {
        Box::new(move |input, mut output| {
            let result = xml_pass::transcode_xml_to_xml_validated(
                BufReader::new(input),
                &mut output,
                &flags,
                mapper.as_deref(),
                validator,
                policy,
            );
            finish(result, MediaType::Xml, output)
        })
    }

    fn xml_to_json_stage(
        &self,
        flags: TranscoderFlags,
        mapper: Option<Arc<dyn EventMapper>>,
        validator: Arc<dyn Validator>,
        policy: ValidationPolicy,
    ) -> Stage {
        Box::new(move |input, mut output| {
            let result = xml_to_json::transcode_xml_to_json_validated(
                BufReader::new(input),
                &mut output,
                &flags,
                mapper.as_deref(),
                validator,
                policy,
            );
            finish(result, MediaType::JsonLd, output)
        })
    }

    fn json_to_xml_stage(
        &self,
        flags: TranscoderFlags,
        mapper: Option<Arc<dyn EventMapper>>,
        validator: Arc<dyn Validator>,
        policy: ValidationPolicy,
    ) -> Stage {
        Box::new(move |input, mut output| {
            let result = json_to_xml::transcode_json_to_xml_validated(
                BufReader::new(input),
                &mut output,
                &flags,
                mapper.as_deref(),
                validator,
                policy,
            );
            finish(result, MediaType::Xml, output)
        })
    }

    fn json_pass_stage(
        &self,
        flags: TranscoderFlags,
        mapper: Option<Arc<dyn EventMapper>>,
        validator: Arc<dyn Validator>,
        policy: ValidationPolicy,
    ) -> Stage {
        Box::new(move |input, mut output| {
            let result = json_pass::transcode_json_to_json_validated(
                BufReader::new(input),
                &mut output,
                &flags,
                mapper.as_deref(),
                validator,
                policy,
            );
            finish(result, MediaType::JsonLd, output)
        })
    }

    fn rewrite_stage(&self, direction: RewriteDirection, flags: TranscoderFlags) -> Stage {
        Box::new(move |input, mut output| {
            let result = rewrite_document(BufReader::new(input), &mut output, direction, &flags);
            let media = MediaType::Xml;
            finish(result, media, output)
        })
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a stage's [`EpcisResult`] into the `io::Result` `spawn_stage`
/// expects, marshalling a failure into a problem-response document
/// written to the stage's own output instead of propagating it as a
/// broken-pipe error to the next stage.
fn finish(result: EpcisResult<()>, media_type: MediaType, mut output: &mut dyn Write) -> io::Result<()> {
    if let Err(e) = result {
        log::error!("conversion stage failed: {e}");
        let problem = ProblemResponseBody::new(
            "ConversionException",
            "EPCIS conversion failed",
            500,
            e.to_string(),
        );
        // Best-effort: if the problem document itself can't be written the
        // pipe is already broken, which the consumer observes directly.
        let _ = problem.write_to(media_type, &mut output);
    }
    Ok(())
}

/// Top-level entry point: auto-detects the input version when
/// `request.from_version` is `None`, resolves the stage graph, and
/// returns a stream the caller reads the converted document from.
pub fn convert<R: Read + Send + 'static>(input: R, request: ConversionRequest) -> EpcisResult<PipeReader> {
    Orchestrator::new().convert(input, request)
}
