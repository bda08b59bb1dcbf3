//! Event Collector / Handler.
//!
//! The single write-side sink: writes the envelope prologue once, then for
//! each event bag optionally invokes an injected [`Validator`], writes (or,
//! under [`ValidationPolicy::Skip`], drops) the event, and writes the
//! epilogue once the stream ends. A null [`FramedWriter`] sink runs
//! validation only, its degenerate mode.

use crate::config::ValidationPolicy;
use crate::error::{EpcisError, EpcisResult};
use crate::model::EventBag;
use std::sync::Arc;

/// Injected validation capability. Concrete XSD / JSON Schema backed
/// implementations are out of scope here — callers supply their
/// own `Validator` for the output media type; this crate ships only the
/// no-op default.
pub trait Validator: Send + Sync {
    fn validate(&self, bag: &EventBag) -> EpcisResult<()>;
}

/// Accepts every event; the default when a request supplies no validator.
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _bag: &EventBag) -> EpcisResult<()> {
        Ok(())
    }
}

/// The write-side framing a collector drives: open the `eventList`
/// container once, append one event at a time, close it once.
pub trait FramedWriter {
    fn write_prologue(&mut self) -> EpcisResult<()>;
    fn write_event(&mut self, bag: &EventBag) -> EpcisResult<()>;
    fn write_epilogue(&mut self) -> EpcisResult<()>;
}

/// A [`FramedWriter`] that discards everything — the degenerate
/// validation-only mode.
pub struct NullSink;

impl FramedWriter for NullSink {
    fn write_prologue(&mut self) -> EpcisResult<()> {
        Ok(())
    }
    fn write_event(&mut self, _bag: &EventBag) -> EpcisResult<()> {
        Ok(())
    }
    fn write_epilogue(&mut self) -> EpcisResult<()> {
        Ok(())
    }
}

/// Drives one [`FramedWriter`] through its prologue/event/epilogue
/// lifecycle, applying the configured [`Validator`] and [`ValidationPolicy`]
/// to each event in between.
pub struct EventCollector<F: FramedWriter> {
    framed: F,
    validator: Arc<dyn Validator>,
    policy: ValidationPolicy,
    prologue_written: bool,
    accepted: usize,
    skipped: usize,
}

impl<F: FramedWriter> EventCollector<F> {
    pub fn new(framed: F, validator: Arc<dyn Validator>, policy: ValidationPolicy) -> Self {
        Self {
            framed,
            validator,
            policy,
            prologue_written: false,
            accepted: 0,
            skipped: 0,
        }
    }

    pub fn with_noop_validator(framed: F, policy: ValidationPolicy) -> Self {
        Self::new(framed, Arc::new(NoopValidator), policy)
    }

    fn ensure_prologue(&mut self) -> EpcisResult<()> {
        if !self.prologue_written {
            self.framed.write_prologue()?;
            self.prologue_written = true;
        }
        Ok(())
    }

    /// Submits one event bag. Returns `Ok(true)` if it was written,
    /// `Ok(false)` if it was dropped under [`ValidationPolicy::Skip`].
    pub fn submit(&mut self, bag: &EventBag) -> EpcisResult<bool> {
        self.ensure_prologue()?;
        match self.validator.validate(bag) {
            Ok(()) => {
                self.framed.write_event(bag)?;
                self.accepted += 1;
                Ok(true)
            }
            Err(e) => match self.policy {
                ValidationPolicy::Abort => Err(EpcisError::ValidationFailure(e.to_string())),
                ValidationPolicy::Skip => {
                    self.skipped += 1;
                    log::warn!("dropping event that failed validation: {e}");
                    Ok(false)
                }
            },
        }
    }

    /// Writes the epilogue, guaranteeing the prologue was written even if
    /// zero events were submitted (an empty-but-well-formed document).
    pub fn finish(mut self) -> EpcisResult<F> {
        self.ensure_prologue()?;
        self.framed.write_epilogue()?;
        log::debug!(
            "collector wrote {} events, skipped {}",
            self.accepted,
            self.skipped
        );
        Ok(self.framed)
    }
}
