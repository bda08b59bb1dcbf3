//! Streaming EPCIS transcoder: converts supply-chain event documents
//! between the XML and JSON-LD wire forms and between the 1.2 and 2.0
//! schema versions, without ever materialising the full event list in
//! memory.
//!
//! The crate is organised as the five cooperating components from the
//! design:
//!
//! - [`detector`] — component A, peeks the input to classify `(MediaType, Version)`.
//! - [`schema`] — the per-event-type field tables component B and C both consult.
//! - [`schema::rewriter`] — component B, streaming 2.0↔1.2 XML restructuring.
//! - [`transcode`] — component C, the XML↔JSON event transcoder.
//! - [`collector`] — component D, the validate-then-write event sink.
//! - [`orchestrator`] — component E, resolves a request to a stage graph
//!   wired through [`pipe`]'s bounded in-process pipes.
//!
//! The top-level entry point is [`convert`]; see [`orchestrator::Orchestrator`]
//! for the builder form that installs an [`transcode::mapper::EventMapper`]
//! or a [`collector::Validator`].

pub mod collector;
pub mod config;
pub mod detector;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod pipe;
pub mod problem;
pub mod schema;
pub mod transcode;
pub mod xmlnode;

pub use config::{ConversionRequest, MediaType, TranscoderFlags, ValidationPolicy, Version};
pub use error::{EpcisError, EpcisResult};
pub use orchestrator::{convert, Orchestrator};
pub use transcode::Transcoder;
