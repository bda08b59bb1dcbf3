//! Per-event-type field tables: canonical 2.0 and 1.2
//! field order, the 1.2 wrapper policy, and which fields are 2.0-only.
//!
//! These tables are the single source of truth for "what order do fields
//! go in" and "what wrapper does a field live under in 1.2" — both the
//! rewriter (component B) and the transcoder (component C) consult them
//! instead of duplicating ordering logic.

mod tables;
pub mod rewriter;

pub use tables::event_table;

use crate::model::EventKind;

/// Where a 1.2 document nests a field relative to the flat 2.0 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperPolicy {
    /// Same position in both versions.
    Flat,
    /// Lives under `baseExtension` in 1.2.
    BaseExtension,
    /// Lives under `extension` in 1.2.
    Extension,
    /// Lives under `extension/extension` in 1.2 (the 2.0-only tier).
    ExtensionExtension,
}

/// Entry for one known field of an event type.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub wrapper: WrapperPolicy,
    /// Whether this is a 2.0-only construct gated by a feature flag; `None`
    /// when the field exists in both versions unconditionally.
    pub flag: Option<FeatureFlag>,
    /// Whether the 1.2 XML writer must emit an explicit empty element
    /// (e.g. `<epcList/>`) when the field is absent but required.
    pub required_empty_in_1_2: bool,
}

/// The four feature flags governing 1.2 output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFlag {
    IncludeAssociationEvent,
    IncludePersistentDisposition,
    IncludeSensorElementList,
}

/// Full field table for one event kind.
#[derive(Debug, Clone, Copy)]
pub struct EventTable {
    pub kind: EventKind,
    /// Canonical 2.0 ordering of known fields.
    pub order_2_0: &'static [&'static str],
    /// Canonical 1.2 ordering of known fields (includes wrapper element
    /// names themselves, e.g. `baseExtension`, as position markers).
    pub order_1_2: &'static [&'static str],
    /// Wrapper policy and flag gating, keyed by field name.
    pub fields: &'static [FieldSpec],
    /// In 1.2, is this event wrapped in an outer `<extension>` at the
    /// `EventList` level (TransformationEvent), or `<extension><extension>`
    /// (AssociationEvent)? `0` for ObjectEvent/AggregationEvent/TransactionEvent.
    pub outer_wrap_depth_1_2: u8,
}

impl EventTable {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
