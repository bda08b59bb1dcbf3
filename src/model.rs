//! Wire-format-neutral event representation.
//!
//! An [`EventBag`] is a tagged value: an event kind plus an ordered vector
//! of `(name, value)` pairs. It carries no XML- or JSON-specific structure,
//! so both the rewriter (component B) and the transcoder (component C) can
//! share the same in-memory shape while emitting different wire forms.

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::fmt;

/// Most EPCIS events carry well under this many top-level fields, so the
/// common case never touches the heap.
const INLINE_FIELDS: usize = 12;

/// The ordered `(name, value)` pairs making up an [`EventBag`].
type FieldVec = SmallVec<[(String, FieldValue); INLINE_FIELDS]>;

/// The five EPCIS event kinds. `AssociationEvent` only exists in 2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ObjectEvent,
    AggregationEvent,
    TransactionEvent,
    TransformationEvent,
    AssociationEvent,
}

impl EventKind {
    /// The element local-name / JSON `type` value for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ObjectEvent => "ObjectEvent",
            EventKind::AggregationEvent => "AggregationEvent",
            EventKind::TransactionEvent => "TransactionEvent",
            EventKind::TransformationEvent => "TransformationEvent",
            EventKind::AssociationEvent => "AssociationEvent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ObjectEvent" => Some(EventKind::ObjectEvent),
            "AggregationEvent" => Some(EventKind::AggregationEvent),
            "TransactionEvent" => Some(EventKind::TransactionEvent),
            "TransformationEvent" => Some(EventKind::TransformationEvent),
            "AssociationEvent" => Some(EventKind::AssociationEvent),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar leaf value. EPCIS fields are always text in XML; we keep the
/// parsed representation close to the wire form and let the emitters
/// decide how to render numbers/booleans/timestamps for their target.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Bool(bool),
    /// An RFC 3339 timestamp, kept as text to preserve the input's offset
    /// and precision exactly.
    Timestamp(String),
}

impl Scalar {
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Scalar::Text(s) | Scalar::Timestamp(s) => std::borrow::Cow::Borrowed(s),
            Scalar::Number(n) => std::borrow::Cow::Owned(n.to_string()),
            Scalar::Bool(b) => std::borrow::Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }
}

/// A field's value: a scalar, an ordered list (of scalars or child bags),
/// or a nested structured bag. `Bag` is boxed: `EventBag` holds its fields
/// inline (via `SmallVec`), so an unboxed `Bag(EventBag)` here would make
/// `FieldValue`'s size depend on its own size through `EventBag`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    List(Vec<FieldValue>),
    Bag(Box<EventBag>),
}

impl FieldValue {
    pub fn text<S: Into<String>>(s: S) -> Self {
        FieldValue::Scalar(Scalar::Text(s.into()))
    }
}

/// An ordered bag of named fields representing one EPCIS event, or a
/// nested structure within one (e.g. a `quantityElement`).
///
/// Field order matters: schema-ordered fields come first (per the tables
/// in [`crate::schema`]), followed by unknown/user-defined fields in the
/// order they were encountered in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBag {
    pub kind: Option<EventKind>,
    pub fields: FieldVec,
}

impl EventBag {
    pub fn new(kind: Option<EventKind>) -> Self {
        Self {
            kind,
            fields: SmallVec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        if let Some(pos) = self.fields.iter().position(|(n, _)| n == name) {
            Some(self.fields.remove(pos).1)
        } else {
            None
        }
    }

    /// Reorders `fields` so that names in `order` come first (in that
    /// order, skipping any absent), followed by the remaining fields in
    /// their original relative order. This is the schema-order + unknown-
    /// fields-keep-input-order rule shared by the rewriter and transcoder.
    pub fn reorder(&mut self, order: &[&str]) {
        let mut known: FieldVec = SmallVec::with_capacity(order.len());
        for name in order {
            if let Some(pos) = self.fields.iter().position(|(n, _)| n == name) {
                known.push(self.fields.remove(pos));
            }
        }
        known.extend(self.fields.drain(..));
        self.fields = known;
    }
}

/// Prefix → URI namespace map, collected from the document envelope and
/// frozen once the envelope has been written/parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceMap {
    entries: IndexMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.entries.insert(prefix.into(), uri.into());
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.entries.get(prefix).map(|s| s.as_str())
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_keeps_unknown_fields_in_input_order() {
        let mut bag = EventBag::new(Some(EventKind::ObjectEvent));
        bag.push("myExt", FieldValue::text("z"));
        bag.push("eventTime", FieldValue::text("t"));
        bag.push("action", FieldValue::text("ADD"));
        bag.push("otherExt", FieldValue::text("y"));

        bag.reorder(&["eventTime", "action"]);

        let names: Vec<_> = bag.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["eventTime", "action", "myExt", "otherExt"]);
    }

    #[test]
    fn namespace_map_round_trips_prefix_and_uri() {
        let mut ns = NamespaceMap::new();
        ns.insert("epcis", "urn:epcglobal:epcis:xsd:1");
        assert_eq!(ns.uri_for("epcis"), Some("urn:epcglobal:epcis:xsd:1"));
        assert_eq!(ns.prefix_for("urn:epcglobal:epcis:xsd:1"), Some("epcis"));
    }
}
