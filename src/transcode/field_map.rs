//! Field projectors shared by both transcoder directions:
//! conversions between one [`XmlElement`] subtree and one [`EventBag`],
//! and between one [`EventBag`] and one `serde_json::Value`.
//!
//! Known compound fields (EPC lists, quantity elements, typed
//! `bizTransaction`/`source`/`destination` leaves) get a dedicated shape;
//! everything else — including any foreign-namespace, user-defined
//! element — falls through to a generic structural conversion so it is
//! preserved byte-for-byte in meaning across the round trip
//! without reinterpretation.

use crate::model::{EventBag, EventKind, FieldValue, NamespaceMap, Scalar};
use crate::xmlnode::{XmlElement, XmlNode};
use serde_json::{Map, Value};

const LIST_FIELDS: &[(&str, &str)] = &[
    ("epcList", "epc"),
    ("childEPCs", "epc"),
    ("bizTransactionList", "bizTransaction"),
    ("sourceList", "source"),
    ("destinationList", "destination"),
    ("quantityList", "quantityElement"),
    ("childQuantityList", "quantityElement"),
    ("inputQuantityList", "quantityElement"),
    ("outputQuantityList", "quantityElement"),
    ("sensorElementList", "sensorElement"),
    ("correctiveEventIDs", "correctiveEventID"),
];

const TYPED_LEAF_FIELDS: &[&str] = &["bizTransaction", "source", "destination"];

/// Fields whose value is an RFC 3339 timestamp rather than plain text
/// "timestamp". `sensorMetadata/@time` and friends are attributes,
/// not fields, and stay as attributes on the generic fallback path.
const TIMESTAMP_FIELDS: &[&str] = &["eventTime", "recordTime", "declarationTime"];

fn list_item_name(list_field: &str) -> Option<&'static str> {
    LIST_FIELDS
        .iter()
        .find(|(list, _)| *list == list_field)
        .map(|(_, item)| *item)
}

fn is_timestamp_field(name: &str) -> bool {
    TIMESTAMP_FIELDS.contains(&name)
}

/// Tags `text` as a timestamp scalar when it parses as RFC 3339, keeping the
/// original text untouched either way so the offset/precision round-trips
/// exactly. A field that fails to parse degrades to plain text rather than
/// rejecting the document: schema validation, not transcoding, is where a
/// malformed timestamp belongs.
fn classify_scalar(name: &str, text: String) -> Scalar {
    if is_timestamp_field(name) && chrono::DateTime::parse_from_rfc3339(&text).is_ok() {
        Scalar::Timestamp(text)
    } else {
        Scalar::Text(text)
    }
}

// ---------------------------------------------------------------------
// XML -> EventBag
// ---------------------------------------------------------------------

/// Converts one `EventList` child element into an [`EventBag`], keeping
/// the event's field order exactly as it appeared on the wire.
pub fn xml_event_to_bag(el: &XmlElement) -> EventBag {
    let kind = EventKind::from_str(el.local_name());
    let mut bag = EventBag::new(kind);
    for child in &el.children {
        if let XmlNode::Element(child_el) = child {
            // Full qualified name, not just the local part: a foreign-namespace
            // child (e.g. `myns:custom`) must keep its prefix to round-trip
            // without reinterpretation; known fields are always unprefixed on
            // the wire, so this is a no-op for them.
            let name = child_el.name.clone();
            if bag.fields.iter().any(|(n, _)| n == &name) {
                // Repeated top-level field name: fold into a list (rare at
                // this level, but keeps the conversion total).
                continue;
            }
            let value = xml_field_to_value(&name, child_el);
            bag.push(name, value);
        }
    }
    bag
}

fn xml_field_to_value(name: &str, el: &XmlElement) -> FieldValue {
    if let Some(item_name) = list_item_name(name) {
        let items = el
            .children_named(item_name)
            .map(|item| xml_list_item_to_value(item_name, item))
            .collect();
        return FieldValue::List(items);
    }
    if is_timestamp_field(name) {
        if let Some(text) = leaf_text(el) {
            return FieldValue::Scalar(classify_scalar(name, text));
        }
    }
    xml_generic_to_value(el)
}

/// `Some(text)` when `el` has no element children (i.e. is a true leaf),
/// `None` when it has structure and must go through the generic fallback.
fn leaf_text(el: &XmlElement) -> Option<String> {
    if el.children.iter().any(|c| matches!(c, XmlNode::Element(_))) {
        None
    } else {
        Some(el.text())
    }
}

fn xml_list_item_to_value(item_name: &str, el: &XmlElement) -> FieldValue {
    if item_name == "epc" || item_name == "correctiveEventID" {
        return FieldValue::Scalar(Scalar::Text(el.text()));
    }
    if item_name == "quantityElement" {
        let mut bag = EventBag::new(None);
        if let Some(epc_class) = el.child("epcClass") {
            bag.push("epcClass", FieldValue::Scalar(Scalar::Text(epc_class.text())));
        }
        if let Some(quantity) = el.child("quantity") {
            let text = quantity.text();
            let value = text
                .parse::<f64>()
                .map(Scalar::Number)
                .unwrap_or(Scalar::Text(text));
            bag.push("quantity", FieldValue::Scalar(value));
        }
        if let Some(uom) = el.child("uom") {
            bag.push("uom", FieldValue::Scalar(Scalar::Text(uom.text())));
        }
        return FieldValue::Bag(Box::new(bag));
    }
    if TYPED_LEAF_FIELDS.contains(&item_name) {
        let mut bag = EventBag::new(None);
        if let Some(ty) = el.attr("type") {
            bag.push("type", FieldValue::text(ty.to_string()));
        }
        bag.push(item_name, FieldValue::text(el.text()));
        return FieldValue::Bag(Box::new(bag));
    }
    xml_generic_to_value(el)
}

/// Generic structural fallback: an element with only text becomes a
/// scalar; an element whose children repeat a name becomes a list under
/// that name; otherwise it becomes a nested bag, one field per distinct
/// child name, in first-seen order.
fn xml_generic_to_value(el: &XmlElement) -> FieldValue {
    let child_elements: Vec<&XmlElement> = el
        .children
        .iter()
        .filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
        .collect();

    if child_elements.is_empty() {
        return FieldValue::Scalar(Scalar::Text(el.text()));
    }

    let mut bag = EventBag::new(None);
    for (k, v) in &el.attrs {
        bag.push(k.clone(), FieldValue::text(v.clone()));
    }

    let mut seen: Vec<&str> = Vec::new();
    for child in &child_elements {
        let name = child.local_name();
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        let siblings: Vec<&&XmlElement> = child_elements
            .iter()
            .filter(|c| c.local_name() == name)
            .collect();
        if siblings.len() > 1 {
            let items = siblings
                .iter()
                .map(|s| xml_generic_to_value(s))
                .collect();
            bag.push(name.to_string(), FieldValue::List(items));
        } else if is_timestamp_field(name) {
            bag.push(name.to_string(), xml_field_to_value(name, child));
        } else {
            bag.push(name.to_string(), xml_generic_to_value(child));
        }
    }
    FieldValue::Bag(Box::new(bag))
}

// ---------------------------------------------------------------------
// EventBag -> XML
// ---------------------------------------------------------------------

/// Converts an [`EventBag`] back into the `XmlElement` for one event,
/// named for `kind`.
pub fn bag_to_xml_event(bag: &EventBag, kind: EventKind) -> XmlElement {
    let mut el = XmlElement::new(kind.as_str());
    for (name, value) in &bag.fields {
        el.children
            .push(XmlNode::Element(field_value_to_xml(name, value)));
    }
    el
}

fn field_value_to_xml(name: &str, value: &FieldValue) -> XmlElement {
    match value {
        FieldValue::Scalar(s) => XmlElement::with_text(name, s.as_str().into_owned()),
        FieldValue::List(items) => {
            let item_name = list_item_name(name).unwrap_or("item");
            let mut container = XmlElement::new(name);
            for item in items {
                container
                    .children
                    .push(XmlNode::Element(list_item_to_xml(item_name, item)));
            }
            container
        }
        FieldValue::Bag(bag) => bag_to_xml_generic(name, bag),
    }
}

fn list_item_to_xml(item_name: &str, value: &FieldValue) -> XmlElement {
    match value {
        FieldValue::Scalar(s) => XmlElement::with_text(item_name, s.as_str().into_owned()),
        FieldValue::Bag(bag) if item_name == "quantityElement" => {
            let mut el = XmlElement::new(item_name);
            for (k, v) in &bag.fields {
                if let FieldValue::Scalar(s) = v {
                    el.children
                        .push(XmlNode::Element(XmlElement::with_text(k, s.as_str().into_owned())));
                }
            }
            el
        }
        FieldValue::Bag(bag) if TYPED_LEAF_FIELDS.contains(&item_name) => {
            let mut el = XmlElement::new(item_name);
            if let Some(FieldValue::Scalar(ty)) = bag.get("type") {
                el.set_attr("type", ty.as_str().into_owned());
            }
            if let Some(FieldValue::Scalar(text)) = bag.get(item_name) {
                el.children
                    .push(XmlNode::Text(text.as_str().into_owned()));
            }
            el
        }
        FieldValue::Bag(bag) => bag_to_xml_generic(item_name, bag),
        FieldValue::List(_) => bag_to_xml_generic(item_name, &EventBag::new(None)),
    }
}

fn bag_to_xml_generic(name: &str, bag: &EventBag) -> XmlElement {
    let mut el = XmlElement::new(name);
    for (k, v) in &bag.fields {
        if k == "type" {
            if let FieldValue::Scalar(s) = v {
                el.set_attr("type", s.as_str().into_owned());
                continue;
            }
        }
        el.children
            .push(XmlNode::Element(field_value_to_xml(k, v)));
    }
    el
}

// ---------------------------------------------------------------------
// EventBag <-> serde_json::Value
// ---------------------------------------------------------------------

pub fn bag_to_json_value(bag: &EventBag, namespaces: &NamespaceMap) -> Value {
    let mut map = Map::new();
    if let Some(kind) = bag.kind {
        map.insert("type".to_string(), Value::String(kind.as_str().to_string()));
    }
    for (name, value) in &bag.fields {
        map.insert(
            json_key_for(name, namespaces),
            field_value_to_json(value, namespaces),
        );
    }
    Value::Object(map)
}

fn field_value_to_json(value: &FieldValue, namespaces: &NamespaceMap) -> Value {
    match value {
        FieldValue::Scalar(Scalar::Number(n)) => {
            serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)
        }
        FieldValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
        FieldValue::Scalar(s) => Value::String(s.as_str().into_owned()),
        FieldValue::List(items) => {
            Value::Array(items.iter().map(|i| field_value_to_json(i, namespaces)).collect())
        }
        FieldValue::Bag(bag) => {
            let mut map = Map::new();
            for (k, v) in &bag.fields {
                map.insert(json_key_for(k, namespaces), field_value_to_json(v, namespaces));
            }
            Value::Object(map)
        }
    }
}

/// A foreign-namespace element's JSON key carries its prefix alias
/// (e.g. `myns:custom`) rather than being renamed; known fields pass
/// through unchanged since EPCIS XML and JSON-LD already share camelCase
/// names for the core vocabulary.
fn json_key_for(name: &str, _namespaces: &NamespaceMap) -> String {
    name.to_string()
}

pub fn json_value_to_bag(value: &Value) -> EventBag {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .and_then(EventKind::from_str);
    let mut bag = EventBag::new(kind);
    if let Value::Object(map) = value {
        for (k, v) in map {
            if k == "type" {
                continue;
            }
            bag.push(k.clone(), json_value_to_field_value_named(k, v));
        }
    }
    bag
}

fn json_value_to_field_value_named(name: &str, value: &Value) -> FieldValue {
    if let Value::String(s) = value {
        if is_timestamp_field(name) {
            return FieldValue::Scalar(classify_scalar(name, s.clone()));
        }
    }
    json_value_to_field_value(value)
}

fn json_value_to_field_value(value: &Value) -> FieldValue {
    match value {
        Value::String(s) => FieldValue::Scalar(Scalar::Text(s.clone())),
        Value::Number(n) => FieldValue::Scalar(Scalar::Number(n.as_f64().unwrap_or_default())),
        Value::Bool(b) => FieldValue::Scalar(Scalar::Bool(*b)),
        Value::Null => FieldValue::Scalar(Scalar::Text(String::new())),
        Value::Array(items) => {
            FieldValue::List(items.iter().map(json_value_to_field_value).collect())
        }
        Value::Object(map) => {
            let mut bag = EventBag::new(None);
            for (k, v) in map {
                bag.push(k.clone(), json_value_to_field_value_named(k, v));
            }
            FieldValue::Bag(Box::new(bag))
        }
    }
}
