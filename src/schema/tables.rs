//! Concrete field tables for the five event kinds.
//!
//! The "event-specific required field" for each kind — the field whose
//! presence (even as an explicit empty element) the 1.2 XSD demands — is
//! the one place this crate encodes domain knowledge left
//! open; see DESIGN.md for the Open Question this resolves.

use super::{EventTable, FeatureFlag, FieldSpec, WrapperPolicy};
use crate::model::EventKind;

const fn flat(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        wrapper: WrapperPolicy::Flat,
        flag: None,
        required_empty_in_1_2: false,
    }
}

const fn required_flat(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        wrapper: WrapperPolicy::Flat,
        flag: None,
        required_empty_in_1_2: true,
    }
}

const fn base_ext(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        wrapper: WrapperPolicy::BaseExtension,
        flag: None,
        required_empty_in_1_2: false,
    }
}

const fn ext(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        wrapper: WrapperPolicy::Extension,
        flag: None,
        required_empty_in_1_2: false,
    }
}

const fn ext_ext(name: &'static str, flag: FeatureFlag) -> FieldSpec {
    FieldSpec {
        name,
        wrapper: WrapperPolicy::ExtensionExtension,
        flag: Some(flag),
        required_empty_in_1_2: false,
    }
}

const OBJECT_EVENT_FIELDS: &[FieldSpec] = &[
    flat("eventTime"),
    flat("recordTime"),
    flat("eventTimeZoneOffset"),
    base_ext("eventID"),
    base_ext("errorDeclaration"),
    required_flat("epcList"),
    flat("action"),
    flat("bizStep"),
    flat("disposition"),
    flat("readPoint"),
    flat("bizLocation"),
    flat("bizTransactionList"),
    ext("quantityList"),
    ext("sourceList"),
    ext("destinationList"),
    ext("ilmd"),
    ext_ext("sensorElementList", FeatureFlag::IncludeSensorElementList),
    ext_ext(
        "persistentDisposition",
        FeatureFlag::IncludePersistentDisposition,
    ),
];

const OBJECT_EVENT_ORDER_2_0: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "eventID",
    "errorDeclaration",
    "epcList",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "bizTransactionList",
    "quantityList",
    "sourceList",
    "destinationList",
    "ilmd",
    "sensorElementList",
    "persistentDisposition",
];

const OBJECT_EVENT_ORDER_1_2: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "baseExtension",
    "epcList",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "bizTransactionList",
    "extension",
];

const AGGREGATION_EVENT_FIELDS: &[FieldSpec] = &[
    flat("eventTime"),
    flat("recordTime"),
    flat("eventTimeZoneOffset"),
    base_ext("eventID"),
    base_ext("errorDeclaration"),
    required_flat("parentID"),
    required_flat("childEPCs"),
    flat("action"),
    flat("bizStep"),
    flat("disposition"),
    flat("readPoint"),
    flat("bizLocation"),
    flat("bizTransactionList"),
    ext("childQuantityList"),
    ext("sourceList"),
    ext("destinationList"),
    ext_ext("sensorElementList", FeatureFlag::IncludeSensorElementList),
    ext_ext(
        "persistentDisposition",
        FeatureFlag::IncludePersistentDisposition,
    ),
];

const AGGREGATION_EVENT_ORDER_2_0: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "eventID",
    "errorDeclaration",
    "parentID",
    "childEPCs",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "bizTransactionList",
    "childQuantityList",
    "sourceList",
    "destinationList",
    "sensorElementList",
    "persistentDisposition",
];

const AGGREGATION_EVENT_ORDER_1_2: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "baseExtension",
    "parentID",
    "childEPCs",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "bizTransactionList",
    "extension",
];

const TRANSACTION_EVENT_FIELDS: &[FieldSpec] = &[
    flat("eventTime"),
    flat("recordTime"),
    flat("eventTimeZoneOffset"),
    base_ext("eventID"),
    base_ext("errorDeclaration"),
    flat("parentID"),
    required_flat("bizTransactionList"),
    flat("epcList"),
    flat("action"),
    flat("bizStep"),
    flat("disposition"),
    flat("readPoint"),
    flat("bizLocation"),
    ext("quantityList"),
    ext("sourceList"),
    ext("destinationList"),
    ext_ext("sensorElementList", FeatureFlag::IncludeSensorElementList),
    ext_ext(
        "persistentDisposition",
        FeatureFlag::IncludePersistentDisposition,
    ),
];

const TRANSACTION_EVENT_ORDER_2_0: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "eventID",
    "errorDeclaration",
    "parentID",
    "bizTransactionList",
    "epcList",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "quantityList",
    "sourceList",
    "destinationList",
    "sensorElementList",
    "persistentDisposition",
];

const TRANSACTION_EVENT_ORDER_1_2: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "baseExtension",
    "parentID",
    "bizTransactionList",
    "epcList",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "extension",
];

const TRANSFORMATION_EVENT_FIELDS: &[FieldSpec] = &[
    flat("eventTime"),
    flat("recordTime"),
    flat("eventTimeZoneOffset"),
    base_ext("eventID"),
    base_ext("errorDeclaration"),
    required_flat("inputEPCList"),
    flat("outputEPCList"),
    flat("transformationID"),
    flat("bizStep"),
    flat("disposition"),
    flat("readPoint"),
    flat("bizLocation"),
    flat("bizTransactionList"),
    ext("inputQuantityList"),
    ext("outputQuantityList"),
    ext("sourceList"),
    ext("destinationList"),
    ext("ilmd"),
    ext_ext("sensorElementList", FeatureFlag::IncludeSensorElementList),
    ext_ext(
        "persistentDisposition",
        FeatureFlag::IncludePersistentDisposition,
    ),
];

const TRANSFORMATION_EVENT_ORDER_2_0: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "eventID",
    "errorDeclaration",
    "inputEPCList",
    "outputEPCList",
    "transformationID",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "bizTransactionList",
    "inputQuantityList",
    "outputQuantityList",
    "sourceList",
    "destinationList",
    "ilmd",
    "sensorElementList",
    "persistentDisposition",
];

const TRANSFORMATION_EVENT_ORDER_1_2: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "baseExtension",
    "inputEPCList",
    "outputEPCList",
    "transformationID",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "bizTransactionList",
    "extension",
];

const ASSOCIATION_EVENT_FIELDS: &[FieldSpec] = &[
    flat("eventTime"),
    flat("recordTime"),
    flat("eventTimeZoneOffset"),
    base_ext("eventID"),
    base_ext("errorDeclaration"),
    required_flat("parentID"),
    flat("childEPCs"),
    flat("action"),
    flat("bizStep"),
    flat("disposition"),
    flat("readPoint"),
    flat("bizLocation"),
    ext("childQuantityList"),
    ext_ext("sensorElementList", FeatureFlag::IncludeSensorElementList),
    ext_ext(
        "persistentDisposition",
        FeatureFlag::IncludePersistentDisposition,
    ),
];

const ASSOCIATION_EVENT_ORDER_2_0: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "eventID",
    "errorDeclaration",
    "parentID",
    "childEPCs",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "childQuantityList",
    "sensorElementList",
    "persistentDisposition",
];

// AssociationEvent only exists in 2.0; its 1.2 ordering is only relevant in
// the sense that it is wrapped in `extension/extension` and is gated by
// `includeAssociationEvent`. The fields within keep the same relative order.
const ASSOCIATION_EVENT_ORDER_1_2: &[&str] = &[
    "eventTime",
    "recordTime",
    "eventTimeZoneOffset",
    "baseExtension",
    "parentID",
    "childEPCs",
    "action",
    "bizStep",
    "disposition",
    "readPoint",
    "bizLocation",
    "extension",
];

/// Returns the field table for `kind`.
pub fn event_table(kind: EventKind) -> EventTable {
    match kind {
        EventKind::ObjectEvent => EventTable {
            kind,
            order_2_0: OBJECT_EVENT_ORDER_2_0,
            order_1_2: OBJECT_EVENT_ORDER_1_2,
            fields: OBJECT_EVENT_FIELDS,
            outer_wrap_depth_1_2: 0,
        },
        EventKind::AggregationEvent => EventTable {
            kind,
            order_2_0: AGGREGATION_EVENT_ORDER_2_0,
            order_1_2: AGGREGATION_EVENT_ORDER_1_2,
            fields: AGGREGATION_EVENT_FIELDS,
            outer_wrap_depth_1_2: 0,
        },
        EventKind::TransactionEvent => EventTable {
            kind,
            order_2_0: TRANSACTION_EVENT_ORDER_2_0,
            order_1_2: TRANSACTION_EVENT_ORDER_1_2,
            fields: TRANSACTION_EVENT_FIELDS,
            outer_wrap_depth_1_2: 0,
        },
        EventKind::TransformationEvent => EventTable {
            kind,
            order_2_0: TRANSFORMATION_EVENT_ORDER_2_0,
            order_1_2: TRANSFORMATION_EVENT_ORDER_1_2,
            fields: TRANSFORMATION_EVENT_FIELDS,
            outer_wrap_depth_1_2: 1,
        },
        EventKind::AssociationEvent => EventTable {
            kind,
            order_2_0: ASSOCIATION_EVENT_ORDER_2_0,
            order_1_2: ASSOCIATION_EVENT_ORDER_1_2,
            fields: ASSOCIATION_EVENT_FIELDS,
            outer_wrap_depth_1_2: 2,
        },
    }
}
