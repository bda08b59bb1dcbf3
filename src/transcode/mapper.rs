//! Mapping injection: a caller-supplied
//! hook that runs once per event, after the wire form has been parsed
//! into an [`EventBag`] and before it is re-emitted, so callers can
//! rewrite field values (e.g. rewrite an internal EPC scheme) without
//! re-implementing the parse/emit halves of the transcoder.

use crate::error::EpcisResult;
use crate::model::EventBag;

/// Implementors receive the fully-parsed event and return the (possibly
/// modified) bag that gets emitted on the other side. Returning an error
/// is propagated as [`crate::error::EpcisError::MappingFailure`]-shaped
/// failure through the pipeline's normal error channel.
pub trait EventMapper: Send + Sync {
    fn map_event(&self, bag: EventBag) -> EpcisResult<EventBag>;
}

/// A mapper that forwards every event unchanged; the default when a
/// conversion request supplies none.
pub struct IdentityMapper;

impl EventMapper for IdentityMapper {
    fn map_event(&self, bag: EventBag) -> EpcisResult<EventBag> {
        Ok(bag)
    }
}

impl<F> EventMapper for F
where
    F: Fn(EventBag) -> EpcisResult<EventBag> + Send + Sync,
{
    fn map_event(&self, bag: EventBag) -> EpcisResult<EventBag> {
        self(bag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, FieldValue};

    #[test]
    fn identity_mapper_passes_the_bag_through() {
        let mut bag = EventBag::new(Some(EventKind::ObjectEvent));
        bag.push("action", FieldValue::text("ADD"));
        let out = IdentityMapper.map_event(bag.clone()).unwrap();
        assert_eq!(out, bag);
    }

    #[test]
    fn closures_can_be_used_as_mappers() {
        let mapper = |mut bag: EventBag| {
            bag.push("injected", FieldValue::text("yes"));
            Ok(bag)
        };
        let bag = EventBag::new(Some(EventKind::ObjectEvent));
        let out = mapper.map_event(bag).unwrap();
        assert_eq!(out.get("injected"), Some(&FieldValue::text("yes")));
    }
}
