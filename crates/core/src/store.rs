//! Per-responder response storage.

use std::collections::BTreeMap;

use crate::types::{EvaluationResponse, ItemId, Responder, ResponseValue};

/// Answers of one responder, at most one per item.
///
/// A session owns two of these (employee and evaluator). Writes made through
/// the session also refresh the owning group's completion flag; writing to
/// the store directly does not.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    responder: Responder,
    entries: BTreeMap<ItemId, ResponseValue>,
}

impl ResponseStore {
    pub fn new(responder: Responder) -> Self {
        ResponseStore {
            responder,
            entries: BTreeMap::new(),
        }
    }

    /// Build a store from responses read back from the backend.
    /// Duplicate item ids keep the last value.
    pub fn from_responses(
        responder: Responder,
        responses: impl IntoIterator<Item = EvaluationResponse>,
    ) -> Self {
        let mut store = ResponseStore::new(responder);
        for r in responses {
            store.set(r.item_id, r.value);
        }
        store
    }

    pub fn responder(&self) -> Responder {
        self.responder
    }

    /// Upsert the answer for `item_id`, returning the previous one.
    pub fn set(
        &mut self,
        item_id: ItemId,
        value: impl Into<ResponseValue>,
    ) -> Option<ResponseValue> {
        self.entries.insert(item_id, value.into())
    }

    pub fn get(&self, item_id: ItemId) -> Option<&ResponseValue> {
        self.entries.get(&item_id)
    }

    pub fn remove(&mut self, item_id: ItemId) -> Option<ResponseValue> {
        self.entries.remove(&item_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Responses ordered by item id, ready to be sent as one batch.
    pub fn responses(&self) -> Vec<EvaluationResponse> {
        self.entries
            .iter()
            .map(|(item_id, value)| EvaluationResponse {
                item_id: *item_id,
                value: value.clone(),
            })
            .collect()
    }
}
