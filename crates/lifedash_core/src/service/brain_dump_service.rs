//! Brain-dump capture and triage.
//!
//! # Invariants
//! - New items always start `unsorted` and not completed.
//! - Edits patch only the addressed element of the raw array; undecodable
//!   neighbours and unknown fields are written back untouched, so positions
//!   (and the unified ids derived from them) stay put.
//! - Every write replaces the whole `simpleBrainDumpItems` value, so an
//!   attached `TaskIntegrationHub` reconciles after each call.

use crate::clock::Clock;
use crate::model::brain_dump::{split_fragments, BrainDumpId, BrainDumpItem, BrainDumpPriority};
use crate::store::keys::BRAIN_DUMP_ITEMS;
use crate::store::{KeyValueStore, StoreResult};
use log::info;
use serde_json::{Map, Value};
use std::rc::Rc;

pub struct BrainDumpService {
    store: KeyValueStore,
    clock: Rc<dyn Clock>,
}

impl BrainDumpService {
    pub fn new(store: KeyValueStore) -> Self {
        let clock = store.clock();
        Self { store, clock }
    }

    pub fn list(&self) -> Vec<BrainDumpItem> {
        self.store.get_collection(BRAIN_DUMP_ITEMS)
    }

    pub fn list_by_priority(&self, priority: BrainDumpPriority) -> Vec<BrainDumpItem> {
        self.list()
            .into_iter()
            .filter(|item| item.priority == priority)
            .collect()
    }

    /// Appends one unsorted item per comma/newline separated fragment.
    ///
    /// Returns the created items; blank input writes nothing.
    pub fn capture(&self, text: &str) -> StoreResult<Vec<BrainDumpItem>> {
        let now_ms = self.clock.now_ms();
        let created: Vec<BrainDumpItem> = split_fragments(text)
            .into_iter()
            .map(|fragment| BrainDumpItem::new(fragment, now_ms))
            .collect();
        if created.is_empty() {
            return Ok(created);
        }

        let mut items = self.store.get_array(BRAIN_DUMP_ITEMS);
        for item in &created {
            items.push(serde_json::to_value(item)?);
        }
        let total = items.len();
        self.store.set_value(BRAIN_DUMP_ITEMS, Value::Array(items))?;
        info!(
            "event=brain_dump_capture module=brain_dump status=ok created={} total={}",
            created.len(),
            total
        );
        Ok(created)
    }

    /// Moves an item to another triage bucket. Returns `false` if unknown.
    pub fn set_priority(&self, id: BrainDumpId, priority: BrainDumpPriority) -> StoreResult<bool> {
        let patched = self.patch(id, |fields| {
            fields.insert("priority".to_string(), Value::from(priority.as_str()));
        })?;
        Ok(patched.is_some())
    }

    /// Flips completion. Returns the new state, or `None` if unknown.
    pub fn toggle_completed(&self, id: BrainDumpId) -> StoreResult<Option<bool>> {
        self.patch(id, |fields| {
            let completed = !fields
                .get("completed")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            fields.insert("completed".to_string(), Value::Bool(completed));
            completed
        })
    }

    pub fn delete(&self, id: BrainDumpId) -> StoreResult<bool> {
        let mut items = self.store.get_array(BRAIN_DUMP_ITEMS);
        let before = items.len();
        items.retain(|value| element_id(value) != Some(id));
        if items.len() == before {
            return Ok(false);
        }
        self.store.set_value(BRAIN_DUMP_ITEMS, Value::Array(items))?;
        info!("event=brain_dump_delete module=brain_dump status=ok id={id}");
        Ok(true)
    }

    fn patch<R>(
        &self,
        id: BrainDumpId,
        apply: impl FnOnce(&mut Map<String, Value>) -> R,
    ) -> StoreResult<Option<R>> {
        let mut items = self.store.get_array(BRAIN_DUMP_ITEMS);
        let Some(fields) = items
            .iter_mut()
            .find(|value| element_id(value) == Some(id))
            .and_then(Value::as_object_mut)
        else {
            return Ok(None);
        };
        let result = apply(fields);
        self.store.set_value(BRAIN_DUMP_ITEMS, Value::Array(items))?;
        Ok(Some(result))
    }
}

fn element_id(value: &Value) -> Option<BrainDumpId> {
    value.get("id")?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::BrainDumpService;
    use crate::clock::FixedClock;
    use crate::model::brain_dump::{BrainDumpItem, BrainDumpPriority};
    use crate::service::task_hub::{TaskComponent, TaskFilters, TaskIntegrationHub};
    use crate::store::keys::BRAIN_DUMP_ITEMS;
    use crate::store::{KeyValueStore, MemoryBackend};
    use serde_json::json;
    use std::rc::Rc;
    use uuid::Uuid;

    fn service() -> BrainDumpService {
        let store = KeyValueStore::with_clock(MemoryBackend::new(), Rc::new(FixedClock::new(7, 9)));
        BrainDumpService::new(store)
    }

    #[test]
    fn capture_splits_and_appends_unsorted_items() {
        let service = service();
        service.capture("call mom, taxes").unwrap();
        let created = service.capture("dentist\n").unwrap();
        assert_eq!(created.len(), 1);

        let items = service.list();
        let texts: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
        assert_eq!(texts, vec!["call mom", "taxes", "dentist"]);
        assert!(items
            .iter()
            .all(|item| item.priority == BrainDumpPriority::Unsorted && item.created_at == 7));
    }

    #[test]
    fn blank_capture_writes_nothing() {
        let service = service();
        assert!(service.capture(" , \n").unwrap().is_empty());
        assert!(service.store.get_value("simpleBrainDumpItems").is_none());
    }

    #[test]
    fn triage_toggle_and_delete() {
        let service = service();
        let created = service.capture("a, b").unwrap();
        let (a, b) = (created[0].id, created[1].id);

        assert!(service.set_priority(a, BrainDumpPriority::High).unwrap());
        assert_eq!(service.list_by_priority(BrainDumpPriority::High).len(), 1);
        assert_eq!(service.toggle_completed(b).unwrap(), Some(true));
        assert_eq!(service.toggle_completed(b).unwrap(), Some(false));

        assert!(service.delete(a).unwrap());
        assert!(!service.delete(a).unwrap());
        assert_eq!(service.list().len(), 1);
    }

    #[test]
    fn unknown_ids_are_reported_not_errors() {
        let service = service();
        let missing = Uuid::new_v4();
        assert!(!service.set_priority(missing, BrainDumpPriority::Low).unwrap());
        assert_eq!(service.toggle_completed(missing).unwrap(), None);
    }

    #[test]
    fn edits_leave_neighbouring_entries_and_identities_alone() {
        let store = KeyValueStore::with_clock(MemoryBackend::new(), Rc::new(FixedClock::new(7, 9)));
        let hub = TaskIntegrationHub::attach(store.clone());
        let service = BrainDumpService::new(store.clone());

        let mut a = BrainDumpItem::new("A", 1);
        a.priority = BrainDumpPriority::High;
        a.from_project = true;
        a.project_name = Some("P".to_string());
        let mut b = BrainDumpItem::new("B", 2);
        b.priority = BrainDumpPriority::Low;
        store
            .set_value(BRAIN_DUMP_ITEMS, json!([{ "garbage": true }, &a, &b]))
            .unwrap();

        let brain_ids = || {
            hub.get_tasks_for_component(TaskComponent::BrainSpace, &TaskFilters::default())
                .into_iter()
                .map(|task| task.id)
                .collect::<Vec<_>>()
        };
        let before = brain_ids();
        assert_eq!(before.len(), 2);

        assert!(service.set_priority(b.id, BrainDumpPriority::Unsorted).unwrap());
        let raw = store.get_array(BRAIN_DUMP_ITEMS);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0], json!({ "garbage": true }));
        assert_eq!(raw[1]["fromProject"], json!(true));
        assert_eq!(raw[1]["projectName"], json!("P"));
        assert_eq!(raw[2]["priority"], json!("unsorted"));
        assert_eq!(brain_ids(), before);

        assert_eq!(service.toggle_completed(a.id).unwrap(), Some(true));
        assert!(service.delete(b.id).unwrap());
        let raw = store.get_array(BRAIN_DUMP_ITEMS);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0], json!({ "garbage": true }));
        assert_eq!(raw[1]["completed"], json!(true));
    }
}
