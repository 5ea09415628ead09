//! Snapshot capture and restore.

use crate::{PersistError, PersistResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use weave_core::{EntityId, TypeId, Value};
use weave_dispatch::{Context, DispatchError};
use weave_feature::{Entity, Feature, ReferenceMode};

/// The persisted features of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub type_name: String,
    /// Exported values by feature name.
    pub features: BTreeMap<String, Value>,
    /// Copies of the entities referenced by value-mode features, by feature
    /// name. Each copy keeps the id it had when captured so the feature value
    /// can be re-linked to the restored copy.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub embedded: BTreeMap<String, Vec<EntitySnapshot>>,
}

/// A set of entities captured together.
///
/// References between captured entities are kept by id, so restoring the
/// snapshot in one go re-links them. Features in [`ReferenceMode::Value`]
/// carry their referenced entities with them instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entities: Vec<EntitySnapshot>,
}

/// Counters from a restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreStats {
    /// Number of entities spawned, embedded copies included.
    pub entities: usize,
    /// Number of feature values imported.
    pub features: usize,
}

impl Snapshot {
    /// Capture the persistent features of `entities`.
    pub fn capture(context: &Context, entities: &[Rc<Entity>]) -> Self {
        let kept: HashSet<EntityId> = entities
            .iter()
            .filter(|entity| !entity.is_transient())
            .map(|entity| entity.id())
            .collect();

        let mut capture = Capture {
            context,
            kept: &kept,
            path: Vec::new(),
            dropped: 0,
            copies: 0,
        };
        let snapshot = Snapshot {
            entities: entities
                .iter()
                .filter(|entity| !entity.is_transient())
                .map(|entity| capture.entity(entity))
                .collect(),
        };

        tracing::debug!(
            entities = snapshot.entities.len(),
            skipped = entities.len() - snapshot.entities.len(),
            embedded = capture.copies,
            dropped_references = capture.dropped,
            "captured snapshot"
        );
        snapshot
    }

    pub fn to_json(&self) -> PersistResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> PersistResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Spawn every captured entity with its original id and import its
    /// feature values. Handlers do not run.
    ///
    /// Every id is checked before anything is spawned: an id this context
    /// already handed out, or one listed twice, fails the whole restore.
    /// Embedded copies are spawned with fresh ids.
    pub fn restore(&self, context: &Context) -> PersistResult<(Vec<Rc<Entity>>, RestoreStats)> {
        let mut seen = HashSet::new();
        let mut types = Vec::with_capacity(self.entities.len());
        for snap in &self.entities {
            if context.is_issued(snap.id) || !seen.insert(snap.id) {
                return Err(DispatchError::DuplicateEntity(snap.id).into());
            }
            types.push(type_of(context, snap)?);
        }

        // All top-level ids are reserved before any copy takes a fresh one.
        let mut restored = Vec::with_capacity(self.entities.len());
        for (snap, type_id) in self.entities.iter().zip(types) {
            restored.push(context.spawn_with_id(snap.id, type_id)?);
        }

        let mut stats = RestoreStats::default();
        for (snap, entity) in self.entities.iter().zip(&restored) {
            import_features(context, snap, entity, &mut stats)?;
        }

        tracing::debug!(
            entities = stats.entities,
            features = stats.features,
            "restored snapshot"
        );
        Ok((restored, stats))
    }
}

/// Walk state for one capture.
struct Capture<'a> {
    context: &'a Context,
    kept: &'a HashSet<EntityId>,
    /// Entities being embedded, outermost first; a reference back onto this
    /// path is not embedded again.
    path: Vec<EntityId>,
    dropped: usize,
    copies: usize,
}

impl Capture<'_> {
    fn entity(&mut self, entity: &Entity) -> EntitySnapshot {
        self.path.push(entity.id());
        let mut features = BTreeMap::new();
        let mut embedded = BTreeMap::new();

        for feature in entity.features().iter() {
            let Some(persistable) = feature.as_persistable() else {
                continue;
            };
            if !persistable.is_persistent() {
                continue;
            }
            let name = feature.name().to_string();
            let value = match persistable.reference_mode() {
                ReferenceMode::Reference => {
                    let kept = self.kept;
                    scrub_slot(persistable.export(), &|id| kept.contains(&id), &mut self.dropped)
                }
                ReferenceMode::Value => {
                    let (value, copies) = self.embed(persistable.export());
                    if !copies.is_empty() {
                        embedded.insert(name.clone(), copies);
                    }
                    value
                }
            };
            features.insert(name, value);
        }

        self.path.pop();
        EntitySnapshot {
            id: entity.id(),
            type_name: self.context.hierarchy().type_name(entity.type_id()),
            features,
            embedded,
        }
    }

    /// Copy every live, non-transient entity `value` refers to. References
    /// that cannot be embedded follow the usual scrub policy.
    fn embed(&mut self, value: Value) -> (Value, Vec<EntitySnapshot>) {
        let mut referenced = Vec::new();
        collect_refs(&value, &mut referenced);

        let mut embedded = HashSet::new();
        let mut copies = Vec::new();
        for id in referenced {
            if embedded.contains(&id) || self.path.contains(&id) {
                continue;
            }
            let Some(target) = self.context.entity(id) else {
                continue;
            };
            if target.is_transient() {
                continue;
            }
            copies.push(self.entity(&target));
            embedded.insert(id);
            self.copies += 1;
        }

        let value = scrub_slot(value, &|id| embedded.contains(&id), &mut self.dropped);
        (value, copies)
    }
}

fn type_of(context: &Context, snap: &EntitySnapshot) -> PersistResult<TypeId> {
    context
        .hierarchy()
        .get_type_id(&snap.type_name)
        .ok_or_else(|| PersistError::UnknownType(snap.type_name.clone()))
}

/// Import the features of `snap` into `entity`, spawning embedded copies
/// first so their new ids can be linked in.
fn import_features(
    context: &Context,
    snap: &EntitySnapshot,
    entity: &Entity,
    stats: &mut RestoreStats,
) -> PersistResult<()> {
    stats.entities += 1;

    for (name, value) in &snap.features {
        let mut value = value.clone();
        if let Some(copies) = snap.embedded.get(name) {
            let mut relinked = HashMap::with_capacity(copies.len());
            for copy in copies {
                let copy_entity = context.spawn_typed(type_of(context, copy)?)?;
                import_features(context, copy, &copy_entity, stats)?;
                relinked.insert(copy.id, copy_entity.id());
            }
            value = relink(value, &relinked);
        }

        let entry = context
            .definition(name)
            .ok_or_else(|| PersistError::UnknownDefinition(name.clone()))?;
        let feature = entry.fetch(entity)?;
        let persistable = feature
            .as_persistable()
            .ok_or_else(|| PersistError::NotPersistable(name.clone()))?;
        persistable.import(value)?;
        stats.features += 1;
    }
    Ok(())
}

fn collect_refs(value: &Value, out: &mut Vec<EntityId>) {
    match value {
        Value::EntityRef(id) => out.push(*id),
        Value::List(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

fn relink(value: Value, ids: &HashMap<EntityId, EntityId>) -> Value {
    match value {
        Value::EntityRef(id) => Value::EntityRef(ids.get(&id).copied().unwrap_or(id)),
        Value::List(items) => {
            Value::List(items.into_iter().map(|item| relink(item, ids)).collect())
        }
        other => other,
    }
}

/// A single slot: a reference to an entity that is not kept becomes null.
fn scrub_slot(value: Value, keep: &dyn Fn(EntityId) -> bool, dropped: &mut usize) -> Value {
    match value {
        Value::EntityRef(id) if !keep(id) => {
            *dropped += 1;
            Value::Null
        }
        Value::List(items) => Value::List(scrub_list(items, keep, dropped)),
        other => other,
    }
}

/// A sequence: references to entities that are not kept are removed.
fn scrub_list(
    items: Vec<Value>,
    keep: &dyn Fn(EntityId) -> bool,
    dropped: &mut usize,
) -> Vec<Value> {
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::EntityRef(id) if !keep(id) => *dropped += 1,
            Value::List(inner) => result.push(Value::List(scrub_list(inner, keep, dropped))),
            other => result.push(other),
        }
    }
    result
}
