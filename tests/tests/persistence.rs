//! Snapshot integration tests: persistent features only, transient entities
//! left out, references kept by id.

use pretty_assertions::assert_eq;
use std::rc::Rc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use weave_dispatch::{
    CollectionPropertyDefinition, PropertyDefinition, ReferenceMode, ReferenceStorage,
};
use weave_persist::{PersistError, RestoreStats, Snapshot};
use weave_tests::prelude::*;

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

struct Social {
    family: Family,
    name: Rc<PropertyDefinition>,
    session: Rc<PropertyDefinition>,
    best_friend: Rc<PropertyDefinition>,
    friends: Rc<CollectionPropertyDefinition>,
    pet: Rc<PropertyDefinition>,
    litter: Rc<CollectionPropertyDefinition>,
}

fn social() -> Social {
    let mut family = Family::new().unwrap();
    let name = family.ctx.property("name", ValueType::String).done().unwrap();
    let session = family
        .ctx
        .property("session", ValueType::String)
        .persistent(false)
        .done()
        .unwrap();
    let best_friend = family
        .ctx
        .property("best_friend", ValueType::EntityRef)
        .storage(ReferenceStorage::new())
        .done()
        .unwrap();
    let friends = family
        .ctx
        .collection_property("friends", ValueType::EntityRef)
        .storage(ReferenceStorage::new())
        .done()
        .unwrap();
    let pet = family
        .ctx
        .property("pet", ValueType::EntityRef)
        .storage(ReferenceStorage::new())
        .reference_mode(ReferenceMode::Value)
        .done()
        .unwrap();
    let litter = family
        .ctx
        .collection_property("litter", ValueType::EntityRef)
        .storage(ReferenceStorage::new())
        .reference_mode(ReferenceMode::Value)
        .done()
        .unwrap();
    Social {
        family,
        name,
        session,
        best_friend,
        friends,
        pet,
        litter,
    }
}

#[test]
fn test_round_trip_through_json() {
    let s = social();
    let ann = s.family.ctx.spawn("Child1").unwrap();
    let bob = s.family.ctx.spawn("Child2").unwrap();
    ann.get(&s.name).unwrap().set("Ann").unwrap();
    ann.get(&s.session).unwrap().set("token").unwrap();
    ann.get(&s.best_friend).unwrap().set(bob.id()).unwrap();
    bob.get(&s.name).unwrap().set("Bob").unwrap();
    bob.get(&s.friends).unwrap().add(ann.id()).unwrap();

    let json = Snapshot::capture(&s.family.ctx, &[Rc::clone(&ann), Rc::clone(&bob)])
        .to_json()
        .unwrap();

    let restored_world = social();
    let snapshot = Snapshot::from_json(&json).unwrap();
    let (restored, stats) = snapshot.restore(&restored_world.family.ctx).unwrap();
    assert_eq!(
        stats,
        RestoreStats {
            entities: 2,
            features: 4
        }
    );

    let (ann2, bob2) = (&restored[0], &restored[1]);
    assert_eq!(ann2.id(), ann.id());
    assert_eq!(ann2.type_id(), restored_world.family.child1);
    assert_eq!(ann2.get(&restored_world.name).unwrap().get().unwrap(), Value::from("Ann"));
    assert_eq!(
        ann2.get(&restored_world.best_friend).unwrap().get().unwrap(),
        Value::EntityRef(bob2.id())
    );
    assert_eq!(
        bob2.get(&restored_world.friends).unwrap().get().unwrap(),
        vec![Value::EntityRef(ann2.id())]
    );

    // Not persistent, so back to its initial value.
    assert_eq!(ann2.get(&restored_world.session).unwrap().get().unwrap(), Value::Null);

    // Restored ids are reserved.
    let fresh = restored_world.family.ctx.spawn("Base").unwrap();
    assert!(fresh.id() > bob2.id());
}

#[test]
fn test_transient_entities_are_not_persisted() {
    let s = social();
    let ann = s.family.ctx.spawn("Base").unwrap();
    let ghost = s.family.ctx.spawn("Base").unwrap();
    let cat = s.family.ctx.spawn("Base").unwrap();
    ghost.set_transient(true);

    ann.get(&s.best_friend).unwrap().set(ghost.id()).unwrap();
    let friends = ann.get(&s.friends).unwrap();
    friends.add(ghost.id()).unwrap();
    friends.add(cat.id()).unwrap();
    ghost.get(&s.name).unwrap().set("Boo").unwrap();

    let snapshot = Snapshot::capture(&s.family.ctx, &[Rc::clone(&ann), ghost, Rc::clone(&cat)]);
    assert_eq!(snapshot.entities.len(), 2);

    let ann_snapshot = &snapshot.entities[0];
    assert_eq!(ann_snapshot.id, ann.id());
    // A single slot becomes null; a sequence shrinks.
    assert_eq!(ann_snapshot.features["best_friend"], Value::Null);
    assert_eq!(
        ann_snapshot.features["friends"],
        Value::List(vec![Value::EntityRef(cat.id())])
    );

    // Capturing never touches the live values.
    assert_eq!(friends.len().unwrap(), 2);
}

#[test]
fn test_restore_does_not_run_handlers() {
    let s = social();
    let ann = s.family.ctx.spawn("Base").unwrap();
    ann.get(&s.name).unwrap().set("Ann").unwrap();
    let snapshot = Snapshot::capture(&s.family.ctx, &[ann]);

    let target = social();
    let recorder = Recorder::new();
    let spy = recorder.handler("spy", Step::Continue);
    target
        .name
        .add_default_handler(SETTER, "spy", target.family.base, spy)
        .unwrap();

    let (restored, _) = snapshot.restore(&target.family.ctx).unwrap();
    assert_eq!(restored[0].get(&target.name).unwrap().get().unwrap(), Value::from("Ann"));
    assert!(recorder.calls().is_empty());
}

mod identity {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_restore_into_populated_context_keeps_ids_unique() {
        let s = social();
        let ann = s.family.ctx.spawn("Base").unwrap();
        ann.get(&s.name).unwrap().set("Ann").unwrap();
        let snapshot = Snapshot::capture(&s.family.ctx, &[Rc::clone(&ann)]);

        let target = social();
        let existing = target.family.ctx.spawn("Base").unwrap();
        assert_eq!(existing.id(), ann.id());

        let err = snapshot.restore(&target.family.ctx).unwrap_err();
        assert!(matches!(
            err,
            PersistError::Dispatch(DispatchError::DuplicateEntity(id)) if id == ann.id()
        ));

        // A failed restore spawns nothing.
        let next = target.family.ctx.spawn("Base").unwrap();
        assert_ne!(next.id(), existing.id());
        assert_eq!(next.id(), EntityId::new(existing.id().raw() + 1));
    }

    #[test]
    fn test_repeated_id_in_snapshot_rejected() {
        let s = social();
        let ann = s.family.ctx.spawn("Base").unwrap();
        let snapshot = Snapshot::capture(&s.family.ctx, &[Rc::clone(&ann), Rc::clone(&ann)]);
        assert_eq!(snapshot.entities.len(), 2);

        let target = social();
        assert!(matches!(
            snapshot.restore(&target.family.ctx),
            Err(PersistError::Dispatch(DispatchError::DuplicateEntity(_)))
        ));
        assert!(!target.family.ctx.is_issued(ann.id()));
    }

    #[test]
    fn test_last_entity_id_is_an_error() {
        let s = social();
        let json = r#"{"entities":[{"id":18446744073709551615,"type_name":"Base","features":{}}]}"#;
        let snapshot = Snapshot::from_json(json).unwrap();

        assert!(matches!(
            snapshot.restore(&s.family.ctx),
            Err(PersistError::Dispatch(DispatchError::EntityIdsExhausted(_)))
        ));
    }
}

mod by_value {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_mode_embeds_referenced_entities() {
        let s = social();
        let ann = s.family.ctx.spawn("Child1").unwrap();
        let rex = s.family.ctx.spawn("Child2").unwrap();
        let kit = s.family.ctx.spawn("Base").unwrap();
        let pup = s.family.ctx.spawn("Base").unwrap();
        ann.get(&s.name).unwrap().set("Ann").unwrap();
        rex.get(&s.name).unwrap().set("Rex").unwrap();
        kit.get(&s.name).unwrap().set("Kit").unwrap();
        pup.get(&s.name).unwrap().set("Pup").unwrap();
        ann.get(&s.pet).unwrap().set(rex.id()).unwrap();
        let litter = ann.get(&s.litter).unwrap();
        litter.add(kit.id()).unwrap();
        litter.add(pup.id()).unwrap();

        // Only the owner is captured; its pets travel inside it.
        let snapshot = Snapshot::capture(&s.family.ctx, &[Rc::clone(&ann)]);
        assert_eq!(snapshot.entities.len(), 1);
        let owner = &snapshot.entities[0];
        assert_eq!(owner.features["pet"], Value::EntityRef(rex.id()));
        assert_eq!(owner.embedded["pet"].len(), 1);
        assert_eq!(owner.embedded["pet"][0].type_name, "Child2");
        assert_eq!(owner.embedded["litter"].len(), 2);

        let json = snapshot.to_json().unwrap();
        let target = social();
        let elsewhere = target.family.ctx.spawn("Base").unwrap();
        let moved = Snapshot {
            entities: vec![weave_persist::EntitySnapshot {
                id: EntityId::new(100),
                ..Snapshot::from_json(&json).unwrap().entities.remove(0)
            }],
        };

        let (restored, stats) = moved.restore(&target.family.ctx).unwrap();
        assert_eq!(
            stats,
            RestoreStats {
                entities: 4,
                features: 6
            }
        );

        let owner = &restored[0];
        let Value::EntityRef(pet_id) = owner.get(&target.pet).unwrap().get().unwrap() else {
            panic!("pet is not a reference");
        };
        assert_ne!(pet_id, elsewhere.id());
        let pet = target.family.ctx.entity(pet_id).unwrap();
        assert_eq!(pet.type_id(), target.family.child2);
        assert_eq!(pet.get(&target.name).unwrap().get().unwrap(), Value::from("Rex"));

        let names: Vec<Value> = owner
            .get(&target.litter)
            .unwrap()
            .get()
            .unwrap()
            .into_iter()
            .map(|item| {
                let id = item.as_entity_ref().unwrap();
                let copy = target.family.ctx.entity(id).unwrap();
                copy.get(&target.name).unwrap().get().unwrap()
            })
            .collect();
        assert_eq!(names, vec![Value::from("Kit"), Value::from("Pup")]);
    }

    #[test]
    fn test_value_mode_cycle_is_cut() {
        let s = social();
        let ann = s.family.ctx.spawn("Base").unwrap();
        let bob = s.family.ctx.spawn("Base").unwrap();
        ann.get(&s.pet).unwrap().set(bob.id()).unwrap();
        bob.get(&s.pet).unwrap().set(ann.id()).unwrap();

        let snapshot = Snapshot::capture(&s.family.ctx, &[Rc::clone(&ann)]);
        let copy = &snapshot.entities[0].embedded["pet"][0];
        assert_eq!(copy.id, bob.id());
        assert_eq!(copy.features["pet"], Value::Null);
        assert!(copy.embedded.is_empty());
    }

    #[test]
    fn test_value_mode_skips_transient_targets() {
        let s = social();
        let ann = s.family.ctx.spawn("Base").unwrap();
        let ghost = s.family.ctx.spawn("Base").unwrap();
        ghost.set_transient(true);
        ann.get(&s.pet).unwrap().set(ghost.id()).unwrap();

        let snapshot = Snapshot::capture(&s.family.ctx, &[ann]);
        assert_eq!(snapshot.entities[0].features["pet"], Value::Null);
        assert!(snapshot.entities[0].embedded.is_empty());
    }
}
