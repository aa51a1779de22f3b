use pitchside_api::{Booking, LOCAL_ID_PREFIX, Match, Stadium};
use std::collections::HashSet;

/// Entities the stores reconcile by id.
pub trait Entity: Clone {
    fn id(&self) -> &str;
}

impl Entity for Stadium {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Match {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Booking {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Fresh on-device id. Random, so rapid successive creates never collide.
pub fn new_local_id() -> String {
    format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

/// `local ++ remote` with every id appearing once. A remote entity whose id
/// is already held locally is dropped, so the local copy always wins.
pub fn merge_local_first<T: Entity>(local: &[T], remote: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<String> = HashSet::with_capacity(local.len() + remote.len());
    let mut merged = Vec::with_capacity(local.len() + remote.len());

    for entity in local.iter().cloned().chain(remote) {
        if seen.insert(entity.id().to_owned()) {
            merged.push(entity);
        }
    }
    merged
}

/// Put `entity` at the front unless an entity with its id is already held.
/// Returns whether it was inserted.
pub fn insert_front_unique<T: Entity>(items: &mut Vec<T>, entity: T) -> bool {
    if items.iter().any(|e| e.id() == entity.id()) {
        return false;
    }
    items.insert(0, entity);
    true
}

/// Swap in an updated copy in place. Returns false when the id is not held.
pub fn replace_by_id<T: Entity>(items: &mut [T], entity: T) -> bool {
    match items.iter_mut().find(|e| e.id() == entity.id()) {
        Some(slot) => {
            *slot = entity;
            true
        }
        None => false,
    }
}

pub fn remove_by_id<T: Entity>(items: &mut Vec<T>, id: &str) -> Option<T> {
    let index = items.iter().position(|e| e.id() == id)?;
    Some(items.remove(index))
}
