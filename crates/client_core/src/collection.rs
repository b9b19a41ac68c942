//! Ordered, append-only sticker collection with copy-on-write snapshots.

use std::{collections::HashSet, ops::Deref, sync::Arc};

use shared::domain::{ImageRef, Sticker, StickerId, Transform, TransformPatch};
use tracing::debug;

use crate::{config::Placement, error::CollectionError};

/// Immutable view of the collection at one instant. Cheap to clone; a
/// mutation on the store never changes a collection that was already handed
/// out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection(Arc<Vec<Sticker>>);

impl Collection {
    pub fn new(stickers: Vec<Sticker>) -> Self {
        Self(Arc::new(stickers))
    }

    /// True when both handles point at the same underlying value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn to_vec(&self) -> Vec<Sticker> {
        self.0.as_ref().clone()
    }
}

impl Deref for Collection {
    type Target = [Sticker];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl From<Vec<Sticker>> for Collection {
    fn from(value: Vec<Sticker>) -> Self {
        Self::new(value)
    }
}

/// Highest id a handed-back collection may carry; appends number upward from
/// it and must stay below `u64::MAX`.
pub const MAX_STICKER_ID: u64 = u64::MAX >> 1;

#[derive(Debug, Clone)]
pub struct CollectionStore {
    current: Collection,
    placement: Placement,
    next_id: u64,
}

impl CollectionStore {
    pub fn new(placement: Placement) -> Self {
        Self {
            current: Collection::default(),
            placement,
            next_id: 1,
        }
    }

    pub fn snapshot(&self) -> Collection {
        self.current.clone()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sticker> {
        self.current.get(index)
    }

    pub fn position_of(&self, id: StickerId) -> Option<usize> {
        self.current.iter().position(|sticker| sticker.id == id)
    }

    pub fn contains(&self, id: StickerId) -> bool {
        self.position_of(id).is_some()
    }

    /// The sticker `append` would create right now, without adding it.
    pub fn next_sticker(&self, image_ref: ImageRef) -> Sticker {
        let (x, y) = self.placement.position(self.len());
        Sticker {
            id: StickerId(self.next_id),
            image_ref,
            transform: Transform::at(x, y),
        }
    }

    pub fn append(&mut self, image_ref: ImageRef) -> Sticker {
        let sticker = self.next_sticker(image_ref);
        self.next_id = self.next_id.saturating_add(1);

        let mut stickers = self.current.to_vec();
        stickers.push(sticker.clone());
        self.current = Collection::new(stickers);

        debug!(
            sticker_id = %sticker.id,
            x = sticker.transform.x,
            y = sticker.transform.y,
            len = self.len(),
            "appended sticker"
        );
        sticker
    }

    /// Merges `patch` into the sticker at `index` and returns the new
    /// collection. The previous collection value is left untouched; on error
    /// nothing changes.
    pub fn update(
        &mut self,
        index: usize,
        patch: &TransformPatch,
    ) -> Result<Collection, CollectionError> {
        if index >= self.len() {
            return Err(CollectionError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        let stickers = self
            .current
            .iter()
            .enumerate()
            .map(|(i, sticker)| {
                if i == index {
                    Sticker {
                        transform: sticker.transform.merged(patch),
                        ..sticker.clone()
                    }
                } else {
                    sticker.clone()
                }
            })
            .collect();
        self.current = Collection::new(stickers);
        Ok(self.snapshot())
    }

    pub fn update_by_id(
        &mut self,
        id: StickerId,
        patch: &TransformPatch,
    ) -> Result<Collection, CollectionError> {
        let index = self
            .position_of(id)
            .ok_or(CollectionError::UnknownSticker(id))?;
        self.update(index, patch)
    }

    /// Adopts a collection handed back wholesale by the presentation layer.
    /// Later appends continue numbering after the highest id seen. A collection
    /// with a repeated id, or an id above `MAX_STICKER_ID`, is rejected and the
    /// store is left as it was.
    pub fn replace(&mut self, collection: Collection) -> Result<(), CollectionError> {
        let mut seen = HashSet::with_capacity(collection.len());
        for sticker in collection.iter() {
            if !seen.insert(sticker.id) {
                return Err(CollectionError::DuplicateId(sticker.id));
            }
        }

        let next_id = match collection.iter().map(|sticker| sticker.id).max() {
            Some(id) if id.0 > MAX_STICKER_ID => return Err(CollectionError::IdOutOfRange(id)),
            Some(id) => id.0 + 1,
            None => 0,
        };
        self.next_id = self.next_id.max(next_id);
        self.current = collection;
        debug!(len = self.len(), next_id = self.next_id, "replaced collection");
        Ok(())
    }
}

impl Default for CollectionStore {
    fn default() -> Self {
        Self::new(Placement::default())
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
