//! Single-selection state and gesture routing.
//!
//! The selection is held by sticker identity, not position, and is exposed as
//! an index by looking the id up in the current collection.

use shared::domain::{BoundingBox, Sticker, StickerId, TransformPatch};
use tracing::debug;

use crate::{
    collection::{Collection, CollectionStore},
    error::CollectionError,
};

/// Resize guard: keeps the previous box when the proposed one is smaller than
/// `min_side` in either dimension.
pub fn bound_box(old: BoundingBox, new: BoundingBox, min_side: f64) -> BoundingBox {
    if new.fits_minimum(min_side) {
        new
    } else {
        old
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResizeOutcome {
    Applied(Collection),
    /// The proposal was too small; the sticker keeps its previous transform.
    Reverted,
}

#[derive(Debug, Clone)]
pub struct SelectionController {
    selected: Option<StickerId>,
    min_box_side: f64,
}

impl SelectionController {
    pub fn new(min_box_side: f64) -> Self {
        Self {
            selected: None,
            min_box_side,
        }
    }

    pub fn selected_id(&self) -> Option<StickerId> {
        self.selected
    }

    pub fn selected_index(&self, store: &CollectionStore) -> Option<usize> {
        self.selected.and_then(|id| store.position_of(id))
    }

    pub fn selected_sticker<'a>(&self, store: &'a CollectionStore) -> Option<&'a Sticker> {
        self.selected_index(store).and_then(|index| store.get(index))
    }

    /// Toggle semantics: selecting the selected sticker clears the selection,
    /// anything else replaces it. An index outside the collection clears it.
    pub fn select(&mut self, store: &CollectionStore, index: usize) -> Option<usize> {
        let Some(target) = store.get(index).map(|sticker| sticker.id) else {
            debug!(index, len = store.len(), "select outside collection; clearing");
            self.selected = None;
            return None;
        };

        if self.selected == Some(target) {
            self.selected = None;
            None
        } else {
            self.selected = Some(target);
            Some(index)
        }
    }

    pub fn deselect_all(&mut self) {
        self.selected = None;
    }

    /// Clears the selection if the selected sticker is gone. Returns true when
    /// something was cleared.
    pub fn reconcile(&mut self, store: &CollectionStore) -> bool {
        match self.selected {
            Some(id) if !store.contains(id) => {
                debug!(sticker_id = %id, "selected sticker left the collection");
                self.selected = None;
                true
            }
            _ => false,
        }
    }

    /// Routes one frame of a drag/rotate/resize gesture into the store. A
    /// frame that carries a scale goes through the resize guard; if it is
    /// refused the current collection comes back unchanged.
    pub fn apply_transform(
        &self,
        store: &mut CollectionStore,
        index: usize,
        patch: &TransformPatch,
    ) -> Result<Collection, CollectionError> {
        if patch.scale_x.is_none() && patch.scale_y.is_none() {
            return store.update(index, patch);
        }
        match self.apply_resize(store, index, patch)? {
            ResizeOutcome::Applied(collection) => Ok(collection),
            ResizeOutcome::Reverted => Ok(store.snapshot()),
        }
    }

    /// Like `apply_transform`, but rejects proposals whose bounding box would
    /// drop below the minimum side length.
    pub fn apply_resize(
        &self,
        store: &mut CollectionStore,
        index: usize,
        patch: &TransformPatch,
    ) -> Result<ResizeOutcome, CollectionError> {
        let current = store
            .get(index)
            .ok_or(CollectionError::IndexOutOfRange {
                index,
                len: store.len(),
            })?
            .transform;

        let old_box = current.bounding_box();
        let new_box = current.merged(patch).bounding_box();
        if bound_box(old_box, new_box, self.min_box_side) != new_box {
            debug!(
                index,
                width = new_box.width,
                height = new_box.height,
                "resize below minimum; reverting"
            );
            return Ok(ResizeOutcome::Reverted);
        }

        store.update(index, patch).map(ResizeOutcome::Applied)
    }
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(50.0)
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
