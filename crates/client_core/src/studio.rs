//! The sticker studio: one handle over generation, lifecycle, collection and
//! selection, plus the fallback and transfer timers.

use std::{collections::VecDeque, sync::Arc};

use shared::{
    domain::{GenerationToken, ImageRef, Sticker, TransformPatch},
    protocol::GenerateRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::{
    collection::{Collection, CollectionStore},
    config::StudioSettings,
    error::{CollectionError, GenerationError},
    lifecycle::{Commit, LifecycleController, LifecyclePhase, Resolution},
    selection::{ResizeOutcome, SelectionController},
    GeneratedSticker, GenerationClient, StudioEvent,
};

/// Consistent view of the studio for one render pass.
#[derive(Debug, Clone)]
pub struct StudioSnapshot {
    pub collection: Collection,
    pub selected_index: Option<usize>,
    pub phase: LifecyclePhase,
    pub current_display: Option<ImageRef>,
    pub loading: bool,
    pub transferring: bool,
    pub last_failure: Option<String>,
}

struct StudioState {
    lifecycle: LifecycleController,
    collection: CollectionStore,
    selection: SelectionController,
    concept_history: VecDeque<String>,
}

/// Wires generation, lifecycle, collection and selection together and owns
/// the fallback and transfer timers. All state sits behind one lock, so every
/// operation is atomic with respect to the others.
pub struct StickerStudio {
    client: Arc<dyn GenerationClient>,
    settings: StudioSettings,
    inner: Mutex<StudioState>,
    events: broadcast::Sender<StudioEvent>,
}

impl StickerStudio {
    pub fn new(client: Arc<dyn GenerationClient>, settings: StudioSettings) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            client,
            inner: Mutex::new(StudioState {
                lifecycle: LifecycleController::new(),
                collection: CollectionStore::new(settings.placement),
                selection: SelectionController::new(settings.min_box_side),
                concept_history: VecDeque::new(),
            }),
            settings,
            events,
        })
    }

    pub fn settings(&self) -> &StudioSettings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StudioEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StudioEvent) {
        // No subscribers is fine; the state is still queryable via snapshot().
        let _ = self.events.send(event);
    }

    /// Starts generating a sticker for `label` in the background and returns
    /// its token, or `None` if the label is empty. Overlapping requests are
    /// allowed; only the latest one can reach the collection.
    pub async fn request_generation(self: &Arc<Self>, label: &str) -> Option<GenerationToken> {
        let (ticket, request) = {
            let mut guard = self.inner.lock().await;
            let ticket = guard.lifecycle.begin_generation(label)?;
            let history = guard.concept_history.iter().cloned().collect();
            let request = GenerateRequest::new(ticket.label.clone()).with_history(history);
            (ticket, request)
        };

        let token = ticket.token;
        self.emit(StudioEvent::GenerationStarted {
            token,
            label: ticket.label,
        });

        let studio = Arc::clone(self);
        tokio::spawn(async move {
            let result = studio.client.generate(&request).await;
            studio.finish_generation(token, result).await;
        });

        Some(token)
    }

    async fn finish_generation(
        self: &Arc<Self>,
        token: GenerationToken,
        result: Result<GeneratedSticker, GenerationError>,
    ) {
        let resolution = {
            let mut guard = self.inner.lock().await;
            let resolution = guard.lifecycle.resolve_generation(token, result);
            if let Resolution::Displaying { sticker, .. } = &resolution {
                if let Some(concept) = sticker.concept.clone() {
                    guard.concept_history.push_back(concept);
                    while guard.concept_history.len() > self.settings.history_limit {
                        guard.concept_history.pop_front();
                    }
                }
            }
            resolution
        };

        match resolution {
            Resolution::Displaying { token, sticker } => {
                self.emit(StudioEvent::StickerDisplayed {
                    token,
                    image: sticker.image,
                });
                self.arm_fallback(token);
            }
            Resolution::Failed { token, error } => {
                self.emit(StudioEvent::GenerationFailed {
                    token,
                    notice: error.notice(),
                    error,
                });
            }
            Resolution::Stale { token } => {
                self.emit(StudioEvent::GenerationDiscarded { token });
            }
        }
    }

    fn arm_fallback(self: &Arc<Self>, token: GenerationToken) {
        let studio = Arc::clone(self);
        let wait = self.settings.fallback_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let committed = {
                let mut guard = studio.inner.lock().await;
                let state = &mut *guard;
                state
                    .lifecycle
                    .fallback_elapsed(token, &mut state.collection)
                    .map(|commit| (commit, state.collection.snapshot()))
            };
            match committed {
                Some((commit, collection)) => {
                    info!(%token, "display signal never arrived; committed by fallback");
                    studio.on_committed(commit, collection);
                }
                None => debug!(%token, "fallback timer found nothing to commit"),
            }
        });
    }

    /// Presentation signal that the printer animation finished. Returns the
    /// committed sticker, or `None` if there was nothing pending.
    pub async fn notify_display_complete(self: &Arc<Self>) -> Option<Sticker> {
        let (commit, collection) = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let commit = state.lifecycle.notify_display_complete(&mut state.collection)?;
            (commit, state.collection.snapshot())
        };
        let sticker = commit.sticker.clone();
        self.on_committed(commit, collection);
        Some(sticker)
    }

    fn on_committed(self: &Arc<Self>, commit: Commit, collection: Collection) {
        let token = commit.token;
        self.emit(StudioEvent::StickerCommitted {
            token,
            sticker: commit.sticker,
            trigger: commit.trigger,
        });
        self.emit(StudioEvent::CollectionChanged(collection));

        let studio = Arc::clone(self);
        let delay = self.settings.transfer_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let finished = studio.inner.lock().await.lifecycle.finish_transfer(token);
            if finished {
                studio.emit(StudioEvent::TransferFinished { token });
            }
        });
    }

    pub async fn select(&self, index: usize) -> Option<usize> {
        let selected = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state.selection.select(&state.collection, index)
        };
        self.emit(StudioEvent::SelectionChanged(selected));
        selected
    }

    /// Gesture landed on empty canvas.
    pub async fn deselect_all(&self) {
        self.inner.lock().await.selection.deselect_all();
        self.emit(StudioEvent::SelectionChanged(None));
    }

    pub async fn apply_transform(
        &self,
        index: usize,
        patch: TransformPatch,
    ) -> Result<Collection, CollectionError> {
        let collection = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state
                .selection
                .apply_transform(&mut state.collection, index, &patch)?
        };
        self.emit(StudioEvent::CollectionChanged(collection.clone()));
        Ok(collection)
    }

    pub async fn apply_resize(
        &self,
        index: usize,
        patch: TransformPatch,
    ) -> Result<ResizeOutcome, CollectionError> {
        let outcome = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state
                .selection
                .apply_resize(&mut state.collection, index, &patch)?
        };
        if let ResizeOutcome::Applied(collection) = &outcome {
            self.emit(StudioEvent::CollectionChanged(collection.clone()));
        }
        Ok(outcome)
    }

    /// Adopts a collection pushed back by the presentation layer and drops a
    /// selection that no longer points at anything. A rejected collection
    /// changes nothing.
    pub async fn replace_collection(
        &self,
        collection: Collection,
    ) -> Result<(), CollectionError> {
        let (cleared, snapshot) = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state.collection.replace(collection)?;
            let cleared = state.selection.reconcile(&state.collection);
            (cleared, state.collection.snapshot())
        };
        self.emit(StudioEvent::CollectionChanged(snapshot));
        if cleared {
            self.emit(StudioEvent::SelectionChanged(None));
        }
        Ok(())
    }

    pub async fn selected_sticker(&self) -> Option<(usize, Sticker)> {
        let guard = self.inner.lock().await;
        let index = guard.selection.selected_index(&guard.collection)?;
        guard
            .collection
            .get(index)
            .cloned()
            .map(|sticker| (index, sticker))
    }

    pub async fn snapshot(&self) -> StudioSnapshot {
        let guard = self.inner.lock().await;
        StudioSnapshot {
            collection: guard.collection.snapshot(),
            selected_index: guard.selection.selected_index(&guard.collection),
            phase: guard.lifecycle.phase().clone(),
            current_display: guard.lifecycle.current_display().cloned(),
            loading: guard.lifecycle.is_loading(),
            transferring: guard.lifecycle.is_transferring(),
            last_failure: guard.lifecycle.last_failure().map(GenerationError::notice),
        }
    }
}

#[cfg(test)]
#[path = "tests/studio_tests.rs"]
mod tests;
