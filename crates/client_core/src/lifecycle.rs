//! Generate → display → commit handoff for a single sticker at a time.
//!
//! Every generation request is fenced by a [`GenerationToken`]; only the
//! result of the latest request can ever reach the collection. Commit has two
//! triggers (the presentation's display-complete signal and the fallback
//! timer) and both go through [`LifecycleController::commit_pending`].

use shared::domain::{GenerationToken, ImageRef, Sticker};
use tracing::{debug, info, warn};

use crate::{collection::CollectionStore, error::GenerationError, GeneratedSticker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Generating { token: GenerationToken },
    Displaying { token: GenerationToken, pending: ImageRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    DisplayComplete,
    FallbackTimer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub token: GenerationToken,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The result belongs to the latest request and is now pending.
    Displaying {
        token: GenerationToken,
        sticker: GeneratedSticker,
    },
    Failed {
        token: GenerationToken,
        error: GenerationError,
    },
    /// A newer request was issued meanwhile; the result was dropped.
    Stale { token: GenerationToken },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub token: GenerationToken,
    pub sticker: Sticker,
    pub trigger: CommitTrigger,
}

#[derive(Debug, Clone)]
pub struct LifecycleController {
    phase: LifecyclePhase,
    current_display: Option<ImageRef>,
    latest_token: u64,
    /// Commit whose transfer animation is still running.
    transfer: Option<GenerationToken>,
    last_failure: Option<GenerationError>,
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            current_display: None,
            latest_token: 0,
            transfer: None,
            last_failure: None,
        }
    }

    pub fn phase(&self) -> &LifecyclePhase {
        &self.phase
    }

    pub fn pending(&self) -> Option<&ImageRef> {
        match &self.phase {
            LifecyclePhase::Displaying { pending, .. } => Some(pending),
            _ => None,
        }
    }

    /// Image the printer is showing. Survives the commit and is cleared by the
    /// next request.
    pub fn current_display(&self) -> Option<&ImageRef> {
        self.current_display.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, LifecyclePhase::Generating { .. })
    }

    pub fn is_transferring(&self) -> bool {
        self.transfer.is_some()
    }

    pub fn last_failure(&self) -> Option<&GenerationError> {
        self.last_failure.as_ref()
    }

    pub fn latest_token(&self) -> Option<GenerationToken> {
        (self.latest_token > 0).then_some(GenerationToken(self.latest_token))
    }

    /// Starts a new generation. Returns `None` for an empty label. Any
    /// pending, uncommitted sticker from an earlier request is dropped.
    pub fn begin_generation(&mut self, label: &str) -> Option<GenerationTicket> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        if let Some(pending) = self.pending() {
            debug!(pending = %pending.summary(), "dropping uncommitted sticker for new request");
        }

        self.latest_token += 1;
        let token = GenerationToken(self.latest_token);
        self.phase = LifecyclePhase::Generating { token };
        self.current_display = None;
        self.last_failure = None;

        info!(%token, %label, "generation requested");
        Some(GenerationTicket {
            token,
            label: label.to_string(),
        })
    }

    pub fn resolve_generation(
        &mut self,
        token: GenerationToken,
        result: Result<GeneratedSticker, GenerationError>,
    ) -> Resolution {
        if token.0 != self.latest_token {
            debug!(%token, latest = self.latest_token, "discarding superseded generation result");
            return Resolution::Stale { token };
        }

        match result {
            Ok(sticker) => {
                info!(%token, image = %sticker.image.summary(), "sticker generated; displaying");
                self.current_display = Some(sticker.image.clone());
                self.phase = LifecyclePhase::Displaying {
                    token,
                    pending: sticker.image.clone(),
                };
                Resolution::Displaying { token, sticker }
            }
            Err(error) => {
                warn!(%token, %error, "sticker generation failed");
                self.phase = LifecyclePhase::Idle;
                self.current_display = None;
                self.last_failure = Some(error.clone());
                Resolution::Failed { token, error }
            }
        }
    }

    /// Presentation signal: the entry animation for the displayed sticker is
    /// done. Safe to call any number of times.
    pub fn notify_display_complete(&mut self, store: &mut CollectionStore) -> Option<Commit> {
        self.commit_pending(store, CommitTrigger::DisplayComplete, None)
    }

    /// Fallback timer armed for `token` ran out. Only commits if that same
    /// generation is still pending.
    pub fn fallback_elapsed(
        &mut self,
        token: GenerationToken,
        store: &mut CollectionStore,
    ) -> Option<Commit> {
        self.commit_pending(store, CommitTrigger::FallbackTimer, Some(token))
    }

    /// Single transition for both commit triggers. A no-op unless a sticker is
    /// pending (and, when `expected` is given, it belongs to that token).
    pub fn commit_pending(
        &mut self,
        store: &mut CollectionStore,
        trigger: CommitTrigger,
        expected: Option<GenerationToken>,
    ) -> Option<Commit> {
        let LifecyclePhase::Displaying { token, .. } = &self.phase else {
            debug!(?trigger, "no pending sticker to commit");
            return None;
        };
        let token = *token;
        if expected.is_some_and(|expected| expected != token) {
            debug!(?trigger, %token, "trigger belongs to an older generation");
            return None;
        }

        let LifecyclePhase::Displaying { pending, .. } =
            std::mem::replace(&mut self.phase, LifecyclePhase::Idle)
        else {
            return None;
        };

        let sticker = store.append(pending);
        self.transfer = Some(token);
        info!(%token, sticker_id = %sticker.id, ?trigger, "sticker committed to collection");
        Some(Commit {
            token,
            sticker,
            trigger,
        })
    }

    /// Ends the cosmetic transfer window opened by the commit for `token`.
    /// Returns false when a later commit owns the flag.
    pub fn finish_transfer(&mut self, token: GenerationToken) -> bool {
        if self.transfer == Some(token) {
            self.transfer = None;
            true
        } else {
            false
        }
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
