use super::*;

use shared::domain::Transform;

fn generated(image: &str) -> GeneratedSticker {
    GeneratedSticker {
        image: ImageRef::new(image),
        concept: None,
        prompt: None,
    }
}

#[test]
fn empty_label_is_ignored() {
    let mut lifecycle = LifecycleController::new();
    assert_eq!(lifecycle.begin_generation(""), None);
    assert_eq!(lifecycle.begin_generation("   "), None);
    assert_eq!(lifecycle.phase(), &LifecyclePhase::Idle);
    assert_eq!(lifecycle.latest_token(), None);
}

#[test]
fn tokyo_scenario_commits_at_first_slot() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let ticket = lifecycle.begin_generation(" Tokyo ").expect("ticket");
    assert_eq!(ticket.label, "Tokyo");
    assert!(lifecycle.is_loading());

    let resolution = lifecycle.resolve_generation(ticket.token, Ok(generated("ref1")));
    assert!(matches!(resolution, Resolution::Displaying { .. }));
    assert_eq!(lifecycle.pending().map(ImageRef::as_str), Some("ref1"));
    assert_eq!(lifecycle.current_display().map(ImageRef::as_str), Some("ref1"));
    assert!(store.is_empty());

    let commit = lifecycle
        .notify_display_complete(&mut store)
        .expect("commit");
    assert_eq!(commit.trigger, CommitTrigger::DisplayComplete);
    assert_eq!(commit.sticker.image_ref.as_str(), "ref1");
    assert_eq!(commit.sticker.transform, Transform::at(100.0, 100.0));
    assert_eq!(store.len(), 1);
    assert_eq!(lifecycle.phase(), &LifecyclePhase::Idle);
    assert!(lifecycle.is_transferring());
    // The printer keeps showing the sticker after it moved to the canvas.
    assert_eq!(lifecycle.current_display().map(ImageRef::as_str), Some("ref1"));
}

#[test]
fn duplicate_display_complete_commits_once() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let ticket = lifecycle.begin_generation("Paris").expect("ticket");
    lifecycle.resolve_generation(ticket.token, Ok(generated("ref1")));

    assert!(lifecycle.notify_display_complete(&mut store).is_some());
    assert!(lifecycle.notify_display_complete(&mut store).is_none());
    assert!(lifecycle.notify_display_complete(&mut store).is_none());
    assert!(lifecycle.fallback_elapsed(ticket.token, &mut store).is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn display_complete_before_generation_is_noop() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    assert!(lifecycle.notify_display_complete(&mut store).is_none());
    lifecycle.begin_generation("Rome").expect("ticket");
    assert!(lifecycle.notify_display_complete(&mut store).is_none());
    assert!(store.is_empty());
}

#[test]
fn fallback_commits_when_no_signal_arrives() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let ticket = lifecycle.begin_generation("Lima").expect("ticket");
    lifecycle.resolve_generation(ticket.token, Ok(generated("ref1")));

    let commit = lifecycle
        .fallback_elapsed(ticket.token, &mut store)
        .expect("fallback commit");
    assert_eq!(commit.trigger, CommitTrigger::FallbackTimer);
    assert_eq!(store.len(), 1);
}

#[test]
fn stale_fallback_does_not_commit_newer_sticker() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let first = lifecycle.begin_generation("Oslo").expect("ticket");
    lifecycle.resolve_generation(first.token, Ok(generated("ref1")));
    let second = lifecycle.begin_generation("Bergen").expect("ticket");
    lifecycle.resolve_generation(second.token, Ok(generated("ref2")));

    assert!(lifecycle.fallback_elapsed(first.token, &mut store).is_none());
    assert!(store.is_empty());

    let commit = lifecycle
        .fallback_elapsed(second.token, &mut store)
        .expect("commit");
    assert_eq!(commit.sticker.image_ref.as_str(), "ref2");
}

#[test]
fn new_request_drops_uncommitted_pending_sticker() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let first = lifecycle.begin_generation("Tokyo").expect("ticket");
    lifecycle.resolve_generation(first.token, Ok(generated("ref1")));
    let second = lifecycle.begin_generation("Osaka").expect("ticket");
    assert_eq!(lifecycle.pending(), None);
    assert_eq!(lifecycle.current_display(), None);

    lifecycle.resolve_generation(second.token, Ok(generated("ref2")));
    lifecycle.notify_display_complete(&mut store);

    let collection = store.snapshot();
    let images: Vec<&str> = collection.iter().map(|s| s.image_ref.as_str()).collect();
    assert_eq!(images, vec!["ref2"]);
}

#[test]
fn superseded_in_flight_result_is_discarded() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let first = lifecycle.begin_generation("Tokyo").expect("ticket");
    let second = lifecycle.begin_generation("Kyoto").expect("ticket");
    assert!(second.token > first.token);

    // First call returns late, after the second was issued.
    assert_eq!(
        lifecycle.resolve_generation(first.token, Ok(generated("ref1"))),
        Resolution::Stale { token: first.token }
    );
    assert!(lifecycle.is_loading());

    lifecycle.resolve_generation(second.token, Ok(generated("ref2")));
    lifecycle.notify_display_complete(&mut store);
    assert_eq!(store.len(), 1);
    assert_eq!(store.snapshot()[0].image_ref.as_str(), "ref2");
}

#[test]
fn failure_returns_to_idle_without_residue() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let ticket = lifecycle.begin_generation("Nowhere").expect("ticket");
    let resolution = lifecycle.resolve_generation(
        ticket.token,
        Err(GenerationError::Transport("connection refused".into())),
    );

    assert!(matches!(resolution, Resolution::Failed { .. }));
    assert_eq!(lifecycle.phase(), &LifecyclePhase::Idle);
    assert_eq!(lifecycle.pending(), None);
    assert_eq!(lifecycle.current_display(), None);
    assert!(lifecycle.last_failure().is_some());
    assert!(lifecycle.notify_display_complete(&mut store).is_none());
    assert!(store.is_empty());

    lifecycle.begin_generation("Somewhere").expect("ticket");
    assert!(lifecycle.last_failure().is_none());
}

#[test]
fn late_failure_of_superseded_request_is_ignored() {
    let mut lifecycle = LifecycleController::new();

    let first = lifecycle.begin_generation("A").expect("ticket");
    let second = lifecycle.begin_generation("B").expect("ticket");
    lifecycle.resolve_generation(second.token, Ok(generated("ref2")));

    let resolution =
        lifecycle.resolve_generation(first.token, Err(GenerationError::Unconfigured));
    assert_eq!(resolution, Resolution::Stale { token: first.token });
    assert_eq!(lifecycle.pending().map(ImageRef::as_str), Some("ref2"));
}

#[test]
fn transfer_flag_is_owned_by_latest_commit() {
    let mut lifecycle = LifecycleController::new();
    let mut store = CollectionStore::default();

    let first = lifecycle.begin_generation("A").expect("ticket");
    lifecycle.resolve_generation(first.token, Ok(generated("ref1")));
    lifecycle.notify_display_complete(&mut store);

    let second = lifecycle.begin_generation("B").expect("ticket");
    lifecycle.resolve_generation(second.token, Ok(generated("ref2")));
    lifecycle.notify_display_complete(&mut store);

    assert!(!lifecycle.finish_transfer(first.token));
    assert!(lifecycle.is_transferring());
    assert!(lifecycle.finish_transfer(second.token));
    assert!(!lifecycle.is_transferring());
    assert_eq!(store.len(), 2);
    assert_eq!(store.snapshot()[1].transform, Transform::at(130.0, 130.0));
}
