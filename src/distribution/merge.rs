//! Moving item stacks from an inbox into a target container.

use crate::error::CapabilityResult;
use crate::labels::{LabelOverlayService, Notice};
use crate::types::{ItemKindId, ItemStack};
use crate::world::{Cue, NotificationSink, StorageCapability, TileEntity};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

/// Merges inbox contents into target containers.
pub struct StackMerger {
    notifier: Arc<dyn NotificationSink>,
    labels: Arc<LabelOverlayService>,
    success_notice: Duration,
}

impl StackMerger {
    pub fn new(
        notifier: Arc<dyn NotificationSink>,
        labels: Arc<LabelOverlayService>,
        success_notice: Duration,
    ) -> Self {
        Self {
            notifier,
            labels,
            success_notice,
        }
    }

    /// Move what fits from `source` into `target`; returns the quantity moved.
    ///
    /// A capability failure stops the pass where it happened. The source is
    /// marked modified either way, and the target too when the pass failed,
    /// so viewers resync with the real contents.
    pub fn merge(&self, source: &dyn TileEntity, target: &dyn TileEntity) -> CapabilityResult<u32> {
        let (Some(from), Some(to)) = (source.storage(), target.storage()) else {
            trace!(source = %source.position(), target = %target.position(), "no storage on one side; nothing to merge");
            return Ok(0);
        };

        let result = Self::transfer(from, to);
        from.mark_modified();
        let moved = match result {
            Ok(moved) => moved,
            Err(e) => {
                to.mark_modified();
                return Err(e);
            }
        };

        if moved > 0 {
            debug!(source = %source.position(), target = %target.position(), moved, "items transferred");
            if let Err(e) = Self::combine_and_sort(to) {
                warn!(target = %target.position(), error = %e, "failed to re-sort target");
            }
            to.mark_modified();
            self.labels
                .request_notice(target, self.success_notice, Notice::Transferred(moved));
            self.notifier.play_cue(target.position(), Cue::Delivered);
        }
        Ok(moved)
    }

    /// Offer each inbox slot to `to`, then debit the slot by what was taken.
    ///
    /// A slot whose debit fails has the target put back as it was before the
    /// slot was offered, so no item ends up in both containers.
    fn transfer(from: &dyn StorageCapability, to: &dyn StorageCapability) -> CapabilityResult<u32> {
        let mut moved = 0;

        for (index, stack) in from.slots()?.into_iter().enumerate() {
            let Some(kind) = stack.kind.filter(|_| !stack.is_empty()) else {
                continue;
            };
            let before = to.slots()?;
            let (accepted, offered) = Self::offer(to, kind, stack.quantity);

            if accepted > 0 {
                let left = ItemStack::new(kind, stack.quantity - accepted);
                if let Err(e) = from.set_slot(index, left) {
                    Self::roll_back(to, before);
                    return Err(e);
                }
                moved += accepted;
            }
            offered?;
        }

        Ok(moved)
    }

    /// Stack `quantity` of `kind` into `to`; returns what it took before any failure.
    fn offer(to: &dyn StorageCapability, kind: ItemKindId, quantity: u32) -> (u32, CapabilityResult<()>) {
        let slots = match to.slots() {
            Ok(slots) => slots,
            Err(e) => return (0, Err(e)),
        };
        let mut remaining = quantity;
        let mut had_same_kind = false;

        for (slot, existing) in slots.into_iter().enumerate() {
            if !existing.is_kind(kind) {
                continue;
            }
            had_same_kind = true;
            match to.try_merge_into(slot, ItemStack::new(kind, remaining)) {
                Ok(outcome) => {
                    remaining -= outcome.accepted.min(remaining);
                    if outcome.fully_absorbed || remaining == 0 {
                        break;
                    }
                }
                Err(e) => return (quantity - remaining, Err(e)),
            }
        }

        // A same-kind slot without room keeps the rest in the inbox.
        if remaining > 0 && !had_same_kind {
            match to.try_place(ItemStack::new(kind, remaining)) {
                Ok(accepted) => remaining -= accepted.min(remaining),
                Err(e) => return (quantity - remaining, Err(e)),
            }
        }
        (quantity - remaining, Ok(()))
    }

    fn roll_back(to: &dyn StorageCapability, before: Vec<ItemStack>) {
        if let Err(e) = to.replace_slots(before) {
            error!(error = %e, "could not roll back target after a failed inbox write");
        }
    }

    /// Stable sort by item kind, merging equal kinds up to their stack limit.
    fn combine_and_sort(storage: &dyn StorageCapability) -> CapabilityResult<()> {
        let slots = storage.slots()?;
        let capacity = slots.len();
        let sorted = combine_stacks(&slots, |kind| storage.max_stack(kind));
        if sorted.len() > capacity {
            // Stacks above the kind limit would need more slots than exist.
            return Ok(());
        }

        let mut next = sorted;
        next.resize(capacity, ItemStack::EMPTY);
        storage.replace_slots(next)
    }
}

/// Combine stacks of the same kind, ordered by kind, splitting at `max_stack`.
pub fn combine_stacks(slots: &[ItemStack], max_stack: impl Fn(ItemKindId) -> u32) -> Vec<ItemStack> {
    let mut totals: Vec<(ItemKindId, u64)> = Vec::new();
    let mut filled: Vec<&ItemStack> = slots.iter().filter(|s| !s.is_empty()).collect();
    filled.sort_by_key(|s| s.kind);

    for stack in filled {
        let Some(kind) = stack.kind else { continue };
        match totals.last_mut() {
            Some((last, total)) if *last == kind => *total += u64::from(stack.quantity),
            _ => totals.push((kind, u64::from(stack.quantity))),
        }
    }

    let mut combined = Vec::new();
    for (kind, mut total) in totals {
        let limit = u64::from(max_stack(kind).max(1));
        while total > 0 {
            let take = total.min(limit);
            combined.push(ItemStack::new(kind, take as u32));
            total -= take;
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{BoundingRegion, Position};
    use crate::world::memory::{InMemoryWorld, MemoryContainer, RecordingNotifier};
    use crate::world::{EntityKind, SimpleKind};

    const A: ItemKindId = ItemKindId::new(1);
    const B: ItemKindId = ItemKindId::new(2);
    const C: ItemKindId = ItemKindId::new(3);
    const SOURCE: Position = Position::new(0, 0, 0);
    const TARGET: Position = Position::new(0, 1, 0);

    struct Fixture {
        world: Arc<InMemoryWorld>,
        notifier: Arc<RecordingNotifier>,
        merger: StackMerger,
    }

    fn fixture() -> Fixture {
        let world = Arc::new(InMemoryWorld::new(BoundingRegion::new(
            Position::new(-4, -4, -4),
            Position::new(4, 4, 4),
        )));
        let notifier = Arc::new(RecordingNotifier::new());
        let labels = Arc::new(LabelOverlayService::new(
            world.clone(),
            Arc::new(ManualClock::default()),
            Duration::from_secs(5),
        ));
        let merger = StackMerger::new(notifier.clone(), labels, Duration::from_secs(2));
        Fixture {
            world,
            notifier,
            merger,
        }
    }

    fn container(pos: Position, slots: Vec<ItemStack>) -> MemoryContainer {
        MemoryContainer::new(pos, EntityKind::Simple(SimpleKind::SignedSecureLoot))
            .with_owner("steam_1")
            .with_slots(slots)
    }

    fn run(f: &Fixture) -> CapabilityResult<u32> {
        let source = f.world.container(SOURCE).unwrap();
        let target = f.world.container(TARGET).unwrap();
        f.merger.merge(source.as_ref(), target.as_ref())
    }

    #[test]
    fn test_merges_into_existing_stack() {
        let f = fixture();
        let source = f.world.insert(container(
            SOURCE,
            vec![ItemStack::new(A, 40), ItemStack::EMPTY],
        ));
        let target = f.world.insert(
            container(TARGET, vec![ItemStack::new(A, 10), ItemStack::EMPTY]).with_max_stack(70),
        );

        assert_eq!(run(&f).unwrap(), 40);
        let from = source.storage_state().unwrap();
        assert!(from.snapshot().iter().all(ItemStack::is_empty));
        assert_eq!(target.storage_state().unwrap().quantity_of(A), 50);
        assert_eq!(
            target.label_state().unwrap().text(),
            "Added + Sorted\n40 Items"
        );
        assert_eq!(f.notifier.cues_at(TARGET), vec![Cue::Delivered]);
    }

    #[test]
    fn test_same_kind_without_room_skips_fresh_slot() {
        let f = fixture();
        let source = f.world.insert(container(SOURCE, vec![ItemStack::new(A, 30)]));
        let target = f.world.insert(
            container(TARGET, vec![ItemStack::new(A, 90), ItemStack::EMPTY]),
        );

        assert_eq!(run(&f).unwrap(), 10);
        assert_eq!(source.storage_state().unwrap().snapshot()[0], ItemStack::new(A, 20));
        let slots = target.storage_state().unwrap().snapshot();
        assert_eq!(slots, vec![ItemStack::new(A, 100), ItemStack::EMPTY]);
    }

    #[test]
    fn test_new_kind_is_placed_in_free_slot() {
        let f = fixture();
        let source = f.world.insert(container(SOURCE, vec![ItemStack::new(B, 5)]));
        let target = f.world.insert(container(
            TARGET,
            vec![ItemStack::new(C, 1), ItemStack::EMPTY, ItemStack::new(A, 2)],
        ));

        assert_eq!(run(&f).unwrap(), 5);
        assert!(source.storage_state().unwrap().snapshot()[0].is_empty());
        // Sorted by kind after the transfer.
        assert_eq!(
            target.storage_state().unwrap().snapshot(),
            vec![ItemStack::new(A, 2), ItemStack::new(B, 5), ItemStack::new(C, 1)]
        );
    }

    #[test]
    fn test_full_target_moves_nothing() {
        let f = fixture();
        let source = f.world.insert(container(SOURCE, vec![ItemStack::new(B, 5)]));
        let target = f.world.insert(container(TARGET, vec![ItemStack::new(A, 100)]));

        assert_eq!(run(&f).unwrap(), 0);
        assert_eq!(source.storage_state().unwrap().snapshot()[0], ItemStack::new(B, 5));
        assert_eq!(target.label_state().unwrap().write_count(), 0);
        assert!(f.notifier.events().is_empty());
        assert_eq!(source.storage_state().unwrap().modified_count(), 1);
    }

    #[test]
    fn test_second_visit_is_idempotent() {
        let f = fixture();
        f.world.insert(container(SOURCE, vec![ItemStack::new(A, 40)]));
        let target = f.world.insert(container(TARGET, vec![ItemStack::new(A, 10)]));

        assert_eq!(run(&f).unwrap(), 40);
        let after_first = target.storage_state().unwrap().snapshot();
        assert_eq!(run(&f).unwrap(), 0);
        assert_eq!(target.storage_state().unwrap().snapshot(), after_first);
    }

    #[test]
    fn test_failure_aborts_and_marks_source() {
        let f = fixture();
        let source = f.world.insert(container(SOURCE, vec![ItemStack::new(A, 40)]));
        let target = f.world.insert(container(TARGET, vec![ItemStack::new(A, 10)]));
        target.storage_state().unwrap().fail_writes(true);

        assert!(run(&f).is_err());
        assert_eq!(source.storage_state().unwrap().snapshot()[0], ItemStack::new(A, 40));
        assert_eq!(source.storage_state().unwrap().modified_count(), 1);
        assert_eq!(target.storage_state().unwrap().quantity_of(A), 10);
    }

    #[test]
    fn test_failed_inbox_write_rolls_back_target() {
        let f = fixture();
        let source = f.world.insert(container(SOURCE, vec![ItemStack::new(A, 40)]));
        let target = f.world.insert(container(TARGET, vec![ItemStack::new(A, 10)]));
        source.storage_state().unwrap().fail_writes(true);

        assert!(run(&f).is_err());
        assert_eq!(source.storage_state().unwrap().quantity_of(A), 40);
        assert_eq!(target.storage_state().unwrap().quantity_of(A), 10);
        assert!(f.notifier.events().is_empty());
    }

    #[test]
    fn test_failure_mid_slot_keeps_items_conserved() {
        let f = fixture();
        let source = f.world.insert(container(SOURCE, vec![ItemStack::new(A, 40)]));
        let target = f.world.insert(container(
            TARGET,
            vec![ItemStack::new(A, 90), ItemStack::new(A, 90), ItemStack::EMPTY],
        ));
        // The first stack tops up, the second write fails.
        target.storage_state().unwrap().fail_writes_after(1);

        assert!(run(&f).is_err());
        assert_eq!(source.storage_state().unwrap().snapshot()[0], ItemStack::new(A, 30));
        assert_eq!(
            target.storage_state().unwrap().snapshot(),
            vec![ItemStack::new(A, 100), ItemStack::new(A, 90), ItemStack::EMPTY]
        );
    }

    #[test]
    fn test_failure_on_later_slot_keeps_earlier_moves() {
        let f = fixture();
        let source = f.world.insert(container(
            SOURCE,
            vec![ItemStack::new(A, 40), ItemStack::new(B, 5)],
        ));
        let target = f.world.insert(container(
            TARGET,
            vec![ItemStack::new(A, 10), ItemStack::EMPTY],
        ));
        target.storage_state().unwrap().fail_writes_after(1);

        assert!(run(&f).is_err());
        assert_eq!(
            source.storage_state().unwrap().snapshot(),
            vec![ItemStack::EMPTY, ItemStack::new(B, 5)]
        );
        assert_eq!(
            target.storage_state().unwrap().snapshot(),
            vec![ItemStack::new(A, 50), ItemStack::EMPTY]
        );
        assert_eq!(source.storage_state().unwrap().modified_count(), 1);
        assert_eq!(target.storage_state().unwrap().modified_count(), 1);
    }

    #[test]
    fn test_combine_stacks_splits_at_limit() {
        let slots = vec![
            ItemStack::new(B, 60),
            ItemStack::EMPTY,
            ItemStack::new(A, 3),
            ItemStack::new(B, 70),
        ];
        assert_eq!(
            combine_stacks(&slots, |_| 100),
            vec![ItemStack::new(A, 3), ItemStack::new(B, 100), ItemStack::new(B, 30)]
        );
    }
}
