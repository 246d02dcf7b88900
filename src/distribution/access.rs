//! Lock and password arbitration between an inbox and a candidate container.
//!
//! Rules are checked in order:
//!
//! 1. Either side held open by a player: denied, retried on the next unlock.
//! 2. Target without a lock, or unlocked: permitted.
//! 3. Target locked without a password: denied.
//! 4. Target locked with a password while the inbox is not locked: denied.
//! 5. Both locked: permitted only when the passwords match exactly.
//!
//! Denials from rules 3-5 put a notice on the target and play the blocked cue.

use crate::labels::{LabelOverlayService, Notice, TARGET_IN_USE_MESSAGE};
use crate::world::{Cue, Holder, InUseRegistry, NotificationSink, TileEntity};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Why a source may not write into a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// A player has the inbox open.
    SourceInUse,
    /// Someone has the target open.
    TargetInUse,
    /// Target is locked but has no password.
    LockedWithoutPassword,
    /// Target is password-locked and the inbox is not locked.
    TargetLockedSourceNot,
    /// Both are locked with different passwords.
    PasswordMismatch,
}

impl Denial {
    /// Label notice for policy denials; `None` for transient in-use denials.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::SourceInUse | Self::TargetInUse => None,
            Self::LockedWithoutPassword => Some(Notice::LockedWithoutPassword),
            Self::TargetLockedSourceNot => Some(Notice::TargetLockedSourceNot),
            Self::PasswordMismatch => Some(Notice::PasswordMismatch),
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceInUse => write!(f, "source in use"),
            Self::TargetInUse => write!(f, "target in use"),
            Self::LockedWithoutPassword => write!(f, "locked without password"),
            Self::TargetLockedSourceNot => write!(f, "target locked, source not"),
            Self::PasswordMismatch => write!(f, "password mismatch"),
        }
    }
}

/// Outcome of arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny(Denial),
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Self::Permit)
    }
}

/// Decides whether an inbox may write into a target and reports denials.
pub struct AccessArbiter {
    in_use: Arc<dyn InUseRegistry>,
    notifier: Arc<dyn NotificationSink>,
    labels: Arc<LabelOverlayService>,
    blocked_notice: Duration,
}

impl AccessArbiter {
    pub fn new(
        in_use: Arc<dyn InUseRegistry>,
        notifier: Arc<dyn NotificationSink>,
        labels: Arc<LabelOverlayService>,
        blocked_notice: Duration,
    ) -> Self {
        Self {
            in_use,
            notifier,
            labels,
            blocked_notice,
        }
    }

    /// Arbitrate and deliver the notifications the decision calls for.
    pub fn check(&self, source: &dyn TileEntity, target: &dyn TileEntity) -> Decision {
        let decision = self.evaluate(source, target);
        if let Decision::Deny(denial) = decision {
            debug!(source = %source.position(), target = %target.position(), %denial, "distribution denied");
            self.report(source, target, denial);
        }
        decision
    }

    /// Pure decision, no side effects.
    pub fn evaluate(&self, source: &dyn TileEntity, target: &dyn TileEntity) -> Decision {
        // The inbox is normally held by the distributor itself while scanning.
        if let Some(Holder::User(_)) = self.in_use.holder_of(source.position()) {
            return Decision::Deny(Denial::SourceInUse);
        }
        if self.in_use.holder_of(target.position()).is_some() {
            return Decision::Deny(Denial::TargetInUse);
        }

        let Some(target_lock) = target.lock().filter(|lock| lock.is_locked()) else {
            return Decision::Permit;
        };
        if !target_lock.has_password() {
            return Decision::Deny(Denial::LockedWithoutPassword);
        }

        let Some(source_lock) = source.lock().filter(|lock| lock.is_locked()) else {
            return Decision::Deny(Denial::TargetLockedSourceNot);
        };
        if source_lock.password() == target_lock.password() {
            Decision::Permit
        } else {
            Decision::Deny(Denial::PasswordMismatch)
        }
    }

    fn report(&self, source: &dyn TileEntity, target: &dyn TileEntity, denial: Denial) {
        match denial {
            Denial::SourceInUse => self.notifier.play_cue(source.position(), Cue::Blocked),
            Denial::TargetInUse => {
                let pos = target.position();
                if let Some(Holder::User(user)) = self.in_use.holder_of(pos) {
                    self.notifier.notify_user(user, TARGET_IN_USE_MESSAGE, pos);
                }
                self.notifier.play_cue(pos, Cue::Blocked);
            }
            policy => {
                if let Some(notice) = policy.notice() {
                    self.labels.request_notice(target, self.blocked_notice, notice);
                }
                self.notifier.play_cue(target.position(), Cue::Blocked);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{BoundingRegion, Position, UserId};
    use crate::world::memory::{InMemoryInUse, InMemoryWorld, MemoryContainer, Notification, RecordingNotifier};
    use crate::world::{EntityKind, SimpleKind};

    const SOURCE: Position = Position::new(0, 0, 0);
    const TARGET: Position = Position::new(1, 0, 0);

    struct Fixture {
        world: Arc<InMemoryWorld>,
        in_use: Arc<InMemoryInUse>,
        notifier: Arc<RecordingNotifier>,
        arbiter: AccessArbiter,
    }

    fn fixture() -> Fixture {
        let world = Arc::new(InMemoryWorld::new(BoundingRegion::new(
            Position::new(-8, -8, -8),
            Position::new(8, 8, 8),
        )));
        let in_use = Arc::new(InMemoryInUse::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let labels = Arc::new(LabelOverlayService::new(
            world.clone(),
            Arc::new(ManualClock::default()),
            Duration::from_secs(5),
        ));
        let arbiter = AccessArbiter::new(
            in_use.clone(),
            notifier.clone(),
            labels,
            Duration::from_secs(3),
        );
        Fixture {
            world,
            in_use,
            notifier,
            arbiter,
        }
    }

    fn signed(pos: Position, password: Option<Option<&str>>) -> MemoryContainer {
        let container = MemoryContainer::new(pos, EntityKind::Simple(SimpleKind::SignedSecureLoot))
            .with_owner("steam_1")
            .with_label("label");
        match password {
            Some(password) => container.with_lock(password),
            None => container,
        }
    }

    fn decide(f: &Fixture) -> Decision {
        let source = f.world.container(SOURCE).unwrap();
        let target = f.world.container(TARGET).unwrap();
        f.arbiter.check(source.as_ref(), target.as_ref())
    }

    #[test]
    fn test_arbitration_table() {
        // (source lock, target lock, expected)
        let cases: Vec<(Option<Option<&str>>, Option<Option<&str>>, Decision)> = vec![
            (None, None, Decision::Permit),
            (Some(Some("1")), None, Decision::Permit),
            (None, Some(None), Decision::Deny(Denial::LockedWithoutPassword)),
            (Some(Some("1")), Some(None), Decision::Deny(Denial::LockedWithoutPassword)),
            (None, Some(Some("1")), Decision::Deny(Denial::TargetLockedSourceNot)),
            (Some(None), Some(Some("1")), Decision::Deny(Denial::PasswordMismatch)),
            (Some(Some("2")), Some(Some("1")), Decision::Deny(Denial::PasswordMismatch)),
            (Some(Some("1")), Some(Some("1")), Decision::Permit),
        ];

        for (source_lock, target_lock, expected) in cases {
            let f = fixture();
            f.world.insert(signed(SOURCE, source_lock));
            f.world.insert(signed(TARGET, target_lock));
            assert_eq!(
                decide(&f),
                expected,
                "source {:?} target {:?}",
                source_lock,
                target_lock
            );
        }
    }

    #[test]
    fn test_unlockable_target_permits() {
        let f = fixture();
        f.world.insert(signed(SOURCE, None));
        f.world
            .insert(MemoryContainer::new(TARGET, EntityKind::Simple(SimpleKind::Loot)));
        assert_eq!(decide(&f), Decision::Permit);
        assert!(f.notifier.events().is_empty());
    }

    #[test]
    fn test_policy_denial_labels_target_once() {
        let f = fixture();
        f.world.insert(signed(SOURCE, None));
        let target = f.world.insert(signed(TARGET, Some(Some("1"))));

        assert_eq!(decide(&f), Decision::Deny(Denial::TargetLockedSourceNot));
        assert_eq!(
            target.label_state().unwrap().text(),
            Notice::TargetLockedSourceNot.to_string()
        );
        assert_eq!(target.label_state().unwrap().write_count(), 1);
        assert_eq!(f.notifier.cues_at(TARGET), vec![Cue::Blocked]);
    }

    #[test]
    fn test_distributor_hold_on_source_is_ignored() {
        let f = fixture();
        f.world.insert(signed(SOURCE, None));
        f.world.insert(signed(TARGET, None));
        f.in_use.mark_in_use(SOURCE, Holder::Distributor);
        assert_eq!(decide(&f), Decision::Permit);
    }

    #[test]
    fn test_source_in_use_by_player() {
        let f = fixture();
        f.world.insert(signed(SOURCE, None));
        let target = f.world.insert(signed(TARGET, None));
        f.in_use.mark_in_use(SOURCE, Holder::User(UserId(4)));

        assert_eq!(decide(&f), Decision::Deny(Denial::SourceInUse));
        assert_eq!(f.notifier.cues_at(SOURCE), vec![Cue::Blocked]);
        assert_eq!(target.label_state().unwrap().write_count(), 0);
    }

    #[test]
    fn test_target_in_use_messages_holder() {
        let f = fixture();
        f.world.insert(signed(SOURCE, None));
        let target = f.world.insert(signed(TARGET, None));
        f.in_use.mark_in_use(TARGET, Holder::User(UserId(9)));

        assert_eq!(decide(&f), Decision::Deny(Denial::TargetInUse));
        assert_eq!(
            f.notifier.events(),
            vec![
                Notification::Message {
                    user: UserId(9),
                    message: TARGET_IN_USE_MESSAGE.to_string(),
                    pos: TARGET,
                },
                Notification::Cue {
                    pos: TARGET,
                    cue: Cue::Blocked,
                },
            ]
        );
        assert_eq!(target.label_state().unwrap().text(), "label");
    }
}
