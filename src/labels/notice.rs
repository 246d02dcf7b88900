//! Status texts shown on containers.

use std::fmt;

/// Message sent to a player whose open container could not be organized.
pub const TARGET_IN_USE_MESSAGE: &str =
    "Inbox was [ff8000]unable to organize this container[-] as it was in use.";

/// A distribution outcome reported on a container label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Items were moved into the container.
    Transferred(u32),
    /// The container is locked but has no password.
    LockedWithoutPassword,
    /// The container is locked and the inbox is not.
    TargetLockedSourceNot,
    /// Container and inbox passwords differ.
    PasswordMismatch,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transferred(count) => write!(
                f,
                "Added + Sorted\n{} Item{}",
                count,
                if *count == 1 { "" } else { "s" }
            ),
            Self::LockedWithoutPassword => {
                write!(f, "Can't Distribute: Container Locked without password")
            }
            Self::TargetLockedSourceNot => {
                write!(f, "Can't Distribute: Container Locked but Inbox is not")
            }
            Self::PasswordMismatch => write!(f, "Can't Distribute: Password Does not match Inbox"),
        }
    }
}
