//! Types decoded from or sent to the mailbox-administration server.

mod acl;
mod capability;
mod flags;
mod mailbox;
mod namespace;
mod quota;
mod sequence;

pub use acl::{AclPreset, AclRights};
pub use capability::{Capability, CapabilitySet, Status};
pub use flags::{Flag, StoreAction};
pub use mailbox::FolderState;
pub use namespace::{Namespace, Namespaces};
pub use quota::Quota;
pub use sequence::{ParseSequenceSetError, SequenceSet};
