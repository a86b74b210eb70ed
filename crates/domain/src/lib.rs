//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod entity;
mod record_count;
mod schedule;

pub use access::{AceGrant, Action, ActionList, Principal};
pub use entity::{
    EntityKind, NewGroup, NewResource, NewUser, PLACEHOLDER_DESCRIPTION,
    PLACEHOLDER_PASSWORD_HASH, ResourceOrigin, UserType,
};
pub use record_count::{RECORD_TYPE_COUNT, RecordCount, RecordType};
pub use schedule::{RECORDS_PER_STEP, record_count_for_iteration};
