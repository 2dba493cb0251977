//! Authorization policy

use crate::error::{Result, TodoError};
use crate::identity::{Identity, Role};

/// Whether the identity may see every owner's items
pub fn can_view_all(identity: &Identity) -> bool {
    identity.has_role(Role::Admin)
}

pub fn require_view_all(identity: &Identity) -> Result<()> {
    if can_view_all(identity) {
        Ok(())
    } else {
        Err(TodoError::Forbidden(format!(
            "{} may not view other users' items",
            identity.id
        )))
    }
}
