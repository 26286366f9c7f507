use shared::domain::{User, UserId};
use thiserror::Error;

/// Informational, non-fatal: the user is already part of the selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user {user_id} is already selected")]
pub struct AlreadySelected {
    pub user_id: UserId,
}

/// The working set of users chosen for a new group conversation.
///
/// Uniqueness by id is enforced here, at insertion time, so downstream
/// consumers of `to_id_list` never need to re-deduplicate. Insertion order
/// is preserved for display.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    users: Vec<User>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `user` unless a user with the same id is already present, in
    /// which case the set is left unchanged and `AlreadySelected` is
    /// reported back.
    pub fn add(&mut self, user: User) -> Result<(), AlreadySelected> {
        if self.contains(&user.id) {
            return Err(AlreadySelected { user_id: user.id });
        }
        self.users.push(user);
        Ok(())
    }

    /// Removes the user with the given id. Removing an absent id is a no-op.
    pub fn remove(&mut self, user_id: &UserId) {
        self.users.retain(|user| user.id != *user_id);
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.users.iter().any(|user| user.id == *user_id)
    }

    /// The ordered member id list for a group-creation submission.
    pub fn to_id_list(&self) -> Vec<UserId> {
        self.users.iter().map(|user| user.id.clone()).collect()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}
