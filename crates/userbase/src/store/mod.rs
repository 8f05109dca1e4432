//! Record storage.
//!
//! [`RecordStore`] is the narrow, synchronous interface the RPC layer talks
//! to. Implementations must enforce the username/email uniqueness invariant
//! atomically: the uniqueness check and the write it guards happen as one
//! step, so two concurrent writers can never both claim the same value.
//!
//! [`MemoryStore`] is the bundled implementation.

mod memory;

pub use memory::MemoryStore;

use crate::{
    error::Result,
    record::{NewUser, UserId, UserPatch, UserRecord},
};

/// Page size used by the default [`RecordStore::list_all`].
pub const LIST_ALL_PAGE: usize = 256;

pub trait RecordStore: Send + Sync + 'static {
    /// Inserts a new record, assigning its id and creation time.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`](crate::StoreError::Conflict) if the username
    /// or email is already taken.
    fn create(&self, user: NewUser) -> Result<UserRecord>;

    fn get_by_id(&self, id: UserId) -> Result<UserRecord>;

    fn get_by_username(&self, username: &str) -> Result<UserRecord>;

    fn get_by_email(&self, email: &str) -> Result<UserRecord>;

    /// Applies `patch` to the record with `id`.
    ///
    /// A conflicting username or email leaves the record untouched. Setting a
    /// field to the value it already holds is not a conflict.
    fn update(&self, id: UserId, patch: UserPatch) -> Result<UserRecord>;

    fn delete(&self, id: UserId) -> Result<()>;

    /// Returns up to `limit` records with ids strictly greater than `after`,
    /// in ascending id order.
    fn list_page(&self, after: Option<UserId>, limit: usize) -> Result<Vec<UserRecord>>;

    /// Returns every record in ascending id order.
    fn list_all(&self) -> Result<Vec<UserRecord>> {
        let mut all = Vec::new();
        let mut after = None;
        loop {
            let page = self.list_page(after, LIST_ALL_PAGE)?;
            let done = page.len() < LIST_ALL_PAGE;
            after = page.last().map(|record| record.id);
            all.extend(page);
            if done {
                return Ok(all);
            }
        }
    }
}
