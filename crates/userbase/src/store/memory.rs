use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use parking_lot::RwLock;

use super::RecordStore;
use crate::{
    error::{Lookup, Result, StoreError, UniqueField},
    record::{NewUser, UserId, UserPatch, UserRecord},
    time::{SystemClock, TimeSource},
};

/// An in-memory [`RecordStore`].
///
/// Records live in a `BTreeMap` keyed by id, with hash indexes over the two
/// unique columns. All writes take the same [`RwLock`] write guard, which
/// makes check-then-insert a single critical section.
pub struct MemoryStore<T = SystemClock> {
    inner: RwLock<Inner>,
    time: T,
}

#[derive(Default)]
struct Inner {
    next_id: UserId,
    records: BTreeMap<UserId, UserRecord>,
    usernames: HashMap<String, UserId>,
    emails: HashMap<String, UserId>,
}

impl Inner {
    /// Whether `value` is held by a record other than `owner`.
    fn claimed_by_other(&self, field: UniqueField, value: &str, owner: Option<UserId>) -> bool {
        let index = match field {
            UniqueField::Username => &self.usernames,
            UniqueField::Email => &self.emails,
        };
        index.get(value).is_some_and(|id| Some(*id) != owner)
    }
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_time(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeSource> MemoryStore<T> {
    pub fn with_time(time: T) -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
            time,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: TimeSource + 'static> RecordStore for MemoryStore<T> {
    fn create(&self, user: NewUser) -> Result<UserRecord> {
        let mut inner = self.inner.write();

        if inner.claimed_by_other(UniqueField::Username, &user.username, None) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        if inner.claimed_by_other(UniqueField::Email, &user.email, None) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let record = UserRecord {
            id,
            username: user.username,
            email: user.email,
            age: user.age,
            created_at: self.time.current_millis(),
        };
        inner.usernames.insert(record.username.clone(), id);
        inner.emails.insert(record.email.clone(), id);
        inner.records.insert(id, record.clone());

        tracing::debug!(id, username = %record.username, "record inserted");
        Ok(record)
    }

    fn get_by_id(&self, id: UserId) -> Result<UserRecord> {
        self.inner
            .read()
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(Lookup::Id(id)))
    }

    fn get_by_username(&self, username: &str) -> Result<UserRecord> {
        let inner = self.inner.read();
        inner
            .usernames
            .get(username)
            .and_then(|id| inner.records.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(Lookup::Username(username.to_owned())))
    }

    fn get_by_email(&self, email: &str) -> Result<UserRecord> {
        let inner = self.inner.read();
        inner
            .emails
            .get(email)
            .and_then(|id| inner.records.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(Lookup::Email(email.to_owned())))
    }

    fn update(&self, id: UserId, patch: UserPatch) -> Result<UserRecord> {
        let mut inner = self.inner.write();

        if !inner.records.contains_key(&id) {
            return Err(StoreError::NotFound(Lookup::Id(id)));
        }
        let taken = |field, value: &Option<String>| {
            value
                .as_deref()
                .is_some_and(|value| inner.claimed_by_other(field, value, Some(id)))
        };
        if taken(UniqueField::Username, &patch.username) {
            return Err(StoreError::Conflict(UniqueField::Username));
        }
        if taken(UniqueField::Email, &patch.email) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }

        // Checked above; all fallible work is done before anything mutates.
        let Some(mut record) = inner.records.remove(&id) else {
            return Err(StoreError::NotFound(Lookup::Id(id)));
        };

        if let Some(username) = patch.username {
            inner.usernames.remove(&record.username);
            inner.usernames.insert(username.clone(), id);
            record.username = username;
        }
        if let Some(email) = patch.email {
            inner.emails.remove(&record.email);
            inner.emails.insert(email.clone(), id);
            record.email = email;
        }
        if let Some(age) = patch.age {
            record.age = age;
        }

        inner.records.insert(id, record.clone());
        Ok(record)
    }

    fn delete(&self, id: UserId) -> Result<()> {
        let mut inner = self.inner.write();
        let record = inner
            .records
            .remove(&id)
            .ok_or(StoreError::NotFound(Lookup::Id(id)))?;
        inner.usernames.remove(&record.username);
        inner.emails.remove(&record.email);
        Ok(())
    }

    fn list_page(&self, after: Option<UserId>, limit: usize) -> Result<Vec<UserRecord>> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(self
            .inner
            .read()
            .records
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn list_all(&self) -> Result<Vec<UserRecord>> {
        Ok(self.inner.read().records.values().cloned().collect())
    }
}
