//! User registry — fixed-capacity id → record store.
//!
//! One slot per fingerprint page id in `1..=127`, held in a flat array
//! indexed directly by id.  Capacity never changes and there is no heap
//! allocation: names and phone numbers are `heapless::String`s truncated
//! to the same bounds the enrollment console accepts.
//!
//! The registry and the sensor's template library are updated
//! independently.  The orchestrator writes a record only after the
//! template store succeeded, but nothing rolls the registry back if a
//! later template delete fails, so lookups must tolerate dangling ids.

use core::fmt;
use core::num::NonZeroU8;

use heapless::String;
use log::{info, warn};

use crate::error::RegistryError;

/// Highest valid user / template id.
pub const MAX_USER_ID: u8 = 127;

/// Registry capacity (one slot per id).
pub const CAPACITY: usize = MAX_USER_ID as usize;

/// Maximum stored name length in bytes.
pub const NAME_LEN: usize = 31;

/// Maximum stored phone-number length in bytes.
pub const PHONE_LEN: usize = 15;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Validated user / template id in `1..=127`.  `0` is the "no such user"
/// sentinel and can never be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(NonZeroU8);

impl UserId {
    pub fn new(raw: u8) -> Result<Self, RegistryError> {
        match NonZeroU8::new(raw) {
            Some(id) if raw <= MAX_USER_ID => Ok(Self(id)),
            _ => Err(RegistryError::InvalidId(raw)),
        }
    }

    pub fn get(self) -> u8 {
        self.0.get()
    }

    fn slot(self) -> usize {
        self.0.get() as usize - 1
    }

    /// All valid ids in ascending order.
    pub fn all() -> impl Iterator<Item = UserId> {
        (1..=MAX_USER_ID).filter_map(NonZeroU8::new).map(Self)
    }
}

impl TryFrom<u16> for UserId {
    type Error = RegistryError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        let narrowed = u8::try_from(raw).map_err(|_| RegistryError::InvalidId(u8::MAX))?;
        Self::new(narrowed)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UserRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String<NAME_LEN>,
    pub phone: String<PHONE_LEN>,
    pub notify_on_access: bool,
}

impl UserRecord {
    /// Whether an access confirmation should be sent to the user.
    pub fn wants_notification(&self) -> bool {
        self.notify_on_access && !self.phone.is_empty()
    }
}

/// Copy `src` into a bounded string, cutting at the last char boundary
/// that fits.
pub(crate) fn truncated<const N: usize>(src: &str) -> String<N> {
    let mut end = src.len().min(N);
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // Cannot fail: `end <= N`.
    let _ = out.push_str(&src[..end]);
    out
}

// ---------------------------------------------------------------------------
// UserRegistry
// ---------------------------------------------------------------------------

pub struct UserRegistry {
    slots: [Option<UserRecord>; CAPACITY],
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Write (or overwrite) the record at `id`.  Last write wins.
    pub fn add_user(
        &mut self,
        id: u8,
        name: &str,
        phone: &str,
        notify_on_access: bool,
    ) -> Result<&UserRecord, RegistryError> {
        let id = UserId::new(id).inspect_err(|_| warn!("user: rejected add for id {id}"))?;
        let record = UserRecord {
            id,
            name: truncated(name.trim()),
            phone: truncated(phone.trim()),
            notify_on_access,
        };
        info!("user: added {} (id #{})", record.name, id);
        let stored: &UserRecord = self.slots[id.slot()].insert(record);
        Ok(stored)
    }

    /// Reset the slot to empty.  Succeeds on an already-empty slot.
    pub fn remove_user(&mut self, id: u8) -> Result<Option<UserRecord>, RegistryError> {
        let id = UserId::new(id)?;
        let previous = self.slots[id.slot()].take();
        if let Some(rec) = &previous {
            info!("user: removed {} (id #{})", rec.name, id);
        }
        Ok(previous)
    }

    /// Record at `id`, or `None` for `0`, out-of-range ids and empty slots.
    pub fn get_user(&self, id: u8) -> Option<&UserRecord> {
        UserId::new(id).ok().and_then(|id| self.get(id))
    }

    /// Typed lookup for ids that are already validated.
    pub fn get(&self, id: UserId) -> Option<&UserRecord> {
        self.slots[id.slot()].as_ref()
    }

    /// Every occupied slot, ascending by id.
    pub fn list_users(&self) -> impl Iterator<Item = &UserRecord> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.list_users().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
