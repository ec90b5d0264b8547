//-
// Copyright (c) 2024, The Mailcore Developers
//
// This file is part of Mailcore.
//
// Mailcore is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailcore is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mailcore. If not, see <http://www.gnu.org/licenses/>.

//! Durable storage of mailbox records and per-account metadata.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::mailbox::Mailbox;
use super::model::MailboxId;
use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};

/// Everything about an account that isn't a mailbox.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub subscriptions: BTreeSet<String>,
    /// The greatest UIDVALIDITY ever issued for this account.
    pub last_uid_validity: u32,
    pub next_mailbox_id: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredAccount {
    pub meta: AccountMeta,
    pub mailboxes: Vec<Mailbox>,
}

pub trait StateStore: Send + Sync {
    /// Load everything stored for `owner`, or `None` if the account has
    /// never been saved.
    fn load_account(&self, owner: &str) -> Result<Option<StoredAccount>, Error>;
    fn save_mailbox(&self, owner: &str, mailbox: &Mailbox) -> Result<(), Error>;
    fn remove_mailbox(&self, owner: &str, id: MailboxId) -> Result<(), Error>;
    fn save_account_meta(
        &self,
        owner: &str,
        meta: &AccountMeta,
    ) -> Result<(), Error>;
}

/// Account names become path components, so they must be plain.
pub fn check_owner_name(owner: &str) -> Result<(), Error> {
    if owner.is_empty()
        || owner.starts_with('.')
        || owner.chars().any(|c| '/' == c || '\\' == c || c.is_control())
    {
        Err(Error::UnsafeName)
    } else {
        Ok(())
    }
}

/// Stores each mailbox as its own CBOR file.
///
/// Layout under the root:
///
/// ```text
/// <owner>/account.cbor
/// <owner>/mailboxes/<id>.cbor
/// ```
pub struct CborStateStore {
    root: PathBuf,
}

impl CborStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CborStateStore { root: root.into() }
    }

    fn account_dir(&self, owner: &str) -> Result<PathBuf, Error> {
        check_owner_name(owner)?;
        Ok(self.root.join(owner))
    }

    fn mailbox_dir(&self, owner: &str) -> Result<PathBuf, Error> {
        Ok(self.account_dir(owner)?.join("mailboxes"))
    }
}

impl StateStore for CborStateStore {
    fn load_account(
        &self,
        owner: &str,
    ) -> Result<Option<StoredAccount>, Error> {
        let meta_path = self.account_dir(owner)?.join("account.cbor");
        let meta: AccountMeta = match fs::read(&meta_path) {
            Ok(data) => serde_cbor::from_slice(&data)?,
            Err(e) if std::io::ErrorKind::NotFound == e.kind() => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        let mut mailboxes = Vec::new();
        let dir = self.mailbox_dir(owner)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => Some(entries),
            Err(e) if std::io::ErrorKind::NotFound == e.kind() => None,
            Err(e) => return Err(e.into()),
        };

        for entry in entries.into_iter().flatten() {
            let path = entry?.path();
            if Some("cbor") != path.extension().and_then(|e| e.to_str()) {
                continue;
            }

            let mailbox: Mailbox = serde_cbor::from_slice(&fs::read(&path)?)?;
            mailboxes.push(mailbox);
        }

        mailboxes.sort_by_key(|m| m.id);
        Ok(Some(StoredAccount { meta, mailboxes }))
    }

    fn save_mailbox(
        &self,
        owner: &str,
        mailbox: &Mailbox,
    ) -> Result<(), Error> {
        let dir = self.mailbox_dir(owner)?;
        file_ops::ensure_dir(&dir)?;
        let data = serde_cbor::to_vec(mailbox)?;
        let path = dir.join(format!("{}.cbor", mailbox.id.0));
        file_ops::spit(path, true, 0o600, &data)?;
        Ok(())
    }

    fn remove_mailbox(&self, owner: &str, id: MailboxId) -> Result<(), Error> {
        let path = self.mailbox_dir(owner)?.join(format!("{}.cbor", id.0));
        fs::remove_file(path).ignore_not_found()?;
        Ok(())
    }

    fn save_account_meta(
        &self,
        owner: &str,
        meta: &AccountMeta,
    ) -> Result<(), Error> {
        let dir = self.account_dir(owner)?;
        file_ops::ensure_dir(&dir)?;
        let data = serde_cbor::to_vec(meta)?;
        file_ops::spit(dir.join("account.cbor"), true, 0o600, &data)?;
        Ok(())
    }
}

/// Keeps everything in memory. Used by tests.
#[derive(Default)]
pub struct MemoryStateStore {
    accounts: Mutex<HashMap<String, MemoryAccount>>,
}

#[derive(Default)]
struct MemoryAccount {
    meta: Option<AccountMeta>,
    mailboxes: BTreeMap<MailboxId, Mailbox>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load_account(
        &self,
        owner: &str,
    ) -> Result<Option<StoredAccount>, Error> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts.get(owner).and_then(|account| {
            account.meta.clone().map(|meta| StoredAccount {
                meta,
                mailboxes: account.mailboxes.values().cloned().collect(),
            })
        }))
    }

    fn save_mailbox(
        &self,
        owner: &str,
        mailbox: &Mailbox,
    ) -> Result<(), Error> {
        self.accounts
            .lock()
            .unwrap()
            .entry(owner.to_owned())
            .or_default()
            .mailboxes
            .insert(mailbox.id, mailbox.clone());
        Ok(())
    }

    fn remove_mailbox(&self, owner: &str, id: MailboxId) -> Result<(), Error> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(owner) {
            account.mailboxes.remove(&id);
        }
        Ok(())
    }

    fn save_account_meta(
        &self,
        owner: &str,
        meta: &AccountMeta,
    ) -> Result<(), Error> {
        self.accounts
            .lock()
            .unwrap()
            .entry(owner.to_owned())
            .or_default()
            .meta = Some(meta.clone());
        Ok(())
    }
}
