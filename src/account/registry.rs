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

//! The process-wide registry of loaded accounts.
//!
//! Each account is an arena of mailboxes (`table`, indexed by `MailboxId`)
//! plus a path index. Both sit behind one per-account mutex; every mailbox
//! additionally has its own mutex. The account lock is always taken before
//! any mailbox lock and is never held while waiting on a collaborator other
//! than the state store.

use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};

use chrono::prelude::*;
use crossbeam::sync::ShardedLock;
use log::info;
use regex::Regex;

use super::account::Account;
use super::mailbox::{Mailbox, Message};
use super::message_store::MessageStore;
use super::model::*;
use super::notifier::Notifier;
use super::persistence::{check_owner_name, AccountMeta, StateStore};
use crate::support::error::Error;
use crate::support::system_config::DefaultMailbox;

pub struct Registry {
    accounts: ShardedLock<HashMap<String, Arc<AccountState>>>,
    state_store: Arc<dyn StateStore>,
    message_store: Arc<dyn MessageStore>,
    notifier: Arc<Notifier>,
    default_mailboxes: Vec<DefaultMailbox>,
}

pub(super) struct AccountState {
    pub(super) index: Mutex<AccountIndex>,
}

pub(super) struct AccountIndex {
    /// Normalised path to mailbox id.
    pub(super) paths: BTreeMap<String, MailboxId>,
    pub(super) table: Vec<Option<Arc<Mutex<Mailbox>>>>,
    pub(super) meta: AccountMeta,
}

impl AccountIndex {
    fn new(meta: AccountMeta) -> Self {
        AccountIndex {
            paths: BTreeMap::new(),
            table: Vec::new(),
            meta,
        }
    }

    fn install(&mut self, mailbox: Mailbox) -> Arc<Mutex<Mailbox>> {
        let ix = mailbox.id.0 as usize;
        if self.table.len() <= ix {
            self.table.resize_with(ix + 1, || None);
        }

        self.paths.insert(mailbox.path.clone(), mailbox.id);
        let mailbox = Arc::new(Mutex::new(mailbox));
        self.table[ix] = Some(Arc::clone(&mailbox));
        mailbox
    }

    pub(super) fn get(&self, id: MailboxId) -> Option<Arc<Mutex<Mailbox>>> {
        self.table.get(id.0 as usize).and_then(|m| m.clone())
    }

    pub(super) fn lookup(
        &self,
        path: &str,
    ) -> Option<(MailboxId, Arc<Mutex<Mailbox>>)> {
        let id = *self.paths.get(path)?;
        self.get(id).map(|mb| (id, mb))
    }

    pub(super) fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.paths
            .range(prefix.clone()..)
            .next()
            .map_or(false, |(p, _)| p.starts_with(&prefix))
    }

    /// Issue a UIDVALIDITY strictly greater than any issued before, using
    /// the current time where possible.
    fn next_uid_validity(&mut self) -> u32 {
        let now = u32::try_from(Utc::now().timestamp().max(1))
            .unwrap_or(u32::MAX);
        let v = now.max(self.meta.last_uid_validity.saturating_add(1));
        self.meta.last_uid_validity = v;
        v
    }

    /// Create and index a new empty mailbox at `path`.
    pub(super) fn create_mailbox(
        &mut self,
        path: String,
        attributes: Vec<MailboxAttribute>,
    ) -> Arc<Mutex<Mailbox>> {
        let id = MailboxId(self.meta.next_mailbox_id);
        self.meta.next_mailbox_id += 1;
        let uid_validity = self.next_uid_validity();
        self.install(Mailbox::new(id, path, attributes, uid_validity))
    }

    /// Create every missing proper ancestor of `path`.
    pub(super) fn create_parents(
        &mut self,
        path: &str,
    ) -> Vec<Arc<Mutex<Mailbox>>> {
        let mut created = Vec::new();
        for (ix, _) in path.match_indices('/') {
            let parent = &path[..ix];
            if !self.paths.contains_key(parent) {
                created.push(self.create_mailbox(parent.to_owned(), vec![]));
            }
        }
        created
    }
}

impl Registry {
    pub fn new(
        state_store: Arc<dyn StateStore>,
        message_store: Arc<dyn MessageStore>,
        notifier: Arc<Notifier>,
        default_mailboxes: Vec<DefaultMailbox>,
    ) -> Self {
        Registry {
            accounts: ShardedLock::new(HashMap::new()),
            state_store,
            message_store,
            notifier,
            default_mailboxes,
        }
    }

    /// Get a handle on `owner`'s account, loading or provisioning it first
    /// if this is the first time it is touched.
    pub fn account(&self, owner: &str) -> Result<Account, Error> {
        check_owner_name(owner)?;

        let existing = self.accounts.read().unwrap().get(owner).cloned();
        let state = match existing {
            Some(state) => state,
            None => {
                let mut accounts = self.accounts.write().unwrap();
                match accounts.get(owner) {
                    Some(state) => Arc::clone(state),
                    None => {
                        let state = Arc::new(self.load_or_provision(owner)?);
                        accounts.insert(owner.to_owned(), Arc::clone(&state));
                        state
                    }
                }
            }
        };

        Ok(Account::new(
            owner.to_owned(),
            state,
            Arc::clone(&self.state_store),
            Arc::clone(&self.message_store),
            Arc::clone(&self.notifier),
        ))
    }

    fn load_or_provision(&self, owner: &str) -> Result<AccountState, Error> {
        if let Some(stored) = self.state_store.load_account(owner)? {
            let mut index = AccountIndex::new(stored.meta);
            for mailbox in stored.mailboxes {
                index.install(mailbox);
            }

            return Ok(AccountState {
                index: Mutex::new(index),
            });
        }

        info!("Provisioning new account {:?}", owner);
        let mut index = AccountIndex::new(AccountMeta::default());
        for default in &self.default_mailboxes {
            let path = normalise_path(&default.name)?;
            if index.paths.contains_key(&path) {
                continue;
            }

            let mailbox = index.create_mailbox(
                path.clone(),
                default.special_use.into_iter().collect(),
            );
            index.meta.subscriptions.insert(path);
            self.state_store
                .save_mailbox(owner, &mailbox.lock().unwrap())?;
        }
        self.state_store.save_account_meta(owner, &index.meta)?;

        Ok(AccountState {
            index: Mutex::new(index),
        })
    }

    pub fn list_mailboxes(&self, owner: &str) -> Result<Vec<String>, Error> {
        Ok(self.account(owner)?.list_mailboxes())
    }

    pub fn mailbox_exists(
        &self,
        owner: &str,
        path: &str,
    ) -> Result<bool, Error> {
        Ok(self.account(owner)?.mailbox_exists(path))
    }

    pub fn count_messages(
        &self,
        owner: &str,
        path: &str,
        filter: impl Fn(&Message) -> bool,
    ) -> Result<usize, Error> {
        self.account(owner)?.count_messages(path, filter)
    }
}

/// Normalise a client-supplied mailbox name.
///
/// Empty components are dropped and a leading `INBOX` in any case becomes
/// `INBOX`. Names that are empty or contain wildcards or control characters
/// are rejected.
pub fn normalise_path(name: &str) -> Result<String, Error> {
    let mut path = String::with_capacity(name.len());
    for (ix, part) in name.split('/').filter(|s| !s.is_empty()).enumerate() {
        if part.chars().any(|c| c.is_control() || '%' == c || '*' == c) {
            return Err(Error::UnsafeName);
        }

        if ix > 0 {
            path.push('/');
        }

        if 0 == ix && "inbox".eq_ignore_ascii_case(part) {
            path.push_str("INBOX");
        } else {
            path.push_str(part);
        }
    }

    if path.is_empty() {
        Err(Error::UnsafeName)
    } else {
        Ok(path)
    }
}

/// Build a predicate matching normalised paths against a `LIST` pattern.
///
/// `*` matches anything, `%` anything except the `/` delimiter.
pub fn path_matcher(pattern: &str) -> impl Fn(&str) -> bool {
    let mut rx = "^".to_owned();
    for (ix, part) in pattern.split('/').filter(|s| !s.is_empty()).enumerate()
    {
        if ix > 0 {
            rx.push('/');
        }

        if 0 == ix && "inbox".eq_ignore_ascii_case(part) {
            rx.push_str("INBOX");
            continue;
        }

        let mut literal = String::new();
        for c in part.chars() {
            let wildcard = match c {
                '*' => ".*",
                '%' => "[^/]*",
                c => {
                    literal.push(c);
                    continue;
                }
            };

            rx.push_str(&regex::escape(&literal));
            literal.clear();
            rx.push_str(wildcard);
        }
        rx.push_str(&regex::escape(&literal));
    }
    rx.push('$');

    let rx = Regex::new(&rx).ok();
    move |path| rx.as_ref().map_or(false, |rx| rx.is_match(path))
}
