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

use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};

use chrono::prelude::*;
use log::error;

use super::mailbox::{fetch_messages, search_messages, Mailbox, Message};
use super::message_store::MessageStore;
use super::model::*;
use super::notifier::{ChangeEntry, ChangeSink, MailboxKey, Notifier};
use super::persistence::{AccountMeta, StateStore};
use super::registry::{normalise_path, path_matcher, AccountState};
use crate::support::error::Error;

/// A handle on one user's mailboxes.
///
/// Every operation that mutates a mailbox does so under that mailbox's lock.
/// The change is made to a copy, which replaces the live mailbox only once
/// it has been saved; then the resulting change entries are queued before
/// the lock is released. Delivery happens after the lock is released.
#[derive(Clone)]
pub struct Account {
    owner: String,
    state: Arc<AccountState>,
    state_store: Arc<dyn StateStore>,
    message_store: Arc<dyn MessageStore>,
    notifier: Arc<Notifier>,
}

impl Account {
    pub(super) fn new(
        owner: String,
        state: Arc<AccountState>,
        state_store: Arc<dyn StateStore>,
        message_store: Arc<dyn MessageStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Account {
            owner,
            state,
            state_store,
            message_store,
            notifier,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn key(&self, id: MailboxId) -> MailboxKey {
        MailboxKey {
            owner: self.owner.clone(),
            id,
        }
    }

    fn persist(&self, mailbox: &Mailbox) -> Result<(), Error> {
        self.state_store
            .save_mailbox(&self.owner, mailbox)
            .map_err(|e| {
                error!(
                    "{}: Failed to save mailbox {:?}: {}",
                    self.owner, mailbox.path, e
                );
                e
            })
    }

    /// Apply `f` to a copy of `mailbox`, save the copy if `f` reports it
    /// dirty, and only then install it. On any error `mailbox` is left
    /// untouched.
    fn commit<R>(
        &self,
        mailbox: &mut Mailbox,
        f: impl FnOnce(&mut Mailbox) -> Result<(R, bool), Error>,
    ) -> Result<R, Error> {
        let mut draft = mailbox.clone();
        let (result, dirty) = f(&mut draft)?;
        if dirty {
            self.persist(&draft)?;
        }
        *mailbox = draft;
        Ok(result)
    }

    fn persist_meta(&self, meta: &AccountMeta) -> Result<(), Error> {
        self.state_store
            .save_account_meta(&self.owner, meta)
            .map_err(|e| {
                error!(
                    "{}: Failed to save account metadata: {}",
                    self.owner, e
                );
                e
            })
    }

    fn lookup(
        &self,
        name: &str,
    ) -> Result<(MailboxKey, Arc<Mutex<Mailbox>>), Error> {
        let path = normalise_path(name)?;
        let (id, mailbox) = self
            .state
            .index
            .lock()
            .unwrap()
            .lookup(&path)
            .ok_or(Error::NxMailbox)?;
        Ok((self.key(id), mailbox))
    }

    fn by_key(&self, key: &MailboxKey) -> Result<Arc<Mutex<Mailbox>>, Error> {
        self.state
            .index
            .lock()
            .unwrap()
            .get(key.id)
            .ok_or(Error::NxMailbox)
    }

    /// All mailbox paths, sorted.
    pub fn list_mailboxes(&self) -> Vec<String> {
        self.state.index.lock().unwrap().paths.keys().cloned().collect()
    }

    pub fn mailbox_exists(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Count the messages in `name` which satisfy `filter`.
    pub fn count_messages(
        &self,
        name: &str,
        filter: impl Fn(&Message) -> bool,
    ) -> Result<usize, Error> {
        let (_, mailbox) = self.lookup(name)?;
        let mailbox = mailbox.lock().unwrap();
        mailbox.check_live()?;
        Ok(mailbox.messages.iter().filter(|m| filter(m)).count())
    }

    /// `CREATE`. Missing parent mailboxes are created too.
    pub fn create(&self, name: &str) -> Result<String, Error> {
        let path = normalise_path(name)?;
        let mut index = self.state.index.lock().unwrap();
        if index.paths.contains_key(&path) {
            return Err(Error::MailboxExists);
        }

        let mut created = index.create_parents(&path);
        created.push(index.create_mailbox(path.clone(), vec![]));

        for mailbox in &created {
            self.persist(&mailbox.lock().unwrap())?;
        }
        self.persist_meta(&index.meta)?;

        Ok(path)
    }

    /// `DELETE`. Inferior mailboxes are left alone.
    pub fn delete(&self, name: &str) -> Result<(), Error> {
        let path = normalise_path(name)?;
        let mut index = self.state.index.lock().unwrap();
        let (id, mailbox) = index.lookup(&path).ok_or(Error::NxMailbox)?;

        {
            let mut mailbox = mailbox.lock().unwrap();
            if "INBOX" == path || mailbox.is_special_use() {
                return Err(Error::SpecialUseMailbox);
            }
            mailbox.defunct = true;
        }

        index.paths.remove(&path);
        index.table[id.0 as usize] = None;
        drop(index);

        self.notifier.forget(&self.key(id));
        self.state_store
            .remove_mailbox(&self.owner, id)
            .map_err(|e| {
                error!(
                    "{}: Failed to remove mailbox {:?}: {}",
                    self.owner, path, e
                );
                e
            })
    }

    /// `RENAME`. Inferior mailboxes move along with the named one; counters,
    /// messages and UIDVALIDITY are unchanged.
    pub fn rename(&self, from: &str, to: &str) -> Result<(), Error> {
        let from = normalise_path(from)?;
        let to = normalise_path(to)?;
        if from == to {
            return Err(Error::RenameToSelf);
        }

        let from_children = format!("{}/", from);
        if to.starts_with(&from_children) {
            return Err(Error::RenameIntoSelf);
        }

        let mut index = self.state.index.lock().unwrap();
        let (_, source) = index.lookup(&from).ok_or(Error::NxMailbox)?;
        if "INBOX" == from || source.lock().unwrap().is_special_use() {
            return Err(Error::SpecialUseMailbox);
        }

        let moves: Vec<(String, String, MailboxId)> = index
            .paths
            .iter()
            .filter(|&(path, _)| {
                *path == from || path.starts_with(&from_children)
            })
            .map(|(path, &id)| {
                (path.clone(), format!("{}{}", to, &path[from.len()..]), id)
            })
            .collect();

        if moves.iter().any(|(_, new, _)| index.paths.contains_key(new)) {
            return Err(Error::MailboxExists);
        }

        let created = index.create_parents(&to);
        for (old, _, _) in &moves {
            index.paths.remove(old);
        }
        for (_, new, id) in &moves {
            index.paths.insert(new.clone(), *id);
        }

        let mut result = Ok(());
        for mailbox in &created {
            result = result.and(self.persist(&mailbox.lock().unwrap()));
        }
        for (_, new, id) in &moves {
            if let Some(mailbox) = index.get(*id) {
                let mut mailbox = mailbox.lock().unwrap();
                mailbox.path = new.clone();
                result = result.and(self.persist(&mailbox));
            }
        }
        if !created.is_empty() {
            result = result.and(self.persist_meta(&index.meta));
        }

        result
    }

    pub fn subscribe(&self, name: &str) -> Result<(), Error> {
        let path = normalise_path(name)?;
        let mut index = self.state.index.lock().unwrap();
        if !index.paths.contains_key(&path) {
            return Err(Error::NxMailbox);
        }

        if index.meta.subscriptions.insert(path) {
            self.persist_meta(&index.meta)?;
        }
        Ok(())
    }

    /// Unsubscribing from something not subscribed is not an error.
    pub fn unsubscribe(&self, name: &str) -> Result<(), Error> {
        let path = normalise_path(name)?;
        let mut index = self.state.index.lock().unwrap();
        if index.meta.subscriptions.remove(&path) {
            self.persist_meta(&index.meta)?;
        }
        Ok(())
    }

    /// `LIST` and `LSUB`.
    ///
    /// Names that only exist as ancestors of other mailboxes are listed as
    /// `\Noselect`.
    pub fn list(
        &self,
        request: &ListRequest,
    ) -> Result<Vec<ListResponse>, Error> {
        if request.pattern.is_empty() {
            return Ok(vec![ListResponse {
                name: String::new(),
                attributes: vec![MailboxAttribute::Noselect],
            }]);
        }

        // Wildcards in the reference have no significance, and no mailbox
        // can contain them.
        if request.reference.contains('%') || request.reference.contains('*')
        {
            return Ok(vec![]);
        }

        let mut pattern = request.reference.clone();
        if !pattern.is_empty() && !pattern.ends_with('/') {
            pattern.push('/');
        }
        pattern.push_str(&request.pattern);
        let matcher = path_matcher(&pattern);

        let index = self.state.index.lock().unwrap();
        let mut responses = Vec::new();

        if request.subscribed_only {
            for name in index.meta.subscriptions.iter().filter(|n| matcher(n))
            {
                let attributes = match index.lookup(name) {
                    Some((_, mailbox)) => {
                        mailbox.lock().unwrap().attributes.clone()
                    }
                    None => vec![MailboxAttribute::Noselect],
                };
                responses.push(ListResponse {
                    name: name.clone(),
                    attributes,
                });
            }
        } else {
            let mut phantoms = BTreeSet::new();
            for (path, &id) in &index.paths {
                for (ix, _) in path.match_indices('/') {
                    let ancestor = &path[..ix];
                    if !index.paths.contains_key(ancestor)
                        && matcher(ancestor)
                    {
                        phantoms.insert(ancestor.to_owned());
                    }
                }

                if !matcher(path) {
                    continue;
                }

                let mut attributes = match index.get(id) {
                    Some(mailbox) => {
                        mailbox.lock().unwrap().attributes.clone()
                    }
                    None => continue,
                };
                attributes.push(if index.has_children(path) {
                    MailboxAttribute::HasChildren
                } else {
                    MailboxAttribute::HasNoChildren
                });
                responses.push(ListResponse {
                    name: path.clone(),
                    attributes,
                });
            }

            responses.extend(phantoms.into_iter().map(|name| ListResponse {
                name,
                attributes: vec![
                    MailboxAttribute::Noselect,
                    MailboxAttribute::HasChildren,
                ],
            }));
        }

        responses.sort();
        Ok(responses)
    }

    pub fn status(
        &self,
        request: &StatusRequest,
    ) -> Result<StatusResponse, Error> {
        let (_, mailbox) = self.lookup(&request.name)?;
        let mailbox = mailbox.lock().unwrap();
        mailbox.check_live()?;
        Ok(mailbox.status(request))
    }

    /// `SELECT` or `EXAMINE`.
    ///
    /// While the mailbox is still locked, `attach` is called so the caller
    /// can install its view of the snapshot, and then `sink` starts watching
    /// for changes. Nothing that happens after the snapshot can be missed,
    /// and nothing before it is replayed.
    pub fn select(
        &self,
        name: &str,
        read_only: bool,
        sink: Arc<dyn ChangeSink>,
        attach: impl FnOnce(&MailboxKey, &SelectResponse),
    ) -> Result<(MailboxKey, SelectResponse), Error> {
        let (key, mailbox) = self.lookup(name)?;
        let mut mailbox = mailbox.lock().unwrap();
        mailbox.check_live()?;

        let path = mailbox.path.clone();
        let response = mailbox.select(path, read_only);
        if !read_only && !response.recent.is_empty() {
            // The recent mark is soft state; losing it only means messages
            // are \Recent again after a restart.
            let _ = self.persist(&mailbox);
        }

        attach(&key, &response);
        self.notifier.watch(&key, sink);
        Ok((key, response))
    }

    /// Stop delivering changes of `key` to `session`.
    pub fn unwatch(&self, key: &MailboxKey, session: SessionId) {
        self.notifier.unwatch(key, session);
    }

    /// Deliver any changes queued for `key`.
    pub fn poll(&self, key: &MailboxKey) {
        self.notifier.fire(key);
    }

    /// `APPEND`. The raw data goes to the message store before the mailbox
    /// is locked.
    pub fn append(
        &self,
        name: &str,
        request: &AppendRequest,
        data: &[u8],
    ) -> Result<AppendResponse, Error> {
        let (key, mailbox) = self.lookup(name)?;
        let raw = self.message_store.put(&self.owner, data).map_err(|e| {
            error!("{}: Failed to store message data: {}", self.owner, e);
            e
        })?;
        let size = u32::try_from(data.len()).unwrap_or(u32::MAX);

        let response = {
            let mut mailbox = mailbox.lock().unwrap();
            mailbox.check_live()?;
            let response = self.commit(&mut mailbox, |mailbox| {
                let response =
                    mailbox.append(request, raw, size, Utc::now().into())?;
                Ok((response, true))
            })?;
            self.notifier
                .add_entries(&key, vec![ChangeEntry::exists(response.uid)]);
            response
        };

        self.notifier.fire(&key);
        Ok(response)
    }

    /// `STORE`. Other sessions are told about each effective change; the
    /// caller reports its own.
    pub fn store(
        &self,
        key: &MailboxKey,
        request: &StoreRequest<'_>,
        session: SessionId,
    ) -> Result<StoreResponse, Error> {
        let mailbox = self.by_key(key)?;
        let response = {
            let mut mailbox = mailbox.lock().unwrap();
            mailbox.check_live()?;
            let response = self.commit(&mut mailbox, |mailbox| {
                let response = mailbox.store(request);
                let dirty = !response.changed.is_empty();
                Ok((response, dirty))
            })?;
            self.notifier.add_entries(
                key,
                response
                    .changed
                    .iter()
                    .map(|c| ChangeEntry::fetch(c, Some(session))),
            );
            response
        };

        self.notifier.fire(key);
        Ok(response)
    }

    /// `EXPUNGE`, `UID EXPUNGE` and the implicit expunge of `CLOSE`.
    pub fn expunge(
        &self,
        key: &MailboxKey,
        only: Option<&SeqRange<Uid>>,
        session: SessionId,
    ) -> Result<ExpungeResponse, Error> {
        let mailbox = self.by_key(key)?;
        let response = {
            let mut mailbox = mailbox.lock().unwrap();
            mailbox.check_live()?;
            let response = self.commit(&mut mailbox, |mailbox| {
                let response = mailbox.expunge_deleted(only);
                let dirty = !response.expunged.is_empty();
                Ok((response, dirty))
            })?;
            self.notifier.add_entries(
                key,
                response
                    .expunged
                    .iter()
                    .map(|&uid| ChangeEntry::expunge(uid, Some(session))),
            );
            response
        };

        self.notifier.fire(key);
        Ok(response)
    }

    /// `COPY`. The source is only read, and is unlocked before the
    /// destination is locked.
    pub fn copy(
        &self,
        source: &MailboxKey,
        uids: &SeqRange<Uid>,
        destination: &str,
    ) -> Result<CopyResponse, Error> {
        let copied = {
            let source = self.by_key(source)?;
            let source = source.lock().unwrap();
            source.check_live()?;
            source.copy_out(uids)
        };

        let (dst_key, dst) = self.lookup(destination)?;
        let mut from_uids: Vec<Uid> = copied.iter().map(|m| m.uid).collect();

        let response = {
            let mut dst = dst.lock().unwrap();
            dst.check_live()?;
            let to_uids = self.commit(&mut dst, |dst| {
                let to_uids = dst.copy_in(copied)?;
                let dirty = !to_uids.is_empty();
                Ok((to_uids, dirty))
            })?;
            from_uids.truncate(to_uids.len());
            self.notifier.add_entries(
                &dst_key,
                to_uids.iter().map(|&uid| ChangeEntry::exists(uid)),
            );
            CopyResponse {
                uid_validity: dst.uid_validity,
                from_uids,
                to_uids,
            }
        };

        self.notifier.fire(&dst_key);
        Ok(response)
    }

    /// `FETCH`. Implicit `\Seen` changes are reported to other sessions.
    ///
    /// Message data is loaded after the mailbox is unlocked.
    pub fn fetch(
        &self,
        key: &MailboxKey,
        request: &FetchRequest,
        session: SessionId,
    ) -> Result<FetchResponse, Error> {
        let mailbox = self.by_key(key)?;
        let (seen_changes, messages) = {
            let mut mailbox = mailbox.lock().unwrap();
            mailbox.check_live()?;
            let seen_changes = self.commit(&mut mailbox, |mailbox| {
                let changes = mailbox.mark_fetched_seen(request);
                let dirty = !changes.is_empty();
                Ok((changes, dirty))
            })?;
            self.notifier.add_entries(
                key,
                seen_changes
                    .iter()
                    .map(|c| ChangeEntry::fetch(c, Some(session))),
            );
            (seen_changes, mailbox.fetch_snapshot(request))
        };

        self.notifier.fire(key);
        fetch_messages(&messages, request, seen_changes, &mut |m: &Message| {
            self.message_store.get(&self.owner, &m.raw)
        })
    }

    /// `SEARCH`. `recent` is the set the caller holds as `\Recent`.
    ///
    /// Runs on a copy of the message list so content criteria don't hold
    /// the mailbox lock.
    pub fn search(
        &self,
        key: &MailboxKey,
        query: &SearchQuery,
        recent: &SeqRange<Uid>,
    ) -> Result<SearchResponse, Error> {
        let messages = {
            let mailbox = self.by_key(key)?;
            let mailbox = mailbox.lock().unwrap();
            mailbox.check_live()?;
            mailbox.messages.clone()
        };

        search_messages(
            &messages,
            &SearchRequest { query, recent },
            &mut |m: &Message| self.message_store.get(&self.owner, &m.raw),
        )
    }
}
