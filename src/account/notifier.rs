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

//! Fan-out of mailbox changes to the sessions that have the mailbox selected.
//!
//! Entries are queued per mailbox by whoever mutated it, while the mailbox
//! lock is still held, so queue order is modify index order. `fire` then
//! drains the queue and hands each entry to every watcher, holding the queue
//! lock for the whole hand-off so two concurrent `fire` calls can't reorder
//! anything. Handing off only moves the entry into the sink's in-memory
//! outbox; sinks are flushed after the queue lock is released, so a slow
//! client never holds up the mailbox.
//!
//! Lock order: mailbox, then the queue table, then one queue, then whatever
//! `ChangeSink::deliver` takes internally.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::debug;

use super::model::*;

/// Identifies a mailbox across renames.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MailboxKey {
    pub owner: String,
    pub id: MailboxId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Exists,
    Expunge,
    Fetch,
}

/// One queued change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    pub uid: Uid,
    pub flags: Option<Vec<Flag>>,
    pub modseq: Option<Modseq>,
    /// The session that caused the change and has already reported it.
    pub ignore: Option<SessionId>,
}

impl ChangeEntry {
    pub fn exists(uid: Uid) -> Self {
        ChangeEntry {
            kind: ChangeKind::Exists,
            uid,
            flags: None,
            modseq: None,
            ignore: None,
        }
    }

    pub fn expunge(uid: Uid, ignore: Option<SessionId>) -> Self {
        ChangeEntry {
            kind: ChangeKind::Expunge,
            uid,
            flags: None,
            modseq: None,
            ignore,
        }
    }

    pub fn fetch(change: &FlagChange, ignore: Option<SessionId>) -> Self {
        ChangeEntry {
            kind: ChangeKind::Fetch,
            uid: change.uid,
            flags: Some(change.flags.clone()),
            modseq: Some(change.modseq),
            ignore,
        }
    }
}

/// The delivery port of one session.
pub trait ChangeSink: Send + Sync {
    fn session_id(&self) -> SessionId;
    /// Once this returns false the sink is dropped at the next `fire`.
    fn is_active(&self) -> bool;
    /// Take note of `entry`. Called with the queue locked, so this must not
    /// wait on I/O.
    fn deliver(&self, key: &MailboxKey, entry: &ChangeEntry);
    /// Push out whatever `deliver` noted. Called with no locks held.
    fn flush(&self);
}

struct Watcher {
    sink: Arc<dyn ChangeSink>,
    /// Entries with a sequence below this predate the watcher's snapshot.
    since: u64,
}

#[derive(Default)]
struct MailboxQueue {
    pending: VecDeque<(u64, ChangeEntry)>,
    next_seq: u64,
    watchers: Vec<Watcher>,
}

#[derive(Default)]
pub struct Notifier {
    queues: Mutex<HashMap<MailboxKey, Arc<Mutex<MailboxQueue>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, key: &MailboxKey) -> Arc<Mutex<MailboxQueue>> {
        Arc::clone(
            self.queues
                .lock()
                .unwrap()
                .entry(key.clone())
                .or_insert_with(Default::default),
        )
    }

    /// Queue entries for `key`. Must be called with the mailbox locked.
    pub fn add_entries(
        &self,
        key: &MailboxKey,
        entries: impl IntoIterator<Item = ChangeEntry>,
    ) {
        let queue = self.queue(key);
        let mut queue = queue.lock().unwrap();
        // Nobody to tell, and a later watcher must not see these anyway.
        if queue.watchers.is_empty() {
            return;
        }

        for entry in entries {
            let seq = queue.next_seq;
            queue.next_seq += 1;
            queue.pending.push_back((seq, entry));
        }
    }

    /// Start delivering changes of `key` to `sink`.
    ///
    /// Must be called with the mailbox locked, right after taking the
    /// snapshot the sink's view is built from. Entries already queued are
    /// reflected in that snapshot and are never delivered to this sink.
    pub fn watch(&self, key: &MailboxKey, sink: Arc<dyn ChangeSink>) {
        let queue = self.queue(key);
        let mut queue = queue.lock().unwrap();
        let session = sink.session_id();
        queue.watchers.retain(|w| w.sink.session_id() != session);
        let since = queue.next_seq;
        queue.watchers.push(Watcher { sink, since });
        debug!(
            "{}/{:?}: session {:?} watching, {} watcher(s)",
            key.owner,
            key.id,
            session,
            queue.watchers.len()
        );
    }

    pub fn unwatch(&self, key: &MailboxKey, session: SessionId) {
        let queue = self.queue(key);
        let mut queue = queue.lock().unwrap();
        queue.watchers.retain(|w| w.sink.session_id() != session);
    }

    /// Drop everything known about `key`, e.g. after the mailbox is deleted.
    pub fn forget(&self, key: &MailboxKey) {
        self.queues.lock().unwrap().remove(key);
    }

    /// Deliver every pending entry of `key`, in order.
    pub fn fire(&self, key: &MailboxKey) {
        let queue = self.queue(key);
        let mut guard = queue.lock().unwrap();
        let queue = &mut *guard;

        queue.watchers.retain(|w| w.sink.is_active());
        if !queue.pending.is_empty() {
            debug!(
                "{}/{:?}: delivering {} change(s) to {} watcher(s)",
                key.owner,
                key.id,
                queue.pending.len(),
                queue.watchers.len()
            );
        }

        let mut touched = Vec::<Arc<dyn ChangeSink>>::new();
        for (seq, entry) in queue.pending.drain(..) {
            for watcher in &queue.watchers {
                if seq < watcher.since
                    || Some(watcher.sink.session_id()) == entry.ignore
                {
                    continue;
                }

                watcher.sink.deliver(key, &entry);
                let session = watcher.sink.session_id();
                if !touched.iter().any(|s| s.session_id() == session) {
                    touched.push(Arc::clone(&watcher.sink));
                }
            }
        }
        drop(guard);

        for sink in touched {
            sink.flush();
        }
    }

    #[cfg(test)]
    fn watcher_count(&self, key: &MailboxKey) -> usize {
        self.queue(key).lock().unwrap().watchers.len()
    }
}
