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

//! The in-memory mailbox record and the algorithms that mutate it.
//!
//! Everything here is single-threaded; the account layer serialises access
//! to each `Mailbox` behind its own mutex, takes care of persistence, and
//! turns the results into change notifications.
//!
//! The module is split into several files for manageability, but is best
//! thought of as one unit.

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::account::model::*;
use crate::support::error::Error;

mod expunge;
mod fetch;
mod flags;
mod messages;
mod search;

pub use self::fetch::fetch_messages;
pub use self::search::search_messages;

/// One stored message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub uid: Uid,
    /// Value of the mailbox modify index at this message's last mutation.
    pub modseq: Modseq,
    pub internal_date: DateTime<FixedOffset>,
    pub raw: RawRef,
    pub size: u32,
    pub flags: Vec<Flag>,
}

impl Message {
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }
}

/// A mailbox and all its messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub id: MailboxId,
    pub path: String,
    pub attributes: Vec<MailboxAttribute>,
    pub uid_validity: u32,
    /// The UID the next message will receive.
    pub uid_next: Uid,
    pub modify_index: Modseq,
    /// Messages with a UID at or above this have not yet been seen by any
    /// read-write `SELECT` and are `\Recent`.
    pub recent_mark: Uid,
    /// Sorted by ascending UID.
    pub messages: Vec<Message>,
    /// Set once the mailbox has been deleted, for holders of a stale handle.
    #[serde(skip)]
    pub defunct: bool,
}

impl Mailbox {
    pub fn new(
        id: MailboxId,
        path: String,
        attributes: Vec<MailboxAttribute>,
        uid_validity: u32,
    ) -> Self {
        Mailbox {
            id,
            path,
            attributes,
            uid_validity,
            uid_next: Uid::MIN,
            modify_index: Modseq::ZERO,
            recent_mark: Uid::MIN,
            messages: Vec::new(),
            defunct: false,
        }
    }

    /// Fail with `NxMailbox` if the mailbox has been deleted.
    pub fn check_live(&self) -> Result<(), Error> {
        if self.defunct {
            Err(Error::NxMailbox)
        } else {
            Ok(())
        }
    }

    pub fn is_special_use(&self) -> bool {
        self.attributes.iter().any(|a| a.is_special_use())
    }

    /// Find the index of `uid` in `messages`.
    pub fn index_of(&self, uid: Uid) -> Option<usize> {
        self.messages.binary_search_by_key(&uid, |m| m.uid).ok()
    }

    pub fn message(&self, uid: Uid) -> Option<&Message> {
        self.index_of(uid).map(|ix| &self.messages[ix])
    }

    /// Advance the modify index and return the new value.
    fn bump_modseq(&mut self) -> Modseq {
        self.modify_index = self.modify_index.next();
        self.modify_index
    }

    /// Allocate the next UID, failing if the UID space is exhausted.
    fn allocate_uid(&mut self) -> Result<Uid, Error> {
        let uid = self.uid_next;
        self.uid_next = uid.next().ok_or(Error::UidsExhausted)?;
        Ok(uid)
    }

    pub fn count_unseen(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.has_flag(&Flag::Seen))
            .count()
    }

    pub fn count_recent(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.uid >= self.recent_mark)
            .count()
    }

    /// The modseq to report as `HIGHESTMODSEQ`.
    ///
    /// CONDSTORE forbids reporting 0, so an untouched mailbox reports 1.
    pub fn highest_modseq(&self) -> Modseq {
        self.modify_index.max(Modseq(1))
    }

    /// All flags in use in this mailbox, system flags first.
    pub fn flags_in_use(&self) -> Vec<Flag> {
        let mut flags: Vec<Flag> = Flag::SYSTEM.to_vec();
        for message in &self.messages {
            for flag in &message.flags {
                if !flags.contains(flag) {
                    flags.push(flag.clone());
                }
            }
        }
        flags
    }

    /// Produce the `STATUS` response for this mailbox.
    pub fn status(&self, request: &StatusRequest) -> StatusResponse {
        StatusResponse {
            name: request.name.clone(),
            messages: if request.messages {
                Some(self.messages.len())
            } else {
                None
            },
            recent: if request.recent {
                Some(self.count_recent())
            } else {
                None
            },
            uid_next: if request.uid_next {
                Some(self.uid_next)
            } else {
                None
            },
            uid_validity: if request.uid_validity {
                Some(self.uid_validity)
            } else {
                None
            },
            unseen: if request.unseen {
                Some(self.count_unseen())
            } else {
                None
            },
            highest_modseq: if request.highest_modseq {
                Some(self.highest_modseq())
            } else {
                None
            },
        }
    }

    /// Take a `SELECT`/`EXAMINE` snapshot.
    ///
    /// A read-write selection claims every message at or above the recent
    /// mark as `\Recent` for the caller and moves the mark past them, so no
    /// other session sees them as recent.
    pub fn select(&mut self, name: String, read_only: bool) -> SelectResponse {
        let recent: Vec<Uid> = self
            .messages
            .iter()
            .map(|m| m.uid)
            .filter(|&uid| uid >= self.recent_mark)
            .collect();

        if !read_only {
            self.recent_mark = self.uid_next;
        }

        SelectResponse {
            name,
            uids: self.messages.iter().map(|m| m.uid).collect(),
            recent,
            flags: self.flags_in_use(),
            unseen: self
                .messages
                .iter()
                .position(|m| !m.has_flag(&Flag::Seen))
                .map(Seqnum::from_index),
            uid_next: self.uid_next,
            uid_validity: self.uid_validity,
            highest_modseq: self.highest_modseq(),
            read_only,
        }
    }
}
