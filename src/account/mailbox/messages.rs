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

use chrono::prelude::*;

use super::{Mailbox, Message};
use crate::account::model::*;
use crate::support::error::Error;

impl Mailbox {
    /// Add a new message whose raw data is already in the message store.
    ///
    /// The UID comes from `uid_next` and the modseq from the modify index;
    /// both advance by exactly one.
    pub fn append(
        &mut self,
        request: &AppendRequest,
        raw: RawRef,
        size: u32,
        now: DateTime<FixedOffset>,
    ) -> Result<AppendResponse, Error> {
        let uid = self.allocate_uid()?;
        let modseq = self.bump_modseq();

        let mut flags: Vec<Flag> = Vec::with_capacity(request.flags.len());
        for flag in &request.flags {
            if !flags.contains(flag) {
                flags.push(flag.clone());
            }
        }

        self.messages.push(Message {
            uid,
            modseq,
            internal_date: request.internal_date.unwrap_or(now),
            raw,
            size,
            flags,
        });

        Ok(AppendResponse {
            uid_validity: self.uid_validity,
            uid,
            modseq,
        })
    }

    /// Return copies of the messages in `uids`, ascending, for `COPY`.
    ///
    /// UIDs that don't exist are silently ignored.
    pub fn copy_out(&self, uids: &SeqRange<Uid>) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| uids.contains(m.uid))
            .cloned()
            .collect()
    }

    /// Insert messages copied from another mailbox.
    ///
    /// Each message gets a fresh UID and modseq from this mailbox's
    /// allocators; flags, internal date and raw data are preserved. Returns
    /// the new UIDs, index-aligned with `sources`.
    ///
    /// If the UID space runs out part way, the messages inserted so far stay
    /// and their UIDs are returned with the error discarded; the caller
    /// reports the partial result.
    pub fn copy_in(
        &mut self,
        sources: Vec<Message>,
    ) -> Result<Vec<Uid>, Error> {
        let mut new_uids = Vec::with_capacity(sources.len());
        for mut message in sources {
            let uid = match self.allocate_uid() {
                Ok(uid) => uid,
                Err(e) if new_uids.is_empty() => return Err(e),
                Err(_) => break,
            };

            message.uid = uid;
            message.modseq = self.bump_modseq();
            self.messages.push(message);
            new_uids.push(uid);
        }

        Ok(new_uids)
    }
}
