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

use super::Mailbox;
use crate::account::model::*;

impl Mailbox {
    /// Remove every `\Deleted` message, or only those in `only` for
    /// `UID EXPUNGE`.
    ///
    /// `uid_next` and `uid_validity` never change. If at least one message
    /// goes away, the modify index advances by exactly one.
    pub fn expunge_deleted(
        &mut self,
        only: Option<&SeqRange<Uid>>,
    ) -> ExpungeResponse {
        let mut expunged = Vec::new();

        for ix in (0..self.messages.len()).rev() {
            let message = &self.messages[ix];
            if message.has_flag(&Flag::Deleted)
                && only.map_or(true, |only| only.contains(message.uid))
            {
                expunged.push(self.messages.remove(ix).uid);
            }
        }

        expunged.reverse();

        let modseq = if expunged.is_empty() {
            None
        } else {
            Some(self.bump_modseq())
        };

        ExpungeResponse { expunged, modseq }
    }
}
