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
    /// Perform a `STORE` against the messages in `request.uids`.
    ///
    /// Messages are visited in ascending UID order. UIDs that don't exist are
    /// ignored. A message whose flags end up unchanged is not touched at all;
    /// every effective change takes its own modseq.
    pub fn store(&mut self, request: &StoreRequest<'_>) -> StoreResponse {
        let mut response = StoreResponse::default();

        for ix in 0..self.messages.len() {
            let uid = self.messages[ix].uid;
            if !request.uids.contains(uid) {
                continue;
            }

            if request
                .unchanged_since
                .map_or(false, |uc| self.messages[ix].modseq > uc)
            {
                response.modified.append(uid);
                continue;
            }

            let current = &self.messages[ix].flags;
            let new_flags = match request.action {
                StoreAction::Set => {
                    let mut new_flags = Vec::with_capacity(request.flags.len());
                    for flag in request.flags {
                        if !new_flags.contains(flag) {
                            new_flags.push(flag.clone());
                        }
                    }
                    new_flags
                }
                StoreAction::Add => {
                    let mut new_flags = current.clone();
                    for flag in request.flags {
                        if !new_flags.contains(flag) {
                            new_flags.push(flag.clone());
                        }
                    }
                    new_flags
                }
                StoreAction::Remove => current
                    .iter()
                    .filter(|f| !request.flags.contains(f))
                    .cloned()
                    .collect(),
            };

            if same_set(current, &new_flags) {
                continue;
            }

            let modseq = self.bump_modseq();
            let message = &mut self.messages[ix];
            message.flags = new_flags;
            message.modseq = modseq;
            response.changed.push(FlagChange {
                uid,
                flags: message.flags.clone(),
                modseq,
            });
        }

        response
    }
}

fn same_set(a: &[Flag], b: &[Flag]) -> bool {
    a.len() == b.len() && a.iter().all(|f| b.contains(f))
}
