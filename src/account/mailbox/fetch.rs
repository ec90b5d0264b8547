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

use super::search::RawLoader;
use super::{Mailbox, Message};
use crate::account::model::*;
use crate::mime::header;
use crate::support::error::Error;

impl Mailbox {
    fn fetch_targets(&self, request: &FetchRequest) -> SeqRange<Uid> {
        self.messages
            .iter()
            .filter(|m| request.uids.contains(m.uid))
            .filter(|m| request.changed_since.map_or(true, |cs| m.modseq > cs))
            .map(|m| m.uid)
            .collect()
    }

    /// Apply the implicit `\Seen` of a `FETCH`.
    ///
    /// If any non-peek body section is requested on a read-write selection,
    /// `\Seen` is added to each targeted message. Returns the effective
    /// changes.
    pub fn mark_fetched_seen(
        &mut self,
        request: &FetchRequest,
    ) -> Vec<FlagChange> {
        if !request.marks_seen() {
            return Vec::new();
        }

        let targets = self.fetch_targets(request);
        if targets.is_empty() {
            return Vec::new();
        }

        self.store(&StoreRequest {
            uids: &targets,
            action: StoreAction::Add,
            flags: &[Flag::Seen],
            unchanged_since: None,
        })
        .changed
    }

    /// Copy out the messages `request` reports on, so the response can be
    /// built after the mailbox is unlocked.
    pub fn fetch_snapshot(&self, request: &FetchRequest) -> Vec<Message> {
        let targets = self.fetch_targets(request);
        self.messages
            .iter()
            .filter(|m| targets.contains(m.uid))
            .cloned()
            .collect()
    }
}

/// Build the `FETCH` response for `messages`, as taken by
/// `Mailbox::fetch_snapshot`.
///
/// Messages in `seen_changes` report their flags whether or not `FLAGS` was
/// asked for. With `CHANGEDSINCE`, `MODSEQ` is always included.
pub fn fetch_messages(
    messages: &[Message],
    request: &FetchRequest,
    seen_changes: Vec<FlagChange>,
    loader: &mut RawLoader<'_>,
) -> Result<FetchResponse, Error> {
    let mut fetched = Vec::with_capacity(messages.len());
    for message in messages {
        let flags_changed = seen_changes.iter().any(|c| c.uid == message.uid);

        let sections = if request.sections.is_empty() {
            Vec::new()
        } else {
            let raw = loader(message)?;
            request
                .sections
                .iter()
                .map(|section| FetchedSection {
                    request: section.clone(),
                    data: extract_section(&raw, section),
                })
                .collect()
        };

        fetched.push(FetchedMessage {
            uid: message.uid,
            flags: if request.flags || flags_changed {
                Some(message.flags.clone())
            } else {
                None
            },
            internal_date: if request.internal_date {
                Some(message.internal_date)
            } else {
                None
            },
            rfc822_size: if request.rfc822_size {
                Some(message.size)
            } else {
                None
            },
            modseq: if request.modseq || request.changed_since.is_some() {
                Some(message.modseq)
            } else {
                None
            },
            sections,
        });
    }

    Ok(FetchResponse {
        messages: fetched,
        seen_changes,
    })
}

/// Slice one section out of a raw message, applying any partial range.
pub fn extract_section(raw: &[u8], section: &SectionRequest) -> Vec<u8> {
    let (head, body) = header::split(raw);
    let data = match section.part {
        SectionPart::Full => raw.to_vec(),
        SectionPart::Header => head.to_vec(),
        SectionPart::Text => body.to_vec(),
        SectionPart::HeaderFields(ref names) => {
            header::select(head, names, true)
        }
        SectionPart::HeaderFieldsNot(ref names) => {
            header::select(head, names, false)
        }
    };

    match section.partial {
        None => data,
        Some((origin, length)) => {
            let start = (origin as usize).min(data.len());
            let end = start.saturating_add(length as usize).min(data.len());
            data[start..end].to_vec()
        }
    }
}
