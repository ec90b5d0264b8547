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

use super::Message;
use crate::account::model::*;
use crate::mime::header;
use crate::support::error::Error;

/// Loads the raw bytes of a message from the message store.
pub type RawLoader<'a> = dyn FnMut(&Message) -> Result<Vec<u8>, Error> + 'a;

/// Evaluate `request.query` against `messages`.
///
/// This only reads, so callers run it on a copy of the message list with
/// the mailbox unlocked. `loader` is only invoked for messages where a
/// criterion actually needs the content, and at most once per message.
pub fn search_messages(
    messages: &[Message],
    request: &SearchRequest<'_>,
    loader: &mut RawLoader<'_>,
) -> Result<SearchResponse, Error> {
    let mut response = SearchResponse::default();

    for message in messages {
        let mut cx = MatchContext {
            message,
            recent: request.recent.contains(message.uid),
            raw: None,
            loader: &mut *loader,
        };

        if cx.matches(request.query)? {
            response.hits.push(message.uid);
            response.highest_modseq =
                response.highest_modseq.max(message.modseq);
        }
    }

    Ok(response)
}

struct MatchContext<'m, 'l, 'a> {
    message: &'m Message,
    recent: bool,
    raw: Option<Vec<u8>>,
    loader: &'l mut RawLoader<'a>,
}

impl MatchContext<'_, '_, '_> {
    fn raw(&mut self) -> Result<&[u8], Error> {
        if self.raw.is_none() {
            self.raw = Some((self.loader)(self.message)?);
        }

        Ok(self.raw.as_deref().unwrap_or_default())
    }

    fn sent_date(&mut self) -> Result<Option<NaiveDate>, Error> {
        let (head, _) = header::split(self.raw()?);
        Ok(header::date(head).map(|d| d.naive_local().date()))
    }

    fn matches(&mut self, query: &SearchQuery) -> Result<bool, Error> {
        let m = self.message;
        let internal = m.internal_date.naive_local().date();

        Ok(match *query {
            SearchQuery::All => true,
            SearchQuery::Answered => m.has_flag(&Flag::Answered),
            SearchQuery::Deleted => m.has_flag(&Flag::Deleted),
            SearchQuery::Draft => m.has_flag(&Flag::Draft),
            SearchQuery::Flagged => m.has_flag(&Flag::Flagged),
            SearchQuery::Seen => m.has_flag(&Flag::Seen),
            SearchQuery::Unanswered => !m.has_flag(&Flag::Answered),
            SearchQuery::Undeleted => !m.has_flag(&Flag::Deleted),
            SearchQuery::Undraft => !m.has_flag(&Flag::Draft),
            SearchQuery::Unflagged => !m.has_flag(&Flag::Flagged),
            SearchQuery::Unseen => !m.has_flag(&Flag::Seen),
            SearchQuery::Keyword(ref flag) => m.has_flag(flag),
            SearchQuery::Unkeyword(ref flag) => !m.has_flag(flag),
            SearchQuery::New => self.recent && !m.has_flag(&Flag::Seen),
            SearchQuery::Old => !self.recent,
            SearchQuery::Recent => self.recent,
            SearchQuery::UidSet(ref uids) => uids.contains(m.uid),
            SearchQuery::Before(date) => internal < date,
            SearchQuery::On(date) => internal == date,
            SearchQuery::Since(date) => internal >= date,
            SearchQuery::SentBefore(date) => {
                self.sent_date()?.map_or(false, |d| d < date)
            }
            SearchQuery::SentOn(date) => {
                self.sent_date()?.map_or(false, |d| d == date)
            }
            SearchQuery::SentSince(date) => {
                self.sent_date()?.map_or(false, |d| d >= date)
            }
            SearchQuery::Larger(size) => m.size > size,
            SearchQuery::Smaller(size) => m.size < size,
            SearchQuery::Header(ref name, ref value) => {
                let (head, _) = header::split(self.raw()?);
                header::values(head, name)
                    .iter()
                    .any(|v| header::contains_ignore_case(v.as_bytes(), value))
            }
            SearchQuery::Body(ref needle) => {
                let (_, body) = header::split(self.raw()?);
                header::contains_ignore_case(body, needle)
            }
            SearchQuery::Text(ref needle) => {
                header::contains_ignore_case(self.raw()?, needle)
            }
            SearchQuery::Modseq(modseq) => m.modseq >= modseq,
            SearchQuery::Not(ref inner) => !self.matches(inner)?,
            SearchQuery::Or(ref a, ref b) => {
                self.matches(a)? || self.matches(b)?
            }
            SearchQuery::And(ref parts) => {
                for part in parts {
                    if !self.matches(part)? {
                        return Ok(false);
                    }
                }
                true
            }
        })
    }
}
