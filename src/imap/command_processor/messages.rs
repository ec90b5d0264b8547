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

use std::borrow::Cow;

use chrono::prelude::*;

use super::defs::*;
use crate::account::model::*;
use crate::support::error::Error;

impl CommandProcessor {
    pub(super) fn cmd_append(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let mailbox = astring(&args[0])?;
        let (data, options) = match args[1..].split_last() {
            Some((Token::Literal(data), options)) => (*data, options),
            _ => return Err(parse_error("APPEND requires a literal")),
        };

        let mut request = AppendRequest {
            flags: vec![],
            internal_date: None,
        };
        match options {
            [] => (),
            [Token::List(flags)] => request.flags = parse_flags(flags)?,
            [Token::Quoted(date)] => {
                request.internal_date = Some(parse_datetime(date)?)
            }
            [Token::List(flags), Token::Quoted(date)] => {
                request.flags = parse_flags(flags)?;
                request.internal_date = Some(parse_datetime(date)?);
            }
            _ => return Err(parse_error("Bad APPEND arguments")),
        }

        if data.is_empty() {
            return Err(no(None, "APPEND aborted by empty payload"));
        }

        let response = account!(self)?
            .append(&mailbox, &request, data)
            .map_err(map_error! {
                self,
                NxMailbox => (No, Some(s::RespTextCode::TryCreate)),
                UnsafeName => (No, Some(s::RespTextCode::Cannot)),
                UidsExhausted => (No, Some(s::RespTextCode::Limit)),
            })?;

        ok(
            Some(s::RespTextCode::AppendUid(
                response.uid_validity,
                response.uid.get(),
            )),
            "APPEND completed",
        )
    }

    pub(super) fn cmd_copy(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        self.copy(args, false)
    }

    pub(super) fn cmd_uid_copy(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        self.copy(args, true)
    }

    fn copy(&mut self, args: &[Token<'_>], uid: bool) -> CmdResult {
        let set = args[0]
            .atom()
            .ok_or_else(|| parse_error("Expected sequence set"))?;
        let uids = self.resolve_messages(set, uid)?;
        let destination = astring(&args[1])?;

        let key = selected!(self)?;
        let response = account!(self)?
            .copy(key, &uids, &destination)
            .map_err(map_error! {
                self,
                NxMailbox => (No, Some(s::RespTextCode::TryCreate)),
                UnsafeName => (No, Some(s::RespTextCode::Cannot)),
                UidsExhausted => (No, Some(s::RespTextCode::Limit)),
            })?;

        if response.to_uids.is_empty() {
            return ok(None, "No messages copied");
        }

        let from: SeqRange<Uid> = response.from_uids.iter().copied().collect();
        let to: SeqRange<Uid> = response.to_uids.iter().copied().collect();
        ok(
            Some(s::RespTextCode::CopyUid(
                response.uid_validity,
                from.to_string(),
                to.to_string(),
            )),
            "COPY completed",
        )
    }

    pub(super) fn cmd_expunge(
        &mut self,
        _args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.expunge(None, sender)
    }

    pub(super) fn cmd_uid_expunge(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let set = args[0]
            .atom()
            .ok_or_else(|| parse_error("Expected UID set"))?;
        let uids = self.resolve_messages(set, true)?;
        self.expunge(Some(&uids), sender)
    }

    fn expunge(
        &mut self,
        only: Option<&SeqRange<Uid>>,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        if self.port.view().as_ref().map_or(true, |v| v.read_only) {
            return Err(no(
                Some(s::RespTextCode::Cannot),
                "Mailbox is read-only",
            ));
        }

        let key = selected!(self)?;
        let response = account!(self)?
            .expunge(key, only, self.session.id)
            .map_err(map_error!(self))?;

        {
            let mut view = self.port.view();
            if let Some(view) = view.as_mut() {
                for &uid in &response.expunged {
                    if let Some(seqnum) = view.remove(uid) {
                        sender(s::Response::Expunge(seqnum.get()));
                    }
                }
            }
        }

        match response.modseq {
            Some(modseq) if self.port.condstore() => ok(
                Some(s::RespTextCode::HighestModseq(modseq.get())),
                "EXPUNGE completed",
            ),
            _ => ok(None, "EXPUNGE completed"),
        }
    }
}

/// Parse an IMAP `date-time`, e.g. `" 7-Feb-1994 21:52:25 -0800"`.
pub(super) fn parse_datetime(
    raw: &str,
) -> PartialResult<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw.trim_start(), "%d-%b-%Y %H:%M:%S %z")
        .map_err(|_| parse_error("Invalid date-time"))
}
