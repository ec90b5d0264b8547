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

use super::defs::*;
use crate::account::model::*;
use crate::support::error::Error;

/// The parts of a `STORE` command after the message set.
#[derive(Debug, PartialEq, Eq)]
struct StoreArgs {
    action: StoreAction,
    silent: bool,
    flags: Vec<Flag>,
    unchanged_since: Option<Modseq>,
}

impl CommandProcessor {
    pub(super) fn cmd_store(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.store(args, false, sender)
    }

    pub(super) fn cmd_uid_store(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.store(args, true, sender)
    }

    fn store(
        &mut self,
        args: &[Token<'_>],
        uid: bool,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let set = args[0]
            .atom()
            .ok_or_else(|| parse_error("Expected sequence set"))?;
        let store_args = parse_store_args(&args[1..])?;
        if store_args.unchanged_since.is_some() {
            self.port.enable_condstore();
        }

        if self.port.view().as_ref().map_or(true, |v| v.read_only) {
            return Err(no(
                Some(s::RespTextCode::Cannot),
                "Mailbox is read-only",
            ));
        }

        let uids = self.resolve_messages(set, uid)?;
        let request = StoreRequest {
            uids: &uids,
            action: store_args.action,
            flags: &store_args.flags,
            unchanged_since: store_args.unchanged_since,
        };

        let key = selected!(self)?;
        let response = account!(self)?
            .store(key, &request, self.session.id)
            .map_err(map_error!(self))?;

        let condstore = self.port.condstore();
        let modified = {
            let view = self.port.view();
            let view = match view.as_ref() {
                Some(view) => view,
                None => return success(),
            };

            // Silent stores still report the new modseq under CONDSTORE.
            if !store_args.silent || condstore {
                for change in response.changed {
                    if let Some(fetch) = self.port.flag_fetch(
                        view,
                        change.uid,
                        change.flags,
                        Some(change.modseq),
                        !store_args.silent,
                    ) {
                        sender(fetch);
                    }
                }
            }

            if uid {
                response.modified.to_string()
            } else {
                response
                    .modified
                    .items(Uid::MAX)
                    .filter_map(|uid| view.seqnum(uid))
                    .collect::<SeqRange<Seqnum>>()
                    .to_string()
            }
        };

        if response.modified.is_empty() {
            ok(None, "STORE completed")
        } else {
            ok(
                Some(s::RespTextCode::Modified(modified)),
                "Some messages were modified since UNCHANGEDSINCE",
            )
        }
    }
}

fn parse_store_args(mut args: &[Token<'_>]) -> PartialResult<StoreArgs> {
    let mut unchanged_since = None;
    if let Some(modifiers) = args.first().and_then(Token::list) {
        match modifiers {
            [Token::Atom(name), Token::Atom(value)]
                if "UNCHANGEDSINCE".eq_ignore_ascii_case(name) =>
            {
                unchanged_since = Some(Modseq(
                    value
                        .parse()
                        .map_err(|_| parse_error("Invalid UNCHANGEDSINCE"))?,
                ));
            }
            _ => return Err(parse_error("Unsupported STORE modifier")),
        }
        args = &args[1..];
    }

    let item = args
        .first()
        .and_then(Token::atom)
        .ok_or_else(|| parse_error("Expected STORE data item"))?
        .to_ascii_uppercase();
    args = &args[1..];

    let (action, rest) = if let Some(rest) = item.strip_prefix('+') {
        (StoreAction::Add, rest)
    } else if let Some(rest) = item.strip_prefix('-') {
        (StoreAction::Remove, rest)
    } else {
        (StoreAction::Set, item.as_str())
    };

    let silent = match rest {
        "FLAGS" => false,
        "FLAGS.SILENT" => true,
        _ => return Err(parse_error("Unknown STORE data item")),
    };

    let flags = match args {
        [Token::List(flags)] => parse_flags(flags)?,
        flags => parse_flags(flags)?,
    };

    Ok(StoreArgs {
        action,
        silent,
        flags,
        unchanged_since,
    })
}
