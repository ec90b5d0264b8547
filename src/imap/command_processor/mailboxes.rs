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
use std::sync::Arc;

use log::warn;

use super::defs::*;
use crate::account::model::*;
use crate::account::notifier::ChangeSink;
use crate::imap::session::SelectedView;
use crate::support::error::Error;

impl CommandProcessor {
    pub(super) fn cmd_create(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = astring(&args[0])?;
        account!(self)?.create(&name).map_err(map_error! {
            self,
            MailboxExists => (No, Some(s::RespTextCode::AlreadyExists)),
            UnsafeName => (No, Some(s::RespTextCode::Cannot)),
        })?;
        ok(None, "Mailbox created")
    }

    pub(super) fn cmd_delete(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = astring(&args[0])?;
        account!(self)?.delete(&name).map_err(map_error! {
            self,
            NxMailbox => (No, Some(s::RespTextCode::Nonexistent)),
            SpecialUseMailbox | UnsafeName =>
                (No, Some(s::RespTextCode::Cannot)),
        })?;
        ok(None, "Mailbox deleted")
    }

    pub(super) fn cmd_rename(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let from = astring(&args[0])?;
        let to = astring(&args[1])?;
        account!(self)?.rename(&from, &to).map_err(map_error! {
            self,
            NxMailbox => (No, Some(s::RespTextCode::Nonexistent)),
            MailboxExists | RenameToSelf =>
                (No, Some(s::RespTextCode::AlreadyExists)),
            SpecialUseMailbox | RenameIntoSelf | UnsafeName =>
                (No, Some(s::RespTextCode::Cannot)),
        })?;
        ok(None, "Mailbox renamed")
    }

    pub(super) fn cmd_subscribe(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = astring(&args[0])?;
        account!(self)?.subscribe(&name).map_err(map_error! {
            self,
            NxMailbox => (No, Some(s::RespTextCode::Nonexistent)),
            UnsafeName => (No, Some(s::RespTextCode::Cannot)),
        })?;
        ok(None, "Subscribed")
    }

    pub(super) fn cmd_unsubscribe(
        &mut self,
        args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = astring(&args[0])?;
        account!(self)?.unsubscribe(&name).map_err(map_error! {
            self,
            UnsafeName => (No, Some(s::RespTextCode::Cannot)),
        })?;
        ok(None, "Unsubscribed")
    }

    pub(super) fn cmd_list(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.list(args, false, sender)
    }

    pub(super) fn cmd_lsub(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.list(args, true, sender)
    }

    fn list(
        &mut self,
        args: &[Token<'_>],
        subscribed_only: bool,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let request = ListRequest {
            reference: astring(&args[0])?.into_owned(),
            pattern: astring(&args[1])?.into_owned(),
            subscribed_only,
        };

        let responses =
            account!(self)?.list(&request).map_err(map_error!(self))?;
        for response in responses {
            let list = s::MailboxList {
                flags: response.attributes,
                name: response.name,
            };
            sender(if subscribed_only {
                s::Response::Lsub(list)
            } else {
                s::Response::List(list)
            });
        }

        success()
    }

    pub(super) fn cmd_status(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let mut request = StatusRequest {
            name: astring(&args[0])?.into_owned(),
            ..StatusRequest::default()
        };

        for att in args[1].list().unwrap_or(&[]) {
            let att = att
                .atom()
                .ok_or_else(|| parse_error("Expected status attribute"))?;
            match att.to_ascii_uppercase().as_str() {
                "MESSAGES" => request.messages = true,
                "RECENT" => request.recent = true,
                "UIDNEXT" => request.uid_next = true,
                "UIDVALIDITY" => request.uid_validity = true,
                "UNSEEN" => request.unseen = true,
                "HIGHESTMODSEQ" => {
                    self.port.enable_condstore();
                    request.highest_modseq = true;
                }
                _ => return Err(parse_error("Unknown status attribute")),
            }
        }

        let response = account!(self)?.status(&request).map_err(map_error! {
            self,
            NxMailbox | UnsafeName =>
                (No, Some(s::RespTextCode::Nonexistent)),
        })?;

        let mut atts = Vec::new();
        if let Some(messages) = response.messages {
            atts.push(("MESSAGES", messages as u64));
        }
        if let Some(recent) = response.recent {
            atts.push(("RECENT", recent as u64));
        }
        if let Some(uid_next) = response.uid_next {
            atts.push(("UIDNEXT", u64::from(uid_next.get())));
        }
        if let Some(uid_validity) = response.uid_validity {
            atts.push(("UIDVALIDITY", u64::from(uid_validity)));
        }
        if let Some(unseen) = response.unseen {
            atts.push(("UNSEEN", unseen as u64));
        }
        if let Some(highest_modseq) = response.highest_modseq {
            atts.push(("HIGHESTMODSEQ", highest_modseq.get()));
        }

        sender(s::Response::Status(s::StatusResponse {
            mailbox: response.name,
            atts,
        }));
        success()
    }

    pub(super) fn cmd_select(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.select(args, false, sender)
    }

    pub(super) fn cmd_examine(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.select(args, true, sender)
    }

    fn select(
        &mut self,
        args: &[Token<'_>],
        read_only: bool,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let name = astring(&args[0])?;
        match &args[1..] {
            [] => (),
            [params] => {
                for param in params
                    .list()
                    .ok_or_else(|| parse_error("Bad SELECT parameters"))?
                {
                    match param.atom() {
                        Some(p) if "CONDSTORE".eq_ignore_ascii_case(p) => {
                            self.port.enable_condstore()
                        }
                        _ => {
                            return Err(parse_error(
                                "Unsupported SELECT parameter",
                            ))
                        }
                    }
                }
            }
            _ => return Err(parse_error("Bad SELECT parameters")),
        }

        // A failed SELECT still leaves the session unselected.
        self.deselect();

        let port = Arc::clone(&self.port);
        let sink: Arc<dyn ChangeSink> = Arc::clone(&self.port) as _;
        let (key, _) = account!(self)?
            .select(&name, read_only, sink, |key, response| {
                // Runs under the mailbox lock. The sender only queues, so
                // the lines precede any notification without any socket
                // write happening here.
                *port.view() = Some(SelectedView::new(key.clone(), response));
                send_selection(response, sender);
            })
            .map_err(map_error! {
                self,
                NxMailbox => (No, Some(s::RespTextCode::TryCreate)),
                UnsafeName => (No, Some(s::RespTextCode::Nonexistent)),
            })?;

        self.session.selected = Some(key);
        if read_only {
            ok(Some(s::RespTextCode::ReadOnly), "Mailbox selected")
        } else {
            ok(Some(s::RespTextCode::ReadWrite), "Mailbox selected")
        }
    }

    pub(super) fn cmd_close(
        &mut self,
        _args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        let read_only = self
            .port
            .view()
            .as_ref()
            .map_or(true, |view| view.read_only);

        if !read_only {
            if let (Some(account), Some(key)) =
                (&self.session.account, &self.session.selected)
            {
                // CLOSE expunges silently: detach the view first so the
                // removals aren't reported.
                *self.port.view() = None;
                if let Err(e) = account.expunge(key, None, self.session.id) {
                    warn!(
                        "{} Implicit expunge on CLOSE failed: {}",
                        self.log_prefix, e
                    );
                }
            }
        }

        self.deselect();
        success()
    }

    pub(super) fn cmd_unselect(
        &mut self,
        _args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        self.deselect();
        success()
    }
}

/// Write the untagged part of a `SELECT`/`EXAMINE` response.
fn send_selection(response: &SelectResponse, sender: SendResponse<'_>) {
    sender(s::Response::Flags(response.flags.clone()));
    sender(s::Response::Exists(response.uids.len() as u32));
    sender(s::Response::Recent(response.recent.len() as u32));
    if let Some(unseen) = response.unseen {
        sender(untagged_ok(
            s::RespTextCode::Unseen(unseen.get()),
            "First unseen message",
        ));
    }
    sender(untagged_ok(
        if response.read_only {
            s::RespTextCode::PermanentFlags(vec![], false)
        } else {
            s::RespTextCode::PermanentFlags(Flag::SYSTEM.to_vec(), true)
        },
        "Permanent flags",
    ));
    sender(untagged_ok(
        s::RespTextCode::UidNext(response.uid_next.get()),
        "Predicted next UID",
    ));
    sender(untagged_ok(
        s::RespTextCode::UidValidity(response.uid_validity),
        "UIDs valid",
    ));
    sender(untagged_ok(
        s::RespTextCode::HighestModseq(response.highest_modseq.get()),
        "Highest modseq",
    ));
}

fn untagged_ok(
    code: s::RespTextCode,
    quip: &'static str,
) -> s::Response<'static> {
    s::Response::Cond(s::CondResponse {
        cond: s::RespCondType::Ok,
        code: Some(code),
        quip: Cow::Borrowed(quip),
    })
}
