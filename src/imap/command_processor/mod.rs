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

//! Implements the IMAP commands, independent of how bytes move on the wire.
//!
//! The server hands over a tokenised command line; the dispatch table checks
//! the argument shape and session state, then the handler interprets the
//! tokens and drives the account. The submodules are best thought of as one
//! single module split up for manageability.

macro_rules! map_error {
    ($this:expr) => {{
        let log_prefix = &$this.log_prefix;
        move |e| catch_all_error_handling(log_prefix, e)
    }};

    ($this:expr, $($($kind:ident)|+ => ($cond:ident, $code:expr),)+) => {{
        let log_prefix = &$this.log_prefix;
        move |e| match e {
            $($(Error::$kind)|* => s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::$cond,
                code: $code,
                quip: Cow::Owned(e.to_string()),
            }),)*
            e => catch_all_error_handling(log_prefix, e),
        }
    }};
}

// account! and selected! are macros instead of methods on CommandProcessor
// since there is no way to express that they borrow only one field; as a
// method, the returned value is considered to borrow the whole
// `CommandProcessor`.
macro_rules! account {
    ($this:expr) => {
        $this.session.account.as_ref().ok_or_else(|| {
            s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::Bad,
                code: None,
                quip: Cow::Borrowed("Not logged in"),
            })
        })
    };
}

macro_rules! selected {
    ($this:expr) => {
        $this.session.selected.as_ref().ok_or_else(|| {
            s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::Bad,
                code: None,
                quip: Cow::Borrowed("No mailbox selected"),
            })
        })
    };
}

mod auth;
mod defs;
mod dispatch;
mod fetch;
mod flags;
mod mailboxes;
mod messages;
mod search;

pub use self::defs::{
    CommandProcessor, SendResponse, Services, APPEND_SIZE_LIMIT,
};
