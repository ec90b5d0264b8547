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

use log::{info, warn};
use secstr::SecUtf8;

use super::defs::*;
use crate::account::auth::AuthMethod;
use crate::support::error::Error;

impl CommandProcessor {
    pub(super) fn cmd_capability(
        &mut self,
        _args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        sender(s::Response::Capability(
            self.capabilities().into_iter().map(Cow::Borrowed).collect(),
        ));
        success()
    }

    /// `NOOP` and `CHECK`. Both just flush pending notifications.
    pub(super) fn cmd_noop(
        &mut self,
        _args: &[Token<'_>],
        _sender: SendResponse<'_>,
    ) -> CmdResult {
        self.poll();
        success()
    }

    pub(super) fn cmd_logout(
        &mut self,
        _args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        sender(s::Response::Cond(s::CondResponse {
            cond: s::RespCondType::Bye,
            code: None,
            quip: Cow::Borrowed("BYE"),
        }));
        self.deselect();
        self.session.logged_out = true;
        ok(None, "LOGOUT completed")
    }

    pub(super) fn cmd_login(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let userid = astring(&args[0])?;
        let password = astring(&args[1])?;

        if !self.session.secure
            && !self.services.config.security.allow_insecure_login
        {
            sender(bad("Cleartext LOGIN is disabled"));
            return Err(no(
                Some(s::RespTextCode::PrivacyRequired),
                "LOGIN is only permitted over TLS",
            ));
        }

        let principal = match self.services.authenticator.authenticate(
            &userid,
            &SecUtf8::from(password.as_ref()),
            AuthMethod::Plain,
        ) {
            Ok(principal) => principal,
            Err(Error::AuthenticationFailed) => {
                // Attempts with no password aren't remarkable, and a
                // password equal to the user id is probably a password
                // typed into the wrong field.
                if !password.is_empty() && password != userid {
                    warn!(
                        "{} Rejected login for user '{}'",
                        self.log_prefix, userid
                    );
                }

                return Err(no(
                    Some(s::RespTextCode::AuthenticationFailed),
                    "Bad user id or password",
                ));
            }
            Err(Error::AuthUnavailable) => {
                return Err(no(
                    Some(s::RespTextCode::Unavailable),
                    "Authentication is temporarily unavailable",
                ));
            }
            Err(e) => return Err(catch_all_error_handling(&self.log_prefix, e)),
        };

        let account = self
            .services
            .registry
            .account(&principal.name)
            .map_err(map_error!(self))?;

        self.log_prefix.set_user(principal.name);
        info!("{} Login successful", self.log_prefix);
        self.session.account = Some(account);

        sender(s::Response::Capability(
            self.capabilities().into_iter().map(Cow::Borrowed).collect(),
        ));
        ok(None, "User login successful")
    }

    pub(super) fn cmd_starttls(
        &mut self,
        _args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        if self.session.secure || !self.starttls_available {
            sender(bad("TLS is already active or not available"));
            return Err(no(None, "STARTTLS not possible"));
        }

        self.starttls_requested = true;
        ok(None, "Begin TLS negotiation now")
    }

    pub(super) fn cmd_enable(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let mut enabled = Vec::new();
        for arg in args {
            let extension = arg
                .atom()
                .ok_or_else(|| parse_error("Expected capability name"))?;
            if "CONDSTORE".eq_ignore_ascii_case(extension) {
                self.port.enable_condstore();
                enabled.push(Cow::Borrowed("CONDSTORE"));
            }
        }

        sender(s::Response::Enabled(enabled));
        success()
    }

    /// Start an `IDLE`.
    ///
    /// Returns the tagged response to send instead of idling if the session
    /// can't idle now.
    pub fn idle_start(
        &mut self,
        tag: &str,
    ) -> Option<s::ResponseLine<'static>> {
        if !self.is_authenticated() {
            return Some(s::ResponseLine {
                tag: Some(Cow::Owned(tag.to_owned())),
                response: no(None, "Not logged in"),
            });
        }

        self.poll();
        None
    }

    /// Finish an `IDLE` once the client sends its next line.
    pub fn idle_done(
        &mut self,
        tag: &str,
        line: &[u8],
    ) -> s::ResponseLine<'static> {
        let response = if line.eq_ignore_ascii_case(b"DONE") {
            self.poll();
            s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::Ok,
                code: None,
                quip: Cow::Borrowed("IDLE done"),
            })
        } else {
            parse_error("Expected DONE")
        };

        s::ResponseLine {
            tag: Some(Cow::Owned(tag.to_owned())),
            response,
        }
    }

    /// Deliver anything queued for the selected mailbox.
    pub(super) fn poll(&self) {
        if let (Some(account), Some(key)) =
            (&self.session.account, &self.session.selected)
        {
            account.poll(key);
        }
    }
}
