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

use log::error;

use crate::account::auth::Authenticator;
use crate::account::model::*;
use crate::account::registry::Registry;
use crate::imap::session::{Session, SessionPort, SessionState, SharedWriter};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

pub(super) use crate::imap::response as s;
pub(super) use crate::imap::syntax::Token;

/// The largest message `APPEND` accepts.
pub const APPEND_SIZE_LIMIT: usize = 64 * 1024 * 1024;

pub(super) static CAPABILITIES: &[&str] = &[
    "CHILDREN",
    "CONDSTORE",
    "ENABLE",
    "IDLE",
    "LITERAL+",
    "SPECIAL-USE",
    "UIDPLUS",
    "UNSELECT",
    "APPENDLIMIT=67108864",
];

pub(super) static TAGLINE: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " ",
    env!("CARGO_PKG_VERSION"),
    " ready"
);

/// Everything shared by all connections of one server.
pub struct Services {
    pub registry: Arc<Registry>,
    pub authenticator: Arc<dyn Authenticator>,
    pub config: Arc<SystemConfig>,
}

/// Receives tokenised commands and produces responses.
///
/// While primarily a translation layer, it also owns the session state
/// (authentication, the selected mailbox) and handles the cases where one
/// command does several things, e.g. `FETCH BODY[]` doing an implicit
/// `STORE` or `CLOSE` an implicit `EXPUNGE`.
pub struct CommandProcessor {
    pub(super) log_prefix: LogPrefix,
    pub(super) services: Arc<Services>,
    pub(super) session: Session,
    pub(super) port: Arc<SessionPort>,
    pub(super) starttls_available: bool,
    pub(super) starttls_requested: bool,
}

/// Used just for the convenient `?` operator. We mostly don't distinguish
/// `Ok` from `Err`; the contained value is sent down the wire either way.
pub(super) type CmdResult = Result<s::Response<'static>, s::Response<'static>>;

/// Return value from an operation that can either succeed with a value, or
/// fail with an IMAP response.
pub(super) type PartialResult<T> = Result<T, s::Response<'static>>;

/// Queues an untagged response ahead of the tagged one. Never blocks on
/// the client, so it may be called with locks held.
pub type SendResponse<'a> = &'a (dyn Fn(s::Response<'_>) + Send + Sync);

impl CommandProcessor {
    pub fn new(
        log_prefix: LogPrefix,
        services: Arc<Services>,
        secure: bool,
    ) -> Self {
        let session = Session::new(secure);
        if secure {
            log_prefix.set_secure();
        }

        let port = Arc::new(SessionPort::new(session.id, log_prefix.clone()));
        CommandProcessor {
            log_prefix,
            services,
            session,
            port,
            starttls_available: false,
            starttls_requested: false,
        }
    }

    /// The stream all output of this session goes through, including
    /// notifications queued by other sessions' threads.
    pub fn output(&self) -> &SharedWriter {
        self.port.output()
    }

    pub fn logged_out(&self) -> bool {
        self.session.logged_out
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    pub fn is_authenticated(&self) -> bool {
        SessionState::NotAuthenticated != self.session.state()
    }

    /// Advertise `STARTTLS`. Only meaningful on a cleartext connection.
    pub fn offer_starttls(&mut self) {
        self.starttls_available = true;
    }

    /// Whether the command just processed asked to begin TLS. Clears the
    /// request.
    pub fn take_starttls_request(&mut self) -> bool {
        std::mem::replace(&mut self.starttls_requested, false)
    }

    /// Record that the transport is now protected by TLS.
    pub fn tls_established(&mut self) {
        self.session.secure = true;
        self.starttls_available = false;
        self.log_prefix.set_secure();
    }

    /// The untagged greeting sent when the connection opens.
    pub fn greeting(&self) -> s::ResponseLine<'static> {
        s::ResponseLine {
            tag: None,
            response: s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::Ok,
                code: Some(s::RespTextCode::Capability(self.capabilities())),
                quip: Cow::Borrowed(TAGLINE),
            }),
        }
    }

    pub(super) fn capabilities(&self) -> Vec<&'static str> {
        let mut caps = vec!["IMAP4rev1"];
        if !self.session.secure {
            if self.starttls_available {
                caps.push("STARTTLS");
            }
            if !self.services.config.security.allow_insecure_login {
                caps.push("LOGINDISABLED");
            }
        }
        caps.extend_from_slice(CAPABILITIES);
        caps
    }

    /// Leave the selected mailbox, if any, and stop receiving its changes.
    pub(super) fn deselect(&mut self) {
        if let Some(key) = self.session.selected.take() {
            if let Some(ref account) = self.session.account {
                account.unwatch(&key, self.session.id);
            }
        }
        *self.port.view() = None;
    }

    /// Resolve a sequence set or, if `uid`, a UID set against the current
    /// view.
    ///
    /// Sequence numbers beyond the snapshot are a protocol violation. UIDs
    /// out of range are explicitly allowed and simply match nothing.
    pub(super) fn resolve_messages(
        &self,
        raw: &str,
        uid: bool,
    ) -> PartialResult<SeqRange<Uid>> {
        let view = self.port.view();
        let view = view.as_ref().ok_or_else(|| bad("No mailbox selected"))?;

        if uid {
            let splat = view.max_uid().unwrap_or(Uid::MIN);
            return SeqRange::parse(raw, splat)
                .ok_or_else(|| parse_error("Unparsable UID set"));
        }

        let max_seqnum = view.max_seqnum();
        let seqnums = SeqRange::<Seqnum>::parse(
            raw,
            Seqnum::of(max_seqnum).unwrap_or(Seqnum::MIN),
        )
        .ok_or_else(|| parse_error("Unparsable sequence set"))?;

        if seqnums.max().unwrap_or(0) > max_seqnum {
            return Err(s::Response::Cond(s::CondResponse {
                cond: s::RespCondType::Bad,
                code: Some(s::RespTextCode::ClientBug),
                quip: Cow::Borrowed("Message sequence number out of range"),
            }));
        }

        Ok(view.seqnums_to_uids(&seqnums))
    }
}

impl Drop for CommandProcessor {
    fn drop(&mut self) {
        self.deselect();
        self.port.close();
    }
}

pub(super) fn success() -> CmdResult {
    Ok(s::Response::Cond(s::CondResponse {
        cond: s::RespCondType::Ok,
        code: None,
        quip: Cow::Borrowed(""),
    }))
}

pub(super) fn ok(
    code: Option<s::RespTextCode>,
    quip: &'static str,
) -> CmdResult {
    Ok(s::Response::Cond(s::CondResponse {
        cond: s::RespCondType::Ok,
        code,
        quip: Cow::Borrowed(quip),
    }))
}

pub(super) fn no(
    code: Option<s::RespTextCode>,
    quip: &'static str,
) -> s::Response<'static> {
    s::Response::Cond(s::CondResponse {
        cond: s::RespCondType::No,
        code,
        quip: Cow::Borrowed(quip),
    })
}

pub(super) fn bad(quip: &'static str) -> s::Response<'static> {
    s::Response::Cond(s::CondResponse {
        cond: s::RespCondType::Bad,
        code: None,
        quip: Cow::Borrowed(quip),
    })
}

pub(super) fn parse_error(quip: &'static str) -> s::Response<'static> {
    s::Response::Cond(s::CondResponse {
        cond: s::RespCondType::Bad,
        code: Some(s::RespTextCode::Parse),
        quip: Cow::Borrowed(quip),
    })
}

/// Interpret `token` as an astring, failing with `BAD` otherwise.
pub(super) fn astring<'a>(
    token: &'a Token<'_>,
) -> PartialResult<Cow<'a, str>> {
    token
        .astring()
        .ok_or_else(|| parse_error("Expected string argument"))
}

/// Parse a parenthesised list of flags.
pub(super) fn parse_flags(tokens: &[Token<'_>]) -> PartialResult<Vec<Flag>> {
    tokens
        .iter()
        .map(|t| {
            t.atom()
                .ok_or_else(|| parse_error("Expected flag"))?
                .parse::<Flag>()
                .map_err(|_| parse_error("Invalid flag"))
        })
        .collect()
}

pub(super) fn catch_all_error_handling(
    log_prefix: &LogPrefix,
    e: Error,
) -> s::Response<'static> {
    match e {
        // The selected mailbox was deleted out from under the session.
        Error::NxMailbox => no(
            Some(s::RespTextCode::Nonexistent),
            "Mailbox no longer exists",
        ),
        e => {
            error!("{} Unhandled internal error: {}", log_prefix, e);
            no(
                Some(s::RespTextCode::ServerBug),
                "Unexpected error; check server logs for details",
            )
        }
    }
}
