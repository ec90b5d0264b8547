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

//! The command table.
//!
//! Each verb declares the session state it needs and the shape of its
//! arguments. Both are checked here, before the handler runs, so handlers
//! can index their arguments freely.

use std::borrow::Cow;
use std::collections::HashMap;

use lazy_static::lazy_static;
use log::warn;

use super::defs::*;
use crate::imap::session::SessionState;
use crate::imap::syntax::CommandLine;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Precondition {
    Any,
    NotAuthenticated,
    Authenticated,
    Selected,
}

impl Precondition {
    /// Return the complaint if `state` does not satisfy this precondition.
    fn check(self, state: SessionState) -> Option<&'static str> {
        match (self, state) {
            (Precondition::Any, _) => None,
            (
                Precondition::NotAuthenticated,
                SessionState::NotAuthenticated,
            ) => None,
            (Precondition::NotAuthenticated, _) => Some("Already logged in"),
            (_, SessionState::NotAuthenticated) => Some("Not logged in"),
            (Precondition::Selected, SessionState::Authenticated) => {
                Some("No mailbox selected")
            }
            (Precondition::Authenticated, _)
            | (Precondition::Selected, SessionState::Selected) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ArgKind {
    Atom,
    /// An atom or any kind of string.
    Astring,
    List,
    Any,
}

impl ArgKind {
    fn admits(self, token: &Token<'_>) -> bool {
        match self {
            ArgKind::Atom => token.atom().is_some(),
            ArgKind::Astring => token.astring().is_some(),
            ArgKind::List => token.list().is_some(),
            ArgKind::Any => true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct Shape {
    required: &'static [ArgKind],
    /// Whether any number of further arguments of any kind may follow.
    variadic: bool,
}

impl Shape {
    fn admits(&self, args: &[Token<'_>]) -> bool {
        if args.len() < self.required.len()
            || (!self.variadic && args.len() > self.required.len())
        {
            return false;
        }

        self.required
            .iter()
            .zip(args)
            .all(|(kind, arg)| kind.admits(arg))
    }
}

const NO_ARGS: Shape = Shape {
    required: &[],
    variadic: false,
};
const ATOMS: Shape = Shape {
    required: &[ArgKind::Atom],
    variadic: true,
};
const MAILBOX: Shape = Shape {
    required: &[ArgKind::Astring],
    variadic: false,
};
const SELECT: Shape = Shape {
    required: &[ArgKind::Astring],
    variadic: true,
};
const TWO_STRINGS: Shape = Shape {
    required: &[ArgKind::Astring, ArgKind::Astring],
    variadic: false,
};
const STATUS: Shape = Shape {
    required: &[ArgKind::Astring, ArgKind::List],
    variadic: false,
};
const APPEND: Shape = Shape {
    required: &[ArgKind::Astring, ArgKind::Any],
    variadic: true,
};
const COPY: Shape = Shape {
    required: &[ArgKind::Atom, ArgKind::Astring],
    variadic: false,
};
const SET_AND_MORE: Shape = Shape {
    required: &[ArgKind::Atom, ArgKind::Any],
    variadic: true,
};
const SET: Shape = Shape {
    required: &[ArgKind::Atom],
    variadic: false,
};
const ANY: Shape = Shape {
    required: &[ArgKind::Any],
    variadic: true,
};

pub(super) trait Handler: Send + Sync {
    fn handle(
        &self,
        processor: &mut CommandProcessor,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult;
}

impl<F> Handler for F
where
    F: Fn(&mut CommandProcessor, &[Token<'_>], SendResponse<'_>) -> CmdResult
        + Send
        + Sync,
{
    fn handle(
        &self,
        processor: &mut CommandProcessor,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self(processor, args, sender)
    }
}

pub(super) struct CommandDef {
    precondition: Precondition,
    shape: Shape,
    handler: Box<dyn Handler>,
}

fn def(
    verb: &'static str,
    precondition: Precondition,
    shape: Shape,
    handler: impl Handler + 'static,
) -> (&'static str, CommandDef) {
    (
        verb,
        CommandDef {
            precondition,
            shape,
            handler: Box::new(handler),
        },
    )
}

lazy_static! {
    static ref COMMANDS: HashMap<&'static str, CommandDef> = {
        use self::Precondition::*;
        type P = CommandProcessor;

        vec![
            def("CAPABILITY", Any, NO_ARGS, P::cmd_capability),
            def("NOOP", Any, NO_ARGS, P::cmd_noop),
            def("LOGOUT", Any, NO_ARGS, P::cmd_logout),
            def("LOGIN", NotAuthenticated, TWO_STRINGS, P::cmd_login),
            def("STARTTLS", NotAuthenticated, NO_ARGS, P::cmd_starttls),
            def("ENABLE", Authenticated, ATOMS, P::cmd_enable),
            def("SELECT", Authenticated, SELECT, P::cmd_select),
            def("EXAMINE", Authenticated, SELECT, P::cmd_examine),
            def("CREATE", Authenticated, MAILBOX, P::cmd_create),
            def("DELETE", Authenticated, MAILBOX, P::cmd_delete),
            def("RENAME", Authenticated, TWO_STRINGS, P::cmd_rename),
            def("SUBSCRIBE", Authenticated, MAILBOX, P::cmd_subscribe),
            def("UNSUBSCRIBE", Authenticated, MAILBOX, P::cmd_unsubscribe),
            def("LIST", Authenticated, TWO_STRINGS, P::cmd_list),
            def("LSUB", Authenticated, TWO_STRINGS, P::cmd_lsub),
            def("STATUS", Authenticated, STATUS, P::cmd_status),
            def("APPEND", Authenticated, APPEND, P::cmd_append),
            def("CHECK", Selected, NO_ARGS, P::cmd_noop),
            def("CLOSE", Selected, NO_ARGS, P::cmd_close),
            def("UNSELECT", Selected, NO_ARGS, P::cmd_unselect),
            def("EXPUNGE", Selected, NO_ARGS, P::cmd_expunge),
            def("UID EXPUNGE", Selected, SET, P::cmd_uid_expunge),
            def("COPY", Selected, COPY, P::cmd_copy),
            def("UID COPY", Selected, COPY, P::cmd_uid_copy),
            def("FETCH", Selected, SET_AND_MORE, P::cmd_fetch),
            def("UID FETCH", Selected, SET_AND_MORE, P::cmd_uid_fetch),
            def("STORE", Selected, SET_AND_MORE, P::cmd_store),
            def("UID STORE", Selected, SET_AND_MORE, P::cmd_uid_store),
            def("SEARCH", Selected, ANY, P::cmd_search),
            def("UID SEARCH", Selected, ANY, P::cmd_uid_search),
        ]
        .into_iter()
        .collect()
    };
}

impl CommandProcessor {
    /// Execute one complete command line.
    ///
    /// Untagged responses go through `sender` as they are produced; the
    /// tagged completion is returned.
    pub fn handle_command(
        &mut self,
        command: CommandLine<'_>,
        sender: SendResponse<'_>,
    ) -> s::ResponseLine<'static> {
        let response = self.dispatch(&command, sender).unwrap_or_else(|e| e);
        s::ResponseLine {
            tag: Some(Cow::Owned(command.tag.to_owned())),
            response,
        }
    }

    fn dispatch(
        &mut self,
        command: &CommandLine<'_>,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let def = COMMANDS
            .get(command.verb.as_str())
            .ok_or_else(|| parse_error("Unknown command"))?;

        if !def.shape.admits(&command.args) {
            return Err(parse_error("Bad arguments"));
        }

        if let Some(complaint) = def.precondition.check(self.session.state())
        {
            warn!(
                "{} Rejected {} in state {:?}",
                self.log_prefix,
                command.verb,
                self.session.state()
            );
            sender(bad(complaint));
            return Err(no(None, complaint));
        }

        def.handler.handle(self, &command.args, sender)
    }
}
