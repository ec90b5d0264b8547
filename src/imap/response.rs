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

//! The response side of the protocol.
//!
//! Responses are built as plain values and serialised with `write_to`.
//! Sequence numbers in responses are always those of the receiving session.

use std::borrow::Cow;
use std::io::{self, Write};

use chrono::prelude::*;

use super::lex::LexWriter;
use crate::account::model::{Flag, MailboxAttribute};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseLine<'a> {
    pub tag: Option<Cow<'a, str>>,
    pub response: Response<'a>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response<'a> {
    Cond(CondResponse<'a>),
    Capability(Vec<Cow<'a, str>>),
    Enabled(Vec<Cow<'a, str>>),
    List(MailboxList),
    Lsub(MailboxList),
    Status(StatusResponse),
    Flags(Vec<Flag>),
    Exists(u32),
    Recent(u32),
    Expunge(u32),
    Fetch(FetchResponse),
    Search(SearchResponse),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespCondType {
    Ok,
    No,
    Bad,
    Bye,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CondResponse<'a> {
    pub cond: RespCondType,
    pub code: Option<RespTextCode>,
    pub quip: Cow<'a, str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RespTextCode {
    AlreadyExists,
    AppendUid(u32, u32),
    AuthenticationFailed,
    BadCharset,
    Cannot,
    Capability(Vec<&'static str>),
    ClientBug,
    CopyUid(u32, String, String),
    HighestModseq(u64),
    Limit,
    Modified(String),
    Nonexistent,
    Parse,
    /// The flags, and whether clients may create new keywords.
    PermanentFlags(Vec<Flag>, bool),
    PrivacyRequired,
    ReadOnly,
    ReadWrite,
    ServerBug,
    TryCreate,
    UidNext(u32),
    UidValidity(u32),
    Unavailable,
    Unseen(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailboxList {
    pub flags: Vec<MailboxAttribute>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusResponse {
    pub mailbox: String,
    pub atts: Vec<(&'static str, u64)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub seqnum: u32,
    pub atts: Vec<FetchAtt>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchAtt {
    Uid(u32),
    /// The stored flags, plus whether `\Recent` applies for this session.
    Flags(Vec<Flag>, bool),
    InternalDate(DateTime<FixedOffset>),
    Rfc822Size(u32),
    Modseq(u64),
    /// A body section, labelled exactly as the client must see it, e.g.
    /// `BODY[HEADER]<0>` or `RFC822.TEXT`.
    Section(String, Vec<u8>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub hits: Vec<u32>,
    pub max_modseq: Option<u64>,
}

impl<'a> ResponseLine<'a> {
    pub fn write_to(
        &self,
        w: &mut LexWriter<impl Write>,
    ) -> io::Result<()> {
        match self.tag {
            Some(ref tag) => w.verbatim(tag)?,
            None => w.verbatim("*")?,
        }
        w.verbatim(" ")?;
        self.response.write_to(w)
    }
}

impl<'a> Response<'a> {
    pub fn write_to(
        &self,
        w: &mut LexWriter<impl Write>,
    ) -> io::Result<()> {
        match *self {
            Response::Cond(ref cr) => cr.write_to(w),
            Response::Capability(ref caps) => {
                w.verbatim("CAPABILITY")?;
                for cap in caps {
                    w.verbatim(" ")?;
                    w.verbatim(cap)?;
                }
                Ok(())
            }
            Response::Enabled(ref caps) => {
                w.verbatim("ENABLED")?;
                for cap in caps {
                    w.verbatim(" ")?;
                    w.verbatim(cap)?;
                }
                Ok(())
            }
            Response::List(ref ml) => {
                w.verbatim("LIST ")?;
                ml.write_to(w)
            }
            Response::Lsub(ref ml) => {
                w.verbatim("LSUB ")?;
                ml.write_to(w)
            }
            Response::Status(ref sr) => {
                w.verbatim("STATUS ")?;
                w.mailbox(&sr.mailbox)?;
                w.verbatim(" (")?;
                for (ix, &(name, value)) in sr.atts.iter().enumerate() {
                    if ix > 0 {
                        w.verbatim(" ")?;
                    }
                    w.verbatim(name)?;
                    w.verbatim(" ")?;
                    w.num_u64(value)?;
                }
                w.verbatim(")")
            }
            Response::Flags(ref flags) => {
                w.verbatim("FLAGS ")?;
                write_flags(w, flags, false)
            }
            Response::Exists(n) => {
                w.num_u32(n)?;
                w.verbatim(" EXISTS")
            }
            Response::Recent(n) => {
                w.num_u32(n)?;
                w.verbatim(" RECENT")
            }
            Response::Expunge(n) => {
                w.num_u32(n)?;
                w.verbatim(" EXPUNGE")
            }
            Response::Fetch(ref fr) => fr.write_to(w),
            Response::Search(ref sr) => {
                w.verbatim("SEARCH")?;
                for &hit in &sr.hits {
                    w.verbatim(" ")?;
                    w.num_u32(hit)?;
                }
                if let Some(modseq) = sr.max_modseq {
                    w.verbatim(" (MODSEQ ")?;
                    w.num_u64(modseq)?;
                    w.verbatim(")")?;
                }
                Ok(())
            }
        }
    }
}

impl<'a> CondResponse<'a> {
    fn write_to(&self, w: &mut LexWriter<impl Write>) -> io::Result<()> {
        w.verbatim(match self.cond {
            RespCondType::Ok => "OK ",
            RespCondType::No => "NO ",
            RespCondType::Bad => "BAD ",
            RespCondType::Bye => "BYE ",
        })?;

        if let Some(ref code) = self.code {
            w.verbatim("[")?;
            code.write_to(w)?;
            w.verbatim("] ")?;
        }

        // Text must be non-empty and cannot contain line breaks.
        let quip = self.quip.replace(|c: char| c.is_control(), " ");
        if quip.is_empty() {
            w.verbatim("Done")
        } else {
            w.verbatim(&quip)
        }
    }
}

impl RespTextCode {
    fn write_to(&self, w: &mut LexWriter<impl Write>) -> io::Result<()> {
        match *self {
            RespTextCode::AlreadyExists => w.verbatim("ALREADYEXISTS"),
            RespTextCode::AppendUid(validity, uid) => {
                w.verbatim("APPENDUID ")?;
                w.num_u32(validity)?;
                w.verbatim(" ")?;
                w.num_u32(uid)
            }
            RespTextCode::AuthenticationFailed => {
                w.verbatim("AUTHENTICATIONFAILED")
            }
            RespTextCode::BadCharset => w.verbatim("BADCHARSET (UTF-8)"),
            RespTextCode::Cannot => w.verbatim("CANNOT"),
            RespTextCode::Capability(ref caps) => {
                w.verbatim("CAPABILITY")?;
                for cap in caps {
                    w.verbatim(" ")?;
                    w.verbatim(cap)?;
                }
                Ok(())
            }
            RespTextCode::ClientBug => w.verbatim("CLIENTBUG"),
            RespTextCode::CopyUid(validity, ref from, ref to) => {
                w.verbatim("COPYUID ")?;
                w.num_u32(validity)?;
                w.verbatim(" ")?;
                w.verbatim(from)?;
                w.verbatim(" ")?;
                w.verbatim(to)
            }
            RespTextCode::HighestModseq(modseq) => {
                w.verbatim("HIGHESTMODSEQ ")?;
                w.num_u64(modseq)
            }
            RespTextCode::Limit => w.verbatim("LIMIT"),
            RespTextCode::Modified(ref set) => {
                w.verbatim("MODIFIED ")?;
                w.verbatim(set)
            }
            RespTextCode::Nonexistent => w.verbatim("NONEXISTENT"),
            RespTextCode::Parse => w.verbatim("PARSE"),
            RespTextCode::PermanentFlags(ref flags, keywords) => {
                w.verbatim("PERMANENTFLAGS ")?;
                write_flags(w, flags, keywords)
            }
            RespTextCode::PrivacyRequired => w.verbatim("PRIVACYREQUIRED"),
            RespTextCode::ReadOnly => w.verbatim("READ-ONLY"),
            RespTextCode::ReadWrite => w.verbatim("READ-WRITE"),
            RespTextCode::ServerBug => w.verbatim("SERVERBUG"),
            RespTextCode::TryCreate => w.verbatim("TRYCREATE"),
            RespTextCode::UidNext(uid) => {
                w.verbatim("UIDNEXT ")?;
                w.num_u32(uid)
            }
            RespTextCode::UidValidity(validity) => {
                w.verbatim("UIDVALIDITY ")?;
                w.num_u32(validity)
            }
            RespTextCode::Unavailable => w.verbatim("UNAVAILABLE"),
            RespTextCode::Unseen(seqnum) => {
                w.verbatim("UNSEEN ")?;
                w.num_u32(seqnum)
            }
        }
    }
}

impl MailboxList {
    fn write_to(&self, w: &mut LexWriter<impl Write>) -> io::Result<()> {
        w.verbatim("(")?;
        for (ix, flag) in self.flags.iter().enumerate() {
            if ix > 0 {
                w.verbatim(" ")?;
            }
            w.verbatim(flag.name())?;
        }
        w.verbatim(") \"/\" ")?;
        w.mailbox(&self.name)
    }
}

impl FetchResponse {
    fn write_to(&self, w: &mut LexWriter<impl Write>) -> io::Result<()> {
        w.num_u32(self.seqnum)?;
        w.verbatim(" FETCH (")?;
        for (ix, att) in self.atts.iter().enumerate() {
            if ix > 0 {
                w.verbatim(" ")?;
            }

            match *att {
                FetchAtt::Uid(uid) => {
                    w.verbatim("UID ")?;
                    w.num_u32(uid)?;
                }
                FetchAtt::Flags(ref flags, recent) => {
                    w.verbatim("FLAGS (")?;
                    for (ix, flag) in flags.iter().enumerate() {
                        if ix > 0 {
                            w.verbatim(" ")?;
                        }
                        w.flag(flag)?;
                    }
                    if recent {
                        if !flags.is_empty() {
                            w.verbatim(" ")?;
                        }
                        w.verbatim("\\Recent")?;
                    }
                    w.verbatim(")")?;
                }
                FetchAtt::InternalDate(ref date) => {
                    w.verbatim("INTERNALDATE ")?;
                    w.datetime(date)?;
                }
                FetchAtt::Rfc822Size(size) => {
                    w.verbatim("RFC822.SIZE ")?;
                    w.num_u32(size)?;
                }
                FetchAtt::Modseq(modseq) => {
                    w.verbatim("MODSEQ (")?;
                    w.num_u64(modseq)?;
                    w.verbatim(")")?;
                }
                FetchAtt::Section(ref label, ref data) => {
                    w.verbatim(label)?;
                    w.verbatim(" ")?;
                    w.literal(data)?;
                }
            }
        }
        w.verbatim(")")
    }
}

fn write_flags(
    w: &mut LexWriter<impl Write>,
    flags: &[Flag],
    keywords: bool,
) -> io::Result<()> {
    w.verbatim("(")?;
    for (ix, flag) in flags.iter().enumerate() {
        if ix > 0 {
            w.verbatim(" ")?;
        }
        w.flag(flag)?;
    }
    if keywords {
        if !flags.is_empty() {
            w.verbatim(" ")?;
        }
        w.verbatim("\\*")?;
    }
    w.verbatim(")")
}
