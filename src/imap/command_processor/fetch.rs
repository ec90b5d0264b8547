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

impl CommandProcessor {
    pub(super) fn cmd_fetch(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.fetch(args, false, sender)
    }

    pub(super) fn cmd_uid_fetch(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.fetch(args, true, sender)
    }

    fn fetch(
        &mut self,
        args: &[Token<'_>],
        uid: bool,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        if args.len() > 3 {
            return Err(parse_error("Bad FETCH arguments"));
        }

        let set = args[0]
            .atom()
            .ok_or_else(|| parse_error("Expected sequence set"))?;

        let mut request = FetchRequest::default();
        match args[1] {
            Token::Atom(att) => parse_fetch_att(att, &mut request)?,
            Token::List(ref atts) => {
                for att in atts {
                    let att = att
                        .atom()
                        .ok_or_else(|| parse_error("Bad FETCH attribute"))?;
                    parse_fetch_att(att, &mut request)?;
                }
            }
            _ => return Err(parse_error("Bad FETCH attributes")),
        }

        if let Some(modifiers) = args.get(2) {
            request.changed_since = Some(parse_changed_since(modifiers)?);
        }

        if request.modseq || request.changed_since.is_some() {
            self.port.enable_condstore();
        }

        request.uid |= uid;
        request.modseq |= self.port.condstore();
        request.read_only =
            self.port.view().as_ref().map_or(true, |v| v.read_only);
        request.uids = self.resolve_messages(set, uid)?;

        let key = selected!(self)?;
        let response = account!(self)?
            .fetch(key, &request, self.session.id)
            .map_err(map_error!(self))?;

        let view = self.port.view();
        let view = match view.as_ref() {
            Some(view) => view,
            None => return success(),
        };

        for message in response.messages {
            // Messages the session hasn't been told about yet have no
            // sequence number to report them under.
            let seqnum = match view.seqnum(message.uid) {
                Some(seqnum) => seqnum,
                None => continue,
            };

            let mut atts = Vec::new();
            if request.uid {
                atts.push(s::FetchAtt::Uid(message.uid.get()));
            }
            if let Some(flags) = message.flags {
                atts.push(s::FetchAtt::Flags(
                    flags,
                    view.is_recent(message.uid),
                ));
            }
            if let Some(internal_date) = message.internal_date {
                atts.push(s::FetchAtt::InternalDate(internal_date));
            }
            if let Some(size) = message.rfc822_size {
                atts.push(s::FetchAtt::Rfc822Size(size));
            }
            if let Some(modseq) = message.modseq {
                atts.push(s::FetchAtt::Modseq(modseq.get()));
            }
            for section in message.sections {
                atts.push(s::FetchAtt::Section(
                    section_label(&section.request),
                    section.data,
                ));
            }

            sender(s::Response::Fetch(s::FetchResponse {
                seqnum: seqnum.get(),
                atts,
            }));
        }

        ok(None, "FETCH completed")
    }
}

fn parse_changed_since(modifiers: &Token<'_>) -> PartialResult<Modseq> {
    match modifiers.list() {
        Some([Token::Atom(name), Token::Atom(value)])
            if "CHANGEDSINCE".eq_ignore_ascii_case(name) =>
        {
            value
                .parse()
                .map(Modseq)
                .map_err(|_| parse_error("Invalid CHANGEDSINCE"))
        }
        _ => Err(parse_error("Unsupported FETCH modifier")),
    }
}

fn parse_fetch_att(att: &str, request: &mut FetchRequest) -> PartialResult<()> {
    let upper = att.to_ascii_uppercase();
    let (part, kind, peek) = match upper.as_str() {
        "UID" => {
            request.uid = true;
            return Ok(());
        }
        "FLAGS" => {
            request.flags = true;
            return Ok(());
        }
        "INTERNALDATE" => {
            request.internal_date = true;
            return Ok(());
        }
        "RFC822.SIZE" => {
            request.rfc822_size = true;
            return Ok(());
        }
        "MODSEQ" => {
            request.modseq = true;
            return Ok(());
        }
        "FAST" => {
            request.flags = true;
            request.internal_date = true;
            request.rfc822_size = true;
            return Ok(());
        }
        "ALL" | "FULL" | "ENVELOPE" | "BODY" | "BODYSTRUCTURE" => {
            return Err(parse_error("MIME structure is not supported"));
        }
        "RFC822" => (SectionPart::Full, SectionKind::Rfc822, false),
        "RFC822.HEADER" => {
            (SectionPart::Header, SectionKind::Rfc822Header, true)
        }
        "RFC822.TEXT" => (SectionPart::Text, SectionKind::Rfc822Text, false),
        _ => {
            request.sections.push(parse_body_section(att)?);
            return Ok(());
        }
    };

    request.sections.push(SectionRequest {
        part,
        partial: None,
        peek,
        kind,
    });
    Ok(())
}

/// Parse `BODY[section]<o.n>` or `BODY.PEEK[section]<o.n>`.
fn parse_body_section(att: &str) -> PartialResult<SectionRequest> {
    let upper = att.to_ascii_uppercase();
    let (peek, start) = if upper.starts_with("BODY.PEEK[") {
        (true, "BODY.PEEK[".len())
    } else if upper.starts_with("BODY[") {
        (false, "BODY[".len())
    } else {
        return Err(parse_error("Unknown FETCH attribute"));
    };

    let end = start
        + upper[start..]
            .find(']')
            .ok_or_else(|| parse_error("Unterminated section"))?;
    let spec = &att[start..end];
    let spec_upper = &upper[start..end];
    let tail = &att[end + 1..];

    let part = if spec.is_empty() {
        SectionPart::Full
    } else if "HEADER" == spec_upper {
        SectionPart::Header
    } else if "TEXT" == spec_upper {
        SectionPart::Text
    } else if spec_upper.starts_with("HEADER.FIELDS.NOT ") {
        SectionPart::HeaderFieldsNot(parse_header_names(
            &spec["HEADER.FIELDS.NOT ".len()..],
        )?)
    } else if spec_upper.starts_with("HEADER.FIELDS ") {
        SectionPart::HeaderFields(parse_header_names(
            &spec["HEADER.FIELDS ".len()..],
        )?)
    } else {
        return Err(parse_error("Unsupported body section"));
    };

    let partial = if tail.is_empty() {
        None
    } else {
        Some(parse_partial(tail)?)
    };

    Ok(SectionRequest {
        part,
        partial,
        peek,
        kind: SectionKind::Body,
    })
}

fn parse_header_names(raw: &str) -> PartialResult<Vec<String>> {
    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| parse_error("Expected header field list"))?;

    let names: Vec<String> = inner
        .split_whitespace()
        .map(|name| name.trim_matches('"').to_owned())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        Err(parse_error("Empty header field list"))
    } else {
        Ok(names)
    }
}

/// Parse `<origin.length>`.
fn parse_partial(raw: &str) -> PartialResult<(u32, u32)> {
    let bad_partial = || parse_error("Invalid partial range");
    let inner = raw
        .strip_prefix('<')
        .and_then(|r| r.strip_suffix('>'))
        .ok_or_else(bad_partial)?;
    let mut parts = inner.splitn(2, '.');
    let origin = parts
        .next()
        .and_then(|o| o.parse::<u32>().ok())
        .ok_or_else(bad_partial)?;
    let length = parts
        .next()
        .and_then(|l| l.parse::<u32>().ok())
        .filter(|&l| l > 0)
        .ok_or_else(bad_partial)?;
    Ok((origin, length))
}

/// The name a fetched section is reported under.
fn section_label(section: &SectionRequest) -> String {
    match section.kind {
        SectionKind::Rfc822 => return "RFC822".to_owned(),
        SectionKind::Rfc822Header => return "RFC822.HEADER".to_owned(),
        SectionKind::Rfc822Text => return "RFC822.TEXT".to_owned(),
        SectionKind::Body => (),
    }

    let mut label = "BODY[".to_owned();
    match section.part {
        SectionPart::Full => (),
        SectionPart::Header => label.push_str("HEADER"),
        SectionPart::Text => label.push_str("TEXT"),
        SectionPart::HeaderFields(ref names) => {
            label.push_str("HEADER.FIELDS (");
            label.push_str(&names.join(" "));
            label.push(')');
        }
        SectionPart::HeaderFieldsNot(ref names) => {
            label.push_str("HEADER.FIELDS.NOT (");
            label.push_str(&names.join(" "));
            label.push(')');
        }
    }
    label.push(']');

    if let Some((origin, _)) = section.partial {
        label.push_str(&format!("<{}>", origin));
    }
    label
}
