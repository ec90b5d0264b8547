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

use chrono::NaiveDate;

use super::defs::*;
use crate::account::model::*;
use crate::imap::session::SelectedView;

impl CommandProcessor {
    pub(super) fn cmd_search(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.search(args, false, sender)
    }

    pub(super) fn cmd_uid_search(
        &mut self,
        args: &[Token<'_>],
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.search(args, true, sender)
    }

    fn search(
        &mut self,
        args: &[Token<'_>],
        uid: bool,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        let args = skip_charset(args)?;

        let (query, has_modseq, recent) = {
            let view = self.port.view();
            let view =
                view.as_ref().ok_or_else(|| bad("No mailbox selected"))?;
            let mut parser = QueryParser {
                tokens: args,
                view,
                has_modseq: false,
            };
            let query = parser.parse_all()?;
            (query, parser.has_modseq, view.recent.clone())
        };

        if has_modseq {
            self.port.enable_condstore();
        }

        let key = selected!(self)?;
        let response = account!(self)?
            .search(key, &query, &recent)
            .map_err(map_error!(self))?;

        let hits: Vec<u32> = if uid {
            response.hits.iter().map(|uid| uid.get()).collect()
        } else {
            let view = self.port.view();
            match view.as_ref() {
                Some(view) => response
                    .hits
                    .iter()
                    .filter_map(|&uid| view.seqnum(uid))
                    .map(Seqnum::get)
                    .collect(),
                None => vec![],
            }
        };

        // MODSEQ is only reported if the client used a MODSEQ criterion.
        let max_modseq = if has_modseq && !hits.is_empty() {
            Some(response.highest_modseq.get())
        } else {
            None
        };

        sender(s::Response::Search(s::SearchResponse { hits, max_modseq }));
        ok(None, "SEARCH completed")
    }
}

/// Consume a leading `CHARSET x`, accepting only UTF-8 and its subset.
fn skip_charset<'a, 'b>(
    args: &'b [Token<'a>],
) -> PartialResult<&'b [Token<'a>]> {
    match args {
        [Token::Atom(kw), charset, rest @ ..]
            if "CHARSET".eq_ignore_ascii_case(kw) =>
        {
            let charset = astring(charset)?;
            if charset.eq_ignore_ascii_case("UTF-8")
                || charset.eq_ignore_ascii_case("US-ASCII")
            {
                Ok(rest)
            } else {
                Err(no(
                    Some(s::RespTextCode::BadCharset),
                    "Unsupported charset",
                ))
            }
        }
        args => Ok(args),
    }
}

struct QueryParser<'a, 'b> {
    tokens: &'b [Token<'a>],
    view: &'b SelectedView,
    has_modseq: bool,
}

impl<'a, 'b> QueryParser<'a, 'b> {
    fn parse_all(&mut self) -> PartialResult<SearchQuery> {
        let mut keys = Vec::new();
        while !self.tokens.is_empty() {
            keys.push(self.key()?);
        }

        match keys.len() {
            0 => Err(parse_error("Empty search")),
            1 => Ok(keys.remove(0)),
            _ => Ok(SearchQuery::And(keys)),
        }
    }

    fn next(&mut self) -> PartialResult<&'b Token<'a>> {
        let (first, rest) = self
            .tokens
            .split_first()
            .ok_or_else(|| parse_error("Incomplete search key"))?;
        self.tokens = rest;
        Ok(first)
    }

    fn string(&mut self) -> PartialResult<String> {
        Ok(astring(self.next()?)?.into_owned())
    }

    fn atom(&mut self) -> PartialResult<&'a str> {
        self.next()?
            .atom()
            .ok_or_else(|| parse_error("Expected atom in search key"))
    }

    fn number(&mut self) -> PartialResult<u32> {
        self.atom()?
            .parse()
            .map_err(|_| parse_error("Expected number in search key"))
    }

    fn date(&mut self) -> PartialResult<NaiveDate> {
        let raw = self.string()?;
        NaiveDate::parse_from_str(&raw, "%d-%b-%Y")
            .map_err(|_| parse_error("Invalid date in search key"))
    }

    fn flag(&mut self) -> PartialResult<Flag> {
        self.atom()?
            .parse()
            .map_err(|_| parse_error("Invalid keyword in search key"))
    }

    fn key(&mut self) -> PartialResult<SearchQuery> {
        let token = self.next()?;
        let word = match *token {
            Token::List(ref keys) => {
                let mut sub = QueryParser {
                    tokens: keys,
                    view: self.view,
                    has_modseq: false,
                };
                let query = sub.parse_all()?;
                self.has_modseq |= sub.has_modseq;
                return Ok(query);
            }
            Token::Atom(word) => word,
            _ => return Err(parse_error("Unexpected string in search")),
        };

        Ok(match word.to_ascii_uppercase().as_str() {
            "ALL" => SearchQuery::All,
            "ANSWERED" => SearchQuery::Answered,
            "DELETED" => SearchQuery::Deleted,
            "DRAFT" => SearchQuery::Draft,
            "FLAGGED" => SearchQuery::Flagged,
            "SEEN" => SearchQuery::Seen,
            "UNANSWERED" => SearchQuery::Unanswered,
            "UNDELETED" => SearchQuery::Undeleted,
            "UNDRAFT" => SearchQuery::Undraft,
            "UNFLAGGED" => SearchQuery::Unflagged,
            "UNSEEN" => SearchQuery::Unseen,
            "NEW" => SearchQuery::New,
            "OLD" => SearchQuery::Old,
            "RECENT" => SearchQuery::Recent,
            "KEYWORD" => SearchQuery::Keyword(self.flag()?),
            "UNKEYWORD" => SearchQuery::Unkeyword(self.flag()?),
            "BEFORE" => SearchQuery::Before(self.date()?),
            "ON" => SearchQuery::On(self.date()?),
            "SINCE" => SearchQuery::Since(self.date()?),
            "SENTBEFORE" => SearchQuery::SentBefore(self.date()?),
            "SENTON" => SearchQuery::SentOn(self.date()?),
            "SENTSINCE" => SearchQuery::SentSince(self.date()?),
            "LARGER" => SearchQuery::Larger(self.number()?),
            "SMALLER" => SearchQuery::Smaller(self.number()?),
            "BCC" => SearchQuery::Header("Bcc".to_owned(), self.string()?),
            "CC" => SearchQuery::Header("Cc".to_owned(), self.string()?),
            "FROM" => SearchQuery::Header("From".to_owned(), self.string()?),
            "SUBJECT" => {
                SearchQuery::Header("Subject".to_owned(), self.string()?)
            }
            "TO" => SearchQuery::Header("To".to_owned(), self.string()?),
            "HEADER" => {
                let name = self.string()?;
                SearchQuery::Header(name, self.string()?)
            }
            "BODY" => SearchQuery::Body(self.string()?),
            "TEXT" => SearchQuery::Text(self.string()?),
            "NOT" => SearchQuery::Not(Box::new(self.key()?)),
            "OR" => {
                let a = self.key()?;
                SearchQuery::Or(Box::new(a), Box::new(self.key()?))
            }
            "UID" => {
                let splat = self.view.max_uid().unwrap_or(Uid::MIN);
                SearchQuery::UidSet(
                    SeqRange::parse(self.atom()?, splat)
                        .ok_or_else(|| parse_error("Invalid UID set"))?,
                )
            }
            "MODSEQ" => {
                self.has_modseq = true;
                // The optional entry name and type only matter for
                // per-flag modseqs, which aren't tracked.
                if let [Token::Quoted(_), Token::Atom(_), _, ..] = self.tokens
                {
                    self.tokens = &self.tokens[2..];
                }
                let modseq = self
                    .atom()?
                    .parse::<u64>()
                    .map_err(|_| parse_error("Invalid MODSEQ"))?;
                SearchQuery::Modseq(Modseq(modseq))
            }
            _ => {
                let max = self.view.max_seqnum();
                let seqnums = SeqRange::<Seqnum>::parse(
                    word,
                    Seqnum::of(max).unwrap_or(Seqnum::MIN),
                )
                .ok_or_else(|| parse_error("Unknown search key"))?;
                SearchQuery::UidSet(self.view.seqnums_to_uids(&seqnums))
            }
        })
    }
}
