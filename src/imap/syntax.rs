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

//! Tokenising of IMAP command lines.
//!
//! The full RFC 3501 grammar is not expressed here. A command line is split
//! into a tag, a verb and a sequence of generic tokens; each command's
//! handler then interprets its tokens according to the argument shape it
//! declares. Literals have already been inlined into the line by the server,
//! as `{n}\r\n` followed by exactly `n` bytes.

use std::borrow::Cow;
use std::str;

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1};
use nom::character::complete::digit1;
use nom::combinator::{map, map_res, opt, recognize};
use nom::error::ErrorKind;
use nom::multi::{many1, separated_list};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    /// A bare word. Section specifiers such as `BODY[HEADER.FIELDS (A B)]`
    /// and partial suffixes are part of the atom.
    Atom(&'a str),
    Quoted(String),
    Literal(&'a [u8]),
    List(Vec<Token<'a>>),
}

impl<'a> Token<'a> {
    pub fn atom(&self) -> Option<&'a str> {
        match *self {
            Token::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Interpret this token as an `astring`, i.e., an atom or any kind of
    /// string.
    pub fn astring(&self) -> Option<Cow<'_, str>> {
        match *self {
            Token::Atom(a) => Some(Cow::Borrowed(a)),
            Token::Quoted(ref q) => Some(Cow::Borrowed(q)),
            Token::Literal(l) => str::from_utf8(l).ok().map(Cow::Borrowed),
            Token::List(_) => None,
        }
    }

    pub fn list(&self) -> Option<&[Token<'a>]> {
        match *self {
            Token::List(ref l) => Some(l),
            _ => None,
        }
    }
}

/// A complete command line.
///
/// `verb` is upper-cased, and the `UID` prefix is folded into it, e.g.
/// `UID FETCH`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub tag: &'a str,
    pub verb: String,
    pub args: Vec<Token<'a>>,
}

impl<'a> CommandLine<'a> {
    pub fn parse(i: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (i, (cmd_tag, verb)) = pair(
            terminated(command_tag, tag(" ")),
            map_res(take_while1(is_atom_char), str::from_utf8),
        )(i)?;

        let mut verb = verb.to_ascii_uppercase();
        let (i, sub_verb) = if "UID" == verb {
            map(
                preceded(
                    tag(" "),
                    map_res(take_while1(is_atom_char), str::from_utf8),
                ),
                Some,
            )(i)?
        } else {
            (i, None)
        };

        if let Some(sub_verb) = sub_verb {
            verb.push(' ');
            verb.push_str(&sub_verb.to_ascii_uppercase());
        }

        let (i, args) =
            opt(preceded(tag(" "), separated_list(tag(" "), token)))(i)?;

        Ok((
            i,
            CommandLine {
                tag: cmd_tag,
                verb,
                args: args.unwrap_or_default(),
            },
        ))
    }
}

/// Just enough of a command line to be able to address a response to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownCommandFragment<'a> {
    pub tag: &'a str,
}

impl<'a> UnknownCommandFragment<'a> {
    pub fn parse(i: &'a [u8]) -> IResult<&'a [u8], Self> {
        map(terminated(command_tag, tag(" ")), |tag| {
            UnknownCommandFragment { tag }
        })(i)
    }
}

fn command_tag(i: &[u8]) -> IResult<&[u8], &str> {
    map_res(take_while1(is_tag_char), str::from_utf8)(i)
}

fn token(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        map(quoted, Token::Quoted),
        map(literal, Token::Literal),
        map(
            delimited(tag("("), separated_list(tag(" "), token), tag(")")),
            Token::List,
        ),
        map(atom, Token::Atom),
    ))(i)
}

fn atom(i: &[u8]) -> IResult<&[u8], &str> {
    map_res(
        recognize(many1(alt((
            take_while1(is_atom_char),
            recognize(tuple((
                tag("["),
                take_while(|b| b != b']' && b != b'\r' && b != b'\n'),
                tag("]"),
            ))),
        )))),
        str::from_utf8,
    )(i)
}

fn literal(i: &[u8]) -> IResult<&[u8], &[u8]> {
    let (i, len) = delimited(
        tag("{"),
        map_res(map_res(digit1, str::from_utf8), str::parse::<u32>),
        terminated(opt(tag("+")), tag("}\r\n")),
    )(i)?;
    take(len)(i)
}

fn quoted(i: &[u8]) -> IResult<&[u8], String> {
    let (mut i, _) = tag("\"")(i)?;
    let mut out = Vec::new();
    loop {
        match i.first().copied() {
            Some(b'"') => {
                i = &i[1..];
                break;
            }
            Some(b'\\') => match i.get(1).copied() {
                Some(c @ b'\\') | Some(c @ b'"') => {
                    out.push(c);
                    i = &i[2..];
                }
                _ => return Err(nom::Err::Error((i, ErrorKind::Escaped))),
            },
            Some(b'\r') | Some(b'\n') | None => {
                return Err(nom::Err::Error((i, ErrorKind::Char)))
            }
            Some(c) => {
                out.push(c);
                i = &i[1..];
            }
        }
    }

    match String::from_utf8(out) {
        Ok(s) => Ok((i, s)),
        Err(_) => Err(nom::Err::Error((i, ErrorKind::Char))),
    }
}

fn is_atom_char(ch: u8) -> bool {
    !matches!(
        ch,
        0..=b' ' | 127..=255 | b'(' | b')' | b'{' | b'"' | b'['
    )
}

fn is_tag_char(ch: u8) -> bool {
    is_atom_char(ch) && b'+' != ch && b'*' != ch && b'%' != ch
}
