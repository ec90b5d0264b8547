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

//! Just enough RFC 5322 header handling for `FETCH` sections and `SEARCH`.
//!
//! Messages are otherwise treated as opaque bytes. Both CRLF and bare LF
//! line endings are tolerated since stored messages come from arbitrary
//! clients.

use std::str;

use chrono::prelude::*;
use memchr::memmem;
use nom::{
    bytes::complete::{tag, take_while, take_while1},
    sequence, IResult,
};

/// Split a message into its header block and body.
///
/// The header block includes the blank line which terminates it. A message
/// with no blank line is all header.
pub fn split(data: &[u8]) -> (&[u8], &[u8]) {
    if data.starts_with(b"\r\n") {
        return data.split_at(2);
    }
    if data.starts_with(b"\n") {
        return data.split_at(1);
    }

    let crlf = memmem::find(data, b"\r\n\r\n").map(|ix| ix + 4);
    let lf = memmem::find(data, b"\n\n").map(|ix| ix + 2);
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => data.len(),
    };

    data.split_at(end)
}

fn field_name(i: &[u8]) -> IResult<&[u8], &[u8]> {
    sequence::terminated(
        take_while1(|b| b > b' ' && b < 127 && b != b':'),
        sequence::pair(take_while(|b| b == b' ' || b == b'\t'), tag(":")),
    )(i)
}

/// A single header field, including any folded continuation lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field<'a> {
    pub name: &'a str,
    /// The whole field as it appears in the message, line ending included.
    pub raw: &'a [u8],
    /// Everything after the colon, still folded.
    pub value: &'a [u8],
}

impl<'a> Field<'a> {
    /// The value with folding removed and surrounding whitespace trimmed.
    pub fn unfolded(&self) -> String {
        let mut out = String::with_capacity(self.value.len());
        for line in String::from_utf8_lossy(self.value).split('\n') {
            let line = line.trim_end_matches('\r');
            if !out.is_empty() && !line.is_empty() {
                out.push(' ');
            }
            out.push_str(line.trim());
        }
        out
    }
}

/// Iterate the fields in a header block.
///
/// Lines that aren't syntactically fields are skipped.
pub fn fields(header: &[u8]) -> impl Iterator<Item = Field<'_>> + '_ {
    let mut rest = header;
    std::iter::from_fn(move || loop {
        if rest.is_empty()
            || rest.starts_with(b"\r\n")
            || rest.starts_with(b"\n")
        {
            return None;
        }

        // Find the end of this field: the first line break not followed by
        // folding whitespace.
        let mut end = 0;
        loop {
            match memchr::memchr(b'\n', &rest[end..]) {
                None => {
                    end = rest.len();
                    break;
                }
                Some(nl) => {
                    end += nl + 1;
                    if !matches!(rest.get(end), Some(b' ') | Some(b'\t')) {
                        break;
                    }
                }
            }
        }

        let (raw, tail) = rest.split_at(end);
        rest = tail;

        if let Ok((value, name)) = field_name(raw) {
            if let Ok(name) = str::from_utf8(name) {
                return Some(Field { name, raw, value });
            }
        }
    })
}

/// Unfolded values of every field called `name`, in order.
pub fn values(header: &[u8], name: &str) -> Vec<String> {
    fields(header)
        .filter(|f| f.name.eq_ignore_ascii_case(name))
        .map(|f| f.unfolded())
        .collect()
}

/// Copy out the fields whose names are (or, with `keep_listed` false, are
/// not) in `names`, followed by the blank line that ends a header block.
pub fn select(header: &[u8], names: &[String], keep_listed: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields(header) {
        let listed = names.iter().any(|n| n.eq_ignore_ascii_case(field.name));
        if listed == keep_listed {
            out.extend_from_slice(field.raw);
            if !field.raw.ends_with(b"\n") {
                out.extend_from_slice(b"\r\n");
            }
        }
    }
    out.extend_from_slice(b"\r\n");
    out
}

/// Parse the `Date` field of a header block.
pub fn date(header: &[u8]) -> Option<DateTime<FixedOffset>> {
    values(header, "Date")
        .into_iter()
        .next()
        .and_then(|v| DateTime::parse_from_rfc2822(&v).ok())
}

/// ASCII case-insensitive substring search.
pub fn contains_ignore_case(haystack: &[u8], needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }

    let needle = needle.to_ascii_lowercase();
    let haystack = haystack.to_ascii_lowercase();
    memmem::find(&haystack, needle.as_bytes()).is_some()
}
