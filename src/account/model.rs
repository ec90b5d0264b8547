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

use std::collections::BTreeMap;
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::str::FromStr;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// Uniquely identifies a message within a single mailbox.
///
/// UIDs start at 1 and are assigned strictly sequentially as messages are
/// added to the mailbox. They are never reused, even after the message is
/// expunged.
#[derive(
    Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Uid(pub NonZeroU32);

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({})", self.0.get())
    }
}

// Only here so that things containing SeqRange<ID> can derive Default.
impl Default for Uid {
    fn default() -> Self {
        Uid::MIN
    }
}

impl Uid {
    // Unsafe because new() isn't const for some reason
    pub const MIN: Self = unsafe { Uid(NonZeroU32::new_unchecked(1)) };
    pub const MAX: Self = unsafe { Uid(NonZeroU32::new_unchecked(u32::MAX)) };

    pub fn of(uid: u32) -> Option<Self> {
        NonZeroU32::new(uid).map(Uid)
    }

    pub fn next(self) -> Option<Self> {
        self.0.get().checked_add(1).and_then(Uid::of)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    #[cfg(test)]
    pub fn u(uid: u32) -> Self {
        Uid::of(uid).unwrap()
    }
}

impl TryFrom<u32> for Uid {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl Into<u32> for Uid {
    fn into(self) -> u32 {
        self.0.get()
    }
}

/// The position of a message within one session's snapshot of a mailbox,
/// starting from 1.
///
/// Sequence numbers shift whenever that session learns of an expunge, so
/// they are only meaningful relative to one `SelectedView`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seqnum(pub NonZeroU32);

// Only here so that things containing SeqRange<ID> can derive Default.
impl Default for Seqnum {
    fn default() -> Self {
        Seqnum::MIN
    }
}

impl Seqnum {
    // Unsafe because new() isn't const for some reason
    pub const MIN: Self = unsafe { Seqnum(NonZeroU32::new_unchecked(1)) };

    pub fn of(seqnum: u32) -> Option<Self> {
        NonZeroU32::new(seqnum).map(Seqnum)
    }

    #[cfg(test)]
    pub fn u(seqnum: u32) -> Self {
        Seqnum::of(seqnum).unwrap()
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn to_index(self) -> usize {
        self.0.get() as usize - 1
    }

    /// Panics if `ix + 1` doesn't fit in a `u32`. Views never hold that many
    /// messages since UIDs are `u32` too.
    pub fn from_index(ix: usize) -> Self {
        let raw: u32 = (ix + 1).try_into().unwrap();
        Seqnum::of(raw).unwrap()
    }
}

impl TryFrom<u32> for Seqnum {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl Into<u32> for Seqnum {
    fn into(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for Seqnum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Seqnum({})", self.0.get())
    }
}

/// A CONDSTORE "modifier sequence" number.
///
/// Each mailbox has one counter (its modify index). Every mutation takes the
/// next value, and a message's modseq is the value of the counter at its most
/// recent mutation. `Modseq::ZERO` is the counter of a mailbox which has
/// never been changed; no message ever carries it.
#[derive(
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(transparent)]
pub struct Modseq(pub u64);

impl Modseq {
    pub const ZERO: Self = Modseq(0);

    pub fn next(self) -> Self {
        Modseq(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Modseq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Modseq({})", self.0)
    }
}

/// Index of a mailbox in its owner's mailbox table.
///
/// Ids are never reused within one account, so a stale id held by a session
/// whose mailbox was deleted can never alias a newer mailbox.
#[derive(
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(transparent)]
pub struct MailboxId(pub u32);

/// Process-unique identity of one connection, used to suppress notification
/// echoes back to the session that caused a change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

/// Opaque key into the raw message store.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RawRef(pub String);

/// A "sequence set range" of sequence numbers or UIDs.
///
/// Internally, this is maintained as a minimal sorted set of disjoint,
/// non-adjacent inclusive ranges keyed by their start. It does not remember
/// the original fragmentation, ordering, or duplication.
///
/// The `Display` format is the minimal IMAP wire format. IMAP cannot express
/// an empty set; `Display` then produces an empty string.
#[derive(Clone, PartialEq, Eq)]
pub struct SeqRange<T> {
    parts: BTreeMap<u32, u32>,
    _t: PhantomData<T>,
}

impl<T> SeqRange<T> {
    pub fn new() -> Self {
        SeqRange {
            parts: BTreeMap::new(),
            _t: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl<T: TryFrom<u32> + Into<u32> + PartialOrd> SeqRange<T> {
    pub fn just(item: T) -> Self {
        let mut this = SeqRange::new();
        this.append(item);
        this
    }

    pub fn range(start: T, end: T) -> Self {
        let mut this = SeqRange::new();
        this.insert(start, end);
        this
    }

    /// Append a single item, which must be strictly greater than everything
    /// already in the set.
    pub fn append(&mut self, item: T) {
        let item: u32 = item.into();

        if let Some(end) = self.parts.values_mut().next_back() {
            assert!(item > *end, "SeqRange::append out of order");

            if item == *end + 1 {
                *end = item;
                return;
            }
        }

        self.parts.insert(item, item);
    }

    /// Insert the inclusive range `start..=end`.
    pub fn insert(&mut self, start: T, end: T) {
        assert!(end >= start);
        self.insert_raw(start.into(), end.into());
    }

    fn insert_raw(&mut self, mut start: u32, mut end: u32) {
        // Absorb every later range that overlaps or touches the new one.
        while let Some((&next_start, &next_end)) =
            self.parts.range((Excluded(start), Unbounded)).next()
        {
            if next_start > end.saturating_add(1) {
                break;
            }

            end = end.max(next_end);
            self.parts.remove(&next_start);
        }

        // Then merge with the closest earlier range if they touch.
        if let Some((&prev_start, &prev_end)) =
            self.parts.range((Unbounded, Included(start))).next_back()
        {
            if prev_end.saturating_add(1) >= start {
                start = prev_start;
                end = end.max(prev_end);
            }
        }

        self.parts.insert(start, end);
    }

    pub fn contains(&self, v: T) -> bool {
        let v: u32 = v.into();
        self.parts
            .range(..=v)
            .next_back()
            .filter(|&(_, &end)| end >= v)
            .is_some()
    }

    /// Iterate the items of this set in strictly ascending order.
    ///
    /// Items greater than `max` and values not representable as `T` are
    /// silently skipped.
    pub fn items<'a>(
        &'a self,
        max: impl Into<u32>,
    ) -> impl Iterator<Item = T> + 'a {
        let max: u32 = max.into();
        self.parts
            .iter()
            .map(|(&start, &end)| (start, end))
            .filter(move |&(start, _)| start <= max)
            .flat_map(move |(start, end)| start..=end.min(max))
            .filter_map(|v| T::try_from(v).ok())
    }

    /// Parse the IMAP wire format of a sequence set.
    ///
    /// `splat` is the value substituted for `*`.
    pub fn parse(raw: &str, splat: T) -> Option<Self> {
        fn endpoint(r: &str, splat: u32) -> Option<u32> {
            if "*" == r {
                Some(splat)
            } else if !r.is_empty() && r.bytes().all(|b| b.is_ascii_digit()) {
                r.parse().ok().filter(|&v| v > 0)
            } else {
                None
            }
        }

        let splat = splat.into();

        let mut this = Self::new();
        for part in raw.split(',') {
            let mut ends = part.split(':');
            match (ends.next(), ends.next(), ends.next()) {
                (Some(only), None, None) => {
                    let only = endpoint(only, splat)?;
                    this.insert_raw(only, only);
                }
                (Some(a), Some(b), None) => {
                    let a = endpoint(a, splat)?;
                    let b = endpoint(b, splat)?;
                    // Either order is allowed on the wire.
                    this.insert_raw(a.min(b), a.max(b));
                }
                _ => return None,
            }
        }

        Some(this)
    }

    pub fn len(&self) -> usize {
        self.parts
            .iter()
            .map(|(&start, &end)| (end - start) as usize + 1)
            .sum()
    }

    /// Return the maximum value in this set, raw.
    pub fn max(&self) -> Option<u32> {
        self.parts.values().next_back().copied()
    }
}

impl<T: TryFrom<u32> + Into<u32> + PartialOrd> std::iter::FromIterator<T>
    for SeqRange<T>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut this = SeqRange::new();
        for item in iter {
            let raw: u32 = item.into();
            this.insert_raw(raw, raw);
        }
        this
    }
}

impl<T> fmt::Display for SeqRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (ix, (&start, &end)) in self.parts.iter().enumerate() {
            if 0 != ix {
                f.write_str(",")?;
            }

            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}:{}", start, end)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for SeqRange<Seqnum> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[Seqnum {}]", self)
    }
}

impl fmt::Debug for SeqRange<Uid> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[Uid {}]", self)
    }
}

impl<T> Default for SeqRange<T> {
    fn default() -> Self {
        SeqRange::new()
    }
}

/// A message flag.
///
/// System flags are represented as top-level enum values. Keywords are in the
/// `Keyword` case.
///
/// The `Display` format is the exact wire form. `FromStr` does the reverse,
/// and also understands non-standard casing of the system flags.
///
/// `\Recent` is not represented here since it is a per-session property,
/// not a stored flag.
#[derive(Clone, Serialize, Deserialize)]
pub enum Flag {
    Answered,
    Deleted,
    Draft,
    Flagged,
    Seen,
    Keyword(String),
}

impl Flag {
    pub const SYSTEM: [Flag; 5] = [
        Flag::Answered,
        Flag::Deleted,
        Flag::Draft,
        Flag::Flagged,
        Flag::Seen,
    ];
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Flag::Answered => f.write_str("\\Answered"),
            Flag::Deleted => f.write_str("\\Deleted"),
            Flag::Draft => f.write_str("\\Draft"),
            Flag::Flagged => f.write_str("\\Flagged"),
            Flag::Seen => f.write_str("\\Seen"),
            Flag::Keyword(ref kw) => f.write_str(kw),
        }
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <Flag as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.eq_ignore_ascii_case("\\answered") {
            Ok(Flag::Answered)
        } else if s.eq_ignore_ascii_case("\\deleted") {
            Ok(Flag::Deleted)
        } else if s.eq_ignore_ascii_case("\\draft") {
            Ok(Flag::Draft)
        } else if s.eq_ignore_ascii_case("\\flagged") {
            Ok(Flag::Flagged)
        } else if s.eq_ignore_ascii_case("\\seen") {
            Ok(Flag::Seen)
        } else if s.starts_with('\\') {
            Err(Error::NxFlag)
        } else if !s.is_empty() && s.bytes().all(is_atom_char) {
            Ok(Flag::Keyword(s.to_owned()))
        } else {
            Err(Error::UnsafeName)
        }
    }
}

fn is_atom_char(ch: u8) -> bool {
    !matches!(
        ch,
        0..=b' '
            | 127..=255
            | b'('
            | b')'
            | b'{'
            | b'*'
            | b'%'
            | b'\\'
            | b'"'
            | b']'
    )
}

impl PartialEq for Flag {
    fn eq(&self, other: &Flag) -> bool {
        match (self, other) {
            (&Flag::Answered, &Flag::Answered)
            | (&Flag::Deleted, &Flag::Deleted)
            | (&Flag::Draft, &Flag::Draft)
            | (&Flag::Flagged, &Flag::Flagged)
            | (&Flag::Seen, &Flag::Seen) => true,
            // Clients expect keywords to be case-insensitive. Only ASCII
            // case folding applies since keywords are atoms.
            (&Flag::Keyword(ref a), &Flag::Keyword(ref b)) => {
                a.eq_ignore_ascii_case(b)
            }
            _ => false,
        }
    }
}

impl Eq for Flag {}

/// Attributes that may be applied to mailboxes.
///
/// `Inbox` and the RFC 6154 markers are "special-use": mailboxes carrying one
/// of them resist deletion and renaming.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum MailboxAttribute {
    Noselect,
    HasChildren,
    HasNoChildren,
    Inbox,
    Archive,
    Drafts,
    Flagged,
    Junk,
    Sent,
    Trash,
}

impl MailboxAttribute {
    pub fn name(&self) -> &'static str {
        match *self {
            MailboxAttribute::Noselect => "\\Noselect",
            MailboxAttribute::HasChildren => "\\HasChildren",
            MailboxAttribute::HasNoChildren => "\\HasNoChildren",
            MailboxAttribute::Inbox => "\\Inbox",
            MailboxAttribute::Archive => "\\Archive",
            MailboxAttribute::Drafts => "\\Drafts",
            MailboxAttribute::Flagged => "\\Flagged",
            MailboxAttribute::Junk => "\\Junk",
            MailboxAttribute::Sent => "\\Sent",
            MailboxAttribute::Trash => "\\Trash",
        }
    }

    pub fn is_special_use(&self) -> bool {
        !matches!(
            *self,
            MailboxAttribute::Noselect
                | MailboxAttribute::HasChildren
                | MailboxAttribute::HasNoChildren
        )
    }
}

impl fmt::Display for MailboxAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for MailboxAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <MailboxAttribute as fmt::Display>::fmt(self, f)
    }
}

/// How a `STORE` combines the listed flags with the existing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreAction {
    /// `FLAGS`: replace the whole set.
    Set,
    /// `+FLAGS`
    Add,
    /// `-FLAGS`
    Remove,
}

/// The `STORE` command, after sequence numbers have been resolved to UIDs.
#[derive(Clone, Debug)]
pub struct StoreRequest<'a> {
    pub uids: &'a SeqRange<Uid>,
    pub action: StoreAction,
    pub flags: &'a [Flag],
    /// CONDSTORE `UNCHANGEDSINCE`. Messages whose modseq is greater are
    /// left alone and reported in `StoreResponse::modified`.
    pub unchanged_since: Option<Modseq>,
}

/// One message whose flags actually changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagChange {
    pub uid: Uid,
    pub flags: Vec<Flag>,
    pub modseq: Modseq,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreResponse {
    /// Effective changes, in ascending UID order.
    pub changed: Vec<FlagChange>,
    /// UIDs which failed the `UNCHANGEDSINCE` test.
    pub modified: SeqRange<Uid>,
}

/// Result of expunging messages from a mailbox.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpungeResponse {
    /// Removed UIDs, ascending.
    pub expunged: Vec<Uid>,
    /// The modify index after the expunge, if anything was removed.
    pub modseq: Option<Modseq>,
}

/// The `STATUS` command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRequest {
    pub name: String,
    pub messages: bool,
    pub recent: bool,
    pub uid_next: bool,
    pub uid_validity: bool,
    pub unseen: bool,
    pub highest_modseq: bool,
}

/// Response for `STATUS`. Fields not requested are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusResponse {
    pub name: String,
    pub messages: Option<usize>,
    pub recent: Option<usize>,
    pub uid_next: Option<Uid>,
    pub uid_validity: Option<u32>,
    pub unseen: Option<usize>,
    pub highest_modseq: Option<Modseq>,
}

/// `LIST` and `LSUB`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRequest {
    pub reference: String,
    pub pattern: String,
    /// `LSUB` semantics: only subscribed names, which need not exist.
    pub subscribed_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct ListResponse {
    pub name: String,
    pub attributes: Vec<MailboxAttribute>,
}

/// The state reported by `SELECT`/`EXAMINE`, plus the snapshot the session
/// keeps for translating sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectResponse {
    pub name: String,
    pub uids: Vec<Uid>,
    /// UIDs which this session claimed as `\Recent`.
    pub recent: Vec<Uid>,
    /// Every flag in use in the mailbox, including the system flags.
    pub flags: Vec<Flag>,
    pub unseen: Option<Seqnum>,
    pub uid_next: Uid,
    pub uid_validity: u32,
    pub highest_modseq: Modseq,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRequest {
    pub flags: Vec<Flag>,
    pub internal_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResponse {
    pub uid_validity: u32,
    pub uid: Uid,
    pub modseq: Modseq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResponse {
    pub uid_validity: u32,
    /// Source UIDs, ascending and index-aligned with `to_uids`.
    pub from_uids: Vec<Uid>,
    pub to_uids: Vec<Uid>,
}

/// Search criteria, after sequence numbers have been translated to UIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    All,
    Answered,
    Deleted,
    Draft,
    Flagged,
    Seen,
    Unanswered,
    Undeleted,
    Undraft,
    Unflagged,
    Unseen,
    Keyword(Flag),
    Unkeyword(Flag),
    New,
    Old,
    Recent,
    UidSet(SeqRange<Uid>),
    Before(NaiveDate),
    On(NaiveDate),
    Since(NaiveDate),
    SentBefore(NaiveDate),
    SentOn(NaiveDate),
    SentSince(NaiveDate),
    Larger(u32),
    Smaller(u32),
    Header(String, String),
    Body(String),
    Text(String),
    Modseq(Modseq),
    Not(Box<SearchQuery>),
    Or(Box<SearchQuery>, Box<SearchQuery>),
    And(Vec<SearchQuery>),
}

#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a SearchQuery,
    /// UIDs the searching session holds as `\Recent`.
    pub recent: &'a SeqRange<Uid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    /// Matching UIDs, in mailbox order.
    pub hits: Vec<Uid>,
    /// The greatest modseq among the hits, `ZERO` if there are none.
    pub highest_modseq: Modseq,
}

/// A request for one body section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRequest {
    pub part: SectionPart,
    /// `<origin.length>` partial fetch.
    pub partial: Option<(u32, u32)>,
    /// `BODY.PEEK` and `RFC822.HEADER`.
    pub peek: bool,
    /// How the section is labelled in the response.
    pub kind: SectionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPart {
    Full,
    Header,
    Text,
    HeaderFields(Vec<String>),
    HeaderFieldsNot(Vec<String>),
}

/// The naming family a section was requested under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Body,
    Rfc822,
    Rfc822Header,
    Rfc822Text,
}

/// The `FETCH` command, after sequence numbers have been resolved to UIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub uids: SeqRange<Uid>,
    pub uid: bool,
    pub flags: bool,
    pub internal_date: bool,
    pub rfc822_size: bool,
    pub modseq: bool,
    pub sections: Vec<SectionRequest>,
    /// CONDSTORE `CHANGEDSINCE`.
    pub changed_since: Option<Modseq>,
    /// Whether a non-peek section may implicitly set `\Seen`.
    pub read_only: bool,
}

impl FetchRequest {
    pub fn marks_seen(&self) -> bool {
        !self.read_only && self.sections.iter().any(|s| !s.peek)
    }
}

/// One fetched message, before it is assigned a sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    pub uid: Uid,
    pub flags: Option<Vec<Flag>>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub rfc822_size: Option<u32>,
    pub modseq: Option<Modseq>,
    pub sections: Vec<FetchedSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSection {
    pub request: SectionRequest,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub messages: Vec<FetchedMessage>,
    /// Changes caused by implicit `\Seen`, already queued for others.
    pub seen_changes: Vec<FlagChange>,
}
