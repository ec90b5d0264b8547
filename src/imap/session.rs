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

//! Per-connection session state and the port through which other sessions'
//! changes reach this one.

use std::io::{self, Write};
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use log::debug;

use super::lex::LexWriter;
use super::response as r;
use crate::account::account::Account;
use crate::account::model::*;
use crate::account::notifier::{
    ChangeEntry, ChangeKind, ChangeSink, MailboxKey,
};
use crate::support::log_prefix::LogPrefix;

pub type SharedWriter = Arc<Output>;

/// A connection's outbound byte stream.
///
/// Responses are rendered into `pending`, which is only ever held briefly
/// and never across I/O. Whoever holds `stream` moves pending bytes onto
/// the wire, so bytes leave in the order they were rendered no matter which
/// thread produced them.
pub struct Output {
    pending: Mutex<Vec<u8>>,
    stream: Mutex<Box<dyn Write + Send>>,
}

impl Output {
    pub fn new(stream: Box<dyn Write + Send>) -> Self {
        Output {
            pending: Mutex::new(Vec::new()),
            stream: Mutex::new(stream),
        }
    }

    /// Lock the underlying stream.
    ///
    /// While the guard is held, other threads can still queue responses but
    /// none of them reach the wire.
    pub fn stream(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.stream.lock().unwrap()
    }

    /// Queue one response line without writing it.
    pub fn queue(&self, line: &r::ResponseLine<'_>) {
        let mut pending = self.pending.lock().unwrap();
        let mut w = LexWriter::new(&mut *pending);
        // Writes into a `Vec` cannot fail
        let _ = line.write_to(&mut w);
        let _ = w.verbatim_bytes(b"\r\n");
    }

    /// Queue raw protocol bytes, such as a continuation request.
    pub fn queue_raw(&self, data: &[u8]) {
        self.pending.lock().unwrap().extend_from_slice(data);
    }

    /// Write everything queued so far, waiting for the stream if another
    /// thread is writing.
    pub fn flush(&self) -> io::Result<()> {
        self.flush_with(|stream| Some(stream.lock().unwrap()))
    }

    /// Like `flush`, but return at once if another thread holds the
    /// stream. That thread is then responsible for what was queued.
    pub fn flush_if_idle(&self) -> io::Result<()> {
        self.flush_with(|stream| match stream.try_lock() {
            Ok(stream) => Some(stream),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
        })
    }

    fn flush_with<'a>(
        &'a self,
        lock: impl Fn(
            &'a Mutex<Box<dyn Write + Send>>,
        ) -> Option<MutexGuard<'a, Box<dyn Write + Send>>>,
    ) -> io::Result<()> {
        loop {
            match lock(&self.stream) {
                Some(mut stream) => drain(&self.pending, &mut **stream)?,
                None => return Ok(()),
            }

            // Bytes queued by a thread that found the stream busy just
            // before we released it are ours to write.
            if self.pending.lock().unwrap().is_empty() {
                return Ok(());
            }
        }
    }
}

fn drain(
    pending: &Mutex<Vec<u8>>,
    stream: &mut (dyn Write + Send),
) -> io::Result<()> {
    loop {
        let data = mem::take(&mut *pending.lock().unwrap());
        if data.is_empty() {
            break;
        }
        stream.write_all(&data)?;
    }
    stream.flush()
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NotAuthenticated,
    Authenticated,
    Selected,
}

/// What one connection knows about itself, independent of the transport.
pub struct Session {
    pub id: SessionId,
    pub secure: bool,
    pub account: Option<Account>,
    pub selected: Option<MailboxKey>,
    pub logged_out: bool,
}

impl Session {
    pub fn new(secure: bool) -> Self {
        Session {
            id: SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)),
            secure,
            account: None,
            selected: None,
            logged_out: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.account, &self.selected) {
            (None, _) => SessionState::NotAuthenticated,
            (Some(_), None) => SessionState::Authenticated,
            (Some(_), Some(_)) => SessionState::Selected,
        }
    }
}

/// The session's snapshot of its selected mailbox.
///
/// `uids` is exactly the list of messages the client has been told about;
/// sequence number `n` is `uids[n - 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedView {
    pub key: MailboxKey,
    pub uids: Vec<Uid>,
    pub recent: SeqRange<Uid>,
    pub read_only: bool,
}

impl SelectedView {
    pub fn new(key: MailboxKey, select: &SelectResponse) -> Self {
        SelectedView {
            key,
            uids: select.uids.clone(),
            recent: select.recent.iter().copied().collect(),
            read_only: select.read_only,
        }
    }

    pub fn seqnum(&self, uid: Uid) -> Option<Seqnum> {
        self.uids.binary_search(&uid).ok().map(Seqnum::from_index)
    }

    pub fn uid(&self, seqnum: Seqnum) -> Option<Uid> {
        self.uids.get(seqnum.to_index()).copied()
    }

    pub fn max_seqnum(&self) -> u32 {
        self.uids.len() as u32
    }

    pub fn max_uid(&self) -> Option<Uid> {
        self.uids.last().copied()
    }

    pub fn is_recent(&self, uid: Uid) -> bool {
        self.recent.contains(uid)
    }

    pub fn seqnums_to_uids(
        &self,
        seqnums: &SeqRange<Seqnum>,
    ) -> SeqRange<Uid> {
        seqnums
            .items(self.max_seqnum())
            .filter_map(|s| self.uid(s))
            .collect()
    }

    /// Learn about a new message. Returns the new message count, or `None`
    /// if the message was already known.
    pub fn add(&mut self, uid: Uid) -> Option<u32> {
        if self.max_uid().map_or(true, |max| uid > max) {
            self.uids.push(uid);
            Some(self.max_seqnum())
        } else {
            None
        }
    }

    /// Forget an expunged message, returning the sequence number it had.
    pub fn remove(&mut self, uid: Uid) -> Option<Seqnum> {
        let ix = self.uids.binary_search(&uid).ok()?;
        self.uids.remove(ix);
        Some(Seqnum::from_index(ix))
    }
}

/// The output side of a session as seen by everyone else.
///
/// Lock order: the view, then the pending output buffer. The output stream
/// is never taken while the view is held.
pub struct SessionPort {
    id: SessionId,
    active: AtomicBool,
    condstore: AtomicBool,
    view: Mutex<Option<SelectedView>>,
    out: SharedWriter,
    log_prefix: LogPrefix,
}

impl SessionPort {
    pub fn new(id: SessionId, log_prefix: LogPrefix) -> Self {
        SessionPort {
            id,
            active: AtomicBool::new(true),
            condstore: AtomicBool::new(false),
            view: Mutex::new(None),
            out: Arc::new(Output::new(Box::new(io::sink()))),
            log_prefix,
        }
    }

    pub fn output(&self) -> &SharedWriter {
        &self.out
    }

    pub fn view(&self) -> MutexGuard<'_, Option<SelectedView>> {
        self.view.lock().unwrap()
    }

    pub fn enable_condstore(&self) {
        self.condstore.store(true, Ordering::Relaxed);
    }

    pub fn condstore(&self) -> bool {
        self.condstore.load(Ordering::Relaxed)
    }

    /// Stop accepting deliveries. In-flight deliveries become no-ops.
    pub fn close(&self) {
        self.active.store(false, Ordering::Relaxed);
        *self.view() = None;
    }

    /// Build the `FETCH` response reporting a flag change of `uid`.
    pub fn flag_fetch(
        &self,
        view: &SelectedView,
        uid: Uid,
        flags: Vec<Flag>,
        modseq: Option<Modseq>,
        include_flags: bool,
    ) -> Option<r::Response<'static>> {
        let seqnum = view.seqnum(uid)?;
        let mut atts = vec![r::FetchAtt::Uid(uid.get())];
        if include_flags {
            atts.push(r::FetchAtt::Flags(flags, view.is_recent(uid)));
        }
        if let (true, Some(modseq)) = (self.condstore(), modseq) {
            atts.push(r::FetchAtt::Modseq(modseq.get()));
        }

        Some(r::Response::Fetch(r::FetchResponse {
            seqnum: seqnum.get(),
            atts,
        }))
    }
}

impl ChangeSink for SessionPort {
    fn session_id(&self) -> SessionId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn deliver(&self, key: &MailboxKey, entry: &ChangeEntry) {
        let mut view = self.view();
        let view = match view.as_mut() {
            Some(view) if view.key == *key => view,
            _ => return,
        };

        let response = match entry.kind {
            ChangeKind::Exists => view.add(entry.uid).map(r::Response::Exists),
            ChangeKind::Expunge => view
                .remove(entry.uid)
                .map(|seqnum| r::Response::Expunge(seqnum.get())),
            ChangeKind::Fetch => self.flag_fetch(
                view,
                entry.uid,
                entry.flags.clone().unwrap_or_default(),
                entry.modseq,
                true,
            ),
        };

        if let Some(response) = response {
            self.out.queue(&r::ResponseLine {
                tag: None,
                response,
            });
        }
    }

    fn flush(&self) {
        if let Err(e) = self.out.flush_if_idle() {
            debug!("{} Dropped notification: {}", self.log_prefix, e);
        }
    }
}
