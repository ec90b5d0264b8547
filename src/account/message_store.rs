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

//! Storage of raw message bytes.
//!
//! Mailboxes only hold a `RawRef` per message. Copies share the same
//! reference, so the stored data is immutable once written.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tiny_keccak::{Hasher, Sha3};

use super::model::RawRef;
use super::persistence::check_owner_name;
use crate::support::error::Error;
use crate::support::file_ops::{self, ErrorTransforms, IgnoreKinds};

pub trait MessageStore: Send + Sync {
    fn put(&self, owner: &str, data: &[u8]) -> Result<RawRef, Error>;
    fn get(&self, owner: &str, raw: &RawRef) -> Result<Vec<u8>, Error>;
}

/// Content-addressed, zstd-compressed message files.
///
/// Each message lives at `<owner>/blobs/<xx>/<rest>` where `xxrest` is the
/// hex SHA3-256 of the uncompressed content. Identical messages are stored
/// once.
pub struct FsMessageStore {
    root: PathBuf,
    compression_level: i32,
}

impl FsMessageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsMessageStore {
            root: root.into(),
            compression_level: 3,
        }
    }

    fn path_for(&self, owner: &str, raw: &RawRef) -> Result<PathBuf, Error> {
        check_owner_name(owner)?;
        let hash = &raw.0;
        if 64 != hash.len() || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::NxMessageData);
        }

        Ok(self
            .root
            .join(owner)
            .join("blobs")
            .join(&hash[..2])
            .join(&hash[2..]))
    }
}

fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha3::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);

    let mut hex = String::with_capacity(64);
    for b in &hash {
        let _ = write!(hex, "{:02x}", b);
    }
    hex
}

impl MessageStore for FsMessageStore {
    fn put(&self, owner: &str, data: &[u8]) -> Result<RawRef, Error> {
        let raw = RawRef(content_hash(data));
        let path = self.path_for(owner, &raw)?;
        if path.is_file() {
            return Ok(raw);
        }

        if let Some(parent) = path.parent() {
            file_ops::ensure_dir(parent)?;
        }

        let compressed = zstd::encode_all(data, self.compression_level)?;
        file_ops::spit(&path, false, 0o400, &compressed)
            .ignore_already_exists()?;
        Ok(raw)
    }

    fn get(&self, owner: &str, raw: &RawRef) -> Result<Vec<u8>, Error> {
        let path = self.path_for(owner, raw)?;
        let file = fs::File::open(path).on_not_found(Error::NxMessageData)?;
        Ok(zstd::decode_all(file)?)
    }
}

/// Keeps messages in memory. Used by tests.
#[derive(Default)]
pub struct MemoryMessageStore {
    next: AtomicU64,
    messages: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for MemoryMessageStore {
    fn put(&self, owner: &str, data: &[u8]) -> Result<RawRef, Error> {
        let key = format!("m{}", self.next.fetch_add(1, Ordering::SeqCst));
        self.messages
            .lock()
            .unwrap()
            .insert((owner.to_owned(), key.clone()), data.to_vec());
        Ok(RawRef(key))
    }

    fn get(&self, owner: &str, raw: &RawRef) -> Result<Vec<u8>, Error> {
        self.messages
            .lock()
            .unwrap()
            .get(&(owner.to_owned(), raw.0.clone()))
            .cloned()
            .ok_or(Error::NxMessageData)
    }
}
