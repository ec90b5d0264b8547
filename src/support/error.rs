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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Mailbox name is not acceptable")]
    UnsafeName,
    #[error("No such mailbox")]
    NxMailbox,
    #[error("Mailbox already exists")]
    MailboxExists,
    #[error("Operation not allowed on special-use mailbox")]
    SpecialUseMailbox,
    #[error("Mailbox cannot be renamed to itself")]
    RenameToSelf,
    #[error("Mailbox cannot be moved inside itself")]
    RenameIntoSelf,
    #[error("Unknown system flag")]
    NxFlag,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Authentication backend unavailable")]
    AuthUnavailable,
    #[error("Stored message not found")]
    NxMessageData,
    #[error("UID space exhausted")]
    UidsExhausted,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    Cbor(#[from] serde_cbor::error::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
}
