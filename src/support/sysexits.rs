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

//! The subset of `sysexits.h` the binary exits with.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Sysexit(pub i32);

/// Bad command line.
pub const EX_USAGE: Sysexit = Sysexit(64);
/// Input was malformed.
pub const EX_DATAERR: Sysexit = Sysexit(65);
/// Required input was missing.
pub const EX_NOINPUT: Sysexit = Sysexit(66);
/// Internal failure, such as OpenSSL refusing to initialise.
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
/// Could not bind a listener or spawn a thread.
pub const EX_OSERR: Sysexit = Sysexit(71);
/// Could not create the data directory.
pub const EX_CANTCREAT: Sysexit = Sysexit(73);
/// Configuration missing or invalid.
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }
}
