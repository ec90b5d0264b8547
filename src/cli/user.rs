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

use secstr::SecUtf8;

use crate::account::auth;

pub(super) fn hash_password() {
    let password = match rpassword::read_password_from_tty(Some("Password: "))
        .and_then(|a| {
            rpassword::read_password_from_tty(Some("Confirm: ")).map(|b| (a, b))
        }) {
        Err(e) => die!(EX_NOINPUT, "Failed to read password: {}", e),
        Ok((a, b)) if a != b => die!(EX_DATAERR, "Passwords don't match"),
        Ok((a, _)) if a.is_empty() => die!(EX_NOINPUT, "No password given"),
        Ok((a, _)) => SecUtf8::from(a),
    };

    match auth::hash_password(&password) {
        Ok(hash) => println!("{}", hash),
        Err(e) => die!(EX_SOFTWARE, "Failed to hash password: {}", e),
    }
}
