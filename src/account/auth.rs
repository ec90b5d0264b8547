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

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::error;
use secstr::SecUtf8;
use serde::Deserialize;

use crate::support::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    /// `LOGIN` with a cleartext password.
    Plain,
}

/// An authenticated identity. `name` is the account owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
}

pub trait Authenticator: Send + Sync {
    /// Check the given credentials.
    ///
    /// Bad credentials are `Error::AuthenticationFailed`; a backend that
    /// can't answer at all is `Error::AuthUnavailable`.
    fn authenticate(
        &self,
        user: &str,
        password: &SecUtf8,
        method: AuthMethod,
    ) -> Result<Principal, Error>;
}

#[derive(Deserialize)]
struct UsersFile {
    #[serde(default)]
    user: Vec<UserEntry>,
}

#[derive(Deserialize)]
struct UserEntry {
    name: String,
    password_hash: String,
}

/// Authenticates against a TOML file of argon2 password hashes.
///
/// ```toml
/// [[user]]
/// name = "azure"
/// password_hash = "$argon2i$v=19$m=4096,t=3,p=1$..."
/// ```
pub struct TomlAuthenticator {
    users: HashMap<String, String>,
}

impl TomlAuthenticator {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let file: UsersFile = toml::from_str(text)?;
        Ok(TomlAuthenticator {
            users: file
                .user
                .into_iter()
                .map(|u| (u.name, u.password_hash))
                .collect(),
        })
    }
}

impl Authenticator for TomlAuthenticator {
    fn authenticate(
        &self,
        user: &str,
        password: &SecUtf8,
        _method: AuthMethod,
    ) -> Result<Principal, Error> {
        let hash = self.users.get(user).ok_or(Error::AuthenticationFailed)?;

        match argon2::verify_encoded(hash, password.unsecure().as_bytes()) {
            Ok(true) => Ok(Principal {
                name: user.to_owned(),
            }),
            Ok(false) => Err(Error::AuthenticationFailed),
            Err(e) => {
                error!(
                    "Stored password hash for {:?} is unusable: {}",
                    user, e
                );
                Err(Error::AuthUnavailable)
            }
        }
    }
}

/// Produce an encoded argon2 hash of `password` with a fresh random salt.
pub fn hash_password(password: &SecUtf8) -> Result<String, Error> {
    hash_password_with(password, &argon2::Config::default())
}

fn hash_password_with(
    password: &SecUtf8,
    config: &argon2::Config<'_>,
) -> Result<String, Error> {
    let mut salt = [0u8; 16];
    openssl::rand::rand_bytes(&mut salt)?;
    Ok(argon2::hash_encoded(
        password.unsecure().as_bytes(),
        &salt,
        config,
    )?)
}

/// Hash with minimal cost parameters.
#[cfg(test)]
pub fn hash_password_for_test(password: &str) -> String {
    let config = argon2::Config {
        mem_cost: 64,
        time_cost: 1,
        ..argon2::Config::default()
    };
    hash_password_with(&SecUtf8::from(password), &config).unwrap()
}
