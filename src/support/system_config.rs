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
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::account::model::MailboxAttribute;

/// The system-wide configuration.
///
/// This is stored in a file named `mailcore.toml` under the system root,
/// which is typically `/etc/mailcore` or `/usr/local/etc/mailcore`. Relative
/// paths within it are resolved against that root.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Options relating to operational security.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Configuration for TLS.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Listener and session behaviour.
    #[serde(default)]
    pub imap: ImapConfig,

    /// Where mailbox state and message data live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// The credential database.
    #[serde(default)]
    pub users: UsersConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Permit `LOGIN` before the connection is protected by TLS.
    ///
    /// This exists for development setups and test harnesses only. Enabling
    /// it in production sends passwords over the wire in the clear.
    #[serde(default)]
    pub allow_insecure_login: bool,
}

// The Default implementation of TlsConfig is not useful in the real world, but
// is helpful for tests.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct TlsConfig {
    /// The path to the default TLS private key, which must be in PEM format.
    pub private_key: PathBuf,
    /// The path to the default TLS certificate chain, in PEM format.
    pub certificate_chain: PathBuf,
    /// Per-host overrides, selected by the SNI name the client sends.
    #[serde(default)]
    pub hosts: BTreeMap<String, TlsHostConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct TlsHostConfig {
    pub private_key: PathBuf,
    pub certificate_chain: PathBuf,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ImapConfig {
    /// Address of the cleartext listener, which offers `STARTTLS`.
    ///
    /// An empty string disables it.
    pub listen: String,
    /// Address of the implicit-TLS listener, if any.
    pub listen_tls: Option<String>,
    /// Mailboxes created the first time an account is used.
    pub default_mailboxes: Vec<DefaultMailbox>,
}

impl Default for ImapConfig {
    fn default() -> Self {
        ImapConfig {
            listen: "0.0.0.0:143".to_owned(),
            listen_tls: None,
            default_mailboxes: DefaultMailbox::standard_set(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DefaultMailbox {
    pub name: String,
    #[serde(default)]
    pub special_use: Option<MailboxAttribute>,
}

impl DefaultMailbox {
    pub fn standard_set() -> Vec<Self> {
        vec![
            DefaultMailbox {
                name: "INBOX".to_owned(),
                special_use: Some(MailboxAttribute::Inbox),
            },
            DefaultMailbox {
                name: "Drafts".to_owned(),
                special_use: Some(MailboxAttribute::Drafts),
            },
            DefaultMailbox {
                name: "Sent".to_owned(),
                special_use: Some(MailboxAttribute::Sent),
            },
            DefaultMailbox {
                name: "Junk".to_owned(),
                special_use: Some(MailboxAttribute::Junk),
            },
            DefaultMailbox {
                name: "Trash".to_owned(),
                special_use: Some(MailboxAttribute::Trash),
            },
        ]
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the per-user state and message directories.
    pub data_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_root: "data".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UsersConfig {
    /// TOML file listing `[[user]]` tables with `name` and `password_hash`.
    pub file: PathBuf,
}

impl Default for UsersConfig {
    fn default() -> Self {
        UsersConfig {
            file: "users.toml".into(),
        }
    }
}
