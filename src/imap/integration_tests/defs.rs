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
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::account::auth::{hash_password_for_test, TomlAuthenticator};
use crate::account::message_store::MemoryMessageStore;
use crate::account::notifier::Notifier;
use crate::account::persistence::MemoryStateStore;
use crate::account::registry::Registry;
use crate::imap::client::Client;
use crate::imap::command_processor::{CommandProcessor, Services};
use crate::imap::server::{Server, TlsUpgrade};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::*;

lazy_static! {
    static ref USERS_TOML: String = format!(
        "[[user]]\n\
         name = \"azure\"\n\
         password_hash = \"{}\"\n\
         [[user]]\n\
         name = \"cobalt\"\n\
         password_hash = \"{}\"\n",
        hash_password_for_test("hunter2"),
        hash_password_for_test("hunter3"),
    );
}

/// One server's worth of shared state. Connections made from the same
/// `Setup` see the same accounts.
#[derive(Clone)]
pub struct Setup {
    services: Arc<Services>,
}

pub fn set_up() -> Setup {
    set_up_with(true)
}

/// Like `set_up`, but `LOGIN` over a cleartext connection is refused.
pub fn set_up_strict() -> Setup {
    set_up_with(false)
}

fn set_up_with(allow_insecure_login: bool) -> Setup {
    crate::init_test_log();

    let mut config = SystemConfig::default();
    config.security.allow_insecure_login = allow_insecure_login;

    let registry = Registry::new(
        Arc::new(MemoryStateStore::new()),
        Arc::new(MemoryMessageStore::new()),
        Arc::new(Notifier::new()),
        DefaultMailbox::standard_set(),
    );

    Setup {
        services: Arc::new(Services {
            registry: Arc::new(registry),
            authenticator: Arc::new(
                TomlAuthenticator::parse(&USERS_TOML).unwrap(),
            ),
            config: Arc::new(config),
        }),
    }
}

pub type PipeClient =
    Client<io::BufReader<os_pipe::PipeReader>, os_pipe::PipeWriter>;

/// Stands in for a TLS handshake by carrying on over the same pipes.
struct PassthroughUpgrade {
    read: os_pipe::PipeReader,
    write: os_pipe::PipeWriter,
}

impl TlsUpgrade for PassthroughUpgrade {
    fn upgrade(
        self: Box<Self>,
    ) -> Result<(Box<dyn io::BufRead + Send>, Box<dyn io::Write + Send>), Error>
    {
        Ok((Box::new(io::BufReader::new(self.read)), Box::new(self.write)))
    }
}

impl Setup {
    pub fn connect(&self, name: &'static str) -> PipeClient {
        self.connect_with(name, false)
    }

    /// Connect with `STARTTLS` on offer.
    pub fn connect_starttls(&self, name: &'static str) -> PipeClient {
        self.connect_with(name, true)
    }

    fn connect_with(&self, name: &'static str, starttls: bool) -> PipeClient {
        let (server_in, client_out) = os_pipe::pipe().unwrap();
        let (client_in, server_out) = os_pipe::pipe().unwrap();
        let services = Arc::clone(&self.services);

        let upgrade = if starttls {
            Some(Box::new(PassthroughUpgrade {
                read: server_in.try_clone().unwrap(),
                write: server_out.try_clone().unwrap(),
            }))
        } else {
            None
        };

        std::thread::spawn(move || {
            let processor = CommandProcessor::new(
                LogPrefix::new("imap".to_owned(), name.to_owned()),
                services,
                false,
            );
            let mut server = Server::new(
                io::BufReader::new(server_in),
                server_out,
                processor,
            );
            if let Some(upgrade) = upgrade {
                server = server.with_starttls(upgrade);
            }

            match server.run() {
                Ok(()) => (),
                Err(Error::Io(e))
                    if io::ErrorKind::UnexpectedEof == e.kind() => {}
                Err(e) => panic!("Unexpected server error: {}", e),
            }
        });

        Client::new(io::BufReader::new(client_in), client_out, Some(name))
    }
}

pub fn receive_line_like(client: &mut PipeClient, pat: &str) {
    let line = client.read_line().unwrap();
    assert_line_like(&line, pat);
}

pub fn assert_line_like(line: &str, pat: &str) {
    assert!(
        Regex::new(pat).unwrap().is_match(line),
        "Expected\n\
         match: {:?}\n\
         Got:   {:?}\n",
        pat,
        line
    );
}

/// Assert that one of `lines` matches `pat`, returning it.
pub fn has_line_like<'a>(lines: &'a [String], pat: &str) -> &'a str {
    let rx = Regex::new(pat).unwrap();
    lines
        .iter()
        .find(|line| rx.is_match(line))
        .unwrap_or_else(|| {
            panic!("No line matches {:?} in {:#?}", pat, lines)
        })
}

pub fn has_no_line_like(lines: &[String], pat: &str) {
    let rx = Regex::new(pat).unwrap();
    if let Some(line) = lines.iter().find(|line| rx.is_match(line)) {
        panic!("Unexpected line {:?} matching {:?}", line, pat);
    }
}

/// The tagged line which ends a command's responses.
pub fn tagged(lines: &[String]) -> &str {
    lines.last().map(String::as_str).unwrap_or("")
}

pub fn assert_tagged_ok(lines: &[String]) {
    assert_line_like(tagged(lines), r"^[^ *]+ OK ");
}

pub fn assert_tagged_no(lines: &[String]) {
    assert_line_like(tagged(lines), r"^[^ *]+ NO ");
}

pub fn assert_tagged_bad(lines: &[String]) {
    assert_line_like(tagged(lines), r"^[^ *]+ BAD ");
}

/// Untagged lines only.
pub fn untagged(lines: &[String]) -> Vec<&str> {
    lines
        .iter()
        .filter(|line| line.starts_with("* "))
        .map(String::as_str)
        .collect()
}

pub fn skip_greeting(client: &mut PipeClient) {
    receive_line_like(client, r"^\* OK \[CAPABILITY IMAP4rev1 ");
}

pub fn quick_log_in(client: &mut PipeClient) {
    skip_greeting(client);
    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_tagged_ok(&lines);
}

pub fn quick_create(client: &mut PipeClient, name: &str) {
    let lines = client.command(&format!("CREATE {}", name)).unwrap();
    assert_tagged_ok(&lines);
}

pub fn quick_select(client: &mut PipeClient, name: &str) -> Vec<String> {
    let lines = client.command(&format!("SELECT {}", name)).unwrap();
    assert_tagged_ok(&lines);
    lines
}

/// `APPEND` `message` to `mailbox` using a non-synchronising literal,
/// returning the responses.
pub fn append(
    client: &mut PipeClient,
    mailbox: &str,
    flags: &str,
    message: &str,
) -> Vec<String> {
    let mut command = format!("APPEND {} ", mailbox);
    if !flags.is_empty() {
        command.push_str(flags);
        command.push(' ');
    }
    command.push_str(&format!("{{{}+}}\r\n", message.len()));
    command.push_str(message);
    client.command_raw(command.as_bytes()).unwrap()
}

pub fn quick_append(client: &mut PipeClient, mailbox: &str, message: &str) {
    let lines = append(client, mailbox, "", message);
    assert_tagged_ok(&lines);
}

pub fn simple_message(subject: &str) -> String {
    format!(
        "From: alice@example.com\r\n\
         To: azure@example.com\r\n\
         Subject: {}\r\n\
         \r\n\
         Body of {}\r\n",
        subject, subject
    )
}
