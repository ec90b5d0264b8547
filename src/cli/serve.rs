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

use std::io::{self, BufRead, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use nix::poll::{poll, PollFd, PollFlags};
use openssl::ssl::{SslAcceptor, SslStream};

use crate::account::auth::TomlAuthenticator;
use crate::account::message_store::FsMessageStore;
use crate::account::notifier::Notifier;
use crate::account::persistence::CborStateStore;
use crate::account::registry::Registry;
use crate::imap::command_processor::{CommandProcessor, Services};
use crate::imap::server::{Server, TlsUpgrade};
use crate::support::error::Error;
use crate::support::file_ops;
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;
use crate::support::tls::{self, FileKeyCertResolver, SniContextCache};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const POLL_TIMEOUT_MS: i32 = 30 * 60_000;

// Need to use a this and not die! so that errors go to syslog/etc
macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

pub(super) fn serve(system_config: SystemConfig, system_root: PathBuf) {
    let system_config = Arc::new(system_config);
    let acceptor = create_ssl_acceptor(&system_config, &system_root);
    let services = Arc::new(create_services(&system_config, &system_root));

    let mut listeners = Vec::new();
    if !system_config.imap.listen.is_empty() {
        let services = Arc::clone(&services);
        let acceptor = acceptor.clone();
        listeners.push(spawn_listener(
            &system_config.imap.listen,
            move |stream, peer| {
                serve_cleartext(stream, peer, &services, acceptor.clone())
            },
        ));
    }

    if let Some(ref address) = system_config.imap.listen_tls {
        let acceptor = match acceptor {
            Some(ref acceptor) => Arc::clone(acceptor),
            None => fatal!(
                EX_CONFIG,
                "listen_tls is set but no TLS key is configured"
            ),
        };

        let services = Arc::clone(&services);
        listeners.push(spawn_listener(address, move |stream, peer| {
            serve_tls(stream, peer, &services, &acceptor)
        }));
    }

    if listeners.is_empty() {
        fatal!(EX_CONFIG, "No IMAP listeners are configured");
    }

    for listener in listeners {
        if listener.join().is_err() {
            fatal!(EX_SOFTWARE, "Listener thread panicked");
        }
    }
}

fn create_ssl_acceptor(
    system_config: &SystemConfig,
    system_root: &Path,
) -> Option<Arc<SslAcceptor>> {
    if system_config.tls.private_key.as_os_str().is_empty() {
        warn!("No TLS key configured; STARTTLS will not be offered");
        return None;
    }

    let resolver = FileKeyCertResolver::new(
        system_root.to_owned(),
        system_config.tls.clone(),
    );
    let cache = Arc::new(SniContextCache::new(Arc::new(resolver)));
    match tls::create_acceptor(cache) {
        Ok(acceptor) => Some(Arc::new(acceptor)),
        Err(e) => fatal!(EX_CONFIG, "Unable to set up TLS: {}", e),
    }
}

fn create_services(
    system_config: &Arc<SystemConfig>,
    system_root: &Path,
) -> Services {
    let data_root = system_root.join(&system_config.storage.data_root);
    if let Err(e) = file_ops::ensure_dir(&data_root) {
        fatal!(
            EX_CANTCREAT,
            "Unable to create data directory '{}': {}",
            data_root.display(),
            e
        );
    }

    let users_file = system_root.join(&system_config.users.file);
    let authenticator = match TomlAuthenticator::load(&users_file) {
        Ok(authenticator) => authenticator,
        Err(e) => fatal!(
            EX_CONFIG,
            "Unable to load users from '{}': {}",
            users_file.display(),
            e
        ),
    };

    let registry = Registry::new(
        Arc::new(CborStateStore::new(data_root.clone())),
        Arc::new(FsMessageStore::new(data_root)),
        Arc::new(Notifier::new()),
        system_config.imap.default_mailboxes.clone(),
    );

    Services {
        registry: Arc::new(registry),
        authenticator: Arc::new(authenticator),
        config: Arc::clone(system_config),
    }
}

fn spawn_listener(
    address: &str,
    handler: impl Fn(TcpStream, String) + Send + Sync + 'static,
) -> thread::JoinHandle<()> {
    let listener = match TcpListener::bind(address) {
        Ok(listener) => listener,
        Err(e) => fatal!(EX_OSERR, "Unable to listen on {}: {}", address, e),
    };
    info!("Listening on {}", address);

    let handler = Arc::new(handler);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let peer = peer_name(&stream);
            let handler = Arc::clone(&handler);
            let spawned = thread::Builder::new()
                .name(format!("imap:{}", peer))
                .spawn(move || handler(stream, peer));
            if let Err(e) = spawned {
                error!("Unable to spawn connection thread: {}", e);
            }
        }
    })
}

fn peer_name(stream: &TcpStream) -> String {
    match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(e) => {
            warn!("Unable to determine peer name: {}", e);
            "unknown-socket".to_owned()
        }
    }
}

fn configure_socket(stream: &TcpStream, peer: &str) {
    if let Err(e) = stream
        .set_read_timeout(Some(SOCKET_TIMEOUT))
        .and_then(|_| stream.set_write_timeout(Some(SOCKET_TIMEOUT)))
    {
        warn!("{} Unable to configure timeouts: {}", peer, e);
    }

    let _ = stream.set_nodelay(true);
    info!("{} Connection established", peer);
}

fn serve_cleartext(
    stream: TcpStream,
    peer: String,
    services: &Arc<Services>,
    acceptor: Option<Arc<SslAcceptor>>,
) {
    configure_socket(&stream, &peer);

    let clones = stream.try_clone().and_then(|r| Ok((r, stream.try_clone()?)));
    let (read, write) = match clones {
        Ok(clones) => clones,
        Err(e) => {
            warn!("{} Unable to split socket: {}", peer, e);
            return;
        }
    };

    let processor = CommandProcessor::new(
        LogPrefix::new("imap".to_owned(), peer.clone()),
        Arc::clone(services),
        false,
    );
    let mut server = Server::new(
        io::BufReader::new(read),
        io::BufWriter::new(write),
        processor,
    );
    if let Some(acceptor) = acceptor {
        server = server.with_starttls(Box::new(StartTls { stream, acceptor }));
    }

    run(server, &peer);
}

fn serve_tls(
    stream: TcpStream,
    peer: String,
    services: &Arc<Services>,
    acceptor: &SslAcceptor,
) {
    configure_socket(&stream, &peer);

    let (read, write) = match accept(acceptor, stream) {
        Ok(halves) => halves,
        Err(e) => {
            warn!("{} SSL handshake failed: {}", peer, e);
            return;
        }
    };
    info!("{} SSL handshake succeeded", peer);

    let processor = CommandProcessor::new(
        LogPrefix::new("imaps".to_owned(), peer.clone()),
        Arc::clone(services),
        true,
    );
    run(Server::new(read, write, processor), &peer);
}

fn run(mut server: Server, peer: &str) {
    match server.run() {
        Ok(_) => info!("{} Normal client disconnect", peer),
        Err(e) => warn!("{} Abnormal client disconnect: {}", peer, e),
    }
}

type Halves = (Box<dyn BufRead + Send>, Box<dyn Write + Send>);

/// Perform the TLS handshake on `stream`, then switch it to non-blocking
/// mode and split the result into a buffered reader and writer.
fn accept(acceptor: &SslAcceptor, stream: TcpStream) -> Result<Halves, Error> {
    let fd = stream.as_raw_fd();
    let ssl_stream = acceptor.accept(stream).map_err(|e| {
        Error::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
    })?;
    ssl_stream.get_ref().set_nonblocking(true)?;

    // This mutex is pretty unfortunate, but needed right now to split
    // SslStream into two pieces.
    let ssl_stream = Arc::new(Mutex::new(ssl_stream));
    Ok((
        Box::new(io::BufReader::new(WrappedIo {
            stream: Arc::clone(&ssl_stream),
            fd,
        })),
        Box::new(io::BufWriter::new(WrappedIo {
            stream: ssl_stream,
            fd,
        })),
    ))
}

struct StartTls {
    stream: TcpStream,
    acceptor: Arc<SslAcceptor>,
}

impl TlsUpgrade for StartTls {
    fn upgrade(self: Box<Self>) -> Result<Halves, Error> {
        accept(&self.acceptor, self.stream)
    }
}

/// Wraps SslStream to implement Read and Write over this structure in the
/// mutex, and also to deal with non-blocking IO.
///
/// We need to use non-blocking IO to allow writes to proceed even when read is
/// blocking on getting data from the client, as when doing IDLE or when
/// another session pushes a change notification.
struct WrappedIo {
    stream: Arc<Mutex<SslStream<TcpStream>>>,
    fd: RawFd,
}

impl Read for WrappedIo {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let res = {
                let mut lock = self.stream.lock().unwrap();
                lock.ssl_read(buf)
            };

            match res {
                Ok(n) => return Ok(n),
                Err(e) => self.on_error(e)?,
            }
        }
    }
}

impl Write for WrappedIo {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            let res = {
                let mut lock = self.stream.lock().unwrap();
                lock.ssl_write(buf)
            };

            match res {
                Ok(n) => return Ok(n),
                Err(e) => self.on_error(e)?,
            };
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut lock = self.stream.lock().unwrap();
        lock.flush()
    }
}

impl WrappedIo {
    fn on_error(&mut self, e: openssl::ssl::Error) -> io::Result<()> {
        match e.code() {
            openssl::ssl::ErrorCode::WANT_READ => {
                let mut fds = [PollFd::new(
                    self.fd,
                    PollFlags::POLLIN | PollFlags::POLLERR,
                )];

                handle_poll_result(poll(&mut fds, POLL_TIMEOUT_MS))
            }
            openssl::ssl::ErrorCode::WANT_WRITE => {
                let mut fds = [PollFd::new(
                    self.fd,
                    PollFlags::POLLOUT | PollFlags::POLLERR,
                )];

                handle_poll_result(poll(&mut fds, POLL_TIMEOUT_MS))
            }
            _ => Err(e
                .into_io_error()
                .unwrap_or_else(|e| io::Error::new(io::ErrorKind::Other, e))),
        }
    }
}

fn handle_poll_result(
    result: Result<nix::libc::c_int, nix::Error>,
) -> io::Result<()> {
    match result {
        Ok(0) => {
            Err(io::Error::new(io::ErrorKind::TimedOut, "Socket timed out"))
        }
        Ok(_) => Ok(()),
        Err(nix::Error::Sys(nix::errno::Errno::EINTR)) => Ok(()),
        Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
    }
}
