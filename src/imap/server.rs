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

//! The line-level protocol loop.
//!
//! `Server` reads command lines, inlines literals into them, and hands
//! complete commands to the `CommandProcessor`. The few commands which
//! change how the connection itself behaves (`IDLE`, `STARTTLS`) are driven
//! from here.

use std::borrow::Cow;
use std::io::{self, BufRead, Read, Write};
use std::str;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{info, warn};
use regex::bytes::Regex;

use super::command_processor::{CommandProcessor, APPEND_SIZE_LIMIT};
use super::response as r;
use super::session::SharedWriter;
use super::syntax as s;
use crate::support::error::Error;

const MAX_CMDLINE: usize = 65536;

lazy_static! {
    static ref LITERAL_AT_EOL: Regex =
        Regex::new(r#"\{([0-9]+)\+?\}$"#).unwrap();
    static ref APPEND_START: Regex =
        Regex::new(r#"^[^ ]+ (?i:APPEND) "#).unwrap();
}

/// Replaces the transport with a TLS one after `STARTTLS`.
pub trait TlsUpgrade: Send {
    /// Perform the server side of the handshake over the underlying
    /// connection and return the new reader and writer.
    fn upgrade(
        self: Box<Self>,
    ) -> Result<(Box<dyn BufRead + Send>, Box<dyn Write + Send>), Error>;
}

pub struct Server {
    read: Box<dyn BufRead + Send>,
    write: SharedWriter,
    processor: CommandProcessor,
    starttls: Option<Box<dyn TlsUpgrade>>,
    sent_bye: bool,
}

impl Server {
    pub fn new<R: BufRead + Send + 'static, W: Write + Send + 'static>(
        read: R,
        write: W,
        processor: CommandProcessor,
    ) -> Self {
        // Notifications from other sessions go through the same stream, so
        // the processor's output is the one true writer.
        let shared = Arc::clone(processor.output());
        *shared.stream() = Box::new(write);

        Server {
            read: Box::new(read),
            write: shared,
            processor,
            starttls: None,
            sent_bye: false,
        }
    }

    /// Offer `STARTTLS`, using `upgrade` to switch the transport.
    pub fn with_starttls(mut self, upgrade: Box<dyn TlsUpgrade>) -> Self {
        self.processor.offer_starttls();
        self.starttls = Some(upgrade);
        self
    }

    /// Run the server.
    ///
    /// Blocks until an error occurs, the client logs out, or a BYE response
    /// has been sent.
    pub fn run(&mut self) -> Result<(), Error> {
        self.send_response(self.processor.greeting())?;

        let mut cmdline = Vec::<u8>::new();
        // Bytes of `cmdline` which came from literals and so don't count
        // against the line length limit.
        let mut literal_bytes = 0usize;

        while !self.sent_bye && !self.processor.logged_out() {
            let nread =
                self.buffer_next_line(&mut cmdline, true, literal_bytes)?;
            let nread = match nread {
                Some(n) => n,
                None => {
                    literal_bytes = 0;
                    continue;
                }
            };

            if let Some((length, literal_plus)) =
                self.check_literal(&cmdline, nread)
            {
                let append = APPEND_START.is_match(&cmdline);
                if append && (0 == length || length > APPEND_SIZE_LIMIT) {
                    self.reject_append(&mut cmdline, length, literal_plus)?;
                    literal_bytes = 0;
                    continue;
                }

                cmdline.extend_from_slice(b"\r\n");
                if !append && length + cmdline.len() > MAX_CMDLINE {
                    self.command_line_too_long(
                        &mut cmdline,
                        true,
                        true,
                        Some((length, literal_plus)),
                    )?;
                    literal_bytes = 0;
                    continue;
                }

                self.accept_literal(literal_plus)?;
                let nread = self
                    .read
                    .by_ref()
                    .take(length as u64)
                    .read_to_end(&mut cmdline)?;
                if nread != length {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "EOF reading literal",
                    )));
                }
                literal_bytes += length;
            } else {
                // No ending literal; this should be a complete command
                self.handle_complete_command(&cmdline)?;
                cmdline.clear();
                literal_bytes = 0;
            }
        }

        Ok(())
    }

    fn handle_complete_command(
        &mut self,
        cmdline: &[u8],
    ) -> Result<(), Error> {
        if let Ok((b"", command)) = s::CommandLine::parse(cmdline) {
            if "IDLE" == command.verb && command.args.is_empty() {
                let tag = command.tag.to_owned();
                return self.handle_idle(&tag);
            }

            let response = self
                .processor
                .handle_command(command, &response_sender(&self.write));
            self.send_response(response)?;

            if self.processor.take_starttls_request() {
                self.start_tls()?;
            }
        } else if let Ok((_, frag)) = s::UnknownCommandFragment::parse(cmdline)
        {
            self.send_response(r::ResponseLine {
                tag: Some(Cow::Borrowed(frag.tag)),
                response: r::Response::Cond(r::CondResponse {
                    cond: r::RespCondType::Bad,
                    code: Some(r::RespTextCode::Parse),
                    quip: Cow::Borrowed("Unrecognised command syntax"),
                }),
            })?;
        } else {
            self.send_response(r::ResponseLine {
                tag: None,
                response: r::Response::Cond(r::CondResponse {
                    cond: r::RespCondType::Bye,
                    code: Some(r::RespTextCode::Parse),
                    quip: Cow::Borrowed(
                        "That doesn't look anything like an IMAP command!",
                    ),
                }),
            })?;
        }

        Ok(())
    }

    /// Read the next line, appending it to `cmdline`.
    ///
    /// Returns the number of bytes added to `cmdline`.
    ///
    /// Both DOS newlines and bare LF are accepted. The line ending is removed
    /// from the buffer.
    ///
    /// If EOF is reached before the full line is read, returns an
    /// `UnexpectedEof` IO error.
    ///
    /// If the maximum command line length is exceeded, sends an appropriate
    /// response to the client, swallows the whole command, and returns
    /// `None` successfully with `cmdline` clear.
    fn buffer_next_line(
        &mut self,
        cmdline: &mut Vec<u8>,
        initial: bool,
        literal_bytes: usize,
    ) -> Result<Option<usize>, Error> {
        let mut nread = self
            .read
            .by_ref()
            .take(MAX_CMDLINE as u64)
            .read_until(b'\n', cmdline)?;

        if 0 == nread {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "EOF reached before reading full line",
            )));
        }

        if cmdline.len() - literal_bytes > MAX_CMDLINE
            || !cmdline.ends_with(b"\n")
        {
            self.command_line_too_long(cmdline, false, initial, None)?;
            return Ok(None);
        }

        cmdline.pop();
        nread -= 1;
        if cmdline.ends_with(b"\r") {
            cmdline.pop();
            nread -= 1;
        }

        Ok(Some(nread))
    }

    /// Check whether the current command line ends with a literal, returning
    /// its length and whether it is non-synchronising.
    ///
    /// Only the last `nread` bytes of the command line are checked, so that
    /// this can consider only things added by the last read operation.
    fn check_literal(
        &self,
        cmdline: &[u8],
        nread: usize,
    ) -> Option<(usize, bool)> {
        let captures =
            LITERAL_AT_EOL.captures(&cmdline[cmdline.len() - nread..])?;
        let whole = captures.get(0)?;
        let length = str::from_utf8(captures.get(1)?.as_bytes())
            .ok()?
            .parse::<usize>()
            .ok()?;
        Some((length, whole.as_bytes().contains(&b'+')))
    }

    /// Send the appropriate continuation for a literal.
    fn accept_literal(&self, literal_plus: bool) -> Result<(), Error> {
        if !literal_plus {
            self.write.queue_raw(b"+ go\r\n");
            self.write.flush()?;
        }

        Ok(())
    }

    /// Handle command rejection due to the command line limit being exceeded.
    ///
    /// `recoverable` indicates whether it is expected that this condition can
    /// be repaired by following the basic lexical syntax until the end of the
    /// command is reached. This must be `false` if `cmdline` could potentially
    /// contain a partial literal.
    ///
    /// `initial` indicates whether `cmdline` is expected to contain a tag.
    ///
    /// `literal_info` gives details about a literal, if any, which is
    /// currently initiated at the end of `cmdline`.
    fn command_line_too_long(
        &mut self,
        cmdline: &mut Vec<u8>,
        recoverable: bool,
        initial: bool,
        literal_info: Option<(usize, bool)>,
    ) -> Result<(), Error> {
        let tag = s::UnknownCommandFragment::parse(cmdline)
            .ok()
            .map(|(_, frag)| frag.tag.to_owned());

        if let (true, Some(tag)) = (initial, tag) {
            self.send_response(r::ResponseLine {
                // The RFC 3501 grammar doesn't allow tagged BYE, so if we're
                // going to send BYE, we need to ensure it is untagged.
                tag: if recoverable { Some(Cow::Owned(tag)) } else { None },
                response: r::Response::Cond(r::CondResponse {
                    cond: if recoverable {
                        r::RespCondType::No
                    } else {
                        r::RespCondType::Bye
                    },
                    code: None,
                    quip: Cow::Borrowed("Command line too long"),
                }),
            })?;
            self.discard_command(cmdline, literal_info)?;
        } else {
            self.send_response(r::ResponseLine {
                tag: None,
                response: r::Response::Cond(r::CondResponse {
                    cond: r::RespCondType::Bye,
                    code: None,
                    quip: Cow::Borrowed(if initial {
                        "That doesn't look anything like an IMAP command!"
                    } else {
                        "Command line continuation too long"
                    }),
                }),
            })?;
            cmdline.clear();
        }

        Ok(())
    }

    /// Discard data from the read stream until an error occurs, a BYE response
    /// is sent, or the end of the command is reached.
    ///
    /// This assumes that the current `cmdline` is incomplete, i.e., the caller
    /// knows there is at least one more line belonging to the command.
    ///
    /// `literal_info` gives details on any unconsumed literal currently at the
    /// end of `cmdline`.
    fn discard_command(
        &mut self,
        cmdline: &mut Vec<u8>,
        mut literal_info: Option<(usize, bool)>,
    ) -> Result<(), Error> {
        while !self.sent_bye {
            if let Some((len, literal_plus)) = literal_info.take() {
                // Without LITERAL+, the response we already sent back to the
                // client aborts the literal, so we are consistent here.
                if !literal_plus {
                    break;
                }

                io::copy(
                    &mut self.read.by_ref().take(len as u64),
                    &mut io::sink(),
                )?;
            }

            cmdline.clear();
            let nread = match self.buffer_next_line(cmdline, false, 0)? {
                Some(n) => n,
                None => break,
            };

            match self.check_literal(cmdline, nread) {
                Some(literal) => literal_info = Some(literal),
                // Reached end of line without literal; command is done
                None => break,
            }
        }

        cmdline.clear();
        Ok(())
    }

    fn reject_append(
        &mut self,
        cmdline: &mut Vec<u8>,
        length: usize,
        literal_plus: bool,
    ) -> Result<(), Error> {
        let tag = s::UnknownCommandFragment::parse(cmdline)
            .ok()
            .map(|(_, frag)| frag.tag.to_owned());
        self.send_response(r::ResponseLine {
            tag: tag.map(Cow::Owned),
            response: r::Response::Cond(r::CondResponse {
                cond: r::RespCondType::Bad,
                code: if 0 == length {
                    None
                } else {
                    Some(r::RespTextCode::Limit)
                },
                quip: Cow::Borrowed(if 0 == length {
                    "APPEND aborted by 0-size literal"
                } else {
                    "APPEND size limit exceeded"
                }),
            }),
        })?;
        self.discard_command(cmdline, Some((length, literal_plus)))
    }

    /// Handle the full IDLE flow.
    ///
    /// Notifications reach the client from the threads that cause them while
    /// this waits for `DONE`.
    fn handle_idle(&mut self, tag: &str) -> Result<(), Error> {
        if let Some(response) = self.processor.idle_start(tag) {
            return self.send_response(response);
        }

        self.write.queue_raw(b"+ idling\r\n");
        self.write.flush()?;

        let mut buffer = Vec::new();
        let nread = self
            .read
            .by_ref()
            .take(MAX_CMDLINE as u64)
            .read_until(b'\n', &mut buffer)?;

        if 0 == nread {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "EOF during IDLE",
            )));
        }

        if !buffer.ends_with(b"\n") {
            return self.send_response(r::ResponseLine {
                tag: None,
                response: r::Response::Cond(r::CondResponse {
                    cond: r::RespCondType::Bye,
                    code: None,
                    quip: Cow::Borrowed("IDLE terminator too long"),
                }),
            });
        }

        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }

        let response = self.processor.idle_done(tag, &buffer);
        self.send_response(response)
    }

    /// Switch the transport to TLS after the tagged OK to `STARTTLS` has
    /// been sent.
    fn start_tls(&mut self) -> Result<(), Error> {
        let upgrade = match self.starttls.take() {
            Some(upgrade) => upgrade,
            None => return Ok(()),
        };

        // Hold the output lock so nothing can be written in cleartext
        // between the OK and the handshake.
        let mut write = self.write.stream();
        let (read, new_write) = upgrade.upgrade().map_err(|e| {
            warn!(
                "{} TLS handshake failed: {}",
                self.processor.log_prefix(),
                e
            );
            e
        })?;
        self.read = read;
        *write = new_write;
        drop(write);

        self.processor.tls_established();
        info!("{} TLS established", self.processor.log_prefix());
        Ok(())
    }

    fn send_response(
        &mut self,
        response: r::ResponseLine<'_>,
    ) -> Result<(), Error> {
        self.sent_bye |= matches!(
            response,
            r::ResponseLine {
                response: r::Response::Cond(r::CondResponse {
                    cond: r::RespCondType::Bye,
                    ..
                }),
                ..
            }
        );

        self.write.queue(&response);
        self.write.flush()?;
        Ok(())
    }
}

fn response_sender(
    w: &SharedWriter,
) -> impl Fn(r::Response<'_>) + Send + Sync + '_ {
    move |response| {
        w.queue(&r::ResponseLine {
            tag: None,
            response,
        })
    }
}
