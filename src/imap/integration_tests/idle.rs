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

use super::defs::*;

#[test]
fn idle_receives_changes() {
    let setup = set_up();
    let mut idler = setup.connect("idrc1");
    quick_log_in(&mut idler);
    quick_select(&mut idler, "INBOX");
    let mut other = setup.connect("idrc2");
    quick_log_in(&mut other);

    let tag = idler.next_tag();
    idler
        .write_raw(format!("{} IDLE\r\n", tag).as_bytes())
        .unwrap();
    receive_line_like(&mut idler, r"^\+ idling$");

    quick_append(&mut other, "INBOX", &simple_message("one"));
    receive_line_like(&mut idler, r"^\* 1 EXISTS$");

    quick_select(&mut other, "INBOX");
    let lines = other.command("STORE 1 +FLAGS.SILENT (\\Seen)").unwrap();
    assert_tagged_ok(&lines);
    receive_line_like(&mut idler, r"^\* 1 FETCH \(UID 1 FLAGS \(\\Seen\)\)$");

    let lines = other.command("STORE 1 +FLAGS.SILENT (\\Deleted)").unwrap();
    assert_tagged_ok(&lines);
    receive_line_like(&mut idler, r"^\* 1 FETCH \(UID 1 FLAGS ");
    let lines = other.command("EXPUNGE").unwrap();
    assert_tagged_ok(&lines);
    receive_line_like(&mut idler, r"^\* 1 EXPUNGE$");

    idler.write_raw(b"DONE\r\n").unwrap();
    let lines = idler.read_until_tagged(&tag).unwrap();
    assert_eq!(1, lines.len());
    assert_line_like(&lines[0], r"^[0-9]+ OK IDLE done$");

    // The session is still usable
    let lines = idler.command("NOOP").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_ok(&lines);
}

#[test]
fn idle_ignores_other_mailboxes() {
    let setup = set_up();
    let mut idler = setup.connect("idio1");
    quick_log_in(&mut idler);
    quick_select(&mut idler, "INBOX");
    let mut other = setup.connect("idio2");
    quick_log_in(&mut other);

    let tag = idler.next_tag();
    idler
        .write_raw(format!("{} IDLE\r\n", tag).as_bytes())
        .unwrap();
    receive_line_like(&mut idler, r"^\+ idling$");

    quick_append(&mut other, "Drafts", &simple_message("draft"));
    quick_append(&mut other, "INBOX", &simple_message("mail"));
    // Only the INBOX append shows up
    receive_line_like(&mut idler, r"^\* 1 EXISTS$");

    idler.write_raw(b"DONE\r\n").unwrap();
    let lines = idler.read_until_tagged(&tag).unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn idle_without_selection() {
    let setup = set_up();
    let mut idler = setup.connect("idws");
    quick_log_in(&mut idler);

    let tag = idler.next_tag();
    idler
        .write_raw(format!("{} IDLE\r\n", tag).as_bytes())
        .unwrap();
    receive_line_like(&mut idler, r"^\+ idling$");
    idler.write_raw(b"done\r\n").unwrap();
    let lines = idler.read_until_tagged(&tag).unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn idle_bad_terminator() {
    let setup = set_up();
    let mut idler = setup.connect("idbt");
    quick_log_in(&mut idler);

    let tag = idler.next_tag();
    idler
        .write_raw(format!("{} IDLE\r\n", tag).as_bytes())
        .unwrap();
    receive_line_like(&mut idler, r"^\+ idling$");
    idler.write_raw(b"STOP\r\n").unwrap();
    let lines = idler.read_until_tagged(&tag).unwrap();
    assert_line_like(&lines[0], r"^[0-9]+ BAD \[PARSE\] ");
}

#[test]
fn idle_before_login() {
    let setup = set_up();
    let mut idler = setup.connect("idbl");
    skip_greeting(&mut idler);

    let lines = idler.command("IDLE").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_no(&lines);
}
