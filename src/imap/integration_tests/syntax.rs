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
fn unknown_and_malformed_commands() {
    let setup = set_up();
    let mut client = setup.connect("syum");
    quick_log_in(&mut client);

    let lines = client.command("FROBNICATE").unwrap();
    assert_eq!(1, lines.len());
    assert_line_like(&lines[0], r"^[0-9]+ BAD \[PARSE\] ");

    let lines = client.command("CREATE").unwrap();
    assert_line_like(&lines[0], r"^[0-9]+ BAD \[PARSE\] ");

    let lines = client.command("NOOP extra").unwrap();
    assert_line_like(&lines[0], r"^[0-9]+ BAD \[PARSE\] ");

    let lines = client.command("CREATE (unbalanced").unwrap();
    assert_line_like(&lines[0], r"^[0-9]+ BAD \[PARSE\] ");

    // Still in sync afterwards
    let lines = client.command("NOOP").unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn verbs_are_case_insensitive() {
    let setup = set_up();
    let mut client = setup.connect("syci");
    quick_log_in(&mut client);
    quick_append(&mut client, "INBOX", &simple_message("one"));

    let lines = client.command("select inbox").unwrap();
    assert_tagged_ok(&lines);
    let lines = client.command("uid fetch 1 (uid flags)").unwrap();
    assert_eq!("* 1 FETCH (UID 1 FLAGS (\\Recent))", lines[0]);
}

#[test]
fn quoted_and_literal_mailbox_names() {
    let setup = set_up();
    let mut client = setup.connect("syqn");
    quick_log_in(&mut client);

    quick_create(&mut client, "\"Two Words\"");
    let lines = client.command_raw(b"CREATE {9+}\r\nHalf Full").unwrap();
    assert_tagged_ok(&lines);

    let lines = client.command("LIST \"\" \"*o*\"").unwrap();
    has_line_like(&lines, r#"^\* LIST \(\\HasNoChildren\) "/" "Two Words"$"#);
    has_no_line_like(&lines, "Half Full");
    let lines = client.command("LIST \"\" \"*u*\"").unwrap();
    has_line_like(&lines, r#"^\* LIST \(\\HasNoChildren\) "/" "Half Full"$"#);
}

#[test]
fn garbage_gets_bye() {
    let setup = set_up();
    let mut client = setup.connect("sygb");
    skip_greeting(&mut client);

    client.write_raw(b"((( \r\n").unwrap();
    receive_line_like(&mut client, r"^\* BYE ");
    assert!(client.read_line().is_err());
}

#[test]
fn overlong_line_gets_bye() {
    let setup = set_up();
    let mut client = setup.connect("syol");
    skip_greeting(&mut client);

    let mut line = b"a NOOP ".to_vec();
    line.resize(70_000, b'x');
    line.extend_from_slice(b"\r\n");
    // The server may hang up before it has read everything
    let _ = client.write_raw(&line);
    receive_line_like(&mut client, r"^\* BYE Command line too long$");
}

#[test]
fn overlong_literal_is_refused() {
    let setup = set_up();
    let mut client = setup.connect("syolit");
    skip_greeting(&mut client);

    let tag = client.next_tag();
    client
        .write_raw(format!("{} LOGIN azure {{70000}}\r\n", tag).as_bytes())
        .unwrap();
    let lines = client.read_until_tagged(&tag).unwrap();
    assert_eq!(1, lines.len());
    assert_line_like(&lines[0], r"^[0-9]+ NO Command line too long$");

    // The literal was never sent, so the connection is still in sync
    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn oversized_append_is_refused() {
    let setup = set_up();
    let mut client = setup.connect("syoa");
    quick_log_in(&mut client);

    let tag = client.next_tag();
    client
        .write_raw(
            format!("{} APPEND INBOX {{999999999}}\r\n", tag).as_bytes(),
        )
        .unwrap();
    let lines = client.read_until_tagged(&tag).unwrap();
    assert_line_like(&lines[0], r"^[0-9]+ BAD \[LIMIT\] ");

    let lines = client.command("STATUS INBOX (MESSAGES)").unwrap();
    assert_eq!("* STATUS INBOX (MESSAGES 0)", lines[0]);
}

#[test]
fn multiple_literals_in_one_command() {
    let setup = set_up();
    let mut client = setup.connect("syml");
    skip_greeting(&mut client);

    let tag = client.next_tag();
    client
        .write_raw(format!("{} LOGIN {{5}}\r\n", tag).as_bytes())
        .unwrap();
    receive_line_like(&mut client, r"^\+ go$");
    client.write_raw(b"azure {7}\r\n").unwrap();
    receive_line_like(&mut client, r"^\+ go$");
    client.write_raw(b"hunter2\r\n").unwrap();
    let lines = client.read_until_tagged(&tag).unwrap();
    assert_tagged_ok(&lines);
}
