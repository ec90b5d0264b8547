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
fn greeting_and_capability() {
    let setup = set_up();
    let mut client = setup.connect("auca");
    receive_line_like(
        &mut client,
        r"^\* OK \[CAPABILITY IMAP4rev1 .*IDLE.*\] mailcore [^ ]+ ready$",
    );

    let lines = client.command("CAPABILITY").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(
        &lines[0],
        r"^\* CAPABILITY IMAP4rev1 CHILDREN CONDSTORE ENABLE IDLE LITERAL\+ ",
    );
    has_no_line_like(&lines, "STARTTLS|LOGINDISABLED");
    assert_tagged_ok(&lines);
}

#[test]
fn login_basic() {
    let setup = set_up();
    let mut client = setup.connect("aulb");
    skip_greeting(&mut client);

    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(&lines[0], r"^\* CAPABILITY IMAP4rev1 ");
    assert_line_like(&lines[1], r"^0 OK User login successful$");

    // The account is provisioned with the default mailboxes
    let lines = client.command("LIST \"\" *").unwrap();
    has_line_like(&lines, r#"^\* LIST \(\\Inbox \\HasNoChildren\) "/" INBOX$"#);
    has_line_like(&lines, r#"^\* LIST \(\\Sent \\HasNoChildren\) "/" Sent$"#);
    has_line_like(&lines, r#"^\* LIST \(\\Trash \\HasNoChildren\) "/" Trash$"#);
    assert_tagged_ok(&lines);
}

#[test]
fn login_quoted_and_literal() {
    let setup = set_up();
    let mut client = setup.connect("aulq");
    skip_greeting(&mut client);

    let lines = client
        .command_raw(b"LOGIN \"azure\" {7+}\r\nhunter2")
        .unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn login_invalid() {
    let setup = set_up();
    let mut client = setup.connect("auli");
    skip_greeting(&mut client);

    let lines = client.command("LOGIN azure letmein").unwrap();
    assert_eq!(1, lines.len());
    assert_line_like(&lines[0], r"^0 NO \[AUTHENTICATIONFAILED\] ");

    let lines = client.command("LOGIN root hunter2").unwrap();
    assert_line_like(&lines[0], r"^1 NO \[AUTHENTICATIONFAILED\] ");

    // Credentials of another user don't mix
    let lines = client.command("LOGIN azure hunter3").unwrap();
    assert_tagged_no(&lines);

    let lines = client.command("LOGIN cobalt hunter3").unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn commands_in_wrong_state() {
    let setup = set_up();
    let mut client = setup.connect("aucw");
    skip_greeting(&mut client);

    let lines = client.command("SELECT INBOX").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(&lines[0], r"^\* BAD ");
    assert_tagged_no(&lines);

    let lines = client.command("CREATE foo").unwrap();
    assert_tagged_no(&lines);

    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_tagged_ok(&lines);

    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_line_like(&lines[0], r"^\* BAD ");
    assert_tagged_no(&lines);

    let lines = client.command("FETCH 1 FLAGS").unwrap();
    assert_line_like(&lines[0], r"^\* BAD ");
    assert_tagged_no(&lines);

    let lines = client.command("CLOSE").unwrap();
    assert_tagged_no(&lines);
}

#[test]
fn noop_and_check() {
    let setup = set_up();
    let mut client = setup.connect("aunc");
    skip_greeting(&mut client);

    let lines = client.command("NOOP").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_ok(&lines);

    quick_log_in_again(&mut client);
    quick_select(&mut client, "INBOX");

    let lines = client.command("CHECK").unwrap();
    assert_tagged_ok(&lines);
}

fn quick_log_in_again(client: &mut PipeClient) {
    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn logout() {
    let setup = set_up();
    let mut client = setup.connect("aulo");
    quick_log_in(&mut client);

    let lines = client.command("LOGOUT").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(&lines[0], r"^\* BYE ");
    assert_line_like(&lines[1], r"^1 OK LOGOUT completed$");

    // The server hangs up afterwards
    assert!(client.read_line().is_err());
}

#[test]
fn logout_before_login() {
    let setup = set_up();
    let mut client = setup.connect("aulb");
    skip_greeting(&mut client);

    let lines = client.command("LOGOUT").unwrap();
    assert_line_like(&lines[0], r"^\* BYE ");
    assert_tagged_ok(&lines);
}

#[test]
fn login_requires_privacy() {
    let setup = set_up_strict();
    let mut client = setup.connect("aupr");
    receive_line_like(
        &mut client,
        r"^\* OK \[CAPABILITY IMAP4rev1 LOGINDISABLED ",
    );

    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(&lines[0], r"^\* BAD ");
    assert_line_like(tagged(&lines), r"^0 NO \[PRIVACYREQUIRED\] ");

    // Still unauthenticated
    let lines = client.command("SELECT INBOX").unwrap();
    assert_line_like(tagged(&lines), r"^1 NO Not logged in");
}

#[test]
fn starttls() {
    let setup = set_up_strict();
    let mut client = setup.connect_starttls("aust");
    receive_line_like(
        &mut client,
        r"^\* OK \[CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED ",
    );

    let lines = client.command("STARTTLS").unwrap();
    assert_eq!(1, lines.len());
    assert_line_like(&lines[0], r"^0 OK Begin TLS negotiation now$");

    let lines = client.command("CAPABILITY").unwrap();
    assert_line_like(&lines[0], r"^\* CAPABILITY IMAP4rev1 ");
    has_no_line_like(&lines, "STARTTLS|LOGINDISABLED");

    let lines = client.command("LOGIN azure hunter2").unwrap();
    assert_tagged_ok(&lines);

    let lines = client.command("STARTTLS").unwrap();
    assert_tagged_no(&lines);
}

#[test]
fn starttls_not_offered() {
    let setup = set_up();
    let mut client = setup.connect("austno");
    skip_greeting(&mut client);

    let lines = client.command("STARTTLS").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(&lines[0], r"^\* BAD ");
    assert_tagged_no(&lines);
}

#[test]
fn enable_condstore() {
    let setup = set_up();
    let mut client = setup.connect("auen");
    quick_log_in(&mut client);

    let lines = client.command("ENABLE CONDSTORE X-UNKNOWN").unwrap();
    assert_eq!(2, lines.len());
    assert_line_like(&lines[0], r"^\* ENABLED CONDSTORE$");
    assert_tagged_ok(&lines);
}
