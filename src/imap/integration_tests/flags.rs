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

fn set_up_mailbox(client: &mut PipeClient, count: usize) {
    quick_log_in(client);
    quick_create(client, "Flags");
    for i in 0..count {
        quick_append(client, "Flags", &simple_message(&i.to_string()));
    }
    // Claim \Recent and give it up, so it stays out of the responses
    quick_select(client, "Flags");
    let lines = client.command("UNSELECT").unwrap();
    assert_tagged_ok(&lines);
    quick_select(client, "Flags");
}

#[test]
fn store_add_remove_replace() {
    let setup = set_up();
    let mut client = setup.connect("flar");
    set_up_mailbox(&mut client, 2);

    let lines = client.command("STORE 1 +FLAGS (\\Seen $Todo)").unwrap();
    assert_eq!(
        vec!["* 1 FETCH (UID 1 FLAGS (\\Seen $Todo))"],
        untagged(&lines)
    );
    assert_tagged_ok(&lines);

    let lines = client.command("STORE 1:2 +FLAGS \\Flagged").unwrap();
    assert_eq!(
        vec![
            "* 1 FETCH (UID 1 FLAGS (\\Seen $Todo \\Flagged))",
            "* 2 FETCH (UID 2 FLAGS (\\Flagged))",
        ],
        untagged(&lines)
    );

    let lines = client.command("STORE 1 -FLAGS ($Todo)").unwrap();
    assert_eq!(
        vec!["* 1 FETCH (UID 1 FLAGS (\\Seen \\Flagged))"],
        untagged(&lines)
    );

    let lines = client.command("STORE 2 FLAGS (\\Draft)").unwrap();
    assert_eq!(
        vec!["* 2 FETCH (UID 2 FLAGS (\\Draft))"],
        untagged(&lines)
    );

    let lines = client.command("FETCH 1:2 FLAGS").unwrap();
    assert_eq!(
        vec![
            "* 1 FETCH (FLAGS (\\Seen \\Flagged))",
            "* 2 FETCH (FLAGS (\\Draft))",
        ],
        untagged(&lines)
    );
}

#[test]
fn store_without_effect_is_quiet() {
    let setup = set_up();
    let mut client = setup.connect("flnx");
    set_up_mailbox(&mut client, 1);

    let lines = client.command("STORE 1 -FLAGS (\\Seen)").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_ok(&lines);
}

#[test]
fn store_silent() {
    let setup = set_up();
    let mut client = setup.connect("flsi");
    set_up_mailbox(&mut client, 1);

    let lines = client.command("STORE 1 +FLAGS.SILENT (\\Answered)").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_ok(&lines);

    let lines = client.command("FETCH 1 FLAGS").unwrap();
    assert_eq!("* 1 FETCH (FLAGS (\\Answered))", lines[0]);
}

#[test]
fn uid_store() {
    let setup = set_up();
    let mut client = setup.connect("flus");
    set_up_mailbox(&mut client, 3);

    let lines = client.command("UID STORE 2:* +FLAGS (\\Seen)").unwrap();
    assert_eq!(
        vec![
            "* 2 FETCH (UID 2 FLAGS (\\Seen))",
            "* 3 FETCH (UID 3 FLAGS (\\Seen))",
        ],
        untagged(&lines)
    );

    // Nonexistent UIDs are not an error
    let lines = client.command("UID STORE 99 +FLAGS (\\Seen)").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_ok(&lines);
}

#[test]
fn store_errors() {
    let setup = set_up();
    let mut client = setup.connect("fler");
    set_up_mailbox(&mut client, 1);

    let lines = client.command("STORE 2 +FLAGS (\\Seen)").unwrap();
    assert_line_like(tagged(&lines), r" BAD \[CLIENTBUG\] ");

    let lines = client.command("STORE 1 +FLAGS (\\Recent)").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("STORE 1 *FLAGS (\\Seen)").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("STORE 1 FLAGS.LOUD (\\Seen)").unwrap();
    assert_tagged_bad(&lines);
}

#[test]
fn keywords_show_in_flags_on_reselect() {
    let setup = set_up();
    let mut client = setup.connect("flkw");
    set_up_mailbox(&mut client, 1);

    let lines = client.command("STORE 1 +FLAGS.SILENT ($Important)").unwrap();
    assert_tagged_ok(&lines);

    let lines = quick_select(&mut client, "Flags");
    assert_eq!(
        "* FLAGS (\\Answered \\Deleted \\Draft \\Flagged \\Seen $Important)",
        lines[0]
    );
}
