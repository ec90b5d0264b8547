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

fn set_up_mailbox(client: &mut PipeClient) {
    quick_log_in(client);
    quick_create(client, "Cs");
    for i in 0..3 {
        quick_append(client, "Cs", &simple_message(&i.to_string()));
    }
    quick_select(client, "Cs");
    let lines = client.command("UNSELECT").unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn condstore_flow() {
    let setup = set_up();
    let mut client = setup.connect("cscf");
    set_up_mailbox(&mut client);

    let lines = client.command("SELECT Cs (CONDSTORE)").unwrap();
    has_line_like(&lines, r"^\* OK \[HIGHESTMODSEQ 3\] ");

    let lines = client.command("STORE 1 +FLAGS (\\Seen)").unwrap();
    assert_eq!(
        vec!["* 1 FETCH (UID 1 FLAGS (\\Seen) MODSEQ (4))"],
        untagged(&lines)
    );

    let lines = client
        .command("FETCH 1:* (FLAGS) (CHANGEDSINCE 3)")
        .unwrap();
    assert_eq!(
        vec!["* 1 FETCH (FLAGS (\\Seen) MODSEQ (4))"],
        untagged(&lines)
    );

    let lines = client
        .command("STORE 1:2 (UNCHANGEDSINCE 3) +FLAGS (\\Flagged)")
        .unwrap();
    assert_eq!(
        vec!["* 2 FETCH (UID 2 FLAGS (\\Flagged) MODSEQ (5))"],
        untagged(&lines)
    );
    assert_line_like(tagged(&lines), r"^[0-9]+ OK \[MODIFIED 1\] ");

    let lines = client
        .command("STORE 3 +FLAGS.SILENT (\\Draft)")
        .unwrap();
    assert_eq!(vec!["* 3 FETCH (UID 3 MODSEQ (6))"], untagged(&lines));

    assert_eq!(
        "* SEARCH 2 3 (MODSEQ 6)",
        client.command("SEARCH MODSEQ 5").unwrap()[0]
    );
    assert_eq!("* SEARCH", client.command("SEARCH MODSEQ 100").unwrap()[0]);
    // Without a MODSEQ criterion, no MODSEQ in the result
    assert_eq!("* SEARCH 1 2 3", client.command("SEARCH ALL").unwrap()[0]);

    let lines = client.command("STATUS Cs (HIGHESTMODSEQ)").unwrap();
    assert_eq!("* STATUS Cs (HIGHESTMODSEQ 6)", lines[0]);

    let lines = client
        .command("STORE 3 +FLAGS.SILENT (\\Deleted)")
        .unwrap();
    assert_tagged_ok(&lines);
    let lines = client.command("EXPUNGE").unwrap();
    assert_eq!(vec!["* 3 EXPUNGE"], untagged(&lines));
    assert_line_like(tagged(&lines), r"^[0-9]+ OK \[HIGHESTMODSEQ [0-9]+\] ");
}

#[test]
fn uid_store_unchanged_since() {
    let setup = set_up();
    let mut client = setup.connect("csus");
    set_up_mailbox(&mut client);
    quick_select(&mut client, "Cs");

    let lines = client.command("STORE 2 +FLAGS.SILENT (\\Seen)").unwrap();
    assert_tagged_ok(&lines);

    let lines = client
        .command("UID STORE 1:3 (UNCHANGEDSINCE 2) FLAGS (\\Answered)")
        .unwrap();
    assert_line_like(tagged(&lines), r"^[0-9]+ OK \[MODIFIED 2:3\] ");
    assert_eq!(
        vec!["* 1 FETCH (UID 1 FLAGS (\\Answered) MODSEQ (5))"],
        untagged(&lines)
    );
}

#[test]
fn modseq_fetch_enables_condstore() {
    let setup = set_up();
    let mut client = setup.connect("csmf");
    set_up_mailbox(&mut client);
    quick_select(&mut client, "Cs");

    let lines = client.command("FETCH 1 FLAGS").unwrap();
    assert_eq!("* 1 FETCH (FLAGS ())", lines[0]);

    let lines = client.command("FETCH 1 MODSEQ").unwrap();
    assert_eq!("* 1 FETCH (MODSEQ (1))", lines[0]);

    let lines = client.command("FETCH 1 FLAGS").unwrap();
    assert_eq!("* 1 FETCH (FLAGS () MODSEQ (1))", lines[0]);
}

#[test]
fn condstore_notifications_carry_modseq() {
    let setup = set_up();
    let mut client1 = setup.connect("csnm1");
    set_up_mailbox(&mut client1);
    let mut client2 = setup.connect("csnm2");
    quick_log_in(&mut client2);

    quick_select(&mut client1, "Cs");
    let lines = client2.command("SELECT Cs (CONDSTORE)").unwrap();
    assert_tagged_ok(&lines);

    let lines = client1.command("STORE 2 +FLAGS.SILENT ($Done)").unwrap();
    assert_tagged_ok(&lines);

    let lines = client2.command("NOOP").unwrap();
    assert_eq!(
        vec!["* 2 FETCH (UID 2 FLAGS ($Done) MODSEQ (4))"],
        untagged(&lines)
    );
}
