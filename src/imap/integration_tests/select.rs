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
fn select_basic() {
    let setup = set_up();
    let mut client = setup.connect("sesb");
    quick_log_in(&mut client);

    quick_append(&mut client, "INBOX", &simple_message("one"));
    let lines = append(&mut client, "INBOX", "(\\Seen $Work)", "two\r\n");
    assert_tagged_ok(&lines);
    quick_append(&mut client, "INBOX", &simple_message("three"));

    let lines = client.command("SELECT INBOX").unwrap();
    assert_eq!(9, lines.len());
    assert_eq!(
        "* FLAGS (\\Answered \\Deleted \\Draft \\Flagged \\Seen $Work)",
        lines[0]
    );
    assert_eq!("* 3 EXISTS", lines[1]);
    assert_eq!("* 3 RECENT", lines[2]);
    assert_line_like(&lines[3], r"^\* OK \[UNSEEN 1\] ");
    assert_line_like(
        &lines[4],
        concat!(
            r"^\* OK \[PERMANENTFLAGS \(\\Answered \\Deleted \\Draft ",
            r"\\Flagged \\Seen \\\*\)\] ",
        ),
    );
    assert_line_like(&lines[5], r"^\* OK \[UIDNEXT 4\] ");
    assert_line_like(&lines[6], r"^\* OK \[UIDVALIDITY [0-9]+\] ");
    assert_line_like(&lines[7], r"^\* OK \[HIGHESTMODSEQ [0-9]+\] ");
    assert_line_like(&lines[8], r"^[0-9]+ OK \[READ-WRITE\] ");
}

#[test]
fn select_empty() {
    let setup = set_up();
    let mut client = setup.connect("sese");
    quick_log_in(&mut client);

    let lines = quick_select(&mut client, "Drafts");
    has_line_like(&lines, r"^\* 0 EXISTS$");
    has_line_like(&lines, r"^\* 0 RECENT$");
    has_line_like(&lines, r"^\* OK \[UIDNEXT 1\] ");
    has_line_like(&lines, r"^\* OK \[HIGHESTMODSEQ 1\] ");
    has_no_line_like(&lines, "UNSEEN");
}

#[test]
fn examine_is_read_only() {
    let setup = set_up();
    let mut client = setup.connect("seer");
    quick_log_in(&mut client);
    quick_append(&mut client, "INBOX", &simple_message("one"));

    let lines = client.command("EXAMINE INBOX").unwrap();
    has_line_like(&lines, r"^\* OK \[PERMANENTFLAGS \(\)\] ");
    assert_line_like(tagged(&lines), r"^[0-9]+ OK \[READ-ONLY\] ");

    let lines = client.command("STORE 1 +FLAGS (\\Seen)").unwrap();
    assert_tagged_no(&lines);
    let lines = client.command("EXPUNGE").unwrap();
    assert_line_like(tagged(&lines), r"^[0-9]+ NO \[CANNOT\] ");

    // Fetching the body doesn't set \Seen either
    let lines = client.command("FETCH 1 (BODY[] FLAGS)").unwrap();
    has_no_line_like(&lines, r"\\Seen");
    assert_tagged_ok(&lines);
}

#[test]
fn recent_is_claimed_once() {
    let setup = set_up();
    let mut client1 = setup.connect("serc1");
    quick_log_in(&mut client1);
    let mut client2 = setup.connect("serc2");
    quick_log_in(&mut client2);

    quick_append(&mut client1, "INBOX", &simple_message("one"));

    let lines = client2.command("EXAMINE INBOX").unwrap();
    has_line_like(&lines, r"^\* 1 RECENT$");
    let lines = client2.command("STATUS INBOX (RECENT)").unwrap();
    assert_eq!("* STATUS INBOX (RECENT 1)", lines[0]);

    let lines = quick_select(&mut client1, "INBOX");
    has_line_like(&lines, r"^\* 1 RECENT$");
    let lines = client1.command("FETCH 1 FLAGS").unwrap();
    assert_eq!("* 1 FETCH (FLAGS (\\Recent))", lines[0]);

    let lines = client2.command("SELECT INBOX").unwrap();
    has_line_like(&lines, r"^\* 0 RECENT$");
    let lines = client2.command("FETCH 1 FLAGS").unwrap();
    assert_eq!("* 1 FETCH (FLAGS ())", lines[0]);
}

#[test]
fn select_nonexistent() {
    let setup = set_up();
    let mut client = setup.connect("sesn");
    quick_log_in(&mut client);
    quick_select(&mut client, "INBOX");

    let lines = client.command("SELECT Nowhere").unwrap();
    assert_eq!(1, lines.len());
    assert_line_like(&lines[0], r"^[0-9]+ NO \[TRYCREATE\] ");

    // The failed SELECT dropped the previous selection
    let lines = client.command("FETCH 1 FLAGS").unwrap();
    assert_tagged_no(&lines);
}

#[test]
fn select_bad_parameters() {
    let setup = set_up();
    let mut client = setup.connect("sebp");
    quick_log_in(&mut client);

    let lines = client.command("SELECT INBOX (QRESYNC)").unwrap();
    assert_tagged_bad(&lines);
    let lines = client.command("SELECT INBOX (CONDSTORE)").unwrap();
    assert_tagged_ok(&lines);
}

#[test]
fn close_expunges_silently() {
    let setup = set_up();
    let mut client = setup.connect("secl");
    quick_log_in(&mut client);
    quick_create(&mut client, "Scratch");
    quick_append(&mut client, "Scratch", &simple_message("one"));
    quick_append(&mut client, "Scratch", &simple_message("two"));

    quick_select(&mut client, "Scratch");
    let lines = client.command("STORE 1 +FLAGS.SILENT (\\Deleted)").unwrap();
    assert_eq!(1, lines.len());

    let lines = client.command("CLOSE").unwrap();
    assert_eq!(1, lines.len());
    assert_tagged_ok(&lines);

    let lines = client.command("FETCH 1 FLAGS").unwrap();
    assert_tagged_no(&lines);

    let lines = client.command("STATUS Scratch (MESSAGES)").unwrap();
    assert_eq!("* STATUS Scratch (MESSAGES 1)", lines[0]);
}

#[test]
fn close_after_examine_keeps_messages() {
    let setup = set_up();
    let mut client = setup.connect("secx");
    quick_log_in(&mut client);
    quick_create(&mut client, "Scratch");
    append(&mut client, "Scratch", "(\\Deleted)", "x\r\n");

    let lines = client.command("EXAMINE Scratch").unwrap();
    assert_tagged_ok(&lines);
    let lines = client.command("CLOSE").unwrap();
    assert_tagged_ok(&lines);

    let lines = client.command("STATUS Scratch (MESSAGES)").unwrap();
    assert_eq!("* STATUS Scratch (MESSAGES 1)", lines[0]);
}

#[test]
fn unselect_keeps_messages() {
    let setup = set_up();
    let mut client = setup.connect("seun");
    quick_log_in(&mut client);
    quick_create(&mut client, "Scratch");
    append(&mut client, "Scratch", "(\\Deleted)", "x\r\n");

    quick_select(&mut client, "Scratch");
    let lines = client.command("UNSELECT").unwrap();
    assert_tagged_ok(&lines);

    let lines = client.command("STATUS Scratch (MESSAGES)").unwrap();
    assert_eq!("* STATUS Scratch (MESSAGES 1)", lines[0]);

    let lines = client.command("UNSELECT").unwrap();
    assert_tagged_no(&lines);
}
