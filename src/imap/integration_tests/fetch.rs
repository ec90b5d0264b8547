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

const HEADER: &str = "From: alice@example.com\r\n\
                      To: azure@example.com\r\n\
                      Subject: one\r\n\
                      \r\n";
const TEXT: &str = "Body of one\r\n";

fn set_up_inbox(client: &mut PipeClient) {
    quick_log_in(client);
    quick_append(client, "INBOX", &simple_message("one"));
    quick_append(client, "INBOX", &simple_message("two"));
    quick_select(client, "INBOX");
}

#[test]
fn fetch_whole_message() {
    let setup = set_up();
    let mut client = setup.connect("fewm");
    set_up_inbox(&mut client);

    let lines = client.command("FETCH 1 BODY.PEEK[]").unwrap();
    assert_eq!(
        format!(
            "* 1 FETCH (BODY[] {{{}}}\r\n{}{})",
            HEADER.len() + TEXT.len(),
            HEADER,
            TEXT
        ),
        lines[0]
    );
    assert_tagged_ok(&lines);

    let lines = client.command("FETCH 1 RFC822.SIZE").unwrap();
    assert_eq!(
        format!("* 1 FETCH (RFC822.SIZE {})", HEADER.len() + TEXT.len()),
        lines[0]
    );
}

#[test]
fn fetch_header_and_text() {
    let setup = set_up();
    let mut client = setup.connect("feht");
    set_up_inbox(&mut client);

    let lines = client
        .command("FETCH 1 (BODY.PEEK[HEADER] BODY.PEEK[TEXT])")
        .unwrap();
    assert_eq!(
        format!(
            "* 1 FETCH (BODY[HEADER] {{{}}}\r\n{} BODY[TEXT] {{{}}}\r\n{})",
            HEADER.len(),
            HEADER,
            TEXT.len(),
            TEXT
        ),
        lines[0]
    );

    let lines = client.command("FETCH 1 (RFC822.HEADER RFC822.TEXT)").unwrap();
    // Not a peek, so the new \Seen flag comes first
    assert_line_like(&lines[0], r"^\* 1 FETCH \(FLAGS \(\\Seen \\Recent\) ");
    assert_line_like(&lines[0], r" RFC822\.HEADER \{64\}\r\nFrom: ");
    assert_line_like(&lines[0], r"RFC822\.TEXT \{13\}\r\nBody of one\r\n");
}

#[test]
fn fetch_header_fields() {
    let setup = set_up();
    let mut client = setup.connect("fehf");
    set_up_inbox(&mut client);

    let lines = client
        .command("FETCH 2 BODY.PEEK[HEADER.FIELDS (Subject)]")
        .unwrap();
    assert_eq!(
        "* 2 FETCH (BODY[HEADER.FIELDS (Subject)] {16}\r\n\
         Subject: two\r\n\r\n)",
        lines[0]
    );

    let lines = client
        .command("FETCH 2 BODY.PEEK[HEADER.FIELDS.NOT (From To)]")
        .unwrap();
    assert_eq!(
        "* 2 FETCH (BODY[HEADER.FIELDS.NOT (From To)] {16}\r\n\
         Subject: two\r\n\r\n)",
        lines[0]
    );
}

#[test]
fn fetch_partial() {
    let setup = set_up();
    let mut client = setup.connect("fepa");
    set_up_inbox(&mut client);

    let lines = client.command("FETCH 1 BODY.PEEK[TEXT]<5.2>").unwrap();
    assert_eq!("* 1 FETCH (BODY[TEXT]<5> {2}\r\nof)", lines[0]);

    let lines = client.command("FETCH 1 BODY.PEEK[TEXT]<500.2>").unwrap();
    assert_eq!("* 1 FETCH (BODY[TEXT]<500> {0}\r\n)", lines[0]);

    let lines = client.command("FETCH 1 BODY.PEEK[TEXT]<5.0>").unwrap();
    assert_tagged_bad(&lines);
}

#[test]
fn fetch_body_sets_seen() {
    let setup = set_up();
    let mut client = setup.connect("febs");
    set_up_inbox(&mut client);

    let lines = client.command("FETCH 1 BODY[TEXT]").unwrap();
    assert_eq!(
        "* 1 FETCH (FLAGS (\\Seen \\Recent) BODY[TEXT] {13}\r\n\
         Body of one\r\n)",
        lines[0]
    );

    // Already seen, so FLAGS isn't volunteered again
    let lines = client.command("FETCH 1 BODY[TEXT]").unwrap();
    assert_line_like(&lines[0], r"^\* 1 FETCH \(BODY\[TEXT\] ");

    let lines = client.command("FETCH 2 BODY.PEEK[TEXT]").unwrap();
    assert_tagged_ok(&lines);
    let lines = client.command("FETCH 2 FLAGS").unwrap();
    assert_eq!("* 2 FETCH (FLAGS (\\Recent))", lines[0]);
}

#[test]
fn fetch_fast_and_uid() {
    let setup = set_up();
    let mut client = setup.connect("fefu");
    set_up_inbox(&mut client);

    let lines = client.command("FETCH 1:* FAST").unwrap();
    assert_eq!(3, lines.len());
    assert_line_like(
        &lines[0],
        concat!(
            r#"^\* 1 FETCH \(FLAGS \(\\Recent\) "#,
            r#"INTERNALDATE "[^"]+" RFC822\.SIZE 77\)$"#,
        ),
    );
    assert_line_like(&lines[1], r"^\* 2 FETCH \(FLAGS ");

    let lines = client.command("UID FETCH 2:* FLAGS").unwrap();
    assert_eq!(
        vec!["* 2 FETCH (UID 2 FLAGS (\\Recent))"],
        untagged(&lines)
    );

    // A reversed range is the same range
    let lines = client.command("UID FETCH 2:1 UID").unwrap();
    assert_eq!(
        vec!["* 1 FETCH (UID 1)", "* 2 FETCH (UID 2)"],
        untagged(&lines)
    );

    // UIDs beyond the mailbox match the last message
    let lines = client.command("UID FETCH 99:* UID").unwrap();
    assert_eq!(vec!["* 2 FETCH (UID 2)"], untagged(&lines));
}

#[test]
fn fetch_errors() {
    let setup = set_up();
    let mut client = setup.connect("feer");
    set_up_inbox(&mut client);

    let lines = client.command("FETCH 3 FLAGS").unwrap();
    assert_line_like(tagged(&lines), r" BAD \[CLIENTBUG\] ");

    let lines = client.command("FETCH 1 ENVELOPE").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("FETCH 1 BODY[1]").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("FETCH 1 (FLAGS BOGUS)").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("FETCH x FLAGS").unwrap();
    assert_tagged_bad(&lines);
}
