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

fn set_up_messages(client: &mut PipeClient) {
    quick_log_in(client);
    quick_create(client, "Fruit");
    quick_append(client, "Fruit", &simple_message("apple"));
    let lines = append(
        client,
        "Fruit",
        "(\\Seen \\Flagged)",
        "From: bob@example.com\r\n\
         Subject: Banana split\r\n\
         \r\n\
         long body with banana\r\n",
    );
    assert_tagged_ok(&lines);
    let lines = append(
        client,
        "Fruit",
        "(\\Deleted $Work) \"01-Feb-2020 12:00:00 +0000\"",
        &simple_message("cherry"),
    );
    assert_tagged_ok(&lines);
    quick_select(client, "Fruit");
}

fn search(client: &mut PipeClient, query: &str) -> String {
    let lines = client.command(&format!("SEARCH {}", query)).unwrap();
    assert_eq!(2, lines.len(), "Unexpected response to {}", query);
    assert_tagged_ok(&lines);
    lines[0].clone()
}

#[test]
fn search_flags() {
    let setup = set_up();
    let mut client = setup.connect("srfl");
    set_up_messages(&mut client);

    assert_eq!("* SEARCH 1 2 3", search(&mut client, "ALL"));
    assert_eq!("* SEARCH 2", search(&mut client, "SEEN"));
    assert_eq!("* SEARCH 1 3", search(&mut client, "UNSEEN"));
    assert_eq!("* SEARCH 3", search(&mut client, "DELETED"));
    assert_eq!("* SEARCH 1 2", search(&mut client, "UNDELETED"));
    assert_eq!("* SEARCH 3", search(&mut client, "KEYWORD $Work"));
    assert_eq!("* SEARCH 1 2", search(&mut client, "UNKEYWORD $Work"));
    assert_eq!("* SEARCH", search(&mut client, "ANSWERED"));

    // Everything was claimed as \Recent by the SELECT
    assert_eq!("* SEARCH 1 2 3", search(&mut client, "RECENT"));
    assert_eq!("* SEARCH 1 3", search(&mut client, "NEW"));
    assert_eq!("* SEARCH", search(&mut client, "OLD"));
}

#[test]
fn search_content() {
    let setup = set_up();
    let mut client = setup.connect("srco");
    set_up_messages(&mut client);

    assert_eq!("* SEARCH 2", search(&mut client, "SUBJECT banana"));
    assert_eq!("* SEARCH 2", search(&mut client, "FROM bob"));
    assert_eq!("* SEARCH 1 3", search(&mut client, "TO azure"));
    assert_eq!("* SEARCH 1 3", search(&mut client, "BODY \"Body of\""));
    assert_eq!("* SEARCH 3", search(&mut client, "TEXT cherry"));
    assert_eq!("* SEARCH", search(&mut client, "BODY durian"));
    assert_eq!(
        "* SEARCH 2",
        search(&mut client, "HEADER Subject \"split\"")
    );
}

#[test]
fn search_size_and_date() {
    let setup = set_up();
    let mut client = setup.connect("srsd");
    set_up_messages(&mut client);

    assert_eq!("* SEARCH 1 3", search(&mut client, "LARGER 80"));
    assert_eq!("* SEARCH 2", search(&mut client, "SMALLER 80"));
    assert_eq!("* SEARCH 3", search(&mut client, "BEFORE 01-Jan-2021"));
    assert_eq!("* SEARCH 3", search(&mut client, "ON 01-Feb-2020"));
    assert_eq!("* SEARCH 1 2", search(&mut client, "SINCE 01-Jan-2021"));
}

#[test]
fn search_combinations() {
    let setup = set_up();
    let mut client = setup.connect("srcm");
    set_up_messages(&mut client);

    assert_eq!("* SEARCH 2 3", search(&mut client, "OR SEEN DELETED"));
    assert_eq!("* SEARCH 1 3", search(&mut client, "NOT FLAGGED"));
    assert_eq!("* SEARCH 2", search(&mut client, "(SEEN FLAGGED)"));
    assert_eq!("* SEARCH 3", search(&mut client, "2:3 UNSEEN"));
    assert_eq!("* SEARCH 1", search(&mut client, "UNSEEN NOT 3"));
    assert_eq!("* SEARCH 2 3", search(&mut client, "UID 2:*"));
    assert_eq!(
        "* SEARCH 1 2 3",
        search(&mut client, "CHARSET UTF-8 ALL")
    );
}

#[test]
fn uid_search() {
    let setup = set_up();
    let mut client = setup.connect("srui");
    set_up_messages(&mut client);

    let lines = client.command("STORE 1 +FLAGS.SILENT (\\Deleted)").unwrap();
    assert_tagged_ok(&lines);
    // Message 3 is also \Deleted; only expunge message 1
    let lines = client.command("UID EXPUNGE 1").unwrap();
    assert_tagged_ok(&lines);

    // Sequence numbers shifted, UIDs did not
    assert_eq!("* SEARCH 2", search(&mut client, "DELETED"));
    let lines = client.command("UID SEARCH DELETED").unwrap();
    assert_eq!("* SEARCH 3", lines[0]);
    let lines = client.command("UID SEARCH 1").unwrap();
    assert_eq!("* SEARCH 2", lines[0]);
}

#[test]
fn search_errors() {
    let setup = set_up();
    let mut client = setup.connect("srer");
    set_up_messages(&mut client);

    let lines = client.command("SEARCH CHARSET KOI8-R ALL").unwrap();
    assert_line_like(tagged(&lines), r" NO \[BADCHARSET");

    let lines = client.command("SEARCH BOGUS").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("SEARCH OR SEEN").unwrap();
    assert_tagged_bad(&lines);

    let lines = client.command("SEARCH LARGER big").unwrap();
    assert_tagged_bad(&lines);
}
