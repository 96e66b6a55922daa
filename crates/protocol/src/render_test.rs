//! Message rendering tests

use crate::{Entry, Severity};

fn rendered(message: &str, tags: &[&str]) -> String {
    let mut entry = Entry::new();
    entry.set_severity(Severity::Info).set_message(message);

    for tag in tags {
        entry.push_tag(tag);
    }

    entry.render()
}

#[test]
fn test_substitutes_in_order() {
    assert_eq!(rendered("hi %s", &["world"]), "hi world");
    assert_eq!(
        rendered("%s to %s failed", &["node-1", "node-2"]),
        "node-1 to node-2 failed"
    );
}

#[test]
fn test_no_placeholders() {
    assert_eq!(rendered("plain message", &["unused"]), "plain message");
}

#[test]
fn test_escaped_percent() {
    assert_eq!(rendered("100%% done", &[]), "100% done");
    assert_eq!(rendered("%%s is literal", &["x"]), "%s is literal");
}

#[test]
fn test_more_placeholders_than_tags() {
    assert_eq!(rendered("%s and %s", &["one"]), "one and %s");
}

#[test]
fn test_trailing_percent() {
    assert_eq!(rendered("50%", &[]), "50%");
}
