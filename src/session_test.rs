// Unit tests for identity construction and its round trip through parsing

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn root_identity_shape() {
    let identity = root_identity(&LocatorDescriptor::id("username"));
    assert_eq!(identity, "[[shadowprobe session] -> id: username]]");
}

#[test]
fn child_identity_extends_parent() {
    let parent = root_identity(&LocatorDescriptor::tag_name("form"));
    let child = child_identity(&parent, &LocatorDescriptor::name("email"));
    assert_eq!(
        child,
        "[[shadowprobe session] -> tag name: form]] -> name: email]]"
    );
}

#[test]
fn identities_round_trip_through_parsing() {
    let descriptors = vec![
        LocatorDescriptor::tag_name("div"),
        LocatorDescriptor::class_name("login-box"),
        LocatorDescriptor::css("input[type='text']"),
    ];
    let mut identity = root_identity(&descriptors[0]);
    for descriptor in &descriptors[1..] {
        identity = child_identity(&identity, descriptor);
    }

    let chain = LocatorChain::parse(&identity);
    assert_eq!(chain.descriptors(), descriptors.as_slice());
}

#[test]
fn session_prefix_carries_no_locator() {
    // The leading fragment must never be mistaken for a hop.
    let chain = LocatorChain::parse(IDENTITY_ROOT);
    assert!(chain.is_empty());
}

#[test]
fn deep_nesting_round_trips() {
    let descriptors = vec![
        LocatorDescriptor::id("app"),
        LocatorDescriptor::tag_name("section"),
        LocatorDescriptor::xpath("//tr[2]/td"),
        LocatorDescriptor::link_text("Details"),
        LocatorDescriptor::partial_link_text("Det"),
    ];
    let mut identity = root_identity(&descriptors[0]);
    for descriptor in &descriptors[1..] {
        identity = child_identity(&identity, descriptor);
    }

    let chain = LocatorChain::parse(&identity);
    assert_eq!(chain.len(), descriptors.len());
    assert_eq!(chain.descriptors(), descriptors.as_slice());
}
