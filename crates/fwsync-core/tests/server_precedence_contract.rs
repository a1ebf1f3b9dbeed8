//! Contract Test: DNS Server Precedence
//!
//! - `#dns-servers=system` forces the system resolver, even over defaults
//! - An explicit directive list overrides the run-wide defaults
//! - With neither, the system resolver is used
//! - Explicit servers fall back to the system resolver per lookup

mod common;

use common::*;
use fwsync_core::traits::ObjectType;

fn servers_asked(h: &Harness) -> Vec<Option<String>> {
    h.dns.lookups().into_iter().map(|l| l.server).collect()
}

#[tokio::test]
async fn system_sentinel_beats_default_servers() {
    let h = harness_with(
        vec![managed_ipset("web", "#resolve=web.example.com #dns-servers=system", &[])],
        with_defaults(&["8.8.8.8"]),
    );
    h.dns.set_system_answer("web.example.com", &["10.0.0.1"]);
    h.dns.set_server_answer("8.8.8.8", "web.example.com", &["10.0.0.99"]);

    h.run().await;

    assert_eq!(servers_asked(&h), [None]);
    assert_eq!(h.plane.entries(ObjectType::Ipset, "web"), addrs(&["10.0.0.1"]));
}

#[tokio::test]
async fn directive_servers_override_defaults() {
    let h = harness_with(
        vec![managed_ipset(
            "web",
            "#resolve=web.example.com #dns-servers=9.9.9.9",
            &[],
        )],
        with_defaults(&["8.8.8.8"]),
    );
    h.dns.set_server_answer("9.9.9.9", "web.example.com", &["10.0.0.9"]);
    h.dns.set_server_answer("8.8.8.8", "web.example.com", &["10.0.0.8"]);

    h.run().await;

    assert_eq!(servers_asked(&h), [Some("9.9.9.9".to_string())]);
    assert_eq!(h.plane.entries(ObjectType::Ipset, "web"), addrs(&["10.0.0.9"]));
}

#[tokio::test]
async fn defaults_apply_when_directive_names_no_server() {
    let h = harness_with(
        vec![managed_ipset("web", "#resolve=web.example.com", &[])],
        with_defaults(&["8.8.8.8"]),
    );
    h.dns.set_server_answer("8.8.8.8", "web.example.com", &["10.0.0.8"]);

    h.run().await;

    assert_eq!(servers_asked(&h), [Some("8.8.8.8".to_string())]);
}

#[tokio::test]
async fn no_servers_anywhere_uses_system_resolver() {
    let h = harness(vec![managed_ipset("web", "#resolve=web.example.com", &[])]);
    h.dns.set_system_answer("web.example.com", &["10.0.0.1"]);

    h.run().await;

    assert_eq!(servers_asked(&h), [None]);
}

#[tokio::test]
async fn servers_are_tried_in_order_then_system() {
    let h = harness(vec![managed_ipset(
        "web",
        "#resolve=web.example.com #dns-servers=10.9.9.1,10.9.9.2",
        &[],
    )]);
    h.dns.fail_server("10.9.9.1");
    h.dns.set_server_answer("10.9.9.2", "web.example.com", &["not-an-address"]);
    h.dns.set_system_answer("web.example.com", &["10.0.0.1"]);

    h.run().await;

    assert_eq!(
        servers_asked(&h),
        [
            Some("10.9.9.1".to_string()),
            Some("10.9.9.2".to_string()),
            None
        ]
    );
    assert_eq!(h.plane.entries(ObjectType::Ipset, "web"), addrs(&["10.0.0.1"]));
}

#[tokio::test]
async fn first_answering_server_wins() {
    let h = harness(vec![managed_ipset(
        "web",
        "#resolve=web.example.com #dns-servers=10.9.9.1,10.9.9.2",
        &[],
    )]);
    h.dns.set_server_answer("10.9.9.1", "web.example.com", &["10.0.0.1", "bogus"]);
    h.dns.set_server_answer("10.9.9.2", "web.example.com", &["10.0.0.2"]);

    h.run().await;

    assert_eq!(servers_asked(&h), [Some("10.9.9.1".to_string())]);
    assert_eq!(h.plane.entries(ObjectType::Ipset, "web"), addrs(&["10.0.0.1"]));
}
