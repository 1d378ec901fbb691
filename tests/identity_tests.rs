use claimgate::identity::ClientId;

#[test]
fn forwarded_chain_uses_the_originating_client() {
    let direct = ClientId::derive(None, "203.0.113.7");
    let forwarded = ClientId::derive(Some("203.0.113.7, 10.0.0.1, 10.0.0.2"), "10.0.0.2");
    assert_eq!(direct, forwarded, "first chain entry wins over the peer");
}

#[test]
fn empty_chain_entries_are_skipped() {
    let id = ClientId::derive(Some(" , 203.0.113.7"), "10.0.0.1");
    assert_eq!(id, ClientId::from_raw("203.0.113.7"));
}

#[test]
fn blank_chain_falls_back_to_peer() {
    let id = ClientId::derive(Some("   "), "10.0.0.1");
    assert_eq!(id, ClientId::from_raw("10.0.0.1"));
}

#[test]
fn hashing_is_stable_and_fixed_width() {
    let a = ClientId::from_raw("203.0.113.7");
    let b = ClientId::from_raw("203.0.113.7");
    assert_eq!(a, b);
    assert_eq!(a.as_str().len(), 16);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn raw_address_never_appears_in_the_key() {
    let id = ClientId::from_raw("203.0.113.7");
    assert!(!id.as_str().contains("203"));
    assert_ne!(id.as_str(), "203.0.113.7");
}

#[test]
fn distinct_addresses_hash_apart() {
    assert_ne!(
        ClientId::from_raw("203.0.113.7"),
        ClientId::from_raw("203.0.113.8")
    );
}
