//! Proptest generators.

use proptest::prelude::*;

/// Generate subject identifiers in GUID shape.
pub fn guid_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}"
}

/// Generate arbitrary non-empty subject identifiers, including non-ASCII.
pub fn subject_strategy() -> impl Strategy<Value = String> {
    prop_oneof![guid_strategy(), "\\PC{1,40}"]
}

/// Generate dotted IPv4 addresses.
pub fn ipv4_strategy() -> impl Strategy<Value = String> {
    any::<[u8; 4]>().prop_map(|[a, b, c, d]| format!("{a}.{b}.{c}.{d}"))
}

/// Generate IPv6 addresses in canonical text form.
pub fn ipv6_strategy() -> impl Strategy<Value = String> {
    any::<[u16; 8]>().prop_map(|segments| std::net::Ipv6Addr::from(segments).to_string())
}

/// Generate client addresses of either family.
pub fn address_strategy() -> impl Strategy<Value = String> {
    prop_oneof![ipv4_strategy(), ipv6_strategy()]
}

/// Generate two distinct addresses.
pub fn distinct_address_pair_strategy() -> impl Strategy<Value = (String, String)> {
    (address_strategy(), address_strategy()).prop_filter("addresses must differ", |(a, b)| a != b)
}

/// Generate strings shaped like refresh secrets (43 URL-safe characters).
pub fn refresh_secret_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{43}"
}

/// Generate access token TTLs in seconds.
pub fn ttl_seconds_strategy() -> impl Strategy<Value = u64> {
    1u64..=7 * 24 * 3600
}
