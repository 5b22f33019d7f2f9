//! Rider display-name resolution
//!
//! Produces a human-readable label for a trip's rider. The normal path is a
//! join against `profiles` or `managed_clients`; when neither join finds a
//! usable name (the managed-client reference can dangle), a cosmetic
//! fallback is derived from the pickup address. The fallback is best-effort
//! display text only and must never fail.

use uuid::Uuid;

/// Rider name columns as they come back from the statement query's joins
#[derive(Debug, Default, Clone, Copy)]
pub struct RiderJoin<'a> {
    pub profile_first: Option<&'a str>,
    pub profile_last: Option<&'a str>,
    pub managed_first: Option<&'a str>,
    pub managed_last: Option<&'a str>,
}

/// Resolve a display name for a trip's rider.
///
/// Tries the profile join, then the managed-client join, then falls back to
/// a label derived from the pickup address plus a short rider-id fragment.
/// Always returns a non-empty string.
pub fn display_name(rider_id: Uuid, join: RiderJoin<'_>, pickup_address: &str) -> String {
    if let Some(name) = full_name(join.profile_first, join.profile_last) {
        return name;
    }
    if let Some(name) = full_name(join.managed_first, join.managed_last) {
        return name;
    }
    address_fallback(pickup_address, rider_id)
}

/// Join first/last into a trimmed full name, or None if both are blank
fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let first = first.map(str::trim).unwrap_or_default();
    let last = last.map(str::trim).unwrap_or_default();
    let joined = match (first.is_empty(), last.is_empty()) {
        (true, true) => return None,
        (false, true) => first.to_string(),
        (true, false) => last.to_string(),
        (false, false) => format!("{} {}", first, last),
    };
    Some(joined)
}

/// Tokens that mark the start of a unit/suite suffix in a street address
fn is_unit_token(token: &str) -> bool {
    if token.starts_with('#') {
        return true;
    }
    matches!(
        token.to_ascii_lowercase().trim_end_matches('.'),
        "apt" | "apartment" | "suite" | "ste" | "unit" | "bldg" | "building" | "fl" | "floor"
    )
}

/// Derive a label from the pickup address: strip the leading street number,
/// stop at unit/suite tokens, keep the first two words, then suffix a
/// short id fragment so distinct unresolvable riders stay distinguishable.
fn address_fallback(pickup_address: &str, rider_id: Uuid) -> String {
    let mut words: Vec<&str> = Vec::with_capacity(2);

    for (i, raw) in pickup_address.split_whitespace().enumerate() {
        let token = raw.trim_matches(|c: char| c == ',' || c == ';');
        if token.is_empty() {
            continue;
        }
        // Leading street number only; numbers later in the address are kept
        if i == 0 && token.chars().all(|c| c.is_ascii_digit() || c == '-') {
            continue;
        }
        if is_unit_token(token) {
            break;
        }
        words.push(token);
        if words.len() == 2 {
            break;
        }
    }

    let base = if words.is_empty() {
        "Client".to_string()
    } else {
        words.join(" ")
    };

    let id_hex = rider_id.simple().to_string();
    format!("{} (Managed) {}", base, &id_hex[..8])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rider() -> Uuid {
        Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap()
    }

    #[test]
    fn profile_name_wins() {
        let join = RiderJoin {
            profile_first: Some("Dorothy"),
            profile_last: Some("Vale"),
            managed_first: Some("Someone"),
            managed_last: Some("Else"),
        };
        assert_eq!(display_name(rider(), join, "123 Main St"), "Dorothy Vale");
    }

    #[test]
    fn managed_name_is_second_choice() {
        let join = RiderJoin {
            managed_first: Some("Harold"),
            managed_last: Some("Finch"),
            ..Default::default()
        };
        assert_eq!(display_name(rider(), join, "123 Main St"), "Harold Finch");
    }

    #[test]
    fn partial_names_still_resolve() {
        let join = RiderJoin {
            profile_first: Some("Dorothy"),
            ..Default::default()
        };
        assert_eq!(display_name(rider(), join, ""), "Dorothy");

        let join = RiderJoin {
            managed_last: Some("Finch"),
            ..Default::default()
        };
        assert_eq!(display_name(rider(), join, ""), "Finch");
    }

    #[test]
    fn blank_names_fall_through_to_address() {
        let join = RiderJoin {
            profile_first: Some("   "),
            profile_last: Some(""),
            ..Default::default()
        };
        let name = display_name(rider(), join, "450 Oakwood Dr, Springfield");
        assert_eq!(name, "Oakwood Dr (Managed) a1b2c3d4");
    }

    #[test]
    fn fallback_strips_street_number_and_unit() {
        let name = display_name(
            rider(),
            RiderJoin::default(),
            "1200 Cedar Grove Ave Apt 4B",
        );
        assert_eq!(name, "Cedar Grove (Managed) a1b2c3d4");

        let name = display_name(rider(), RiderJoin::default(), "88 Elm Suite 300");
        assert_eq!(name, "Elm (Managed) a1b2c3d4");

        let name = display_name(rider(), RiderJoin::default(), "77 Pine #12");
        assert_eq!(name, "Pine (Managed) a1b2c3d4");
    }

    #[test]
    fn fallback_never_empty_even_for_empty_address() {
        let name = display_name(rider(), RiderJoin::default(), "");
        assert_eq!(name, "Client (Managed) a1b2c3d4");
        assert!(!name.is_empty());
    }

    #[test]
    fn fallback_handles_address_that_is_only_a_number() {
        let name = display_name(rider(), RiderJoin::default(), "12345");
        assert_eq!(name, "Client (Managed) a1b2c3d4");
    }

    #[test]
    fn short_id_fragment_always_present() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let name_a = display_name(a, RiderJoin::default(), "9 Elm St");
        let name_b = display_name(b, RiderJoin::default(), "9 Elm St");
        assert_ne!(name_a, name_b);
        assert!(name_a.contains("(Managed)"));
    }
}
