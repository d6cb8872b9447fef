//! UUID v7 utilities for time-ordered identifiers.
//!
//! All rows created by this backend use UUIDv7 (RFC 9562), which embeds a
//! millisecond timestamp in the first 48 bits. Session and job listings
//! ordered by id are therefore also ordered by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v7_ids_are_time_ordered() {
        let a = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_v7();
        assert!(a < b);
    }

    #[test]
    fn v7_version_bits() {
        let id = new_v7();
        assert_eq!(id.get_version_num(), 7);
    }
}
