//! Strongly-typed identifiers (avoid mixing raw integers arbitrarily).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote user identifier. Positive, and identical in the local cache and
/// in every remote call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for UserId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u64 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid user id: '{}'", s))?;
        if id == 0 {
            return Err("user id must be positive".to_string());
        }
        Ok(UserId(id))
    }
}

/// Local group identifier (SQLite rowid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_trimmed_digits() {
        assert_eq!(" 42 ".parse::<UserId>().unwrap(), UserId(42));
    }

    #[test]
    fn user_id_rejects_zero_and_garbage() {
        assert!("0".parse::<UserId>().is_err());
        assert!("-3".parse::<UserId>().is_err());
        assert!("alice".parse::<UserId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&UserId(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&GroupId(3)).unwrap(), "3");
    }

    #[test]
    fn user_ids_order_numerically() {
        let mut ids = vec![UserId(10), UserId(2), UserId(33)];
        ids.sort();
        assert_eq!(ids, vec![UserId(2), UserId(10), UserId(33)]);
    }
}
