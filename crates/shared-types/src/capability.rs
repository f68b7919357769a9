//! Permission capabilities grantable to a web origin.

use serde::{Deserialize, Serialize};

/// A capability an origin may hold for a `(namespace, chainRef)` scope.
///
/// The set is closed: handlers declare which capability they require and
/// the permission controller only ever stores these four symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Connected at all; lets an origin see chain metadata.
    Basic,
    /// Read the permitted account list.
    Accounts,
    /// Sign messages and typed data.
    Sign,
    /// Submit transactions for approval.
    SendTransaction,
}

impl Capability {
    /// The kebab-case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Accounts => "accounts",
            Self::Sign => "sign",
            Self::SendTransaction => "send-transaction",
        }
    }

    /// All capabilities, in grant-display order.
    #[must_use]
    pub fn all() -> [Capability; 4] {
        [
            Self::Basic,
            Self::Accounts,
            Self::Sign,
            Self::SendTransaction,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(Capability::SendTransaction.as_str(), "send-transaction");
        let json = serde_json::to_string(&Capability::SendTransaction).unwrap();
        assert_eq!(json, "\"send-transaction\"");
    }

    #[test]
    fn test_ordering_is_stable() {
        let mut caps = vec![Capability::Sign, Capability::Basic];
        caps.sort();
        assert_eq!(caps, vec![Capability::Basic, Capability::Sign]);
    }
}
