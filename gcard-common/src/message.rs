//! Greeting message identifiers
//!
//! A `MessageId` names one portrait on the card and the greeting that
//! belongs to it. The presentation layer shows the caption text of the
//! active message while its greeting plays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identifier of a portrait and its greeting (1-based on the default card)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u32);

impl MessageId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MessageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for MessageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(MessageId)
            .map_err(|e| Error::InvalidInput(format!("Invalid message id '{}': {}", s, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_id() {
        assert_eq!("2".parse::<MessageId>().unwrap(), MessageId(2));
        assert_eq!(" 7 ".parse::<MessageId>().unwrap(), MessageId(7));
        assert!("two".parse::<MessageId>().is_err());
        assert!("-1".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&MessageId(1)).unwrap();
        assert_eq!(json, "1");

        let id: MessageId = serde_json::from_str("2").unwrap();
        assert_eq!(id, MessageId(2));
    }
}
