use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const ID_SUFFIX_LEN: usize = 9;
const ID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// A mutation recorded locally, waiting to be replayed against the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: String,
    /// Operation name, e.g. "insert", "update", "delete"
    pub action: String,
    /// Target collection, e.g. "orders"
    pub table: String,
    pub data: JsonValue,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
}

impl PendingAction {
    pub fn new(
        action: impl Into<String>,
        table: impl Into<String>,
        data: JsonValue,
        timestamp: i64,
    ) -> Self {
        Self {
            id: generate_action_id(timestamp),
            action: action.into(),
            table: table.into(),
            data,
            timestamp,
        }
    }
}

/// `<epoch-millis>-<random suffix>`
pub fn generate_action_id(timestamp: i64) -> String {
    format!(
        "{}-{}",
        timestamp,
        nanoid::nanoid!(ID_SUFFIX_LEN, &ID_ALPHABET)
    )
}
