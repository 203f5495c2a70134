use std::fmt;

use serde_json::Value;

/// Block a state query is answered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    /// Includes transactions still in the node's pool, as nonce lookups need.
    Pending,
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Pending => write!(f, "pending"),
        }
    }
}

impl From<BlockTag> for Value {
    fn from(value: BlockTag) -> Self {
        Value::String(value.to_string())
    }
}
