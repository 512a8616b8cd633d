use serde::{Deserialize, Serialize};

/// Limit/offset pair as it arrives from the transport layer.
///
/// Both fields are optional: a missing limit *and* offset means "no
/// pagination", which the full spreadsheet export relies on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageRequest {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    /// The unpaginated request used for full exports.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}
