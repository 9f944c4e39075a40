//! Policy switches for the state store.

use serde::{Deserialize, Serialize};

/// How the store treats events whose side effects are not fully pinned
/// down by the protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    /// When a character goes offline (`FLN`), also remove them from the
    /// member list of every channel. Chanop lists are never touched.
    ///
    /// Off by default: the server sends an `LCH` per channel anyway, and
    /// pruning early makes those `LCH`s no-ops.
    pub prune_offline_from_channels: bool,
}
