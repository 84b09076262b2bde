//! Client tunables.

/// Knobs for the conversation flows. Defaults match the hosted client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum messages fetched per conversation listing.
    pub history_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { history_limit: 500 }
    }
}
