//! Marker tokens

/// Suffix appended to the name of an attribute that holds bindings.
///
/// Hosts may reorder or lowercase attributes; the suffix survives both.
pub const BOUND_ATTRIBUTE_SUFFIX: &str = "$lit$";

/// Prefix every marker token starts with
pub const MARKER_PREFIX: &str = "lit$";

/// The marker token of one renderer, plus the forms derived from it.
///
/// The token is digits only so that hosts which lowercase attribute names
/// leave element-binding markers intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    marker: String,
    marker_match: String,
    node_marker: String,
}

impl Markers {
    /// Deterministic markers derived from `seed`
    pub fn from_seed(seed: u64) -> Self {
        let marker = format!("{}{:09}$", MARKER_PREFIX, seed % 1_000_000_000);
        let marker_match = format!("?{}", marker);
        let node_marker = format!("<{}>", marker_match);
        Self {
            marker,
            marker_match,
            node_marker,
        }
    }

    /// Markers from a fresh random seed
    pub fn random() -> Self {
        Self::from_seed(rand::random::<u64>())
    }

    /// The token itself, e.g. `lit$000000042$`
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Comment data of a child-binding anchor once parsed (`?` + marker)
    pub fn marker_match(&self) -> &str {
        &self.marker_match
    }

    /// Markup inserted at text positions (`<?` + marker + `>`)
    pub fn node_marker(&self) -> &str {
        &self.node_marker
    }
}
