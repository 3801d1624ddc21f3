use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for cell IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned identifier of a cell in the graph model.
/// 4 bytes, Copy, O(1) Eq and Hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(Spur);

impl CellId {
    /// Intern a string as a CellId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        CellId(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a unique ID with a prefix (e.g. `vertex_3`, `edge_7`).
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        loop {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{prefix}_{n}");
            // Skip names a caller already interned by hand.
            if INTERNER.get(&candidate).is_none() {
                return Self::intern(&candidate);
            }
        }
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CellId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CellId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = CellId::intern("swimlane_1");
        let b = CellId::intern("swimlane_1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "swimlane_1");
    }

    #[test]
    fn prefixed_ids_skip_taken_names() {
        let a = CellId::with_prefix("cell");
        let b = CellId::with_prefix("cell");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("cell_"));
    }
}
