//! Stable identifiers of list items

/// Item with an optional stable identifier
///
/// Placeholders have no identifier and are skipped by in-place refreshes.
pub trait Identified {
    /// Stable identifier, if the item has one
    fn identifier(&self) -> Option<&str>;
}

impl Identified for String {
    fn identifier(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl Identified for &str {
    fn identifier(&self) -> Option<&str> {
        Some(*self)
    }
}

impl<T: Identified> Identified for Option<T> {
    fn identifier(&self) -> Option<&str> {
        self.as_ref().and_then(Identified::identifier)
    }
}
