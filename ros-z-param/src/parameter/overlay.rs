//! Locally staged parameter edits.
//!
//! The overlay holds at most one pending edit per parameter name. Entries keep
//! the order in which a name was first staged, so the list sent on commit is
//! reproducible.

use indexmap::IndexMap;

use super::types::{Parameter, ParameterValue};

/// A staged edit for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingValue {
    /// Send this value on the next commit.
    Set(ParameterValue),
    /// The input was cleared; nothing is sent for this name.
    Cleared,
}

#[derive(Debug, Default)]
pub struct OverlayStore {
    entries: IndexMap<String, PendingValue>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an edit, replacing any earlier edit of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: PendingValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PendingValue> {
        self.entries.get(name)
    }

    /// Parameters to transmit, skipping cleared entries.
    pub fn pending_list(&self) -> Vec<Parameter> {
        self.entries
            .iter()
            .filter_map(|(name, pending)| match pending {
                PendingValue::Set(value) => Some(Parameter::new(name.clone(), value.clone())),
                PendingValue::Cleared => None,
            })
            .collect()
    }

    /// Drop what a commit just transmitted.
    ///
    /// An entry survives when it was restaged with a different value after
    /// `sent` was taken, so edits made while a commit is in flight are kept.
    /// Cleared entries are dropped.
    pub fn remove_sent(&mut self, sent: &[Parameter]) {
        self.entries.retain(|name, pending| match pending {
            PendingValue::Cleared => false,
            PendingValue::Set(value) => !sent
                .iter()
                .any(|p| p.name == *name && p.value == *value),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every entry and make room for a parameter set of `capacity` names.
    pub fn reset(&mut self, capacity: usize) {
        self.entries = IndexMap::with_capacity(capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PendingValue)> {
        self.entries.iter().map(|(name, pending)| (name.as_str(), pending))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut overlay = OverlayStore::new();
        overlay.set("speed", PendingValue::Set(ParameterValue::Double(1.0)));
        overlay.set("speed", PendingValue::Set(ParameterValue::Double(2.0)));
        assert_eq!(overlay.len(), 1);
        assert_eq!(
            overlay.pending_list(),
            vec![Parameter::new("speed", ParameterValue::Double(2.0))]
        );
    }

    #[test]
    fn test_cleared_entries_are_not_sent() {
        let mut overlay = OverlayStore::new();
        overlay.set("a", PendingValue::Set(ParameterValue::Integer(1)));
        overlay.set("b", PendingValue::Cleared);
        overlay.set("c", PendingValue::Set(ParameterValue::Bool(true)));
        let names: Vec<_> = overlay.pending_list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["a", "c"]);

        overlay.set("a", PendingValue::Cleared);
        overlay.set("c", PendingValue::Cleared);
        assert!(overlay.pending_list().is_empty());
        assert_eq!(overlay.len(), 3);
    }

    #[test]
    fn test_order_follows_first_insertion() {
        let mut overlay = OverlayStore::new();
        for name in ["z", "a", "m"] {
            overlay.set(name, PendingValue::Set(ParameterValue::Integer(0)));
        }
        overlay.set("z", PendingValue::Set(ParameterValue::Integer(5)));
        let names: Vec<_> = overlay.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_remove_sent_keeps_later_edits() {
        let mut overlay = OverlayStore::new();
        overlay.set("a", PendingValue::Set(ParameterValue::Integer(1)));
        overlay.set("b", PendingValue::Set(ParameterValue::Integer(2)));
        overlay.set("c", PendingValue::Cleared);
        let sent = overlay.pending_list();

        overlay.set("b", PendingValue::Set(ParameterValue::Integer(20)));
        overlay.set("d", PendingValue::Set(ParameterValue::Bool(true)));
        overlay.remove_sent(&sent);

        assert_eq!(
            overlay.pending_list(),
            vec![
                Parameter::new("b", ParameterValue::Integer(20)),
                Parameter::new("d", ParameterValue::Bool(true)),
            ]
        );
        assert!(overlay.get("a").is_none());
        assert!(overlay.get("c").is_none());
    }

    #[test]
    fn test_clear_and_reset() {
        let mut overlay = OverlayStore::new();
        overlay.set("a", PendingValue::Set(ParameterValue::Integer(1)));
        overlay.clear();
        assert!(overlay.is_empty());

        overlay.set("a", PendingValue::Set(ParameterValue::Integer(1)));
        overlay.reset(8);
        assert!(overlay.is_empty());
        assert!(overlay.get("a").is_none());
    }
}
