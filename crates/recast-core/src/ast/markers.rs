// Markers attached to nodes during a filter pass

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    /// Set by a recipe's applicability test on the declarations it wants rewritten
    SearchResult { recipe: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers(Vec<Marker>);

impl Markers {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.0.iter()
    }

    pub fn add_if_absent(mut self, marker: Marker) -> Self {
        if !self.0.contains(&marker) {
            self.0.push(marker);
        }
        self
    }

    pub fn has_search_result(&self, recipe: &str) -> bool {
        self.0
            .iter()
            .any(|marker| matches!(marker, Marker::SearchResult { recipe: r } if r == recipe))
    }

    pub fn without_search_results(self) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|marker| !matches!(marker, Marker::SearchResult { .. }))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_if_absent_is_idempotent() {
        let marker = Marker::SearchResult {
            recipe: "FixCwe338".to_string(),
        };
        let markers = Markers::default()
            .add_if_absent(marker.clone())
            .add_if_absent(marker);

        assert_eq!(markers.iter().count(), 1);
        assert!(markers.has_search_result("FixCwe338"));
        assert!(!markers.has_search_result("Other"));
        assert!(markers.without_search_results().is_empty());
    }
}
