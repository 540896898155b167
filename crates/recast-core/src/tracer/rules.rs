/*!
# Recipes

Core trait for rewrite recipes and their execution statistics.
*/

use serde::Serialize;

use crate::visitor::TreeVisitor;

/// Core trait for rewrite recipes
///
/// A recipe is run in two passes over each unit. The applicability test
/// marks the declarations it wants rewritten; units where it marks nothing
/// are reported as not applicable and never reach the rewrite visitor.
pub trait Recipe: Send + Sync {
    /// Stable identifier, also used as the marker key
    fn name(&self) -> &'static str;

    /// Human-readable name for this recipe
    fn display_name(&self) -> &'static str;

    /// Detailed description of what this recipe does
    fn description(&self) -> &'static str;

    /// Priority for recipe ordering (higher priority runs first)
    fn priority(&self) -> u32 {
        100
    }

    /// Visitor for the first pass; `None` treats every unit as applicable
    fn applicability_test(&self) -> Option<Box<dyn TreeVisitor>> {
        None
    }

    /// Visitor for the rewrite pass. A fresh one is created for every unit.
    fn visitor(&self) -> Box<dyn TreeVisitor>;
}

/// Recipe execution statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct RuleStats {
    pub rule_name: String,
    /// Units the recipe was applicable to
    pub applications: u64,
    /// Units the recipe changed
    pub transformations: u64,
    pub errors: u64,
    pub total_time_ms: u64,
}

impl RuleStats {
    pub fn new(rule_name: String) -> Self {
        Self {
            rule_name,
            ..Self::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.transformations as f64) / (self.applications as f64)
        }
    }

    pub fn average_time_ms(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.total_time_ms as f64) / (self.applications as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_without_applications() {
        let stats = RuleStats::new("FixCwe338".to_string());
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.average_time_ms(), 0.0);
    }

    #[test]
    fn test_rates() {
        let stats = RuleStats {
            rule_name: "FixCwe338".to_string(),
            applications: 4,
            transformations: 3,
            errors: 1,
            total_time_ms: 10,
        };
        assert_eq!(stats.success_rate(), 0.75);
        assert_eq!(stats.average_time_ms(), 2.5);
    }
}
