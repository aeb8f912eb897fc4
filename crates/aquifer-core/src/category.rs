//! Category extraction, most specific tier first.

use crate::lexicon::{Lexicon, TermSet};
use crate::record::Category;

#[derive(Debug, Clone)]
struct Tier {
    category: Category,
    triggers: TermSet,
    blockers: TermSet,
}

impl Tier {
    fn new(category: Category, triggers: &[String], blockers: &[String]) -> Self {
        Self {
            category,
            triggers: TermSet::new(triggers),
            blockers: TermSet::new(blockers),
        }
    }

    fn fires(&self, folded: &str) -> bool {
        self.triggers.matches(folded) && !self.blockers.matches(folded)
    }
}

/// Maps severity wording onto one of the four stored categories.
///
/// Tiers are checked over-exploited → critical → semi-critical → safe. The
/// critical tier is vetoed by its blockers so "semi-critical" falls through
/// to its own tier.
#[derive(Debug, Clone)]
pub struct CategoryExtractor {
    tiers: Vec<Tier>,
}

impl CategoryExtractor {
    pub fn new(lexicon: &Lexicon) -> Self {
        Self {
            tiers: vec![
                Tier::new(Category::OverExploited, &lexicon.over_exploited, &[]),
                Tier::new(
                    Category::Critical,
                    &lexicon.critical,
                    &lexicon.critical_blockers,
                ),
                Tier::new(Category::SemiCritical, &lexicon.semi_critical, &[]),
                Tier::new(Category::Safe, &lexicon.safe, &[]),
            ],
        }
    }

    pub fn extract(&self, folded: &str) -> Option<Category> {
        self.tiers
            .iter()
            .find(|tier| tier.fires(folded))
            .map(|tier| tier.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<Category> {
        CategoryExtractor::new(&Lexicon::default()).extract(text)
    }

    #[test]
    fn over_exploited_never_critical() {
        assert_eq!(extract("over-exploited districts"), Some(Category::OverExploited));
        assert_eq!(extract("overexploited and critical"), Some(Category::OverExploited));
        assert_eq!(extract("over exploited blocks"), Some(Category::OverExploited));
        assert_eq!(extract("over-exploitation in punjab"), Some(Category::OverExploited));
        assert_eq!(extract("अतिदोहित जिले"), Some(Category::OverExploited));
    }

    #[test]
    fn semi_critical_not_preempted_by_critical() {
        assert_eq!(extract("semi-critical districts"), Some(Category::SemiCritical));
        assert_eq!(extract("semi critical"), Some(Category::SemiCritical));
        assert_eq!(extract("अर्ध-गंभीर"), Some(Category::SemiCritical));
    }

    #[test]
    fn critical_and_safe() {
        assert_eq!(extract("critical districts"), Some(Category::Critical));
        assert_eq!(extract("गंभीर जिले"), Some(Category::Critical));
        assert_eq!(extract("safe districts"), Some(Category::Safe));
        assert_eq!(extract("सुरक्षित"), Some(Category::Safe));
    }

    #[test]
    fn none_when_no_trigger() {
        assert_eq!(extract("recharge in mehsana"), None);
        assert_eq!(extract("unsafe"), None);
        assert_eq!(extract("overall trend"), None);
    }
}
