//! Intent classification as an ordered rule list: first satisfied rule wins.

use crate::lexicon::{Lexicon, TermSet};
use crate::query::Intent;

/// A condition over folded question text.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Any term of the set occurs.
    Terms(TermSet),
    /// An opening term followed later by a closing term ("from … to").
    Span { open: TermSet, close: TermSet },
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn holds(&self, folded: &str) -> bool {
        match self {
            Self::Terms(set) => set.matches(folded),
            Self::Span { open, close } => {
                if open.is_empty() || close.is_empty() {
                    return false;
                }
                open.find_from(folded, 0)
                    .is_some_and(|opened| close.find_from(folded, opened.end).is_some())
            }
            Self::AllOf(all) => all.iter().all(|p| p.holds(folded)),
            Self::AnyOf(any) => any.iter().any(|p| p.holds(folded)),
        }
    }
}

/// Priority-ordered keyword cascade producing an [`Intent`].
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<(Predicate, Intent)>,
    fallback: Intent,
}

impl IntentClassifier {
    pub fn new(lexicon: &Lexicon) -> Self {
        let rules = vec![
            (Predicate::Terms(TermSet::new(&lexicon.compare)), Intent::Compare),
            (
                Predicate::AnyOf(vec![
                    Predicate::Terms(TermSet::new(&lexicon.change)),
                    Predicate::Span {
                        open: TermSet::new(&lexicon.span_open),
                        close: TermSet::new(&lexicon.span_close),
                    },
                ]),
                Intent::Trend,
            ),
            (
                Predicate::AllOf(vec![
                    Predicate::Terms(TermSet::new(&lexicon.severity)),
                    Predicate::Terms(TermSet::new(&lexicon.list_verbs)),
                ]),
                Intent::List,
            ),
        ];
        Self {
            rules,
            fallback: Intent::Data,
        }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[(Predicate, Intent)] {
        &self.rules
    }

    pub fn classify(&self, folded: &str) -> Intent {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate.holds(folded))
            .map(|(_, intent)| *intent)
            .unwrap_or(self.fallback)
    }
}
