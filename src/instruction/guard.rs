// Insufficient-context guard
//
// Decides whether a portfolio carries enough text for the assistant to say
// anything grounded about its owner.

use serde::{Deserialize, Serialize};

use crate::portfolio::{ContextItem, Portfolio};

/// Reply forced when a portfolio has nothing meaningful to draw from.
pub const INSUFFICIENT_CONTEXT_REPLY: &str = "I'm sorry, but this portfolio doesn't have enough \
information for me to answer that yet. Please check back once the owner has added more details.";

/// Threshold for the insufficient-context guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPolicy {
    /// Minimum non-whitespace characters across `about` and all context values.
    /// Below this the instruction forces `INSUFFICIENT_CONTEXT_REPLY`.
    pub min_content_chars: usize,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            min_content_chars: 1,
        }
    }
}

impl ContentPolicy {
    pub fn new(min_content_chars: usize) -> Self {
        Self { min_content_chars }
    }

    /// True when the portfolio's text falls below the threshold
    pub fn is_insufficient(&self, portfolio: &Portfolio, contexts: &[ContextItem]) -> bool {
        content_chars(portfolio, contexts) < self.min_content_chars
    }
}

/// Count of non-whitespace characters in `about` plus every context value.
///
/// Context names are labels, not content: a portfolio made of empty
/// "Skills:" and "Experience:" items still has nothing to say.
pub fn content_chars(portfolio: &Portfolio, contexts: &[ContextItem]) -> usize {
    let count = |s: &str| s.chars().filter(|c| !c.is_whitespace()).count();
    count(&portfolio.about) + contexts.iter().map(|c| count(&c.value)).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portfolio(about: &str) -> Portfolio {
        Portfolio::new("p-1", "ada", "Ada", about)
    }

    #[test]
    fn test_whitespace_only_is_insufficient() {
        let contexts = vec![
            ContextItem::new("Skills", "   "),
            ContextItem::new("Experience", "\n\t"),
        ];
        let policy = ContentPolicy::default();
        assert_eq!(content_chars(&portfolio("  "), &contexts), 0);
        assert!(policy.is_insufficient(&portfolio("  "), &contexts));
    }

    #[test]
    fn test_any_text_passes_default_policy() {
        let policy = ContentPolicy::default();
        assert!(!policy.is_insufficient(&portfolio("x"), &[]));
        assert!(!policy.is_insufficient(
            &portfolio(""),
            &[ContextItem::new("Role", "Engineer")]
        ));
    }

    #[test]
    fn test_context_names_do_not_count() {
        let contexts = vec![ContextItem::new("A very long label", "")];
        assert_eq!(content_chars(&portfolio(""), &contexts), 0);
    }

    #[test]
    fn test_raised_threshold() {
        let policy = ContentPolicy::new(20);
        // "Engineer" + "Rust" = 12 non-whitespace chars
        let contexts = vec![ContextItem::new("Stack", "Rust")];
        assert!(policy.is_insufficient(&portfolio("Engineer"), &contexts));
        assert!(!policy.is_insufficient(
            &portfolio("Engineer building compilers"),
            &contexts
        ));
    }
}
