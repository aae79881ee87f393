//! Priority comparator for extensions.
//!
//! # Invariants
//! - Every pair of components is comparable; missing order values use
//!   [`LOWEST_PRECEDENCE`](crate::model::capability::LOWEST_PRECEDENCE).
//! - Sorting is stable, so ties keep discovery order.

use crate::extension::component::Component;
use crate::model::capability::PriorityTier;
use crate::registry::ComponentRegistry;
use std::cmp::Ordering;
use std::rc::Rc;

/// Replacement comparator a registry may carry.
pub type ComponentComparator = Rc<dyn Fn(&dyn Component, &dyn Component) -> Ordering>;

/// Default comparator: `PriorityOrdered` before everything else, then by
/// effective order value.
pub fn compare_priority(left: &dyn Component, right: &dyn Component) -> Ordering {
    let left = left.priority();
    let right = right.priority();
    let left_po = left.tier == PriorityTier::PriorityOrdered;
    let right_po = right.tier == PriorityTier::PriorityOrdered;
    right_po
        .cmp(&left_po)
        .then_with(|| left.effective_order().cmp(&right.effective_order()))
}

/// Sorts `(name, instance)` pairs with the registry's comparator, falling
/// back to [`compare_priority`].
pub fn sort_extensions(
    extensions: &mut [(String, Rc<dyn Component>)],
    registry: &dyn ComponentRegistry,
) {
    if extensions.len() <= 1 {
        return;
    }
    match registry.dependency_comparator() {
        Some(comparator) => {
            extensions.sort_by(|(_, left), (_, right)| comparator(left.as_ref(), right.as_ref()))
        }
        None => extensions
            .sort_by(|(_, left), (_, right)| compare_priority(left.as_ref(), right.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::compare_priority;
    use crate::extension::component::Component;
    use crate::model::capability::{Priority, PriorityTier};
    use std::cmp::Ordering;

    struct Ranked(Priority);

    impl Component for Ranked {
        fn type_name(&self) -> &str {
            "Ranked"
        }

        fn priority(&self) -> Priority {
            self.0
        }
    }

    #[test]
    fn priority_ordered_beats_smaller_plain_order() {
        let po = Ranked(Priority::priority_ordered(100));
        let ordered = Ranked(Priority::ordered(-100));
        assert_eq!(compare_priority(&po, &ordered), Ordering::Less);
        assert_eq!(compare_priority(&ordered, &po), Ordering::Greater);
    }

    #[test]
    fn missing_order_sorts_after_explicit_order() {
        let explicit = Ranked(Priority::ordered(5));
        let missing = Ranked(Priority::new(PriorityTier::Ordered, None));
        let unordered = Ranked(Priority::unordered());
        assert_eq!(compare_priority(&explicit, &missing), Ordering::Less);
        assert_eq!(compare_priority(&missing, &unordered), Ordering::Equal);
    }
}
