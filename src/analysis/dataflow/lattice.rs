//! Lattice traits for data flow analysis.
//!
//! A lattice defines how abstract values combine where control flow paths merge. Facts
//! start at top (no information) and only ever move down through meets and transfers;
//! with a finite-height lattice this is what makes every solver in this crate terminate.
//!
//! # Lattice Theory Background
//!
//! - **Partial Order**: elements can be compared (≤)
//! - **Meet (∧)**: greatest lower bound of two elements
//! - **Top (⊤)**: greatest element, the identity of meet
//! - **Bottom (⊥)**: least element, absorbing for meet

use std::fmt::Debug;

use crate::utils::BitSet;

/// A meet semi-lattice.
///
/// The meet operation combines information from multiple control flow paths. It must be:
///
/// - **Idempotent**: `x.meet(x) = x`
/// - **Commutative**: `x.meet(y) = y.meet(x)`
/// - **Associative**: `x.meet(y.meet(z)) = (x.meet(y)).meet(z)`
///
/// # Examples
///
/// ```rust,ignore
/// use midend::analysis::dataflow::MeetSemiLattice;
///
/// impl MeetSemiLattice for Parity {
///     fn meet(&self, other: &Self) -> Self {
///         match (self, other) {
///             (Self::Top, x) | (x, Self::Top) => *x,
///             (a, b) if a == b => *a,
///             _ => Self::Bottom,
///         }
///     }
/// }
/// ```
pub trait MeetSemiLattice: Clone + Debug + PartialEq {
    /// Computes the meet (greatest lower bound) of two lattice elements.
    #[must_use]
    fn meet(&self, other: &Self) -> Self;

    /// Destructive meet: `self = self ∧ other`. Returns `true` if `self` changed.
    ///
    /// The default goes through [`meet`](Self::meet); set-like facts override it to avoid
    /// the copy.
    fn meet_into(&mut self, other: &Self) -> bool {
        let merged = self.meet(other);
        if merged == *self {
            false
        } else {
            *self = merged;
            true
        }
    }
}

/// A bounded lattice with known top and bottom elements.
pub trait Lattice: MeetSemiLattice {
    /// Returns the top (⊤) element: no information, identity for meet.
    fn top() -> Self;

    /// Returns the bottom (⊥) element: conflicting information, absorbing for meet.
    fn bottom() -> Self;

    /// Returns `true` if this is the top element.
    fn is_top(&self) -> bool {
        *self == Self::top()
    }

    /// Returns `true` if this is the bottom element.
    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }
}

/// Sets meet by union, as used by may-analyses such as liveness.
impl MeetSemiLattice for BitSet {
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    fn meet_into(&mut self, other: &Self) -> bool {
        self.union_with(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitset_meet_is_union() {
        let mut a = BitSet::new(8);
        a.insert(1);
        let mut b = BitSet::new(8);
        b.insert(5);

        let m = a.meet(&b);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(m, b.meet(&a));
        assert_eq!(a.meet(&a), a);

        assert!(a.meet_into(&b));
        assert!(!a.meet_into(&b));
    }
}
