// src/types/subtype.rs
//
// Subtyping over the declared supertype graph, plus variance-aware
// comparison of type arguments and boxing-aware assignability.

use super::{Type, TypeParameter, Variance, WildcardType};

impl Type {
    /// Whether `self` is a subtype of `other`.
    ///
    /// Reflexive and transitive over declared supertype edges. The top type
    /// is a supertype of everything and the bottom type a subtype of
    /// everything.
    pub fn is_subtype(&self, other: &Type) -> bool {
        if self == other || self.is_bottom() || other.is_top() {
            return true;
        }
        match (self, other) {
            (Type::Wildcard(w), _) => match w.bound.as_deref() {
                Some(bound) => bound.is_subtype(other),
                None => false,
            },
            (_, Type::Wildcard(w)) => match w.bound.as_deref() {
                Some(bound) => self.is_subtype(bound),
                None => true,
            },
            (Type::TypeParam(tp), _) => match tp.bound.as_deref() {
                Some(bound) => bound.is_subtype(other),
                None => false,
            },
            (Type::Parameterized(a), Type::Parameterized(b))
                if a.ctor.name == b.ctor.name && a.type_args.len() == b.type_args.len() =>
            {
                let args_match = a
                    .ctor
                    .type_parameters
                    .iter()
                    .zip(a.type_args.iter().zip(&b.type_args))
                    .all(|(param, (sub, sup))| arg_contained(param, sub, sup));
                args_match || self.supertypes_reach(other)
            }
            _ => self.supertypes_reach(other),
        }
    }

    fn supertypes_reach(&self, other: &Type) -> bool {
        self.supertypes().iter().any(|st| st.is_subtype(other))
    }

    /// `is_subtype` extended with boxing: a primitive and its reference
    /// form are interchangeable.
    pub fn is_assignable(&self, other: &Type) -> bool {
        if self.is_subtype(other) {
            return true;
        }
        if self.is_primitive() || other.is_primitive() {
            return self.box_type().is_subtype(&other.box_type());
        }
        false
    }
}

/// Whether `sub` may stand in for `sup` as the argument of `param`.
fn arg_contained(param: &TypeParameter, sub: &Type, sup: &Type) -> bool {
    if sub == sup {
        return true;
    }
    if let Type::Wildcard(w) = sup {
        return wildcard_contains(w, sub);
    }
    if sub.is_wildcard() {
        return false;
    }
    match param.variance {
        Variance::Invariant => false,
        Variance::Covariant => sub.is_subtype(sup),
        Variance::Contravariant => sup.is_subtype(sub),
    }
}

fn wildcard_contains(w: &WildcardType, sub: &Type) -> bool {
    let Some(bound) = w.bound.as_deref() else {
        return true;
    };
    match w.variance {
        Variance::Covariant => match sub {
            Type::Wildcard(inner) => match (inner.variance, inner.bound.as_deref()) {
                (Variance::Covariant, Some(inner_bound)) => inner_bound.is_subtype(bound),
                _ => bound.is_top(),
            },
            _ => sub.is_subtype(bound),
        },
        Variance::Contravariant => match sub {
            Type::Wildcard(inner) => match (inner.variance, inner.bound.as_deref()) {
                (Variance::Contravariant, Some(inner_bound)) => bound.is_subtype(inner_bound),
                _ => false,
            },
            _ => bound.is_subtype(sub),
        },
        Variance::Invariant => sub == bound,
    }
}
