// src/types/mod.rs
//
// Type model shared by both target languages.
//
// Types are plain values: every classifier carries its own supertype edges,
// so subtyping (see `subtype`) never needs a side table. Submodules:
// - `subtype` - subtype and assignability predicates
// - `subst` - type-variable maps and substitution

mod subst;
mod subtype;

#[cfg(test)]
mod tests;

use std::fmt;

use crate::builtins::{BuiltinKind, Language};

pub use subst::TypeVarMap;

/// Declaration-site or use-site variance of a type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

impl Variance {
    pub fn is_invariant(self) -> bool {
        self == Variance::Invariant
    }

    pub fn is_covariant(self) -> bool {
        self == Variance::Covariant
    }

    pub fn is_contravariant(self) -> bool {
        self == Variance::Contravariant
    }
}

/// A catalog-provided type. The supertype edges come from the catalog's
/// data table for `lang`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuiltinType {
    pub name: String,
    pub kind: BuiltinKind,
    pub lang: Language,
    /// Unboxed form (only Java numerics, `char` and `boolean`).
    pub primitive: bool,
    pub supertypes: Vec<Type>,
}

/// A user-defined, non-generic class or interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleClassifier {
    pub name: String,
    pub supertypes: Vec<Type>,
}

/// A named type variable of a class or function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub variance: Variance,
    /// Upper bound; may itself be another type parameter.
    pub bound: Option<Box<Type>>,
}

impl TypeParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variance: Variance::Invariant,
            bound: None,
        }
    }

    pub fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    pub fn with_bound(mut self, bound: Type) -> Self {
        self.bound = Some(Box::new(bound));
        self
    }

    /// Resolve the bound through chains of parameter-to-parameter bounds.
    pub fn bound_rec(&self) -> Option<Type> {
        let mut current = self.bound.as_deref()?;
        // Bounds are acyclic, but cap the walk anyway.
        for _ in 0..64 {
            match current {
                Type::TypeParam(tp) => match tp.bound.as_deref() {
                    Some(next) => current = next,
                    None => return None,
                },
                other => return Some(other.clone()),
            }
        }
        None
    }
}

/// A bounded or unbounded type argument (`out T`, `in T`, `*` in Kotlin;
/// `? extends T`, `? super T`, `?` in Java).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WildcardType {
    pub bound: Option<Box<Type>>,
    pub variance: Variance,
}

impl WildcardType {
    pub fn unbounded() -> Self {
        Self {
            bound: None,
            variance: Variance::Invariant,
        }
    }

    pub fn extends(bound: Type) -> Self {
        Self {
            bound: Some(Box::new(bound)),
            variance: Variance::Covariant,
        }
    }

    pub fn super_of(bound: Type) -> Self {
        Self {
            bound: Some(Box::new(bound)),
            variance: Variance::Contravariant,
        }
    }
}

/// A generic declaration awaiting type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeConstructor {
    pub name: String,
    pub type_parameters: Vec<TypeParameter>,
    /// Supertypes, which may mention `type_parameters`.
    pub supertypes: Vec<Type>,
    /// Provided by the catalog rather than declared by a generated class.
    pub builtin: bool,
}

impl TypeConstructor {
    /// Apply `type_args`, which must match the parameter count.
    pub fn apply(&self, type_args: Vec<Type>) -> Type {
        debug_assert_eq!(self.type_parameters.len(), type_args.len());
        Type::Parameterized(ParameterizedType {
            ctor: Box::new(self.clone()),
            type_args,
        })
    }

    pub fn is_function(&self) -> bool {
        self.builtin && function_arity(&self.name).is_some()
    }
}

/// A type constructor applied to type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterizedType {
    pub ctor: Box<TypeConstructor>,
    pub type_args: Vec<Type>,
}

impl ParameterizedType {
    /// The map from the constructor's parameters to this type's arguments.
    pub fn type_var_map(&self) -> TypeVarMap {
        self.ctor
            .type_parameters
            .iter()
            .cloned()
            .zip(self.type_args.iter().cloned())
            .collect()
    }
}

/// The closed set of types the generator reasons about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Builtin(BuiltinType),
    Simple(SimpleClassifier),
    Parameterized(ParameterizedType),
    TypeParam(TypeParameter),
    Wildcard(WildcardType),
    Constructor(TypeConstructor),
}

fn function_arity(name: &str) -> Option<usize> {
    name.strip_prefix("Function")?.parse().ok()
}

impl Type {
    /// The type's name. Parameterized types report their constructor name.
    pub fn name(&self) -> &str {
        match self {
            Type::Builtin(b) => &b.name,
            Type::Simple(s) => &s.name,
            Type::Parameterized(p) => &p.ctor.name,
            Type::TypeParam(tp) => &tp.name,
            Type::Wildcard(_) => "?",
            Type::Constructor(c) => &c.name,
        }
    }

    pub fn builtin_kind(&self) -> Option<BuiltinKind> {
        match self {
            Type::Builtin(b) => Some(b.kind),
            _ => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        match self {
            Type::Builtin(_) => true,
            Type::Parameterized(p) => p.ctor.builtin,
            Type::Constructor(c) => c.builtin,
            _ => false,
        }
    }

    pub fn is_top(&self) -> bool {
        self.builtin_kind() == Some(BuiltinKind::Any)
    }

    pub fn is_bottom(&self) -> bool {
        self.builtin_kind() == Some(BuiltinKind::Nothing)
    }

    pub fn is_void(&self) -> bool {
        self.builtin_kind() == Some(BuiltinKind::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Builtin(b) if b.primitive)
    }

    pub fn is_type_var(&self) -> bool {
        matches!(self, Type::TypeParam(_))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Type::Wildcard(_))
    }

    pub fn is_parameterized(&self) -> bool {
        matches!(self, Type::Parameterized(_))
    }

    pub fn is_type_constructor(&self) -> bool {
        matches!(self, Type::Constructor(_))
    }

    /// Function types are parameterized types over a `FunctionN` constructor.
    pub fn is_function_type(&self) -> bool {
        matches!(self, Type::Parameterized(p) if p.ctor.is_function())
    }

    /// Parameter types and return type of a function type.
    pub fn function_signature(&self) -> Option<(&[Type], &Type)> {
        match self {
            Type::Parameterized(p) if p.ctor.is_function() => {
                let (ret, params) = p.type_args.split_last()?;
                Some((params, ret))
            }
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::Parameterized(p) => &p.type_args,
            _ => &[],
        }
    }

    /// Direct supertypes, with a parameterized type's arguments substituted
    /// into its constructor's supertypes.
    pub fn supertypes(&self) -> Vec<Type> {
        match self {
            Type::Builtin(b) => b.supertypes.clone(),
            Type::Simple(s) => s.supertypes.clone(),
            Type::Constructor(c) => c.supertypes.clone(),
            Type::Parameterized(p) => {
                let map = p.type_var_map();
                p.ctor.supertypes.iter().map(|st| st.substitute(&map)).collect()
            }
            Type::TypeParam(tp) => tp.bound.iter().map(|b| (**b).clone()).collect(),
            Type::Wildcard(w) => w.bound.iter().map(|b| (**b).clone()).collect(),
        }
    }

    /// All supertypes reachable from this type, itself included, in
    /// breadth-first order without duplicates.
    pub fn all_supertypes(&self) -> Vec<Type> {
        let mut out = vec![self.clone()];
        let mut idx = 0;
        while idx < out.len() {
            for st in out[idx].supertypes() {
                if !out.contains(&st) {
                    out.push(st);
                }
            }
            idx += 1;
        }
        out
    }

    /// Effective bound of a type parameter or wildcard, resolving chains of
    /// parameter-to-parameter bounds. `None` means the top type.
    pub fn bound_rec(&self) -> Option<Type> {
        match self {
            Type::TypeParam(tp) => tp.bound_rec(),
            Type::Wildcard(w) => match w.bound.as_deref() {
                Some(Type::TypeParam(tp)) => tp.bound_rec().or_else(|| {
                    // An unbounded type parameter is its own best bound.
                    Some(Type::TypeParam(tp.clone()))
                }),
                Some(t) => Some(t.clone()),
                None => None,
            },
            _ => None,
        }
    }

    /// Type parameters occurring anywhere in this type.
    pub fn type_variables(&self) -> Vec<TypeParameter> {
        let mut out = Vec::new();
        self.collect_type_variables(&mut out);
        out
    }

    fn collect_type_variables(&self, out: &mut Vec<TypeParameter>) {
        match self {
            Type::TypeParam(tp) => {
                if !out.contains(tp) {
                    out.push(tp.clone());
                }
                if let Some(bound) = &tp.bound {
                    bound.collect_type_variables(out);
                }
            }
            Type::Parameterized(p) => {
                for arg in &p.type_args {
                    arg.collect_type_variables(out);
                }
            }
            Type::Wildcard(w) => {
                if let Some(bound) = &w.bound {
                    bound.collect_type_variables(out);
                }
            }
            Type::Builtin(_) | Type::Simple(_) | Type::Constructor(_) => {}
        }
    }

    pub fn has_type_variables(&self) -> bool {
        !self.type_variables().is_empty()
    }

    pub fn has_wildcards(&self) -> bool {
        match self {
            Type::Wildcard(_) => true,
            Type::Parameterized(p) => p.type_args.iter().any(Type::has_wildcards),
            _ => false,
        }
    }

    /// Replace every wildcard by its bound, or by `top` when unbounded.
    pub fn to_variance_free(&self, top: &Type) -> Type {
        match self {
            Type::Wildcard(w) => match w.bound.as_deref() {
                Some(bound) => bound.to_variance_free(top),
                None => top.clone(),
            },
            Type::Parameterized(p) => Type::Parameterized(ParameterizedType {
                ctor: p.ctor.clone(),
                type_args: p
                    .type_args
                    .iter()
                    .map(|arg| arg.to_variance_free(top))
                    .collect(),
            }),
            other => other.clone(),
        }
    }

    /// The reference form of a Java primitive. Every other type boxes to itself.
    pub fn box_type(&self) -> Type {
        match self {
            Type::Builtin(b) if b.primitive => {
                crate::builtins::Catalog::new(b.lang).builtin(b.kind)
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variance::Invariant => Ok(()),
            Variance::Covariant => write!(f, "out "),
            Variance::Contravariant => write!(f, "in "),
        }
    }
}

impl fmt::Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.variance, self.name)?;
        if let Some(bound) = &self.bound {
            write!(f, " : {bound}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Builtin(b) => write!(f, "{}", b.name),
            Type::Simple(s) => write!(f, "{}", s.name),
            Type::TypeParam(tp) => write!(f, "{}", tp.name),
            Type::Wildcard(w) => match &w.bound {
                Some(bound) => write!(f, "{}{bound}", w.variance),
                None => write!(f, "*"),
            },
            Type::Constructor(c) => {
                write!(f, "{}<", c.name)?;
                for (i, tp) in c.type_parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{tp}")?;
                }
                write!(f, ">")
            }
            Type::Parameterized(p) => {
                write!(f, "{}<", p.ctor.name)?;
                for (i, arg) in p.type_args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
        }
    }
}
