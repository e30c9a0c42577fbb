// src/types/subst.rs

use smallvec::SmallVec;

use super::{ParameterizedType, Type, TypeParameter, WildcardType};

/// A substitution from type parameters to types.
///
/// Keys are matched by parameter name; insertion order is preserved so that
/// iteration is deterministic for a given seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeVarMap {
    entries: SmallVec<[(TypeParameter, Type); 4]>,
}

impl TypeVarMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, param: &TypeParameter) -> Option<&Type> {
        self.get_by_name(&param.name)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Type> {
        self.entries
            .iter()
            .find(|(k, _)| k.name == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, param: &TypeParameter) -> bool {
        self.get(param).is_some()
    }

    /// Insert or replace the binding for `param`.
    pub fn insert(&mut self, param: TypeParameter, ty: Type) {
        match self.entries.iter_mut().find(|(k, _)| k.name == param.name) {
            Some(slot) => slot.1 = ty,
            None => self.entries.push((param, ty)),
        }
    }

    pub fn remove(&mut self, param: &TypeParameter) -> Option<Type> {
        let idx = self.entries.iter().position(|(k, _)| k.name == param.name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeParameter, &Type)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &TypeParameter> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Add every binding of `other` that is not already present.
    pub fn extend_missing(&mut self, other: &TypeVarMap) {
        for (k, v) in other.iter() {
            if !self.contains(k) {
                self.entries.push((k.clone(), v.clone()));
            }
        }
    }
}

impl FromIterator<(TypeParameter, Type)> for TypeVarMap {
    fn from_iter<I: IntoIterator<Item = (TypeParameter, Type)>>(iter: I) -> Self {
        let mut map = TypeVarMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Type {
    /// Apply `map` to every type parameter occurring in this type.
    ///
    /// Unmapped parameters are kept, with their bounds substituted.
    pub fn substitute(&self, map: &TypeVarMap) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::TypeParam(tp) => match map.get(tp) {
                Some(replacement) => replacement.clone(),
                None => Type::TypeParam(TypeParameter {
                    name: tp.name.clone(),
                    variance: tp.variance,
                    bound: tp.bound.as_ref().map(|b| Box::new(b.substitute(map))),
                }),
            },
            Type::Parameterized(p) => Type::Parameterized(ParameterizedType {
                ctor: p.ctor.clone(),
                type_args: p.type_args.iter().map(|arg| arg.substitute(map)).collect(),
            }),
            Type::Wildcard(w) => Type::Wildcard(WildcardType {
                bound: w.bound.as_ref().map(|b| Box::new(b.substitute(map))),
                variance: w.variance,
            }),
            Type::Builtin(_) | Type::Simple(_) | Type::Constructor(_) => self.clone(),
        }
    }
}
