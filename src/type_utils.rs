// src/type_utils.rs
//
// Algorithms over the type model: unification, instantiation of generic
// classes and functions, SAM detection and subtype search.

use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;

use crate::ast::{ClassDecl, FuncDecl};
use crate::builtins::Catalog;
use crate::context::{Context, Namespace};
use crate::errors::{GenerateError, Result};
use crate::types::{Type, TypeConstructor, TypeParameter, TypeVarMap, Variance, WildcardType};

/// Per type parameter name: whether a use-site `out` / `in` projection is
/// sound, as `(covariant_ok, contravariant_ok)`.
pub type VarianceChoices = FxHashMap<String, (bool, bool)>;

// ---------------------------------------------------------------------------
// Unification
// ---------------------------------------------------------------------------

/// Unify `expected` with `actual`, binding type parameters on either side.
///
/// Returns `None` when the two types cannot be made equal, when the same
/// parameter would need two different bindings, or when a binding violates
/// the parameter's bound.
pub fn unify(expected: &Type, actual: &Type) -> Option<TypeVarMap> {
    let mut map = TypeVarMap::new();
    if unify_into(expected, actual, &mut map) {
        Some(map)
    } else {
        None
    }
}

/// `unify` where the request cannot continue without a binding: a
/// mismatch is a `Unification` error instead of a rejected candidate.
pub fn unify_required(expected: &Type, actual: &Type) -> Result<TypeVarMap> {
    unify(expected, actual).ok_or_else(|| GenerateError::Unification {
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

fn bind(param: &TypeParameter, ty: &Type, map: &mut TypeVarMap) -> bool {
    if let Type::TypeParam(other) = ty {
        if other.name == param.name {
            return true;
        }
    }
    if let Some(existing) = map.get(param) {
        return existing == ty;
    }
    if let Some(bound) = &param.bound {
        let bound = bound.substitute(map);
        if !ty.is_subtype(&bound) {
            return false;
        }
    }
    map.insert(param.clone(), ty.clone());
    true
}

fn unify_into(expected: &Type, actual: &Type, map: &mut TypeVarMap) -> bool {
    match (expected, actual) {
        (_, Type::TypeParam(param)) => bind(param, expected, map),
        (Type::TypeParam(param), _) => bind(param, actual, map),
        (Type::Parameterized(a), Type::Parameterized(b)) => {
            if a.ctor.name != b.ctor.name || a.type_args.len() != b.type_args.len() {
                return false;
            }
            a.type_args
                .iter()
                .zip(&b.type_args)
                .all(|(x, y)| unify_into(x, y, map))
        }
        (Type::Wildcard(a), Type::Wildcard(b)) => {
            if a.variance != b.variance {
                return false;
            }
            match (a.bound.as_deref(), b.bound.as_deref()) {
                (Some(x), Some(y)) => unify_into(x, y, map),
                (None, None) => true,
                _ => false,
            }
        }
        _ => expected == actual,
    }
}

// ---------------------------------------------------------------------------
// Instantiation
// ---------------------------------------------------------------------------

/// Types a type parameter may be instantiated with: reference types only,
/// within the parameter's bound.
fn candidates_for(param: &TypeParameter, types: &[Type], map: &TypeVarMap) -> Vec<Type> {
    let bound = param.bound.as_deref().map(|b| b.substitute(map));
    types
        .iter()
        .filter(|t| !t.is_primitive() && !t.is_void() && !t.is_type_constructor())
        .filter(|t| !t.is_bottom() && !t.is_wildcard())
        .filter(|t| bound.as_ref().is_none_or(|b| t.is_subtype(b)))
        .cloned()
        .collect()
}

fn pick_arg<R: Rng>(
    rng: &mut R,
    param: &TypeParameter,
    types: &[Type],
    map: &TypeVarMap,
) -> Option<Type> {
    let candidates = candidates_for(param, types, map);
    if let Some(t) = candidates.choose(rng) {
        return Some(t.clone());
    }
    // Fall back to the bound itself when it is concrete.
    let bound = param.bound.as_deref()?.substitute(map);
    if bound.is_type_var() || bound.is_type_constructor() {
        None
    } else {
        Some(bound)
    }
}

/// Instantiate `ctor` with arguments drawn from `types`.
///
/// Parameters already bound in `partial` keep their binding. With
/// `variance_choices`, invariant parameters may be projected: in PECS mode
/// the projection follows how the parameter is used (`out` for producers,
/// `in` for consumers), otherwise it is picked at random among the sound
/// ones. Returns the parameterized type and the map from the constructor's
/// parameters to the concrete (unprojected) arguments.
pub fn instantiate_type_constructor<R: Rng>(
    rng: &mut R,
    ctor: &TypeConstructor,
    types: &[Type],
    partial: Option<&TypeVarMap>,
    variance_choices: Option<&VarianceChoices>,
    enable_pecs: bool,
) -> Option<(Type, TypeVarMap)> {
    let mut map = TypeVarMap::new();
    let mut args = Vec::with_capacity(ctor.type_parameters.len());
    for param in &ctor.type_parameters {
        let concrete = match partial.and_then(|p| p.get(param)) {
            Some(t) => t.clone(),
            None => pick_arg(rng, param, types, &map)?,
        };
        map.insert(param.clone(), concrete.clone());
        let projected = match (param.variance, variance_choices.and_then(|c| c.get(&param.name))) {
            (Variance::Invariant, Some(&(cov_ok, contra_ok))) if !concrete.is_wildcard() => {
                project(rng, concrete, cov_ok, contra_ok, enable_pecs)
            }
            _ => concrete,
        };
        args.push(projected);
    }
    Some((ctor.apply(args), map))
}

fn project<R: Rng>(rng: &mut R, ty: Type, cov_ok: bool, contra_ok: bool, pecs: bool) -> Type {
    let variance = match (cov_ok, contra_ok, pecs) {
        (true, false, true) => Variance::Covariant,
        (false, true, true) => Variance::Contravariant,
        (true, true, _) => *[Variance::Covariant, Variance::Contravariant, Variance::Invariant]
            .choose(rng)
            .unwrap_or(&Variance::Invariant),
        (true, false, false) if rng.gen_bool(0.5) => Variance::Covariant,
        (false, true, false) if rng.gen_bool(0.5) => Variance::Contravariant,
        _ => Variance::Invariant,
    };
    match variance {
        Variance::Covariant => Type::Wildcard(WildcardType::extends(ty)),
        Variance::Contravariant => Type::Wildcard(WildcardType::super_of(ty)),
        Variance::Invariant => ty,
    }
}

/// Bind every parameter of a generic function not already fixed by
/// `partial` (typically the receiver's type arguments).
pub fn instantiate_parameterized_function<R: Rng>(
    rng: &mut R,
    type_params: &[TypeParameter],
    types: &[Type],
    partial: &TypeVarMap,
) -> Option<TypeVarMap> {
    let mut map = partial.clone();
    for param in type_params {
        if map.contains(param) {
            continue;
        }
        let arg = pick_arg(rng, param, types, &map)?;
        map.insert(param.clone(), arg);
    }
    Some(map)
}

/// Which projections are sound for each type parameter of `class`: `out`
/// when the parameter never appears in a method parameter or mutable field,
/// `in` when it never appears in a return type or field.
pub fn variance_choices(class: &ClassDecl) -> VarianceChoices {
    let mut choices = VarianceChoices::default();
    for param in &class.type_params {
        let mentions = |t: &Type| t.type_variables().iter().any(|v| v.name == param.name);
        let in_params = class
            .functions
            .iter()
            .any(|f| f.params.iter().any(|p| mentions(&p.ty)));
        let in_returns = class.functions.iter().any(|f| mentions(&f.ret_type));
        let in_fields = class.fields.iter().any(|f| mentions(&f.ty));
        let in_mutable_fields = class.fields.iter().any(|f| !f.is_final && mentions(&f.ty));
        choices.insert(
            param.name.clone(),
            (!in_params && !in_mutable_fields, !in_returns && !in_fields),
        );
    }
    choices
}

// ---------------------------------------------------------------------------
// SAM detection
// ---------------------------------------------------------------------------

/// Abstract functions reachable from `ty`, with the substitution that maps
/// their signatures into `ty`'s view. Later (more derived) declarations of
/// the same name win.
fn abstract_members_at(
    ctx: &Context,
    ty: &Type,
    depth: usize,
) -> Option<Vec<(FuncDecl, TypeVarMap)>> {
    if depth > 32 {
        return None;
    }
    let class = ctx.get_class(&Namespace::global(), ty.name(), true)?;
    let map = match ty {
        Type::Parameterized(p) => p.type_var_map(),
        _ => TypeVarMap::new(),
    };
    let mut out: Vec<(FuncDecl, TypeVarMap)> = Vec::new();
    for sup in &class.superclasses {
        let sup_ty = sup.class_type.substitute(&map);
        for (f, m) in abstract_members_at(ctx, &sup_ty, depth + 1).unwrap_or_default() {
            if !out.iter().any(|(g, _)| g.name == f.name) {
                out.push((f, m));
            }
        }
    }
    for f in &class.functions {
        out.retain(|(g, _)| g.name != f.name);
        if f.is_abstract() {
            out.push((f.clone(), map.clone()));
        }
    }
    Some(out)
}

/// Abstract functions `ty` leaves unimplemented, own and inherited, each
/// with the map that views its signature through `ty`.
pub fn abstract_members(ctx: &Context, ty: &Type) -> Vec<(FuncDecl, TypeVarMap)> {
    abstract_members_at(ctx, ty, 0).unwrap_or_default()
}

/// Whether `ty` is an interface with exactly one abstract, non-generic
/// function and no fields.
pub fn is_sam(ctx: &Context, ty: &Type) -> bool {
    sam_function(ctx, ty).is_some()
}

fn sam_function(ctx: &Context, ty: &Type) -> Option<(FuncDecl, TypeVarMap)> {
    if !matches!(ty, Type::Simple(_) | Type::Parameterized(_)) || ty.is_builtin() {
        return None;
    }
    let class = ctx.get_class(&Namespace::global(), ty.name(), true)?;
    if !class.is_interface() || !class.fields.is_empty() {
        return None;
    }
    let mut members = abstract_members(ctx, ty);
    if members.len() != 1 {
        return None;
    }
    let (func, map) = members.pop()?;
    if func.is_parameterized() {
        return None;
    }
    Some((func, map))
}

/// The function type a lambda must have to be SAM-converted to `ty`.
pub fn find_sam_signature(ctx: &Context, catalog: &Catalog, ty: &Type) -> Option<Type> {
    let (func, map) = sam_function(ctx, ty)?;
    let params: Vec<Type> = func.params.iter().map(|p| p.ty.substitute(&map)).collect();
    let ret = func.ret_type.substitute(&map);
    if params.iter().any(Type::has_wildcards) || ret.has_wildcards() {
        return None;
    }
    Some(catalog.function_type(params, ret))
}

// ---------------------------------------------------------------------------
// Subtype search
// ---------------------------------------------------------------------------

/// Subtypes of `ty` among user classes and the given builtin types.
///
/// Generic classes whose relation to `ty` fixes all of their type arguments
/// are returned instantiated; generic classes that are subtypes for any
/// arguments are returned as type constructors for the caller to
/// instantiate. Ordering follows `classes`, then `builtins`.
pub fn find_subtypes(
    ty: &Type,
    classes: &[&ClassDecl],
    builtins: &[Type],
    include_self: bool,
    concrete_only: bool,
) -> Vec<Type> {
    let mut out = Vec::new();
    for class in classes {
        if concrete_only && class.is_abstract() {
            continue;
        }
        if !include_self && class.name == ty.name() {
            continue;
        }
        match class.get_type() {
            Type::Constructor(ctor) => {
                if let Some(t) = subtype_instance(&ctor, ty) {
                    out.push(t);
                }
            }
            simple => {
                if simple.is_subtype(ty) {
                    out.push(simple);
                }
            }
        }
    }
    for b in builtins {
        if b.is_type_constructor() || (!include_self && b == ty) {
            continue;
        }
        if b.is_subtype(ty) {
            out.push(b.clone());
        }
    }
    out
}

/// Instantiate `ctor` so that it is a subtype of `target`, if possible.
fn subtype_instance(ctor: &TypeConstructor, target: &Type) -> Option<Type> {
    let generic = Type::Constructor(ctor.clone());
    if target.is_top() {
        return Some(generic);
    }
    if ctor.name == target.name() {
        if target.is_parameterized() && !target.has_wildcards() {
            return Some(target.clone());
        }
        return None;
    }
    // Walk the supertype closure looking for the target's constructor.
    let self_args: Vec<Type> = ctor
        .type_parameters
        .iter()
        .cloned()
        .map(Type::TypeParam)
        .collect();
    let as_self = ctor.apply(self_args);
    for st in as_self.all_supertypes().into_iter().skip(1) {
        if st.name() != target.name() {
            continue;
        }
        if !st.has_type_variables() {
            return st.is_subtype(target).then_some(generic);
        }
        if target.has_wildcards() {
            return None;
        }
        let map = unify(target, &st)?;
        if ctor.type_parameters.iter().all(|p| map.contains(p)) {
            let args = ctor
                .type_parameters
                .iter()
                .map(|p| map.get(p).cloned())
                .collect::<Option<Vec<_>>>()?;
            let inst = ctor.apply(args);
            return inst.is_subtype(target).then_some(inst);
        }
        return None;
    }
    None
}

#[cfg(test)]
mod tests;
