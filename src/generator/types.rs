// src/generator/types.rs
//
// Choosing types: candidate lists filtered by position, instantiation of
// type constructors, and fresh type parameters.

use rand::Rng;

use super::Generator;
use crate::ast::ClassKind;
use crate::builtins::Language;
use crate::errors::{GenerateError, Result};
use crate::names::caps;
use crate::type_utils::instantiate_type_constructor;
use crate::types::{Type, TypeConstructor, TypeParameter, TypeVarMap, Variance};

/// Filters for `get_types`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeOpts {
    /// Include the void type (return positions).
    pub ret_types: bool,
    pub exclude_arrays: bool,
    /// Skip `out` type parameters (input positions).
    pub exclude_covariants: bool,
    /// Skip `in` type parameters (output positions).
    pub exclude_contravariants: bool,
    pub exclude_type_vars: bool,
    pub exclude_function_types: bool,
}

impl TypeOpts {
    /// Types usable as type arguments.
    pub fn type_args() -> Self {
        Self {
            exclude_arrays: true,
            exclude_covariants: true,
            exclude_contravariants: true,
            exclude_function_types: true,
            ..Self::default()
        }
    }
}

impl Generator<'_> {
    /// Candidate types at the current position: user classes (none once
    /// the depth limit is hit), type parameters in scope, builtins and
    /// function type constructors. Constructors come back unapplied.
    pub(crate) fn get_types(&mut self, opts: TypeOpts) -> Vec<Type> {
        let mut types: Vec<Type> = if self.frame.depth >= self.config.limits.max_depth {
            Vec::new()
        } else {
            self.classes().iter().map(|c| c.get_type()).collect()
        };

        if !opts.exclude_type_vars {
            let params: Vec<Type> = self
                .context
                .get_types(&self.frame.namespace, true)
                .into_iter()
                .filter(|tp| !(opts.exclude_covariants && tp.variance.is_covariant()))
                .filter(|tp| !(opts.exclude_contravariants && tp.variance.is_contravariant()))
                .cloned()
                .map(Type::TypeParam)
                .collect();
            if !params.is_empty() && self.chance(self.config.prob.type_params_only) {
                return params;
            }
            types.extend(params);
        }

        types.extend(
            self.catalog
                .non_bottom_types()
                .into_iter()
                .filter(|t| !(opts.exclude_arrays && t.name() == self.catalog.array_ctor().name)),
        );
        if opts.ret_types {
            types.push(self.catalog.void_type());
        }
        if !opts.exclude_function_types {
            for arity in 0..=self.config.limits.max_functional_params {
                types.push(Type::Constructor(self.catalog.function_ctor(arity)));
            }
        }
        types
    }

    /// A random type from `get_types`. Type constructors are instantiated,
    /// so the result is never a bare constructor.
    pub(crate) fn select_type(&mut self, opts: TypeOpts) -> Result<Type> {
        let types = self.get_types(opts);
        let ty = self
            .pick(&types)
            .ok_or_else(|| GenerateError::no_candidate("type", &self.frame.namespace))?;
        match ty {
            Type::Constructor(ctor) => Ok(self
                .instantiate(&ctor, None)
                .map(|(t, _)| t)
                .unwrap_or_else(|| self.catalog.any_type())),
            other => Ok(other),
        }
    }

    /// Instantiate `ctor` with type arguments chosen at the current
    /// position, keeping the bindings in `partial`.
    pub(crate) fn instantiate(
        &mut self,
        ctor: &TypeConstructor,
        partial: Option<&TypeVarMap>,
    ) -> Option<(Type, TypeVarMap)> {
        let is_array = ctor.builtin && ctor.name == self.catalog.array_ctor().name;
        let opts = TypeOpts {
            // Arrays of type variables cannot be created in Java.
            exclude_type_vars: is_array,
            ..TypeOpts::type_args()
        };
        let types = self.get_types(opts);
        instantiate_type_constructor(&mut self.state.rng, ctor, &types, partial, None, false)
    }

    /// Make `ty` a value type: wildcards become their bounds and bare
    /// constructors are instantiated.
    pub(crate) fn concretize(&mut self, ty: &Type) -> Type {
        let top = self.catalog.any_type();
        match ty {
            Type::Constructor(ctor) => self
                .instantiate(ctor, None)
                .map(|(t, _)| t)
                .unwrap_or(top),
            Type::Wildcard(_) => ty.to_variance_free(&top),
            Type::Parameterized(p) if ty.has_wildcards() => {
                let free = ty.to_variance_free(&top);
                // An unbounded wildcard widened to the top type may break the
                // parameter's own bound; fall back to the bound then.
                let args = p
                    .ctor
                    .type_parameters
                    .iter()
                    .zip(free.type_args())
                    .map(|(param, arg)| match param.bound_rec() {
                        Some(bound) if !arg.is_subtype(&bound) => bound,
                        _ => arg.clone(),
                    })
                    .collect();
                p.ctor.apply(args)
            }
            other => other.clone(),
        }
    }

    /// Fresh type parameters registered in the current namespace.
    ///
    /// With no `count`, a coin decides whether there are any at all.
    /// Function type parameters are prefixed `F_`; `blacklist` holds
    /// letters already taken.
    pub(crate) fn gen_type_params(
        &mut self,
        count: Option<usize>,
        with_variance: bool,
        blacklist: &[String],
        for_function: bool,
    ) -> Result<Vec<TypeParameter>> {
        if count.is_none() && self.coin() {
            return Ok(Vec::new());
        }
        let min = count.unwrap_or(1);
        let max = self.config.limits.max_type_params.max(min);
        let n = self.state.rng.gen_range(min..=max);
        // Java has no declaration-site variance.
        let with_variance = with_variance && self.language == Language::Kotlin;

        let mut taken = blacklist.to_vec();
        let mut params = Vec::with_capacity(n);
        for _ in 0..n {
            let Some(letter) = caps(&mut self.state.rng, &taken) else {
                break;
            };
            taken.push(letter.clone());
            let name = if for_function {
                format!("F_{letter}")
            } else {
                letter
            };
            let variance = if with_variance && self.coin() {
                if self.coin() {
                    Variance::Covariant
                } else {
                    Variance::Contravariant
                }
            } else {
                Variance::Invariant
            };
            let mut param = TypeParameter::new(name).with_variance(variance);
            if self.chance(self.config.prob.bounded_type_parameters) {
                let bound = self.select_type(TypeOpts {
                    exclude_type_vars: false,
                    ..TypeOpts::type_args()
                })?;
                if !bound.has_wildcards() {
                    param = param.with_bound(bound.box_type());
                }
            }
            self.context.add_type(&self.frame.namespace, param.clone())?;
            params.push(param);
        }
        Ok(params)
    }

    /// Kind of a new class. A class that must hold a field cannot be an
    /// interface.
    pub(crate) fn select_class_kind(&mut self, needs_field: bool) -> ClassKind {
        let kinds: &[ClassKind] = if needs_field {
            &[ClassKind::Regular, ClassKind::Abstract]
        } else {
            &[ClassKind::Regular, ClassKind::Abstract, ClassKind::Interface]
        };
        self.pick(kinds).unwrap_or(ClassKind::Regular)
    }

    /// Names of type parameters visible from the current namespace, with
    /// the function prefix stripped.
    pub(crate) fn visible_type_letters(&self) -> Vec<String> {
        self.context
            .get_types(&self.frame.namespace, true)
            .into_iter()
            .map(|tp| tp.name.trim_start_matches("F_").to_string())
            .collect()
    }
}
