// src/generator/new.rs
//
// Building values of a given type from nothing: constructor calls, array
// literals, lambdas, function references and, for abstract types with no
// concrete subtype yet, a fresh implementing class.

use tracing::{debug, trace};

use super::{ExprOpts, Generator};
use crate::ast::{ClassDecl, ClassKind, Decl, Expr, FuncKind, LambdaDecl, ParamDecl, SuperClassInst};
use crate::builtins::BuiltinKind;
use crate::context::Namespace;
use crate::errors::{GenerateError, Result};
use crate::type_utils::{abstract_members, find_sam_signature, find_subtypes, is_sam};
use crate::types::{Type, TypeVarMap};

impl Generator<'_> {
    /// A constructor-like expression of type `ty`: `new`, a literal, a
    /// lambda or a function reference. Falls back to a placeholder for
    /// types with no constructible value.
    pub(crate) fn gen_new(&mut self, ty: &Type, sam_coercion: bool) -> Result<Expr> {
        match ty {
            Type::TypeParam(_) | Type::Wildcard(_) => Ok(Expr::Unresolved(ty.clone())),
            Type::Constructor(_) => {
                let concrete = self.concretize(ty);
                if concrete.is_type_constructor() {
                    return Ok(Expr::Unresolved(self.catalog.any_type()));
                }
                self.gen_new(&concrete, sam_coercion)
            }
            Type::Builtin(b) => match b.kind {
                BuiltinKind::Any => Ok(Expr::New {
                    class_type: ty.clone(),
                    args: Vec::new(),
                }),
                BuiltinKind::Nothing | BuiltinKind::Void => Ok(Expr::Unresolved(ty.clone())),
                _ => self.gen_constant(ty),
            },
            Type::Parameterized(p) if p.ctor.builtin => {
                if ty.is_function_type() {
                    self.gen_func_ref_lambda(ty)
                } else if p.ctor.name == self.catalog.array_ctor().name
                    || p.ctor.name == self.catalog.array_list_ctor().name
                {
                    self.gen_array_expr(ty)
                } else {
                    Ok(Expr::Unresolved(ty.clone()))
                }
            }
            Type::Simple(_) | Type::Parameterized(_) => self.gen_new_class(ty, sam_coercion),
        }
    }

    fn gen_new_class(&mut self, ty: &Type, sam_coercion: bool) -> Result<Expr> {
        if self.is_blacklisted(ty.name()) {
            return Ok(Expr::Unresolved(ty.clone()));
        }
        if sam_coercion && self.chance(self.config.prob.sam_coercion) && is_sam(&self.context, ty) {
            if let Some(signature) = find_sam_signature(&self.context, &self.catalog, ty) {
                if let Some((params, ret)) = signature.function_signature() {
                    let (params, ret) = (params.to_vec(), ret.clone());
                    return self.gen_lambda(params, ret, Some(ty.clone()));
                }
            }
        }
        let Some((class, map)) = self.receiver_map(ty) else {
            return Ok(Expr::Unresolved(ty.clone()));
        };
        if class.kind == ClassKind::Regular {
            return self.gen_new_instance(ty, &class, &map);
        }

        let classes: Vec<ClassDecl> = self
            .classes()
            .into_iter()
            .filter(|c| !self.is_blacklisted(&c.name))
            .collect();
        let refs: Vec<&ClassDecl> = classes.iter().collect();
        let subtypes = find_subtypes(ty, &refs, &[], false, true);
        let sub = match self.pick(&subtypes) {
            Some(Type::Constructor(ctor)) => self.instantiate(&ctor, None).map(|(t, _)| t),
            other => other,
        };
        match sub {
            Some(sub) if sub.is_subtype(ty) => self.gen_new(&sub, false),
            _ => self.gen_class_for_bottom_constant(ty),
        }
    }

    /// `new C(args)` with one argument per field of `class`, viewed through
    /// `map`. Self-referencing fields get placeholders.
    pub(crate) fn gen_new_instance(
        &mut self,
        ty: &Type,
        class: &ClassDecl,
        map: &TypeVarMap,
    ) -> Result<Expr> {
        let limit = 2 * self.config.limits.max_depth;
        let args = self.nested(1, |g| {
            class
                .fields
                .iter()
                .map(|field| {
                    let field_ty = field.ty.substitute(map);
                    let opts = ExprOpts {
                        gen_bottom: field.ty.name() == class.name || g.frame.depth > limit,
                        ..ExprOpts::default()
                    };
                    g.generate_expr(&field_ty, opts)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Expr::New {
            class_type: ty.clone(),
            args,
        })
    }

    /// Declare a final class implementing the abstract type `ty` and
    /// instantiate it. Types mentioning type variables cannot be
    /// implemented at the top level and yield a placeholder.
    fn gen_class_for_bottom_constant(&mut self, ty: &Type) -> Result<Expr> {
        if ty.has_type_variables() {
            return Ok(Expr::Unresolved(ty.clone()));
        }
        let Some((sup, map)) = self.receiver_map(ty) else {
            return Ok(Expr::Unresolved(ty.clone()));
        };
        let name = self.state.class_name();
        let global = Namespace::global();
        let ns = global.child(&name);
        debug!(name = %name, implements = %ty, "implementing class");

        self.with_namespace(ns.clone(), |g| {
            g.frame.capture_root = None;
            g.frame.in_value_branch = false;
            g.frame.inside_func_body = false;
            g.frame.in_super_call = false;
            g.frame.allow_bottom_consts = true;

            let args = if sup.is_interface() {
                None
            } else {
                Some(g.gen_super_args(&sup, &map)?)
            };
            let mut class = ClassDecl::new(name.clone(), ClassKind::Regular);
            class.is_final = true;
            class.superclasses.push(SuperClassInst {
                class_type: ty.clone(),
                args,
            });
            g.context.add_class(&global, class)?;
            g.with_blacklisted(&name, |g| {
                for (func, m) in abstract_members(&g.context, ty) {
                    g.gen_func_from_existing(&ns, &func, &m, true)?;
                }
                Ok::<_, GenerateError>(())
            })
        })?;

        Ok(Expr::New {
            class_type: self
                .class_decl(&name)
                .map(|c| c.get_type())
                .unwrap_or_else(|| ty.clone()),
            args: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Function values
    // -----------------------------------------------------------------------

    /// A value of function type `ty`: a reference to a declared function
    /// with exactly that signature, or a lambda.
    pub(crate) fn gen_func_ref_lambda(&mut self, ty: &Type) -> Result<Expr> {
        let Some((params, ret)) = ty.function_signature() else {
            return Ok(Expr::Unresolved(ty.clone()));
        };
        let (params, ret) = (params.to_vec(), ret.clone());
        if !self.frame.in_super_call && self.chance(self.config.prob.func_ref) {
            let refs = self.matching_func_refs(ty, &params, &ret);
            if let Some(r) = self.pick(&refs) {
                trace!(signature = %ty, "function reference");
                return Ok(r);
            }
        }
        self.gen_lambda(params, ret, None)
    }

    /// References to non-generic functions whose signature is exactly
    /// `params -> ret`: visible top-level functions and methods of the
    /// enclosing class (not ones being generated right now), and methods
    /// of in-scope receivers.
    fn matching_func_refs(&self, ty: &Type, params: &[Type], ret: &Type) -> Vec<Expr> {
        let lineage = self.frame.namespace.segments();
        let mut out = Vec::new();
        for func in self.context.get_funcs(&self.frame.namespace, true) {
            if func.is_parameterized()
                || func.kind == FuncKind::Nested
                || lineage.contains(&func.name)
                || &func.ret_type != ret
                || func.param_types() != params
            {
                continue;
            }
            let receiver = match func.kind {
                FuncKind::ClassMethod => match self.this_type() {
                    Some(this) => Some(Box::new(Expr::variable("this", this))),
                    None => continue,
                },
                _ => None,
            };
            out.push(Expr::FunctionRef {
                receiver,
                name: func.name.clone(),
                signature: ty.clone(),
            });
        }
        for decl in self.visible_vars() {
            let Some(var_ty) = decl.var_type() else {
                continue;
            };
            let Some((class, map)) = self.receiver_map(var_ty) else {
                continue;
            };
            for func in class.functions.iter().filter(|f| !f.is_parameterized()) {
                let fparams: Vec<Type> = func.params.iter().map(|p| p.ty.substitute(&map)).collect();
                if func.ret_type.substitute(&map) == *ret && fparams == params {
                    out.push(Expr::FunctionRef {
                        receiver: Some(Box::new(Expr::variable(decl.name(), var_ty.clone()))),
                        name: func.name.clone(),
                        signature: ty.clone(),
                    });
                }
            }
        }
        out
    }

    /// The type of `this` in the current namespace, when inside a class.
    pub(crate) fn this_type(&self) -> Option<Type> {
        let segments = self.frame.namespace.segments();
        let class_name = segments.get(1).filter(|s| super::starts_uppercase(s))?;
        let class = self.class_decl(class_name)?;
        Some(match class.get_type() {
            Type::Constructor(ctor) => ctor.apply(
                class
                    .type_params
                    .iter()
                    .cloned()
                    .map(Type::TypeParam)
                    .collect(),
            ),
            simple => simple,
        })
    }

    /// A lambda taking `params` and returning `ret`, generated in its own
    /// namespace. Locals of enclosing functions are only read when final.
    pub(crate) fn gen_lambda(
        &mut self,
        params: Vec<Type>,
        ret: Type,
        sam_target: Option<Type>,
    ) -> Result<Expr> {
        self.lambda_counter += 1;
        let name = format!("lambda_{}", self.lambda_counter);
        let parent = self.frame.namespace.clone();
        let ns = parent.child(&name);

        let lambda = self.with_namespace(ns.clone(), |g| {
            g.frame.capture_root = Some(ns.clone());
            g.frame.in_value_branch = false;
            g.frame.inside_func_body = true;

            let mut decls = Vec::with_capacity(params.len());
            for ty in &params {
                let param = ParamDecl::new(g.state.word(), ty.clone());
                g.context.add_var(&ns, Decl::Param(param.clone()))?;
                decls.push(param);
            }
            let body = g.gen_func_body(&ret)?;
            Ok::<_, GenerateError>(LambdaDecl {
                name: name.clone(),
                params: decls,
                signature: g.catalog.function_type(params.clone(), ret.clone()),
                ret_type: ret.clone(),
                body: Box::new(body),
                sam_target,
            })
        })?;
        self.context.add_lambda(&parent, lambda.clone())?;
        Ok(Expr::Lambda(Box::new(lambda)))
    }
}
