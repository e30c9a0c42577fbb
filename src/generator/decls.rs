// src/generator/decls.rs
//
// Declarations: variables, functions (top-level, methods, nested), classes
// with their fields, methods and supertypes, and function bodies.

use std::rc::Rc;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

use super::{ExprOpts, Generator, TypeOpts, starts_uppercase};
use crate::ast::{
    Block, ClassDecl, ClassKind, Decl, Expr, FieldDecl, FuncDecl, FuncKind, ParamDecl, Stmt,
    SuperClassInst, VarDecl,
};
use crate::builtins::{BuiltinKind, Language};
use crate::context::Namespace;
use crate::errors::{GenerateError, Result};
use crate::names::caps;
use crate::type_utils::abstract_members;
use crate::types::{Type, TypeParameter, TypeVarMap};

/// Requirements for a generated function. Unset fields are chosen at
/// random.
#[derive(Debug, Clone, Default)]
pub struct FuncSpec {
    pub ret: Option<Type>,
    pub not_void: bool,
    pub class_is_final: bool,
    pub name: Option<String>,
    pub params: Option<Vec<ParamDecl>>,
    /// Member of an abstract class or interface; may be left without body.
    pub is_abstract: bool,
    pub is_interface: bool,
    pub type_params: Option<Vec<TypeParameter>>,
    /// Enclosing namespace; the current one when unset.
    pub namespace: Option<Namespace>,
    pub is_override: bool,
}

/// Requirements for a generated class.
#[derive(Debug, Clone, Default)]
pub struct ClassSpec {
    /// The class must have a field of this type.
    pub field_type: Option<Type>,
    /// The class must have a method returning this type.
    pub fret_type: Option<Type>,
    pub not_void: bool,
    pub type_params: Option<Vec<TypeParameter>>,
    pub name: Option<String>,
    /// The class must have a method with this function type's signature.
    pub signature: Option<Type>,
}

fn func_kind(parent: &Namespace) -> FuncKind {
    if parent.is_global() {
        FuncKind::TopLevel
    } else if parent.len() == 2 && starts_uppercase(parent.last()) {
        FuncKind::ClassMethod
    } else {
        FuncKind::Nested
    }
}

impl Generator<'_> {
    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    /// Declare a variable in the current namespace. `expr`, when given, is
    /// the already generated initializer.
    pub(crate) fn gen_variable_decl(
        &mut self,
        etype: Option<Type>,
        only_leaves: bool,
        expr: Option<Expr>,
    ) -> Result<VarDecl> {
        let ty = match etype {
            Some(t) => t,
            None => self.select_type(TypeOpts::default())?,
        };
        let ty = match ty {
            Type::Wildcard(_) => self.concretize(&ty),
            other => other,
        };
        let ns = self.frame.namespace.clone();
        let expr = match expr {
            Some(e) => e,
            None => self.nested(1, |g| {
                if ns.is_global() {
                    g.frame.allow_bottom_consts = false;
                }
                g.generate_expr(
                    &ty,
                    ExprOpts {
                        only_leaves,
                        sam_coercion: true,
                        ..ExprOpts::default()
                    },
                )
            })?,
        };
        let is_final = self.coin();
        let inferred = self.coin() && self.can_infer(&ns, is_final, &ty, &expr);
        let decl = VarDecl {
            name: self.state.word(),
            ty,
            expr: Rc::new(expr),
            is_final,
            inferred,
        };
        trace!(name = %decl.name, ty = %decl.ty, ns = %ns, "variable");
        self.context.add_var(&ns, Decl::Var(decl.clone()))?;
        Ok(decl)
    }

    /// Whether a declaration may omit its type and let the target compiler
    /// infer it from `expr`.
    fn can_infer(&self, ns: &Namespace, is_final: bool, ty: &Type, expr: &Expr) -> bool {
        if !is_final || (ns.is_global() && self.language == Language::Java) {
            return false;
        }
        if matches!(
            expr,
            Expr::Lambda(_) | Expr::FunctionRef { .. } | Expr::Unresolved(_) | Expr::Array { .. }
        ) {
            return false;
        }
        // Java cannot infer a local from a conditional that may hold lambdas.
        if self.language == Language::Java && matches!(expr, Expr::Conditional { .. }) {
            return false;
        }
        // Small integer literals infer as Int.
        if let Expr::Constant { ty: cty, .. } = expr {
            if matches!(
                cty.builtin_kind(),
                Some(BuiltinKind::Byte | BuiltinKind::Short | BuiltinKind::Number)
            ) {
                return false;
            }
        }
        expr.ty().as_ref() == Some(ty)
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    /// Generate a function per `spec` and register it in its enclosing
    /// namespace (and class). The body is generated after the signature
    /// and parameters are registered.
    pub(crate) fn gen_func_decl(&mut self, spec: FuncSpec) -> Result<FuncDecl> {
        let name = match spec.name.clone() {
            Some(n) => n,
            None => self.state.word(),
        };
        let parent = spec
            .namespace
            .clone()
            .unwrap_or_else(|| self.frame.namespace.clone());
        let kind = func_kind(&parent);
        let ns = parent.child(&name);

        self.with_namespace(ns.clone(), |g| {
            g.frame.capture_root = (kind == FuncKind::Nested).then(|| ns.clone());
            g.frame.in_value_branch = false;
            g.frame.inside_func_body = false;
            g.frame.in_super_call = false;

            let can_override = spec.is_abstract
                || spec.is_interface
                || (kind == FuncKind::ClassMethod && !spec.class_is_final && g.coin());

            let mut type_params = match (&spec.type_params, kind) {
                (_, FuncKind::Nested) => Vec::new(),
                (Some(tps), _) => {
                    for tp in tps {
                        g.context.add_type(&ns, tp.clone())?;
                    }
                    tps.clone()
                }
                (None, _) if g.chance(g.config.prob.parameterized_functions) => {
                    let taken = g.visible_type_letters();
                    g.gen_type_params(Some(1), false, &taken, true)?
                }
                (None, _) => Vec::new(),
            };

            let mut params = match spec.params.clone() {
                Some(ps) => ps,
                None => g.gen_func_params(&parent, spec.is_interface)?,
            };

            let mut ret = match spec.ret.clone() {
                Some(t) => t,
                None => g.gen_return_type(&params, spec.not_void)?,
            };

            let has_body =
                !spec.is_interface && !(spec.is_abstract && g.chance(g.config.prob.abstract_body));

            g.remove_unused_type_params(&ns, &mut type_params, &mut params, &mut ret)?;

            let mut decl = FuncDecl {
                name: name.clone(),
                params,
                ret_type: ret,
                body: has_body.then(|| Rc::new(Expr::Unresolved(g.catalog.void_type()))),
                kind,
                type_params,
                is_final: !can_override,
                is_override: spec.is_override,
            };
            debug!(name = %name, kind = %kind, ret = %decl.ret_type, ns = %parent, "function");
            g.attach(&parent, Decl::Func(decl.clone()))?;
            for p in &decl.params {
                g.context.add_var(&ns, Decl::Param(p.clone()))?;
            }

            if has_body {
                g.frame.inside_func_body = true;
                let body = g.gen_func_body(&decl.ret_type)?;
                decl.body = Some(Rc::new(body));
                g.update_func(&parent, &decl)?;
            }
            Ok(decl)
        })
    }

    /// Parameters of a new function. Unless the function is an interface
    /// member, trailing parameters may carry default values generated in
    /// the enclosing namespace.
    fn gen_func_params(&mut self, parent: &Namespace, is_interface: bool) -> Result<Vec<ParamDecl>> {
        let with_defaults = !is_interface && self.chance(self.config.prob.default_params);
        let count = self.state.rng.gen_range(0..=self.config.limits.func.max_params);
        let mut params = Vec::with_capacity(count);
        let mut defaults_started = false;
        for _ in 0..count {
            let mut param = self.gen_param_decl(None)?;
            if with_defaults && (defaults_started || self.coin()) {
                defaults_started = true;
                let ty = param.ty.clone();
                let default = self.scoped(|g| {
                    g.frame.namespace = parent.clone();
                    g.generate_expr(
                        &ty,
                        ExprOpts {
                            only_leaves: true,
                            ..ExprOpts::default()
                        },
                    )
                })?;
                param.default = Some(Rc::new(default));
            }
            params.push(param);
        }
        Ok(params)
    }

    pub(crate) fn gen_param_decl(&mut self, etype: Option<&Type>) -> Result<ParamDecl> {
        let ty = match etype {
            Some(Type::Wildcard(w)) => match w.bound.as_deref() {
                Some(bound) => bound.clone(),
                None => self.catalog.any_type(),
            },
            Some(t) => t.clone(),
            None => self.select_type(TypeOpts {
                exclude_covariants: true,
                ..TypeOpts::default()
            })?,
        };
        Ok(ParamDecl::new(self.state.word(), ty))
    }

    fn gen_return_type(&mut self, params: &[ParamDecl], not_void: bool) -> Result<Type> {
        let param_types: Vec<Type> = params
            .iter()
            .map(|p| p.ty.clone())
            .filter(|t| !matches!(t, Type::TypeParam(tp) if tp.variance.is_contravariant()))
            .collect();
        if !param_types.is_empty() && self.chance(self.config.prob.return_param_type) {
            if let Some(t) = self.pick(&param_types) {
                return Ok(t);
            }
        }
        self.select_type(TypeOpts {
            ret_types: !not_void,
            exclude_contravariants: true,
            ..TypeOpts::default()
        })
    }

    /// Drop type parameters that occur in neither the parameters nor the
    /// return type. Each is replaced by its bound (or the top type) in the
    /// bounds of the remaining ones.
    pub(super) fn remove_unused_type_params(
        &mut self,
        ns: &Namespace,
        type_params: &mut Vec<TypeParameter>,
        params: &mut [ParamDecl],
        ret: &mut Type,
    ) -> Result<()> {
        if type_params.is_empty() {
            return Ok(());
        }
        let mut used: Vec<String> = ret.type_variables().into_iter().map(|t| t.name).collect();
        for p in params.iter() {
            used.extend(p.ty.type_variables().into_iter().map(|t| t.name));
        }
        let mut map = TypeVarMap::new();
        for tp in type_params.iter() {
            if !used.contains(&tp.name) {
                let replacement = tp.bound_rec().unwrap_or_else(|| self.catalog.any_type());
                map.insert(tp.clone(), replacement);
            }
        }
        if map.is_empty() {
            return Ok(());
        }
        for tp in type_params.iter() {
            self.context.remove_type(ns, &tp.name);
        }
        let kept: Vec<TypeParameter> = type_params
            .iter()
            .filter(|tp| !map.contains(tp))
            .map(|tp| match Type::TypeParam(tp.clone()).substitute(&map) {
                Type::TypeParam(updated) => updated,
                _ => tp.clone(),
            })
            .collect();
        for tp in &kept {
            self.context.add_type(ns, tp.clone())?;
        }
        for p in params.iter_mut() {
            p.ty = p.ty.substitute(&map);
        }
        *ret = ret.substitute(&map);
        trace!(pruned = map.len(), kept = kept.len(), "unused type parameters");
        *type_params = kept;
        Ok(())
    }

    /// Body of the function or closure whose namespace is current.
    ///
    /// Non-void bodies without local declarations may be a bare expression.
    /// Otherwise the body is a block: local declarations, side effects, an
    /// optional loop, and the result expression last.
    pub(crate) fn gen_func_body(&mut self, ret: &Type) -> Result<Expr> {
        let is_void = ret.is_void();
        let expr_type = if is_void {
            self.select_type(TypeOpts::default())?
        } else {
            ret.clone()
        };
        let expr = self.generate_expr(
            &expr_type,
            ExprOpts {
                sam_coercion: true,
                ..ExprOpts::default()
            },
        )?;
        let result = if is_void {
            self.as_statement(expr)?
        } else {
            Some(expr)
        };

        if !is_void && self.local_decls().is_empty() && self.chance(self.config.prob.function_expr)
        {
            if let Some(e) = result {
                return Ok(e);
            }
        }

        let mut exprs: Vec<Stmt> = Vec::new();
        let side_effects = self
            .state
            .rng
            .gen_range(0..=self.config.limits.func.max_side_effects);
        for _ in 0..side_effects {
            // Void effects need a call or an assignment, never a leaf.
            let ty = self.select_type(TypeOpts {
                ret_types: self.frame.depth < self.config.limits.max_depth,
                ..TypeOpts::default()
            })?;
            let e = self.generate_expr(&ty, ExprOpts::default())?;
            if let Some(stmt) = self.as_statement(e)? {
                exprs.push(Stmt::Expr(stmt));
            }
        }
        if self.chance(self.config.prob.loop_in_body) {
            exprs.extend(self.generate_loop_expr()?);
        }

        let mut stmts: Vec<Stmt> = self.local_decls().into_iter().map(Stmt::Decl).collect();
        stmts.extend(exprs);
        if let Some(e) = result {
            stmts.push(Stmt::Expr(e));
        }
        Ok(Expr::Block(Block {
            stmts,
            is_func_block: true,
        }))
    }

    /// Use `expr` as a statement. Expressions that are not valid
    /// statements in Java are bound to a fresh local instead, in which case
    /// nothing is returned.
    pub(crate) fn as_statement(&mut self, expr: Expr) -> Result<Option<Expr>> {
        match expr {
            Expr::New { .. }
            | Expr::FunctionCall { .. }
            | Expr::Assignment { .. }
            | Expr::IncDec { .. }
            | Expr::Loop(_)
            | Expr::Print(_) => Ok(Some(expr)),
            other => {
                let ty = match other.ty() {
                    Some(t) if !t.is_void() => t,
                    _ => return Ok(Some(other)),
                };
                self.gen_variable_decl(Some(ty), false, Some(other))?;
                Ok(None)
            }
        }
    }

    /// `main(args: Array<String>)`, generated last with placeholder values
    /// disabled.
    pub(crate) fn gen_main(&mut self) -> Result<FuncDecl> {
        let args = ParamDecl::new("args", self.catalog.array_of(self.catalog.string_type()));
        let void = self.catalog.void_type();
        self.scoped(|g| {
            g.frame.allow_bottom_consts = false;
            g.gen_func_decl(FuncSpec {
                ret: Some(void),
                class_is_final: true,
                name: Some("main".to_string()),
                params: Some(vec![args]),
                type_params: Some(Vec::new()),
                namespace: Some(Namespace::global()),
                ..FuncSpec::default()
            })
        })
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// Generate a class per `spec`. The class is registered, with its
    /// supertype, before its members are generated and stays blacklisted
    /// until it is complete.
    pub(crate) fn gen_class_decl(&mut self, spec: ClassSpec) -> Result<ClassDecl> {
        let name = match spec.name.clone() {
            Some(n) => n,
            None => self.state.class_name(),
        };
        let global = Namespace::global();
        let ns = global.child(&name);

        self.with_namespace(ns.clone(), |g| {
            g.frame.capture_root = None;
            g.frame.in_value_branch = false;
            g.frame.inside_func_body = false;
            g.frame.in_super_call = false;
            g.frame.allow_bottom_consts = true;

            let kind = g.select_class_kind(spec.field_type.is_some());
            let is_final = kind == ClassKind::Regular && g.coin();
            let type_params = match spec.type_params.clone() {
                Some(tps) => {
                    for tp in &tps {
                        g.context.add_type(&ns, tp.clone())?;
                    }
                    tps
                }
                None => g.gen_type_params(None, true, &[], false)?,
            };

            g.with_blacklisted(&name, |g| {
                let mut class = ClassDecl::new(name.clone(), kind);
                class.type_params = type_params;
                class.is_final = is_final;
                let superclass = g.select_superclass(kind == ClassKind::Interface)?;
                if let Some(sup) = &superclass {
                    class.superclasses.push(sup.clone());
                }
                debug!(name = %name, kind = ?kind, supertypes = class.superclasses.len(), "class");
                g.context.add_class(&global, class)?;

                let super_type = superclass.map(|s| s.class_type);
                if kind != ClassKind::Interface {
                    g.gen_class_fields(&ns, is_final, spec.field_type.clone(), super_type.as_ref())?;
                }
                g.gen_class_functions(&ns, kind, is_final, &spec, super_type.as_ref())?;
                Ok(())
            })?;

            g.class_decl(&name)
                .ok_or_else(|| GenerateError::invariant(format!("class '{name}' vanished")))
        })
    }

    /// A supertype for a class being generated, instantiated and with
    /// constructor arguments when it is a class. Interfaces may only extend
    /// interfaces. Final and blacklisted classes are never chosen.
    fn select_superclass(&mut self, only_interfaces: bool) -> Result<Option<SuperClassInst>> {
        let candidates: Vec<ClassDecl> = self
            .classes()
            .into_iter()
            .filter(|c| !c.is_final && !self.is_blacklisted(&c.name))
            .filter(|c| !only_interfaces || c.is_interface())
            .collect();
        if candidates.is_empty() || self.coin() {
            return Ok(None);
        }
        let Some(chosen) = self.pick(&candidates) else {
            return Ok(None);
        };
        let (class_type, map) = match chosen.get_type() {
            Type::Constructor(ctor) => match self.instantiate(&ctor, None) {
                Some(inst) => inst,
                None => return Ok(None),
            },
            simple => (simple, TypeVarMap::new()),
        };
        let args = if chosen.is_interface() {
            None
        } else {
            Some(self.gen_super_args(&chosen, &map)?)
        };
        Ok(Some(SuperClassInst { class_type, args }))
    }

    /// Leaf arguments for a superclass constructor, one per field.
    pub(super) fn gen_super_args(&mut self, class: &ClassDecl, map: &TypeVarMap) -> Result<Vec<Expr>> {
        self.scoped(|g| {
            g.frame.in_super_call = true;
            class
                .fields
                .iter()
                .map(|f| {
                    let ty = f.ty.substitute(map);
                    g.generate_expr(
                        &ty,
                        ExprOpts {
                            only_leaves: true,
                            ..ExprOpts::default()
                        },
                    )
                })
                .collect()
        })
    }

    fn gen_class_fields(
        &mut self,
        ns: &Namespace,
        class_is_final: bool,
        field_type: Option<Type>,
        super_type: Option<&Type>,
    ) -> Result<()> {
        let mut max = self.config.limits.cls.max_fields;
        if let Some(ft) = field_type {
            max = max.saturating_sub(1);
            let field = self.gen_field_decl(Some(ft), class_is_final)?;
            self.attach(ns, Decl::Field(field))?;
        }

        let inherited = super_type.and_then(|t| self.receiver_map(t));
        let mut overridden = 0;
        if let Some((sup, map)) = inherited {
            let overridable: Vec<FieldDecl> = sup.overridable_fields().cloned().collect();
            let k = self.state.rng.gen_range(0..=overridable.len().min(max));
            let sample: Vec<FieldDecl> = overridable
                .choose_multiple(&mut self.state.rng, k)
                .cloned()
                .collect();
            for f in sample {
                let field = FieldDecl {
                    name: f.name.clone(),
                    ty: f.ty.substitute(&map),
                    is_final: f.is_final,
                    can_override: !class_is_final && self.coin(),
                    is_override: true,
                };
                self.attach(ns, Decl::Field(field))?;
                overridden += 1;
            }
        }

        let extra = self.state.rng.gen_range(0..=max - overridden);
        for _ in 0..extra {
            let field = self.gen_field_decl(None, class_is_final)?;
            self.attach(ns, Decl::Field(field))?;
        }
        Ok(())
    }

    fn gen_field_decl(&mut self, etype: Option<Type>, class_is_final: bool) -> Result<FieldDecl> {
        let can_override = !class_is_final && self.coin();
        let is_final = self.coin();
        let ty = match etype {
            Some(t) => t,
            None => self.select_type(TypeOpts {
                exclude_contravariants: true,
                exclude_covariants: !is_final,
                exclude_function_types: true,
                ..TypeOpts::default()
            })?,
        };
        Ok(FieldDecl {
            name: self.state.word(),
            ty,
            is_final,
            can_override,
            is_override: false,
        })
    }

    fn gen_class_functions(
        &mut self,
        ns: &Namespace,
        kind: ClassKind,
        class_is_final: bool,
        spec: &ClassSpec,
        super_type: Option<&Type>,
    ) -> Result<()> {
        let is_interface = kind == ClassKind::Interface;
        let is_abstract = kind != ClassKind::Regular;
        let member = || FuncSpec {
            not_void: spec.not_void,
            class_is_final,
            is_abstract,
            is_interface,
            namespace: Some(ns.clone()),
            ..FuncSpec::default()
        };

        let mut max = self.config.limits.cls.max_funcs;
        if let Some(fret) = &spec.fret_type {
            max = max.saturating_sub(1);
            let mut s = member();
            s.ret = Some(fret.clone());
            s.not_void = true;
            self.gen_func_decl(s)?;
        }
        if let Some(signature) = &spec.signature {
            max = max.saturating_sub(1);
            if let Some((param_types, ret)) = signature.function_signature() {
                let (param_types, ret) = (param_types.to_vec(), ret.clone());
                let params = param_types
                    .iter()
                    .map(|t| ParamDecl::new(self.state.word(), t.clone()))
                    .collect();
                let mut s = member();
                s.ret = Some(ret);
                s.params = Some(params);
                self.gen_func_decl(s)?;
            }
        }

        let mut added = 0;
        if let Some(sup) = super_type {
            if kind == ClassKind::Regular {
                for (func, map) in abstract_members(&self.context, sup) {
                    self.gen_func_from_existing(ns, &func, &map, class_is_final)?;
                }
            }
            if !is_interface {
                if let Some((sup_class, map)) = self.receiver_map(sup) {
                    let implemented: Vec<String> = self
                        .class_decl(ns.last())
                        .map(|c| c.functions.iter().map(|f| f.name.clone()).collect())
                        .unwrap_or_default();
                    let overridable: Vec<FuncDecl> = sup_class
                        .overridable_functions()
                        .filter(|f| !f.is_abstract() && !implemented.contains(&f.name))
                        .cloned()
                        .collect();
                    let k = self.state.rng.gen_range(0..=overridable.len().min(max));
                    let sample: Vec<FuncDecl> = overridable
                        .choose_multiple(&mut self.state.rng, k)
                        .cloned()
                        .collect();
                    for func in sample {
                        self.gen_func_from_existing(ns, &func, &map, class_is_final)?;
                        added += 1;
                    }
                }
            }
        }

        let extra = self.state.rng.gen_range(0..=max - added);
        for _ in 0..extra {
            let s = member();
            self.gen_func_decl(s)?;
        }
        Ok(())
    }

    /// Override `func`, inherited through a supertype viewed with `map`.
    /// Parameter defaults are dropped; type parameters clashing with names
    /// visible in the class are renamed.
    pub(crate) fn gen_func_from_existing(
        &mut self,
        ns: &Namespace,
        func: &FuncDecl,
        map: &TypeVarMap,
        class_is_final: bool,
    ) -> Result<FuncDecl> {
        let class_map = map;
        let mut map = map.clone();
        let visible: Vec<String> = self
            .context
            .get_types(ns, true)
            .into_iter()
            .map(|tp| tp.name.clone())
            .collect();
        let mut taken: Vec<String> = visible
            .iter()
            .map(|n| n.trim_start_matches("F_").to_string())
            .collect();
        taken.extend(
            func.type_params
                .iter()
                .map(|tp| tp.name.trim_start_matches("F_").to_string()),
        );
        for tp in &func.type_params {
            if visible.contains(&tp.name) {
                if let Some(letter) = caps(&mut self.state.rng, &taken) {
                    taken.push(letter.clone());
                    let renamed = TypeParameter {
                        name: format!("F_{letter}"),
                        variance: tp.variance,
                        bound: tp.bound.as_ref().map(|b| Box::new(b.substitute(class_map))),
                    };
                    map.insert(tp.clone(), Type::TypeParam(renamed));
                }
            }
        }
        let type_params: Vec<TypeParameter> = func
            .type_params
            .iter()
            .map(|tp| match Type::TypeParam(tp.clone()).substitute(&map) {
                Type::TypeParam(updated) => updated,
                _ => tp.clone(),
            })
            .collect();
        let params = func
            .params
            .iter()
            .map(|p| ParamDecl::new(p.name.clone(), p.ty.substitute(&map)))
            .collect();
        trace!(name = %func.name, "override");
        self.gen_func_decl(FuncSpec {
            ret: Some(func.ret_type.substitute(&map)),
            class_is_final,
            name: Some(func.name.clone()),
            params: Some(params),
            type_params: Some(type_params),
            namespace: Some(ns.clone()),
            is_override: true,
            ..FuncSpec::default()
        })
    }
}
