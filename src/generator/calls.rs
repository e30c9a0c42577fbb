// src/generator/calls.rs
//
// Function calls: through function-typed variables, to visible functions
// and methods (instantiating generic ones), or to a callee synthesized for
// the occasion.

use tracing::trace;

use super::{ExprOpts, FuncSpec, Generator, TypeOpts};
use crate::ast::{ClassDecl, Expr, FuncDecl, FuncKind};
use crate::builtins::Language;
use crate::context::Namespace;
use crate::errors::Result;
use crate::type_utils::{instantiate_parameterized_function, unify};
use crate::types::{Type, TypeVarMap};

/// A callable found in scope together with how to reach it.
#[derive(Debug, Clone)]
struct Callee {
    func: FuncDecl,
    receiver: Option<Expr>,
    /// Receiver type arguments and the function's own type arguments.
    map: TypeVarMap,
}

impl Generator<'_> {
    /// A call whose result is assignable to `etype`. A void `etype` asks
    /// for a call made for its effect.
    pub(crate) fn gen_func_call(&mut self, etype: &Type) -> Result<Expr> {
        if !etype.is_void() && self.chance(self.config.prob.func_ref_call) {
            if let Some(call) = self.gen_ref_call(etype)? {
                return Ok(call);
            }
        }

        let mut callees = self.visible_callees(etype);
        callees.extend(self.receiver_callees(etype));
        if let Some(callee) = self.pick(&callees) {
            return self.build_call(callee);
        }

        if !etype.has_type_variables() {
            if self.coin() {
                let func = self.gen_func_decl(FuncSpec {
                    ret: Some(etype.clone()),
                    not_void: !etype.is_void(),
                    namespace: Some(Namespace::global()),
                    ..FuncSpec::default()
                })?;
                trace!(name = %func.name, "synthesized top-level callee");
                return self.build_call(Callee {
                    func,
                    receiver: None,
                    map: TypeVarMap::new(),
                });
            }
            return self.gen_method_on_new_class(etype);
        }
        if self.can_nest_function() {
            let ns = self.frame.namespace.clone();
            let func = self.gen_func_decl(FuncSpec {
                ret: Some(etype.clone()),
                not_void: !etype.is_void(),
                namespace: Some(ns),
                ..FuncSpec::default()
            })?;
            trace!(name = %func.name, "synthesized nested callee");
            return self.build_call(Callee {
                func,
                receiver: None,
                map: TypeVarMap::new(),
            });
        }
        self.gen_method_on_new_class(etype)
    }

    /// Call `v(args)` on a function-typed variable whose result fits.
    fn gen_ref_call(&mut self, etype: &Type) -> Result<Option<Expr>> {
        let candidates: Vec<(String, Vec<Type>, Type)> = self
            .visible_vars()
            .into_iter()
            .filter_map(|d| {
                let (params, ret) = d.var_type()?.function_signature()?;
                ret.is_assignable(etype)
                    .then(|| (d.name().to_string(), params.to_vec(), ret.clone()))
            })
            .collect();
        let Some((name, params, ret)) = self.pick(&candidates) else {
            return Ok(None);
        };
        let args = self.nested(1, |g| {
            params
                .iter()
                .map(|t| g.gen_arg(t))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Some(Expr::FunctionCall {
            name,
            args,
            receiver: None,
            type_args: Vec::new(),
            ret_type: ret,
            is_ref_call: true,
        }))
    }

    /// Whether a local function may be declared at the current position.
    fn can_nest_function(&self) -> bool {
        let ns = &self.frame.namespace;
        !ns.is_global()
            && Self::class_of(ns).is_none()
            && self.frame.inside_func_body
            && !self.frame.in_value_branch
            && !self.frame.in_super_call
    }

    /// Whether a call to something returning `ret` fits `etype`. Void
    /// requests only accept void functions and vice versa.
    fn return_fits(ret: &Type, etype: &Type) -> bool {
        if etype.is_void() || ret.is_void() {
            return etype.is_void() && ret.is_void();
        }
        ret.is_assignable(etype)
    }

    /// Bind the type parameters of `func` so that its return type, viewed
    /// through `receiver_map`, fits `etype`.
    fn bind_callee(
        &mut self,
        func: &FuncDecl,
        receiver_map: &TypeVarMap,
        etype: &Type,
    ) -> Option<TypeVarMap> {
        if !func.is_parameterized() {
            let ret = func.ret_type.substitute(receiver_map);
            return Self::return_fits(&ret, etype).then(|| receiver_map.clone());
        }
        let ret = func.ret_type.substitute(receiver_map);
        let mut partial = receiver_map.clone();
        if ret.has_type_variables() && !etype.is_void() {
            if let Some(m) = unify(etype, &ret) {
                partial.extend_missing(&m);
            }
        }
        let types = self.get_types(TypeOpts::type_args());
        let map = instantiate_parameterized_function(
            &mut self.state.rng,
            &func.type_params,
            &types,
            &partial,
        )?;
        let bound = func.ret_type.substitute(&map);
        Self::return_fits(&bound, etype).then_some(map)
    }

    /// Functions callable without a receiver expression: top-level and
    /// nested functions in scope, and methods of the enclosing class. The
    /// functions being generated are skipped.
    fn visible_callees(&mut self, etype: &Type) -> Vec<Callee> {
        let lineage = self.frame.namespace.segments().to_vec();
        let funcs: Vec<FuncDecl> = self
            .context
            .get_funcs(&self.frame.namespace, true)
            .into_iter()
            .filter(|f| !lineage.contains(&f.name))
            .cloned()
            .collect();
        let this = self.this_type();
        let mut out = Vec::new();
        for func in funcs {
            let receiver = match func.kind {
                FuncKind::ClassMethod => match (&this, self.frame.in_super_call) {
                    (Some(t), false) => Some(Expr::variable("this", t.clone())),
                    _ => continue,
                },
                _ => None,
            };
            if let Some(map) = self.bind_callee(&func, &TypeVarMap::new(), etype) {
                out.push(Callee {
                    func,
                    receiver,
                    map,
                });
            }
        }
        out
    }

    /// Methods of in-scope receivers, user classes and builtins alike.
    fn receiver_callees(&mut self, etype: &Type) -> Vec<Callee> {
        let mut receivers: Vec<(Expr, ClassDecl, TypeVarMap)> = Vec::new();
        for decl in self.visible_vars() {
            let Some(var_ty) = decl.var_type() else {
                continue;
            };
            let var = Expr::variable(decl.name(), var_ty.clone());
            if let Some((class, map)) = self.receiver_map(var_ty) {
                receivers.push((var, class, map));
            } else if let Some(class) = self.catalog.class_decl(var_ty) {
                receivers.push((var, class, TypeVarMap::new()));
            }
        }
        let mut out = Vec::new();
        for (receiver, class, class_map) in receivers {
            for func in &class.functions {
                if let Some(map) = self.bind_callee(func, &class_map, etype) {
                    out.push(Callee {
                        func: func.clone(),
                        receiver: Some(receiver.clone()),
                        map,
                    });
                }
            }
        }
        out
    }

    /// Declare a class with a method returning `etype` and call it on a
    /// fresh receiver.
    fn gen_method_on_new_class(&mut self, etype: &Type) -> Result<Expr> {
        let (receiver_type, member_type) = self.gen_matching_class(etype, false)?;
        let Some((class, map)) = self.receiver_map(&receiver_type) else {
            return Ok(Expr::Unresolved(etype.clone()));
        };
        let Some(func) = class
            .functions
            .iter()
            .find(|f| f.ret_type == member_type)
            .cloned()
        else {
            return Ok(Expr::Unresolved(etype.clone()));
        };
        let receiver = self.nested(1, |g| g.generate_expr(&receiver_type, ExprOpts::default()))?;
        trace!(class = %class.name, method = %func.name, "synthesized method callee");
        self.build_call(Callee {
            func,
            receiver: Some(receiver),
            map,
        })
    }

    fn build_call(&mut self, callee: Callee) -> Result<Expr> {
        let Callee {
            func,
            receiver,
            map,
        } = callee;
        let skip_defaults = self.language == Language::Kotlin;
        let args = self.nested(1, |g| {
            func.params
                .iter()
                .filter(|p| !(skip_defaults && p.default.is_some()))
                .map(|p| g.gen_arg(&p.ty.substitute(&map)))
                .collect::<Result<Vec<_>>>()
        })?;
        let type_args = func
            .type_params
            .iter()
            .filter_map(|tp| map.get_by_name(&tp.name).cloned())
            .collect();
        Ok(Expr::FunctionCall {
            name: func.name.clone(),
            args,
            receiver: receiver.map(Box::new),
            type_args,
            ret_type: func.ret_type.substitute(&map),
            // Local functions are values in Java and are invoked as such.
            is_ref_call: func.kind == FuncKind::Nested,
        })
    }

    fn gen_arg(&mut self, ty: &Type) -> Result<Expr> {
        self.generate_expr(
            ty,
            ExprOpts {
                gen_bottom: ty.has_wildcards(),
                sam_coercion: true,
                ..ExprOpts::default()
            },
        )
    }
}
