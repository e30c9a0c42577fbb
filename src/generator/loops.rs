// src/generator/loops.rs
//
// Loop statements appended to block bodies. A loop iterates a collection
// (for-each or an explicit iterator) or counts over integers (range or a
// counter), and may append to a string that is printed afterwards.

use std::rc::Rc;

use rand::Rng;
use tracing::trace;

use super::{ExprOpts, Generator};
use crate::ast::{
    ArithOp, Block, CmpOp, Decl, Expr, IncDecOp, Loop, ParamDecl, Stmt, VarDecl,
};
use crate::builtins::Language;
use crate::context::Namespace;
use crate::errors::Result;
use crate::types::{Type, TypeVarMap};

impl Generator<'_> {
    /// A loop statement, followed by a print of the accumulated string
    /// when the loop builds one. Helper declarations land in the current
    /// namespace.
    pub(super) fn generate_loop_expr(&mut self) -> Result<Vec<Stmt>> {
        self.loop_counter += 1;
        let loop_ns = self.frame.namespace.child(format!("loop_{}", self.loop_counter));
        let iterable_ty = self.select_iterable_type();
        let string_var = if self.chance(self.config.prob.loop_string_concat) {
            Some(self.string_accumulator()?)
        } else {
            None
        };
        trace!(ns = %loop_ns, iterable = %iterable_ty, "loop");

        let lp = match iterable_ty.type_args().first().cloned() {
            Some(elem) => self.gen_collection_loop(&loop_ns, &iterable_ty, elem, string_var.as_deref())?,
            None => self.gen_counting_loop(&loop_ns, string_var.as_deref())?,
        };
        let mut stmts = vec![Stmt::Expr(Expr::Loop(Box::new(lp)))];
        if let Some(s) = string_var {
            let length = Expr::StringLength {
                expr: Box::new(Expr::variable(s, self.catalog.string_type())),
                ty: self.catalog.integer_type(),
            };
            stmts.push(Stmt::Expr(Expr::Print(Box::new(length))));
        }
        Ok(stmts)
    }

    /// `ArrayList` of a non-generic class or builtin, an `Array` of a
    /// builtin (Kotlin only), or `Int` for counting loops.
    fn select_iterable_type(&mut self) -> Type {
        let mut elems: Vec<Type> = self
            .classes()
            .iter()
            .filter(|c| !c.is_parameterized() && !self.is_blacklisted(&c.name))
            .map(|c| c.get_type())
            .collect();
        let builtins: Vec<Type> = self
            .catalog
            .non_bottom_types()
            .into_iter()
            .filter(|t| !t.is_type_constructor())
            .collect();
        elems.extend(builtins.iter().cloned());

        let mut options: Vec<Type> = elems
            .into_iter()
            .map(|t| self.catalog.array_list_of(t))
            .collect();
        if self.language == Language::Kotlin {
            options.extend(builtins.into_iter().map(|t| self.catalog.array_of(t)));
        }
        options.push(self.catalog.integer_type());
        self.pick(&options)
            .unwrap_or_else(|| self.catalog.integer_type())
    }

    /// A mutable string local reachable from the loop body: an existing
    /// one, or a fresh one declared in the current namespace.
    fn string_accumulator(&mut self) -> Result<String> {
        let string = self.catalog.string_type();
        let existing: Vec<String> = self
            .assignable_vars()
            .into_iter()
            .filter(|d| matches!(d, Decl::Var(v) if v.ty == string))
            .map(|d| d.name().to_string())
            .collect();
        if let Some(name) = self.pick(&existing) {
            return Ok(name);
        }
        let decl = self.gen_variable_decl(Some(string), true, None)?;
        self.make_mutable(&decl.name);
        Ok(decl.name)
    }

    /// Mark a variable of the current namespace as reassignable.
    pub(super) fn make_mutable(&mut self, name: &str) {
        let ns = self.frame.namespace.clone();
        if let Some(Decl::Var(v)) = self.context.var_mut(&ns, name) {
            v.is_final = false;
            v.inferred = false;
        }
    }

    fn gen_collection_loop(
        &mut self,
        loop_ns: &Namespace,
        iterable_ty: &Type,
        elem: Type,
        string_var: Option<&str>,
    ) -> Result<Loop> {
        let iterable = self.nested(1, |g| g.generate_expr(iterable_ty, ExprOpts::default()))?;
        let var = self.state.word();

        if self.chance(self.config.prob.loop_shape) {
            self.context
                .add_var(loop_ns, Decl::Param(ParamDecl::new(var.clone(), elem)))?;
            let body = self.gen_loop_body(loop_ns, string_var, None)?;
            return Ok(Loop::ForEach {
                var,
                iterable,
                body,
            });
        }

        // Explicit iterator: `it = xs.iterator(); while (it.hasNext()) { v = it.next() }`.
        let iter_ty = self.catalog.iterator_of(elem.clone());
        let iter_name = self.state.word();
        let ns = self.frame.namespace.clone();
        self.context.add_var(
            &ns,
            Decl::Var(VarDecl {
                name: iter_name.clone(),
                ty: iter_ty.clone(),
                expr: Rc::new(method_call(iterable, "iterator", iter_ty.clone())),
                is_final: true,
                inferred: false,
            }),
        )?;
        let iter = Expr::variable(iter_name, iter_ty);
        self.context.add_var(
            loop_ns,
            Decl::Var(VarDecl {
                name: var,
                ty: elem.clone(),
                expr: Rc::new(method_call(iter.clone(), "next", elem)),
                is_final: true,
                inferred: false,
            }),
        )?;
        let cond = method_call(iter, "hasNext", self.catalog.boolean_type());
        let body = self.gen_loop_body(loop_ns, string_var, None)?;
        Ok(Loop::While {
            cond,
            body,
            do_while: !self.chance(self.config.prob.loop_shape),
        })
    }

    fn gen_counting_loop(&mut self, loop_ns: &Namespace, string_var: Option<&str>) -> Result<Loop> {
        let int = self.catalog.integer_type();
        let constant = |n: i64, ty: &Type| Expr::Constant {
            literal: n.to_string(),
            ty: ty.clone(),
        };

        if self.chance(self.config.prob.loop_shape) {
            let to = self.state.rng.gen_range(1_000_000..=10_000_000);
            // The range variable is never read by the body.
            let var = self.state.word();
            let body = self.gen_loop_body(loop_ns, string_var, None)?;
            return Ok(Loop::ForRange {
                var,
                from: constant(0, &int),
                to: constant(to, &int),
                body,
            });
        }

        let counter = self.state.word();
        let ns = self.frame.namespace.clone();
        self.context.add_var(
            &ns,
            Decl::Var(VarDecl {
                name: counter.clone(),
                ty: int.clone(),
                expr: Rc::new(constant(0, &int)),
                is_final: false,
                inferred: false,
            }),
        )?;
        let limit = self.state.rng.gen_range(1..=100);
        let op = if self.coin() { CmpOp::Lt } else { CmpOp::Le };
        let cond = Expr::Comparison {
            op,
            lhs: Box::new(Expr::variable(counter.clone(), int.clone())),
            rhs: Box::new(constant(limit, &int)),
            ty: self.catalog.boolean_type(),
        };
        let step = Expr::IncDec {
            name: counter,
            op: IncDecOp::Inc,
        };
        let body = self.gen_loop_body(loop_ns, string_var, Some(step))?;
        Ok(Loop::While {
            cond,
            body,
            do_while: self.coin(),
        })
    }

    /// The loop body in `loop_ns`, ending with the string append and then
    /// `step` when given. At the depth limit the body only calls
    /// parameterless methods on locals.
    fn gen_loop_body(
        &mut self,
        loop_ns: &Namespace,
        string_var: Option<&str>,
        step: Option<Expr>,
    ) -> Result<Block> {
        self.with_namespace(loop_ns.clone(), |g| {
            g.frame.inside_func_body = true;
            g.frame.in_value_branch = false;

            let mut stmts = if g.frame.depth >= g.config.limits.max_depth {
                let mut stmts: Vec<Stmt> = g.local_decls().into_iter().map(Stmt::Decl).collect();
                if let Some(call) = g.gen_method_statement() {
                    stmts.push(Stmt::Expr(call));
                }
                stmts
            } else {
                let void = g.catalog.void_type();
                match g.gen_func_body(&void)? {
                    Expr::Block(block) => block.stmts,
                    other => vec![Stmt::Expr(other)],
                }
            };

            if let Some(s) = string_var {
                let string = g.catalog.string_type();
                let piece = g.nested(1, |g| g.generate_expr(&string, ExprOpts::default()))?;
                stmts.push(Stmt::Expr(Expr::Assignment {
                    receiver: None,
                    name: s.to_string(),
                    value: Box::new(Expr::Arith {
                        op: ArithOp::Add,
                        lhs: Box::new(Expr::variable(s, string.clone())),
                        rhs: Box::new(piece),
                        ty: string,
                        cast: false,
                    }),
                }));
            }
            stmts.extend(step.map(Stmt::Expr));
            Ok(Block {
                stmts,
                is_func_block: false,
            })
        })
    }

    /// A call of some parameterless, non-generic method on a visible
    /// variable.
    fn gen_method_statement(&mut self) -> Option<Expr> {
        let mut calls = Vec::new();
        for decl in self.visible_vars() {
            let Some(ty) = decl.var_type() else {
                continue;
            };
            let class = match self.receiver_map(ty) {
                Some((class, map)) => Some((class, map)),
                None => self.catalog.class_decl(ty).map(|c| (c, TypeVarMap::new())),
            };
            let Some((class, map)) = class else {
                continue;
            };
            for func in class
                .functions
                .iter()
                .filter(|f| f.params.is_empty() && !f.is_parameterized())
            {
                let receiver = Expr::variable(decl.name(), ty.clone());
                calls.push(method_call(receiver, &func.name, func.ret_type.substitute(&map)));
            }
        }
        self.pick(&calls)
    }
}

fn method_call(receiver: Expr, name: &str, ret_type: Type) -> Expr {
    Expr::FunctionCall {
        name: name.to_string(),
        args: Vec::new(),
        receiver: Some(Box::new(receiver)),
        type_args: Vec::new(),
        ret_type,
        is_ref_call: false,
    }
}
