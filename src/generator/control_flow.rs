// src/generator/control_flow.rs
//
// Conditional expressions and `is` tests. A branch guarded by `x is T`
// sees `x` rebound at type `T` for as long as the branch is generated.

use std::rc::Rc;

use tracing::trace;

use super::{ExprOpts, Generator};
use crate::ast::{Block, ClassDecl, Decl, Expr, Stmt, VarDecl};
use crate::errors::Result;
use crate::type_utils::find_subtypes;
use crate::types::Type;

impl Generator<'_> {
    /// `if (cond) a else b` where each branch may be a different subtype
    /// of `ty`.
    pub(crate) fn gen_conditional(&mut self, ty: &Type) -> Result<Expr> {
        let boolean = self.catalog.boolean_type();
        self.nested(3, |g| {
            let cond = g.generate_expr(&boolean, ExprOpts::default())?;
            let exact = ExprOpts {
                subtype: false,
                ..ExprOpts::default()
            };
            let then_ty = g.narrow(ty);
            let then_branch = g.generate_expr(&then_ty, exact)?;
            let else_ty = g.narrow(ty);
            let else_branch = g.generate_expr(&else_ty, exact)?;
            Ok(Expr::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
                ty: ty.clone(),
            })
        })
    }

    /// Final, explicitly typed variables paired with each of their
    /// concrete proper subtypes.
    fn smart_cast_candidates(&self) -> Vec<(String, Type)> {
        let classes: Vec<ClassDecl> = self
            .classes()
            .into_iter()
            .filter(|c| !self.is_blacklisted(&c.name))
            .collect();
        let refs: Vec<&ClassDecl> = classes.iter().collect();
        let builtins = self.catalog.non_bottom_types();
        let mut out = Vec::new();
        for decl in self.visible_vars() {
            let Decl::Var(var) = decl else {
                continue;
            };
            if !var.is_final || var.inferred || !matches!(var.ty, Type::Simple(_) | Type::Builtin(_)) {
                continue;
            }
            for sub in find_subtypes(&var.ty, &refs, &builtins, false, true) {
                if matches!(sub, Type::Simple(_) | Type::Builtin(_)) {
                    out.push((var.name.clone(), sub));
                }
            }
        }
        out
    }

    /// `if (x is S) a else b`. Inside `a`, `x` has type `S`. Without a
    /// suitable variable this degrades to a leaf.
    pub(crate) fn gen_is_expr(&mut self, ty: &Type) -> Result<Expr> {
        let candidates = self.smart_cast_candidates();
        let Some((var, sub)) = self.pick(&candidates) else {
            return self.generate_expr(
                ty,
                ExprOpts {
                    only_leaves: true,
                    ..ExprOpts::default()
                },
            );
        };
        self.branch_counter += 1;
        let n = self.branch_counter;
        let parent = self.frame.namespace.clone();
        trace!(var = %var, target = %sub, "smart cast");

        let then_ns = parent.child(format!("true_block_{n}"));
        let shadow = Decl::Var(VarDecl {
            name: var.clone(),
            ty: sub.clone(),
            expr: Rc::new(Expr::variable(var.clone(), sub.clone())),
            is_final: true,
            inferred: false,
        });
        let then_branch = self.with_namespace(then_ns.clone(), |g| {
            g.frame.in_value_branch = true;
            g.with_shadow_var(&then_ns, shadow, |g| g.gen_branch(ty, Some(&var)))
        })?;

        let else_ns = parent.child(format!("false_block_{n}"));
        let else_branch = self.with_namespace(else_ns, |g| {
            g.frame.in_value_branch = true;
            g.gen_branch(ty, None)
        })?;

        Ok(Expr::Conditional {
            cond: Box::new(Expr::Is {
                var,
                target: sub,
                ty: self.catalog.boolean_type(),
            }),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            ty: ty.clone(),
        })
    }

    /// One branch of an `is` conditional: an expression, preceded by any
    /// declarations it made in the branch namespace.
    fn gen_branch(&mut self, ty: &Type, shadowed: Option<&str>) -> Result<Expr> {
        let expr = self.generate_expr(ty, ExprOpts::default())?;
        let decls: Vec<Stmt> = self
            .local_decls()
            .into_iter()
            .filter(|d| Some(d.name()) != shadowed)
            .map(Stmt::Decl)
            .collect();
        if decls.is_empty() {
            return Ok(expr);
        }
        let mut stmts = decls;
        stmts.push(Stmt::Expr(expr));
        Ok(Expr::Block(Block {
            stmts,
            is_func_block: false,
        }))
    }
}
