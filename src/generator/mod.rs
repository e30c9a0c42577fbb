// src/generator/mod.rs
//
// The orchestrator. A `Generator` owns the context for one program and
// borrows the seeded state; every decision draws from `state.rng`, so a
// given seed, language and config always produce the same tree.
//
// Submodules:
// - `decls` - variables, functions, classes and their bodies
// - `types` - type selection and type parameter synthesis
// - `expr` - `generate_expr`, leaves, operators, field access, assignment
// - `new` - object construction, lambdas, function references
// - `calls` - function calls and synthesized callees
// - `control_flow` - conditionals and smart-cast tests
// - `loops` - loop statements

mod calls;
mod control_flow;
mod decls;
mod expr;
mod loops;
mod new;
mod types;

#[cfg(test)]
mod tests;

use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::{ClassDecl, Decl, FuncDecl, Program};
use crate::builtins::{Catalog, Language};
use crate::config::GenConfig;
use crate::context::{Context, Namespace};
use crate::errors::{GenerateError, Result};
use crate::state::GenState;
use crate::types::{Type, TypeVarMap};

pub use decls::{ClassSpec, FuncSpec};
pub use expr::ExprOpts;
pub use types::TypeOpts;

/// Scalar generation state that nested scopes save and restore.
#[derive(Debug, Clone)]
struct Frame {
    namespace: Namespace,
    depth: usize,
    /// Root of the innermost closure being generated. Locals declared
    /// outside it are read only when final and never assigned.
    capture_root: Option<Namespace>,
    /// Inside a branch of a smart-cast conditional, where Java cannot
    /// host declarations.
    in_value_branch: bool,
    inside_func_body: bool,
    in_super_call: bool,
    allow_bottom_consts: bool,
}

/// Random program generator for one target language.
pub struct Generator<'a> {
    state: &'a mut GenState,
    config: &'a GenConfig,
    catalog: Catalog,
    language: Language,
    context: Context,
    frame: Frame,
    /// Classes under construction; they may not be instantiated or
    /// extended until finished.
    blacklist: Vec<String>,
    /// Side-effect declarations made per namespace.
    vars_in_context: FxHashMap<Namespace, usize>,
    lambda_counter: usize,
    loop_counter: usize,
    branch_counter: usize,
}

impl<'a> Generator<'a> {
    pub fn new(state: &'a mut GenState, config: &'a GenConfig, language: Language) -> Self {
        Self {
            state,
            config,
            catalog: Catalog::new(language),
            language,
            context: Context::new(),
            frame: Frame {
                namespace: Namespace::global(),
                depth: 1,
                capture_root: None,
                in_value_branch: false,
                inside_func_body: false,
                in_super_call: false,
                allow_bottom_consts: true,
            },
            blacklist: Vec::new(),
            vars_in_context: FxHashMap::default(),
            lambda_counter: 0,
            loop_counter: 0,
            branch_counter: 0,
        }
    }

    /// Generate a whole program: a random number of top-level declarations
    /// followed by the entry function.
    pub fn generate(mut self) -> Result<Program> {
        let limits = &self.config.limits;
        let (lo, hi) = (limits.min_top_level, limits.max_top_level.max(limits.min_top_level));
        let count = self.state.rng.gen_range(lo..=hi);
        debug!(count, language = %self.language, "generating top-level declarations");
        for _ in 0..count {
            match self.state.rng.gen_range(0..3) {
                0 => {
                    let decl = self.gen_variable_decl(None, false, None)?;
                    debug!(name = %decl.name, ty = %decl.ty, "top-level variable");
                }
                1 => {
                    let decl = self.gen_class_decl(ClassSpec::default())?;
                    debug!(name = %decl.name, kind = ?decl.kind, "top-level class");
                }
                _ => {
                    let decl = self.gen_func_decl(FuncSpec::default())?;
                    debug!(name = %decl.name, ret = %decl.ret_type, "top-level function");
                }
            }
        }
        self.gen_main()?;
        Ok(Program::new(self.language, self.context))
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn depth(&self) -> usize {
        self.frame.depth
    }

    pub fn namespace(&self) -> &Namespace {
        &self.frame.namespace
    }

    // -----------------------------------------------------------------------
    // Randomness
    // -----------------------------------------------------------------------

    fn chance(&mut self, p: f64) -> bool {
        self.state.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    fn coin(&mut self) -> bool {
        self.state.rng.gen_bool(0.5)
    }

    fn pick<T: Clone>(&mut self, items: &[T]) -> Option<T> {
        items.choose(&mut self.state.rng).cloned()
    }

    // -----------------------------------------------------------------------
    // Scoped state
    // -----------------------------------------------------------------------

    /// Run `body` and restore the frame afterwards, whatever it returns.
    fn scoped<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.frame.clone();
        let result = body(self);
        self.frame = saved;
        result
    }

    /// Run `body` `levels` deeper.
    fn nested<R>(&mut self, levels: usize, body: impl FnOnce(&mut Self) -> R) -> R {
        self.scoped(|g| {
            g.frame.depth += levels;
            body(g)
        })
    }

    /// Run `body` in `ns`, one level deeper.
    fn with_namespace<R>(&mut self, ns: Namespace, body: impl FnOnce(&mut Self) -> R) -> R {
        self.scoped(|g| {
            g.frame.namespace = ns;
            g.frame.depth += 1;
            body(g)
        })
    }

    /// Run `body` with `name` marked as under construction.
    fn with_blacklisted<R>(&mut self, name: &str, body: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.blacklist.len();
        self.blacklist.push(name.to_string());
        let result = body(self);
        self.blacklist.truncate(saved);
        result
    }

    /// Run `body` with `decl` bound in `ns`, retracting the binding after.
    fn with_shadow_var<R>(
        &mut self,
        ns: &Namespace,
        decl: Decl,
        body: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let name = decl.name().to_string();
        self.context.add_var(ns, decl)?;
        let result = body(self);
        self.context.remove_var(ns, &name);
        result
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.iter().any(|b| b == name)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// The class owning namespace `ns`, when `ns` is a class body.
    fn class_of(ns: &Namespace) -> Option<&str> {
        let segments = ns.segments();
        if segments.len() == 2 && starts_uppercase(&segments[1]) {
            Some(&segments[1])
        } else {
            None
        }
    }

    /// Register `decl` in `ns` and, for members of a class body, in the
    /// class declaration itself.
    fn attach(&mut self, ns: &Namespace, decl: Decl) -> Result<()> {
        if let Some(class_name) = Self::class_of(ns) {
            let class = self
                .context
                .class_mut(&Namespace::global(), class_name)
                .ok_or_else(|| {
                    GenerateError::invariant(format!("class '{class_name}' is not registered"))
                })?;
            match &decl {
                Decl::Field(f) => class.fields.push(f.clone()),
                Decl::Func(f) => class.functions.push(f.clone()),
                Decl::Var(_) | Decl::Param(_) | Decl::Class(_) | Decl::Lambda(_) => {
                    return Err(GenerateError::invariant(format!(
                        "'{}' cannot be a member of class '{class_name}'",
                        decl.name()
                    )));
                }
            }
        }
        self.context.add_decl(ns, decl)
    }

    /// Replace a registered function with `func`, keeping the class copy
    /// in step.
    fn update_func(&mut self, ns: &Namespace, func: &FuncDecl) -> Result<()> {
        let slot = self
            .context
            .func_mut(ns, &func.name)
            .ok_or_else(|| GenerateError::invariant(format!("function '{}' vanished", func.name)))?;
        *slot = func.clone();
        if let Some(class_name) = Self::class_of(ns) {
            if let Some(class) = self.context.class_mut(&Namespace::global(), class_name) {
                if let Some(member) = class.functions.iter_mut().find(|f| f.name == func.name) {
                    *member = func.clone();
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// User classes, in declaration order.
    fn classes(&self) -> Vec<ClassDecl> {
        self.context
            .get_classes(&Namespace::global(), false)
            .into_iter()
            .cloned()
            .collect()
    }

    fn class_decl(&self, name: &str) -> Option<ClassDecl> {
        self.context
            .get_class(&Namespace::global(), name, false)
            .cloned()
    }

    /// Whether a variable declared in `scope` may be read from the current
    /// position. Locals outside the innermost closure must be final.
    fn capturable(&self, scope: &Namespace, decl: &Decl) -> bool {
        let Some(root) = &self.frame.capture_root else {
            return true;
        };
        match decl {
            Decl::Var(v) => v.is_final || scope.is_global() || scope.starts_with(root),
            _ => true,
        }
    }

    /// Variables readable from the current namespace.
    fn visible_vars(&self) -> Vec<Decl> {
        self.context
            .get_vars_scoped(&self.frame.namespace)
            .into_iter()
            .filter(|(scope, decl)| self.capturable(scope, decl))
            .map(|(_, decl)| decl.clone())
            .collect()
    }

    /// Variables that may be assigned from the current namespace: non-final
    /// variables and fields, excluding locals captured by a closure.
    fn assignable_vars(&self) -> Vec<Decl> {
        self.context
            .get_vars_scoped(&self.frame.namespace)
            .into_iter()
            .filter(|(scope, decl)| match decl {
                Decl::Var(v) => {
                    !v.is_final
                        && match &self.frame.capture_root {
                            Some(root) => scope.is_global() || scope.starts_with(root),
                            None => true,
                        }
                }
                Decl::Field(f) => !f.is_final,
                _ => false,
            })
            .map(|(_, decl)| decl.clone())
            .collect()
    }

    /// The substitution that views members of a receiver's class through
    /// `ty`. `None` for non-class types and projected (wildcard) receivers.
    fn receiver_map(&self, ty: &Type) -> Option<(ClassDecl, TypeVarMap)> {
        match ty {
            Type::Simple(s) => Some((self.class_decl(&s.name)?, TypeVarMap::new())),
            Type::Parameterized(p) if !p.ctor.builtin && !ty.has_wildcards() => {
                Some((self.class_decl(&p.ctor.name)?, p.type_var_map()))
            }
            _ => None,
        }
    }

    /// Declarations made directly in the current namespace, minus
    /// parameters and closures, in registration order.
    fn local_decls(&self) -> Vec<Decl> {
        self.context
            .get_declarations(&self.frame.namespace, true)
            .into_iter()
            .filter(|d| !matches!(d, Decl::Param(_) | Decl::Lambda(_)))
            .cloned()
            .collect()
    }
}

fn starts_uppercase(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_uppercase)
}
