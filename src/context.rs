// src/context.rs
//
// Namespace-keyed symbol table. A namespace is the path from the global
// root to a scope (`global/Cls/method/lambda_1`); lookups from a namespace
// see every binding on the path back to the root, inner bindings shadowing
// outer ones of the same name and kind.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::ast::{ClassDecl, Decl, FuncDecl, LambdaDecl};
use crate::errors::{GenerateError, Result};
use crate::types::TypeParameter;

pub const GLOBAL: &str = "global";

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn global() -> Self {
        Namespace(vec![GLOBAL.to_string()])
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Namespace(segments)
    }

    /// The enclosing namespace; the global namespace has none.
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Namespace(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn last(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or(GLOBAL)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_global(&self) -> bool {
        self.0.len() == 1
    }

    /// This namespace and every prefix of it, outermost first.
    pub fn lineage(&self) -> impl Iterator<Item = Namespace> + '_ {
        (1..=self.0.len()).map(|n| Namespace(self.0[..n].to_vec()))
    }

    /// Whether `self` is `other` or nested inside it.
    pub fn starts_with(&self, other: &Namespace) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Var,
    Func,
    Class,
    Lambda,
}

fn kind_of(decl: &Decl) -> Kind {
    match decl {
        Decl::Var(_) | Decl::Param(_) | Decl::Field(_) => Kind::Var,
        Decl::Func(_) => Kind::Func,
        Decl::Class(_) => Kind::Class,
        Decl::Lambda(_) => Kind::Lambda,
    }
}

#[derive(Debug, Clone, Default)]
struct Bindings {
    /// Declarations in registration order.
    decls: Vec<Decl>,
    types: Vec<TypeParameter>,
}

impl Bindings {
    fn position(&self, kind: Kind, name: &str) -> Option<usize> {
        self.decls
            .iter()
            .position(|d| kind_of(d) == kind && d.name() == name)
    }
}

/// Scoped symbol table for one program.
#[derive(Debug, Clone, Default)]
pub struct Context {
    scopes: FxHashMap<Namespace, Bindings>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `decl` under `ns`, dispatching on its kind.
    pub fn add_decl(&mut self, ns: &Namespace, decl: Decl) -> Result<()> {
        match decl {
            Decl::Var(_) | Decl::Param(_) | Decl::Field(_) => self.add_var(ns, decl),
            Decl::Func(f) => self.add_func(ns, f),
            Decl::Class(c) => self.add_class(ns, c),
            Decl::Lambda(l) => self.add_lambda(ns, l),
        }
    }

    fn insert(&mut self, ns: &Namespace, decl: Decl) -> Result<()> {
        let bindings = self.scopes.entry(ns.clone()).or_default();
        if bindings.position(kind_of(&decl), decl.name()).is_some() {
            return Err(GenerateError::invariant(format!(
                "'{}' is already bound in {ns}",
                decl.name()
            )));
        }
        bindings.decls.push(decl);
        Ok(())
    }

    /// Register a variable, parameter or field.
    pub fn add_var(&mut self, ns: &Namespace, decl: Decl) -> Result<()> {
        if kind_of(&decl) != Kind::Var {
            return Err(GenerateError::invariant(format!(
                "'{}' is not a variable declaration",
                decl.name()
            )));
        }
        self.insert(ns, decl)
    }

    pub fn add_func(&mut self, ns: &Namespace, func: FuncDecl) -> Result<()> {
        self.insert(ns, Decl::Func(func))
    }

    pub fn add_class(&mut self, ns: &Namespace, class: ClassDecl) -> Result<()> {
        self.insert(ns, Decl::Class(class))
    }

    pub fn add_lambda(&mut self, ns: &Namespace, lambda: LambdaDecl) -> Result<()> {
        self.insert(ns, Decl::Lambda(lambda))
    }

    pub fn add_type(&mut self, ns: &Namespace, param: TypeParameter) -> Result<()> {
        let bindings = self.scopes.entry(ns.clone()).or_default();
        if bindings.types.iter().any(|t| t.name == param.name) {
            return Err(GenerateError::invariant(format!(
                "type parameter '{}' is already bound in {ns}",
                param.name
            )));
        }
        bindings.types.push(param);
        Ok(())
    }

    /// Bindings of `kind` visible from `ns`. With `global`, ancestors are
    /// merged in and inner bindings win; otherwise only `ns` itself is read.
    fn lookup(&self, ns: &Namespace, kind: Kind, global: bool) -> Vec<&Decl> {
        if !global {
            return self
                .scopes
                .get(ns)
                .map(|b| b.decls.iter().filter(|d| kind_of(d) == kind).collect())
                .unwrap_or_default();
        }
        let mut out: Vec<&Decl> = Vec::new();
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        for scope in ns.lineage() {
            let Some(bindings) = self.scopes.get(&scope) else {
                continue;
            };
            for decl in bindings.decls.iter().filter(|d| kind_of(d) == kind) {
                match index.get(decl.name()) {
                    Some(&i) => out[i] = decl,
                    None => {
                        index.insert(decl.name(), out.len());
                        out.push(decl);
                    }
                }
            }
        }
        out
    }

    /// Variables, parameters and fields visible from `ns`.
    pub fn get_vars(&self, ns: &Namespace, global: bool) -> Vec<&Decl> {
        self.lookup(ns, Kind::Var, global)
    }

    /// Variables visible from `ns`, each paired with the namespace that
    /// declares it.
    pub fn get_vars_scoped(&self, ns: &Namespace) -> Vec<(Namespace, &Decl)> {
        let mut out: Vec<(Namespace, &Decl)> = Vec::new();
        for scope in ns.lineage() {
            let Some(bindings) = self.scopes.get(&scope) else {
                continue;
            };
            for decl in bindings.decls.iter().filter(|d| kind_of(d) == Kind::Var) {
                match out.iter().position(|(_, d)| d.name() == decl.name()) {
                    Some(i) => out[i] = (scope.clone(), decl),
                    None => out.push((scope.clone(), decl)),
                }
            }
        }
        out
    }

    pub fn get_var(&self, ns: &Namespace, name: &str, global: bool) -> Option<&Decl> {
        self.get_vars(ns, global)
            .into_iter()
            .find(|d| d.name() == name)
    }

    pub fn get_funcs(&self, ns: &Namespace, global: bool) -> Vec<&FuncDecl> {
        self.lookup(ns, Kind::Func, global)
            .into_iter()
            .filter_map(|d| match d {
                Decl::Func(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn get_func(&self, ns: &Namespace, name: &str, global: bool) -> Option<&FuncDecl> {
        self.get_funcs(ns, global)
            .into_iter()
            .find(|f| f.name == name)
    }

    pub fn get_classes(&self, ns: &Namespace, global: bool) -> Vec<&ClassDecl> {
        self.lookup(ns, Kind::Class, global)
            .into_iter()
            .filter_map(|d| match d {
                Decl::Class(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn get_class(&self, ns: &Namespace, name: &str, global: bool) -> Option<&ClassDecl> {
        self.get_classes(ns, global)
            .into_iter()
            .find(|c| c.name == name)
    }

    pub fn get_lambdas(&self, ns: &Namespace, global: bool) -> Vec<&LambdaDecl> {
        self.lookup(ns, Kind::Lambda, global)
            .into_iter()
            .filter_map(|d| match d {
                Decl::Lambda(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    /// Type parameters visible from `ns`, inner ones shadowing outer ones.
    pub fn get_types(&self, ns: &Namespace, global: bool) -> Vec<&TypeParameter> {
        let scopes: Vec<Namespace> = if global {
            ns.lineage().collect()
        } else {
            vec![ns.clone()]
        };
        let mut out: Vec<&TypeParameter> = Vec::new();
        for scope in &scopes {
            let Some(bindings) = self.scopes.get(scope) else {
                continue;
            };
            for param in &bindings.types {
                match out.iter().position(|t| t.name == param.name) {
                    Some(i) => out[i] = param,
                    None => out.push(param),
                }
            }
        }
        out
    }

    /// Every declaration at `ns` (`only_current`) or visible from it.
    /// Declarations made exactly at `ns` come back in registration order.
    pub fn get_declarations(&self, ns: &Namespace, only_current: bool) -> Vec<&Decl> {
        if only_current {
            return self
                .scopes
                .get(ns)
                .map(|b| b.decls.iter().collect())
                .unwrap_or_default();
        }
        let mut out = self.lookup(ns, Kind::Var, true);
        out.extend(self.lookup(ns, Kind::Func, true));
        out.extend(self.lookup(ns, Kind::Class, true));
        out.extend(self.lookup(ns, Kind::Lambda, true));
        out
    }

    /// Top-level declarations in registration order.
    pub fn top_level(&self) -> Vec<&Decl> {
        self.scopes
            .get(&Namespace::global())
            .map(|b| b.decls.iter().collect())
            .unwrap_or_default()
    }

    pub fn remove_var(&mut self, ns: &Namespace, name: &str) -> Option<Decl> {
        let bindings = self.scopes.get_mut(ns)?;
        let idx = bindings.position(Kind::Var, name)?;
        Some(bindings.decls.remove(idx))
    }

    pub fn remove_type(&mut self, ns: &Namespace, name: &str) -> Option<TypeParameter> {
        let bindings = self.scopes.get_mut(ns)?;
        let idx = bindings.types.iter().position(|t| t.name == name)?;
        Some(bindings.types.remove(idx))
    }

    /// Drop every binding declared at `ns` or below it.
    pub fn remove_namespace(&mut self, ns: &Namespace) {
        self.scopes.retain(|scope, _| !scope.starts_with(ns));
    }

    pub fn var_mut(&mut self, ns: &Namespace, name: &str) -> Option<&mut Decl> {
        let bindings = self.scopes.get_mut(ns)?;
        let idx = bindings.position(Kind::Var, name)?;
        bindings.decls.get_mut(idx)
    }

    pub fn func_mut(&mut self, ns: &Namespace, name: &str) -> Option<&mut FuncDecl> {
        let bindings = self.scopes.get_mut(ns)?;
        let idx = bindings.position(Kind::Func, name)?;
        match bindings.decls.get_mut(idx) {
            Some(Decl::Func(f)) => Some(f),
            _ => None,
        }
    }

    pub fn class_mut(&mut self, ns: &Namespace, name: &str) -> Option<&mut ClassDecl> {
        let bindings = self.scopes.get_mut(ns)?;
        let idx = bindings.position(Kind::Class, name)?;
        match bindings.decls.get_mut(idx) {
            Some(Decl::Class(c)) => Some(c),
            _ => None,
        }
    }
}
