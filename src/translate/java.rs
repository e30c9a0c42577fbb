// src/translate/java.rs
//
// Java emitter. Everything is nested in a single `Main` class: top-level
// variables and functions become static members, classes become static
// nested classes. Function types are rendered as `FunctionN` interfaces
// declared at the end of `Main`, one per arity in use.

use std::collections::BTreeSet;

use super::{Translator, Writer, join, unresolved_error};
use crate::ast::{
    ClassDecl, ClassKind, Decl, Expr, FuncDecl, FuncKind, LambdaDecl, Loop, Program, Stmt,
    VarDecl,
};
use crate::builtins::{Catalog, Language};
use crate::errors::{GenerateError, Result};
use crate::types::{Type, TypeParameter, Variance};

/// Name of the wrapping class.
const MAIN: &str = "Main";

pub struct JavaTranslator {
    w: Writer,
    strict: bool,
    top: Type,
    /// `FunctionN` arities referenced so far.
    arities: BTreeSet<usize>,
    /// Variables narrowed by an enclosing `instanceof`, innermost last.
    casts: Vec<(String, Type)>,
}

impl JavaTranslator {
    pub fn new(strict: bool) -> Self {
        Self {
            w: Writer::default(),
            strict,
            top: Catalog::new(Language::Java).any_type(),
            arities: BTreeSet::new(),
            casts: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn ty(&mut self, t: &Type) -> String {
        match t {
            Type::Builtin(b) => b.name.clone(),
            Type::Simple(s) => s.name.clone(),
            Type::TypeParam(tp) => tp.name.clone(),
            Type::Wildcard(w) => match (&w.bound, w.variance) {
                (None, _) => "?".to_string(),
                (Some(b), Variance::Contravariant) => format!("? super {}", self.type_arg(b)),
                (Some(b), _) => format!("? extends {}", self.type_arg(b)),
            },
            Type::Parameterized(p) => {
                if p.ctor.is_function() {
                    self.arities.insert(p.type_args.len().saturating_sub(1));
                }
                if p.ctor.builtin && p.ctor.name == "Array" {
                    if let Some(elem) = p.type_args.first() {
                        return format!("{}[]", self.exact_ty(elem));
                    }
                }
                let args: Vec<String> = p.type_args.iter().map(|a| self.type_arg(a)).collect();
                format!("{}<{}>", p.ctor.name, args.join(", "))
            }
            // A bare constructor only shows up erased.
            Type::Constructor(c) => c.name.clone(),
        }
    }

    /// A type in argument position: reference types only.
    fn type_arg(&mut self, t: &Type) -> String {
        if t.is_void() {
            return "Void".to_string();
        }
        self.ty(&t.box_type())
    }

    /// A type without wildcards, for creation and explicit call type
    /// arguments.
    fn exact_ty(&mut self, t: &Type) -> String {
        let free = t.to_variance_free(&self.top);
        self.type_arg(&free)
    }

    /// The erased form used by `instanceof` and array creation.
    fn raw_ty(&mut self, t: &Type) -> String {
        match t {
            Type::Parameterized(p) if p.ctor.builtin && p.ctor.name == "Array" => self.ty(t),
            Type::Parameterized(p) => {
                if p.ctor.is_function() {
                    self.arities.insert(p.type_args.len().saturating_sub(1));
                }
                p.ctor.name.clone()
            }
            other => self.type_arg(other),
        }
    }

    fn ret_ty(&mut self, t: &Type) -> String {
        if t.is_void() {
            "void".to_string()
        } else {
            self.ty(t)
        }
    }

    fn type_params(&mut self, tps: &[TypeParameter]) -> String {
        if tps.is_empty() {
            return String::new();
        }
        let mut rendered = Vec::with_capacity(tps.len());
        for tp in tps {
            match &tp.bound {
                Some(b) => {
                    let bound = self.type_arg(b);
                    rendered.push(format!("{} extends {bound}", tp.name));
                }
                None => rendered.push(tp.name.clone()),
            }
        }
        format!("<{}>", rendered.join(", "))
    }

    fn call_type_args(&mut self, args: &[Type]) -> String {
        if args.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = args.iter().map(|a| self.exact_ty(a)).collect();
        format!("<{}>", rendered.join(", "))
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn top_level_decl(&mut self, decl: &Decl) -> Result<()> {
        match decl {
            Decl::Var(v) => {
                let ty = self.ty(&v.ty);
                let init = self.expr(&v.expr)?;
                let modifier = if v.is_final { "static final" } else { "static" };
                self.w.line(format!("{modifier} {ty} {} = {init};", v.name));
                Ok(())
            }
            Decl::Func(f) => self.method(f, None),
            Decl::Class(c) => self.class_decl(c),
            Decl::Param(_) | Decl::Field(_) | Decl::Lambda(_) => Ok(()),
        }
    }

    fn local_decl(&mut self, decl: &Decl) -> Result<()> {
        match decl {
            Decl::Var(v) => self.local_var(v),
            Decl::Func(f) => self.local_func(f),
            Decl::Class(c) => self.class_decl(c),
            Decl::Param(_) | Decl::Field(_) | Decl::Lambda(_) => Ok(()),
        }
    }

    fn local_var(&mut self, v: &VarDecl) -> Result<()> {
        let modifier = if v.is_final { "final " } else { "" };
        // `var` over a literal would infer a primitive with no members.
        let ty = if v.inferred && !v.ty.is_builtin() {
            "var".to_string()
        } else {
            self.ty(&v.ty)
        };
        let init = self.expr(&v.expr)?;
        self.w.line(format!("{modifier}{ty} {} = {init};", v.name));
        Ok(())
    }

    /// A nested function, declared as a final closure variable.
    fn local_func(&mut self, f: &FuncDecl) -> Result<()> {
        let mut sig = f.param_types();
        sig.push(f.ret_type.clone());
        let arity = f.params.len();
        self.arities.insert(arity);
        let args: Vec<String> = sig.iter().map(|t| self.type_arg(t)).collect();
        let named: Vec<(String, Type)> =
            f.params.iter().map(|p| (p.name.clone(), p.ty.clone())).collect();
        let params = self.lambda_params(&named);
        self.w.line(format!(
            "final Function{arity}<{}> {} = ({params}) -> {{",
            args.join(", "),
            f.name
        ));
        self.w.indent();
        let result = match f.body.as_deref() {
            Some(body) => self.body(body, &f.ret_type, true),
            None => Err(GenerateError::invariant(format!(
                "nested function '{}' has no body",
                f.name
            ))),
        };
        self.w.dedent();
        result?;
        self.w.line("};");
        Ok(())
    }

    fn lambda_params(&mut self, params: &[(String, Type)]) -> String {
        let rendered: Vec<String> = params
            .iter()
            .map(|(name, ty)| format!("{} {name}", self.ty(ty)))
            .collect();
        rendered.join(", ")
    }

    /// A top-level function (`owner` is `None`) or a method.
    fn method(&mut self, f: &FuncDecl, owner: Option<&ClassDecl>) -> Result<()> {
        let modifiers = match owner {
            None if f.kind == FuncKind::TopLevel && f.name == "main" => "public static ",
            None => "static ",
            Some(c) if c.is_interface() => "",
            Some(_) if f.is_abstract() => "public abstract ",
            Some(_) => "public ",
        };
        let tps = self.type_params(&f.type_params);
        let tps = if tps.is_empty() { tps } else { format!("{tps} ") };
        let ret = self.ret_ty(&f.ret_type);
        let mut params = Vec::with_capacity(f.params.len());
        for p in &f.params {
            params.push(format!("{} {}", self.ty(&p.ty), p.name));
        }
        let header = format!("{modifiers}{tps}{ret} {}({})", f.name, params.join(", "));

        let Some(body) = f.body.as_deref() else {
            self.w.line(format!("{header};"));
            return Ok(());
        };
        self.w.line(format!("{header} {{"));
        self.w.indent();
        let result = self.body(body, &f.ret_type, false);
        self.w.dedent();
        result?;
        self.w.line("}");
        Ok(())
    }

    /// Statements of a function or closure body. Non-void bodies return
    /// their last expression; `void_null` ends void bodies with
    /// `return null;` for `Void`-returning closures.
    fn body(&mut self, body: &Expr, ret: &Type, void_null: bool) -> Result<()> {
        let returns = !ret.is_void();
        match body {
            Expr::Block(block) => {
                let last = block.stmts.len().saturating_sub(1);
                for (i, stmt) in block.stmts.iter().enumerate() {
                    match stmt {
                        Stmt::Expr(e) if returns && i == last => {
                            let value = self.expr(e)?;
                            self.w.line(format!("return {value};"));
                        }
                        other => self.stmt(other)?,
                    }
                }
            }
            e if returns => {
                let value = self.expr(e)?;
                self.w.line(format!("return {value};"));
            }
            e => self.expr_stmt(e)?,
        }
        if !returns && void_null {
            self.w.line("return null;");
        }
        Ok(())
    }

    fn class_decl(&mut self, class: &ClassDecl) -> Result<()> {
        let tps = self.type_params(&class.type_params);
        let mut extends = Vec::new();
        let mut implements = Vec::new();
        let mut super_args = None;
        for sup in &class.superclasses {
            let name = self.ty(&sup.class_type);
            match &sup.args {
                Some(args) => {
                    let mut rendered = Vec::with_capacity(args.len());
                    for a in args {
                        rendered.push(self.expr(a)?);
                    }
                    super_args = Some(rendered.join(", "));
                    extends.push(name);
                }
                // Interfaces extend interfaces; classes implement them.
                None if class.is_interface() => extends.push(name),
                None => implements.push(name),
            }
        }

        let keyword = match class.kind {
            ClassKind::Interface => "interface",
            ClassKind::Abstract => "static abstract class",
            ClassKind::Regular if class.is_final => "static final class",
            ClassKind::Regular => "static class",
        };
        let mut header = format!("{keyword} {}{tps}", class.name);
        if !extends.is_empty() {
            header.push_str(&format!(" extends {}", extends.join(", ")));
        }
        if !implements.is_empty() {
            header.push_str(&format!(" implements {}", implements.join(", ")));
        }
        self.w.line(format!("{header} {{"));
        self.w.indent();
        let result = self.class_body(class, super_args);
        self.w.dedent();
        result?;
        self.w.line("}");
        Ok(())
    }

    fn class_body(&mut self, class: &ClassDecl, super_args: Option<String>) -> Result<()> {
        for f in &class.fields {
            let modifier = if f.is_final { "final " } else { "" };
            let ty = self.ty(&f.ty);
            self.w.line(format!("{modifier}{ty} {};", f.name));
        }
        if !class.is_interface() && (!class.fields.is_empty() || super_args.is_some()) {
            if !class.fields.is_empty() {
                self.w.blank();
            }
            let mut params = Vec::with_capacity(class.fields.len());
            for f in &class.fields {
                params.push(format!("{} {}", self.ty(&f.ty), f.name));
            }
            self.w.line(format!("{}({}) {{", class.name, params.join(", ")));
            self.w.indent();
            if let Some(args) = &super_args {
                self.w.line(format!("super({args});"));
            }
            for f in &class.fields {
                self.w.line(format!("this.{0} = {0};", f.name));
            }
            self.w.dedent();
            self.w.line("}");
        }
        for func in &class.functions {
            self.w.blank();
            self.method(func, Some(class))?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Decl(d) => self.local_decl(d),
            Stmt::Expr(e) => self.expr_stmt(e),
        }
    }

    /// An expression in statement position. Conditionals become `if`
    /// statements; values that Java does not accept as statements are
    /// consumed by a call.
    fn expr_stmt(&mut self, e: &Expr) -> Result<()> {
        match e {
            Expr::Block(block) => {
                let text = self.braced(&block.stmts)?;
                self.w.line(text);
            }
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let cond_text = self.expr(cond)?;
                self.w.line(format!("if ({cond_text}) {{"));
                self.w.indent();
                let narrowed = self.push_cast(cond);
                let result = self.expr_stmt(then_branch);
                if narrowed {
                    self.casts.pop();
                }
                self.w.dedent();
                result?;
                self.w.line("} else {");
                self.w.indent();
                let result = self.expr_stmt(else_branch);
                self.w.dedent();
                result?;
                self.w.line("}");
            }
            Expr::Loop(lp) => self.loop_stmt(lp)?,
            Expr::Unresolved(ty) if ty.is_void() => {
                if self.strict {
                    return Err(unresolved_error(ty));
                }
            }
            Expr::New { .. }
            | Expr::FunctionCall { .. }
            | Expr::Assignment { .. }
            | Expr::IncDec { .. }
            | Expr::Print(_) => {
                let text = self.expr(e)?;
                self.w.line(format!("{text};"));
            }
            other => {
                let text = self.expr(other)?;
                self.w.line(format!("java.util.Objects.hashCode({text});"));
            }
        }
        Ok(())
    }

    fn braced(&mut self, stmts: &[Stmt]) -> Result<String> {
        let saved = self.w.open();
        let result = stmts.iter().try_for_each(|s| self.stmt(s));
        let body = self.w.close(saved);
        result?;
        Ok(format!("{{\n{body}{}}}", self.w.pad()))
    }

    fn loop_stmt(&mut self, lp: &Loop) -> Result<()> {
        let text = match lp {
            Loop::ForEach {
                var,
                iterable,
                body,
            } => {
                let elem = iterable
                    .ty()
                    .and_then(|t| t.type_args().first().cloned())
                    .unwrap_or_else(|| self.top.clone());
                let elem = self.exact_ty(&elem);
                let iterable = self.expr(iterable)?;
                let body = self.braced(&body.stmts)?;
                format!("for ({elem} {var} : {iterable}) {body}")
            }
            Loop::ForRange { var, from, to, body } => {
                let (from, to) = (self.expr(from)?, self.expr(to)?);
                let body = self.braced(&body.stmts)?;
                format!("for (int {var} = {from}; {var} < {to}; {var}++) {body}")
            }
            Loop::While {
                cond,
                body,
                do_while,
            } => {
                let cond = self.expr(cond)?;
                let body = self.braced(&body.stmts)?;
                if *do_while {
                    format!("do {body} while ({cond});")
                } else {
                    format!("while ({cond}) {body}")
                }
            }
        };
        self.w.line(text);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Record the narrowing of an `instanceof` condition. Returns whether
    /// one was pushed.
    fn push_cast(&mut self, cond: &Expr) -> bool {
        match cond {
            Expr::Is { var, target, .. } => {
                self.casts.push((var.clone(), target.clone()));
                true
            }
            _ => false,
        }
    }

    fn exprs(&mut self, exprs: &[Expr]) -> Result<String> {
        let mut rendered = Vec::with_capacity(exprs.len());
        for e in exprs {
            rendered.push(self.expr(e)?);
        }
        Ok(rendered.join(", "))
    }

    fn variable(&mut self, name: &str) -> String {
        let narrowed = self
            .casts
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, ty)| ty.clone());
        match narrowed {
            Some(ty) => format!("(({}) {name})", self.ty(&ty)),
            None => name.to_string(),
        }
    }

    fn branch(&mut self, e: &Expr) -> Result<String> {
        match e {
            Expr::Block(_) => Err(GenerateError::Translation {
                detail: "block in expression position".to_string(),
            }),
            other => self.expr(other),
        }
    }

    fn lambda(&mut self, l: &LambdaDecl) -> Result<String> {
        let params: Vec<(String, Type)> =
            l.params.iter().map(|p| (p.name.clone(), p.ty.clone())).collect();
        let params = self.lambda_params(&params);
        // Only `FunctionN` closures return `Void`; SAM methods may be void.
        let void_null = l.sam_target.is_none();
        if void_null {
            // Registers the arity even when no declared type mentions it.
            self.ty(&l.signature);
        }
        let simple = !matches!(l.body.as_ref(), Expr::Block(_)) && !l.ret_type.is_void();
        if simple {
            return Ok(format!("({params}) -> {}", self.expr(&l.body)?));
        }
        let saved = self.w.open();
        let result = self.body(&l.body, &l.ret_type, void_null);
        let body = self.w.close(saved);
        result?;
        Ok(format!("({params}) -> {{\n{body}{}}}", self.w.pad()))
    }

    /// A reference to a void function cannot target a `Void`-returning
    /// `FunctionN`, so it is wrapped in a closure.
    fn function_ref(&mut self, receiver: &str, name: &str, signature: &Type) -> String {
        self.ty(signature);
        let Some((params, _)) = signature
            .function_signature()
            .filter(|(_, ret)| ret.is_void())
        else {
            return format!("{receiver}::{name}");
        };
        let named: Vec<(String, Type)> = params
            .iter()
            .enumerate()
            .map(|(i, t)| (format!("p{i}"), t.clone()))
            .collect();
        let args = join(named.iter().map(|(n, _)| n.clone()));
        let params = self.lambda_params(&named);
        format!("({params}) -> {{ {receiver}.{name}({args}); return null; }}")
    }

    fn array(&mut self, ty: &Type, elems: &[Expr]) -> Result<String> {
        let elem = ty
            .type_args()
            .first()
            .cloned()
            .unwrap_or_else(|| self.top.clone());
        let values = self.exprs(elems)?;
        let is_list = matches!(ty, Type::Parameterized(p) if p.ctor.name.ends_with("ArrayList"));
        if is_list {
            let elem = self.exact_ty(&elem);
            return Ok(if elems.is_empty() {
                format!("new java.util.ArrayList<{elem}>()")
            } else {
                format!(
                    "new java.util.ArrayList<{elem}>(java.util.Arrays.<{elem}>asList({values}))"
                )
            });
        }
        let elem = elem.to_variance_free(&self.top);
        Ok(match &elem {
            Type::TypeParam(_) => {
                format!("(({}[]) new Object[]{{{values}}})", self.ty(&elem))
            }
            Type::Parameterized(_) => {
                let exact = self.exact_ty(&elem);
                let raw = self.raw_ty(&elem);
                format!("(({exact}[]) new {raw}[]{{{values}}})")
            }
            _ => format!("new {}[]{{{values}}}", self.exact_ty(&elem)),
        })
    }

    /// A member-access receiver. Numeric arithmetic yields a primitive,
    /// which has no members, so it is boxed first.
    fn receiver(&mut self, e: &Expr) -> Result<String> {
        match e {
            Expr::Arith { ty, .. } if primitive_name(ty).is_some() => {
                Ok(format!("(({}) {})", self.ty(ty), self.expr(e)?))
            }
            other => self.expr(other),
        }
    }

    fn expr(&mut self, e: &Expr) -> Result<String> {
        Ok(match e {
            Expr::Unresolved(ty) => {
                if self.strict {
                    return Err(unresolved_error(self.ty(ty)));
                }
                format!("(({}) null)", self.exact_ty(ty))
            }
            Expr::Constant { literal, .. } => literal.clone(),
            Expr::Variable { name, .. } => self.variable(name),
            Expr::Block(_) => {
                return Err(GenerateError::Translation {
                    detail: "block in expression position".to_string(),
                });
            }
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let cond_text = self.expr(cond)?;
                let narrowed = self.push_cast(cond);
                let then_text = self.branch(then_branch);
                if narrowed {
                    self.casts.pop();
                }
                let then_text = then_text?;
                let else_text = self.branch(else_branch)?;
                format!("({cond_text} ? {then_text} : {else_text})")
            }
            Expr::Is { var, target, .. } => {
                format!("({var} instanceof {})", self.raw_ty(target))
            }
            Expr::Logical { op, lhs, rhs, .. } => {
                format!("({} {} {})", self.expr(lhs)?, op.symbol(), self.expr(rhs)?)
            }
            Expr::Equality { op, lhs, rhs, .. } => {
                format!("({} {} {})", self.expr(lhs)?, op.symbol(), self.expr(rhs)?)
            }
            Expr::Comparison { op, lhs, rhs, .. } => {
                format!("({} {} {})", self.expr(lhs)?, op.symbol(), self.expr(rhs)?)
            }
            Expr::Arith {
                op,
                lhs,
                rhs,
                ty,
                cast,
            } => {
                let value = format!("({} {} {})", self.expr(lhs)?, op.symbol(), self.expr(rhs)?);
                match primitive_name(ty).filter(|_| *cast) {
                    Some(p) => format!("(({p}) {value})"),
                    None => value,
                }
            }
            Expr::New { class_type, args } => {
                let ty = self.exact_ty(class_type);
                format!("new {ty}({})", self.exprs(args)?)
            }
            Expr::FieldAccess {
                receiver, field, ..
            } => format!("{}.{field}", self.expr(receiver)?),
            Expr::FunctionCall {
                name,
                args,
                receiver,
                type_args,
                is_ref_call,
                ..
            } => {
                let args = self.exprs(args)?;
                if *is_ref_call {
                    format!("{}.apply({args})", self.variable(name))
                } else {
                    let type_args = self.call_type_args(type_args);
                    let receiver = match receiver {
                        Some(r) => self.receiver(r)?,
                        None => MAIN.to_string(),
                    };
                    format!("{receiver}.{type_args}{name}({args})")
                }
            }
            Expr::FunctionRef {
                receiver,
                name,
                signature,
            } => {
                let receiver = match receiver {
                    Some(r) => self.receiver(r)?,
                    None => MAIN.to_string(),
                };
                self.function_ref(&receiver, name, signature)
            }
            Expr::Lambda(l) => self.lambda(l)?,
            Expr::Array { ty, elems } => self.array(ty, elems)?,
            Expr::Cast { expr, ty } => format!("(({}) {})", self.ty(ty), self.expr(expr)?),
            Expr::Assignment {
                receiver,
                name,
                value,
            } => {
                let value = self.expr(value)?;
                match receiver {
                    Some(r) => format!("{}.{name} = {value}", self.expr(r)?),
                    None => format!("{name} = {value}"),
                }
            }
            Expr::IncDec { name, op } => format!("{name}{}", op.symbol()),
            Expr::Loop(_) => {
                return Err(GenerateError::Translation {
                    detail: "loop in expression position".to_string(),
                });
            }
            Expr::StringLength { expr, .. } => format!("{}.length()", self.expr(expr)?),
            Expr::Print(expr) => format!("System.out.println({})", self.expr(expr)?),
        })
    }

    fn function_interfaces(&mut self) {
        for &arity in &self.arities {
            let mut params: Vec<String> = (1..=arity).map(|i| format!("A{i}")).collect();
            let args = join((1..=arity).map(|i| format!("A{i} a{i}")));
            params.push("R".to_string());
            self.w.line(format!(
                "interface Function{arity}<{}> {{ R apply({args}); }}",
                params.join(", ")
            ));
        }
    }
}

impl Translator for JavaTranslator {
    fn visit_program(&mut self, program: &Program) -> Result<()> {
        self.w.line(format!("class {MAIN} {{"));
        self.w.indent();
        let mut first = true;
        for decl in program.top_level() {
            if matches!(decl, Decl::Lambda(_)) {
                continue;
            }
            if !first {
                self.w.blank();
            }
            first = false;
            self.top_level_decl(decl)?;
        }
        if !self.arities.is_empty() {
            self.w.blank();
            self.function_interfaces();
        }
        self.w.dedent();
        self.w.line("}");
        Ok(())
    }

    fn result(self) -> String {
        self.w.finish()
    }
}

/// The unboxed name of a builtin, if Java has one.
fn primitive_name(t: &Type) -> Option<String> {
    let kind = t.builtin_kind()?;
    let primitive = Catalog::new(Language::Java).primitive(kind)?;
    Some(primitive.name().to_string())
}
