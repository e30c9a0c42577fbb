// src/translate/kotlin.rs
//
// Kotlin emitter. Top-level declarations stay at file level; class fields
// become primary-constructor properties.

use super::{Translator, Writer, join, unresolved_error};
use crate::ast::{
    Block, ClassDecl, ClassKind, Decl, Expr, FieldDecl, FuncDecl, FuncKind, LambdaDecl, Loop,
    ParamDecl, Program, Stmt, VarDecl,
};
use crate::context::Context;
use crate::errors::Result;
use crate::type_utils::is_sam;
use crate::types::{Type, TypeParameter, Variance};

pub struct KotlinTranslator {
    w: Writer,
    strict: bool,
    /// Declarations of the program being emitted, for SAM checks.
    context: Context,
}

impl KotlinTranslator {
    pub fn new(strict: bool) -> Self {
        Self {
            w: Writer::default(),
            strict,
            context: Context::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    fn ty(&self, t: &Type) -> String {
        match t {
            Type::Builtin(b) => b.name.clone(),
            Type::Simple(s) => s.name.clone(),
            Type::TypeParam(tp) => tp.name.clone(),
            Type::Wildcard(w) => match (&w.bound, w.variance) {
                (None, _) => "*".to_string(),
                (Some(b), Variance::Contravariant) => format!("in {}", self.ty(b)),
                (Some(b), Variance::Covariant) => format!("out {}", self.ty(b)),
                (Some(b), Variance::Invariant) => self.ty(b),
            },
            Type::Parameterized(p) => {
                if let Some((params, ret)) = t.function_signature() {
                    let params = join(params.iter().map(|a| self.ty(a)));
                    return format!("({params}) -> {}", self.ty(ret));
                }
                // Arrays are covariant in the type model.
                if p.ctor.builtin && p.ctor.name == "Array" {
                    if let Some(arg) = p.type_args.first() {
                        return match arg {
                            Type::Wildcard(_) => format!("Array<{}>", self.ty(arg)),
                            _ => format!("Array<out {}>", self.ty(arg)),
                        };
                    }
                }
                let args = join(p.type_args.iter().map(|a| self.ty(a)));
                format!("{}<{args}>", p.ctor.name)
            }
            Type::Constructor(c) => {
                let stars = join(c.type_parameters.iter().map(|_| "*".to_string()));
                format!("{}<{stars}>", c.name)
            }
        }
    }

    /// A type in a position that does not admit projections: call type
    /// arguments and array element types.
    fn exact_ty(&self, t: &Type) -> String {
        match t {
            Type::Wildcard(w) => match &w.bound {
                Some(b) => self.exact_ty(b),
                None => "Any".to_string(),
            },
            other => self.ty(other),
        }
    }

    fn type_params(&self, tps: &[TypeParameter]) -> String {
        if tps.is_empty() {
            return String::new();
        }
        let rendered = tps.iter().map(|tp| {
            let variance = match tp.variance {
                Variance::Invariant => "",
                Variance::Covariant => "out ",
                Variance::Contravariant => "in ",
            };
            match &tp.bound {
                Some(b) => format!("{variance}{} : {}", tp.name, self.ty(b)),
                None => format!("{variance}{}", tp.name),
            }
        });
        format!("<{}>", join(rendered))
    }

    fn type_args(&self, args: &[Type]) -> String {
        if args.is_empty() {
            return String::new();
        }
        format!("<{}>", join(args.iter().map(|a| self.exact_ty(a))))
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn decl(&mut self, decl: &Decl) -> Result<()> {
        match decl {
            Decl::Var(v) => self.var_decl(v),
            Decl::Func(f) => self.func_decl(f, None),
            Decl::Class(c) => self.class_decl(c),
            // Parameters and fields are emitted by their owners; closures
            // inline where they are used.
            Decl::Param(_) | Decl::Field(_) | Decl::Lambda(_) => Ok(()),
        }
    }

    fn var_decl(&mut self, v: &VarDecl) -> Result<()> {
        let keyword = if v.is_final { "val" } else { "var" };
        let init = self.expr(&v.expr)?;
        if v.inferred {
            self.w.line(format!("{keyword} {} = {init}", v.name));
        } else {
            self.w
                .line(format!("{keyword} {}: {} = {init}", v.name, self.ty(&v.ty)));
        }
        Ok(())
    }

    fn param(&mut self, p: &ParamDecl) -> Result<String> {
        let mut text = format!("{}: {}", p.name, self.ty(&p.ty));
        if let Some(default) = &p.default {
            text.push_str(" = ");
            text.push_str(&self.expr(default)?);
        }
        Ok(text)
    }

    fn func_modifiers(func: &FuncDecl, owner: Option<&ClassDecl>) -> &'static str {
        let Some(owner) = owner else {
            return "";
        };
        if func.is_abstract() {
            return match (owner.kind, func.is_override) {
                (ClassKind::Interface, false) => "",
                (ClassKind::Interface, true) => "override ",
                (_, false) => "abstract ",
                (_, true) => "abstract override ",
            };
        }
        if func.is_override {
            "override "
        } else if !func.is_final && !owner.is_interface() {
            "open "
        } else {
            ""
        }
    }

    fn func_decl(&mut self, func: &FuncDecl, owner: Option<&ClassDecl>) -> Result<()> {
        let modifiers = Self::func_modifiers(func, owner);
        let tps = self.type_params(&func.type_params);
        let tps = if tps.is_empty() { tps } else { format!("{tps} ") };
        let params = if func.kind == FuncKind::TopLevel && func.name == "main" {
            // The entry point must take exactly `Array<String>`.
            join(func.params.iter().map(|p| format!("{}: Array<String>", p.name)))
        } else {
            let mut rendered = Vec::with_capacity(func.params.len());
            for p in &func.params {
                rendered.push(self.param(p)?);
            }
            rendered.join(", ")
        };
        let ret = if func.ret_type.is_void() {
            String::new()
        } else {
            format!(": {}", self.ty(&func.ret_type))
        };
        let header = format!("{modifiers}fun {tps}{}({params}){ret}", func.name);

        match func.body.as_deref() {
            None => self.w.line(header),
            Some(Expr::Block(block)) => {
                self.w.line(format!("{header} {{"));
                self.w.indent();
                let result = self.body_stmts(block, !func.ret_type.is_void());
                self.w.dedent();
                result?;
                self.w.line("}");
            }
            Some(expr) => {
                let value = self.expr(expr)?;
                self.w.line(format!("{header} = {value}"));
            }
        }
        Ok(())
    }

    /// Statements of a function body; with `returns`, the last expression
    /// is returned.
    fn body_stmts(&mut self, block: &Block, returns: bool) -> Result<()> {
        let last = block.stmts.len().saturating_sub(1);
        for (i, stmt) in block.stmts.iter().enumerate() {
            match stmt {
                Stmt::Expr(e) if returns && i == last => {
                    let value = self.expr(e)?;
                    self.w.line(format!("return {value}"));
                }
                other => self.stmt(other)?,
            }
        }
        Ok(())
    }

    fn field(&self, f: &FieldDecl, class: &ClassDecl) -> String {
        let modifier = if f.is_override {
            "override "
        } else if f.can_override && !class.is_final {
            "open "
        } else {
            ""
        };
        let keyword = if f.is_final { "val" } else { "var" };
        format!("{modifier}{keyword} {}: {}", f.name, self.ty(&f.ty))
    }

    /// The class viewed from inside: applied to its own type parameters.
    fn self_type(class: &ClassDecl) -> Type {
        match class.get_type() {
            Type::Constructor(ctor) => ctor.apply(
                class
                    .type_params
                    .iter()
                    .cloned()
                    .map(Type::TypeParam)
                    .collect(),
            ),
            simple => simple,
        }
    }

    fn class_decl(&mut self, class: &ClassDecl) -> Result<()> {
        let keyword = match class.kind {
            ClassKind::Interface if is_sam(&self.context, &Self::self_type(class)) => {
                "fun interface"
            }
            ClassKind::Interface => "interface",
            ClassKind::Abstract => "abstract class",
            ClassKind::Regular if class.is_final => "class",
            ClassKind::Regular => "open class",
        };
        let mut header = format!("{keyword} {}{}", class.name, self.type_params(&class.type_params));
        if !class.fields.is_empty() {
            let fields = join(class.fields.iter().map(|f| self.field(f, class)));
            header.push_str(&format!("({fields})"));
        }
        let mut supers = Vec::with_capacity(class.superclasses.len());
        for sup in &class.superclasses {
            let name = self.ty(&sup.class_type);
            match &sup.args {
                Some(args) => {
                    let mut rendered = Vec::with_capacity(args.len());
                    for a in args {
                        rendered.push(self.expr(a)?);
                    }
                    supers.push(format!("{name}({})", rendered.join(", ")));
                }
                None => supers.push(name),
            }
        }
        if !supers.is_empty() {
            header.push_str(&format!(" : {}", supers.join(", ")));
        }

        if class.functions.is_empty() {
            self.w.line(header);
            return Ok(());
        }
        self.w.line(format!("{header} {{"));
        self.w.indent();
        let mut result = Ok(());
        for (i, func) in class.functions.iter().enumerate() {
            if i > 0 {
                self.w.blank();
            }
            result = self.func_decl(func, Some(class));
            if result.is_err() {
                break;
            }
        }
        self.w.dedent();
        result?;
        self.w.line("}");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Decl(d) => self.decl(d),
            Stmt::Expr(e) => {
                let text = self.expr(e)?;
                self.w.line(text);
                Ok(())
            }
        }
    }

    /// `{header` newline, the statements one level deeper, closing brace.
    fn braced(&mut self, header: &str, stmts: &[Stmt]) -> Result<String> {
        let saved = self.w.open();
        let result = stmts.iter().try_for_each(|s| self.stmt(s));
        let body = self.w.close(saved);
        result?;
        Ok(format!("{{{header}\n{body}{}}}", self.w.pad()))
    }

    fn loop_expr(&mut self, lp: &Loop) -> Result<String> {
        match lp {
            Loop::ForEach {
                var,
                iterable,
                body,
            } => {
                let iterable = self.expr(iterable)?;
                let body = self.braced("", &body.stmts)?;
                Ok(format!("for ({var} in {iterable}) {body}"))
            }
            Loop::ForRange { var, from, to, body } => {
                let (from, to) = (self.expr(from)?, self.expr(to)?);
                let body = self.braced("", &body.stmts)?;
                Ok(format!("for ({var} in {from} until {to}) {body}"))
            }
            Loop::While {
                cond,
                body,
                do_while,
            } => {
                let cond = self.expr(cond)?;
                let body = self.braced("", &body.stmts)?;
                if *do_while {
                    Ok(format!("do {body} while ({cond})"))
                } else {
                    Ok(format!("while ({cond}) {body}"))
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn exprs(&mut self, exprs: &[Expr]) -> Result<String> {
        let mut rendered = Vec::with_capacity(exprs.len());
        for e in exprs {
            rendered.push(self.expr(e)?);
        }
        Ok(rendered.join(", "))
    }

    /// An expression used before `.` or `::`.
    fn receiver(&mut self, e: &Expr) -> Result<String> {
        match e {
            // `Nothing` has no members; give the placeholder its type.
            Expr::Unresolved(ty) if !self.strict => Ok(format!("(TODO() as {})", self.ty(ty))),
            Expr::Lambda(_) => Ok(format!("({})", self.expr(e)?)),
            other => self.expr(other),
        }
    }

    /// A conditional branch. Blocks keep their braces; lambdas are
    /// parenthesized so their braces are not read as a block.
    fn branch(&mut self, e: &Expr) -> Result<String> {
        match e {
            Expr::Block(block) => self.braced("", &block.stmts),
            Expr::Lambda(_) => Ok(format!("({})", self.expr(e)?)),
            other => self.expr(other),
        }
    }

    fn lambda(&mut self, l: &LambdaDecl) -> Result<String> {
        let params = join(
            l.params
                .iter()
                .map(|p| format!("{}: {}", p.name, self.ty(&p.ty))),
        );
        let header = if params.is_empty() {
            String::new()
        } else {
            format!(" {params} ->")
        };
        let text = match l.body.as_ref() {
            Expr::Block(block) => self.braced(&header, &block.stmts)?,
            body => {
                let value = self.expr(body)?;
                format!("{{{header} {value} }}")
            }
        };
        Ok(match &l.sam_target {
            Some(target) => format!("{} {text}", self.ty(target)),
            None => text,
        })
    }

    fn array(&mut self, ty: &Type, elems: &[Expr]) -> Result<String> {
        let elem = ty.type_args().first().cloned();
        let values = self.exprs(elems)?;
        let is_list = matches!(ty, Type::Parameterized(p) if p.ctor.name == "ArrayList");
        Ok(match elem {
            Some(e) if is_list => format!("arrayListOf<{}>({values})", self.exact_ty(&e)),
            // Array creation needs a reified element type.
            Some(e) if e.has_type_variables() => {
                format!("(arrayOf<Any?>({values}) as {})", self.ty(ty))
            }
            Some(e) => format!("arrayOf<{}>({values})", self.exact_ty(&e)),
            None => format!("arrayOf<Any>({values})"),
        })
    }

    fn expr(&mut self, e: &Expr) -> Result<String> {
        Ok(match e {
            Expr::Unresolved(ty) => {
                if self.strict {
                    return Err(unresolved_error(self.ty(ty)));
                }
                "TODO()".to_string()
            }
            Expr::Constant { literal, .. } => literal.clone(),
            Expr::Variable { name, .. } => name.clone(),
            Expr::Block(block) => format!("run {}", self.braced("", &block.stmts)?),
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.expr(cond)?;
                let then_branch = self.branch(then_branch)?;
                let else_branch = self.branch(else_branch)?;
                format!("(if ({cond}) {then_branch} else {else_branch})")
            }
            Expr::Is { var, target, .. } => format!("({var} is {})", self.ty(target)),
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
                if *cast {
                    format!("{value}.to{}()", ty.name())
                } else {
                    value
                }
            }
            Expr::New { class_type, args } => {
                format!("{}({})", self.exact_ty(class_type), self.exprs(args)?)
            }
            Expr::FieldAccess {
                receiver, field, ..
            } => format!("{}.{field}", self.receiver(receiver)?),
            Expr::FunctionCall {
                name,
                args,
                receiver,
                type_args,
                ..
            } => {
                let args = self.exprs(args)?;
                let type_args = self.type_args(type_args);
                match receiver {
                    Some(r) => format!("{}.{name}{type_args}({args})", self.receiver(r)?),
                    None => format!("{name}{type_args}({args})"),
                }
            }
            Expr::FunctionRef { receiver, name, .. } => match receiver {
                Some(r) => format!("{}::{name}", self.receiver(r)?),
                None => format!("::{name}"),
            },
            Expr::Lambda(l) => self.lambda(l)?,
            Expr::Array { ty, elems } => self.array(ty, elems)?,
            Expr::Cast { expr, ty } => format!("({} as {})", self.expr(expr)?, self.ty(ty)),
            Expr::Assignment {
                receiver,
                name,
                value,
            } => {
                let value = self.expr(value)?;
                match receiver {
                    Some(r) => format!("{}.{name} = {value}", self.receiver(r)?),
                    None => format!("{name} = {value}"),
                }
            }
            Expr::IncDec { name, op } => format!("{name}{}", op.symbol()),
            Expr::Loop(lp) => self.loop_expr(lp)?,
            Expr::StringLength { expr, .. } => format!("{}.length", self.receiver(expr)?),
            Expr::Print(expr) => format!("println({})", self.expr(expr)?),
        })
    }
}

impl Translator for KotlinTranslator {
    fn visit_program(&mut self, program: &Program) -> Result<()> {
        self.context = program.context.clone();
        for decl in program.top_level() {
            if matches!(decl, Decl::Lambda(_)) {
                continue;
            }
            self.w.blank();
            self.decl(decl)?;
        }
        Ok(())
    }

    fn result(self) -> String {
        self.w.finish()
    }
}
