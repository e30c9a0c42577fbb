// src/generator/expr.rs
//
// `generate_expr` and the expression strategies that need no declarations
// of their own: constants, variables, operators, field access and
// assignment.

use rand::Rng;
use tracing::trace;

use super::{ClassSpec, Generator, TypeOpts};
use crate::ast::{ArithOp, CmpOp, Decl, EqOp, Expr, LogicalOp};
use crate::builtins::{BinaryOp, BuiltinKind, Language};
use crate::errors::{GenerateError, Result};
use crate::names::caps;
use crate::type_utils::{find_subtypes, unify, unify_required};
use crate::types::{Type, TypeParameter, TypeVarMap};

/// Knobs for a single `generate_expr` call.
#[derive(Debug, Clone, Copy)]
pub struct ExprOpts {
    /// Constants, variables and constructor calls only.
    pub only_leaves: bool,
    /// Allow narrowing the requested type to a subtype.
    pub subtype: bool,
    pub exclude_var: bool,
    /// Emit a placeholder when placeholders are allowed here.
    pub gen_bottom: bool,
    /// Allow a lambda where a SAM interface is expected.
    pub sam_coercion: bool,
}

impl Default for ExprOpts {
    fn default() -> Self {
        Self {
            only_leaves: false,
            subtype: true,
            exclude_var: false,
            gen_bottom: false,
            sam_coercion: false,
        }
    }
}

impl ExprOpts {
    fn leaves() -> Self {
        Self {
            only_leaves: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Constant,
    Variable,
    New,
    FieldAccess,
    Conditional,
    Is,
    FuncCall,
    Assignment,
    Logical,
    Equality,
    Comparison,
    Arith,
}

/// A field reachable through some receiver expression.
#[derive(Debug, Clone)]
struct FieldTarget {
    receiver: Option<Expr>,
    receiver_type: Type,
    field: String,
    ty: Type,
}

impl Generator<'_> {
    /// An expression whose type is assignable to `etype`.
    ///
    /// Past the depth limit only leaves are produced; user-class values
    /// there become placeholders when those are allowed. At twice the limit
    /// anything without a literal form is a placeholder.
    pub(crate) fn generate_expr(&mut self, etype: &Type, opts: ExprOpts) -> Result<Expr> {
        let max = self.config.limits.max_depth;
        let mut opts = opts;
        if self.frame.depth >= max {
            if !etype.is_builtin() && self.frame.allow_bottom_consts {
                return Ok(Expr::Unresolved(etype.clone()));
            }
            opts.only_leaves = true;
        }
        if self.frame.depth > 2 * max && !self.has_constant(etype) {
            return Ok(Expr::Unresolved(etype.clone()));
        }
        if opts.gen_bottom && self.frame.allow_bottom_consts {
            return Ok(Expr::Unresolved(etype.clone()));
        }

        let mut ty = self.concretize(etype);
        if opts.subtype && !ty.is_void() && self.chance(self.config.prob.subtype_narrowing) {
            ty = self.narrow(&ty);
        }

        if !opts.exclude_var && self.chance(self.config.prob.existing_var) {
            let exact: Vec<Expr> = self
                .visible_vars()
                .into_iter()
                .filter(|d| matches!(d, Decl::Var(_) | Decl::Param(_)))
                .filter(|d| d.var_type() == Some(&ty))
                .map(|d| Expr::variable(d.name(), ty.clone()))
                .collect();
            if let Some(var) = self.pick(&exact) {
                return Ok(var);
            }
        }

        let strategies = self.strategies(&ty, opts);
        let strategy = self
            .pick(&strategies)
            .unwrap_or(Strategy::New);
        trace!(ty = %ty, ?strategy, depth = self.frame.depth, "expression");

        if self.can_declare_side_effect(&ty, opts) && self.chance(self.config.prob.side_effect_decl)
        {
            let expr = self.gen_strategy(strategy, &ty, opts)?;
            *self
                .vars_in_context
                .entry(self.frame.namespace.clone())
                .or_default() += 1;
            let decl = self.gen_variable_decl(Some(ty), false, Some(expr))?;
            return Ok(Expr::variable(decl.name, decl.ty));
        }
        self.gen_strategy(strategy, &ty, opts)
    }

    fn gen_strategy(&mut self, strategy: Strategy, ty: &Type, opts: ExprOpts) -> Result<Expr> {
        match strategy {
            Strategy::Constant => self.gen_constant(ty),
            Strategy::Variable => self.gen_variable(ty, opts),
            Strategy::New => self.gen_new(ty, opts.sam_coercion),
            Strategy::FieldAccess => self.gen_field_access(ty),
            Strategy::Conditional => self.gen_conditional(ty),
            Strategy::Is => self.gen_is_expr(ty),
            Strategy::FuncCall => self.gen_func_call(ty),
            Strategy::Assignment => self.gen_assignment(),
            Strategy::Logical => self.gen_logical(ty),
            Strategy::Equality => self.gen_equality(ty),
            Strategy::Comparison => self.gen_comparison(ty),
            Strategy::Arith => self.gen_arith(ty),
        }
    }

    fn strategies(&self, ty: &Type, opts: ExprOpts) -> Vec<Strategy> {
        if ty.is_void() {
            return vec![Strategy::FuncCall, Strategy::Assignment];
        }
        let has_constant = self.has_constant(ty);
        if opts.only_leaves {
            if has_constant {
                return vec![Strategy::Constant];
            }
            let mut leaves = vec![Strategy::New];
            if !opts.exclude_var {
                leaves.push(Strategy::Variable);
            }
            return leaves;
        }

        let mut out = vec![
            Strategy::FieldAccess,
            Strategy::Conditional,
            Strategy::Is,
            Strategy::FuncCall,
        ];
        if !opts.exclude_var {
            out.push(Strategy::Variable);
        }
        if has_constant {
            out.push(Strategy::Constant);
            if ty.builtin_kind() == Some(BuiltinKind::Boolean) {
                out.extend([Strategy::Logical, Strategy::Equality, Strategy::Comparison]);
            }
        } else {
            out.push(Strategy::New);
        }
        if !self.arith_operands(ty).is_empty() {
            out.push(Strategy::Arith);
        }
        out
    }

    /// Whether an expression may be hoisted into a fresh local here.
    fn can_declare_side_effect(&self, ty: &Type, opts: ExprOpts) -> bool {
        let declared = self
            .vars_in_context
            .get(&self.frame.namespace)
            .copied()
            .unwrap_or(0);
        !opts.only_leaves
            && !ty.is_void()
            && self.frame.inside_func_body
            && !self.frame.in_super_call
            && !(self.language == Language::Java && self.frame.in_value_branch)
            && declared < self.config.limits.max_var_decls
    }

    /// A random concrete subtype of `ty`, or `ty` itself.
    pub(super) fn narrow(&mut self, ty: &Type) -> Type {
        let classes: Vec<_> = self
            .classes()
            .into_iter()
            .filter(|c| !self.is_blacklisted(&c.name))
            .collect();
        let refs: Vec<_> = classes.iter().collect();
        let subtypes = find_subtypes(ty, &refs, &self.catalog.non_bottom_types(), true, true);
        match self.pick(&subtypes) {
            Some(Type::Constructor(ctor)) => self
                .instantiate(&ctor, None)
                .map(|(t, _)| t)
                .filter(|t| t.is_subtype(ty))
                .unwrap_or_else(|| ty.clone()),
            Some(sub) => sub,
            None => ty.clone(),
        }
    }

    /// Whether `ty` has a literal form (arrays count, as array literals).
    pub(crate) fn has_constant(&self, ty: &Type) -> bool {
        if let Some(kind) = ty.builtin_kind() {
            return kind.is_numeric()
                || matches!(
                    kind,
                    BuiltinKind::Number | BuiltinKind::Char | BuiltinKind::String | BuiltinKind::Boolean
                );
        }
        matches!(ty, Type::Parameterized(p) if p.ctor.builtin && p.ctor.name == self.catalog.array_ctor().name)
    }

    // -----------------------------------------------------------------------
    // Leaves
    // -----------------------------------------------------------------------

    pub(crate) fn gen_constant(&mut self, ty: &Type) -> Result<Expr> {
        if let Type::Parameterized(_) = ty {
            return self.gen_array_expr(ty);
        }
        let rng = &mut self.state.rng;
        let literal = match ty.builtin_kind() {
            Some(BuiltinKind::Integer | BuiltinKind::Number) => rng.gen_range(-1000..=1000).to_string(),
            Some(BuiltinKind::Short) => {
                let n: i16 = rng.gen_range(-1000..=1000);
                match self.language {
                    Language::Kotlin => format!("({n}).toShort()"),
                    Language::Java => format!("(short) {n}"),
                }
            }
            Some(BuiltinKind::Byte) => {
                let n: i8 = rng.gen_range(-128..=127);
                match self.language {
                    Language::Kotlin => format!("({n}).toByte()"),
                    Language::Java => format!("(byte) {n}"),
                }
            }
            Some(BuiltinKind::Long) => format!("{}L", rng.gen_range(-10_000i64..=10_000)),
            Some(BuiltinKind::Float) => {
                format!("{}.{}f", rng.gen_range(0..1000), rng.gen_range(0..100))
            }
            Some(BuiltinKind::Double) => {
                format!("{}.{}", rng.gen_range(0..1000), rng.gen_range(0..100))
            }
            Some(BuiltinKind::Char) => format!("'{}'", rng.gen_range(b'a'..=b'z') as char),
            Some(BuiltinKind::String) => {
                let len = rng.gen_range(1..=10);
                let text: String = (0..len)
                    .map(|_| rng.gen_range(b'a'..=b'z') as char)
                    .collect();
                format!("\"{text}\"")
            }
            Some(BuiltinKind::Boolean) => rng.gen_bool(0.5).to_string(),
            _ => return self.gen_new(ty, false),
        };
        Ok(Expr::Constant {
            literal,
            ty: ty.clone(),
        })
    }

    /// An array (or array list) literal with a few elements.
    pub(crate) fn gen_array_expr(&mut self, ty: &Type) -> Result<Expr> {
        let elem = match ty.type_args().first() {
            Some(t) => self.concretize(t),
            None => self.catalog.any_type(),
        };
        let ty = match ty {
            Type::Parameterized(p) => p.ctor.apply(vec![elem.clone()]),
            _ => self.catalog.array_of(elem.clone()),
        };
        let count = self.state.rng.gen_range(0..=3);
        let elems = self.nested(1, |g| {
            (0..count)
                .map(|_| g.generate_expr(&elem, ExprOpts::leaves()))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Expr::Array { ty, elems })
    }

    /// A visible variable assignable to `ty`, or a fresh expression when
    /// there is none.
    fn gen_variable(&mut self, ty: &Type, opts: ExprOpts) -> Result<Expr> {
        let vars: Vec<Expr> = self
            .visible_vars()
            .into_iter()
            .filter_map(|d| {
                let var_ty = d.var_type()?;
                var_ty
                    .is_assignable(ty)
                    .then(|| Expr::variable(d.name(), var_ty.clone()))
            })
            .collect();
        match self.pick(&vars) {
            Some(var) => Ok(var),
            None => self.generate_expr(
                ty,
                ExprOpts {
                    exclude_var: true,
                    ..opts
                },
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn gen_logical(&mut self, ty: &Type) -> Result<Expr> {
        let op = if self.coin() {
            LogicalOp::And
        } else {
            LogicalOp::Or
        };
        let (lhs, rhs) = self.gen_operands(ty, ty, ExprOpts::default())?;
        Ok(Expr::Logical {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: ty.clone(),
        })
    }

    fn gen_equality(&mut self, ty: &Type) -> Result<Expr> {
        let operand = self.select_type(TypeOpts {
            exclude_function_types: true,
            ..TypeOpts::default()
        })?;
        let op = if self.coin() { EqOp::Eq } else { EqOp::Ne };
        let exact = ExprOpts {
            subtype: false,
            ..ExprOpts::default()
        };
        let (lhs, rhs) = self.gen_operands(&operand, &operand, exact)?;
        Ok(Expr::Equality {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: ty.clone(),
        })
    }

    /// `<`, `<=`, `>`, `>=` over numbers and characters (and strings in
    /// Kotlin). Numbers compare with any other number.
    fn gen_comparison(&mut self, ty: &Type) -> Result<Expr> {
        let numbers = self.catalog.number_types();
        let mut candidates = numbers.clone();
        candidates.push(self.catalog.char_type());
        if self.language == Language::Kotlin {
            candidates.push(self.catalog.string_type());
        }
        let Some(lhs_ty) = self.pick(&candidates) else {
            return self.gen_constant(ty);
        };
        let is_numeric = lhs_ty.builtin_kind().is_some_and(BuiltinKind::is_numeric);
        let rhs_ty = if is_numeric {
            self.pick(&numbers).unwrap_or_else(|| lhs_ty.clone())
        } else {
            lhs_ty.clone()
        };
        let op = self
            .pick(&CmpOp::ALL)
            .unwrap_or(CmpOp::Lt);
        let (lhs, rhs) = self.gen_operands(&lhs_ty, &rhs_ty, ExprOpts::default())?;
        Ok(Expr::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: ty.clone(),
        })
    }

    fn gen_operands(&mut self, lhs: &Type, rhs: &Type, opts: ExprOpts) -> Result<(Expr, Expr)> {
        self.nested(1, |g| {
            let lhs = g.generate_expr(lhs, opts)?;
            let rhs = g.generate_expr(rhs, opts)?;
            Ok((lhs, rhs))
        })
    }

    /// Builtin operand types whose arithmetic yields `ty`, with the
    /// operators that do.
    fn arith_operands(&self, ty: &Type) -> Vec<(Type, Vec<BinaryOp>)> {
        let mut candidates = self.catalog.number_types();
        candidates.push(self.catalog.string_type());
        candidates
            .into_iter()
            .filter_map(|operand| {
                let ops: Vec<BinaryOp> = self
                    .catalog
                    .binary_ops(&operand)
                    .into_iter()
                    .filter(|b| &b.result == ty)
                    .collect();
                (!ops.is_empty()).then_some((operand, ops))
            })
            .collect()
    }

    fn gen_arith(&mut self, ty: &Type) -> Result<Expr> {
        let operands = self.arith_operands(ty);
        let Some((operand, ops)) = self.pick(&operands) else {
            return self.gen_constant(ty);
        };
        let (op, cast) = self
            .pick(&ops)
            .map_or((ArithOp::Add, false), |b| (b.op, b.cast));
        let (lhs, rhs) = self.gen_operands(&operand, &operand, ExprOpts::default())?;
        Ok(Expr::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: ty.clone(),
            cast,
        })
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    /// Fields of in-scope variables, seen through the variable's type.
    fn receiver_fields(&self, only_mutable: bool) -> Vec<FieldTarget> {
        let mut out = Vec::new();
        for decl in self.visible_vars() {
            let Some(var_ty) = decl.var_type() else {
                continue;
            };
            let Some((class, map)) = self.receiver_map(var_ty) else {
                continue;
            };
            for field in &class.fields {
                if only_mutable && field.is_final {
                    continue;
                }
                out.push(FieldTarget {
                    receiver: Some(Expr::variable(decl.name(), var_ty.clone())),
                    receiver_type: var_ty.clone(),
                    field: field.name.clone(),
                    ty: field.ty.substitute(&map),
                });
            }
        }
        out
    }

    /// Fields of declared classes whose type can be made assignable to
    /// `ty`, with the receiver type that achieves it. No receiver
    /// expression is built yet.
    fn class_fields(&mut self, ty: &Type) -> Vec<FieldTarget> {
        let mut out = Vec::new();
        for class in self.classes() {
            if self.is_blacklisted(&class.name) {
                continue;
            }
            for field in &class.fields {
                let target = match class.get_type() {
                    Type::Constructor(ctor) => {
                        let partial = if field.ty.has_type_variables() {
                            match unify(ty, &field.ty) {
                                Some(m) => m,
                                None => continue,
                            }
                        } else {
                            TypeVarMap::new()
                        };
                        let Some((receiver_type, map)) = self.instantiate(&ctor, Some(&partial))
                        else {
                            continue;
                        };
                        FieldTarget {
                            receiver: None,
                            receiver_type,
                            field: field.name.clone(),
                            ty: field.ty.substitute(&map),
                        }
                    }
                    simple => FieldTarget {
                        receiver: None,
                        receiver_type: simple,
                        field: field.name.clone(),
                        ty: field.ty.clone(),
                    },
                };
                if target.ty.is_assignable(ty) {
                    out.push(target);
                }
            }
        }
        out
    }

    fn gen_field_access(&mut self, ty: &Type) -> Result<Expr> {
        let direct: Vec<FieldTarget> = self
            .receiver_fields(false)
            .into_iter()
            .filter(|f| f.ty.is_assignable(ty))
            .collect();
        let target = match self.pick(&direct) {
            Some(t) => t,
            None => {
                let declared = self.class_fields(ty);
                match self.pick(&declared) {
                    Some(t) => t,
                    None => self.gen_matching_field(ty)?,
                }
            }
        };
        let receiver = match target.receiver {
            Some(r) => r,
            None => self.nested(1, |g| {
                g.generate_expr(&target.receiver_type, ExprOpts::default())
            })?,
        };
        Ok(Expr::FieldAccess {
            receiver: Box::new(receiver),
            field: target.field,
            ty: target.ty,
        })
    }

    /// Declare a new class with a field of type `ty`.
    fn gen_matching_field(&mut self, ty: &Type) -> Result<FieldTarget> {
        let (receiver_type, field_type) = self.gen_matching_class(ty, true)?;
        let name = receiver_type.name().to_string();
        let field = self
            .class_decl(&name)
            .and_then(|c| c.fields.iter().find(|f| f.ty == field_type).map(|f| f.name.clone()))
            .ok_or_else(|| GenerateError::no_candidate("field", ty))?;
        Ok(FieldTarget {
            receiver: None,
            receiver_type,
            field,
            ty: ty.clone(),
        })
    }

    /// Declare a class holding a field (or, without `as_field`, a method
    /// returning) `ty`. Type variables in `ty` become type parameters of
    /// the new class, so the returned receiver type applies the class to
    /// them. Also returns the member type as declared inside the class.
    pub(crate) fn gen_matching_class(&mut self, ty: &Type, as_field: bool) -> Result<(Type, Type)> {
        let vars = ty.type_variables();
        let mut taken = Vec::new();
        let mut map = TypeVarMap::new();
        let mut params = Vec::new();
        for var in &vars {
            let Some(letter) = caps(&mut self.state.rng, &taken) else {
                break;
            };
            taken.push(letter.clone());
            let mut param = TypeParameter::new(letter);
            if let Some(bound) = var.bound_rec().filter(|b| !b.has_type_variables()) {
                param = param.with_bound(bound);
            }
            map.insert(var.clone(), Type::TypeParam(param.clone()));
            params.push(param);
        }
        let member_type = ty.substitute(&map);
        let spec = if as_field {
            ClassSpec {
                field_type: Some(member_type.clone()),
                type_params: Some(params.clone()),
                ..ClassSpec::default()
            }
        } else {
            ClassSpec {
                fret_type: Some(member_type.clone()),
                not_void: !member_type.is_void(),
                type_params: Some(params.clone()),
                ..ClassSpec::default()
            }
        };
        let class = self.gen_class_decl(spec)?;
        let receiver_type = match class.get_type() {
            Type::Constructor(ctor) => {
                let args = vars
                    .iter()
                    .take(params.len())
                    .cloned()
                    .map(Type::TypeParam)
                    .collect();
                ctor.apply(args)
            }
            simple => simple,
        };
        // Seen through the receiver, the member must come back as `ty`.
        let seen = match &receiver_type {
            Type::Parameterized(p) => member_type.substitute(&p.type_var_map()),
            _ => member_type.clone(),
        };
        unify_required(ty, &seen)?;
        Ok((receiver_type, member_type))
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    fn gen_assignment(&mut self) -> Result<Expr> {
        let mut targets: Vec<FieldTarget> = self
            .assignable_vars()
            .into_iter()
            .filter_map(|d| {
                Some(FieldTarget {
                    receiver: None,
                    receiver_type: self.catalog.void_type(),
                    field: d.name().to_string(),
                    ty: d.var_type()?.clone(),
                })
            })
            .collect();
        targets.extend(self.receiver_fields(true));

        let target = match self.pick(&targets) {
            Some(t) => t,
            None => match self.gen_assignment_target()? {
                Some(t) => t,
                None => return self.gen_func_call(&self.catalog.void_type()),
            },
        };
        let value_opts = ExprOpts {
            gen_bottom: target.ty.has_wildcards(),
            ..ExprOpts::default()
        };
        let value = self.nested(1, |g| g.generate_expr(&target.ty, value_opts))?;
        trace!(name = %target.field, "assignment");
        Ok(Expr::Assignment {
            receiver: target.receiver.map(Box::new),
            name: target.field,
            value: Box::new(value),
        })
    }

    /// Something assignable when nothing in scope is: a mutable field of a
    /// declared class behind a fresh receiver, or a fresh mutable local.
    fn gen_assignment_target(&mut self) -> Result<Option<FieldTarget>> {
        if self.coin() {
            let mut mutable = Vec::new();
            for class in self.classes() {
                if self.is_blacklisted(&class.name) {
                    continue;
                }
                for field in class.fields.iter().filter(|f| !f.is_final) {
                    mutable.push((class.get_type(), field.clone()));
                }
            }
            if let Some((class_type, field)) = self.pick(&mutable) {
                let (receiver_type, map) = match class_type {
                    Type::Constructor(ctor) => match self.instantiate(&ctor, None) {
                        Some(inst) => inst,
                        None => return Ok(None),
                    },
                    simple => (simple, TypeVarMap::new()),
                };
                let receiver =
                    self.nested(1, |g| g.generate_expr(&receiver_type, ExprOpts::default()))?;
                return Ok(Some(FieldTarget {
                    receiver: Some(receiver),
                    receiver_type,
                    field: field.name,
                    ty: field.ty.substitute(&map),
                }));
            }
        }
        let ty = self.select_type(TypeOpts::default())?;
        if !self.can_declare_side_effect(&ty, ExprOpts::default()) {
            return Ok(None);
        }
        let decl = self.gen_variable_decl(Some(ty), false, None)?;
        self.make_mutable(&decl.name);
        Ok(Some(FieldTarget {
            receiver: None,
            receiver_type: self.catalog.void_type(),
            field: decl.name,
            ty: decl.ty,
        }))
    }
}
