use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{Block, ClassKind, Expr, FuncKind, Loop, Stmt, VarDecl};
use crate::types::{SimpleClassifier, TypeParameter};

fn generate(seed: u64, lang: Language, config: &GenConfig) -> Result<Program> {
    let mut state = GenState::new(seed, lang);
    Generator::new(&mut state, config, lang).generate()
}

/// Programs for a range of seeds. Every seed must generate.
fn programs(lang: Language, config: &GenConfig, seeds: std::ops::Range<u64>) -> Vec<Program> {
    seeds
        .map(|seed| {
            generate(seed, lang, config)
                .unwrap_or_else(|err| panic!("{lang} seed {seed} failed: {err}"))
        })
        .collect()
}

fn small_config() -> GenConfig {
    let mut config = GenConfig::default();
    config.limits.min_top_level = 2;
    config.limits.max_top_level = 4;
    config.limits.max_depth = 3;
    config
}

fn var(name: &str, ty: Type) -> Decl {
    Decl::Var(VarDecl {
        name: name.to_string(),
        ty: ty.clone(),
        expr: Rc::new(Expr::Unresolved(ty)),
        is_final: true,
        inferred: false,
    })
}

/// Position the generator inside the body of a top-level function `main`.
fn enter_body(g: &mut Generator<'_>) -> Namespace {
    let ns = Namespace::global().child("main");
    g.frame.namespace = ns.clone();
    g.frame.depth = 2;
    g.frame.inside_func_body = true;
    ns
}

// ---------------------------------------------------------------------------
// Tree walking
// ---------------------------------------------------------------------------

/// Everything reachable from a set of declarations, nested bodies included.
#[derive(Default)]
struct Collected<'a> {
    exprs: Vec<&'a Expr>,
    /// Expressions that are the root of a body or initializer.
    roots: Vec<&'a Expr>,
    vars: Vec<&'a VarDecl>,
    funcs: Vec<&'a FuncDecl>,
}

impl<'a> Collected<'a> {
    fn of(decls: &[&'a Decl]) -> Self {
        let mut c = Self::default();
        for d in decls {
            c.decl(d);
        }
        c
    }

    fn decl(&mut self, decl: &'a Decl) {
        match decl {
            Decl::Var(v) => {
                self.vars.push(v);
                self.root(&v.expr);
            }
            Decl::Param(p) => {
                if let Some(d) = &p.default {
                    self.root(d);
                }
            }
            Decl::Func(f) => self.func(f),
            Decl::Class(c) => {
                for sup in &c.superclasses {
                    for arg in sup.args.iter().flatten() {
                        self.root(arg);
                    }
                }
                for f in &c.functions {
                    self.func(f);
                }
            }
            Decl::Field(_) | Decl::Lambda(_) => {}
        }
    }

    fn func(&mut self, func: &'a FuncDecl) {
        self.funcs.push(func);
        for p in &func.params {
            if let Some(d) = &p.default {
                self.root(d);
            }
        }
        if let Some(body) = &func.body {
            self.root(body);
        }
    }

    fn root(&mut self, expr: &'a Expr) {
        self.roots.push(expr);
        self.expr(expr);
    }

    fn block(&mut self, block: &'a Block) {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Decl(d) => self.decl(d),
                Stmt::Expr(e) => self.expr(e),
            }
        }
    }

    fn expr(&mut self, expr: &'a Expr) {
        self.exprs.push(expr);
        match expr {
            Expr::Block(block) => self.block(block),
            Expr::Loop(lp) => {
                for head in lp.head() {
                    self.expr(head);
                }
                self.block(lp.body());
            }
            other => {
                for child in other.children() {
                    self.expr(child);
                }
            }
        }
    }
}

#[test]
fn loop_bodies_count_toward_depth() {
    let catalog = Catalog::new(Language::Kotlin);
    let int = catalog.integer_type();
    let sum = Expr::Arith {
        op: crate::ast::ArithOp::Add,
        lhs: Box::new(Expr::variable("i", int.clone())),
        rhs: Box::new(Expr::variable("i", int.clone())),
        ty: int.clone(),
        cast: false,
    };
    let lp = Expr::Loop(Box::new(Loop::ForRange {
        var: "i".to_string(),
        from: Expr::variable("lo", int.clone()),
        to: Expr::variable("hi", int),
        body: Block {
            stmts: vec![Stmt::Expr(Expr::Print(Box::new(sum)))],
            is_func_block: false,
        },
    }));
    assert_eq!(lp.children().count(), 3);
    // Loop, Print, Arith, Variable.
    assert_eq!(lp.depth(), 4);
}

fn non_lambda_top_level(program: &Program) -> Vec<&Decl> {
    program
        .top_level()
        .into_iter()
        .filter(|d| !matches!(d, Decl::Lambda(_)))
        .collect()
}

// ---------------------------------------------------------------------------
// Whole programs
// ---------------------------------------------------------------------------

#[test]
fn single_top_level_declaration_plus_main() {
    let mut config = GenConfig::default();
    config.limits.min_top_level = 1;
    config.limits.max_top_level = 1;
    // Past the depth limit nothing synthesizes extra classes or callees.
    config.limits.max_depth = 1;
    let program = generate(1234, Language::Kotlin, &config).expect("generates");
    let decls = non_lambda_top_level(&program);
    assert_eq!(decls.len(), 2, "{decls:#?}");
    let Decl::Func(main) = decls[1] else {
        panic!("expected main last, got {:?}", decls[1]);
    };
    assert_eq!(main.name, "main");
    assert!(main.ret_type.is_void());
    assert_eq!(main.params.len(), 1);
}

#[test]
fn every_program_has_exactly_one_main() {
    let config = GenConfig::default();
    for program in programs(Language::Kotlin, &config, 1230..1240) {
        let mains: Vec<&FuncDecl> = program
            .top_level()
            .into_iter()
            .filter_map(|d| match d {
                Decl::Func(f) if f.name == "main" => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].kind, FuncKind::TopLevel);
        assert!(mains[0].body.is_some());
    }
}

#[test]
fn generation_is_deterministic() {
    let config = small_config();
    for lang in [Language::Kotlin, Language::Java] {
        for seed in 0..5 {
            let a = generate(seed, lang, &config);
            let b = generate(seed, lang, &config);
            match (a, b) {
                (Ok(a), Ok(b)) => assert_eq!(a.top_level(), b.top_level()),
                (Err(a), Err(b)) => assert_eq!(a, b),
                (a, b) => panic!("seed {seed} diverged: {:?} vs {:?}", a.is_ok(), b.is_ok()),
            }
        }
    }
}

#[test]
fn expressions_stay_within_depth_bound() {
    let config = small_config();
    let max = config.limits.max_depth;
    for lang in [Language::Kotlin, Language::Java] {
        for program in programs(lang, &config, 0..15) {
            let top = program.top_level();
            let collected = Collected::of(&top);
            for root in &collected.roots {
                assert!(
                    root.depth() <= 6 * max + 10,
                    "depth {} exceeds bound for max_depth {max}",
                    root.depth()
                );
            }
        }
    }
}

#[test]
fn initializers_are_assignable_to_declared_types() {
    let config = small_config();
    for lang in [Language::Kotlin, Language::Java] {
        for program in programs(lang, &config, 0..15) {
            let top = program.top_level();
            let collected = Collected::of(&top);
            for v in &collected.vars {
                if let Some(ty) = v.expr.ty() {
                    assert!(
                        ty.is_assignable(&v.ty),
                        "{}: {ty} is not assignable to {}",
                        v.name,
                        v.ty
                    );
                }
            }
        }
    }
}

#[test]
fn java_programs_use_java_literals() {
    let config = small_config();
    for program in programs(Language::Java, &config, 0..10) {
        assert_eq!(program.language, Language::Java);
        let top = program.top_level();
        let collected = Collected::of(&top);
        for expr in &collected.exprs {
            if let Expr::Constant { literal, .. } = expr {
                assert!(!literal.contains(".to"), "kotlin literal {literal}");
            }
            if let Some(ty) = expr.ty() {
                assert!(!ty.is_bottom(), "java has no bottom type");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Single requests
// ---------------------------------------------------------------------------

#[test]
fn leaves_only_at_depth_limit() {
    let mut config = GenConfig::default();
    config.limits.max_depth = 0;
    let catalog = Catalog::new(Language::Kotlin);
    for seed in 0..50 {
        let mut state = GenState::new(seed, Language::Kotlin);
        let mut g = Generator::new(&mut state, &config, Language::Kotlin);
        let ns = enter_body(&mut g);
        g.context
            .add_var(&ns, var("count", catalog.integer_type()))
            .expect("fresh binding");
        for ty in catalog.number_types() {
            let expr = g.generate_expr(&ty, ExprOpts::default()).expect("leaf");
            assert!(
                matches!(expr, Expr::Constant { .. } | Expr::Variable { .. }),
                "seed {seed}: {expr:?}"
            );
        }
    }
}

#[test]
fn assignments_fit_their_targets() {
    let config = small_config();
    let string = Catalog::new(Language::Kotlin).string_type();
    let mut checked = 0;
    for seed in 0..20 {
        let mut state = GenState::new(seed, Language::Kotlin);
        let mut g = Generator::new(&mut state, &config, Language::Kotlin);
        let Ok(class) = g.gen_class_decl(ClassSpec {
            field_type: Some(string.clone()),
            type_params: Some(Vec::new()),
            ..ClassSpec::default()
        }) else {
            continue;
        };
        if let Some(c) = g.context.class_mut(&Namespace::global(), &class.name) {
            for f in &mut c.fields {
                f.is_final = false;
            }
        }
        let ns = enter_body(&mut g);
        g.context
            .add_var(&ns, var("holder", class.get_type()))
            .expect("fresh binding");

        let void = g.catalog.void_type();
        for _ in 0..10 {
            let Ok(expr) = g.generate_expr(&void, ExprOpts::default()) else {
                continue;
            };
            let Expr::Assignment {
                receiver,
                name,
                value,
            } = expr
            else {
                continue;
            };
            let target = match receiver.as_deref().and_then(Expr::ty) {
                Some(recv_ty) => g.receiver_map(&recv_ty).and_then(|(c, map)| {
                    c.fields
                        .iter()
                        .find(|f| f.name == name)
                        .map(|f| f.ty.substitute(&map))
                }),
                None => g
                    .context
                    .get_var(&g.frame.namespace, &name, true)
                    .and_then(|d| d.var_type().cloned()),
            };
            let (Some(target), Some(actual)) = (target, value.ty()) else {
                continue;
            };
            assert!(actual.is_assignable(&target), "{actual} := {target}");
            checked += 1;
        }
        assert_eq!(g.frame.namespace, ns);
    }
    assert!(checked > 0);
}

#[test]
fn no_lambda_for_sam_without_coercion() {
    let mut config = small_config();
    config.prob.sam_coercion = 0.0;
    let catalog = Catalog::new(Language::Kotlin);
    let mut runner = ClassDecl::new("Runner", ClassKind::Interface);
    runner.functions.push(FuncDecl {
        name: "run".to_string(),
        params: Vec::new(),
        ret_type: catalog.integer_type(),
        body: None,
        kind: FuncKind::ClassMethod,
        type_params: Vec::new(),
        is_final: false,
        is_override: false,
    });
    let runner_ty = runner.get_type();

    for seed in 0..30 {
        let mut state = GenState::new(seed, Language::Kotlin);
        let mut g = Generator::new(&mut state, &config, Language::Kotlin);
        g.context
            .add_class(&Namespace::global(), runner.clone())
            .expect("fresh binding");
        assert!(crate::type_utils::is_sam(&g.context, &runner_ty));
        enter_body(&mut g);
        let opts = ExprOpts {
            sam_coercion: true,
            ..ExprOpts::default()
        };
        let Ok(expr) = g.generate_expr(&runner_ty, opts) else {
            continue;
        };
        let mut collected = Collected::default();
        collected.expr(&expr);
        for e in collected.exprs {
            if let Expr::Lambda(l) = e {
                assert_eq!(l.sam_target, None, "seed {seed}");
            }
        }
    }
}

#[test]
fn selected_types_are_never_bare_constructors() {
    let config = small_config();
    for seed in 0..20 {
        let mut state = GenState::new(seed, Language::Kotlin);
        let mut g = Generator::new(&mut state, &config, Language::Kotlin);
        // A few user classes, some of them generic.
        for _ in 0..3 {
            let _ = g.gen_class_decl(ClassSpec::default());
        }
        for _ in 0..20 {
            let ty = g.select_type(TypeOpts::default()).expect("a type");
            assert!(!ty.is_type_constructor(), "seed {seed}: {ty}");
            if let Type::Parameterized(p) = &ty {
                assert_eq!(p.type_args.len(), p.ctor.type_parameters.len());
            }
        }
    }
}

#[test]
fn smart_cast_binding_is_retracted() {
    let config = small_config();
    let catalog = Catalog::new(Language::Kotlin);
    let mut animal = ClassDecl::new("Animal", ClassKind::Regular);
    animal.is_final = false;
    let animal_ty = animal.get_type();
    let mut dog = ClassDecl::new("Dog", ClassKind::Regular);
    dog.superclasses.push(crate::ast::SuperClassInst {
        class_type: animal_ty.clone(),
        args: Some(Vec::new()),
    });
    let dog_ty = Type::Simple(SimpleClassifier {
        name: "Dog".to_string(),
        supertypes: vec![animal_ty.clone()],
    });

    let mut saw_cast = false;
    for seed in 0..10 {
        let mut state = GenState::new(seed, Language::Kotlin);
        let mut g = Generator::new(&mut state, &config, Language::Kotlin);
        let global = Namespace::global();
        g.context.add_class(&global, animal.clone()).expect("fresh");
        g.context.add_class(&global, dog.clone()).expect("fresh");
        let ns = enter_body(&mut g);
        g.context.add_var(&ns, var("pet", animal_ty.clone())).expect("fresh");

        let expr = g.gen_is_expr(&catalog.string_type()).expect("is-expression");
        if let Expr::Conditional { cond, .. } = &expr {
            if let Expr::Is { var, target, .. } = cond.as_ref() {
                assert_eq!(var, "pet");
                assert_eq!(target, &dog_ty);
                saw_cast = true;
            }
        }
        let then_ns = ns.child("true_block_1");
        assert!(g.context.get_var(&then_ns, "pet", false).is_none());
        assert_eq!(
            g.context.get_var(&then_ns, "pet", true).and_then(Decl::var_type),
            Some(&animal_ty)
        );
    }
    assert!(saw_cast);
}

#[test]
fn matching_class_member_is_seen_as_requested() {
    let config = small_config();
    let catalog = Catalog::new(Language::Kotlin);
    let t = TypeParameter::new("T").with_bound(catalog.number_type());
    let wanted = catalog.array_list_of(Type::TypeParam(t));
    let mut built = 0;
    for seed in 0..10 {
        let mut state = GenState::new(seed, Language::Kotlin);
        let mut g = Generator::new(&mut state, &config, Language::Kotlin);
        for as_field in [true, false] {
            let Ok((receiver, member)) = g.gen_matching_class(&wanted, as_field) else {
                continue;
            };
            let Type::Parameterized(p) = &receiver else {
                panic!("seed {seed}: {receiver} does not apply its class");
            };
            assert_eq!(member.substitute(&p.type_var_map()), wanted);
            built += 1;
        }
    }
    assert!(built > 0);
}

#[test]
fn unused_type_params_are_pruned_and_rebound() {
    let config = GenConfig::default();
    let mut state = GenState::new(3, Language::Kotlin);
    let mut g = Generator::new(&mut state, &config, Language::Kotlin);
    let ns = Namespace::global().child("f");
    let t = TypeParameter::new("T");
    let u = TypeParameter::new("U");
    for tp in [&t, &u] {
        g.context.add_type(&ns, tp.clone()).expect("fresh binding");
    }
    let mut type_params = vec![t, u.clone()];
    let mut params = vec![crate::ast::ParamDecl::new("x", Type::TypeParam(u.clone()))];
    let mut ret = g.catalog.integer_type();

    g.remove_unused_type_params(&ns, &mut type_params, &mut params, &mut ret)
        .expect("kept parameters rebind");

    assert_eq!(type_params, vec![u.clone()]);
    assert_eq!(g.context.get_types(&ns, false), vec![&u]);
    assert_eq!(params[0].ty, Type::TypeParam(u));
}

#[test]
fn scoped_guards_restore_on_error() {
    let config = GenConfig::default();
    let mut state = GenState::new(7, Language::Kotlin);
    let mut g = Generator::new(&mut state, &config, Language::Kotlin);
    let ns = Namespace::global().child("f");

    let failed: Result<()> = g.with_blacklisted("Pending", |g| {
        g.with_namespace(ns.clone(), |_| Err(GenerateError::invariant("boom")))
    });
    assert!(failed.is_err());
    assert!(!g.is_blacklisted("Pending"));
    assert_eq!(g.namespace(), &Namespace::global());
    assert_eq!(g.depth(), 1);

    let shadow = var("x", Catalog::new(Language::Kotlin).string_type());
    let failed: Result<()> =
        g.with_shadow_var(&ns, shadow, |_| Err(GenerateError::invariant("boom")));
    assert!(failed.is_err());
    assert!(g.context.get_var(&ns, "x", false).is_none());
}
