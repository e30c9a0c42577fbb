use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{ArithOp, Block, Decl, Expr, FuncDecl, FuncKind, ParamDecl, Stmt, VarDecl};
use crate::builtins::Catalog;
use crate::config::GenConfig;
use crate::context::{Context, Namespace};
use crate::errors::GenerateError;
use crate::generator::Generator;
use crate::state::GenState;
use crate::types::{SimpleClassifier, Type};

fn small_config() -> GenConfig {
    let mut config = GenConfig::default();
    config.limits.min_top_level = 2;
    config.limits.max_top_level = 4;
    config.limits.max_depth = 3;
    config
}

/// Translations of every seed in `seeds`. Every seed must generate.
fn translated(lang: Language, seeds: std::ops::Range<u64>) -> Vec<String> {
    let config = small_config();
    seeds
        .map(|seed| {
            let mut state = GenState::new(seed, lang);
            let program = Generator::new(&mut state, &config, lang)
                .generate()
                .unwrap_or_else(|err| panic!("{lang} seed {seed} failed: {err}"));
            translate(&program, false).expect("non-strict translation")
        })
        .collect()
}

fn var(name: &str, ty: Type, expr: Expr) -> Decl {
    Decl::Var(VarDecl {
        name: name.to_string(),
        ty,
        expr: Rc::new(expr),
        is_final: true,
        inferred: false,
    })
}

/// `answer = 42` and a `main` printing it.
fn hello_program(lang: Language) -> Program {
    let catalog = Catalog::new(lang);
    let int = catalog.integer_type();
    let global = Namespace::global();
    let mut context = Context::new();
    let init = Expr::Constant {
        literal: "42".to_string(),
        ty: int.clone(),
    };
    context
        .add_var(&global, var("answer", int.clone(), init))
        .expect("fresh name");
    let body = Expr::Block(Block {
        stmts: vec![Stmt::Expr(Expr::Print(Box::new(Expr::variable("answer", int))))],
        is_func_block: true,
    });
    context
        .add_func(
            &global,
            FuncDecl {
                name: "main".to_string(),
                params: vec![ParamDecl::new(
                    "args",
                    catalog.array_of(catalog.string_type()),
                )],
                ret_type: catalog.void_type(),
                body: Some(Rc::new(body)),
                kind: FuncKind::TopLevel,
                type_params: Vec::new(),
                is_final: true,
                is_override: false,
            },
        )
        .expect("fresh name");
    Program::new(lang, context)
}

fn balanced(text: &str, open: char, close: char) -> bool {
    let mut depth = 0i64;
    for c in text.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        }
    }
    depth == 0
}

// ---------------------------------------------------------------------------
// Hand-built programs
// ---------------------------------------------------------------------------

#[test]
fn kotlin_hello() {
    let out = translate(&hello_program(Language::Kotlin), true).unwrap();
    assert_eq!(
        out,
        "val answer: Int = 42\n\
         \n\
         fun main(args: Array<String>) {\n\
         \x20   println(answer)\n\
         }\n"
    );
}

#[test]
fn java_hello() {
    let out = translate(&hello_program(Language::Java), true).unwrap();
    assert_eq!(
        out,
        "class Main {\n\
         \x20   static final Integer answer = 42;\n\
         \n\
         \x20   public static void main(String[] args) {\n\
         \x20       System.out.println(answer);\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn strict_mode_rejects_placeholders() {
    for lang in [Language::Kotlin, Language::Java] {
        let int = Catalog::new(lang).integer_type();
        let mut context = Context::new();
        context
            .add_var(
                &Namespace::global(),
                var("pending", int.clone(), Expr::Unresolved(int)),
            )
            .unwrap();
        let program = Program::new(lang, context);

        let err = translate(&program, true).unwrap_err();
        assert!(matches!(err, GenerateError::Translation { .. }), "{err}");

        let lenient = translate(&program, false).unwrap();
        let expected = match lang {
            Language::Kotlin => "val pending: Int = TODO()",
            Language::Java => "static final Integer pending = ((Integer) null);",
        };
        assert!(lenient.contains(expected), "{lenient}");
    }
}

#[test]
fn java_narrows_inside_instanceof_branch() {
    let catalog = Catalog::new(Language::Java);
    let animal = Type::Simple(SimpleClassifier {
        name: "Animal".to_string(),
        supertypes: vec![catalog.any_type()],
    });
    let dog = Type::Simple(SimpleClassifier {
        name: "Dog".to_string(),
        supertypes: vec![animal.clone()],
    });
    let string = catalog.string_type();
    let cond = Expr::Conditional {
        cond: Box::new(Expr::Is {
            var: "pet".to_string(),
            target: dog.clone(),
            ty: catalog.boolean_type(),
        }),
        then_branch: Box::new(Expr::FieldAccess {
            receiver: Box::new(Expr::variable("pet", dog)),
            field: "bark".to_string(),
            ty: string.clone(),
        }),
        else_branch: Box::new(Expr::FieldAccess {
            receiver: Box::new(Expr::variable("pet", animal.clone())),
            field: "name".to_string(),
            ty: string.clone(),
        }),
        ty: string.clone(),
    };
    let global = Namespace::global();
    let mut context = Context::new();
    context
        .add_var(&global, var("pet", animal.clone(), Expr::Unresolved(animal)))
        .unwrap();
    context.add_var(&global, var("sound", string, cond)).unwrap();

    let out = translate(&Program::new(Language::Java, context), false).unwrap();
    assert!(
        out.contains("((pet instanceof Dog) ? ((Dog) pet).bark : pet.name)"),
        "{out}"
    );
}

#[test]
fn java_declares_function_interfaces_in_use() {
    let catalog = Catalog::new(Language::Java);
    let int = catalog.integer_type();
    let fn_ty = catalog.function_type(vec![int.clone(), int.clone()], int);
    let mut context = Context::new();
    context
        .add_var(
            &Namespace::global(),
            var("combine", fn_ty.clone(), Expr::Unresolved(fn_ty)),
        )
        .unwrap();

    let out = translate(&Program::new(Language::Java, context), false).unwrap();
    assert!(
        out.contains("static final Function2<Integer, Integer, Integer> combine"),
        "{out}"
    );
    assert!(
        out.contains("interface Function2<A1, A2, R> { R apply(A1 a1, A2 a2); }"),
        "{out}"
    );
}

#[test]
fn kotlin_function_types_use_arrow_syntax() {
    let catalog = Catalog::new(Language::Kotlin);
    let int = catalog.integer_type();
    let fn_ty = catalog.function_type(vec![int.clone()], catalog.boolean_type());
    let mut context = Context::new();
    context
        .add_var(
            &Namespace::global(),
            var("test", fn_ty.clone(), Expr::Unresolved(fn_ty)),
        )
        .unwrap();

    let out = translate(&Program::new(Language::Kotlin, context), false).unwrap();
    assert_eq!(out, "val test: (Int) -> Boolean = TODO()\n");
}

/// `a * b` over two `Short` variables, narrowed back to `Short`.
fn narrowed_product(lang: Language) -> Expr {
    let short = Catalog::new(lang).short_type();
    Expr::Arith {
        op: ArithOp::Mul,
        lhs: Box::new(Expr::variable("a", short.clone())),
        rhs: Box::new(Expr::variable("b", short.clone())),
        ty: short,
        cast: true,
    }
}

#[test]
fn narrowing_arithmetic_is_cast_back() {
    for lang in [Language::Kotlin, Language::Java] {
        let short = Catalog::new(lang).short_type();
        let mut context = Context::new();
        context
            .add_var(&Namespace::global(), var("p", short, narrowed_product(lang)))
            .unwrap();
        let out = translate(&Program::new(lang, context), true).unwrap();
        let expected = match lang {
            Language::Kotlin => "val p: Short = (a * b).toShort()",
            Language::Java => "static final Short p = ((short) (a * b));",
        };
        assert!(out.contains(expected), "{out}");
    }
}

#[test]
fn java_boxes_arithmetic_receivers() {
    let catalog = Catalog::new(Language::Java);
    let call = Expr::FunctionCall {
        name: "doubleValue".to_string(),
        args: Vec::new(),
        receiver: Some(Box::new(narrowed_product(Language::Java))),
        type_args: Vec::new(),
        ret_type: catalog.double_type(),
        is_ref_call: false,
    };
    let mut context = Context::new();
    context
        .add_var(&Namespace::global(), var("d", catalog.double_type(), call))
        .unwrap();
    let out = translate(&Program::new(Language::Java, context), true).unwrap();
    assert!(
        out.contains("static final Double d = ((Short) ((short) (a * b))).doubleValue();"),
        "{out}"
    );
}

// ---------------------------------------------------------------------------
// Generated programs
// ---------------------------------------------------------------------------

#[test]
fn kotlin_output_has_entry_point() {
    let outputs = translated(Language::Kotlin, 0..12);
    assert!(!outputs.is_empty());
    for out in &outputs {
        assert!(out.contains("fun main(args: Array<String>) {"), "{out}");
        assert!(balanced(out, '{', '}'), "{out}");
        assert!(balanced(out, '(', ')'), "{out}");
    }
}

#[test]
fn java_output_is_wrapped_in_main() {
    let outputs = translated(Language::Java, 0..12);
    assert!(!outputs.is_empty());
    for out in &outputs {
        assert!(out.starts_with("class Main {\n"), "{out}");
        assert!(out.ends_with("}\n"), "{out}");
        assert!(
            out.contains("public static void main(String[] args) {"),
            "{out}"
        );
        assert!(!out.contains("TODO()"), "{out}");
        assert!(balanced(out, '{', '}'), "{out}");
        assert!(balanced(out, '(', ')'), "{out}");
    }
}

#[test]
fn java_function_interfaces_cover_every_arity() {
    for out in translated(Language::Java, 0..12) {
        let mut rest = out.as_str();
        while let Some(idx) = rest.find("Function") {
            rest = &rest[idx + "Function".len()..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() || !rest[digits.len()..].starts_with('<') {
                continue;
            }
            assert!(
                out.contains(&format!("interface Function{digits}<")),
                "Function{digits} used but not declared:\n{out}"
            );
        }
    }
}

#[test]
fn translation_is_deterministic() {
    for lang in [Language::Kotlin, Language::Java] {
        assert_eq!(translated(lang, 40..44), translated(lang, 40..44));
    }
}
