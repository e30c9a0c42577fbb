use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::ast::{ClassKind, FuncKind, ParamDecl, SuperClassInst};
use crate::builtins::Language;

fn kotlin() -> Catalog {
    Catalog::new(Language::Kotlin)
}

fn ctor(name: &str, params: &[&str], supertypes: Vec<Type>) -> TypeConstructor {
    TypeConstructor {
        name: name.to_string(),
        type_parameters: params.iter().map(|p| TypeParameter::new(*p)).collect(),
        supertypes,
        builtin: false,
    }
}

fn tp(name: &str) -> Type {
    Type::TypeParam(TypeParameter::new(name))
}

fn abstract_fn(name: &str, params: Vec<(&str, Type)>, ret: Type) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        params: params
            .into_iter()
            .map(|(n, t)| ParamDecl::new(n, t))
            .collect(),
        ret_type: ret,
        body: None,
        kind: FuncKind::ClassMethod,
        type_params: vec![],
        is_final: false,
        is_override: false,
    }
}

fn interface(name: &str, functions: Vec<FuncDecl>) -> ClassDecl {
    let mut decl = ClassDecl::new(name, ClassKind::Interface);
    decl.functions = functions;
    decl
}

// -- unify ------------------------------------------------------------------

#[test]
fn unify_binds_type_arguments() {
    let kt = kotlin();
    let boxed = ctor("Box", &["T"], vec![]);
    let map = unify(&boxed.apply(vec![kt.integer_type()]), &boxed.apply(vec![tp("T")]))
        .expect("unifiable");
    assert_eq!(map.get_by_name("T"), Some(&kt.integer_type()));
}

#[test]
fn unify_rejects_constructor_mismatch() {
    let kt = kotlin();
    let a = ctor("Box", &["T"], vec![]);
    let b = ctor("Crate", &["T"], vec![]);
    assert!(unify(&a.apply(vec![kt.integer_type()]), &b.apply(vec![tp("T")])).is_none());
    assert!(unify(&kt.string_type(), &kt.integer_type()).is_none());
}

#[test]
fn unify_rejects_conflicting_bindings() {
    let kt = kotlin();
    let pair = ctor("Pair", &["K", "V"], vec![]);
    let expected = pair.apply(vec![kt.integer_type(), kt.string_type()]);
    let actual = pair.apply(vec![tp("T"), tp("T")]);
    assert!(unify(&expected, &actual).is_none());

    let same = pair.apply(vec![kt.integer_type(), kt.integer_type()]);
    let map = unify(&same, &actual).expect("consistent binding");
    assert_eq!(map.len(), 1);
}

#[test]
fn unify_honours_bounds() {
    let kt = kotlin();
    let bounded = Type::TypeParam(TypeParameter::new("T").with_bound(kt.number_type()));
    assert!(unify(&kt.string_type(), &bounded).is_none());
    assert!(unify(&kt.integer_type(), &bounded).is_some());
}

#[test]
fn unify_equal_types_yields_empty_map() {
    let kt = kotlin();
    let map = unify(&kt.string_type(), &kt.string_type()).expect("equal types unify");
    assert!(map.is_empty());
}

#[test]
fn required_unification_reports_both_sides() {
    let kt = kotlin();
    let err = unify_required(&kt.integer_type(), &kt.string_type()).unwrap_err();
    assert_eq!(
        err,
        GenerateError::Unification {
            expected: "Int".to_string(),
            actual: "String".to_string(),
        }
    );

    let boxed = ctor("Box", &["T"], vec![]);
    let map = unify_required(&boxed.apply(vec![kt.string_type()]), &boxed.apply(vec![tp("T")]))
        .expect("unifiable");
    assert_eq!(map.get_by_name("T"), Some(&kt.string_type()));
}

// -- instantiation ----------------------------------------------------------

#[test]
fn instantiation_respects_bounds() {
    let kt = kotlin();
    let mut c = ctor("Box", &[], vec![]);
    c.type_parameters = vec![TypeParameter::new("T").with_bound(kt.number_type())];
    let types = kt.non_bottom_types();
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (ty, map) = instantiate_type_constructor(&mut rng, &c, &types, None, None, false)
            .expect("numbers are available");
        let arg = map.get_by_name("T").expect("T bound");
        assert!(arg.is_subtype(&kt.number_type()), "seed {seed}: {arg}");
        assert!(ty.is_parameterized());
        assert!(!ty.has_type_variables());
    }
}

#[test]
fn instantiation_keeps_partial_bindings() {
    let kt = kotlin();
    let pair = ctor("Pair", &["K", "V"], vec![]);
    let partial: TypeVarMap = [(TypeParameter::new("K"), kt.char_type())]
        .into_iter()
        .collect();
    let mut rng = StdRng::seed_from_u64(9);
    let (ty, _) = instantiate_type_constructor(
        &mut rng,
        &pair,
        &kt.non_bottom_types(),
        Some(&partial),
        None,
        false,
    )
    .expect("instantiable");
    assert_eq!(ty.type_args()[0], kt.char_type());
}

#[test]
fn instantiation_fails_without_candidates() {
    let mut rng = StdRng::seed_from_u64(0);
    let c = ctor("Box", &["T"], vec![]);
    assert!(instantiate_type_constructor(&mut rng, &c, &[], None, None, false).is_none());
}

#[test]
fn pecs_mode_projects_producers_and_consumers() {
    let kt = kotlin();
    let pair = ctor("Pair", &["K", "V"], vec![]);
    let mut choices = VarianceChoices::default();
    choices.insert("K".to_string(), (true, false));
    choices.insert("V".to_string(), (false, true));
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (ty, map) = instantiate_type_constructor(
            &mut rng,
            &pair,
            &kt.non_bottom_types(),
            None,
            Some(&choices),
            true,
        )
        .expect("instantiable");
        let args = ty.type_args();
        assert!(matches!(&args[0], Type::Wildcard(w) if w.variance.is_covariant()));
        assert!(matches!(&args[1], Type::Wildcard(w) if w.variance.is_contravariant()));
        // The map records the unprojected arguments.
        assert!(map.iter().all(|(_, t)| !t.is_wildcard()));
    }
}

#[test]
fn parameterized_function_instantiation_extends_partial_map() {
    let kt = kotlin();
    let params = vec![
        TypeParameter::new("F_A"),
        TypeParameter::new("F_B").with_bound(kt.number_type()),
    ];
    let partial: TypeVarMap = [(TypeParameter::new("F_A"), kt.string_type())]
        .into_iter()
        .collect();
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let map = instantiate_parameterized_function(
            &mut rng,
            &params,
            &kt.non_bottom_types(),
            &partial,
        )
        .expect("instantiable");
        assert_eq!(map.get_by_name("F_A"), Some(&kt.string_type()));
        let b = map.get_by_name("F_B").expect("F_B bound");
        assert!(b.is_subtype(&kt.number_type()));
    }
}

#[test]
fn variance_choices_follow_member_positions() {
    let kt = kotlin();
    let mut class = ClassDecl::new("Source", ClassKind::Interface);
    class.type_params = vec![TypeParameter::new("P"), TypeParameter::new("C")];
    class.functions = vec![
        abstract_fn("produce", vec![], tp("P")),
        abstract_fn("consume", vec![("c", tp("C"))], kt.void_type()),
    ];
    let choices = variance_choices(&class);
    assert_eq!(choices.get("P"), Some(&(true, false)));
    assert_eq!(choices.get("C"), Some(&(false, true)));
}

// -- SAM --------------------------------------------------------------------

#[test]
fn single_abstract_method_interfaces_are_sam() {
    let kt = kotlin();
    let mut ctx = Context::new();
    let runner = interface(
        "Runner",
        vec![abstract_fn("run", vec![("x", kt.integer_type())], kt.string_type())],
    );
    let runner_ty = runner.get_type();
    ctx.add_class(&Namespace::global(), runner).expect("fresh");

    assert!(is_sam(&ctx, &runner_ty));
    assert_eq!(
        find_sam_signature(&ctx, &kt, &runner_ty),
        Some(kt.function_type(vec![kt.integer_type()], kt.string_type()))
    );
}

#[test]
fn inherited_abstract_method_counts() {
    let kt = kotlin();
    let mut ctx = Context::new();
    let runner = interface("Runner", vec![abstract_fn("run", vec![], kt.boolean_type())]);
    let mut sub = interface("Sprinter", vec![]);
    sub.superclasses.push(SuperClassInst {
        class_type: runner.get_type(),
        args: None,
    });
    let sub_ty = sub.get_type();
    ctx.add_class(&Namespace::global(), runner).expect("fresh");
    ctx.add_class(&Namespace::global(), sub).expect("fresh");
    assert!(is_sam(&ctx, &sub_ty));
}

#[test]
fn non_sam_shapes_are_rejected() {
    let kt = kotlin();
    let mut ctx = Context::new();
    let two = interface(
        "Pair",
        vec![
            abstract_fn("first", vec![], kt.integer_type()),
            abstract_fn("second", vec![], kt.integer_type()),
        ],
    );
    let two_ty = two.get_type();
    let mut regular = ClassDecl::new("Plain", ClassKind::Abstract);
    regular
        .functions
        .push(abstract_fn("run", vec![], kt.integer_type()));
    let regular_ty = regular.get_type();
    ctx.add_class(&Namespace::global(), two).expect("fresh");
    ctx.add_class(&Namespace::global(), regular).expect("fresh");

    assert!(!is_sam(&ctx, &two_ty));
    assert!(!is_sam(&ctx, &regular_ty));
    assert!(!is_sam(&ctx, &kt.string_type()));
}

#[test]
fn generic_sam_signature_is_substituted() {
    let kt = kotlin();
    let mut ctx = Context::new();
    let mut mapper = interface(
        "Mapper",
        vec![abstract_fn("map", vec![("x", tp("T"))], tp("T"))],
    );
    mapper.type_params = vec![TypeParameter::new("T")];
    let Type::Constructor(mapper_ctor) = mapper.get_type() else {
        panic!("generic class should be a constructor");
    };
    ctx.add_class(&Namespace::global(), mapper).expect("fresh");

    let ty = mapper_ctor.apply(vec![kt.integer_type()]);
    assert_eq!(
        find_sam_signature(&ctx, &kt, &ty),
        Some(kt.function_type(vec![kt.integer_type()], kt.integer_type()))
    );
}

// -- find_subtypes ----------------------------------------------------------

#[test]
fn find_subtypes_filters_by_kind() {
    let mut base = ClassDecl::new("Base", ClassKind::Regular);
    base.is_final = false;
    let base_ty = base.get_type();
    let mut child = ClassDecl::new("Child", ClassKind::Regular);
    child.superclasses.push(SuperClassInst {
        class_type: base_ty.clone(),
        args: Some(vec![]),
    });
    let mut shape = ClassDecl::new("Shape", ClassKind::Abstract);
    shape.superclasses.push(SuperClassInst {
        class_type: base_ty.clone(),
        args: Some(vec![]),
    });
    let classes = [&base, &child, &shape];

    let concrete = find_subtypes(&base_ty, &classes, &[], false, true);
    assert_eq!(concrete, vec![child.get_type()]);

    let all = find_subtypes(&base_ty, &classes, &[], true, false);
    assert_eq!(all, vec![base_ty.clone(), child.get_type(), shape.get_type()]);
}

#[test]
fn find_subtypes_instantiates_generic_subclasses() {
    let kt = kotlin();
    let holder = ctor("Holder", &["T"], vec![]);
    let mut boxed = ClassDecl::new("Box", ClassKind::Regular);
    boxed.type_params = vec![TypeParameter::new("T")];
    boxed.superclasses.push(SuperClassInst {
        class_type: holder.apply(vec![tp("T")]),
        args: Some(vec![]),
    });
    let target = holder.apply(vec![kt.integer_type()]);
    let found = find_subtypes(&target, &[&boxed], &[], false, true);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "Box");
    assert_eq!(found[0].type_args(), &[kt.integer_type()]);
    assert!(found[0].is_subtype(&target));
}

#[test]
fn find_subtypes_over_builtins() {
    let kt = kotlin();
    let found = find_subtypes(&kt.number_type(), &[], &kt.non_bottom_types(), false, false);
    assert_eq!(found, kt.number_types());
}
