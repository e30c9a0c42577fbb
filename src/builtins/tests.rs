use super::*;

#[test]
fn kotlin_numeric_chain_reaches_any() {
    let kt = Catalog::new(Language::Kotlin);
    let int = kt.integer_type();
    assert!(int.is_subtype(&kt.number_type()));
    assert!(int.is_subtype(&kt.any_type()));
    assert!(!int.is_subtype(&kt.string_type()));
    assert!(!kt.number_type().is_subtype(&int));
}

#[test]
fn kotlin_nothing_is_bottom() {
    let kt = Catalog::new(Language::Kotlin);
    let nothing = kt.bottom_type().expect("kotlin has a bottom type");
    for ty in kt.non_bottom_types() {
        assert!(nothing.is_subtype(&ty), "Nothing should be below {ty}");
    }
    assert!(nothing.is_subtype(&kt.array_of(kt.string_type())));
}

#[test]
fn java_has_no_bottom_type() {
    assert!(Catalog::new(Language::Java).bottom_type().is_none());
}

#[test]
fn java_primitives_box_to_reference_types() {
    let java = Catalog::new(Language::Java);
    let int = java.primitive(BuiltinKind::Integer).expect("int exists");
    let boxed = java.integer_type();
    assert_eq!(int.name(), "int");
    assert_eq!(boxed.name(), "Integer");
    assert!(!int.is_subtype(&boxed));
    assert!(int.is_assignable(&boxed));
    assert!(boxed.is_assignable(&int));
    assert!(int.is_assignable(&java.number_type()));
    assert!(!int.is_assignable(&java.string_type()));
    assert!(java.primitive(BuiltinKind::String).is_none());
}

#[test]
fn catalog_values_are_fresh_and_equal() {
    let kt = Catalog::new(Language::Kotlin);
    assert_eq!(kt.string_type(), kt.string_type());
    assert_ne!(kt.string_type(), Catalog::new(Language::Java).string_type());
}

#[test]
fn function_types_compare_by_arity_and_arguments() {
    let kt = Catalog::new(Language::Kotlin);
    let f1 = kt.function_type(vec![kt.integer_type()], kt.string_type());
    let f1_again = kt.function_type(vec![kt.integer_type()], kt.string_type());
    let f2 = kt.function_type(vec![kt.integer_type(), kt.integer_type()], kt.string_type());
    let f1_other = kt.function_type(vec![kt.number_type()], kt.string_type());
    assert!(f1.is_function_type());
    assert_eq!(f1, f1_again);
    assert_ne!(f1, f2);
    assert!(!f1.is_subtype(&f1_other));
    let (params, ret) = f1.function_signature().expect("function type");
    assert_eq!(params, &[kt.integer_type()]);
    assert_eq!(ret, &kt.string_type());
}

#[test]
fn arrays_are_covariant() {
    let kt = Catalog::new(Language::Kotlin);
    let ints = kt.array_of(kt.integer_type());
    let numbers = kt.array_of(kt.number_type());
    assert!(ints.is_subtype(&numbers));
    assert!(!numbers.is_subtype(&ints));

    let int_list = kt.array_list_of(kt.integer_type());
    let number_list = kt.array_list_of(kt.number_type());
    assert!(!int_list.is_subtype(&number_list));
}

#[test]
fn binary_ops_follow_promotion_rules() {
    let java = Catalog::new(Language::Java);
    let short_ops = java.binary_ops(&java.short_type());
    assert_eq!(short_ops.len(), 8);
    let (narrowed, promoted): (Vec<_>, Vec<_>) = short_ops.iter().partition(|op| op.cast);
    assert_eq!(narrowed.len(), 4);
    assert!(narrowed.iter().all(|op| op.result == java.short_type()));
    assert!(promoted.iter().all(|op| op.result == java.integer_type()));

    let int_ops = java.binary_ops(&java.integer_type());
    assert_eq!(int_ops.len(), 4);
    assert!(int_ops.iter().all(|op| !op.cast));

    let kt = Catalog::new(Language::Kotlin);
    assert!(
        kt.binary_ops(&kt.byte_type())
            .iter()
            .any(|op| op.cast && op.result == kt.byte_type())
    );

    let string_ops = java.binary_ops(&java.string_type());
    assert_eq!(string_ops.len(), 1);
    assert_eq!(string_ops[0].op, ArithOp::Add);

    assert!(java.binary_ops(&java.boolean_type()).is_empty());
}

#[test]
fn builtin_class_decls_expose_methods() {
    let kt = Catalog::new(Language::Kotlin);
    let decl = kt.class_decl(&kt.string_type()).expect("String decl");
    assert!(decl.functions.iter().any(|f| f.name == "uppercase"));
    let contains = decl
        .functions
        .iter()
        .find(|f| f.name == "contains")
        .expect("contains");
    assert_eq!(contains.ret_type, kt.boolean_type());

    let java = Catalog::new(Language::Java);
    let double_decl = java.class_decl(&java.double_type()).expect("Double decl");
    assert!(!double_decl.functions.iter().any(|f| f.name == "byteValue"));
    assert!(double_decl.functions.iter().any(|f| f.name == "intValue"));
}

#[test]
fn non_bottom_types_exclude_void_and_nothing() {
    for lang in [Language::Kotlin, Language::Java] {
        let catalog = Catalog::new(lang);
        let types = catalog.non_bottom_types();
        assert!(types.iter().all(|t| !t.is_void() && !t.is_bottom()));
        assert!(types.iter().any(Type::is_type_constructor));
    }
}
