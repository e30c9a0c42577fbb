use proptest::prelude::*;

use super::*;
use crate::builtins::{Catalog, Language};

fn kotlin() -> Catalog {
    Catalog::new(Language::Kotlin)
}

fn class(name: &str, supertypes: Vec<Type>) -> Type {
    Type::Simple(SimpleClassifier {
        name: name.to_string(),
        supertypes,
    })
}

fn generic(name: &str, variance: Variance, supertypes: Vec<Type>) -> TypeConstructor {
    TypeConstructor {
        name: name.to_string(),
        type_parameters: vec![TypeParameter::new("T").with_variance(variance)],
        supertypes,
        builtin: false,
    }
}

/// Build classes `C0..Cn` where each class extends the subset of earlier
/// classes picked by `edges`. The result is acyclic by construction.
fn class_graph(edges: &[Vec<usize>]) -> Vec<Type> {
    let mut classes: Vec<Type> = Vec::new();
    for (i, supers) in edges.iter().enumerate() {
        let mut supertypes = Vec::new();
        for &s in supers {
            if i > 0 {
                let target = classes[s % i].clone();
                if !supertypes.contains(&target) {
                    supertypes.push(target);
                }
            }
        }
        classes.push(class(&format!("C{i}"), supertypes));
    }
    classes
}

fn graph_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..16, 0..3), 1..8)
}

proptest! {
    #[test]
    fn subtyping_is_reflexive(edges in graph_strategy()) {
        for ty in class_graph(&edges) {
            prop_assert!(ty.is_subtype(&ty));
        }
    }

    #[test]
    fn subtyping_is_transitive(edges in graph_strategy()) {
        let classes = class_graph(&edges);
        for a in &classes {
            for b in &classes {
                for c in &classes {
                    if a.is_subtype(b) && b.is_subtype(c) {
                        prop_assert!(a.is_subtype(c), "{a} <: {b} <: {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn no_class_is_a_proper_supertype_of_itself(edges in graph_strategy()) {
        for ty in class_graph(&edges) {
            let mut strict = ty.all_supertypes();
            strict.remove(0);
            prop_assert!(!strict.iter().any(|st| st.name() == ty.name()));
        }
    }
}

#[test]
fn declared_edges_are_transitive() {
    let a = class("A", vec![]);
    let b = class("B", vec![a.clone()]);
    let c = class("C", vec![b.clone()]);
    assert!(c.is_subtype(&a));
    assert!(!a.is_subtype(&c));
    assert!(c.is_subtype(&kotlin().any_type()));
}

#[test]
fn variance_drives_argument_comparison() {
    let kt = kotlin();
    let int = kt.integer_type();
    let number = kt.number_type();

    let producer = generic("Producer", Variance::Covariant, vec![]);
    assert!(producer.apply(vec![int.clone()]).is_subtype(&producer.apply(vec![number.clone()])));
    assert!(!producer.apply(vec![number.clone()]).is_subtype(&producer.apply(vec![int.clone()])));

    let consumer = generic("Consumer", Variance::Contravariant, vec![]);
    assert!(consumer.apply(vec![number.clone()]).is_subtype(&consumer.apply(vec![int.clone()])));
    assert!(!consumer.apply(vec![int.clone()]).is_subtype(&consumer.apply(vec![number.clone()])));

    let cell = generic("Cell", Variance::Invariant, vec![]);
    assert!(!cell.apply(vec![int.clone()]).is_subtype(&cell.apply(vec![number])));
    assert!(cell.apply(vec![int.clone()]).is_subtype(&cell.apply(vec![int])));
}

#[test]
fn use_site_wildcards_widen_invariant_arguments() {
    let kt = kotlin();
    let int = kt.integer_type();
    let number = kt.number_type();
    let cell = generic("Cell", Variance::Invariant, vec![]);

    let out_number = cell.apply(vec![Type::Wildcard(WildcardType::extends(number.clone()))]);
    assert!(cell.apply(vec![int.clone()]).is_subtype(&out_number));
    assert!(!cell.apply(vec![kt.string_type()]).is_subtype(&out_number));

    let in_int = cell.apply(vec![Type::Wildcard(WildcardType::super_of(int.clone()))]);
    assert!(cell.apply(vec![number]).is_subtype(&in_int));
    assert!(!cell.apply(vec![kt.short_type()]).is_subtype(&in_int));

    let star = cell.apply(vec![Type::Wildcard(WildcardType::unbounded())]);
    assert!(cell.apply(vec![int]).is_subtype(&star));
}

#[test]
fn parameterized_supertypes_are_substituted() {
    let kt = kotlin();
    let base = generic("Base", Variance::Invariant, vec![]);
    let t = TypeParameter::new("T");
    let derived = TypeConstructor {
        name: "Derived".to_string(),
        type_parameters: vec![t.clone()],
        supertypes: vec![base.apply(vec![Type::TypeParam(t)])],
        builtin: false,
    };
    let derived_int = derived.apply(vec![kt.integer_type()]);
    assert!(derived_int.is_subtype(&base.apply(vec![kt.integer_type()])));
    assert!(!derived_int.is_subtype(&base.apply(vec![kt.string_type()])));
}

#[test]
fn type_parameter_bounds_resolve_through_chains() {
    let kt = kotlin();
    let t = TypeParameter::new("T").with_bound(kt.number_type());
    let u = TypeParameter::new("U").with_bound(Type::TypeParam(t.clone()));
    assert_eq!(u.bound_rec(), Some(kt.number_type()));
    assert!(Type::TypeParam(u.clone()).is_subtype(&kt.number_type()));
    assert!(Type::TypeParam(u).is_subtype(&Type::TypeParam(t)));

    let free = Type::TypeParam(TypeParameter::new("V"));
    assert_eq!(free.bound_rec(), None);
    assert!(free.is_subtype(&kt.any_type()));
    assert!(!free.is_subtype(&kt.number_type()));
}

#[test]
fn substitution_replaces_nested_parameters() {
    let kt = kotlin();
    let t = TypeParameter::new("T");
    let list = kt.array_list_of(kt.array_of(Type::TypeParam(t.clone())));
    let mut map = TypeVarMap::new();
    map.insert(t, kt.string_type());
    assert_eq!(
        list.substitute(&map),
        kt.array_list_of(kt.array_of(kt.string_type()))
    );
    assert!(!list.substitute(&map).has_type_variables());
    assert!(list.has_type_variables());
}

#[test]
fn variance_free_types_drop_wildcards() {
    let kt = kotlin();
    let ty = kt.array_list_of(Type::Wildcard(WildcardType::extends(kt.integer_type())));
    assert!(ty.has_wildcards());
    let free = ty.to_variance_free(&kt.any_type());
    assert_eq!(free, kt.array_list_of(kt.integer_type()));
    let star = kt.array_list_of(Type::Wildcard(WildcardType::unbounded()));
    assert_eq!(
        star.to_variance_free(&kt.any_type()),
        kt.array_list_of(kt.any_type())
    );
}

#[test]
fn display_renders_readable_types() {
    let kt = kotlin();
    let f = kt.function_type(vec![kt.integer_type()], kt.string_type());
    assert_eq!(f.to_string(), "Function1<Int, String>");
    let out = kt.array_of(Type::Wildcard(WildcardType::extends(kt.number_type())));
    assert_eq!(out.to_string(), "Array<out Number>");
}
