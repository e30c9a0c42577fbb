// src/builtins/kotlin.rs
//
// Kotlin: a single hierarchy under `Any`, with `Nothing` below everything.

use super::BuiltinKind::{self, *};
use super::{BuiltinRow, CatalogData, GenericNames, MethodRow};

pub(super) static DATA: CatalogData = CatalogData {
    top_name: "Any",
    rows: ROWS,
    generics: GenericNames {
        array: "Array",
        iterator: "Iterator",
        array_list: "ArrayList",
    },
    methods,
    has_bottom: true,
};

const fn row(kind: BuiltinKind, name: &'static str, supers: &'static [BuiltinKind]) -> BuiltinRow {
    BuiltinRow {
        kind,
        name,
        primitive: None,
        supers,
    }
}

static ROWS: &[BuiltinRow] = &[
    row(Nothing, "Nothing", &[]),
    row(Void, "Unit", &[Any]),
    row(Number, "Number", &[Any]),
    row(Integer, "Int", &[Number]),
    row(Short, "Short", &[Number]),
    row(Long, "Long", &[Number]),
    row(Byte, "Byte", &[Number]),
    row(Float, "Float", &[Number]),
    row(Double, "Double", &[Number]),
    row(Char, "Char", &[Any]),
    row(String, "String", &[Any]),
    row(Boolean, "Boolean", &[Any]),
];

const fn method(name: &'static str, ret: BuiltinKind) -> MethodRow {
    MethodRow {
        name,
        params: &[],
        ret,
    }
}

static INTEGRAL_METHODS: &[MethodRow] = &[
    method("toByte", Byte),
    method("toDouble", Double),
    method("toFloat", Float),
    method("toInt", Integer),
    method("toShort", Short),
    method("toLong", Long),
    method("toString", String),
];

// Float.toByte() and friends are deprecated to errors in recent compilers.
static FLOATING_METHODS: &[MethodRow] = &[
    method("toDouble", Double),
    method("toFloat", Float),
    method("toInt", Integer),
    method("toLong", Long),
    method("toString", String),
];

static TO_STRING: &[MethodRow] = &[method("toString", String)];

static STRING_METHODS: &[MethodRow] = &[
    method("toString", String),
    method("lowercase", String),
    method("uppercase", String),
    MethodRow {
        name: "contains",
        params: &[("other", String)],
        ret: Boolean,
    },
    MethodRow {
        name: "replace",
        params: &[("oldChar", Char), ("newChar", Char)],
        ret: String,
    },
    MethodRow {
        name: "substring",
        params: &[("startIndex", Integer), ("endIndex", Integer)],
        ret: String,
    },
];

fn methods(kind: BuiltinKind) -> &'static [MethodRow] {
    match kind {
        Number | Integer | Short | Long | Byte => INTEGRAL_METHODS,
        Float | Double => FLOATING_METHODS,
        Char | Boolean => TO_STRING,
        String => STRING_METHODS,
        Any | Nothing | Void => &[],
    }
}
