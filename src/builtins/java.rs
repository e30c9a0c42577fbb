// src/builtins/java.rs
//
// Java: `Object` at the top, no bottom type, and an unboxed primitive form
// beside each boxed numeric, `Character` and `Boolean`.

use super::BuiltinKind::{self, *};
use super::{BuiltinRow, CatalogData, GenericNames, MethodRow};

pub(super) static DATA: CatalogData = CatalogData {
    top_name: "Object",
    rows: ROWS,
    generics: GenericNames {
        array: "Array",
        iterator: "java.util.Iterator",
        array_list: "java.util.ArrayList",
    },
    methods,
    has_bottom: false,
};

static ROWS: &[BuiltinRow] = &[
    BuiltinRow {
        kind: Void,
        name: "void",
        primitive: None,
        supers: &[Any],
    },
    BuiltinRow {
        kind: Number,
        name: "Number",
        primitive: None,
        supers: &[Any],
    },
    boxed(Integer, "Integer", "int"),
    boxed(Short, "Short", "short"),
    boxed(Long, "Long", "long"),
    boxed(Byte, "Byte", "byte"),
    boxed(Float, "Float", "float"),
    boxed(Double, "Double", "double"),
    BuiltinRow {
        kind: Char,
        name: "Character",
        primitive: Some("char"),
        supers: &[Any],
    },
    BuiltinRow {
        kind: String,
        name: "String",
        primitive: None,
        supers: &[Any],
    },
    BuiltinRow {
        kind: Boolean,
        name: "Boolean",
        primitive: Some("boolean"),
        supers: &[Any],
    },
];

const fn boxed(kind: BuiltinKind, name: &'static str, primitive: &'static str) -> BuiltinRow {
    BuiltinRow {
        kind,
        name,
        primitive: Some(primitive),
        supers: &[Number],
    }
}

const fn method(name: &'static str, ret: BuiltinKind) -> MethodRow {
    MethodRow {
        name,
        params: &[],
        ret,
    }
}

static INTEGRAL_METHODS: &[MethodRow] = &[
    method("byteValue", Byte),
    method("doubleValue", Double),
    method("floatValue", Float),
    method("intValue", Integer),
    method("shortValue", Short),
    method("longValue", Long),
    method("toString", String),
];

static FLOATING_METHODS: &[MethodRow] = &[
    method("doubleValue", Double),
    method("floatValue", Float),
    method("intValue", Integer),
    method("longValue", Long),
    method("toString", String),
];

static TO_STRING: &[MethodRow] = &[method("toString", String)];

static STRING_METHODS: &[MethodRow] = &[
    method("toString", String),
    method("toLowerCase", String),
    method("toUpperCase", String),
    method("length", Integer),
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
        params: &[("beginIndex", Integer), ("endIndex", Integer)],
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
