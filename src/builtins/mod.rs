// src/builtins/mod.rs
//
// Builtin type catalogs. Each target language describes its builtin types as
// a data table of supertype edges (see `kotlin` and `java`); `Catalog` turns
// table rows into fresh `Type` values on every call.

mod java;
mod kotlin;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{ArithOp, ClassDecl, ClassKind, FuncDecl, FuncKind, ParamDecl};
use crate::types::{BuiltinType, Type, TypeConstructor, TypeParameter, Variance};

/// Target language of a generated program.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Kotlin,
    Java,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Kotlin => "kotlin",
            Language::Java => "java",
        }
    }

    /// Source file extension for emitted programs.
    pub fn extension(self) -> &'static str {
        match self {
            Language::Kotlin => "kt",
            Language::Java => "java",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language-independent identity of a builtin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Any,
    Nothing,
    Void,
    Number,
    Integer,
    Short,
    Long,
    Byte,
    Float,
    Double,
    Char,
    String,
    Boolean,
}

impl BuiltinKind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BuiltinKind::Integer
                | BuiltinKind::Short
                | BuiltinKind::Long
                | BuiltinKind::Byte
                | BuiltinKind::Float
                | BuiltinKind::Double
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            BuiltinKind::Integer | BuiltinKind::Short | BuiltinKind::Long | BuiltinKind::Byte
        )
    }
}

/// One row of a catalog's builtin table.
pub(crate) struct BuiltinRow {
    pub kind: BuiltinKind,
    pub name: &'static str,
    /// Name of the unboxed form, when the language has one.
    pub primitive: Option<&'static str>,
    pub supers: &'static [BuiltinKind],
}

/// A modeled builtin method: name, parameters and return type.
pub(crate) struct MethodRow {
    pub name: &'static str,
    pub params: &'static [(&'static str, BuiltinKind)],
    pub ret: BuiltinKind,
}

/// Names of the catalog's generic builtin constructors.
pub(crate) struct GenericNames {
    pub array: &'static str,
    pub iterator: &'static str,
    pub array_list: &'static str,
}

/// Language-specific data consulted by `Catalog`.
pub(crate) struct CatalogData {
    pub top_name: &'static str,
    pub rows: &'static [BuiltinRow],
    pub generics: GenericNames,
    pub methods: fn(BuiltinKind) -> &'static [MethodRow],
    pub has_bottom: bool,
}

/// A binary operator available on a builtin type.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub op: ArithOp,
    pub result: Type,
    /// `result` is the narrowed operand type and must be cast back to it.
    pub cast: bool,
}

/// Builtin type catalog for one target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    lang: Language,
}

impl Catalog {
    pub fn new(lang: Language) -> Self {
        Self { lang }
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    fn data(&self) -> &'static CatalogData {
        match self.lang {
            Language::Kotlin => &kotlin::DATA,
            Language::Java => &java::DATA,
        }
    }

    fn row(&self, kind: BuiltinKind) -> Option<&'static BuiltinRow> {
        self.data().rows.iter().find(|r| r.kind == kind)
    }

    /// The reference form of `kind`. Java has no bottom type, so asking for
    /// `Nothing` there yields the top type.
    pub fn builtin(&self, kind: BuiltinKind) -> Type {
        match self.row(kind) {
            Some(row) => Type::Builtin(self.make(row, false)),
            None => self.any_type(),
        }
    }

    /// The unboxed form of `kind`, if the language distinguishes one.
    pub fn primitive(&self, kind: BuiltinKind) -> Option<Type> {
        let row = self.row(kind)?;
        row.primitive?;
        Some(Type::Builtin(self.make(row, true)))
    }

    fn make(&self, row: &BuiltinRow, primitive: bool) -> BuiltinType {
        let name = match (primitive, row.primitive) {
            (true, Some(p)) => p,
            _ => row.name,
        };
        let supertypes = if primitive {
            Vec::new()
        } else {
            row.supers.iter().map(|k| self.builtin(*k)).collect()
        };
        BuiltinType {
            name: name.to_string(),
            kind: row.kind,
            lang: self.lang,
            primitive,
            supertypes,
        }
    }

    pub fn any_type(&self) -> Type {
        Type::Builtin(BuiltinType {
            name: self.data().top_name.to_string(),
            kind: BuiltinKind::Any,
            lang: self.lang,
            primitive: false,
            supertypes: Vec::new(),
        })
    }

    pub fn void_type(&self) -> Type {
        self.builtin(BuiltinKind::Void)
    }

    pub fn number_type(&self) -> Type {
        self.builtin(BuiltinKind::Number)
    }

    pub fn integer_type(&self) -> Type {
        self.builtin(BuiltinKind::Integer)
    }

    pub fn short_type(&self) -> Type {
        self.builtin(BuiltinKind::Short)
    }

    pub fn long_type(&self) -> Type {
        self.builtin(BuiltinKind::Long)
    }

    pub fn byte_type(&self) -> Type {
        self.builtin(BuiltinKind::Byte)
    }

    pub fn float_type(&self) -> Type {
        self.builtin(BuiltinKind::Float)
    }

    pub fn double_type(&self) -> Type {
        self.builtin(BuiltinKind::Double)
    }

    pub fn char_type(&self) -> Type {
        self.builtin(BuiltinKind::Char)
    }

    pub fn string_type(&self) -> Type {
        self.builtin(BuiltinKind::String)
    }

    pub fn boolean_type(&self) -> Type {
        self.builtin(BuiltinKind::Boolean)
    }

    /// The universal bottom type, where the language has one.
    pub fn bottom_type(&self) -> Option<Type> {
        if !self.data().has_bottom {
            return None;
        }
        self.row(BuiltinKind::Nothing)
            .map(|row| Type::Builtin(self.make(row, false)))
    }

    fn generic(&self, name: &str, variance: Variance) -> TypeConstructor {
        TypeConstructor {
            name: name.to_string(),
            type_parameters: vec![TypeParameter::new("T").with_variance(variance)],
            supertypes: vec![self.any_type()],
            builtin: true,
        }
    }

    /// `Array<out T>`; arrays are covariant in both languages' models.
    pub fn array_ctor(&self) -> TypeConstructor {
        self.generic(self.data().generics.array, Variance::Covariant)
    }

    pub fn iterator_ctor(&self) -> TypeConstructor {
        self.generic(self.data().generics.iterator, Variance::Invariant)
    }

    pub fn array_list_ctor(&self) -> TypeConstructor {
        self.generic(self.data().generics.array_list, Variance::Invariant)
    }

    /// `FunctionN<A1, .., An, R>`, all parameters invariant.
    pub fn function_ctor(&self, arity: usize) -> TypeConstructor {
        let mut type_parameters: Vec<TypeParameter> = (1..=arity)
            .map(|i| TypeParameter::new(format!("A{i}")))
            .collect();
        type_parameters.push(TypeParameter::new("R"));
        TypeConstructor {
            name: format!("Function{arity}"),
            type_parameters,
            supertypes: vec![self.any_type()],
            builtin: true,
        }
    }

    pub fn array_of(&self, elem: Type) -> Type {
        self.array_ctor().apply(vec![elem])
    }

    pub fn array_list_of(&self, elem: Type) -> Type {
        self.array_list_ctor().apply(vec![elem])
    }

    pub fn iterator_of(&self, elem: Type) -> Type {
        self.iterator_ctor().apply(vec![elem])
    }

    pub fn function_type(&self, params: Vec<Type>, ret: Type) -> Type {
        let ctor = self.function_ctor(params.len());
        let mut args = params;
        args.push(ret);
        ctor.apply(args)
    }

    pub fn number_types(&self) -> Vec<Type> {
        [
            BuiltinKind::Integer,
            BuiltinKind::Short,
            BuiltinKind::Long,
            BuiltinKind::Byte,
            BuiltinKind::Float,
            BuiltinKind::Double,
        ]
        .into_iter()
        .map(|k| self.builtin(k))
        .collect()
    }

    /// Types usable for variables, fields and return values: every concrete
    /// builtin except void and the bottom type, plus the array constructor.
    pub fn non_bottom_types(&self) -> Vec<Type> {
        let mut types = vec![self.any_type(), self.number_type()];
        types.extend(self.number_types());
        types.push(self.char_type());
        types.push(self.string_type());
        types.push(self.boolean_type());
        types.push(Type::Constructor(self.array_ctor()));
        types
    }

    /// Whether `ty` names a type this catalog provides.
    pub fn is_builtin(&self, ty: &Type) -> bool {
        match ty {
            Type::Builtin(b) => b.lang == self.lang,
            Type::Parameterized(p) => p.ctor.builtin,
            Type::Constructor(c) => c.builtin,
            _ => false,
        }
    }

    /// Arithmetic operators on `ty` with their result types.
    pub fn binary_ops(&self, ty: &Type) -> Vec<BinaryOp> {
        let Some(kind) = ty.builtin_kind() else {
            return Vec::new();
        };
        let result = match kind {
            BuiltinKind::Integer | BuiltinKind::Short | BuiltinKind::Byte => self.integer_type(),
            BuiltinKind::Long => self.long_type(),
            BuiltinKind::Float => self.float_type(),
            BuiltinKind::Double => self.double_type(),
            BuiltinKind::String => {
                return vec![BinaryOp {
                    op: ArithOp::Add,
                    result: self.string_type(),
                    cast: false,
                }];
            }
            _ => return Vec::new(),
        };
        let mut ops: Vec<BinaryOp> = ArithOp::ALL
            .into_iter()
            .map(|op| BinaryOp {
                op,
                result: result.clone(),
                cast: false,
            })
            .collect();
        // Sub-int operands promote; narrowing back to the operand type needs a cast.
        if matches!(kind, BuiltinKind::Short | BuiltinKind::Byte) {
            ops.extend(ArithOp::ALL.into_iter().map(|op| BinaryOp {
                op,
                result: self.builtin(kind),
                cast: true,
            }));
        }
        ops
    }

    /// A synthesized class declaration exposing the modeled methods of a
    /// builtin type. Methods have no bodies.
    pub fn class_decl(&self, ty: &Type) -> Option<ClassDecl> {
        let Type::Builtin(b) = ty else {
            return None;
        };
        let mut decl = ClassDecl::new(b.name.clone(), ClassKind::Regular);
        decl.is_final = true;
        decl.functions = (self.data().methods)(b.kind)
            .iter()
            .map(|m| FuncDecl {
                name: m.name.to_string(),
                params: m
                    .params
                    .iter()
                    .map(|(name, kind)| ParamDecl::new(*name, self.builtin(*kind)))
                    .collect(),
                ret_type: self.builtin(m.ret),
                body: None,
                kind: FuncKind::ClassMethod,
                type_params: Vec::new(),
                is_final: true,
                is_override: false,
            })
            .collect();
        Some(decl)
    }
}
