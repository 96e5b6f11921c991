//! Type annotations as written in source

use crate::common::Span;
use crate::types::Type;
use std::fmt;

/// Scalar types that can be named directly or used as a series element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    TimeStamp,
    TimeSpan,
}

impl PrimitiveType {
    pub fn to_type(self) -> Type {
        match self {
            PrimitiveType::I8 => Type::I8,
            PrimitiveType::I16 => Type::I16,
            PrimitiveType::I32 => Type::I32,
            PrimitiveType::I64 => Type::I64,
            PrimitiveType::U8 => Type::U8,
            PrimitiveType::U16 => Type::U16,
            PrimitiveType::U32 => Type::U32,
            PrimitiveType::U64 => Type::U64,
            PrimitiveType::F32 => Type::F32,
            PrimitiveType::F64 => Type::F64,
            PrimitiveType::String => Type::String,
            PrimitiveType::TimeStamp => Type::TimeStamp,
            PrimitiveType::TimeSpan => Type::TimeSpan,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_type().fmt(f)
    }
}

/// Advisory direction on a channel annotation (`<-chan`, `->chan`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChanDirection {
    #[default]
    Both,
    Recv,
    Send,
}

/// A type annotation
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Primitive(PrimitiveType),
    Series(PrimitiveType),
    Chan {
        elem: Box<TypeExpr>,
        direction: ChanDirection,
    },
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Resolve the annotation to a value type. Direction is dropped.
    pub fn to_type(&self) -> Type {
        match &self.kind {
            TypeExprKind::Primitive(p) => p.to_type(),
            TypeExprKind::Series(p) => Type::series(p.to_type()),
            TypeExprKind::Chan { elem, .. } => Type::chan(elem.to_type()),
        }
    }
}
