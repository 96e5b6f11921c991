//! Value types, signatures and the compatibility rules between them
//!
//! Booleans have no type of their own: they are modeled as `u8`.

use super::Params;
use indexmap::IndexSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    TimeStamp,
    TimeSpan,

    /// Ordered collection of a primitive element type
    Series(Box<Type>),
    /// Telemetry channel carrying values of the element type
    Chan(Box<Type>),

    Function(FunctionType),
    Task(TaskType),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionType {
    pub params: Params,
    pub ret: Option<Box<Type>>,
}

/// Signature of a task: config is bound at wiring time, params are piped
/// from the upstream node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskType {
    pub config: Params,
    pub params: Params,
    pub ret: Option<Box<Type>>,
    pub channels: ChannelSet,
}

/// Channels a task reads from and writes to, by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSet {
    pub read: IndexSet<String>,
    pub write: IndexSet<String>,
}

impl Type {
    // ==================== Constructors ====================

    pub fn chan(elem: Type) -> Self {
        Type::Chan(Box::new(elem))
    }

    pub fn series(elem: Type) -> Self {
        debug_assert!(elem.is_primitive(), "series element must be primitive");
        Type::Series(Box::new(elem))
    }

    pub fn function(params: Params, ret: Option<Type>) -> Self {
        Type::Function(FunctionType {
            params,
            ret: ret.map(Box::new),
        })
    }

    pub fn task(config: Params, params: Params, ret: Option<Type>) -> Self {
        Type::Task(TaskType {
            config,
            params,
            ret: ret.map(Box::new),
            channels: ChannelSet::default(),
        })
    }

    // ==================== Type queries ====================

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(self, Type::U8 | Type::U16 | Type::U32 | Type::U64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::U8)
    }

    /// Numeric, string or temporal scalar
    pub fn is_primitive(&self) -> bool {
        match self {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 |
            Type::I8 | Type::I16 | Type::I32 | Type::I64 |
            Type::F32 | Type::F64 |
            Type::String | Type::TimeStamp | Type::TimeSpan => true,
            Type::Series(_) | Type::Chan(_) | Type::Function(_) | Type::Task(_) => false,
        }
    }

    pub fn is_chan(&self) -> bool {
        matches!(self, Type::Chan(_))
    }

    /// The element type of a channel, or the type itself
    pub fn unwrap_chan(&self) -> &Type {
        match self {
            Type::Chan(elem) => elem,
            other => other,
        }
    }

    /// Declared return type of a function or task
    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Function(f) => f.ret.as_deref(),
            Type::Task(t) => t.ret.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::U8 => write!(f, "u8"),
            Type::U16 => write!(f, "u16"),
            Type::U32 => write!(f, "u32"),
            Type::U64 => write!(f, "u64"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::I32 => write!(f, "i32"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::String => write!(f, "string"),
            Type::TimeStamp => write!(f, "timestamp"),
            Type::TimeSpan => write!(f, "timespan"),
            Type::Series(elem) => write!(f, "series {elem}"),
            Type::Chan(elem) => write!(f, "chan {elem}"),
            Type::Function(func) => {
                write!(f, "func({})", func.params)?;
                if let Some(ret) = &func.ret {
                    write!(f, " {ret}")?;
                }
                Ok(())
            }
            Type::Task(task) => {
                write!(f, "task{{{}}}({})", task.config, task.params)?;
                if let Some(ret) = &task.ret {
                    write!(f, " {ret}")?;
                }
                Ok(())
            }
        }
    }
}

/// Strict compatibility: channels are unwrapped on both sides, then the
/// rendered types must be identical. There is no implicit widening.
pub fn compatible(a: &Type, b: &Type) -> bool {
    a.unwrap_chan().to_string() == b.unwrap_chan().to_string()
}

/// Looser rule for literal initializers: an integer literal may initialize
/// any signed integer, and a float literal any float width.
pub fn literal_compatible(target: &Type, literal: &Type) -> bool {
    target.to_string() == literal.to_string()
        || (target.is_signed_integer() && literal.is_integer())
        || (target.is_float() && literal.is_float())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<Type> {
        let params: Params = [("x", Type::I32)].into_iter().collect();
        vec![
            Type::U8, Type::U16, Type::U32, Type::U64,
            Type::I8, Type::I16, Type::I32, Type::I64,
            Type::F32, Type::F64,
            Type::String, Type::TimeStamp, Type::TimeSpan,
            Type::series(Type::F64),
            Type::chan(Type::I16),
            Type::function(params.clone(), Some(Type::F64)),
            Type::task(params.clone(), Params::new(), None),
        ]
    }

    #[test]
    fn test_compatible_is_reflexive() {
        for ty in all_variants() {
            assert!(compatible(&ty, &ty), "{ty} should be compatible with itself");
        }
    }

    #[test]
    fn test_compatible_unwraps_channels() {
        assert!(compatible(&Type::chan(Type::F64), &Type::F64));
        assert!(compatible(&Type::F64, &Type::chan(Type::F64)));
        assert!(!compatible(&Type::chan(Type::F64), &Type::F32));
    }

    #[test]
    fn test_no_implicit_widening() {
        assert!(!compatible(&Type::I32, &Type::I64));
        assert!(!compatible(&Type::F32, &Type::F64));
        assert!(!compatible(&Type::U8, &Type::I8));
    }

    #[test]
    fn test_literal_compatible() {
        assert!(literal_compatible(&Type::I32, &Type::I64));
        assert!(literal_compatible(&Type::I8, &Type::U32));
        assert!(literal_compatible(&Type::F32, &Type::F64));
        assert!(literal_compatible(&Type::String, &Type::String));
        assert!(!literal_compatible(&Type::I32, &Type::F64));
        assert!(!literal_compatible(&Type::U32, &Type::I64));
        assert!(!literal_compatible(&Type::I32, &Type::String));
    }

    #[test]
    fn test_classification() {
        assert!(Type::U8.is_bool());
        assert!(!Type::I8.is_bool());
        assert!(Type::U64.is_numeric() && Type::F32.is_numeric());
        assert!(!Type::String.is_numeric());
        assert!(!Type::TimeSpan.is_numeric());
        assert!(Type::I16.is_signed_integer() && !Type::U16.is_signed_integer());
        assert!(Type::F64.is_float() && !Type::F64.is_integer());
        assert!(!Type::chan(Type::F64).is_numeric());
        assert!(Type::chan(Type::F64).unwrap_chan().is_numeric());
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::chan(Type::F64).to_string(), "chan f64");
        assert_eq!(Type::series(Type::I32).to_string(), "series i32");
        let params: Params = [("x", Type::F64), ("y", Type::F64)].into_iter().collect();
        assert_eq!(Type::function(params, Some(Type::F64)).to_string(), "func(x f64, y f64) f64");
        let config: Params = [("input", Type::chan(Type::U8))].into_iter().collect();
        assert_eq!(Type::task(config, Params::new(), None).to_string(), "task{input chan u8}()");
    }
}
