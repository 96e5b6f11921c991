//! The closed value-type system of the language

mod params;
mod value_type;

pub use params::Params;
pub use value_type::{ChannelSet, FunctionType, TaskType, Type, compatible, literal_compatible};
