//! Ordered name -> type maps used for parameter and config lists

use super::Type;
use indexmap::IndexMap;
use std::fmt;

/// Insertion-ordered parameter list with unique keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: IndexMap<String, Type>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Returns `false` (and leaves the map untouched)
    /// when the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, ty: Type) -> bool {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, ty);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.entries.get(name)
    }

    /// Entry at a position, in declaration order
    pub fn at(&self, index: usize) -> Option<(&str, &Type)> {
        self.entries
            .get_index(index)
            .map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.entries.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<N: Into<String>> FromIterator<(N, Type)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, Type)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, ty) in iter {
            params.insert(name, ty);
        }
        params
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, ty)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} {ty}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_and_lookup() {
        let mut params = Params::new();
        assert!(params.insert("setpoint", Type::F64));
        assert!(params.insert("sensor", Type::chan(Type::F64)));
        assert!(params.insert("enable", Type::U8));

        assert_eq!(params.len(), 3);
        assert_eq!(params.at(1), Some(("sensor", &Type::chan(Type::F64))));
        assert_eq!(params.get("enable"), Some(&Type::U8));
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["setpoint", "sensor", "enable"]);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut params = Params::new();
        assert!(params.insert("age", Type::I32));
        assert!(!params.insert("age", Type::F64));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("age"), Some(&Type::I32));
    }

    #[test]
    fn test_display() {
        let params: Params = [("x", Type::I32), ("y", Type::F64)].into_iter().collect();
        assert_eq!(params.to_string(), "x i32, y f64");
    }
}
