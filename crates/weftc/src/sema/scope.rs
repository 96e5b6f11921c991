//! Scope tree and symbol table
//!
//! Scopes live in an arena and refer to each other by `ScopeId`. Every
//! declaration (variable, parameter, function, task, block) is a scope node
//! carrying at most one symbol. The language forbids shadowing, so adding a
//! name checks the whole visible chain, including the global resolver.

use crate::common::Span;
use crate::types::Type;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Index of a scope inside its `ScopeTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    StatefulVariable,
    Param,
    Function,
    Task,
    Channel,
    ConfigParam,
    /// Anonymous lexical block
    Block,
}

impl SymbolKind {
    /// Kinds that occupy a runtime slot in their function or task
    pub fn takes_slot(self) -> bool {
        matches!(
            self,
            SymbolKind::Variable
                | SymbolKind::StatefulVariable
                | SymbolKind::Param
                | SymbolKind::ConfigParam
                | SymbolKind::Channel
        )
    }

    /// Kinds whose scope restarts slot numbering
    pub fn owns_slots(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Task)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Variable => "var",
            SymbolKind::StatefulVariable => "stateful",
            SymbolKind::Param => "param",
            SymbolKind::Function => "func",
            SymbolKind::Task => "task",
            SymbolKind::Channel => "chan",
            SymbolKind::ConfigParam => "config",
            SymbolKind::Block => "block",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Option<Type>,
    /// Declaration site; `None` for symbols supplied by a resolver
    pub span: Option<Span>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: Some(ty),
            span: None,
        }
    }

    pub fn block(span: Span) -> Self {
        Self {
            name: String::new(),
            kind: SymbolKind::Block,
            ty: None,
            span: Some(span),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    fn position(&self) -> (usize, usize) {
        self.span.map_or((0, 0), |s| (s.line, s.column))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("name {name} conflicts with existing symbol at line {line}, col {column}")]
    Conflict {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("undefined symbol: {0}")]
    Undefined(String),
}

/// External source of names (hardware channels, host tasks) consulted
/// after the local scope chain is exhausted
pub trait GlobalResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Symbol>;
}

/// Resolver backed by an ordered map
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    symbols: IndexMap<String, Symbol>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn with(mut self, name: impl Into<String>, kind: SymbolKind, ty: Type) -> Self {
        self.insert(Symbol::new(name, kind, ty));
        self
    }
}

impl GlobalResolver for MapResolver {
    fn resolve(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub symbol: Option<Symbol>,
    /// Slot number within the enclosing function or task
    pub id: usize,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Next free slot; present only on function and task scopes
    counter: Option<usize>,
}

impl Scope {
    pub fn name(&self) -> Option<&str> {
        self.symbol.as_ref().map(|s| s.name.as_str())
    }

    pub fn kind(&self) -> Option<SymbolKind> {
        self.symbol.as_ref().map(|s| s.kind)
    }

    pub fn ty(&self) -> Option<&Type> {
        self.symbol.as_ref().and_then(|s| s.ty.as_ref())
    }
}

/// Arena of scopes rooted at `ScopeTree::root()`
pub struct ScopeTree {
    scopes: Vec<Scope>,
    resolver: Option<Arc<dyn GlobalResolver>>,
}

impl ScopeTree {
    pub fn new(resolver: Option<Arc<dyn GlobalResolver>>) -> Self {
        Self {
            scopes: vec![Scope {
                symbol: None,
                id: 0,
                parent: None,
                children: Vec::new(),
                counter: None,
            }],
            resolver,
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn symbol(&self, id: ScopeId) -> Option<&Symbol> {
        self.scopes[id.0].symbol.as_ref()
    }

    pub fn symbol_mut(&mut self, id: ScopeId) -> Option<&mut Symbol> {
        self.scopes[id.0].symbol.as_mut()
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.0].parent
    }

    pub fn children(&self, id: ScopeId) -> &[ScopeId] {
        &self.scopes[id.0].children
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Declare `symbol` as a new child of `parent`
    pub fn add(&mut self, parent: ScopeId, symbol: Symbol) -> Result<ScopeId, ScopeError> {
        if symbol.kind != SymbolKind::Block {
            if let Ok(existing) = self.resolve(parent, &symbol.name) {
                let (line, column) = existing.position();
                return Err(ScopeError::Conflict {
                    name: symbol.name,
                    line,
                    column,
                });
            }
        }

        let id = if symbol.kind.takes_slot() {
            self.next_slot(parent)
        } else {
            0
        };
        let counter = symbol.kind.owns_slots().then_some(0);

        let child = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            symbol: Some(symbol),
            id,
            parent: Some(parent),
            children: Vec::new(),
            counter,
        });
        self.scopes[parent.0].children.push(child);
        Ok(child)
    }

    fn next_slot(&mut self, from: ScopeId) -> usize {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(counter) = self.scopes[id.0].counter.as_mut() {
                let slot = *counter;
                *counter += 1;
                return slot;
            }
            current = self.scopes[id.0].parent;
        }
        0
    }

    fn child_named(&self, parent: ScopeId, name: &str) -> Option<ScopeId> {
        self.scopes[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.scopes[child.0].name() == Some(name))
    }

    /// Find a declaration visible from `from` in this tree, ignoring the
    /// global resolver
    pub fn find(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            if let Some(found) = self.child_named(id, name) {
                return Some(found);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Resolve a name visible from `from`: own children, then each ancestor's
    /// children, then the global resolver
    pub fn resolve(&self, from: ScopeId, name: &str) -> Result<Cow<'_, Symbol>, ScopeError> {
        if let Some(id) = self.find(from, name) {
            if let Some(symbol) = self.symbol(id) {
                return Ok(Cow::Borrowed(symbol));
            }
        }

        self.resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve(name))
            .map(Cow::Owned)
            .ok_or_else(|| ScopeError::Undefined(name.to_string()))
    }

    /// Nearest scope, starting at `from` itself, whose symbol has `kind`
    pub fn closest_ancestor_of_kind(&self, from: ScopeId, kind: SymbolKind) -> Option<ScopeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            if self.scopes[id.0].kind() == Some(kind) {
                return Some(id);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    pub fn children_of_kind(&self, parent: ScopeId, kind: SymbolKind) -> impl Iterator<Item = ScopeId> + '_ {
        self.scopes[parent.0]
            .children
            .iter()
            .copied()
            .filter(move |child| self.scopes[child.0].kind() == Some(kind))
    }

    pub fn first_child_of_kind(&self, parent: ScopeId, kind: SymbolKind) -> Option<ScopeId> {
        self.children_of_kind(parent, kind).next()
    }

    /// Indented listing of the tree for debugging
    pub fn dump(&self) -> String {
        let mut output = String::new();
        self.dump_scope(self.root(), 0, &mut output);
        output
    }

    fn dump_scope(&self, id: ScopeId, depth: usize, output: &mut String) {
        let scope = &self.scopes[id.0];
        let indent = "  ".repeat(depth);
        match &scope.symbol {
            None => output.push_str("<root>\n"),
            Some(symbol) if symbol.kind == SymbolKind::Block => {
                output.push_str(&format!("{indent}block\n"));
            }
            Some(symbol) => {
                let ty = symbol.ty.as_ref().map(ToString::to_string).unwrap_or_default();
                output.push_str(&format!(
                    "{indent}{} {} {ty} #{}\n",
                    symbol.kind, symbol.name, scope.id
                ));
            }
        }
        for child in &scope.children {
            self.dump_scope(*child, depth + 1, output);
        }
    }
}

impl fmt::Debug for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeTree")
            .field("scopes", &self.scopes)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, column: usize) -> Span {
        Span::new(0, 1).with_position(line, column)
    }

    #[test]
    fn test_add_and_resolve() {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        let func = tree
            .add(root, Symbol::new("f", SymbolKind::Function, Type::function(Default::default(), None)))
            .unwrap();
        let x = tree.add(func, Symbol::new("x", SymbolKind::Param, Type::I32)).unwrap();
        let block = tree.add(func, Symbol::block(at(1, 1))).unwrap();

        let found = tree.resolve(block, "x").unwrap();
        assert_eq!(found.kind, SymbolKind::Param);
        assert_eq!(tree.find(block, "x"), Some(x));
        assert_eq!(tree.find(block, "f"), Some(func));
        assert!(matches!(tree.resolve(block, "y"), Err(ScopeError::Undefined(name)) if name == "y"));
    }

    #[test]
    fn test_conflict_through_ancestors() {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        let func = tree
            .add(root, Symbol::new("f", SymbolKind::Function, Type::function(Default::default(), None)))
            .unwrap();
        let outer = tree.add(func, Symbol::block(at(1, 10))).unwrap();
        tree.add(outer, Symbol::new("x", SymbolKind::Variable, Type::I32).with_span(at(2, 2)))
            .unwrap();
        let inner = tree.add(outer, Symbol::block(at(3, 10))).unwrap();

        let err = tree
            .add(inner, Symbol::new("x", SymbolKind::Variable, Type::I32).with_span(at(4, 3)))
            .unwrap_err();
        assert_eq!(err.to_string(), "name x conflicts with existing symbol at line 2, col 2");
    }

    #[test]
    fn test_sibling_blocks_do_not_conflict() {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        let a = tree.add(root, Symbol::block(at(1, 1))).unwrap();
        let b = tree.add(root, Symbol::block(at(2, 1))).unwrap();
        tree.add(a, Symbol::new("x", SymbolKind::Variable, Type::I32)).unwrap();
        assert!(tree.add(b, Symbol::new("x", SymbolKind::Variable, Type::I32)).is_ok());
    }

    #[test]
    fn test_resolver_conflict_and_lookup() {
        let resolver = MapResolver::new().with("sensor", SymbolKind::Channel, Type::chan(Type::F64));
        let mut tree = ScopeTree::new(Some(Arc::new(resolver)));
        let root = tree.root();

        assert_eq!(tree.resolve(root, "sensor").unwrap().ty, Some(Type::chan(Type::F64)));
        let err = tree
            .add(root, Symbol::new("sensor", SymbolKind::Variable, Type::I32))
            .unwrap_err();
        assert_eq!(err.to_string(), "name sensor conflicts with existing symbol at line 0, col 0");
    }

    #[test]
    fn test_slot_ids_thread_through_blocks() {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        let task = tree
            .add(root, Symbol::new("t", SymbolKind::Task, Type::task(Default::default(), Default::default(), None)))
            .unwrap();
        let c = tree.add(task, Symbol::new("c", SymbolKind::ConfigParam, Type::I32)).unwrap();
        let p = tree.add(task, Symbol::new("p", SymbolKind::Param, Type::I32)).unwrap();
        let body = tree.add(task, Symbol::block(at(1, 1))).unwrap();
        let v = tree.add(body, Symbol::new("v", SymbolKind::Variable, Type::I32)).unwrap();
        let nested = tree.add(body, Symbol::block(at(2, 1))).unwrap();
        let w = tree.add(nested, Symbol::new("w", SymbolKind::StatefulVariable, Type::I32)).unwrap();

        let ids: Vec<usize> = [task, c, p, body, v, nested, w].iter().map(|s| tree.scope(*s).id).collect();
        assert_eq!(ids, vec![0, 0, 1, 0, 2, 0, 3]);

        let other = tree
            .add(root, Symbol::new("g", SymbolKind::Function, Type::function(Default::default(), None)))
            .unwrap();
        let q = tree.add(other, Symbol::new("q", SymbolKind::Param, Type::I32)).unwrap();
        assert_eq!(tree.scope(q).id, 0);
    }

    #[test]
    fn test_closest_ancestor_includes_self() {
        let mut tree = ScopeTree::default();
        let root = tree.root();
        let task = tree
            .add(root, Symbol::new("t", SymbolKind::Task, Type::task(Default::default(), Default::default(), None)))
            .unwrap();
        let body = tree.add(task, Symbol::block(at(1, 1))).unwrap();

        assert_eq!(tree.closest_ancestor_of_kind(body, SymbolKind::Task), Some(task));
        assert_eq!(tree.closest_ancestor_of_kind(task, SymbolKind::Task), Some(task));
        assert_eq!(tree.closest_ancestor_of_kind(body, SymbolKind::Function), None);
        assert_eq!(tree.first_child_of_kind(root, SymbolKind::Task), Some(task));
    }
}
