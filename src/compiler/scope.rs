use std::fmt::Display;

use serde::Serialize;

use crate::{
    collections::{NodeId, Tree},
    error::Diagnostic,
    lexer::Span,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarType {
    Int,
    String,
    Boolean,
}

impl VarType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(VarType::Int),
            "string" => Some(VarType::String),
            "boolean" => Some(VarType::Boolean),
            _ => None,
        }
    }
}

impl Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Int => write!(f, "int"),
            VarType::String => write!(f, "string"),
            VarType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Position of a symbol: the scope it lives in and its declaration index there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId {
    pub scope: NodeId,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub name: String,
    pub ty: VarType,
    pub span: Span,
    pub scope: NodeId,
    pub scope_label: String,
    pub used: bool,
    pub assigned: bool,
}

impl Symbol {
    /// Unique key, e.g. `a@1`.
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.scope)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub id: NodeId,
    pub label: String,
    pub symbols: Vec<Symbol>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.symbols.iter().position(|symbol| symbol.name == name)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Lexical scopes of one program. Scopes are never removed, leaving one only moves the
/// cursor back to the parent so the finished table still holds every symbol.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolTable {
    scopes: Tree<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a child of the current scope and makes it current.
    pub fn enter_scope(&mut self) -> NodeId {
        let id = self.scopes.len();
        let label = match self.scopes.current() {
            Some(parent) => format!("{}>{id}", self.scopes.value(parent).label),
            None => format!(">{id}"),
        };

        self.scopes.descend(Scope {
            id,
            label,
            symbols: vec![],
        })
    }

    pub fn leave_scope(&mut self) {
        self.scopes.ascend();
    }

    pub fn current(&self) -> Option<&Scope> {
        self.scopes.current().map(|id| self.scopes.value(id))
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope(&self, id: NodeId) -> &Scope {
        self.scopes.value(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.scopes.parent(id)
    }

    /// Adds a symbol to the current scope, opening one first if none is open. Returns
    /// `None` if the name is already taken in that scope.
    pub fn declare(&mut self, name: &str, ty: VarType, span: Span) -> Option<SymbolId> {
        let scope = match self.scopes.current() {
            Some(id) => id,
            None => self.enter_scope(),
        };
        let current = self.scopes.value_mut(scope);

        if current.get(name).is_some() {
            return None;
        }

        current.symbols.push(Symbol {
            name: name.to_string(),
            ty,
            span,
            scope,
            scope_label: current.label.clone(),
            used: false,
            assigned: false,
        });

        Some(SymbolId {
            scope,
            index: current.symbols.len() - 1,
        })
    }

    /// Resolves `name` from the current scope outwards.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        let mut node = self.scopes.current();

        while let Some(scope) = node {
            if let Some(index) = self.scopes.value(scope).get(name) {
                return Some(SymbolId { scope, index });
            }

            node = self.scopes.parent(scope);
        }

        None
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.scopes.value(id.scope).symbols[id.index]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.scopes.value_mut(id.scope).symbols[id.index]
    }

    /// Every symbol, scopes in creation order and symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.scopes
            .ids()
            .flat_map(move |id| self.scopes.value(id).symbols.iter())
    }

    /// Warnings for symbols that are read but never assigned or never read at all.
    pub fn check(&self) -> Vec<Diagnostic> {
        let mut diagnostics = vec![];

        for symbol in self.symbols() {
            if symbol.used && !symbol.assigned {
                diagnostics.push(Diagnostic::warning(
                    format!("variable not initialized: {}", symbol.name),
                    symbol.span,
                ));
            }

            if !symbol.used {
                diagnostics.push(Diagnostic::warning(
                    format!("unused variable: {}", symbol.name),
                    symbol.span,
                ));
            }
        }

        diagnostics
    }
}

impl Display for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<6} {:<8} {:>4} {:<10} {:<5} {:<8}",
            "name", "type", "line", "scope", "used", "assigned"
        )?;

        for symbol in self.symbols() {
            writeln!(
                f,
                "{:<6} {:<8} {:>4} {:<10} {:<5} {:<8}",
                symbol.name,
                symbol.ty.to_string(),
                symbol.span.line,
                symbol.scope_label,
                symbol.used,
                symbol.assigned
            )?;
        }

        Ok(())
    }
}
