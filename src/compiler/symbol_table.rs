use rustc_hash::FxHashMap;

/// Where a resolved name lives at run time. The scope decides which load and
/// store instructions the code generator emits for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Free,
    Builtin,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

#[derive(Debug, Default)]
struct Scope {
    store: FxHashMap<String, Symbol>,
    free_symbols: Vec<Symbol>,
    num_definitions: usize,
}

/// Lexical scope tracking for the code generator. A stack of scopes, one per
/// function literal currently being compiled, with the global scope at the
/// bottom.
///
/// Resolving a name that lives in an enclosing function promotes it to a free
/// variable once in every scope between the definition and the use, so each
/// closure on the way captures it from its own immediate parent.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope, reporting how many local slots it used and
    /// which symbols it captured from its parent, in capture order.
    pub fn leave_scope(&mut self) -> (usize, Vec<Symbol>) {
        let scope = self.scopes.pop().expect("cannot leave the global scope");
        (scope.num_definitions, scope.free_symbols)
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn define(&mut self, name: &str) -> Symbol {
        let scope_kind = if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let scope = self.scopes.last_mut().expect("at least the global scope");

        let symbol = Symbol {
            name: name.to_string(),
            scope: scope_kind,
            index: scope.num_definitions,
        };
        scope.store.insert(name.to_string(), symbol.clone());
        scope.num_definitions += 1;
        symbol
    }

    /// Register a host builtin under its pre-assigned index. Builtins live in
    /// the global scope and resolve from anywhere without being captured.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.scopes[0].store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Bind the name of the function literal currently being compiled, so its
    /// body can refer to itself. Consumes no local slot.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
        };
        let scope = self.scopes.last_mut().expect("at least the global scope");
        scope.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.resolve_at(self.scopes.len() - 1, name)
    }

    fn resolve_at(&mut self, level: usize, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.scopes[level].store.get(name) {
            return Some(symbol.clone());
        }
        if level == 0 {
            return None;
        }

        let outer = self.resolve_at(level - 1, name)?;
        match outer.scope {
            // Reachable directly from any frame; no capture needed.
            SymbolScope::Global | SymbolScope::Builtin => Some(outer),
            _ => Some(self.define_free(level, outer)),
        }
    }

    fn define_free(&mut self, level: usize, original: Symbol) -> Symbol {
        let scope = &mut self.scopes[level];
        scope.free_symbols.push(original.clone());

        let symbol = Symbol {
            name: original.name,
            scope: SymbolScope::Free,
            index: scope.free_symbols.len() - 1,
        };
        scope.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }
}
