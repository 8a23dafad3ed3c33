use crate::vm::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, mutable binding environment. Lambdas hold on to the environment
/// they were created in, so environments form a chain that is walked outwards
/// on lookup.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    store: FxHashMap<String, Value>,
    outer: Option<Env>,
}

impl Environment {
    pub fn new_env() -> Env {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn enclosed(outer: Env) -> Env {
        Rc::new(RefCell::new(Environment {
            store: FxHashMap::default(),
            outer: Some(outer),
        }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.store.get(name).cloned().or_else(|| {
            self.outer
                .as_ref()
                .and_then(|outer| outer.borrow().get(name))
        })
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.store.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outwards() {
        let outer = Environment::new_env();
        outer.borrow_mut().set("a", Value::Integer(1));
        outer.borrow_mut().set("b", Value::Integer(2));

        let inner = Environment::enclosed(outer);
        inner.borrow_mut().set("b", Value::Integer(20));

        assert_eq!(inner.borrow().get("a"), Some(Value::Integer(1)));
        assert_eq!(inner.borrow().get("b"), Some(Value::Integer(20)));
        assert_eq!(inner.borrow().get("c"), None);
    }

    #[test]
    fn test_inner_definitions_do_not_leak_out() {
        let outer = Environment::new_env();
        let inner = Environment::enclosed(outer.clone());
        inner.borrow_mut().set("x", Value::Integer(1));

        assert_eq!(outer.borrow().get("x"), None);
    }
}
