use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::{EvaluationError, Value};

/// Parameter that collects every remaining argument into the parameter after it.
pub const VARIADIC_MARKER: &str = "&";

struct EnvironmentCore {
    store: HashMap<Rc<str>, Rc<Value>>,
    outer: Option<Environment>,
}

/// Shared handle to one scope. Clones refer to the same scope; a scope lives as
/// long as some handle (an inner scope, a closure, the caller) still holds it.
#[derive(Clone)]
pub struct Environment {
    environment: Rc<RefCell<EnvironmentCore>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            environment: Rc::new(RefCell::new(EnvironmentCore {
                store: HashMap::new(),
                outer: None,
            })),
        }
    }

    pub fn new_enclosed(outer: Environment) -> Environment {
        Environment {
            environment: Rc::new(RefCell::new(EnvironmentCore {
                store: HashMap::new(),
                outer: Some(outer),
            })),
        }
    }

    /// Pairs `parameters` with `arguments` by position in a new scope enclosed
    /// by `outer`. A `&` parameter binds the name after it to a list of all the
    /// remaining arguments and ends the binding. Arity is the caller's concern.
    pub fn with_bindings(
        outer: Environment,
        parameters: &[Rc<str>],
        arguments: Vec<Rc<Value>>,
    ) -> Environment {
        let mut environment = Environment::new_enclosed(outer);
        let mut arguments = arguments.into_iter();
        let mut parameters = parameters.iter();

        while let Some(parameter) = parameters.next() {
            if parameter.as_ref() == VARIADIC_MARKER {
                if let Some(rest) = parameters.next() {
                    environment.set(rest.clone(), Value::list(arguments.collect()));
                }
                break;
            }
            let Some(argument) = arguments.next() else {
                break;
            };
            environment.set(parameter.clone(), argument);
        }
        environment
    }

    pub fn get(&self, key: &str) -> Option<Rc<Value>> {
        let env = self.environment.borrow();
        match env.store.get(key) {
            Some(value) => Some(value.clone()),
            None => env.outer.as_ref().and_then(|outer| outer.get(key)),
        }
    }

    pub fn lookup(&self, key: &str) -> Result<Rc<Value>, EvaluationError> {
        self.get(key)
            .ok_or_else(|| EvaluationError::SymbolNotFound(key.into()))
    }

    /// Binds in this scope only; outer scopes are never touched.
    pub fn set(&mut self, key: Rc<str>, value: Rc<Value>) {
        self.environment.borrow_mut().store.insert(key, value);
    }

    pub fn outer(&self) -> Option<Environment> {
        self.environment.borrow().outer.clone()
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.environment, &other.environment)
    }

    /// Names bound directly in this scope, sorted.
    pub fn symbols(&self) -> Vec<Rc<str>> {
        let mut symbols: Vec<_> = self.environment.borrow().store.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// Values can hold closures over this very scope, so only names are shown.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("symbols", &self.symbols())
            .field("has_outer", &self.environment.borrow().outer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(names: &[&str]) -> Vec<Rc<str>> {
        names.iter().map(|name| Rc::from(*name)).collect()
    }

    #[test]
    fn test_set_and_get() {
        let mut env = Environment::new();
        env.set("a".into(), Value::integer(1));
        assert_eq!(env.get("a"), Some(Value::integer(1)));
        assert_eq!(env.get("b"), None);

        env.set("a".into(), Value::integer(2));
        assert_eq!(env.get("a"), Some(Value::integer(2)));
    }

    #[test]
    fn test_lookup_walks_outer_scopes() {
        let mut root = Environment::new();
        root.set("a".into(), Value::integer(1));
        let middle = Environment::new_enclosed(root.clone());
        let inner = Environment::new_enclosed(middle);

        assert_eq!(inner.lookup("a"), Ok(Value::integer(1)));
        assert_eq!(
            inner.lookup("missing"),
            Err(EvaluationError::SymbolNotFound("missing".into()))
        );
    }

    #[test]
    fn test_shadowing_leaves_outer_untouched() {
        let mut root = Environment::new();
        root.set("a".into(), Value::integer(1));
        let mut inner = Environment::new_enclosed(root.clone());
        inner.set("a".into(), Value::integer(2));

        assert_eq!(inner.get("a"), Some(Value::integer(2)));
        assert_eq!(root.get("a"), Some(Value::integer(1)));
        assert!(inner.outer().is_some_and(|outer| outer.ptr_eq(&root)));
    }

    #[test]
    fn test_positional_bindings() {
        let env = Environment::with_bindings(
            Environment::new(),
            &names(&["a", "b"]),
            vec![Value::integer(1), Value::integer(2)],
        );
        assert_eq!(env.symbols(), names(&["a", "b"]));
        assert_eq!(env.get("a"), Some(Value::integer(1)));
        assert_eq!(env.get("b"), Some(Value::integer(2)));
    }

    #[test]
    fn test_variadic_bindings() {
        let env = Environment::with_bindings(
            Environment::new(),
            &names(&["a", "&", "rest"]),
            vec![Value::integer(1), Value::integer(2), Value::integer(3)],
        );
        assert_eq!(env.get("a"), Some(Value::integer(1)));
        assert_eq!(
            env.get("rest"),
            Some(Value::list(vec![Value::integer(2), Value::integer(3)]))
        );

        let env = Environment::with_bindings(
            Environment::new(),
            &names(&["a", "&", "rest"]),
            vec![Value::integer(1)],
        );
        assert_eq!(env.get("rest"), Some(Value::list(vec![])));
    }

    #[test]
    fn test_parameters_after_rest_are_unreachable() {
        let env = Environment::with_bindings(
            Environment::new(),
            &names(&["&", "rest", "never"]),
            vec![Value::integer(1)],
        );
        assert_eq!(env.symbols(), names(&["rest"]));
    }

    #[test]
    fn test_captured_scope_lives_as_long_as_the_closure() {
        let root = Environment::new();
        let mut scope = Environment::new_enclosed(root.clone());
        scope.set("x".into(), Value::integer(5));
        let weak = Rc::downgrade(&scope.environment);

        let closure = Value::closure(names(&[]).into(), Value::symbol("x"), scope);
        assert!(weak.upgrade().is_some());

        drop(closure);
        assert!(weak.upgrade().is_none());
        assert_eq!(root.symbols(), names(&[]));
    }
}
