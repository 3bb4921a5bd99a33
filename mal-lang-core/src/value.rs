use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::environment::{Environment, VARIADIC_MARKER};

use thiserror::Error;

/// Every run-time value, which is also the syntax tree the reader produces.
#[derive(Debug, Clone)]
pub enum Value {
    List(Vec<Rc<Value>>),
    Vector(Vec<Rc<Value>>),
    /// Keys are the raw key tokens as written, e.g. `:a` or `"a"`.
    Map(HashMap<Rc<str>, Rc<Value>>),
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Nil,
    /// Stored without the leading colon.
    Keyword(Rc<str>),
    Symbol(Rc<str>),
    Builtin(BuiltinFunction),
    Closure(Closure),
    Quote(Rc<Value>),
    Quasiquote(Rc<Value>),
    Unquote(Rc<Value>),
    SpliceUnquote(Rc<Value>),
}

thread_local! {
    static NIL: Rc<Value> = Rc::new(Value::Nil);
    static TRUE: Rc<Value> = Rc::new(Value::Boolean(true));
    static FALSE: Rc<Value> = Rc::new(Value::Boolean(false));
}

impl Value {
    pub fn nil() -> Rc<Value> {
        NIL.with(|x| x.clone())
    }
    pub fn boolean(value: bool) -> Rc<Value> {
        if value {
            TRUE.with(|x| x.clone())
        } else {
            FALSE.with(|x| x.clone())
        }
    }
    pub fn integer(value: i64) -> Rc<Value> {
        Rc::new(Value::Integer(value))
    }
    pub fn float(value: f64) -> Rc<Value> {
        Rc::new(Value::Float(value))
    }
    pub fn string(value: impl Into<String>) -> Rc<Value> {
        Rc::new(Value::String(value.into()))
    }
    pub fn keyword(name: impl Into<Rc<str>>) -> Rc<Value> {
        Rc::new(Value::Keyword(name.into()))
    }
    pub fn symbol(name: impl Into<Rc<str>>) -> Rc<Value> {
        Rc::new(Value::Symbol(name.into()))
    }
    pub fn list(children: Vec<Rc<Value>>) -> Rc<Value> {
        Rc::new(Value::List(children))
    }
    pub fn vector(children: Vec<Rc<Value>>) -> Rc<Value> {
        Rc::new(Value::Vector(children))
    }
    pub fn map(entries: HashMap<Rc<str>, Rc<Value>>) -> Rc<Value> {
        Rc::new(Value::Map(entries))
    }
    pub fn builtin(name: &'static str, func: BuiltinFn) -> Rc<Value> {
        Rc::new(Value::Builtin(BuiltinFunction { name, func }))
    }
    pub fn closure(
        parameters: Rc<[Rc<str>]>,
        body: Rc<Value>,
        environment: Environment,
    ) -> Rc<Value> {
        Rc::new(Value::Closure(Closure {
            parameters,
            body,
            environment,
        }))
    }
    pub fn quote(form: Rc<Value>) -> Rc<Value> {
        Rc::new(Value::Quote(form))
    }
    pub fn quasiquote(form: Rc<Value>) -> Rc<Value> {
        Rc::new(Value::Quasiquote(form))
    }
    pub fn unquote(form: Rc<Value>) -> Rc<Value> {
        Rc::new(Value::Unquote(form))
    }
    pub fn splice_unquote(form: Rc<Value>) -> Rc<Value> {
        Rc::new(Value::SpliceUnquote(form))
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn as_symbol(&self) -> Option<&Rc<str>> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Elements of a list or vector.
    pub fn as_sequence(&self) -> Option<&[Rc<Value>]> {
        match self {
            Value::List(children) | Value::Vector(children) => Some(children),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Nil => "nil",
            Value::Keyword(_) => "keyword",
            Value::Symbol(_) => "symbol",
            Value::Builtin(_) | Value::Closure(_) => "function",
            Value::Quote(_) => "quote",
            Value::Quasiquote(_) => "quasiquote",
            Value::Unquote(_) => "unquote",
            Value::SpliceUnquote(_) => "splice-unquote",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(left) | Value::Vector(left), Value::List(right) | Value::Vector(right)) => {
                left == right
            }
            (Value::Map(left), Value::Map(right)) => left == right,
            // An integer never equals a float, whatever their magnitudes.
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::String(left), Value::String(right)) => left == right,
            (Value::Boolean(left), Value::Boolean(right)) => left == right,
            (Value::Nil, Value::Nil) => true,
            (Value::Keyword(left), Value::Keyword(right)) => left == right,
            (Value::Symbol(left), Value::Symbol(right)) => left == right,
            (Value::Builtin(_) | Value::Closure(_), Value::Builtin(_) | Value::Closure(_)) => true,
            (Value::Quote(left), Value::Quote(right))
            | (Value::Quasiquote(left), Value::Quasiquote(right))
            | (Value::Unquote(left), Value::Unquote(right))
            | (Value::SpliceUnquote(left), Value::SpliceUnquote(right)) => left == right,
            _ => false,
        }
    }
}

pub type BuiltinFn = fn(&[Rc<Value>]) -> Result<Rc<Value>, EvaluationError>;

#[derive(Clone)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl BuiltinFunction {
    pub fn call(&self, arguments: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
        (self.func)(arguments)
    }
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinFunction")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Clone)]
pub struct Closure {
    /// Parameter names as written, `&` marker included.
    pub parameters: Rc<[Rc<str>]>,
    pub body: Rc<Value>,
    pub environment: Environment,
}

impl Closure {
    pub fn arity(&self) -> Arity {
        match self
            .parameters
            .iter()
            .position(|parameter| parameter.as_ref() == VARIADIC_MARKER)
        {
            Some(fixed) => Arity::AtLeast(fixed),
            None => Arity::Exactly(self.parameters.len()),
        }
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(expected) => count == expected,
            Arity::AtLeast(minimum) => count >= minimum,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(expected) => write!(f, "{expected}"),
            Arity::AtLeast(minimum) => write!(f, "at least {minimum}"),
        }
    }
}

#[derive(Debug, PartialEq, Error)]
pub enum EvaluationError {
    #[error("'{0}' not found")]
    SymbolNotFound(Rc<str>),
    #[error("cannot apply {0}: not a function")]
    ApplyNonFunction(Rc<Value>),
    #[error("{function}: expected {expected}, got {got}")]
    WrongArgumentType {
        function: Rc<str>,
        expected: &'static str,
        got: Rc<Value>,
    },
    #[error("{function}: wrong number of arguments. Expected {expected}, got {actual}")]
    WrongArgumentCount {
        function: Rc<str>,
        expected: Arity,
        actual: usize,
    },
    #[error("malformed {form}: {reason}")]
    MalformedSpecialForm {
        form: &'static str,
        reason: Rc<str>,
    },
    #[error("{0}: division by zero")]
    DivisionByZero(Rc<str>),
    #[error("{0}: integer overflow")]
    IntegerOverflow(Rc<str>),
}

impl EvaluationError {
    pub fn malformed(form: &'static str, reason: impl Into<Rc<str>>) -> Self {
        EvaluationError::MalformedSpecialForm {
            form,
            reason: reason.into(),
        }
    }

    pub fn wrong_type(function: &str, expected: &'static str, got: &Rc<Value>) -> Self {
        EvaluationError::WrongArgumentType {
            function: function.into(),
            expected,
            got: got.clone(),
        }
    }

    pub fn wrong_count(function: &str, expected: Arity, actual: usize) -> Self {
        EvaluationError::WrongArgumentCount {
            function: function.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::nil().is_truthy());
        assert!(!Value::boolean(false).is_truthy());
        assert!(Value::boolean(true).is_truthy());
        assert!(Value::integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_sequences_compare_across_kinds() {
        let list = Value::list(vec![Value::integer(1), Value::string("a")]);
        let vector = Value::vector(vec![Value::integer(1), Value::string("a")]);
        assert_eq!(list, vector);
        assert_ne!(list, Value::list(vec![Value::integer(1)]));
        assert_ne!(list, Value::nil());
    }

    #[test]
    fn test_nested_equality() {
        let left = Value::list(vec![Value::vector(vec![Value::keyword("a")]), Value::nil()]);
        let right = Value::vector(vec![Value::list(vec![Value::keyword("a")]), Value::nil()]);
        assert_eq!(left, right);
        assert_ne!(Value::keyword("a"), Value::symbol("a"));
        assert_ne!(Value::keyword("a"), Value::string("a"));
    }

    #[test]
    fn test_map_equality_ignores_insertion_order() {
        let mut first = HashMap::new();
        first.insert(Rc::from(":a"), Value::integer(1));
        first.insert(Rc::from(":b"), Value::integer(2));
        let mut second = HashMap::new();
        second.insert(Rc::from(":b"), Value::integer(2));
        second.insert(Rc::from(":a"), Value::integer(1));
        assert_eq!(Value::map(first.clone()), Value::map(second));

        first.insert(Rc::from(":c"), Value::integer(3));
        let mut third = HashMap::new();
        third.insert(Rc::from(":a"), Value::integer(1));
        third.insert(Rc::from(":b"), Value::integer(2));
        assert_ne!(Value::map(first), Value::map(third));
    }

    #[test]
    fn test_numbers_compare_within_kind() {
        assert_eq!(Value::integer(3), Value::integer(3));
        assert_eq!(Value::float(1.5), Value::float(1.5));
        assert_ne!(Value::integer(3), Value::integer(4));
        assert_ne!(Value::integer(1), Value::float(1.0));
    }

    #[test]
    fn test_functions_are_all_equal() {
        fn identity(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
            Ok(args[0].clone())
        }
        fn other(_: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
            Ok(Value::nil())
        }
        let closure = Value::closure(
            vec![Rc::<str>::from("x")].into(),
            Value::symbol("x"),
            Environment::new(),
        );
        assert_eq!(Value::builtin("identity", identity), Value::builtin("other", other));
        assert_eq!(Value::builtin("identity", identity), closure);
        assert_ne!(closure, Value::nil());
    }

    #[test]
    fn test_closure_arity() {
        let closure = |parameters: &[&str]| Closure {
            parameters: parameters.iter().map(|p| Rc::from(*p)).collect(),
            body: Value::nil(),
            environment: Environment::new(),
        };
        assert_eq!(closure(&[]).arity(), Arity::Exactly(0));
        assert_eq!(closure(&["a", "b"]).arity(), Arity::Exactly(2));
        assert_eq!(closure(&["a", "&", "rest"]).arity(), Arity::AtLeast(1));
        assert_eq!(closure(&["&", "rest"]).arity(), Arity::AtLeast(0));
        assert!(Arity::AtLeast(1).accepts(3));
        assert!(!Arity::Exactly(2).accepts(3));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EvaluationError::SymbolNotFound("abc".into()).to_string(),
            "'abc' not found"
        );
        assert_eq!(
            EvaluationError::wrong_count("count", Arity::Exactly(1), 2).to_string(),
            "count: wrong number of arguments. Expected 1, got 2"
        );
        assert_eq!(
            EvaluationError::wrong_type("+", "number", &Value::string("a")).to_string(),
            "+: expected number, got \"a\""
        );
    }
}
