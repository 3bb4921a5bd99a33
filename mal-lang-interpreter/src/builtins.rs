use std::cmp::Ordering;
use std::rc::Rc;

use mal_lang_core::environment::Environment;
use mal_lang_core::printer::print_str;
use mal_lang_core::value::{Arity, BuiltinFn, EvaluationError, Value};

/// Every primitive bound into the root scope, by name.
pub(crate) const BUILTINS: &[(&str, BuiltinFn)] = &[
    ("+", builtin_add),
    ("-", builtin_subtract),
    ("*", builtin_multiply),
    ("/", builtin_divide),
    ("<", builtin_less),
    ("<=", builtin_less_equal),
    (">", builtin_greater),
    (">=", builtin_greater_equal),
    ("=", builtin_equal),
    ("list", builtin_list),
    ("list?", builtin_is_list),
    ("empty?", builtin_is_empty),
    ("count", builtin_count),
    ("pr-str", builtin_pr_str),
    ("str", builtin_str),
    ("prn", builtin_prn),
    ("println", builtin_println),
];

pub fn register(environment: &mut Environment) {
    for (name, func) in BUILTINS {
        environment.set(Rc::from(*name), Value::builtin(*name, *func));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    fn from_value(function: &str, value: &Rc<Value>) -> Result<Number, EvaluationError> {
        match value.as_ref() {
            Value::Integer(value) => Ok(Number::Integer(*value)),
            Value::Float(value) => Ok(Number::Float(*value)),
            _ => Err(EvaluationError::wrong_type(function, "number", value)),
        }
    }

    fn as_float(self) -> f64 {
        match self {
            Number::Integer(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    fn into_value(self) -> Rc<Value> {
        match self {
            Number::Integer(value) => Value::integer(value),
            Number::Float(value) => Value::float(value),
        }
    }
}

struct Operator {
    name: &'static str,
    integer: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
    rejects_zero: bool,
}

impl Operator {
    /// Integers stay integers until a float shows up on either side.
    fn combine(&self, left: Number, right: Number) -> Result<Number, EvaluationError> {
        match (left, right) {
            // Float division by zero follows IEEE instead.
            (Number::Integer(_), Number::Integer(0)) if self.rejects_zero => {
                Err(EvaluationError::DivisionByZero(self.name.into()))
            }
            (Number::Integer(left), Number::Integer(right)) => (self.integer)(left, right)
                .map(Number::Integer)
                .ok_or_else(|| EvaluationError::IntegerOverflow(self.name.into())),
            (left, right) => Ok(Number::Float((self.float)(left.as_float(), right.as_float()))),
        }
    }

    fn fold(&self, first: Number, rest: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
        rest.iter()
            .try_fold(first, |accumulator, value| {
                self.combine(accumulator, Number::from_value(self.name, value)?)
            })
            .map(Number::into_value)
    }
}

const ADD: Operator = Operator {
    name: "+",
    integer: i64::checked_add,
    float: |left, right| left + right,
    rejects_zero: false,
};

const SUBTRACT: Operator = Operator {
    name: "-",
    integer: i64::checked_sub,
    float: |left, right| left - right,
    rejects_zero: false,
};

const MULTIPLY: Operator = Operator {
    name: "*",
    integer: i64::checked_mul,
    float: |left, right| left * right,
    rejects_zero: false,
};

const DIVIDE: Operator = Operator {
    name: "/",
    integer: i64::checked_div,
    float: |left, right| left / right,
    rejects_zero: true,
};

fn builtin_add(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    ADD.fold(Number::Integer(0), args)
}

fn builtin_multiply(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    MULTIPLY.fold(Number::Integer(1), args)
}

fn builtin_subtract(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    match args {
        [] => Err(EvaluationError::wrong_count("-", Arity::AtLeast(1), 0)),
        [only] => SUBTRACT.fold(Number::Integer(0), std::slice::from_ref(only)),
        [first, rest @ ..] => SUBTRACT.fold(Number::from_value("-", first)?, rest),
    }
}

fn builtin_divide(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    match args {
        [] => Err(EvaluationError::wrong_count("/", Arity::AtLeast(1), 0)),
        [only] => DIVIDE.fold(Number::Integer(1), std::slice::from_ref(only)),
        [first, rest @ ..] => DIVIDE.fold(Number::from_value("/", first)?, rest),
    }
}

fn exactly<'a, const N: usize>(
    function: &str,
    args: &'a [Rc<Value>],
) -> Result<&'a [Rc<Value>; N], EvaluationError> {
    args.try_into()
        .map_err(|_| EvaluationError::wrong_count(function, Arity::Exactly(N), args.len()))
}

/// Mixed kinds are compared as floats.
fn compare(function: &str, args: &[Rc<Value>]) -> Result<Option<Ordering>, EvaluationError> {
    let [left, right] = exactly::<2>(function, args)?;
    let ordering = match (
        Number::from_value(function, left)?,
        Number::from_value(function, right)?,
    ) {
        (Number::Integer(left), Number::Integer(right)) => Some(left.cmp(&right)),
        (left, right) => left.as_float().partial_cmp(&right.as_float()),
    };
    Ok(ordering)
}

fn builtin_less(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let ordering = compare("<", args)?;
    Ok(Value::boolean(ordering.is_some_and(Ordering::is_lt)))
}

fn builtin_less_equal(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let ordering = compare("<=", args)?;
    Ok(Value::boolean(ordering.is_some_and(Ordering::is_le)))
}

fn builtin_greater(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let ordering = compare(">", args)?;
    Ok(Value::boolean(ordering.is_some_and(Ordering::is_gt)))
}

fn builtin_greater_equal(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let ordering = compare(">=", args)?;
    Ok(Value::boolean(ordering.is_some_and(Ordering::is_ge)))
}

fn builtin_equal(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let [left, right] = exactly::<2>("=", args)?;
    Ok(Value::boolean(left == right))
}

fn builtin_list(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    Ok(Value::list(args.to_vec()))
}

fn builtin_is_list(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let [value] = exactly::<1>("list?", args)?;
    Ok(Value::boolean(matches!(value.as_ref(), Value::List(_))))
}

fn builtin_is_empty(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let [value] = exactly::<1>("empty?", args)?;
    match value.as_sequence() {
        Some(children) => Ok(Value::boolean(children.is_empty())),
        None => Err(EvaluationError::wrong_type("empty?", "list or vector", value)),
    }
}

fn builtin_count(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    let [value] = exactly::<1>("count", args)?;
    match value.as_ref() {
        Value::Nil => Ok(Value::integer(0)),
        Value::List(children) | Value::Vector(children) => {
            Ok(Value::integer(children.len() as i64))
        }
        _ => Err(EvaluationError::wrong_type("count", "list or vector", value)),
    }
}

fn join(args: &[Rc<Value>], print_readably: bool, separator: &str) -> String {
    args.iter()
        .map(|value| print_str(value, print_readably))
        .collect::<Vec<_>>()
        .join(separator)
}

fn builtin_pr_str(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    Ok(Value::string(join(args, true, " ")))
}

fn builtin_str(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    Ok(Value::string(join(args, false, "")))
}

fn builtin_prn(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    println!("{}", join(args, true, " "));
    Ok(Value::nil())
}

fn builtin_println(args: &[Rc<Value>]) -> Result<Rc<Value>, EvaluationError> {
    println!("{}", join(args, false, " "));
    Ok(Value::nil())
}
