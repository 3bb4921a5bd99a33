use std::collections::HashMap;
use std::rc::Rc;

use mal_lang_core::environment::{Environment, VARIADIC_MARKER};
use mal_lang_core::value::{Closure, EvaluationError, Value};
use tracing::{debug, trace};

/// List heads that are evaluated by their own rule instead of by application.
/// They take precedence over any binding of the same name.
#[derive(Debug, PartialEq, Clone, Copy)]
enum SpecialForm {
    Def,
    Let,
    Do,
    If,
    Fn,
    Quote,
    Quasiquote,
}

impl SpecialForm {
    fn from_symbol(name: &str) -> Option<SpecialForm> {
        match name {
            "def!" => Some(SpecialForm::Def),
            "let*" => Some(SpecialForm::Let),
            "do" => Some(SpecialForm::Do),
            "if" => Some(SpecialForm::If),
            "fn*" => Some(SpecialForm::Fn),
            "quote" => Some(SpecialForm::Quote),
            "quasiquote" => Some(SpecialForm::Quasiquote),
            _ => None,
        }
    }
}

/// Evaluates every form in order and returns the last result, or `nil` when
/// there are no forms.
pub fn eval_program(
    forms: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    let mut output = Value::nil();
    for form in forms {
        output = eval(form, environment)?;
    }
    Ok(output)
}

pub fn eval(ast: &Rc<Value>, environment: &mut Environment) -> Result<Rc<Value>, EvaluationError> {
    trace!(form = %ast, "eval");
    match ast.as_ref() {
        Value::Symbol(name) => environment.lookup(name),
        Value::Vector(children) => Ok(Value::vector(eval_all(children, environment)?)),
        Value::Map(entries) => {
            let mut evaluated = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                evaluated.insert(key.clone(), eval(value, environment)?);
            }
            Ok(Value::map(evaluated))
        }
        Value::List(children) => match children.split_first() {
            None => Ok(ast.clone()),
            Some((head, arguments)) => eval_list(head, arguments, environment),
        },
        Value::Quote(form) => Ok(form.clone()),
        Value::Quasiquote(form) => quasiquote(form, environment),
        Value::Unquote(_) | Value::SpliceUnquote(_) => Err(EvaluationError::malformed(
            ast.type_name(),
            "used outside of quasiquote",
        )),
        Value::Integer(_)
        | Value::Float(_)
        | Value::String(_)
        | Value::Boolean(_)
        | Value::Nil
        | Value::Keyword(_)
        | Value::Builtin(_)
        | Value::Closure(_) => Ok(ast.clone()),
    }
}

fn eval_all(
    forms: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Vec<Rc<Value>>, EvaluationError> {
    forms.iter().map(|form| eval(form, environment)).collect()
}

fn eval_list(
    head: &Rc<Value>,
    arguments: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    if let Some(form) = head.as_symbol().and_then(|name| SpecialForm::from_symbol(name)) {
        return match form {
            SpecialForm::Def => eval_def(arguments, environment),
            SpecialForm::Let => eval_let(arguments, environment),
            SpecialForm::Do => eval_do(arguments, environment),
            SpecialForm::If => eval_if(arguments, environment),
            SpecialForm::Fn => eval_fn(arguments, environment),
            SpecialForm::Quote => match arguments {
                [form] => Ok(form.clone()),
                _ => Err(EvaluationError::malformed("quote", "expected exactly one form")),
            },
            SpecialForm::Quasiquote => match arguments {
                [form] => quasiquote(form, environment),
                _ => Err(EvaluationError::malformed(
                    "quasiquote",
                    "expected exactly one form",
                )),
            },
        };
    }

    let function = eval(head, environment)?;
    let arguments = eval_all(arguments, environment)?;
    apply(&function, arguments)
}

/// Calls `function` with already evaluated `arguments`.
pub fn apply(
    function: &Rc<Value>,
    arguments: Vec<Rc<Value>>,
) -> Result<Rc<Value>, EvaluationError> {
    match function.as_ref() {
        Value::Builtin(builtin) => builtin.call(&arguments),
        Value::Closure(closure) => apply_closure(closure, arguments),
        _ => Err(EvaluationError::ApplyNonFunction(function.clone())),
    }
}

fn apply_closure(
    closure: &Closure,
    arguments: Vec<Rc<Value>>,
) -> Result<Rc<Value>, EvaluationError> {
    let arity = closure.arity();
    if !arity.accepts(arguments.len()) {
        return Err(EvaluationError::wrong_count(
            "#<function>",
            arity,
            arguments.len(),
        ));
    }
    debug!(parameters = ?closure.parameters, arguments = arguments.len(), "applying closure");

    // The new scope hangs off the scope the closure was created in, not the
    // caller's.
    let mut environment = Environment::with_bindings(
        closure.environment.clone(),
        &closure.parameters,
        arguments,
    );
    eval(&closure.body, &mut environment)
}

fn eval_def(
    arguments: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    let [name, value] = arguments else {
        return Err(EvaluationError::malformed(
            "def!",
            "expected a symbol and a value",
        ));
    };
    let Some(name) = name.as_symbol() else {
        return Err(EvaluationError::malformed(
            "def!",
            format!("cannot bind to {name}"),
        ));
    };
    let value = eval(value, environment)?;
    debug!(symbol = %name, value = %value, "def!");
    environment.set(name.clone(), value.clone());
    Ok(value)
}

fn eval_let(
    arguments: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    let [bindings, body] = arguments else {
        return Err(EvaluationError::malformed(
            "let*",
            "expected a binding list and a body",
        ));
    };
    let Some(bindings) = bindings.as_sequence() else {
        return Err(EvaluationError::malformed(
            "let*",
            format!("binding list must be a list, got {bindings}"),
        ));
    };
    if bindings.len() % 2 != 0 {
        return Err(EvaluationError::malformed(
            "let*",
            "binding list has an odd number of forms",
        ));
    }

    let mut scope = Environment::new_enclosed(environment.clone());
    for pair in bindings.chunks_exact(2) {
        let Some(name) = pair[0].as_symbol() else {
            return Err(EvaluationError::malformed(
                "let*",
                format!("cannot bind to {}", pair[0]),
            ));
        };
        let value = eval(&pair[1], &mut scope)?;
        scope.set(name.clone(), value);
    }
    eval(body, &mut scope)
}

fn eval_do(
    arguments: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    let Some((last, leading)) = arguments.split_last() else {
        return Err(EvaluationError::malformed(
            "do",
            "expected at least one expression",
        ));
    };
    for expression in leading {
        eval(expression, environment)?;
    }
    eval(last, environment)
}

fn eval_if(
    arguments: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    let (condition, consequence, alternative) = match arguments {
        [condition, consequence] => (condition, consequence, None),
        [condition, consequence, alternative] => (condition, consequence, Some(alternative)),
        _ => {
            return Err(EvaluationError::malformed(
                "if",
                "expected a condition, a branch and an optional else branch",
            ))
        }
    };

    if eval(condition, environment)?.is_truthy() {
        eval(consequence, environment)
    } else if let Some(alternative) = alternative {
        eval(alternative, environment)
    } else {
        Ok(Value::nil())
    }
}

fn eval_fn(
    arguments: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    let [parameters, body] = arguments else {
        return Err(EvaluationError::malformed(
            "fn*",
            "expected a parameter list and a body",
        ));
    };
    let Some(parameters) = parameters.as_sequence() else {
        return Err(EvaluationError::malformed(
            "fn*",
            format!("parameter list must be a list, got {parameters}"),
        ));
    };
    let names = parameters
        .iter()
        .map(|parameter| {
            parameter.as_symbol().cloned().ok_or_else(|| {
                EvaluationError::malformed("fn*", format!("parameter {parameter} is not a symbol"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(marker) = names.iter().position(|name| name.as_ref() == VARIADIC_MARKER) {
        if marker + 1 == names.len() {
            return Err(EvaluationError::malformed(
                "fn*",
                "'&' must be followed by a parameter name",
            ));
        }
    }

    Ok(Value::closure(names.into(), body.clone(), environment.clone()))
}

fn quasiquote(
    form: &Rc<Value>,
    environment: &mut Environment,
) -> Result<Rc<Value>, EvaluationError> {
    if let Some(expression) = unwrap_marker(form, "unquote") {
        return eval(expression, environment);
    }
    match form.as_ref() {
        Value::List(children) => Ok(Value::list(quasiquote_elements(children, environment)?)),
        Value::Vector(children) => Ok(Value::vector(quasiquote_elements(children, environment)?)),
        Value::Quote(inner) => Ok(Value::quote(quasiquote(inner, environment)?)),
        Value::Quasiquote(inner) => Ok(Value::quasiquote(quasiquote(inner, environment)?)),
        Value::SpliceUnquote(_) => Err(EvaluationError::malformed(
            "splice-unquote",
            "must appear inside a list or vector",
        )),
        _ => Ok(form.clone()),
    }
}

fn quasiquote_elements(
    children: &[Rc<Value>],
    environment: &mut Environment,
) -> Result<Vec<Rc<Value>>, EvaluationError> {
    let mut elements = Vec::with_capacity(children.len());
    for child in children {
        let Some(expression) = unwrap_marker(child, "splice-unquote") else {
            elements.push(quasiquote(child, environment)?);
            continue;
        };
        let spliced = eval(expression, environment)?;
        let Some(items) = spliced.as_sequence() else {
            return Err(EvaluationError::wrong_type(
                "splice-unquote",
                "list or vector",
                &spliced,
            ));
        };
        elements.extend(items.iter().cloned());
    }
    Ok(elements)
}

/// The operand of `~x` / `(unquote x)` or `~@x` / `(splice-unquote x)`.
fn unwrap_marker<'a>(form: &'a Value, marker: &str) -> Option<&'a Rc<Value>> {
    match (form, marker) {
        (Value::Unquote(expression), "unquote")
        | (Value::SpliceUnquote(expression), "splice-unquote") => Some(expression),
        (Value::List(children), _) => match children.as_slice() {
            [head, expression] if head.as_symbol().is_some_and(|name| name.as_ref() == marker) => {
                Some(expression)
            }
            _ => None,
        },
        _ => None,
    }
}
