pub mod builtins;
pub mod evaluator;

use std::rc::Rc;

use mal_lang_core::environment::Environment;
use mal_lang_core::parser::{self, ParseError};
use mal_lang_core::printer::print_str;
use mal_lang_core::value::{EvaluationError, Value};

use thiserror::Error;

/// Definitions written in the language itself, evaluated into every root scope.
const PRELUDE: &str = "(def! not (fn* (a) (if a false true)))";

#[derive(Debug, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvaluationError),
}

/// Coarse classification of an [`Error`], one per failure category.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    Lex,
    Parse,
    Lookup,
    Type,
    Arity,
    Syntax,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Read(error) if error.is_lexical() => ErrorKind::Lex,
            Error::Read(_) => ErrorKind::Parse,
            Error::Eval(EvaluationError::SymbolNotFound(_)) => ErrorKind::Lookup,
            Error::Eval(
                EvaluationError::ApplyNonFunction(_)
                | EvaluationError::WrongArgumentType { .. }
                | EvaluationError::DivisionByZero(_)
                | EvaluationError::IntegerOverflow(_),
            ) => ErrorKind::Type,
            Error::Eval(EvaluationError::WrongArgumentCount { .. }) => ErrorKind::Arity,
            Error::Eval(EvaluationError::MalformedSpecialForm { .. }) => ErrorKind::Syntax,
        }
    }
}

/// A fresh root scope holding the builtins and the prelude.
pub fn root_environment() -> Result<Environment, Error> {
    let mut environment = Environment::new();
    builtins::register(&mut environment);
    eval_str(PRELUDE, &mut environment)?;
    Ok(environment)
}

/// Reads the first form of `input` and evaluates it. Blank input yields `None`.
pub fn read_eval(input: &str, environment: &mut Environment) -> Result<Option<Rc<Value>>, Error> {
    let Some(ast) = parser::read_str(input)? else {
        return Ok(None);
    };
    Ok(Some(evaluator::eval(&ast, environment)?))
}

/// One read-eval-print step: the readable rendering of the first form's value.
pub fn rep(input: &str, environment: &mut Environment) -> Result<Option<String>, Error> {
    let output = read_eval(input, environment)?;
    Ok(output.map(|value| print_str(&value, true)))
}

/// Evaluates every form of `input` in order, stopping at the first error.
pub fn eval_str(input: &str, environment: &mut Environment) -> Result<Rc<Value>, Error> {
    let forms = parser::read_all(input)?;
    Ok(evaluator::eval_program(&forms, environment)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rep_session() {
        let mut environment = root_environment().unwrap();
        let session = vec![
            ("(def! x 5)", Ok(Some("5".to_owned()))),
            ("   ", Ok(None)),
            ("; only a comment", Ok(None)),
            ("(+ x 1)", Ok(Some("6".to_owned()))),
            ("\"a\\nb\"", Ok(Some("\"a\\nb\"".to_owned()))),
            ("[1 2.0 :k nil]", Ok(Some("[1 2.0 :k nil]".to_owned()))),
            ("(fn* (a) a)", Ok(Some("#<function>".to_owned()))),
            ("+", Ok(Some("#<builtin +>".to_owned()))),
            (
                "(undefined)",
                Err(Error::Eval(EvaluationError::SymbolNotFound("undefined".into()))),
            ),
            // The scope survives the failed line.
            ("x", Ok(Some("5".to_owned()))),
            ("1 2", Ok(Some("1".to_owned()))),
        ];

        for (input, expected) in session {
            assert_eq!(rep(input, &mut environment), expected, "input: {input}");
        }
    }

    #[test]
    fn test_prelude() {
        let tests = vec![
            ("(not true)", "false"),
            ("(not nil)", "true"),
            ("(not 0)", "false"),
            ("(not (= 1 2))", "true"),
        ];

        let mut environment = root_environment().unwrap();
        for (input, expected) in tests {
            assert_eq!(rep(input, &mut environment), Ok(Some(expected.to_owned())));
        }
    }

    #[test]
    fn test_error_kinds() {
        let tests = vec![
            ("\"abc", ErrorKind::Lex),
            ("(1 2", ErrorKind::Parse),
            (")", ErrorKind::Parse),
            ("1abc", ErrorKind::Parse),
            ("nope", ErrorKind::Lookup),
            ("(1 2)", ErrorKind::Type),
            ("(+ 1 \"a\")", ErrorKind::Type),
            ("(/ 1 0)", ErrorKind::Type),
            ("((fn* (a) a))", ErrorKind::Arity),
            ("(count)", ErrorKind::Arity),
            ("(let* (a) a)", ErrorKind::Syntax),
            ("(if)", ErrorKind::Syntax),
        ];

        for (input, expected) in tests {
            let mut environment = root_environment().unwrap();
            match eval_str(input, &mut environment) {
                Err(error) => assert_eq!(error.kind(), expected, "input: {input}"),
                Ok(value) => panic!("expected an error for {input}, got {value}"),
            }
        }
    }

    #[test]
    fn test_error_messages() {
        let tests = vec![
            ("(1 2", "unbalanced: expected ')', got end of input"),
            ("nope", "'nope' not found"),
            ("(/ 1 0)", "/: division by zero"),
            ("(if)", "malformed if: expected a condition, a branch and an optional else branch"),
        ];

        for (input, expected) in tests {
            let mut environment = root_environment().unwrap();
            let error = eval_str(input, &mut environment).unwrap_err();
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_eval_str_stops_at_first_error() {
        let mut environment = root_environment().unwrap();
        let result = eval_str("(def! a 1) (undefined) (def! b 2)", &mut environment);
        assert_eq!(
            result,
            Err(Error::Eval(EvaluationError::SymbolNotFound("undefined".into())))
        );
        assert_eq!(environment.get("a"), Some(Value::integer(1)));
        assert_eq!(environment.get("b"), None);
        assert_eq!(eval_str("", &mut environment), Ok(Value::nil()));
    }
}
