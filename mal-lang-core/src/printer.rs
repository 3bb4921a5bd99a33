use std::fmt;

use crate::value::Value;

/// Renders `value` as text. With `print_readably` set, strings are quoted and
/// escaped so the output reads back into an equal value; otherwise they are
/// emitted raw.
pub fn print_str(value: &Value, print_readably: bool) -> String {
    let mut output = String::new();
    write_value(&mut output, value, print_readably);
    output
}

fn write_value(output: &mut String, value: &Value, print_readably: bool) {
    match value {
        Value::List(children) => write_sequence(output, children, ('(', ')'), print_readably),
        Value::Vector(children) => write_sequence(output, children, ('[', ']'), print_readably),
        Value::Map(entries) => {
            output.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    output.push(' ');
                }
                output.push_str(key);
                output.push(' ');
                write_value(output, value, print_readably);
            }
            output.push('}');
        }
        Value::Integer(value) => output.push_str(&value.to_string()),
        Value::Float(value) => output.push_str(&format_float(*value)),
        Value::String(value) if print_readably => write_escaped(output, value),
        Value::String(value) => output.push_str(value),
        Value::Boolean(value) => output.push_str(if *value { "true" } else { "false" }),
        Value::Nil => output.push_str("nil"),
        Value::Keyword(name) => {
            output.push(':');
            output.push_str(name);
        }
        Value::Symbol(name) => output.push_str(name),
        Value::Builtin(builtin) => {
            output.push_str("#<builtin ");
            output.push_str(builtin.name);
            output.push('>');
        }
        Value::Closure(_) => output.push_str("#<function>"),
        Value::Quote(form) => write_wrapped(output, "quote", form, print_readably),
        Value::Quasiquote(form) => write_wrapped(output, "quasiquote", form, print_readably),
        Value::Unquote(form) => write_wrapped(output, "unquote", form, print_readably),
        Value::SpliceUnquote(form) => {
            write_wrapped(output, "splice-unquote", form, print_readably)
        }
    }
}

fn write_sequence(
    output: &mut String,
    children: &[std::rc::Rc<Value>],
    (open, close): (char, char),
    print_readably: bool,
) {
    output.push(open);
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        write_value(output, child, print_readably);
    }
    output.push(close);
}

fn write_wrapped(output: &mut String, name: &str, form: &Value, print_readably: bool) {
    output.push('(');
    output.push_str(name);
    output.push(' ');
    write_value(output, form, print_readably);
    output.push(')');
}

fn write_escaped(output: &mut String, value: &str) {
    output.push('"');
    for ch in value.chars() {
        match ch {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            _ => output.push(ch),
        }
    }
    output.push('"');
}

/// Whole floats keep a `.0` so they read back as floats.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print_str(self, true))
    }
}
