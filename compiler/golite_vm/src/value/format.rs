//! Go-style rendering of values for `print`, `println` and panics.

use std::fmt::{self, Write as _};

use super::{Complex, Value};

/// Nesting beyond this depth prints as `...`, which bounds self-referencing
/// lists and maps.
const MAX_DEPTH: usize = 32;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

fn write_value(out: &mut dyn fmt::Write, value: &Value, depth: usize) -> fmt::Result {
    if depth > MAX_DEPTH {
        return out.write_str("...");
    }
    match value {
        Value::Nil => out.write_str("<nil>"),
        Value::Bool(b) => write!(out, "{b}"),
        Value::Int(i) => write!(out, "{i}"),
        Value::Uint(u) => write!(out, "{u}"),
        Value::Float(x) => out.write_str(&format_float(*x)),
        Value::Complex(c) => write_complex(out, *c),
        Value::Str(s) => out.write_str(s),
        Value::List(list) => {
            out.write_char('[')?;
            for (i, item) in list.borrow().items.iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write_value(out, item, depth + 1)?;
            }
            out.write_char(']')
        }
        Value::Map(map) => {
            out.write_str("map[")?;
            for (i, (key, value)) in map.borrow().sorted_entries().iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write_value(out, key, depth + 1)?;
                out.write_char(':')?;
                write_value(out, value, depth + 1)?;
            }
            out.write_char(']')
        }
        Value::Struct(s) => {
            out.write_char('{')?;
            for (i, field) in s.fields.iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write_value(out, field, depth + 1)?;
            }
            out.write_char('}')
        }
        Value::Pointer(p) => match p.get() {
            // Only the outermost pointer to a struct shows its contents.
            Ok(target @ Value::Struct(_)) if depth == 0 => {
                out.write_char('&')?;
                write_value(out, &target, depth + 1)
            }
            _ => write!(out, "{:#x}", p.address().0),
        },
        Value::Closure(c) => write!(out, "{:#x}", std::rc::Rc::as_ptr(c) as usize),
        Value::BoundMethod(m) => write!(out, "{:#x}", std::rc::Rc::as_ptr(m) as usize),
        Value::Builtin(b) => write!(out, "<builtin {}>", b.name()),
        Value::Native(n) => write!(out, "<native {}>", n.name()),
        Value::Type(t) => write!(out, "{t}"),
        Value::External(e) => out.write_str(&e.display()),
    }
}

fn write_complex(out: &mut dyn fmt::Write, c: Complex) -> fmt::Result {
    let im = format_float(c.im);
    let sign = if im.starts_with('-') || im.starts_with('+') {
        ""
    } else {
        "+"
    };
    write!(out, "({}{sign}{im}i)", format_float(c.re))
}

/// Format a float the way Go's `%v` does: shortest representation that
/// round-trips, switching to exponent form for exponents below -4 or from
/// 6 up.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_owned();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+Inf" } else { "-Inf" }.to_owned();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }
    let sci = format!("{x:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..6).contains(&exp) {
        return format!("{x}");
    }
    let mut out = String::with_capacity(mantissa.len() + 5);
    out.push_str(mantissa);
    let _ = write!(
        out,
        "e{}{:02}",
        if exp < 0 { '-' } else { '+' },
        exp.unsigned_abs()
    );
    out
}
