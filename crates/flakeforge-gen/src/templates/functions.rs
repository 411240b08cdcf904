//! Functions available inside templates
//!
//! Templates can call exactly four functions:
//! - `json(value=x)` serializes any value to a JSON string
//! - `nix_json(value=x)` is `json` made safe inside a Nix `''...''` string
//! - `contains(s=haystack, substr=needle)` is a substring test
//! - `debug()` reports whether debug mode is enabled

use std::collections::HashMap;
use tera::{Tera, Value};

pub(crate) fn register(tera: &mut Tera, debug: bool) {
    tera.register_function("json", json);
    tera.register_function("nix_json", nix_json);
    tera.register_function("contains", contains);
    tera.register_function("debug", move |_: &HashMap<String, Value>| {
        Ok(Value::Bool(debug))
    });
}

fn json(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let value = args
        .get("value")
        .ok_or_else(|| tera::Error::msg("json() requires a `value` argument"))?;
    serde_json::to_string(value)
        .map(Value::String)
        .map_err(|e| tera::Error::msg(format!("json(): {}", e)))
}

/// JSON for `builtins.fromJSON ''...''`.
///
/// `'` and `$` only occur inside JSON strings, where `\u0027` and `\u0024`
/// decode to the same characters. Without them the text can contain neither
/// `''` (end of string) nor `${` (interpolation).
fn nix_json(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let Value::String(text) = json(args)? else {
        return Err(tera::Error::msg("nix_json(): serialization did not produce a string"));
    };
    Ok(Value::String(
        text.replace('\'', "\\u0027").replace('$', "\\u0024"),
    ))
}

fn contains(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let haystack = string_arg(args, "contains", "s")?;
    let needle = string_arg(args, "contains", "substr")?;
    Ok(Value::Bool(haystack.contains(needle)))
}

fn string_arg<'a>(
    args: &'a HashMap<String, Value>,
    function: &str,
    name: &str,
) -> tera::Result<&'a str> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(tera::Error::msg(format!(
            "{}(): `{}` must be a string, got {}",
            function, name, other
        ))),
        None => Err(tera::Error::msg(format!(
            "{}() requires a `{}` argument",
            function, name
        ))),
    }
}
