//! Demo services a node can deploy by name from its configuration.

use super::context::ServiceContext;
use super::types::ArgKind;

use anyhow::Context;
use serde_json::json;

/// Names accepted by [`builtin`].
pub const BUILTIN_SERVICES: &[&str] = &["echo", "calculator"];

/// Builds the built-in service called `name`.
pub fn builtin(name: &str) -> Option<ServiceContext> {
    match name {
        "echo" => Some(echo()),
        "calculator" => Some(calculator()),
        _ => None,
    }
}

/// `echo(any)` returns its argument.
fn echo() -> ServiceContext {
    ServiceContext::new("echo").method("echo", &[ArgKind::Any], |args| async move {
        Ok(args.into_iter().next().unwrap_or_default())
    })
}

/// `add(number, number)`.
fn calculator() -> ServiceContext {
    ServiceContext::new("calculator").method(
        "add",
        &[ArgKind::Number, ArgKind::Number],
        |args| async move {
            let a = args[0].as_f64().context("first operand is not a number")?;
            let b = args[1].as_f64().context("second operand is not a number")?;
            anyhow::Ok(json!(a + b))
        },
    )
}
