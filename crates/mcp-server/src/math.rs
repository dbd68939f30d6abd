//! Arithmetic tools
//!
//! `add` and `multiply` take two numbers; `addArguments` and
//! `multiplyArguments` fold an array of numbers. Every result is echoed with
//! its operands, e.g. `"54.0 + 6.0 = 60.0"`.

use async_trait::async_trait;
use mcp_core::ToolDescriptor;
use mcp_core::schema::{array, number, object};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{RegistryError, ToolError};
use crate::format::format_expression;
use crate::registry::{ToolHandler, ToolRegistry};

#[derive(Debug, Deserialize)]
struct PairInput {
    a: f64,
    b: f64,
}

#[derive(Debug, Deserialize)]
struct ListInput {
    numbers: Vec<f64>,
}

fn parse<T: for<'de> Deserialize<'de>>(
    tool: &str,
    arguments: Map<String, Value>,
) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

fn finite(tool: &str, value: f64) -> Result<f64, ToolError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ToolError::Execution {
            tool: tool.to_string(),
            reason: "result is not a finite number".to_string(),
        })
    }
}

/// Two-operand tool: `a <op> b`
pub struct BinaryOp {
    name: &'static str,
    symbol: &'static str,
    apply: fn(f64, f64) -> f64,
}

#[async_trait]
impl ToolHandler for BinaryOp {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        let PairInput { a, b } = parse(self.name, arguments)?;
        let result = finite(self.name, (self.apply)(a, b))?;
        Ok(format_expression(&[a, b], self.symbol, result))
    }
}

/// Array tool: folds every element with one operator
///
/// An empty array answers with the integer identity: `" = 0"` or `" = 1"`.
pub struct FoldOp {
    name: &'static str,
    symbol: &'static str,
    identity: &'static str,
    apply: fn(&[f64]) -> f64,
}

#[async_trait]
impl ToolHandler for FoldOp {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolError> {
        let ListInput { numbers } = parse(self.name, arguments)?;
        if numbers.is_empty() {
            return Ok(format!(" = {}", self.identity));
        }
        let result = finite(self.name, (self.apply)(&numbers))?;
        Ok(format_expression(&numbers, self.symbol, result))
    }
}

/// Compensated (Neumaier) summation; 0.0 for an empty slice
///
/// Sums such as `[0.1, 0.2, 0.3]` come out as `0.6` rather than accumulating
/// rounding error term by term.
pub fn sum(numbers: &[f64]) -> f64 {
    let mut total = 0.0_f64;
    let mut compensation = 0.0_f64;

    for &x in numbers {
        let t = total + x;
        if total.abs() >= x.abs() {
            compensation += (total - t) + x;
        } else {
            compensation += (x - t) + total;
        }
        total = t;
    }

    if compensation != 0.0 && compensation.is_finite() {
        total += compensation;
    }
    total
}

/// Left-to-right product; 1.0 for an empty slice
pub fn product(numbers: &[f64]) -> f64 {
    numbers.iter().fold(1.0, |acc, x| acc * x)
}

fn pair_schema() -> Value {
    object(
        json!({
            "a": number(Some("First number")),
            "b": number(Some("Second number")),
        }),
        vec!["a", "b"],
    )
}

fn list_schema(description: &str) -> Value {
    object(
        json!({
            "numbers": array(number(None), Some(description)),
        }),
        vec!["numbers"],
    )
}

/// Registry holding the four arithmetic tools, in their published order
pub fn math_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    registry.register(
        ToolDescriptor::new("add", "Add two numbers", pair_schema()),
        BinaryOp {
            name: "add",
            symbol: "+",
            apply: |a, b| a + b,
        },
    )?;
    registry.register(
        ToolDescriptor::new("multiply", "Multiply two numbers", pair_schema()),
        BinaryOp {
            name: "multiply",
            symbol: "*",
            apply: |a, b| a * b,
        },
    )?;
    registry.register(
        ToolDescriptor::new(
            "addArguments",
            "Add multiple numbers",
            list_schema("List of numbers to add"),
        ),
        FoldOp {
            name: "addArguments",
            symbol: "+",
            identity: "0",
            apply: sum,
        },
    )?;
    registry.register(
        ToolDescriptor::new(
            "multiplyArguments",
            "Multiply multiple numbers",
            list_schema("List of numbers to multiply"),
        ),
        FoldOp {
            name: "multiplyArguments",
            symbol: "*",
            identity: "1",
            apply: product,
        },
    )?;

    Ok(registry)
}
