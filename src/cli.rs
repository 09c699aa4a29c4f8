//! Handlers for the `cloudmap` subcommands

use crate::commands::{CommandRegistry, check_required};
use crate::context::Context;
use crate::mapping::{CoercionContext, FieldPath, Params, TypeTag, coerce, path::PathStep};
use anyhow::{Context as _, Result, bail};
use serde_json::Value;
use std::path::Path;

pub struct CoerceCommand;

impl CoerceCommand {
    /// Coerce the given values with `tag` and print the result as JSON.
    ///
    /// A single value is coerced as a scalar, several as a list.
    pub fn execute(
        ctx: &Context,
        tag: TypeTag,
        values: &[String],
        template_data: Option<&Path>,
    ) -> Result<()> {
        let raw = match values {
            [single] => Value::String(single.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        };

        let mut coercion = coercion_context(ctx, template_data)?;
        let coerced = coerce(&raw, tag, &mut coercion)?;

        report_warnings(ctx, &mut coercion);
        ctx.output.plain(&serde_json::to_string_pretty(&coerced)?);
        Ok(())
    }
}

pub struct RenderCommand;

impl RenderCommand {
    /// Render the request a command would send, without sending it
    pub fn execute(
        ctx: &Context,
        registry: &CommandRegistry,
        name: &str,
        params: &[String],
        template_data: Option<&Path>,
    ) -> Result<()> {
        let command = registry.get(name)?;
        let params = parse_params(params)?;
        check_required(command.as_ref(), &params)?;

        let mut coercion = coercion_context(ctx, template_data)?;
        let document = command
            .render(&params, &mut coercion)
            .with_context(|| format!("Failed to render {}", name))?;

        report_warnings(ctx, &mut coercion);
        ctx.output.plain(&serde_json::to_string_pretty(&document)?);
        Ok(())
    }
}

pub struct ListCommand;

impl ListCommand {
    pub fn execute(ctx: &Context, registry: &CommandRegistry) -> Result<()> {
        ctx.output.section("Commands");
        for command in registry.commands() {
            ctx.output.key_value(command.name(), command.description());
            let params: Vec<String> = command
                .params()
                .iter()
                .map(|p| if p.required { p.name.to_string() } else { format!("[{}]", p.name) })
                .collect();
            ctx.output.dimmed(&format!("    {}", params.join(" ")));
        }
        Ok(())
    }
}

pub struct PathCommand;

impl PathCommand {
    /// Parse a field path and print its steps
    pub fn execute(ctx: &Context, raw: &str) -> Result<()> {
        let path = FieldPath::parse(raw)?;

        ctx.output.section(&format!("Field path {}", path));
        for (i, step) in path.steps().iter().enumerate() {
            let step = match step {
                PathStep::Field(name) => format!("field {}", name),
                PathStep::MapKey(key) => format!("map key {}", key),
                PathStep::SliceIndex(index) => format!("list index {}", index),
            };
            ctx.output.key_value(&i.to_string(), &step);
        }
        Ok(())
    }
}

/// Turn repeated `key=value` arguments into a parameter map; a repeated key
/// collects its values into a list
pub fn parse_params(args: &[String]) -> Result<Params> {
    let mut params = Params::new();

    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Invalid parameter '{}': expected key=value", arg);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid parameter '{}': empty key", arg);
        }

        let value = Value::String(value.to_string());
        match params.get_mut(key) {
            None => {
                params.insert(key.to_string(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    Ok(params)
}

fn coercion_context(ctx: &Context, template_data: Option<&Path>) -> Result<CoercionContext> {
    let coercion = ctx.coercion_context();
    let Some(path) = template_data else {
        return Ok(coercion);
    };

    let content = ctx
        .fs
        .read_to_string(path)
        .with_context(|| format!("Failed to read template data: {}", path.display()))?;
    let data: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse template data: {}", path.display()))?;
    Ok(coercion.with_template_data(data))
}

fn report_warnings(ctx: &Context, coercion: &mut CoercionContext) {
    for warning in coercion.take_warnings() {
        ctx.output.warning(&warning);
    }
}
