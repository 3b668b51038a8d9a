use launch_core::params::{
    CleanupTaskParams, DefineAndLaunchParams, DefineTaskParams, GetTaskLogsParams,
    LaunchTaskParams, TaskRefParams,
};
use schemars::{schema_for, JsonSchema};
use serde_json::Value;

pub const SCHEMA_NAMES: [&str; 6] = [
    "DefineAndLaunchParams",
    "DefineTaskParams",
    "LaunchTaskParams",
    "TaskRefParams",
    "CleanupTaskParams",
    "GetTaskLogsParams",
];

/// JSON Schema for `T` that rejects keys the type does not declare.
pub fn strict_schema<T: JsonSchema>() -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(schema_for!(T))?;
    close_objects(&mut value);
    Ok(value)
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::from("object")) && map.contains_key("properties") {
                map.entry("additionalProperties").or_insert(Value::Bool(false));
            }
            for child in map.values_mut() {
                close_objects(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

pub fn schema(name: &str) -> anyhow::Result<Option<Value>> {
    let schema = match name {
        "DefineAndLaunchParams" => strict_schema::<DefineAndLaunchParams>()?,
        "DefineTaskParams" => strict_schema::<DefineTaskParams>()?,
        "LaunchTaskParams" => strict_schema::<LaunchTaskParams>()?,
        "TaskRefParams" => strict_schema::<TaskRefParams>()?,
        "CleanupTaskParams" => strict_schema::<CleanupTaskParams>()?,
        "GetTaskLogsParams" => strict_schema::<GetTaskLogsParams>()?,
        _ => return Ok(None),
    };
    Ok(Some(schema))
}

pub fn run(name: &str) -> anyhow::Result<()> {
    let Some(schema) = schema(name)? else {
        anyhow::bail!("Unknown schema '{}', expected one of: {}", name, SCHEMA_NAMES.join(", "));
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
