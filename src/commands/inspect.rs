//! Read-only commands: version, outputs, state, schemas, configuration.

use anyhow::{Result, bail};
use colored::Colorize;
use std::collections::BTreeMap;
use terrakit::{JsonView, KEYPATH_SEPARATOR};
use termkit::layout;

use super::{arg_refs, print_json, print_result};
use crate::{Context, paths};

pub fn version(ctx: &Context, json: bool) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let info = workspace.version_info()?;
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }

    layout::header("Terraform");
    layout::kv("Version", &info.version);
    layout::kv("Platform", &info.platform);
    layout::kv("Executable", &workspace.executable().display().to_string());
    if !info.provider_selections.is_empty() {
        layout::section("Providers");
        let pairs: Vec<_> = info.provider_selections.iter().collect();
        layout::kv_table(&pairs);
    }
    Ok(())
}

/// Value of one output, given `output -json` results.
fn output_value<'a>(outputs: &'a JsonView, name: &str) -> Option<&'a serde_json::Value> {
    outputs.get(&format!("{name}{KEYPATH_SEPARATOR}value"))
}

pub fn output(ctx: &Context, name: Option<&str>) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let outputs = workspace.output()?;
    let Some(name) = name else {
        print_json(&outputs);
        return Ok(());
    };

    match output_value(&outputs, name) {
        Some(serde_json::Value::String(s)) => println!("{s}"),
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => bail!("no output named '{name}'"),
    }
    Ok(())
}

pub fn state(ctx: &Context, args: &[String]) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let result = workspace.state(&arg_refs(args))?;
    print_result(&result);
    Ok(())
}

pub fn show_state(ctx: &Context, resources: bool, outputs: bool) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let view = if resources {
        workspace.resources()?
    } else if outputs {
        workspace.outputs()?
    } else {
        workspace.tfstate()?
    };
    print_json(&view);
    Ok(())
}

pub fn providers(ctx: &Context) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    print_json(&workspace.providers_schema()?);
    Ok(())
}

/// `(key, source)` rows of `modules -json` results.
fn module_rows(view: &JsonView) -> Vec<(String, String)> {
    let Some(modules) = view.get_array("Modules") else {
        return Vec::new();
    };
    modules
        .iter()
        .map(|module| {
            let key = module["Key"].as_str().unwrap_or_default();
            let source = module["Source"]
                .as_str()
                .or_else(|| module["Dir"].as_str())
                .unwrap_or_default();
            let key = if key.is_empty() { "(root)" } else { key };
            (key.to_string(), source.to_string())
        })
        .collect()
}

pub fn modules(ctx: &Context) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    let view = workspace.modules()?;
    if ctx.verbose > 0 {
        print_json(&view);
        return Ok(());
    }
    layout::kv_table(&module_rows(&view));
    Ok(())
}

pub fn workspace(ctx: &Context) -> Result<()> {
    let workspace = ctx.session.open_with_overrides()?;
    println!("{}", workspace.workspace_show()?);
    Ok(())
}

const PATH_WIDTH: usize = 60;

fn file_status(path: &std::path::Path) -> String {
    let shown = termkit::truncate_path(&path.display().to_string(), PATH_WIDTH);
    if path.exists() {
        shown
    } else {
        format!("{shown} {}", "(missing)".dimmed())
    }
}

/// Show the resolved settings without running terraform.
pub fn config(ctx: &Context) -> Result<()> {
    let session = &ctx.session;
    let settings = &session.settings;

    layout::header("Configuration");
    layout::kv("Workspace", &session.dir.display().to_string());
    layout::kv("Project file", &file_status(&paths::project_file(&session.dir)));
    if let Ok(global) = paths::global_config_file() {
        layout::kv("Global file", &file_status(&global));
    }
    layout::kv(
        "Executable",
        &settings
            .executable_path()
            .map_or_else(|| "search PATH".to_string(), |p| p.display().to_string()),
    );
    layout::kv(
        "Required version",
        settings.required_version.as_deref().unwrap_or("any"),
    );
    layout::kv(
        "Plan check",
        &format!("{:?}", settings.plan_check.unwrap_or_default()).to_lowercase(),
    );
    if !settings.inherit_environment.is_empty() {
        layout::kv("Inherited", &settings.inherit_environment.join(", "));
    }

    let mut variables = settings.json_variables();
    variables.extend(session.overrides.variables.clone());
    let variables: Vec<(String, String)> = variables
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect();
    if !variables.is_empty() {
        layout::section("Variables");
        layout::kv_table(&variables);
    }

    let environment: BTreeMap<String, String> = settings
        .environment
        .iter()
        .chain(&session.overrides.environment)
        .map(|(k, v)| (terrakit::vars::normalize_env_key(k), v.clone()))
        .collect();
    let environment: Vec<_> = environment.into_iter().collect();
    if !environment.is_empty() {
        layout::section("Environment");
        layout::kv_table(&environment);
    }
    Ok(())
}
