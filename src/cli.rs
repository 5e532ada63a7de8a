use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use terrakit::PlanCheckKind;

#[derive(Parser)]
#[command(name = "terrapin")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Run terraform with layered variables and a cached plan", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Workspace directory holding the terraform configuration
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the terraform executable
    #[arg(long, env = "TERRAPIN_TERRAFORM", global = true)]
    pub terraform: Option<PathBuf>,

    /// Fail unless terraform reports exactly this version
    #[arg(long, global = true)]
    pub required_version: Option<String>,

    /// Input variable override (value parsed as JSON when possible)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var, global = true)]
    pub vars: Vec<(String, serde_json::Value)>,

    /// Environment override; bare names become TF_VAR_ variables
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env, global = true)]
    pub env: Vec<(String, String)>,

    /// How to decide whether a saved plan can be applied
    #[arg(long, value_enum, global = true)]
    pub plan_check: Option<PlanCheckArg>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the terraform version, platform and provider selections
    Version {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run terraform init
    Init {
        /// Extra arguments passed to terraform
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Validate the configuration
    Validate {
        /// Print the JSON diagnostics
        #[arg(long)]
        json: bool,

        /// Extra arguments passed to terraform
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show the execution plan
    Plan {
        /// Write the plan artifact so the next apply uses it
        #[arg(long)]
        save: bool,

        /// Extra arguments passed to terraform
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Apply the saved plan, planning first when there is none
    Apply {
        /// Extra arguments passed to terraform
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Destroy all managed resources
    Destroy {
        /// Extra arguments passed to terraform
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show outputs, or the value of a single output
    Output {
        /// Output name
        name: Option<String>,
    },

    /// Run a terraform state subcommand (e.g. `state list`)
    State {
        /// Subcommand and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the pulled state as JSON
    ShowState {
        /// Only the resources list
        #[arg(long, conflicts_with = "outputs")]
        resources: bool,

        /// Only the outputs mapping
        #[arg(long)]
        outputs: bool,
    },

    /// Print the provider schemas as JSON
    Providers,

    /// List the modules of the configuration
    Modules,

    /// Rewrite configuration files to canonical format
    Fmt,

    /// Show the selected terraform workspace
    Workspace,

    /// Write the default file layout into the workspace directory
    Layout,

    /// Show the resolved configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlanCheckArg {
    Existence,
    Fingerprint,
}

impl From<PlanCheckArg> for PlanCheckKind {
    fn from(arg: PlanCheckArg) -> Self {
        match arg {
            PlanCheckArg::Existence => Self::Existence,
            PlanCheckArg::Fingerprint => Self::Fingerprint,
        }
    }
}

fn split_pair(raw: &str) -> Result<(&str, &str), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Parse `key=value`, reading the value as JSON when it is valid JSON.
pub fn parse_var(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = split_pair(raw)?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Parse `KEY=VALUE`.
pub fn parse_env(raw: &str) -> Result<(String, String), String> {
    let (key, value) = split_pair(raw)?;
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_var_json_values() {
        assert_eq!(parse_var("replicas=3").unwrap(), ("replicas".into(), json!(3)));
        assert_eq!(parse_var("on=true").unwrap(), ("on".into(), json!(true)));
        assert_eq!(parse_var("ids=[1,2]").unwrap(), ("ids".into(), json!([1, 2])));
        assert_eq!(
            parse_var("tags={\"a\":\"b\"}").unwrap(),
            ("tags".into(), json!({"a": "b"}))
        );
    }

    #[test]
    fn test_parse_var_falls_back_to_string() {
        assert_eq!(
            parse_var("region=eu-west-1").unwrap(),
            ("region".into(), json!("eu-west-1"))
        );
        assert_eq!(parse_var("empty=").unwrap(), ("empty".into(), json!("")));
        assert_eq!(parse_var("eq=a=b").unwrap(), ("eq".into(), json!("a=b")));
    }

    #[test]
    fn test_parse_pair_errors() {
        assert!(parse_var("novalue").is_err());
        assert!(parse_env("=x").is_err());
    }

    #[test]
    fn test_global_flags_and_trailing_args() {
        let cli = Cli::try_parse_from([
            "terrapin",
            "-C",
            "/tmp/stack",
            "--var",
            "foo=1",
            "--env",
            "TF_LOG=debug",
            "apply",
            "--",
            "-parallelism=2",
        ])
        .unwrap();
        assert_eq!(cli.global.dir, PathBuf::from("/tmp/stack"));
        assert_eq!(cli.global.vars, vec![("foo".to_string(), json!(1))]);
        assert_eq!(
            cli.global.env,
            vec![("TF_LOG".to_string(), "debug".to_string())]
        );
        match cli.command {
            Command::Apply { args } => assert_eq!(args, vec!["-parallelism=2"]),
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_state_takes_raw_args() {
        let cli = Cli::try_parse_from(["terrapin", "state", "show", "-json"]).unwrap();
        match cli.command {
            Command::State { args } => assert_eq!(args, vec!["show", "-json"]),
            _ => panic!("expected state"),
        }
    }

    #[test]
    fn test_show_state_flags_conflict() {
        assert!(
            Cli::try_parse_from(["terrapin", "show-state", "--resources", "--outputs"]).is_err()
        );
    }
}
