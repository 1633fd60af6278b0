use clap::{Args, Subcommand};

#[derive(Args)]
pub struct CreateArgs {
    #[command(subcommand)]
    pub command: CreateCommand,
}

#[derive(Subcommand)]
pub enum CreateCommand {
    #[command(about = "Create or update a codespec. Outputs the version that was created.")]
    Codespec(CreateCodespecArgs),
}

#[derive(Args)]
pub struct CreateCodespecArgs {
    pub name: String,
    #[arg(long, help = "The container image")]
    pub image: String,
    #[arg(
        short = 'i',
        long = "input",
        value_delimiter = ',',
        help = "Input buffer parameter names"
    )]
    pub inputs: Vec<String>,
    #[arg(
        short = 'o',
        long = "output",
        value_delimiter = ',',
        help = "Output buffer parameter names"
    )]
    pub outputs: Vec<String>,
    #[arg(
        short = 'e',
        long = "env",
        value_name = "KEY=VALUE",
        value_parser = parse_env_var,
        help = "Environment variables to set in the container"
    )]
    pub env: Vec<(String, String)>,
    #[arg(
        long,
        help = "Use the trailing arguments as the container command instead of its args"
    )]
    pub command: bool,
    #[arg(short = 'c', long, help = "CPU cores needed")]
    pub cpu: Option<String>,
    #[arg(short = 'm', long, help = "Memory bytes needed")]
    pub memory: Option<String>,
    #[arg(short = 'g', long, help = "GPUs needed")]
    pub gpu: Option<String>,
    #[arg(last = true, value_name = "ARGS")]
    pub container_args: Vec<String>,
}

fn parse_env_var(value: &str) -> Result<(String, String), String> {
    let (key, val) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{value}'"))?;
    if key.trim().is_empty() {
        return Err(format!("missing variable name in '{value}'"));
    }
    Ok((key.to_string(), val.to_string()))
}
