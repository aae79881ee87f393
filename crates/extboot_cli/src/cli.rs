use clap::Parser;
use extboot_core::default_log_level;

#[derive(Parser)]
#[command(
    name = "extboot",
    about = "Runs a demo container through both bootstrap checkpoints and prints the report",
    version
)]
pub struct Cli {
    /// Log level: trace, debug, info, warn, or error
    #[arg(long, default_value_t = default_log_level().to_string())]
    pub log_level: String,

    /// Absolute directory for rolling log files; logging stays off when omitted
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Placeholder value as key=value (repeatable)
    #[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
