use super::fetch::download_closure;
use super::resolve_closure;
use anyhow::{Context, Result};
use clap::Args;
use mvnload_core::{
    Coordinate, DownloadOptions, HttpRepository, LoadingContext, MvnloadConfig, ResolveOptions,
    Value, console,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Root coordinate whose closure provides the component
    pub coordinate: Coordinate,
    /// Fully qualified component name
    #[arg(long)]
    pub component: String,
    /// Method to invoke
    #[arg(long)]
    pub method: String,
    /// Invoke a static method instead of constructing an instance
    #[arg(long = "static")]
    pub is_static: bool,
    /// Constructor argument (repeatable)
    #[arg(long = "new-arg", allow_hyphen_values = true)]
    pub constructor_args: Vec<String>,
    /// Extra local library (path or file:// URL) to load
    #[arg(long = "local")]
    pub locals: Vec<String>,
    /// Directory to download libraries into
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Library file extension (defaults to the platform's shared-library extension)
    #[arg(long, default_value = std::env::consts::DLL_EXTENSION)]
    pub extension: String,
    /// Repository base URL (defaults to the configured repository)
    #[arg(long)]
    pub repository: Option<String>,
    /// Method arguments
    #[arg(last = true)]
    pub args: Vec<String>,
}

pub async fn run(args: RunArgs, config: &MvnloadConfig, token: CancellationToken) -> Result<()> {
    console::header("run", env!("CARGO_PKG_VERSION"));

    let http = HttpRepository::from_config(config)?;
    let options = ResolveOptions {
        dedupe: true,
        trust_declared_versions: config.trust_declared_versions,
    };

    let closure = resolve_closure(
        config,
        &http,
        args.coordinate,
        args.repository.as_deref(),
        &args.locals,
        options,
        &token,
    )
    .await?;

    let mut download = DownloadOptions::from_config(config);
    download.extension = args.extension;
    download.strict = true;

    let output = args.output.unwrap_or_else(|| config.output_dir.clone());
    let report = download_closure(http, &closure, download, &output, token).await?;

    let context = LoadingContext::new(report.artifact_paths())
        .context("failed to load component libraries")?;
    console::step(&format!(
        "loaded {} component(s) from {} location(s)",
        context.component_names().len(),
        context.locations().len()
    ));

    let call_args: Vec<Value> = args.args.iter().map(|arg| parse_value(arg)).collect();

    let result = if args.is_static {
        context.invoke_static(&args.component, &args.method, &call_args)?
    } else {
        let constructor_args: Vec<Value> = args
            .constructor_args
            .iter()
            .map(|arg| parse_value(arg))
            .collect();
        let mut component = context.instantiate(&args.component, &constructor_args)?;
        component.invoke(&args.method, &call_args)?
    };

    match result {
        Some(value) => println!("{value}"),
        None => println!("(void)"),
    }

    Ok(())
}

/// Reads a command-line argument as the narrowest matching value.
fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    if let Ok(int) = raw.parse::<i32>() {
        Value::Int(int)
    } else if let Ok(long) = raw.parse::<i64>() {
        Value::Long(long)
    } else if let Ok(double) = raw.parse::<f64>() {
        Value::Double(double)
    } else {
        Value::Str(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars_to_narrowest_value() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("-3"), Value::Int(-3));
        assert_eq!(parse_value("4000000000"), Value::Long(4_000_000_000));
        assert_eq!(parse_value("1.5"), Value::Double(1.5));
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("null"), Value::Null);
    }

    #[test]
    fn falls_back_to_strings() {
        assert_eq!(parse_value("hello"), Value::Str("hello".to_string()));
        assert_eq!(parse_value("True"), Value::Str("True".to_string()));
    }
}
