use kt2java::config::runtime::{BatchPreferences, RuntimeConfig};
use kt2java::{batch, logging, pipeline};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Parsed command line
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Convert(ConvertArgs),
}

#[derive(Debug, PartialEq)]
struct ConvertArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    threads: Option<usize>,
    sequential: bool,
    max_files: Option<usize>,
    quiet: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("kt2java");

    let command = match parse_args(&args[1.min(args.len())..]) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {}", message);
            eprintln!("Usage: {} -convert <folder> [options]", program);
            eprintln!("       {} --help", program);
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Help => {
            print_help(program);
            ExitCode::SUCCESS
        }
        Command::Convert(args) => run_convert(&args),
    }
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut output = None;
    let mut config = None;
    let mut threads = None;
    let mut sequential = false;
    let mut max_files = None;
    let mut quiet = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" | "-help" => return Ok(Command::Help),
            "-convert" | "--convert" => {
                input = Some(PathBuf::from(value_of(args, i)?));
                i += 1;
            }
            "--output" | "-o" => {
                output = Some(PathBuf::from(value_of(args, i)?));
                i += 1;
            }
            "--config" => {
                config = Some(PathBuf::from(value_of(args, i)?));
                i += 1;
            }
            "--threads" => {
                threads = Some(number_of(args, i)?.max(1));
                i += 1;
            }
            "--max-files" => {
                max_files = Some(number_of(args, i)?);
                i += 1;
            }
            "--sequential" => sequential = true,
            "--quiet" => quiet = true,
            other => return Err(format!("unknown option '{}'", other)),
        }
        i += 1;
    }

    let input = input.ok_or_else(|| "missing -convert <folder>".to_string())?;
    Ok(Command::Convert(ConvertArgs {
        input,
        output,
        config,
        threads,
        sequential,
        max_files,
        quiet,
    }))
}

fn value_of(args: &[String], flag: usize) -> Result<&str, String> {
    args.get(flag + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", args[flag]))
}

fn number_of(args: &[String], flag: usize) -> Result<usize, String> {
    let value = value_of(args, flag)?;
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", args[flag], value))
}

fn build_config(args: &ConvertArgs, runtime: &RuntimeConfig) -> batch::BatchConfig {
    let mut config = batch::BatchConfig::from_preferences(&runtime.batch);
    config.pipeline = pipeline::PipelineOptions::from_runtime(runtime);
    config.file_processor = runtime.file_processor.clone();
    config.max_files = args.max_files;
    if let Some(threads) = args.threads {
        config.max_threads = threads;
    }
    if args.sequential {
        config = config.sequential();
    }
    if args.quiet {
        config.progress_reporting = false;
    }
    config
}

fn output_dir(args: &ConvertArgs, prefs: &BatchPreferences) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| batch::default_output_dir(&args.input, prefs))
}

fn run_convert(args: &ConvertArgs) -> ExitCode {
    let runtime = match &args.config {
        Some(path) => match RuntimeConfig::load(path) {
            Ok(runtime) => runtime,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => RuntimeConfig::default(),
    };

    if let Err(e) = logging::config::init_runtime_preferences(runtime.logging.clone()) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = logging::init_global_logging() {
        eprintln!("error: logging initialization failed: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = pipeline::init_pipeline_logging() {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let config = build_config(args, &runtime);
    let output = output_dir(args, &runtime.batch);

    if !args.quiet {
        println!("Converting {} -> {}", args.input.display(), output.display());
    }

    match batch::convert_directory(&args.input, &output, &config) {
        Ok(results) => {
            print_diagnostics(&results);
            print_batch_results(&results, &output);

            if results.has_errors() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            eprintln!("error[{}]: {}", error.error_code(), error);
            ExitCode::FAILURE
        }
    }
}

/// Cargo-style report from the error collector, or each unit's own report
/// when cargo-style output is turned off
fn print_diagnostics(results: &batch::BatchResults) {
    match logging::cargo_style_report() {
        Some(report) => eprint!("{}", report),
        None => {
            for unit in &results.units {
                eprint!("{}", unit.report());
            }
        }
    }
    for failure in &results.write_failures {
        eprintln!("error[{}]: {}", failure.error_code(), failure);
    }
}

fn print_batch_results(results: &batch::BatchResults, output: &Path) {
    println!("{}", results.summary());
    println!("  Files discovered: {}", results.files_discovered);
    println!("  Errors: {}, warnings: {}", results.error_count(), results.warning_count());
    if !results.written_files.is_empty() {
        println!("  Output: {}", output.display());
    }
}

fn print_help(program_name: &str) {
    println!("kt2java v{}", env!("CARGO_PKG_VERSION"));
    println!("Kotlin to Java source transpiler");
    println!();
    println!("USAGE:");
    println!("    {} -convert <folder> [options]", program_name);
    println!();
    println!("OPTIONS:");
    println!("    -convert, --convert <folder>  Directory searched recursively for .kt files");
    println!("    --output <dir>                Where .java files are written (default: <folder>/java)");
    println!("    --config <file>               TOML file with runtime preferences");
    println!("    --threads N                   Worker threads (default: available parallelism)");
    println!("    --sequential                  Transpile on a single thread");
    println!("    --max-files N                 Convert at most N files, in path order");
    println!("    --quiet                       Only report errors and the summary");
    println!("    --help                        Show this help message");
    println!();
    println!("EXIT STATUS:");
    println!("    0 when every file converted cleanly, 1 when any file has errors, 2 on bad usage");
    println!();
    println!("CONFIGURATION:");
    println!("    {}", kt2java::config::build_info::source_info());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_convert() {
        let command = parse_args(&strings(&[
            "-convert", "src", "--output", "out", "--threads", "4", "--max-files", "10", "--quiet",
        ]))
        .unwrap();
        assert_eq!(
            command,
            Command::Convert(ConvertArgs {
                input: PathBuf::from("src"),
                output: Some(PathBuf::from("out")),
                config: None,
                threads: Some(4),
                sequential: false,
                max_files: Some(10),
                quiet: true,
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&strings(&["--threads", "many"])).is_err());
        assert!(parse_args(&strings(&["--convert"])).is_err());
        assert!(parse_args(&strings(&["--sequential"])).is_err());
        assert!(parse_args(&strings(&["-convert", "src", "--fail-fast"])).is_err());
        assert_eq!(parse_args(&strings(&["--help"])).unwrap(), Command::Help);
    }

    #[test]
    fn test_build_config() {
        let Command::Convert(args) = parse_args(&strings(&["--convert", "src", "--sequential"])).unwrap() else {
            panic!("expected convert");
        };
        let runtime = RuntimeConfig::default();
        let config = build_config(&args, &runtime);
        assert_eq!(config.max_threads, 1);
        assert_eq!(output_dir(&args, &runtime.batch), Path::new("src").join(&runtime.batch.default_output_dir));
    }
}
