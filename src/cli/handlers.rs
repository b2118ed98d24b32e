// FILE: src/cli/handlers.rs
use crate::{
    analyze_source, check_file, cli::OutputFormat, compile_file_with_options, CompilationStats,
    CompilerError, CompilerOptions, Diagnostic, Result,
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant;

// --- COMPILE ---
pub fn handle_compile_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let output_path = match matches.get_one::<String>("output") {
        Some(path) => path.clone(),
        None => default_output_path(input_path, cli.output_directory()),
    };

    let options = cli.build_compiler_options(matches)?;

    if matches.get_flag("watch") {
        watch_and_compile(input_path, &output_path, options)
    } else {
        compile_single_file(input_path, &output_path, options, matches.get_flag("stats"))
    }
}

/// `<dir>/<stem>.css` when an output directory is configured, else next to the input
fn default_output_path(input_path: &str, output_directory: Option<&str>) -> String {
    let css_path = Path::new(input_path).with_extension("css");
    let path = match (output_directory, css_path.file_name()) {
        (Some(dir), Some(file_name)) => PathBuf::from(dir).join(file_name),
        _ => css_path,
    };
    path.to_string_lossy().into_owned()
}

fn compile_single_file(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
    show_stats: bool,
) -> Result<()> {
    println!("🔨 Compiling {} -> {}", input_path, output_path);

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let compile_start = Instant::now();
    let stats = compile_file_with_options(input_path, output_path, options)?;
    let compile_time = compile_start.elapsed();

    println!("✅ Compilation successful!");
    println!("   Output: {} bytes", stats.output_size);
    println!("   Time: {:.2}ms", compile_time.as_millis());

    if stats.diagnostic_count > 0 || stats.defect_count > 0 {
        println!(
            "   ⚠️  Rendered with {} diagnostic(s) and {} defect(s)",
            stats.diagnostic_count, stats.defect_count
        );
    }

    if show_stats {
        print_detailed_stats(&stats);
    }

    Ok(())
}

fn watch_and_compile(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
) -> Result<()> {
    println!("👀 Watching {} for changes...", input_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| watch_error("Failed to create file watcher", e))?;

    watcher
        .watch(Path::new(input_path), RecursiveMode::NonRecursive)
        .map_err(|e| watch_error("Failed to watch file", e))?;

    if let Err(e) = compile_file_with_options(input_path, output_path, options.clone()) {
        eprintln!("❌ Initial compilation failed: {}", e);
    } else {
        println!("✅ Initial compilation successful");
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    log::trace!("Ignoring watch event {:?}", event.kind);
                    continue;
                }
                println!("🔄 File changed, recompiling...");
                match compile_file_with_options(input_path, output_path, options.clone()) {
                    Ok(stats) => {
                        println!(
                            "✅ Recompiled successfully ({} bytes, {}ms)",
                            stats.output_size, stats.compile_time_ms
                        );
                    }
                    Err(e) => eprintln!("❌ Compilation failed: {}", e),
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn watch_error(context: &str, error: notify::Error) -> CompilerError {
    CompilerError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, error),
    ))
}

// --- CHECK ---
pub fn handle_check_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let recursive = matches.get_flag("recursive");
    let options = cli.build_compiler_options(matches)?;

    if recursive && Path::new(input_path).is_dir() {
        check_directory_recursive(input_path, &options)
    } else {
        let diagnostics = check_single_file(input_path, &options)?;
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(CompilerError::semantic(input_path, diagnostics))
        }
    }
}

/// Print every diagnostic of one file. Only unreadable or unparsable files are errors.
fn check_single_file(input_path: &str, options: &CompilerOptions) -> Result<Vec<Diagnostic>> {
    println!("🔍 Checking {}", input_path);
    match check_file(input_path, options) {
        Ok(diagnostics) if diagnostics.is_empty() => {
            println!("✅ {} - No issues found", input_path);
            Ok(diagnostics)
        }
        Ok(diagnostics) => {
            println!("❌ {} - {} issue(s)", input_path, diagnostics.len());
            for diagnostic in &diagnostics {
                println!("   {}:{}", input_path, diagnostic);
            }
            Ok(diagnostics)
        }
        Err(e) => {
            println!("❌ {} - {}", input_path, e);
            Err(e)
        }
    }
}

fn check_directory_recursive(dir_path: &str, options: &CompilerOptions) -> Result<()> {
    let mut total_files = 0;
    let mut error_files = 0;
    let mut all_diagnostics = Vec::new();

    for entry in walkdir::WalkDir::new(dir_path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        if !entry.file_type().is_file() || entry.path().extension().map_or(true, |ext| ext != "icss") {
            continue;
        }

        total_files += 1;
        let path = entry.path().to_string_lossy();
        match check_single_file(&path, options) {
            Ok(diagnostics) if diagnostics.is_empty() => {}
            Ok(diagnostics) => {
                error_files += 1;
                all_diagnostics.extend(diagnostics);
            }
            Err(_) => error_files += 1,
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", total_files);
    println!("   Files with errors: {}", error_files);
    if total_files > 0 {
        println!(
            "   Success rate: {:.1}%",
            (total_files - error_files) as f64 / total_files as f64 * 100.0
        );
    }

    if error_files > 0 {
        Err(CompilerError::semantic(dir_path, all_diagnostics))
    } else {
        Ok(())
    }
}

// --- ANALYZE ---
pub fn handle_analyze_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let output_path = matches.get_one::<String>("output");
    let format = matches
        .get_one::<OutputFormat>("format")
        .cloned()
        .unwrap_or(OutputFormat::Debug);

    println!("🔬 Analyzing {}", input_path);

    // Analysis always renders, so every diagnostic and defect shows up in the report.
    let options = CompilerOptions {
        strict: false,
        ..cli.build_compiler_options(matches)?
    };

    let source = std::fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;
    let start = Instant::now();
    let mut analysis = analyze_source(&source, input_path, &options)?;
    analysis.stats.compile_time_ms = start.elapsed().as_millis() as u64;

    let report = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&analysis).map_err(|e| {
            CompilerError::CodeGen {
                message: format!("JSON serialization error: {}", e),
            }
        })?,
        OutputFormat::Debug => format!("ICSS File Analysis: {}\n\n{:#?}", input_path, analysis),
    };
    if let Some(output_file) = output_path {
        std::fs::write(output_file, report)?;
        println!("✅ Analysis saved to {}", output_file);
    } else {
        println!("{}", report);
    }
    Ok(())
}

// --- UTILITIES ---
fn required<'a>(matches: &'a clap::ArgMatches, id: &str) -> Result<&'a String> {
    matches.get_one::<String>(id).ok_or_else(|| CompilerError::InvalidFormat {
        message: format!("Missing required argument '{}'", id),
    })
}

fn print_detailed_stats(stats: &CompilationStats) {
    println!("\n📊 Detailed Compilation Statistics:");
    println!("   Source size: {} bytes", stats.source_size);
    println!("   Output size: {} bytes", stats.output_size);
    println!("   Compile time: {}ms", stats.compile_time_ms);
    println!("\n   Breakdown:");
    println!("     Rules: {}", stats.rule_count);
    println!("     Declarations: {}", stats.declaration_count);
    println!("     Assignments: {}", stats.assignment_count);
    println!("     Conditionals: {}", stats.conditional_count);
    if stats.variable_count > 0 {
        println!("     Injected variables: {}", stats.variable_count);
    }
    if stats.diagnostic_count > 0 {
        println!("     Diagnostics: {}", stats.diagnostic_count);
    }
    if stats.defect_count > 0 {
        println!("     Defects: {}", stats.defect_count);
    }
}
