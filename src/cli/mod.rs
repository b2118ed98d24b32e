// FILE: src/cli/mod.rs

mod config;
mod handlers;

use crate::error::{CompilerError, Result};
use crate::CompilerOptions;
use clap::{Arg, ArgAction, Command, ValueEnum};
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Debug,
}

pub struct EnhancedCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl EnhancedCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        let result = match matches.subcommand() {
            Some(("compile", sub_matches)) => handlers::handle_compile_command(self, sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(self, sub_matches),
            Some(("analyze", sub_matches)) => handlers::handle_analyze_command(self, sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };

        log::debug!("Finished in {}ms", self.start_time.elapsed().as_millis());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.toml or .json)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(
                Command::new("compile")
                    .about("Compile an ICSS file to CSS")
                    .arg(Arg::new("input").help("Input ICSS file").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output CSS file"))
                    .arg(Arg::new("define").short('D').long("define").value_name("NAME=VALUE").help("Define a global variable").action(ArgAction::Append))
                    .arg(Arg::new("lenient").long("lenient").help("Render even when the type checker reports problems").action(ArgAction::SetTrue))
                    .arg(Arg::new("indent").long("indent").value_name("N").value_parser(clap::value_parser!(usize)).help("Spaces before each declaration"))
                    .arg(Arg::new("debug").short('d').long("debug").help("Enable debug mode with per-phase logging").action(ArgAction::SetTrue))
                    .arg(Arg::new("stats").long("stats").help("Show detailed compilation statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for file changes and recompile").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Type-check ICSS files without generating CSS")
                    .arg(Arg::new("input").help("Input ICSS file or directory").required(true).index(1))
                    .arg(Arg::new("define").short('D').long("define").value_name("NAME=VALUE").help("Define a global variable").action(ArgAction::Append))
                    .arg(Arg::new("recursive").short('r').long("recursive").help("Check all ICSS files in directory recursively").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("analyze")
                    .about("Show diagnostics, statistics and the evaluated tree of an ICSS file")
                    .arg(Arg::new("input").help("Input ICSS file").required(true).index(1))
                    .arg(Arg::new("define").short('D').long("define").value_name("NAME=VALUE").help("Define a global variable").action(ArgAction::Append))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output analysis to file"))
                    .arg(Arg::new("format").short('f').long("format").value_parser(clap::value_parser!(OutputFormat)).default_value("debug").help("Analysis output format")),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Merge flags with the config file. Flags win.
    pub fn build_compiler_options(&self, matches: &clap::ArgMatches) -> Result<CompilerOptions> {
        let mut options = CompilerOptions::default();

        if let Some(strict) = self.config.strict {
            options.strict = strict;
        }
        if flag(matches, "lenient") {
            options.strict = false;
        }

        if let Some(indent) = self.config.indent_width {
            options.indent_width = indent;
        }
        if let Ok(Some(indent)) = matches.try_get_one::<usize>("indent") {
            options.indent_width = *indent;
        }

        options.debug_mode = flag(matches, "debug");

        if let Some(defines) = matches.get_many::<String>("define") {
            for define in defines {
                let (key, value) = parse_define(define)?;
                options.custom_variables.insert(key, value);
            }
        }
        if let Some(config_vars) = &self.config.custom_variables {
            for (key, value) in config_vars {
                options.custom_variables.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        Ok(options)
    }

    pub fn output_directory(&self) -> Option<&str> {
        self.config.output_directory.as_deref()
    }
}

impl Default for EnhancedCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Flags not defined on every subcommand read as false
fn flag(matches: &clap::ArgMatches, id: &str) -> bool {
    matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false)
}

fn parse_define(define: &str) -> Result<(String, String)> {
    match define.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(CompilerError::InvalidFormat {
            message: format!("Invalid variable definition: {}. Use NAME=VALUE format.", define),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_matches(args: &[&str]) -> clap::ArgMatches {
        let cli = EnhancedCli::new();
        let matches = cli.build_cli().try_get_matches_from(args).unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        sub.clone()
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(parse_define("Gap=4px").unwrap(), ("Gap".to_string(), "4px".to_string()));
        assert!(parse_define("Gap").is_err());
        assert!(parse_define("=4px").is_err());
    }

    #[test]
    fn test_build_options_from_flags() {
        let cli = EnhancedCli::new();
        let matches = compile_matches(&["icssc", "compile", "in.icss", "--lenient", "--indent", "4", "-D", "Gap=4px"]);
        let options = cli.build_compiler_options(&matches).unwrap();

        assert!(!options.strict);
        assert_eq!(options.indent_width, 4);
        assert_eq!(options.custom_variables.get("Gap").map(String::as_str), Some("4px"));
    }

    #[test]
    fn test_flags_override_config() {
        let mut cli = EnhancedCli::new();
        cli.config.strict = Some(true);
        cli.config.indent_width = Some(8);
        cli.config.custom_variables = Some(
            [("Gap".to_string(), "1px".to_string()), ("Tone".to_string(), "#000000".to_string())]
                .into_iter()
                .collect(),
        );

        let matches = compile_matches(&["icssc", "compile", "in.icss", "-D", "Gap=2px"]);
        let options = cli.build_compiler_options(&matches).unwrap();

        assert!(options.strict);
        assert_eq!(options.indent_width, 8);
        assert_eq!(options.custom_variables["Gap"], "2px");
        assert_eq!(options.custom_variables["Tone"], "#000000");
    }

    #[test]
    fn test_check_subcommand_options() {
        let cli = EnhancedCli::new();
        let matches = compile_matches(&["icssc", "check", "styles", "-r"]);
        let options = cli.build_compiler_options(&matches).unwrap();
        assert!(options.strict);
        assert!(!options.debug_mode);
    }
}
