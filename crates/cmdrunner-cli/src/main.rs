use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmdrunner_core::config::{self, CmdRunnerConfig};
use cmdrunner_core::platform::shell::{locate_shell, shell_for};
use cmdrunner_core::platform::{
    HostProbe, NativeProbe, PlatformCode, PlatformDetector, RuntimeVersion, StaticProbe,
};
use cmdrunner_core::report::DetectionReport;

#[derive(Parser)]
#[command(name = "cmdrunner", version, about = "Host platform detection for command runners")]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the detected platform and the evidence behind it.
    Platform {
        /// Output the report as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
        /// Path to cmdrunner.toml config file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Pretend the runtime reports this raw platform code.
        #[arg(long)]
        simulate_code: Option<u32>,
        /// Pretend the runtime has this version (MAJOR[.MINOR]).
        #[arg(long, value_parser = parse_runtime_version)]
        simulate_runtime: Option<RuntimeVersion>,
        /// Pretend the kernel release has this major number.
        #[arg(long)]
        simulate_kernel: Option<u32>,
        /// Pretend the alternate runtime marker is present (`=false` for absent).
        #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
        simulate_alternate: Option<bool>,
    },
    /// Print the shell a command runner would use on this host.
    Shell {
        /// Path to cmdrunner.toml config file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Resolve the shell program to a full path.
        #[arg(long)]
        locate: bool,
        /// Command line to wrap; prints the full argv, one item per line.
        command: Option<String>,
    },
}

/// Overrides applied on top of the native probe answers.
#[derive(Debug)]
struct Simulation {
    code: Option<u32>,
    runtime: Option<RuntimeVersion>,
    kernel: Option<u32>,
    alternate: Option<bool>,
}

impl Simulation {
    fn is_active(&self) -> bool {
        self.code.is_some()
            || self.runtime.is_some()
            || self.kernel.is_some()
            || self.alternate.is_some()
    }

    fn apply(&self, native: &dyn HostProbe) -> StaticProbe {
        let mut probe = StaticProbe::capture(native);
        if let Some(code) = self.code {
            probe.platform_code = PlatformCode(code);
        }
        if let Some(runtime) = self.runtime {
            probe.runtime_version = runtime;
        }
        if let Some(kernel) = self.kernel {
            probe.kernel_major = Some(kernel);
        }
        if let Some(alternate) = self.alternate {
            probe.alternate_runtime = alternate;
        }
        probe
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Some(Command::Platform {
            json,
            config,
            simulate_code,
            simulate_runtime,
            simulate_kernel,
            simulate_alternate,
        }) => {
            let simulation = Simulation {
                code: simulate_code,
                runtime: simulate_runtime,
                kernel: simulate_kernel,
                alternate: simulate_alternate,
            };
            run_platform(json, config.as_deref(), &simulation)
        }
        Some(Command::Shell {
            config,
            locate,
            command,
        }) => run_shell(config.as_deref(), locate, command.as_deref()),
        None => run_bare(),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_runtime_version(s: &str) -> std::result::Result<RuntimeVersion, String> {
    s.parse()
}

fn load_config(path: Option<&Path>) -> Result<CmdRunnerConfig> {
    match path {
        Some(path) => config::load_config(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(config::load_or_default()),
    }
}

fn native_probe(config: &CmdRunnerConfig) -> NativeProbe {
    NativeProbe::new(Some(&config.platform.alternate_runtime_marker))
}

fn run_bare() -> Result<ExitCode> {
    let config = config::load_or_default();
    let detector = PlatformDetector::new(native_probe(&config));
    println!("{}", detector.platform());
    Ok(ExitCode::SUCCESS)
}

fn run_platform(
    json_output: bool,
    config_path: Option<&Path>,
    simulation: &Simulation,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let native = native_probe(&config);

    let report = if simulation.is_active() {
        tracing::debug!(?simulation, "using simulated probe");
        DetectionReport::collect(simulation.apply(&native), &config)
    } else {
        DetectionReport::collect(native, &config)
    };

    if json_output {
        let json =
            serde_json::to_string_pretty(&report).context("failed to serialize detection report")?;
        println!("{json}");
    } else {
        for line in report.summary_lines() {
            println!("{line}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_shell(
    config_path: Option<&Path>,
    locate: bool,
    command: Option<&str>,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let detector = PlatformDetector::new(native_probe(&config));
    let platform = detector.platform();
    let mut shell = shell_for(platform, &config.shell);

    if locate {
        let path = locate_shell(platform, &config.shell)
            .with_context(|| format!("cannot run commands on {platform}"))?;
        shell.program = path.display().to_string();
    }

    match command {
        Some(command) => {
            for arg in shell.wrap(command) {
                println!("{arg}");
            }
        }
        None => {
            println!("{} {}", shell.program, shell.args.join(" "));
        }
    }

    Ok(ExitCode::SUCCESS)
}
