//! CLI argument definitions

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "agingctl",
    version,
    about = "Capture the fuel-gauge device and control the battery aging level",
    after_help = "\
EXAMPLES:
    sudo agingctl resolve                          Look up fg_sram_read/fg_sram_write in /proc/kallsyms
    agingctl resolve --elf ./vmlinux               Look up the accessors in an ELF image
    agingctl simulate --level 3 --set 2 --set 7    Run a module session against a simulated gauge"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve accessor symbols
    Resolve(ResolveArgs),
    /// Load the module against a simulated fuel gauge and drive it
    Simulate(SimulateArgs),
}

#[derive(ClapArgs)]
pub struct ResolveArgs {
    /// Symbols to resolve (default: fg_sram_read fg_sram_write)
    #[arg(value_name = "SYMBOL")]
    pub names: Vec<String>,

    /// kallsyms-format symbol file
    #[arg(
        long,
        value_name = "FILE",
        default_value = "/proc/kallsyms",
        conflicts_with = "elf"
    )]
    pub kallsyms: PathBuf,

    /// ELF image to read symbols from instead of kallsyms
    #[arg(long, value_name = "FILE")]
    pub elf: Option<PathBuf>,
}

#[derive(ClapArgs)]
pub struct SimulateArgs {
    /// Start-up argument: initial aging level (0-5)
    #[arg(short, long, value_name = "LEVEL")]
    pub level: Option<String>,

    /// Control command argument to issue after capture (repeatable)
    #[arg(short, long = "set", value_name = "LEVEL")]
    pub set: Vec<String>,

    /// Issue control commands before the first host read
    #[arg(long)]
    pub before_capture: bool,

    /// Host reads of fg_sram_read to perform
    #[arg(long, default_value = "2")]
    pub reads: usize,

    /// Threads the host reads are spread over
    #[arg(long, default_value = "1")]
    pub threads: usize,

    /// Make the first control command's write fail with -ERRNO
    #[arg(
        long,
        value_name = "ERRNO",
        value_parser = clap::value_parser!(i32).range(1..=4095)
    )]
    pub fail_rc: Option<i32>,

    /// Provision the companion service script under this directory
    #[arg(long, value_name = "DIR")]
    pub provision_dir: Option<PathBuf>,

    /// Export a JSON session report to file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate() {
        let args = Args::try_parse_from([
            "agingctl",
            "simulate",
            "--level",
            "3",
            "--set",
            "2",
            "--set",
            "7",
            "--threads",
            "4",
        ])
        .unwrap();
        let Command::Simulate(sim) = args.command else {
            panic!("expected simulate");
        };
        assert_eq!(sim.level.as_deref(), Some("3"));
        assert_eq!(sim.set, vec!["2", "7"]);
        assert_eq!(sim.threads, 4);
        assert_eq!(sim.reads, 2);
    }

    #[test]
    fn test_resolve_rejects_both_sources() {
        let result = Args::try_parse_from([
            "agingctl",
            "resolve",
            "--kallsyms",
            "/tmp/k",
            "--elf",
            "/tmp/vmlinux",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fail_rc_range() {
        let parse = |value: &str| {
            Args::try_parse_from(["agingctl", "simulate", "--fail-rc", value]).map(|args| {
                let Command::Simulate(sim) = args.command else {
                    panic!("expected simulate");
                };
                sim.fail_rc
            })
        };
        assert_eq!(parse("5").unwrap(), Some(5));
        assert_eq!(parse("4095").unwrap(), Some(4095));
        assert!(parse("0").is_err());
        assert!(parse("-5").is_err());
        assert!(parse("4096").is_err());
    }
}
