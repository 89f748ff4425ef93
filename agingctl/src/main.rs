//! # agingctl - Main Entry Point
//!
//! Supports two commands:
//! - **resolve**: look up the accessor symbols in kallsyms or an ELF image
//! - **simulate**: load the module against an in-memory fuel gauge, drive
//!   host reads and control commands, and optionally export a JSON report

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use agingctl::cli::{Args, Command, ResolveArgs, SimulateArgs};
use agingctl::domain::AgingLevel;
use agingctl::export::{ReportEvent, SessionReport};
use agingctl::hook::InterceptionTable;
use agingctl::preflight::{check_symbol_source, run_preflight_checks};
use agingctl::provision::ServiceScript;
use agingctl::sim::SimulatedFuelGauge;
use agingctl::symbols::{ElfSymbols, Kallsyms, SymbolResolver};
use agingctl::{AgingModule, ModuleOptions};
use agingctl_common::{
    AGING_LEVEL_OFFSET, AGING_LEVEL_WORD, SRAM_READ_SYMBOL, SRAM_WRITE_SYMBOL,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use log::{info, warn};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("out of range") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Resolve(resolve) => run_resolve(&resolve, args.quiet),
        Command::Simulate(simulate) => run_simulate(&simulate, args.quiet),
    }
}

// ── resolve ─────────────────────────────────────────────────────────────

fn load_resolver(args: &ResolveArgs, quiet: bool) -> Result<Box<dyn SymbolResolver>> {
    if let Some(ref elf) = args.elf {
        check_symbol_source(elf)?;
        return Ok(Box::new(ElfSymbols::load(elf)?));
    }

    run_preflight_checks(&args.kallsyms, quiet)?;
    let syms = Kallsyms::load(&args.kallsyms)?;
    if syms.is_restricted() {
        bail!(
            "Permission denied: every address in {} reads as zero.\n\n\
             Reading kernel addresses requires root (and kernel.kptr_restrict < 2)",
            args.kallsyms.display()
        );
    }
    Ok(Box::new(syms))
}

fn run_resolve(args: &ResolveArgs, quiet: bool) -> Result<()> {
    let resolver = load_resolver(args, quiet)?;

    let names: Vec<&str> = if args.names.is_empty() {
        vec![SRAM_READ_SYMBOL, SRAM_WRITE_SYMBOL]
    } else {
        args.names.iter().map(String::as_str).collect()
    };

    let mut missing = Vec::new();
    for name in names {
        match agingctl::symbols::resolve(resolver.as_ref(), name) {
            Ok(addr) => println!("{addr} {name}"),
            Err(_) => {
                println!("{:>18} {name}", "-");
                missing.push(name);
            }
        }
    }

    if !missing.is_empty() {
        bail!("Symbol not found: {}", missing.join(", "));
    }
    Ok(())
}

// ── simulate ────────────────────────────────────────────────────────────

fn run_commands(
    module: &AgingModule,
    commands: &[String],
    report: &mut SessionReport,
    quiet: bool,
) {
    for arg in commands.iter().map(String::as_str) {
        let mut out = [0u8; agingctl_common::STATUS_MSG_LEN];
        let outcome = module.control_outcome(Some(arg), Some(&mut out)).ok();
        let code = outcome
            .as_ref()
            .map_or(-1, agingctl::control::ControlOutcome::code);
        if !quiet {
            match outcome {
                Some(ref o) => println!(
                    "control {arg:?} -> {code}: {}",
                    o.status().as_str().trim_end()
                ),
                None => println!("control {arg:?} -> {code}: rejected"),
            }
        }
        report.push(ReportEvent::control(Some(arg), outcome.as_ref()));
    }
}

/// Perform `reads` host calls to `fg_sram_read`, spread over `threads`
fn run_host_reads(
    gauge: &SimulatedFuelGauge,
    hooks: &InterceptionTable,
    reads: usize,
    threads: usize,
    report: &mut SessionReport,
    quiet: bool,
) {
    let threads = threads.clamp(1, reads.max(1));
    let (tx, rx) = unbounded();

    std::thread::scope(|scope| {
        for worker in 0..threads {
            let tx = tx.clone();
            scope.spawn(move || {
                let mine = (worker..reads).step_by(threads).count();
                for _ in 0..mine {
                    let (rc, bytes) =
                        gauge.read_sram(hooks, AGING_LEVEL_WORD, AGING_LEVEL_OFFSET, 1);
                    let _ = tx.send((worker, rc, bytes));
                }
            });
        }
    });
    drop(tx);

    for (worker, rc, bytes) in rx {
        if !quiet {
            println!("host read (thread {worker}): rc={rc} value={bytes:?}");
        }
        report.push(ReportEvent::HostRead {
            thread: worker,
            rc,
            value: bytes,
        });
    }
}

/// Arm the gauge so the first control command's write fails with `-errno`
fn inject_failure(gauge: &SimulatedFuelGauge, errno: Option<i32>) {
    if let Some(errno) = errno {
        gauge.fail_next_write(-errno);
        warn!("Next SRAM write will fail with -{errno}");
    }
}

fn run_simulate(args: &SimulateArgs, quiet: bool) -> Result<()> {
    let initial = AgingLevel::parse_arg(args.level.as_deref())?;

    let gauge = Arc::new(SimulatedFuelGauge::default());
    let hooks = Arc::new(InterceptionTable::new());
    let env = gauge.host_env(Arc::clone(&hooks));
    let options = ModuleOptions {
        provision: args.provision_dir.clone().map(ServiceScript::in_dir),
    };

    let module = AgingModule::init(&env, &options, args.level.as_deref())
        .context("Module start-up failed")?;

    if !quiet {
        println!("agingctl v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "{SRAM_READ_SYMBOL}: {} (armed: {})",
            module.read_fn(),
            module.is_armed()
        );
        println!("{SRAM_WRITE_SYMBOL}: {}", module.write_fn());
        println!("initial level: {initial}");
    }

    let mut report = SessionReport::new(initial);

    if args.before_capture {
        inject_failure(&gauge, args.fail_rc);
        run_commands(&module, &args.set, &mut report, quiet);
    }
    run_host_reads(
        &gauge,
        &hooks,
        args.reads,
        args.threads,
        &mut report,
        quiet,
    );
    if !args.before_capture {
        inject_failure(&gauge, args.fail_rc);
        run_commands(&module, &args.set, &mut report, quiet);
    }

    let code = module.exit();
    report.push(ReportEvent::Teardown {
        code,
        armed_after: module.is_armed(),
    });
    report.finish(module.level(), module.handle(), module.phase());
    info!(
        "Session done: {} original reads, {} write attempts",
        gauge.original_reads(),
        gauge.write_attempts()
    );

    if !quiet {
        println!("teardown -> {code}");
        println!("final level: {}", module.level());
        println!("device: {}", module.handle());
        println!("phase: {}", module.phase());
    }

    if let Some(ref path) = args.export {
        export_report(&report, path)?;
        if !quiet {
            println!("report: {}", path.display());
        }
    }
    Ok(())
}

fn export_report(report: &SessionReport, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    report.export(BufWriter::new(file))
}
