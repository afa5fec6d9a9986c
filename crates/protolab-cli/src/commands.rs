use anyhow::Context;
use colored::{ColoredString, Colorize};

use protolab_ancestor::SharedAncestor;
use protolab_guard::GuardConfig;
use protolab_harness::{
    battery, AncestorMode, BatteryReport, GuardPass, HarnessConfig, ScenarioHarness,
    ScenarioResult, ScenarioTarget, Verdict,
};
use protolab_merge::MergeConfig;
use protolab_server::{ProtolabServer, ServerConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Battery(args) => cmd_battery(args, cli.format),
        Command::Scenarios => cmd_scenarios(cli.format),
        Command::Merge(args) => cmd_merge(args, cli.format),
        Command::Serve(args) => cmd_serve(args),
    }
}

fn verdict_label(verdict: Verdict) -> ColoredString {
    match verdict {
        Verdict::Reproduced => verdict.as_str().red().bold(),
        Verdict::Contaminated => verdict.as_str().yellow().bold(),
        Verdict::Clean => verdict.as_str().green(),
        Verdict::EngineFailure => verdict.as_str().magenta(),
    }
}

fn guard_label(enabled: bool) -> ColoredString {
    if enabled { "guarded".green() } else { "unguarded".dimmed() }
}

fn print_result(result: &ScenarioResult) {
    println!(
        "  {:<28} {:<10} {:<16} {}",
        result.name.bold(),
        guard_label(result.guard_enabled),
        result.strategy_used.as_str().cyan(),
        verdict_label(result.verdict),
    );
    for (name, value) in &result.watched {
        println!("      {} {} = {}", "exposed".red(), name.yellow(), value);
    }
    if let Some(error) = &result.error {
        println!("      {} {}", "error".magenta(), error);
    }
}

fn print_report(report: &BatteryReport) {
    println!(
        "Battery {} ({} ancestor)",
        report.run_id.to_string().dimmed(),
        report.ancestor_mode.as_str().bold()
    );
    for result in &report.results {
        print_result(result);
    }
    let s = &report.summary;
    println!(
        "\n{} scenarios: {} reproduced, {} contaminated, {} clean, {} engine failures",
        s.total.to_string().bold(),
        s.reproduced.to_string().red(),
        s.contaminated.to_string().yellow(),
        s.clean.to_string().green(),
        s.engine_failures,
    );
    let escapes = report.guard_escapes().count();
    if escapes > 0 {
        println!("{} {} guarded run(s) still contaminated the ancestor", "!".red().bold(), escapes);
    }
}

fn cmd_battery(args: BatteryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = HarnessConfig {
        guard: GuardConfig::default(),
        mode: if args.scoped { AncestorMode::Scoped } else { AncestorMode::Shared },
        ..HarnessConfig::default()
    };
    let mut harness = ScenarioHarness::new(SharedAncestor::new(), config)?;
    let report = harness.run_battery(&args.passes())?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn cmd_scenarios(format: OutputFormat) -> anyhow::Result<()> {
    let scenarios = battery();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&scenarios)?),
        OutputFormat::Text => {
            for scenario in &scenarios {
                let target = match scenario.target {
                    ScenarioTarget::Fresh => "fresh",
                    ScenarioTarget::Ancestor => "ancestor",
                };
                println!(
                    "{:<28} {:<14} {:<9} {}",
                    scenario.name.bold(),
                    scenario.strategy.as_str().cyan(),
                    target,
                    scenario.advisory.as_deref().unwrap_or("-").yellow(),
                );
                println!("    {}", scenario.payload);
            }
        }
    }
    Ok(())
}

fn cmd_merge(args: MergeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let payload = serde_json::from_str(&args.payload).context("payload is not valid JSON")?;
    let config = HarnessConfig {
        merge: MergeConfig::with_max_depth(args.max_depth),
        guard: GuardConfig::default(),
        ..HarnessConfig::default()
    };
    let target = if args.ancestor_target { ScenarioTarget::Ancestor } else { ScenarioTarget::Fresh };
    let pass = if args.guard { GuardPass::Guarded } else { GuardPass::Unguarded };

    let mut harness = ScenarioHarness::new(SharedAncestor::new(), config)?;
    let result = harness.run_adhoc(args.strategy, target, payload, pass)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            print_result(&result);
            if let Some(merged) = &result.merged {
                println!("  {} {}", "merged:".dimmed(), merged);
            }
            for record in &result.records {
                println!(
                    "  {} {}.{} = {} ({:?})",
                    "landed:".red(),
                    record.holder,
                    record.key.yellow(),
                    record.value,
                    record.source,
                );
            }
            for path in &result.dangerous_paths {
                println!("  {} {}", "dangerous path:".yellow(), path);
            }
        }
    }
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.guard {
        config.guard = GuardConfig::default();
    }
    if args.scoped {
        config.ancestor_mode = AncestorMode::Scoped;
    }

    println!(
        "{} protolab server on {} ({} ancestor, {})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        config.ancestor_mode.as_str(),
        guard_label(config.guard.enabled),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(ProtolabServer::new(config).serve())?;
    Ok(())
}
