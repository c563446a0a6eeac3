//! GPU fit estimator for local LLM inference.
//!
//! Tells you whether a model of a given size, precision and context window
//! fits a set of GPUs, what it costs in host RAM, disk and power, and how
//! fast it should run.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{format_gb, format_pct, format_tps, format_watts, Cli};
use config::AppConfig;
use vramcheck::throughput::per_slot_tokens_per_second;
use vramcheck::{
    estimate, max_fitting_context, parameter_sweep, recommend_quantization, EstimationResult,
    GpuCatalog, ModelRequest, SearchParams, SweepResult, Verdict, CONTEXT_PRESETS,
};

fn main() -> Result<()> {
    let args = Cli::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    init_tracing(log_level);

    if let Some(source) = config.source() {
        debug!(path = %source.display(), "config source");
    }

    let catalog = config.build_catalog(args.catalog.as_deref())?;
    info!(gpus = catalog.len(), "catalog ready");

    if args.list_gpus {
        list_gpus(&catalog);
        return Ok(());
    }

    let request = args.to_request(&config.defaults)?;

    if args.sweep {
        return run_sweep(&args, &request, &catalog);
    }

    if args.recommend {
        return run_recommend(&args, &request, &catalog);
    }

    run_estimate(&args, &request, &catalog)
}

/// Initialize tracing; `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vramcheck={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn list_gpus(catalog: &GpuCatalog) {
    println!("{:<14} {:<28} {:>8} {:>10} {:>8}  {}", "KEY", "NAME", "VRAM", "TFLOPS", "TDP", "ARCH");
    for spec in catalog.sorted_for_display() {
        println!(
            "{:<14} {:<28} {:>8} {:>10.1} {:>8}  {}",
            spec.key,
            spec.name,
            format!("{:.0} GB", spec.vram_gb),
            spec.tflops,
            format_watts(spec.tdp_watts),
            spec.generation.name()
        );
    }
}

fn run_estimate(args: &Cli, request: &ModelRequest, catalog: &GpuCatalog) -> Result<()> {
    let result = estimate(request, catalog).context("Estimation failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_report(args, request, catalog, &result)
}

fn print_report(
    args: &Cli,
    request: &ModelRequest,
    catalog: &GpuCatalog,
    result: &EstimationResult,
) -> Result<()> {
    let cap = &result.capacity;

    println!("=== LLM GPU Fit Estimate ===\n");

    println!("Configuration:");
    println!("  Model:         {}B parameters", request.params_billions);
    println!("  Quantization:  {}", request.quantization.label());
    println!("  Context:       {} tokens", request.context_tokens);
    println!("  GPUs:          {}", result.gpu_config);
    println!();

    println!("--- {} ---", result.advisory.verdict.title());
    println!("  VRAM margin:   {:+.2} GB", cap.vram_margin_gb);
    println!(
        "  VRAM used:     {} of {} ({})",
        format_gb(cap.total_gpu_ram_gb),
        format_gb(cap.effective_vram_gb),
        format_pct(cap.total_gpu_ram_gb, cap.effective_vram_gb)
    );
    println!();

    println!("--- Memory ---");
    println!("  Weights:       {}", format_gb(cap.base_model_gb));
    println!("  KV-cache:      {}", format_gb(cap.kv_cache_gb));
    println!("  Total GPU RAM: {}", format_gb(cap.total_gpu_ram_gb));
    if args.verbose {
        println!("  Raw VRAM:      {}", format_gb(cap.total_available_vram_gb));
        println!("  Effective:     {}", format_gb(cap.effective_vram_gb));
    }
    println!();

    println!("--- System ---");
    println!(
        "  System RAM:    {} (minimum {}){}",
        format_gb(cap.total_system_ram_gb),
        format_gb(cap.minimum_system_ram_gb),
        if cap.system_requirements_met { "" } else { "  [below minimum]" }
    );
    println!("  Storage:       {}", format_gb(cap.storage_required_gb));
    println!("  CPU cores:     {}", cap.recommended_cores);
    println!();

    println!("--- Performance ---");
    println!("  Throughput:    {}", format_tps(result.tokens_per_second));
    if args.verbose {
        let per_slot = per_slot_tokens_per_second(request, catalog)?;
        for (i, tps) in per_slot.iter().enumerate() {
            if let Some(tps) = tps {
                println!("    slot {}:      {:.1} tok/s", i, tps);
            }
        }
    }
    println!();

    let power = &result.power;
    println!("--- Power ---");
    println!("  Total:         {}", format_watts(power.total_power_watts));
    for slot in &power.per_gpu_breakdown {
        println!(
            "  {}x {}: {} ({} each)",
            slot.count,
            slot.name,
            format_watts(slot.total_watts),
            format_watts(slot.per_unit_watts)
        );
    }
    println!("  System:        {}", format_watts(power.system_overhead_watts));
    println!("  Utilization:   {:.0}%", power.utilization_factor * 100.0);
    println!();

    if !result.advisory.warnings.is_empty() {
        println!("--- Warnings ---");
        for warning in &result.advisory.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    let suggestions = result.advisory.verdict.suggestions();
    if !suggestions.is_empty() {
        println!("--- Suggestions ---");
        for suggestion in suggestions {
            println!("  - {}", suggestion);
        }
        println!();
    }

    match result.advisory.verdict {
        Verdict::Compatible => println!("VERDICT: Fits with room to spare."),
        Verdict::Borderline => println!("VERDICT: Fits, but expect little headroom."),
        Verdict::Insufficient => println!("VERDICT: Does not fit. Try --recommend."),
    }

    Ok(())
}

fn run_recommend(args: &Cli, request: &ModelRequest, catalog: &GpuCatalog) -> Result<()> {
    let params = SearchParams {
        allow_borderline: args.allow_borderline,
    };

    let recommendation =
        recommend_quantization(request, catalog, &params).context("Quantization search failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
        return Ok(());
    }

    println!("=== Quantization Search ===\n");

    let Some(rec) = recommendation else {
        println!("No quantization fits {}B on this hardware.", request.params_billions);
        for suggestion in Verdict::Insufficient.suggestions() {
            println!("  - {}", suggestion);
        }
        return Ok(());
    };

    println!("  Configs evaluated: {}", rec.configs_evaluated);
    println!("  Rejected (VRAM):   {}", rec.configs_rejected);
    println!();

    println!("--- Best Precision Found ---");
    println!("  Quantization:  {}", rec.quantization.label());
    println!("  Verdict:       {}", rec.result.advisory.verdict.title());
    println!("  VRAM margin:   {:+.2} GB", rec.result.capacity.vram_margin_gb);
    println!("  Throughput:    {}", format_tps(rec.result.tokens_per_second));
    println!("  Power:         {}", format_watts(rec.result.power.total_power_watts));
    println!();

    let at_best = ModelRequest {
        quantization: rec.quantization,
        ..request.clone()
    };
    match max_fitting_context(&at_best, catalog, &CONTEXT_PRESETS, &params)? {
        Some(context) => println!("  Longest context that fits: {} tokens", context),
        None => println!("  No preset context fits at this precision."),
    }

    Ok(())
}

fn run_sweep(args: &Cli, request: &ModelRequest, catalog: &GpuCatalog) -> Result<()> {
    let quants = args.parse_sweep_quant()?;
    let contexts = args.parse_sweep_ctx();

    let results = parameter_sweep(request, catalog, &quants, &contexts).context("Sweep failed")?;

    // Output as CSV
    println!("{}", SweepResult::csv_header());
    for result in &results {
        println!("{}", result.to_csv());
    }
    Ok(())
}
