// src/lib.rs

pub mod asset;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod watch;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{BuildConfig, load_and_validate};
use crate::dag::{TaskAction, TaskGraph};
use crate::engine::{LoopEvent, WatchCore, WatchLoop};
use crate::exec::AssetExecutor;
use crate::pipeline::StepRegistry;
use crate::server::{ReloadHandle, ServeOptions};
use crate::watch::{RoutingTable, WatchTarget};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the step registry
/// - the standard task graph
/// - one graph run covering every requested task
/// - (when a requested task needs it) dev server, watcher and watch loop
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config_path();
    let registry = StepRegistry::with_builtin_steps();
    let mut cfg = load_and_validate(&config_path, &registry)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(port) = args.port {
        cfg.serve.port = port;
    }

    let graph = tasks::standard_graph(&cfg, &registry)?;
    let requested = args.requested_tasks();

    // Resolve everything up front so a bad request fails before any I/O.
    let mut needs_server = false;
    for name in &requested {
        needs_server |= graph.requires_server(name)?;
    }

    if args.dry_run {
        print_dry_run(&cfg, &graph, &requested)?;
        return Ok(());
    }

    let names: Vec<&str> = requested.iter().map(String::as_str).collect();
    let report = graph.run_many(&names, args.force).await?;
    let written: usize = report.reports.iter().map(|r| r.written()).sum();
    info!(tasks = ?names, written, "build finished");

    if needs_server {
        serve(&cfg, &graph).await?;
    }
    Ok(())
}

/// Start the dev server on the destination tree and rebuild on source changes
/// until Ctrl-C.
async fn serve(cfg: &BuildConfig, graph: &TaskGraph) -> Result<()> {
    let reload = ReloadHandle::new();
    let server = server::start(
        cfg.resolve(&cfg.dist.base),
        ServeOptions {
            host: cfg.serve.host.clone(),
            port: Some(cfg.serve.port),
        },
        reload.clone(),
    )
    .await?;
    println!("Serving {} at {}", cfg.dist.base.display(), server.url());

    let (loop_tx, loop_rx) = mpsc::channel::<LoopEvent>(64);

    let watched = graph
        .asset_tasks()
        .into_iter()
        .filter(|(name, _)| tasks::WATCHED.contains(&name.as_str()))
        .collect();
    let executor = AssetExecutor::new(watched, loop_tx.clone());

    let mut targets = vec![
        WatchTarget::dir(&cfg.src.css),
        WatchTarget::dir(&cfg.src.js),
        WatchTarget::dir(&cfg.src.base),
    ];
    if let Some(utilities) = &cfg.config.utilities {
        targets.push(WatchTarget::file(utilities));
    }
    let _watcher = watch::spawn_watcher(
        &cfg.root,
        &targets,
        Duration::from_millis(cfg.serve.debounce_ms),
        loop_tx.clone(),
    )?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = loop_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(LoopEvent::Shutdown).await;
        });
    }
    drop(loop_tx);

    let routes = RoutingTable::from_config(cfg)?;
    // Deleting a partial leaves no newer mtime behind, so watch-triggered
    // style runs always rebuild.
    let core = WatchCore::new(routes, cfg.serve.reload_on.iter().cloned()).force_task(tasks::STYLES);

    WatchLoop::new(core, loop_rx, executor, reload).run().await?;
    server.shutdown().await
}

/// Print tasks, dependencies, routes and pipelines without touching files.
fn print_dry_run(cfg: &BuildConfig, graph: &TaskGraph, requested: &[String]) -> Result<()> {
    println!("assetpipe dry-run");
    println!("  root: {}", cfg.root.display());
    println!(
        "  serve: {}:{} (reload_on = {:?})",
        cfg.serve.host, cfg.serve.port, cfg.serve.reload_on
    );
    println!();

    println!("tasks ({}):", graph.tasks().count());
    for node in graph.tasks() {
        println!("  - {}", node.name);
        if !node.deps.is_empty() {
            println!("      after: {:?}", node.deps);
        }
        match &node.action {
            TaskAction::Asset(asset) => {
                println!("      source: {}", asset.source_root().display());
                for route in asset.routes() {
                    println!("      route: {:?}", route.patterns());
                    println!("        dest: {}", route.rule.dest_dir.display());
                    if let Some(rewrite) = &route.rule.rewrite {
                        println!("        rename: *{} -> *{}", rewrite.from, rewrite.to);
                    }
                    if route.pipeline.is_empty() {
                        println!("        pipeline: (copy)");
                    } else {
                        println!("        pipeline: {:?}", route.pipeline.step_names());
                    }
                }
            }
            TaskAction::Serve => println!("      action: dev server + watch"),
            TaskAction::Alias => {}
        }
    }
    println!();

    for name in requested {
        let plan = graph.resolve(name)?;
        println!("plan for {name}:");
        for (depth, level) in plan.levels.iter().enumerate() {
            println!("  {depth}: {}", level.join(", "));
        }
    }
    Ok(())
}
