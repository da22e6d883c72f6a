//! Minimal demonstration binary driving `embr::commands`. Flag parsing is
//! hand-rolled on purpose (`spec.md` §1 places a full CLI shell, with its
//! help text and flag spellings, out of scope); this only exercises the
//! library surface end to end.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use embr::commands;

fn repo_root() -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(embr::discover_root(&cwd).unwrap_or(cwd))
}

fn print_usage() {
    eprintln!(
        "usage: embr <init|set|switch|store|log|status|diff|push|pull|gc|merge|remote|rollback|rm|get|model|hooks|config> [args]"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let debug = embr_config::env::debug_enabled();
    embr::init_tracing(debug);

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }
    let command = args.remove(0);

    match command.as_str() {
        "init" => {
            let force = args.iter().any(|a| a == "--force");
            let no_git = args.iter().any(|a| a == "--no-git");
            commands::init(&std::env::current_dir()?, force, no_git, None)?;
            println!("initialized embr repository");
        }
        "set" => {
            let root = repo_root()?;
            match args.first() {
                Some(name) => {
                    commands::set_create(&root, name, None)?;
                    println!("created set '{name}'");
                }
                None => {
                    for info in commands::set_list(&root, true)? {
                        let marker = if info.is_current { "*" } else { " " };
                        println!("{marker} {}", info.name);
                    }
                }
            }
        }
        "switch" => {
            let root = repo_root()?;
            let name = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr switch <name>"))?;
            commands::switch(&root, name)?;
            println!("switched to '{name}'");
        }
        "store" => {
            let root = repo_root()?;
            let file = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr store <file> [--model M]"))?;
            let model = args
                .iter()
                .position(|a| a == "--model")
                .and_then(|i| args.get(i + 1))
                .map(String::as_str)
                .unwrap_or("unknown");
            let outcome = commands::store_file(&root, std::path::Path::new(file), model, false)?;
            println!(
                "{} ({})",
                outcome.hash,
                if outcome.created { "new" } else { "already stored" }
            );
        }
        "log" => {
            let root = repo_root()?;
            let source = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr log <source>"))?;
            for entry in commands::log(&root, source)? {
                println!("{} {} {}", entry.id, entry.timestamp, entry.hash);
            }
        }
        "status" => {
            let root = repo_root()?;
            let status = commands::status(&root)?;
            println!(
                "on set {} ({} tracked sources)",
                status.current_set, status.tracked_sources
            );
        }
        "diff" => {
            let root = repo_root()?;
            let source = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr diff <source>"))?;
            match commands::diff(&root, source)? {
                Some(entry) => match entry.from {
                    Some(from) => println!("{from} -> {}", entry.to),
                    None => println!("(new) -> {}", entry.to),
                },
                None => println!("no history for '{source}'"),
            }
        }
        "push" => {
            let root = repo_root()?;
            let force = args.iter().any(|a| a == "--force");
            args.retain(|a| a != "--force");
            let remote = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr push [--force] <remote> [<set>]"))?;
            let set = args.get(1).map(String::as_str);
            let report = commands::push(&root, remote, set, force).await?;
            println!(
                "pushed {} object(s), {} failure(s)",
                report.pushed,
                report.failed.len()
            );
        }
        "pull" => {
            let root = repo_root()?;
            let prune = args.iter().any(|a| a == "--prune");
            args.retain(|a| a != "--prune");
            let remote = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr pull [--prune] <remote> [<set>]"))?;
            let set = args.get(1).map(String::as_str);
            let report = commands::pull(&root, remote, set, prune).await?;
            println!(
                "pulled {} object(s), pruned {}, {} failure(s)",
                report.pulled,
                report.pruned,
                report.failed.len()
            );
        }
        "gc" => {
            let root = repo_root()?;
            let prune_expire = args
                .iter()
                .find_map(|a| a.strip_prefix("--prune="))
                .map(String::from);
            let aggressive = args.iter().any(|a| a == "--aggressive");
            let result = commands::gc(&root, prune_expire.as_deref(), aggressive)?;
            println!(
                "removed {} object(s), freed {} bytes",
                result.objects_removed, result.bytes_freed
            );
        }
        "merge" => {
            let root = repo_root()?;
            let strategy = args
                .iter()
                .find_map(|a| a.strip_prefix("--strategy="))
                .unwrap_or("union")
                .to_string();
            args.retain(|a| !a.starts_with("--strategy="));
            let source = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr merge <source> [<target>]"))?;
            let target = args.get(1).map(String::as_str);
            let report = commands::merge(&root, source, target, &strategy)?;
            println!("copied {}, kept {}", report.copied, report.kept);
        }
        "remote" => {
            let root = repo_root()?;
            match args.first().map(String::as_str) {
                Some("add") => {
                    let name = args
                        .get(1)
                        .ok_or_else(|| anyhow::anyhow!("usage: embr remote add <name> <url>"))?;
                    let url = args
                        .get(2)
                        .ok_or_else(|| anyhow::anyhow!("usage: embr remote add <name> <url>"))?;
                    commands::remote_add(&root, name, url)?;
                }
                Some("remove") => {
                    let name = args
                        .get(1)
                        .ok_or_else(|| anyhow::anyhow!("usage: embr remote remove <name>"))?;
                    commands::remote_remove(&root, name)?;
                }
                _ => {
                    for (name, url) in commands::remote_list(&root)? {
                        println!("{name}\t{url}");
                    }
                }
            }
        }
        "rollback" => {
            let root = repo_root()?;
            let source = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr rollback <source> <version>"))?;
            let version: u64 = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("usage: embr rollback <source> <version>"))?
                .parse()?;
            let hash = commands::rollback(&root, source, version)?;
            println!("rolled back to {hash}");
        }
        "rm" => {
            let root = repo_root()?;
            let force = args.iter().any(|a| a == "--force");
            args.retain(|a| a != "--force");
            let hash = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr rm [--force] <hash>"))?;
            commands::rm(&root, hash, force)?;
            println!("removed {hash}");
        }
        "get" => {
            let root = repo_root()?;
            let hash = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr get <hash>"))?;
            let outcome = commands::get(&root, hash)?;
            std::io::stdout().write_all(&outcome.payload)?;
        }
        "model" => {
            let root = repo_root()?;
            let source = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr model <source>"))?;
            match commands::model(&root, source)? {
                Some(model) => println!("{model}"),
                None => println!("(no model recorded)"),
            }
        }
        "hooks" => {
            let root = repo_root()?;
            let name = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("usage: embr hooks <name> <command>"))?;
            let command_line = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("usage: embr hooks <name> <command>"))?;
            commands::hooks_install(&root, name, command_line)?;
            println!("installed hook '{name}'");
        }
        "config" => {
            let root = repo_root()?;
            let config = commands::config(&root)?;
            println!("compression_level={}", config.core.compression_level);
            println!("normalize={}", config.core.normalize);
            if let Some(provider) = &config.model.default_provider {
                println!("default_provider={provider}");
            }
        }
        other => {
            eprintln!("unknown command '{other}'");
            print_usage();
        }
    }

    Ok(())
}
