use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use swap_match::{MatchQuery, MatchResult, Matcher, SwapGroup};
use swap_server::{ServerConfig, StorageConfig, SwapServer};
use swap_store::{FileRequestStore, RequestStore, SyncMode};
use swap_types::{NewSwapRequest, SwapRequest};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Submit(args) => cmd_submit(args, format),
        Command::List(args) => cmd_list(args, format),
        Command::Matches(args) => cmd_matches(args, format),
    }
}

fn open_store(path: &Path) -> anyhow::Result<Arc<dyn RequestStore>> {
    let store = FileRequestStore::open(path, SyncMode::EveryWrite)
        .with_context(|| format!("opening request log {}", path.display()))?;
    Ok(Arc::new(store))
}

/// File config first, then command-line overrides.
fn serve_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.memory {
        config.storage = StorageConfig::Memory;
    } else if let Some(path) = &args.data {
        let sync = match &config.storage {
            StorageConfig::File { sync, .. } => *sync,
            StorageConfig::Memory => SyncMode::default(),
        };
        config.storage = StorageConfig::File { path: path.clone(), sync };
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = serve_config(&args)?;
    let server = SwapServer::open(config)?;
    println!(
        "{} Section Swap on {}",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold()
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_submit(args: SubmitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&args.store.data)?;
    let record = store.insert(NewSwapRequest::new(args.current, args.desired, args.contact))?;
    store.close()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("{} Request submitted", "✓".green().bold());
            println!("{}", render_record(&record));
        }
    }
    Ok(())
}

fn cmd_list(args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&args.store.data)?;
    let mut records = store.list_all()?;
    store.close()?;
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text if records.is_empty() => println!("No swap requests yet."),
        OutputFormat::Text => {
            for record in &records {
                println!("{}", render_record(record));
            }
        }
    }
    Ok(())
}

fn cmd_matches(args: MatchesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&args.store.data)?;
    let matcher = Matcher::new(Arc::clone(&store));
    let mut query = MatchQuery::new(args.current, args.desired);
    if let Some(contact) = args.contact {
        query = query.with_contact(contact);
    }
    let result = matcher.find_matches(&query)?;
    store.close()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => println!("{}", render_matches(&query, &result)),
    }
    Ok(())
}

fn render_record(record: &SwapRequest) -> String {
    format!(
        "{}  has {} wants {}  contact {}  ({})",
        record.id.short_id().dimmed(),
        record.current_section.yellow(),
        record.desired_section.cyan(),
        record.contact.bold(),
        record.created_at.format("%Y-%m-%d %H:%M"),
    )
}

fn render_group(index: usize, group: &SwapGroup) -> String {
    let p1 = &group.person1;
    let p2 = &group.person2;
    let p3 = &group.person3;
    format!(
        "Swap group #{}\n  you      has {} wants {}  contact {}\n  person 2 has {} wants {}  contact {}\n  person 3 has {} wants {}  contact {}",
        index + 1,
        p1.current_section.yellow(),
        p1.desired_section.cyan(),
        p1.contact.bold(),
        p2.current_section.yellow(),
        p2.desired_section.cyan(),
        p2.contact.bold(),
        p3.current_section.yellow(),
        p3.desired_section.cyan(),
        p3.contact.bold(),
    )
}

fn render_matches(query: &MatchQuery, result: &MatchResult) -> String {
    let mut lines = vec![format!(
        "You have {} and want {}.",
        query.current.yellow().bold(),
        query.desired.cyan().bold()
    )];
    match result {
        MatchResult::Direct(records) => {
            lines.push(format!("{} Direct match found", "✓".green().bold()));
            lines.extend(records.iter().map(render_record));
            lines.push("Contact them directly to arrange the swap.".to_string());
        }
        MatchResult::ThreeWay(groups) => {
            lines.push(format!("{} Three-way swap possible", "✓".green().bold()));
            lines.extend(groups.iter().enumerate().map(|(i, g)| render_group(i, g)));
        }
        MatchResult::NoMatch => {
            lines.push("No matches yet. Check again later.".to_string());
        }
    }
    lines.join("\n")
}
