//! xlikes - liked-posts sync and search CLI
//!
//! Main entry point for the xlikes command-line tool.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use xlikes::logging::init_cli_logging;
use xlikes::*;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logging(cli.quiet, cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("cannot load config from {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(db) = &cli.db {
        config.paths.db = Some(db.clone());
    }

    let service = LikesService::from_config(&config)?;

    match &cli.command {
        Commands::Sync(args) => cmd_sync(&cli, &config, &service, args),
        Commands::Import(args) => cmd_import(&cli, &service, args),
        Commands::Search(args) => cmd_search(&cli, &service, args),
        Commands::Tweet(args) => cmd_tweet(&cli, &service, args),
        Commands::Categories => cmd_categories(&cli, &service),
        Commands::Stats => cmd_stats(&cli, &service),
        Commands::Log(args) => cmd_log(&cli, &service, args),
        Commands::Publish(args) => cmd_publish(&cli, &config, &service, args),
        Commands::Config(args) => cmd_config(&config, &service, args),
    }
}

fn ensure_db_parent(service: &LikesService) -> Result<()> {
    if let Some(parent) = service.db_path().parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn cmd_sync(cli: &Cli, config: &Config, service: &LikesService, args: &cli::SyncArgs) -> Result<()> {
    ensure_db_parent(service)?;
    let client = ApiClient::new(&config.upstream)?;
    let mode = if args.full {
        SyncMode::Full
    } else {
        SyncMode::Incremental
    };

    if !cli.quiet {
        println!("{}", format!("Starting {mode} sync...").bold().cyan());
    }
    let report = service.run_sync(&client, mode)?;
    print_report(cli, &report)?;

    if report.status == SyncStatusKind::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_import(cli: &Cli, service: &LikesService, args: &cli::ImportArgs) -> Result<()> {
    ensure_db_parent(service)?;
    let items = parser::parse_likes_file(&args.file)?;
    if !cli.quiet {
        println!(
            "Importing {} items from {}...",
            format_number(items.len() as u64).cyan(),
            args.file.display()
        );
    }
    let report = service.import_batch(&items)?;
    print_report(cli, &report)
}

fn print_report(cli: &Cli, report: &SyncReport) -> Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(report)?),
        _ => {
            let badge = match report.status {
                SyncStatusKind::Success => "SUCCESS".green(),
                SyncStatusKind::Partial => "PARTIAL".yellow(),
                SyncStatusKind::Error => "ERROR".red(),
            };
            println!("{} {}", badge.bold(), report.message);
            println!(
                "  fetched {}  inserted {}  skipped {}  failed {}",
                format_number(report.counts.fetched),
                format_number(report.counts.inserted).green(),
                format_number(report.counts.skipped).dimmed(),
                format_number(report.counts.failed).red()
            );
        }
    }
    Ok(())
}

fn cmd_search(cli: &Cli, service: &LikesService, args: &cli::SearchArgs) -> Result<()> {
    let category_ids = resolve_category_ids(service, &args.category)?;

    let query = TweetQuery {
        q: args.query.clone(),
        category_ids,
        author: args.author.clone(),
        sort: match args.sort {
            SortField::CreatedAt => SortKey::CreatedAt,
            SortField::Favorites => SortKey::FavoriteCount,
            SortField::Retweets => SortKey::RetweetCount,
        },
        order: if args.asc {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        },
        page: args.page,
        per_page: args.per_page.unwrap_or(0),
    };

    let page = service.query_tweets(query)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&page)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Compact => {
            for t in &page.tweets {
                println!("{} @{} | {}", t.id, t.author_handle, truncate(&t.text, 100));
            }
        }
        OutputFormat::Text => {
            if page.tweets.is_empty() {
                println!("{}", "No results found.".yellow());
                return Ok(());
            }
            println!(
                "{} results (page {} of {}):\n",
                format_number(page.total).cyan(),
                page.page,
                page.total_pages
            );
            let offset = u64::from(page.page - 1) * u64::from(page.per_page);
            for (i, t) in page.tweets.iter().enumerate() {
                print_tweet_summary(offset + i as u64 + 1, t);
            }
        }
    }

    Ok(())
}

fn resolve_category_ids(service: &LikesService, names: &[String]) -> Result<Vec<i64>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let known = service.list_categories()?;
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        match known.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
            Some(c) => ids.push(c.id),
            None => anyhow::bail!(
                "Unknown category '{}'. Known categories: {}",
                name,
                known
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
    Ok(ids)
}

fn print_tweet_summary(num: u64, tweet: &LikedTweet) {
    println!(
        "{}. @{} {}",
        num.to_string().dimmed(),
        tweet.author_handle.green(),
        tweet.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
    );
    for line in tweet.text.lines() {
        println!("   {line}");
    }
    if !tweet.categories.is_empty() {
        println!("   {}", tweet.categories.join(", ").blue());
    }
    println!();
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        // Find a valid UTF-8 char boundary to avoid panic on multi-byte chars
        let mut end = max_len.saturating_sub(3);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

fn cmd_tweet(cli: &Cli, service: &LikesService, args: &cli::TweetArgs) -> Result<()> {
    match service.get_tweet(&args.id) {
        Ok(t) => {
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&t)?),
                OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&t)?),
                _ => {
                    println!("{}", "─".repeat(60));
                    println!("{}", t.text);
                    println!("{}", "─".repeat(60));
                    println!(
                        "  @{} ({})  {}",
                        t.author_handle.green(),
                        t.author_name,
                        t.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
                    );
                    println!(
                        "  {} likes  {} retweets",
                        format_number(t.favorite_count.max(0) as u64).cyan(),
                        format_number(t.retweet_count.max(0) as u64).cyan()
                    );
                    if !t.categories.is_empty() {
                        println!("  Categories: {}", t.categories.join(", ").blue());
                    }
                    println!("  {}", t.url.dimmed());
                }
            }
            Ok(())
        }
        Err(XlikesError::NotFound { .. }) => {
            println!("{}", format!("Tweet {} not found.", args.id).red());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_categories(cli: &Cli, service: &LikesService) -> Result<()> {
    let stats = service.stats()?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&stats.categories)?),
        OutputFormat::JsonPretty => {
            println!("{}", serde_json::to_string_pretty(&stats.categories)?);
        }
        _ => {
            if stats.categories.is_empty() {
                println!("{}", "No categories yet. Run 'xlikes sync' first.".yellow());
                return Ok(());
            }
            println!("{}", "Categories".bold().cyan());
            for c in &stats.categories {
                println!("  {:<24} {:>8}", c.name, format_number(c.count));
            }
        }
    }
    Ok(())
}

fn cmd_stats(cli: &Cli, service: &LikesService) -> Result<()> {
    let stats = service.stats()?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&stats)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => {
            println!("{}", "Liked Posts Statistics".bold().cyan());
            println!("{}", "─".repeat(40));
            println!(
                "  {:<20} {:>10}",
                "Liked posts:",
                format_number(stats.total_tweets)
            );
            println!(
                "  {:<20} {:>10}",
                "Distinct authors:",
                format_number(stats.distinct_authors)
            );
            println!("{}", "─".repeat(40));

            if let (Some(first), Some(last)) = (stats.first_liked_at, stats.last_liked_at) {
                println!(
                    "  Oldest like: {}",
                    first.format("%Y-%m-%d").to_string().green()
                );
                println!(
                    "  Newest like: {}",
                    last.format("%Y-%m-%d").to_string().green()
                );
            }

            if !stats.categories.is_empty() {
                println!("\n{}", "By category".bold());
                for c in &stats.categories {
                    println!("  {:<24} {:>8}", c.name, format_number(c.count));
                }
            }

            if !stats.top_authors.is_empty() {
                println!("\n{}", "Top authors".bold());
                for a in &stats.top_authors {
                    println!(
                        "  @{:<23} {:>8}",
                        a.handle.green(),
                        format_number(a.count)
                    );
                }
            }
        }
    }
    Ok(())
}

fn cmd_log(cli: &Cli, service: &LikesService, args: &cli::LogArgs) -> Result<()> {
    let entries = service.recent_sync_log(args.limit)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&entries)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => {
            if entries.is_empty() {
                println!("{}", "No sync runs recorded yet.".yellow());
                return Ok(());
            }
            println!("{}", "Recent sync runs".bold().cyan());
            for e in &entries {
                let badge = match e.status {
                    SyncStatusKind::Success => "ok ".green(),
                    SyncStatusKind::Partial => "part".yellow(),
                    SyncStatusKind::Error => "err ".red(),
                };
                println!(
                    "  {} [{}] +{} new / {} fetched  {}",
                    e.synced_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                    badge,
                    format_number(e.inserted),
                    format_number(e.fetched),
                    e.message.dimmed()
                );
            }
        }
    }
    Ok(())
}

fn cmd_publish(
    cli: &Cli,
    config: &Config,
    service: &LikesService,
    args: &cli::PublishArgs,
) -> Result<()> {
    let client = ApiClient::new(&config.upstream)?;
    let published = service.publish(&client, &args.text)?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&published)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&published)?),
        _ => {
            println!("{} Published post {}", "✓".green(), published.id.cyan());
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, service: &LikesService, args: &cli::ConfigArgs) -> Result<()> {
    if args.init {
        let path = Config::user_config_path()
            .context("cannot determine the user configuration directory")?;
        if path.exists() {
            println!("Configuration already exists at {}", path.display());
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, Config::default_config_content())?;
            println!("{} Wrote default configuration to {}", "✓".green(), path.display());
        }
        return Ok(());
    }

    println!("{}", "Current Configuration".bold().cyan());
    println!("  Database: {}", service.db_path().display());
    println!("  API base: {}", config.upstream.base_url);
    println!(
        "  Bearer token: {}",
        if config.upstream.bearer_token.is_some() {
            "set".green()
        } else {
            "not set".red()
        }
    );
    println!(
        "  User id: {}",
        config.upstream.user_id.as_deref().unwrap_or("not set")
    );
    println!("  Page size: {}", config.sync.page_size);
    println!(
        "  Incremental page cap: {}",
        config.sync.incremental_max_pages
    );
    Ok(())
}
