//! Interactive chat mode.
//!
//! Runs the full node — cache, filters, gossip — with a line-based
//! prompt. Bare lines publish; `!` lines are commands against the
//! local cache. Inbound messages print as they arrive.
//!
//! Exits on Ctrl+C or EOF; the engine is shut down gracefully either
//! way. Command errors print a usage line and never terminate the
//! session.

use std::sync::Arc;

use chrono::Utc;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use oln_node::{ChatEngine, Filters, MessageCache, NatsBus, SearchMode, DEFAULT_SUBJECT};
use oln_types::config::ChatConfig;
use oln_types::{OlnError, Result};

use crate::output;
use crate::ChatArgs;

/// Entries shown by `!list` without an argument.
const LIST_DEFAULT: usize = 10;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run(server: &str, args: ChatArgs) -> Result<()> {
    let rebroadcast =
        humantime::parse_duration(&args.rebroadcast).map_err(|e| OlnError::Config {
            reason: format!("invalid rebroadcast interval '{}': {e}", args.rebroadcast),
        })?;

    let config = ChatConfig {
        max_cache_size: args.max_cache,
        rebroadcast_secs: rebroadcast.as_secs(),
        auto_pow_bits: args.auto_pow,
    };

    let filters = parse_filters(&args);

    // Startup transport errors are fatal; the caller exits 1.
    let bus = Arc::new(NatsBus::connect(server, DEFAULT_SUBJECT).await?);
    let mut engine = ChatEngine::new(bus, config, filters.clone(), Default::default())?;
    engine.start().await?;

    let mut events = engine
        .take_event_receiver()
        .ok_or_else(|| OlnError::Config {
            reason: "event receiver already taken".into(),
        })?;
    let cache = engine.cache();

    print_banner(server, &filters);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    prompt();

    loop {
        tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => {
                        let input = line.trim();
                        if input.is_empty() {
                            prompt();
                            continue;
                        }
                        if input.starts_with('!') {
                            handle_command(input, &engine, &cache).await;
                        } else {
                            publish_line(&engine, input, 0).await;
                        }
                        prompt();
                    }
                    Ok(None) => break,
                    Err(e) => {
                        output::print_error(&format!("failed to read input: {e}"));
                        break;
                    }
                }
            }
            maybe = events.recv() => {
                if let Some(snapshot) = maybe {
                    output::print_entry(&snapshot);
                    prompt();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    engine.shutdown().await;
    println!("{}", "Goodbye.".dimmed());
    Ok(())
}

fn parse_filters(args: &ChatArgs) -> Filters {
    let mut filters = Filters::default();

    if let Some(tags) = &args.tag {
        for tag in tags.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() {
                filters.add_hashtag(tag);
            }
        }
    }

    if let Some(locations) = &args.location {
        for code in locations.split(',') {
            let code = code.trim();
            if code.is_empty() {
                continue;
            }
            if !oln_location::validate(code) {
                output::print_warning(&format!(
                    "'{code}' is not a valid pluscode — substring matching only"
                ));
            }
            filters.add_location(code);
        }
    }

    filters
}

fn print_banner(server: &str, filters: &Filters) {
    println!("OLN Chat Mode ({server})");
    if !filters.hashtags.is_empty() {
        println!("Hashtag filters: {}", filters.hashtags.join(", "));
    }
    if !filters.locations.is_empty() {
        println!("Location filters: {}", filters.locations.join(", "));
    }
    println!("Type messages and press Enter to send. Type !help for commands. Ctrl+C to exit.");
    println!("{}", "-".repeat(60));
}

fn prompt() {
    eprint!("> ");
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

/// Publishes operator text. Steady-state transport errors are
/// reported and dropped; the cache is untouched either way.
async fn publish_line(engine: &ChatEngine, text: &str, pow_bits: u32) {
    match engine.publish(text, pow_bits).await {
        Ok(outbound) => {
            println!("Published (hash: {})", output::short_hash(&outbound.hash));
        }
        Err(e) => output::print_error(&e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn handle_command(input: &str, engine: &ChatEngine, cache: &MessageCache) {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let cmd = parts[0];

    match cmd {
        "!pow" => {
            if parts.len() < 3 {
                println!("Usage: !pow <bits> <message>");
                return;
            }
            let bits = match parts[1].parse::<u32>() {
                Ok(bits) => bits,
                Err(_) => {
                    println!("Invalid bits value");
                    return;
                }
            };
            let message = parts[2..].join(" ");
            println!("Computing proof-of-work ({bits} bits)...");
            publish_line(engine, &message, bits).await;
        }

        "!list" => cmd_list(cache, parts.get(1).copied()),

        "!search" => cmd_search(cache, &parts),

        "!show" => match parts.get(1) {
            Some(prefix) => cmd_show(cache, prefix),
            None => println!("Usage: !show <hashprefix>"),
        },

        "!stats" => cmd_stats(cache),

        "!filter" => cmd_filter(cache, &parts),

        "!clear" => {
            let dropped = cache.clear();
            println!("Cache cleared ({dropped} messages dropped)");
        }

        "!help" => print_help(),

        _ => println!("Unknown command. Type !help for commands."),
    }
}

fn cmd_list(cache: &MessageCache, arg: Option<&str>) {
    let limit = match arg {
        None => Some(LIST_DEFAULT),
        Some("full") => None,
        Some(n) => match n.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                println!("Usage: !list [N|full]");
                return;
            }
        },
    };

    let total = cache.len();
    if total == 0 {
        println!("No messages cached");
        return;
    }

    let listed = cache.list(limit);
    println!("Cached messages ({} of {total}):", listed.len());
    let now = Utc::now();
    for (i, snapshot) in listed.iter().enumerate() {
        output::print_list_line(i + 1, snapshot, now);
    }
}

fn cmd_search(cache: &MessageCache, parts: &[&str]) {
    if parts.len() < 2 {
        println!("Usage: !search [tag|location|text] <query>");
        return;
    }

    let (mode, query) = match parts[1] {
        "tag" if parts.len() > 2 => (SearchMode::Tag, parts[2..].join(" ")),
        "location" if parts.len() > 2 => (SearchMode::Location, parts[2..].join(" ")),
        "text" if parts.len() > 2 => (SearchMode::Text, parts[2..].join(" ")),
        _ => (SearchMode::Any, parts[1..].join(" ")),
    };

    let results = cache.search(mode, &query);
    if results.is_empty() {
        println!("No matches for '{query}'");
        return;
    }

    println!("Matches for '{query}' ({}):", results.len());
    let now = Utc::now();
    for (i, snapshot) in results.iter().enumerate() {
        output::print_list_line(i + 1, snapshot, now);
    }
}

fn cmd_show(cache: &MessageCache, prefix: &str) {
    let matches = cache.find_by_prefix(prefix);
    let now = Utc::now();

    match matches.len() {
        0 => println!("No entry matches '{prefix}'"),
        1 => output::print_entry_detail(&matches[0], now),
        n => {
            println!("{n} entries match '{prefix}':");
            for (i, snapshot) in matches.iter().enumerate() {
                output::print_list_line(i + 1, snapshot, now);
            }
        }
    }
}

fn cmd_stats(cache: &MessageCache) {
    let stats = cache.stats(Utc::now());

    println!("Cache: {} / {} messages", stats.size, stats.max_size);

    if stats.hashtag_filters.is_empty() && stats.location_filters.is_empty() {
        println!("Filters: (none)");
    } else {
        if !stats.hashtag_filters.is_empty() {
            println!("Hashtag filters: {}", stats.hashtag_filters.join(", "));
        }
        if !stats.location_filters.is_empty() {
            println!("Location filters: {}", stats.location_filters.join(", "));
        }
    }

    if let Some(mean) = stats.mean_age_secs {
        println!(
            "Mean age: {}",
            output::format_age(chrono::Duration::seconds(mean))
        );
    }
    if let (Some(min), Some(max)) = (stats.min_priority, stats.max_priority) {
        println!("Priority range: {min} .. {max}");
    }
}

fn cmd_filter(cache: &MessageCache, parts: &[&str]) {
    let now = Utc::now();
    let usage = "Usage: !filter {add|remove|clear|show} {tag|location} [value]";

    match parts.get(1).copied() {
        Some("show") => {
            let filters = cache.filters();
            if filters.is_empty() {
                println!("No filters set");
            } else {
                if !filters.hashtags.is_empty() {
                    println!("Hashtag filters: {}", filters.hashtags.join(", "));
                }
                if !filters.locations.is_empty() {
                    println!("Location filters: {}", filters.locations.join(", "));
                }
            }
        }

        Some("add") => match (parts.get(2).copied(), parts.get(3).copied()) {
            (Some("tag"), Some(value)) => {
                if cache.add_filter_hashtag(value, now) {
                    println!("Added hashtag filter {value}");
                } else {
                    println!("Hashtag filter {value} already set");
                }
            }
            (Some("location"), Some(value)) => {
                if !oln_location::validate(value) {
                    output::print_warning(&format!(
                        "'{value}' is not a valid pluscode — substring matching only"
                    ));
                }
                if cache.add_filter_location(value, now) {
                    println!("Added location filter {value}");
                } else {
                    println!("Location filter {value} already set");
                }
            }
            _ => println!("{usage}"),
        },

        Some("remove") => match (parts.get(2).copied(), parts.get(3).copied()) {
            (Some("tag"), Some(value)) => {
                if cache.remove_filter_hashtag(value, now) {
                    println!("Removed hashtag filter {value}");
                } else {
                    println!("No such hashtag filter");
                }
            }
            (Some("location"), Some(value)) => {
                if cache.remove_filter_location(value, now) {
                    println!("Removed location filter {value}");
                } else {
                    println!("No such location filter");
                }
            }
            _ => println!("{usage}"),
        },

        Some("clear") => match parts.get(2).copied() {
            None => {
                cache.clear_filters(now);
                println!("All filters cleared");
            }
            Some("tag") => {
                cache.clear_filter_hashtags(now);
                println!("Hashtag filters cleared");
            }
            Some("location") => {
                cache.clear_filter_locations(now);
                println!("Location filters cleared");
            }
            Some(_) => println!("{usage}"),
        },

        _ => println!("{usage}"),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  !pow <bits> <message>                      - Send message with proof-of-work");
    println!("  !list [N|full]                             - List cached messages by priority");
    println!("  !search [tag|location|text] <query>        - Search the cache");
    println!("  !show <hashprefix>                         - Show one message in detail");
    println!("  !stats                                     - Cache and filter statistics");
    println!("  !filter {{add|remove|clear|show}} {{tag|location}} [value]");
    println!("                                             - Manage filters");
    println!("  !clear                                     - Empty the cache");
    println!("  !help                                      - Show this help");
}
