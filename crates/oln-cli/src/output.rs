//! Terminal rendering for messages, cache listings, and errors.

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;

use oln_node::EntrySnapshot;
use oln_types::Message;

/// Short form of a content hash for display.
pub fn short_hash(hash: &str) -> &str {
    if hash.len() >= 8 {
        &hash[..8]
    } else {
        hash
    }
}

/// Prints an error line. Never terminates the session.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "error:".red().bold(), msg);
}

/// Prints a warning line.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

// ---------------------------------------------------------------------------
// Wire messages (listen mode)
// ---------------------------------------------------------------------------

/// Prints a raw wire message, no cache annotations.
pub fn print_wire_message(hash: &str, message: &Message) {
    println!(
        "\n[{}] {}",
        message.timestamp.format("%Y-%m-%d %H:%M:%S"),
        short_hash(hash).bold(),
    );
    if !message.tags.is_empty() {
        println!("  Tags: {}", message.tags.join(", "));
    }
    if !message.origin.display.is_empty() {
        println!("  From: {}", message.origin.display);
    }
    println!("  {}", message.raw);
}

// ---------------------------------------------------------------------------
// Cached entries (chat mode)
// ---------------------------------------------------------------------------

/// Star, proximity, and proof-of-work markers for an entry.
pub fn indicators(snapshot: &EntrySnapshot) -> String {
    let mut out = String::new();

    if snapshot.starred {
        out.push_str(&format!(" {}", "[★]".yellow()));
    }

    let proximity = snapshot.entry.proximity_score;
    if proximity > 0 {
        let label = if proximity >= 500 {
            "exact"
        } else if proximity >= 250 {
            "nearby"
        } else {
            "region"
        };
        out.push_str(&format!(" {}", format!("[📍 {label}]").green()));
    }

    if snapshot.entry.pow_bits > 0 {
        out.push_str(&format!(
            " {}",
            format!("[PoW:{}]", snapshot.entry.pow_bits).cyan()
        ));
    }

    out
}

/// Prints a freshly received entry in full.
pub fn print_entry(snapshot: &EntrySnapshot) {
    let message = &snapshot.entry.message;
    println!(
        "\n[{}] {}{}",
        message.timestamp.format("%Y-%m-%d %H:%M:%S"),
        short_hash(&snapshot.entry.hash).bold(),
        indicators(snapshot),
    );

    let mut tags = message.tags.clone();
    for plustag in &snapshot.entry.plustags {
        if !tags.contains(plustag) {
            tags.push(plustag.clone());
        }
    }
    if !tags.is_empty() {
        println!("  Tags: {}", tags.join(", "));
    }
    if !message.origin.display.is_empty() {
        println!("  From: {}", message.origin.display);
    }
    println!("  {}", message.raw);
}

/// Prints one ranked line of a cache listing.
pub fn print_list_line(rank: usize, snapshot: &EntrySnapshot, now: DateTime<Utc>) {
    println!(
        "{rank}. {} (priority: {}, age: {}){}",
        short_hash(&snapshot.entry.hash).bold(),
        snapshot.entry.priority,
        format_age(snapshot.entry.message.age(now)),
        indicators(snapshot),
    );
}

/// Prints the full detail view of one entry (`!show`).
pub fn print_entry_detail(snapshot: &EntrySnapshot, now: DateTime<Utc>) {
    let entry = &snapshot.entry;
    let message = &entry.message;

    println!("{}{}", entry.hash.bold(), indicators(snapshot));
    println!("  Timestamp: {}", message.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("  Age:       {}", format_age(message.age(now)));
    println!("  TTL:       {} days", message.ttl_days);
    println!("  Hops:      {}", message.hops);
    println!("  Priority:  {}", entry.priority);
    if entry.pow_bits > 0 {
        println!("  PoW bits:  {}", entry.pow_bits);
    }
    if entry.proximity_score > 0 {
        println!("  Proximity: {}", entry.proximity_score);
    }
    if !message.tags.is_empty() {
        println!("  Tags:      {}", message.tags.join(", "));
    }
    if !entry.plustags.is_empty() {
        println!("  Plustags:  {}", entry.plustags.join(", "));
    }
    if !message.origin.display.is_empty() {
        println!("  From:      {}", message.origin.display);
    }
    println!("  {}", message.raw);
}

/// Renders a chrono duration as rounded seconds (negative clamps to 0s).
pub fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    humantime::format_duration(std::time::Duration::from_secs(secs as u64)).to_string()
}
