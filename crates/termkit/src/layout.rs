//! Headers, sections, and aligned key-value output.

use colored::Colorize;

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print key-value pairs with keys padded to the same width
pub fn kv_table<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) {
    let width = key_width(pairs.iter().map(|(k, _)| k.as_ref()));
    for (key, value) in pairs {
        println!(
            "  {}  {}",
            format!("{:<width$}", key.as_ref()).dimmed(),
            value.as_ref()
        );
    }
}

fn key_width<'a>(keys: impl Iterator<Item = &'a str>) -> usize {
    keys.map(|k| k.chars().count()).max().unwrap_or(0)
}
