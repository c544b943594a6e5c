use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none())
}

fn is_tty() -> bool {
    static IS_TTY: OnceLock<bool> = OnceLock::new();
    *IS_TTY.get_or_init(|| io::stderr().is_terminal())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

fn dim(text: &str) -> String {
    paint("2", text)
}

fn green(text: &str) -> String {
    paint("32", text)
}

fn yellow(text: &str) -> String {
    paint("33", text)
}

fn red(text: &str) -> String {
    paint("31", text)
}

pub fn elapsed_seconds() -> f32 {
    START_TIME
        .get()
        .map(|t| t.elapsed().as_secs_f32())
        .unwrap_or(0.0)
}

pub fn header(command: &str, version: &str) {
    START_TIME.get_or_init(Instant::now);
    eprintln!("{}", dim(&format!("mvnload {} v{}", command, version)));
    eprintln!();
}

pub fn step(message: &str) {
    if is_tty() {
        eprint!("\r\u{1b}[K{}\n", dim(message));
        let _ = io::stderr().flush();
    } else {
        eprintln!("{}", dim(message));
    }
}

pub fn resolved(identity: &str, local: bool) {
    let mark = green("+");
    let label = if local { dim(" (local)") } else { String::new() };
    println!("{} {}{}", mark, identity, label);
}

pub fn downloaded(file_name: &str, bytes: u64) {
    println!("{} {} {}", green("↓"), file_name, dim(&format_bytes(bytes)));
}

pub fn skipped(file_name: &str) {
    println!("{} {} {}", dim("="), file_name, dim("(already present)"));
}

pub fn incomplete(file_name: &str, failed: usize, total: usize) {
    println!(
        "{} {} {}",
        red("!"),
        file_name,
        yellow(&format!("{} of {} partitions failed", failed, total))
    );
}

pub fn summary(count: usize, singular: &str, plural: &str, verb: &str, seconds: f32) {
    println!();
    let time_str = if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    };
    println!(
        "{} {} {}",
        count_noun(count, singular, plural),
        verb,
        dim(&format!("[{}]", time_str))
    );
}

fn count_noun(count: usize, singular: &str, plural: &str) -> String {
    let noun = if count == 1 { singular } else { plural };
    format!("{} {}", count, noun)
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn error(message: &str) {
    let tag = red("error");
    eprintln!("{} {}", tag, message);
}

pub fn info(message: &str) {
    println!("{}", message);
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn counts_use_the_given_plural() {
        assert_eq!(count_noun(1, "dependency", "dependencies"), "1 dependency");
        assert_eq!(count_noun(3, "dependency", "dependencies"), "3 dependencies");
        assert_eq!(count_noun(0, "artifact", "artifacts"), "0 artifacts");
    }
}
