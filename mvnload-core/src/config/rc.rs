use directories::BaseDirs;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const RC_FILE: &str = ".mvnloadrc";

/// Values read from `.mvnloadrc` files. Later files override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcSettings {
    pub repository: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub extension: Option<String>,
    pub dedupe: Option<bool>,
    pub trust_declared: Option<bool>,
    pub strict_downloads: Option<bool>,
    pub verify_checksums: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Home directory first, then the working directory.
pub fn read_rc_settings() -> RcSettings {
    let mut settings = RcSettings::default();

    if let Some(base) = BaseDirs::new() {
        apply_rc_file(&base.home_dir().join(RC_FILE), &mut settings);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    apply_rc_file(&cwd.join(RC_FILE), &mut settings);

    settings
}

pub fn apply_rc_file(path: &Path, settings: &mut RcSettings) {
    if !path.is_file() {
        return;
    }

    if let Ok(data) = fs::read_to_string(path) {
        apply_rc_text(&data, settings);
    }
}

pub fn apply_rc_text(data: &str, settings: &mut RcSettings) {
    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim().to_ascii_lowercase().replace(['-', '.'], "_");
        let value = expand_env_vars(value.trim());
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "repository" => settings.repository = Some(value),
            "output_dir" => settings.output_dir = Some(PathBuf::from(value)),
            "workers" => {
                if let Some(workers) = parse_positive(&value) {
                    settings.workers = Some(workers);
                }
            }
            "extension" => settings.extension = Some(value.trim_start_matches('.').to_string()),
            "dedupe" => settings.dedupe = parse_bool(&value).or(settings.dedupe),
            "trust_declared" => {
                settings.trust_declared = parse_bool(&value).or(settings.trust_declared)
            }
            "strict_downloads" => {
                settings.strict_downloads = parse_bool(&value).or(settings.strict_downloads)
            }
            "verify_checksums" => {
                settings.verify_checksums = parse_bool(&value).or(settings.verify_checksums)
            }
            "timeout_secs" => {
                if let Ok(secs) = value.parse::<u64>() {
                    settings.timeout_secs = Some(secs);
                }
            }
            _ => {}
        }
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|parsed| *parsed > 0)
}

/// Expands `$VAR` and `${VAR}` references. Unset variables expand to nothing.
pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::new();
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        if bytes[i] != b'$' {
            let ch = text[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
            continue;
        }

        if i + 1 < bytes.len()
            && bytes[i + 1] == b'{'
            && let Some(end) = text[i + 2..].find('}')
        {
            let var = &text[i + 2..i + 2 + end];
            out.push_str(&env::var(var).unwrap_or_default());
            i += 2 + end + 1;
            continue;
        }

        let mut j = i + 1;
        while j < bytes.len() && (bytes[j] == b'_' || bytes[j].is_ascii_alphanumeric()) {
            j += 1;
        }

        let var = &text[i + 1..j];
        if var.is_empty() {
            out.push('$');
            i += 1;
        } else {
            out.push_str(&env::var(var).unwrap_or_default());
            i = j;
        }
    }

    out
}
