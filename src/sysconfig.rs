// Copyright (c) 2025 - Cowboy AI, Inc.
//! Legacy RHEL network configuration (`/etc/sysconfig/network`)
//!
//! The file is shared with other tooling, so only the `HOSTNAME=` line is
//! ever touched.

const KEY: &str = "HOSTNAME=";

/// Value of the first `HOSTNAME=` assignment, unquoted
pub fn hostname_value(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        line.strip_prefix(KEY)
            .map(|value| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}

/// Replace every line mentioning `HOSTNAME=` with `HOSTNAME=<hostname>`,
/// appending one when the file has none
pub fn set_hostname(content: &str, hostname: &str) -> String {
    let replacement = format!("{}{}", KEY, hostname);
    let mut found = false;

    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if line.contains(KEY) {
                found = true;
                replacement.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        lines.push(replacement);
    }

    let mut rewritten = lines.join("\n");
    rewritten.push('\n');
    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = "NETWORKING=yes\nHOSTNAME=localhost.localdomain\nGATEWAY=10.0.0.1\n";

    #[test]
    fn test_hostname_value() {
        assert_eq!(hostname_value(NETWORK).as_deref(), Some("localhost.localdomain"));
        assert_eq!(hostname_value("HOSTNAME=\"web01.example.com\"\n").as_deref(), Some("web01.example.com"));
        assert_eq!(hostname_value("NETWORKING=yes\n"), None);
    }

    #[test]
    fn test_set_hostname_replaces_line() {
        let rewritten = set_hostname(NETWORK, "web01.example.com");
        assert_eq!(
            rewritten,
            "NETWORKING=yes\nHOSTNAME=web01.example.com\nGATEWAY=10.0.0.1\n"
        );
        assert_eq!(hostname_value(&rewritten).as_deref(), Some("web01.example.com"));
    }

    #[test]
    fn test_set_hostname_appends_when_missing() {
        assert_eq!(
            set_hostname("NETWORKING=yes\n", "web01.example.com"),
            "NETWORKING=yes\nHOSTNAME=web01.example.com\n"
        );
        assert_eq!(set_hostname("", "a.b"), "HOSTNAME=a.b\n");
    }

    #[test]
    fn test_set_hostname_is_idempotent() {
        let once = set_hostname(NETWORK, "web01.example.com");
        assert_eq!(set_hostname(&once, "web01.example.com"), once);
    }
}
