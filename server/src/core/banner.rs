//! Startup banner and URL display

use super::config::is_all_interfaces;
use super::constants::APP_NAME;

// "Entities:" and "Network:" padded for alignment
const W: usize = 10;

const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Cyan URL, wrapped in an OSC 8 hyperlink when `hyperlinks` is set
fn link(url: &str, hyperlinks: bool) -> String {
    if hyperlinks {
        format!("\x1b]8;;{url}\x07{CYAN}{url}{RESET}\x1b]8;;\x07")
    } else {
        format!("{CYAN}{url}{RESET}")
    }
}

fn entry(label: &str, value: &str) -> String {
    format!("  \x1b[32m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}", label, value)
}

fn hint(label: &str, text: &str) -> String {
    format!("  \x1b[90m➜  {:<W$} {}\x1b[0m", label, text)
}

/// Banner body: URLs, mounted entities and the data location
fn banner_lines(
    host: &str,
    port: u16,
    entities: &[&str],
    data: &str,
    hyperlinks: bool,
) -> Vec<String> {
    let display_host = if is_all_interfaces(host) {
        "localhost"
    } else {
        host
    };
    let base = format!("http://{}:{}", display_host, port);

    let mut lines = vec![
        entry("API:", &link(&format!("{}/api/v1", base), hyperlinks)),
        entry("Docs:", &link(&format!("{}/api/docs", base), hyperlinks)),
        format!(
            "  \x1b[33m➜\x1b[0m  \x1b[1m{:<W$}\x1b[0m {}",
            "Entities:",
            entities.join(", ")
        ),
    ];

    if host == "127.0.0.1" || host == "localhost" {
        lines.push(hint("Network:", "use --host 0.0.0.0 to expose"));
    } else if is_all_interfaces(host) {
        if let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            lines.extend(
                interfaces
                    .iter()
                    .filter(|(_, ip)| ip.is_ipv4() && !ip.is_loopback())
                    .map(|(_, ip)| {
                        entry(
                            "Network:",
                            &link(&format!("http://{}:{}", ip, port), hyperlinks),
                        )
                    }),
            );
        }
    } else {
        lines.push(entry(
            "Network:",
            &link(&format!("http://{}:{}", host, port), hyperlinks),
        ));
    }
    lines.push(hint("Data:", data));
    lines
}

/// Print the startup banner with URLs
pub fn print_banner(host: &str, port: u16, entities: &[&str], data: &str) {
    let hyperlinks = supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout);

    println!();
    println!(
        "  \x1b[1m{}{}{} \x1b[90mv{}{}",
        CYAN,
        APP_NAME,
        RESET,
        env!("CARGO_PKG_VERSION"),
        RESET
    );
    println!();
    for line in banner_lines(host, port, entities, data, hyperlinks) {
        println!("{}", line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_formats() {
        let url = "http://localhost:5390/api/docs?tab=members&x=1";
        assert_eq!(link(url, false), format!("\x1b[36m{}\x1b[0m", url));

        let linked = link(url, true);
        assert!(linked.starts_with(&format!("\x1b]8;;{}\x07", url)));
        assert!(linked.ends_with("\x1b]8;;\x07"));
        assert!(linked.contains(&link(url, false)));
    }

    #[test]
    fn test_loopback_banner() {
        let lines = banner_lines("127.0.0.1", 5390, &["members", "plans"], "in-memory", false);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("http://127.0.0.1:5390/api/v1"));
        assert!(lines[1].contains("http://127.0.0.1:5390/api/docs"));
        assert!(lines[2].contains("members, plans"));
        assert!(lines[3].contains("--host 0.0.0.0"));
        assert!(lines[4].contains("in-memory"));
        assert!(lines.iter().all(|l| !l.contains("\x1b]8;;")));
    }

    #[test]
    fn test_specific_host_banner_links_network_url() {
        let lines = banner_lines("10.1.2.3", 8080, &[], "/data", true);
        assert!(lines[3].contains("Network:"));
        assert!(lines[3].contains("\x1b]8;;http://10.1.2.3:8080\x07"));
    }
}
