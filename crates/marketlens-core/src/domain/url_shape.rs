//! Hand-written shape check for absolute news links.
//!
//! Grammar (case-insensitive scheme):
//!
//! ```text
//! url    = scheme "://" host [ ":" port ] [ path ]
//! scheme = "http" | "https"
//! host   = label 1*( "." label )
//! label  = 1*( ALPHA | DIGIT | "-" | "_" )
//! port   = 1*5DIGIT
//! path   = "/" *( any char except whitespace and control )
//! ```
//!
//! Every step consumes at least one byte or stops, so the check is linear in
//! the input length.

pub const MAX_URL_LEN: usize = 1000;

pub fn is_url_shaped(input: &str) -> bool {
    if input.is_empty() || input.len() > MAX_URL_LEN {
        return false;
    }

    let Some(rest) = strip_scheme(input) else {
        return false;
    };

    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, path) = rest.split_at(authority_end);

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    is_host(host) && port.map_or(true, is_port) && is_path(path)
}

fn strip_scheme(input: &str) -> Option<&str> {
    for scheme in ["https://", "http://"] {
        if input.len() >= scheme.len()
            && input.is_char_boundary(scheme.len())
            && input[..scheme.len()].eq_ignore_ascii_case(scheme)
        {
            return Some(&input[scheme.len()..]);
        }
    }
    None
}

fn is_host(host: &str) -> bool {
    let mut labels = 0;
    for label in host.split('.') {
        let valid = !label.is_empty()
            && label
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_');
        if !valid {
            return false;
        }
        labels += 1;
    }
    labels >= 2
}

fn is_port(port: &str) -> bool {
    !port.is_empty() && port.len() <= 5 && port.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_path(path: &str) -> bool {
    path.is_empty()
        || (path.starts_with('/') && !path.chars().any(|ch| ch.is_whitespace() || ch.is_control()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_news_links() {
        for url in [
            "https://tradingeconomics.com/united-states/news",
            "http://example.com",
            "HTTPS://Markets.Example.co.uk:8443/a/b?q=1&x=%20#frag",
            "https://news.example.com/2024/03/05/fed-holds_rates",
        ] {
            assert!(is_url_shaped(url), "{url}");
        }
    }

    #[test]
    fn rejects_malformed_links() {
        for url in [
            "",
            "/news/relative",
            "ftp://example.com/file",
            "https://localhost/path",
            "https://exa mple.com",
            "https://example..com",
            "https://.example.com",
            "https://example.com:port/x",
            "https://example.com:123456/",
            "https://example.com/has space",
            "https://example.com?missing-slash",
            "javascript:alert(1)",
        ] {
            assert!(!is_url_shaped(url), "{url}");
        }
    }

    #[test]
    fn rejects_overlong_input() {
        let url = format!("https://example.com/{}", "a".repeat(MAX_URL_LEN));
        assert!(!is_url_shaped(&url));
    }

    #[test]
    fn pathological_inputs_finish_quickly() {
        let started = std::time::Instant::now();
        let dotted = format!("https://{}", "a.".repeat(490));
        let dashed = format!("https://{}!", "-".repeat(980));
        let multibyte = format!("https://例え.テスト/{}", "é".repeat(300));
        for url in [dotted.as_str(), dashed.as_str(), multibyte.as_str()] {
            assert!(!is_url_shaped(url));
        }
        assert!(started.elapsed() < std::time::Duration::from_millis(50));
    }
}
