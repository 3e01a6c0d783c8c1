//! Domain normalization.
//!
//! Operators paste domains in every shape imaginable (`https://www.Example.com/`,
//! `example.com`, ` http://example.com `). Everything downstream keys on the bare
//! lower-cased host, so the scheme, a leading `www.` and a trailing slash are
//! peeled off here. Garbage in, garbage out: this never fails.

const SCHEMES: [&str; 2] = ["https://", "http://"];

/// Strip whitespace, scheme, `www.` and one trailing slash, and lower-case.
///
/// The pass repeats until nothing changes, so `normalize(normalize(x)) ==
/// normalize(x)` holds even for doubled layers like `https://https://x`.
pub fn normalize(raw: &str) -> String {
    let mut domain = raw.trim().to_lowercase();

    loop {
        let mut rest = domain.trim();

        for scheme in SCHEMES {
            if let Some(stripped) = rest.strip_prefix(scheme) {
                rest = stripped;
                break;
            }
        }

        rest = rest.strip_prefix("www.").unwrap_or(rest);
        rest = rest.strip_suffix('/').unwrap_or(rest);

        if rest.len() == domain.len() {
            return domain;
        }
        domain = rest.to_string();
    }
}

/// The first label of a domain, e.g. `example` for `example.co.uk`.
pub fn domain_base(domain: &str) -> &str {
    domain.split('.').next().unwrap_or(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_www_and_slash() {
        assert_eq!(normalize("https://www.example.com/"), "example.com");
        assert_eq!(normalize("http://example.com"), "example.com");
        assert_eq!(normalize("www.example.com"), "example.com");
        assert_eq!(normalize("example.com/"), "example.com");
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(normalize("  HTTPS://WWW.Example.COM/  "), "example.com");
        assert_eq!(normalize("\texample.it\n"), "example.it");
    }

    #[test]
    fn test_keeps_paths_and_subdomains() {
        assert_eq!(normalize("https://blog.example.com/news/"), "blog.example.com/news");
        assert_eq!(normalize("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://www.Example.com/",
            "https://https://example.com",
            "www.www.example.com//",
            "http:// www.example.com",
            "",
            "   ",
            "not a domain at all",
            "https://",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_garbage_in_garbage_out() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("https://"), "");
        assert_eq!(normalize("ftp://example.com"), "ftp://example.com");
    }

    #[test]
    fn test_domain_base() {
        assert_eq!(domain_base("example.com"), "example");
        assert_eq!(domain_base("example.co.uk"), "example");
        assert_eq!(domain_base("localhost"), "localhost");
        assert_eq!(domain_base(""), "");
    }
}
