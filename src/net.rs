use url::Url;

pub fn parse_host(u: &str) -> anyhow::Result<String> {
    Ok(
        Url::parse(u)?
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("no host"))?
            .to_string(),
    )
}

/// Join a base URL and an endpoint path without doubling the separator.
pub fn join_endpoint(base: &str, path: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{trimmed}{path}")
    } else {
        format!("{trimmed}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_trailing_slash() {
        assert_eq!(
            join_endpoint("http://localhost:8000/", "/api/generate"),
            "http://localhost:8000/api/generate"
        );
        assert_eq!(
            join_endpoint("http://localhost:8000", "api/generate"),
            "http://localhost:8000/api/generate"
        );
    }

    #[test]
    fn parse_host_extracts_hostname() {
        assert_eq!(parse_host("http://127.0.0.1:8000/api").unwrap(), "127.0.0.1");
        assert!(parse_host("not a url").is_err());
    }
}
