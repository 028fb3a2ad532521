//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Generate a URL for a site-relative path
///
/// # Examples
/// ```ignore
/// url_for(&config, "images/a b.png") // -> "https://example.com/images/a%20b.png"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.site_url.trim_end_matches('/');
    let path = encode_path(path.trim_start_matches('/'));
    format!("{}/{}", base, path)
}

/// Percent-encode each segment of a `/`-separated path
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert a filesystem-relative path into a `/`-separated URL path
pub fn path_to_url(path: &std::path::Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_config() -> SiteConfig {
        SiteConfig {
            site_url: "https://example.com/".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(
            url_for(&config, "/images/logo.png"),
            "https://example.com/images/logo.png"
        );
        assert_eq!(url_for(&config, "git.html"), "https://example.com/git.html");
    }

    #[test]
    fn test_url_for_without_site_url() {
        let config = SiteConfig::default();
        assert_eq!(url_for(&config, "images/a.png"), "/images/a.png");
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("images/a b.png"), "images/a%20b.png");
        assert_eq!(encode_path("été/x.png"), "%C3%A9t%C3%A9/x.png");
    }

    #[test]
    fn test_path_to_url() {
        assert_eq!(path_to_url(Path::new("./images/git/tree.png")), "images/git/tree.png");
    }
}
