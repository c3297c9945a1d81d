use crate::UrlError;
use url::Url;

/// Query parameters that never change which catalog page is served
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "yclid",
    "_openstat",
];

/// Builds the identity key used to deduplicate links and guard against cycles
///
/// Two references that lead to the same catalog page produce the same key.
/// The key is never navigated to; callers keep the original URL for that.
///
/// # Steps
///
/// 1. Parse the URL; reject non-HTTP schemes and missing hosts
/// 2. Lowercase the host
/// 3. Remove dot segments, repeated slashes and the trailing slash
/// 4. Remove the fragment
/// 5. Drop tracking parameters and sort the rest
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::canonical_key;
///
/// let key = canonical_key("https://Shop.TEST/catalog/lathes/?utm_source=mail#top").unwrap();
/// assert_eq!(key, "https://shop.test/catalog/lathes");
/// ```
pub fn canonical_key(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url.to_string())
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert_eq!(
            canonical_key("https://shop.test/catalog/lathes/").unwrap(),
            canonical_key("https://shop.test/catalog/lathes").unwrap()
        );
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(canonical_key("https://shop.test").unwrap(), "https://shop.test/");
    }

    #[test]
    fn test_scheme_is_preserved() {
        assert_eq!(
            canonical_key("http://127.0.0.1:8080/catalog/").unwrap(),
            "http://127.0.0.1:8080/catalog"
        );
    }

    #[test]
    fn test_remove_fragment_and_tracking() {
        let key = canonical_key("https://shop.test/p?utm_medium=x&yclid=1#reviews").unwrap();
        assert_eq!(key, "https://shop.test/p");
    }

    #[test]
    fn test_sort_query_params() {
        let key = canonical_key("https://shop.test/catalog/?PAGEN_1=2&SHOWALL_1=1").unwrap();
        assert_eq!(key, "https://shop.test/catalog?PAGEN_1=2&SHOWALL_1=1");

        let key = canonical_key("https://shop.test/catalog/?b=2&a=1").unwrap();
        assert_eq!(key, "https://shop.test/catalog?a=1&b=2");
    }

    #[test]
    fn test_dot_segments() {
        let key = canonical_key("https://shop.test/catalog/./mills/../lathes//").unwrap();
        assert_eq!(key, "https://shop.test/catalog/lathes");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            canonical_key("mailto:sales@shop.test"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(canonical_key("not a url"), Err(UrlError::Parse(_))));
    }
}
