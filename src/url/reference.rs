use url::Url;

/// Reference prefixes that never point at a fetchable resource
const NON_NAVIGABLE_PREFIXES: &[&str] = &["javascript:", "data:", "mailto:", "tel:", "#"];

/// Turns a raw `href`/`src`/`data-src` value into an absolute URL
///
/// * `//host/x` takes the scheme of `origin`
/// * `/x` is appended to the scheme and host of `origin`
/// * `http:`/`https:` references are returned unchanged
/// * any other relative reference is joined onto `origin`
///
/// Empty and non-navigable references (`javascript:`, `data:`, `mailto:`,
/// `tel:`, bare fragments) yield `None`.
///
/// # Examples
///
/// ```
/// use catalog_crawler::url::normalize_reference;
/// use url::Url;
///
/// let origin = Url::parse("https://site.test").unwrap();
/// assert_eq!(
///     normalize_reference("/img/x.png", &origin).as_deref(),
///     Some("https://site.test/img/x.png")
/// );
/// ```
pub fn normalize_reference(raw: &str, origin: &Url) -> Option<String> {
    let reference = raw.trim();
    if reference.is_empty() {
        return None;
    }

    let lowered = reference.to_ascii_lowercase();
    if NON_NAVIGABLE_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    if reference.starts_with("//") {
        return Some(format!("{}:{}", origin.scheme(), reference));
    }

    if reference.starts_with('/') {
        return Some(format!("{}{}", origin.origin().ascii_serialization(), reference));
    }

    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Some(reference.to_string());
    }

    origin.join(reference).ok().map(|url| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://site.test").unwrap()
    }

    #[test]
    fn test_protocol_relative_takes_origin_scheme() {
        assert_eq!(
            normalize_reference("//img.example/x.png", &origin()).as_deref(),
            Some("https://img.example/x.png")
        );

        let plain = Url::parse("http://127.0.0.1:9000").unwrap();
        assert_eq!(
            normalize_reference("//cdn.test/a.jpg", &plain).as_deref(),
            Some("http://cdn.test/a.jpg")
        );
    }

    #[test]
    fn test_root_relative_is_prefixed_with_origin() {
        assert_eq!(
            normalize_reference("/img/x.png", &origin()).as_deref(),
            Some("https://site.test/img/x.png")
        );

        let with_port = Url::parse("http://127.0.0.1:9000").unwrap();
        assert_eq!(
            normalize_reference("/catalog/lathes/", &with_port).as_deref(),
            Some("http://127.0.0.1:9000/catalog/lathes/")
        );
    }

    #[test]
    fn test_absolute_is_unchanged() {
        let absolute = "https://other.test/upload/iblock/a b.jpg";
        assert_eq!(
            normalize_reference(absolute, &origin()).as_deref(),
            Some(absolute)
        );
    }

    #[test]
    fn test_plain_relative_is_joined() {
        assert_eq!(
            normalize_reference("upload/x.png", &origin()).as_deref(),
            Some("https://site.test/upload/x.png")
        );
    }

    #[test]
    fn test_non_navigable_references_are_absent() {
        for raw in ["", "   ", "#", "#top", "javascript:void(0)", "data:image/png;base64,AA", "mailto:a@b.c", "TEL:+7000"] {
            assert_eq!(normalize_reference(raw, &origin()), None, "{:?}", raw);
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(
            normalize_reference("  /catalog/  ", &origin()).as_deref(),
            Some("https://site.test/catalog/")
        );
    }
}
