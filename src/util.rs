use url::Url;

/// Joins a server base URL and an endpoint path.
///
/// The endpoint is always resolved relative to the base path, so slashes on
/// either side of the join never double or drop a separator. Returns `None`
/// unless the result is an absolute `http`/`https` URL with a host.
pub(crate) fn build_url(base: &str, part: &str) -> Option<Url> {
    let base = format!("{}/", base.trim().trim_end_matches('/'));
    let joined = Url::parse(&base)
        .ok()?
        .join(part.trim_start_matches('/'))
        .ok()?;

    let has_host = joined.host_str().is_some_and(|h| !h.is_empty());
    if matches!(joined.scheme(), "http" | "https") && has_host {
        Some(joined)
    } else {
        None
    }
}

pub(crate) fn comma_join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(item.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_collapse_to_one() {
        for (base, part) in [
            ("http://h", "p"),
            ("http://h/", "p"),
            ("http://h", "/p"),
            ("http://h/", "/p"),
        ] {
            let url = build_url(base, part).expect("valid url");
            assert_eq!(url.as_str(), "http://h/p", "base={base} part={part}");
        }
    }

    #[test]
    fn endpoint_stays_under_base_path() {
        let url = build_url("http://hapi.example/hapi/", "/catalog").unwrap();
        assert_eq!(url.as_str(), "http://hapi.example/hapi/catalog");

        let url = build_url("https://hapi.example/hapi", "info").unwrap();
        assert_eq!(url.as_str(), "https://hapi.example/hapi/info");
    }

    #[test]
    fn malformed_bases_are_rejected() {
        assert!(build_url("this_is_a_wrong/server", "endpoint").is_none());
        assert!(build_url("", "endpoint").is_none());
        assert!(build_url("unknown_scheme://some.possible.server/hapi", "endpoint").is_none());
        assert!(build_url("file:///tmp/hapi", "endpoint").is_none());
    }

    #[test]
    fn comma_join_keeps_order() {
        assert_eq!(comma_join(["b", "a", "c"]), "b,a,c");
        assert_eq!(comma_join(Vec::<String>::new()), "");
    }
}
