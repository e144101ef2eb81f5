use std::fmt;

use url::form_urlencoded;

/// Ordered query-string parameters, decoded.
///
/// Mirrors the browser's `URLSearchParams`: keys may repeat, `get` returns the
/// first match and `set` collapses duplicates into one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a query string with or without its leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let mut value = Some(value.into());
        self.pairs.retain_mut(|(k, v)| {
            if k != key {
                return true;
            }
            match value.take() {
                Some(first) => {
                    *v = first;
                    true
                }
                None => false,
            }
        });
        if let Some(value) = value {
            self.pairs.push((key.to_string(), value));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// Joins a path and its query, dropping the `?` when there is nothing to append.
pub fn build_href(path: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{params}")
    }
}

/// Splits `"/path?query#frag"` into `("/path", "query")`. The fragment is dropped.
pub fn split_href(href: &str) -> (&str, &str) {
    let href = href.split_once('#').map_or(href, |(h, _)| h);
    href.split_once('?').unwrap_or((href, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn parse_decodes_and_keeps_order() {
        let q = QueryParams::parse("?b=2&a=hello+world&c=%7B%7D");
        let pairs: Vec<_> = q.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "hello world"), ("c", "{}")]);
    }

    #[test]
    fn set_replaces_first_and_drops_duplicates() {
        let mut q = QueryParams::parse("x=1&y=2&x=3");
        q.set("x", "9");
        assert_snapshot!(q.to_string(), @"x=9&y=2");

        q.set("z", "new value");
        assert_snapshot!(q.to_string(), @"x=9&y=2&z=new+value");
    }

    #[test]
    fn remove_and_empty() {
        let mut q = QueryParams::parse("only=1");
        assert!(q.contains("only"));
        q.remove("only");
        assert!(q.is_empty());
        assert_eq!(build_href("/portfolio", &q), "/portfolio");
    }

    #[test]
    fn href_helpers() {
        let q = QueryParams::parse("page=2");
        assert_eq!(build_href("/work", &q), "/work?page=2");
        assert_eq!(split_href("/work?page=2#top"), ("/work", "page=2"));
        assert_eq!(split_href("/about"), ("/about", ""));
    }
}
