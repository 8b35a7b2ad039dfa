//! URL shortening before `invoke`, with reverse-mapping restored into the
//! model's output afterward (spec §4.7 "URL shortening").

const PREFIX_LEN: usize = 30;
const SUFFIX_LEN: usize = 15;

/// Finds `https://`/`http://` runs longer than `limit` chars and replaces
/// each with `<prefix>...<suffix>`, recording the substitution so it can
/// be restored later.
pub struct UrlShortener {
    limit: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ReverseMap {
    entries: Vec<(String, String)>,
}

impl ReverseMap {
    /// Restores every shortened URL substring back to its original form.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (shortened, original) in &self.entries {
            out = out.replace(shortened, original);
        }
        out
    }
}

impl UrlShortener {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn shorten(&self, text: &str) -> (String, ReverseMap) {
        let mut out = String::with_capacity(text.len());
        let mut map = ReverseMap::default();
        let mut rest = text;

        while let Some(start) = find_next_url(rest) {
            out.push_str(&rest[..start]);
            let (url, after) = split_url(&rest[start..]);
            if url.chars().count() > self.limit {
                let shortened = shorten_one(url);
                out.push_str(&shortened);
                map.entries.push((shortened, url.to_string()));
            } else {
                out.push_str(url);
            }
            rest = after;
        }
        out.push_str(rest);
        (out, map)
    }
}

fn find_next_url(text: &str) -> Option<usize> {
    text.find("https://").or_else(|| text.find("http://"))
}

fn split_url(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ')' || c == ']')
        .unwrap_or(text.len());
    text.split_at(end)
}

fn shorten_one(url: &str) -> String {
    let chars: Vec<char> = url.chars().collect();
    let prefix: String = chars[..PREFIX_LEN.min(chars.len())].iter().collect();
    let suffix: String = chars[chars.len().saturating_sub(SUFFIX_LEN)..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_urls_pass_through_unchanged() {
        let shortener = UrlShortener::new(100);
        let (out, map) = shortener.shorten("visit https://example.com/a for info");
        assert_eq!(out, "visit https://example.com/a for info");
        assert!(map.entries.is_empty());
    }

    #[test]
    fn long_urls_are_shortened_and_restorable() {
        let long = format!("https://example.com/{}", "a".repeat(200));
        let text = format!("visit {long} now");
        let shortener = UrlShortener::new(50);
        let (shortened, map) = shortener.shorten(&text);
        assert!(shortened.len() < text.len());
        assert!(shortened.contains("..."));
        assert_eq!(map.restore(&shortened), text);
    }
}
