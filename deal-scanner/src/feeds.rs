//! Curated deal feeds

/// RSS feed definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealFeed {
    /// Feed category label
    pub name: String,
    /// RSS feed URL
    pub url: String,
}

impl DealFeed {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// DealNews category feeds
pub fn curated_feeds() -> Vec<DealFeed> {
    vec![
        DealFeed::new("Electronics", "https://www.dealnews.com/c142/Electronics/?rss=1"),
        DealFeed::new("Computers", "https://www.dealnews.com/c39/Computers/?rss=1"),
        DealFeed::new("Automotive", "https://www.dealnews.com/c238/Automotive/?rss=1"),
        DealFeed::new(
            "Smart Home",
            "https://www.dealnews.com/f1912/Smart-Home/?rss=1",
        ),
        DealFeed::new(
            "Home and Garden",
            "https://www.dealnews.com/c196/Home-Garden/?rss=1",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curated_feeds() {
        let feeds = curated_feeds();
        assert_eq!(feeds.len(), 5);
        assert!(feeds.iter().all(|f| f.url.ends_with("?rss=1")));
        assert!(feeds.iter().any(|f| f.name == "Automotive"));
    }
}
