use url::Url;

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// A `data:` URL carrying a complete filter list, so flows need no network.
pub fn data_list(filters: &[&str]) -> Url {
    let mut text = String::from("[Adblock Plus 2.0]\n");
    for filter in filters {
        text.push_str(filter);
        text.push('\n');
    }
    let mut encoded = String::from("data:text/plain,");
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    url(&encoded)
}

/// Common request and page URLs
pub struct TestUrls;

impl TestUrls {
    pub fn page() -> Url {
        url("https://news.example/article")
    }

    pub fn ad_script() -> Url {
        url("https://ads.example/banner.js")
    }

    pub fn tracker() -> Url {
        url("https://tracker.example/pixel.gif")
    }

    pub fn harmless() -> Url {
        url("https://cdn.example/app.js")
    }
}
