/// Fixed set of MIME types accepted for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    types: Vec<String>,
}

impl AllowList {
    pub fn new<S: AsRef<str>>(types: &[S]) -> Self {
        let types = types
            .iter()
            .map(|t| normalize_mime_type(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        Self { types }
    }

    /// Compares the essence of `mime_type` only, so `image/png; charset=binary` matches
    /// `image/png`
    pub fn allows(&self, mime_type: &str) -> bool {
        let normalized = normalize_mime_type(mime_type);
        self.types.iter().any(|t| *t == normalized)
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(&["image/jpeg", "image/png", "image/gif"])
    }
}

fn normalize_mime_type(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_common_images() {
        let allow_list = AllowList::default();
        assert!(allow_list.allows("image/jpeg"));
        assert!(allow_list.allows("image/png"));
        assert!(allow_list.allows("image/gif"));

        assert!(!allow_list.allows("application/pdf"));
        assert!(!allow_list.allows("image/svg+xml"));
        assert!(!allow_list.allows("image/jpg"));
        assert!(!allow_list.allows(""));
    }

    #[test]
    fn test_parameters_and_case_ignored() {
        let allow_list = AllowList::default();
        assert!(allow_list.allows("IMAGE/PNG"));
        assert!(allow_list.allows(" image/png ; charset=binary"));
        assert!(!allow_list.allows("image/pngx"));
    }

    #[test]
    fn test_configured_types_normalized() {
        let allow_list = AllowList::new(&["Image/WebP", " ", "image/png;q=1"]);
        assert_eq!(allow_list.types(), &["image/webp", "image/png"]);
        assert!(allow_list.allows("image/webp"));
        assert!(!allow_list.allows("image/jpeg"));
    }
}
