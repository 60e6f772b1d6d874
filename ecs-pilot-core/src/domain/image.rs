//! Container image references

use std::fmt;

/// A container image split into repository and optional tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repository: String,
    pub tag: Option<String>,
}

impl ImageRef {
    /// Splits `image` into repository and tag
    ///
    /// The tag separator is the last `:` after the last `/`, so a registry
    /// port (`registry:5000/app`) is never taken for a tag.
    pub fn parse(image: &str) -> Self {
        let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);

        match image[name_start..].rfind(':') {
            Some(offset) => {
                let split = name_start + offset;
                Self {
                    repository: image[..split].to_string(),
                    tag: Some(image[split + 1..].to_string()),
                }
            }
            None => Self {
                repository: image.to_string(),
                tag: None,
            },
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => f.write_str(&self.repository),
        }
    }
}

/// Computes the image a container should run after an update
///
/// Empty `image` or `tag` keep the corresponding part of `current`.
pub fn resolve_image(current: &str, image: Option<&str>, tag: Option<&str>) -> ImageRef {
    let current = ImageRef::parse(current);

    let repository = match image.filter(|i| !i.is_empty()) {
        Some(image) => image.to_string(),
        None => current.repository,
    };

    let tag = match tag.filter(|t| !t.is_empty()) {
        Some(tag) => Some(tag.to_string()),
        None => current.tag,
    };

    ImageRef { repository, tag }
}
