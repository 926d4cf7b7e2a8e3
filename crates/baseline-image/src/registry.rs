//! Image existence checks against the engine's image list.

use baseline_common::error::Result;
use baseline_engine::{ContainerEngine, ImageSummary};

use crate::reference::ImageRef;

/// Returns whether any image in `images` carries a tag for the repository
/// named by `name`.
///
/// Only the repository component is compared: `myapp-build` matches
/// `myapp-build:latest` but not `myapp-builder:latest`.
///
/// # Errors
///
/// Returns an error if `name` is not a valid reference.
pub fn contains_repository(images: &[ImageSummary], name: &str) -> Result<bool> {
    let wanted = ImageRef::parse(name)?;
    Ok(images
        .iter()
        .flat_map(|image| image.repo_tags.iter())
        .filter_map(|tag| match ImageRef::parse(tag) {
            Ok(reference) => Some(reference),
            Err(e) => {
                tracing::debug!(tag = %tag, error = %e, "skipping unparsable repo tag");
                None
            }
        })
        .any(|reference| reference.is_repository(&wanted.repository)))
}

/// Lists all images and checks whether `name` is among them.
///
/// # Errors
///
/// Returns an error if the engine cannot list images or `name` is invalid.
pub async fn image_exists(engine: &dyn ContainerEngine, name: &str) -> Result<bool> {
    let images = engine.list_images().await?;
    let exists = contains_repository(&images, name)?;
    tracing::debug!(image = name, exists, "checked image existence");
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline_common::types::ImageId;
    use baseline_engine::fake::FakeEngine;

    fn summary(id: &str, tags: &[&str]) -> ImageSummary {
        ImageSummary {
            id: ImageId::new(id),
            repo_tags: tags.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn matches_repository_ignoring_tag() {
        let images = vec![summary("a", &["myapp-build:latest"])];
        assert!(contains_repository(&images, "myapp-build").unwrap());
    }

    #[test]
    fn prefix_does_not_falsely_match() {
        let images = vec![summary("a", &["myapp-builder:latest"])];
        assert!(!contains_repository(&images, "myapp-build").unwrap());
    }

    #[test]
    fn empty_listing_is_false() {
        assert!(!contains_repository(&[], "anything").unwrap());
    }

    #[test]
    fn any_tag_of_any_image_counts() {
        let images = vec![
            summary("a", &[]),
            summary("b", &["other:1", "myapp-final:v3"]),
        ];
        assert!(contains_repository(&images, "myapp-final").unwrap());
    }

    #[tokio::test]
    async fn image_exists_consults_engine_listing() {
        let engine = FakeEngine::new().with_image("shop-web:latest");
        assert!(image_exists(&engine, "shop-web").await.unwrap());
        assert!(!image_exists(&engine, "shop-api").await.unwrap());
    }
}
