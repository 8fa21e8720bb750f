//! Adapter for LinkedIn's profile-picture projection.
//!
//! The response nests image variants under a media-artifact key that is
//! specific to LinkedIn's API version. Everything that knows that shape
//! lives here.

use serde::Deserialize;

/// Header LinkedIn requires for the projection syntax used by the endpoint.
pub const RESTLI_PROTOCOL_HEADER: (&str, &str) = ("X-Restli-Protocol-Version", "2.0.0");

#[derive(Debug, Deserialize)]
struct ProfilePictureResponse {
    #[serde(rename = "profilePicture")]
    profile_picture: Option<ProfilePicture>,
}

#[derive(Debug, Deserialize)]
struct ProfilePicture {
    #[serde(rename = "displayImage~")]
    display_image: Option<DisplayImage>,
}

#[derive(Debug, Deserialize)]
struct DisplayImage {
    #[serde(default)]
    elements: Vec<ImageElement>,
}

#[derive(Debug, Deserialize)]
struct ImageElement {
    data: Option<ArtifactData>,
    #[serde(default)]
    identifiers: Vec<ImageIdentifier>,
}

#[derive(Debug, Deserialize)]
struct ArtifactData {
    #[serde(rename = "com.linkedin.digitalmedia.mediaartifact.StillImage")]
    still_image: Option<StillImage>,
}

#[derive(Debug, Deserialize)]
struct StillImage {
    #[serde(rename = "storageSize")]
    storage_size: Option<StorageSize>,
}

#[derive(Debug, Deserialize)]
struct StorageSize {
    #[serde(default)]
    width: u64,
}

#[derive(Debug, Deserialize)]
struct ImageIdentifier {
    identifier: Option<String>,
}

impl ImageElement {
    fn width(&self) -> u64 {
        self.data
            .as_ref()
            .and_then(|d| d.still_image.as_ref())
            .and_then(|s| s.storage_size.as_ref())
            .map_or(0, |s| s.width)
    }
}

/// Picks the URL of the widest image variant from a profile-picture body.
///
/// Returns `Ok(None)` when the body is well formed but has no usable image.
pub fn largest_image_url(body: &str) -> Result<Option<String>, serde_json::Error> {
    let response: ProfilePictureResponse = serde_json::from_str(body)?;
    let Some(display_image) = response
        .profile_picture
        .and_then(|p| p.display_image)
    else {
        return Ok(None);
    };

    // `max_by_key` keeps the last maximum; reversing keeps the first.
    let largest = display_image
        .elements
        .iter()
        .rev()
        .max_by_key(|element| element.width());

    Ok(largest
        .and_then(|element| element.identifiers.first())
        .and_then(|identifier| identifier.identifier.clone())
        .filter(|url| !url.is_empty()))
}
