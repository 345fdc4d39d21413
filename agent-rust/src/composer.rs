use crate::{
    catalog::{item_id_from_path, load_person_photos},
    planner::OutfitPlan,
    storage::{
        is_image_file, mime_type_for, path_from_locator, Storage, GENERATED_DIR, PERSON_PHOTO_DIR,
    },
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stylist_sdk::{LanguageModel, LanguageModelInput, Message, Modality, Part};
use tracing::info_span;
use tracing_futures::Instrument;

/// Outcome of one composition attempt. Failures carry a message instead of
/// a locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeResult {
    #[serde(rename = "imageUrl")]
    pub locator: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComposeResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            locator: String::new(),
            success: false,
            message: Some(message.into()),
        }
    }
}

struct LoadedImage {
    mime_type: String,
    data: Vec<u8>,
}

/// Renders the user wearing an outfit through an image-capable model and
/// stores the result under `generated/`.
pub struct ImageComposer {
    model: Arc<dyn LanguageModel>,
    storage: Arc<dyn Storage>,
}

impl ImageComposer {
    pub fn new(model: Arc<dyn LanguageModel>, storage: Arc<dyn Storage>) -> Self {
        Self { model, storage }
    }

    /// Compose `outfit` onto `base_photo`, or onto the default person photo
    /// when none is given or it cannot be read. Every call that succeeds
    /// writes a new file.
    pub async fn compose(&self, outfit: &OutfitPlan, base_photo: Option<&str>) -> ComposeResult {
        let span = info_span!(
            "stylist.compose",
            model_id = %self.model.model_id(),
            items = outfit.items().count(),
        );
        self.compose_inner(outfit, base_photo).instrument(span).await
    }

    async fn compose_inner(&self, outfit: &OutfitPlan, base_photo: Option<&str>) -> ComposeResult {
        let Some(first_item) = outfit.items().next() else {
            return ComposeResult::failure("No outfit items provided");
        };

        let mut garments = Vec::new();
        for item in outfit.items() {
            match self.load_locator(&item.image_url).await {
                Some(image) => garments.push((item.name.as_str(), image)),
                None => tracing::warn!(item_id = %item.id, "garment photo unavailable"),
            }
        }
        if garments.is_empty() {
            return ComposeResult::failure(
                "None of the outfit items have a photo that could be loaded.",
            );
        }

        let base = match base_photo.filter(|b| !b.trim().is_empty()) {
            Some(locator) => match self.load_locator(locator).await {
                Some(image) => Some(image),
                None => {
                    tracing::warn!(%locator, "base photo unavailable, using default");
                    self.default_base_photo().await
                }
            },
            None => self.default_base_photo().await,
        };
        let Some(base) = base else {
            return ComposeResult::failure(
                "No photo of you was found. Add one to data/me/ and index the wardrobe.",
            );
        };

        let description = garments
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");

        let mut parts = vec![Part::text(format!(
            "The first image is a photo of a person. The remaining images are garments: \
             {description}. Generate a realistic photo of the same person wearing all of \
             these garments. Keep their face, body and pose unchanged."
        ))];
        parts.push(Part::image(
            BASE64_STANDARD.encode(&base.data),
            base.mime_type,
        ));
        for (_, garment) in garments {
            parts.push(Part::image(
                BASE64_STANDARD.encode(&garment.data),
                garment.mime_type,
            ));
        }

        let response = match self
            .model
            .generate(LanguageModelInput {
                modalities: Some(vec![Modality::Text, Modality::Image]),
                messages: vec![Message::user(parts)],
                ..Default::default()
            })
            .await
        {
            Ok(response) => response,
            Err(error) => return ComposeResult::failure(format!("Image generation failed: {error}")),
        };

        let Some(image_part) = response.first_image() else {
            return ComposeResult::failure("Image generation returned no image.");
        };
        let bytes = match BASE64_STANDARD.decode(&image_part.image_data) {
            Ok(bytes) => bytes,
            Err(error) => {
                return ComposeResult::failure(format!("Generated image could not be decoded: {error}"))
            }
        };

        let ext = image_part.mime_type.split('/').nth(1).unwrap_or("png");
        let path = format!(
            "{GENERATED_DIR}/{}-{}.{ext}",
            Utc::now().timestamp_millis(),
            item_id_from_path(&first_item.id)
        );
        if let Err(error) = self.storage.write(&path, &bytes).await {
            return ComposeResult::failure(format!("Generated image could not be saved: {error}"));
        }

        ComposeResult {
            locator: self.storage.locator(&path),
            success: true,
            message: Some(format!("Outfit image generated: {description}")),
        }
    }

    async fn load_locator(&self, locator: &str) -> Option<LoadedImage> {
        let path = path_from_locator(locator)?;
        self.load_path(&path).await
    }

    async fn load_path(&self, path: &str) -> Option<LoadedImage> {
        match self.storage.read(path).await {
            Ok(data) => Some(LoadedImage {
                mime_type: mime_type_for(path).to_string(),
                data,
            }),
            Err(error) => {
                tracing::debug!(%path, %error, "image read failed");
                None
            }
        }
    }

    /// First registered person photo, else the first image in `me/`.
    async fn default_base_photo(&self) -> Option<LoadedImage> {
        let photos = load_person_photos(self.storage.as_ref()).await;
        if let Some(photo) = photos.first() {
            let path = path_from_locator(&photo.path).or_else(|| path_from_locator(&photo.image_url));
            if let Some(path) = path {
                if let Some(image) = self.load_path(&path).await {
                    return Some(image);
                }
            }
            tracing::warn!(photo_id = %photo.id, "registered person photo unavailable");
        }

        let candidates = match self.storage.list(PERSON_PHOTO_DIR).await {
            Ok(candidates) => candidates,
            Err(error) => {
                tracing::debug!(%error, "no person photo directory");
                return None;
            }
        };
        let path = candidates.into_iter().find(|path| is_image_file(path))?;
        self.load_path(&path).await
    }
}
