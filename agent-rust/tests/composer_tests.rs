mod common;

use base64::{engine::general_purpose::STANDARD, Engine};
use common::{image_response, sample_catalog, seeded_storage, text_response, ReadOnlyStorage};
use std::sync::Arc;
use stylist_agent::{
    composer::ImageComposer,
    planner::OutfitPlan,
    storage::{image_locator, MemoryStorage, GENERATED_DIR},
    ClothingItem,
};
use stylist_sdk::{sdk_test::MockLanguageModel, LanguageModelError, Message, Modality, Part};

fn outfit(catalog: &[ClothingItem], top: &str, bottom: &str) -> OutfitPlan {
    let find = |id: &str| catalog.iter().find(|item| item.id == id).cloned().unwrap();
    OutfitPlan {
        tops: vec![find(top)],
        bottoms: vec![find(bottom)],
        ..Default::default()
    }
}

fn user_images(message: &Message) -> Vec<(String, String)> {
    let Message::User(user) = message else {
        panic!("expected a user message, got {message:?}");
    };
    user.content
        .iter()
        .filter_map(|part| match part {
            Part::Image(image) => Some((image.mime_type.clone(), image.image_data.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn writes_composite_and_returns_locator() {
    let catalog = sample_catalog();
    let storage = seeded_storage(&catalog);
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(image_response());
    let composer = ImageComposer::new(model.clone(), storage.clone());

    let result = composer
        .compose(&outfit(&catalog, "top_tee", "bottom_jeans"), None)
        .await;

    assert!(result.success, "{result:?}");
    assert!(result
        .locator
        .starts_with(&image_locator(&format!("{GENERATED_DIR}/"))));
    assert_eq!(
        result.message.as_deref(),
        Some("Outfit image generated: White tee, Blue jeans")
    );

    let generated: Vec<_> = storage
        .paths()
        .into_iter()
        .filter(|path| path.starts_with("generated/"))
        .collect();
    assert_eq!(generated.len(), 1);
    assert!(generated[0].ends_with("-top_tee.png"), "{}", generated[0]);
    assert_eq!(storage.get(&generated[0]).unwrap(), b"hello world");
}

#[tokio::test]
async fn sends_person_photo_before_garments_and_asks_for_images() {
    let catalog = sample_catalog();
    let storage = seeded_storage(&catalog);
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(image_response());
    let composer = ImageComposer::new(model.clone(), storage);

    composer
        .compose(&outfit(&catalog, "top_tee", "bottom_jeans"), None)
        .await;

    let inputs = model.tracked_generate_inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(
        inputs[0].modalities,
        Some(vec![Modality::Text, Modality::Image])
    );
    assert_eq!(inputs[0].messages.len(), 1);
    assert_eq!(
        user_images(&inputs[0].messages[0]),
        vec![
            ("image/png".to_string(), STANDARD.encode("person")),
            ("image/jpeg".to_string(), STANDARD.encode("photo of top_tee")),
            ("image/jpeg".to_string(), STANDARD.encode("photo of bottom_jeans")),
        ]
    );
}

#[tokio::test]
async fn explicit_base_photo_wins_and_bad_one_falls_back() {
    let catalog = sample_catalog();
    let storage = seeded_storage(&catalog);
    storage.insert("me/side.jpg", b"side".to_vec());
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(image_response());
    model.enqueue_generate(image_response());
    let composer = ImageComposer::new(model.clone(), storage);
    let plan = outfit(&catalog, "top_tee", "bottom_jeans");

    assert!(composer
        .compose(&plan, Some(&image_locator("me/side.jpg")))
        .await
        .success);
    assert!(composer
        .compose(&plan, Some("https://example.com/nope.png"))
        .await
        .success);

    let inputs = model.tracked_generate_inputs();
    assert_eq!(
        user_images(&inputs[0].messages[0])[0].1,
        STANDARD.encode("side")
    );
    assert_eq!(
        user_images(&inputs[1].messages[0])[0].1,
        STANDARD.encode("person")
    );
}

#[tokio::test]
async fn falls_back_to_first_image_in_person_directory() {
    let catalog = sample_catalog();
    let storage = MemoryStorage::new();
    for item in &catalog {
        let path = stylist_agent::storage::path_from_locator(&item.image_url).unwrap();
        storage.insert(&path, b"garment".to_vec());
    }
    storage.insert("me/notes.txt", b"not a photo".to_vec());
    storage.insert("me/side.jpg", b"side".to_vec());
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(image_response());
    let composer = ImageComposer::new(model.clone(), Arc::new(storage));

    let result = composer
        .compose(&outfit(&catalog, "top_polo", "bottom_chinos"), None)
        .await;

    assert!(result.success, "{result:?}");
    let inputs = model.tracked_generate_inputs();
    assert_eq!(
        user_images(&inputs[0].messages[0])[0],
        ("image/jpeg".to_string(), STANDARD.encode("side"))
    );
}

#[tokio::test]
async fn fails_without_items_or_loadable_photos() {
    let catalog = sample_catalog();
    let model = Arc::new(MockLanguageModel::new());
    let composer = ImageComposer::new(model.clone(), seeded_storage(&catalog));

    let empty = composer.compose(&OutfitPlan::default(), None).await;
    assert!(!empty.success);
    assert!(empty.locator.is_empty());
    assert_eq!(empty.message.as_deref(), Some("No outfit items provided"));

    let mut missing = catalog[0].clone();
    missing.image_url = image_locator("tops/missing.jpg");
    let no_photos = composer
        .compose(
            &OutfitPlan {
                tops: vec![missing],
                ..Default::default()
            },
            None,
        )
        .await;
    assert!(!no_photos.success);
    assert!(no_photos.message.unwrap().contains("None of the outfit items"));
    assert_eq!(model.generate_calls(), 0);
}

#[tokio::test]
async fn fails_without_person_photo() {
    let catalog = sample_catalog();
    let storage = MemoryStorage::new();
    let path = stylist_agent::storage::path_from_locator(&catalog[0].image_url).unwrap();
    storage.insert(&path, b"garment".to_vec());
    let model = Arc::new(MockLanguageModel::new());
    let composer = ImageComposer::new(model.clone(), Arc::new(storage));

    let plan = OutfitPlan {
        tops: vec![catalog[0].clone()],
        ..Default::default()
    };
    let result = composer.compose(&plan, None).await;
    assert!(!result.success);
    assert!(result.message.unwrap().starts_with("No photo of you was found"));
    assert_eq!(model.generate_calls(), 0);
}

#[tokio::test]
async fn reports_model_failures_and_missing_images() {
    let catalog = sample_catalog();
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(LanguageModelError::InvalidInput("quota".to_string()));
    model.enqueue_generate(text_response("I cannot draw that"));
    let storage = seeded_storage(&catalog);
    let composer = ImageComposer::new(model.clone(), storage.clone());
    let plan = outfit(&catalog, "top_tee", "bottom_jeans");

    let failed = composer.compose(&plan, None).await;
    assert!(!failed.success);
    assert!(failed
        .message
        .unwrap()
        .starts_with("Image generation failed: Invalid input: quota"));

    let no_image = composer.compose(&plan, None).await;
    assert!(!no_image.success);
    assert_eq!(
        no_image.message.as_deref(),
        Some("Image generation returned no image.")
    );
    assert!(!storage.paths().iter().any(|p| p.starts_with("generated/")));
}

#[tokio::test]
async fn reports_write_failures() {
    let catalog = sample_catalog();
    let model = Arc::new(MockLanguageModel::new());
    model.enqueue_generate(image_response());
    let storage = Arc::new(ReadOnlyStorage(seeded_storage(&catalog)));
    let composer = ImageComposer::new(model, storage);

    let result = composer
        .compose(&outfit(&catalog, "top_tee", "bottom_jeans"), None)
        .await;
    assert!(!result.success);
    assert!(result.message.unwrap().contains("could not be saved"));
}
