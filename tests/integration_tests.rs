// Integration tests for Nutri Coach

use actix_web::{test, web, App};
use async_trait::async_trait;
use mockito::Matcher;
use nutri_coach::core::{
    AllergenChecker, ChatRouter, ExerciseSource, GatewayError, GeneratedReply, IngredientSource,
    MuscleQuery, ProfileSource, SourceError, TextGenerator,
};
use nutri_coach::models::{ExerciseRecord, FitnessLevel, Ingredient, MealRecord, NutritionFacts, UserProfile};
use nutri_coach::routes::{configure_routes, handle_json_payload_error, AppState};
use nutri_coach::services::{
    GenerationOptions, MealDbClient, NutritionCatalog, OllamaClient, ProfileStoreClient, WgerClient,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct FakeProfiles(HashMap<String, UserProfile>);

#[async_trait]
impl ProfileSource for FakeProfiles {
    async fn get_profile(&self, user_id: &str) -> Result<UserProfile, SourceError> {
        if user_id == "broken" {
            return Err(SourceError::Transport("profile store timed out".into()));
        }
        self.0
            .get(user_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("Profile not found for user {}", user_id)))
    }
}

struct FakeRecipes;

#[async_trait]
impl IngredientSource for FakeRecipes {
    async fn ingredients(&self, meal_name: &str) -> Result<Option<Vec<Ingredient>>, SourceError> {
        if meal_name.eq_ignore_ascii_case("pad thai") {
            return Ok(Some(vec![
                Ingredient { name: "Rice noodles".into(), measure: "200g".into() },
                Ingredient { name: "Peanuts".into(), measure: "30g".into() },
            ]));
        }
        Ok(None)
    }
}

struct FakeExercises;

#[async_trait]
impl ExerciseSource for FakeExercises {
    async fn by_muscles(&self, query: &MuscleQuery) -> Result<Vec<ExerciseRecord>, SourceError> {
        if query.muscle_group == "core" {
            return Err(SourceError::Transport("connection reset".into()));
        }
        Ok(vec![ExerciseRecord {
            name: format!("{} press", query.muscle_group),
            description: "Press it.".into(),
            primary_muscles: vec![query.muscle_group.clone()],
            secondary_muscles: vec![],
            equipment: vec![],
            category: query.muscle_group.clone(),
        }])
    }

    async fn by_name(&self, _name: &str) -> Result<Vec<ExerciseRecord>, SourceError> {
        Ok(vec![])
    }
}

struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedReply, GatewayError> {
        if prompt.contains("__fail__") {
            return Err(GatewayError::InvalidResponse("truncated body".into()));
        }
        Ok(GeneratedReply::Text("Here is my answer.".into()))
    }
}

fn test_profile() -> UserProfile {
    UserProfile {
        user_id: "u1".into(),
        name: "Alex".into(),
        age: Some(30),
        weight: Some(70.0),
        height: Some(175.0),
        gender: Some("female".into()),
        fitness_level: Some("intermediate".into()),
        allergies: vec!["peanut".into()],
        target_muscle_groups: vec!["chest".into(), "abs".into()],
        ..Default::default()
    }
}

fn test_state() -> AppState {
    let catalog = NutritionCatalog::from_records(vec![MealRecord {
        name: "Oat Bowl".into(),
        category: "Breakfast".into(),
        ingredients: vec![Ingredient { name: "Oats".into(), measure: "60g".into() }],
        instructions: String::new(),
        nutrition: Some(NutritionFacts { calories: 350.0, protein: 12.0, carbs: 60.0, fat: 7.0 }),
    }]);
    state_with(catalog, Arc::new(CannedGenerator))
}

fn state_with(catalog: NutritionCatalog, generator: Arc<dyn TextGenerator>) -> AppState {
    let catalog = Arc::new(catalog);

    let router = ChatRouter::new(
        catalog.clone(),
        AllergenChecker::with_substring_policy(Arc::new(FakeRecipes)),
        Arc::new(FakeExercises),
        generator,
    );

    let profiles = HashMap::from([("u1".to_string(), test_profile())]);

    AppState {
        router: Arc::new(router),
        profiles: Arc::new(FakeProfiles(profiles)),
        catalog,
    }
}

macro_rules! test_app {
    () => {
        test_app!(test_state())
    };
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_chat_unsafe_meal_is_refused() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({"message": "Is it safe to eat pad thai?", "userId": "u1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["intent"], "mealSafety");
    assert_eq!(body["response"], "NO, you should not eat pad thai. Here is my answer.");
}

#[actix_web::test]
async fn test_chat_unknown_user_proceeds_without_profile() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({"message": "hi", "userId": "nobody"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["intent"], "greeting");
}

#[actix_web::test]
async fn test_chat_profile_store_failure_is_bad_gateway() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({"message": "hi", "userId": "broken"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 502);
}

#[actix_web::test]
async fn test_chat_validation_errors() {
    let app = test_app!();

    let empty = test::TestRequest::post()
        .uri("/chat")
        .set_json(json!({"message": ""}))
        .to_request();
    let resp = test::call_service(&app, empty).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status_code"], 400);

    let malformed = test::TestRequest::post()
        .uri("/chat")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, malformed).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_json");
}

#[actix_web::test]
async fn test_simple_chat_gateway_failure() {
    let app = test_app!();

    let ok = test::TestRequest::post()
        .uri("/simple-chat")
        .set_json(json!({"message": "tell me something"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, ok).await;
    assert_eq!(body["response"], "Here is my answer.");

    let failing = test::TestRequest::post()
        .uri("/simple-chat")
        .set_json(json!({"message": "__fail__"}))
        .to_request();
    let resp = test::call_service(&app, failing).await;
    assert_eq!(resp.status(), 502);
}

#[actix_web::test]
async fn test_simple_chat_rejects_blank_message() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/simple-chat")
        .set_json(json!({"message": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status_code"], 400);
}

#[actix_web::test]
async fn test_simple_chat_json_reply_is_returned_as_string() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"prompt": "any hydration tips?"})))
        .with_status(200)
        .with_body(json!({"model": "llama3", "response": "{\"tip\": \"drink water\"}", "done": true}).to_string())
        .create_async()
        .await;

    let ollama = OllamaClient::new(server.url(), "llama3".into(), GenerationOptions::default(), Duration::from_secs(5))
        .unwrap();
    let app = test_app!(state_with(NutritionCatalog::from_records(vec![]), Arc::new(ollama)));

    let req = test::TestRequest::post()
        .uri("/simple-chat")
        .set_json(json!({"message": "  any hydration tips?  "}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    mock.assert_async().await;
    assert!(body["response"].is_string());
    let inner: Value = serde_json::from_str(body["response"].as_str().unwrap()).unwrap();
    assert_eq!(inner, json!({"tip": "drink water"}));
}

#[actix_web::test]
async fn test_fitness_recommendations() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/fitness-recommendations")
        .set_json(json!({"userId": "u1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let plan: Value = test::read_body_json(resp).await;
    assert_eq!(plan["fitnessLevel"], "intermediate");
    assert_eq!(plan["sets"], 4);
    assert_eq!(plan["groups"][0]["muscleGroup"], "chest");
    assert_eq!(plan["groups"][0]["fromCatalog"], true);
    assert_eq!(plan["fallbackGroups"], json!(["core"]));
    assert_eq!(plan["mealTargets"].as_array().unwrap().len(), 4);

    let missing = test::TestRequest::post()
        .uri("/fitness-recommendations")
        .set_json(json!({"userId": "ghost"}))
        .to_request();
    assert_eq!(test::call_service(&app, missing).await.status(), 404);
}

#[actix_web::test]
async fn test_health_and_reload() {
    let app = test_app!();

    let health: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["catalogMeals"], 1);

    let reload: Value =
        test::call_and_read_body_json(&app, test::TestRequest::post().uri("/catalog/reload").to_request()).await;
    assert_eq!(reload["meals"], 1);
}

#[actix_web::test]
async fn test_reload_endpoint_reads_rewritten_file() {
    let path = std::env::temp_dir().join(format!("nutri-reload-{}.json", uuid::Uuid::new_v4()));
    let entry = |name: &str| json!({"meal": {"name": name}, "nutrition": {"calories": 300, "protein": 20, "carbs": 30, "fat": 10}});
    tokio::fs::write(&path, json!([entry("Miso Soup")]).to_string()).await.unwrap();

    let app = test_app!(state_with(NutritionCatalog::from_file(path.clone()), Arc::new(CannedGenerator)));

    let first: Value =
        test::call_and_read_body_json(&app, test::TestRequest::post().uri("/catalog/reload").to_request()).await;
    assert_eq!(first["meals"], 1);

    tokio::fs::write(&path, json!([entry("Miso Soup"), entry("Soba Noodles")]).to_string())
        .await
        .unwrap();

    let second: Value =
        test::call_and_read_body_json(&app, test::TestRequest::post().uri("/catalog/reload").to_request()).await;
    assert_eq!(second["meals"], 2);

    let health: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(health["catalogMeals"], 2);

    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn test_mealdb_client_ingredients() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search.php")
        .match_query(Matcher::UrlEncoded("s".into(), "Pad Thai".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"meals": [
                {"strMeal": "Pad Thai Special", "strIngredient1": "Tofu", "strMeasure1": "100g"},
                {"strMeal": "Pad Thai", "strIngredient1": "Peanuts", "strMeasure1": "30g", "strIngredient2": ""}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let client = MealDbClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let ingredients = client.ingredients("Pad Thai").await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0].name, "Peanuts");
}

#[tokio::test]
async fn test_mealdb_client_no_results() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.php")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"meals": null}"#)
        .create_async()
        .await;

    let client = MealDbClient::new(server.url(), Duration::from_secs(5)).unwrap();
    assert_eq!(client.ingredients("Mystery Stew").await.unwrap(), None);
}

#[tokio::test]
async fn test_mealdb_server_error_is_transport() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.php")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = MealDbClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let err = client.ingredients("Pad Thai").await.unwrap_err();
    assert!(matches!(err, SourceError::Transport(_)));
}

#[tokio::test]
async fn test_wger_client_by_muscles() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/exerciseinfo/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("muscles".into(), "4".into()),
            Matcher::UrlEncoded("equipment".into(), "3,7".into()),
            Matcher::UrlEncoded("language".into(), "2".into()),
            Matcher::UrlEncoded("limit".into(), "12".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"count": 1, "results": [{
                "id": 1,
                "category": {"id": 11, "name": "Chest"},
                "muscles": [{"id": 4, "name": "Pectoralis major", "name_en": "Chest"}],
                "muscles_secondary": [],
                "equipment": [{"id": 3, "name": "Dumbbell"}],
                "translations": [{"name": "Dumbbell Fly", "description": "<p>Open the arms wide.</p>", "language": 2}]
            }]})
            .to_string(),
        )
        .create_async()
        .await;

    let client = WgerClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let query = MuscleQuery {
        muscle_group: "chest".into(),
        equipment: vec!["dumbbells".into()],
        level: FitnessLevel::Beginner,
    };
    let exercises = client.by_muscles(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0].name, "Dumbbell Fly");
    assert_eq!(exercises[0].description, "Open the arms wide.");
}

#[tokio::test]
async fn test_wger_search_fills_first_description() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/exercise/search/")
        .match_query(Matcher::UrlEncoded("term".into(), "deadlift".into()))
        .with_status(200)
        .with_body(
            json!({"suggestions": [
                {"value": "Deadlift", "data": {"id": 184, "base_id": 105, "name": "Deadlift", "category": "Legs"}},
                {"value": "Romanian Deadlift", "data": {"id": 507, "base_id": 351, "name": "Romanian Deadlift", "category": "Legs"}}
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/exerciseinfo/105/")
        .with_status(200)
        .with_body(
            json!({"id": 105, "translations": [{"name": "Deadlift", "description": "Hinge at the hips.", "language": 2}]})
                .to_string(),
        )
        .create_async()
        .await;

    let client = WgerClient::new(server.url(), Duration::from_secs(5)).unwrap();
    let exercises = client.by_name("deadlift").await.unwrap();

    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0].description, "Hinge at the hips.");
    assert_eq!(exercises[1].category, "Legs");
}

#[tokio::test]
async fn test_profile_store_client() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/projects/demo/databases/(default)/documents/users/u7")
        .with_status(200)
        .with_body(
            json!({
                "name": "projects/demo/databases/(default)/documents/users/u7",
                "fields": {
                    "name": {"stringValue": "Robin"},
                    "weight": {"doubleValue": 64.0},
                    "foodLikes": {"arrayValue": {"values": [{"stringValue": "oats"}]}}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/projects/demo/databases/(default)/documents/users/missing")
        .with_status(404)
        .with_body(r#"{"error": {"code": 404, "status": "NOT_FOUND"}}"#)
        .create_async()
        .await;

    let client = ProfileStoreClient::new(
        server.url(),
        "demo".into(),
        "users".into(),
        None,
        Duration::from_secs(5),
    )
    .unwrap();

    let profile = client.get_profile("u7").await.unwrap();
    assert_eq!(profile.user_id, "u7");
    assert_eq!(profile.name, "Robin");
    assert_eq!(profile.weight, Some(64.0));
    assert_eq!(profile.food_likes, vec!["oats"]);

    let err = client.get_profile("missing").await.unwrap_err();
    assert!(matches!(err, SourceError::NotFound(_)));
}

#[tokio::test]
async fn test_ollama_client_generate() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"model": "llama3", "stream": false, "prompt": "Say hi"})))
        .with_status(200)
        .with_body(json!({"model": "llama3", "response": " {\"greeting\": \"hi\"} ", "done": true}).to_string())
        .create_async()
        .await;

    let client = OllamaClient::new(server.url(), "llama3".into(), GenerationOptions::default(), Duration::from_secs(5))
        .unwrap();
    let reply = client.generate("Say hi").await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply, GeneratedReply::Structured(json!({"greeting": "hi"})));
}

#[tokio::test]
async fn test_ollama_client_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/generate")
        .with_status(404)
        .with_body(r#"{"error": "model 'llama3' not found"}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(server.url(), "llama3".into(), GenerationOptions::default(), Duration::from_secs(5))
        .unwrap();
    let err = client.generate("Say hi").await.unwrap_err();

    assert!(matches!(err, GatewayError::Status { status: 404, .. }));
}
