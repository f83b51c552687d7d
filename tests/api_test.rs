mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use common::{PASSWORD, RecipePayload, TestApp, amount};
use serde_json::{Value, json};

#[tokio::test]
async fn test_account_lifecycle() -> Result<()> {
    let app = TestApp::new().await?;
    let (_, auth) = app.sign_up("vasya").await?;

    let registration = |username: &str, password: &str| {
        json!({
            "email": format!("{username}.other@example.com"),
            "username": username,
            "first_name": "V",
            "last_name": "P",
            "password": password,
        })
    };

    let response = app
        .server
        .post("/api/users")
        .json(&registration("vasya", "Secret-pass1"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_field_error!(body, "username", "already exists");

    let response = app
        .server
        .post("/api/users")
        .json(&registration("petya", "12345678"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_field_error!(body, "password", "entirely numeric");

    let response = app
        .server
        .post("/api/auth/token/login")
        .json(&json!({ "email": "vasya@example.com", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_field_error!(body, "non_field_errors", "Unable to log in");

    let (status, body) = app
        .post_json(
            "/api/users/set_password",
            &auth,
            &json!({ "new_password": "Another456!", "current_password": "nope" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_field_error!(body, "current_password", "Invalid password");

    let (status, _) = app
        .post_json(
            "/api/users/set_password",
            &auth,
            &json!({ "new_password": "Another456!", "current_password": PASSWORD }),
        )
        .await;
    assert_eq!(status, 204);

    let (status, _) = app.post_json("/api/auth/token/logout", &auth, &json!({})).await;
    assert_eq!(status, 204);

    let response = app
        .server
        .get("/api/users/me")
        .add_header(AUTHORIZATION, auth)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["detail"], "Invalid token.");

    let response = app
        .server
        .post("/api/auth/token/login")
        .json(&json!({ "email": "vasya@example.com", "password": "Another456!" }))
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["auth_token"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_recipe_lifecycle() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_catalog().await?;
    let (author_id, auth) = app.sign_up("chef").await?;

    let invalid = json!({
        "ingredients": [{ "id": 1, "amount": 100 }, { "id": 1, "amount": 50 }],
        "tags": [],
        "image": "not-an-image",
        "name": "Broken",
        "text": "",
        "cooking_time": 0,
    });
    let (status, body) = app.post_json("/api/recipes", &auth, &invalid).await;
    assert_eq!(status, 400);
    assert_field_error!(body, "ingredients", "must not repeat");
    assert_field_error!(body, "tags", "At least one tag");
    assert_field_error!(body, "image", "valid image");
    assert_field_error!(body, "text", "may not be blank");
    assert_field_error!(body, "cooking_time", "at least 1");

    let pancakes = RecipePayload::builder()
        .name("Pancakes")
        .tags(vec![1])
        .ingredients(vec![amount(1, 250), amount(3, 300)])
        .build();
    let id = app.create_recipe(&auth, &pancakes).await?;

    let response = app.server.get(&format!("/api/recipes/{id}")).await;
    response.assert_status_ok();
    let recipe: Value = response.json();
    assert_eq!(recipe["author"]["id"], author_id);
    assert_eq!(recipe["ingredients"].as_array().map(Vec::len), Some(2));
    assert_eq!(recipe["cooking_time"], 20);

    let image_url = recipe["image"].as_str().unwrap_or_default().to_string();
    app.server.get(&image_url).await.assert_status_ok();

    let update = json!({
        "name": "Fluffy pancakes",
        "tags": [1, 2],
        "ingredients": [{ "id": 2, "amount": 30 }],
    });
    let response = app
        .server
        .patch(&format!("/api/recipes/{id}"))
        .add_header(AUTHORIZATION, auth.clone())
        .json(&update)
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["name"], "Fluffy pancakes");
    assert_eq!(updated["text"], "Mix everything together.");
    assert_eq!(updated["image"], image_url.as_str());
    assert_eq!(updated["tags"].as_array().map(Vec::len), Some(2));
    assert_eq!(updated["ingredients"], json!([{ "id": 2, "name": "Sugar", "measurement_unit": "g", "amount": 30 }]));

    let response = app
        .server
        .patch(&format!("/api/recipes/{id}"))
        .add_header(AUTHORIZATION, auth.clone())
        .json(&json!({ "name": "No tags" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_field_error!(body, "tags", "required");
    assert_field_error!(body, "ingredients", "required");

    app.server
        .delete(&format!("/api/recipes/{id}"))
        .add_header(AUTHORIZATION, auth)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get(&format!("/api/recipes/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_favorites_and_filters() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_catalog().await?;
    let (author_id, author) = app.sign_up("author").await?;
    let (_, reader) = app.sign_up("reader").await?;

    let porridge = RecipePayload::builder()
        .name("Porridge")
        .tags(vec![1])
        .ingredients(vec![amount(3, 200)])
        .build();
    let soup = RecipePayload::builder()
        .name("Soup")
        .tags(vec![2])
        .ingredients(vec![amount(1, 10)])
        .build();
    let porridge_id = app.create_recipe(&author, &porridge).await?;
    app.create_recipe(&author, &soup).await?;

    let path = format!("/api/recipes/{porridge_id}/favorite");
    let (status, body) = app.post_json(&path, &reader, &json!({})).await;
    assert_eq!(status, 201);
    assert_eq!(body["name"], "Porridge");
    assert!(body.get("text").is_none());

    let (status, body) = app.post_json(&path, &reader, &json!({})).await;
    assert_eq!(status, 400);
    assert_eq!(body["errors"], "Recipe is already in favorites");

    let response = app
        .server
        .get("/api/recipes")
        .add_query_param("is_favorited", "1")
        .add_header(AUTHORIZATION, reader.clone())
        .await;
    let favorites: Value = response.json();
    assert_eq!(favorites["count"], 1);
    assert_eq!(favorites["results"][0]["is_favorited"], true);

    let anonymous: Value = app
        .server
        .get("/api/recipes")
        .add_query_param("is_favorited", "1")
        .await
        .json();
    assert_eq!(anonymous["count"], 2);

    let lunch: Value = app
        .server
        .get("/api/recipes")
        .add_query_param("tags", "lunch")
        .await
        .json();
    assert_eq!(lunch["count"], 1);
    assert_eq!(lunch["results"][0]["name"], "Soup");

    let both: Value = app
        .server
        .get(&format!("/api/recipes?tags=lunch&tags=breakfast&author={author_id}"))
        .await
        .json();
    assert_eq!(both["count"], 2);

    let response = app
        .server
        .get("/api/recipes")
        .add_query_param("author", "someone")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, reader.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let response = app
        .server
        .delete(&path)
        .add_header(AUTHORIZATION, reader)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "delete_error");

    Ok(())
}

#[tokio::test]
async fn test_shopping_cart_sums_ingredients() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_catalog().await?;
    let (_, auth) = app.sign_up("cook").await?;

    let bread = RecipePayload::builder()
        .name("Bread")
        .tags(vec![1])
        .ingredients(vec![amount(1, 200), amount(2, 50)])
        .build();
    let cake = RecipePayload::builder()
        .name("Cake")
        .tags(vec![1])
        .ingredients(vec![amount(1, 100), amount(3, 250)])
        .build();
    for recipe in [&bread, &cake] {
        let id = app.create_recipe(&auth, recipe).await?;
        let (status, _) = app
            .post_json(&format!("/api/recipes/{id}/shopping_cart"), &auth, &json!({}))
            .await;
        assert_eq!(status, 201);
    }

    let response = app
        .server
        .get("/api/recipes/download_shopping_cart")
        .add_header(AUTHORIZATION, auth)
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.header(CONTENT_DISPOSITION),
        "attachment; filename=\"cook_cart.txt\""
    );
    assert_eq!(
        response.text(),
        "Shopping list:\n- Flour (g) - 300\n- Milk (ml) - 250\n- Sugar (g) - 50\n"
    );

    Ok(())
}

#[tokio::test]
async fn test_subscriptions() -> Result<()> {
    let app = TestApp::new().await?;
    app.seed_catalog().await?;
    let (author_id, author) = app.sign_up("author").await?;
    let (reader_id, reader) = app.sign_up("reader").await?;

    for name in ["Borscht", "Pelmeni", "Blini"] {
        let recipe = RecipePayload::builder()
            .name(name)
            .tags(vec![2])
            .ingredients(vec![amount(1, 100)])
            .build();
        app.create_recipe(&author, &recipe).await?;
    }

    let (status, body) = app
        .post_json(&format!("/api/users/{reader_id}/subscribe"), &reader, &json!({}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["errors"], "You cannot subscribe to yourself");

    let path = format!("/api/users/{author_id}/subscribe");
    let (status, body) = app.post_json(&path, &reader, &json!({})).await;
    assert_eq!(status, 201);
    assert_eq!(body["username"], "author");
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 3);

    let (status, _) = app.post_json(&path, &reader, &json!({})).await;
    assert_eq!(status, 400);

    let response = app
        .server
        .get("/api/users/subscriptions")
        .add_query_param("recipes_limit", "1")
        .add_header(AUTHORIZATION, reader.clone())
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["recipes_count"], 3);
    assert_eq!(page["results"][0]["recipes"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["results"][0]["recipes"][0]["name"], "Blini");

    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, reader.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete(&path)
        .add_header(AUTHORIZATION, reader)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_pagination_links() -> Result<()> {
    let app = TestApp::with_page_size(2).await?;
    app.seed_catalog().await?;
    let (_, auth) = app.sign_up("baker").await?;

    let mut names = Vec::new();
    for index in 1..=5 {
        let name = format!("Recipe {index}");
        let recipe = RecipePayload::builder()
            .name(name.as_str())
            .tags(vec![1])
            .ingredients(vec![amount(2, index)])
            .build();
        app.create_recipe(&auth, &recipe).await?;
        names.push(name);
    }

    let first: Value = app.server.get("/api/recipes").await.json();
    assert_eq!(first["count"], 5);
    assert_eq!(first["next"], "/api/recipes?page=2");
    assert!(first["previous"].is_null());
    assert_eq!(first["results"][0]["name"], "Recipe 5");

    let last: Value = app
        .server
        .get("/api/recipes")
        .add_query_param("page", "3")
        .await
        .json();
    assert_eq!(last["results"].as_array().map(Vec::len), Some(1));
    assert!(last["next"].is_null());
    assert_eq!(last["previous"], "/api/recipes?page=2");

    app.server
        .get("/api/recipes")
        .add_query_param("page", "4")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let everything: Value = app
        .server
        .get("/api/recipes")
        .add_query_param("limit", "10")
        .await
        .json();
    let listed: Vec<String> = everything["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    assert_contains_all!(listed, &names);
    assert!(everything["next"].is_null());

    Ok(())
}
