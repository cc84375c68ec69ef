//! Guest cart flow against a running server.
//!
//! The menu tests need `COMANDA_TEST_RESTAURANT_SLUG` pointing at a
//! restaurant with at least one available product.

#![allow(clippy::unwrap_used)]

use comanda_integration_tests::{base_url, client, restaurant_slug};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn cart(client: &Client) -> Value {
    client
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_new_visitor_has_empty_cart() {
    let body = cart(&client().unwrap()).await;
    assert_eq!(body["item_count"], 0);
    assert_eq!(body["total"], "0");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_add_item_requires_table() {
    let resp = client()
        .unwrap()
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": "p1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_guest_identity_persists() {
    let client = client().unwrap();
    let resp = client
        .put(format!("{}/api/cart/guest", base_url()))
        .json(&json!({ "name": "Ana", "phone": "+55 11 99999-0000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = cart(&client).await;
    assert_eq!(body["guest"]["name"], "Ana");
}

#[tokio::test]
#[ignore = "Requires running server and COMANDA_TEST_RESTAURANT_SLUG"]
async fn test_menu_binds_table_and_cart_accepts_items() {
    let Some(slug) = restaurant_slug() else {
        return;
    };
    let client = client().unwrap();

    let resp = client
        .get(format!("{}/menu/{slug}?table=7", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = cart(&client).await;
    assert_eq!(body["table"]["table_number"], 7);

    let html = resp.text().await.unwrap();
    let Some(product_id) = html
        .split("data-add-product=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
    else {
        return;
    };

    let resp = client
        .post(format!("{}/api/cart/items", base_url()))
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["item_count"], 2);

    let resp = client
        .patch(format!("{}/api/cart/items/{product_id}", base_url()))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["item_count"], 0);
}
