//! Admin back-office flow over HTTP: category tree, catalog + pricing,
//! license-key import, user management, ticket triage, role gating.

mod common;

use common::{client, login, seed_users, spawn_server, ADMIN_PASSWORD, CUSTOMER_PASSWORD};
use serde_json::{json, Value};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admin_catalog_and_key_management() {
    let server = spawn_server().await;
    seed_users(&server.storage).await;

    let admin = client();
    login(&admin, &server.base_url, "admin", ADMIN_PASSWORD).await;

    // Three-level category tree with materialized paths.
    let resp = admin
        .post(format!("{}/api/admin/categories", server.base_url))
        .json(&json!({ "name": "Software" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let root_id = body["data"]["category"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["category"]["path"], "software");
    assert_eq!(body["data"]["category"]["level"], 1);

    let resp = admin
        .post(format!("{}/api/admin/categories", server.base_url))
        .json(&json!({ "name": "Antivirus", "parent_id": root_id }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let child_id = body["data"]["category"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["category"]["path"], "software/antivirus");

    let resp = admin
        .post(format!("{}/api/admin/categories", server.base_url))
        .json(&json!({ "name": "Home Use", "parent_id": child_id }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let leaf_id = body["data"]["category"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["category"]["path"], "software/antivirus/home-use");
    assert_eq!(
        body["data"]["category"]["path_name"],
        "Software > Antivirus > Home Use"
    );

    // A fourth level is rejected.
    let resp = admin
        .post(format!("{}/api/admin/categories", server.base_url))
        .json(&json!({ "name": "Too Deep", "parent_id": leaf_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Breadcrumb and hierarchy endpoints reflect the tree.
    let body: Value = admin
        .get(format!("{}/api/categories/{}/path", server.base_url, leaf_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let crumb: Vec<&str> = body["data"]["breadcrumb"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(crumb, ["Software", "Antivirus", "Home Use"]);

    let body: Value = admin
        .get(format!("{}/api/categories/hierarchy", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let hierarchy = body["data"]["hierarchy"].as_array().unwrap();
    assert_eq!(hierarchy.len(), 1);
    assert_eq!(
        hierarchy[0]["children"][0]["children"][0]["name"],
        "Home Use"
    );

    // Product in the leaf category.
    let resp = admin
        .post(format!("{}/api/admin/products", server.base_url))
        .json(&json!({
            "sku": "AV-HOME-1Y",
            "name": "Antivirus Home 1 Year",
            "price": "12.50",
            "price_km": "24.45",
            "b2b_price": "9.90",
            "category_id": leaf_id,
            "platform": "Windows"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let product_id = body["data"]["product"]["id"].as_i64().unwrap();

    // Duplicate SKU conflicts.
    let resp = admin
        .post(format!("{}/api/admin/products", server.base_url))
        .json(&json!({
            "sku": "AV-HOME-1Y", "name": "dup", "price": "1.00", "price_km": "1.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Key import: two explicit keys (one duplicated) plus three generated.
    let resp = admin
        .post(format!("{}/api/admin/license-keys", server.base_url))
        .json(&json!({
            "product_id": product_id,
            "keys": ["AAAA-BBBB", "AAAA-BBBB", "CCCC-DDDD"],
            "generate": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["imported"], 5);

    let body: Value = admin
        .get(format!(
            "{}/api/admin/license-keys/{}",
            server.base_url, product_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["available"], 5);
    assert_eq!(body["data"]["used"], 0);

    // Storefront sees the product in the root category's subtree, and a
    // pricing update invalidates the cached listing.
    let body: Value = admin
        .get(format!(
            "{}/api/products?category_id={}",
            server.base_url, root_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["products"][0]["price"], "12.50");

    let resp = admin
        .put(format!(
            "{}/api/admin/products/{}",
            server.base_url, product_id
        ))
        .json(&json!({ "price": "13.99" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = admin
        .get(format!(
            "{}/api/products?category_id={}",
            server.base_url, root_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["products"][0]["price"], "13.99");

    // Deactivating hides the product from the storefront but not from admin.
    let resp = admin
        .put(format!(
            "{}/api/admin/products/{}",
            server.base_url, product_id
        ))
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = admin
        .get(format!("{}/api/products", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 0);

    let body: Value = admin
        .get(format!("{}/api/admin/products", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);

    // Category rename rebases the subtree paths.
    let resp = admin
        .put(format!(
            "{}/api/admin/categories/{}",
            server.base_url, root_id
        ))
        .json(&json!({ "name": "Apps" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = admin
        .get(format!("{}/api/categories/{}/path", server.base_url, leaf_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let leaf = body["data"]["breadcrumb"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(leaf["path"], "apps/antivirus/home-use");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_admin_users_and_tickets() {
    let server = spawn_server().await;
    seed_users(&server.storage).await;

    let admin = client();
    login(&admin, &server.base_url, "admin", ADMIN_PASSWORD).await;

    // Customer endpoints are gated for customers, admin endpoints for admins.
    let customer = client();
    login(&customer, &server.base_url, "buyer", CUSTOMER_PASSWORD).await;
    let resp = customer
        .get(format!("{}/api/admin/users", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // User management: create a KM reseller, reject short passwords.
    let resp = admin
        .post(format!("{}/api/admin/users", server.base_url))
        .json(&json!({
            "username": "reseller",
            "password": "reseller-secret-1",
            "tenant": "km",
            "email": "reseller@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let reseller_id = body["data"]["user"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["user"]["tenant"], "km");
    assert_eq!(body["data"]["user"]["role"], "customer");
    // Password hashes never leave the server.
    assert!(body["data"]["user"].get("password_hash").is_none());

    let resp = admin
        .post(format!("{}/api/admin/users", server.base_url))
        .json(&json!({ "username": "weak", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = admin
        .post(format!("{}/api/admin/users", server.base_url))
        .json(&json!({ "username": "reseller", "password": "reseller-secret-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // The new account can log in; a disabled one cannot.
    let reseller = client();
    login(&reseller, &server.base_url, "reseller", "reseller-secret-1").await;

    let resp = admin
        .put(format!("{}/api/admin/users/{}", server.base_url, reseller_id))
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client()
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "username": "reseller", "password": "reseller-secret-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Ticket flow: customer opens, admin triages, customer sees the status.
    let resp = customer
        .post(format!("{}/api/tickets", server.base_url))
        .json(&json!({ "subject": "Key not activating", "body": "Error 0xC004" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let ticket_id = body["data"]["ticket"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["ticket"]["status"], "open");

    let body: Value = admin
        .get(format!("{}/api/admin/tickets", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["tickets"].as_array().unwrap().len(), 1);

    let resp = admin
        .put(format!("{}/api/admin/tickets/{}", server.base_url, ticket_id))
        .json(&json!({ "status": "closed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = customer
        .get(format!("{}/api/tickets", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["tickets"][0]["status"], "closed");

    // Metrics reflect the state.
    let body: Value = admin
        .get(format!("{}/metrics", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["users"], 3);
    assert_eq!(body["data"]["open_tickets"], 0);
}
