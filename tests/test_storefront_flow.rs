//! Customer storefront flow over HTTP:
//! login -> browse -> cart -> checkout -> wallet/orders, plus the error
//! paths (empty cart, key exhaustion, wallet limit, missing session).

mod common;

use common::{client, login, seed_product, seed_users, spawn_server, CUSTOMER_PASSWORD};
use keymart::Storage;
use serde_json::{json, Value};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_storefront_checkout_flow() {
    let server = spawn_server().await;
    seed_users(&server.storage).await;
    let product_id = seed_product(&server.storage, "WIN11", "10.00", "19.55", 3).await;

    let http = client();

    // Session required for the cart.
    let resp = http
        .get(format!("{}/api/cart", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    login(&http, &server.base_url, "buyer", CUSTOMER_PASSWORD).await;

    // Tenant pricing: default host resolves EUR, X-Tenant switches to KM.
    let body: Value = http
        .get(format!("{}/api/products", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let products = body["data"]["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["price"], "10.00");
    assert_eq!(products[0]["currency"], "EUR");
    assert_eq!(products[0]["stock"], 3);

    let body: Value = http
        .get(format!("{}/api/products", server.base_url))
        .header("X-Tenant", "km")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["products"][0]["price"], "19.55");
    assert_eq!(body["data"]["products"][0]["currency"], "KM");

    // Cart add merges quantity on repeat add.
    for _ in 0..2 {
        let resp = http
            .post(format!("{}/api/cart", server.base_url))
            .json(&json!({ "product_id": product_id, "quantity": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
    let body: Value = http
        .get(format!("{}/api/cart", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(body["data"]["totals"]["final_amount"], "24.20");

    // Checkout: 2 x 10.00 + 21% VAT = 20.00 / 4.20 / 24.20.
    let resp = http
        .post(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let order = &body["data"]["order"];
    assert_eq!(order["total_amount"], "20.00");
    assert_eq!(order["tax_amount"], "4.20");
    assert_eq!(order["final_amount"], "24.20");
    assert_eq!(order["status"], "completed");
    assert_eq!(order["payment_status"], "paid");
    let order_number = order["order_number"].as_str().unwrap().to_string();
    assert!(order_number.starts_with("ORD-"));

    // One item per unit, each with a distinct license key.
    let order_items = body["data"]["items"].as_array().unwrap();
    assert_eq!(order_items.len(), 2);
    assert_ne!(order_items[0]["key_value"], order_items[1]["key_value"]);

    // Cart was cleared by checkout; a second checkout has nothing to buy.
    let body: Value = http
        .get(format!("{}/api/cart", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
    let resp = http
        .post(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Wallet derives from the completed order.
    let body: Value = http
        .get(format!("{}/api/wallet", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["spent"], "24.20");
    assert_eq!(body["data"]["balance"], "975.80");
    assert_eq!(body["data"]["available"], "1475.80");

    let body: Value = http
        .get(format!("{}/api/wallet/transactions", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let transactions = body["data"]["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2); // one purchase + the initial deposit
    assert_eq!(transactions[0]["kind"], "purchase");
    assert_eq!(transactions[0]["amount"], "-24.20");
    assert_eq!(transactions[1]["kind"], "deposit");

    // Order listing and detail (with keys) for the owner.
    let body: Value = http
        .get(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let orders = body["data"]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    let order_id = orders[0]["id"].as_i64().unwrap();

    let body: Value = http
        .get(format!("{}/api/orders/{}", server.base_url, order_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["order"]["order_number"], order_number.as_str());

    // Only one key is left; asking for two exhausts the pool.
    let resp = http
        .post(format!("{}/api/cart", server.base_url))
        .json(&json!({ "product_id": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = http
        .post(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // The failed checkout must not have consumed the last key or the cart.
    let body: Value = http
        .get(format!("{}/api/products/{}", server.base_url, product_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["stock"], 1);
    let body: Value = http
        .get(format!("{}/api/cart", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_wallet_limit_blocks_checkout() {
    let server = spawn_server().await;
    seed_users(&server.storage).await;
    // 130 x 10.00 = 1300.00 + 273.00 VAT = 1573.00 > 1500.00 headroom.
    let product_id = seed_product(&server.storage, "BIGBUY", "10.00", "10.00", 200).await;

    let http = client();
    login(&http, &server.base_url, "buyer", CUSTOMER_PASSWORD).await;

    let resp = http
        .post(format!("{}/api/cart", server.base_url))
        .json(&json!({ "product_id": product_id, "quantity": 130 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = http
        .post(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 402);

    // Nothing was spent and no keys were burned.
    let body: Value = http
        .get(format!("{}/api/wallet", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["spent"], "0");
    assert_eq!(
        server.storage.key_pool(product_id).await.unwrap().available,
        200
    );

    // A cart that fits the headroom still goes through.
    let resp = http
        .delete(format!("{}/api/cart", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = http
        .post(format!("{}/api/cart", server.base_url))
        .json(&json!({ "product_id": product_id, "quantity": 100 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = http
        .post(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["order"]["final_amount"], "1210.00");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tenant_scoping_of_carts_and_wallets() {
    let server = spawn_server().await;
    seed_users(&server.storage).await;
    let product_id = seed_product(&server.storage, "SCOPED", "10.00", "19.55", 5).await;

    let http = client();
    login(&http, &server.base_url, "buyer", CUSTOMER_PASSWORD).await;

    // Buy one unit on the KM storefront.
    let resp = http
        .post(format!("{}/api/cart", server.base_url))
        .header("X-Tenant", "km")
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = http
        .post(format!("{}/api/orders", server.base_url))
        .header("X-Tenant", "km")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    // KM price 19.55 + 21% VAT (4.11) = 23.66.
    assert_eq!(body["data"]["order"]["final_amount"], "23.66");

    // The EUR wallet and order list are untouched.
    let body: Value = http
        .get(format!("{}/api/wallet", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["spent"], "0");
    assert_eq!(body["data"]["currency"], "EUR");

    let body: Value = http
        .get(format!("{}/api/orders", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 0);

    let body: Value = http
        .get(format!("{}/api/wallet", server.base_url))
        .header("X-Tenant", "km")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["spent"], "23.66");
    assert_eq!(body["data"]["currency"], "KM");
}
