use crate::transport::http::handlers::{
    admin, auth, cart, categories, health, orders, products, tickets, wallet,
};
use crate::transport::http::tenant::resolve_tenant;
use crate::transport::http::types::{
    AddToCartRequest, ApiResponse, AppState, CreateCategoryRequest, CreateProductRequest,
    CreateTicketRequest, CreateUserRequest, ImportKeysRequest, LoginRequest,
    UpdateCategoryRequest, UpdateProductRequest, UpdateTicketRequest, UpdateUserRequest,
};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        health::readycheck_handler,
        health::metrics_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        products::list_products_handler,
        products::get_product_handler,
        categories::list_categories_handler,
        categories::category_hierarchy_handler,
        categories::categories_by_level_handler,
        categories::category_children_handler,
        categories::category_path_handler,
        cart::get_cart_handler,
        cart::add_to_cart_handler,
        cart::remove_cart_item_handler,
        cart::clear_cart_handler,
        orders::checkout_handler,
        orders::list_orders_handler,
        orders::get_order_handler,
        wallet::get_wallet_handler,
        wallet::wallet_transactions_handler,
        tickets::create_ticket_handler,
        tickets::list_my_tickets_handler,
        admin::admin_list_products_handler,
        admin::admin_create_product_handler,
        admin::admin_update_product_handler,
        admin::admin_create_category_handler,
        admin::admin_update_category_handler,
        admin::admin_list_users_handler,
        admin::admin_create_user_handler,
        admin::admin_update_user_handler,
        admin::admin_import_keys_handler,
        admin::admin_key_pool_handler,
        admin::admin_list_tickets_handler,
        admin::admin_update_ticket_handler
    ),
    components(schemas(
        ApiResponse,
        LoginRequest,
        AddToCartRequest,
        CreateProductRequest,
        UpdateProductRequest,
        CreateCategoryRequest,
        UpdateCategoryRequest,
        CreateUserRequest,
        UpdateUserRequest,
        ImportKeysRequest,
        CreateTicketRequest,
        UpdateTicketRequest
    ))
)]
#[allow(dead_code)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/ready", get(health::readycheck_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/products", get(products::list_products_handler))
        .route("/api/products/:id", get(products::get_product_handler))
        .route("/api/categories", get(categories::list_categories_handler))
        .route(
            "/api/categories/hierarchy",
            get(categories::category_hierarchy_handler),
        )
        .route(
            "/api/categories/level/:level",
            get(categories::categories_by_level_handler),
        )
        .route(
            "/api/categories/:id/children",
            get(categories::category_children_handler),
        )
        .route(
            "/api/categories/:id/path",
            get(categories::category_path_handler),
        )
        .route(
            "/api/cart",
            get(cart::get_cart_handler)
                .post(cart::add_to_cart_handler)
                .delete(cart::clear_cart_handler),
        )
        .route(
            "/api/cart/:product_id",
            axum::routing::delete(cart::remove_cart_item_handler),
        )
        .route(
            "/api/orders",
            get(orders::list_orders_handler).post(orders::checkout_handler),
        )
        .route("/api/orders/:id", get(orders::get_order_handler))
        .route("/api/wallet", get(wallet::get_wallet_handler))
        .route(
            "/api/wallet/transactions",
            get(wallet::wallet_transactions_handler),
        )
        .route(
            "/api/tickets",
            get(tickets::list_my_tickets_handler).post(tickets::create_ticket_handler),
        )
        .route(
            "/api/admin/products",
            get(admin::admin_list_products_handler).post(admin::admin_create_product_handler),
        )
        .route(
            "/api/admin/products/:id",
            put(admin::admin_update_product_handler),
        )
        .route(
            "/api/admin/categories",
            post(admin::admin_create_category_handler),
        )
        .route(
            "/api/admin/categories/:id",
            put(admin::admin_update_category_handler),
        )
        .route(
            "/api/admin/users",
            get(admin::admin_list_users_handler).post(admin::admin_create_user_handler),
        )
        .route("/api/admin/users/:id", put(admin::admin_update_user_handler))
        .route(
            "/api/admin/license-keys",
            post(admin::admin_import_keys_handler),
        )
        .route(
            "/api/admin/license-keys/:product_id",
            get(admin::admin_key_pool_handler),
        )
        .route(
            "/api/admin/tickets",
            get(admin::admin_list_tickets_handler),
        )
        .route(
            "/api/admin/tickets/:id",
            put(admin::admin_update_ticket_handler),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            resolve_tenant,
        ))
        .with_state(app_state)
}
