#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use axum::Router;
    use dotenvy::dotenv;
    use leptos::logging::log;
    use leptos::prelude::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};
    use player_qr_checkin::app::*;
    use player_qr_checkin::config::{AppConfig, AppContext};

    dotenv().ok();
    let config = AppConfig::from_env().expect("Invalid configuration");
    let sheets = config.open_sheets().expect("Failed to open the roster spreadsheet.");
    log!("Using the {} roster store", sheets.backend_tag());
    let context = AppContext::new(&config, sheets).expect("Failed to build app context.");

    let conf = get_configuration(None).unwrap();
    let addr = conf.leptos_options.site_addr;
    let leptos_options = conf.leptos_options;
    // Generate the list of routes in your Leptos App
    let routes = generate_route_list(App);

    let leptos_options_clone = leptos_options.clone();
    let app = Router::new()
        .leptos_routes_with_context(
            &leptos_options,
            routes,
            // Provide the spreadsheet handle and login settings to server functions.
            move || provide_context(context.clone()),
            move || shell(leptos_options_clone.clone()),
        )
        // Use shell for fallback.
        .fallback(leptos_axum::file_and_error_handler(shell))
        .with_state(leptos_options.clone());

    log!("listening on http://{}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

#[cfg(not(feature = "ssr"))]
pub fn main() {
    // no client-side main function
    // see lib.rs for hydration function instead
}
