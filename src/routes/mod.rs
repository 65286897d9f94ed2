use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{auth, chat, geocode, meetups, participants};
use crate::middleware::auth::{auth_middleware, optional_auth_middleware};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::user_rate_limit::{create_user_governor, RateLimitTier};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public_governor = create_public_governor();

    // Public auth routes (stricter per-IP limit)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    let account_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Browsing and discovery need no account
    let public_routes = Router::new()
        .route("/meetups", get(meetups::list_meetups))
        .route("/meetups/nearby", get(meetups::nearby_meetups))
        .route("/meetups/{id}", get(meetups::get_meetup))
        .route("/meetups/{id}/participants", get(participants::list_participants))
        .route("/meetups/{id}/messages", get(chat::list_messages))
        .route("/meetups/{id}/messages/stream", get(chat::stream_messages));

    let geocode_routes = Router::new()
        .route("/search", get(geocode::search))
        .route("/reverse", get(geocode::reverse))
        .layer(public_governor.clone());

    // Joining reports NotAuthenticated itself, so the token is optional and
    // the limit is per IP
    let join_routes = Router::new()
        .route("/meetups/{id}/join", post(participants::join_meetup))
        .layer(public_governor)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let member_routes = Router::new()
        .route("/meetups", post(meetups::create_meetup))
        .route("/meetups/{id}", delete(meetups::delete_meetup))
        .route(
            "/meetups/{id}/participants/{participant_id}",
            delete(participants::remove_participant),
        )
        .layer(create_user_governor(RateLimitTier::Standard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let chat_routes = Router::new()
        .route("/meetups/{id}/messages", post(chat::send_message))
        .layer(create_user_governor(RateLimitTier::Chat))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes.merge(account_routes))
        .nest("/api/geocode", geocode_routes)
        .nest(
            "/api",
            public_routes
                .merge(join_routes)
                .merge(member_routes)
                .merge(chat_routes),
        )
        .with_state(state)
}
