use crate::api::state::{build_pool, AppState};
use crate::api::user::CurrentUser;
use dotenv::dotenv;
use lazy_static::lazy_static;
use uuid::Uuid;

lazy_static! {
    static ref TEST_STATE: AppState = {
        dotenv().ok();
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env file");
        AppState::new(build_pool(&database_url, 5))
    };
}

pub fn setup_test_state() -> AppState {
    TEST_STATE.clone()
}

/// A fresh user per test, so tests never see each other's rows.
pub fn test_user() -> CurrentUser {
    CurrentUser(format!("test-{}", Uuid::new_v4()))
}
