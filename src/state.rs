use std::sync::Arc;

use crate::remote::LocalStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LocalStore>,
}
