use std::sync::Arc;

use mongodb::Collection;

use crate::{
    application::ApplicationRecord, assistant::Assistant, config::Config, database::init_mongo,
};

pub struct AppState {
    pub config: Config,
    pub applications: Collection<ApplicationRecord>,
    pub assistant: Assistant,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let applications = init_mongo(&config.db_uri, &config.db_name)
            .await
            .expect("Database misconfigured!");
        let assistant = Assistant::new(&config);

        Arc::new(Self {
            config,
            applications,
            assistant,
        })
    }
}
