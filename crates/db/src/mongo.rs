//! MongoDB client wrapper

use bson::doc;
use std::time::Duration;

use mongodb::{options::ClientOptions, Client, Collection};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::Result;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// MongoDB client bound to one database
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the server answers a ping
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast instead of hanging when MongoDB is unreachable
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout = Some(CONNECT_TIMEOUT);
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.app_name = Some("folio".to_string());

        let client = Client::with_options(options)?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        self.client.database(&self.db_name).collection::<T>(name)
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}
