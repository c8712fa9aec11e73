use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::prelude::*;
use std::fs::create_dir_all;
use std::{fs, path};
use tokio::sync::OnceCell;

mod m20250601_000001_init;
mod m20250612_000001_create_relay;
mod m20250705_000001_create_occupancy;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_init::Migration),
            Box::new(m20250612_000001_create_relay::Migration),
            Box::new(m20250705_000001_create_occupancy::Migration),
        ]
    }
}

static DATABASE_CONNECTION: OnceCell<DatabaseConnection> = OnceCell::const_new();

pub async fn get_connection() -> &'static DatabaseConnection {
    DATABASE_CONNECTION.get_or_init(init_sqlite).await
}

pub async fn init_sqlite() -> DatabaseConnection {
    let db_path = crate::config::get_config().await.db_path.clone();
    let path = path::Path::new(&db_path);
    if !path.exists() {
        if let Some(parent) = path.parent() {
            create_dir_all(parent).expect("failed to create data dir");
        }
        fs::write(path, "").expect("failed to create sqlite file");
    }
    Database::connect(format!("sqlite://{}", db_path))
        .await
        .expect("failed to connect sqlite")
}
