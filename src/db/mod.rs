pub mod event;
pub mod payment;
pub mod ticket;
pub mod user;

use crate::PGPool;
use log::info;
use sqlx::postgres::PgPoolOptions;

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    info!("Connected to postgresql ({} connections max)", max_connections);
    Ok(pool)
}

pub async fn run_migrations(pool: &PGPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
