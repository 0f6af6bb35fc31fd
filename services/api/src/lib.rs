mod cli;
mod infra;
mod redact;
mod routes;
mod server;

use rent_management::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
