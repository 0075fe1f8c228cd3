use crate::{
    cli::actions::server::{store_kind, StoreKind},
    store::postgres::apply_schema,
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
}

/// Execute the schema action.
/// # Errors
/// Returns an error if the DSN is not Postgres or a statement fails.
pub async fn execute(args: Args) -> Result<()> {
    match store_kind(&args.dsn)? {
        StoreKind::Memory => {
            info!("In-memory store needs no schema");
            Ok(())
        }
        StoreKind::Postgres => apply_schema(&args.dsn).await,
    }
}
