use anyhow::Result;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240501_000001_create_printed_labels_table::Migration)]
    }
}

mod m20240501_000001_create_printed_labels_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240501_000001_create_printed_labels_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PrintedLabels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PrintedLabels::Code)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PrintedLabels::PrintedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PrintedLabels::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PrintedLabels {
        Table,
        Code,
        PrintedAt,
    }
}

/// Brings the ledger schema up to date.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    info!("Running ledger migrations");
    match Migrator::up(db, None).await {
        Ok(()) => {
            info!("Ledger migrations completed");
            Ok(())
        }
        Err(e) => {
            error!("Ledger migration failed: {}", e);
            Err(e.into())
        }
    }
}
