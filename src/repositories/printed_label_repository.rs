use chrono::Utc;
use sea_orm::{sea_query::OnConflict, DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::entities::printed_label::{self, Entity as PrintedLabel};
use crate::errors::ServiceError;

/// Durable set of shipment codes whose preparation label was printed.
///
/// A check-then-record sequence runs while holding [`PrintedLabelRepository::lock`],
/// so two sequences for the same code never interleave.
#[derive(Clone)]
pub struct PrintedLabelRepository {
    db: Arc<DatabaseConnection>,
    guard: Arc<Mutex<()>>,
}

impl PrintedLabelRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            guard: Arc::new(Mutex::new(())),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().await
    }

    pub async fn is_printed(&self, code: &str) -> Result<bool, ServiceError> {
        let found = PrintedLabel::find_by_id(code.to_string())
            .one(self.db.as_ref())
            .await?;
        Ok(found.is_some())
    }

    /// Records `code`. Recording a code twice is a no-op.
    pub async fn record(&self, code: &str) -> Result<(), ServiceError> {
        let model = printed_label::ActiveModel {
            code: Set(code.to_string()),
            printed_at: Set(Utc::now()),
        };
        PrintedLabel::insert(model)
            .on_conflict(
                OnConflict::column(printed_label::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }
}
