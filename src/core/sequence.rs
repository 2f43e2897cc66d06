//! Atomic sequence numbers for request and order numbers.
//!
//! Each named counter is a row in `counters`; a value is taken by incrementing
//! the row in place and reading it back. Callers run this inside the same
//! transaction that inserts the numbered record, so a number is never handed
//! out twice and never burned by a failed insert.

use crate::{
    entities::{Counter, counter},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, prelude::*, sea_query::Expr};

/// Counter for maintenance request numbers
pub const MAINTENANCE_REQUEST: &str = "maintenance_request";
/// Counter for order numbers
pub const ORDER: &str = "order";

async fn increment<C: ConnectionTrait>(db: &C, name: &str) -> Result<u64> {
    let result = Counter::update_many()
        .col_expr(counter::Column::Value, Expr::col(counter::Column::Value).add(1))
        .filter(counter::Column::Name.eq(name))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Takes the next value of the named counter, creating the counter at 1 on first use.
pub async fn next_value<C>(db: &C, name: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    if increment(db, name).await? == 0 {
        let first = counter::ActiveModel {
            name: Set(name.to_string()),
            value: Set(1),
        };
        match first.insert(db).await {
            Ok(model) => return Ok(model.value),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Created concurrently; fall through and take the next value.
                increment(db, name).await?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Counter::find_by_id(name.to_string())
        .one(db)
        .await?
        .map(|c| c.value)
        .ok_or_else(|| Error::not_found("Counter", name))
}

/// Formats a maintenance request number (`MR-000001`).
#[must_use]
pub fn format_request_number(value: i64) -> String {
    format!("MR-{value:06}")
}

/// Formats an order number (`ORD-000001`).
#[must_use]
pub fn format_order_number(value: i64) -> String {
    format!("ORD-{value:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use sea_orm::TransactionTrait;

    #[tokio::test]
    async fn test_next_value_starts_at_one_and_increments() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(next_value(&db, "test").await?, 1);
        assert_eq!(next_value(&db, "test").await?, 2);
        assert_eq!(next_value(&db, "test").await?, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_counters_are_independent() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(next_value(&db, MAINTENANCE_REQUEST).await?, 1);
        assert_eq!(next_value(&db, ORDER).await?, 1);
        assert_eq!(next_value(&db, MAINTENANCE_REQUEST).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_rolled_back_value_is_reused() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(next_value(&db, ORDER).await?, 1);

        let txn = db.begin().await?;
        assert_eq!(next_value(&txn, ORDER).await?, 2);
        txn.rollback().await?;

        assert_eq!(next_value(&db, ORDER).await?, 2);
        Ok(())
    }

    #[test]
    fn test_number_formats() {
        assert_eq!(format_request_number(7), "MR-000007");
        assert_eq!(format_order_number(1234), "ORD-001234");
    }
}
