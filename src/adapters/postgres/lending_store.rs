use crate::domain::{
    Author, Borrower, BorrowerId, Catalog, CatalogId, CatalogName, DomainEvent, Item, ItemId,
    ItemStatus, Loan, LoanId, LoanPeriod, Title,
};
use crate::ports::lending_store::{
    LendingStore as LendingStoreTrait, OutboxEntry, Pending, Result, StoreError, UnitOfWork,
    Versioned,
};
use crate::ports::loan_read_model::{LoanReadModel as LoanReadModelTrait, LoanView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::str::FromStr;

type Tx = Transaction<'static, Postgres>;

/// sqlxのエラーをStoreErrorに変換する
///
/// 一意制約違反は、読み込み後に他のトランザクションが先に書き込んだことを示すため競合として扱う。
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let is_unique_violation = err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());

    if is_unique_violation {
        StoreError::Conflict
    } else {
        StoreError::Backend(Box::new(err))
    }
}

fn corrupt_row<E>(err: E) -> StoreError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    StoreError::Backend(err.into())
}

fn copies_from_row(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.get(column);
    u32::try_from(value).map_err(|_| corrupt_row(format!("{} out of range: {}", column, value)))
}

/// PostgreSQLの行データをItemに変換する
fn map_row_to_item(row: &PgRow) -> Result<Item> {
    let title = Title::new(row.get::<String, _>("title")).map_err(corrupt_row)?;
    let author = Author::new(
        row.get::<String, _>("author_first_name"),
        row.get::<String, _>("author_last_name"),
        row.get::<String, _>("author_country"),
    )
    .map_err(corrupt_row)?;
    let status = ItemStatus::from_str(row.get("status")).map_err(corrupt_row)?;

    Ok(Item::restore(
        ItemId::from_uuid(row.get("id")),
        title,
        author,
        copies_from_row(row, "total_copies")?,
        copies_from_row(row, "available_copies")?,
        status,
        CatalogId::from_uuid(row.get("catalog_id")),
    ))
}

/// PostgreSQLの行データをLoanに変換する
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let period =
        LoanPeriod::new(row.get("period_start"), row.get("period_end")).map_err(corrupt_row)?;

    Ok(Loan::restore(
        LoanId::from_uuid(row.get("id")),
        BorrowerId::from_uuid(row.get("borrower_id")),
        ItemId::from_uuid(row.get("item_id")),
        period,
        row.get("returned_at"),
    ))
}

const ITEM_COLUMNS: &str = r#"
    id, catalog_id, title, author_first_name, author_last_name, author_country,
    total_copies, available_copies, status, version
"#;

/// LendingStoreのPostgreSQL実装
///
/// 集約ごとに`version`列を持ち、更新は`WHERE version = 読み込み時のバージョン`で行う。
/// 1件も更新できなければ競合とする。イベントは同じトランザクションで`outbox`に書き込む。
/// 貸出Read Modelも同じテーブルから提供する。
#[allow(dead_code)]
pub struct LendingStore {
    pool: PgPool,
}

#[allow(dead_code)]
impl LendingStore {
    /// PostgreSQLコネクションプールから新しいLendingStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn save_catalog(tx: &mut Tx, pending: &Pending<Catalog>) -> Result<()> {
        let catalog = &pending.value;

        match pending.expected_version {
            None => {
                sqlx::query("INSERT INTO catalogs (id, name, version) VALUES ($1, $2, 1)")
                    .bind(catalog.id().value())
                    .bind(catalog.name().as_str())
                    .execute(&mut **tx)
                    .await
                    .map_err(map_sqlx_error)?;
            }
            Some(expected) => {
                let result = sqlx::query(
                    r#"
                    UPDATE catalogs
                    SET name = $2, version = version + 1
                    WHERE id = $1 AND version = $3
                    "#,
                )
                .bind(catalog.id().value())
                .bind(catalog.name().as_str())
                .bind(expected)
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict);
                }
            }
        }

        // 目録に追加されたばかりの蔵書を作成する（既存の蔵書は蔵書自身の保存で更新する）
        for item in catalog.items() {
            sqlx::query(
                r#"
                INSERT INTO items (
                    id, catalog_id, title, author_first_name, author_last_name, author_country,
                    total_copies, available_copies, status, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(item.id().value())
            .bind(item.catalog_id().value())
            .bind(item.title().as_str())
            .bind(item.author().first_name())
            .bind(item.author().last_name())
            .bind(item.author().country())
            .bind(i64::from(item.total_copies()))
            .bind(i64::from(item.available_copies()))
            .bind(item.status().as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    async fn save_item(tx: &mut Tx, pending: &Pending<Item>) -> Result<()> {
        let item = &pending.value;

        let result = match pending.expected_version {
            None => sqlx::query(
                r#"
                INSERT INTO items (
                    id, catalog_id, title, author_first_name, author_last_name, author_country,
                    total_copies, available_copies, status, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1)
                "#,
            )
            .bind(item.id().value())
            .bind(item.catalog_id().value())
            .bind(item.title().as_str())
            .bind(item.author().first_name())
            .bind(item.author().last_name())
            .bind(item.author().country())
            .bind(i64::from(item.total_copies()))
            .bind(i64::from(item.available_copies()))
            .bind(item.status().as_str())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?,
            Some(expected) => sqlx::query(
                r#"
                UPDATE items
                SET total_copies = $2,
                    available_copies = $3,
                    status = $4,
                    version = version + 1
                WHERE id = $1 AND version = $5
                "#,
            )
            .bind(item.id().value())
            .bind(i64::from(item.total_copies()))
            .bind(i64::from(item.available_copies()))
            .bind(item.status().as_str())
            .bind(expected)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?,
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        Ok(())
    }

    async fn save_borrower(tx: &mut Tx, pending: &Pending<Borrower>) -> Result<()> {
        let borrower = &pending.value;

        let result = match pending.expected_version {
            None => sqlx::query("INSERT INTO borrowers (id, version) VALUES ($1, 1)")
                .bind(borrower.id().value())
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_error)?,
            Some(expected) => sqlx::query(
                "UPDATE borrowers SET version = version + 1 WHERE id = $1 AND version = $2",
            )
            .bind(borrower.id().value())
            .bind(expected)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?,
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        for loan in borrower.loans() {
            sqlx::query(
                r#"
                INSERT INTO loans (id, borrower_id, item_id, period_start, period_end, returned_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id)
                DO UPDATE SET
                    period_start = EXCLUDED.period_start,
                    period_end = EXCLUDED.period_end,
                    returned_at = EXCLUDED.returned_at
                "#,
            )
            .bind(loan.id().value())
            .bind(loan.borrower_id().value())
            .bind(loan.item_id().value())
            .bind(loan.period().start())
            .bind(loan.period().end())
            .bind(loan.returned_at())
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    /// イベントをアウトボックスに書き込み、採番されたIDを返す
    ///
    /// UNNESTで一括INSERTする。`WITH ORDINALITY`で入力順に採番させる。
    async fn append_to_outbox(tx: &mut Tx, events: &[DomainEvent]) -> Result<Vec<i64>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut event_types = Vec::with_capacity(events.len());
        let mut payloads = Vec::with_capacity(events.len());
        for event in events {
            event_types.push(event.event_type());
            payloads.push(serde_json::to_value(event).map_err(corrupt_row)?);
        }

        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO outbox (event_type, payload)
            SELECT event_type, payload
            FROM UNNEST($1::varchar[], $2::jsonb[]) WITH ORDINALITY AS e(event_type, payload, ord)
            ORDER BY ord
            RETURNING id
            "#,
        )
        .bind(&event_types)
        .bind(&payloads)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)
        .map(|mut ids| {
            ids.sort_unstable();
            ids
        })
    }
}

#[async_trait]
impl LendingStoreTrait for LendingStore {
    async fn load_catalog(&self, catalog_id: CatalogId) -> Result<Option<Versioned<Catalog>>> {
        let Some(row) = sqlx::query("SELECT name, version FROM catalogs WHERE id = $1")
            .bind(catalog_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let name = CatalogName::new(row.get::<String, _>("name")).map_err(corrupt_row)?;
        let version: i64 = row.get("version");

        let item_rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE catalog_id = $1 ORDER BY created_at, id",
            ITEM_COLUMNS
        ))
        .bind(catalog_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let items = item_rows
            .iter()
            .map(map_row_to_item)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Versioned {
            value: Catalog::restore(catalog_id, name, items),
            version,
        }))
    }

    async fn load_item(&self, item_id: ItemId) -> Result<Option<Versioned<Item>>> {
        let row = sqlx::query(&format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS))
            .bind(item_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Versioned {
            value: map_row_to_item(&row)?,
            version: row.get("version"),
        }))
    }

    async fn load_borrower(&self, borrower_id: BorrowerId) -> Result<Option<Versioned<Borrower>>> {
        let Some(version) =
            sqlx::query_scalar::<_, i64>("SELECT version FROM borrowers WHERE id = $1")
                .bind(borrower_id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT id, borrower_id, item_id, period_start, period_end, returned_at
            FROM loans
            WHERE borrower_id = $1
            ORDER BY period_start ASC, id
            "#,
        )
        .bind(borrower_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let loans = rows.iter().map(map_row_to_loan).collect::<Result<Vec<_>>>()?;

        Ok(Some(Versioned {
            value: Borrower::restore(borrower_id, loans),
            version,
        }))
    }

    /// 変更を1つのトランザクションでコミットする
    ///
    /// エラー時はトランザクションがドロップされ、ロールバックされる。
    async fn commit(&self, unit_of_work: UnitOfWork) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for catalog in &unit_of_work.catalogs {
            Self::save_catalog(&mut tx, catalog).await?;
        }
        for item in &unit_of_work.items {
            Self::save_item(&mut tx, item).await?;
        }
        for borrower in &unit_of_work.borrowers {
            Self::save_borrower(&mut tx, borrower).await?;
        }
        let outbox_ids = Self::append_to_outbox(&mut tx, &unit_of_work.events).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        tracing::debug!(
            catalogs = unit_of_work.catalogs.len(),
            items = unit_of_work.items.len(),
            borrowers = unit_of_work.borrowers.len(),
            events = unit_of_work.events.len(),
            "Unit of work committed"
        );
        Ok(outbox_ids)
    }

    /// 未配信のイベントを書き込み順に読み込む
    ///
    /// (id) WHERE published_at IS NULL の部分インデックスを使用する。
    async fn unpublished_events(&self, limit: usize) -> Result<Vec<OutboxEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, payload
            FROM outbox
            WHERE published_at IS NULL
            ORDER BY id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> Result<OutboxEntry> {
                let payload: serde_json::Value = row.get("payload");
                let event: DomainEvent = serde_json::from_value(payload).map_err(corrupt_row)?;
                Ok(OutboxEntry {
                    id: row.get("id"),
                    event,
                })
            })
            .collect()
    }

    async fn mark_published(&self, ids: &[i64], published_at: DateTime<Utc>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE outbox
            SET published_at = $2
            WHERE id = ANY($1) AND published_at IS NULL
            "#,
        )
        .bind(ids)
        .bind(published_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[async_trait]
impl LoanReadModelTrait for LendingStore {
    /// 延滞中の貸出を検索
    ///
    /// (period_end) WHERE returned_at IS NULL の部分インデックスを使用する。
    async fn find_overdue_loans(
        &self,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Vec<LoanView>> {
        let rows = sqlx::query(
            r#"
            SELECT id, borrower_id, item_id, period_start, period_end, returned_at
            FROM loans
            WHERE returned_at IS NULL AND period_end < $1
            ORDER BY period_end ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows.iter().map(map_row_to_loan).collect::<Result<Vec<_>>>()?;
        Ok(loans
            .iter()
            .map(|loan| LoanView::from_loan(loan, now))
            .collect())
    }

    /// 未返却の貸出を検索
    async fn find_active_loans(
        &self,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Vec<LoanView>> {
        let rows = sqlx::query(
            r#"
            SELECT id, borrower_id, item_id, period_start, period_end, returned_at
            FROM loans
            WHERE returned_at IS NULL
            ORDER BY period_end ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let loans = rows.iter().map(map_row_to_loan).collect::<Result<Vec<_>>>()?;
        Ok(loans
            .iter()
            .map(|loan| LoanView::from_loan(loan, now))
            .collect())
    }

    /// 利用者の全貸出を検索（貸出履歴）
    async fn find_by_borrower_id(
        &self,
        borrower_id: BorrowerId,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Vec<LoanView>> {
        let rows = sqlx::query(
            r#"
            SELECT id, borrower_id, item_id, period_start, period_end, returned_at
            FROM loans
            WHERE borrower_id = $1
            ORDER BY period_start DESC
            "#,
        )
        .bind(borrower_id.value())
        .fetch_all(&self.pool)
        .await?;

        let loans = rows.iter().map(map_row_to_loan).collect::<Result<Vec<_>>>()?;
        Ok(loans
            .iter()
            .map(|loan| LoanView::from_loan(loan, now))
            .collect())
    }

    /// IDで貸出を取得
    async fn get_by_id(
        &self,
        loan_id: LoanId,
        now: DateTime<Utc>,
    ) -> crate::ports::loan_read_model::Result<Option<LoanView>> {
        let row = sqlx::query(
            r#"
            SELECT id, borrower_id, item_id, period_start, period_end, returned_at
            FROM loans
            WHERE id = $1
            "#,
        )
        .bind(loan_id.value())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(LoanView::from_loan(&map_row_to_loan(&row)?, now))),
            None => Ok(None),
        }
    }
}
