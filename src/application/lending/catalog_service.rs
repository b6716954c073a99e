use crate::domain::{
    AggregateRoot, Author, Catalog, CatalogId, CatalogName, Item, ItemId, Title, commands::*,
};
use crate::ports::{Pending, UnitOfWork};

use super::dependencies::{
    ServiceDependencies, commit_and_publish, load_catalog, load_item, with_conflict_retry,
};
use super::errors::{LendingApplicationError, Result};

/// 目録を作成する
#[tracing::instrument(skip(deps))]
pub async fn create_catalog(deps: &ServiceDependencies, cmd: CreateCatalog) -> Result<CatalogId> {
    let name = CatalogName::new(cmd.name)?;
    let mut catalog = Catalog::create(CatalogId::new(), name);
    let catalog_id = catalog.id();

    let events = catalog.take_events();
    let unit_of_work = UnitOfWork::new()
        .with_catalog(Pending::insert(catalog))
        .with_events(events);
    commit_and_publish(deps, unit_of_work).await?;

    tracing::info!(catalog_id = %catalog_id.value(), "Catalog created");
    Ok(catalog_id)
}

/// 目録に蔵書を追加する
///
/// ビジネスルール：
/// - 冊数が1以上であること（冊数の検証はここだけで行う）
/// - 目録内で（タイトル, 著者）が重複しないこと
///
/// # 戻り値
/// 作成された蔵書のID
#[tracing::instrument(skip(deps), fields(catalog_id = %cmd.catalog_id.value()))]
pub async fn add_item_to_catalog(
    deps: &ServiceDependencies,
    cmd: AddItemToCatalog,
) -> Result<ItemId> {
    if cmd.quantity <= 0 {
        return Err(LendingApplicationError::InvalidQuantity);
    }
    let quantity =
        u32::try_from(cmd.quantity).map_err(|_| LendingApplicationError::InvalidQuantity)?;

    let title = Title::new(cmd.title.as_str())?;
    let author = Author::new(
        cmd.author_first_name.as_str(),
        cmd.author_last_name.as_str(),
        cmd.author_country.as_str(),
    )?;
    let item_id = ItemId::new();

    with_conflict_retry("add_item_to_catalog", || {
        try_add_item_to_catalog(
            deps,
            cmd.catalog_id,
            item_id,
            title.clone(),
            author.clone(),
            quantity,
        )
    })
    .await
}

async fn try_add_item_to_catalog(
    deps: &ServiceDependencies,
    catalog_id: CatalogId,
    item_id: ItemId,
    title: Title,
    author: Author,
    quantity: u32,
) -> Result<ItemId> {
    let mut catalog = load_catalog(deps, catalog_id).await?;

    let item = Item::create(item_id, title, author, quantity, catalog_id);
    catalog.value.add_item(item)?;

    let events = catalog.value.take_events();
    let unit_of_work = UnitOfWork::new()
        .with_catalog(Pending::update(catalog))
        .with_events(events);
    commit_and_publish(deps, unit_of_work).await?;

    tracing::info!(item_id = %item_id.value(), quantity, "Item added to catalog");
    Ok(item_id)
}

/// 在庫を追加する
#[tracing::instrument(skip(deps), fields(item_id = %cmd.item_id.value()))]
pub async fn add_stock(deps: &ServiceDependencies, cmd: AddStock) -> Result<()> {
    with_conflict_retry("add_stock", || async {
        let mut item = load_item(deps, cmd.item_id).await?;
        item.value.add_stock(cmd.count)?;

        let events = item.value.take_events();
        let unit_of_work = UnitOfWork::new()
            .with_item(Pending::update(item))
            .with_events(events);
        commit_and_publish(deps, unit_of_work).await
    })
    .await?;

    tracing::info!(count = cmd.count, "Stock added");
    Ok(())
}

/// 蔵書を削除する
///
/// 貸出可能な冊が残っている間は削除できない。削除済みの蔵書は目録に残り、
/// 以降の貸出・在庫追加は拒否される。貸出中だった冊の返却は引き続き受け付ける。
#[tracing::instrument(skip(deps), fields(item_id = %cmd.item_id.value()))]
pub async fn delete_item(deps: &ServiceDependencies, cmd: DeleteItem) -> Result<()> {
    with_conflict_retry("delete_item", || async {
        let mut item = load_item(deps, cmd.item_id).await?;
        item.value.mark_as_deleted()?;

        let events = item.value.take_events();
        let unit_of_work = UnitOfWork::new()
            .with_item(Pending::update(item))
            .with_events(events);
        commit_and_publish(deps, unit_of_work).await
    })
    .await?;

    tracing::info!("Item deleted");
    Ok(())
}
