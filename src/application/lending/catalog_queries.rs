use crate::domain::{CatalogId, Item, ItemId, ItemStatus};

use super::dependencies::{ServiceDependencies, load_catalog, load_item};
use super::errors::Result;

/// 蔵書ビュー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item_id: ItemId,
    pub catalog_id: CatalogId,
    pub title: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_country: String,
    pub total_copies: u32,
    pub available_copies: u32,
    pub status: ItemStatus,
    /// ステータスが`Available`かつ貸出可能な冊が残っている
    pub is_available: bool,
}

impl ItemView {
    pub fn from_item(item: &Item) -> Self {
        Self {
            item_id: item.id(),
            catalog_id: item.catalog_id(),
            title: item.title().as_str().to_string(),
            author_first_name: item.author().first_name().to_string(),
            author_last_name: item.author().last_name().to_string(),
            author_country: item.author().country().to_string(),
            total_copies: item.total_copies(),
            available_copies: item.available_copies(),
            status: item.status(),
            is_available: item.status() == ItemStatus::Available && item.available_copies() > 0,
        }
    }
}

/// 蔵書を1件取得する
#[tracing::instrument(skip(deps, item_id), fields(item_id = %item_id.value()))]
pub async fn get_item(deps: &ServiceDependencies, item_id: ItemId) -> Result<ItemView> {
    let item = load_item(deps, item_id).await?;
    Ok(ItemView::from_item(&item.value))
}

/// 目録に所属する蔵書をすべて取得する（削除済みを含む）
#[tracing::instrument(skip(deps, catalog_id), fields(catalog_id = %catalog_id.value()))]
pub async fn get_catalog_items(
    deps: &ServiceDependencies,
    catalog_id: CatalogId,
) -> Result<Vec<ItemView>> {
    let catalog = load_catalog(deps, catalog_id).await?;

    let items: Vec<ItemView> = catalog
        .value
        .items()
        .iter()
        .map(ItemView::from_item)
        .collect();

    tracing::debug!(count = items.len(), "Catalog items fetched");
    Ok(items)
}
