use super::{
    AggregateRoot, CatalogCreated, CatalogError, CatalogId, CatalogName, DomainEvent, Item,
    ItemAddedToCatalog, ItemId,
};

/// Catalog集約 - 蔵書の集まり
///
/// 不変条件：同じ（タイトル, 著者名, 著者姓, 著者の国）の蔵書は1つまで
///
/// 蔵書を目録から外す操作はない。不要になった蔵書は`Item::mark_as_deleted`で
/// 論理削除し、目録には残す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    id: CatalogId,
    name: CatalogName,
    items: Vec<Item>,
    events: Vec<DomainEvent>,
}

impl Catalog {
    pub fn create(id: CatalogId, name: CatalogName) -> Self {
        let event = DomainEvent::CatalogCreated(CatalogCreated {
            catalog_id: id,
            name: name.as_str().to_string(),
        });

        Self {
            id,
            name,
            items: Vec::new(),
            events: vec![event],
        }
    }

    /// 永続化された状態から復元する（イベントは積まない）
    pub fn restore(id: CatalogId, name: CatalogName, items: Vec<Item>) -> Self {
        Self {
            id,
            name,
            items,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> CatalogId {
        self.id
    }

    pub fn name(&self) -> &CatalogName {
        &self.name
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// 蔵書を追加する
    ///
    /// # エラー
    /// 同じタイトル・著者の蔵書がある場合は`CatalogError::DuplicateItem`
    pub fn add_item(&mut self, item: Item) -> Result<(), CatalogError> {
        if self
            .items
            .iter()
            .any(|existing| existing.has_same_title_and_author(&item))
        {
            return Err(CatalogError::DuplicateItem);
        }

        let item_id = item.id();
        self.items.push(item);
        self.events
            .push(DomainEvent::ItemAddedToCatalog(ItemAddedToCatalog {
                catalog_id: self.id,
                item_id,
            }));

        Ok(())
    }
}

impl AggregateRoot for Catalog {
    /// 所有する蔵書のイベントを先に、続けて目録自身のイベントを返す
    fn take_events(&mut self) -> Vec<DomainEvent> {
        let mut events: Vec<DomainEvent> = self
            .items
            .iter_mut()
            .flat_map(|item| item.take_events())
            .collect();
        events.append(&mut self.events);
        events
    }
}
