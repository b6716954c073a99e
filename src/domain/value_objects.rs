use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// タイトルの最大文字数
pub const MAX_TITLE_LENGTH: usize = 500;

/// 著者の各項目（名・姓・国）の最大文字数
pub const MAX_AUTHOR_FIELD_LENGTH: usize = 200;

/// 目録名の最大文字数
pub const MAX_CATALOG_NAME_LENGTH: usize = 200;

/// 蔵書ID - 貸出対象の1タイトル分の所蔵
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

/// 貸出ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

/// 利用者ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorrowerId(Uuid);

impl BorrowerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BorrowerId {
    fn default() -> Self {
        Self::new()
    }
}

/// 目録ID - 蔵書をまとめる所蔵場所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogId(Uuid);

impl CatalogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for CatalogId {
    fn default() -> Self {
        Self::new()
    }
}

/// 書名
///
/// 不変条件：空白のみは不可、500文字以内
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Title(String);

impl Title {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if value.chars().count() > MAX_TITLE_LENGTH {
            return Err(ValidationError::TitleTooLong {
                max: MAX_TITLE_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Title {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Title> for String {
    fn from(title: Title) -> Self {
        title.0
    }
}

/// 著者
///
/// 名・姓・国の組で識別される。目録内の重複判定に使われる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AuthorFields")]
pub struct Author {
    first_name: String,
    last_name: String,
    country: String,
}

#[derive(Deserialize)]
struct AuthorFields {
    first_name: String,
    last_name: String,
    country: String,
}

impl TryFrom<AuthorFields> for Author {
    type Error = ValidationError;

    fn try_from(fields: AuthorFields) -> Result<Self, Self::Error> {
        Self::new(fields.first_name, fields.last_name, fields.country)
    }
}

impl Author {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            first_name: author_field("first name", first_name.into())?,
            last_name: author_field("last name", last_name.into())?,
            country: author_field("country", country.into())?,
        })
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

fn author_field(field: &'static str, value: String) -> Result<String, ValidationError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ValidationError::EmptyAuthorField { field });
    }
    if value.chars().count() > MAX_AUTHOR_FIELD_LENGTH {
        return Err(ValidationError::AuthorFieldTooLong {
            field,
            max: MAX_AUTHOR_FIELD_LENGTH,
        });
    }
    Ok(value)
}

/// 目録名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogName(String);

impl CatalogName {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ValidationError::EmptyCatalogName);
        }
        if value.chars().count() > MAX_CATALOG_NAME_LENGTH {
            return Err(ValidationError::CatalogNameTooLong {
                max: MAX_CATALOG_NAME_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CatalogName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CatalogName> for String {
    fn from(name: CatalogName) -> Self {
        name.0
    }
}
