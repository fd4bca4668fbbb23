//! 分页与排序
//!
//! 排序字段是封闭枚举，拼接进 SQL 的只有白名单内的列名

use serde::{Deserialize, Serialize};

/// 可排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderField {
    CreatedAt,
    UpdatedAt,
}

impl OrderField {
    fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// 主排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub direction: SortDirection,
}

impl Ordering {
    pub fn newest_first() -> Self {
        Self {
            field: OrderField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// 分页请求
///
/// `limit` 为空时返回全部匹配行；负值在此处归零，不会进入 SQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: Option<i64>,
    pub ordering: Option<Ordering>,
}

impl PageRequest {
    pub fn new(offset: i64, limit: Option<i64>) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.map(|l| l.max(0)),
            ordering: None,
        }
    }

    pub fn with_ordering(mut self, ordering: Option<Ordering>) -> Self {
        self.ordering = ordering;
        self
    }

    /// 生成 ORDER BY 子句，始终以 oid 升序作为次级排序保证结果稳定
    pub fn order_by_clause(&self, alias: &str) -> String {
        match self.ordering {
            Some(o) => format!(
                "ORDER BY {alias}.{} {}, {alias}.oid ASC",
                o.field.column(),
                o.direction.keyword()
            ),
            None => format!("ORDER BY {alias}.oid ASC"),
        }
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    /// 请求未指定 limit 时等于 total
    pub limit: i64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, page: &PageRequest) -> Self {
        Self {
            items,
            total,
            offset: page.offset,
            limit: page.limit.unwrap_or(total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
