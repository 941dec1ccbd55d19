use serde::Serialize;
use utoipa::ToSchema;

/// One page of a listing. `page` is one-based; `total` counts every match.
#[derive(Serialize, Debug, ToSchema)]
pub struct PaginatedData<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

impl<T> PaginatedData<T> {
    pub const fn new(data: Vec<T>, page: u64, limit: u64, total: u64) -> Self {
        Self {
            data,
            page,
            limit,
            total,
        }
    }
}
