pub mod pagination;

pub use pagination::PaginationController;
