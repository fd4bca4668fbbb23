//! 实体与 DTO 之间的转换
//!
//! 映射函数都是纯函数；附件下载地址需要异步解析，由服务层解析后传入。

pub mod achievement;
pub mod approval;
pub mod localized_name;
pub mod reference;
pub mod user;

pub use localized_name::{from_columns, to_columns};
