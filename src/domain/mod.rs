// 領域層: 購物車模型與外部介面

pub mod model;
pub mod ports;
