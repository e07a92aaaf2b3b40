use crate::utils::error::{CartError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 庫存服務使用的商品編號
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 庫存服務回傳的商品資料
///
/// 未知欄位保留在 `extra`, 持久化後原樣寫回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(id: ProductId, title: impl Into<String>, price: f64, image: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            image: image.into(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: ProductId,
    pub amount: u32,
}

/// 購物車中的一個商品及其數量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub amount: u32,
}

impl CartLine {
    pub fn new(mut product: Product, amount: u32) -> Self {
        // 只序列化購物車的數量
        product.extra.remove("amount");
        Self { product, amount }
    }

    pub fn id(&self) -> ProductId {
        self.product.id
    }

    pub fn subtotal(&self) -> f64 {
        self.product.price * f64::from(self.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
}

/// 有序的購物車項目, 商品編號不重複
///
/// 持久化格式為 JSON 陣列:
/// `[{"id":1,"title":"..","price":9.9,"image":"..","amount":2}]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立購物車, 拒絕重複編號與數量為 0 的項目
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self> {
        let cart = Self { lines };
        cart.check_invariants()?;
        Ok(cart)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let cart: Cart = serde_json::from_str(raw)?;
        cart.check_invariants()?;
        Ok(cart)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn find(&self, id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id() == id)
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.find(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 所有項目數量總和
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.amount)).sum()
    }

    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// 回傳新增 `line` 後的副本, 呼叫端需確保編號不存在
    pub(crate) fn with_line(&self, line: CartLine) -> Self {
        let mut lines = self.lines.clone();
        lines.push(line);
        Self { lines }
    }

    /// 回傳更新 `id` 數量後的副本
    pub(crate) fn with_amount(&self, id: ProductId, amount: u32) -> Self {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                if line.id() == id {
                    CartLine {
                        product: line.product.clone(),
                        amount,
                    }
                } else {
                    line.clone()
                }
            })
            .collect();
        Self { lines }
    }

    pub(crate) fn without(&self, id: ProductId) -> Self {
        let lines = self
            .lines
            .iter()
            .filter(|line| line.id() != id)
            .cloned()
            .collect();
        Self { lines }
    }

    fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for line in &self.lines {
            if !seen.insert(line.id()) {
                return Err(CartError::ValidationError {
                    message: format!("duplicate cart line for product {}", line.id()),
                });
            }
            if line.amount == 0 {
                return Err(CartError::ValidationError {
                    message: format!("cart line for product {} has zero amount", line.id()),
                });
            }
        }
        Ok(())
    }
}
