use crate::core::{
    Cart, CartLine, InventoryService, Messages, Notifier, PersistentStore, ProductId,
    UpdateProductAmount,
};
use crate::utils::error::{CartError, Result};
use std::fmt;
use tokio::sync::watch;

pub const DEFAULT_STORAGE_KEY: &str = "cart-store:cart";

/// 成功操作對購物車的影響
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Committed,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Remove,
    UpdateAmount,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Add => "add_product",
            Operation::Remove => "remove_product",
            Operation::UpdateAmount => "update_product_amount",
        };
        f.write_str(name)
    }
}

/// 購物車狀態, 每次變更同步寫入儲存
///
/// 目前的購物車放在 watch channel 中. 每個變更以最新提交的購物車為基準,
/// 先寫入儲存再對外可見, 儲存內容不會落後於記憶體.
/// 失敗時透過 [`Notifier`] 顯示訊息, 並回傳錯誤給呼叫端.
pub struct CartStore<I, S, N> {
    inventory: I,
    storage: S,
    notifier: N,
    key: String,
    messages: Messages,
    state: watch::Sender<Cart>,
}

impl<I, S, N> CartStore<I, S, N>
where
    I: InventoryService,
    S: PersistentStore,
    N: Notifier,
{
    pub fn open(inventory: I, storage: S, notifier: N) -> Result<Self> {
        Self::open_with_key(inventory, storage, notifier, DEFAULT_STORAGE_KEY)
    }

    /// 載入 `key` 下儲存的購物車, 沒有則為空
    pub fn open_with_key(
        inventory: I,
        storage: S,
        notifier: N,
        key: impl Into<String>,
    ) -> Result<Self> {
        let key = key.into();
        let cart = match storage.get(&key)? {
            Some(raw) => Cart::from_json(&raw)?,
            None => Cart::new(),
        };
        tracing::debug!("Restored cart with {} line(s) from '{}'", cart.len(), key);

        let (state, _) = watch::channel(cart);
        Ok(Self {
            inventory,
            storage,
            notifier,
            key,
            messages: Messages::default(),
            state,
        })
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn cart(&self) -> Cart {
        self.state.borrow().clone()
    }

    /// 訂閱每次提交後的購物車
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.state.subscribe()
    }

    /// 加入一件 `product_id`, 必要時建立新項目
    pub async fn add_product(&self, product_id: ProductId) -> Result<Change> {
        let result = self.try_add_product(product_id).await;
        self.report(Operation::Add, result)
    }

    /// 移除 `product_id` 項目, 不查詢庫存
    pub fn remove_product(&self, product_id: ProductId) -> Result<Change> {
        let result = self.commit(|cart| {
            if !cart.contains(product_id) {
                return Err(CartError::NotInCart { product_id });
            }
            Ok(cart.without(product_id))
        });
        self.report(Operation::Remove, result)
    }

    /// 設定項目數量, `<= 0` 的數量直接忽略
    pub async fn update_product_amount(&self, request: UpdateProductAmount) -> Result<Change> {
        if request.amount <= 0 {
            tracing::debug!(
                "Ignoring non-positive amount {} for product {}",
                request.amount,
                request.product_id
            );
            return Ok(Change::Unchanged);
        }

        let result = self.try_update_product_amount(request).await;
        self.report(Operation::UpdateAmount, result)
    }

    async fn try_add_product(&self, product_id: ProductId) -> Result<Change> {
        let (product, stock) = tokio::try_join!(
            self.inventory.product(product_id),
            self.inventory.stock(product_id)
        )?;
        tracing::debug!(
            "Fetched product {} ('{}') with {} unit(s) in stock",
            product.id,
            product.title,
            stock.amount
        );

        self.commit(move |cart| match cart.find(product_id) {
            None => {
                if stock.amount < 1 {
                    return Err(out_of_stock(product_id, 1, stock.amount));
                }
                Ok(cart.with_line(CartLine::new(product, 1)))
            }
            Some(line) => {
                let requested = i64::from(line.amount) + 1;
                match line.amount.checked_add(1) {
                    Some(next) if next <= stock.amount => Ok(cart.with_amount(product_id, next)),
                    _ => Err(out_of_stock(product_id, requested, stock.amount)),
                }
            }
        })
    }

    async fn try_update_product_amount(&self, request: UpdateProductAmount) -> Result<Change> {
        let UpdateProductAmount { product_id, amount } = request;

        let in_cart = self.state.borrow().contains(product_id);
        if !in_cart {
            return Err(CartError::NotInCart { product_id });
        }

        let stock = self.inventory.stock(product_id).await?;
        let amount = match u32::try_from(amount) {
            Ok(amount) if amount <= stock.amount => amount,
            _ => return Err(out_of_stock(product_id, amount, stock.amount)),
        };

        self.commit(|cart| {
            // 查詢庫存期間項目可能已被移除
            if !cart.contains(product_id) {
                return Err(CartError::NotInCart { product_id });
            }
            Ok(cart.with_amount(product_id, amount))
        })
    }

    /// 以最新購物車執行 `decide`, 寫入儲存後發佈; 任一步失敗則不變更
    fn commit<F>(&self, decide: F) -> Result<Change>
    where
        F: FnOnce(&Cart) -> Result<Cart>,
    {
        let mut outcome = Ok(Change::Unchanged);

        self.state.send_if_modified(|cart| {
            let persisted = decide(&*cart).and_then(|next| {
                let raw = next.to_json()?;
                self.storage.set(&self.key, &raw)?;
                Ok(next)
            });

            match persisted {
                Ok(next) => {
                    *cart = next;
                    outcome = Ok(Change::Committed);
                    true
                }
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        });

        outcome
    }

    fn report(&self, operation: Operation, result: Result<Change>) -> Result<Change> {
        match &result {
            Ok(Change::Committed) => {
                let cart = self.state.borrow();
                tracing::info!(
                    "{} committed: {} line(s), {} item(s)",
                    operation,
                    cart.len(),
                    cart.item_count()
                );
            }
            Ok(Change::Unchanged) => {}
            Err(err) => {
                tracing::warn!("{} rejected: {}", operation, err);
                self.notifier.error(self.message_for(operation, err));
            }
        }
        result
    }

    fn message_for(&self, operation: Operation, err: &CartError) -> &str {
        if let CartError::OutOfStock { .. } = err {
            return &self.messages.out_of_stock;
        }
        match operation {
            Operation::Add => &self.messages.add_failed,
            Operation::Remove => &self.messages.remove_failed,
            Operation::UpdateAmount => &self.messages.update_failed,
        }
    }
}

fn out_of_stock(product_id: ProductId, requested: i64, available: u32) -> CartError {
    CartError::OutOfStock {
        product_id,
        requested,
        available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryNotifier, MemoryStore};
    use crate::core::{Product, Stock};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Clone, Default)]
    struct FakeInventory {
        stock: Arc<Mutex<HashMap<ProductId, u32>>>,
        offline: bool,
        stock_gate: Option<Arc<Notify>>,
    }

    impl FakeInventory {
        fn with_stock(entries: &[(u64, u32)]) -> Self {
            let inventory = Self::default();
            {
                let mut stock = inventory.stock.lock().unwrap();
                for (id, amount) in entries {
                    stock.insert(ProductId::new(*id), *amount);
                }
            }
            inventory
        }

        /// `stock()` 會等到回傳的 handle 被通知
        fn gated(mut self) -> (Self, Arc<Notify>) {
            let gate = Arc::new(Notify::new());
            self.stock_gate = Some(gate.clone());
            (self, gate)
        }

        fn offline() -> Self {
            Self {
                offline: true,
                ..Self::default()
            }
        }

        fn lookup(&self, id: ProductId) -> Result<u32> {
            if self.offline {
                return Err(CartError::ServiceError {
                    message: "connection refused".to_string(),
                });
            }
            self.stock
                .lock()
                .unwrap()
                .get(&id)
                .copied()
                .ok_or_else(|| CartError::ServiceError {
                    message: format!("GET /stock/{} returned 404 Not Found", id),
                })
        }
    }

    #[async_trait]
    impl InventoryService for FakeInventory {
        async fn product(&self, id: ProductId) -> Result<Product> {
            tokio::task::yield_now().await;
            self.lookup(id)?;
            Ok(product(id.get()))
        }

        async fn stock(&self, id: ProductId) -> Result<Stock> {
            tokio::task::yield_now().await;
            if let Some(gate) = &self.stock_gate {
                gate.notified().await;
            }
            let amount = self.lookup(id)?;
            Ok(Stock { id, amount })
        }
    }

    struct BrokenStore;

    impl PersistentStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(CartError::StorageError {
                message: "disk full".to_string(),
            })
        }
    }

    type TestStore = CartStore<FakeInventory, MemoryStore, MemoryNotifier>;

    fn product(id: u64) -> Product {
        Product::new(
            ProductId::new(id),
            format!("Product {}", id),
            10.0 * id as f64,
            format!("https://img/{}.jpg", id),
        )
    }

    fn cart_of(lines: &[(u64, u32)]) -> Cart {
        Cart::from_lines(
            lines
                .iter()
                .map(|(id, amount)| CartLine::new(product(*id), *amount))
                .collect(),
        )
        .unwrap()
    }

    fn open_store(
        inventory: FakeInventory,
        initial: &[(u64, u32)],
    ) -> (TestStore, MemoryStore, MemoryNotifier) {
        let storage = if initial.is_empty() {
            MemoryStore::new()
        } else {
            MemoryStore::with_entry(DEFAULT_STORAGE_KEY, &cart_of(initial).to_json().unwrap())
        };
        let notifier = MemoryNotifier::new();
        let store = CartStore::open(inventory, storage.clone(), notifier.clone()).unwrap();
        (store, storage, notifier)
    }

    fn persisted(storage: &MemoryStore) -> Cart {
        let raw = storage.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        Cart::from_json(&raw).unwrap()
    }

    fn amounts(cart: &Cart) -> Vec<(u64, u32)> {
        cart.lines()
            .iter()
            .map(|line| (line.id().get(), line.amount))
            .collect()
    }

    #[tokio::test]
    async fn test_add_new_product_to_empty_cart() {
        let (store, storage, notifier) = open_store(FakeInventory::with_stock(&[(5, 3)]), &[]);

        let change = assert_ok!(store.add_product(ProductId::new(5)).await);

        assert_eq!(change, Change::Committed);
        assert_eq!(store.cart(), cart_of(&[(5, 1)]));
        assert_eq!(store.cart().lines()[0].product, product(5));
        assert_eq!(persisted(&storage), store.cart());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_amount() {
        let (store, storage, _) =
            open_store(FakeInventory::with_stock(&[(1, 5), (2, 5)]), &[(1, 2), (2, 1)]);

        assert_ok!(store.add_product(ProductId::new(1)).await);

        assert_eq!(amounts(&store.cart()), vec![(1, 3), (2, 1)]);
        assert_eq!(persisted(&storage), store.cart());
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_rejected() {
        let (store, storage, notifier) = open_store(FakeInventory::with_stock(&[(1, 1)]), &[(1, 1)]);

        let err = assert_err!(store.add_product(ProductId::new(1)).await);

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(storage.writes(), 0);
        assert_eq!(notifier.messages(), vec!["Requested quantity is out of stock"]);
    }

    #[tokio::test]
    async fn test_add_new_product_without_stock_is_rejected() {
        let (store, _, notifier) = open_store(FakeInventory::with_stock(&[(8, 0)]), &[]);

        assert_err!(store.add_product(ProductId::new(8)).await);

        assert!(store.cart().is_empty());
        assert_eq!(notifier.messages(), vec!["Requested quantity is out of stock"]);
    }

    #[tokio::test]
    async fn test_add_at_maximum_amount_is_rejected() {
        let (store, storage, notifier) =
            open_store(FakeInventory::with_stock(&[(1, u32::MAX)]), &[(1, u32::MAX)]);

        let err = assert_err!(store.add_product(ProductId::new(1)).await);

        assert!(matches!(
            err,
            CartError::OutOfStock { requested, available: u32::MAX, .. }
                if requested == i64::from(u32::MAX) + 1
        ));
        assert_eq!(amounts(&store.cart()), vec![(1, u32::MAX)]);
        assert_eq!(storage.writes(), 0);
        assert_eq!(notifier.messages(), vec!["Requested quantity is out of stock"]);
    }

    #[tokio::test]
    async fn test_add_with_service_failure() {
        let (store, storage, notifier) = open_store(FakeInventory::offline(), &[(1, 1)]);

        let err = assert_err!(store.add_product(ProductId::new(1)).await);

        assert!(matches!(err, CartError::ServiceError { .. }));
        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(storage.writes(), 0);
        assert_eq!(notifier.messages(), vec!["Failed to add product"]);
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let (store, _, notifier) = open_store(FakeInventory::with_stock(&[(1, 1)]), &[]);

        assert_err!(store.add_product(ProductId::new(404)).await);

        assert!(store.cart().is_empty());
        assert_eq!(notifier.messages(), vec!["Failed to add product"]);
    }

    #[tokio::test]
    async fn test_remove_product_keeps_order_of_others() {
        let (store, storage, notifier) = open_store(
            FakeInventory::default(),
            &[(1, 1), (2, 4), (3, 2)],
        );

        let change = assert_ok!(store.remove_product(ProductId::new(2)));

        assert_eq!(change, Change::Committed);
        assert_eq!(amounts(&store.cart()), vec![(1, 1), (3, 2)]);
        assert_eq!(persisted(&storage), store.cart());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_product() {
        let (store, storage, notifier) = open_store(FakeInventory::default(), &[(1, 1)]);
        let before = storage.get(DEFAULT_STORAGE_KEY).unwrap();

        let err = assert_err!(store.remove_product(ProductId::new(9)));

        assert!(matches!(err, CartError::NotInCart { .. }));
        assert_eq!(store.cart(), cart_of(&[(1, 1)]));
        assert_eq!(storage.get(DEFAULT_STORAGE_KEY).unwrap(), before);
        assert_eq!(storage.writes(), 0);
        assert_eq!(notifier.messages(), vec!["Failed to remove product"]);
    }

    #[tokio::test]
    async fn test_update_non_positive_amount_is_noop() {
        let (store, storage, notifier) = open_store(FakeInventory::offline(), &[(1, 2)]);

        for amount in [0, -3] {
            let change = assert_ok!(
                store
                    .update_product_amount(UpdateProductAmount {
                        product_id: ProductId::new(1),
                        amount,
                    })
                    .await
            );
            assert_eq!(change, Change::Unchanged);
        }

        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
        assert_eq!(storage.writes(), 0);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_update_amount_within_stock() {
        let (store, storage, _) =
            open_store(FakeInventory::with_stock(&[(1, 10), (2, 10)]), &[(1, 1), (2, 1)]);

        assert_ok!(
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(2),
                    amount: 10,
                })
                .await
        );

        assert_eq!(amounts(&store.cart()), vec![(1, 1), (2, 10)]);
        assert_eq!(persisted(&storage), store.cart());
        assert_eq!(storage.writes(), 1);
    }

    #[tokio::test]
    async fn test_update_amount_beyond_stock() {
        let (store, storage, notifier) = open_store(FakeInventory::with_stock(&[(1, 3)]), &[(1, 1)]);

        let err = assert_err!(
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(1),
                    amount: 4,
                })
                .await
        );

        assert!(matches!(err, CartError::OutOfStock { requested: 4, .. }));
        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(storage.writes(), 0);
        assert_eq!(notifier.messages(), vec!["Requested quantity is out of stock"]);
    }

    #[tokio::test]
    async fn test_update_amount_for_absent_line() {
        let (store, _, notifier) = open_store(FakeInventory::with_stock(&[(7, 3)]), &[(1, 1)]);

        let err = assert_err!(
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(7),
                    amount: 2,
                })
                .await
        );

        assert!(matches!(err, CartError::NotInCart { .. }));
        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(notifier.messages(), vec!["Failed to update product amount"]);
    }

    #[tokio::test]
    async fn test_update_amount_after_line_removed_during_lookup() {
        let (inventory, gate) = FakeInventory::with_stock(&[(1, 5), (2, 5)]).gated();
        let (store, storage, notifier) = open_store(inventory, &[(1, 1), (2, 1)]);

        let (updated, removed) = tokio::join!(
            store.update_product_amount(UpdateProductAmount {
                product_id: ProductId::new(1),
                amount: 3,
            }),
            async {
                tokio::task::yield_now().await;
                let removed = store.remove_product(ProductId::new(1));
                gate.notify_one();
                removed
            }
        );

        assert_ok!(removed);
        let err = assert_err!(updated);
        assert!(matches!(err, CartError::NotInCart { .. }));
        assert_eq!(amounts(&store.cart()), vec![(2, 1)]);
        assert_eq!(persisted(&storage), store.cart());
        assert_eq!(storage.writes(), 1);
        assert_eq!(notifier.messages(), vec!["Failed to update product amount"]);
    }

    #[tokio::test]
    async fn test_update_amount_with_service_failure() {
        let (store, _, notifier) = open_store(FakeInventory::offline(), &[(1, 1)]);

        assert_err!(
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(1),
                    amount: 2,
                })
                .await
        );

        assert_eq!(notifier.messages(), vec!["Failed to update product amount"]);
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_not_lost() {
        let (store, storage, _) = open_store(FakeInventory::with_stock(&[(1, 5)]), &[]);

        let (first, second) = tokio::join!(
            store.add_product(ProductId::new(1)),
            store.add_product(ProductId::new(1))
        );

        assert_ok!(first);
        assert_ok!(second);
        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
        assert_eq!(persisted(&storage), store.cart());
    }

    #[tokio::test]
    async fn test_subscribers_see_commits() {
        let (store, _, _) = open_store(FakeInventory::with_stock(&[(3, 2)]), &[]);
        let mut rx = store.subscribe();

        assert_ok!(store.add_product(ProductId::new(3)).await);

        assert!(rx.has_changed().unwrap());
        assert_eq!(amounts(&rx.borrow_and_update()), vec![(3, 1)]);

        assert_err!(store.remove_product(ProductId::new(99)));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cart_unchanged() {
        let notifier = MemoryNotifier::new();
        let store = CartStore::open(
            FakeInventory::with_stock(&[(1, 5)]),
            BrokenStore,
            notifier.clone(),
        )
        .unwrap();

        let err = assert_err!(store.add_product(ProductId::new(1)).await);

        assert!(matches!(err, CartError::StorageError { .. }));
        assert!(store.cart().is_empty());
        assert_eq!(notifier.messages(), vec!["Failed to add product"]);
    }

    #[tokio::test]
    async fn test_reopen_restores_committed_cart() {
        let inventory = FakeInventory::with_stock(&[(1, 5), (2, 5)]);
        let (store, storage, _) = open_store(inventory.clone(), &[]);

        assert_ok!(store.add_product(ProductId::new(1)).await);
        assert_ok!(store.add_product(ProductId::new(2)).await);
        assert_ok!(store.add_product(ProductId::new(2)).await);

        let reopened = CartStore::open(inventory, storage, MemoryNotifier::new()).unwrap();
        assert_eq!(reopened.cart(), store.cart());
        assert_eq!(amounts(&reopened.cart()), vec![(1, 1), (2, 2)]);
    }

    #[tokio::test]
    async fn test_custom_messages_and_key() {
        let storage = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let messages = Messages {
            out_of_stock: "Quantidade solicitada fora de estoque".to_string(),
            ..Messages::default()
        };
        let store = CartStore::open_with_key(
            FakeInventory::with_stock(&[(1, 1)]),
            storage.clone(),
            notifier.clone(),
            "@RocketShoes:cart",
        )
        .unwrap()
        .with_messages(messages);

        assert_ok!(store.add_product(ProductId::new(1)).await);
        assert_err!(store.add_product(ProductId::new(1)).await);

        assert!(storage.get("@RocketShoes:cart").unwrap().is_some());
        assert!(storage.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
        assert_eq!(notifier.messages(), vec!["Quantidade solicitada fora de estoque"]);
    }

    #[test]
    fn test_open_rejects_corrupted_cart() {
        let storage = MemoryStore::with_entry(DEFAULT_STORAGE_KEY, "{not json");
        let result = CartStore::open(FakeInventory::default(), storage, MemoryNotifier::new());
        assert!(matches!(result, Err(CartError::SerializationError(_))));
    }
}
