use anyhow::Context;
use cart_store::core::{ConfigProvider, Notifier};
use cart_store::utils::error::ErrorCategory;
use cart_store::utils::{logger, validation::Validate};
use cart_store::{
    open_store, Cart, CartCommand, CartError, CliConfig, ConsoleNotifier, ProductId, TomlConfig,
    TracingNotifier, UpdateProductAmount,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting cart-store CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config: Box<dyn ConfigProvider> = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = TomlConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path))?
                .with_overrides(&cli);
            validate_or_exit(&config);
            Box::new(config)
        }
        None => {
            validate_or_exit(&cli);
            Box::new(cli.clone())
        }
    };

    // JSON 日誌模式下, 錯誤訊息改以日誌事件輸出
    let notifier: Box<dyn Notifier> = if cli.json_logs {
        Box::new(TracingNotifier)
    } else {
        Box::new(ConsoleNotifier)
    };

    let store = match open_store(&*config, notifier) {
        Ok(store) => store,
        Err(e) => fail(&e),
    };

    let result = match cli.command {
        CartCommand::Show => Ok(cart_store::Change::Unchanged),
        CartCommand::Add { product_id } => store.add_product(ProductId::new(product_id)).await,
        CartCommand::Remove { product_id } => store.remove_product(ProductId::new(product_id)),
        CartCommand::Update { product_id, amount } => {
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId::new(product_id),
                    amount,
                })
                .await
        }
    };

    print_cart(&store.cart());

    match result {
        Ok(change) => {
            tracing::debug!("Command finished: {:?}", change);
            Ok(())
        }
        // 使用者訊息已由 notifier 顯示
        Err(e) => {
            tracing::error!("Category: {:?}, cause: {}", e.category(), e);
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(e.category()));
        }
    }
}

fn validate_or_exit(config: &impl Validate) {
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }
}

fn fail(e: &CartError) -> ! {
    tracing::error!("❌ {} (Category: {:?})", e, e.category());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.category()));
}

fn exit_code(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Configuration => 1,
        ErrorCategory::NotFound | ErrorCategory::OutOfStock => 2,
        ErrorCategory::Service => 3,
        ErrorCategory::Storage => 4,
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("🛒 Cart is empty");
        return;
    }

    println!(
        "🛒 Cart: {} product(s), {} item(s)",
        cart.len(),
        cart.item_count()
    );
    for line in cart.lines() {
        println!(
            "  #{:<6} {:<40} x{:<4} {:>10.2} {:>12.2}",
            line.id().get(),
            line.product.title,
            line.amount,
            line.product.price,
            line.subtotal()
        );
    }
    println!("  Subtotal: {:.2}", cart.subtotal());
}
