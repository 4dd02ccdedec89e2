use crate::domain::product::Product;

pub const CHEAPEST_SUFFIX: &str = "This is the cheapest product within this price range";

/// Human-readable block used for chat replies and notifications.
pub fn product_block(product: &Product) -> String {
    let mut block = format!(
        "- Name: {}\n- Price: {}\n- Description: {}",
        product.name, product.price, product.description
    );
    if let Some(rating) = &product.rating {
        block.push_str(&format!("\n- Rating: {} ({} reviews)", rating.rate, rating.count));
    }
    block
}

pub fn cheapest_summary(product: &Product) -> String {
    format!("{}\n\n{CHEAPEST_SUFFIX}.", product_block(product))
}

pub fn product_listing(products: &[Product]) -> String {
    products.iter().map(product_block).collect::<Vec<_>>().join("\n\n")
}
