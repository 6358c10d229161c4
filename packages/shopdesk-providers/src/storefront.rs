use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use shopdesk_config::StorefrontConfig;
use shopdesk_domain::{catalog::Product, text};

struct Page {
	raw_len: usize,
	products: Vec<Product>,
}

/// Walks the paged product listing until a short page or `max_pages`.
pub async fn fetch_products(cfg: &StorefrontConfig) -> Result<Vec<Product>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let per_page = cfg.per_page.to_string();
	let mut products = Vec::new();

	for page in 1..=cfg.max_pages {
		let res = client
			.get(&url)
			.headers(crate::base_headers())
			.basic_auth(&cfg.consumer_key, Some(&cfg.consumer_secret))
			.query(&[
				("per_page", per_page.as_str()),
				("page", page.to_string().as_str()),
				("status", "publish"),
			])
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;
		let Page { raw_len, products: batch } = parse_products_page(json, cfg.in_stock_only)?;

		products.extend(batch);

		if raw_len < cfg.per_page as usize {
			break;
		}
	}

	Ok(products)
}

fn parse_products_page(json: Value, in_stock_only: bool) -> Result<Page> {
	let items = json
		.as_array()
		.ok_or_else(|| eyre::eyre!("Storefront response must be a JSON array of products."))?;
	let mut products = Vec::with_capacity(items.len());

	for item in items {
		let id = item
			.get("id")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| eyre::eyre!("Storefront product is missing a numeric id."))?;
		let status = item.get("status").and_then(|v| v.as_str()).unwrap_or("publish");

		if status != "publish" {
			continue;
		}
		if in_stock_only
			&& item.get("stock_status").and_then(|v| v.as_str()).unwrap_or("instock") != "instock"
		{
			continue;
		}

		let name = text::strip_html(item.get("name").and_then(|v| v.as_str()).unwrap_or_default());

		if name.is_empty() {
			continue;
		}

		let short = non_empty(item.get("short_description").map(html_field));
		let description = short
			.or_else(|| non_empty(item.get("description").map(html_field)))
			.unwrap_or_default();

		products.push(Product {
			id,
			name,
			description,
			price: non_empty(item.get("price").and_then(price_field)),
			permalink: non_empty(
				item.get("permalink").and_then(|v| v.as_str()).map(str::to_string),
			),
			image_url: non_empty(
				item.get("images")
					.and_then(|v| v.as_array())
					.and_then(|images| images.first())
					.and_then(|image| image.get("src"))
					.and_then(|v| v.as_str())
					.map(str::to_string),
			),
		});
	}

	Ok(Page { raw_len: items.len(), products })
}

fn html_field(value: &Value) -> String {
	value.as_str().map(text::strip_html).unwrap_or_default()
}

fn price_field(value: &Value) -> Option<String> {
	match value {
		Value::String(raw) => Some(raw.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}
