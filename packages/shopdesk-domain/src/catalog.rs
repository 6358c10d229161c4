use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::text;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
	pub id: u64,
	pub name: String,
	pub description: String,
	pub price: Option<String>,
	pub permalink: Option<String>,
	pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
	pub product: Product,
	pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMismatch {
	pub expected: usize,
	pub actual: usize,
}

/// Products in storefront order, each paired with the embedding of its document.
#[derive(Debug, Clone, Default)]
pub struct ProductIndex {
	dim: usize,
	entries: Vec<(Product, Vec<f32>)>,
}
impl ProductIndex {
	pub fn new(dim: usize) -> Self {
		Self { dim, entries: Vec::new() }
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn products(&self) -> impl Iterator<Item = &Product> {
		self.entries.iter().map(|(product, _)| product)
	}

	pub fn push(&mut self, product: Product, vector: Vec<f32>) -> Result<(), DimensionMismatch> {
		if vector.len() != self.dim {
			return Err(DimensionMismatch { expected: self.dim, actual: vector.len() });
		}

		self.entries.push((product, vector));

		Ok(())
	}

	/// Scores every entry against `query` and keeps the best `top_k`.
	///
	/// Entries with an undefined similarity or below `min_score` are dropped. Equal scores keep
	/// insertion order.
	pub fn search(
		&self,
		query: &[f32],
		top_k: usize,
		min_score: Option<f32>,
	) -> Vec<ScoredProduct> {
		if top_k == 0 {
			return Vec::new();
		}

		let mut scored: Vec<(usize, f32)> = self
			.entries
			.iter()
			.enumerate()
			.filter_map(|(idx, (_, vector))| {
				cosine_similarity(query, vector).map(|score| (idx, score))
			})
			.filter(|(_, score)| min_score.map(|min| *score >= min).unwrap_or(true))
			.collect();

		scored.sort_by(|lhs, rhs| rhs.1.partial_cmp(&lhs.1).unwrap_or(Ordering::Equal));
		scored.truncate(top_k);

		scored
			.into_iter()
			.map(|(idx, score)| ScoredProduct { product: self.entries[idx].0.clone(), score })
			.collect()
	}
}

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	let denom = lhs_norm.sqrt() * rhs_norm.sqrt();

	if denom == 0.0 || !denom.is_finite() {
		return None;
	}

	let score = dot / denom;

	score.is_finite().then(|| score.clamp(-1.0, 1.0))
}

/// Text embedded for a product.
pub fn product_document(product: &Product) -> String {
	let name = text::collapse_whitespace(&product.name);
	let description = text::collapse_whitespace(&product.description);

	if description.is_empty() { name } else { format!("{name}. {description}") }
}
