use std::collections::{HashMap, HashSet};

use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, Result, ShopdeskService};
use shopdesk_domain::catalog::{self, ProductIndex, ScoredProduct};
use shopdesk_storage::queries;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
	pub fetched: usize,
	pub indexed: usize,
	pub embedded: usize,
	pub reused: usize,
	pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStatus {
	pub products: usize,
	pub dimensions: usize,
	#[serde(with = "time::serde::rfc3339::option")]
	pub refreshed_at: Option<OffsetDateTime>,
}

impl ShopdeskService {
	/// Rebuilds the product index from the storefront and swaps it in.
	///
	/// Vectors are cached by document hash and embedding version, so only new or edited products
	/// reach the embedding API. Concurrent calls run one at a time.
	pub async fn refresh_catalog(&self) -> Result<CatalogReport> {
		let _guard = self.refresh_lock.lock().await;
		let products =
			self.providers.storefront.fetch_products(&self.cfg.providers.storefront).await?;
		let dim = self.cfg.providers.embedding.dimensions as usize;
		let version = crate::embedding_version(&self.cfg);
		let documents: Vec<String> = products.iter().map(catalog::product_document).collect();
		let hashes: Vec<String> =
			documents.iter().map(|doc| blake3::hash(doc.as_bytes()).to_hex().to_string()).collect();
		let mut vectors: HashMap<String, Vec<f32>> =
			queries::get_product_embeddings(&self.db, &hashes, &version)
				.await?
				.into_iter()
				.filter(|row| row.vec.len() == dim)
				.map(|row| (row.content_hash, row.vec))
				.collect();
		let reused = hashes.iter().filter(|hash| vectors.contains_key(*hash)).count();
		let mut seen = HashSet::new();
		let missing: Vec<usize> = (0..hashes.len())
			.filter(|&idx| !vectors.contains_key(&hashes[idx]) && seen.insert(&hashes[idx]))
			.collect();
		let batch_size = self.cfg.catalog.embed_batch_size.max(1) as usize;
		let now = OffsetDateTime::now_utc();
		let mut embedded = 0;

		for batch in missing.chunks(batch_size) {
			let texts: Vec<String> = batch.iter().map(|&idx| documents[idx].clone()).collect();
			let batch_vectors =
				self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;

			if batch_vectors.len() != batch.len() {
				return Err(Error::Provider {
					message: format!(
						"Embedding provider returned {} vectors for {} documents.",
						batch_vectors.len(),
						batch.len()
					),
				});
			}

			for (&idx, vec) in batch.iter().zip(batch_vectors) {
				if vec.len() != dim {
					tracing::warn!(
						product_id = products[idx].id,
						expected = dim,
						actual = vec.len(),
						"Skipping product embedding with unexpected dimension."
					);

					continue;
				}

				queries::upsert_product_embedding(&self.db, &hashes[idx], &version, &vec, now)
					.await?;
				vectors.insert(hashes[idx].clone(), vec);

				embedded += 1;
			}
		}

		let fetched = products.len();
		let mut index = ProductIndex::new(dim);

		for (product, hash) in products.into_iter().zip(&hashes) {
			let Some(vec) = vectors.get(hash) else {
				continue;
			};
			let product_id = product.id;

			if let Err(err) = index.push(product, vec.clone()) {
				tracing::warn!(
					product_id,
					expected = err.expected,
					actual = err.actual,
					"Skipping product with mismatched embedding."
				);
			}
		}

		let report = CatalogReport {
			fetched,
			indexed: index.len(),
			embedded,
			reused,
			skipped: fetched - index.len(),
		};

		self.install_catalog(index, now);

		tracing::info!(
			fetched = report.fetched,
			indexed = report.indexed,
			embedded = report.embedded,
			reused = report.reused,
			skipped = report.skipped,
			"Catalog refreshed."
		);

		Ok(report)
	}

	pub fn catalog_status(&self) -> CatalogStatus {
		let index = self.catalog();

		CatalogStatus {
			products: index.len(),
			dimensions: index.dim(),
			refreshed_at: self.catalog_refreshed_at(),
		}
	}

	/// Embeds the shopper's question and ranks the current catalog against it.
	pub async fn search_products(&self, query: &str) -> Result<Vec<ScoredProduct>> {
		let index = self.catalog();

		if index.is_empty() {
			tracing::debug!("Catalog is empty; skipping product search.");

			return Ok(Vec::new());
		}

		let texts = [query.to_string()];
		let vectors = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let Some(query_vec) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vector for the query.".to_string(),
			});
		};

		if query_vec.len() != index.dim() {
			return Err(Error::Provider {
				message: format!(
					"Query embedding has {} dimensions; catalog uses {}.",
					query_vec.len(),
					index.dim()
				),
			});
		}

		Ok(index.search(&query_vec, self.cfg.catalog.top_k as usize, self.cfg.catalog.min_score))
	}
}
