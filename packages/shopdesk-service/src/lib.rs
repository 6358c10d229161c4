pub mod appointments;
pub mod catalog;
pub mod chat;
pub mod sessions;

mod error;

pub use appointments::{AppointmentRequest, AppointmentResponse, AppointmentSummary};
pub use catalog::{CatalogReport, CatalogStatus};
pub use chat::{ChatRequest, ChatResponse, Reply, ReplyLink};
pub use error::{Error, Result};
pub use sessions::{MessageView, SessionResponse};

use std::{
	future::Future,
	pin::Pin,
	sync::{Arc, RwLock},
};

use time::{OffsetDateTime, UtcOffset};

use shopdesk_config::{
	CalendarConfig, CompletionProviderConfig, Config, EmbeddingProviderConfig, StorefrontConfig,
};
use shopdesk_domain::{
	catalog::{Product, ProductIndex},
	conversation::ChatMessage,
};
use shopdesk_providers::{
	calendar::{self, CalendarEvent, CreatedEvent},
	completion, embedding, storefront,
};
use shopdesk_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait StorefrontProvider
where
	Self: Send + Sync,
{
	fn fetch_products<'a>(
		&'a self,
		cfg: &'a StorefrontConfig,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Product>>>;
}

pub trait CalendarProvider
where
	Self: Send + Sync,
{
	fn create_event<'a>(
		&'a self,
		cfg: &'a CalendarConfig,
		event: &'a CalendarEvent,
	) -> BoxFuture<'a, color_eyre::Result<CreatedEvent>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub completion: Arc<dyn CompletionProvider>,
	pub storefront: Arc<dyn StorefrontProvider>,
	pub calendar: Arc<dyn CalendarProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
		storefront: Arc<dyn StorefrontProvider>,
		calendar: Arc<dyn CalendarProvider>,
	) -> Self {
		Self { embedding, completion, storefront, calendar }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			completion: provider.clone(),
			storefront: provider.clone(),
			calendar: provider,
		}
	}
}

pub struct ShopdeskService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	catalog: RwLock<CatalogState>,
	refresh_lock: tokio::sync::Mutex<()>,
}
impl ShopdeskService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		let dim = cfg.providers.embedding.dimensions as usize;

		Self {
			cfg,
			db,
			providers,
			catalog: RwLock::new(CatalogState {
				index: Arc::new(ProductIndex::new(dim)),
				refreshed_at: None,
			}),
			refresh_lock: tokio::sync::Mutex::new(()),
		}
	}

	/// Current catalog snapshot. Readers keep their `Arc` while a refresh swaps in a new one.
	pub fn catalog(&self) -> Arc<ProductIndex> {
		self.catalog.read().unwrap_or_else(|err| err.into_inner()).index.clone()
	}

	pub fn install_catalog(&self, index: ProductIndex, refreshed_at: OffsetDateTime) {
		let mut state = self.catalog.write().unwrap_or_else(|err| err.into_inner());

		*state = CatalogState { index: Arc::new(index), refreshed_at: Some(refreshed_at) };
	}

	pub(crate) fn catalog_refreshed_at(&self) -> Option<OffsetDateTime> {
		self.catalog.read().unwrap_or_else(|err| err.into_inner()).refreshed_at
	}

	/// Wall clock in the storefront's configured offset.
	pub(crate) fn local_now(&self) -> OffsetDateTime {
		let offset = self.cfg.scheduling.offset().unwrap_or(UtcOffset::UTC);

		OffsetDateTime::now_utc().to_offset(offset)
	}
}

struct CatalogState {
	index: Arc<ProductIndex>,
	refreshed_at: Option<OffsetDateTime>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a CompletionProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(completion::complete(cfg, messages))
	}
}

impl StorefrontProvider for DefaultProviders {
	fn fetch_products<'a>(
		&'a self,
		cfg: &'a StorefrontConfig,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Product>>> {
		Box::pin(storefront::fetch_products(cfg))
	}
}

impl CalendarProvider for DefaultProviders {
	fn create_event<'a>(
		&'a self,
		cfg: &'a CalendarConfig,
		event: &'a CalendarEvent,
	) -> BoxFuture<'a, color_eyre::Result<CreatedEvent>> {
		Box::pin(calendar::create_event(cfg, event))
	}
}

/// Cache key namespace for product vectors; changes whenever the embedding model does.
pub fn embedding_version(cfg: &Config) -> String {
	let embedding = &cfg.providers.embedding;

	format!("{}:{}:{}", embedding.provider_id, embedding.model, embedding.dimensions)
}
