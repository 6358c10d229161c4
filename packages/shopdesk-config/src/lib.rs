mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	CalendarConfig, Catalog, Chat, CompletionProviderConfig, Config, EmbeddingProviderConfig,
	Keywords, Postgres, Providers, Replies, Scheduling, Security, Service, Storage,
	StorefrontConfig,
};

use std::{env, fs, path::Path};

/// Prefix marking a secret that is read from the environment at load time.
pub const ENV_PREFIX: &str = "env:";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	resolve_secrets(&mut cfg, |var| env::var(var).ok())?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Replaces every `env:NAME` secret with the value returned by `lookup`.
pub fn resolve_secrets<F>(cfg: &mut Config, lookup: F) -> Result<()>
where
	F: Fn(&str) -> Option<String>,
{
	let required = [
		("storage.postgres.dsn", &mut cfg.storage.postgres.dsn),
		("providers.embedding.api_key", &mut cfg.providers.embedding.api_key),
		("providers.completion.api_key", &mut cfg.providers.completion.api_key),
		("providers.storefront.consumer_key", &mut cfg.providers.storefront.consumer_key),
		("providers.storefront.consumer_secret", &mut cfg.providers.storefront.consumer_secret),
		("providers.calendar.access_token", &mut cfg.providers.calendar.access_token),
	];

	for (field, value) in required {
		resolve_one(field, value, &lookup)?;
	}

	let optional = [
		("security.api_auth_token", cfg.security.api_auth_token.as_mut()),
		("security.admin_auth_token", cfg.security.admin_auth_token.as_mut()),
	];

	for (field, value) in optional {
		if let Some(value) = value {
			resolve_one(field, value, &lookup)?;
		}
	}

	Ok(())
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.completion.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.completion.max_tokens must be greater than zero.".to_string(),
		});
	}

	let temperature = cfg.providers.completion.temperature;

	if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
		return Err(Error::Validation {
			message: "providers.completion.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if !(1..=100).contains(&cfg.providers.storefront.per_page) {
		return Err(Error::Validation {
			message: "providers.storefront.per_page must be in the range 1-100.".to_string(),
		});
	}
	if cfg.providers.storefront.max_pages == 0 {
		return Err(Error::Validation {
			message: "providers.storefront.max_pages must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.calendar.calendar_id.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.calendar.calendar_id must be non-empty.".to_string(),
		});
	}

	for (label, key) in [
		("providers.embedding.api_key", &cfg.providers.embedding.api_key),
		("providers.completion.api_key", &cfg.providers.completion.api_key),
		("providers.storefront.consumer_key", &cfg.providers.storefront.consumer_key),
		("providers.storefront.consumer_secret", &cfg.providers.storefront.consumer_secret),
		("providers.calendar.access_token", &cfg.providers.calendar.access_token),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.chat.greeting.trim().is_empty() {
		return Err(Error::Validation { message: "chat.greeting must be non-empty.".to_string() });
	}
	if cfg.chat.history_window == 0 {
		return Err(Error::Validation {
			message: "chat.history_window must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.max_message_chars == 0 {
		return Err(Error::Validation {
			message: "chat.max_message_chars must be greater than zero.".to_string(),
		});
	}

	for (label, list) in [
		("chat.keywords.products", &cfg.chat.keywords.products),
		("chat.keywords.human", &cfg.chat.keywords.human),
		("chat.keywords.seller", &cfg.chat.keywords.seller),
	] {
		if list.iter().all(|keyword| keyword.trim().is_empty()) {
			return Err(Error::Validation {
				message: format!("{label} must contain at least one keyword."),
			});
		}
	}

	if cfg.catalog.top_k == 0 {
		return Err(Error::Validation {
			message: "catalog.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.catalog.embed_batch_size == 0 {
		return Err(Error::Validation {
			message: "catalog.embed_batch_size must be greater than zero.".to_string(),
		});
	}

	if let Some(min_score) = cfg.catalog.min_score
		&& (!min_score.is_finite() || !(-1.0..=1.0).contains(&min_score))
	{
		return Err(Error::Validation {
			message: "catalog.min_score must be in the range -1.0-1.0.".to_string(),
		});
	}

	if cfg.scheduling.offset().is_none() {
		return Err(Error::Validation {
			message: "scheduling.utc_offset must look like +HH:MM or -HH:MM.".to_string(),
		});
	}
	if cfg.scheduling.default_hour > 23 {
		return Err(Error::Validation {
			message: "scheduling.default_hour must be in the range 0-23.".to_string(),
		});
	}
	if cfg.scheduling.duration_minutes == 0 {
		return Err(Error::Validation {
			message: "scheduling.duration_minutes must be greater than zero.".to_string(),
		});
	}
	if cfg.scheduling.event_summary.trim().is_empty() {
		return Err(Error::Validation {
			message: "scheduling.event_summary must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn resolve_one<F>(field: &str, value: &mut String, lookup: &F) -> Result<()>
where
	F: Fn(&str) -> Option<String>,
{
	let Some(var) = value.trim().strip_prefix(ENV_PREFIX) else {
		return Ok(());
	};
	let var = var.trim().to_string();
	let resolved = lookup(&var)
		.ok_or_else(|| Error::MissingEnv { field: field.to_string(), var: var.clone() })?;

	*value = resolved;

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}
	if cfg
		.security
		.admin_auth_token
		.as_deref()
		.map(|token| token.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.security.admin_auth_token = None;
	}
	if cfg.chat.replies.seller_url.as_deref().map(|url| url.trim().is_empty()).unwrap_or(false) {
		cfg.chat.replies.seller_url = None;
	}

	for list in [
		&mut cfg.chat.keywords.schedule,
		&mut cfg.chat.keywords.products,
		&mut cfg.chat.keywords.human,
		&mut cfg.chat.keywords.seller,
	] {
		list.retain(|keyword| !keyword.trim().is_empty());
	}

	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim_end_matches('/').to_string();
	cfg.providers.completion.api_base =
		cfg.providers.completion.api_base.trim_end_matches('/').to_string();
	cfg.providers.storefront.api_base =
		cfg.providers.storefront.api_base.trim_end_matches('/').to_string();
	cfg.providers.calendar.api_base =
		cfg.providers.calendar.api_base.trim_end_matches('/').to_string();
}
