use serde::Deserialize;
use serde_json::{Map, Value};
use time::{UtcOffset, macros::format_description};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub chat: Chat,
	pub catalog: Catalog,
	pub scheduling: Scheduling,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub completion: CompletionProviderConfig,
	pub storefront: StorefrontConfig,
	pub calendar: CalendarConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// WooCommerce-compatible product listing.
#[derive(Debug, Deserialize)]
pub struct StorefrontConfig {
	pub api_base: String,
	#[serde(default = "default_storefront_path")]
	pub path: String,
	pub consumer_key: String,
	pub consumer_secret: String,
	#[serde(default = "default_per_page")]
	pub per_page: u32,
	#[serde(default = "default_max_pages")]
	pub max_pages: u32,
	#[serde(default)]
	pub in_stock_only: bool,
	pub timeout_ms: u64,
}

/// Google-Calendar-compatible event insertion. The access token is obtained out of band.
#[derive(Debug, Deserialize)]
pub struct CalendarConfig {
	#[serde(default = "default_calendar_api_base")]
	pub api_base: String,
	pub access_token: String,
	pub calendar_id: String,
	pub time_zone: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
	pub greeting: String,
	pub system_prompt: String,
	pub history_window: u32,
	pub max_message_chars: u32,
	#[serde(default)]
	pub keywords: Keywords,
	#[serde(default)]
	pub replies: Replies,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Keywords {
	pub schedule: Vec<String>,
	pub products: Vec<String>,
	pub human: Vec<String>,
	pub seller: Vec<String>,
}
impl Default for Keywords {
	fn default() -> Self {
		Self {
			schedule: strings(&[
				"agendar",
				"agenda",
				"cita",
				"reunion",
				"llamada",
				"reservar hora",
				"coordinar",
			]),
			products: strings(&[
				"producto",
				"sostenible",
				"comprar",
				"oferta",
				"precio",
				"tienen",
				"quiero",
				"mostrar",
				"muestreme",
				"alternativa",
				"necesito",
				"recomiendame",
				"recomiendeme",
				"recomendar",
				"busco",
				"venden",
				"opciones",
			]),
			human: strings(&[
				"ejecutivo",
				"humano",
				"persona",
				"agente",
				"alguien",
				"representante",
				"necesito ayuda real",
				"quiero hablar con",
				"quiero contacto",
				"quiero atencion",
				"quiero que me llamen",
				"me llame alguien",
				"contacto humano",
				"hablar con alguien",
			]),
			seller: strings(&[
				"emprender",
				"vender",
				"vender con ustedes",
				"colaborar",
				"vender productos",
				"sumarse",
				"postular",
				"emprendimiento",
				"vendo",
				"ofrecer productos",
				"emprendedores",
				"quiero sumarme",
				"trabajar",
				"trabajar con ustedes",
			]),
		}
	}
}

/// Canned replies. `schedule_confirmed` may contain `{when}`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Replies {
	pub products_intro: String,
	pub no_products: String,
	pub human_handoff: String,
	pub seller_intro: String,
	pub seller_info: String,
	pub seller_url: Option<String>,
	pub seller_link_label: String,
	pub schedule_ask: String,
	pub schedule_past: String,
	pub schedule_confirmed: String,
	pub fallback: String,
}
impl Default for Replies {
	fn default() -> Self {
		Self {
			products_intro: "Aquí tienes algunas alternativas que podrían interesarte:".to_string(),
			no_products: "No encontré productos para tu búsqueda. ¿Puedes darme más detalles?"
				.to_string(),
			human_handoff: "¡Por supuesto! Un ejecutivo humano de nuestro equipo puede ayudarte. \
				Por favor, déjanos tu número de teléfono y tu consulta, y te contactaremos pronto."
				.to_string(),
			seller_intro: "¡Qué buena noticia que quieras emprender con nosotros!".to_string(),
			seller_info: String::new(),
			seller_url: None,
			seller_link_label: "Ir a la página para emprender".to_string(),
			schedule_ask: "¿Para qué día y hora quieres agendar la llamada? \
				Por ejemplo: \"mañana a las 15:30\"."
				.to_string(),
			schedule_past: "Esa fecha ya pasó. ¿Puedes indicarme otro día y hora?".to_string(),
			schedule_confirmed: "Listo, agendamos una llamada para el {when}.".to_string(),
			fallback: "Lo siento, no pude responder en este momento. Inténtalo de nuevo más tarde."
				.to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Catalog {
	pub top_k: u32,
	pub min_score: Option<f32>,
	#[serde(default = "default_embed_batch_size")]
	pub embed_batch_size: u32,
	/// Zero disables periodic refresh.
	#[serde(default)]
	pub refresh_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Scheduling {
	/// Offset used to read date phrases, e.g. "-04:00".
	pub utc_offset: String,
	pub default_hour: u8,
	pub duration_minutes: u32,
	pub event_summary: String,
}
impl Scheduling {
	pub fn offset(&self) -> Option<UtcOffset> {
		UtcOffset::parse(
			self.utc_offset.trim(),
			format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
		)
		.ok()
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
	pub admin_auth_token: Option<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

fn default_storefront_path() -> String {
	"/wp-json/wc/v3/products".to_string()
}

fn default_per_page() -> u32 {
	100
}

fn default_max_pages() -> u32 {
	10
}

fn default_calendar_api_base() -> String {
	"https://www.googleapis.com/calendar/v3".to_string()
}

fn default_embed_batch_size() -> u32 {
	64
}
