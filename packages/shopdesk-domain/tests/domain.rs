use shopdesk_config::Keywords;
use shopdesk_domain::{
	catalog::{Product, ProductIndex},
	conversation::{self, ChatMessage, Role},
	intent::{self, Intent},
};

fn product(id: u64, name: &str) -> Product {
	Product {
		id,
		name: name.to_string(),
		description: format!("{name} description"),
		price: Some("1990".to_string()),
		permalink: Some(format!("https://shop.example/p/{id}")),
		image_url: None,
	}
}

fn index(entries: &[(u64, [f32; 2])]) -> ProductIndex {
	let mut index = ProductIndex::new(2);

	for (id, vector) in entries {
		index.push(product(*id, &format!("p{id}")), vector.to_vec()).expect("Dimension matches.");
	}

	index
}

fn ids(index: &ProductIndex, query: &[f32], top_k: usize, min_score: Option<f32>) -> Vec<u64> {
	index.search(query, top_k, min_score).into_iter().map(|hit| hit.product.id).collect()
}

#[test]
fn product_keywords_route_to_catalog() {
	let keywords = Keywords::default();

	assert_eq!(intent::classify("¿Me recomiéndas un shampoo?", &keywords), Intent::Chat);
	assert_eq!(intent::classify("Recomiéndame un shampoo sólido", &keywords), Intent::Products);
	assert_eq!(intent::classify("¿Qué OPCIONES de jabón venden?", &keywords), Intent::Products);
}

#[test]
fn products_win_over_human_handoff() {
	let keywords = Keywords::default();

	assert_eq!(intent::classify("quiero hablar con un ejecutivo", &keywords), Intent::Products);
	assert_eq!(intent::classify("Hablar con alguien, por favor", &keywords), Intent::Human);
}

#[test]
fn seller_and_schedule_routes() {
	let keywords = Keywords::default();

	assert_eq!(intent::classify("Me gustaría emprender con ustedes", &keywords), Intent::Seller);
	assert_eq!(
		intent::classify("Quiero agendar una llamada mañana a las 10", &keywords),
		Intent::Schedule
	);
}

#[test]
fn keywords_only_match_at_word_starts() {
	let keywords = Keywords::default();

	assert_eq!(
		intent::classify("Quisiera solicitar el precio del shampoo sólido", &keywords),
		Intent::Products
	);
	assert_eq!(intent::classify("¡Felicitaciones por la tienda!", &keywords), Intent::Chat);
	assert_eq!(intent::classify("¿Quedan citas para el lunes?", &keywords), Intent::Schedule);
}

#[test]
fn unmatched_and_blank_messages_go_to_chat() {
	let keywords = Keywords::default();

	assert_eq!(intent::classify("¿Hacen despachos a Valdivia?", &keywords), Intent::Chat);
	assert_eq!(intent::classify("   ", &keywords), Intent::Chat);
}

#[test]
fn configured_keywords_are_folded() {
	let keywords = Keywords {
		schedule: vec![],
		products: vec!["JABÓN".to_string()],
		human: vec!["Ayuda".to_string()],
		seller: vec!["Proveedor".to_string()],
	};

	assert_eq!(intent::classify("busco jabon", &keywords), Intent::Products);
	assert_eq!(intent::classify("soy proveedor", &keywords), Intent::Seller);
}

#[test]
fn intent_labels_round_trip() {
	for intent in [Intent::Schedule, Intent::Products, Intent::Human, Intent::Seller, Intent::Chat]
	{
		assert_eq!(Intent::parse(intent.as_str()), Some(intent));
	}

	assert_eq!(serde_json::to_value(Intent::Products).expect("serialize"), "products");
}

#[test]
fn search_orders_by_similarity_and_truncates() {
	let index = index(&[(1, [0.0, 1.0]), (2, [1.0, 0.0]), (3, [1.0, 1.0])]);

	assert_eq!(ids(&index, &[1.0, 0.1], 2, None), vec![2, 3]);
	assert_eq!(ids(&index, &[1.0, 0.1], 10, None), vec![2, 3, 1]);
	assert!(ids(&index, &[1.0, 0.1], 0, None).is_empty());
}

#[test]
fn search_breaks_ties_by_insertion_order() {
	let index = index(&[(7, [2.0, 0.0]), (3, [0.0, 1.0]), (5, [1.0, 0.0]), (1, [4.0, 0.0])]);

	assert_eq!(ids(&index, &[1.0, 0.0], 3, None), vec![7, 5, 1]);
}

#[test]
fn search_applies_min_score_and_skips_undefined() {
	let index = index(&[(1, [1.0, 0.0]), (2, [0.0, 0.0]), (3, [-1.0, 0.0]), (4, [0.6, 0.8])]);
	let hits = index.search(&[1.0, 0.0], 10, Some(0.5));

	assert_eq!(hits.iter().map(|hit| hit.product.id).collect::<Vec<_>>(), vec![1, 4]);
	assert!((hits[1].score - 0.6).abs() < 1e-6);
	assert!(index.search(&[0.0, 0.0], 10, None).is_empty());
}

#[test]
fn completion_messages_use_last_window() {
	let history = vec![
		ChatMessage::new(Role::Assistant, "greeting"),
		ChatMessage::new(Role::User, "q1"),
		ChatMessage::new(Role::Assistant, "a1"),
		ChatMessage::new(Role::User, "q2"),
	];
	let messages = conversation::build_completion_messages("prompt", &history, 3);

	assert_eq!(messages.len(), 4);
	assert_eq!(messages[0], ChatMessage::new(Role::System, "prompt"));
	assert_eq!(messages[1].content, "q1");
	assert_eq!(messages[3].content, "q2");
	assert_eq!(conversation::history_window(&history, 10).len(), 4);
}

#[test]
fn roles_serialize_lowercase() {
	let message = ChatMessage::new(Role::User, "hola");

	assert_eq!(
		serde_json::to_value(&message).expect("serialize"),
		serde_json::json!({ "role": "user", "content": "hola" })
	);
}
