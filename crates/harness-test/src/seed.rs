//! Seed helpers for the whitelisted collections

use bson::{Document, doc};
use harness_db::backends::MemoryBackend;
use harness_db::reset::CollectionName;
use harness_db::settings::ResetSettings;

/// What [`seed_users`] inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
	pub admins: usize,
	pub others: usize,
}

impl SeedReport {
	pub fn total(&self) -> usize {
		self.admins + self.others
	}
}

/// A user document carrying `role` under the configured discriminator
pub fn user_document(settings: &ResetSettings, role: &str, email: &str) -> Document {
	let mut user = doc! { "email": email, "active": true };
	user.insert(settings.discriminator_key.clone(), role);
	user
}

/// Seed `admins` admin accounts plus one user per entry of `roles`
///
/// # Examples
///
/// ```
/// use harness_db::backends::MemoryBackend;
/// use harness_db::settings::ResetSettings;
/// use harness_test::seed::seed_users;
///
/// let backend = MemoryBackend::new();
/// let report = seed_users(&backend, &ResetSettings::default(), 1, &["child", "family"]);
/// assert_eq!(report.total(), 3);
/// assert_eq!(backend.count("users"), 3);
/// ```
pub fn seed_users(
	backend: &MemoryBackend,
	settings: &ResetSettings,
	admins: usize,
	roles: &[&str],
) -> SeedReport {
	let admin_docs = (0..admins).map(|i| {
		user_document(
			settings,
			&settings.admin_role,
			&format!("admin{}@example.com", i),
		)
	});
	let other_docs = roles
		.iter()
		.enumerate()
		.map(|(i, role)| user_document(settings, role, &format!("{}{}@example.com", role, i)));

	backend.insert_many(
		CollectionName::Users.as_str(),
		admin_docs.chain(other_docs),
	);

	SeedReport {
		admins,
		others: roles.len(),
	}
}

/// Insert `count` placeholder documents into `collection`
pub fn seed_documents(backend: &MemoryBackend, collection: CollectionName, count: usize) {
	backend.insert_many(
		collection.as_str(),
		(0..count).map(|i| doc! { "name": format!("{}-{}", collection, i), "seq": i as i64 }),
	);
}
