//! Whitelisted collections

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A collection the reset operation may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionName {
	Users,
	Institutions,
	ChildrenGroups,
	IntegrationEvents,
}

impl CollectionName {
	/// Every whitelisted collection, in declaration order
	pub const ALL: [CollectionName; 4] = [
		CollectionName::Users,
		CollectionName::Institutions,
		CollectionName::ChildrenGroups,
		CollectionName::IntegrationEvents,
	];

	/// Name of the collection in the datastore
	pub fn as_str(&self) -> &'static str {
		match self {
			CollectionName::Users => "users",
			CollectionName::Institutions => "institutions",
			CollectionName::ChildrenGroups => "childrengroups",
			CollectionName::IntegrationEvents => "integrationevents",
		}
	}
}

impl fmt::Display for CollectionName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for CollectionName {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		CollectionName::ALL
			.into_iter()
			.find(|name| name.as_str() == s)
			.ok_or_else(|| format!("{} is not a whitelisted collection", s))
	}
}
