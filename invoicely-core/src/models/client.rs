use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::lenient;

/// Client record as stored in the `clients` document collection.
///
/// Older documents carry `user_id` and `slug_name`; both spellings are
/// accepted when reading and the canonical names are written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Client {
    /// Store-generated identifier
    pub id: String,

    /// Owner the record is scoped to
    #[serde(default)]
    pub owner_id: String,

    /// Display name
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub name: String,

    /// Contact email
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text_opt")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text_opt")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text_opt")]
    pub company: Option<String>,

    /// Human-readable lookup key derived from `name` at creation
    #[serde(default)]
    pub slug: String,

    #[serde(default, deserialize_with = "lenient::text_opt")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text_opt")]
    pub updated_at: Option<String>,
}

impl Serialize for Client {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Client::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Client {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut doc = Map::<String, Value>::deserialize(deserializer)?;
        lenient::adopt_legacy_key(&mut doc, "user_id", "owner_id");
        lenient::adopt_legacy_key(&mut doc, "slug_name", "slug");
        Client::deserialize(Value::Object(doc)).map_err(de::Error::custom)
    }
}

impl Client {
    /// Builds a new client document from validated form input.
    pub fn build(id: String, owner_id: &str, new: NewClient, now: DateTime<Utc>) -> Self {
        let slug = slugify(&new.name);
        Client {
            id,
            owner_id: owner_id.to_string(),
            name: new.name.trim().to_string(),
            email: new.email.trim().to_string(),
            address: non_blank(new.address),
            phone: non_blank(new.phone),
            company: non_blank(new.company),
            slug,
            created_at: Some(lenient::format_timestamp(now)),
            updated_at: None,
        }
    }
}

/// Client creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl NewClient {
    /// Checks the form rules; returns every violated rule.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        check_name(&self.name, &mut errors);
        check_email(&self.email, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Client update request.
///
/// Absent fields are left untouched. A blank optional field clears it.
/// The slug is never changed by an update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
}

impl ClientPatch {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(email) = &self.email {
            check_email(email, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Applies the patch to an in-memory record.
    pub fn apply_to(&self, client: &mut Client, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            client.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            client.email = email.trim().to_string();
        }
        if let Some(address) = &self.address {
            client.address = non_blank(Some(address.clone()));
        }
        if let Some(phone) = &self.phone {
            client.phone = non_blank(Some(phone.clone()));
        }
        if let Some(company) = &self.company {
            client.company = non_blank(Some(company.clone()));
        }
        client.updated_at = Some(lenient::format_timestamp(now));
    }

    /// Renders the patch as a partial document for a JSON merge.
    pub fn to_document(&self, now: DateTime<Utc>) -> Value {
        let mut doc = Map::new();
        if let Some(name) = &self.name {
            doc.insert("name".into(), Value::String(name.trim().to_string()));
        }
        if let Some(email) = &self.email {
            doc.insert("email".into(), Value::String(email.trim().to_string()));
        }
        for (key, field) in [
            ("address", &self.address),
            ("phone", &self.phone),
            ("company", &self.company),
        ] {
            if let Some(text) = field {
                let value = non_blank(Some(text.clone())).map_or(Value::Null, Value::String);
                doc.insert(key.into(), value);
            }
        }
        doc.insert(
            "updated_at".into(),
            Value::String(lenient::format_timestamp(now)),
        );
        Value::Object(doc)
    }
}

/// Derives the lookup slug from a client name.
///
/// Lowercases, collapses whitespace runs into one hyphen, then drops every
/// character outside `[a-z0-9-]`. Distinct names may map to the same slug.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut hyphenated = String::with_capacity(lowered.len());
    let mut in_space = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_space {
                hyphenated.push('-');
            }
            in_space = true;
        } else {
            hyphenated.push(ch);
            in_space = false;
        }
    }
    hyphenated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Minimal address check: one `@`, non-empty local part, dotted domain.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().chars().count() < 2 {
        errors.push("name must be at least 2 characters".to_string());
    }
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if !is_valid_email(email) {
        errors.push(format!("invalid email address: {:?}", email));
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
