use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::accounts::domain::{timestamp, UserId};
use crate::shape::{Template, ToPlainData};

/// Identifier wrapper for stored apartments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApartmentId(pub String);

impl ApartmentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ApartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Availability of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApartmentState {
    Rentable,
    Rented,
}

impl ApartmentState {
    pub const ALL: [&'static str; 2] = ["rentable", "rented"];

    pub const fn label(self) -> &'static str {
        match self {
            ApartmentState::Rentable => "rentable",
            ApartmentState::Rented => "rented",
        }
    }
}

impl FromStr for ApartmentState {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rentable" => Ok(Self::Rentable),
            "rented" => Ok(Self::Rented),
            other => Err(format!("unknown apartment state '{other}'")),
        }
    }
}

/// Stored apartment listing, owned by one realtor.
#[derive(Debug, Clone, PartialEq)]
pub struct Apartment {
    pub id: ApartmentId,
    pub realtor: UserId,
    pub name: String,
    pub description: String,
    pub size: f64,
    pub price: f64,
    pub rooms: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub state: ApartmentState,
    pub created_at: DateTime<Utc>,
}

impl ToPlainData for Apartment {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        let mut document = Map::new();
        document.insert("_id".into(), Value::String(self.id.0.clone()));
        document.insert("realtor".into(), Value::String(self.realtor.0.clone()));
        document.insert("name".into(), Value::String(self.name.clone()));
        document.insert("description".into(), Value::String(self.description.clone()));
        document.insert("size".into(), Value::from(self.size));
        document.insert("price".into(), Value::from(self.price));
        document.insert("rooms".into(), Value::from(self.rooms));
        document.insert("latitude".into(), Value::from(self.latitude));
        document.insert("longitude".into(), Value::from(self.longitude));
        if let Some(address) = &self.address {
            document.insert("address".into(), Value::String(address.clone()));
        }
        document.insert("state".into(), Value::String(self.state.label().into()));
        document.insert("createdAt".into(), Value::String(timestamp(&self.created_at)));
        Cow::Owned(Value::Object(document))
    }
}

/// An apartment with its realtor reference replaced by the realtor's document.
#[derive(Debug, Clone)]
pub struct ApartmentListing<'a> {
    pub apartment: &'a Apartment,
    pub realtor: Option<Cow<'a, Value>>,
}

impl ToPlainData for ApartmentListing<'_> {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        let mut document = self.apartment.to_plain_data().into_owned();
        if let (Some(realtor), Value::Object(fields)) = (&self.realtor, &mut document) {
            fields.insert("realtor".into(), realtor.clone().into_owned());
        }
        Cow::Owned(document)
    }
}

/// Fields of an apartment that may be exposed. The realtor is reduced to its
/// id and email when populated.
pub fn apartment_template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        let mut fields: Vec<(&str, Template)> = [
            "_id",
            "name",
            "description",
            "size",
            "price",
            "rooms",
            "latitude",
            "longitude",
            "address",
            "state",
            "createdAt",
        ]
        .into_iter()
        .map(|key| (key, Template::Leaf))
        .collect();
        fields.push(("realtor", Template::leaves(["_id", "email"])));
        Template::fields(fields)
    })
}

/// [`apartment_template`] applied to each element of a list.
pub fn apartment_list_template() -> &'static Template {
    static TEMPLATE: OnceLock<Template> = OnceLock::new();
    TEMPLATE.get_or_init(|| Template::array_of(apartment_template().clone()))
}

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Storage-level selection of apartments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApartmentFilter {
    pub realtor: Option<UserId>,
    pub state: Option<ApartmentState>,
    pub size: Bounds,
    pub price: Bounds,
    pub rooms: Bounds,
    pub before: Option<DateTime<Utc>>,
}

impl ApartmentFilter {
    pub fn matches(&self, apartment: &Apartment) -> bool {
        self.realtor
            .as_ref()
            .map_or(true, |realtor| &apartment.realtor == realtor)
            && self.state.map_or(true, |state| apartment.state == state)
            && self.size.contains(apartment.size)
            && self.price.contains(apartment.price)
            && self.rooms.contains(f64::from(apartment.rooms))
            && self.before.map_or(true, |before| apartment.created_at < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::filter;
    use serde_json::json;

    fn apartment() -> Apartment {
        Apartment {
            id: ApartmentId("apt-1".to_string()),
            realtor: UserId("realtor-1".to_string()),
            name: "Loft".to_string(),
            description: "Sunny loft".to_string(),
            size: 54.5,
            price: 1200.0,
            rooms: 2,
            latitude: 40.7,
            longitude: -73.9,
            address: None,
            state: ApartmentState::Rentable,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unpopulated_realtor_stays_a_plain_id() {
        let view = filter(&apartment(), apartment_template());
        assert_eq!(view["realtor"], "realtor-1");
        assert_eq!(view["rooms"], 2);
        assert!(view.get("address").is_none());
    }

    #[test]
    fn populated_realtor_is_reduced_to_id_and_email() {
        let apartment = apartment();
        let realtor = json!({
            "_id": "realtor-1",
            "email": "realtor@example.com",
            "hash": "secret",
            "userType": "realtor"
        });
        let listing = ApartmentListing {
            apartment: &apartment,
            realtor: Some(Cow::Owned(realtor)),
        };

        let view = filter(&listing, apartment_template());

        assert_eq!(
            view["realtor"],
            json!({ "_id": "realtor-1", "email": "realtor@example.com" })
        );
        assert_eq!(view["name"], "Loft");
    }

    #[test]
    fn filters_combine_every_criterion() {
        let apartment = apartment();
        let mut selection = ApartmentFilter {
            state: Some(ApartmentState::Rentable),
            size: Bounds {
                min: Some(50.0),
                max: Some(60.0),
            },
            rooms: Bounds {
                min: Some(2.0),
                max: None,
            },
            ..ApartmentFilter::default()
        };
        assert!(selection.matches(&apartment));

        selection.realtor = Some(UserId("someone-else".to_string()));
        assert!(!selection.matches(&apartment));

        selection.realtor = None;
        selection.before = Some(apartment.created_at);
        assert!(!selection.matches(&apartment));
    }
}
