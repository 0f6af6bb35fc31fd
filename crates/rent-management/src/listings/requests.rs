use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::domain::{Apartment, ApartmentFilter, ApartmentId, ApartmentState, Bounds};
use crate::accounts::{Principal, UserId, UserRole};
use crate::paging::{creation_time, Page, PageLimits};
use crate::validation::{query_map, required, Fields, NumberRule, ValidationError};

const APARTMENT_FIELDS: [&str; 9] = [
    "name",
    "description",
    "size",
    "price",
    "rooms",
    "latitude",
    "longitude",
    "address",
    "state",
];

const LATITUDE: NumberRule = NumberRule::any().min(-90.0).max(90.0);
const LONGITUDE: NumberRule = NumberRule::any().min(-180.0).max(180.0);
const ROOMS: NumberRule = NumberRule::any().positive().max(u32::MAX as f64);

/// Validated apartment fields from a create or edit body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApartmentChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub size: Option<f64>,
    pub price: Option<f64>,
    pub rooms: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub state: Option<ApartmentState>,
}

impl ApartmentChanges {
    /// Body of `POST /apartment`. Coordinates may be left out when an
    /// address is given, since they are looked up from it.
    pub fn for_create(body: &Value) -> Result<Self, ValidationError> {
        Self::read(body, true)
    }

    /// Body of `PATCH /apartment/:apartmentId`. Every field is optional.
    pub fn for_update(body: &Value) -> Result<Self, ValidationError> {
        Self::read(body, false)
    }

    fn read(body: &Value, create: bool) -> Result<Self, ValidationError> {
        Fields::read_body(body, &APARTMENT_FIELDS, |fields| {
            let located_by_address = fields.contains("address");
            Ok(Self {
                name: needed("name", fields.string("name")?, create)?,
                description: needed("description", fields.string("description")?, create)?,
                size: needed(
                    "size",
                    fields.number("size", NumberRule::any().positive())?,
                    create,
                )?,
                price: needed(
                    "price",
                    fields.number("price", NumberRule::any().positive())?,
                    create,
                )?,
                rooms: needed(
                    "rooms",
                    fields.integer("rooms", ROOMS)?.map(|rooms| rooms as u32),
                    create,
                )?,
                latitude: needed(
                    "latitude",
                    fields.number("latitude", LATITUDE)?,
                    create && !located_by_address,
                )?,
                longitude: needed(
                    "longitude",
                    fields.number("longitude", LONGITUDE)?,
                    create && !located_by_address,
                )?,
                address: fields.string("address")?,
                state: needed(
                    "state",
                    fields.choice("state", &ApartmentState::ALL)?,
                    create,
                )?,
            })
        })
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Builds a new listing owned by `realtor`.
    pub fn into_apartment(self, realtor: UserId) -> Result<Apartment, ValidationError> {
        Ok(Apartment {
            id: ApartmentId::generate(),
            realtor,
            name: required("name", self.name)?,
            description: required("description", self.description)?,
            size: required("size", self.size)?,
            price: required("price", self.price)?,
            rooms: required("rooms", self.rooms)?,
            latitude: required("latitude", self.latitude)?,
            longitude: required("longitude", self.longitude)?,
            address: self.address,
            state: required("state", self.state)?,
            created_at: creation_time(),
        })
    }

    /// Writes the present fields onto `apartment`. Moving the coordinates
    /// without naming an address drops the stored address.
    pub fn apply(&self, apartment: &mut Apartment) {
        if let Some(name) = &self.name {
            apartment.name = name.clone();
        }
        if let Some(description) = &self.description {
            apartment.description = description.clone();
        }
        if let Some(size) = self.size {
            apartment.size = size;
        }
        if let Some(price) = self.price {
            apartment.price = price;
        }
        if let Some(rooms) = self.rooms {
            apartment.rooms = rooms;
        }
        if let Some(latitude) = self.latitude {
            apartment.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            apartment.longitude = longitude;
        }
        if let Some(state) = self.state {
            apartment.state = state;
        }
        match &self.address {
            Some(address) => apartment.address = Some(address.clone()),
            None if self.latitude.is_some() || self.longitude.is_some() => {
                apartment.address = None
            }
            None => {}
        }
    }

    /// The accepted changes in wire form.
    pub fn to_json(&self) -> Value {
        let mut changes = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                changes.insert(key.to_string(), value);
            }
        };
        put("name", self.name.clone().map(Value::String));
        put("description", self.description.clone().map(Value::String));
        put("size", self.size.map(Value::from));
        put("price", self.price.map(Value::from));
        put("rooms", self.rooms.map(Value::from));
        put("latitude", self.latitude.map(Value::from));
        put("longitude", self.longitude.map(Value::from));
        put("address", self.address.clone().map(Value::String));
        put(
            "state",
            self.state.map(|state| Value::String(state.label().to_string())),
        );
        Value::Object(changes)
    }
}

fn needed<T>(key: &str, value: Option<T>, needed: bool) -> Result<Option<T>, ValidationError> {
    match value {
        None if needed => required(key, None).map(Some),
        other => Ok(other),
    }
}

/// Query string of `GET /apartment/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub state: Option<ApartmentState>,
    pub size: Bounds,
    pub price: Bounds,
    pub rooms: Bounds,
    pub before: Option<DateTime<Utc>>,
    pub page_size: usize,
}

impl ListingQuery {
    pub fn from_query(
        params: &HashMap<String, String>,
        limits: PageLimits,
    ) -> Result<Self, ValidationError> {
        let map = query_map(params);
        let allowed = [
            "state", "minSize", "maxSize", "minPrice", "maxPrice", "minRooms", "maxRooms",
            "before", "pageSize",
        ];
        let (state, size, price, rooms, page) = Fields::read_map(&map, &allowed, |fields| {
            let state = fields.choice::<ApartmentState>("state", &ApartmentState::ALL)?;
            let size = Bounds {
                min: fields.number("minSize", NumberRule::any().min(0.0))?,
                max: fields.number("maxSize", NumberRule::any().positive())?,
            };
            let price = Bounds {
                min: fields.number("minPrice", NumberRule::any().min(0.0))?,
                max: fields.number("maxPrice", NumberRule::any().positive())?,
            };
            let rooms = Bounds {
                min: fields
                    .integer("minRooms", NumberRule::any().min(0.0))?
                    .map(|rooms| rooms as f64),
                max: fields
                    .integer("maxRooms", NumberRule::any().positive())?
                    .map(|rooms| rooms as f64),
            };
            let page = Page::read(fields, limits)?;
            Ok((state, size, price, rooms, page))
        })?;

        for (bounds, min_key, max_key) in [
            (&size, "minSize", "maxSize"),
            (&price, "minPrice", "maxPrice"),
            (&rooms, "minRooms", "maxRooms"),
        ] {
            if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                if min > max {
                    return Err(ValidationError(format!(
                        "{min_key} must be smaller than or equal to {max_key}"
                    )));
                }
            }
        }

        Ok(Self {
            state,
            size,
            price,
            rooms,
            before: page.before,
            page_size: page.size,
        })
    }

    /// Storage filter as seen by `caller`: realtors only see their own
    /// listings and clients only see rentable ones.
    pub fn filter_for(&self, caller: &Principal) -> ApartmentFilter {
        let (realtor, state) = match caller.role {
            UserRole::Realtor => (Some(caller.id.clone()), self.state),
            UserRole::Client => (None, Some(ApartmentState::Rentable)),
            UserRole::Admin => (None, self.state),
        };
        ApartmentFilter {
            realtor,
            state,
            size: self.size,
            price: self.price,
            rooms: self.rooms,
            before: self.before,
        }
    }
}
