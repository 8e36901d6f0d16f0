use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The opaque ID of a record.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generates a fresh random ID.
    pub fn generate() -> Self {
        RecordId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_owned())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A flavor rating on a scale of 1 to 5.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating(3)
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(format!("rating must be between {} and {}, not {}", Self::MIN, Self::MAX, value))
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A strictly positive, finite quantity (grams or millilitres).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value > 0.0 {
            Ok(Amount(value))
        } else {
            Err(format!("amount must be greater than 0, not {}", value))
        }
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads an optional amount, treating zero and negative values as absent.
/// Older entries were saved without any positivity check.
fn zero_as_absent<'de, D>(deserializer: D) -> Result<Option<Amount>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;

    Ok(value.and_then(|n| Amount::try_from(n).ok()))
}

/// The currency a price was paid in.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "JPY")]
    Jpy,
}

impl Currency {
    pub fn all() -> &'static [Currency] {
        &[Currency::Usd, Currency::Jpy]
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Jpy => "JPY",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Jpy => "¥",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Usd
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::all()
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown currency {:?}", s))
    }
}

/// A price paid for a tin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Price {
    pub amount: f64,
    pub currency: Currency,
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// The three flavor ratings of a record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlavorProfile {
    pub umami: Rating,
    pub sweetness: Rating,
    pub bitterness: Rating,
}

/// A single tasting entry.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// The ID of the record. Never changes.
    pub(crate) id: RecordId,

    /// The date and time it was created. Never changes.
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,

    /// Everything the user entered.
    #[serde(flatten)]
    pub(crate) fields: RecordInput,
}

impl Record {
    pub(crate) fn new(id: RecordId, created_at: OffsetDateTime, fields: RecordInput) -> Self {
        Record {
            id,
            created_at,
            fields,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn fields(&self) -> &RecordInput {
        &self.fields
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    /// The price, if both the amount and the currency were recorded.
    pub fn price(&self) -> Option<Price> {
        match (self.fields.price_amount, self.fields.price_currency) {
            (Some(amount), Some(currency)) => Some(Price { amount, currency }),
            _ => None,
        }
    }

    /// The price per gram of powder in the tin, if known.
    pub fn price_per_gram(&self) -> Option<Price> {
        let price = self.price()?;
        let quantity = self.fields.quantity_grams?;

        Some(Price {
            amount: price.amount / quantity.value(),
            currency: price.currency,
        })
    }

    pub fn flavor_profile(&self) -> FlavorProfile {
        FlavorProfile {
            umami: self.fields.umami,
            sweetness: self.fields.sweetness,
            bitterness: self.fields.bitterness,
        }
    }

    /// Applies every field present in `update`.
    pub(crate) fn apply(&mut self, update: RecordUpdate) {
        let fields = &mut self.fields;

        macro_rules! merge {
            ($($field:ident),+ $(,)?) => {
                $(
                    if let Some(value) = update.$field {
                        fields.$field = value;
                    }
                )+
            };
        }

        merge!(
            name,
            brand,
            origin,
            price_amount,
            price_currency,
            quantity_grams,
            umami,
            sweetness,
            bitterness,
            notes,
            powder_grams,
            water_ml,
            milk_ml,
            can_photo,
            drink_photos,
            would_repurchase,
        );
    }
}

/// The user-supplied fields of a record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<Currency>,

    #[serde(
        default,
        deserialize_with = "zero_as_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity_grams: Option<Amount>,

    pub umami: Rating,
    pub sweetness: Rating,
    pub bitterness: Rating,

    /// Free-form tasting notes, in the order they were entered.
    #[serde(default)]
    pub notes: Vec<String>,

    pub powder_grams: Amount,

    #[serde(
        default,
        deserialize_with = "zero_as_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub water_ml: Option<Amount>,

    #[serde(
        default,
        deserialize_with = "zero_as_absent",
        skip_serializing_if = "Option::is_none"
    )]
    pub milk_ml: Option<Amount>,

    /// A local reference to a photo of the tin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_photo: Option<String>,

    /// Local references to photos of the drink.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drink_photos: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub would_repurchase: Option<bool>,
}

impl RecordInput {
    /// Creates an input with only the required fields set and neutral
    /// ratings.
    pub fn new(name: impl Into<String>, powder_grams: Amount) -> Self {
        RecordInput {
            name: name.into(),
            brand: None,
            origin: None,
            price_amount: None,
            price_currency: None,
            quantity_grams: None,
            umami: Rating::default(),
            sweetness: Rating::default(),
            bitterness: Rating::default(),
            notes: vec![],
            powder_grams,
            water_ml: None,
            milk_ml: None,
            can_photo: None,
            drink_photos: vec![],
            would_repurchase: None,
        }
    }
}

/// A partial set of fields to merge over an existing record. `None`
/// leaves a field unchanged; `Some(None)` clears an optional field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordUpdate {
    pub name: Option<String>,
    pub brand: Option<Option<String>>,
    pub origin: Option<Option<String>>,
    pub price_amount: Option<Option<f64>>,
    pub price_currency: Option<Option<Currency>>,
    pub quantity_grams: Option<Option<Amount>>,
    pub umami: Option<Rating>,
    pub sweetness: Option<Rating>,
    pub bitterness: Option<Rating>,
    pub notes: Option<Vec<String>>,
    pub powder_grams: Option<Amount>,
    pub water_ml: Option<Option<Amount>>,
    pub milk_ml: Option<Option<Amount>>,
    pub can_photo: Option<Option<String>>,
    pub drink_photos: Option<Vec<String>>,
    pub would_repurchase: Option<Option<bool>>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        *self == RecordUpdate::default()
    }
}

impl From<RecordInput> for RecordUpdate {
    /// Replaces every field, as the edit form does.
    fn from(input: RecordInput) -> Self {
        RecordUpdate {
            name: Some(input.name),
            brand: Some(input.brand),
            origin: Some(input.origin),
            price_amount: Some(input.price_amount),
            price_currency: Some(input.price_currency),
            quantity_grams: Some(input.quantity_grams),
            umami: Some(input.umami),
            sweetness: Some(input.sweetness),
            bitterness: Some(input.bitterness),
            notes: Some(input.notes),
            powder_grams: Some(input.powder_grams),
            water_ml: Some(input.water_ml),
            milk_ml: Some(input.milk_ml),
            can_photo: Some(input.can_photo),
            drink_photos: Some(input.drink_photos),
            would_repurchase: Some(input.would_repurchase),
        }
    }
}
