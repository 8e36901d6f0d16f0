use std::convert::TryFrom;

use crate::errors::ValidationError;
use crate::normalization::{normalize_optional, normalize_text, split_tags};
use crate::record::{Amount, Currency, Rating, Record, RecordInput, RecordUpdate};

/// The most drink photos a record can carry.
pub const MAX_DRINK_PHOTOS: usize = 5;

/// The raw contents of the add/edit form, exactly as typed.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryForm {
    pub name: String,
    pub brand: String,
    pub origin: String,
    pub price: String,
    pub currency: Currency,
    pub quantity: String,
    pub umami: u8,
    pub sweetness: u8,
    pub bitterness: u8,
    /// Comma-separated tasting notes.
    pub notes: String,
    pub powder: String,
    pub water: String,
    pub milk: String,
    pub can_photo: Option<String>,
    pub drink_photos: Vec<String>,
    pub would_repurchase: bool,
}

impl Default for EntryForm {
    fn default() -> Self {
        let rating = Rating::default().value();

        EntryForm {
            name: String::new(),
            brand: String::new(),
            origin: String::new(),
            price: String::new(),
            currency: Currency::default(),
            quantity: String::new(),
            umami: rating,
            sweetness: rating,
            bitterness: rating,
            notes: String::new(),
            powder: String::new(),
            water: String::new(),
            milk: String::new(),
            can_photo: None,
            drink_photos: vec![],
            would_repurchase: false,
        }
    }
}

impl EntryForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefills the form with an existing record, for editing.
    pub fn from_record(record: &Record) -> Self {
        let fields = record.fields();
        let number = |n: Option<f64>| n.map(|n| n.to_string()).unwrap_or_default();

        EntryForm {
            name: fields.name.clone(),
            brand: fields.brand.clone().unwrap_or_default(),
            origin: fields.origin.clone().unwrap_or_default(),
            price: number(fields.price_amount),
            currency: fields.price_currency.unwrap_or_default(),
            quantity: number(fields.quantity_grams.map(Amount::value)),
            umami: fields.umami.value(),
            sweetness: fields.sweetness.value(),
            bitterness: fields.bitterness.value(),
            notes: fields.notes.join(", "),
            powder: fields.powder_grams.to_string(),
            water: number(fields.water_ml.map(Amount::value)),
            milk: number(fields.milk_ml.map(Amount::value)),
            can_photo: fields.can_photo.clone(),
            drink_photos: fields.drink_photos.clone(),
            would_repurchase: fields.would_repurchase.unwrap_or(false),
        }
    }

    /// Checks every field and coerces the form into store input.
    /// Reports all problems at once.
    pub fn validate(&self) -> Result<RecordInput, Vec<ValidationError>> {
        let mut errors = vec![];

        let name = normalize_text(&self.name);
        if name.is_empty() {
            errors.push(ValidationError::NameRequired);
        }

        let powder_grams = parse_number(&self.powder)
            .ok()
            .flatten()
            .and_then(|n| Amount::try_from(n).ok());
        if powder_grams.is_none() {
            errors.push(ValidationError::PowderRequired);
        }

        let price_amount = match parse_number(&self.price) {
            Ok(Some(n)) if n < 0.0 => {
                errors.push(ValidationError::Negative { field: "price" });
                None
            }
            Ok(n) => n,
            Err(e) => {
                errors.push(e.named("price"));
                None
            }
        };

        let quantity_grams = collect(parse_amount(&self.quantity, "quantity"), &mut errors);
        let water_ml = collect(parse_amount(&self.water, "water"), &mut errors);
        let milk_ml = collect(parse_amount(&self.milk, "milk"), &mut errors);

        let umami = collect(parse_rating(self.umami, "umami"), &mut errors);
        let sweetness = collect(parse_rating(self.sweetness, "sweetness"), &mut errors);
        let bitterness = collect(parse_rating(self.bitterness, "bitterness"), &mut errors);

        if self.drink_photos.len() > MAX_DRINK_PHOTOS {
            errors.push(ValidationError::TooManyPhotos {
                count: self.drink_photos.len(),
                max: MAX_DRINK_PHOTOS,
            });
        }

        match (powder_grams, umami, sweetness, bitterness) {
            (Some(powder_grams), Some(umami), Some(sweetness), Some(bitterness)) if errors.is_empty() => {
                Ok(RecordInput {
                    name,
                    brand: normalize_optional(&self.brand),
                    origin: normalize_optional(&self.origin),
                    price_amount,
                    price_currency: price_amount.map(|_| self.currency),
                    quantity_grams: quantity_grams.flatten(),
                    umami,
                    sweetness,
                    bitterness,
                    notes: split_tags(&self.notes),
                    powder_grams,
                    water_ml: water_ml.flatten(),
                    milk_ml: milk_ml.flatten(),
                    can_photo: self.can_photo.clone(),
                    drink_photos: self.drink_photos.clone(),
                    would_repurchase: Some(self.would_repurchase),
                })
            }
            _ => Err(errors),
        }
    }

    /// Validates the form as an edit, replacing every editable field.
    pub fn validate_update(&self) -> Result<RecordUpdate, Vec<ValidationError>> {
        self.validate().map(RecordUpdate::from)
    }
}

/// A number that didn't parse, before it's tied to a field.
struct NotANumber;

impl NotANumber {
    fn named(self, field: &'static str) -> ValidationError {
        ValidationError::InvalidNumber { field }
    }
}

/// Parses an optional number. Blank input is absent.
fn parse_number(text: &str) -> Result<Option<f64>, NotANumber> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(NotANumber),
    }
}

fn parse_amount(text: &str, field: &'static str) -> Result<Option<Amount>, ValidationError> {
    match parse_number(text) {
        Ok(None) => Ok(None),
        Ok(Some(n)) => Amount::try_from(n)
            .map(Some)
            .map_err(|_| ValidationError::NotPositive { field }),
        Err(e) => Err(e.named(field)),
    }
}

fn parse_rating(value: u8, field: &'static str) -> Result<Rating, ValidationError> {
    Rating::try_from(value).map_err(|_| ValidationError::RatingOutOfRange { field, value })
}

fn collect<T>(result: Result<T, ValidationError>, errors: &mut Vec<ValidationError>) -> Option<T> {
    result.map_err(|e| errors.push(e)).ok()
}
