use std::error::Error;
use std::sync::Arc;

use dotenv::dotenv;
use structopt::StructOpt;
use time::OffsetDateTime;

use journal::config::Config;
use journal::display::{brewing_ratio, long_date, relative_age, summary};
use journal::errors::JournalError;
use journal::form::EntryForm;
use journal::{Currency, FileStore, PersistenceAdapter, Record, RecordId, RecordStore};
use log::{debug, info, initialize_logger};

#[derive(Debug, StructOpt)]
#[structopt(name = "journal", about = "Keep a log of matcha tastings")]
enum Command {
    /// Lists every record, newest first
    List,

    /// Shows one record in full
    Show { id: String },

    /// Adds a record
    Add(Fields),

    /// Edits a record; fields that aren't given keep their values
    Edit {
        id: String,

        #[structopt(flatten)]
        fields: Fields,
    },

    /// Deletes a record
    Delete { id: String },
}

#[derive(Debug, StructOpt)]
struct Fields {
    #[structopt(long)]
    name: Option<String>,

    #[structopt(long)]
    brand: Option<String>,

    #[structopt(long)]
    origin: Option<String>,

    /// The price paid for the tin
    #[structopt(long)]
    price: Option<String>,

    /// USD or JPY
    #[structopt(long)]
    currency: Option<Currency>,

    /// Grams of powder in the tin
    #[structopt(long)]
    quantity: Option<String>,

    #[structopt(long)]
    umami: Option<u8>,

    #[structopt(long)]
    sweetness: Option<u8>,

    #[structopt(long)]
    bitterness: Option<u8>,

    /// Comma-separated tasting notes
    #[structopt(long)]
    notes: Option<String>,

    /// Grams of powder per drink
    #[structopt(long)]
    powder: Option<String>,

    /// Millilitres of water per drink
    #[structopt(long)]
    water: Option<String>,

    /// Millilitres of milk per drink
    #[structopt(long)]
    milk: Option<String>,

    #[structopt(long)]
    can_photo: Option<String>,

    /// Replaces the drink photos; may be repeated
    #[structopt(long = "drink-photo")]
    drink_photos: Vec<String>,

    /// true or false
    #[structopt(long)]
    would_repurchase: Option<bool>,
}

impl Fields {
    fn fill(self, form: &mut EntryForm) {
        macro_rules! fill {
            ($($field:ident),+ $(,)?) => {
                $(
                    if let Some(value) = self.$field {
                        form.$field = value;
                    }
                )+
            };
        }

        fill!(
            name, brand, origin, price, currency, quantity, umami, sweetness, bitterness, notes,
            powder, water, milk, would_repurchase,
        );

        if self.can_photo.is_some() {
            form.can_photo = self.can_photo;
        }

        if !self.drink_photos.is_empty() {
            form.drink_photos = self.drink_photos;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let command = Command::from_args();

    let logger = Arc::new(initialize_logger());
    let config = Config::from_env()?;

    debug!(logger, "Starting..."; "build" => info::describe(), "data_dir" => config.data_dir.display().to_string());

    let backend = Arc::new(FileStore::new(config.data_dir));
    let adapter = PersistenceAdapter::new(logger.clone(), backend);
    let mut store = RecordStore::open(logger.clone(), adapter).await;

    let result = run(&mut store, command);

    store.close().await;

    if let Err(e) = &result {
        info!(logger, "Command failed"; "error" => e.to_string());
    }

    Ok(result?)
}

fn run(store: &mut RecordStore, command: Command) -> Result<(), JournalError> {
    let now = OffsetDateTime::now_utc();

    match command {
        Command::List => {
            if store.is_empty() {
                println!("No records yet.");
            }

            for record in store.records() {
                println!("{}  {}", record.id(), summary(record, now));
            }
        }
        Command::Show { id } => {
            let record = find(store, &id)?;
            print_record(record, now);
        }
        Command::Add(fields) => {
            let mut form = EntryForm::new();
            fields.fill(&mut form);

            let input = form.validate().map_err(JournalError::Invalid)?;
            let id = store.add(input);

            println!("{}", id);
        }
        Command::Edit { id, fields } => {
            let mut form = EntryForm::from_record(find(store, &id)?);
            fields.fill(&mut form);

            let update = form.validate_update().map_err(JournalError::Invalid)?;
            store.update(&RecordId::from(id), update);
        }
        Command::Delete { id } => {
            if !store.delete(&RecordId::from(id.as_str())) {
                return Err(JournalError::NonExistentId(id));
            }
        }
    }

    Ok(())
}

fn find<'a>(store: &'a RecordStore, id: &str) -> Result<&'a Record, JournalError> {
    store
        .get(&RecordId::from(id))
        .ok_or_else(|| JournalError::NonExistentId(id.to_owned()))
}

fn print_record(record: &Record, now: OffsetDateTime) {
    let fields = record.fields();
    let flavor = record.flavor_profile();

    println!("{}", fields.name);

    if let Some(brand) = fields.brand.as_deref().filter(|b| !b.is_empty()) {
        println!("  brand:      {}", brand);
    }

    if let Some(origin) = &fields.origin {
        println!("  origin:     {}", origin);
    }

    if let Some(price) = record.price() {
        println!("  price:      {}", price);
    }

    if let Some(quantity) = fields.quantity_grams {
        println!("  quantity:   {}g", quantity);
    }

    if let Some(per_gram) = record.price_per_gram() {
        println!("  per gram:   {} / g", per_gram);
    }

    println!(
        "  flavor:     umami {}/5, sweetness {}/5, bitterness {}/5",
        flavor.umami.value(),
        flavor.sweetness.value(),
        flavor.bitterness.value()
    );
    println!("  brewing:    {}", brewing_ratio(record));

    if !fields.notes.is_empty() {
        println!("  notes:      {}", fields.notes.join(", "));
    }

    if let Some(photo) = &fields.can_photo {
        println!("  tin photo:  {}", photo);
    }

    for photo in &fields.drink_photos {
        println!("  drink photo: {}", photo);
    }

    match fields.would_repurchase {
        Some(true) => println!("  would buy again"),
        Some(false) => println!("  would not buy again"),
        None => {}
    }

    println!(
        "  created:    {} ({})",
        long_date(record.created_at()),
        relative_age(record.created_at(), now)
    );
}
