//! Book commands - add, get, list, update, stock, delete and the read-only queries
//!
//! Each command is one store request. `update` sends all of its fields
//! together, so a rejected field leaves the book untouched.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use shelfctl_core::{
    BookQuery, BookUpdate, Filter, NewBook, NumericField, Pagination, RecordStore, Sort, SortKey,
    DEFAULT_PER_PAGE,
};
use tracing::debug;

use super::output::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Book title (2-200 characters)
    #[arg(long)]
    pub title: String,

    /// Author name (2-100 characters)
    #[arg(long)]
    pub author: String,

    /// Page count (1-5000)
    #[arg(long)]
    pub pages: i32,

    /// Price (0.01-999.99)
    #[arg(long)]
    pub price: f64,

    /// ISBN (unique, up to 20 characters)
    #[arg(long)]
    pub isbn: Option<String>,

    /// Publication year (1000-2030)
    #[arg(long)]
    pub year: Option<i32>,

    /// Record the book as out of stock
    #[arg(long)]
    pub out_of_stock: bool,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Book id
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Book id
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub pages: Option<i32>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long, conflicts_with = "clear_isbn")]
    pub isbn: Option<String>,

    /// Remove the stored ISBN
    #[arg(long)]
    pub clear_isbn: bool,

    #[arg(long, conflicts_with = "clear_year")]
    pub year: Option<i32>,

    /// Remove the stored publication year
    #[arg(long)]
    pub clear_year: bool,
}

impl UpdateArgs {
    fn updates(&self) -> Vec<BookUpdate> {
        let mut updates = Vec::new();
        if let Some(title) = &self.title {
            updates.push(BookUpdate::Title(title.clone()));
        }
        if let Some(author) = &self.author {
            updates.push(BookUpdate::Author(author.clone()));
        }
        if let Some(pages) = self.pages {
            updates.push(BookUpdate::Pages(pages));
        }
        if let Some(price) = self.price {
            updates.push(BookUpdate::Price(price));
        }
        if let Some(isbn) = &self.isbn {
            updates.push(BookUpdate::Isbn(Some(isbn.clone())));
        }
        if self.clear_isbn {
            updates.push(BookUpdate::Isbn(None));
        }
        if let Some(year) = self.year {
            updates.push(BookUpdate::PublicationYear(Some(year)));
        }
        if self.clear_year {
            updates.push(BookUpdate::PublicationYear(None));
        }
        updates
    }
}

#[derive(Args, Debug)]
pub struct StockArgs {
    /// Book id
    pub id: i64,

    /// Mark the book as in stock
    #[arg(long = "in", conflicts_with = "out_of_stock", required_unless_present = "out_of_stock")]
    pub in_stock: bool,

    /// Mark the book as out of stock
    #[arg(long = "out")]
    pub out_of_stock: bool,
}

#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Exact title
    #[arg(long, conflicts_with = "isbn", required_unless_present = "isbn")]
    pub title: Option<String>,

    /// Exact ISBN
    #[arg(long)]
    pub isbn: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SortArg {
    Id,
    Title,
    Author,
    Pages,
    Price,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => SortKey::Id,
            SortArg::Title => SortKey::Title,
            SortArg::Author => SortKey::Author,
            SortArg::Pages => SortKey::Pages,
            SortArg::Price => SortKey::Price,
        }
    }
}

#[derive(Args, Debug)]
pub struct FindArgs {
    /// Exact author
    #[arg(long)]
    pub author: Option<String>,

    /// Exact title
    #[arg(long)]
    pub title: Option<String>,

    /// Case-sensitive title substring
    #[arg(long)]
    pub title_contains: Option<String>,

    /// Exact ISBN
    #[arg(long)]
    pub isbn: Option<String>,

    /// Price strictly below this value
    #[arg(long)]
    pub below: Option<f64>,

    /// Lower price bound (inclusive, needs --max-price)
    #[arg(long, requires = "max_price")]
    pub min_price: Option<f64>,

    /// Upper price bound (inclusive, needs --min-price)
    #[arg(long, requires = "min_price")]
    pub max_price: Option<f64>,

    /// At least this many pages
    #[arg(long)]
    pub min_pages: Option<i32>,

    /// Only books in stock
    #[arg(long, conflicts_with = "out_of_stock")]
    pub in_stock: bool,

    /// Only books out of stock
    #[arg(long)]
    pub out_of_stock: bool,

    /// Sort key (ties fall back to id)
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Results per page
    #[arg(long, requires = "page")]
    pub per_page: Option<u32>,
}

impl FindArgs {
    fn query(&self) -> Result<BookQuery> {
        let mut query = BookQuery::new();

        if let Some(author) = &self.author {
            query = query.filter(Filter::AuthorEq(author.clone()));
        }
        if let Some(title) = &self.title {
            query = query.filter(Filter::TitleEq(title.clone()));
        }
        if let Some(keyword) = &self.title_contains {
            query = query.filter(Filter::TitleContains(keyword.clone()));
        }
        if let Some(isbn) = &self.isbn {
            query = query.filter(Filter::IsbnEq(isbn.clone()));
        }
        if let Some(below) = self.below {
            query = query.filter(Filter::PriceBelow(below));
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            query = query.filter(Filter::PriceBetween { min, max });
        }
        if let Some(min_pages) = self.min_pages {
            query = query.filter(Filter::PagesAtLeast(min_pages));
        }
        if self.in_stock {
            query = query.filter(Filter::InStock(true));
        }
        if self.out_of_stock {
            query = query.filter(Filter::InStock(false));
        }

        if let Some(sort) = self.sort {
            let key = SortKey::from(sort);
            query = query.sort(if self.desc { Sort::desc(key) } else { Sort::asc(key) });
        }

        if let Some(page) = self.page {
            let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
            query = query.paginate(Pagination::new(page, per_page)?);
        }

        Ok(query)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum FieldArg {
    Price,
    Pages,
}

#[derive(Args, Debug)]
pub struct AvgArgs {
    /// Numeric field to average
    #[arg(long, value_enum, default_value_t = FieldArg::Price)]
    pub field: FieldArg,
}

impl From<FieldArg> for NumericField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Price => NumericField::Price,
            FieldArg::Pages => NumericField::Pages,
        }
    }
}

pub async fn run_add(store: &dyn RecordStore, args: AddArgs, format: OutputFormat) -> Result<()> {
    let mut book = NewBook::new(args.title, args.author, args.pages, args.price);
    if let Some(isbn) = args.isbn {
        book = book.with_isbn(isbn);
    }
    if let Some(year) = args.year {
        book = book.with_publication_year(year);
    }
    if args.out_of_stock {
        book = book.out_of_stock();
    }

    let book = store.add(book).await.context("Failed to add book")?;
    output::print(output::render_book(format, &book)?);
    Ok(())
}

pub async fn run_get(store: &dyn RecordStore, args: IdArgs, format: OutputFormat) -> Result<()> {
    let book = store.get(args.id).await?;
    output::print(output::render_book(format, &book)?);
    Ok(())
}

pub async fn run_list(store: &dyn RecordStore, format: OutputFormat) -> Result<()> {
    let books = store.list_all().await?;
    output::print(output::render_books(format, &books)?);
    Ok(())
}

pub async fn run_update(
    store: &dyn RecordStore,
    args: UpdateArgs,
    format: OutputFormat,
) -> Result<()> {
    let updates = args.updates();
    if updates.is_empty() {
        bail!("Nothing to update: pass at least one field (e.g. --price 9.99)");
    }

    let fields: Vec<&str> = updates.iter().map(|u| u.field()).collect();
    debug!(id = args.id, ?fields, "applying update");

    // One request: either every field changes or none does
    let book = store
        .update_many(args.id, updates)
        .await
        .context(format!("Failed to update book {}", args.id))?;

    output::print(output::render_book(format, &book)?);
    Ok(())
}

pub async fn run_stock(store: &dyn RecordStore, args: StockArgs, format: OutputFormat) -> Result<()> {
    let book = if args.out_of_stock {
        store.mark_out_of_stock(args.id).await?
    } else {
        store.mark_in_stock(args.id).await?
    };
    output::print(output::render_book(format, &book)?);
    Ok(())
}

pub async fn run_delete(store: &dyn RecordStore, args: IdArgs, format: OutputFormat) -> Result<()> {
    store.delete(args.id).await?;
    match format {
        OutputFormat::Json => {
            output::print(serde_json::to_string(&serde_json::json!({ "deleted": args.id }))?)
        }
        OutputFormat::Quiet => {}
        OutputFormat::Human => println!("Deleted book {}", args.id),
    }
    Ok(())
}

pub async fn run_exists(store: &dyn RecordStore, args: ExistsArgs, format: OutputFormat) -> Result<()> {
    let filter = match (args.title, args.isbn) {
        (Some(title), _) => Filter::TitleEq(title),
        (None, Some(isbn)) => Filter::IsbnEq(isbn),
        (None, None) => bail!("Pass --title or --isbn"),
    };

    let found = store.exists(&filter).await?;
    output::print(output::render_value(format, &found)?);
    Ok(())
}

pub async fn run_find(store: &dyn RecordStore, args: FindArgs, format: OutputFormat) -> Result<()> {
    let query = args.query()?;
    let books = store.find(&query).await?;
    output::print(output::render_books(format, &books)?);
    Ok(())
}

pub async fn run_count(store: &dyn RecordStore, format: OutputFormat) -> Result<()> {
    let count = store.count().await?;
    output::print(output::render_value(format, &count)?);
    Ok(())
}

pub async fn run_avg(store: &dyn RecordStore, args: AvgArgs, format: OutputFormat) -> Result<()> {
    let field = NumericField::from(args.field);
    let avg = store.average(field).await?;
    output::print(output::render_average(format, field, avg)?);
    Ok(())
}

pub async fn run_cheapest(store: &dyn RecordStore, format: OutputFormat) -> Result<()> {
    let book = store.cheapest().await?;
    output::print(output::render_optional_book(format, book.as_ref())?);
    Ok(())
}

pub async fn run_priciest(store: &dyn RecordStore, format: OutputFormat) -> Result<()> {
    let book = store.most_expensive().await?;
    output::print(output::render_optional_book(format, book.as_ref())?);
    Ok(())
}
